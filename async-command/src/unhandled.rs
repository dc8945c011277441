//! 未处理失败信号（Unhandled Failure）
//!
//! `trigger` 启动的分离任务没有等待方；若此时也未配置异常处理器，失败既不能被静默丢弃，
//! 也不能让进程崩溃。此类失败会以 `error` 级别记录日志，并广播到进程级通道，
//! 测试或集成方可通过 [`subscribe`] 观察。
//!
//! 未配置异常处理器即表示集成方接受这一风险。
//!
use crate::error::CommandError;
use std::sync::{Arc, LazyLock};
use tokio::sync::broadcast;
use tracing::error;

const CHANNEL_CAPACITY: usize = 64;

static UNHANDLED: LazyLock<broadcast::Sender<UnhandledFailure>> =
    LazyLock::new(|| broadcast::channel(CHANNEL_CAPACITY).0);

/// 一次没有等待方、也没有异常处理器的失败
#[derive(Debug, Clone)]
pub struct UnhandledFailure {
    command: String,
    error: Arc<CommandError>,
}

impl UnhandledFailure {
    /// 出错命令的名称（`CommandOptions::name`）
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn error(&self) -> &CommandError {
        &self.error
    }
}

/// 订阅未处理失败；只能收到订阅之后发生的失败
pub fn subscribe() -> broadcast::Receiver<UnhandledFailure> {
    UNHANDLED.subscribe()
}

pub(crate) fn report(command: &str, err: CommandError) {
    error!(command = %command, error = %err, "unhandled command failure");

    // 没有订阅方时发送失败，日志已记录
    let _ = UNHANDLED.send(UnhandledFailure {
        command: command.to_owned(),
        error: Arc::new(err),
    });
}
