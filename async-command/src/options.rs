use bon::Builder;
use serde::{Deserialize, Serialize};

const DEFAULT_NAME: &str = "command";
const DEFAULT_NOTIFICATION_CAPACITY: usize = 16;

/// 命令配置
///
/// 构造后不可变，随命令实例共享。可由 builder 构建，也可从配置文件反序列化
/// （缺失字段取默认值）。
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    /// 命令名称，用于日志字段与未处理失败的上报
    #[builder(into, default = DEFAULT_NAME.to_owned())]
    name: String,
    /// 为 `true` 时挂起点之后在发起方上下文继续执行；为 `false` 时可在任意工作线程继续
    #[builder(default)]
    continue_on_captured_context: bool,
    /// 为 `true` 时拒绝重入：已有执行在途时新的执行直接返回 `Skipped`
    #[builder(default)]
    exclusive: bool,
    /// `CanExecuteChanged` 通知通道的容量（至少为 1）
    #[builder(default = DEFAULT_NOTIFICATION_CAPACITY)]
    notification_capacity: usize,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CommandOptions {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn continue_on_captured_context(&self) -> bool {
        self.continue_on_captured_context
    }

    pub fn exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn notification_capacity(&self) -> usize {
        self.notification_capacity.max(1)
    }
}
