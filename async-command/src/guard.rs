//! 执行保护（Execution Guard）
//!
//! `trigger` 与 `execute_async` 共用的唯一执行路径：
//! - 进入时标记“执行中”，任意完成路径（成功、已处理失败、向上抛出）都会清除；
//! - 等待方丢弃 future 时：调用方内轮询的动作随之取消并清除；派发到工作线程的动作继续运行，
//!   标记随任务一起在动作结束时清除；
//! - 动作返回的 `Err` 与 panic 一并捕获为 [`CommandError`]；
//! - 清除执行状态之后，再交给异常处理器或返回给等待方。
//!
use crate::error::CommandError;
use crate::options::CommandOptions;
use crate::outcome::ExecutionOutcome;
use crate::unhandled;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::debug;

pub(crate) type ActionFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

pub(crate) type ActionFn<E, T> = Arc<dyn Fn(Option<E>) -> ActionFuture<T> + Send + Sync>;

pub(crate) type PredicateFn<C> = Arc<dyn Fn(Option<&C>) -> bool + Send + Sync>;

pub(crate) type ExceptionHandlerFn = Arc<dyn Fn(CommandError) + Send + Sync>;

/// 动作在何处被轮询
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    /// 在调用方所在任务内直接轮询
    Inline,
    /// 派发到运行时的工作线程池，调用方等待其完成
    Worker,
}

pub(crate) struct ExecutionGuard<E, C, T> {
    execute: ActionFn<E, T>,
    can_execute: Option<PredicateFn<C>>,
    on_exception: Option<ExceptionHandlerFn>,
    options: CommandOptions,
    executing: Arc<AtomicBool>,
    can_execute_changed: broadcast::Sender<()>,
}

impl<E, C, T> ExecutionGuard<E, C, T>
where
    E: Send + 'static,
    C: 'static,
    T: Send + 'static,
{
    pub(crate) fn new(
        execute: ActionFn<E, T>,
        can_execute: Option<PredicateFn<C>>,
        on_exception: Option<ExceptionHandlerFn>,
        options: CommandOptions,
    ) -> Self {
        let (can_execute_changed, _) = broadcast::channel(options.notification_capacity());
        Self {
            execute,
            can_execute,
            on_exception,
            options,
            executing: Arc::new(AtomicBool::new(false)),
            can_execute_changed,
        }
    }

    pub(crate) fn options(&self) -> &CommandOptions {
        &self.options
    }

    pub(crate) fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    pub(crate) fn can_execute(&self, parameter: Option<&C>) -> bool {
        self.can_execute.as_ref().is_none_or(|p| p(parameter))
    }

    pub(crate) fn subscribe_can_execute_changed(&self) -> broadcast::Receiver<()> {
        self.can_execute_changed.subscribe()
    }

    pub(crate) fn raise_can_execute_changed(&self) {
        // 无订阅方时忽略
        let _ = self.can_execute_changed.send(());
    }

    /// 受保护执行：标记状态 → 调用动作 → 清除状态 → 路由失败
    pub(crate) async fn run(
        self: Arc<Self>,
        parameter: Option<E>,
        placement: Placement,
    ) -> Result<ExecutionOutcome<T>, CommandError> {
        let Some(flag) = self.enter() else {
            debug!(command = %self.options.name(), "execution skipped: already executing");
            return Ok(ExecutionOutcome::Skipped);
        };

        debug!(command = %self.options.name(), ?placement, "execution started");

        // 先清除执行状态，异常处理器中查询到的是“未在执行”
        let result = match placement {
            Placement::Inline => {
                let result = capture(self.execute.clone(), parameter).await;
                drop(flag);
                result
            }
            Placement::Worker => self.run_on_worker(parameter, flag).await,
        };

        match result {
            Ok(value) => {
                debug!(command = %self.options.name(), "execution completed");
                Ok(ExecutionOutcome::Completed(value))
            }
            Err(err) => self.route_failure(err),
        }
    }

    /// 分离执行：供 `trigger` 使用，没有等待方的失败交给未处理失败信号
    pub(crate) async fn run_detached(self: Arc<Self>, parameter: Option<E>) {
        let name = self.options.name().to_owned();
        // 独占命令重入时得到 Skipped，触发路径上只记录 debug 日志
        if let Err(err) = self.run(parameter, Placement::Inline).await {
            unhandled::report(&name, err);
        }
    }

    /// 同步失败（如缺少运行时）按与动作失败相同的规则路由
    pub(crate) fn surface(&self, err: CommandError) {
        if let Err(err) = self.route_failure(err) {
            unhandled::report(self.options.name(), err);
        }
    }

    fn route_failure(&self, err: CommandError) -> Result<ExecutionOutcome<T>, CommandError> {
        match &self.on_exception {
            Some(handler) => {
                debug!(
                    command = %self.options.name(),
                    error = %err,
                    "execution failed, routed to exception handler"
                );
                handler(err);
                Ok(ExecutionOutcome::Handled)
            }
            None => Err(err),
        }
    }

    fn enter(&self) -> Option<ExecutingFlag> {
        if self.options.exclusive() {
            self.executing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .ok()?;
        } else {
            self.executing.store(true, Ordering::Release);
        }
        Some(ExecutingFlag(self.executing.clone()))
    }

    /// 执行标记随任务移动：等待方丢弃 future 后，动作完成前仍视为“执行中”
    async fn run_on_worker(
        &self,
        parameter: Option<E>,
        flag: ExecutingFlag,
    ) -> Result<T, CommandError> {
        let handle = Handle::try_current().map_err(|_| CommandError::NoRuntime)?;
        let execute = self.execute.clone();
        let task = handle.spawn(async move {
            let result = capture(execute, parameter).await;
            drop(flag);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                Err(CommandError::Panicked(panic_message(&*join_err.into_panic())))
            }
            Err(_) => Err(CommandError::Cancelled),
        }
    }
}

/// 离开作用域时清除“执行中”标记
struct ExecutingFlag(Arc<AtomicBool>);

impl Drop for ExecutingFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 调用动作并把 `Err` 与 panic 统一转换为 `CommandError`
async fn capture<E, T>(execute: ActionFn<E, T>, parameter: Option<E>) -> Result<T, CommandError>
where
    E: Send + 'static,
    T: Send + 'static,
{
    let invocation = async move { execute(parameter).await };

    match AssertUnwindSafe(invocation).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CommandError::Action(err)),
        Err(payload) => Err(CommandError::Panicked(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
