use crate::async_execute::AsyncExecute;
use crate::command::{Command, Parameter};
use crate::error::{CommandError, CommandResult};
use crate::guard::{
    ActionFn, ActionFuture, ExceptionHandlerFn, ExecutionGuard, Placement, PredicateFn,
};
use crate::options::CommandOptions;
use crate::outcome::ExecutionOutcome;
use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::broadcast;
use tracing::debug;

/// 异步命令（Async Command）
///
/// 让绑定框架以同步方式触发异步动作：
/// - `trigger`：同步入口，启动分离任务后立即返回，不检查 `can_execute`；
/// - `execute_async`：异步入口，等待动作完成并返回 [`ExecutionOutcome`]；
/// - `can_execute`：评估可执行谓词，未配置时恒为 `true`。
///
/// 类型参数：
/// - `E`：动作参数类型；
/// - `C`：谓词参数类型，可与 `E` 不同；
/// - `T`：动作返回值类型。
///
/// 克隆共享同一执行状态。
///
/// 失败路由：配置了异常处理器时，失败交给处理器且不会向调用方抛出；未配置时
/// `execute_async` 返回 `Err`，而 `trigger` 启动的任务没有等待方，失败会进入
/// [`unhandled`](crate::unhandled) 信号并记录错误日志。省略异常处理器即接受这一风险。
///
/// ```rust
/// use async_command::{AsyncCommand, ExecutionOutcome};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let answer = AsyncCommand::<(), (), i32>::from_fn(|| async { Ok(42) }).build();
///
/// let out = answer.execute_async(None).await.unwrap();
/// assert_eq!(out, ExecutionOutcome::Completed(42));
/// assert!(!answer.is_executing());
/// # }
/// ```
pub struct AsyncCommand<E = (), C = E, T = ()> {
    guard: Arc<ExecutionGuard<E, C, T>>,
}

impl<E, C, T> AsyncCommand<E, C, T>
where
    E: Send + 'static,
    C: 'static,
    T: Send + 'static,
{
    /// 以默认配置创建命令（无谓词、无异常处理器）
    pub fn new<F, Fut>(execute: F) -> Self
    where
        F: Fn(Option<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::builder(execute).build()
    }

    pub fn builder<F, Fut>(execute: F) -> AsyncCommandBuilder<E, C, T>
    where
        F: Fn(Option<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let execute: ActionFn<E, T> =
            Arc::new(move |parameter| Box::pin(execute(parameter)) as ActionFuture<T>);

        AsyncCommandBuilder {
            execute,
            can_execute: None,
            on_exception: None,
            options: CommandOptions::default(),
        }
    }

    pub fn name(&self) -> &str {
        self.guard.options().name()
    }

    pub fn options(&self) -> &CommandOptions {
        self.guard.options()
    }

    /// 当前是否有执行在途
    pub fn is_executing(&self) -> bool {
        self.guard.is_executing()
    }

    pub fn can_execute(&self, parameter: Option<&C>) -> bool {
        self.guard.can_execute(parameter)
    }

    /// 同步触发：启动分离任务后立即返回
    ///
    /// 分离任务投递到当前运行时：
    /// - `continue_on_captured_context = true`：单线程运行时（含其上的 `LocalSet`）只在
    ///   调用线程上轮询任务，动作每次挂起后都回到该线程；多线程运行时没有可捕获的单一
    ///   线程，退化为在运行时调度器上继续；
    /// - `false`：可在任意工作线程继续。
    ///
    /// 当前没有运行时则按失败路由 `CommandError::NoRuntime`，不会 panic。
    pub fn trigger(&self, parameter: Option<E>) {
        let guard = self.guard.clone();

        let Ok(handle) = Handle::try_current() else {
            guard.surface(CommandError::NoRuntime);
            return;
        };

        if guard.options().continue_on_captured_context()
            && handle.runtime_flavor() != RuntimeFlavor::CurrentThread
        {
            debug!(
                command = %guard.options().name(),
                "no single-threaded context to capture, resuming on runtime scheduler"
            );
        }

        handle.spawn(guard.run_detached(parameter));
    }

    /// 执行并等待完成
    ///
    /// - `continue_on_captured_context = true`：动作在调用方任务内轮询；
    /// - `false`：动作派发到运行时工作线程，调用方等待其完成。
    ///
    /// 返回的 future 被丢弃时：调用方内轮询的动作随之取消，执行状态立即清除；
    /// 已派发到工作线程的动作继续运行，直到其结束才清除执行状态。
    pub async fn execute_async(
        &self,
        parameter: Option<E>,
    ) -> Result<ExecutionOutcome<T>, CommandError> {
        let placement = if self.guard.options().continue_on_captured_context() {
            Placement::Inline
        } else {
            Placement::Worker
        };
        self.guard.clone().run(parameter, placement).await
    }

    pub fn subscribe_can_execute_changed(&self) -> broadcast::Receiver<()> {
        self.guard.subscribe_can_execute_changed()
    }

    pub fn raise_can_execute_changed(&self) {
        self.guard.raise_can_execute_changed();
    }
}

impl<T> AsyncCommand<(), (), T>
where
    T: Send + 'static,
{
    /// 无参数形式：以固定的 `None` 调用单参数核心
    pub fn from_fn<F, Fut>(execute: F) -> AsyncCommandBuilder<(), (), T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::builder(move |_: Option<()>| execute())
    }
}

impl<E, C, T> Clone for AsyncCommand<E, C, T> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
        }
    }
}

impl<E, C, T> std::fmt::Debug for AsyncCommand<E, C, T>
where
    E: Send + 'static,
    C: 'static,
    T: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncCommand")
            .field("options", self.options())
            .field("is_executing", &self.is_executing())
            .finish_non_exhaustive()
    }
}

/// [`AsyncCommand`] 构建器，`build` 之后命令不可变
pub struct AsyncCommandBuilder<E, C, T> {
    execute: ActionFn<E, T>,
    can_execute: Option<PredicateFn<C>>,
    on_exception: Option<ExceptionHandlerFn>,
    options: CommandOptions,
}

impl<E, C, T> AsyncCommandBuilder<E, C, T>
where
    E: Send + 'static,
    C: 'static,
    T: Send + 'static,
{
    /// 可执行谓词；未设置时恒为可执行
    pub fn can_execute<P>(mut self, predicate: P) -> Self
    where
        P: Fn(Option<&C>) -> bool + Send + Sync + 'static,
    {
        self.can_execute = Some(Arc::new(predicate));
        self
    }

    /// 异常处理器；设置后失败不再向调用方抛出
    pub fn on_exception<H>(mut self, handler: H) -> Self
    where
        H: Fn(CommandError) + Send + Sync + 'static,
    {
        self.on_exception = Some(Arc::new(handler));
        self
    }

    pub fn options(mut self, options: CommandOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> AsyncCommand<E, C, T> {
        AsyncCommand {
            guard: Arc::new(ExecutionGuard::new(
                self.execute,
                self.can_execute,
                self.on_exception,
                self.options,
            )),
        }
    }
}

impl<E, C, T> Command for AsyncCommand<E, C, T>
where
    E: Any + Send,
    C: Any,
    T: Send + 'static,
{
    fn can_execute(&self, parameter: Option<&Parameter>) -> CommandResult<bool> {
        let parameter = parameter.map(Parameter::downcast_ref::<C>).transpose()?;
        Ok(self.guard.can_execute(parameter))
    }

    fn execute(&self, parameter: Option<Parameter>) -> CommandResult<()> {
        let parameter = parameter.map(Parameter::downcast::<E>).transpose()?;
        self.trigger(parameter);
        Ok(())
    }

    fn can_execute_changed(&self) -> broadcast::Receiver<()> {
        self.guard.subscribe_can_execute_changed()
    }

    fn raise_can_execute_changed(&self) {
        self.guard.raise_can_execute_changed();
    }
}

#[async_trait]
impl<E, C, T> AsyncExecute<E> for AsyncCommand<E, C, T>
where
    E: Any + Send,
    C: Any,
    T: Send + 'static,
{
    type Output = T;

    async fn execute_async(
        &self,
        parameter: Option<E>,
    ) -> Result<ExecutionOutcome<T>, CommandError> {
        AsyncCommand::execute_async(self, parameter).await
    }
}
