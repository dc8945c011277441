use crate::{command::Command, error::CommandError, outcome::ExecutionOutcome};
use async_trait::async_trait;

/// 可等待的命令契约
///
/// 在 [`Command`] 的同步触发之外，为直接调用方提供可等待完成的入口，
/// 便于以 `Arc<dyn AsyncExecute<E, Output = T>>` 持有。
#[async_trait]
pub trait AsyncExecute<E>: Command
where
    E: Send + 'static,
{
    type Output: Send;

    async fn execute_async(
        &self,
        parameter: Option<E>,
    ) -> Result<ExecutionOutcome<Self::Output>, CommandError>;
}
