//! 异步命令（async-command）
//!
//! 让 UI 绑定框架的同步命令契约安全地驱动异步动作：
//! - [`AsyncCommand`]：执行保护，提供同步 `trigger` 与可等待的 `execute_async`，
//!   跟踪执行状态，并把失败路由到异常处理器；
//! - [`Command`] / [`AsyncExecute`]：绑定框架与直接调用方使用的契约；
//! - [`CommandOptions`]：名称、继续上下文策略、独占等配置；
//! - [`unhandled`]：没有等待方也没有异常处理器的失败的观察通道；
//! - [`CommandBindings`]：按控件名称持有命令的最小绑定表。
//!
//! 本 crate 只是单次执行的保护层，不负责多个命令的调度。
//!
pub mod async_command;
pub mod async_execute;
pub mod bindings;
pub mod command;
pub mod error;
mod guard;
pub mod options;
pub mod outcome;
pub mod unhandled;

pub use async_command::{AsyncCommand, AsyncCommandBuilder};
pub use async_execute::AsyncExecute;
pub use bindings::CommandBindings;
pub use command::{Command, Parameter};
pub use error::{CommandError, CommandResult};
pub use options::CommandOptions;
pub use outcome::ExecutionOutcome;
