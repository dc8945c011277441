//! 命令层统一错误定义
//!
//! 覆盖动作失败、panic 捕获、运行时缺失、绑定参数类型校验与绑定表管理，
//! 便于异常处理器与绑定框架按同一类型进行匹配。
//!
use std::fmt::{Debug, Display};
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CommandError {
    // --- 动作执行 ---
    #[error(transparent)]
    Action(#[from] anyhow::Error),

    #[error("action panicked: {0}")]
    Panicked(String),

    #[error("execution task cancelled before completion")]
    Cancelled,

    #[error("no tokio runtime available to run the command")]
    NoRuntime,

    // --- 绑定框架 ---
    #[error("invalid command parameter: expected={expected}, found={found}")]
    InvalidParameter {
        expected: &'static str,
        found: &'static str,
    },

    #[error("command already bound: {0}")]
    AlreadyBound(String),

    #[error("command not bound: {0}")]
    NotBound(String),
}

impl CommandError {
    /// 动作返回的原始错误（仅 `Action` 变体）
    pub fn action_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Action(err) => Some(err),
            _ => None,
        }
    }

    /// 尝试将动作错误还原为具体类型
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        self.action_error().and_then(|err| err.downcast_ref::<E>())
    }
}

pub type CommandResult<T> = Result<T, CommandError>;
