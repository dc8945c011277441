/// 一次受保护执行的结果（失败且未被处理时以 `Err` 返回，不在此列）
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome<T> {
    /// 动作正常完成，携带返回值
    Completed(T),
    /// 动作失败，失败已交由异常处理器
    Handled,
    /// 独占模式下已有执行在途，本次未调用动作
    Skipped,
}

impl<T> ExecutionOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Completed(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Completed(v) => Some(v),
            _ => None,
        }
    }
}
