use crate::error::{CommandError, CommandResult};
use std::any::{Any, type_name};
use tokio::sync::broadcast;

/// 绑定框架侧的命令契约（Command）
///
/// 绑定框架以 `Arc<dyn Command>` 持有命令：
/// - 通过 `can_execute` 决定是否启用/触发绑定的控件；
/// - 用户激活控件时调用同步的 `execute`，该调用立即返回，不等待动作完成；
/// - 通过 `can_execute_changed` 订阅可执行状态变化，重新查询 `can_execute`。
///
/// 参数以类型擦除的 [`Parameter`] 传递，命令在使用前校验其具体类型；
/// `None` 表示“无参数”，始终合法。
pub trait Command: Send + Sync {
    /// 评估可执行谓词；参数类型不匹配时返回 `InvalidParameter`
    fn can_execute(&self, parameter: Option<&Parameter>) -> CommandResult<bool>;

    /// 同步触发执行（不检查 `can_execute`）；参数类型不匹配时同步返回错误且不启动动作
    fn execute(&self, parameter: Option<Parameter>) -> CommandResult<()>;

    /// 订阅 `CanExecuteChanged` 通知
    fn can_execute_changed(&self) -> broadcast::Receiver<()>;

    /// 通知订阅方重新评估 `can_execute`
    fn raise_can_execute_changed(&self);
}

/// 类型擦除的命令参数
pub struct Parameter {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Parameter {
    pub fn new<P: Any + Send>(value: P) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<P>(),
        }
    }

    /// 构造时的具体类型名
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<P: Any>(&self) -> bool {
        self.value.is::<P>()
    }

    pub fn downcast_ref<P: Any>(&self) -> CommandResult<&P> {
        self.value
            .downcast_ref::<P>()
            .ok_or(CommandError::InvalidParameter {
                expected: type_name::<P>(),
                found: self.type_name,
            })
    }

    pub fn downcast<P: Any>(self) -> CommandResult<P> {
        let found = self.type_name;
        match self.value.downcast::<P>() {
            Ok(v) => Ok(*v),
            Err(_) => Err(CommandError::InvalidParameter {
                expected: type_name::<P>(),
                found,
            }),
        }
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}
