use crate::command::{Command, Parameter};
use crate::error::{CommandError, CommandResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::debug;

/// 基于内存的命令绑定表
/// - 以控件名称为键持有 `Arc<dyn Command>`
/// - 激活时先查询 `can_execute`，可执行才调用同步的 `execute`
/// - 不做调度：每次激活只对应一次 `execute`
pub struct CommandBindings {
    commands: DashMap<String, Arc<dyn Command>>,
}

impl Default for CommandBindings {
    fn default() -> Self {
        Self {
            commands: DashMap::new(),
        }
    }
}

impl CommandBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定命令到控件
    pub fn bind(
        &self,
        name: impl Into<String>,
        command: Arc<dyn Command>,
    ) -> CommandResult<()> {
        match self.commands.entry(name.into()) {
            Entry::Occupied(e) => Err(CommandError::AlreadyBound(e.key().clone())),
            Entry::Vacant(e) => {
                debug!(control = %e.key(), "command bound");
                e.insert(command);
                Ok(())
            }
        }
    }

    /// 解除绑定，返回原命令
    pub fn unbind(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.remove(name).map(|(_, command)| command)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).map(|c| c.value().clone())
    }

    /// 控件当前是否可用
    pub fn can_activate(
        &self,
        name: &str,
        parameter: Option<&Parameter>,
    ) -> CommandResult<bool> {
        self.lookup(name)?.can_execute(parameter)
    }

    /// 激活控件；不可执行时不触发并返回 `Ok(false)`
    pub fn activate(&self, name: &str, parameter: Option<Parameter>) -> CommandResult<bool> {
        let command = self.lookup(name)?;

        if !command.can_execute(parameter.as_ref())? {
            debug!(
                control = %name,
                parameter = parameter.as_ref().map(Parameter::type_name),
                "activation ignored: command cannot execute"
            );
            return Ok(false);
        }

        command.execute(parameter)?;
        Ok(true)
    }

    /// 已绑定的控件名称（只读视图）
    pub fn bound_names(&self) -> Vec<String> {
        self.commands.iter().map(|e| e.key().clone()).collect()
    }

    fn lookup(&self, name: &str) -> CommandResult<Arc<dyn Command>> {
        // 先克隆出命令再释放分片锁，避免在持锁期间回调
        self.get(name)
            .ok_or_else(|| CommandError::NotBound(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AsyncCommand;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    fn counting_command(runs: Arc<AtomicUsize>, done: Arc<Notify>) -> Arc<dyn Command> {
        Arc::new(AsyncCommand::<(), (), ()>::from_fn(move || {
            let runs = runs.clone();
            let done = done.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                done.notify_one();
                Ok(())
            }
        })
        .build())
    }

    #[tokio::test]
    async fn activate_triggers_bound_command() {
        let bindings = CommandBindings::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(Notify::new());
        bindings
            .bind("refresh", counting_command(runs.clone(), done.clone()))
            .unwrap();

        assert!(bindings.activate("refresh", None).unwrap());

        timeout(Duration::from_secs(5), done.notified()).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_bind_is_rejected() {
        let bindings = CommandBindings::new();
        let done = Arc::new(Notify::new());
        let runs = Arc::new(AtomicUsize::new(0));
        bindings
            .bind("save", counting_command(runs.clone(), done.clone()))
            .unwrap();

        let err = bindings
            .bind("save", counting_command(runs, done))
            .unwrap_err();

        assert!(matches!(err, CommandError::AlreadyBound(name) if name == "save"));
        assert_eq!(bindings.bound_names(), vec!["save".to_string()]);
    }

    #[test]
    fn unknown_control_is_not_bound() {
        let bindings = CommandBindings::new();

        let err = bindings.activate("missing", None).unwrap_err();

        assert!(matches!(err, CommandError::NotBound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn ineligible_command_is_not_triggered() {
        let enabled = Arc::new(AtomicBool::new(false));
        let runs = Arc::new(AtomicUsize::new(0));
        let cmd = {
            let enabled = enabled.clone();
            let runs = runs.clone();
            AsyncCommand::<(), (), ()>::from_fn(move || {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .can_execute(move |_| enabled.load(Ordering::SeqCst))
            .build()
        };
        let bindings = CommandBindings::new();
        bindings.bind("delete", Arc::new(cmd)).unwrap();

        assert!(!bindings.can_activate("delete", None).unwrap());
        assert!(!bindings.activate("delete", None).unwrap());

        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unbind_returns_command() {
        let bindings = CommandBindings::new();
        let cmd: Arc<dyn Command> =
            Arc::new(AsyncCommand::<(), (), ()>::from_fn(|| async { Ok(()) }).build());
        bindings.bind("close", cmd).unwrap();

        assert!(bindings.unbind("close").is_some());
        assert!(bindings.get("close").is_none());
        assert!(bindings.bound_names().is_empty());
    }
}
