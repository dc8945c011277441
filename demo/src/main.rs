use async_command::{
    AsyncCommand, CommandBindings, CommandError, CommandOptions, Parameter, unhandled,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 模拟视图模型：一个“刷新”命令（UI 线程继续）、一个带谓词的“保存”命令、
/// 以及一个总是失败的“同步”命令
struct ViewModel {
    refresh: AsyncCommand<(), (), ()>,
    save: AsyncCommand<String, String, ()>,
    sync: AsyncCommand<(), (), ()>,
    dirty: Arc<AtomicBool>,
}

impl ViewModel {
    fn new(events: mpsc::UnboundedSender<String>) -> Self {
        let dirty = Arc::new(AtomicBool::new(false));

        let refresh = {
            let events = events.clone();
            AsyncCommand::from_fn(move || {
                let events = events.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    // 仍在 UI 线程上
                    let _ = events.send(format!("refreshed on {:?}", std::thread::current().id()));
                    Ok(())
                }
            })
            .options(
                CommandOptions::builder()
                    .name("refresh")
                    .continue_on_captured_context(true)
                    .exclusive(true)
                    .build(),
            )
            .build()
        };

        let save = {
            let events = events.clone();
            let dirty_for_save = dirty.clone();
            let dirty_for_check = dirty.clone();
            AsyncCommand::<String, String, ()>::builder(move |title| {
                let events = events.clone();
                let dirty = dirty_for_save.clone();
                async move {
                    let title = title.ok_or_else(|| anyhow::anyhow!("missing title"))?;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    dirty.store(false, Ordering::SeqCst);
                    let _ = events.send(format!("saved {title:?}"));
                    Ok(())
                }
            })
            .can_execute(move |title| {
                dirty_for_check.load(Ordering::SeqCst) && title.is_some_and(|t| !t.is_empty())
            })
            .on_exception(|err| warn!(error = %err, "save failed"))
            .options(CommandOptions::builder().name("save").build())
            .build()
        };

        let sync = AsyncCommand::from_fn(|| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err(anyhow::anyhow!("backend offline"))
        })
        .options(CommandOptions::builder().name("sync").build())
        .build();

        Self {
            refresh,
            save,
            sync,
            dirty,
        }
    }

    fn edit(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.save.raise_can_execute_changed();
    }
}

async fn run_ui() -> Result<(), CommandError> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let vm = ViewModel::new(events_tx);
    let mut failures = unhandled::subscribe();

    let bindings = CommandBindings::new();
    bindings.bind("refresh-button", Arc::new(vm.refresh.clone()))?;
    bindings.bind("save-button", Arc::new(vm.save.clone()))?;
    bindings.bind("sync-button", Arc::new(vm.sync.clone()))?;
    info!(controls = ?bindings.bound_names(), "controls bound");

    let mut save_changed = vm.save.subscribe_can_execute_changed();

    // 用户点击：框架查询 can_execute 后同步触发
    bindings.activate("refresh-button", None)?;
    let fired = bindings.activate("save-button", Some(Parameter::new("notes".to_string())))?;
    info!(fired, "save clicked before editing");

    vm.edit();
    if save_changed.recv().await.is_ok() {
        let fired = bindings.activate("save-button", Some(Parameter::new("notes".to_string())))?;
        info!(fired, "save clicked after editing");
    }

    bindings.activate("sync-button", None)?;

    // 直接调用方：等待完成
    let out = vm.refresh.execute_async(None).await?;
    info!(?out, "refresh awaited");

    // refresh 为独占命令：若按钮触发的那次仍在途，本次等待返回 Skipped
    let mut pending = if out.is_completed() { 3 } else { 2 };
    while pending > 0 {
        tokio::select! {
            Some(event) = events_rx.recv() => {
                info!(%event, "view model event");
                pending -= 1;
            }
            Ok(failure) = failures.recv() => {
                warn!(
                    command = failure.command(),
                    error = %failure.error(),
                    "unhandled failure observed"
                );
            }
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // 单线程运行时 + LocalSet 作为“UI 线程”
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let ui = LocalSet::new();

    ui.block_on(&rt, run_ui())?;
    Ok(())
}
