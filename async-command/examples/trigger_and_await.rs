use async_command::{AsyncCommand, CommandOptions, unhandled};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let load = AsyncCommand::<u32, u32, String>::builder(|page| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(format!("page {}", page.unwrap_or(1)))
    })
    .can_execute(|page| page.is_none_or(|p| *p > 0))
    .options(CommandOptions::builder().name("load-page").build())
    .build();

    // 等待完成
    let out = load.execute_async(Some(3)).await?;
    println!("execute_async -> {:?}", out.into_value());

    // 同步触发，失败且未配置异常处理器时进入未处理失败信号
    let mut failures = unhandled::subscribe();
    let broken = AsyncCommand::<(), (), ()>::from_fn(|| async { anyhow::bail!("backend offline") })
        .options(CommandOptions::builder().name("sync").build())
        .build();
    broken.trigger(None);

    let failure = failures.recv().await?;
    eprintln!("unhandled failure in {}: {}", failure.command(), failure.error());
    Ok(())
}
