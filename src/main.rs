#![recursion_limit = "256"]

mod api;
mod app;
mod config;

use tracing::info;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = app::logger::init("logs", "scan_answer");

    // 配置一次性加载为不可变值，显式传入管线
    let config = AppConfig::load()?;

    if let Err(e) = app::workflow::pipeline::run(&config).await {
        tracing::error!("Pipeline 执行失败: {:?}", e);
        return Err(e);
    }
    info!("========== 所有页面处理完成 ==========");

    Ok(())
}
