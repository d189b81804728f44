use anyhow::Result;
use report_interpreter::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（TOML 文件 + 环境变量）
    let config = Config::load()?;

    // 初始化日志
    logger::init_with_verbose(config.verbose_logging);

    // 初始化并运行应用
    let mut app = App::initialize(config).await?;
    app.run().await?;

    Ok(())
}
