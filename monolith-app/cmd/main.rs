use anyhow::Result;
use monolith_app::ApplicationBootstrap;

#[tokio::main]
async fn main() -> Result<()> {
    // 参数原样交给运行时，进程生命周期由运行时接管
    ApplicationBootstrap::run(std::env::args().skip(1).collect()).await?;
    Ok(())
}
