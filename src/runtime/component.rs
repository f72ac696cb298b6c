//! 组件与命令行运行器接口

use async_trait::async_trait;

use crate::args::ApplicationArguments;
use crate::runtime::context::ApplicationContext;

/// 受运行时管理生命周期的组件
///
/// 启动顺序由 `depends_on` 决定，停止顺序与启动顺序相反。
#[async_trait]
pub trait Component: Send + Sync {
    /// 组件名称，在同一个应用中必须唯一
    fn name(&self) -> &str;

    /// 依赖的组件名称
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// 启动组件
    async fn start(&self, context: &ApplicationContext) -> anyhow::Result<()>;

    /// 停止组件
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 命令行运行器
///
/// 所有组件启动完成后，按注册顺序执行一次。
#[async_trait]
pub trait CommandLineRunner: Send + Sync {
    /// 运行器名称
    fn name(&self) -> &str;

    /// 执行
    async fn run(&self, args: &ApplicationArguments) -> anyhow::Result<()>;
}
