//! # 应用运行时模块
//!
//! 启动入口把进程参数和应用描述符交给运行时，之后进程的生命周期由运行时负责：
//! - 解析参数、加载配置、初始化日志
//! - 通过描述符的组合根注册组件
//! - 按依赖顺序启动组件，运行后台任务与命令行运行器
//! - 等待停止信号并优雅停机

use async_trait::async_trait;

use crate::error::Result;

pub mod component;
pub mod context;
pub mod events;
pub mod registry;
pub mod service_runtime;

pub use component::{CommandLineRunner, Component};
pub use context::{ApplicationContext, ShutdownHandle, ShutdownSignal};
pub use events::{ApplicationEvent, ApplicationListener};
pub use registry::ComponentRegistry;
pub use service_runtime::ServiceRuntime;

/// 应用描述符
///
/// 无状态的标记类型，标识运行时从哪个配置根开始组装应用。
/// `configure` 是显式的组合根：按依赖顺序注册组件，默认不注册任何组件。
pub trait ApplicationDescriptor: Send + Sync + 'static {
    /// 应用名称（配置中未指定 `application.name` 时使用）
    const NAME: &'static str;

    /// 组合根
    fn configure(_registry: &mut ComponentRegistry) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 应用运行时
///
/// 接收描述符与原始参数后接管进程，直到应用停止才返回。
#[async_trait]
pub trait ApplicationRuntime: Send + Sync {
    /// 以描述符 `D` 启动应用
    async fn run<D: ApplicationDescriptor>(&self, args: Vec<String>) -> Result<()>;
}
