//! 应用启动器 - 把进程参数交给运行时

use monolith_core::{ApplicationRuntime, Result, ServiceRuntime};

use crate::ModularMonolithApplication;

/// 应用启动器
pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 运行应用的主入口点
    ///
    /// 参数不做任何校验或转换，运行时返回的错误原样向上传递
    pub async fn run(args: Vec<String>) -> Result<()> {
        Self::run_with(&ServiceRuntime::new(), args).await
    }

    /// 使用指定的运行时启动应用
    pub async fn run_with<R: ApplicationRuntime>(runtime: &R, args: Vec<String>) -> Result<()> {
        runtime.run::<ModularMonolithApplication>(args).await
    }
}
