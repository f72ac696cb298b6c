//! Monolith Core 公共库
//!
//! 提供应用运行时：参数解析、分层配置加载、日志初始化、组件注册与生命周期管理

pub mod args;
pub mod config;
pub mod error;
pub mod runtime;
pub mod tracing;

pub use args::ApplicationArguments;
pub use config::{
    AppConfig, ApplicationConfig, ConfigLoader, ConfigManager, ConfigSource, LifecycleConfig,
    LogFormat, LoggingConfig, ProfilesConfig,
};
pub use error::{BootstrapError, FailureAnalysis, Result};
pub use runtime::{
    ApplicationContext, ApplicationDescriptor, ApplicationEvent, ApplicationListener,
    ApplicationRuntime, CommandLineRunner, Component, ComponentRegistry, ServiceRuntime,
    ShutdownHandle, ShutdownSignal,
};
