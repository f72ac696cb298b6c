//! 统一错误类型模块
//!
//! - 启动流程中所有失败都归为 `BootstrapError`
//! - `analyze` 为失败生成诊断说明（描述 + 建议操作），由运行时在启动失败时输出

use thiserror::Error;

/// 启动器错误类型
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// 命令行参数语法错误
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 配置加载或解析错误
    #[error("Configuration error: {0:#}")]
    Configuration(#[source] anyhow::Error),

    /// 组件名称重复
    #[error("Duplicate component: {0}")]
    DuplicateComponent(String),

    /// 组件依赖了未注册的组件
    #[error("Component '{component}' depends on unknown component '{dependency}'")]
    MissingDependency {
        component: String,
        dependency: String,
    },

    /// 组件之间存在循环依赖
    #[error("Dependency cycle between components: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// 组件启动失败
    #[error("Component '{component}' failed to start: {source:#}")]
    ComponentStart {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    /// 命令行运行器执行失败
    #[error("Runner '{runner}' failed: {source:#}")]
    RunnerFailed {
        runner: String,
        #[source]
        source: anyhow::Error,
    },

    /// 后台任务失败
    #[error("Background task '{task}' failed: {source:#}")]
    BackgroundTask {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// 同一个运行时实例被重复启动
    #[error("Runtime already started application '{0}'")]
    AlreadyRunning(String),

    /// 停止信号监听失败
    #[error("Signal handling error: {0}")]
    Signal(#[from] std::io::Error),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 启动器结果类型
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// 启动失败诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureAnalysis {
    /// 失败描述
    pub description: String,
    /// 建议操作
    pub action: String,
}

impl BootstrapError {
    /// 为启动失败生成诊断信息
    pub fn analyze(&self) -> FailureAnalysis {
        let action = match self {
            BootstrapError::InvalidArgument(_) => {
                "Pass options as --name or --name=value; a name is required after '--'."
            }
            BootstrapError::Configuration(_) => {
                "Check config.location, the base.toml file and any active profile files."
            }
            BootstrapError::DuplicateComponent(_) => {
                "Give every component registered in the composition root a unique name."
            }
            BootstrapError::MissingDependency { .. } => {
                "Register the missing component or remove it from depends_on."
            }
            BootstrapError::DependencyCycle(_) => {
                "Break the cycle so that components can be started in a single order."
            }
            BootstrapError::ComponentStart { .. } => {
                "Inspect the component error above; started components were stopped."
            }
            BootstrapError::RunnerFailed { .. } => {
                "Inspect the runner error above; the application was shut down."
            }
            BootstrapError::BackgroundTask { .. } => {
                "Inspect the task error above; the application was shut down."
            }
            BootstrapError::AlreadyRunning(_) => {
                "Create a new runtime for every application start."
            }
            BootstrapError::Signal(_) => "Check that the process may install signal handlers.",
            BootstrapError::Other(_) => "Inspect the error chain above.",
        };

        FailureAnalysis {
            description: self.to_string(),
            action: action.to_string(),
        }
    }
}
