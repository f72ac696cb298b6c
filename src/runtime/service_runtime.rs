//! 服务运行时 - 默认的应用运行时实现
//!
//! 启动顺序：
//! 1. 解析参数、加载配置、初始化日志
//! 2. 执行描述符的组合根
//! 3. 按依赖顺序启动组件，启动后台任务，执行命令行运行器
//! 4. 存在后台任务或配置了 keep_alive 时等待停止信号
//! 5. 停止后台任务，按启动的相反顺序停止组件

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::args::ApplicationArguments;
use crate::config::{ConfigLoader, ConfigSource};
use crate::error::{BootstrapError, Result};
use crate::runtime::component::Component;
use crate::runtime::context::ApplicationContext;
use crate::runtime::events::{ApplicationEvent, ApplicationListener, EventPublisher};
use crate::runtime::registry::{BackgroundTask, ComponentRegistry};
use crate::runtime::{ApplicationDescriptor, ApplicationRuntime};

type TaskOutcome = (String, std::result::Result<anyhow::Result<()>, JoinError>);

/// 服务运行时
///
/// 同一个实例只能启动一次应用
pub struct ServiceRuntime {
    listeners: Vec<Arc<dyn ApplicationListener>>,
    env: Option<Vec<(String, String)>>,
    config_locations: Option<Vec<PathBuf>>,
    started: AtomicBool,
}

impl Default for ServiceRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRuntime {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            env: None,
            config_locations: None,
            started: AtomicBool::new(false),
        }
    }

    /// 添加监听器，可以收到包括 starting 在内的全部事件
    pub fn with_listener(mut self, listener: Arc<dyn ApplicationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 使用给定的环境变量代替进程环境变量
    pub fn with_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env = Some(vars.into_iter().collect());
        self
    }

    /// 未指定 `config.location` 时的候选配置位置
    pub fn with_config_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.config_locations = Some(locations);
        self
    }

    /// 执行启动阶段，返回是否需要保持运行
    async fn start<D: ApplicationDescriptor>(
        &self,
        args: Vec<String>,
        launched_at: Instant,
        publisher: &mut EventPublisher,
        state: &mut RunState,
    ) -> Result<bool> {
        let arguments = Arc::new(ApplicationArguments::parse(args)?);

        let env = self
            .env
            .clone()
            .unwrap_or_else(|| std::env::vars().collect());
        let mut loader = ConfigLoader::new(&arguments).with_env(env);
        if let Some(locations) = &self.config_locations {
            loader = loader.with_default_locations(locations.clone());
        }
        let config = Arc::new(loader.load().map_err(BootstrapError::Configuration)?);

        crate::tracing::init_tracing_from_config(Some(&config.logging));
        log_config_source(config.source());
        state.shutdown_timeout = Duration::from_secs(config.lifecycle.shutdown_timeout_secs);

        let name = config.application_name(D::NAME);
        info!(
            application = %name,
            version = config.application.version.as_deref().unwrap_or("unknown"),
            pid = std::process::id(),
            descriptor = std::any::type_name::<D>(),
            "Starting application"
        );
        let profiles = config.active_profiles();
        info!(profiles = ?profiles, "Active profiles");
        publisher.publish(ApplicationEvent::EnvironmentPrepared { profiles });

        let context = Arc::new(ApplicationContext::new(
            name,
            config.clone(),
            arguments.clone(),
        ));
        state.context = Some(context.clone());

        let mut registry = ComponentRegistry::new();
        D::configure(&mut registry)
            .map_err(|err| BootstrapError::Other(err.context("composition root failed")))?;
        let parts = registry.into_parts()?;
        publisher.extend(parts.listeners);
        publisher.publish(ApplicationEvent::ContextPrepared {
            context_id: context.id(),
        });

        for component in parts.components {
            info!(component = component.name(), "Starting component");
            component
                .start(&context)
                .await
                .map_err(|source| BootstrapError::ComponentStart {
                    component: component.name().to_string(),
                    source,
                })?;
            state.started.push(component);
        }

        for task in parts.tasks {
            state.spawn(task, &context);
        }

        for runner in parts.runners {
            info!(runner = runner.name(), "Running command line runner");
            runner
                .run(&arguments)
                .await
                .map_err(|source| BootstrapError::RunnerFailed {
                    runner: runner.name().to_string(),
                    source,
                })?;
        }

        let elapsed = launched_at.elapsed();
        info!(
            application = %context.name(),
            context_id = %context.id(),
            "Started {} in {:.3} seconds",
            context.name(),
            elapsed.as_secs_f64()
        );
        publisher.publish(ApplicationEvent::Started { elapsed });

        Ok(config.lifecycle.keep_alive)
    }

    /// 等待应用结束：停止信号、停机请求、后台任务全部结束或任一失败
    async fn await_termination(&self, state: &mut RunState, keep_alive: bool) -> Result<()> {
        let Some(context) = state.context.clone() else {
            return Ok(());
        };

        if state.tasks.is_empty() && !keep_alive {
            info!("No background tasks, application will stop");
            return Ok(());
        }

        info!("Application running, press Ctrl+C to stop...");
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("shutdown signal received (Ctrl+C)");
                    return Ok(());
                }
                _ = context.shutdown_handle().subscribe().wait() => {
                    info!("shutdown requested");
                    return Ok(());
                }
                joined = state.tasks.join_next(), if !state.tasks.is_empty() => {
                    let Some((task, outcome)) = joined.transpose().ok().flatten() else {
                        warn!("background task collector failed");
                        if state.tasks.is_empty() && !keep_alive {
                            return Ok(());
                        }
                        continue;
                    };
                    match outcome {
                        Ok(Ok(())) => {
                            info!(task = %task, "background task finished");
                            if state.tasks.is_empty() && !keep_alive {
                                return Ok(());
                            }
                        }
                        Ok(Err(source)) => {
                            return Err(BootstrapError::BackgroundTask { task, source });
                        }
                        Err(join_error) => {
                            return Err(BootstrapError::BackgroundTask {
                                task,
                                source: anyhow::anyhow!(join_error.to_string()),
                            });
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ApplicationRuntime for ServiceRuntime {
    async fn run<D: ApplicationDescriptor>(&self, args: Vec<String>) -> Result<()> {
        let mut publisher = EventPublisher::new(self.listeners.clone());
        if self.started.swap(true, Ordering::SeqCst) {
            let err = BootstrapError::AlreadyRunning(D::NAME.to_string());
            publisher.publish(ApplicationEvent::Failed {
                error: err.to_string(),
            });
            report_failure(&err);
            return Err(err);
        }

        let launched_at = Instant::now();
        publisher.publish(ApplicationEvent::Starting {
            descriptor: std::any::type_name::<D>(),
        });

        let mut state = RunState::default();
        let outcome = match self
            .start::<D>(args, launched_at, &mut publisher, &mut state)
            .await
        {
            Ok(keep_alive) => {
                publisher.publish(ApplicationEvent::Ready);
                self.await_termination(&mut state, keep_alive).await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                publisher.publish(ApplicationEvent::Stopping);
                state.teardown().await;
                publisher.publish(ApplicationEvent::Stopped);
                info!("Application stopped");
                Ok(())
            }
            Err(err) => {
                publisher.publish(ApplicationEvent::Failed {
                    error: err.to_string(),
                });
                state.teardown().await;
                report_failure(&err);
                Err(err)
            }
        }
    }
}

/// 单次运行的可回收资源
struct RunState {
    context: Option<Arc<ApplicationContext>>,
    started: Vec<Arc<dyn Component>>,
    tasks: JoinSet<TaskOutcome>,
    aborts: Vec<AbortHandle>,
    shutdown_timeout: Duration,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            context: None,
            started: Vec::new(),
            tasks: JoinSet::new(),
            aborts: Vec::new(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl RunState {
    /// 启动后台任务
    ///
    /// 任务运行在独立的 tokio 任务中，外层只负责收集结果，任务 panic 也能拿到名称
    fn spawn(&mut self, task: BackgroundTask, context: &ApplicationContext) {
        let BackgroundTask { name, factory } = task;
        info!(task = %name, "Spawning background task");

        let handle = tokio::spawn(factory(context.shutdown_handle().subscribe()));
        self.aborts.push(handle.abort_handle());
        self.tasks.spawn(async move { (name, handle.await) });
    }

    /// 停机：通知后台任务，超时后强制终止，再按相反顺序停止组件
    async fn teardown(&mut self) {
        if let Some(context) = &self.context {
            context.shutdown_handle().request_shutdown();
        }

        if !self.tasks.is_empty() {
            let tasks = &mut self.tasks;
            let drained = tokio::time::timeout(self.shutdown_timeout, async {
                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok((task, Ok(Ok(())))) => info!(task = %task, "background task stopped"),
                        Ok((task, Ok(Err(e)))) => {
                            warn!(task = %task, error = %e, "background task stopped with error")
                        }
                        Ok((task, Err(e))) => {
                            warn!(task = %task, error = %e, "background task aborted")
                        }
                        Err(e) => warn!(error = %e, "background task collector failed"),
                    }
                }
            })
            .await;

            if drained.is_err() {
                warn!(
                    timeout_secs = self.shutdown_timeout.as_secs(),
                    "timed out waiting for background tasks, aborting"
                );
                for abort in self.aborts.drain(..) {
                    abort.abort();
                }
                self.tasks.abort_all();
            }
        }

        while let Some(component) = self.started.pop() {
            info!(component = component.name(), "Stopping component");
            if let Err(e) = component.stop().await {
                warn!(component = component.name(), error = %e, "component failed to stop");
            }
        }
    }
}

/// 输出配置来源，加载配置时日志尚未初始化
fn log_config_source(source: &ConfigSource) {
    for candidate in &source.missing_candidates {
        debug!("config candidate {} not found", candidate.display());
    }
    match &source.location {
        Some(location) => info!(location = %location.display(), "Loaded configuration"),
        None => warn!("no configuration source found, falling back to defaults"),
    }
    for profile in &source.loaded_profiles {
        info!(profile = %profile, "Loaded profile configuration");
    }
}

/// 输出启动失败诊断信息
fn report_failure(err: &BootstrapError) {
    crate::tracing::init_tracing_from_config(None);
    let analysis = err.analyze();
    error!(
        description = %analysis.description,
        action = %analysis.action,
        "APPLICATION FAILED TO START"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn context() -> Arc<ApplicationContext> {
        Arc::new(ApplicationContext::new(
            "collector-test".to_string(),
            Arc::new(AppConfig::default()),
            Arc::new(ApplicationArguments::parse(Vec::new()).unwrap()),
        ))
    }

    async fn crashing_collector() -> TaskOutcome {
        panic!("collector crashed")
    }

    #[tokio::test]
    async fn test_collector_failure_on_last_task_stops_waiting() {
        let runtime = ServiceRuntime::new();
        let mut state = RunState {
            context: Some(context()),
            ..RunState::default()
        };
        state.tasks.spawn(crashing_collector());

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            runtime.await_termination(&mut state, false),
        )
        .await
        .expect("waiting did not stop after the last task was collected");

        assert!(outcome.is_ok());
        assert!(state.tasks.is_empty());
    }
}
