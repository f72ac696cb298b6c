//! 应用上下文 - 每次启动创建一次，交给所有组件共享

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::args::ApplicationArguments;
use crate::config::AppConfig;

/// 应用上下文
#[derive(Debug, Clone)]
pub struct ApplicationContext {
    id: Uuid,
    name: String,
    started_at: DateTime<Utc>,
    config: Arc<AppConfig>,
    args: Arc<ApplicationArguments>,
    shutdown: ShutdownHandle,
}

impl ApplicationContext {
    /// 创建应用上下文
    pub fn new(name: String, config: Arc<AppConfig>, args: Arc<ApplicationArguments>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            started_at: Utc::now(),
            config,
            args,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// 上下文 ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 应用名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 启动时间
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// 应用配置
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 启动参数
    pub fn args(&self) -> &ApplicationArguments {
        &self.args
    }

    /// 停机句柄
    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown
    }
}

/// 停机句柄，任何组件都可以通过它请求应用停止
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// 请求停机
    pub fn request_shutdown(&self) {
        self.sender.send_replace(true);
    }

    /// 是否已请求停机
    pub fn is_shutdown_requested(&self) -> bool {
        *self.sender.borrow()
    }

    /// 订阅停机信号
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// 停机信号
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// 等待停机，句柄被释放时同样视为停机
    pub async fn wait(mut self) {
        let _ = self.receiver.wait_for(|stop| *stop).await;
    }

    /// 是否已请求停机
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}
