//! 应用生命周期事件

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

/// 生命周期事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationEvent {
    /// 运行时开始启动
    Starting { descriptor: &'static str },
    /// 配置已加载
    EnvironmentPrepared { profiles: Vec<String> },
    /// 上下文已创建，组合根已执行
    ContextPrepared { context_id: Uuid },
    /// 组件已启动，运行器已执行
    Started { elapsed: Duration },
    /// 应用进入运行状态
    Ready,
    /// 开始停机
    Stopping,
    /// 停机完成
    Stopped,
    /// 启动或运行失败
    Failed { error: String },
}

impl ApplicationEvent {
    /// 事件名称
    pub fn name(&self) -> &'static str {
        match self {
            ApplicationEvent::Starting { .. } => "starting",
            ApplicationEvent::EnvironmentPrepared { .. } => "environment_prepared",
            ApplicationEvent::ContextPrepared { .. } => "context_prepared",
            ApplicationEvent::Started { .. } => "started",
            ApplicationEvent::Ready => "ready",
            ApplicationEvent::Stopping => "stopping",
            ApplicationEvent::Stopped => "stopped",
            ApplicationEvent::Failed { .. } => "failed",
        }
    }
}

/// 生命周期事件监听器
pub trait ApplicationListener: Send + Sync {
    fn on_event(&self, event: &ApplicationEvent);
}

/// 事件发布器
#[derive(Clone, Default)]
pub(crate) struct EventPublisher {
    listeners: Vec<Arc<dyn ApplicationListener>>,
}

impl EventPublisher {
    pub(crate) fn new(listeners: Vec<Arc<dyn ApplicationListener>>) -> Self {
        Self { listeners }
    }

    pub(crate) fn extend(&mut self, listeners: Vec<Arc<dyn ApplicationListener>>) {
        self.listeners.extend(listeners);
    }

    pub(crate) fn publish(&self, event: ApplicationEvent) {
        tracing::debug!(event = event.name(), "publishing application event");
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}
