//! 组件注册表 - 组合根在这里声明应用由哪些部分组成
//!
//! 注册的顺序即为无依赖关系组件之间的启动顺序

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{BootstrapError, Result};
use crate::runtime::component::{CommandLineRunner, Component};
use crate::runtime::context::ShutdownSignal;
use crate::runtime::events::ApplicationListener;

type TaskFactory = Box<dyn FnOnce(ShutdownSignal) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// 带停机信号的后台任务
pub struct BackgroundTask {
    pub(crate) name: String,
    pub(crate) factory: TaskFactory,
}

/// 组件注册表
#[derive(Default)]
pub struct ComponentRegistry {
    components: Vec<Arc<dyn Component>>,
    runners: Vec<Arc<dyn CommandLineRunner>>,
    listeners: Vec<Arc<dyn ApplicationListener>>,
    tasks: Vec<BackgroundTask>,
}

/// 注册表拆分后的结果，组件已按启动顺序排列
pub(crate) struct RegistryParts {
    pub(crate) components: Vec<Arc<dyn Component>>,
    pub(crate) runners: Vec<Arc<dyn CommandLineRunner>>,
    pub(crate) listeners: Vec<Arc<dyn ApplicationListener>>,
    pub(crate) tasks: Vec<BackgroundTask>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册组件
    pub fn add_component(&mut self, component: Arc<dyn Component>) -> &mut Self {
        self.components.push(component);
        self
    }

    /// 注册命令行运行器
    pub fn add_runner(&mut self, runner: Arc<dyn CommandLineRunner>) -> &mut Self {
        self.runners.push(runner);
        self
    }

    /// 注册生命周期事件监听器
    pub fn add_listener(&mut self, listener: Arc<dyn ApplicationListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    /// 注册后台任务
    ///
    /// 任务在所有组件启动后运行，收到停机信号时应尽快返回
    pub fn spawn_with_shutdown<F, Fut>(&mut self, name: impl Into<String>, task: F) -> &mut Self
    where
        F: FnOnce(ShutdownSignal) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.tasks.push(BackgroundTask {
            name: name.into(),
            factory: Box::new(move |signal| task(signal).boxed()),
        });
        self
    }

    /// 已注册的组件数量
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// 是否没有注册任何内容
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
            && self.runners.is_empty()
            && self.listeners.is_empty()
            && self.tasks.is_empty()
    }

    /// 拆分注册表，并将组件排列为启动顺序
    pub(crate) fn into_parts(self) -> Result<RegistryParts> {
        let components = order_components(self.components)?;
        Ok(RegistryParts {
            components,
            runners: self.runners,
            listeners: self.listeners,
            tasks: self.tasks,
        })
    }
}

/// 稳定拓扑排序：每一步选出依赖已全部就绪、注册顺序最靠前的组件
fn order_components(components: Vec<Arc<dyn Component>>) -> Result<Vec<Arc<dyn Component>>> {
    let mut index_by_name: HashMap<String, usize> = HashMap::new();
    for (index, component) in components.iter().enumerate() {
        if index_by_name
            .insert(component.name().to_string(), index)
            .is_some()
        {
            return Err(BootstrapError::DuplicateComponent(
                component.name().to_string(),
            ));
        }
    }

    let mut dependencies: Vec<Vec<usize>> = Vec::with_capacity(components.len());
    for component in &components {
        let mut resolved = Vec::new();
        for dependency in component.depends_on() {
            let Some(&index) = index_by_name.get(&dependency) else {
                return Err(BootstrapError::MissingDependency {
                    component: component.name().to_string(),
                    dependency,
                });
            };
            resolved.push(index);
        }
        dependencies.push(resolved);
    }

    let mut placed = vec![false; components.len()];
    let mut order = Vec::with_capacity(components.len());

    while order.len() < components.len() {
        let next = (0..components.len()).find(|&index| {
            !placed[index] && dependencies[index].iter().all(|&dep| placed[dep])
        });

        match next {
            Some(index) => {
                placed[index] = true;
                order.push(index);
            }
            None => {
                let cycle = find_cycle(&dependencies, &placed)
                    .into_iter()
                    .map(|index| components[index].name().to_string())
                    .collect();
                return Err(BootstrapError::DependencyCycle(cycle));
            }
        }
    }

    Ok(order
        .into_iter()
        .map(|index| components[index].clone())
        .collect())
}

/// 剩余的每个组件都至少有一个未就绪的依赖，沿依赖前进必然回到访问过的节点
fn find_cycle(dependencies: &[Vec<usize>], placed: &[bool]) -> Vec<usize> {
    let Some(start) = (0..placed.len()).find(|&index| !placed[index]) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&next) = dependencies[current].iter().find(|&&dep| !placed[dep]) else {
            return path;
        };
        if let Some(position) = path.iter().position(|&index| index == next) {
            let mut cycle = path.split_off(position);
            cycle.push(next);
            return cycle;
        }
        path.push(next);
        current = next;
    }
}
