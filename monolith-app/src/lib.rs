//! 模块化单体应用入口
//!
//! `ModularMonolithApplication` 是应用描述符，组合根位于 `service::wire`

pub mod service;

pub use service::ApplicationBootstrap;

use monolith_core::{ApplicationDescriptor, ComponentRegistry};

/// 应用描述符
///
/// 无状态标记类型，运行时从这里开始组装应用
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModularMonolithApplication;

impl ApplicationDescriptor for ModularMonolithApplication {
    const NAME: &'static str = "modular-monolith";

    fn configure(registry: &mut ComponentRegistry) -> anyhow::Result<()> {
        service::wire::initialize(registry)
    }
}
