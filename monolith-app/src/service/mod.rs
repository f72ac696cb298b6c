//! 服务模块 - 仅包含应用启动和组合根
//!
//! 注意：业务模块通过 wire::initialize 注册，此模块不包含业务逻辑

pub mod bootstrap;
pub mod wire;

pub use bootstrap::ApplicationBootstrap;
