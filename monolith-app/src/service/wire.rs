//! Wire 风格的组合根
//!
//! 按依赖顺序把业务模块注册到运行时。当前仓库没有业务模块，组合根为空。

use anyhow::Result;
use monolith_core::ComponentRegistry;
use tracing::debug;

/// 构建应用
///
/// # 参数
/// * `registry` - 组件注册表
pub fn initialize(registry: &mut ComponentRegistry) -> Result<()> {
    debug!(
        components = registry.component_count(),
        "composition root has no modules to register"
    );
    Ok(())
}
