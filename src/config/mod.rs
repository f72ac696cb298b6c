//! Monolith Core 配置模块
//!
//! 该模块提供了分层的应用配置加载功能，包括：
//! - 配置文件或配置目录加载和合并
//! - 按激活的 profile 加载环境特定配置
//! - 环境变量与命令行参数覆盖
//! - 点分路径的属性查询

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::args::ApplicationArguments;

// 导入配置管理器模块
mod manager;
pub use manager::{ConfigManager, ENV_PREFIX};

/// 指定配置位置的属性名
pub const CONFIG_LOCATION_PROPERTY: &str = "config.location";

/// 激活 profile 的属性名
pub const ACTIVE_PROFILES_PROPERTY: &str = "profiles.active";

/// 未激活任何 profile 时使用的默认 profile
pub const DEFAULT_PROFILE: &str = "default";

/// 应用基础信息配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApplicationConfig {
    /// 应用名称（未配置时使用描述符名称）
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub name: Option<String>,
    /// 应用版本
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub version: Option<String>,
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别或过滤指令（如 "info"、"monolith_core=debug"）
    #[serde(default = "default_log_level", deserialize_with = "deserialize_text")]
    pub level: String,
    /// 输出格式
    #[serde(default)]
    pub format: LogFormat,
    /// 是否输出 target
    #[serde(default = "default_true")]
    pub with_target: bool,
    /// 是否输出线程 ID
    #[serde(default)]
    pub with_thread_ids: bool,
    /// 是否输出文件名
    #[serde(default)]
    pub with_file: bool,
    /// 是否输出行号
    #[serde(default)]
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

/// 生命周期配置
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// 优雅停机等待时间（秒）
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// 没有后台任务时也保持运行，直到收到停止信号
    #[serde(default)]
    pub keep_alive: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            keep_alive: false,
        }
    }
}

/// Profile 配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfilesConfig {
    /// 激活的 profile，支持逗号分隔字符串或数组
    #[serde(default, deserialize_with = "deserialize_profile_list")]
    pub active: Vec<String>,
}

/// 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// 应用基础信息
    #[serde(default)]
    pub application: ApplicationConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 生命周期配置
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Profile 配置
    #[serde(default)]
    pub profiles: ProfilesConfig,
    /// 合并后的完整配置文档
    #[serde(skip)]
    raw: Table,
    /// 配置来源
    #[serde(skip)]
    source: ConfigSource,
}

/// 配置来源记录
///
/// 加载发生在日志初始化之前，由运行时在日志就绪后输出
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    /// 实际使用的配置位置，`None` 表示使用内置默认值
    pub location: Option<PathBuf>,
    /// 未找到的默认候选位置
    pub missing_candidates: Vec<PathBuf>,
    /// 已加载的 profile 文件对应的 profile
    pub loaded_profiles: Vec<String>,
}

impl ConfigSource {
    /// 是否回退到了内置默认值
    pub fn is_fallback(&self) -> bool {
        self.location.is_none()
    }
}

impl AppConfig {
    /// 应用名称，未配置时使用给定的回退名称
    pub fn application_name(&self, fallback_name: &str) -> String {
        self.application
            .name
            .as_ref()
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| fallback_name.to_string())
    }

    /// 激活的 profile，未激活时返回默认 profile
    pub fn active_profiles(&self) -> Vec<String> {
        if self.profiles.active.is_empty() {
            vec![DEFAULT_PROFILE.to_string()]
        } else {
            self.profiles.active.clone()
        }
    }

    /// 按点分路径查询属性
    pub fn property(&self, key: &str) -> Option<&Value> {
        lookup(&self.raw, key)
    }

    /// 按点分路径查询并反序列化属性
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.property(key)
            .map(|value| {
                value
                    .clone()
                    .try_into::<T>()
                    .with_context(|| format!("property {key} has an unexpected type"))
            })
            .transpose()
    }

    /// 合并后的完整配置文档
    pub fn raw(&self) -> &Table {
        &self.raw
    }

    /// 配置来源
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// 确保配置有默认值
    fn ensure_defaults(&mut self) {
        if self.logging.level.trim().is_empty() {
            self.logging.level = default_log_level();
        }
    }

    /// 从合并后的配置文档构建
    pub fn from_table(raw: Table) -> Result<Self> {
        let mut cfg = Value::Table(raw.clone())
            .try_into::<AppConfig>()
            .context("invalid configuration after merging property sources")?;
        cfg.raw = raw;
        cfg.ensure_defaults();
        Ok(cfg)
    }
}

/// 配置加载器
///
/// 属性来源优先级（由低到高）：
/// 1. 内置默认值
/// 2. 配置文件或配置目录
/// 3. 激活的 profile 文件 `environments/<profile>.toml`
/// 4. `MONOLITH_` 前缀的环境变量
/// 5. 命令行选项参数
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    command_line: Table,
    environment: Table,
    default_locations: Vec<PathBuf>,
}

impl ConfigLoader {
    /// 以命令行参数创建加载器
    pub fn new(args: &ApplicationArguments) -> Self {
        Self {
            command_line: ConfigManager::command_line_properties(args),
            environment: Table::new(),
            default_locations: vec![PathBuf::from("config"), PathBuf::from("config.toml")],
        }
    }

    /// 设置环境变量来源
    pub fn with_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.environment = ConfigManager::environment_properties(vars);
        self
    }

    /// 设置未指定 `config.location` 时的候选位置
    pub fn with_default_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.default_locations = locations;
        self
    }

    /// 加载并合并所有属性来源
    pub fn load(&self) -> Result<AppConfig> {
        let mut source = ConfigSource::default();
        let mut merged = self.load_base(&mut source)?;

        let mut overrides = self.environment.clone();
        merge_table(&mut overrides, self.command_line.clone());

        let profiles = resolve_profiles(&merged, &overrides)?;
        if let Some(root) = source.location.as_deref().and_then(profile_root) {
            for profile in &profiles {
                if let Some(fragment) = ConfigManager::load_profile_config(&root, profile)? {
                    source.loaded_profiles.push(profile.clone());
                    merge_table(&mut merged, fragment);
                }
            }
        }

        merge_table(&mut merged, overrides);

        let mut cfg = AppConfig::from_table(merged)?;
        cfg.source = source;
        Ok(cfg)
    }

    /// 加载基础配置，实际使用的位置记录到 `source`
    fn load_base(&self, source: &mut ConfigSource) -> Result<Table> {
        let explicit = lookup(&self.command_line, CONFIG_LOCATION_PROPERTY)
            .or_else(|| lookup(&self.environment, CONFIG_LOCATION_PROPERTY));

        if let Some(value) = explicit {
            let location = value
                .as_str()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("{CONFIG_LOCATION_PROPERTY} must be a path string"))?;
            if !location.exists() {
                return Err(anyhow!(
                    "configuration path {} does not exist",
                    location.display()
                ));
            }
            let table = load_config_from_source(&location)?;
            source.location = Some(location);
            return Ok(table);
        }

        for path in &self.default_locations {
            if !path.exists() {
                source.missing_candidates.push(path.clone());
                continue;
            }
            let table = load_config_from_source(path)?;
            source.location = Some(path.clone());
            return Ok(table);
        }

        Ok(Table::new())
    }
}

/// 确定激活的 profile：覆盖来源优先于配置文件
fn resolve_profiles(base: &Table, overrides: &Table) -> Result<Vec<String>> {
    let value = lookup(overrides, ACTIVE_PROFILES_PROPERTY)
        .or_else(|| lookup(base, ACTIVE_PROFILES_PROPERTY));

    let profiles = match value {
        Some(value) => {
            let list = value
                .clone()
                .try_into::<ProfileList>()
                .with_context(|| format!("{ACTIVE_PROFILES_PROPERTY} must be a string or list"))?;
            list.into_profiles()
        }
        None => Vec::new(),
    };

    if profiles.is_empty() {
        Ok(vec![DEFAULT_PROFILE.to_string()])
    } else {
        Ok(profiles)
    }
}

/// profile 文件所在的目录
fn profile_root(location: &Path) -> Option<PathBuf> {
    if location.is_dir() {
        return Some(location.to_path_buf());
    }
    match location.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Some(parent.to_path_buf()),
        _ => Some(PathBuf::from(".")),
    }
}

/// 从源加载配置
fn load_config_from_source(path: &Path) -> Result<Table> {
    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_config_from_directory(path)
    } else {
        load_toml_table(path)
    }
}

/// 从目录加载配置
fn load_config_from_directory(path: &Path) -> Result<Table> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_table(&base_file)?;

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("modules"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    Ok(merged)
}

/// 合并目录中的配置
fn merge_directory(root: &mut Table, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort();

    for entry in entries {
        let fragment = load_toml_table(&entry)?;
        merge_table(root, fragment);
    }

    Ok(())
}

/// 加载 TOML 表
pub(crate) fn load_toml_table(path: &Path) -> Result<Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    let table: Table = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in {}", path.display()))?;
    Ok(table)
}

/// 深度合并：overlay 中的表逐键合并，其余值直接覆盖
pub(crate) fn merge_table(base: &mut Table, overlay: Table) {
    for (key, overlay_value) in overlay {
        match base.get_mut(&key) {
            Some(base_value) => merge_value(base_value, overlay_value),
            None => {
                base.insert(key, overlay_value);
            }
        }
    }
}

/// 合并值
fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                merge_table(base_table, overlay_table);
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}

/// 按点分路径查找
pub(crate) fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let mut current = table.get(segments.next()?)?;
    for segment in segments {
        current = current.as_table()?.get(segment)?;
    }
    Some(current)
}

/// profile 列表的两种写法
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileList {
    One(String),
    Many(Vec<String>),
}

impl ProfileList {
    fn into_profiles(self) -> Vec<String> {
        let items = match self {
            ProfileList::One(value) => vec![value],
            ProfileList::Many(values) => values,
        };
        items
            .iter()
            .flat_map(|item| item.split(','))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn deserialize_profile_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    ProfileList::deserialize(deserializer).map(ProfileList::into_profiles)
}

/// 文本属性：覆盖来源中形似数字或布尔的值按原样转回文本
#[derive(Deserialize)]
#[serde(untagged)]
enum TextValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl TextValue {
    fn into_text(self) -> String {
        match self {
            TextValue::Text(value) => value,
            TextValue::Integer(value) => value.to_string(),
            TextValue::Float(value) => format!("{value:?}"),
            TextValue::Boolean(value) => value.to_string(),
        }
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    TextValue::deserialize(deserializer).map(TextValue::into_text)
}

fn deserialize_optional_text<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<TextValue>::deserialize(deserializer).map(|value| value.map(TextValue::into_text))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(content: &str) -> Table {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_merge_table_is_deep() {
        let mut base = table(
            r#"
            [server]
            address = "0.0.0.0"
            port = 8080
            "#,
        );
        merge_table(
            &mut base,
            table(
                r#"
                [server]
                port = 9090
                "#,
            ),
        );

        assert_eq!(lookup(&base, "server.address").unwrap().as_str(), Some("0.0.0.0"));
        assert_eq!(lookup(&base, "server.port").unwrap().as_integer(), Some(9090));
    }

    #[test]
    fn test_merge_scalar_replaced_by_table() {
        let mut base = table("server = \"plain\"");
        merge_table(&mut base, table("[server]\nport = 1"));
        assert_eq!(lookup(&base, "server.port").unwrap().as_integer(), Some(1));
    }

    #[test]
    fn test_lookup_missing_paths() {
        let base = table("[server]\nport = 1");
        assert!(lookup(&base, "server.address").is_none());
        assert!(lookup(&base, "server.port.value").is_none());
        assert!(lookup(&base, "client").is_none());
    }

    #[test]
    fn test_app_config_defaults() {
        let cfg = AppConfig::from_table(Table::new()).unwrap();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Full);
        assert_eq!(cfg.lifecycle.shutdown_timeout_secs, 30);
        assert!(!cfg.lifecycle.keep_alive);
        assert_eq!(cfg.active_profiles(), vec!["default".to_string()]);
        assert_eq!(cfg.application_name("fallback"), "fallback");
    }

    #[test]
    fn test_app_config_typed_property() {
        let cfg = AppConfig::from_table(table(
            r#"
            [application]
            name = "orders"

            [logging]
            level = ""
            format = "json"

            [server]
            port = 9090
            "#,
        ))
        .unwrap();

        assert_eq!(cfg.application_name("fallback"), "orders");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.get::<u16>("server.port").unwrap(), Some(9090));
        assert_eq!(cfg.get::<u16>("server.address").unwrap(), None);
        assert!(cfg.get::<bool>("server.port").is_err());
    }

    #[test]
    fn test_profile_list_accepts_string_and_array() {
        let cfg = AppConfig::from_table(table("[profiles]\nactive = \"dev, test,\"")).unwrap();
        assert_eq!(cfg.profiles.active, vec!["dev", "test"]);

        let cfg = AppConfig::from_table(table("[profiles]\nactive = [\"dev\", \"local\"]")).unwrap();
        assert_eq!(cfg.profiles.active, vec!["dev", "local"]);
    }
}
