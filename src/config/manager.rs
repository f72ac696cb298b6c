//! 配置管理器 - 负责处理覆盖来源和 profile 配置
//!
//! 该模块提供了配置管理功能，包括：
//! - 命令行选项转换为配置属性
//! - `MONOLITH_` 前缀环境变量转换为配置属性
//! - 加载 profile 特定配置

use std::path::Path;

use anyhow::Result;
use toml::{Table, Value};

use super::load_toml_table;
use crate::args::ApplicationArguments;

/// 参与配置覆盖的环境变量前缀
pub const ENV_PREFIX: &str = "MONOLITH_";

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 将命令行选项参数转换为配置属性
    ///
    /// `--server.port=9090` 对应 `server.port = 9090`，
    /// 无值选项 `--debug` 对应 `debug = true`，
    /// 同名选项出现多次时以最后一次为准
    pub fn command_line_properties(args: &ApplicationArguments) -> Table {
        let mut properties = Table::new();
        for name in args.option_names() {
            let value = match args.last_value(name) {
                Some(Some(raw)) => Self::parse_scalar(raw),
                _ => Value::Boolean(true),
            };
            Self::insert_property(&mut properties, name, value);
        }
        properties
    }

    /// 将环境变量转换为配置属性
    ///
    /// 去掉前缀后转小写，单个 `_` 转为 `.`，`__` 转为字面量 `_`：
    /// `MONOLITH_SERVER_PORT` 对应 `server.port`，
    /// `MONOLITH_LOGGING_WITH__FILE` 对应 `logging.with_file`
    pub fn environment_properties<I>(vars: I) -> Table
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut properties = Table::new();
        for (key, raw) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let property = Self::env_name_to_property(name);
            if property.is_empty() {
                continue;
            }
            Self::insert_property(&mut properties, &property, Self::parse_scalar(&raw));
        }
        properties
    }

    /// 加载 profile 特定配置
    ///
    /// 读取 `<root>/environments/<profile>.toml`，文件不存在时返回 `None`
    pub fn load_profile_config(root: &Path, profile: &str) -> Result<Option<Table>> {
        let path = root.join("environments").join(format!("{profile}.toml"));
        if !path.exists() {
            return Ok(None);
        }
        load_toml_table(&path).map(Some)
    }

    /// 环境变量名转换为属性名
    fn env_name_to_property(name: &str) -> String {
        name.to_lowercase()
            .split("__")
            .map(|part| part.replace('_', "."))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// 字符串转换为 TOML 标量
    ///
    /// 布尔、整数和浮点数按类型解析；带前导零或无法原样还原的数字保留为字符串
    fn parse_scalar(raw: &str) -> Value {
        let trimmed = raw.trim();
        match trimmed {
            "true" => return Value::Boolean(true),
            "false" => return Value::Boolean(false),
            _ => {}
        }

        let digits = trimmed.trim_start_matches(['-', '+']);
        let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
        let numeric = !digits.is_empty()
            && digits.starts_with(|c: char| c.is_ascii_digit())
            && digits
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'));

        if numeric && !leading_zero {
            if let Ok(integer) = trimmed.parse::<i64>() {
                if integer.to_string() == trimmed {
                    return Value::Integer(integer);
                }
            } else if let Ok(float) = trimmed.parse::<f64>() {
                if format!("{float:?}") == trimmed {
                    return Value::Float(float);
                }
            }
        }

        Value::String(raw.to_string())
    }

    /// 按点分路径写入属性，路径中的非表节点会被替换为表
    fn insert_property(table: &mut Table, key: &str, value: Value) {
        let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = table;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert(Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            let Value::Table(next) = entry else {
                return;
            };
            current = next;
        }
        current.insert(last.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::lookup;

    fn args(values: &[&str]) -> ApplicationArguments {
        ApplicationArguments::parse(values.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_command_line_properties() {
        let properties = ConfigManager::command_line_properties(&args(&[
            "--server.port=9090",
            "--debug",
            "--application.name=orders",
            "--ratio=0.5",
            "--code=007",
            "--level=1",
            "--level=2",
            "positional",
        ]));

        assert_eq!(lookup(&properties, "server.port").unwrap().as_integer(), Some(9090));
        assert_eq!(lookup(&properties, "debug").unwrap().as_bool(), Some(true));
        assert_eq!(
            lookup(&properties, "application.name").unwrap().as_str(),
            Some("orders")
        );
        assert_eq!(lookup(&properties, "ratio").unwrap().as_float(), Some(0.5));
        assert_eq!(lookup(&properties, "code").unwrap().as_str(), Some("007"));
        assert_eq!(lookup(&properties, "level").unwrap().as_integer(), Some(2));
        assert!(lookup(&properties, "positional").is_none());
    }

    #[test]
    fn test_environment_properties() {
        let properties = ConfigManager::environment_properties(vec![
            ("MONOLITH_SERVER_PORT".to_string(), "8080".to_string()),
            ("MONOLITH_LOGGING_WITH__FILE".to_string(), "true".to_string()),
            ("MONOLITH_PROFILES_ACTIVE".to_string(), "dev,test".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("MONOLITH_".to_string(), "ignored".to_string()),
        ]);

        assert_eq!(lookup(&properties, "server.port").unwrap().as_integer(), Some(8080));
        assert_eq!(
            lookup(&properties, "logging.with_file").unwrap().as_bool(),
            Some(true)
        );
        assert_eq!(
            lookup(&properties, "profiles.active").unwrap().as_str(),
            Some("dev,test")
        );
        assert!(properties.get("path").is_none());
        assert_eq!(properties.len(), 3);
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(ConfigManager::parse_scalar("false"), Value::Boolean(false));
        assert_eq!(ConfigManager::parse_scalar("-3"), Value::Integer(-3));
        assert_eq!(ConfigManager::parse_scalar("0"), Value::Integer(0));
        assert_eq!(ConfigManager::parse_scalar("1.0"), Value::Float(1.0));
        assert_eq!(
            ConfigManager::parse_scalar("1e3"),
            Value::String("1e3".to_string())
        );
        assert_eq!(
            ConfigManager::parse_scalar("1.10"),
            Value::String("1.10".to_string())
        );
        assert_eq!(
            ConfigManager::parse_scalar("+5"),
            Value::String("+5".to_string())
        );
        assert_eq!(
            ConfigManager::parse_scalar("inf"),
            Value::String("inf".to_string())
        );
        assert_eq!(
            ConfigManager::parse_scalar("10.0.0.1"),
            Value::String("10.0.0.1".to_string())
        );
    }

    #[test]
    fn test_insert_property_replaces_scalar_parent() {
        let mut table = Table::new();
        ConfigManager::insert_property(&mut table, "server", Value::Integer(1));
        ConfigManager::insert_property(&mut table, "server.port", Value::Integer(2));
        assert_eq!(lookup(&table, "server.port").unwrap().as_integer(), Some(2));
    }
}
