//! 命令行参数模块
//!
//! 保留进程收到的原始参数，同时提供解析后的视图：
//! - 选项参数：`--name=value` 或 `--name`
//! - 非选项参数：不以 `--` 开头的参数

use std::collections::BTreeMap;

use crate::error::{BootstrapError, Result};

/// 应用启动参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationArguments {
    /// 原始参数（不含程序名）
    raw: Vec<String>,
    /// 选项参数，同名选项的值按出现顺序保存；无值选项对应 `None`
    options: BTreeMap<String, Vec<Option<String>>>,
    /// 非选项参数
    non_options: Vec<String>,
}

impl ApplicationArguments {
    /// 解析参数
    ///
    /// `--`、`--=value` 这类缺少选项名的参数视为语法错误
    pub fn parse(args: Vec<String>) -> Result<Self> {
        let mut options: BTreeMap<String, Vec<Option<String>>> = BTreeMap::new();
        let mut non_options = Vec::new();

        for arg in &args {
            let Some(option) = arg.strip_prefix("--") else {
                non_options.push(arg.clone());
                continue;
            };

            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (option, None),
            };

            if name.is_empty() {
                return Err(BootstrapError::InvalidArgument(format!(
                    "option name is empty in '{arg}'"
                )));
            }

            options.entry(name.to_string()).or_default().push(value);
        }

        Ok(Self {
            raw: args,
            options,
            non_options,
        })
    }

    /// 原始参数
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// 是否包含指定选项
    pub fn contains_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// 所有选项名（按字典序）
    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    /// 指定选项的全部值，未出现时返回 `None`
    pub fn option_values(&self, name: &str) -> Option<&[Option<String>]> {
        self.options.get(name).map(Vec::as_slice)
    }

    /// 指定选项最后一次出现时的值
    pub fn last_value(&self, name: &str) -> Option<&Option<String>> {
        self.options.get(name).and_then(|values| values.last())
    }

    /// 非选项参数
    pub fn non_option_args(&self) -> &[String] {
        &self.non_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_empty() {
        let parsed = ApplicationArguments::parse(Vec::new()).unwrap();
        assert!(parsed.raw().is_empty());
        assert!(parsed.non_option_args().is_empty());
        assert_eq!(parsed.option_names().count(), 0);
    }

    #[test]
    fn test_parse_options_and_non_options() {
        let parsed =
            ApplicationArguments::parse(args(&["--server.port=9090", "migrate", "--debug", "-v"]))
                .unwrap();

        assert_eq!(
            parsed.last_value("server.port"),
            Some(&Some("9090".to_string()))
        );
        assert_eq!(parsed.last_value("debug"), Some(&None));
        assert!(parsed.contains_option("debug"));
        assert_eq!(parsed.non_option_args(), &args(&["migrate", "-v"])[..]);
        assert_eq!(
            parsed.raw(),
            &args(&["--server.port=9090", "migrate", "--debug", "-v"])[..]
        );
    }

    #[test]
    fn test_repeated_option_keeps_all_values() {
        let parsed = ApplicationArguments::parse(args(&["--tag=a", "--tag=b", "--tag"])).unwrap();
        assert_eq!(
            parsed.option_values("tag"),
            Some(&[Some("a".to_string()), Some("b".to_string()), None][..])
        );
        assert_eq!(parsed.last_value("tag"), Some(&None));
    }

    #[test]
    fn test_value_may_contain_equals_or_be_empty() {
        let parsed = ApplicationArguments::parse(args(&["--query=a=b", "--empty="])).unwrap();
        assert_eq!(parsed.last_value("query"), Some(&Some("a=b".to_string())));
        assert_eq!(parsed.last_value("empty"), Some(&Some(String::new())));
    }

    #[test]
    fn test_missing_option_name_is_rejected() {
        for bad in ["--", "--=value"] {
            let err = ApplicationArguments::parse(args(&[bad])).unwrap_err();
            assert!(matches!(err, BootstrapError::InvalidArgument(_)), "{bad}");
        }
    }
}
