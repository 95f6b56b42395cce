use crate::core::ConfigProvider;
use crate::utils::error::{QueryError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_LCID: u32 = 2052;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub connection: ConnectionConfig,
    pub normalization: Option<NormalizationConfig>,
}

/// ERP 連線設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub server_url: String,
    pub acct_id: String,
    pub user_name: String,
    pub app_id: String,
    pub app_secret: String,
    pub lcid: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    pub max_per_group: Option<usize>,
    pub dedupe: Option<bool>,
    pub sort_descending: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| QueryError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| QueryError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${K3_APP_SECRET})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn max_per_group(&self) -> Option<usize> {
        self.normalization.as_ref().and_then(|n| n.max_per_group)
    }

    pub fn dedupe(&self) -> Option<bool> {
        self.normalization.as_ref().and_then(|n| n.dedupe)
    }

    pub fn sort_descending(&self) -> Option<bool> {
        self.normalization.as_ref().and_then(|n| n.sort_descending)
    }
}

impl ConfigProvider for TomlConfig {
    fn server_url(&self) -> &str {
        &self.connection.server_url
    }

    fn timeout_seconds(&self) -> u64 {
        self.connection
            .timeout_seconds
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    /// 固定的帳套憑證標頭，原樣轉送
    ///
    /// 不是 K3Cloud 的簽章登入流程，只適用於受信任的內網連線。
    fn headers(&self) -> Vec<(String, String)> {
        let connection = &self.connection;
        let mut headers = vec![
            ("X-KDApi-AcctID".to_string(), connection.acct_id.clone()),
            ("X-KDApi-UserName".to_string(), connection.user_name.clone()),
            ("X-KDApi-AppID".to_string(), connection.app_id.clone()),
            ("X-KDApi-AppSec".to_string(), connection.app_secret.clone()),
            (
                "X-KDApi-LCID".to_string(),
                connection.lcid.unwrap_or(DEFAULT_LCID).to_string(),
            ),
        ];
        if let Some(extra) = &connection.headers {
            headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        headers
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        let connection = &self.connection;
        validate_url("connection.server_url", &connection.server_url)?;
        let credentials = [
            ("connection.acct_id", &connection.acct_id),
            ("connection.user_name", &connection.user_name),
            ("connection.app_id", &connection.app_id),
            ("connection.app_secret", &connection.app_secret),
        ];
        for (field, value) in credentials {
            validate_non_empty_string(field, value)?;
            if value.contains("${") {
                return Err(QueryError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: value.clone(),
                    reason: "environment variable is not set".to_string(),
                });
            }
        }

        if let Some(timeout) = connection.timeout_seconds {
            validate_positive_number("connection.timeout_seconds", timeout as usize, 1)?;
        }
        if let Some(max) = self.max_per_group() {
            validate_positive_number("normalization.max_per_group", max, 1)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[connection]
server_url = "http://10.10.10.18/k3cloud/"
acct_id = "6512c6a3e5ef1f"
user_name = "mes"
app_id = "278321_abc"
app_secret = "s3cr3t"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.server_url(), "http://10.10.10.18/k3cloud/");
        assert_eq!(config.timeout_seconds(), DEFAULT_TIMEOUT_SECONDS);
        assert!(config.max_per_group().is_none());
        assert!(config.validate().is_ok());

        let headers = config.headers();
        assert!(headers.contains(&("X-KDApi-LCID".to_string(), "2052".to_string())));
        assert!(headers.contains(&("X-KDApi-UserName".to_string(), "mes".to_string())));
        assert!(headers.contains(&("X-KDApi-AppSec".to_string(), "s3cr3t".to_string())));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("K3_QUERY_TEST_SECRET", "from-env");

        let content = BASIC.replace("s3cr3t", "${K3_QUERY_TEST_SECRET}");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.connection.app_secret, "from-env");

        std::env::remove_var("K3_QUERY_TEST_SECRET");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let content = BASIC.replace("s3cr3t", "${K3_QUERY_TEST_UNSET_SECRET}");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let content = BASIC.replace("http://10.10.10.18/k3cloud/", "invalid-url");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = format!("{}\n[normalization]\nmax_per_group = 0\n", BASIC);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = format!(
            "{}timeout_seconds = 5\n\n[connection.headers]\nX-Trace = \"mes\"\n\n[normalization]\nmax_per_group = 3\nsort_descending = false\n",
            BASIC
        );
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.timeout_seconds(), 5);
        assert_eq!(config.max_per_group(), Some(3));
        assert_eq!(config.sort_descending(), Some(false));
        assert!(config
            .headers()
            .contains(&("X-Trace".to_string(), "mes".to_string())));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = TomlConfig::from_file("/nonexistent/k3cloud.toml").unwrap_err();
        assert!(matches!(err, QueryError::ConfigError { .. }));
    }
}
