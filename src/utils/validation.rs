use crate::utils::error::{QueryError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(QueryError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(QueryError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(QueryError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(QueryError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(QueryError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 欄位鍵只允許 `FMaterialId.FNumber` 這類識別字
pub fn validate_field_key(field_key: &str) -> Result<()> {
    static FIELD_KEY: OnceLock<Regex> = OnceLock::new();
    let re = FIELD_KEY.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("field key pattern is valid")
    });

    if re.is_match(field_key) {
        Ok(())
    } else {
        Err(QueryError::ValidationError {
            message: format!("Invalid field key: '{}'", field_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("server_url", "https://example.com").is_ok());
        assert!(validate_url("server_url", "http://10.10.10.18/k3cloud/").is_ok());
        assert!(validate_url("server_url", "").is_err());
        assert!(validate_url("server_url", "invalid-url").is_err());
        assert!(validate_url("server_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("max_per_group", 5, 1).is_ok());
        assert!(validate_positive_number("max_per_group", 0, 1).is_err());
    }

    #[test]
    fn test_validate_field_key() {
        assert!(validate_field_key("FNumber").is_ok());
        assert!(validate_field_key("FMaterialId.FNumber").is_ok());
        assert!(validate_field_key("FMATERIALIDCHILD.Fname").is_ok());
        assert!(validate_field_key("").is_err());
        assert!(validate_field_key("FNumber='1' or 1=1").is_err());
        assert!(validate_field_key("FMaterialId.").is_err());
        assert!(validate_field_key("1Field").is_err());
    }
}
