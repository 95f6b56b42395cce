use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// 上游回傳的資料列欄位不足
    #[error("Malformed row {row}: column {index} requested but row has {width} columns")]
    MalformedRow {
        row: usize,
        index: usize,
        width: usize,
    },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    ApiStatusError { status: u16, body: String },

    #[error("Remote service reported an error: {message}")]
    RemoteError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 使用者輸入或配置錯誤
    Usage,
    /// 上游資料不符合約定
    Data,
    /// 遠端服務或傳輸錯誤
    Remote,
    /// 本地 IO 或序列化錯誤
    System,
}

impl QueryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryError::MalformedRow { .. } | QueryError::MalformedResponse { .. } => {
                ErrorCategory::Data
            }
            QueryError::ApiError(_)
            | QueryError::ApiStatusError { .. }
            | QueryError::RemoteError { .. } => ErrorCategory::Remote,
            QueryError::IoError(_) | QueryError::SerializationError(_) => ErrorCategory::System,
            QueryError::ConfigError { .. }
            | QueryError::InvalidConfigValueError { .. }
            | QueryError::ValidationError { .. } => ErrorCategory::Usage,
        }
    }

    /// 依錯誤類別決定行程退出碼
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Usage | ErrorCategory::Data => 1,
            ErrorCategory::Remote => 2,
            ErrorCategory::System => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Usage => format!("Invalid input or configuration: {}", self),
            ErrorCategory::Data => format!("ERP returned unexpected data: {}", self),
            ErrorCategory::Remote => format!("ERP query failed: {}", self),
            ErrorCategory::System => format!("Local failure: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Usage => "Check the command arguments and the connection config file",
            ErrorCategory::Data => "Check that the requested field keys match the form definition",
            ErrorCategory::Remote => "Check server_url, credentials and that the ERP service is reachable",
            ErrorCategory::System => "Check that stdout is writable",
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

/// 記錄錯誤並寫出給使用者的診斷訊息，回傳對應的退出碼
pub fn report_failure<E: Write>(error: &QueryError, diagnostics: &mut E) -> i32 {
    tracing::error!(
        "❌ Query failed: {} (Category: {:?})",
        error,
        error.category()
    );
    tracing::error!("💡 Suggestion: {}", error.recovery_suggestion());
    // stderr 已關閉時仍以錯誤碼結束
    let _ = writeln!(diagnostics, "❌ {}", error.user_friendly_message());
    error.exit_code()
}
