use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurlcheckError {
    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("无效的请求: {0}")]
    InvalidRequest(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for CurlcheckError {
    fn from(err: anyhow::Error) -> Self {
        CurlcheckError::Other(err.to_string())
    }
}

impl From<crate::condition::ConditionError> for CurlcheckError {
    fn from(err: crate::condition::ConditionError) -> Self {
        CurlcheckError::ParseError(err.to_string())
    }
}

/// Result type for curlcheck crate
pub type Result<T> = std::result::Result<T, CurlcheckError>;
