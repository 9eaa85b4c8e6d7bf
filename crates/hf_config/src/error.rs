// crates/hf_config/src/error.rs

//! 配置层错误类型

use hf_foundation::HfError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 缺失配置
    #[error("缺失配置: {0}")]
    Missing(String),
}

impl ConfigError {
    /// 创建无效值错误
    pub fn invalid(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for HfError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(source) => HfError::from(source),
            ConfigError::Parse(message) => HfError::serialization(message),
            other => HfError::config(other.to_string()),
        }
    }
}
