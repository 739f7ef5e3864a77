//! 配置与 sink 的错误类型

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a capture configuration or writing to a sink
#[derive(Debug, Error)]
pub enum ContractError {
    /// 配置文件无法读取
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件格式错误或无法序列化
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// 字段范围或跨字段规则不满足
    #[error("invalid config at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },
}

impl ContractError {
    pub fn config_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        let err = ContractError::config_validation("sync.fps", "must be > 0");
        assert_eq!(err.to_string(), "invalid config at 'sync.fps': must be > 0");
    }

    #[test]
    fn test_read_error_keeps_path() {
        let err = ContractError::config_read(
            "/etc/capture.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("/etc/capture.toml"));
    }
}
