/// 定位引擎错误类型

use thiserror::Error;

/// 定位引擎统一错误
#[derive(Error, Debug)]
pub enum LocateError {
    /// 观测引用了未登记的监听站
    #[error("unknown station: {0}")]
    UnknownStation(String),
    /// 存储记录字段缺失或数值不合法
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
    /// 配置不合法
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl LocateError {
    pub fn invalid_record(id: impl Into<String>, reason: impl Into<String>) -> Self {
        LocateError::InvalidRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

pub type LocateResult<T> = Result<T, LocateError>;
