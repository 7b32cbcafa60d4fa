use thiserror::Error;

/// 文档存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 文档不存在
    #[error("文档不存在: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// 字段类型不符合预期
    #[error("字段类型错误 ({collection}/{id}.{field}): 期望 {expected}")]
    TypeMismatch {
        collection: String,
        id: String,
        field: String,
        expected: &'static str,
    },

    /// 存储后端失败
    #[error("存储后端错误: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn type_mismatch(collection: &str, id: &str, field: &str, expected: &'static str) -> Self {
        StoreError::TypeMismatch {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            expected,
        }
    }
}

/// 文本生成服务返回的错误
///
/// 服务没有结构化的错误码，只保留错误的文本描述。
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GenerationError {
    pub message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// HTTP 风格入口的错误
///
/// 对外只暴露状态码和通用信息，内部原因只写日志。
#[derive(Debug, Error)]
pub enum ApiError {
    /// 请求参数不合法
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 内部错误
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    /// 返回给调用方的信息
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(reason) => reason.clone(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_hides_cause() {
        let err = ApiError::from(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.status(), 500);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::not_found("boardInfo", "gameStatus");
        assert_eq!(err.to_string(), "文档不存在: boardInfo/gameStatus");
    }

    #[test]
    fn test_errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
        assert_send_sync::<GenerationError>();
        assert_send_sync::<ApiError>();
    }
}
