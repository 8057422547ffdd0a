use thiserror::Error;

/// 筛选与搜索模块的统一错误类型
#[derive(Debug, Error)]
pub enum MemoError {
    /// 浏览器存储不可用（隐私模式、被禁用等）
    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    /// 读写存储失败
    #[error("存储读写失败: {0}")]
    Storage(String),

    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 标签重命名校验失败
    #[error("无效的标签名: {0}")]
    InvalidTagName(String),

    /// 远端服务返回的错误
    #[error("服务调用失败: {0}")]
    Service(String),

    #[error("无效的日期: {0}")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, MemoError>;
