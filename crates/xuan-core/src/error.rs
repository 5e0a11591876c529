//! 统一错误类型定义.
//!
//! 所有 xuan crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Xuan 统一错误类型
#[derive(Debug, Error)]
pub enum XuanError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 编解码器错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// 无效数据 (损坏的码流, 不一致的 gapless 标签等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 未找到指定的资源
    #[error("未找到资源: {0}")]
    ResourceNotFound(String),

    /// 渲染状态错误 (不致命, 绘制循环继续运行)
    #[error("渲染错误: {0}")]
    Render(String),

    /// 音频输出错误
    #[error("音频输出错误: {0}")]
    AudioOutput(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// Xuan 统一 Result 类型
pub type XuanResult<T> = Result<T, XuanError>;
