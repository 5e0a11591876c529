//! Xuan 共享类型库.
//!
//! 所有 xuan crate 共用的错误类型和节拍/对齐词汇表.

pub mod beat;
pub mod error;

pub use beat::{Alignment, Beat};
pub use error::{XuanError, XuanResult};
