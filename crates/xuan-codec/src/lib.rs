//! Xuan 无缝音频解码库.
//!
//! 把一段压缩 MP3 字节流解码为无缝 (gapless) 的 16 位小端 PCM:
//!
//! 1. 探测编码器写入的 LAME/Xing gapless 标签 (起始延迟 / 尾部填充)
//! 2. 整段数据一次性送入解码引擎, 逐帧取出高精度定点采样
//! 3. 每声道独立做噪声整形抖动 (noise shaping dither), 量化到 16 位
//! 4. 拼接解码块, 按标签修剪头部延迟并截断样本计数
//!
//! 解码引擎通过 [`DecodeEngine`] trait 注入, 默认实现基于 symphonia.

pub mod decoder;
pub mod dither;
pub mod engine;
pub mod gapless;

pub use decoder::{decode, decode_with_engine, DecodedAudio};
pub use dither::Dither;
pub use engine::{DecodeEngine, EngineFrame, Mp3Engine};
pub use gapless::GaplessInfo;
