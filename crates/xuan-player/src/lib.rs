//! 播放调度库.
//!
//! 把解码后的歌曲段落变成与音频时钟同步的视觉切换事件流:
//! [`Song`] 负责段落解码准备, [`BeatScheduler`] 负责死线调度与派发.
//! 音频输出与视觉呈现通过 [`AudioSink`] / [`BeatSink`] 接口注入.

pub mod scheduler;
pub mod song;

pub use scheduler::{beat_interval, AudioSink, BeatScheduler, BeatSink, SessionState};
pub use song::{Segment, Song};
