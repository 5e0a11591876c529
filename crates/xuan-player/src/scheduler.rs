//! 节拍死线调度.
//!
//! 调度器把段落时长和节拍图换算成一串单调时钟死线, 逐拍粗睡眠等待
//! 到点后向视觉接收端派发切换事件. 两条死线:
//!
//! - `next_beat`: 下一拍允许触发的时刻, 派发后重新武装为 now + 拍长;
//! - `next_song`: 上一段音频播完的时刻, 在把下一段 PCM 交给音频
//!   输出端之前等待它, 防止两段在输出设备上重叠.
//!
//! 关键性质: 节拍绝不提前触发. 粗睡眠只影响触发的滞后量.

use std::time::{Duration, Instant};

use log::{info, warn};
use xuan_core::{Beat, XuanError, XuanResult};

use crate::song::{Segment, Song};

/// 粗睡眠步长
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// 音频输出契约: 本应用固定双声道 44100 Hz
const REQUIRED_CHANNELS: u32 = 2;
const REQUIRED_SAMPLE_RATE: u32 = 44100;

/// 视觉切换接收端.
///
/// 图像与颜色的具体挑选 (随机与否) 由接收端决定, 调度器只宣告
/// 切换类型. 接收端错误不终止调度, 记日志后继续.
pub trait BeatSink: Send + Sync {
    fn set_image(&self, transition: Beat) -> XuanResult<()>;
    fn set_color(&self) -> XuanResult<()>;
}

/// 音频输出端: 只有 "开始播放缓冲" 一个动作, 无完成回调,
/// 播放结束时刻由调度器用计算死线推定.
pub trait AudioSink {
    fn play(&mut self, pcm: &[u8], channels: u32, sample_rate: u32) -> XuanResult<()>;
}

/// 播放会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Buildup,
    Looping,
}

/// 单拍时长: 段落时长均分到每一拍; 拍数 <= 1 时整段一拍
pub fn beat_interval(duration: Duration, beat_count: usize) -> Duration {
    if beat_count <= 1 {
        duration
    } else {
        duration / beat_count as u32
    }
}

/// 一个播放会话的调度器, 每次播放请求一个实例
pub struct BeatScheduler {
    state: SessionState,
    next_beat: Option<Instant>,
    next_song: Option<Instant>,
}

impl Default for BeatScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl BeatScheduler {
    pub fn new() -> Self {
        Self {
            state: SessionState::Loading,
            next_beat: None,
            next_song: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 粗睡眠直到死线, 绝不提前返回
    fn wait_until(deadline: Option<Instant>) {
        let Some(deadline) = deadline else {
            return;
        };
        while Instant::now() < deadline {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// 播放一个段落: 提交音频, 逐拍派发切换事件.
    ///
    /// 返回时本段所有节拍已派发完毕, 但音频可能仍在播放;
    /// 下一次调用会先等它播完.
    pub fn run_segment(
        &mut self,
        segment: &Segment,
        audio: &mut dyn AudioSink,
        visuals: &dyn BeatSink,
    ) -> XuanResult<()> {
        if segment.audio.channels != REQUIRED_CHANNELS
            || segment.audio.sample_rate != REQUIRED_SAMPLE_RATE
        {
            return Err(XuanError::InvalidArgument(format!(
                "音频输出契约要求 {REQUIRED_CHANNELS} 声道 {REQUIRED_SAMPLE_RATE} Hz, \
                 段落是 {} 声道 {} Hz",
                segment.audio.channels, segment.audio.sample_rate
            )));
        }

        let rhythm: &str = if segment.rhythm.is_empty() {
            "."
        } else {
            &segment.rhythm
        };
        let duration = segment.audio.duration();
        let interval = beat_interval(duration, rhythm.chars().count());

        // 先等上一段播完, 再提交本段音频, 保证输出设备上不重叠
        Self::wait_until(self.next_song);
        audio.play(
            segment.audio.playable_bytes(),
            segment.audio.channels,
            segment.audio.sample_rate,
        )?;
        self.next_song = Some(Instant::now() + duration);

        for symbol in rhythm.chars() {
            Self::wait_until(self.next_beat);
            self.dispatch(Beat::from_symbol(symbol), visuals);
            self.next_beat = Some(Instant::now() + interval);
        }
        Ok(())
    }

    /// 把一拍的切换类型派发给视觉接收端 (先换色后换图)
    fn dispatch(&self, beat: Beat, visuals: &dyn BeatSink) {
        let mut result = Ok(());
        if beat.changes_color() {
            result = visuals.set_color();
        }
        if beat.changes_image() {
            result = result.and_then(|()| visuals.set_image(beat));
        }
        if let Err(e) = result {
            warn!("视觉切换派发失败, 继续调度: {e}");
        }
    }

    /// 运行整个播放会话: buildup (如有) 播一遍, loop 段无限循环.
    ///
    /// 正常情况下不返回; 只有音频输出失败或段落非法时带错误返回.
    pub fn run_session(
        &mut self,
        song: &Song,
        audio: &mut dyn AudioSink,
        visuals: &dyn BeatSink,
    ) -> XuanResult<()> {
        info!("开始播放 [{}]", song.title);

        if let Some(buildup) = &song.buildup {
            self.state = SessionState::Buildup;
            self.run_segment(buildup, audio, visuals)?;
        }

        self.state = SessionState::Looping;
        loop {
            self.run_segment(&song.loop_segment, audio, visuals)?;
        }
    }
}
