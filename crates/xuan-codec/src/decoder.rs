//! 无缝解码入口.
//!
//! 组合引擎输出, 做抖动量化, 拼接解码块, 再按 gapless 标签修剪.

use std::time::Duration;

use log::{debug, info};
use xuan_core::{XuanError, XuanResult};

use crate::dither::Dither;
use crate::engine::{DecodeEngine, Mp3Engine};
use crate::gapless::{self, GaplessInfo};

/// 输出位深
const OUTPUT_BITS: u32 = 16;
/// 每采样输出字节数
const BYTES_PER_SAMPLE: usize = 2;

/// 解码结果: 调用方独占所有权的 16 位小端 PCM 缓冲.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// 交错 PCM 字节, 末尾可能含不计入样本数的对齐填充
    pub pcm: Vec<u8>,
    /// 每声道样本数 (gapless 修剪后)
    pub sample_count: u64,
    /// 声道数 (1 或 2), 整条流内固定
    pub channels: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// 每声道帧的字节跨度
    pub fn frame_stride(&self) -> usize {
        BYTES_PER_SAMPLE * self.channels as usize
    }

    /// 有效播放字节 (裁掉尾部对齐填充和 gapless 填充)
    pub fn playable_bytes(&self) -> &[u8] {
        let len = (self.sample_count as usize * self.frame_stride()).min(self.pcm.len());
        &self.pcm[..len]
    }

    /// 播放时长
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.sample_count * 1_000_000 / u64::from(self.sample_rate))
    }
}

/// 用默认 MP3 引擎解码一段压缩数据
pub fn decode(data: &[u8]) -> XuanResult<DecodedAudio> {
    let mut engine = Mp3Engine::try_new()?;
    decode_with_engine(&mut engine, data)
}

/// 用注入的引擎解码 (测试入口).
///
/// 错误语义: 帧级错误由引擎消化; 引擎致命失败原样上抛;
/// gapless 标签与实际解码样本数不一致按数据缺陷报 `InvalidData`.
pub fn decode_with_engine(
    engine: &mut dyn DecodeEngine,
    data: &[u8],
) -> XuanResult<DecodedAudio> {
    let gapless = gapless::probe(data);
    if let Some(info) = &gapless {
        debug!(
            "gapless 标签: 延迟 {} 样本, 填充 {} 样本, 总计 {} 样本",
            info.delay, info.padding, info.total_samples
        );
    }

    engine.send_input(data)?;

    // 抖动状态每声道一份, 只在本次解码内存活
    let mut dither = [Dither::new(), Dither::new()];

    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut sample_count: u64 = 0;
    let mut channels: u32 = 0;
    let mut sample_rate: u32 = 0;

    loop {
        let frame = match engine.receive_frame() {
            Ok(frame) => frame,
            Err(XuanError::Eof) => break,
            Err(e) => return Err(e),
        };

        let ch = frame.channels.max(1) as usize;
        channels = frame.channels;
        sample_rate = frame.sample_rate;
        sample_count += frame.samples_per_channel() as u64;

        // 逐样本抖动量化, 低字节在前交错输出
        let mut chunk = Vec::with_capacity(frame.samples.len() * BYTES_PER_SAMPLE);
        for frame_samples in frame.samples.chunks_exact(ch) {
            for (c, &sample) in frame_samples.iter().enumerate() {
                let quantized = dither[c.min(1)].update(OUTPUT_BITS, sample) as i16;
                chunk.extend_from_slice(&quantized.to_le_bytes());
            }
        }
        chunks.push(chunk);
    }

    if sample_count == 0 || channels == 0 {
        return Err(XuanError::Codec("未解码出任何音频帧".into()));
    }

    // 拼接 + 4 字节对齐的零填充 (填充字节不计入样本数)
    let payload: usize = chunks.iter().map(Vec::len).sum();
    let aligned = (payload + 3) & !3;
    let mut pcm = Vec::with_capacity(aligned);
    for chunk in chunks {
        pcm.extend_from_slice(&chunk);
    }
    pcm.resize(aligned, 0);

    // gapless 修剪: 只裁头截尾, 绝不补样本
    if let Some(info) = gapless {
        if sample_count != info.total_samples {
            check_trim_invariant(sample_count, &info)?;

            let stride = BYTES_PER_SAMPLE * channels as usize;
            pcm.drain(..info.delay as usize * stride);
            sample_count = info.total_samples;

            info!(
                "gapless 修剪: 延迟 {} 样本, 填充 {} 样本",
                info.delay, info.padding
            );
        }
    }

    info!("解码完成: {} 样本, {} 声道, {} Hz", sample_count, channels, sample_rate);

    Ok(DecodedAudio {
        pcm,
        sample_count,
        channels,
        sample_rate,
    })
}

/// 修剪一致性检查: `解码样本数 - 延迟 - 填充 == 标签总样本数`.
///
/// 失败说明标签或码流损坏, 该曲目不可恢复.
fn check_trim_invariant(sample_count: u64, info: &GaplessInfo) -> XuanResult<()> {
    let trimmed = sample_count
        .checked_sub(u64::from(info.delay) + u64::from(info.padding))
        .ok_or_else(|| {
            XuanError::InvalidData(format!(
                "gapless 不一致: 解码 {} 样本不足以修剪 {}+{}",
                sample_count, info.delay, info.padding
            ))
        })?;
    if trimmed != info.total_samples {
        return Err(XuanError::InvalidData(format!(
            "gapless 不一致: 解码 {} - 延迟 {} - 填充 {} != 标签总数 {}",
            sample_count, info.delay, info.padding, info.total_samples
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineFrame;

    /// 脚本化引擎: 忽略输入内容, 按预设产出固定帧序列
    struct ScriptedEngine {
        frames: Vec<EngineFrame>,
        cursor: usize,
        input_seen: bool,
    }

    impl ScriptedEngine {
        /// 产出 `total` 个每声道样本 (按 1152 一帧切分)
        fn with_samples(channels: u32, total: u64) -> Self {
            let mut frames = Vec::new();
            let mut remaining = total;
            let mut seq = 0i32;
            while remaining > 0 {
                let n = remaining.min(1152) as usize;
                let samples = (0..n * channels as usize)
                    .map(|_| {
                        seq = seq.wrapping_add(1_000_003);
                        (seq % (1 << 27)) - (1 << 26)
                    })
                    .collect();
                frames.push(EngineFrame {
                    channels,
                    sample_rate: 44100,
                    samples,
                });
                remaining -= n as u64;
            }
            Self {
                frames,
                cursor: 0,
                input_seen: false,
            }
        }
    }

    impl DecodeEngine for ScriptedEngine {
        fn send_input(&mut self, _data: &[u8]) -> XuanResult<()> {
            self.input_seen = true;
            Ok(())
        }

        fn receive_frame(&mut self) -> XuanResult<EngineFrame> {
            if !self.input_seen {
                return Err(XuanError::NeedMoreData);
            }
            match self.frames.get(self.cursor) {
                Some(frame) => {
                    self.cursor += 1;
                    Ok(frame.clone())
                }
                None => Err(XuanError::Eof),
            }
        }
    }

    #[test]
    fn test_无标签不修剪() {
        let mut engine = ScriptedEngine::with_samples(2, 2304);
        let audio = decode_with_engine(&mut engine, &[]).unwrap();
        assert_eq!(audio.sample_count, 2304);
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.pcm.len(), 2304 * 4);
    }

    #[test]
    fn test_输出四字节对齐() {
        // 单声道奇数样本: 载荷 2 字节对齐, 补零到 4 字节
        let mut engine = ScriptedEngine::with_samples(1, 1151);
        let audio = decode_with_engine(&mut engine, &[]).unwrap();
        assert_eq!(audio.pcm.len() % 4, 0);
        assert_eq!(audio.sample_count, 1151);
        // 填充字节不计入样本数
        assert!(audio.pcm.len() >= 1151 * 2);
        assert!(audio.pcm.len() - 1151 * 2 < 4);
    }

    #[test]
    fn test_gapless修剪() {
        // 10 帧 MP3, 编码延迟 576, 填充 1000
        let tag = crate::gapless::tests::make_tagged_frame(10, 576, 1000);
        let info = crate::gapless::probe(&tag).unwrap();

        let decoded_total = 10 * 1152;
        let mut engine = ScriptedEngine::with_samples(2, decoded_total);
        let before = decode_with_engine(
            &mut ScriptedEngine::with_samples(2, decoded_total),
            &[],
        )
        .unwrap();
        let audio = decode_with_engine(&mut engine, &tag).unwrap();

        assert_eq!(audio.sample_count, info.total_samples);
        // 修剪只裁头: 修剪后的首样本 == 未修剪输出的第 delay 个样本
        let stride = audio.frame_stride();
        assert_eq!(
            &audio.pcm[..stride],
            &before.pcm[info.delay as usize * stride..(info.delay as usize + 1) * stride],
        );
        // 修剪绝不增加样本
        assert!(audio.sample_count < decoded_total);
    }

    #[test]
    fn test_修剪不变量违例() {
        // 标签宣称 10 帧, 引擎只产出 9 帧: 不一致, 必须报错
        let tag = crate::gapless::tests::make_tagged_frame(10, 576, 1000);
        let mut engine = ScriptedEngine::with_samples(2, 9 * 1152);
        let err = decode_with_engine(&mut engine, &tag).unwrap_err();
        assert!(matches!(err, XuanError::InvalidData(_)));
    }

    #[test]
    fn test_样本数恰好相等时跳过修剪() {
        // 解码样本数 == 标签总数: 无需修剪 (引擎已自行处理延迟的情形)
        let tag = crate::gapless::tests::make_tagged_frame(10, 576, 1000);
        let info = crate::gapless::probe(&tag).unwrap();
        let mut engine = ScriptedEngine::with_samples(2, info.total_samples);
        let audio = decode_with_engine(&mut engine, &tag).unwrap();
        assert_eq!(audio.sample_count, info.total_samples);
    }

    #[test]
    fn test_空流报错() {
        let mut engine = ScriptedEngine::with_samples(2, 0);
        assert!(decode_with_engine(&mut engine, &[]).is_err());
    }

    #[test]
    fn test_抖动确定性_输出逐字节一致() {
        let a = decode_with_engine(&mut ScriptedEngine::with_samples(2, 4608), &[]).unwrap();
        let b = decode_with_engine(&mut ScriptedEngine::with_samples(2, 4608), &[]).unwrap();
        assert_eq!(a.pcm, b.pcm);
    }

    #[test]
    fn test_播放时长() {
        let mut engine = ScriptedEngine::with_samples(2, 44100);
        let audio = decode_with_engine(&mut engine, &[]).unwrap();
        assert_eq!(audio.duration(), Duration::from_secs(1));
    }
}
