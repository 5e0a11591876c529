//! 解码引擎抽象与 symphonia MP3 实现.
//!
//! 引擎只负责把压缩帧还原为高精度采样, gapless 修剪和抖动量化在上层
//! [`crate::decoder`] 完成. trait 化是为了让上层逻辑可以用脚本化引擎
//! 做确定性测试.

use log::{debug, warn};
use symphonia_bundle_mp3::MpaDecoder;
use symphonia_core::audio::SampleBuffer;
use symphonia_core::codecs::{
    CodecParameters as SymCodecParameters, Decoder as SymDecoderTrait,
    DecoderOptions as SymDecoderOptions, CODEC_TYPE_MP3,
};
use symphonia_core::formats::Packet as SymPacket;
use xuan_core::{XuanError, XuanResult};

use crate::dither::FRAC_BITS;

/// 引擎输出的一帧高精度采样
#[derive(Debug, Clone)]
pub struct EngineFrame {
    /// 声道数 (1 或 2), 整条流内固定
    pub channels: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 28 位定点交错采样, 长度 = 每声道样本数 × 声道数
    pub samples: Vec<i32>,
}

impl EngineFrame {
    /// 每声道样本数
    pub fn samples_per_channel(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// 解码引擎接口.
///
/// 输入模型是一次性的: 整段压缩数据通过一次 `send_input` 送入,
/// 第二次调用是输入结束信号, 引擎应干净地停止而不是报错.
/// 帧级解码错误由引擎记录日志并跳过, 只有不可恢复的失败才向上传播.
pub trait DecodeEngine: Send {
    /// 送入整段压缩数据 (或以第二次调用宣告输入结束)
    fn send_input(&mut self, data: &[u8]) -> XuanResult<()>;

    /// 取出下一帧解码采样
    ///
    /// # 返回
    /// - `Ok(frame)`: 成功取出一帧
    /// - `Err(XuanError::Eof)`: 所有输入已解码完毕
    fn receive_frame(&mut self) -> XuanResult<EngineFrame>;
}

/// MP3 帧头 (只保留分帧所需字段)
#[derive(Debug, Clone, Copy)]
struct FrameHeader {
    sample_rate: u32,
    channels: u32,
    frame_size: usize,
    samples_per_frame: u64,
}

/// MPEG-1 Layer III 比特率表 (kbps)
const BITRATE_V1_L3: [u32; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// MPEG-2/2.5 Layer III 比特率表 (kbps)
const BITRATE_V2_L3: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// 采样率表 [version][sr_index]
const SAMPLE_RATES: [[u32; 3]; 3] = [
    [44100, 48000, 32000], // MPEG-1
    [22050, 24000, 16000], // MPEG-2
    [11025, 12000, 8000],  // MPEG-2.5
];

/// 解析 4 字节 MP3 帧头, 用于把字节流切成完整帧
fn parse_frame_header(data: &[u8]) -> XuanResult<FrameHeader> {
    if data.len() < 4 {
        return Err(XuanError::InvalidData("MP3 帧头不足 4 字节".into()));
    }
    if data[0] != 0xFF || data[1] & 0xE0 != 0xE0 {
        return Err(XuanError::InvalidData("MP3 同步字无效".into()));
    }

    // version: 3=MPEG1, 2=MPEG2, 0=MPEG2.5
    let version_bits = (data[1] >> 3) & 0x03;
    let ver_idx = match version_bits {
        3 => 0,
        2 => 1,
        0 => 2,
        _ => return Err(XuanError::InvalidData("MPEG 版本保留位".into())),
    };

    // Layer III = 01
    if (data[1] >> 1) & 0x03 != 1 {
        return Err(XuanError::InvalidData("非 Layer III 帧".into()));
    }

    let bitrate_index = ((data[2] >> 4) & 0x0F) as usize;
    if bitrate_index == 0 || bitrate_index >= 15 {
        return Err(XuanError::InvalidData("MP3 比特率索引无效".into()));
    }
    let bitrate = if ver_idx == 0 {
        BITRATE_V1_L3[bitrate_index] * 1000
    } else {
        BITRATE_V2_L3[bitrate_index] * 1000
    };

    let sr_index = ((data[2] >> 2) & 0x03) as usize;
    if sr_index >= 3 {
        return Err(XuanError::InvalidData("MP3 采样率索引无效".into()));
    }
    let sample_rate = SAMPLE_RATES[ver_idx][sr_index];
    let padding = u32::from((data[2] >> 1) & 0x01);

    let channels = if (data[3] >> 6) & 0x03 == 3 { 1 } else { 2 };
    let samples_per_frame: u64 = if ver_idx == 0 { 1152 } else { 576 };

    let frame_size = if ver_idx == 0 {
        (144 * bitrate / sample_rate + padding) as usize
    } else {
        (72 * bitrate / sample_rate + padding) as usize
    };

    Ok(FrameHeader {
        sample_rate,
        channels,
        frame_size,
        samples_per_frame,
    })
}

/// 基于 symphonia 的 MP3 解码引擎
pub struct Mp3Engine {
    decoder: MpaDecoder,
    buffer: Vec<u8>,
    pos: usize,
    input_received: bool,
    finished: bool,
    next_ts: u64,
}

impl Mp3Engine {
    /// 创建引擎实例
    pub fn try_new() -> XuanResult<Self> {
        let params = SymCodecParameters {
            codec: CODEC_TYPE_MP3,
            ..Default::default()
        };
        let decoder = MpaDecoder::try_new(&params, &SymDecoderOptions::default())
            .map_err(|e| XuanError::Codec(format!("symphonia mp3 初始化失败: {e}")))?;
        Ok(Self {
            decoder,
            buffer: Vec::new(),
            pos: 0,
            input_received: false,
            finished: false,
            next_ts: 0,
        })
    }

    /// 从当前位置向后查找帧同步字
    fn seek_sync(&mut self) -> bool {
        while self.pos + 1 < self.buffer.len() {
            if self.buffer[self.pos] == 0xFF && self.buffer[self.pos + 1] & 0xE0 == 0xE0 {
                return true;
            }
            self.pos += 1;
        }
        false
    }
}

impl DecodeEngine for Mp3Engine {
    fn send_input(&mut self, data: &[u8]) -> XuanResult<()> {
        if self.input_received {
            // 第二次输入请求 = 输入结束信号
            debug!("解码引擎收到输入结束信号");
            self.finished = true;
            return Ok(());
        }
        self.buffer = data.to_vec();
        self.pos = 0;
        self.input_received = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> XuanResult<EngineFrame> {
        if !self.input_received {
            return Err(XuanError::NeedMoreData);
        }

        loop {
            if self.finished || !self.seek_sync() {
                return Err(XuanError::Eof);
            }

            let header = match parse_frame_header(&self.buffer[self.pos..]) {
                Ok(h) => h,
                Err(_) => {
                    // 假同步字, 向后滑动继续找
                    self.pos += 1;
                    continue;
                }
            };

            if self.pos + header.frame_size > self.buffer.len() {
                // 尾部残缺帧, 丢弃
                return Err(XuanError::Eof);
            }

            let frame_data = &self.buffer[self.pos..self.pos + header.frame_size];
            let packet = SymPacket::new_from_slice(
                0,
                self.next_ts,
                header.samples_per_frame,
                frame_data,
            );
            self.pos += header.frame_size;

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut sample_buf =
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    sample_buf.copy_interleaved_ref(decoded);
                    let raw = sample_buf.samples();
                    if raw.is_empty() {
                        continue;
                    }

                    // f32 -> 28 位定点, 裁剪交给抖动器
                    let one = f64::from(1i32 << FRAC_BITS);
                    let samples: Vec<i32> =
                        raw.iter().map(|&s| (f64::from(s) * one) as i32).collect();

                    self.next_ts += header.samples_per_frame;
                    return Ok(EngineFrame {
                        channels: spec.channels.count() as u32,
                        sample_rate: spec.rate,
                        samples,
                    });
                }
                Err(e) => {
                    // 帧级解码错误不致命: 记录后继续下一帧
                    warn!("MP3 帧解码错误 (字节偏移 {}), 跳过: {e}", self.pos);
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 最小合法帧头: MPEG-1 Layer III, 128kbps, 44100Hz, 立体声
    const HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x04];

    #[test]
    fn test_帧头解析() {
        let header = parse_frame_header(&HEADER).unwrap();
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.channels, 2);
        assert_eq!(header.samples_per_frame, 1152);
        assert_eq!(header.frame_size, 144 * 128000 / 44100);
    }

    #[test]
    fn test_无效帧头() {
        assert!(parse_frame_header(&[0x00, 0x00, 0x00, 0x00]).is_err());
        assert!(parse_frame_header(&[0xFF, 0xFB]).is_err());
        // 比特率索引 0 (free format) 不支持
        assert!(parse_frame_header(&[0xFF, 0xFB, 0x00, 0x04]).is_err());
    }

    #[test]
    fn test_未送入数据时需要更多输入() {
        let mut engine = Mp3Engine::try_new().unwrap();
        assert!(matches!(
            engine.receive_frame(),
            Err(XuanError::NeedMoreData)
        ));
    }

    #[test]
    fn test_垃圾输入干净结束() {
        // 伪造的帧: 头部合法但载荷是噪声, symphonia 帧级报错后应跳过并收尾
        let mut data = vec![0u8; 2048];
        data[..4].copy_from_slice(&HEADER);
        for (i, byte) in data.iter_mut().enumerate().skip(4) {
            *byte = (i * 7 + 3) as u8;
        }

        let mut engine = Mp3Engine::try_new().unwrap();
        engine.send_input(&data).unwrap();
        loop {
            match engine.receive_frame() {
                Ok(_) => continue,
                Err(XuanError::Eof) => break,
                Err(e) => panic!("帧级错误不应向上传播: {e}"),
            }
        }
    }

    #[test]
    fn test_第二次输入视为结束信号() {
        let mut engine = Mp3Engine::try_new().unwrap();
        engine.send_input(&[]).unwrap();
        engine.send_input(&[]).unwrap();
        assert!(matches!(engine.receive_frame(), Err(XuanError::Eof)));
    }
}
