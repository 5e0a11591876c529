//! 音频输出模块.
//!
//! 使用 cpal 进行跨平台音频输出. 播放模型是整段提交:
//! 调度器把一段完整 PCM 一次交给输出端, 回调线程从共享队列里
//! 按需取走, 提交调用本身不阻塞 (调度死线不受设备缓冲影响).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info};
use xuan_core::{XuanError, XuanResult};
use xuan_player::AudioSink;

/// 音频输出管理器
pub struct AudioOutput {
    /// cpal 音频流 (需要持有以保持播放)
    _stream: cpal::Stream,
    /// 待播放采样队列 (f32 交错)
    queue: Arc<Mutex<VecDeque<f32>>>,
    /// 约定的输入参数
    sample_rate: u32,
    channels: u32,
    /// 音量 (0.0 ~ 1.0), 在提交时应用
    volume: f32,
}

impl AudioOutput {
    /// 创建音频输出流
    pub fn try_new(sample_rate: u32, channels: u32, volume: f32) -> XuanResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| XuanError::AudioOutput("找不到音频输出设备".into()))?;

        info!("音频设备: {:?}", device.name().unwrap_or_default());

        let config = cpal::StreamConfig {
            channels: channels as u16,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));
        let queue_cb = Arc::clone(&queue);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = queue_cb.lock().unwrap();
                    for sample in data.iter_mut() {
                        *sample = queue.pop_front().unwrap_or(0.0);
                    }
                },
                move |err| {
                    error!("音频输出错误: {err}");
                },
                None,
            )
            .map_err(|e| XuanError::AudioOutput(format!("创建音频流失败: {e}")))?;

        stream
            .play()
            .map_err(|e| XuanError::AudioOutput(format!("启动音频播放失败: {e}")))?;

        debug!("音频输出已启动: {sample_rate}Hz/{channels}ch");

        Ok(Self {
            _stream: stream,
            queue,
            sample_rate,
            channels,
            volume,
        })
    }
}

impl AudioSink for AudioOutput {
    /// 整段提交 16 位小端交错 PCM, 立即返回
    fn play(&mut self, pcm: &[u8], channels: u32, sample_rate: u32) -> XuanResult<()> {
        if channels != self.channels || sample_rate != self.sample_rate {
            return Err(XuanError::AudioOutput(format!(
                "流参数 {channels}ch/{sample_rate}Hz 与输出端 {}ch/{}Hz 不符",
                self.channels, self.sample_rate
            )));
        }

        // 整段转换在锁外完成; 回调线程在段落边界只等一次 extend,
        // 不等几百万次逐样本转换
        let samples = convert_pcm(pcm, self.volume);
        self.queue.lock().unwrap().extend(samples);
        debug!("提交音频段: {} 字节", pcm.len());
        Ok(())
    }
}

/// 把 16 位小端交错 PCM 转换为 f32 采样并应用音量.
///
/// 不触碰播放队列, 调用时允许回调线程正持有队列锁.
fn convert_pcm(pcm: &[u8], volume: f32) -> Vec<f32> {
    let mut samples = Vec::with_capacity(pcm.len() / 2);
    for bytes in pcm.chunks_exact(2) {
        let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        samples.push(f32::from(sample) / 32768.0 * volume);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm转换_小端与音量() {
        // 0x4000 = 16384 -> 0.5; 音量减半后 0.25
        let pcm = [0x00, 0x40, 0x00, 0xC0];
        let samples = convert_pcm(&pcm, 0.5);
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 0.25).abs() < 1e-6);
        assert!((samples[1] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_转换不依赖队列锁() {
        // 模拟回调线程持有队列锁: 转换仍能完成, 说明转换路径不碰锁
        let queue: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));
        let mut held = queue.lock().unwrap();

        let pcm = vec![0x34u8; 44100 * 4];
        let samples = convert_pcm(&pcm, 1.0);
        assert_eq!(samples.len(), pcm.len() / 2);

        // 锁只在入队一瞬间需要
        held.extend(samples);
        assert_eq!(held.len(), pcm.len() / 2);
    }
}
