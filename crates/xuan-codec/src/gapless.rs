//! LAME/Xing gapless 标签探测.
//!
//! LAME 系编码器在首帧 side information 区写入一个信息标签, 记录编码器
//! 引入的起始延迟和尾部填充样本数. 解码后按它修剪, 才能得到与原始波形
//! 等长的无缝 PCM.
//!
//! 标签布局 (相对首帧起始):
//! - 立体声 side info 之后 (偏移 36) 或单声道之后 (偏移 21):
//!   4 字节签名 `Xing` 或 `Info`
//! - 签名后 4 字节 flags, 每个置位的 flag 追加一段定长字段:
//!   0x01 帧数 (4 字节大端), 0x02 字节数 (4 字节), 0x04 TOC (100 字节),
//!   0x08 质量 (4 字节)
//! - 紧随其后的 `LAME` 签名 + 版本串, 再偏移 22 字节处是 3 字节打包的
//!   12 位延迟 + 12 位填充

use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

/// MP3 解码管线自身的固定延迟 (样本), 计入起始延迟.
///
/// 这个数字是个魔法值, 随 MPEG audio 参考解码器的滤波器组结构而来.
pub const DECODER_DELAY: u32 = 529;

/// MPEG-1 Layer III 每帧样本数
pub const SAMPLES_PER_FRAME: u64 = 1152;

/// gapless 播放信息: 解码后需要修剪的头尾样本数与真实总样本数.
///
/// 不变量: `解码样本数 - delay - padding == total_samples`,
/// 不满足时数据不一致, 解码失败.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaplessInfo {
    /// 流起始处被编码器消耗的样本数 (含解码管线延迟)
    pub delay: u32,
    /// 流尾部的静音填充样本数
    pub padding: u32,
    /// 修剪后的真实样本数 (每声道)
    pub total_samples: u64,
}

/// 在压缩数据头部探测 gapless 标签.
///
/// 找不到标签不是错误 (很多编码器不写), 返回 `None` 表示跳过修剪;
/// 字段不一致 (延迟+填充超过总帧长) 按畸形标签处理, 记日志后同样跳过.
pub fn probe(data: &[u8]) -> Option<GaplessInfo> {
    // 帧同步字 + 最小标签长度检查
    if data.len() <= 180 || data[0] != 0xFF || data[1] & 0xF0 != 0xF0 {
        return None;
    }

    // 双声道与单声道布局的 side info 长度不同, 标签偏移随之不同
    let base = if has_info_tag(data, 36) {
        36
    } else if has_info_tag(data, 21) {
        21
    } else {
        return None;
    };

    // 签名 4 字节 + 版本/flags 前导, flags 字节位于签名后第 7 字节
    let mut pos = base + 7;
    let flags = *data.get(pos)?;

    let mut frame_count = 0u64;
    if flags & 0x01 != 0 {
        frame_count = u64::from(BigEndian::read_u32(data.get(pos + 1..pos + 5)?));
        pos += 4;
    }
    if flags & 0x02 != 0 {
        pos += 4; // 字节数
    }
    if flags & 0x04 != 0 {
        pos += 100; // TOC
    }
    if flags & 0x08 != 0 {
        pos += 4; // 质量指示
    }

    if data.get(pos + 1..pos + 5)? != b"LAME" {
        debug!("Xing/Info 标签后没有 LAME 扩展, 跳过 gapless 修剪");
        return None;
    }

    // LAME 版本串等共 22 字节, 之后是 3 字节打包的延迟/填充
    pos += 22;
    let packed = data.get(pos..pos + 3)?;
    let delay = (u32::from(packed[0]) << 4 | u32::from(packed[1]) >> 4) + DECODER_DELAY;
    let padding = (u32::from(packed[1]) & 0xF) << 8 | u32::from(packed[2]);

    let total_samples = match (frame_count * SAMPLES_PER_FRAME)
        .checked_sub(u64::from(delay) + u64::from(padding))
    {
        Some(n) => n,
        None => {
            warn!(
                "gapless 标签畸形: 帧数 {} 装不下延迟 {} + 填充 {}, 跳过修剪",
                frame_count, delay, padding
            );
            return None;
        }
    };

    Some(GaplessInfo {
        delay,
        padding,
        total_samples,
    })
}

fn has_info_tag(data: &[u8], offset: usize) -> bool {
    matches!(
        data.get(offset..offset + 4),
        Some(b"Xing") | Some(b"Info")
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 构造一个带 Xing+LAME 标签的合成首帧 (立体声布局)
    pub(crate) fn make_tagged_frame(
        frame_count: u32,
        enc_delay: u16,
        enc_padding: u16,
    ) -> Vec<u8> {
        let mut data = vec![0u8; 512];
        data[0] = 0xFF;
        data[1] = 0xFB;
        data[36..40].copy_from_slice(b"Xing");
        // flags: 帧数 + 字节数 + TOC + 质量
        data[43] = 0x0F;
        data[44..48].copy_from_slice(&frame_count.to_be_bytes());
        // 字节数(4) + TOC(100) + 质量(4) 之后是 LAME 签名
        let lame = 43 + 4 + 4 + 100 + 4 + 1;
        data[lame..lame + 4].copy_from_slice(b"LAME");
        // 延迟/填充打包: dddddddd ddddpppp pppppppp
        let packed = lame - 1 + 22;
        data[packed] = (enc_delay >> 4) as u8;
        data[packed + 1] = ((enc_delay & 0xF) << 4) as u8 | (enc_padding >> 8) as u8;
        data[packed + 2] = (enc_padding & 0xFF) as u8;
        data
    }

    #[test]
    fn test_标签解析() {
        let data = make_tagged_frame(100, 576, 1000);
        let info = probe(&data).expect("应当找到标签");
        assert_eq!(info.delay, 576 + DECODER_DELAY);
        assert_eq!(info.padding, 1000);
        assert_eq!(
            info.total_samples,
            100 * SAMPLES_PER_FRAME - u64::from(info.delay) - 1000
        );
    }

    #[test]
    fn test_无同步字返回空() {
        let data = vec![0u8; 512];
        assert!(probe(&data).is_none());
    }

    #[test]
    fn test_数据太短返回空() {
        let mut data = vec![0u8; 64];
        data[0] = 0xFF;
        data[1] = 0xFB;
        assert!(probe(&data).is_none());
    }

    #[test]
    fn test_无lame扩展返回空() {
        let mut data = make_tagged_frame(100, 576, 1000);
        let lame = 43 + 4 + 4 + 100 + 4 + 1;
        data[lame..lame + 4].copy_from_slice(b"XXXX");
        assert!(probe(&data).is_none());
    }

    #[test]
    fn test_畸形标签跳过() {
        // 帧数 0 但延迟/填充非零: 总样本数下溢
        let data = make_tagged_frame(0, 576, 1000);
        assert!(probe(&data).is_none());
    }

    #[test]
    fn test_info签名同样接受() {
        let mut data = make_tagged_frame(10, 0, 0);
        data[36..40].copy_from_slice(b"Info");
        let info = probe(&data).expect("Info 签名应当接受");
        assert_eq!(info.delay, DECODER_DELAY);
    }
}
