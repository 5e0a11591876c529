//! 图像资产解码.
//!
//! 把 PNG 字节解码为 RGBA8 像素, 供加载线程在渲染循环启动前批量
//! 装入 [`crate::RenderState`]. 单张解码失败只丢弃该张并记日志.

use log::{debug, warn};
use xuan_core::{Alignment, XuanError, XuanResult};

use crate::state::ImageAsset;

/// 解码一张 PNG 为 RGBA8 资产
pub fn decode_png(data: &[u8], alignment: Alignment) -> XuanResult<ImageAsset> {
    let decoder = png::Decoder::new(data);
    let mut reader = decoder
        .read_info()
        .map_err(|e| XuanError::InvalidData(format!("PNG 头解析失败: {e}")))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| XuanError::InvalidData(format!("PNG 解码失败: {e}")))?;
    buf.truncate(info.buffer_size());

    let rgba = match (info.color_type, info.bit_depth) {
        (png::ColorType::Rgba, png::BitDepth::Eight) => buf,
        (png::ColorType::Rgb, png::BitDepth::Eight) => {
            // 补上不透明 alpha
            let mut out = Vec::with_capacity(buf.len() / 3 * 4);
            for p in buf.chunks_exact(3) {
                out.extend_from_slice(&[p[0], p[1], p[2], 255]);
            }
            out
        }
        (color_type, bit_depth) => {
            return Err(XuanError::InvalidData(format!(
                "不支持的 PNG 像素格式: {color_type:?}/{bit_depth:?}"
            )));
        }
    };

    debug!("PNG 解码完成: {}x{}", info.width, info.height);
    Ok(ImageAsset {
        width: info.width,
        height: info.height,
        rgba,
        alignment,
    })
}

/// 批量解码: `(名称, 对齐, PNG 字节)` 列表, 坏图跳过
pub fn decode_all(
    entries: Vec<(String, Alignment, Vec<u8>)>,
) -> Vec<(String, ImageAsset)> {
    let mut out = Vec::with_capacity(entries.len());
    for (name, alignment, bytes) in entries {
        match decode_png(&bytes, alignment) {
            Ok(asset) => out.push((name, asset)),
            Err(e) => warn!("图像 [{name}] 解码失败, 跳过: {e}"),
        }
    }
    out
}
