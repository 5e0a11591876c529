//! 可分离高斯模糊.
//!
//! 固定 14 抽头核, 先横向再纵向两次一维卷积. 模糊半径由当前振幅
//! 较大的那根轴决定, 另一根轴的贡献在该帧被整个舍弃 (不做混合).

use crate::surface::Surface;

/// 14 抽头对称高斯权重, 运行时按和归一化
const KERNEL: [f32; 14] = [
    0.0117, 0.0237, 0.0425, 0.0677, 0.0962, 0.1216, 0.1367, 0.1367, 0.1216, 0.0962, 0.0677,
    0.0425, 0.0237, 0.0117,
];

/// 振幅 1.0 时的模糊跨度占画面尺寸的比例
const SPREAD_RATIO: f32 = 0.05;

/// 由两轴振幅算出本帧模糊跨度 (像素): 较大轴胜出
pub fn blur_spread(amplitude_x: f32, amplitude_y: f32, width: u32, height: u32) -> f32 {
    let amplitude = amplitude_x.max(amplitude_y);
    let dim = if amplitude_x >= amplitude_y {
        width
    } else {
        height
    };
    amplitude * dim as f32 * SPREAD_RATIO
}

/// 一维卷积: `horizontal` 决定采样方向
fn blur_pass(src: &Surface, dst: &mut Surface, spread: f32, horizontal: bool) {
    let taps = KERNEL.len() as f32;
    let weight_sum: f32 = KERNEL.iter().sum();
    // 抽头间距: 整个核覆盖 [-spread, +spread]
    let step = 2.0 * spread / (taps - 1.0);

    for y in 0..src.height() {
        for x in 0..src.width() {
            let mut acc = [0.0f32; 4];
            for (i, &weight) in KERNEL.iter().enumerate() {
                let offset = (i as f32 - (taps - 1.0) / 2.0) * step;
                let (sx, sy) = if horizontal {
                    (i64::from(x) + offset.round() as i64, i64::from(y))
                } else {
                    (i64::from(x), i64::from(y) + offset.round() as i64)
                };
                let pixel = src.pixel_clamped(sx, sy);
                for c in 0..4 {
                    acc[c] += f32::from(pixel[c]) * weight;
                }
            }
            let mut out = [0u8; 4];
            for c in 0..4 {
                out[c] = (acc[c] / weight_sum + 0.5).clamp(0.0, 255.0) as u8;
            }
            dst.put_pixel(x, y, out);
        }
    }
}

/// 对 `src` 做横向+纵向两次模糊, 结果写入 `dst`.
///
/// `scratch` 承接第一趟输出, 三个面尺寸必须一致.
pub fn blur(src: &Surface, scratch: &mut Surface, dst: &mut Surface, spread: f32) {
    if spread <= 0.5 {
        // 跨度不足一个像素, 直拷
        dst.data_mut().copy_from_slice(src.data());
        return;
    }
    blur_pass(src, scratch, spread, true);
    blur_pass(scratch, dst, spread, false);
}
