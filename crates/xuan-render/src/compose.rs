//! 颜色计算与硬光合成.
//!
//! 颜色来自 6 位索引, 拆成三个 2 位通道归一化到 [0,1];
//! 图像与颜色的混合用硬光式 (hard light) 混合: 按混合色的亮度在
//! 加深 (multiply) 与提亮 (screen) 之间选择或插值, 保证着色后的
//! 图像保留对比度而不是被平涂.

use crate::surface::Surface;

/// 亮度加权系数 (Rec. 709)
const LUM_COEFF: [f32; 3] = [0.2125, 0.7154, 0.0721];

/// 硬光混合的亮度门限: 低于下限纯加深, 高于上限纯提亮, 之间线性插值
const LUM_GATE_LOW: f32 = 0.45;
const LUM_GATE_HIGH: f32 = 0.55;

/// 把 6 位颜色索引拆成 [0,1] 的 RGB 三元组.
///
/// 索引布局: 低 2 位红, 中 2 位绿, 高 2 位蓝, 每通道 4 级.
pub fn color_from_index(index: u8) -> [f32; 3] {
    let index = index & 0x3F;
    [
        f32::from(index & 0x03) / 3.0,
        f32::from((index >> 2) & 0x03) / 3.0,
        f32::from((index >> 4) & 0x03) / 3.0,
    ]
}

/// 单通道硬光混合
fn hard_light_channel(blend: f32, base: f32, luminance: f32) -> f32 {
    let darken = 2.0 * blend * base;
    let lighten = 1.0 - 2.0 * (1.0 - blend) * (1.0 - base);
    if luminance < LUM_GATE_LOW {
        darken
    } else if luminance > LUM_GATE_HIGH {
        lighten
    } else {
        let t = (luminance - LUM_GATE_LOW) * 10.0;
        darken + (lighten - darken) * t
    }
}

/// 对一个图像像素做硬光着色, 再按图像 alpha 叠加到背景色上
pub fn shade_pixel(image_rgba: [u8; 4], color: [f32; 3]) -> [u8; 4] {
    let luminance =
        color[0] * LUM_COEFF[0] + color[1] * LUM_COEFF[1] + color[2] * LUM_COEFF[2];
    let alpha = f32::from(image_rgba[3]) / 255.0;

    let mut out = [0u8; 4];
    for c in 0..3 {
        let base = f32::from(image_rgba[c]) / 255.0;
        let shaded = hard_light_channel(color[c], base, luminance).clamp(0.0, 1.0);
        // alpha 之外露出背景色
        let mixed = shaded * alpha + color[c] * (1.0 - alpha);
        out[c] = (mixed * 255.0 + 0.5) as u8;
    }
    out[3] = 255;
    out
}

/// 把图像拉伸合成到整个目标面上, 背景为索引色, 图像经硬光着色.
///
/// 无图像时退化为纯色填充. 采样用最近邻, 调用方负责锁保护.
pub fn compose(
    target: &mut Surface,
    image: Option<(&[u8], u32, u32)>,
    color: [f32; 3],
) {
    let bg = [
        (color[0] * 255.0 + 0.5) as u8,
        (color[1] * 255.0 + 0.5) as u8,
        (color[2] * 255.0 + 0.5) as u8,
        255,
    ];
    target.fill(bg);

    let Some((pixels, img_w, img_h)) = image else {
        return;
    };
    if img_w == 0 || img_h == 0 {
        return;
    }

    let (w, h) = (target.width(), target.height());
    for y in 0..h {
        let src_y = (u64::from(y) * u64::from(img_h) / u64::from(h.max(1))) as usize;
        for x in 0..w {
            let src_x = (u64::from(x) * u64::from(img_w) / u64::from(w.max(1))) as usize;
            let off = (src_y * img_w as usize + src_x) * 4;
            let src = [pixels[off], pixels[off + 1], pixels[off + 2], pixels[off + 3]];
            target.put_pixel(x, y, shade_pixel(src, color));
        }
    }
}
