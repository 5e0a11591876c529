//! RGBA8 像素面.
//!
//! 渲染全程在内存像素面上进行, 呈现层 (SDL 窗口等) 只负责把最终
//! 像素面贴到屏幕上, 渲染逻辑因此可以脱离 GPU 单元测试.

/// 行优先 RGBA8 像素缓冲
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    /// 创建全透明黑的像素面
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 行跨度 (字节)
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// 原始像素字节 (RGBA 交错, 行优先)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// 以单一颜色填充整个面
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.data.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
    }

    /// 读一个像素, 越界坐标夹取到边缘
    pub fn pixel_clamped(&self, x: i64, y: i64) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0; 4];
        }
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        let off = y * self.stride() + x * 4;
        [
            self.data[off],
            self.data[off + 1],
            self.data[off + 2],
            self.data[off + 3],
        ]
    }

    /// 写一个像素, 越界坐标忽略
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let off = y as usize * self.stride() + x as usize * 4;
        self.data[off..off + 4].copy_from_slice(&rgba);
    }

    /// 重建为新尺寸 (内容清空)
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data
            .resize((width as usize) * (height as usize) * 4, 0);
    }
}
