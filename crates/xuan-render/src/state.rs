//! 并发渲染状态机.
//!
//! 调度线程通过 `set_image` / `set_color` 写入, 绘制线程通过
//! `draw_frame` 读取, 全部共享字段收拢在一把读写锁后面: 读者互不
//! 阻塞, 写者独占. 锁从不跨越睡眠持有.
//!
//! 模糊振幅是一个指数衰减状态机: 节拍把某根轴置 1.0, 之后每个
//! `tick` 把两轴除以衰减系数, 低于阈值后吸附到 0 (稳定态).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, RwLock};

use log::{info, warn};
use xuan_core::{Alignment, Beat, XuanError, XuanResult};

use crate::blur;
use crate::compose;
use crate::surface::Surface;

/// 每个衰减 tick 两轴振幅除以的系数
const DECAY_FACTOR: f32 = 1.3;
/// 振幅低于该阈值即吸附为 0
const DECAY_EPSILON: f32 = 0.01;
/// 短黑场持续的 tick 数 (60 tick/s 下约 50ms)
const SHORT_BLACKOUT_TICKS: u32 = 3;

/// 已解码的图像资产 (RGBA8 行优先)
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub alignment: Alignment,
}

/// 黑场状态: 持续黑场到下一次切换, 或限时短黑场
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blackout {
    Off,
    Hold,
    Short(u32),
}

/// 跨线程共享的渲染记录
#[derive(Debug)]
struct RenderRecord {
    current_image: Option<String>,
    color_index: u8,
    blur_x: f32,
    blur_y: f32,
    blackout: Blackout,
}

/// 线程安全的渲染状态
pub struct RenderState {
    record: RwLock<RenderRecord>,
    // 锁序: 需要双锁时先 record 后 assets
    assets: RwLock<HashMap<String, ImageAsset>>,
    // 模糊中转面, 只有绘制线程竞争
    scratch: Mutex<(Surface, Surface)>,
    needs_redraw: AtomicBool,
    ready: Mutex<bool>,
    ready_cv: Condvar,
}

impl RenderState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            record: RwLock::new(RenderRecord {
                current_image: None,
                color_index: 0,
                blur_x: 0.0,
                blur_y: 0.0,
                blackout: Blackout::Off,
            }),
            assets: RwLock::new(HashMap::new()),
            scratch: Mutex::new((Surface::new(width, height), Surface::new(width, height))),
            needs_redraw: AtomicBool::new(true),
            ready: Mutex::new(false),
            ready_cv: Condvar::new(),
        }
    }

    /// 批量装入图像资产 (加载线程调用)
    pub fn load_images(&self, images: Vec<(String, ImageAsset)>) {
        let mut assets = self.assets.write().unwrap();
        for (name, asset) in images {
            assets.insert(name, asset);
        }
        info!("图像资产装载完毕, 共 {} 张", assets.len());
    }

    /// 已装载的图像名称列表
    pub fn image_names(&self) -> Vec<String> {
        self.assets.read().unwrap().keys().cloned().collect()
    }

    /// 宣告初始资产装载完成 (一次性信号)
    pub fn mark_ready(&self) {
        let mut ready = self.ready.lock().unwrap();
        *ready = true;
        self.ready_cv.notify_all();
    }

    /// 阻塞等待初始资产装载完成
    pub fn wait_ready(&self) {
        let mut ready = self.ready.lock().unwrap();
        while !*ready {
            ready = self.ready_cv.wait(ready).unwrap();
        }
    }

    /// 切换当前图像并按切换类型武装模糊/黑场.
    ///
    /// 引用未装载的资产是请求错误, 不改动绘制状态, 绘制循环不受影响.
    pub fn set_image(&self, image_name: &str, transition: Beat) -> XuanResult<()> {
        let mut record = self.record.write().unwrap();

        if !self.assets.read().unwrap().contains_key(image_name) {
            warn!("切换到图像 [{image_name}] 失败: 未装载");
            return Err(XuanError::Render(format!("图像 [{image_name}] 未装载")));
        }

        record.current_image = Some(image_name.to_string());
        match transition {
            Beat::VerticalBlur => record.blur_y = 1.0,
            Beat::HorizontalBlur => record.blur_x = 1.0,
            Beat::Blackout => record.blackout = Blackout::Hold,
            Beat::ShortBlackout => record.blackout = Blackout::Short(SHORT_BLACKOUT_TICKS),
            _ => {}
        }
        // 黑场以外的切换解除持续黑场
        if !matches!(transition, Beat::Blackout | Beat::ShortBlackout)
            && record.blackout == Blackout::Hold
        {
            record.blackout = Blackout::Off;
        }
        drop(record);

        self.needs_redraw.store(true, Ordering::Release);
        info!("开始切换到图像 [{image_name}]");
        Ok(())
    }

    /// 设置颜色索引: 负数夹取为 0, 超界按 6 位回绕
    pub fn set_color(&self, color_index: i32) {
        let mut record = self.record.write().unwrap();
        record.color_index = if color_index < 0 {
            0
        } else {
            (color_index % 0x40) as u8
        };
        if record.blackout == Blackout::Hold {
            record.blackout = Blackout::Off;
        }
        drop(record);
        self.needs_redraw.store(true, Ordering::Release);
    }

    /// 当前颜色索引 (测试与日志用)
    pub fn color_index(&self) -> u8 {
        self.record.read().unwrap().color_index
    }

    /// 当前两轴模糊振幅
    pub fn blur_amplitudes(&self) -> (f32, f32) {
        let record = self.record.read().unwrap();
        (record.blur_x, record.blur_y)
    }

    /// 周期衰减 (约 60/s): 振幅指数衰减并吸附, 短黑场倒计时
    pub fn tick(&self) {
        let mut guard = self.record.write().unwrap();
        let record = &mut *guard;

        let mut changed = false;
        for amplitude in [&mut record.blur_x, &mut record.blur_y] {
            if *amplitude > 0.0 {
                *amplitude /= DECAY_FACTOR;
                if *amplitude < DECAY_EPSILON {
                    *amplitude = 0.0;
                }
                changed = true;
            }
        }

        if let Blackout::Short(remaining) = record.blackout {
            record.blackout = if remaining <= 1 {
                Blackout::Off
            } else {
                Blackout::Short(remaining - 1)
            };
            changed = true;
        }
        drop(guard);

        if changed {
            self.needs_redraw.store(true, Ordering::Release);
        }
    }

    /// 自上次绘制以来是否有状态变化 (取走标志)
    pub fn take_redraw(&self) -> bool {
        self.needs_redraw.swap(false, Ordering::AcqRel)
    }

    /// 重建中转面到新尺寸, 与在途绘制串行
    pub fn resize(&self, width: u32, height: u32) {
        let mut scratch = self.scratch.lock().unwrap();
        scratch.0.reset(width, height);
        scratch.1.reset(width, height);
        self.needs_redraw.store(true, Ordering::Release);
    }

    /// 把当前状态绘制到目标面.
    ///
    /// 共享锁下读取记录快照后立刻放锁, 重量级的合成与模糊在锁外进行.
    pub fn draw_frame(&self, target: &mut Surface) {
        let (image_name, color_index, blur_x, blur_y, blacked_out) = {
            let record = self.record.read().unwrap();
            (
                record.current_image.clone(),
                record.color_index,
                record.blur_x,
                record.blur_y,
                record.blackout != Blackout::Off,
            )
        };

        if blacked_out {
            target.fill([0, 0, 0, 255]);
            return;
        }

        let color = compose::color_from_index(color_index);
        let assets = self.assets.read().unwrap();
        let image = image_name
            .as_deref()
            .and_then(|name| assets.get(name))
            .map(|a| (a.rgba.as_slice(), a.width, a.height));

        if blur_x <= 0.0 && blur_y <= 0.0 {
            compose::compose(target, image, color);
            return;
        }

        // 模糊路径: 先合成到离屏面, 再两趟一维卷积回写目标面
        let spread = blur::blur_spread(blur_x, blur_y, target.width(), target.height());
        let mut scratch = self.scratch.lock().unwrap();
        let (offscreen, mid) = &mut *scratch;
        if offscreen.width() != target.width() || offscreen.height() != target.height() {
            offscreen.reset(target.width(), target.height());
            mid.reset(target.width(), target.height());
        }
        compose::compose(offscreen, image, color);
        blur::blur(offscreen, mid, target, spread);
    }
}
