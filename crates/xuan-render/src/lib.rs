//! 渲染状态库.
//!
//! 核心是 [`RenderState`]: 一个跨线程共享的渲染状态机, 调度线程写入
//! 图像/颜色/模糊振幅, 绘制线程读出并合成到 [`Surface`] 像素面.
//! 合成全部在 CPU 上进行, 与窗口系统解耦.

pub mod blur;
pub mod compose;
pub mod loader;
pub mod state;
pub mod surface;

pub use loader::{decode_all, decode_png};
pub use state::{ImageAsset, RenderState};
pub use surface::Surface;
