//! SDL2 窗口与呈现循环.
//!
//! 渲染逻辑全部在 [`xuan_render::RenderState`] 里, 这里只负责:
//! 事件处理 (退出/改尺寸), 周期 tick, 把像素面贴成流式纹理上屏.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use xuan_core::{XuanError, XuanResult};
use xuan_render::{RenderState, Surface};

/// 帧间隔 (约 60fps, 同时是衰减 tick 周期)
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// 运行呈现循环直到窗口关闭 (必须在主线程调用)
pub fn run(state: Arc<RenderState>, width: u32, height: u32, title: &str) -> XuanResult<()> {
    let sdl = sdl2::init().map_err(XuanError::Render)?;
    let video = sdl.video().map_err(XuanError::Render)?;

    let window = video
        .window(title, width, height)
        .position_centered()
        .resizable()
        .build()
        .map_err(|e| XuanError::Render(format!("创建窗口失败: {e}")))?;
    let mut canvas = window
        .into_canvas()
        .build()
        .map_err(|e| XuanError::Render(format!("创建画布失败: {e}")))?;
    let texture_creator = canvas.texture_creator();
    let mut event_pump = sdl.event_pump().map_err(XuanError::Render)?;

    let mut surface = Surface::new(width, height);
    // ABGR8888 在小端机器上的内存序正好是 R,G,B,A
    let mut texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::ABGR8888, width, height)
        .map_err(|e| XuanError::Render(format!("创建纹理失败: {e}")))?;

    info!("窗口就绪: {width}x{height}");

    'running: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape | Keycode::Q),
                    ..
                } => break 'running,
                Event::Window {
                    win_event: WindowEvent::SizeChanged(w, h),
                    ..
                } => {
                    let (w, h) = (w.max(1) as u32, h.max(1) as u32);
                    info!("窗口改尺寸: {w}x{h}");
                    state.resize(w, h);
                    surface.reset(w, h);
                    texture = texture_creator
                        .create_texture_streaming(PixelFormatEnum::ABGR8888, w, h)
                        .map_err(|e| XuanError::Render(format!("重建纹理失败: {e}")))?;
                }
                _ => {}
            }
        }

        state.tick();
        // 状态没变就不重新合成/上传, 窗口保留上一帧
        if state.take_redraw() {
            state.draw_frame(&mut surface);
            texture
                .update(None, surface.data(), surface.stride())
                .map_err(|e| XuanError::Render(format!("更新纹理失败: {e}")))?;
            canvas
                .copy(&texture, None, None)
                .map_err(XuanError::Render)?;
            canvas.present();
        }

        std::thread::sleep(FRAME_INTERVAL);
    }

    info!("窗口关闭, 退出呈现循环");
    Ok(())
}
