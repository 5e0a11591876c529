//! # xuan-play
//!
//! Xuan 音乐视觉播放器: 解码资源包里的歌曲, 按节拍图驱动图像与
//! 颜色的实时切换, 视觉切换与音频时钟严格对齐.
//!
//! 线程结构:
//! - 主线程: SDL2 窗口与呈现循环 (60fps tick + 绘制)
//! - 加载线程: 启动时解码全部 PNG 图像, 装入渲染状态后发就绪信号
//! - 调度线程: 解码歌曲, 提交音频, 逐拍派发视觉切换事件

mod audio;
mod logging;
mod window;

use std::sync::{Arc, Mutex};
use std::thread;

use clap::Parser;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xuan_core::{Beat, XuanError, XuanResult};
use xuan_player::{BeatScheduler, BeatSink, Song};
use xuan_render::RenderState;
use xuan_respack::{ResourcePack, SongMeta};

/// 初始窗口尺寸
const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;

/// 资源包默认探测路径
const DEFAULT_RESPACK_PATHS: &[&str] = &[
    "respacks/Default/",
    "../respacks/Default/",
    "../../respacks/Default/",
];

/// Xuan 音乐视觉播放器
#[derive(Parser)]
#[command(name = "xuan-play", about = "Xuan 音乐视觉播放器")]
struct Args {
    /// 资源包目录 (缺省探测 respacks/Default/)
    #[arg(long)]
    respack: Option<String>,

    /// 歌曲标题 (缺省随机挑选)
    #[arg(long)]
    song: Option<String>,

    /// 音量 (0-100, 默认 100)
    #[arg(long, default_value = "100")]
    volume: u32,

    /// 日志详细级别 (-v, -vv, -vvv)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 节拍事件的视觉接收端: 每拍随机挑一张图 / 一个颜色索引
struct VisualSink {
    state: Arc<RenderState>,
    rng: Mutex<StdRng>,
}

impl BeatSink for VisualSink {
    fn set_image(&self, transition: Beat) -> XuanResult<()> {
        let names = self.state.image_names();
        if names.is_empty() {
            return Err(XuanError::Render("没有可用的图像资产".into()));
        }
        let pick = self.rng.lock().unwrap().random_range(0..names.len());
        self.state.set_image(&names[pick], transition)
    }

    fn set_color(&self) -> XuanResult<()> {
        let index = self.rng.lock().unwrap().random_range(0..0x40);
        self.state.set_color(index);
        Ok(())
    }
}

fn main() {
    let args = Args::parse();
    logging::init("xuan-play", args.verbose);

    if let Err(e) = run(args) {
        error!("xuan-play 退出: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> XuanResult<()> {
    let pack = match &args.respack {
        Some(path) => ResourcePack::open(path)?,
        None => ResourcePack::open_first(DEFAULT_RESPACK_PATHS)?,
    };

    let meta = pick_song(&pack, args.song.as_deref())?.clone();
    info!("选曲: {}", meta.title);

    // 歌曲字节在移交资源包给加载线程之前读出
    let loop_bytes = pack.read_song_bytes(&meta.loop_name)?;
    let buildup_bytes = match &meta.buildup_name {
        Some(name) => Some(pack.read_song_bytes(name)?),
        None => None,
    };

    let state = Arc::new(RenderState::new(WINDOW_WIDTH, WINDOW_HEIGHT));

    // 加载线程: 读取并解码全部图像, 装入后发一次性就绪信号
    let loader = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            let mut entries = Vec::new();
            for image in pack.images() {
                match pack.read_image_bytes(&image.name) {
                    Ok(bytes) => entries.push((image.name.clone(), image.alignment, bytes)),
                    Err(e) => warn!("读取图像 [{}] 失败, 跳过: {e}", image.name),
                }
            }
            state.load_images(xuan_render::decode_all(entries));
            state.mark_ready();
        })
    };

    // 呈现循环开始消费资产表之前等加载完成
    state.wait_ready();

    // 调度线程: 解码歌曲, 提交音频, 逐拍派发
    let volume = args.volume.min(100) as f32 / 100.0;
    let scheduler_handle = {
        let state = Arc::clone(&state);
        let meta = meta.clone();
        thread::spawn(move || -> XuanResult<()> {
            let song = Song::prepare(
                &meta.title,
                &loop_bytes,
                &meta.rhythm,
                buildup_bytes
                    .as_deref()
                    .map(|bytes| (bytes, meta.buildup_rhythm.as_deref().unwrap_or_default())),
            )?;

            let mut audio = audio::AudioOutput::try_new(
                song.loop_segment.audio.sample_rate,
                song.loop_segment.audio.channels,
                volume,
            )?;
            let visuals = VisualSink {
                state,
                rng: Mutex::new(StdRng::from_os_rng()),
            };

            let mut scheduler = BeatScheduler::new();
            scheduler.run_session(&song, &mut audio, &visuals)
        })
    };

    let result = window::run(
        Arc::clone(&state),
        WINDOW_WIDTH,
        WINDOW_HEIGHT,
        "xuan-play",
    );

    // 窗口关闭后进程随之退出, 调度线程不做协作取消; 但若它已经
    // 出错退出, 把错误带出去
    if scheduler_handle.is_finished() {
        match scheduler_handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(XuanError::Internal("调度线程异常终止".into())),
        }
    }
    let _ = loader.join();

    result
}

/// 按标题查找歌曲, 缺省随机挑一首
fn pick_song<'a>(pack: &'a ResourcePack, title: Option<&str>) -> XuanResult<&'a SongMeta> {
    match title {
        Some(title) => pack.find_song(title),
        None => {
            let songs = pack.songs();
            if songs.is_empty() {
                return Err(XuanError::ResourceNotFound("资源包中没有任何歌曲".into()));
            }
            let pick = StdRng::from_os_rng().random_range(0..songs.len());
            Ok(&songs[pick])
        }
    }
}
