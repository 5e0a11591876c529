//! 资源包 (respack) 加载库.
//!
//! 一个资源包是如下布局的目录:
//!
//! ```text
//! respack/
//!   songs.xml        歌曲清单: 标题, loop/buildup 资源名, 节拍图
//!   images.xml       图像清单: 资源名, 对齐方式
//!   Songs/*.mp3      压缩音频
//!   Images/*.png     图像
//! ```
//!
//! 本 crate 只负责清单解析与原始字节读取, 不做音频/图像解码.

pub mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use xuan_core::{XuanError, XuanResult};

pub use manifest::{ImageMeta, SongMeta};

/// 已加载清单的资源包
#[derive(Debug)]
pub struct ResourcePack {
    base_path: PathBuf,
    songs: Vec<SongMeta>,
    images: Vec<ImageMeta>,
}

impl ResourcePack {
    /// 打开一个资源包目录并解析全部清单.
    ///
    /// 目录或任一清单文件缺失是加载错误; 清单里单个条目畸形只丢弃该条目.
    pub fn open(base_path: impl AsRef<Path>) -> XuanResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            return Err(XuanError::ResourceNotFound(format!(
                "资源包目录不存在: {}",
                base_path.display()
            )));
        }

        info!("加载资源包: {}", base_path.display());

        let songs_xml = read_manifest(&base_path, "songs.xml")?;
        let images_xml = read_manifest(&base_path, "images.xml")?;

        let songs = manifest::parse_songs(&songs_xml)?;
        let images = manifest::parse_images(&images_xml)?;

        info!("发现 {} 首歌曲, {} 张图像", songs.len(), images.len());
        for song in &songs {
            debug!("歌曲: {} (buildup: {})", song.title, song.buildup_name.is_some());
        }

        Ok(Self {
            base_path,
            songs,
            images,
        })
    }

    /// 依次探测一组候选路径, 打开第一个存在的资源包
    pub fn open_first(candidates: &[&str]) -> XuanResult<Self> {
        for path in candidates {
            match Self::open(path) {
                Ok(pack) => return Ok(pack),
                Err(e) => debug!("尝试资源包路径 [{path}] 失败: {e}"),
            }
        }
        Err(XuanError::ResourceNotFound(format!(
            "候选路径中没有可用的资源包: {candidates:?}"
        )))
    }

    /// 资源包根目录
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 全部歌曲元数据
    pub fn songs(&self) -> &[SongMeta] {
        &self.songs
    }

    /// 全部图像元数据
    pub fn images(&self) -> &[ImageMeta] {
        &self.images
    }

    /// 按标题查找歌曲
    pub fn find_song(&self, title: &str) -> XuanResult<&SongMeta> {
        self.songs
            .iter()
            .find(|s| s.title == title)
            .ok_or_else(|| XuanError::ResourceNotFound(format!("资源包中没有歌曲 [{title}]")))
    }

    /// 读取一首歌曲资源的压缩音频字节
    pub fn read_song_bytes(&self, name: &str) -> XuanResult<Vec<u8>> {
        let path = self.base_path.join("Songs").join(format!("{name}.mp3"));
        fs::read(&path).map_err(|e| {
            XuanError::ResourceNotFound(format!("读取音频 [{}] 失败: {e}", path.display()))
        })
    }

    /// 读取一张图像资源的原始 PNG 字节
    pub fn read_image_bytes(&self, name: &str) -> XuanResult<Vec<u8>> {
        let path = self.base_path.join("Images").join(format!("{name}.png"));
        fs::read(&path).map_err(|e| {
            XuanError::ResourceNotFound(format!("读取图像 [{}] 失败: {e}", path.display()))
        })
    }
}

fn read_manifest(base: &Path, name: &str) -> XuanResult<String> {
    let path = base.join(name);
    fs::read_to_string(&path).map_err(|e| {
        XuanError::ResourceNotFound(format!("资源包缺少清单 [{}]: {e}", path.display()))
    })
}
