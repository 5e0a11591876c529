//! songs.xml / images.xml 清单解析.
//!
//! 清单格式:
//!
//! ```xml
//! <songs>
//!   <song name="loop_Song">
//!     <title>Song Title</title>
//!     <rhythm>x...o...</rhythm>
//!     <buildup>build_Song</buildup>
//!     <buildupRhythm>....</buildupRhythm>
//!   </song>
//! </songs>
//! ```
//!
//! 解析是宽容的: 单个条目缺字段或畸形只丢弃该条目并记日志,
//! 整个文档不是合法 XML 才算加载错误.

use log::warn;
use roxmltree::{Document, Node};
use xuan_core::{Alignment, XuanError, XuanResult};

/// 一首歌曲的清单条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMeta {
    /// loop 音频的资源名 (Songs/ 下的文件名, 不含扩展名)
    pub loop_name: String,
    /// 展示用标题, 也是查找键
    pub title: String,
    /// loop 段节拍图, 每字符一拍
    pub rhythm: String,
    /// buildup 音频资源名, 无前奏的歌曲为空
    pub buildup_name: Option<String>,
    /// buildup 段节拍图
    pub buildup_rhythm: Option<String>,
}

/// 一张图像的清单条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    /// Images/ 下的文件名 (不含扩展名)
    pub name: String,
    /// 水平对齐方式
    pub alignment: Alignment,
}

/// 解析 songs.xml 文本
pub fn parse_songs(xml: &str) -> XuanResult<Vec<SongMeta>> {
    let doc = parse_document(xml, "songs.xml")?;
    let mut songs = Vec::new();

    for node in doc.root_element().children().filter(Node::is_element) {
        if node.tag_name().name() != "song" {
            continue;
        }
        let Some(loop_name) = node.attribute("name") else {
            warn!("songs.xml 中有 song 条目缺少 name 属性, 丢弃");
            continue;
        };
        let Some(title) = child_text(&node, "title") else {
            warn!("歌曲条目 [{loop_name}] 缺少 title, 丢弃");
            continue;
        };
        let rhythm = child_text(&node, "rhythm").unwrap_or_default();
        let buildup_name = child_text(&node, "buildup");
        let buildup_rhythm = child_text(&node, "buildupRhythm");

        songs.push(SongMeta {
            loop_name: loop_name.to_string(),
            title,
            rhythm,
            buildup_name,
            buildup_rhythm,
        });
    }

    Ok(songs)
}

/// 解析 images.xml 文本
pub fn parse_images(xml: &str) -> XuanResult<Vec<ImageMeta>> {
    let doc = parse_document(xml, "images.xml")?;
    let mut images = Vec::new();

    for node in doc.root_element().children().filter(Node::is_element) {
        if node.tag_name().name() != "image" {
            continue;
        }
        let Some(name) = node.attribute("name") else {
            warn!("images.xml 中有 image 条目缺少 name 属性, 丢弃");
            continue;
        };
        let alignment = child_text(&node, "align")
            .map(|s| Alignment::from_name(&s))
            .unwrap_or_default();

        images.push(ImageMeta {
            name: name.to_string(),
            alignment,
        });
    }

    Ok(images)
}

fn parse_document<'a>(xml: &'a str, which: &str) -> XuanResult<Document<'a>> {
    Document::parse(xml)
        .map_err(|e| XuanError::InvalidData(format!("清单 [{which}] 不是合法 XML: {e}")))
}

fn child_text(node: &Node, tag: &str) -> Option<String> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
