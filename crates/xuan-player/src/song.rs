//! 歌曲段落准备.
//!
//! 一首歌由可选的 buildup (前奏) 段和必选的 loop 段组成, 每段是
//! 一条解码后的 PCM 加一张节拍图. 解码在进入播放会话之前一次完成.

use log::info;
use xuan_codec::{decode, DecodedAudio};
use xuan_core::XuanResult;

/// 一个可播放段落: 解码音频 + 节拍图
#[derive(Debug, Clone)]
pub struct Segment {
    pub audio: DecodedAudio,
    /// 每字符一拍; 空串按单拍整段处理
    pub rhythm: String,
}

/// 一首准备就绪的歌曲
#[derive(Debug, Clone)]
pub struct Song {
    pub title: String,
    pub loop_segment: Segment,
    pub buildup: Option<Segment>,
}

impl Song {
    /// 解码压缩字节, 组装歌曲.
    ///
    /// 任一段解码失败整首歌不可用, 错误原样上抛.
    pub fn prepare(
        title: &str,
        loop_bytes: &[u8],
        loop_rhythm: &str,
        buildup: Option<(&[u8], &str)>,
    ) -> XuanResult<Song> {
        let loop_audio = decode(loop_bytes)?;
        info!(
            "歌曲 [{title}] loop 段就绪: {:?}, {} 拍",
            loop_audio.duration(),
            loop_rhythm.chars().count().max(1)
        );

        let buildup = match buildup {
            Some((bytes, rhythm)) => {
                let audio = decode(bytes)?;
                info!("歌曲 [{title}] buildup 段就绪: {:?}", audio.duration());
                Some(Segment {
                    audio,
                    rhythm: rhythm.to_string(),
                })
            }
            None => None,
        };

        Ok(Song {
            title: title.to_string(),
            loop_segment: Segment {
                audio: loop_audio,
                rhythm: loop_rhythm.to_string(),
            },
            buildup,
        })
    }
}
