//! 播放会话端到端调度测试: buildup 接 loop, 事件顺序与时刻.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use xuan_codec::DecodedAudio;
use xuan_core::{Beat, XuanError, XuanResult};
use xuan_player::{AudioSink, BeatScheduler, BeatSink, Segment, Song};

fn fake_segment(millis: u64, rhythm: &str) -> Segment {
    let sample_count = 44100 * millis / 1000;
    Segment {
        audio: DecodedAudio {
            pcm: vec![0; sample_count as usize * 4],
            sample_count,
            channels: 2,
            sample_rate: 44100,
        },
        rhythm: rhythm.to_string(),
    }
}

struct RecordingSink {
    origin: Instant,
    events: Mutex<Vec<(Duration, String)>>,
}

impl BeatSink for RecordingSink {
    fn set_image(&self, transition: Beat) -> XuanResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((self.origin.elapsed(), format!("image:{transition:?}")));
        Ok(())
    }

    fn set_color(&self) -> XuanResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((self.origin.elapsed(), "color".to_string()));
        Ok(())
    }
}

/// 计次音频端: 第 `fail_after` 次提交后报错, 用来终止无限循环
struct CountingAudio {
    origin: Instant,
    plays: Vec<Duration>,
    fail_after: u32,
    submitted: AtomicU32,
}

impl AudioSink for CountingAudio {
    fn play(&mut self, _pcm: &[u8], channels: u32, sample_rate: u32) -> XuanResult<()> {
        assert_eq!(channels, 2);
        assert_eq!(sample_rate, 44100);
        let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        if n > self.fail_after {
            return Err(XuanError::AudioOutput("设备关闭".into()));
        }
        self.plays.push(self.origin.elapsed());
        Ok(())
    }
}

#[test]
fn test_会话_buildup接loop的事件流() {
    // buildup 200ms 单拍 'o', loop 400ms 两拍 "x."
    // 会话: buildup 一遍, loop 循环; 第 3 次音频提交报错终止.
    let song = Song {
        title: "测试曲".to_string(),
        loop_segment: fake_segment(400, "x."),
        buildup: Some(fake_segment(200, "o")),
    };

    let origin = Instant::now();
    let mut audio = CountingAudio {
        origin,
        plays: Vec::new(),
        fail_after: 2,
        submitted: AtomicU32::new(0),
    };
    let visuals = RecordingSink {
        origin,
        events: Mutex::new(Vec::new()),
    };

    let mut scheduler = BeatScheduler::new();
    let err = scheduler
        .run_session(&song, &mut audio, &visuals)
        .unwrap_err();
    assert!(matches!(err, XuanError::AudioOutput(_)));

    // buildup 'o' -> 换色+换图(横向模糊); loop 第 1 拍 'x' -> 换色+换图(纵向模糊)
    let events = visuals.events.lock().unwrap();
    let kinds: Vec<&str> = events.iter().map(|(_, k)| k.as_str()).collect();
    assert_eq!(
        kinds,
        vec!["color", "image:HorizontalBlur", "color", "image:VerticalBlur"]
    );

    // loop 段音频在 buildup 播完 (>= 200ms) 之后才提交
    assert_eq!(audio.plays.len(), 2);
    assert!(audio.plays[1] >= Duration::from_millis(200));

    // loop 首拍在其音频提交后立即派发, 绝不早于提交时刻
    assert!(events[2].0 >= audio.plays[1]);
}

#[test]
fn test_会话_无buildup直接进loop() {
    let song = Song {
        title: "无前奏".to_string(),
        loop_segment: fake_segment(100, "."),
        buildup: None,
    };

    let origin = Instant::now();
    let mut audio = CountingAudio {
        origin,
        plays: Vec::new(),
        fail_after: 1,
        submitted: AtomicU32::new(0),
    };
    let visuals = RecordingSink {
        origin,
        events: Mutex::new(Vec::new()),
    };

    let mut scheduler = BeatScheduler::new();
    let err = scheduler
        .run_session(&song, &mut audio, &visuals)
        .unwrap_err();
    assert!(matches!(err, XuanError::AudioOutput(_)));
    assert_eq!(audio.plays.len(), 1);
    assert!(visuals.events.lock().unwrap().is_empty());
}
