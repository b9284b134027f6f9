// 该文件是 Paizhao （拍照） 项目的一部分。
// tests/source_fallback.rs - 输入源选择与降级测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod common;

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use image::GrayImage;
use paizhao::{
  draw::Overlay,
  frame::Frame,
  source::{
    FallbackOptions, FallbackSource, FrameSource, MindVisionSource, SourceError, SourceKind,
    SyntheticSource, WebcamSource,
  },
};

use common::ScriptedSource;

const TIMEOUT: Duration = Duration::from_millis(1);

fn log() -> Arc<Mutex<Vec<String>>> {
  Arc::new(Mutex::new(Vec::new()))
}

fn small_pattern() -> SyntheticSource {
  SyntheticSource::new(64, 48, Overlay::without_font())
}

fn mono_frame() -> Frame {
  Frame::from(GrayImage::new(4, 3))
}

#[test]
fn unavailable_cameras_fall_back_to_test_pattern() {
  let candidates: Vec<Box<dyn FrameSource>> = vec![
    Box::new(MindVisionSource::default()),
    Box::new(WebcamSource::new("/dev/paizhao-missing", (640, 480))),
  ];
  let mut source = FallbackSource::select(candidates, small_pattern(), FallbackOptions::default());

  assert_eq!(source.kind(), SourceKind::Synthetic);
  for _ in 0..10 {
    let frame = source.grab(TIMEOUT).expect("synthetic frame");
    assert_eq!(Some(frame.dimensions()), source.resolution());
  }
}

#[test]
fn candidates_are_tried_in_priority_order() {
  let events = log();
  let candidates: Vec<Box<dyn FrameSource>> = vec![
    Box::new(ScriptedSource::new(SourceKind::Sdk, events.clone()).failing_open(SourceError::NoDevice)),
    Box::new(ScriptedSource::new(SourceKind::Webcam, events.clone()).repeating(mono_frame())),
  ];
  let mut source = FallbackSource::select(candidates, small_pattern(), FallbackOptions::default());

  assert_eq!(source.kind(), SourceKind::Webcam);
  assert_eq!(
    *events.lock().unwrap(),
    vec!["Sdk:open", "Sdk:close", "Webcam:open"]
  );

  let frame = source.grab(TIMEOUT).expect("webcam frame");
  assert_eq!(Some(frame.dimensions()), source.resolution());
}

#[test]
fn later_candidates_stay_unopened_until_needed() {
  let events = log();
  let candidates: Vec<Box<dyn FrameSource>> = vec![
    Box::new(ScriptedSource::new(SourceKind::Sdk, events.clone()).repeating(mono_frame())),
    Box::new(ScriptedSource::new(SourceKind::Webcam, events.clone())),
  ];
  let source = FallbackSource::select(candidates, small_pattern(), FallbackOptions::default());

  assert_eq!(source.kind(), SourceKind::Sdk);
  assert_eq!(*events.lock().unwrap(), vec!["Sdk:open"]);
}

#[test]
fn persistent_misses_demote_to_next_source() {
  let events = log();
  let candidates: Vec<Box<dyn FrameSource>> = vec![
    Box::new(ScriptedSource::new(SourceKind::Sdk, events.clone())),
    Box::new(ScriptedSource::new(SourceKind::Webcam, events.clone()).repeating(mono_frame())),
  ];
  let options = FallbackOptions { demote_after: 3 };
  let mut source = FallbackSource::select(candidates, small_pattern(), options);
  assert_eq!(source.kind(), SourceKind::Sdk);

  // 不超过阈值时不切换
  for _ in 0..3 {
    assert!(source.grab(TIMEOUT).is_none());
    assert_eq!(source.kind(), SourceKind::Sdk);
  }

  assert!(source.grab(TIMEOUT).is_none());
  assert_eq!(source.kind(), SourceKind::Webcam);
  assert!(source.grab(TIMEOUT).is_some());
  assert_eq!(
    *events.lock().unwrap(),
    vec!["Sdk:open", "Sdk:close", "Webcam:open"]
  );
}

#[test]
fn a_single_frame_resets_the_miss_counter() {
  let events = log();
  let mut frames = vec![None, None, Some(mono_frame())];
  frames.extend([None, None, None]);
  let candidates: Vec<Box<dyn FrameSource>> = vec![Box::new(
    ScriptedSource::new(SourceKind::Webcam, events.clone()).with_frames(frames),
  )];
  let mut source = FallbackSource::select(
    candidates,
    small_pattern(),
    FallbackOptions { demote_after: 3 },
  );

  for _ in 0..6 {
    source.grab(TIMEOUT);
  }
  assert_eq!(source.kind(), SourceKind::Webcam);

  // 第四次连续失败触发降级
  assert!(source.grab(TIMEOUT).is_none());
  assert_eq!(source.kind(), SourceKind::Synthetic);
  assert!(source.grab(TIMEOUT).is_some());
}

#[test]
fn dying_webcam_falls_to_test_pattern() {
  let events = log();
  let candidates: Vec<Box<dyn FrameSource>> =
    vec![Box::new(ScriptedSource::new(SourceKind::Webcam, events.clone()))];
  let mut source = FallbackSource::select(
    candidates,
    small_pattern(),
    FallbackOptions { demote_after: 50 },
  );

  for _ in 0..51 {
    assert!(source.grab(TIMEOUT).is_none());
  }
  assert_eq!(source.kind(), SourceKind::Synthetic);
  assert_eq!(source.resolution(), Some((64, 48)));

  // 测试图案永不降级
  for _ in 0..100 {
    assert!(source.grab(TIMEOUT).is_some());
  }
  assert_eq!(source.kind(), SourceKind::Synthetic);
}

#[test]
fn close_is_idempotent_and_reaches_every_source() {
  let events = log();
  let candidates: Vec<Box<dyn FrameSource>> = vec![
    Box::new(ScriptedSource::new(SourceKind::Sdk, events.clone()).repeating(mono_frame())),
    Box::new(ScriptedSource::new(SourceKind::Webcam, events.clone())),
  ];
  let mut source = FallbackSource::select(candidates, small_pattern(), FallbackOptions::default());
  source.close();
  source.close();
  drop(source);

  let events = events.lock().unwrap();
  assert_eq!(events[0], "Sdk:open");
  assert!(events.iter().filter(|e| *e == "Sdk:close").count() >= 2);
  assert!(events.iter().any(|e| e == "Webcam:close"));
  assert!(!events.iter().any(|e| e == "Webcam:open"));
}

#[test]
fn standalone_sources_close_twice() {
  let mut webcam = WebcamSource::new("/dev/paizhao-missing", (640, 480));
  webcam.close();
  webcam.close();

  let mut sdk = MindVisionSource::default();
  sdk.close();
  sdk.close();

  let mut pattern = small_pattern();
  pattern.open().unwrap();
  pattern.close();
  pattern.close();
}
