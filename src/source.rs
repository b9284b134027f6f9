// 该文件是 Paizhao （拍照） 项目的一部分。
// src/source.rs - 图像采集源与回退选择
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

use std::{collections::VecDeque, fmt, time::Duration};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::frame::Frame;

mod mindvision;
mod synthetic;
mod webcam;

pub use self::mindvision::{MindVisionSettings, MindVisionSource, SdkError};
pub use self::synthetic::{SyntheticSource, render_test_pattern};
pub use self::webcam::WebcamSource;

/// 连续取帧失败多少次后降级到下一个输入源
pub const DEFAULT_DEMOTE_AFTER: u32 = 50;

#[derive(Error, Debug)]
pub enum SourceError {
  #[error("MindVision SDK 不可用（构建时未启用 mindvision 特性）")]
  SdkUnavailable,
  #[error("MindVision SDK 错误: {0}")]
  Sdk(#[from] SdkError),
  #[error("未找到相机设备")]
  NoDevice,
  #[error("摄像头错误: {0}")]
  Webcam(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("设备已打开但无法提供图像帧")]
  NoFrames,
  #[error("图像帧数据异常: {0}")]
  MalformedFrame(String),
  #[error("不支持的像素格式: {0}")]
  UnsupportedFormat(String),
  #[error("当前构建不支持该输入源（缺少 {0} 特性）")]
  Unsupported(&'static str),
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch {
    expected: &'static str,
    found: String,
  },
  #[error("无效的参数: {0}")]
  InvalidParameter(String),
}

/// 输入源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
  /// 厂商相机 SDK
  Sdk,
  /// 通用摄像头
  Webcam,
  /// 合成测试图案
  Synthetic,
}

impl SourceKind {
  /// 预览叠加文字使用的名称，预览字体不一定包含中文字形
  pub fn overlay_label(self) -> &'static str {
    match self {
      SourceKind::Sdk => "MindVision",
      SourceKind::Webcam => "Webcam",
      SourceKind::Synthetic => "Test pattern",
    }
  }
}

impl fmt::Display for SourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SourceKind::Sdk => write!(f, "MindVision 相机"),
      SourceKind::Webcam => write!(f, "摄像头"),
      SourceKind::Synthetic => write!(f, "测试图案"),
    }
  }
}

/// 统一的采集接口
///
/// - `open` 获取设备独占访问并应用固定的采集参数，重复调用时直接返回成功；
/// - `grab` 超时返回 `None`，其余错误记录日志后同样返回 `None`，
///   返回的帧尺寸总是与 `resolution` 一致；
/// - `close` 释放缓冲区与设备句柄，可以重复调用。
pub trait FrameSource {
  fn kind(&self) -> SourceKind;

  fn open(&mut self) -> Result<(), SourceError>;

  fn grab(&mut self, timeout: Duration) -> Option<Frame>;

  fn close(&mut self);

  fn resolution(&self) -> Option<(u32, u32)>;

  fn describe(&self) -> String {
    match self.resolution() {
      Some((w, h)) => format!("{} ({}x{})", self.kind(), w, h),
      None => self.kind().to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FallbackOptions {
  pub demote_after: u32,
}

impl Default for FallbackOptions {
  fn default() -> Self {
    Self {
      demote_after: DEFAULT_DEMOTE_AFTER,
    }
  }
}

/// 按优先级选择输入源，并在运行中对持续失败的输入源降级
pub struct FallbackSource {
  active: Box<dyn FrameSource>,
  pending: VecDeque<Box<dyn FrameSource>>,
  terminal: Option<SyntheticSource>,
  consecutive_failures: u32,
  options: FallbackOptions,
}

impl FallbackSource {
  /// 依次尝试 `candidates`，全部失败时使用测试图案
  pub fn select(
    candidates: Vec<Box<dyn FrameSource>>,
    synthetic: SyntheticSource,
    options: FallbackOptions,
  ) -> Self {
    let mut pending: VecDeque<_> = candidates.into();
    let mut terminal = Some(synthetic);
    let active = Self::open_next(&mut pending, &mut terminal);

    Self {
      active,
      pending,
      terminal,
      consecutive_failures: 0,
      options,
    }
  }

  fn open_next(
    pending: &mut VecDeque<Box<dyn FrameSource>>,
    terminal: &mut Option<SyntheticSource>,
  ) -> Box<dyn FrameSource> {
    while let Some(mut candidate) = pending.pop_front() {
      info!("正在打开输入源: {}", candidate.kind());
      match candidate.open() {
        Ok(()) => {
          info!("输入源已打开: {}", candidate.describe());
          return candidate;
        }
        Err(e) => {
          warn!("输入源 {} 打开失败: {}，尝试下一个", candidate.kind(), e);
          candidate.close();
        }
      }
    }

    let mut synthetic = terminal.take().unwrap_or_default();
    if let Err(e) = synthetic.open() {
      error!("测试图案打开失败: {}", e);
    }
    warn!("没有可用的相机，使用测试图案: {}", synthetic.describe());
    Box::new(synthetic)
  }

  fn demote(&mut self) {
    warn!(
      "{} 连续 {} 次未能提供图像帧，切换到下一个输入源",
      self.active.kind(),
      self.consecutive_failures
    );
    self.active.close();
    self.active = Self::open_next(&mut self.pending, &mut self.terminal);
    self.consecutive_failures = 0;
  }
}

impl FrameSource for FallbackSource {
  fn kind(&self) -> SourceKind {
    self.active.kind()
  }

  fn open(&mut self) -> Result<(), SourceError> {
    self.active.open()
  }

  fn grab(&mut self, timeout: Duration) -> Option<Frame> {
    match self.active.grab(timeout) {
      Some(frame) => {
        self.consecutive_failures = 0;
        Some(frame)
      }
      None => {
        self.consecutive_failures += 1;
        if self.active.kind() != SourceKind::Synthetic
          && self.consecutive_failures > self.options.demote_after
        {
          self.demote();
        }
        None
      }
    }
  }

  fn close(&mut self) {
    self.active.close();
    for candidate in self.pending.iter_mut() {
      candidate.close();
    }
  }

  fn resolution(&self) -> Option<(u32, u32)> {
    self.active.resolution()
  }

  fn describe(&self) -> String {
    self.active.describe()
  }
}

impl Drop for FallbackSource {
  fn drop(&mut self) {
    self.close();
  }
}

pub(crate) fn query_dimension(url: &url::Url, key: &str) -> Result<Option<u32>, SourceError> {
  match url.query_pairs().find(|(k, _)| k == key) {
    Some((_, value)) => {
      let parsed: u32 = value
        .parse()
        .map_err(|_| SourceError::InvalidParameter(format!("{}={}", key, value)))?;
      if parsed == 0 {
        return Err(SourceError::InvalidParameter(format!("{} 不能为 0", key)));
      }
      Ok(Some(parsed))
    }
    None => Ok(None),
  }
}
