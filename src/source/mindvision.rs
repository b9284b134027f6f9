// 该文件是 Paizhao （拍照） 项目的一部分。
// src/source/mindvision.rs - MindVision 工业相机输入
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

use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::{FrameSource, SourceError, SourceKind};
use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

#[cfg(feature = "mindvision")]
mod driver;
#[cfg(feature = "mindvision")]
mod ffi;

/// SDK 取帧超时的状态码
const STATUS_TIME_OUT: i32 = -12;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{call} 返回错误码 {status}")]
pub struct SdkError {
  pub call: &'static str,
  pub status: i32,
}

impl SdkError {
  pub fn is_timeout(&self) -> bool {
    self.status == STATUS_TIME_OUT
  }
}

/// 打开相机时应用的固定参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MindVisionSettings {
  pub device_index: usize,
  pub analog_gain: i32,
  pub auto_exposure: bool,
}

impl Default for MindVisionSettings {
  fn default() -> Self {
    Self {
      device_index: 0,
      analog_gain: 64,
      auto_exposure: true,
    }
  }
}

/// MindVision 相机，输出原生分辨率的单通道帧
///
/// 未启用 `mindvision` 特性时 `open` 总是返回 [`SourceError::SdkUnavailable`]。
pub struct MindVisionSource {
  settings: MindVisionSettings,
  size: Option<(u32, u32)>,
  #[cfg(feature = "mindvision")]
  camera: Option<driver::Camera>,
}

impl MindVisionSource {
  pub fn new(settings: MindVisionSettings) -> Self {
    Self {
      settings,
      size: None,
      #[cfg(feature = "mindvision")]
      camera: None,
    }
  }

  pub fn settings(&self) -> &MindVisionSettings {
    &self.settings
  }
}

impl Default for MindVisionSource {
  fn default() -> Self {
    Self::new(MindVisionSettings::default())
  }
}

impl FromUrlWithScheme for MindVisionSource {
  const SCHEME: &'static str = "mindvision";
}

impl FromUrl for MindVisionSource {
  type Error = SourceError;

  // mindvision:///?index=0&gain=64&ae=true
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SourceError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    let mut settings = MindVisionSettings::default();
    for (key, value) in url.query_pairs() {
      let invalid = || SourceError::InvalidParameter(format!("{}={}", key, value));
      match key.as_ref() {
        "index" => settings.device_index = value.parse().map_err(|_| invalid())?,
        "gain" => settings.analog_gain = value.parse().map_err(|_| invalid())?,
        "ae" => settings.auto_exposure = value.parse().map_err(|_| invalid())?,
        _ => return Err(SourceError::InvalidParameter(format!("未知参数: {}", key))),
      }
    }
    Ok(Self::new(settings))
  }
}

impl FrameSource for MindVisionSource {
  fn kind(&self) -> SourceKind {
    SourceKind::Sdk
  }

  #[cfg(feature = "mindvision")]
  fn open(&mut self) -> Result<(), SourceError> {
    if self.camera.is_some() {
      return Ok(());
    }
    let camera = driver::Camera::open(&self.settings)?;
    tracing::info!("MindVision 相机已打开: {}", camera.name());
    self.size = Some(camera.native_resolution());
    self.camera = Some(camera);
    Ok(())
  }

  #[cfg(not(feature = "mindvision"))]
  fn open(&mut self) -> Result<(), SourceError> {
    Err(SourceError::SdkUnavailable)
  }

  #[cfg(feature = "mindvision")]
  fn grab(&mut self, timeout: Duration) -> Option<Frame> {
    let camera = self.camera.as_mut()?;
    match camera.grab(timeout) {
      Ok(frame) => {
        let dims = frame.dimensions();
        if self.size != Some(dims) {
          tracing::info!("相机输出分辨率变为 {}x{}", dims.0, dims.1);
          self.size = Some(dims);
        }
        Some(frame)
      }
      Err(SourceError::Sdk(e)) if e.is_timeout() => None,
      Err(e) => {
        tracing::warn!("MindVision 取帧失败: {}", e);
        None
      }
    }
  }

  #[cfg(not(feature = "mindvision"))]
  fn grab(&mut self, _timeout: Duration) -> Option<Frame> {
    None
  }

  fn close(&mut self) {
    #[cfg(feature = "mindvision")]
    self.camera.take();
    self.size = None;
  }

  fn resolution(&self) -> Option<(u32, u32)> {
    self.size
  }
}

impl Drop for MindVisionSource {
  fn drop(&mut self) {
    self.close();
  }
}
