// 该文件是 Paizhao （拍照） 项目的一部分。
// src/config.rs - 命令行参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{path::PathBuf, time::Duration};

use clap::Args;
use url::Url;

use crate::{
  FromUrl,
  capture::CaptureOptions,
  client::ClientConfig,
  draw::Overlay,
  preview::DisplayMode,
  source::{
    FallbackOptions, FallbackSource, FrameSource, MindVisionSource, SourceError, SyntheticSource,
    WebcamSource,
  },
};

/// 质检服务连接参数
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
  /// 服务地址
  #[arg(long, default_value = "http://127.0.0.1:8000", value_name = "URL")]
  pub base_url: Url,

  /// API Key
  #[arg(long, env = "PAIZHAO_API_KEY", hide_env_values = true, value_name = "KEY")]
  pub api_key: String,

  /// 不使用系统代理
  #[arg(long)]
  pub no_proxy: bool,
}

impl ServerArgs {
  pub fn client_config(&self) -> ClientConfig {
    ClientConfig {
      base_url: self.base_url.clone(),
      api_key: self.api_key.clone(),
      use_system_proxy: !self.no_proxy,
    }
  }
}

/// 输入源参数
#[derive(Args, Debug, Clone)]
pub struct CameraArgs {
  /// MindVision 相机
  /// 例如: mindvision:///?index=0&gain=64&ae=true
  #[arg(long, default_value = "mindvision:///", value_name = "SOURCE")]
  pub sdk: Url,

  /// 跳过 MindVision 相机
  #[arg(long)]
  pub no_sdk: bool,

  /// 备用摄像头
  /// 例如: v4l:///dev/video0?width=1920&height=1080
  #[arg(long, default_value = "v4l:///dev/video0", value_name = "SOURCE")]
  pub webcam: Url,

  /// 没有相机时使用的测试图案
  #[arg(long, default_value = "pattern:///", value_name = "SOURCE")]
  pub pattern: Url,

  /// 摄像头与测试图案的默认宽度（URL 中未指定时）
  #[arg(long, default_value = "1920", value_name = "PIXELS")]
  pub width: u32,

  /// 摄像头与测试图案的默认高度（URL 中未指定时）
  #[arg(long, default_value = "1080", value_name = "PIXELS")]
  pub height: u32,

  /// 单次取帧超时（毫秒）
  #[arg(long, default_value = "1000", value_name = "MS")]
  pub grab_timeout_ms: u64,

  /// 连续取帧失败多少次后切换到下一个输入源
  #[arg(long, default_value = "50", value_name = "COUNT")]
  pub demote_after: u32,

  /// 预览文字字体（TTF/OTF），未指定时在系统常见位置查找
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

impl CameraArgs {
  pub fn fallback_options(&self) -> FallbackOptions {
    FallbackOptions {
      demote_after: self.demote_after,
    }
  }

  /// 按 MindVision、摄像头、测试图案的顺序选择输入源
  pub fn select_source(&self, overlay: &Overlay) -> Result<FallbackSource, SourceError> {
    let size = (self.width, self.height);
    let mut candidates: Vec<Box<dyn FrameSource>> = Vec::new();
    if !self.no_sdk {
      candidates.push(Box::new(MindVisionSource::from_url(&self.sdk)?));
    }
    candidates.push(Box::new(WebcamSource::from_url(&with_default_size(
      &self.webcam,
      size,
    ))?));
    let synthetic = SyntheticSource::from_url(&with_default_size(&self.pattern, size))?
      .with_overlay(overlay.clone());

    Ok(FallbackSource::select(
      candidates,
      synthetic,
      self.fallback_options(),
    ))
  }
}

/// 预览参数
#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
  /// 预览画面最大宽度
  #[arg(long, default_value = "1920", value_name = "PIXELS")]
  pub display_width: u32,

  /// 预览画面最大高度
  #[arg(long, default_value = "1080", value_name = "PIXELS")]
  pub display_height: u32,

  /// 按键轮询间隔（毫秒）
  #[arg(long, default_value = "30", value_name = "MS")]
  pub poll_ms: u64,

  /// 以窗口模式启动预览
  #[arg(long)]
  pub windowed: bool,
}

impl PreviewArgs {
  pub fn capture_options(&self, camera: &CameraArgs) -> CaptureOptions {
    CaptureOptions {
      grab_timeout: Duration::from_millis(camera.grab_timeout_ms),
      poll_interval: Duration::from_millis(self.poll_ms.max(1)),
      display_size: (self.display_width.max(1), self.display_height.max(1)),
      initial_mode: if self.windowed {
        DisplayMode::Windowed
      } else {
        DisplayMode::Fullscreen
      },
      ..CaptureOptions::default()
    }
  }
}

/// URL 中缺少 width/height 时补上默认值
pub fn with_default_size(url: &Url, (width, height): (u32, u32)) -> Url {
  let has = |key: &str| url.query_pairs().any(|(k, _)| k == key);
  let (has_width, has_height) = (has("width"), has("height"));
  let mut url = url.clone();
  {
    let mut pairs = url.query_pairs_mut();
    if !has_width {
      pairs.append_pair("width", &width.to_string());
    }
    if !has_height {
      pairs.append_pair("height", &height.to_string());
    }
  }
  url
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct TestCli {
    #[command(flatten)]
    server: ServerArgs,
    #[command(flatten)]
    camera: CameraArgs,
    #[command(flatten)]
    preview: PreviewArgs,
  }

  #[test]
  fn defaults_match_documented_values() {
    let cli = TestCli::try_parse_from(["test", "--api-key", "k"]).unwrap();
    assert_eq!(cli.server.base_url.as_str(), "http://127.0.0.1:8000/");
    assert!(cli.server.client_config().use_system_proxy);
    assert_eq!(cli.camera.fallback_options().demote_after, 50);

    let options = cli.preview.capture_options(&cli.camera);
    assert_eq!(options.grab_timeout, Duration::from_millis(1000));
    assert_eq!(options.poll_interval, Duration::from_millis(30));
    assert_eq!(options.display_size, (1920, 1080));
    assert_eq!(options.initial_mode, DisplayMode::Fullscreen);
  }

  #[test]
  fn default_size_fills_only_missing_keys() {
    let url = Url::parse("v4l:///dev/video1?width=640").unwrap();
    let url = with_default_size(&url, (1920, 1080));
    let pairs: Vec<_> = url.query_pairs().into_owned().collect();
    assert_eq!(
      pairs,
      vec![
        ("width".to_string(), "640".to_string()),
        ("height".to_string(), "1080".to_string()),
      ]
    );
  }

  #[test]
  fn without_cameras_selection_ends_on_test_pattern() {
    let cli = TestCli::try_parse_from([
      "test",
      "--api-key",
      "k",
      "--no-sdk",
      "--webcam",
      "v4l:///dev/paizhao-missing",
      "--width",
      "320",
      "--height",
      "240",
    ])
    .unwrap();
    let mut source = cli.camera.select_source(&Overlay::without_font()).unwrap();
    assert_eq!(source.kind(), crate::source::SourceKind::Synthetic);
    assert_eq!(source.resolution(), Some((320, 240)));
    assert!(source.grab(Duration::ZERO).is_some());
  }
}
