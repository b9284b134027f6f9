// 该文件是 Paizhao （拍照） 项目的一部分。
// src/capture.rs - 交互式拍摄循环
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

use std::time::{Duration, Instant};

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::{
  draw::{GREEN, GREY, Overlay, WHITE, YELLOW, darken_band, scale_to_fit},
  frame::Frame,
  preview::{DisplayMode, PreviewError, PreviewKey, PreviewSurface},
  source::FrameSource,
};

const BANNER_HEIGHT: u32 = 100;
const BANNER_KEEP: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct CaptureOptions {
  pub grab_timeout: Duration,
  pub poll_interval: Duration,
  /// 预览画面的最大尺寸，只缩小不放大
  pub display_size: (u32, u32),
  pub initial_mode: DisplayMode,
  /// 连续未取到新帧少于该次数时继续显示上一帧
  pub stale_frame_limit: u32,
}

impl Default for CaptureOptions {
  fn default() -> Self {
    Self {
      grab_timeout: Duration::from_millis(1000),
      poll_interval: Duration::from_millis(30),
      display_size: (1920, 1080),
      initial_mode: DisplayMode::Fullscreen,
      stale_frame_limit: 10,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
  /// 原始分辨率的确认帧
  Captured(Frame),
  Cancelled,
}

/// 实时预览直到操作员确认或取消
///
/// 确认时返回最近一次取到的原始帧，预览缩放与叠加文字不影响返回结果。
pub fn run_capture<S, P>(
  source: &mut S,
  surface: &mut P,
  options: &CaptureOptions,
  overlay: &Overlay,
) -> Result<CaptureOutcome, PreviewError>
where
  S: FrameSource + ?Sized,
  P: PreviewSurface + ?Sized,
{
  let mut latest: Option<Frame> = None;
  let mut misses: u32 = 0;
  let mut mode = options.initial_mode;

  info!("开始预览: {}", source.describe());

  loop {
    match source.grab(options.grab_timeout) {
      Some(frame) => {
        misses = 0;
        let preview = compose_preview(&frame, &overlay_label(&*source), options, overlay);
        surface.show(&preview)?;
        latest = Some(frame);
      }
      None => {
        misses += 1;
        if let Some(frame) = latest.as_ref()
          && misses < options.stale_frame_limit
        {
          let mut preview = compose_preview(frame, &overlay_label(&*source), options, overlay);
          overlay.outlined_text(
            &mut preview,
            10,
            BANNER_HEIGHT as i32 + 10,
            28.0,
            YELLOW,
            "Waiting for frame...",
          );
          surface.show(&preview)?;
        }
      }
    }

    match surface.poll_key(options.poll_interval) {
      Some(PreviewKey::Confirm) => match latest.take() {
        Some(frame) => {
          info!("已拍摄 {}x{} 图像", frame.width(), frame.height());
          return Ok(CaptureOutcome::Captured(frame));
        }
        None => warn!("尚未取到图像帧，无法拍摄"),
      },
      Some(PreviewKey::Cancel) => {
        info!("操作员取消拍摄");
        return Ok(CaptureOutcome::Cancelled);
      }
      Some(PreviewKey::ToggleDisplay) => {
        let next = mode.toggled();
        match surface.set_mode(next) {
          Ok(()) => mode = next,
          Err(e) => warn!("切换显示模式失败，保持 {:?}: {}", mode, e),
        }
      }
      None => {}
    }
  }
}

/// 构建预览画面：缩放、顶部半透明横幅与操作提示
fn compose_preview(
  frame: &Frame,
  label: &str,
  options: &CaptureOptions,
  overlay: &Overlay,
) -> RgbImage {
  let (width, height) = frame.dimensions();
  let mut preview = scale_to_fit(frame.to_rgb(), options.display_size);

  darken_band(&mut preview, BANNER_HEIGHT, BANNER_KEEP);
  overlay.text(&mut preview, 10, 12, 30.0, GREEN, "Press SPACE/ENTER to capture");
  overlay.text(
    &mut preview,
    10,
    52,
    22.0,
    WHITE,
    &format!(
      "Press 'q' to cancel | 'F' fullscreen | Resolution: {}x{}",
      width, height
    ),
  );
  let source_x = preview.width().saturating_sub(360) as i32;
  overlay.text(&mut preview, source_x, 12, 22.0, GREY, label);
  preview
}

fn overlay_label<S: FrameSource + ?Sized>(source: &S) -> String {
  let name = source.kind().overlay_label();
  match source.resolution() {
    Some((w, h)) => format!("{} ({}x{})", name, w, h),
    None => name.to_string(),
  }
}

/// 拍摄完成后的确认画面，显示 `hold` 时长
pub fn show_confirmation<P>(
  surface: &mut P,
  frame: &Frame,
  options: &CaptureOptions,
  overlay: &Overlay,
  hold: Duration,
) -> Result<(), PreviewError>
where
  P: PreviewSurface + ?Sized,
{
  let (width, height) = frame.dimensions();
  let mut card = scale_to_fit(frame.to_rgb(), options.display_size);
  let card_height = card.height();
  darken_band(&mut card, card_height, BANNER_KEEP);

  let cy = (card.height() / 2) as i32;
  overlay.outlined_text(&mut card, 40, cy - 60, 64.0, GREEN, "IMAGE CAPTURED");
  overlay.outlined_text(
    &mut card,
    40,
    cy + 20,
    32.0,
    WHITE,
    &format!("Original Resolution: {}x{}", width, height),
  );
  surface.show(&card)?;

  // 按键不影响停留时长，但仍需处理窗口事件
  let deadline = Instant::now() + hold;
  while let Some(left) = deadline.checked_duration_since(Instant::now()) {
    if left.is_zero() {
      break;
    }
    if let Some(key) = surface.poll_key(left.min(options.poll_interval)) {
      debug!("确认画面期间忽略按键 {:?}", key);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::source::{SourceKind, SyntheticSource, WebcamSource};

  #[test]
  fn overlay_names_the_active_source() {
    let pattern = SyntheticSource::new(320, 180, Overlay::without_font());
    assert_eq!(overlay_label(&pattern), "Test pattern (320x180)");

    let webcam = WebcamSource::new("/dev/does-not-exist", (640, 480));
    assert_eq!(overlay_label(&webcam), "Webcam");
  }

  #[test]
  fn overlay_labels_are_ascii() {
    for kind in [SourceKind::Sdk, SourceKind::Webcam, SourceKind::Synthetic] {
      assert!(kind.overlay_label().is_ascii());
    }
  }

  #[test]
  fn preview_is_downscaled_but_frame_untouched() {
    let frame = Frame::from(RgbImage::new(3840, 2160));
    let options = CaptureOptions::default();
    let preview = compose_preview(&frame, "test", &options, &Overlay::without_font());
    assert_eq!(preview.dimensions(), (1920, 1080));
    assert_eq!(frame.dimensions(), (3840, 2160));
  }
}
