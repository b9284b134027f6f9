// 该文件是 Paizhao （拍照） 项目的一部分。
// src/source/synthetic.rs - 合成测试图案输入
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

use chrono::{DateTime, Local};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_circle_mut},
  rect::Rect,
};
use url::Url;

use super::{FrameSource, SourceError, SourceKind, query_dimension};
use crate::{
  FromUrl, FromUrlWithScheme,
  draw::{Overlay, WHITE},
  frame::Frame,
};

pub const DEFAULT_PATTERN_WIDTH: u32 = 1920;
pub const DEFAULT_PATTERN_HEIGHT: u32 = 1080;

// 彩条：白、青、黄、绿、品红、蓝、红、黑
const PALETTE: [[u8; 3]; 8] = [
  [255, 255, 255],
  [0, 255, 255],
  [255, 255, 0],
  [0, 255, 0],
  [255, 0, 255],
  [0, 0, 255],
  [255, 0, 0],
  [0, 0, 0],
];

const GRID_STEP: usize = 100;
const GRID_COLOR: [u8; 3] = [128, 128, 128];
const CROSSHAIR_COLOR: [u8; 3] = [0, 255, 0];
const CROSSHAIR_ARM: i32 = 50;
const CROSSHAIR_THICKNESS: u32 = 3;
const CROSSHAIR_RADIUS: i32 = 30;
const TIMESTAMP_SIZE: f32 = 64.0;

/// 按给定时刻渲染测试图案，相同输入得到相同图像
pub fn render_test_pattern(
  width: u32,
  height: u32,
  at: DateTime<Local>,
  overlay: &Overlay,
) -> RgbImage {
  let mut image = RgbImage::new(width, height);

  // 彩条，最后一条补齐余数
  let bar_width = width / PALETTE.len() as u32;
  for (x, _, pixel) in image.enumerate_pixels_mut() {
    let index = match bar_width {
      0 => PALETTE.len() - 1,
      w => ((x / w) as usize).min(PALETTE.len() - 1),
    };
    *pixel = Rgb(PALETTE[index]);
  }

  let stamp = format!("TEST PATTERN - {}", at.format("%Y-%m-%d %H:%M:%S"));
  overlay.outlined_text(&mut image, 50, 50, TIMESTAMP_SIZE, WHITE, &stamp);

  // 网格
  for x in (0..width).step_by(GRID_STEP) {
    for y in 0..height {
      image.put_pixel(x, y, Rgb(GRID_COLOR));
    }
  }
  for y in (0..height).step_by(GRID_STEP) {
    for x in 0..width {
      image.put_pixel(x, y, Rgb(GRID_COLOR));
    }
  }

  // 中心十字准线
  if width > 0 && height > 0 {
    let (cx, cy) = ((width / 2) as i32, (height / 2) as i32);
    let half = (CROSSHAIR_THICKNESS / 2) as i32;
    let arm = (2 * CROSSHAIR_ARM + 1) as u32;
    draw_filled_rect_mut(
      &mut image,
      Rect::at(cx - CROSSHAIR_ARM, cy - half).of_size(arm, CROSSHAIR_THICKNESS),
      Rgb(CROSSHAIR_COLOR),
    );
    draw_filled_rect_mut(
      &mut image,
      Rect::at(cx - half, cy - CROSSHAIR_ARM).of_size(CROSSHAIR_THICKNESS, arm),
      Rgb(CROSSHAIR_COLOR),
    );
    draw_hollow_circle_mut(&mut image, (cx, cy), CROSSHAIR_RADIUS, Rgb(CROSSHAIR_COLOR));
    draw_hollow_circle_mut(&mut image, (cx, cy), CROSSHAIR_RADIUS - 1, Rgb(CROSSHAIR_COLOR));
  }

  image
}

/// 没有任何相机时的兜底输入，每次取帧按当前时间重新生成，从不失败
pub struct SyntheticSource {
  width: u32,
  height: u32,
  overlay: Overlay,
  opened: bool,
}

impl Default for SyntheticSource {
  fn default() -> Self {
    Self::new(
      DEFAULT_PATTERN_WIDTH,
      DEFAULT_PATTERN_HEIGHT,
      Overlay::without_font(),
    )
  }
}

impl SyntheticSource {
  pub fn new(width: u32, height: u32, overlay: Overlay) -> Self {
    Self {
      width: width.max(1),
      height: height.max(1),
      overlay,
      opened: false,
    }
  }

  pub fn with_overlay(mut self, overlay: Overlay) -> Self {
    self.overlay = overlay;
    self
  }

  pub fn is_open(&self) -> bool {
    self.opened
  }
}

impl FromUrlWithScheme for SyntheticSource {
  const SCHEME: &'static str = "pattern";
}

impl FromUrl for SyntheticSource {
  type Error = SourceError;

  // pattern:///?width=1920&height=1080
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SourceError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    let width = query_dimension(url, "width")?.unwrap_or(DEFAULT_PATTERN_WIDTH);
    let height = query_dimension(url, "height")?.unwrap_or(DEFAULT_PATTERN_HEIGHT);
    Ok(Self::new(width, height, Overlay::without_font()))
  }
}

impl FrameSource for SyntheticSource {
  fn kind(&self) -> SourceKind {
    SourceKind::Synthetic
  }

  fn open(&mut self) -> Result<(), SourceError> {
    self.opened = true;
    Ok(())
  }

  fn grab(&mut self, _timeout: Duration) -> Option<Frame> {
    let image = render_test_pattern(self.width, self.height, Local::now(), &self.overlay);
    Some(Frame::Color(image))
  }

  fn close(&mut self) {
    self.opened = false;
  }

  fn resolution(&self) -> Option<(u32, u32)> {
    Some((self.width, self.height))
  }
}
