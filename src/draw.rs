// 该文件是 Paizhao （拍照） 项目的一部分。
// src/draw.rs - 预览叠加文字与缩放
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage, imageops::FilterType};
use imageproc::drawing::draw_text_mut;
use thiserror::Error;
use tracing::{info, warn};

// 常见系统字体位置，按顺序查找
const FONT_SEARCH_PATHS: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
  "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
  "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
  "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
  "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
  "C:\\Windows\\Fonts\\arialbd.ttf",
];

// 描边偏移（像素）
const OUTLINE_OFFSET: i32 = 2;

pub const GREEN: [u8; 3] = [0, 255, 0];
pub const WHITE: [u8; 3] = [255, 255, 255];
pub const BLACK: [u8; 3] = [0, 0, 0];
pub const YELLOW: [u8; 3] = [255, 255, 0];
pub const GREY: [u8; 3] = [200, 200, 200];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无法解析字体文件: {0}")]
  InvalidFont(PathBuf),
}

/// 文字叠加层
///
/// 没有可用字体时只跳过文字绘制，其余内容照常输出。
#[derive(Clone, Default)]
pub struct Overlay {
  font: Option<Arc<FontVec>>,
}

impl Overlay {
  /// 加载字体：显式指定的路径必须可用，否则在常见位置查找
  pub fn load(path: Option<&Path>) -> Result<Self, DrawError> {
    if let Some(path) = path {
      let font = load_font(path)?;
      info!("已加载字体: {}", path.display());
      return Ok(Self {
        font: Some(Arc::new(font)),
      });
    }

    for candidate in FONT_SEARCH_PATHS.iter().map(Path::new) {
      if !candidate.exists() {
        continue;
      }
      match load_font(candidate) {
        Ok(font) => {
          info!("已加载字体: {}", candidate.display());
          return Ok(Self {
            font: Some(Arc::new(font)),
          });
        }
        Err(e) => warn!("跳过字体 {}: {}", candidate.display(), e),
      }
    }

    warn!("未找到可用字体，预览画面将不显示文字");
    Ok(Self::without_font())
  }

  pub fn without_font() -> Self {
    Self { font: None }
  }

  /// 在 (x, y) 处绘制文字，y 为文字顶部
  pub fn text(&self, image: &mut RgbImage, x: i32, y: i32, size: f32, color: [u8; 3], text: &str) {
    if let Some(font) = self.font.as_deref() {
      draw_text_mut(image, Rgb(color), x, y, PxScale::from(size), font, text);
    }
  }

  /// 带黑色描边的文字，用于亮度不确定的背景
  pub fn outlined_text(
    &self,
    image: &mut RgbImage,
    x: i32,
    y: i32,
    size: f32,
    color: [u8; 3],
    text: &str,
  ) {
    if self.font.is_none() {
      return;
    }
    for dx in [-OUTLINE_OFFSET, 0, OUTLINE_OFFSET] {
      for dy in [-OUTLINE_OFFSET, 0, OUTLINE_OFFSET] {
        if dx != 0 || dy != 0 {
          self.text(image, x + dx, y + dy, size, BLACK, text);
        }
      }
    }
    self.text(image, x, y, size, color, text);
  }
}

fn load_font(path: &Path) -> Result<FontVec, DrawError> {
  let data = std::fs::read(path)?;
  FontVec::try_from_vec(data).map_err(|_| DrawError::InvalidFont(path.to_path_buf()))
}

/// 保持宽高比缩小到 `max` 以内，不放大
pub fn fit_within((width, height): (u32, u32), (max_w, max_h): (u32, u32)) -> (u32, u32) {
  if width == 0 || height == 0 || (width <= max_w && height <= max_h) {
    return (width, height);
  }
  let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
  let w = ((width as f64 * scale).round() as u32).clamp(1, max_w.max(1));
  let h = ((height as f64 * scale).round() as u32).clamp(1, max_h.max(1));
  (w, h)
}

pub fn scale_to_fit(image: RgbImage, max: (u32, u32)) -> RgbImage {
  let (w, h) = fit_within(image.dimensions(), max);
  if (w, h) == image.dimensions() {
    return image;
  }
  image::imageops::resize(&image, w, h, FilterType::Triangle)
}

/// 将顶部 `band` 行像素按 `keep` 比例压暗，作为半透明文字背景
pub fn darken_band(image: &mut RgbImage, band: u32, keep: f32) {
  let rows = band.min(image.height());
  for y in 0..rows {
    for x in 0..image.width() {
      let pixel = image.get_pixel_mut(x, y);
      for c in pixel.0.iter_mut() {
        *c = (*c as f32 * keep) as u8;
      }
    }
  }
}
