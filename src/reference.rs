// 该文件是 Paizhao （拍照） 项目的一部分。
// src/reference.rs - 参考图像保存
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

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::info;

use crate::frame::{DEFAULT_JPEG_QUALITY, Frame};

pub const DEFAULT_LABEL: &str = "reference";

#[derive(Error, Debug)]
pub enum ReferenceError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像编码失败: {0}")]
  ImageError(#[from] image::ImageError),
}

/// `{label}_{YYYYmmdd_HHMMSS}.jpg`，标签中的路径分隔符等字符替换为下划线
pub fn reference_file_name(label: Option<&str>, at: DateTime<Local>) -> String {
  let label = label.map(str::trim).filter(|l| !l.is_empty()).unwrap_or(DEFAULT_LABEL);
  let label: String = label
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect();
  format!("{}_{}.jpg", label, at.format("%Y%m%d_%H%M%S"))
}

/// 以原始分辨率保存为三通道 JPEG，返回文件路径
pub fn save_reference(
  frame: &Frame,
  dir: &Path,
  label: Option<&str>,
) -> Result<PathBuf, ReferenceError> {
  let jpeg = frame.to_jpeg(DEFAULT_JPEG_QUALITY)?;
  std::fs::create_dir_all(dir)?;
  let path = dir.join(reference_file_name(label, Local::now()));
  std::fs::write(&path, jpeg)?;
  info!(
    "参考图像已保存: {}（{}x{}）",
    path.display(),
    frame.width(),
    frame.height()
  );
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use image::{GrayImage, RgbImage};

  #[test]
  fn file_name_uses_label_and_timestamp() {
    let at = Local.with_ymd_and_hms(2026, 3, 1, 8, 5, 9).unwrap();
    assert_eq!(reference_file_name(None, at), "reference_20260301_080509.jpg");
    assert_eq!(reference_file_name(Some("  "), at), "reference_20260301_080509.jpg");
    assert_eq!(
      reference_file_name(Some("shirt/front"), at),
      "shirt_front_20260301_080509.jpg"
    );
  }

  #[test]
  fn saved_reference_is_full_resolution_rgb() {
    let dir = std::env::temp_dir().join(format!("paizhao-ref-{}", std::process::id()));
    let frame = Frame::from(GrayImage::new(64, 48));
    let path = save_reference(&frame, &dir, Some("unit")).unwrap();

    let decoded = image::open(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
    assert_eq!(decoded.color(), image::ColorType::Rgb8);
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn empty_frame_is_not_written() {
    let dir = std::env::temp_dir().join(format!("paizhao-empty-{}", std::process::id()));
    let frame = Frame::from(RgbImage::new(0, 0));
    assert!(save_reference(&frame, &dir, None).is_err());
    assert!(!dir.exists());
  }
}
