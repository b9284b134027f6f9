// 该文件是 Paizhao （拍照） 项目的一部分。
// src/frame.rs - 帧定义
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

use image::{
  ExtendedColorType, GrayImage, ImageBuffer, ImageEncoder, ImageError, Rgb, RgbImage,
  codecs::jpeg::JpegEncoder,
  error::{ParameterError, ParameterErrorKind},
};

/// 上传与保存参考图像时使用的 JPEG 质量
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

const MONO_CHANNELS: usize = 1;
const RGB_CHANNELS: usize = 3;

/// 一帧图像：相机原生的单通道数据，或者摄像头/测试图案的三通道数据
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
  Mono(GrayImage),
  Color(RgbImage),
}

impl Frame {
  /// 从单通道原始数据构建帧，长度不匹配时返回 None
  pub fn from_mono_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
    GrayImage::from_raw(width, height, data).map(Frame::Mono)
  }

  /// 从 RGB 交错数据构建帧，长度不匹配时返回 None
  pub fn from_rgb_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
    RgbImage::from_raw(width, height, data).map(Frame::Color)
  }

  pub fn width(&self) -> u32 {
    match self {
      Frame::Mono(image) => image.width(),
      Frame::Color(image) => image.width(),
    }
  }

  pub fn height(&self) -> u32 {
    match self {
      Frame::Mono(image) => image.height(),
      Frame::Color(image) => image.height(),
    }
  }

  pub fn dimensions(&self) -> (u32, u32) {
    (self.width(), self.height())
  }

  pub fn channels(&self) -> usize {
    match self {
      Frame::Mono(_) => MONO_CHANNELS,
      Frame::Color(_) => RGB_CHANNELS,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.width() == 0 || self.height() == 0
  }

  /// 转换为三通道图像，单通道数据复制到每个通道
  pub fn to_rgb(&self) -> RgbImage {
    match self {
      Frame::Mono(image) => ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y)[0];
        Rgb([v, v, v])
      }),
      Frame::Color(image) => image.clone(),
    }
  }

  /// 编码为三通道 JPEG
  pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, ImageError> {
    if self.is_empty() {
      return Err(ImageError::Parameter(ParameterError::from_kind(
        ParameterErrorKind::DimensionMismatch,
      )));
    }

    let rgb = self.to_rgb();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).write_image(
      rgb.as_raw(),
      rgb.width(),
      rgb.height(),
      ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
  }
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    Frame::Color(image)
  }
}

impl From<GrayImage> for Frame {
  fn from(image: GrayImage) -> Self {
    Frame::Mono(image)
  }
}
