// 该文件是 Paizhao （拍照） 项目的一部分。
// src/source/webcam.rs - V4L2 摄像头输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{path::PathBuf, time::Duration};

#[cfg(feature = "v4l_webcam")]
use tracing::{info, warn};
use url::Url;

use super::{FrameSource, SourceError, SourceKind, query_dimension};
use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

#[cfg(feature = "v4l_webcam")]
use v4l::{
  Device, FourCC, buffer::Type, io::mmap::Stream, io::traits::CaptureStream, video::Capture,
};

pub const DEFAULT_WEBCAM_PATH: &str = "/dev/video0";
pub const DEFAULT_WEBCAM_WIDTH: u32 = 1920;
pub const DEFAULT_WEBCAM_HEIGHT: u32 = 1080;

#[cfg(feature = "v4l_webcam")]
const BUFFER_COUNT: u32 = 4;
// 打开后用于确认设备可用的取帧次数与单次超时
#[cfg(feature = "v4l_webcam")]
const VERIFY_ATTEMPTS: usize = 5;
#[cfg(feature = "v4l_webcam")]
const VERIFY_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(feature = "v4l_webcam"), allow(dead_code))]
enum PixelLayout {
  Yuyv,
  Mjpeg,
}

/// V4L2 摄像头输入源
///
/// 打开时请求 YUYV 格式，设备不支持时接受 MJPG。只有在确认能够取到图像帧后
/// 才算打开成功，能打开却无法出图的设备与不存在的设备同样处理。
pub struct WebcamSource {
  device_path: PathBuf,
  requested: (u32, u32),
  layout: PixelLayout,
  size: Option<(u32, u32)>,
  #[cfg(feature = "v4l_webcam")]
  stream: Option<Stream<'static>>,
}

impl WebcamSource {
  pub fn new(device_path: impl Into<PathBuf>, requested: (u32, u32)) -> Self {
    Self {
      device_path: device_path.into(),
      requested,
      layout: PixelLayout::Yuyv,
      size: None,
      #[cfg(feature = "v4l_webcam")]
      stream: None,
    }
  }

  pub fn device_path(&self) -> &std::path::Path {
    &self.device_path
  }

  pub fn requested_resolution(&self) -> (u32, u32) {
    self.requested
  }

  pub fn is_open(&self) -> bool {
    #[cfg(feature = "v4l_webcam")]
    {
      self.stream.is_some()
    }
    #[cfg(not(feature = "v4l_webcam"))]
    {
      false
    }
  }
}

impl FromUrlWithScheme for WebcamSource {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for WebcamSource {
  type Error = SourceError;

  // v4l:///dev/video0?width=1920&height=1080
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SourceError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    let device_path = match url.path() {
      "" | "/" => DEFAULT_WEBCAM_PATH.to_string(),
      path => path.to_string(),
    };
    let width = query_dimension(url, "width")?.unwrap_or(DEFAULT_WEBCAM_WIDTH);
    let height = query_dimension(url, "height")?.unwrap_or(DEFAULT_WEBCAM_HEIGHT);

    Ok(Self::new(device_path, (width, height)))
  }
}

#[cfg(feature = "v4l_webcam")]
impl WebcamSource {
  fn open_stream(&mut self) -> Result<(), SourceError> {
    let device = Device::with_path(&self.device_path).map_err(|e| {
      SourceError::Webcam(format!("无法打开设备 {}: {}", self.device_path.display(), e))
    })?;

    let mut format = Capture::format(&device)?;
    format.width = self.requested.0;
    format.height = self.requested.1;
    format.fourcc = FourCC::new(b"YUYV");
    let actual = Capture::set_format(&device, &format)?;

    self.layout = match &actual.fourcc.repr {
      b"YUYV" => PixelLayout::Yuyv,
      b"MJPG" => PixelLayout::Mjpeg,
      _ => return Err(SourceError::UnsupportedFormat(actual.fourcc.to_string())),
    };

    let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
      .map_err(|e| SourceError::Webcam(format!("无法创建捕获流: {}", e)))?;

    self.size = Some((actual.width, actual.height));
    self.stream = Some(stream);
    Ok(())
  }
}

impl FrameSource for WebcamSource {
  fn kind(&self) -> SourceKind {
    SourceKind::Webcam
  }

  #[cfg(feature = "v4l_webcam")]
  fn open(&mut self) -> Result<(), SourceError> {
    if self.stream.is_some() {
      return Ok(());
    }

    self.open_stream()?;

    // 预热并确认设备确实能出图
    for attempt in 1..=VERIFY_ATTEMPTS {
      if self.grab(VERIFY_TIMEOUT).is_some() {
        info!(
          "摄像头 {} 已就绪（第 {} 次取帧成功）",
          self.device_path.display(),
          attempt
        );
        return Ok(());
      }
    }

    warn!("摄像头 {} 无法提供图像帧", self.device_path.display());
    self.close();
    Err(SourceError::NoFrames)
  }

  #[cfg(not(feature = "v4l_webcam"))]
  fn open(&mut self) -> Result<(), SourceError> {
    Err(SourceError::Unsupported("v4l_webcam"))
  }

  #[cfg(feature = "v4l_webcam")]
  fn grab(&mut self, timeout: Duration) -> Option<Frame> {
    let (width, height) = self.size?;
    let layout = self.layout;
    let stream = self.stream.as_mut()?;
    stream.set_timeout(timeout);

    match CaptureStream::next(stream) {
      Ok((buffer, meta)) => {
        let used = match meta.bytesused as usize {
          0 => buffer.len(),
          n => n.min(buffer.len()),
        };
        decode(layout, width, height, &buffer[..used])
      }
      Err(e) if e.kind() == std::io::ErrorKind::TimedOut => None,
      Err(e) => {
        warn!("摄像头取帧失败: {}", e);
        None
      }
    }
  }

  #[cfg(not(feature = "v4l_webcam"))]
  fn grab(&mut self, _timeout: Duration) -> Option<Frame> {
    None
  }

  fn close(&mut self) {
    #[cfg(feature = "v4l_webcam")]
    self.stream.take();
    self.size = None;
  }

  fn resolution(&self) -> Option<(u32, u32)> {
    self.size
  }
}

impl Drop for WebcamSource {
  fn drop(&mut self) {
    self.close();
  }
}

#[cfg_attr(not(feature = "v4l_webcam"), allow(dead_code))]
fn decode(layout: PixelLayout, width: u32, height: u32, data: &[u8]) -> Option<Frame> {
  match layout {
    PixelLayout::Yuyv => {
      let Some(rgb) = yuyv_to_rgb(data, width, height) else {
        tracing::warn!(
          "YUYV 帧数据不完整: {} 字节，期望 {}x{}",
          data.len(),
          width,
          height
        );
        return None;
      };
      Frame::from_rgb_raw(width, height, rgb)
    }
    PixelLayout::Mjpeg => {
      let image = match image::load_from_memory_with_format(data, image::ImageFormat::Jpeg) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
          tracing::warn!("MJPG 解码失败: {}", e);
          return None;
        }
      };
      if image.dimensions() != (width, height) {
        tracing::warn!(
          "MJPG 帧尺寸 {}x{} 与设备格式 {}x{} 不一致",
          image.width(),
          image.height(),
          width,
          height
        );
        return None;
      }
      Some(Frame::Color(image))
    }
  }
}

/// 将 YUYV 格式转换为 RGB，数据不足一整帧时返回 None
pub(crate) fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
  let pixels = (width as usize) * (height as usize);
  if pixels % 2 != 0 || yuyv.len() < pixels * 2 {
    return None;
  }

  let mut rgb = Vec::with_capacity(pixels * 3);
  for chunk in yuyv[..pixels * 2].chunks_exact(4) {
    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    for y in [y0, y1] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  Some(rgb)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yuyv_grey_maps_to_grey() {
    // 两个像素：Y=128, U=V=128
    let rgb = yuyv_to_rgb(&[128, 128, 128, 128], 2, 1).unwrap();
    assert_eq!(rgb, vec![128, 128, 128, 128, 128, 128]);
  }

  #[test]
  fn yuyv_short_buffer_is_rejected() {
    assert!(yuyv_to_rgb(&[0; 7], 2, 2).is_none());
    assert_eq!(yuyv_to_rgb(&[0; 8], 2, 2).map(|v| v.len()), Some(12));
  }

  #[test]
  fn mjpg_frames_must_match_the_negotiated_size() {
    let jpeg = Frame::from(image::RgbImage::from_pixel(16, 8, image::Rgb([40, 90, 160])))
      .to_jpeg(90)
      .unwrap();

    let frame = decode(PixelLayout::Mjpeg, 16, 8, &jpeg).unwrap();
    assert_eq!(frame.dimensions(), (16, 8));
    assert_eq!(frame.channels(), 3);

    assert!(decode(PixelLayout::Mjpeg, 32, 8, &jpeg).is_none());
    assert!(decode(PixelLayout::Mjpeg, 16, 8, &[1, 2, 3]).is_none());
  }

  #[test]
  fn partial_yuyv_frame_is_dropped() {
    assert!(decode(PixelLayout::Yuyv, 4, 2, &[128; 10]).is_none());
    let frame = decode(PixelLayout::Yuyv, 4, 2, &[128; 16]).unwrap();
    assert_eq!(frame.dimensions(), (4, 2));
  }

  #[test]
  fn from_url_defaults_and_query() {
    let url = Url::parse("v4l:///dev/video2?width=1280&height=720").unwrap();
    let source = WebcamSource::from_url(&url).unwrap();
    assert_eq!(source.device_path(), std::path::Path::new("/dev/video2"));
    assert_eq!(source.requested_resolution(), (1280, 720));

    let url = Url::parse("v4l:///").unwrap();
    let source = WebcamSource::from_url(&url).unwrap();
    assert_eq!(source.device_path(), std::path::Path::new(DEFAULT_WEBCAM_PATH));
    assert_eq!(
      source.requested_resolution(),
      (DEFAULT_WEBCAM_WIDTH, DEFAULT_WEBCAM_HEIGHT)
    );
  }

  #[test]
  fn scheme_mismatch_is_rejected() {
    let url = Url::parse("pattern:///").unwrap();
    assert!(matches!(
      WebcamSource::from_url(&url),
      Err(SourceError::SchemeMismatch { expected: "v4l", .. })
    ));
  }

  #[test]
  fn unopened_webcam_yields_nothing_and_closes_twice() {
    let mut source = WebcamSource::new("/dev/does-not-exist", (640, 480));
    assert!(source.grab(Duration::from_millis(1)).is_none());
    assert!(source.resolution().is_none());
    source.close();
    source.close();
    assert!(!source.is_open());
  }

  #[test]
  fn missing_device_fails_to_open() {
    let mut source = WebcamSource::new("/dev/does-not-exist", (640, 480));
    assert!(source.open().is_err());
    assert!(!source.is_open());
  }
}
