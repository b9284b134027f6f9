// 该文件是 Paizhao （拍照） 项目的一部分。
// src/preview.rs - 预览窗口
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::Duration,
};

use image::RgbImage;
use minifb::{Key, KeyRepeat, ScaleMode, Window, WindowOptions};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const WINDOWED_SIZE: (u32, u32) = (1280, 720);

/// 预览中操作员可触发的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKey {
  /// 空格或回车：确认拍摄
  Confirm,
  /// Q、关闭窗口或 Ctrl-C：取消
  Cancel,
  /// F：切换全屏与窗口
  ToggleDisplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  Fullscreen,
  Windowed,
}

impl DisplayMode {
  pub fn toggled(self) -> Self {
    match self {
      DisplayMode::Fullscreen => DisplayMode::Windowed,
      DisplayMode::Windowed => DisplayMode::Fullscreen,
    }
  }
}

#[derive(Error, Debug)]
pub enum PreviewError {
  #[error("预览窗口错误: {0}")]
  Window(#[from] minifb::Error),
  #[error("预览画面尺寸无效: {0}x{1}")]
  InvalidSize(u32, u32),
}

/// 捕获循环与显示之间的接口
pub trait PreviewSurface {
  fn show(&mut self, image: &RgbImage) -> Result<(), PreviewError>;

  /// 最多等待 `timeout`，返回期间的按键
  fn poll_key(&mut self, timeout: Duration) -> Option<PreviewKey>;

  fn set_mode(&mut self, mode: DisplayMode) -> Result<(), PreviewError>;
}

pub(crate) fn map_key(key: Key) -> Option<PreviewKey> {
  match key {
    Key::Space | Key::Enter | Key::NumPadEnter => Some(PreviewKey::Confirm),
    Key::Q => Some(PreviewKey::Cancel),
    Key::F => Some(PreviewKey::ToggleDisplay),
    _ => None,
  }
}

/// 将 RGB 交错数据转换为 minifb 使用的 0RGB 像素
fn rgb_to_argb(image: &RgbImage) -> Vec<u32> {
  image
    .pixels()
    .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
    .collect()
}

/// 基于 minifb 的预览窗口
///
/// minifb 不支持运行时切换全屏，切换模式时重建窗口并重新显示最后一帧。
pub struct WindowSurface {
  title: String,
  display_size: (u32, u32),
  mode: DisplayMode,
  window: Window,
  last: Option<(Vec<u32>, usize, usize)>,
  interrupt: Option<Interrupt>,
}

impl WindowSurface {
  pub fn open(
    title: impl Into<String>,
    mode: DisplayMode,
    display_size: (u32, u32),
  ) -> Result<Self, PreviewError> {
    let title = title.into();
    let window = Self::create_window(&title, mode, display_size)?;
    info!("预览窗口已打开（{:?}）", mode);
    Ok(Self {
      title,
      display_size,
      mode,
      window,
      last: None,
      interrupt: None,
    })
  }

  /// 预览期间的 Ctrl-C 视为取消，窗口打开前残留的取消请求被丢弃
  pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
    interrupt.clear_cancel();
    self.interrupt = Some(interrupt);
    self
  }

  fn create_window(
    title: &str,
    mode: DisplayMode,
    display_size: (u32, u32),
  ) -> Result<Window, PreviewError> {
    let (options, (width, height)) = match mode {
      DisplayMode::Fullscreen => (
        WindowOptions {
          borderless: true,
          title: false,
          topmost: true,
          scale_mode: ScaleMode::AspectRatioStretch,
          ..WindowOptions::default()
        },
        display_size,
      ),
      DisplayMode::Windowed => (
        WindowOptions {
          resize: true,
          scale_mode: ScaleMode::AspectRatioStretch,
          ..WindowOptions::default()
        },
        WINDOWED_SIZE,
      ),
    };
    if width == 0 || height == 0 {
      return Err(PreviewError::InvalidSize(width, height));
    }
    let mut window = Window::new(title, width as usize, height as usize, options)?;
    window.set_target_fps(0);
    Ok(window)
  }

  fn interrupted(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .is_some_and(|interrupt| interrupt.take_cancel() || interrupt.quit_requested())
  }

  fn pressed(&self) -> Option<PreviewKey> {
    self
      .window
      .get_keys_pressed(KeyRepeat::No)
      .into_iter()
      .find_map(map_key)
  }
}

impl PreviewSurface for WindowSurface {
  fn show(&mut self, image: &RgbImage) -> Result<(), PreviewError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(PreviewError::InvalidSize(width, height));
    }
    let buffer = rgb_to_argb(image);
    self
      .window
      .update_with_buffer(&buffer, width as usize, height as usize)?;
    self.last = Some((buffer, width as usize, height as usize));
    Ok(())
  }

  fn poll_key(&mut self, timeout: Duration) -> Option<PreviewKey> {
    if self.interrupted() || !self.window.is_open() {
      return Some(PreviewKey::Cancel);
    }
    if let Some(key) = self.pressed() {
      return Some(key);
    }

    thread::sleep(timeout);
    self.window.update();

    if self.interrupted() || !self.window.is_open() {
      debug!("预览窗口已关闭或收到中断");
      return Some(PreviewKey::Cancel);
    }
    self.pressed()
  }

  fn set_mode(&mut self, mode: DisplayMode) -> Result<(), PreviewError> {
    if mode == self.mode {
      return Ok(());
    }
    let window = Self::create_window(&self.title, mode, self.display_size)?;
    self.window = window;
    self.mode = mode;
    info!("预览切换为 {:?}", mode);

    if let Some((buffer, width, height)) = self.last.as_ref()
      && let Err(e) = self.window.update_with_buffer(buffer, *width, *height)
    {
      warn!("重新显示预览画面失败: {}", e);
    }
    Ok(())
  }
}

/// Ctrl-C 状态
///
/// 第一次信号请求取消当前预览；取消请求未被消费时再次收到信号，则请求退出。
/// 退出由调用方在关闭输入源后完成，信号处理线程不直接结束进程。
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
  cancel: Arc<AtomicBool>,
  quit: Arc<AtomicBool>,
}

impl Interrupt {
  pub fn new() -> Self {
    Self::default()
  }

  /// 记录一次中断信号，返回是否已请求退出
  pub fn signal(&self) -> bool {
    if self.cancel.swap(true, Ordering::SeqCst) {
      self.quit.store(true, Ordering::SeqCst);
    }
    self.quit_requested()
  }

  /// 消费取消请求
  pub fn take_cancel(&self) -> bool {
    self.cancel.swap(false, Ordering::SeqCst)
  }

  pub fn clear_cancel(&self) {
    self.cancel.store(false, Ordering::SeqCst);
  }

  pub fn quit_requested(&self) -> bool {
    self.quit.load(Ordering::SeqCst)
  }
}

/// 注册 Ctrl-C 处理
pub fn install_interrupt_handler() -> Result<Interrupt, ctrlc::Error> {
  let interrupt = Interrupt::new();
  let handler = interrupt.clone();
  ctrlc::set_handler(move || {
    if handler.signal() {
      eprintln!("再次收到中断信号，关闭输入源后退出...");
    } else {
      eprintln!("收到中断信号，正在取消...");
    }
  })?;
  Ok(interrupt)
}
