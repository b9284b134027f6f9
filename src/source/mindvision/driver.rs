// 该文件是 Paizhao （拍照） 项目的一部分。
// src/source/mindvision/driver.rs - MindVision 相机安全封装
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

use std::{
  ffi::{CStr, c_int},
  ptr,
  sync::OnceLock,
  time::Duration,
};

use tracing::{debug, info};

use super::{MindVisionSettings, SdkError, ffi};
use crate::{frame::Frame, source::SourceError};

static SDK_INIT: OnceLock<ffi::CameraSdkStatus> = OnceLock::new();

fn check(call: &'static str, status: ffi::CameraSdkStatus) -> Result<(), SdkError> {
  if status == ffi::CAMERA_STATUS_SUCCESS {
    Ok(())
  } else {
    Err(SdkError { call, status })
  }
}

fn c_name(raw: &[std::ffi::c_char; 32]) -> String {
  let bytes: Vec<u8> = raw.iter().map(|c| *c as u8).collect();
  CStr::from_bytes_until_nul(&bytes)
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned())
}

/// 已初始化并处于连续采集状态的相机，释放时反初始化
pub(super) struct Camera {
  handle: ffi::CameraHandle,
  name: String,
  native: (u32, u32),
  buffer: Vec<u8>,
}

impl Camera {
  pub fn open(settings: &MindVisionSettings) -> Result<Self, SourceError> {
    // SAFETY: 纯函数调用，SDK 内部保证重复初始化安全，这里只调用一次
    let status = *SDK_INIT.get_or_init(|| unsafe { ffi::CameraSdkInit(ffi::LANGUAGE_ENGLISH) });
    check("CameraSdkInit", status)?;

    let mut devices = [ffi::CameraDevInfo::default(); ffi::MAX_DEVICES];
    let mut count = ffi::MAX_DEVICES as c_int;
    // SAFETY: devices 的容量通过 count 传入
    let status = unsafe { ffi::CameraEnumerateDevice(devices.as_mut_ptr(), &mut count) };
    let count = count.clamp(0, ffi::MAX_DEVICES as c_int) as usize;
    if status != ffi::CAMERA_STATUS_SUCCESS || count == 0 {
      debug!("CameraEnumerateDevice 返回 {}，设备数 {}", status, count);
      return Err(SourceError::NoDevice);
    }
    info!("找到 {} 台 MindVision 相机", count);

    let Some(device) = devices[..count].get_mut(settings.device_index) else {
      return Err(SourceError::InvalidParameter(format!(
        "相机序号 {} 超出范围（共 {} 台）",
        settings.device_index, count
      )));
    };
    let name = c_name(&device.acFriendlyName);

    let mut handle: ffi::CameraHandle = 0;
    // SAFETY: device 指向有效的设备信息，handle 为输出参数
    check("CameraInit", unsafe {
      ffi::CameraInit(
        device,
        ffi::PARAM_MODE_BY_LAST,
        ffi::PARAMETER_TEAM_DEFAULT,
        &mut handle,
      )
    })?;

    // 句柄一旦取得，之后的失败都经由 Drop 反初始化
    let mut camera = Self {
      handle,
      name,
      native: (0, 0),
      buffer: Vec::new(),
    };
    camera.configure(settings)?;
    Ok(camera)
  }

  fn configure(&mut self, settings: &MindVisionSettings) -> Result<(), SourceError> {
    let mut capability = ffi::CameraCapability::default();
    // SAFETY: capability 为 SDK 写入的输出结构
    check("CameraGetCapability", unsafe {
      ffi::CameraGetCapability(self.handle, &mut capability)
    })?;

    let range = capability.sResolutionRange;
    if range.iWidthMax <= 0 || range.iHeightMax <= 0 {
      return Err(SourceError::MalformedFrame(format!(
        "相机报告的最大分辨率无效: {}x{}",
        range.iWidthMax, range.iHeightMax
      )));
    }
    self.native = (range.iWidthMax as u32, range.iHeightMax as u32);
    info!("相机原生分辨率: {}x{}", self.native.0, self.native.1);

    // SAFETY: 以下均为对有效句柄的参数设置
    unsafe {
      check(
        "CameraSetIspOutFormat",
        ffi::CameraSetIspOutFormat(self.handle, ffi::CAMERA_MEDIA_TYPE_MONO8),
      )?;
      check(
        "CameraSetTriggerMode",
        ffi::CameraSetTriggerMode(self.handle, ffi::TRIGGER_MODE_CONTINUOUS),
      )?;
      check(
        "CameraSetAeState",
        ffi::CameraSetAeState(self.handle, settings.auto_exposure as c_int),
      )?;
      check(
        "CameraSetAnalogGain",
        ffi::CameraSetAnalogGain(self.handle, settings.analog_gain),
      )?;
    }

    // MONO8 每像素一个字节
    self.buffer = vec![0u8; self.native.0 as usize * self.native.1 as usize];

    // SAFETY: 有效句柄
    check("CameraPlay", unsafe { ffi::CameraPlay(self.handle) })?;
    info!("相机 {} 已开始采集", self.name);
    Ok(())
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn native_resolution(&self) -> (u32, u32) {
    self.native
  }

  /// 取一帧并复制为单通道图像
  pub fn grab(&mut self, timeout: Duration) -> Result<Frame, SourceError> {
    let mut head = ffi::FrameHead::default();
    let mut raw: *mut u8 = ptr::null_mut();
    let millis = timeout.as_millis().min(u32::MAX as u128) as u32;

    // SAFETY: head 与 raw 为输出参数，成功时 raw 指向 SDK 持有的缓冲区
    check("CameraGetImageBuffer", unsafe {
      ffi::CameraGetImageBuffer(self.handle, &mut head, &mut raw, millis)
    })?;

    let width = head.iWidth.max(0) as u32;
    let height = head.iHeight.max(0) as u32;
    let needed = width as usize * height as usize;

    let processed = if needed == 0 || needed > self.buffer.len() {
      Err(SourceError::MalformedFrame(format!(
        "帧尺寸 {}x{} 超出缓冲区（{} 字节）",
        width,
        height,
        self.buffer.len()
      )))
    } else {
      // SAFETY: 输出缓冲区容量已检查，raw 在释放前有效
      check("CameraImageProcess", unsafe {
        ffi::CameraImageProcess(self.handle, raw, self.buffer.as_mut_ptr(), &mut head)
      })
      .map_err(SourceError::from)
    };

    // 无论处理是否成功都要归还 SDK 缓冲区
    // SAFETY: raw 来自 CameraGetImageBuffer
    let released = unsafe { ffi::CameraReleaseImageBuffer(self.handle, raw) };
    processed?;
    check("CameraReleaseImageBuffer", released)?;

    #[cfg(target_os = "windows")]
    {
      // Windows 下 SDK 输出为上下颠倒
      // SAFETY: buffer 中已有完整的一帧
      check("CameraFlipFrameBuffer", unsafe {
        ffi::CameraFlipFrameBuffer(self.buffer.as_mut_ptr(), &mut head, ffi::FLIP_VERTICAL)
      })?;
    }

    Frame::from_mono_raw(width, height, self.buffer[..needed].to_vec())
      .ok_or_else(|| SourceError::MalformedFrame(format!("无法构建 {}x{} 单通道帧", width, height)))
  }
}

impl Drop for Camera {
  fn drop(&mut self) {
    // SAFETY: 句柄在 open 成功后一直有效，此处只反初始化一次
    let status = unsafe { ffi::CameraUnInit(self.handle) };
    if status != ffi::CAMERA_STATUS_SUCCESS {
      tracing::warn!("CameraUnInit 返回 {}", status);
    }
    debug!("相机 {} 已释放", self.name);
  }
}
