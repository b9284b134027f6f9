// 该文件是 Paizhao （拍照） 项目的一部分。
// src/source/mindvision/ffi.rs - MindVision 相机 SDK 绑定
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

#![allow(non_snake_case)]
#![allow(dead_code)]

use std::ffi::{c_char, c_int, c_uint, c_void};

pub type CameraHandle = c_int;
pub type CameraSdkStatus = c_int;

pub const CAMERA_STATUS_SUCCESS: CameraSdkStatus = 0;
pub const CAMERA_STATUS_TIME_OUT: CameraSdkStatus = -12;

pub const CAMERA_MEDIA_TYPE_MONO8: c_uint = 0x0108_0001;

// CameraSdkInit 语言参数：1 为英文
pub const LANGUAGE_ENGLISH: c_int = 1;
// CameraInit 参数：-1 表示使用上次退出时的参数与默认分组
pub const PARAM_MODE_BY_LAST: c_int = -1;
pub const PARAMETER_TEAM_DEFAULT: c_int = -1;
pub const TRIGGER_MODE_CONTINUOUS: c_int = 0;
pub const FLIP_VERTICAL: c_int = 1;

pub const MAX_DEVICES: usize = 16;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct CameraDevInfo {
  pub acProductSeries: [c_char; 32],
  pub acProductName: [c_char; 32],
  pub acFriendlyName: [c_char; 32],
  pub acLinkName: [c_char; 32],
  pub acDriverVersion: [c_char; 32],
  pub acSensorType: [c_char; 32],
  pub acPortType: [c_char; 32],
  pub acSn: [c_char; 32],
  pub uInstance: c_uint,
}

impl Default for CameraDevInfo {
  fn default() -> Self {
    Self {
      acProductSeries: [0; 32],
      acProductName: [0; 32],
      acFriendlyName: [0; 32],
      acLinkName: [0; 32],
      acDriverVersion: [0; 32],
      acSensorType: [0; 32],
      acPortType: [0; 32],
      acSn: [0; 32],
      uInstance: 0,
    }
  }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct SdkExpose {
  pub uiTargetMin: c_uint,
  pub uiTargetMax: c_uint,
  pub uiAnalogGainMin: c_uint,
  pub uiAnalogGainMax: c_uint,
  pub fAnalogGainStep: f32,
  pub uiExposeTimeMin: c_uint,
  pub uiExposeTimeMax: c_uint,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct SdkResolutionRange {
  pub iHeightMax: c_int,
  pub iHeightMin: c_int,
  pub iWidthMax: c_int,
  pub iWidthMin: c_int,
  pub uSkipModeMask: c_uint,
  pub uBinSumModeMask: c_uint,
  pub uBinAverageModeMask: c_uint,
  pub uResampleMask: c_uint,
}

/// 相机能力描述，只使用分辨率范围，其后的字段以保留区占位
#[repr(C)]
pub struct CameraCapability {
  pub pTriggerDesc: *mut c_void,
  pub iTriggerDesc: c_int,
  pub pImageSizeDesc: *mut c_void,
  pub iImageSizeDesc: c_int,
  pub pClrTempDesc: *mut c_void,
  pub iClrTempDesc: c_int,
  pub pMediaTypeDesc: *mut c_void,
  pub iMediaTypdeDesc: c_int,
  pub pFrameSpeedDesc: *mut c_void,
  pub iFrameSpeedDesc: c_int,
  pub pPackLenDesc: *mut c_void,
  pub iPackLenDesc: c_int,
  pub iOutputIoCounts: c_int,
  pub iInputIoCounts: c_int,
  pub pPresetLutDesc: *mut c_void,
  pub iPresetLut: c_int,
  pub iUserDataMaxLen: c_int,
  pub bParamInDevice: c_int,
  pub pAeAlmSwDesc: *mut c_void,
  pub iAeAlmSwDesc: c_int,
  pub pAeAlmHdDesc: *mut c_void,
  pub iAeAlmHdDesc: c_int,
  pub pBayerDecAlmSwDesc: *mut c_void,
  pub iBayerDecAlmSwDesc: c_int,
  pub pBayerDecAlmHdDesc: *mut c_void,
  pub iBayerDecAlmHdDesc: c_int,
  pub sExposeDesc: SdkExpose,
  pub sResolutionRange: SdkResolutionRange,
  _tail: [u8; 512],
}

impl Default for CameraCapability {
  fn default() -> Self {
    // SAFETY: 全部字段均为整数、浮点或裸指针，全零是合法取值
    unsafe { std::mem::zeroed() }
  }
}

#[repr(C)]
#[derive(Clone, Copy, Default, Debug)]
pub struct FrameHead {
  pub uiMediaType: c_uint,
  pub uBytes: c_uint,
  pub iWidth: c_int,
  pub iHeight: c_int,
  pub iWidthZoomSw: c_int,
  pub iHeightZoomSw: c_int,
  pub bIsTrigger: c_int,
  pub uiTimeStamp: c_uint,
  pub uiExpTime: c_uint,
  pub fAnalogGain: f32,
  pub iGamma: c_int,
  pub iContrast: c_int,
  pub iSaturation: c_int,
  pub fRgain: f32,
  pub fGgain: f32,
  pub fBgain: f32,
}

unsafe extern "C" {
  pub fn CameraSdkInit(iLanguageSel: c_int) -> CameraSdkStatus;

  pub fn CameraEnumerateDevice(
    pCameraList: *mut CameraDevInfo,
    piNums: *mut c_int,
  ) -> CameraSdkStatus;

  pub fn CameraInit(
    pCameraInfo: *mut CameraDevInfo,
    emParamLoadMode: c_int,
    emTeam: c_int,
    pCameraHandle: *mut CameraHandle,
  ) -> CameraSdkStatus;

  pub fn CameraGetCapability(
    hCamera: CameraHandle,
    pCameraInfo: *mut CameraCapability,
  ) -> CameraSdkStatus;

  pub fn CameraSetIspOutFormat(hCamera: CameraHandle, uFormat: c_uint) -> CameraSdkStatus;

  pub fn CameraSetTriggerMode(hCamera: CameraHandle, iModeSel: c_int) -> CameraSdkStatus;

  pub fn CameraSetAeState(hCamera: CameraHandle, bAeState: c_int) -> CameraSdkStatus;

  pub fn CameraSetAnalogGain(hCamera: CameraHandle, iAnalogGain: c_int) -> CameraSdkStatus;

  pub fn CameraPlay(hCamera: CameraHandle) -> CameraSdkStatus;

  pub fn CameraGetImageBuffer(
    hCamera: CameraHandle,
    pFrameInfo: *mut FrameHead,
    pbyBuffer: *mut *mut u8,
    wTimes: c_uint,
  ) -> CameraSdkStatus;

  pub fn CameraImageProcess(
    hCamera: CameraHandle,
    pbyIn: *mut u8,
    pbyOut: *mut u8,
    pFrInfo: *mut FrameHead,
  ) -> CameraSdkStatus;

  pub fn CameraReleaseImageBuffer(hCamera: CameraHandle, pbyBuffer: *mut u8) -> CameraSdkStatus;

  pub fn CameraFlipFrameBuffer(
    pFrameBuffer: *mut u8,
    pFrameHead: *mut FrameHead,
    Flags: c_int,
  ) -> CameraSdkStatus;

  pub fn CameraUnInit(hCamera: CameraHandle) -> CameraSdkStatus;
}
