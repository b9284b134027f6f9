// 该文件是 Paizhao （拍照） 项目的一部分。
// src/client/model.rs - 服务端数据结构
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

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 服务端的款式记录，图像上传时关联到它
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
  pub id: u64,
  #[serde(default)]
  pub article_style: Option<String>,
  #[serde(default)]
  pub brand_name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
  pub id: u64,
  #[serde(default)]
  pub image_path: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub image_name: Option<String>,
  #[serde(default)]
  pub size: Option<String>,
  #[serde(default)]
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
  #[serde(default)]
  pub id: Option<u64>,
  #[serde(default)]
  pub article_style: Option<String>,
}

/// 某个款式下已上传的图像
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArticleImages {
  #[serde(default)]
  pub article: Option<ArticleSummary>,
  #[serde(default)]
  pub images: Vec<UploadedImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PingStatus {
  /// 服务端有回应
  pub reachable: bool,
  /// 回应成功且 API Key 有效
  pub authenticated: bool,
  pub server_time: Option<String>,
}

/// 尺码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SizeCode {
  S,
  #[default]
  M,
  L,
  XL,
  XXL,
}

impl SizeCode {
  pub const ALL: [SizeCode; 5] = [SizeCode::S, SizeCode::M, SizeCode::L, SizeCode::XL, SizeCode::XXL];

  pub fn as_str(self) -> &'static str {
    match self {
      SizeCode::S => "S",
      SizeCode::M => "M",
      SizeCode::L => "L",
      SizeCode::XL => "XL",
      SizeCode::XXL => "XXL",
    }
  }
}

impl fmt::Display for SizeCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的尺码: {0}（可选 S, M, L, XL, XXL）")]
pub struct ParseSizeError(pub String);

impl FromStr for SizeCode {
  type Err = ParseSizeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    SizeCode::ALL
      .into_iter()
      .find(|code| code.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| ParseSizeError(s.to_string()))
  }
}
