// 该文件是 Paizhao （拍照） 项目的一部分。
// src/client.rs - 质检服务 HTTP 客户端
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

use chrono::Local;
use reqwest::blocking::{Client, RequestBuilder, multipart};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::frame::{DEFAULT_JPEG_QUALITY, Frame};

mod model;

pub use self::model::{
  Article, ArticleImages, ArticleSummary, ParseSizeError, PingStatus, SizeCode, UploadedImage,
};

pub const API_KEY_HEADER: &str = "X-API-Key";

const READ_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ClientError {
  #[error("无法创建 HTTP 客户端: {0}")]
  Build(#[source] reqwest::Error),
  #[error("请求失败: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("无法解析服务端响应（HTTP {status}）: {source}")]
  Decode {
    status: u16,
    #[source]
    source: serde_json::Error,
  },
  #[error("服务端拒绝: {0}")]
  Rejected(String),
  #[error("无效的 URL: {0}")]
  Url(#[from] url::ParseError),
  #[error("图像编码失败: {0}")]
  Image(#[from] image::ImageError),
}

impl ClientError {
  /// 服务端是否有回应
  pub fn server_replied(&self) -> bool {
    matches!(self, ClientError::Decode { .. } | ClientError::Rejected(_))
  }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub base_url: Url,
  pub api_key: String,
  /// 为 false 时忽略系统代理设置
  pub use_system_proxy: bool,
}

impl ClientConfig {
  pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
    Self {
      base_url,
      api_key: api_key.into(),
      use_system_proxy: true,
    }
  }
}

/// 所有响应的外层结构：`{ success, message?, ...payload }`
#[derive(Deserialize)]
struct Envelope<T> {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  message: Option<String>,
  #[serde(flatten)]
  payload: T,
}

#[derive(Deserialize)]
struct PingPayload {
  #[serde(default)]
  authenticated: bool,
  #[serde(default)]
  server_time: Option<String>,
}

#[derive(Deserialize)]
struct ArticlesPayload {
  #[serde(default)]
  articles: Vec<Article>,
}

#[derive(Deserialize)]
struct UploadPayload {
  #[serde(default)]
  image: Option<UploadedImage>,
}

#[derive(Deserialize)]
struct EmptyPayload {}

/// 质检服务客户端
///
/// 公开的操作不会返回错误：失败时记录日志并返回空结果，由调用方决定如何提示操作员。
pub struct ApiClient {
  http: Client,
  base_url: Url,
  api_key: String,
}

impl ApiClient {
  pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
    let mut builder = Client::builder();
    if !config.use_system_proxy {
      builder = builder.no_proxy();
    }
    let http = builder.build().map_err(ClientError::Build)?;

    let mut base_url = config.base_url;
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    Ok(Self {
      http,
      base_url,
      api_key: config.api_key,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// 服务端网页地址，例如 `article-registration`
  pub fn page_url(&self, page: &str) -> Result<Url, ClientError> {
    Ok(self.base_url.join(page.trim_start_matches('/'))?)
  }

  fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
    Ok(self.base_url.join(&format!("api/camera/{}", path))?)
  }

  fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.header(API_KEY_HEADER, &self.api_key).send()?;
    let status = response.status();
    let body = response.bytes()?;
    debug!("HTTP {}，响应 {} 字节", status, body.len());

    let envelope: Envelope<T> =
      serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
        status: status.as_u16(),
        source,
      })?;
    if !envelope.success {
      let message = envelope
        .message
        .unwrap_or_else(|| format!("HTTP {}", status));
      return Err(ClientError::Rejected(message));
    }
    Ok(envelope.payload)
  }

  fn try_ping(&self) -> Result<PingPayload, ClientError> {
    let url = self.endpoint("ping")?;
    self.execute(self.http.get(url).timeout(READ_TIMEOUT))
  }

  /// 测试连接与认证
  pub fn ping(&self) -> PingStatus {
    info!("正在测试 API 连接: {}", self.base_url);
    match self.try_ping() {
      Ok(payload) => {
        if payload.authenticated {
          info!("API 连接成功，服务器时间: {}", payload.server_time.as_deref().unwrap_or("未知"));
        } else {
          warn!("API 可以访问，但认证未通过");
        }
        PingStatus {
          reachable: true,
          authenticated: payload.authenticated,
          server_time: payload.server_time,
        }
      }
      Err(e) => {
        error!("API 连接失败: {}", e);
        PingStatus {
          reachable: e.server_replied(),
          authenticated: false,
          server_time: None,
        }
      }
    }
  }

  fn try_list_articles(&self) -> Result<Vec<Article>, ClientError> {
    let url = self.endpoint("articles")?;
    let payload: ArticlesPayload = self.execute(self.http.get(url).timeout(READ_TIMEOUT))?;
    Ok(payload.articles)
  }

  /// 获取款式列表，保持服务端顺序
  pub fn list_articles(&self) -> Vec<Article> {
    match self.try_list_articles() {
      Ok(articles) => {
        info!("获取到 {} 个款式", articles.len());
        articles
      }
      Err(e) => {
        error!("获取款式列表失败: {}", e);
        Vec::new()
      }
    }
  }

  fn try_list_images(&self, article_id: u64) -> Result<ArticleImages, ClientError> {
    let url = self.endpoint(&format!("articles/{}/images", article_id))?;
    self.execute(self.http.get(url).timeout(READ_TIMEOUT))
  }

  pub fn list_images(&self, article_id: u64) -> Option<ArticleImages> {
    match self.try_list_images(article_id) {
      Ok(images) => {
        info!("款式 {} 共有 {} 张图像", article_id, images.images.len());
        Some(images)
      }
      Err(e) => {
        error!("获取款式 {} 的图像失败: {}", article_id, e);
        None
      }
    }
  }

  fn try_upload_image(
    &self,
    frame: &Frame,
    article_id: u64,
    size: SizeCode,
  ) -> Result<Option<UploadedImage>, ClientError> {
    // 编码失败时不发送请求
    let jpeg = frame.to_jpeg(DEFAULT_JPEG_QUALITY)?;
    let file_name = format!("camera_capture_{}.jpg", Local::now().format("%Y%m%d_%H%M%S"));
    debug!("上传文件 {}，{} 字节", file_name, jpeg.len());

    let part = multipart::Part::bytes(jpeg)
      .file_name(file_name)
      .mime_str("image/jpeg")?;
    let form = multipart::Form::new()
      .part("image", part)
      .text("article_id", article_id.to_string())
      .text("size", size.as_str());

    let url = self.endpoint("upload")?;
    let payload: UploadPayload =
      self.execute(self.http.post(url).multipart(form).timeout(UPLOAD_TIMEOUT))?;
    Ok(payload.image)
  }

  /// 上传图像到指定款式，返回服务端创建的图像记录
  pub fn upload_image(
    &self,
    frame: &Frame,
    article_id: u64,
    size: SizeCode,
  ) -> Option<UploadedImage> {
    info!("正在上传图像到款式 {}（尺码 {}）", article_id, size);
    match self.try_upload_image(frame, article_id, size) {
      Ok(Some(image)) => {
        info!(
          "上传成功，图像 ID: {}，路径: {}",
          image.id,
          image.image_path.as_deref().unwrap_or("-")
        );
        Some(image)
      }
      Ok(None) => {
        error!("上传响应中缺少图像记录");
        None
      }
      Err(e) => {
        error!("上传失败: {}", e);
        None
      }
    }
  }

  fn try_delete_image(&self, image_id: u64) -> Result<(), ClientError> {
    let url = self.endpoint(&format!("images/{}", image_id))?;
    let _: EmptyPayload = self.execute(self.http.delete(url).timeout(DELETE_TIMEOUT))?;
    Ok(())
  }

  pub fn delete_image(&self, image_id: u64) -> bool {
    info!("正在删除图像 {}", image_id);
    match self.try_delete_image(image_id) {
      Ok(()) => {
        info!("图像 {} 已删除", image_id);
        true
      }
      Err(e) => {
        error!("删除图像 {} 失败: {}", image_id, e);
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base: &str) -> ApiClient {
    let mut config = ClientConfig::new(Url::parse(base).unwrap(), "key");
    config.use_system_proxy = false;
    ApiClient::new(config).unwrap()
  }

  #[test]
  fn endpoints_keep_base_path() {
    let api = client("http://example.test/qc");
    assert_eq!(
      api.endpoint("ping").unwrap().as_str(),
      "http://example.test/qc/api/camera/ping"
    );
    assert_eq!(
      api.page_url("/article-registration").unwrap().as_str(),
      "http://example.test/qc/article-registration"
    );
  }

  #[test]
  fn envelope_flattens_payload() {
    let envelope: Envelope<PingPayload> = serde_json::from_str(
      r#"{"success": true, "authenticated": true, "server_time": "2026-03-01 12:00:00"}"#,
    )
    .unwrap();
    assert!(envelope.success);
    assert!(envelope.payload.authenticated);
    assert!(envelope.message.is_none());

    let envelope: Envelope<EmptyPayload> =
      serde_json::from_str(r#"{"success": false, "message": "not found"}"#).unwrap();
    assert!(!envelope.success);
    assert_eq!(envelope.message.as_deref(), Some("not found"));
  }
}
