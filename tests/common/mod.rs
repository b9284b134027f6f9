// 该文件是 Paizhao （拍照） 项目的一部分。
// tests/common/mod.rs - 集成测试公共工具
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

#![allow(dead_code)]

use std::{
  collections::VecDeque,
  io::{BufRead, BufReader, Read, Write},
  net::{TcpListener, TcpStream},
  sync::{Arc, Mutex},
  thread,
  time::Duration,
};

use image::RgbImage;
use paizhao::{
  frame::Frame,
  preview::{DisplayMode, PreviewError, PreviewKey, PreviewSurface},
  source::{FrameSource, SourceError, SourceKind},
};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: String,
  pub path: String,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl RecordedRequest {
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  pub fn body_contains(&self, needle: &str) -> bool {
    self
      .body
      .windows(needle.len())
      .any(|window| window == needle.as_bytes())
  }
}

struct Route {
  method: String,
  path: String,
  status: u16,
  body: String,
}

/// 单线程的 JSON 模拟服务，按方法与路径返回预设响应
pub struct MockServer {
  base_url: String,
  requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
  pub fn start(routes: Vec<(&str, &str, u16, &str)>) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    let routes: Vec<Route> = routes
      .into_iter()
      .map(|(method, path, status, body)| Route {
        method: method.to_string(),
        path: path.to_string(),
        status,
        body: body.to_string(),
      })
      .collect();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    thread::spawn(move || {
      for stream in listener.incoming() {
        let Ok(stream) = stream else { continue };
        if let Err(e) = handle(stream, &routes, &recorded) {
          eprintln!("mock server: {}", e);
        }
      }
    });

    Self {
      base_url: format!("http://{}", addr),
      requests,
    }
  }

  pub fn base_url(&self) -> url::Url {
    url::Url::parse(&self.base_url).expect("mock server url")
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().expect("requests lock").clone()
  }
}

fn handle(
  stream: TcpStream,
  routes: &[Route],
  recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
  stream.set_read_timeout(Some(Duration::from_secs(5)))?;
  let mut reader = BufReader::new(stream.try_clone()?);

  let mut line = String::new();
  reader.read_line(&mut line)?;
  let mut parts = line.split_whitespace();
  let method = parts.next().unwrap_or_default().to_string();
  let path = parts.next().unwrap_or_default().to_string();

  let mut headers = Vec::new();
  loop {
    let mut header = String::new();
    reader.read_line(&mut header)?;
    let header = header.trim_end();
    if header.is_empty() {
      break;
    }
    if let Some((k, v)) = header.split_once(':') {
      headers.push((k.trim().to_string(), v.trim().to_string()));
    }
  }

  let find = |name: &str| {
    headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.clone())
  };
  let body = if let Some(length) = find("content-length") {
    let mut body = vec![0; length.parse().unwrap_or(0)];
    reader.read_exact(&mut body)?;
    body
  } else if find("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
    read_chunked(&mut reader)?
  } else {
    Vec::new()
  };

  recorded.lock().expect("requests lock").push(RecordedRequest {
    method: method.clone(),
    path: path.clone(),
    headers,
    body,
  });

  let (status, body) = routes
    .iter()
    .find(|r| r.method == method && r.path == path)
    .map(|r| (r.status, r.body.clone()))
    .unwrap_or((404, r#"{"success": false, "message": "not found"}"#.to_string()));

  let mut stream = stream;
  write!(
    stream,
    "HTTP/1.1 {} MOCK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
    status,
    body.len(),
    body
  )?;
  stream.flush()
}

fn read_chunked(reader: &mut impl BufRead) -> std::io::Result<Vec<u8>> {
  let mut body = Vec::new();
  loop {
    let mut size = String::new();
    reader.read_line(&mut size)?;
    let size = usize::from_str_radix(size.trim().split(';').next().unwrap_or("0"), 16).unwrap_or(0);
    if size == 0 {
      let mut trailer = String::new();
      reader.read_line(&mut trailer)?;
      return Ok(body);
    }
    let mut chunk = vec![0; size + 2];
    reader.read_exact(&mut chunk)?;
    chunk.truncate(size);
    body.extend_from_slice(&chunk);
  }
}

/// 按脚本返回结果的输入源
pub struct ScriptedSource {
  kind: SourceKind,
  open_result: Option<SourceError>,
  frames: VecDeque<Option<Frame>>,
  /// 脚本用完后是否持续返回最后一帧
  repeat_last: Option<Frame>,
  size: Option<(u32, u32)>,
  pub log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSource {
  pub fn new(kind: SourceKind, log: Arc<Mutex<Vec<String>>>) -> Self {
    Self {
      kind,
      open_result: None,
      frames: VecDeque::new(),
      repeat_last: None,
      size: None,
      log,
    }
  }

  pub fn failing_open(mut self, error: SourceError) -> Self {
    self.open_result = Some(error);
    self
  }

  pub fn with_frames(mut self, frames: Vec<Option<Frame>>) -> Self {
    self.frames = frames.into();
    self
  }

  pub fn repeating(mut self, frame: Frame) -> Self {
    self.repeat_last = Some(frame);
    self
  }

  fn record(&self, event: &str) {
    self
      .log
      .lock()
      .expect("log lock")
      .push(format!("{:?}:{}", self.kind, event));
  }
}

impl FrameSource for ScriptedSource {
  fn kind(&self) -> SourceKind {
    self.kind
  }

  fn open(&mut self) -> Result<(), SourceError> {
    self.record("open");
    match self.open_result.take() {
      Some(e) => Err(e),
      None => {
        self.size = Some((4, 3));
        Ok(())
      }
    }
  }

  fn grab(&mut self, _timeout: Duration) -> Option<Frame> {
    match self.frames.pop_front() {
      Some(frame) => frame,
      None => self.repeat_last.clone(),
    }
  }

  fn close(&mut self) {
    self.record("close");
    self.size = None;
  }

  fn resolution(&self) -> Option<(u32, u32)> {
    self.size
  }
}

/// 按脚本产生按键并记录显示内容的预览面
pub struct ScriptedSurface {
  keys: VecDeque<Option<PreviewKey>>,
  pub shown: Vec<(u32, u32)>,
  pub modes: Vec<DisplayMode>,
  pub fail_mode_switch: bool,
}

impl ScriptedSurface {
  pub fn new(keys: Vec<Option<PreviewKey>>) -> Self {
    Self {
      keys: keys.into(),
      shown: Vec::new(),
      modes: Vec::new(),
      fail_mode_switch: false,
    }
  }
}

impl PreviewSurface for ScriptedSurface {
  fn show(&mut self, image: &RgbImage) -> Result<(), PreviewError> {
    self.shown.push(image.dimensions());
    Ok(())
  }

  fn poll_key(&mut self, _timeout: Duration) -> Option<PreviewKey> {
    // 脚本结束后取消，保证循环终止
    self.keys.pop_front().unwrap_or(Some(PreviewKey::Cancel))
  }

  fn set_mode(&mut self, mode: DisplayMode) -> Result<(), PreviewError> {
    if self.fail_mode_switch {
      return Err(PreviewError::InvalidSize(0, 0));
    }
    self.modes.push(mode);
    Ok(())
  }
}
