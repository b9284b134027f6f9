// 该文件是 Paizhao （拍照） 项目的一部分。
// src/menu.rs - 控制台菜单
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

use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  capture::{CaptureOptions, CaptureOutcome, run_capture},
  client::{ApiClient, Article, ArticleImages, SizeCode, UploadedImage},
  draw::Overlay,
  frame::Frame,
  preview::{Interrupt, PreviewError, WindowSurface},
  source::FrameSource,
};

const DESCRIPTION_LIMIT: usize = 40;
const CREATED_AT_LIMIT: usize = 19;
const PREVIEW_TITLE: &str = "Paizhao Capture";
const REGISTRATION_PAGE: &str = "article-registration";

#[derive(Error, Debug)]
pub enum MenuError {
  #[error("终端交互失败: {0}")]
  Prompt(#[from] dialoguer::Error),
  #[error("{0}")]
  Preview(#[from] PreviewError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
  #[error("请输入有效的编号")]
  NotANumber(String),
  #[error("无效的选择: {index}（可选 1-{count}）")]
  OutOfRange { index: usize, count: usize },
  #[error("格式错误，请使用 v1、v2 等")]
  BadViewFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleChoice {
  Quit,
  /// 从 0 开始的序号
  Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCommand {
  Back,
  View(usize),
  Delete(usize),
}

fn parse_position(text: &str, count: usize) -> Result<usize, InputError> {
  let number: usize = text
    .trim()
    .parse()
    .map_err(|_| InputError::NotANumber(text.to_string()))?;
  if number == 0 || number > count {
    return Err(InputError::OutOfRange {
      index: number,
      count,
    });
  }
  Ok(number - 1)
}

/// 解析款式编号输入，`q` 表示返回
pub fn parse_article_choice(input: &str, count: usize) -> Result<ArticleChoice, InputError> {
  let input = input.trim();
  if input.eq_ignore_ascii_case("q") {
    return Ok(ArticleChoice::Quit);
  }
  parse_position(input, count).map(ArticleChoice::Index)
}

/// 解析图像列表中的命令：`b` 返回，`vN` 查看，`N` 删除
pub fn parse_image_command(input: &str, count: usize) -> Result<ImageCommand, InputError> {
  let input = input.trim().to_ascii_lowercase();
  if input == "b" {
    return Ok(ImageCommand::Back);
  }
  if let Some(rest) = input.strip_prefix('v') {
    return match parse_position(rest, count) {
      Err(InputError::NotANumber(_)) => Err(InputError::BadViewFormat(input.clone())),
      other => other.map(ImageCommand::View),
    };
  }
  parse_position(&input, count).map(ImageCommand::Delete)
}

pub fn format_article_line(article: &Article) -> String {
  let description: String = article
    .description
    .as_deref()
    .unwrap_or("No description")
    .chars()
    .take(DESCRIPTION_LIMIT)
    .collect();
  format!(
    "[{}] {} - {}",
    article.article_style.as_deref().unwrap_or("-"),
    article.brand_name.as_deref().unwrap_or("-"),
    description
  )
}

pub fn format_created_at(created_at: Option<&str>) -> String {
  match created_at {
    Some(text) => text
      .chars()
      .take(CREATED_AT_LIMIT)
      .map(|c| if c == 'T' { ' ' } else { c })
      .collect(),
    None => "Unknown".to_string(),
  }
}

pub fn format_image_line(image: &UploadedImage) -> String {
  format!(
    "[{}] {} - {}",
    image.size.as_deref().unwrap_or("-"),
    image.image_name.as_deref().unwrap_or("-"),
    format_created_at(image.created_at.as_deref())
  )
}

/// 本地图像列表，只有服务端确认删除后才移除对应条目
#[derive(Debug, Clone)]
pub struct ImageBrowser {
  article_style: Option<String>,
  images: Vec<UploadedImage>,
}

impl ImageBrowser {
  pub fn new(listing: ArticleImages) -> Self {
    Self {
      article_style: listing.article.and_then(|a| a.article_style),
      images: listing.images,
    }
  }

  pub fn article_style(&self) -> Option<&str> {
    self.article_style.as_deref()
  }

  pub fn images(&self) -> &[UploadedImage] {
    &self.images
  }

  pub fn len(&self) -> usize {
    self.images.len()
  }

  pub fn is_empty(&self) -> bool {
    self.images.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&UploadedImage> {
    self.images.get(index)
  }

  /// 调用 `delete` 删除远端图像，成功时移除本地条目
  pub fn delete_with<F>(&mut self, index: usize, delete: F) -> bool
  where
    F: FnOnce(u64) -> bool,
  {
    let Some(image) = self.images.get(index) else {
      return false;
    };
    if delete(image.id) {
      self.images.remove(index);
      true
    } else {
      false
    }
  }
}

/// 主菜单
pub struct Menu<'a, S: FrameSource + ?Sized> {
  client: &'a ApiClient,
  source: &'a mut S,
  options: CaptureOptions,
  overlay: Overlay,
  interrupt: Option<Interrupt>,
}

impl<'a, S: FrameSource + ?Sized> Menu<'a, S> {
  pub fn new(
    client: &'a ApiClient,
    source: &'a mut S,
    options: CaptureOptions,
    overlay: Overlay,
  ) -> Self {
    Self {
      client,
      source,
      options,
      overlay,
      interrupt: None,
    }
  }

  pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  fn quit_requested(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .is_some_and(Interrupt::quit_requested)
  }

  pub fn run(&mut self) -> Result<(), MenuError> {
    let items = [
      "拍摄并上传图像",
      "查看款式列表",
      "查看/删除图像",
      "测试 API 连接",
      "退出",
    ];

    loop {
      if self.quit_requested() {
        info!("收到退出请求，结束菜单");
        return Ok(());
      }

      println!();
      let choice = Select::new()
        .with_prompt("主菜单")
        .items(&items)
        .default(0)
        .interact_opt()?;

      match choice {
        Some(0) => self.capture_and_upload()?,
        Some(1) => self.show_articles(),
        Some(2) => self.browse_images()?,
        Some(3) => self.test_connection(),
        _ => {
          println!("再见！");
          return Ok(());
        }
      }
    }
  }

  fn select_article(&self) -> Result<Option<Article>, MenuError> {
    let articles = self.client.list_articles();
    if articles.is_empty() {
      println!("没有可用的款式，请先在网页端创建款式。");
      return Ok(None);
    }

    println!("{}", "=".repeat(60));
    println!("可选款式");
    println!("{}", "=".repeat(60));
    for (i, article) in articles.iter().enumerate() {
      println!("  {}. {}", i + 1, format_article_line(article));
    }
    println!("{}", "=".repeat(60));

    loop {
      let input: String = Input::new()
        .with_prompt("输入款式编号（q 返回）")
        .interact_text()?;
      match parse_article_choice(&input, articles.len()) {
        Ok(ArticleChoice::Quit) => return Ok(None),
        Ok(ArticleChoice::Index(index)) => {
          let article = articles[index].clone();
          println!(
            "已选择: {} (ID: {})",
            article.article_style.as_deref().unwrap_or("-"),
            article.id
          );
          return Ok(Some(article));
        }
        Err(e) => println!("{}", e),
      }
    }
  }

  fn select_size(&self) -> Result<Option<SizeCode>, MenuError> {
    let default = SizeCode::ALL
      .iter()
      .position(|s| *s == SizeCode::default())
      .unwrap_or(0);
    let index = Select::new()
      .with_prompt("选择尺码")
      .items(&SizeCode::ALL)
      .default(default)
      .interact_opt()?;
    Ok(index.map(|i| SizeCode::ALL[i]))
  }

  fn capture(&mut self) -> Result<Option<Frame>, MenuError> {
    println!("{}", "=".repeat(50));
    println!("拍摄模式: {}", self.source.describe());
    println!("按 SPACE/ENTER 拍摄，q 取消，F 切换全屏");
    println!("{}", "=".repeat(50));

    let mut surface = WindowSurface::open(
      PREVIEW_TITLE,
      self.options.initial_mode,
      self.options.display_size,
    )?;
    if let Some(interrupt) = self.interrupt.clone() {
      surface = surface.with_interrupt(interrupt);
    }

    match run_capture(&mut *self.source, &mut surface, &self.options, &self.overlay)? {
      CaptureOutcome::Captured(frame) => {
        println!("已拍摄: {}x{}", frame.width(), frame.height());
        Ok(Some(frame))
      }
      CaptureOutcome::Cancelled => {
        println!("拍摄已取消");
        Ok(None)
      }
    }
  }

  fn capture_and_upload(&mut self) -> Result<(), MenuError> {
    let Some(article) = self.select_article()? else {
      return Ok(());
    };
    let Some(size) = self.select_size()? else {
      return Ok(());
    };
    let Some(frame) = self.capture()? else {
      return Ok(());
    };
    if self.quit_requested() {
      return Ok(());
    }

    let confirmed = Confirm::new()
      .with_prompt("上传这张图像？")
      .default(true)
      .interact()?;
    if !confirmed {
      println!("上传已取消");
      return Ok(());
    }

    let spinner = spinner(format!("正在上传到款式 {}（尺码 {}）...", article.id, size));
    let uploaded = self.client.upload_image(&frame, article.id, size);
    spinner.finish_and_clear();

    match uploaded {
      Some(image) => {
        println!("图像上传成功！ID: {}", image.id);
        if let Some(path) = image.image_path.as_deref() {
          println!("  路径: {}", path);
        }
        match self.client.page_url(REGISTRATION_PAGE) {
          Ok(url) => println!("  查看: {}", url),
          Err(e) => warn!("无法生成页面地址: {}", e),
        }
      }
      None => println!("上传失败，详情见日志"),
    }
    Ok(())
  }

  fn show_articles(&self) {
    let articles = self.client.list_articles();
    if articles.is_empty() {
      println!("没有款式或获取失败");
      return;
    }
    println!("款式列表:");
    for article in &articles {
      println!(
        "  ID: {} | Style: {} | Brand: {}",
        article.id,
        article.article_style.as_deref().unwrap_or("-"),
        article.brand_name.as_deref().unwrap_or("-")
      );
    }
  }

  fn browse_images(&self) -> Result<(), MenuError> {
    let Some(article) = self.select_article()? else {
      return Ok(());
    };
    let Some(listing) = self.client.list_images(article.id) else {
      println!("获取图像列表失败，详情见日志");
      return Ok(());
    };
    let mut browser = ImageBrowser::new(listing);
    if browser.is_empty() {
      println!("该款式下没有图像");
      return Ok(());
    }

    loop {
      println!("{}", "=".repeat(60));
      println!("款式图像: {}", browser.article_style().unwrap_or("-"));
      println!("{}", "=".repeat(60));
      for (i, image) in browser.images().iter().enumerate() {
        println!("  {}. {}", i + 1, format_image_line(image));
        println!(
          "     ID: {} | URL: {}",
          image.id,
          image.image_url.as_deref().unwrap_or("-")
        );
      }
      println!("{}", "=".repeat(60));
      println!("  输入编号删除，v + 编号查看（如 v1），b 返回");

      let input: String = Input::new().with_prompt("选择").interact_text()?;
      match parse_image_command(&input, browser.len()) {
        Ok(ImageCommand::Back) => return Ok(()),
        Ok(ImageCommand::View(index)) => {
          if let Some(image) = browser.get(index) {
            println!("图像地址: {}", image.image_url.as_deref().unwrap_or("-"));
          }
        }
        Ok(ImageCommand::Delete(index)) => {
          let name = browser
            .get(index)
            .and_then(|image| image.image_name.clone())
            .unwrap_or_default();
          let confirmed = Confirm::new()
            .with_prompt(format!("删除图像 '{}'？", name))
            .default(false)
            .interact()?;
          if !confirmed {
            println!("已取消删除");
            continue;
          }
          if browser.delete_with(index, |id| self.client.delete_image(id)) {
            println!("图像已删除");
            if browser.is_empty() {
              println!("该款式下已没有图像");
              return Ok(());
            }
          } else {
            println!("删除失败，详情见日志");
          }
        }
        Err(e) => println!("{}", e),
      }
    }
  }

  fn test_connection(&self) {
    let status = self.client.ping();
    if status.authenticated {
      println!(
        "API 连接正常，服务器时间: {}",
        status.server_time.as_deref().unwrap_or("未知")
      );
    } else if status.reachable {
      println!("服务器可以访问，但认证失败，请检查 API Key");
    } else {
      println!("无法连接服务器");
    }
    info!("连接测试结果: {:?}", status);
  }
}

fn spinner(message: String) -> ProgressBar {
  let spinner = ProgressBar::new_spinner();
  if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
    spinner.set_style(style);
  }
  spinner.set_message(message);
  spinner.enable_steady_tick(Duration::from_millis(100));
  spinner
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::client::ArticleSummary;

  fn image(id: u64) -> UploadedImage {
    UploadedImage {
      id,
      image_path: None,
      image_url: Some(format!("http://example.test/{}.jpg", id)),
      image_name: Some(format!("img{}.jpg", id)),
      size: Some("M".to_string()),
      created_at: Some("2026-03-01T12:30:45.000000Z".to_string()),
    }
  }

  fn browser() -> ImageBrowser {
    ImageBrowser::new(ArticleImages {
      article: Some(ArticleSummary {
        id: Some(1),
        article_style: Some("AS-1".to_string()),
      }),
      images: vec![image(10), image(11)],
    })
  }

  #[test]
  fn article_choice_parsing() {
    assert_eq!(parse_article_choice("q", 3), Ok(ArticleChoice::Quit));
    assert_eq!(parse_article_choice(" 2 ", 3), Ok(ArticleChoice::Index(1)));
    assert!(matches!(
      parse_article_choice("0", 3),
      Err(InputError::OutOfRange { .. })
    ));
    assert!(matches!(
      parse_article_choice("4", 3),
      Err(InputError::OutOfRange { .. })
    ));
    assert!(matches!(
      parse_article_choice("abc", 3),
      Err(InputError::NotANumber(_))
    ));
  }

  #[test]
  fn image_command_parsing() {
    assert_eq!(parse_image_command("B", 2), Ok(ImageCommand::Back));
    assert_eq!(parse_image_command("v2", 2), Ok(ImageCommand::View(1)));
    assert_eq!(parse_image_command("1", 2), Ok(ImageCommand::Delete(0)));
    assert!(matches!(
      parse_image_command("vx", 2),
      Err(InputError::BadViewFormat(_))
    ));
    assert!(matches!(
      parse_image_command("v3", 2),
      Err(InputError::OutOfRange { .. })
    ));
  }

  #[test]
  fn lines_are_formatted_for_the_operator() {
    let article = Article {
      id: 1,
      article_style: Some("AS-1".to_string()),
      brand_name: Some("Brand".to_string()),
      description: Some("x".repeat(60)),
    };
    assert_eq!(
      format_article_line(&article),
      format!("[AS-1] Brand - {}", "x".repeat(40))
    );
    assert_eq!(
      format_image_line(&image(10)),
      "[M] img10.jpg - 2026-03-01 12:30:45"
    );
    assert_eq!(format_created_at(None), "Unknown");
  }

  #[test]
  fn failed_delete_keeps_local_entry() {
    let mut browser = browser();
    assert!(!browser.delete_with(0, |_| false));
    assert_eq!(browser.len(), 2);

    let mut seen = None;
    assert!(browser.delete_with(1, |id| {
      seen = Some(id);
      true
    }));
    assert_eq!(seen, Some(11));
    assert_eq!(browser.len(), 1);
    assert_eq!(browser.get(0).map(|i| i.id), Some(10));

    assert!(!browser.delete_with(5, |_| true));
  }
}
