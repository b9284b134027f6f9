// 该文件是 Paizhao （拍照） 项目的一部分。
// src/bin/capture_upload.rs - 拍摄并上传到质检服务
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use paizhao::{
  client::ApiClient,
  config::{CameraArgs, PreviewArgs, ServerArgs},
  draw::Overlay,
  menu::Menu,
  preview::install_interrupt_handler,
  source::FrameSource,
};

/// 拍摄产品图像并上传到质检服务
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub server: ServerArgs,
  #[command(flatten)]
  pub camera: CameraArgs,
  #[command(flatten)]
  pub preview: PreviewArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  println!("{}", "=".repeat(60));
  println!("     Paizhao 拍摄上传");
  println!("{}", "=".repeat(60));

  info!("服务地址: {}", args.server.base_url);
  let client = ApiClient::new(args.server.client_config()).context("无法创建 HTTP 客户端")?;

  let status = client.ping();
  if !status.authenticated {
    println!();
    println!("无法连接 API，请检查:");
    println!("   1. 服务端是否正在运行？");
    println!("   2. 服务地址 ({}) 是否正确？", client.base_url());
    println!("   3. API Key 是否有效？");
    bail!("API 连接检查失败");
  }

  let overlay = Overlay::load(args.camera.font.as_deref()).context("无法加载字体")?;
  let interrupt = install_interrupt_handler().context("无法注册 Ctrl-C 处理")?;

  let mut source = args
    .camera
    .select_source(&overlay)
    .context("输入源参数无效")?;
  info!("当前输入源: {}", source.describe());

  let options = args.preview.capture_options(&args.camera);
  let result = Menu::new(&client, &mut source, options, overlay)
    .with_interrupt(interrupt)
    .run();

  source.close();
  info!("输入源已关闭");

  result.context("菜单运行失败")
}
