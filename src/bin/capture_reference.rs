// 该文件是 Paizhao （拍照） 项目的一部分。
// src/bin/capture_reference.rs - 拍摄参考图像并保存到本地
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  path::PathBuf,
  time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use paizhao::{
  capture::{CaptureOptions, CaptureOutcome, run_capture, show_confirmation},
  config::{CameraArgs, PreviewArgs},
  draw::Overlay,
  preview::{Interrupt, WindowSurface, install_interrupt_handler},
  reference::save_reference,
  source::FrameSource,
};

const CONFIRMATION_HOLD: Duration = Duration::from_secs(2);

/// 拍摄一张原始分辨率的参考图像
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub camera: CameraArgs,
  #[command(flatten)]
  pub preview: PreviewArgs,

  /// 保存目录
  #[arg(long, default_value = ".", value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 文件名前缀
  #[arg(long, value_name = "LABEL")]
  pub label: Option<String>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let overlay = Overlay::load(args.camera.font.as_deref()).context("无法加载字体")?;
  let interrupt = install_interrupt_handler().context("无法注册 Ctrl-C 处理")?;

  let mut source = args
    .camera
    .select_source(&overlay)
    .context("输入源参数无效")?;
  println!("输入源: {}", source.describe());
  println!("按 SPACE/ENTER 拍摄，q 取消，F 切换全屏");

  let options = args.preview.capture_options(&args.camera);
  let result = capture_and_save(&args, &mut source, &options, &overlay, interrupt);

  source.close();
  info!("输入源已关闭");
  result
}

fn capture_and_save(
  args: &Args,
  source: &mut dyn FrameSource,
  options: &CaptureOptions,
  overlay: &Overlay,
  interrupt: Interrupt,
) -> Result<()> {
  let mut surface = WindowSurface::open(
    "Paizhao Reference",
    options.initial_mode,
    options.display_size,
  )
  .context("无法打开预览窗口")?
  .with_interrupt(interrupt.clone());

  match run_capture(source, &mut surface, options, overlay)? {
    CaptureOutcome::Captured(frame) => {
      show_confirmation(&mut surface, &frame, options, overlay, CONFIRMATION_HOLD)?;
      drop(surface);

      if interrupt.quit_requested() {
        println!("收到退出请求，未保存");
        return Ok(());
      }

      let path = save_reference(&frame, &args.output_dir, args.label.as_deref())
        .context("保存参考图像失败")?;
      println!("已保存: {}", path.display());
      println!("分辨率: {}x{}", frame.width(), frame.height());
    }
    CaptureOutcome::Cancelled => println!("拍摄已取消"),
  }
  Ok(())
}
