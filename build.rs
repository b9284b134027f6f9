// 该文件是 Paizhao （拍照） 项目的一部分。
// build.rs - MindVision SDK 链接配置
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

use std::env;

fn main() {
  println!("cargo:rerun-if-env-changed=MVSDK_LIB_DIR");

  // 仅在启用 mindvision 特性时才需要厂商库
  if env::var_os("CARGO_FEATURE_MINDVISION").is_none() {
    return;
  }

  let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
  let lib_name = if target_os == "windows" {
    "MVCAMSDK_X64"
  } else {
    "MVSDK"
  };
  println!("cargo:rustc-link-lib=dylib={}", lib_name);

  if let Ok(dir) = env::var("MVSDK_LIB_DIR") {
    println!("cargo:rustc-link-search=native={}", dir);
    println!("cargo:warning=Using MVSDK_LIB_DIR: {}", dir);
    return;
  }

  // 厂商安装脚本的默认位置
  for dir in ["/lib", "/usr/lib", "/usr/local/lib"] {
    println!("cargo:rustc-link-search=native={}", dir);
  }
}
