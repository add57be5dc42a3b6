// 该文件是 Jianban （鉴板） 项目的一部分。
// src/bin/simple_oneshot.rs - 单次检测
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use jianban::{
  FromUrl,
  input::ImagePairInput,
  model::ClassifierWrapper,
  output::{OutputWrapper, draw::Draw},
  pipeline::InspectConfig,
  task::{OneShotTask, Task},
};
use tracing::info;

/// Jianban 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类模型路径，例如 rknn:///opt/models/inceptionv3.rknn
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 测试图像，例如 image:///data/test.jpg
  #[arg(long, value_name = "TEST")]
  pub test: Url,
  /// 模板图像
  #[arg(long, value_name = "TEMPLATE")]
  pub template: Url,
  /// 输出路径（image:///out/result.png 或 folder:///out/records）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 标注文字使用的字体文件
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
  /// ROI 外扩像素数
  #[arg(long, default_value_t = 20, value_name = "PIXELS")]
  pub offset: i32,
  /// 差异可视化阈值 (0 - 255)
  #[arg(long, default_value_t = 30, value_name = "THRESHOLD")]
  pub diff_threshold: u8,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("测试图像: {}", args.test);
  info!("模板图像: {}", args.template);
  info!("输出路径: {}", args.output);

  let config = InspectConfig::default()
    .roi_offset(args.offset)
    .diff_threshold(args.diff_threshold);

  let input = ImagePairInput::from_urls(&args.test, &args.template)?;
  let model = ClassifierWrapper::from_url(&args.model)?;
  let mut output = OutputWrapper::from_url(&args.output)?;
  if let Some(font) = &args.font {
    output = output.with_draw(Draw::default().with_font_file(font)?);
  }

  OneShotTask::default()
    .with_config(config)
    .run_task(input, model, output)?;

  Ok(())
}
