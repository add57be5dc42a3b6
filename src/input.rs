// 该文件是 Jianban （鉴板） 项目的一部分。
// src/input.rs - 图像输入
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

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::FromUrl;

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("测试图像输入错误: {0}")]
  TestImage(#[source] ImageFileInputError),
  #[error("模板图像输入错误: {0}")]
  TemplateImage(#[source] ImageFileInputError),
}

/// 待检测的测试图像与模板图像
#[derive(Debug, Clone)]
pub struct ImagePair {
  pub test: RgbImage,
  pub template: RgbImage,
}

/// 只产出一对图像的输入源
pub struct ImagePairInput {
  pair: Option<ImagePair>,
}

impl ImagePairInput {
  pub fn new(pair: ImagePair) -> Self {
    Self { pair: Some(pair) }
  }

  pub fn from_urls(test: &Url, template: &Url) -> Result<Self, InputError> {
    info!("测试图像: {}", test);
    let test = ImageFileInput::from_url(test)
      .map_err(InputError::TestImage)?
      .into_image();
    info!("模板图像: {}", template);
    let template = ImageFileInput::from_url(template)
      .map_err(InputError::TemplateImage)?
      .into_image();
    Ok(Self::new(ImagePair { test, template }))
  }
}

impl Iterator for ImagePairInput {
  type Item = ImagePair;

  fn next(&mut self) -> Option<Self::Item> {
    self.pair.take()
  }
}
