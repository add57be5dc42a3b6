// 该文件是 Jianban （鉴板） 项目的一部分。
// src/pipeline/inspect.rs - 检测流程编排
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

use std::path::Path;
use std::time::Instant;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::ClassifierFrame,
  input::{ImageFileInput, ImageFileInputError},
  model::{ClassScores, Model},
  pipeline::{
    DefectRecord, InspectConfig,
    difference::visualize_differences,
    region::RegionExtractor,
    resize::{resize_exact, resize_with_aspect_ratio},
    similarity::{SimilarityResult, calculate_similarity},
  },
};

#[derive(Error, Debug)]
pub enum InspectError {
  #[error("测试图像加载失败: {0}")]
  TestImage(#[source] ImageFileInputError),
  #[error("模板图像加载失败: {0}")]
  TemplateImage(#[source] ImageFileInputError),
}

/// 一次检测的结果
#[derive(Debug, Clone)]
pub struct Inspection {
  /// 缺陷记录，按轮廓发现顺序
  pub defects: Vec<DefectRecord>,
  pub similarity: SimilarityResult,
  /// 差异高亮图
  pub highlighted: RgbImage,
  /// 尺寸归一化后的测试图像，缺陷坐标以此为准
  pub inspected: RgbImage,
}

/// 将一对图像归一化到相同尺寸
///
/// 尺寸不同时两者都按各自最大的宽、高做保持宽高比缩放；若仍不一致，模板再直接缩放到测试图像的尺寸。
pub fn normalize_pair(test: &RgbImage, template: &RgbImage) -> (RgbImage, RgbImage) {
  if test.dimensions() == template.dimensions() {
    return (test.clone(), template.clone());
  }

  let target = (
    test.width().max(template.width()),
    test.height().max(template.height()),
  );
  let test = resize_with_aspect_ratio(test, target);
  let mut template = resize_with_aspect_ratio(template, target);
  if template.dimensions() != test.dimensions() {
    debug!(
      "归一化后尺寸仍不一致: 模板 {:?} -> {:?}",
      template.dimensions(),
      test.dimensions()
    );
    template = resize_exact(&template, test.width(), test.height());
  }
  (test, template)
}

pub struct Inspector<M> {
  model: M,
  extractor: RegionExtractor,
}

impl<M> Inspector<M>
where
  M: Model<Input = ClassifierFrame, Output = ClassScores>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(model: M, config: InspectConfig) -> Self {
    Self {
      model,
      extractor: RegionExtractor::new(config),
    }
  }

  pub fn config(&self) -> &InspectConfig {
    self.extractor.config()
  }

  /// 从文件加载并检测，任一图像加载失败即返回错误
  pub fn inspect_files(
    &self,
    test_path: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
  ) -> Result<Inspection, InspectError> {
    let test = ImageFileInput::open(test_path)
      .map_err(InspectError::TestImage)?
      .into_image();
    let template = ImageFileInput::open(template_path)
      .map_err(InspectError::TemplateImage)?
      .into_image();
    Ok(self.inspect_images(&test, &template))
  }

  pub fn inspect_images(&self, test: &RgbImage, template: &RgbImage) -> Inspection {
    let now = Instant::now();
    let (norm_test, norm_template) = normalize_pair(test, template);
    debug!(
      "尺寸归一化: 测试 {:?}, 模板 {:?} -> {:?}",
      test.dimensions(),
      template.dimensions(),
      norm_test.dimensions()
    );

    // 相似度与差异图使用原始尺寸的图像
    let similarity = calculate_similarity(template, test);
    let highlighted = visualize_differences(test, template, self.config().diff_threshold);

    let regions = self.extractor.extract_regions(&norm_test, &norm_template);
    let defects = self
      .extractor
      .classify_regions(&norm_test, &regions, &self.model);

    info!(
      "检测完成，耗时: {:.2?}，相似度: {:.2}% ({})，候选区域: {}，缺陷: {}",
      now.elapsed(),
      similarity.percentage,
      similarity.grade,
      regions.len(),
      defects.len()
    );

    Inspection {
      defects,
      similarity,
      highlighted,
      inspected: norm_test,
    }
  }
}
