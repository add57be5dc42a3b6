// 该文件是 Jianban （鉴板） 项目的一部分。
// src/pipeline/region.rs - 变化区域提取与 ROI 分类
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

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::map::map_pixels2;
use imageproc::morphology::{close, open};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  frame::ClassifierFrame,
  model::{ClassScores, DefectKind, Model},
  pipeline::{
    BoundingBox, DefectRecord, InspectConfig,
    color::{rgb_to_hsv, to_luma},
  },
};

pub const MARKER_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 单个 ROI 的处理错误，只丢弃该 ROI
#[derive(Error, Debug)]
pub enum RoiError {
  #[error("ROI {0:?} 与图像范围无交集")]
  EmptyCrop(BoundingBox),
  #[error("分类器推理失败: {0}")]
  Classifier(BoxedError),
  #[error("分类器输出无效: 得分数量 {0}")]
  InvalidScores(usize),
}

/// 逐通道按位异或，两幅图像尺寸必须一致
pub fn bitwise_xor(a: &RgbImage, b: &RgbImage) -> RgbImage {
  map_pixels2(a, b, |Rgb(pa): Rgb<u8>, Rgb(pb): Rgb<u8>| {
    Rgb([pa[0] ^ pb[0], pa[1] ^ pb[1], pa[2] ^ pb[2]])
  })
}

/// Otsu 反向二值化：灰度不大于阈值的像素（未变化区域）为 255
pub fn otsu_inverted(gray: &GrayImage) -> GrayImage {
  let level = otsu_level(gray);
  debug!("Otsu 阈值: {}", level);
  threshold(gray, level, ThresholdType::BinaryInverted)
}

/// 最外层轮廓。掩码四周先补一圈背景，保证贴边区域也按外边界报告，坐标已移回原图。
fn outer_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
  let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
  image::imageops::replace(&mut padded, mask, 1, 1);

  let mut contours = find_contours::<i32>(&padded);
  let total = contours.len();
  contours.retain(|c| c.border_type == BorderType::Outer && c.parent.is_none());
  for contour in &mut contours {
    for point in &mut contour.points {
      point.x -= 1;
      point.y -= 1;
    }
  }
  debug!("轮廓数量: {}, 最外层: {}", total, contours.len());
  contours
}

fn in_range(hsv: [u8; 3], low: [u8; 3], high: [u8; 3]) -> bool {
  (0..3).all(|c| low[c] <= hsv[c] && hsv[c] <= high[c])
}

/// 轮廓的外接矩形，右下角不包含
fn bounding_rect(contour: &Contour<i32>) -> Option<BoundingBox> {
  let first = contour.points.first()?;
  let init = (first.x, first.y, first.x, first.y);
  let (x_min, y_min, x_max, y_max) = contour.points.iter().fold(init, |(x0, y0, x1, y1), p| {
    (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y))
  });
  Some(BoundingBox::new(x_min, y_min, x_max + 1, y_max + 1))
}

pub struct RegionExtractor {
  config: InspectConfig,
}

impl RegionExtractor {
  pub fn new(config: InspectConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &InspectConfig {
    &self.config
  }

  /// 变化区域掩码（255 为变化）。两幅图像尺寸必须一致。
  ///
  /// 先由 Otsu 阈值得到未变化区域，把其余像素涂成标记绿色，再在 HSV 空间里把绿色取回来。
  /// 测试图像中本身落在该色相范围内的像素也会被取出。
  pub fn change_mask(&self, test: &RgbImage, template: &RgbImage) -> GrayImage {
    let difference = bitwise_xor(test, template);
    let gray = to_luma(&difference);
    let unchanged = otsu_inverted(&gray);

    let mut marked = test.clone();
    for (x, y, pixel) in marked.enumerate_pixels_mut() {
      if unchanged.get_pixel(x, y).0[0] != 255 {
        *pixel = MARKER_COLOR;
      }
    }

    let (low, high) = (self.config.marker_hsv_low, self.config.marker_hsv_high);
    let mask = GrayImage::from_fn(marked.width(), marked.height(), |x, y| {
      if in_range(rgb_to_hsv(*marked.get_pixel(x, y)), low, high) {
        Luma([255])
      } else {
        Luma([0])
      }
    });

    let k = self.config.morph_radius;
    if k == 0 {
      return mask;
    }
    let opening = open(&mask, Norm::LInf, k);
    close(&opening, Norm::LInf, k)
  }

  /// 候选区域：最外层轮廓的外接矩形，已外扩 `roi_offset`
  pub fn extract_regions(&self, test: &RgbImage, template: &RgbImage) -> Vec<BoundingBox> {
    let mask = self.change_mask(test, template);
    let regions: Vec<BoundingBox> = outer_contours(&mask)
      .iter()
      .filter_map(bounding_rect)
      .map(|bbox| bbox.pad(self.config.roi_offset))
      .collect();
    debug!("候选区域: {}", regions.len());
    regions
  }

  /// 裁剪、缩放并分类单个区域
  pub fn classify_region<M>(
    &self,
    test: &RgbImage,
    region: BoundingBox,
    model: &M,
  ) -> Result<DefectRecord, RoiError>
  where
    M: Model<Input = ClassifierFrame, Output = ClassScores>,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    let bbox = region
      .clamp_to(test.width(), test.height())
      .ok_or(RoiError::EmptyCrop(region))?;
    let roi = image::imageops::crop_imm(
      test,
      bbox.x1 as u32,
      bbox.y1 as u32,
      bbox.width() as u32,
      bbox.height() as u32,
    )
    .to_image();
    let frame = ClassifierFrame::from_rgb_image(&roi);

    let scores = model
      .infer(&frame)
      .map_err(|e| RoiError::Classifier(Box::new(e)))?;
    if scores.scores.len() != DefectKind::COUNT {
      return Err(RoiError::InvalidScores(scores.scores.len()));
    }
    let kind = scores
      .argmax()
      .and_then(DefectKind::from_index)
      .ok_or(RoiError::InvalidScores(scores.scores.len()))?;

    Ok(DefectRecord { bbox, kind })
  }

  /// 逐个分类候选区域，失败的区域记录日志后跳过
  pub fn classify_regions<M>(
    &self,
    test: &RgbImage,
    regions: &[BoundingBox],
    model: &M,
  ) -> Vec<DefectRecord>
  where
    M: Model<Input = ClassifierFrame, Output = ClassScores>,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    let mut records = Vec::with_capacity(regions.len());
    for region in regions {
      match self.classify_region(test, *region, model) {
        Ok(record) => {
          debug!("区域 {:?}: {}", record.bbox, record.kind);
          records.push(record);
        }
        Err(e) => warn!("处理 ROI 出错: {}", e),
      }
    }
    records
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn otsu_separates_changes() {
    let mut gray = GrayImage::new(10, 10);
    gray.put_pixel(3, 3, Luma([255]));
    let mask = otsu_inverted(&gray);
    assert_eq!(mask.get_pixel(3, 3).0[0], 0);
    assert_eq!(mask.get_pixel(0, 0).0[0], 255);
  }

  fn square_at(x0: u32, y0: u32) -> (RgbImage, RgbImage) {
    let template = RgbImage::new(100, 100);
    let mut test = template.clone();
    for y in y0..y0 + 20 {
      for x in x0..x0 + 20 {
        test.put_pixel(x, y, Rgb([255, 255, 255]));
      }
    }
    (test, template)
  }

  fn square_pair() -> (RgbImage, RgbImage) {
    square_at(40, 40)
  }

  #[test]
  fn mask_covers_changed_square() {
    let (test, template) = square_pair();
    let mask = RegionExtractor::new(InspectConfig::default()).change_mask(&test, &template);
    assert_eq!(mask.get_pixel(50, 50).0[0], 255);
    assert_eq!(mask.get_pixel(40, 40).0[0], 255);
    assert_eq!(mask.get_pixel(10, 10).0[0], 0);
    let changed = mask.pixels().filter(|p| p.0[0] == 255).count();
    assert_eq!(changed, 400);
  }

  #[test]
  fn morphology_removes_speckles() {
    let template = RgbImage::new(50, 50);
    let mut test = template.clone();
    test.put_pixel(25, 25, Rgb([255, 255, 255]));
    let extractor = RegionExtractor::new(InspectConfig::default());
    assert!(extractor.extract_regions(&test, &template).is_empty());
  }

  #[test]
  fn single_square_gives_one_padded_region() {
    let (test, template) = square_pair();
    let regions = RegionExtractor::new(InspectConfig::default()).extract_regions(&test, &template);
    assert_eq!(regions, vec![BoundingBox::new(20, 20, 80, 80)]);
  }

  #[test]
  fn squares_touching_the_left_edge_are_found() {
    let extractor = RegionExtractor::new(InspectConfig::default());

    let (test, template) = square_at(0, 0);
    assert_eq!(
      extractor.extract_regions(&test, &template),
      vec![BoundingBox::new(-20, -20, 40, 40)]
    );

    let (test, template) = square_at(0, 40);
    assert_eq!(
      extractor.extract_regions(&test, &template),
      vec![BoundingBox::new(-20, 20, 40, 80)]
    );

    // 闭运算会把离边一像素的区域连到边上
    let (test, template) = square_at(1, 1);
    let regions = extractor.extract_regions(&test, &template);
    assert_eq!(regions.len(), 1);
    let r = regions[0];
    assert!(r.x1 <= -19 && r.y1 <= -19 && r.x2 >= 41 && r.y2 >= 41, "{:?}", r);
  }

  #[test]
  fn squares_touching_other_edges_are_found() {
    let extractor = RegionExtractor::new(InspectConfig::default());
    let (test, template) = square_at(80, 0);
    assert_eq!(
      extractor.extract_regions(&test, &template),
      vec![BoundingBox::new(60, -20, 120, 40)]
    );
    let (test, template) = square_at(40, 80);
    assert_eq!(
      extractor.extract_regions(&test, &template),
      vec![BoundingBox::new(20, 60, 80, 120)]
    );
  }

  #[test]
  fn identical_images_give_no_regions() {
    let (test, _) = square_pair();
    let regions = RegionExtractor::new(InspectConfig::default()).extract_regions(&test, &test);
    assert!(regions.is_empty());
  }
}
