// 该文件是 Jianban （鉴板） 项目的一部分。
// src/pipeline.rs - 模板比对与缺陷定位流程
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

use crate::model::DefectKind;

pub mod color;
pub mod difference;
pub mod inspect;
pub mod region;
pub mod resize;
pub mod similarity;

pub use self::difference::visualize_differences;
pub use self::inspect::{Inspection, InspectError, Inspector};
pub use self::region::{RegionExtractor, RoiError};
pub use self::resize::{resize_exact, resize_with_aspect_ratio};
pub use self::similarity::{Grade, SimilarityResult, assign_grade, calculate_similarity};

const DEFAULT_ROI_OFFSET: i32 = 20;
const DEFAULT_DIFF_THRESHOLD: u8 = 30;
const DEFAULT_MORPH_RADIUS: u8 = 1;
const DEFAULT_MARKER_HSV_LOW: [u8; 3] = [36, 0, 0];
const DEFAULT_MARKER_HSV_HIGH: [u8; 3] = [70, 255, 255];

/// 检测流程参数
#[derive(Debug, Clone, PartialEq)]
pub struct InspectConfig {
  /// ROI 四周外扩的像素数
  pub roi_offset: i32,
  /// 差异可视化的灰度阈值
  pub diff_threshold: u8,
  /// 开/闭运算结构元素半径，1 即 3x3
  pub morph_radius: u8,
  /// 标记色 HSV 下界
  pub marker_hsv_low: [u8; 3],
  /// 标记色 HSV 上界
  pub marker_hsv_high: [u8; 3],
}

impl Default for InspectConfig {
  fn default() -> Self {
    Self {
      roi_offset: DEFAULT_ROI_OFFSET,
      diff_threshold: DEFAULT_DIFF_THRESHOLD,
      morph_radius: DEFAULT_MORPH_RADIUS,
      marker_hsv_low: DEFAULT_MARKER_HSV_LOW,
      marker_hsv_high: DEFAULT_MARKER_HSV_HIGH,
    }
  }
}

impl InspectConfig {
  pub fn roi_offset(mut self, offset: i32) -> Self {
    self.roi_offset = offset;
    self
  }

  pub fn diff_threshold(mut self, threshold: u8) -> Self {
    self.diff_threshold = threshold;
    self
  }

  pub fn morph_radius(mut self, radius: u8) -> Self {
    self.morph_radius = radius;
    self
  }

  pub fn marker_hsv_range(mut self, low: [u8; 3], high: [u8; 3]) -> Self {
    self.marker_hsv_low = low;
    self.marker_hsv_high = high;
    self
  }
}

/// 矩形区域 [x1, x2) x [y1, y2)，外扩后可能超出图像
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoundingBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl BoundingBox {
  pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  pub fn is_valid(&self) -> bool {
    self.x1 < self.x2 && self.y1 < self.y2
  }

  pub fn width(&self) -> i32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> i32 {
    self.y2 - self.y1
  }

  pub fn pad(&self, offset: i32) -> Self {
    Self {
      x1: self.x1 - offset,
      y1: self.y1 - offset,
      x2: self.x2 + offset,
      y2: self.y2 + offset,
    }
  }

  /// 与图像范围求交，交集为空时返回 None
  pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
    let (w, h) = (width.min(i32::MAX as u32) as i32, height.min(i32::MAX as u32) as i32);
    let clamped = Self {
      x1: self.x1.clamp(0, w),
      y1: self.y1.clamp(0, h),
      x2: self.x2.clamp(0, w),
      y2: self.y2.clamp(0, h),
    };
    clamped.is_valid().then_some(clamped)
  }
}

/// 一条缺陷记录，分类后创建，之后不再修改
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefectRecord {
  pub bbox: BoundingBox,
  pub kind: DefectKind,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clamp_keeps_inside_boxes() {
    let bbox = BoundingBox::new(20, 20, 80, 80);
    assert_eq!(bbox.clamp_to(100, 100), Some(bbox));
  }

  #[test]
  fn clamp_cuts_padding() {
    let bbox = BoundingBox::new(-15, 5, 40, 130);
    assert_eq!(
      bbox.clamp_to(100, 100),
      Some(BoundingBox::new(0, 5, 40, 100))
    );
  }

  #[test]
  fn clamp_rejects_disjoint_boxes() {
    assert_eq!(BoundingBox::new(120, 0, 150, 10).clamp_to(100, 100), None);
    assert_eq!(BoundingBox::new(-30, -30, 0, 0).clamp_to(100, 100), None);
    assert_eq!(BoundingBox::new(10, 10, 10, 20).clamp_to(100, 100), None);
  }

  #[test]
  fn pad_expands_all_sides() {
    let bbox = BoundingBox::new(40, 40, 60, 60).pad(20);
    assert_eq!(bbox, BoundingBox::new(20, 20, 80, 80));
    assert_eq!((bbox.width(), bbox.height()), (60, 60));
  }
}
