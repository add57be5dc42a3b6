// 该文件是 Jianban （鉴板） 项目的一部分。
// src/output/draw.rs - 缺陷检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::debug;

use crate::{
  model::DefectKind,
  output::record::DefectCounts,
  pipeline::DefectRecord,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 24.0;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: [u8; 3] = [10, 255, 36]; // 绿色
const LABEL_COLOR: [u8; 3] = [100, 40, 180]; // 紫色

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 标注结果：全部缺陷一张图，每个类别一张图
#[derive(Debug, Clone)]
pub struct Annotated {
  pub all: RgbImage,
  pub per_kind: Vec<(DefectKind, RgbImage)>,
  pub counts: DefectCounts,
}

#[derive(Clone)]
pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  box_color: [u8; 3],
  label_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      box_color: BOX_COLOR,
      label_color: LABEL_COLOR,
    }
  }
}

impl Draw {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  /// 加载 TTF/OTF 字体，用于绘制类别文字；没有字体时只画边框
  pub fn with_font_file(self, path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontArc::try_from_vec(data)?;
    debug!("加载字体: {}", path.as_ref().display());
    Ok(self.with_font(font))
  }

  pub fn font_size(mut self, size: f32) -> Self {
    self.font_size = size;
    self
  }

  fn draw_defect(&self, image: &mut RgbImage, defect: &DefectRecord) {
    let bbox = match defect.bbox.clamp_to(image.width(), image.height()) {
      Some(bbox) => bbox,
      None => return,
    };

    // 绘制边框（加粗为2像素）
    for t in 0..BOX_THICKNESS {
      let w = bbox.width() - 2 * t;
      let h = bbox.height() - 2 * t;
      if w <= 0 || h <= 0 {
        break;
      }
      let rect = Rect::at(bbox.x1 + t, bbox.y1 + t).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
    }

    if let Some(font) = &self.font {
      let text_y = (bbox.y1 - self.font_size as i32).max(0);
      draw_text_mut(
        image,
        Rgb(self.label_color),
        bbox.x1,
        text_y,
        PxScale::from(self.font_size),
        font,
        defect.kind.name(),
      );
    }
  }

  pub fn annotate(&self, image: &RgbImage, defects: &[DefectRecord]) -> Annotated {
    let mut all = image.clone();
    let mut per_kind: Vec<(DefectKind, RgbImage)> =
      DefectKind::ALL.iter().map(|k| (*k, image.clone())).collect();

    for defect in defects {
      self.draw_defect(&mut all, defect);
      self.draw_defect(&mut per_kind[defect.kind.index()].1, defect);
    }

    Annotated {
      all,
      per_kind,
      counts: DefectCounts::from_defects(defects),
    }
  }
}
