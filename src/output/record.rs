// 该文件是 Jianban （鉴板） 项目的一部分。
// src/output/record.rs - 检测记录与反馈
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::{
  model::DefectKind,
  pipeline::{DefectRecord, Inspection},
};

/// 各类缺陷的数量，包含数量为 0 的类别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefectCounts([usize; DefectKind::COUNT]);

impl DefectCounts {
  pub fn from_defects(defects: &[DefectRecord]) -> Self {
    let mut counts = [0usize; DefectKind::COUNT];
    for defect in defects {
      counts[defect.kind.index()] += 1;
    }
    Self(counts)
  }

  pub fn get(&self, kind: DefectKind) -> usize {
    self.0[kind.index()]
  }

  pub fn total(&self) -> usize {
    self.0.iter().sum()
  }

  pub fn iter(&self) -> impl Iterator<Item = (DefectKind, usize)> + '_ {
    DefectKind::ALL.iter().map(|kind| (*kind, self.get(*kind)))
  }
}

pub fn defect_feedback(kind: DefectKind, count: usize) -> String {
  format!("{} instances of {} defect detected.", count, kind)
}

/// 按类别顺序生成的反馈，只包含出现过的类别
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
  pub lines: Vec<String>,
  pub details: Vec<(DefectKind, usize)>,
}

pub fn generate_feedback(counts: &DefectCounts) -> Feedback {
  let mut feedback = Feedback::default();
  for (kind, count) in counts.iter().filter(|(_, count)| *count > 0) {
    feedback.lines.push(defect_feedback(kind, count));
    feedback.details.push((kind, count));
  }
  feedback
}

/// 一次检测的 JSON 记录
pub struct InspectionRecord<'a> {
  inspection: &'a Inspection,
  generated_at: DateTime<Utc>,
}

impl<'a> InspectionRecord<'a> {
  pub fn new(inspection: &'a Inspection) -> Self {
    Self {
      inspection,
      generated_at: Utc::now(),
    }
  }

  pub fn with_time(mut self, generated_at: DateTime<Utc>) -> Self {
    self.generated_at = generated_at;
    self
  }

  pub fn to_json(&self) -> Value {
    let inspection = self.inspection;
    let counts = DefectCounts::from_defects(&inspection.defects);
    let feedback = generate_feedback(&counts);

    let defects: Vec<Value> = inspection
      .defects
      .iter()
      .map(|d| {
        json!({
          "type": d.kind.name(),
          "class_id": d.kind.index(),
          "x1": d.bbox.x1,
          "y1": d.bbox.y1,
          "x2": d.bbox.x2,
          "y2": d.bbox.y2,
        })
      })
      .collect();

    let count_map: serde_json::Map<String, Value> = counts
      .iter()
      .map(|(kind, count)| (kind.name().to_string(), json!(count)))
      .collect();

    let details: Vec<Value> = feedback
      .details
      .iter()
      .map(|(kind, count)| json!({ "type": kind.name(), "count": count }))
      .collect();

    json!({
      "generated_at": self.generated_at.to_rfc3339(),
      "similarity": (inspection.similarity.percentage * 100.0).round() / 100.0,
      "grade": inspection.similarity.grade.as_str(),
      "width": inspection.inspected.width(),
      "height": inspection.inspected.height(),
      "defects": defects,
      "counts": count_map,
      "feedback": feedback.lines,
      "feedback_details": details,
    })
  }

  pub fn write(&self, path: &Path) -> Result<(), std::io::Error> {
    let text = serde_json::to_string_pretty(&self.to_json()).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::{BoundingBox, SimilarityResult};
  use image::RgbImage;

  fn record(kind: DefectKind) -> DefectRecord {
    DefectRecord {
      bbox: BoundingBox::new(1, 2, 30, 40),
      kind,
    }
  }

  #[test]
  fn counts_cover_every_kind() {
    let defects = [
      record(DefectKind::Short),
      record(DefectKind::Open),
      record(DefectKind::Short),
    ];
    let counts = DefectCounts::from_defects(&defects);
    assert_eq!(counts.get(DefectKind::Short), 2);
    assert_eq!(counts.get(DefectKind::Open), 1);
    assert_eq!(counts.get(DefectKind::PinHole), 0);
    assert_eq!(counts.iter().count(), DefectKind::COUNT);
    assert_eq!(counts.total(), 3);
  }

  #[test]
  fn feedback_follows_vocabulary_order() {
    let defects = [record(DefectKind::Copper), record(DefectKind::Short)];
    let feedback = generate_feedback(&DefectCounts::from_defects(&defects));
    assert_eq!(
      feedback.lines,
      vec![
        "1 instances of short defect detected.".to_string(),
        "1 instances of copper defect detected.".to_string(),
      ]
    );
    assert_eq!(
      feedback.details,
      vec![(DefectKind::Short, 1), (DefectKind::Copper, 1)]
    );
  }

  #[test]
  fn json_contains_every_defect() {
    let inspection = Inspection {
      defects: vec![record(DefectKind::Mousebite), record(DefectKind::PinHole)],
      similarity: SimilarityResult::from_percentage(87.456),
      highlighted: RgbImage::new(50, 50),
      inspected: RgbImage::new(50, 50),
    };
    let json = InspectionRecord::new(&inspection).to_json();
    assert_eq!(json["grade"], "B");
    assert_eq!(json["similarity"], 87.46);
    assert_eq!(json["defects"].as_array().unwrap().len(), 2);
    assert_eq!(json["defects"][1]["type"], "pin-hole");
    assert_eq!(json["defects"][1]["class_id"], 5);
    assert_eq!(json["counts"]["mousebite"], 1);
    assert_eq!(json["counts"]["open"], 0);
    assert_eq!(json["feedback"].as_array().unwrap().len(), 2);
  }
}
