// 该文件是 Jianban （鉴板） 项目的一部分。
// tests/test_pipeline.rs - 检测流程集成测试
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

mod common;

use common::{FailFirst, FixedClassifier, WrongLength, paint_square, square_pair};
use image::RgbImage;
use jianban::{
  model::DefectKind,
  pipeline::{BoundingBox, Grade, InspectConfig, InspectError, Inspector},
};

#[test]
fn identical_black_boards_are_clean() {
  let board = RgbImage::new(100, 100);
  let inspector = Inspector::new(FixedClassifier(DefectKind::Short), InspectConfig::default());
  let inspection = inspector.inspect_images(&board, &board);

  assert_eq!(inspection.similarity.percentage, 100.0);
  assert_eq!(inspection.similarity.grade, Grade::A);
  assert!(inspection.defects.is_empty());
  assert_eq!(inspection.highlighted, board);
}

#[test]
fn single_square_is_located_and_classified() {
  let (test, template) = square_pair();
  let inspector = Inspector::new(FixedClassifier(DefectKind::Mousebite), InspectConfig::default());
  let inspection = inspector.inspect_images(&test, &template);

  assert_eq!(inspection.defects.len(), 1);
  assert_eq!(inspection.defects[0].bbox, BoundingBox::new(20, 20, 80, 80));
  assert_eq!(inspection.defects[0].kind, DefectKind::Mousebite);
  assert!(inspection.similarity.percentage < 100.0);
  assert_eq!(inspection.inspected.dimensions(), (100, 100));
}

#[test]
fn roi_offset_is_configurable() {
  let (test, template) = square_pair();
  let config = InspectConfig::default().roi_offset(5);
  let inspection = Inspector::new(FixedClassifier(DefectKind::Open), config).inspect_images(&test, &template);
  assert_eq!(inspection.defects[0].bbox, BoundingBox::new(35, 35, 65, 65));
}

#[test]
fn failing_roi_is_dropped() {
  let template = RgbImage::new(200, 100);
  let mut test = template.clone();
  paint_square(&mut test, 40, 40, 20);
  paint_square(&mut test, 140, 40, 20);

  let model = FailFirst::new(DefectKind::Copper);
  let inspector = Inspector::new(&model, InspectConfig::default());
  let inspection = inspector.inspect_images(&test, &template);

  assert_eq!(model.calls(), 2);
  assert_eq!(inspection.defects.len(), 1);
  assert_eq!(inspection.defects[0].kind, DefectKind::Copper);
}

#[test]
fn wrong_length_scores_are_dropped() {
  let (test, template) = square_pair();
  for len in [0, 5, 7] {
    let inspector = Inspector::new(WrongLength(len), InspectConfig::default());
    assert!(inspector.inspect_images(&test, &template).defects.is_empty());
  }
}

#[test]
fn boxes_stay_inside_the_board() {
  let template = RgbImage::new(120, 90);
  let mut test = template.clone();
  paint_square(&mut test, 0, 0, 10);
  paint_square(&mut test, 105, 75, 15);
  paint_square(&mut test, 50, 40, 12);

  let inspector = Inspector::new(FixedClassifier(DefectKind::PinHole), InspectConfig::default());
  let inspection = inspector.inspect_images(&test, &template);

  assert_eq!(inspection.defects.len(), 3);
  let (w, h) = (test.width() as i32, test.height() as i32);
  for defect in &inspection.defects {
    let b = defect.bbox;
    assert!(0 <= b.x1 && b.x1 < b.x2 && b.x2 <= w, "{:?}", b);
    assert!(0 <= b.y1 && b.y1 < b.y2 && b.y2 <= h, "{:?}", b);
    assert!(defect.kind.index() < DefectKind::COUNT);
  }
  assert!(
    inspection
      .defects
      .iter()
      .any(|d| d.bbox == BoundingBox::new(0, 0, 30, 30))
  );
}

#[test]
fn mismatched_shapes_still_inspect() {
  let template = RgbImage::new(80, 60);
  let mut test = RgbImage::new(100, 100);
  paint_square(&mut test, 30, 30, 20);

  let inspector = Inspector::new(FixedClassifier(DefectKind::Short), InspectConfig::default());
  let inspection = inspector.inspect_images(&test, &template);

  let (w, h) = inspection.inspected.dimensions();
  // 测试图像按模板宽度缩放为 80x80，差异图与之一致
  assert_eq!(inspection.highlighted.dimensions(), (80, 80));
  assert!((0.0..=100.0).contains(&inspection.similarity.percentage));
  for defect in &inspection.defects {
    assert!(defect.bbox.x2 <= w as i32 && defect.bbox.y2 <= h as i32);
  }
}

#[test]
fn missing_files_are_reported() {
  let dir = tempfile::tempdir().unwrap();
  let template = dir.path().join("template.png");
  RgbImage::new(10, 10).save(&template).unwrap();

  let inspector = Inspector::new(FixedClassifier(DefectKind::Open), InspectConfig::default());
  assert!(matches!(
    inspector.inspect_files(dir.path().join("missing.png"), &template),
    Err(InspectError::TestImage(_))
  ));
  assert!(matches!(
    inspector.inspect_files(&template, dir.path().join("missing.png")),
    Err(InspectError::TemplateImage(_))
  ));
}

#[test]
fn files_are_inspected_like_images() {
  let dir = tempfile::tempdir().unwrap();
  let (test, template) = square_pair();
  let test_path = dir.path().join("test.png");
  let template_path = dir.path().join("template.png");
  test.save(&test_path).unwrap();
  template.save(&template_path).unwrap();

  let inspector = Inspector::new(FixedClassifier(DefectKind::Protrusion), InspectConfig::default());
  let inspection = inspector.inspect_files(&test_path, &template_path).unwrap();
  assert_eq!(inspection.defects.len(), 1);
  assert_eq!(inspection.defects[0].bbox, BoundingBox::new(20, 20, 80, 80));
}

#[test]
fn left_edge_defect_is_classified() {
  let template = RgbImage::new(100, 100);
  let mut test = template.clone();
  paint_square(&mut test, 0, 40, 20);

  let inspector = Inspector::new(FixedClassifier(DefectKind::Open), InspectConfig::default());
  let inspection = inspector.inspect_images(&test, &template);

  assert_eq!(inspection.defects.len(), 1);
  assert_eq!(inspection.defects[0].bbox, BoundingBox::new(0, 20, 40, 80));
  assert_eq!(inspection.defects[0].kind, DefectKind::Open);
}
