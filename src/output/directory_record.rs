// 该文件是 Jianban （鉴板） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{DateTime, Datelike, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  input::ImagePair,
  output::{
    Render,
    draw::{Draw, DrawError},
    record::InspectionRecord,
  },
  pipeline::Inspection,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体错误: {0}")]
  DrawError(#[from] DrawError),
}

/// 按日期分目录保存每次检测的全部产物
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  frame_counters: Arc<Mutex<u16>>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");
    let mut output = DirectoryRecordOutput::new(url_file_path(uri)).always(always);
    if let Some((_, font)) = uri.query_pairs().find(|(k, _)| k == "font") {
      output.draw = Draw::default().with_font_file(font.as_ref())?;
    }
    Ok(output)
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    DirectoryRecordOutput {
      directory: directory.into(),
      draw: Draw::default(),
      frame_counters: Arc::new(Mutex::new(0)),
      always: false,
    }
  }

  /// 没有缺陷时也保存
  pub fn always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counters
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  /// 本次检测的文件名前缀（不含扩展名）
  fn frame_stem(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn save_inspection(&self, inspection: &Inspection) -> Result<(), DirectoryRecordOutputError> {
    let now = Utc::now();
    let stem = self.frame_stem(now)?;
    let name = stem
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let file = |suffix: &str, ext: &str| stem.with_file_name(format!("{}{}.{}", name, suffix, ext));

    let annotated = self.draw.annotate(&inspection.inspected, &inspection.defects);
    annotated.all.save(file("", "png"))?;
    inspection.highlighted.save(file("-diff", "png"))?;
    for (kind, image) in &annotated.per_kind {
      if annotated.counts.get(*kind) > 0 {
        image.save(file(&format!("-{}", kind.name()), "png"))?;
      }
    }
    InspectionRecord::new(inspection)
      .with_time(now)
      .write(&file("", "json"))?;

    info!("检测记录已保存: {}", stem.display());
    Ok(())
  }
}

impl Render<ImagePair, Inspection> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, _frame: &ImagePair, result: &Inspection) -> Result<(), Self::Error> {
    if self.always || !result.defects.is_empty() {
      self.save_inspection(result)?;
    } else {
      debug!("未发现缺陷，跳过记录");
    }
    Ok(())
  }
}
