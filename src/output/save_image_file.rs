// 该文件是 Jianban （鉴板） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use url::Url;

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

/// 保存标注图，并在同一目录写出 `<名称>-diff.<扩展名>` 差异图与 `<名称>.json` 记录
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("字体错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let mut draw = Draw::default();
    if let Some((_, font)) = uri.query_pairs().find(|(k, _)| k == "font") {
      draw = draw.with_font_file(font.as_ref())?;
    }

    Ok(SaveImageFileOutput {
      path: PathBuf::from(url_file_path(uri)),
      draw,
    })
  }
}

/// 在 `path` 旁生成带后缀的同级文件名
pub(crate) fn sibling_path(path: &Path, suffix: &str, extension: &str) -> PathBuf {
  let stem = path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "inspection".to_string());
  path.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      draw: Draw::default(),
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_inspection(&self, inspection: &Inspection) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let extension = self
      .path
      .extension()
      .map(|e| e.to_string_lossy().into_owned())
      .unwrap_or_else(|| "png".to_string());

    let annotated = self.draw.annotate(&inspection.inspected, &inspection.defects);
    annotated.all.save(&self.path)?;
    inspection
      .highlighted
      .save(sibling_path(&self.path, "-diff", &extension))?;
    InspectionRecord::new(inspection).write(&sibling_path(&self.path, "", "json"))?;

    warn!("保存检测结果到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<ImagePair, Inspection> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, _frame: &ImagePair, result: &Inspection) -> Result<(), Self::Error> {
    self.save_inspection(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sibling_paths() {
    let path = Path::new("/tmp/out/board.jpg");
    assert_eq!(
      sibling_path(path, "-diff", "jpg"),
      PathBuf::from("/tmp/out/board-diff.jpg")
    );
    assert_eq!(
      sibling_path(path, "", "json"),
      PathBuf::from("/tmp/out/board.json")
    );
  }

  #[test]
  fn scheme_is_checked() {
    let url = Url::parse("folder:///tmp/out").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }
}
