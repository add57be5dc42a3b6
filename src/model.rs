// 该文件是 Jianban （鉴板） 项目的一部分。
// src/model.rs - 缺陷分类模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fmt;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, frame::ClassifierFrame};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

pub trait WithLabel: Sized + fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Option<Self>;
}

/// PCB 缺陷类别，顺序与分类器输出一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DefectKind {
  Open,
  Short,
  Mousebite,
  Protrusion,
  Copper,
  PinHole,
}

impl DefectKind {
  pub const ALL: [DefectKind; 6] = [
    DefectKind::Open,
    DefectKind::Short,
    DefectKind::Mousebite,
    DefectKind::Protrusion,
    DefectKind::Copper,
    DefectKind::PinHole,
  ];

  pub const COUNT: usize = Self::ALL.len();

  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }

  pub fn index(&self) -> usize {
    *self as usize
  }

  pub fn name(&self) -> &'static str {
    match self {
      DefectKind::Open => "open",
      DefectKind::Short => "short",
      DefectKind::Mousebite => "mousebite",
      DefectKind::Protrusion => "protrusion",
      DefectKind::Copper => "copper",
      DefectKind::PinHole => "pin-hole",
    }
  }
}

impl fmt::Display for DefectKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl WithLabel for DefectKind {
  fn to_label_str(&self) -> String {
    self.name().to_string()
  }

  fn to_label_id(&self) -> u32 {
    self.index() as u32
  }

  fn from_label_id(id: u32) -> Option<Self> {
    Self::from_index(id as usize)
  }
}

/// 分类器输出的各类别得分
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
  pub scores: Box<[f32]>,
}

impl From<Vec<f32>> for ClassScores {
  fn from(scores: Vec<f32>) -> Self {
    Self {
      scores: scores.into_boxed_slice(),
    }
  }
}

impl ClassScores {
  /// 最大得分的下标，并列时取第一个；NaN 不参与比较
  pub fn argmax(&self) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in self.scores.iter().enumerate() {
      if score.is_nan() {
        continue;
      }
      match best {
        Some((_, top)) if score <= top => {}
        _ => best = Some((idx, score)),
      }
    }
    best.map(|(idx, _)| idx)
  }
}

/// 用互斥锁串行化推理调用，用于不能并发推理的后端
pub struct Serialized<M> {
  inner: Mutex<M>,
}

impl<M> Serialized<M> {
  pub fn new(model: M) -> Self {
    Self {
      inner: Mutex::new(model),
    }
  }

  pub fn into_inner(self) -> M {
    self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<M: Model> Model for Serialized<M> {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let model = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    model.infer(input)
  }
}

impl<M: Model> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

#[cfg(feature = "model_rknn")]
mod inception;
#[cfg(feature = "model_rknn")]
pub use self::inception::{Inception, InceptionBuilder, InceptionError};

#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("不支持的模型方案: {0}")]
  SchemeMismatch(String),
  #[error("模型后端未编译: {0}（需要启用 feature `{1}`）")]
  BackendUnavailable(String, &'static str),
  #[cfg(feature = "model_rknn")]
  #[error("RKNN 分类器错误: {0}")]
  InceptionError(#[from] InceptionError),
}

/// 按 URL 方案选择的分类器
pub enum ClassifierWrapper {
  #[cfg(feature = "model_rknn")]
  Inception(Inception),
}

const RKNN_SCHEME: &str = "rknn";

impl FromUrl for ClassifierWrapper {
  type Error = ClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    info!("加载分类模型: {}", url);
    match url.scheme() {
      #[cfg(feature = "model_rknn")]
      RKNN_SCHEME => {
        let model = InceptionBuilder::from_url(url)?.build()?;
        Ok(ClassifierWrapper::Inception(model))
      }
      #[cfg(not(feature = "model_rknn"))]
      RKNN_SCHEME => Err(ClassifierError::BackendUnavailable(
        url.to_string(),
        "model_rknn",
      )),
      other => Err(ClassifierError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Model for ClassifierWrapper {
  type Input = ClassifierFrame;
  type Output = ClassScores;
  type Error = ClassifierError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    #[cfg(feature = "model_rknn")]
    {
      match self {
        ClassifierWrapper::Inception(model) => model.infer(input).map_err(ClassifierError::from),
      }
    }
    #[cfg(not(feature = "model_rknn"))]
    {
      let _ = input;
      match *self {}
    }
  }
}
