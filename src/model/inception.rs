// 该文件是 Jianban （鉴板） 项目的一部分。
// src/model/inception.rs - InceptionV3 缺陷分类模型（RKNN 后端）
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use rknpu::{Context, InitFlags, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl,
  frame::{AsNhwcFrame, ClassifierFrame},
  model::{ClassScores, DefectKind, Model},
  url_file_path,
};

const INCEPTION_NUM_INPUTS: u32 = 1;
const INCEPTION_NUM_OUTPUTS: u32 = 1;
const INCEPTION_SCHEME: &str = "rknn";

pub struct Inception {
  context: Context,
}

#[derive(Error, Debug)]
pub enum InceptionError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输出长度错误: 期望 {expected}, 实际 {actual}")]
  OutputLength { expected: usize, actual: usize },
}

impl InceptionError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    InceptionError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct InceptionBuilder {
  model_path: String,
  flags: InitFlags,
}

impl FromUrl for InceptionBuilder {
  type Error = InceptionError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != INCEPTION_SCHEME {
      return Err(InceptionError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        INCEPTION_SCHEME
      )));
    }

    Ok(InceptionBuilder {
      model_path: url_file_path(url),
      flags: InitFlags::default(),
    })
  }
}

impl InceptionBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build(self) -> Result<Inception, InceptionError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&model_data, self.flags)?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| InceptionError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| InceptionError::invalid("无法获取输出数量", e))?;

    if num_inputs != INCEPTION_NUM_INPUTS || num_outputs != INCEPTION_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        INCEPTION_NUM_INPUTS, INCEPTION_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(InceptionError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!("模型加载完成");
    Ok(Inception { context })
  }
}

impl Model for Inception {
  type Input = ClassifierFrame;
  type Output = ClassScores;
  type Error = InceptionError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    self.context.set_input(
      0,
      input.as_nhwc(),
      rknpu::TensorFormat::NHWC,
      TensorType::UInt8,
    )?;

    debug!("执行模型推理");
    self.context.run()?;

    let output = self.context.get_outputs()?;
    let scores = output.get_f32(0)?.to_vec();
    if scores.len() != DefectKind::COUNT {
      return Err(InceptionError::OutputLength {
        expected: DefectKind::COUNT,
        actual: scores.len(),
      });
    }
    debug!("分类得分: {:?}", scores);

    Ok(ClassScores::from(scores))
  }
}
