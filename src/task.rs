// 该文件是 Jianban （鉴板） 项目的一部分。
// src/task.rs - 检测任务
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

use std::time::Duration;
use tracing::{info, warn};

use crate::{
  frame::ClassifierFrame,
  input::ImagePair,
  model::{ClassScores, Model},
  output::Render,
  pipeline::{InspectConfig, Inspection, Inspector},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

fn log_inspection(inspection: &Inspection) {
  info!(
    "相似度: {:.2}%，等级: {}，缺陷数: {}",
    inspection.similarity.percentage,
    inspection.similarity.grade,
    inspection.defects.len()
  );
  for defect in &inspection.defects {
    info!(
      "  - {} at ({}, {}) to ({}, {})",
      defect.kind, defect.bbox.x1, defect.bbox.y1, defect.bbox.x2, defect.bbox.y2
    );
  }
}

#[derive(Default, Debug)]
pub struct OneShotTask {
  config: InspectConfig,
}

impl OneShotTask {
  pub fn with_config(mut self, config: InspectConfig) -> Self {
    self.config = config;
    self
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = ImagePair>,
  M: Model<Input = ClassifierFrame, Output = ClassScores, Error = ME>,
  O: Render<ImagePair, Inspection, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let pair = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    let inspector = Inspector::new(model, self.config);

    info!("输入图像获取成功，开始检测...");
    let now = std::time::Instant::now();
    let inspection = inspector.inspect_images(&pair.test, &pair.template);
    let elapsed = now.elapsed();
    info!("检测完成，耗时: {:.2?}", elapsed);
    log_inspection(&inspection);

    output.render_result(&pair, &inspection)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

const DEFAULT_REPEAT_TIMES: usize = 100;
const WARMUP_TIMES: usize = 2;

#[derive(Debug)]
pub struct RepeatShotTask {
  config: InspectConfig,
  times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      config: InspectConfig::default(),
      times: DEFAULT_REPEAT_TIMES,
    }
  }
}

impl RepeatShotTask {
  pub fn with_config(mut self, config: InspectConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_times(mut self, times: usize) -> Self {
    self.times = times.max(1);
    self
  }
}

/// 去掉预热轮次后的平均耗时
pub fn mean_after_warmup(times: &[Duration]) -> Option<Duration> {
  let skip = if times.len() > WARMUP_TIMES { WARMUP_TIMES } else { 0 };
  let measured = &times[skip..];
  if measured.is_empty() {
    return None;
  }
  Some(measured.iter().sum::<Duration>() / measured.len() as u32)
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = ImagePair>,
  M: Model<Input = ClassifierFrame, Output = ClassScores, Error = ME>,
  O: Render<ImagePair, Inspection, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let pair = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    let inspector = Inspector::new(model, self.config);

    info!("输入图像获取成功，开始检测...");
    let mut times = Vec::with_capacity(self.times);
    let mut last = None;
    for i in 0..self.times {
      let now = std::time::Instant::now();
      let inspection = inspector.inspect_images(&pair.test, &pair.template);
      let elapsed = now.elapsed();
      info!("({})检测完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(inspection);
    }

    if let Some(mean) = mean_after_warmup(&times) {
      warn!("平均检测时间: {:.2?}", mean);
    }

    if let Some(inspection) = last {
      log_inspection(&inspection);
      output.render_result(&pair, &inspection)?;
    }

    Ok(())
  }
}
