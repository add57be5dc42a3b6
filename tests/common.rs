// 该文件是 Jianban （鉴板） 项目的一部分。
// tests/common.rs - 集成测试共用的模拟分类器与样例图像
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

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgb, RgbImage};
use jianban::{
  frame::ClassifierFrame,
  model::{ClassScores, DefectKind, Model},
};

/// 总是给出同一类别的分类器
pub struct FixedClassifier(pub DefectKind);

impl Model for FixedClassifier {
  type Input = ClassifierFrame;
  type Output = ClassScores;
  type Error = std::io::Error;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let mut scores = vec![0.0; DefectKind::COUNT];
    scores[self.0.index()] = 1.0;
    Ok(scores.into())
  }
}

/// 第一次调用失败，其余调用与 `FixedClassifier` 相同
pub struct FailFirst {
  inner: FixedClassifier,
  calls: AtomicUsize,
}

impl FailFirst {
  pub fn new(kind: DefectKind) -> Self {
    Self {
      inner: FixedClassifier(kind),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Model for FailFirst {
  type Input = ClassifierFrame;
  type Output = ClassScores;
  type Error = std::io::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
      return Err(std::io::Error::other("npu busy"));
    }
    self.inner.infer(input)
  }
}

/// 输出长度固定为 `len` 的分类器
pub struct WrongLength(pub usize);

impl Model for WrongLength {
  type Input = ClassifierFrame;
  type Output = ClassScores;
  type Error = std::io::Error;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(vec![0.5; self.0].into())
  }
}

pub fn paint_square(image: &mut RgbImage, x0: u32, y0: u32, size: u32) {
  for y in y0..(y0 + size).min(image.height()) {
    for x in x0..(x0 + size).min(image.width()) {
      image.put_pixel(x, y, Rgb([255, 255, 255]));
    }
  }
}

/// 黑色模板，测试图像在 (40, 40) 处多出一个 20x20 的白块
pub fn square_pair() -> (RgbImage, RgbImage) {
  let template = RgbImage::new(100, 100);
  let mut test = template.clone();
  paint_square(&mut test, 40, 40, 20);
  (test, template)
}
