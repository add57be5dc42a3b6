// 该文件是 Jianban （鉴板） 项目的一部分。
// src/pipeline/similarity.rs - 结构相似度评分
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

use std::fmt;

use image::{GrayImage, RgbImage};
use tracing::debug;

use crate::pipeline::{color::to_luma, resize::resize_exact};

const SSIM_WINDOW: u32 = 7;
const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;
const SSIM_DATA_RANGE: f64 = 255.0;

/// 相似度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
  A,
  B,
  C,
  D,
  F,
}

impl Grade {
  pub fn as_str(&self) -> &'static str {
    match self {
      Grade::A => "A",
      Grade::B => "B",
      Grade::C => "C",
      Grade::D => "D",
      Grade::F => "F",
    }
  }
}

impl fmt::Display for Grade {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityResult {
  /// 百分比，范围 [0, 100]
  pub percentage: f64,
  pub grade: Grade,
}

impl SimilarityResult {
  pub fn from_percentage(percentage: f64) -> Self {
    Self {
      percentage,
      grade: assign_grade(percentage),
    }
  }
}

/// 等级阶梯函数，各档下界包含在内
pub fn assign_grade(percentage: f64) -> Grade {
  if percentage >= 90.0 {
    Grade::A
  } else if percentage >= 80.0 {
    Grade::B
  } else if percentage >= 70.0 {
    Grade::C
  } else if percentage >= 60.0 {
    Grade::D
  } else {
    Grade::F
  }
}

/// 计算两幅图像的相似度。尺寸不同时，`candidate` 被缩放到 `reference` 的尺寸。
pub fn calculate_similarity(reference: &RgbImage, candidate: &RgbImage) -> SimilarityResult {
  let reference = to_luma(reference);
  let mut candidate = to_luma(candidate);

  if candidate.dimensions() != reference.dimensions() {
    debug!(
      "相似度计算: 尺寸不一致 {:?} -> {:?}",
      candidate.dimensions(),
      reference.dimensions()
    );
    candidate = resize_exact(&candidate, reference.width(), reference.height());
  }

  let index = ssim(&reference, &candidate);
  // 负的 SSIM 按 0 处理
  let percentage = (index * 100.0).clamp(0.0, 100.0);
  debug!("SSIM = {:.6}, 相似度 = {:.2}%", index, percentage);
  SimilarityResult::from_percentage(percentage)
}

/// 求和面积表，多一行一列的零边
struct Integral {
  width: usize,
  data: Vec<f64>,
}

impl Integral {
  fn new<F: Fn(usize, usize) -> f64>(width: usize, height: usize, f: F) -> Self {
    let stride = width + 1;
    let mut data = vec![0.0; stride * (height + 1)];
    for y in 0..height {
      let mut row = 0.0;
      for x in 0..width {
        row += f(x, y);
        data[(y + 1) * stride + x + 1] = data[y * stride + x + 1] + row;
      }
    }
    Self { width, data }
  }

  /// 区域 [x0, x1) x [y0, y1) 的和
  fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
    let stride = self.width + 1;
    self.data[y1 * stride + x1] - self.data[y0 * stride + x1] - self.data[y1 * stride + x0]
      + self.data[y0 * stride + x0]
  }
}

/// 均匀窗口、样本协方差的 SSIM 均值。只在本模块内对同尺寸图像调用。
fn ssim(a: &GrayImage, b: &GrayImage) -> f64 {
  debug_assert_eq!(a.dimensions(), b.dimensions());
  let (w, h) = (a.width() as usize, a.height() as usize);
  if w == 0 || h == 0 {
    return 0.0;
  }

  let pa = |x: usize, y: usize| a.get_pixel(x as u32, y as u32).0[0] as f64;
  let pb = |x: usize, y: usize| b.get_pixel(x as u32, y as u32).0[0] as f64;

  let sa = Integral::new(w, h, pa);
  let sb = Integral::new(w, h, pb);
  let saa = Integral::new(w, h, |x, y| pa(x, y) * pa(x, y));
  let sbb = Integral::new(w, h, |x, y| pb(x, y) * pb(x, y));
  let sab = Integral::new(w, h, |x, y| pa(x, y) * pb(x, y));

  let c1 = (SSIM_K1 * SSIM_DATA_RANGE).powi(2);
  let c2 = (SSIM_K2 * SSIM_DATA_RANGE).powi(2);

  let local = |x0: usize, y0: usize, x1: usize, y1: usize| {
    let n = ((x1 - x0) * (y1 - y0)) as f64;
    let cov_norm = if n > 1.0 { n / (n - 1.0) } else { 1.0 };
    let ux = sa.sum(x0, y0, x1, y1) / n;
    let uy = sb.sum(x0, y0, x1, y1) / n;
    let uxx = saa.sum(x0, y0, x1, y1) / n;
    let uyy = sbb.sum(x0, y0, x1, y1) / n;
    let uxy = sab.sum(x0, y0, x1, y1) / n;
    let vx = cov_norm * (uxx - ux * ux);
    let vy = cov_norm * (uyy - uy * uy);
    let vxy = cov_norm * (uxy - ux * uy);
    ((2.0 * ux * uy + c1) * (2.0 * vxy + c2)) / ((ux * ux + uy * uy + c1) * (vx + vy + c2))
  };

  let win = SSIM_WINDOW as usize;
  if w < win || h < win {
    return local(0, 0, w, h);
  }

  let mut total = 0.0;
  let mut count = 0usize;
  for y0 in 0..=(h - win) {
    for x0 in 0..=(w - win) {
      total += local(x0, y0, x0 + win, y0 + win);
      count += 1;
    }
  }
  total / count as f64
}
