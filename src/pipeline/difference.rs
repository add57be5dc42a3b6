// 该文件是 Jianban （鉴板） 项目的一部分。
// src/pipeline/difference.rs - 差异可视化
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

use image::{Rgb, RgbImage};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::map::map_pixels2;
use tracing::debug;

use crate::pipeline::{
  color::to_luma,
  resize::{resize_exact, resize_with_aspect_ratio},
};

pub const HIGHLIGHT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// 逐像素绝对差，两幅图像尺寸必须一致
pub fn absdiff(a: &RgbImage, b: &RgbImage) -> RgbImage {
  map_pixels2(a, b, |Rgb(pa): Rgb<u8>, Rgb(pb): Rgb<u8>| {
    Rgb([
      pa[0].abs_diff(pb[0]),
      pa[1].abs_diff(pb[1]),
      pa[2].abs_diff(pb[2]),
    ])
  })
}

/// 在测试图像上用红色标出与模板不同的像素。
///
/// 尺寸不一致时测试图像先按模板尺寸做保持宽高比缩放，输出尺寸与缩放后的测试图像一致。
pub fn visualize_differences(test: &RgbImage, template: &RgbImage, cutoff: u8) -> RgbImage {
  let test = if test.dimensions() != template.dimensions() {
    resize_with_aspect_ratio(test, template.dimensions())
  } else {
    test.clone()
  };

  let template = if template.dimensions() != test.dimensions() {
    debug!(
      "差异可视化: 模板 {:?} 缩放到 {:?}",
      template.dimensions(),
      test.dimensions()
    );
    resize_exact(template, test.width(), test.height())
  } else {
    template.clone()
  };

  let difference = absdiff(&test, &template);
  // 灰度大于 `cutoff` 的像素为 255
  let mask = threshold(&to_luma(&difference), cutoff, ThresholdType::Binary);

  let mut highlighted = test;
  for (x, y, pixel) in highlighted.enumerate_pixels_mut() {
    if mask.get_pixel(x, y).0[0] == 255 {
      *pixel = HIGHLIGHT_COLOR;
    }
  }
  highlighted
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_images_are_untouched() {
    let image = RgbImage::from_fn(20, 20, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 7]));
    assert_eq!(visualize_differences(&image, &image, 30), image);
  }

  #[test]
  fn changed_pixels_turn_red() {
    let template = RgbImage::new(30, 30);
    let mut test = template.clone();
    for y in 5..10 {
      for x in 5..10 {
        test.put_pixel(x, y, Rgb([255, 255, 255]));
      }
    }
    // 低于阈值的变化不标记
    test.put_pixel(20, 20, Rgb([20, 20, 20]));

    let out = visualize_differences(&test, &template, 30);
    assert_eq!(*out.get_pixel(7, 7), HIGHLIGHT_COLOR);
    assert_eq!(*out.get_pixel(20, 20), Rgb([20, 20, 20]));
    assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
    let red = out.pixels().filter(|p| **p == HIGHLIGHT_COLOR).count();
    assert_eq!(red, 25);
  }

  #[test]
  fn red_only_change_uses_bt601_gray() {
    let template = RgbImage::new(10, 10);
    let mut test = template.clone();
    // BT.601 灰度为 36，高于阈值；按 Rec.709 只有 26
    test.put_pixel(5, 5, Rgb([120, 0, 0]));
    // 纯蓝变化灰度只有 14
    test.put_pixel(2, 2, Rgb([0, 0, 120]));

    let out = visualize_differences(&test, &template, 30);
    assert_eq!(*out.get_pixel(5, 5), HIGHLIGHT_COLOR);
    assert_eq!(*out.get_pixel(2, 2), Rgb([0, 0, 120]));
  }

  #[test]
  fn mismatched_shapes_follow_fitted_test() {
    let template = RgbImage::new(40, 40);
    let test = RgbImage::new(80, 40);
    let out = visualize_differences(&test, &template, 30);
    assert_eq!(out.dimensions(), (40, 20));
  }
}
