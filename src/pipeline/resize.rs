// 该文件是 Jianban （鉴板） 项目的一部分。
// src/pipeline/resize.rs - 图像尺寸归一化
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

use image::{ImageBuffer, Pixel, imageops::FilterType};

/// 保持宽高比缩放。
///
/// 较长的一边对齐到目标尺寸中对应的一边，另一边按同一比例计算，
/// 因此输出不一定等于 `(width, height)`。
/// 缩小时三角滤波的支撑域随比例扩大，效果接近面积平均，不会产生混叠。
pub fn resize_with_aspect_ratio<P>(
  image: &ImageBuffer<P, Vec<P::Subpixel>>,
  (width, height): (u32, u32),
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
  P: Pixel + 'static,
{
  let (src_w, src_h) = image.dimensions();
  let (new_w, new_h) = aspect_fit((src_w, src_h), (width, height));
  resize_exact(image, new_w, new_h)
}

/// 计算保持宽高比缩放后的尺寸
pub fn aspect_fit((src_w, src_h): (u32, u32), (width, height): (u32, u32)) -> (u32, u32) {
  if src_h > src_w {
    let r = height as f64 / src_h as f64;
    (((src_w as f64 * r) as u32).max(1), height)
  } else {
    let r = width as f64 / src_w as f64;
    (width, ((src_h as f64 * r) as u32).max(1))
  }
}

/// 普通缩放（不保持宽高比）
pub fn resize_exact<P>(
  image: &ImageBuffer<P, Vec<P::Subpixel>>,
  width: u32,
  height: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
  P: Pixel + 'static,
{
  if image.dimensions() == (width, height) {
    return image.clone();
  }
  image::imageops::resize(image, width, height, FilterType::Triangle)
}
