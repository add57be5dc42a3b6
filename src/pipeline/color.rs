// 该文件是 Jianban （鉴板） 项目的一部分。
// src/pipeline/color.rs - 颜色空间转换
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

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::map::map_pixels;

// BT.601 权重的 14 位定点表示
const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;

/// BT.601 灰度：Y = 0.299 R + 0.587 G + 0.114 B，四舍五入
pub fn luma(Rgb([r, g, b]): Rgb<u8>) -> u8 {
  let y = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B + (1 << (LUMA_SHIFT - 1));
  (y >> LUMA_SHIFT) as u8
}

/// 整幅图像转为 BT.601 灰度
pub fn to_luma(image: &RgbImage) -> GrayImage {
  map_pixels(image, |p: Rgb<u8>| Luma([luma(p)]))
}

/// 8 位 HSV：H ∈ [0, 180)，S、V ∈ [0, 255]
pub fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> [u8; 3] {
  let (rf, gf, bf) = (r as f32, g as f32, b as f32);
  let v = rf.max(gf).max(bf);
  let min = rf.min(gf).min(bf);
  let diff = v - min;

  let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

  let h = if diff == 0.0 {
    0.0
  } else if v == rf {
    60.0 * (gf - bf) / diff
  } else if v == gf {
    120.0 + 60.0 * (bf - rf) / diff
  } else {
    240.0 + 60.0 * (rf - gf) / diff
  };
  let h = if h < 0.0 { h + 360.0 } else { h };

  [
    ((h / 2.0).round() as u32 % 180) as u8,
    s.round() as u8,
    v as u8,
  ]
}
