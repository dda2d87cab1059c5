//! # 解码与变换
//!
//! ## 设计思路
//! - 解码前先用头信息探测尺寸并套像素预算，解压炸弹在分配前就被拒绝；
//! - 变换只有一条流水线：目标尺寸统一计算，策略仅在像素路径上分叉
//!   （直接缩放，或先灰度再缩放后展回不透明 RGBA）；
//! - 全部是纯函数，入参只读、出参拥有所有权，便于直接做性质测试。

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, GrayImage, ImageReader};

use super::config::{PipelineConfig, TransformVariant};
use super::engine::VisionEngine;
use super::error::PipelineError;
use super::source::ProcessedBitmap;

/// 从内存字节解码源图
///
/// 先探测头部尺寸并校验像素预算，再做完整解码。
pub(crate) fn decode_source(
    bytes: &[u8],
    config: &PipelineConfig,
) -> Result<DynamicImage, PipelineError> {
    let (width, height) = probe_dimensions(bytes)?;
    if width == 0 || height == 0 {
        return Err(PipelineError::Decode("图片尺寸为零".to_string()));
    }

    let pixels = u64::from(width)
        .checked_mul(u64::from(height))
        .ok_or_else(|| PipelineError::ResourceLimit("像素数量溢出".to_string()))?;
    if pixels > config.max_decoded_pixels {
        return Err(PipelineError::ResourceLimit(format!(
            "源图 {}x{} 共 {} 像素，超过上限 {}",
            width, height, pixels, config.max_decoded_pixels
        )));
    }

    image::load_from_memory(bytes).map_err(|e| PipelineError::Decode(format!("完整解码失败: {}", e)))
}

/// 只读取头信息获取尺寸，不触发完整解码
fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), PipelineError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode(format!("识别图片格式失败: {}", e)))?;
    reader
        .into_dimensions()
        .map_err(|e| PipelineError::Decode(format!("读取图片尺寸失败: {}", e)))
}

/// 由源尺寸计算目标尺寸：宽度固定，高度按比例四舍五入并钳到至少 1
pub(crate) fn target_dimensions(src_width: u32, src_height: u32, target_width: u32) -> (u32, u32) {
    let aspect = f64::from(src_height) / f64::from(src_width);
    let target_height = (f64::from(target_width) * aspect).round() as u32;
    (target_width, target_height.max(1))
}

/// 按配置选中的策略执行变换，返回紧凑 RGBA 位图
pub(crate) fn apply_variant(
    engine: &VisionEngine,
    source: &DynamicImage,
    config: &PipelineConfig,
) -> Result<ProcessedBitmap, PipelineError> {
    let (src_width, src_height) = source.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(PipelineError::Decode("图片尺寸为零".to_string()));
    }

    let (dst_width, dst_height) = target_dimensions(src_width, src_height, config.target_width);
    let dst_pixels = u64::from(dst_width) * u64::from(dst_height);
    if dst_pixels > config.max_decoded_pixels {
        return Err(PipelineError::ResourceLimit(format!(
            "输出 {}x{} 共 {} 像素，超过上限 {}",
            dst_width, dst_height, dst_pixels, config.max_decoded_pixels
        )));
    }

    let bytes = match config.variant {
        TransformVariant::Resize => {
            let rgba = source.to_rgba8();
            engine.resize_rgba(&rgba, dst_width, dst_height).into_raw()
        }
        TransformVariant::GrayscaleResize => {
            let luma = source.to_luma8();
            let resized = engine.resize_luma(&luma, dst_width, dst_height);
            opaque_rgba_from_luma(&resized)
        }
    };

    let expected_len = dst_width as usize * dst_height as usize * 4;
    if bytes.len() != expected_len {
        return Err(PipelineError::Engine(format!(
            "输出缓冲长度异常: 期望 {} 实际 {}",
            expected_len,
            bytes.len()
        )));
    }

    Ok(ProcessedBitmap {
        width: dst_width,
        height: dst_height,
        bytes,
    })
}

/// 单通道灰度展开为不透明 RGBA：R = G = B = 灰度值，α 固定 255
fn opaque_rgba_from_luma(luma: &GrayImage) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(luma.as_raw().len() * 4);
    for value in luma.as_raw() {
        rgba.extend_from_slice(&[*value, *value, *value, 255]);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgba};
    use proptest::prelude::*;

    use super::*;

    /// 生成一张渐变 PNG 的字节串
    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .expect("encode png failed");
        bytes.into_inner()
    }

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8, 255])
        }))
    }

    #[test]
    fn target_dimensions_round_half_up() {
        assert_eq!(target_dimensions(800, 600, 400), (400, 300));
        assert_eq!(target_dimensions(400, 400, 400), (400, 400));
        // 400 * 333 / 1000 = 133.2 → 133
        assert_eq!(target_dimensions(1000, 333, 400), (400, 133));
        // 400 * 501 / 800 = 250.5 → 251
        assert_eq!(target_dimensions(800, 501, 400), (400, 251));
    }

    #[test]
    fn target_height_is_clamped_to_one() {
        // 极端横幅：按比例高度四舍五入为 0，钳到 1
        assert_eq!(target_dimensions(10_000, 3, 400), (400, 1));
    }

    #[test]
    fn decode_source_accepts_valid_png() {
        let config = PipelineConfig::default();
        let bytes = create_png_bytes(20, 10);
        let decoded = decode_source(&bytes, &config).expect("decode failed");
        assert_eq!(decoded.dimensions(), (20, 10));
    }

    #[test]
    fn decode_source_rejects_garbage() {
        let config = PipelineConfig::default();
        let result = decode_source(&[0x00, 0x01, 0x02, 0x03], &config);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn decode_source_rejects_truncated_png() {
        let config = PipelineConfig::default();
        let mut bytes = create_png_bytes(20, 10);
        bytes.truncate(12);
        let result = decode_source(&bytes, &config);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn decode_source_enforces_pixel_budget() {
        let config = PipelineConfig {
            max_decoded_pixels: 100,
            ..PipelineConfig::default()
        };
        let bytes = create_png_bytes(20, 20);
        let result = decode_source(&bytes, &config);
        assert!(matches!(result, Err(PipelineError::ResourceLimit(_))));
    }

    #[test]
    fn apply_variant_enforces_output_pixel_budget() {
        // 1 像素宽的长条经宽度对齐后输出会爆预算
        let engine = VisionEngine::initialize().expect("engine init failed");
        let config = PipelineConfig {
            max_decoded_pixels: 200_000,
            ..PipelineConfig::default()
        };
        let source = gradient_image(1, 4_000);
        let result = apply_variant(&engine, &source, &config);
        assert!(matches!(result, Err(PipelineError::ResourceLimit(_))));
    }

    #[test]
    fn resize_variant_produces_target_width() {
        let engine = VisionEngine::initialize().expect("engine init failed");
        let config = PipelineConfig::default();
        let source = gradient_image(800, 600);
        let bitmap = apply_variant(&engine, &source, &config).expect("transform failed");
        assert_eq!((bitmap.width, bitmap.height), (400, 300));
        assert_eq!(bitmap.bytes.len(), 400 * 300 * 4);
    }

    #[test]
    fn grayscale_variant_equalizes_channels() {
        let engine = VisionEngine::initialize().expect("engine init failed");
        let config = PipelineConfig {
            variant: TransformVariant::GrayscaleResize,
            ..PipelineConfig::default()
        };
        let source = gradient_image(321, 123);
        let bitmap = apply_variant(&engine, &source, &config).expect("transform failed");
        for pixel in bitmap.bytes.chunks_exact(4) {
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
            assert_eq!(pixel[3], 255);
        }
    }

    #[test]
    fn same_input_transforms_identically() {
        let engine = VisionEngine::initialize().expect("engine init failed");
        let config = PipelineConfig::default();
        let source = gradient_image(640, 480);
        let first = apply_variant(&engine, &source, &config).expect("first transform failed");
        let second = apply_variant(&engine, &source, &config).expect("second transform failed");
        assert_eq!(first, second);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn any_source_resizes_to_fixed_width(width in 1u32..=1200, height in 1u32..=1200) {
            let engine = VisionEngine::initialize().expect("engine init failed");
            let config = PipelineConfig::default();
            let source = gradient_image(width, height);
            let bitmap = apply_variant(&engine, &source, &config).expect("transform failed");

            let expected_height =
                ((400.0 * f64::from(height) / f64::from(width)).round() as u32).max(1);
            prop_assert_eq!(bitmap.width, 400);
            prop_assert_eq!(bitmap.height, expected_height);
            prop_assert_eq!(bitmap.bytes.len(), 400 * expected_height as usize * 4);
        }

        #[test]
        fn grayscale_holds_for_any_source(width in 1u32..=400, height in 1u32..=400) {
            let engine = VisionEngine::initialize().expect("engine init failed");
            let config = PipelineConfig {
                variant: TransformVariant::GrayscaleResize,
                ..PipelineConfig::default()
            };
            let source = gradient_image(width, height);
            let bitmap = apply_variant(&engine, &source, &config).expect("transform failed");
            for pixel in bitmap.bytes.chunks_exact(4) {
                prop_assert_eq!(pixel[0], pixel[1]);
                prop_assert_eq!(pixel[1], pixel[2]);
                prop_assert_eq!(pixel[3], 255u8);
            }
        }
    }
}
