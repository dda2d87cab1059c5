//! # 显示画布
//!
//! ## 设计思路
//! - 单写入者模型：一块画布，整幅重绘，后写覆盖先写；
//! - 导出（JPEG 字节 / data URL / 落盘）都从当前像素出发，空画布一律拒绝；
//! - JPEG 不携带透明通道，编码前统一压到 RGB。

use std::io::Cursor;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, Rgba};

use super::error::PipelineError;
use super::source::ProcessedBitmap;

/// 客户端预览画布
///
/// 未绘制时尺寸为 0；绘制后像素长度恒为 `width * height * 4`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySurface {
    /// 当前宽度（像素）
    pub width: u32,
    /// 当前高度（像素）
    pub height: u32,
    /// RGBA8 像素缓冲
    pub pixels: Vec<u8>,
}

impl DisplaySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// 画布是否从未被绘制
    pub fn is_blank(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// 整幅重绘：画布采用位图的尺寸与像素
    pub fn paint(&mut self, bitmap: &ProcessedBitmap) {
        self.width = bitmap.width;
        self.height = bitmap.height;
        self.pixels.clear();
        self.pixels.extend_from_slice(&bitmap.bytes);
    }

    /// 导出 JPEG 字节（质量 1-100）
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, PipelineError> {
        if self.is_blank() {
            return Err(PipelineError::Canvas("画布尚未绘制任何内容".to_string()));
        }
        let rgba: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.width, self.height, self.pixels.clone())
                .ok_or_else(|| PipelineError::Canvas("像素缓冲长度与尺寸不符".to_string()))?;
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut encoded = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(encoder)
            .map_err(|e| PipelineError::Canvas(format!("JPEG 编码失败: {}", e)))?;
        Ok(encoded.into_inner())
    }

    /// 导出 base64 data URL，便于直接嵌入预览
    pub fn to_data_url(&self, quality: u8) -> Result<String, PipelineError> {
        let jpeg = self.to_jpeg(quality)?;
        Ok(format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(jpeg)
        ))
    }

    /// 保存 JPEG 到磁盘
    pub fn save_jpeg(&self, path: &Path, quality: u8) -> Result<(), PipelineError> {
        let jpeg = self.to_jpeg(quality)?;
        std::fs::write(path, &jpeg)
            .map_err(|e| PipelineError::FileSystem(format!("写入 {} 失败: {}", path.display(), e)))
    }
}
