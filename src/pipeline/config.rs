//! # 流水线配置
//!
//! ## 设计思路
//! - 所有可调参数集中在一个结构体，带生产可用的默认值；
//! - 变换策略用枚举表达，由配置选择；流水线只有一条，不维护并行副本；
//! - 字符串与枚举的互转留给 CLI 等外部调用方使用。

use super::error::PipelineError;

/// 默认允许的声明类型（与浏览器 `File.type` 的口径一致）
pub const DEFAULT_ACCEPTED_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// 客户端预览流水线配置
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 允许的声明类型集合
    pub accepted_types: Vec<String>,
    /// 选中文件的大小上限（字节）
    pub max_file_size: u64,
    /// 输出位图的固定宽度（像素），高度按比例取整
    pub target_width: u32,
    /// 解码与输出像素总量上限，防解压炸弹
    pub max_decoded_pixels: u64,
    /// 预览导出与上传使用的 JPEG 质量（1-100）
    pub jpeg_quality: u8,
    /// 变换策略
    pub variant: TransformVariant,
    /// 处理完成后上传的端点；`None` 表示不上传
    pub upload_endpoint: Option<String>,
    /// 上传请求超时（秒）
    pub upload_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
            max_file_size: 2 * 1024 * 1024,
            target_width: 400,
            max_decoded_pixels: 64_000_000,
            jpeg_quality: 90,
            variant: TransformVariant::Resize,
            upload_endpoint: None,
            upload_timeout_secs: 30,
        }
    }
}

/// 校验配置参数范围，拒绝无法工作的组合
pub(crate) fn validate_config(config: &PipelineConfig) -> Result<(), PipelineError> {
    if config.accepted_types.is_empty() {
        return Err(PipelineError::InvalidConfig("允许类型列表不能为空".to_string()));
    }
    if config.max_file_size == 0 {
        return Err(PipelineError::InvalidConfig("文件大小上限必须大于 0".to_string()));
    }
    if config.target_width == 0 {
        return Err(PipelineError::InvalidConfig("目标宽度必须大于 0".to_string()));
    }
    if config.max_decoded_pixels == 0 {
        return Err(PipelineError::InvalidConfig("像素上限必须大于 0".to_string()));
    }
    if !(1..=100).contains(&config.jpeg_quality) {
        return Err(PipelineError::InvalidConfig(format!(
            "JPEG 质量 {} 超出范围（1-100）",
            config.jpeg_quality
        )));
    }
    if !(1..=300).contains(&config.upload_timeout_secs) {
        return Err(PipelineError::InvalidConfig(format!(
            "上传超时 {} 秒超出范围（1-300）",
            config.upload_timeout_secs
        )));
    }
    Ok(())
}

/// 变换策略
///
/// 两种策略共用同一条流水线，仅在变换阶段分叉。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformVariant {
    /// 仅缩放到固定宽度
    Resize,
    /// 先灰度化（R=G=B，α 固定 255），再缩放
    GrayscaleResize,
}

impl TransformVariant {
    /// 从配置字符串解析策略（大小写不敏感，忽略首尾空白）
    pub fn from_str(value: &str) -> Result<Self, PipelineError> {
        match value.trim().to_lowercase().as_str() {
            "resize" => Ok(Self::Resize),
            "grayscale" => Ok(Self::GrayscaleResize),
            other => Err(PipelineError::InvalidConfig(format!(
                "未知变换策略：{}（可选：resize/grayscale）",
                other
            ))),
        }
    }

    /// 策略的配置字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::GrayscaleResize => "grayscale",
        }
    }
}
