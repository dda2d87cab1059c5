//! # 选中文件校验
//!
//! ## 设计思路
//! - 校验完全同步，先于任何解码或网络动作执行；
//! - 顺序固定：声明类型 → 大小 → 魔数签名，先挡住最便宜能判掉的情况；
//! - 校验失败返回的错误携带用户可见提示，由调用方写入错误槽。

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::source::SelectedFile;

/// 类型不允许时的用户可见提示
pub(crate) const INVALID_TYPE_MESSAGE: &str = "Invalid file type. Please upload a PNG or JPEG image.";
/// 大小超限时的用户可见提示
pub(crate) const FILE_TOO_LARGE_MESSAGE: &str = "File size must not exceed 2MB.";

/// 校验选中文件
///
/// 大小上限为闭区间：恰好等于 `max_file_size` 的文件通过。
pub(crate) fn validate_selection(
    file: &SelectedFile,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    if !config
        .accepted_types
        .iter()
        .any(|accepted| accepted.as_str() == file.declared_type.as_str())
    {
        return Err(PipelineError::InvalidType(format!(
            "声明类型不允许: {}",
            file.declared_type
        )));
    }

    if file.size > config.max_file_size {
        return Err(PipelineError::FileTooLarge(format!(
            "{} 字节，超过上限 {} 字节",
            file.size, config.max_file_size
        )));
    }

    verify_signature(file, config)
}

/// 魔数签名必须是允许集合内的图片类型，防止改扩展名绕过声明类型检查
fn verify_signature(file: &SelectedFile, config: &PipelineConfig) -> Result<(), PipelineError> {
    if file.bytes.is_empty() {
        return Err(PipelineError::InvalidType("文件内容为空".to_string()));
    }

    let kind = infer::get(&file.bytes)
        .ok_or_else(|| PipelineError::InvalidType("无法识别文件签名".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(PipelineError::InvalidType(format!(
            "文件签名不是图片: {}",
            kind.mime_type()
        )));
    }

    if !config
        .accepted_types
        .iter()
        .any(|accepted| accepted.as_str() == kind.mime_type())
    {
        return Err(PipelineError::InvalidType(format!(
            "签名类型不在允许集合: {}",
            kind.mime_type()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// PNG 文件头魔数
    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    /// JPEG SOI + APP0 片段
    const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];
    /// GIF89a 文件头
    const GIF_MAGIC: &[u8; 6] = b"GIF89a";

    fn file_with(declared_type: &str, size: u64, bytes: Vec<u8>) -> SelectedFile {
        SelectedFile {
            name: "sample".to_string(),
            declared_type: declared_type.to_string(),
            size,
            bytes,
        }
    }

    #[test]
    fn rejects_disallowed_declared_type() {
        let config = PipelineConfig::default();
        let file = file_with("image/gif", 10, GIF_MAGIC.to_vec());
        let result = validate_selection(&file, &config);
        assert!(matches!(result, Err(PipelineError::InvalidType(_))));
    }

    #[test]
    fn rejects_oversized_file() {
        let config = PipelineConfig::default();
        let file = file_with("image/png", config.max_file_size + 1, PNG_MAGIC.to_vec());
        let result = validate_selection(&file, &config);
        assert!(matches!(result, Err(PipelineError::FileTooLarge(_))));
    }

    #[test]
    fn accepts_file_exactly_at_size_limit() {
        let config = PipelineConfig::default();
        let file = file_with("image/png", config.max_file_size, PNG_MAGIC.to_vec());
        validate_selection(&file, &config).expect("file at the limit should pass");
    }

    #[test]
    fn declared_type_is_checked_before_size() {
        // 类型与大小同时超标时，先报类型错误
        let config = PipelineConfig::default();
        let file = file_with("image/gif", config.max_file_size + 1, GIF_MAGIC.to_vec());
        let result = validate_selection(&file, &config);
        assert!(matches!(result, Err(PipelineError::InvalidType(_))));
    }

    #[test]
    fn rejects_empty_content() {
        let config = PipelineConfig::default();
        let file = file_with("image/png", 0, Vec::new());
        let result = validate_selection(&file, &config);
        assert!(matches!(result, Err(PipelineError::InvalidType(_))));
    }

    #[test]
    fn rejects_signature_outside_accepted_set() {
        // 改扩展名的 GIF：声明类型合法，魔数暴露真实类型
        let config = PipelineConfig::default();
        let file = file_with("image/png", 6, GIF_MAGIC.to_vec());
        let result = validate_selection(&file, &config);
        assert!(matches!(result, Err(PipelineError::InvalidType(_))));
    }

    #[test]
    fn rejects_unrecognizable_signature() {
        let config = PipelineConfig::default();
        let file = file_with("image/png", 4, vec![0x00, 0x01, 0x02, 0x03]);
        let result = validate_selection(&file, &config);
        assert!(matches!(result, Err(PipelineError::InvalidType(_))));
    }

    #[test]
    fn accepts_jpeg_signature_with_jpg_declared_type() {
        let config = PipelineConfig::default();
        let file = file_with("image/jpg", 4, JPEG_MAGIC.to_vec());
        validate_selection(&file, &config).expect("declared image/jpg should pass");
    }

    #[test]
    fn mismatched_declaration_passes_when_signature_is_accepted() {
        // PNG 改名为 .jpg：声明与签名类型都在允许集合内，放行
        let config = PipelineConfig::default();
        let file = file_with("image/jpeg", 8, PNG_MAGIC.to_vec());
        validate_selection(&file, &config).expect("accepted signature should pass");
    }
}
