//! # 流水线数据模型
//!
//! 选中文件与变换结果的载体类型。字节缓冲全部是拥有所有权的 `Vec<u8>`，
//! 随值移动、离开作用域即释放，不存在需要手动归还的资源。

use std::fs;
use std::path::Path;

use super::error::PipelineError;

/// 用户选中的待处理文件
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// 原始文件名（不含路径）
    pub name: String,
    /// 声明的 MIME 类型，按扩展名推导（与浏览器 `File.type` 口径一致）
    pub declared_type: String,
    /// 文件字节数
    pub size: u64,
    /// 原始内容
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// 从本地路径加载选中文件
    ///
    /// # 返回
    /// - `Ok(SelectedFile)`：文件内容与元信息
    /// - `Err(PipelineError::FileSystem)`：路径不存在、不是普通文件或读取失败
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileSystem(format!("文件不存在: {}", path.display())));
        }
        let metadata = fs::metadata(path)
            .map_err(|e| PipelineError::FileSystem(format!("读取 {} 元数据失败: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(PipelineError::FileSystem(format!("不是普通文件: {}", path.display())));
        }
        let bytes = fs::read(path)
            .map_err(|e| PipelineError::FileSystem(format!("读取 {} 失败: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self {
            name,
            declared_type: declared_type_for_path(path),
            size: metadata.len(),
            bytes,
        })
    }
}

/// 按扩展名推导声明类型，未知扩展名归为 `application/octet-stream`
pub(crate) fn declared_type_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// 变换后的位图
///
/// 像素为紧凑排列的 RGBA8，`bytes.len()` 恒等于 `width * height * 4`，
/// 由变换阶段校验后构造。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedBitmap {
    /// 输出宽度（像素）
    pub width: u32,
    /// 输出高度（像素）
    pub height: u32,
    /// RGBA 像素缓冲
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn declared_type_follows_extension() {
        assert_eq!(declared_type_for_path(Path::new("a.png")), "image/png");
        assert_eq!(declared_type_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(declared_type_for_path(Path::new("b.jpg")), "image/jpeg");
        assert_eq!(declared_type_for_path(Path::new("b.JPEG")), "image/jpeg");
        assert_eq!(declared_type_for_path(Path::new("c.gif")), "application/octet-stream");
        assert_eq!(declared_type_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn from_path_loads_name_size_and_type() {
        let dir = tempfile::tempdir().expect("create temp dir failed");
        let path = dir.path().join("sample.png");
        std::fs::write(&path, b"png-bytes").expect("write fixture failed");

        let file = SelectedFile::from_path(&path).expect("load fixture failed");
        assert_eq!(file.name, "sample.png");
        assert_eq!(file.declared_type, "image/png");
        assert_eq!(file.size, 9);
        assert_eq!(file.bytes, b"png-bytes");
    }

    #[test]
    fn from_path_rejects_missing_file() {
        let result = SelectedFile::from_path(Path::new("/nonexistent/missing.png"));
        assert!(matches!(result, Err(PipelineError::FileSystem(_))));
    }

    #[test]
    fn from_path_rejects_directory() {
        let dir = tempfile::tempdir().expect("create temp dir failed");
        let result = SelectedFile::from_path(dir.path());
        assert!(matches!(result, Err(PipelineError::FileSystem(_))));
    }
}
