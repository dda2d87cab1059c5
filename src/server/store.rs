//! # 上传文件存储
//!
//! ## 设计思路
//! - 存储键取净化后的客户端文件名（仅保留最后一段路径），
//!   名字缺失或不可用时回退到固定默认名；
//! - 落盘先写同目录临时文件再 `persist_noclobber` 原子改名，
//!   同名永不覆盖：冲突时在扩展名前追加 `-1`、`-2`……直到找到空位；
//! - 目录在服务启动与每次请求时都做兜底创建，幂等且可与并发请求竞争。

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AppError;

/// 客户端未提供可用文件名时的默认存储名
pub const DEFAULT_UPLOAD_NAME: &str = "uploaded_image.jpg";

/// 同名冲突时最多尝试的后缀数量
const MAX_NAME_ATTEMPTS: u32 = 1_000;

/// 上传目录存储
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// 创建存储句柄，不触碰文件系统
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// 存储目录路径
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 确保存储目录存在（幂等）
    pub fn ensure_dir(&self) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Storage(format!("创建上传目录 '{}' 失败: {}", self.dir.display(), e))
        })
    }

    /// 落盘一个上传负载
    ///
    /// # 参数
    /// * `declared_name` - 客户端声明的文件名（multipart filename），可缺失
    /// * `bytes` - 完整负载
    ///
    /// # 返回
    /// - `Ok(PathBuf)`：最终落盘路径（可能带冲突后缀）
    /// - `Err(AppError::Storage)`：目录、写入或改名失败
    pub fn store_bytes(&self, declared_name: Option<&str>, bytes: &[u8]) -> Result<PathBuf, AppError> {
        self.ensure_dir()?;
        let base_name = declared_name
            .and_then(sanitize_file_name)
            .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());

        let mut temp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| AppError::Storage(format!("创建临时文件失败: {}", e)))?;
        temp.write_all(bytes)
            .map_err(|e| AppError::Storage(format!("写入临时文件失败: {}", e)))?;
        temp.flush()
            .map_err(|e| AppError::Storage(format!("刷新临时文件失败: {}", e)))?;

        let mut attempt: u32 = 0;
        let mut candidate = base_name.clone();
        loop {
            let target = self.dir.join(&candidate);
            match temp.persist_noclobber(&target) {
                Ok(_) => {
                    log::info!("📁 上传已保存 - {} ({} 字节)", target.display(), bytes.len());
                    return Ok(target);
                }
                Err(err)
                    if err.error.kind() == io::ErrorKind::AlreadyExists
                        && attempt < MAX_NAME_ATTEMPTS =>
                {
                    temp = err.file;
                    attempt += 1;
                    candidate = numbered_name(&base_name, attempt);
                }
                Err(err) => {
                    return Err(AppError::Storage(format!(
                        "移动上传文件到 '{}' 失败: {}",
                        target.display(),
                        err.error
                    )));
                }
            }
        }
    }
}

/// 净化客户端文件名：只保留最后一段路径，拒绝空名与遍历成分
///
/// 返回 `None` 表示名字不可用，调用方回退到默认名。
pub(crate) fn sanitize_file_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains('\0') {
        return None;
    }
    // 两种分隔符都按路径处理，仅保留最后一段
    let last = trimmed.rsplit(['/', '\\']).next()?;
    let name = Path::new(last).file_name()?.to_str()?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// 在扩展名前追加冲突序号：`photo.png` → `photo-1.png`，无扩展名直接追加
fn numbered_name(name: &str, attempt: u32) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, attempt, ext),
        None => format!("{}-{}", stem, attempt),
    }
}
