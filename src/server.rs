//! # 上传端点
//!
//! ## 设计思路
//! - 端点只负责接收与落盘：不做类型、大小或内容校验，客户端是唯一的
//!   校验层，直接 POST 的任意字节会被原样保存（有意保留的信任缺口）；
//! - multipart 解析完全交给框架，框架层请求体上限远高于客户端的 2MB；
//! - 落盘走临时文件加原子改名，同名永不覆盖。

mod routes;
mod store;
mod upload;

pub use routes::{build_router, run_server};
pub use store::{DEFAULT_UPLOAD_NAME, UploadStore};

use std::path::PathBuf;

/// 上传服务配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 监听地址
    pub bind_addr: String,
    /// 上传文件存储目录
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            upload_dir: PathBuf::from("public/upload"),
        }
    }
}
