//! # 路由与服务入口

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;

use super::store::UploadStore;
use super::{ServerConfig, upload};
use crate::error::AppError;

/// 框架层请求体上限；端点本身不做大小校验
const MAX_REQUEST_BODY_BYTES: usize = 200 * 1024 * 1024;

/// 组装上传服务路由
pub fn build_router(store: Arc<UploadStore>) -> Router {
    Router::new()
        .route("/api/upload", post(upload::handle_upload))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(store)
}

/// 绑定地址并运行上传服务，直到进程退出
pub async fn run_server(config: ServerConfig) -> Result<(), AppError> {
    let store = Arc::new(UploadStore::new(config.upload_dir.clone()));
    // 启动时预创建目录；每次请求落盘前仍会兜底创建
    store.ensure_dir()?;
    let router = build_router(store);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("绑定 '{}' 失败: {}", config.bind_addr, e)))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::Server(format!("读取监听地址失败: {}", e)))?;
    log::info!(
        "🌐 上传服务已启动 - http://{} (存储目录 {})",
        local_addr,
        config.upload_dir.display()
    );

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Server(format!("服务运行异常: {}", e)))
}
