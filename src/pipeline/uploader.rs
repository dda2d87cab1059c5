//! # 处理结果上传
//!
//! ## 设计思路
//! - 上传是处理流程的旁路：失败只记日志，永不向调用方冒泡，也不重试；
//! - 所有上传共用一个 HTTP 客户端复用连接池，超时按配置逐请求设置；
//! - 请求体固定为 multipart 表单，字段名 `file`，文件名与预览下载一致。

use std::time::Duration;

use once_cell::sync::Lazy;

use super::PROCESSED_FILE_NAME;
use super::error::PipelineError;

/// 进程内共享的 HTTP 客户端
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// 处理结果上传器
#[derive(Debug, Clone)]
pub(crate) struct Uploader {
    /// 目标端点的完整 URL
    endpoint: String,
    /// 单次请求超时
    timeout: Duration,
}

impl Uploader {
    pub(crate) fn new(endpoint: String, timeout_secs: u64) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 发送一次 multipart 上传
    pub(crate) async fn submit(&self, jpeg: Vec<u8>) -> Result<(), PipelineError> {
        let part = reqwest::multipart::Part::bytes(jpeg)
            .file_name(PROCESSED_FILE_NAME)
            .mime_str("image/jpeg")
            .map_err(|e| PipelineError::Upload(format!("构建上传表单失败: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = HTTP_CLIENT
            .post(&self.endpoint)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Upload(format!("服务端返回 HTTP {}", status)));
        }
        log::info!("📡 处理结果已上传 - {} ({})", self.endpoint, status);
        Ok(())
    }

    /// 尽力而为的上传：失败记日志后吞掉，返回是否成功
    pub(crate) async fn submit_best_effort(&self, jpeg: Vec<u8>) -> bool {
        match self.submit(jpeg).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("⚠️ 上传失败（已忽略，不影响预览）: {err}");
                false
            }
        }
    }
}

/// 把 reqwest 错误按类别映射为可读消息
fn map_send_error(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() {
        PipelineError::Upload(format!("请求超时: {}", err))
    } else if err.is_connect() {
        PipelineError::Upload(format!("连接失败: {}", err))
    } else {
        PipelineError::Upload(format!("网络错误: {}", err))
    }
}
