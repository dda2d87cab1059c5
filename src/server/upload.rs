//! # 上传请求处理
//!
//! ## 设计思路
//! - multipart 解析完全交给框架：提取器拒绝与字段读取失败都归入解析失败响应；
//! - 第一个名为 `file` 的字段胜出，其余字段一律读过并丢弃；
//! - 端点不校验类型、大小或内容：信任边界在客户端，这里只负责落盘；
//! - 响应固定为四种 JSON 形态，状态码与消息保持稳定。

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;

use super::store::UploadStore;

/// 成功响应消息
pub(crate) const UPLOAD_OK_MESSAGE: &str = "File uploaded successfully";
/// 缺少文件字段时的响应消息
pub(crate) const NO_FILE_MESSAGE: &str = "No file uploaded.";
/// multipart 解析失败时的响应消息
pub(crate) const PARSE_FAILURE_MESSAGE: &str = "Something went wrong during file upload.";
/// 落盘失败时的响应消息
pub(crate) const PERSIST_FAILURE_MESSAGE: &str = "Failed to save the uploaded file.";

#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn ok_response() -> Response {
    (StatusCode::OK, Json(MessageBody { message: UPLOAD_OK_MESSAGE })).into_response()
}

fn error_response(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

/// `POST /api/upload`
///
/// 保存请求里第一个名为 `file` 的字段，返回文档化的 JSON 响应：
/// - `200 {"message": "File uploaded successfully"}`
/// - `400 {"error": "No file uploaded."}`：没有 `file` 字段
/// - `500 {"error": "Something went wrong during file upload."}`：解析失败（含非 multipart 请求）
/// - `500 {"error": "Failed to save the uploaded file."}`：落盘失败
pub(crate) async fn handle_upload(
    State(store): State<Arc<UploadStore>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    // 非 multipart 请求在提取器阶段即失败，与解析失败走同一响应
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(err) => {
            log::warn!("⚠️ 请求不是 multipart 形式: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, PARSE_FAILURE_MESSAGE);
        }
    };

    let mut selected: Option<(Option<String>, Bytes)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                // 已经有胜出字段，或字段名不是 file：读过即丢
                if selected.is_some() || field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(data) => selected = Some((file_name, data)),
                    Err(err) => {
                        log::warn!("⚠️ 读取上传字段失败: {err}");
                        return error_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            PARSE_FAILURE_MESSAGE,
                        );
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                log::warn!("⚠️ multipart 解析失败: {err}");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, PARSE_FAILURE_MESSAGE);
            }
        }
    }

    let Some((file_name, data)) = selected else {
        log::info!("🚫 请求中没有 file 字段");
        return error_response(StatusCode::BAD_REQUEST, NO_FILE_MESSAGE);
    };

    // 落盘是阻塞 IO，移交阻塞线程池
    let persisted =
        tokio::task::spawn_blocking(move || store.store_bytes(file_name.as_deref(), &data)).await;

    match persisted {
        Ok(Ok(_path)) => ok_response(),
        Ok(Err(err)) => {
            log::error!("❌ 保存上传文件失败: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, PERSIST_FAILURE_MESSAGE)
        }
        Err(err) => {
            log::error!("❌ 落盘任务执行失败: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, PERSIST_FAILURE_MESSAGE)
        }
    }
}
