//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 客户端流水线内部使用更细粒度的 [`PipelineError`]，
//! 在 CLI / 服务边界统一提升为 `AppError`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `PipelineError` 与 `std::io::Error` 提供 `From` 转换，无需手动 map。

use crate::pipeline::PipelineError;

/// 应用级统一错误类型
///
/// CLI 入口与上传服务均返回此类型，确保日志与退出信息格式一致。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 客户端流水线错误（校验 / 解码 / 变换 / 上传）
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 上传存储目录或落盘操作失败
    #[error("存储错误: {0}")]
    Storage(String),

    /// 上传服务绑定或运行失败
    #[error("服务错误: {0}")]
    Server(String),
}
