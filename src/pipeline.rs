//! # 客户端预览流水线
//!
//! ## 设计思路
//! - 一条流水线，按配置参数化变换策略（仅缩放 / 先灰度再缩放），
//!   不维护并行副本；
//! - 校验同步执行并维护错误槽，解码与变换走阻塞线程池；
//! - 画布是单写入者模型：整幅重绘，后写覆盖先写；
//! - 上传是处理的旁路，失败只记日志，不影响预览。
//!
//! ## 调用链
//!
//! ```text
//! SelectedFile
//!   └─ PreviewService::process_selection
//!        ├─ validate       同步校验 + 错误槽
//!        ├─ EngineGate     引擎的一次性就绪信号
//!        ├─ transform      解码 + 缩放/灰度（阻塞线程池）
//!        ├─ DisplaySurface 单写入者画布，整幅重绘
//!        └─ Uploader       可选 multipart 上传，尽力而为
//! ```

mod canvas;
mod config;
mod engine;
mod error;
mod service;
mod source;
mod transform;
mod uploader;
mod validate;

pub use canvas::DisplaySurface;
pub use config::{DEFAULT_ACCEPTED_TYPES, PipelineConfig, TransformVariant};
pub use error::PipelineError;
pub use service::{PreviewOutcome, PreviewService};
pub use source::{ProcessedBitmap, SelectedFile};

/// 处理结果的固定文件名：预览保存与上传 multipart 均使用该名字
pub const PROCESSED_FILE_NAME: &str = "processed_image.jpg";
