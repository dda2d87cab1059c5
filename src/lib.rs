//! # 图片上传与预览工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     CLI (clap 子命令)                     │
//! │                                                          │
//! │     process ── 处理本地图片            serve ── 上传端点  │
//! └────────┼──────────────────────────────────┼──────────────┘
//!          ↕                                  ↕
//! ┌────────┼──────────────────────────────────┼──────────────┐
//! │        ↕           库 (Rust)              ↕              │
//! │                                                          │
//! │  ┌─ error ───── AppError (统一错误类型)                   │
//! │  │                                                       │
//! │  ├─ pipeline ── 客户端预览流水线                          │
//! │  │   ├─ validate   声明类型/大小/魔数签名 + 错误槽        │
//! │  │   ├─ engine     缩放内核 + 一次性就绪门闩              │
//! │  │   ├─ transform  解码 + 缩放/灰度（策略由配置选择）     │
//! │  │   ├─ canvas     单写入者画布，JPEG/data URL 导出       │
//! │  │   └─ uploader   multipart 上传，失败只记日志           │
//! │  │                                                       │
//! │  └─ server ──── 上传端点 (axum)                           │
//! │      ├─ upload     POST /api/upload，首个 file 字段胜出   │
//! │      └─ store      净化文件名 + 原子落盘，同名不覆盖      │
//! └──────────────────────────────────────────────────────────┘
//!          │                                  ▲
//!          └────────── multipart POST ────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，CLI 与服务边界的返回类型 |
//! | [`pipeline`] | 校验、解码、缩放/灰度变换、画布绘制与可选上传 |
//! | [`server`] | `POST /api/upload` 端点：multipart 接收与原子落盘 |

pub mod error;
pub mod pipeline;
pub mod server;
