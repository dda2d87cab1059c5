//! # 流水线错误类型
//!
//! ## 设计思路
//! - 错误分两类：校验类错误携带固定的用户可见提示（由服务写入错误槽），
//!   其余错误只进日志，预览保持上一次成功绘制的状态；
//! - 每个阶段一个变体，定位问题时从错误前缀即可看出挂在哪一步。

use thiserror::Error;

use super::validate::{FILE_TOO_LARGE_MESSAGE, INVALID_TYPE_MESSAGE};

/// 图片预览流水线错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 声明类型或魔数签名不在允许集合内
    #[error("类型校验失败：{0}")]
    InvalidType(String),

    /// 文件大小超过上限
    #[error("大小校验失败：{0}")]
    FileTooLarge(String),

    /// 配置参数超出合法范围
    #[error("配置无效：{0}")]
    InvalidConfig(String),

    /// 图片格式识别或解码失败
    #[error("解码错误：{0}")]
    Decode(String),

    /// 像素预算、锁状态等资源限制
    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 视觉引擎初始化或执行失败
    #[error("引擎错误：{0}")]
    Engine(String),

    /// 画布为空或像素缓冲与尺寸不一致
    #[error("画布错误：{0}")]
    Canvas(String),

    /// 上传请求构建或发送失败
    #[error("上传错误：{0}")]
    Upload(String),

    /// 本地文件读写失败
    #[error("文件系统错误：{0}")]
    FileSystem(String),
}

impl PipelineError {
    /// 校验类错误对应的用户可见提示；其余错误返回 `None`，只进日志
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::InvalidType(_) => Some(INVALID_TYPE_MESSAGE),
            Self::FileTooLarge(_) => Some(FILE_TOO_LARGE_MESSAGE),
            _ => None,
        }
    }
}
