//! # 预览服务
//!
//! ## 设计思路
//! - 服务持有一次会话的全部状态：配置、引擎门闩、画布与错误槽；
//! - 校验同步完成，解码与变换移交阻塞线程池，原始字节随闭包移动、
//!   解码结束即释放；
//! - 绘制与上传负载的序列化在同一把画布锁内完成，并发运行在锁上
//!   串行化，后绘制者覆盖先绘制者；
//! - 上传失败只记日志，预览结果不受影响。

use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::Instant;

use super::canvas::DisplaySurface;
use super::config::{self, PipelineConfig, TransformVariant};
use super::engine::EngineGate;
use super::error::PipelineError;
use super::source::SelectedFile;
use super::transform;
use super::uploader::Uploader;
use super::validate;

/// 一次处理运行的结果摘要
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    /// 输出位图宽度
    pub width: u32,
    /// 输出位图高度
    pub height: u32,
    /// 本次运行是否成功上传（未配置端点时恒为 false）
    pub uploaded: bool,
}

/// 图片预览服务
///
/// 一个实例对应一块画布。可在多个任务间共享（`&self` 方法全部线程安全），
/// 处理运行在画布锁上串行化。
pub struct PreviewService {
    config: RwLock<PipelineConfig>,
    gate: EngineGate,
    surface: Mutex<DisplaySurface>,
    last_error: Mutex<Option<String>>,
    uploader: Option<Uploader>,
}

impl PreviewService {
    /// 以默认配置创建服务（需要在 tokio 运行时内调用）
    pub fn new() -> Self {
        Self::from_validated(PipelineConfig::default())
    }

    /// 以自定义配置创建服务，配置参数先做范围校验
    pub fn with_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        config::validate_config(&config)?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: PipelineConfig) -> Self {
        let uploader = config
            .upload_endpoint
            .clone()
            .map(|endpoint| Uploader::new(endpoint, config.upload_timeout_secs));
        Self {
            config: RwLock::new(config),
            gate: EngineGate::spawn(),
            surface: Mutex::new(DisplaySurface::new()),
            last_error: Mutex::new(None),
            uploader,
        }
    }

    /// 处理一个选中文件
    ///
    /// 完整流程：校验 → 等待引擎就绪 → 解码 → 变换 → 绘制 → 可选上传。
    ///
    /// # 返回
    /// - `Ok(PreviewOutcome)`：画布已更新为本次结果
    /// - `Err(PipelineError)`：校验失败时错误槽携带用户可见提示；
    ///   其余失败只进日志，画布保持上一状态
    pub async fn process_selection(
        &self,
        file: SelectedFile,
    ) -> Result<PreviewOutcome, PipelineError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();
        let file_name = file.name.clone();
        log::info!(
            "📋 开始处理选中文件 - name={} declared={} size={}B",
            file.name,
            file.declared_type,
            file.size
        );

        // 同步校验：失败写入错误槽并终止，后续解码与网络都不会发生
        let validate_start = Instant::now();
        if let Err(err) = validate::validate_selection(&file, &config) {
            if let Some(message) = err.user_message() {
                self.set_error_slot(message)?;
            }
            log::warn!("🚫 文件校验未通过: {err}");
            return Err(err);
        }
        self.clear_error_slot()?;
        let validate_ms = validate_start.elapsed().as_millis();

        // 等待引擎的一次性就绪信号
        if !self.gate.is_ready() {
            log::info!("⏳ 视觉引擎尚未就绪，等待初始化完成");
        }
        let engine = self.gate.engine().await?;

        // 解码与变换是 CPU 密集操作，移交阻塞线程池；
        // 原始字节随闭包移动，解码完成后立即释放
        let stage_config = config.clone();
        let stage = tokio::task::spawn_blocking(move || {
            let decode_start = Instant::now();
            let decoded = transform::decode_source(&file.bytes, &stage_config)?;
            drop(file);
            let decode_ms = decode_start.elapsed().as_millis();

            let transform_start = Instant::now();
            let bitmap = transform::apply_variant(&engine, &decoded, &stage_config)?;
            let transform_ms = transform_start.elapsed().as_millis();

            Ok::<_, PipelineError>((bitmap, decode_ms, transform_ms))
        })
        .await
        .map_err(|e| PipelineError::Engine(format!("处理任务执行失败: {}", e)))?;

        let (bitmap, decode_ms, transform_ms) = match stage {
            Ok(parts) => parts,
            Err(err) => {
                log::error!("❌ 解码/变换失败（预览保持上一状态）: {err}");
                return Err(err);
            }
        };

        // 单写入者画布：绘制与上传负载的序列化在同一把锁内完成，
        // 上传的内容总是对应一次完整的绘制
        let paint_start = Instant::now();
        let upload_payload = {
            let mut surface = self
                .surface
                .lock()
                .map_err(|_| PipelineError::ResourceLimit("画布锁已中毒".to_string()))?;
            surface.paint(&bitmap);
            if self.uploader.is_some() {
                match surface.to_jpeg(config.jpeg_quality) {
                    Ok(jpeg) => Some(jpeg),
                    Err(err) => {
                        log::warn!("⚠️ 上传负载序列化失败（已忽略）: {err}");
                        None
                    }
                }
            } else {
                None
            }
        };
        let paint_ms = paint_start.elapsed().as_millis();

        // 尽力而为上传：失败不影响预览
        let mut uploaded = false;
        if let (Some(uploader), Some(jpeg)) = (self.uploader.as_ref(), upload_payload) {
            uploaded = uploader.submit_best_effort(jpeg).await;
        }

        log::info!(
            "✅ 预览处理完成 - {} variant={} {}x{} validate={}ms decode={}ms transform={}ms paint={}ms total={}ms",
            file_name,
            config.variant.as_str(),
            bitmap.width,
            bitmap.height,
            validate_ms,
            decode_ms,
            transform_ms,
            paint_ms,
            total_start.elapsed().as_millis()
        );

        Ok(PreviewOutcome {
            width: bitmap.width,
            height: bitmap.height,
            uploaded,
        })
    }

    /// 保存当前画布为 JPEG 预览文件
    pub fn save_preview(&self, path: &Path) -> Result<(), PipelineError> {
        let config = self.config_snapshot()?;
        let surface = self
            .surface
            .lock()
            .map_err(|_| PipelineError::ResourceLimit("画布锁已中毒".to_string()))?;
        surface.save_jpeg(path, config.jpeg_quality)?;
        log::info!("💾 预览已保存 - {}", path.display());
        Ok(())
    }

    /// 导出当前画布的 data URL
    pub fn data_url(&self) -> Result<String, PipelineError> {
        let config = self.config_snapshot()?;
        let surface = self
            .surface
            .lock()
            .map_err(|_| PipelineError::ResourceLimit("画布锁已中毒".to_string()))?;
        surface.to_data_url(config.jpeg_quality)
    }

    /// 当前画布的快照副本
    pub fn surface_snapshot(&self) -> Result<DisplaySurface, PipelineError> {
        Ok(self
            .surface
            .lock()
            .map_err(|_| PipelineError::ResourceLimit("画布锁已中毒".to_string()))?
            .clone())
    }

    /// 错误槽的当前内容；`None` 表示最近一次校验通过或尚未处理过文件
    pub fn last_error(&self) -> Result<Option<String>, PipelineError> {
        Ok(self
            .last_error
            .lock()
            .map_err(|_| PipelineError::ResourceLimit("错误槽锁已中毒".to_string()))?
            .clone())
    }

    /// 切换变换策略（配置字符串：`resize` / `grayscale`）
    pub fn set_transform_variant(&self, value: &str) -> Result<(), PipelineError> {
        let variant = TransformVariant::from_str(value)?;
        let mut config = self
            .config
            .write()
            .map_err(|_| PipelineError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.variant = variant;
        log::info!("⚙️ 变换策略已切换: {}", variant.as_str());
        Ok(())
    }

    /// 当前变换策略的配置字符串
    pub fn transform_variant(&self) -> Result<String, PipelineError> {
        Ok(self.config_snapshot()?.variant.as_str().to_string())
    }

    /// 读取配置快照，保证一次运行内参数一致
    pub fn config_snapshot(&self) -> Result<PipelineConfig, PipelineError> {
        Ok(self
            .config
            .read()
            .map_err(|_| PipelineError::ResourceLimit("配置读取锁已中毒".to_string()))?
            .clone())
    }

    fn set_error_slot(&self, message: &str) -> Result<(), PipelineError> {
        let mut slot = self
            .last_error
            .lock()
            .map_err(|_| PipelineError::ResourceLimit("错误槽锁已中毒".to_string()))?;
        *slot = Some(message.to_string());
        Ok(())
    }

    fn clear_error_slot(&self) -> Result<(), PipelineError> {
        let mut slot = self
            .last_error
            .lock()
            .map_err(|_| PipelineError::ResourceLimit("错误槽锁已中毒".to_string()))?;
        *slot = None;
        Ok(())
    }
}
