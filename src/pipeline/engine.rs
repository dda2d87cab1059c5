//! # 视觉引擎与就绪门闩
//!
//! ## 设计思路
//! - 缩放内核集中在 [`VisionEngine`]，RGBA 与灰度两条路径共用同一套选项；
//!   快速路径失败时回退到通用缩放，保证处理总能完成；
//! - 引擎初始化放在后台执行，结果通过 watch 通道广播一个终态
//!   （`Ready` / `Failed`）；每次处理运行 `await` 这个一次性完成信号，
//!   不轮询，也不会因为引擎未就绪而丢弃本次运行。

use std::sync::Arc;
use std::time::Instant;

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{GrayImage, RgbaImage, imageops};
use tokio::sync::watch;

use super::error::PipelineError;

/// 缩放与颜色变换内核
///
/// 初始化时做一次预热缩放，提前完成指令集选择；之后的调用无额外开销。
#[derive(Debug)]
pub(crate) struct VisionEngine {
    /// 卷积滤波器，对应双线性插值
    filter: fr::FilterType,
}

impl VisionEngine {
    /// 构建引擎并预热一次 RGBA 缩放路径
    pub(crate) fn initialize() -> Result<Self, PipelineError> {
        let engine = Self {
            filter: fr::FilterType::Bilinear,
        };
        let probe = RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]));
        engine.fast_resize_rgba(&probe, 4, 4)?;
        Ok(engine)
    }

    /// 缩放 RGBA 位图到指定尺寸
    ///
    /// 快速路径失败时记一条告警并回退到通用缩放，调用方拿到的结果总是有效。
    pub(crate) fn resize_rgba(&self, src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        match self.fast_resize_rgba(src, width, height) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!("⚠️ 快速缩放失败，回退到通用缩放路径: {err}");
                imageops::resize(src, width, height, FilterType::Triangle)
            }
        }
    }

    /// 缩放单通道灰度位图到指定尺寸
    pub(crate) fn resize_luma(&self, src: &GrayImage, width: u32, height: u32) -> GrayImage {
        match self.fast_resize_luma(src, width, height) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!("⚠️ 灰度快速缩放失败，回退到通用缩放路径: {err}");
                imageops::resize(src, width, height, FilterType::Triangle)
            }
        }
    }

    fn fast_resize_rgba(
        &self,
        src: &RgbaImage,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, PipelineError> {
        let (src_width, src_height) = src.dimensions();
        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.as_raw().clone(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| PipelineError::Engine(format!("构建缩放源图失败: {}", e)))?;

        let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x4);
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(self.filter));
        let mut resizer = fr::Resizer::new();
        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| PipelineError::Engine(format!("执行缩放失败: {}", e)))?;

        RgbaImage::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| PipelineError::Engine("缩放结果缓冲长度异常".to_string()))
    }

    fn fast_resize_luma(
        &self,
        src: &GrayImage,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, PipelineError> {
        let (src_width, src_height) = src.dimensions();
        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.as_raw().clone(),
            fr::PixelType::U8,
        )
        .map_err(|e| PipelineError::Engine(format!("构建灰度源图失败: {}", e)))?;

        let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8);
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(self.filter));
        let mut resizer = fr::Resizer::new();
        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| PipelineError::Engine(format!("执行灰度缩放失败: {}", e)))?;

        GrayImage::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| PipelineError::Engine("灰度缩放结果缓冲长度异常".to_string()))
    }
}

/// 引擎初始化的广播状态
#[derive(Debug, Clone)]
pub(crate) enum EngineState {
    /// 后台初始化进行中
    Loading,
    /// 初始化完成，引擎可用
    Ready(Arc<VisionEngine>),
    /// 初始化失败，所有等待方收到同一原因
    Failed(String),
}

/// 引擎就绪门闩
///
/// 一次初始化，一个终态，任意多个等待方。克隆开销只有一个 watch 接收端。
#[derive(Clone)]
pub(crate) struct EngineGate {
    state_rx: watch::Receiver<EngineState>,
}

impl EngineGate {
    /// 在后台启动引擎初始化并立即返回门闩
    ///
    /// 需要在 tokio 运行时内调用。
    pub(crate) fn spawn() -> Self {
        let (state_tx, state_rx) = watch::channel(EngineState::Loading);
        tokio::spawn(async move {
            let started = Instant::now();
            let state = match tokio::task::spawn_blocking(VisionEngine::initialize).await {
                Ok(Ok(engine)) => {
                    log::info!("🧠 视觉引擎就绪 - 初始化 {}ms", started.elapsed().as_millis());
                    EngineState::Ready(Arc::new(engine))
                }
                Ok(Err(err)) => {
                    log::error!("❌ 视觉引擎初始化失败: {err}");
                    EngineState::Failed(err.to_string())
                }
                Err(err) => {
                    log::error!("❌ 视觉引擎初始化任务异常: {err}");
                    EngineState::Failed(format!("初始化任务异常: {}", err))
                }
            };
            let _ = state_tx.send(state);
        });
        Self { state_rx }
    }

    /// 等待一次性完成信号，返回可用引擎
    ///
    /// 终态在 `await` 之前已经广播时立即返回，不排队不轮询。
    pub(crate) async fn engine(&self) -> Result<Arc<VisionEngine>, PipelineError> {
        let mut state_rx = self.state_rx.clone();
        loop {
            {
                let state = state_rx.borrow_and_update();
                match &*state {
                    EngineState::Ready(engine) => return Ok(Arc::clone(engine)),
                    EngineState::Failed(reason) => {
                        return Err(PipelineError::Engine(format!("引擎不可用: {}", reason)));
                    }
                    EngineState::Loading => {}
                }
            }
            state_rx
                .changed()
                .await
                .map_err(|_| PipelineError::Engine("初始化任务提前退出".to_string()))?;
        }
    }

    /// 非阻塞探测引擎是否就绪
    pub(crate) fn is_ready(&self) -> bool {
        matches!(&*self.state_rx.borrow(), EngineState::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn engine_initializes_and_resizes_rgba() {
        let engine = VisionEngine::initialize().expect("engine init failed");
        let src = gradient_rgba(8, 6);
        let resized = engine.resize_rgba(&src, 4, 3);
        assert_eq!(resized.dimensions(), (4, 3));
        assert_eq!(resized.as_raw().len(), 4 * 3 * 4);
    }

    #[test]
    fn engine_resizes_luma() {
        let engine = VisionEngine::initialize().expect("engine init failed");
        let src = GrayImage::from_fn(10, 10, |x, y| image::Luma([((x * y) % 256) as u8]));
        let resized = engine.resize_luma(&src, 5, 5);
        assert_eq!(resized.dimensions(), (5, 5));
        assert_eq!(resized.as_raw().len(), 25);
    }

    #[test]
    fn engine_upscales_small_sources() {
        let engine = VisionEngine::initialize().expect("engine init failed");
        let src = gradient_rgba(2, 2);
        let resized = engine.resize_rgba(&src, 400, 300);
        assert_eq!(resized.dimensions(), (400, 300));
    }

    #[test]
    fn resize_is_deterministic() {
        let engine = VisionEngine::initialize().expect("engine init failed");
        let src = gradient_rgba(64, 48);
        let first = engine.resize_rgba(&src, 16, 12);
        let second = engine.resize_rgba(&src, 16, 12);
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[tokio::test]
    async fn gate_serves_engine_after_ready() {
        let gate = EngineGate::spawn();
        let engine = gate.engine().await.expect("gate should become ready");
        assert!(gate.is_ready());

        let src = gradient_rgba(4, 4);
        let resized = engine.resize_rgba(&src, 2, 2);
        assert_eq!(resized.dimensions(), (2, 2));
    }

    #[tokio::test]
    async fn gate_broadcasts_to_multiple_waiters() {
        let gate = EngineGate::spawn();
        let (a, b, c) = tokio::join!(gate.engine(), gate.engine(), gate.engine());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
    }

    #[tokio::test]
    async fn gate_returns_terminal_state_immediately_after_ready() {
        let gate = EngineGate::spawn();
        gate.engine().await.expect("first wait failed");
        // 终态已广播，二次等待立即完成
        let engine = tokio::time::timeout(std::time::Duration::from_millis(50), gate.engine())
            .await
            .expect("second wait should not block")
            .expect("second wait failed");
        let src = gradient_rgba(4, 2);
        assert_eq!(engine.resize_rgba(&src, 2, 1).dimensions(), (2, 1));
    }
}
