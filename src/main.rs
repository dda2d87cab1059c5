//! # 图片上传与预览工具 — 应用入口
//!
//! 本文件仅负责参数解析与子命令分发，业务逻辑在 `pipeline` / `server`
//! 模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use image_preview::error::AppError;
use image_preview::pipeline::{
    PROCESSED_FILE_NAME, PipelineConfig, PreviewService, SelectedFile, TransformVariant,
};
use image_preview::server::{ServerConfig, run_server};

#[derive(Parser)]
#[command(name = "image-preview", version, about = "图片上传与预览工具")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 处理一张本地图片：校验、缩放（可选灰度）、保存预览，并可上传
    Process {
        /// 输入图片路径（png / jpg / jpeg，不超过 2MB）
        input: PathBuf,
        /// 变换策略：resize 或 grayscale
        #[arg(long, default_value = "resize", value_parser = parse_variant)]
        variant: TransformVariant,
        /// 预览输出路径
        #[arg(long, default_value = PROCESSED_FILE_NAME)]
        output: PathBuf,
        /// 处理完成后上传到该端点（如 http://127.0.0.1:3000/api/upload）
        #[arg(long)]
        upload: Option<String>,
        /// 额外打印 data URL 形式的预览
        #[arg(long)]
        data_url: bool,
    },
    /// 启动上传端点
    Serve {
        /// 监听地址
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
        /// 上传文件存储目录
        #[arg(long, default_value = "public/upload")]
        upload_dir: PathBuf,
    },
}

fn parse_variant(value: &str) -> Result<TransformVariant, String> {
    TransformVariant::from_str(value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Process {
            input,
            variant,
            output,
            upload,
            data_url,
        } => run_process(input, variant, output, upload, data_url).await,
        Command::Serve { addr, upload_dir } => {
            run_server(ServerConfig {
                bind_addr: addr,
                upload_dir,
            })
            .await
        }
    }
}

async fn run_process(
    input: PathBuf,
    variant: TransformVariant,
    output: PathBuf,
    upload: Option<String>,
    print_data_url: bool,
) -> Result<(), AppError> {
    let config = PipelineConfig {
        variant,
        upload_endpoint: upload,
        ..PipelineConfig::default()
    };
    let service = PreviewService::with_config(config)?;
    let file = SelectedFile::from_path(&input)?;

    match service.process_selection(file).await {
        Ok(outcome) => {
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            service.save_preview(&output)?;
            if print_data_url {
                println!("{}", service.data_url()?);
            }
            println!(
                "已生成预览 {} ({}x{}){}",
                output.display(),
                outcome.width,
                outcome.height,
                if outcome.uploaded { "，并已上传" } else { "" }
            );
            Ok(())
        }
        Err(err) => {
            // 校验失败时错误槽携带用户可见提示，打到 stderr
            if let Ok(Some(message)) = service.last_error() {
                eprintln!("{message}");
            }
            Err(err.into())
        }
    }
}
