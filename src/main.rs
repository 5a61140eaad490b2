//! # baton-aruba-central 命令行
//!
//! - `validate`：获取令牌并做一次连通性检查
//! - `sync`：完整同步，输出 JSON
//! - `metadata`：连接器元数据

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use baton_aruba_central::{
    Connector, ConnectorError, Result,
    config::load_config,
    connector::{Annotation, METADATA},
    error::ErrorCategory,
    lerror, linfo,
    logging::{self, LogComponent, LogHandle, LogStage},
    lwarn,
};

/// Aruba Central 用户、角色与分组同步
#[derive(Parser)]
#[command(name = "baton-aruba-central")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML 配置文件；不指定时只使用 BATON_* 环境变量
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别（RUST_LOG 优先）
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 验证凭据与连通性
    Validate,

    /// 完整同步并输出资源、权益与授权
    Sync {
        /// 输出文件，默认标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 显示连接器元数据
    Metadata,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_handle = logging::init_logging(cli.log_level.as_deref());

    if let Err(e) = run(cli, log_handle.as_ref()).await {
        match e.category() {
            ErrorCategory::Client => lwarn!(
                "system",
                LogStage::Error,
                LogComponent::Main,
                "command_rejected",
                &format!("配置或输入有误: {e}")
            ),
            ErrorCategory::Server => lerror!(
                "system",
                LogStage::Error,
                LogComponent::Main,
                "command_failed",
                &format!("执行失败: {e}")
            ),
        }
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, log_handle: Option<&LogHandle>) -> Result<()> {
    if let Commands::Metadata = cli.command {
        return print_json(&METADATA, None);
    }

    let config = load_config(cli.config.as_deref())?;
    // 命令行未指定级别时，使用配置文件/环境变量中的级别
    if cli.log_level.is_none() {
        if let Some(handle) = log_handle {
            handle.set_level(&config.logging.level)?;
        }
    }

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "startup",
        &format!("{} 启动, 网关 {}", METADATA.display_name, config.aruba.base_host)
    );

    let connector = Connector::new(&config).await?;

    match cli.command {
        Commands::Validate => {
            let annotations = connector.validate().await?;
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Main,
                "validated",
                "凭据验证通过"
            );
            for annotation in &annotations {
                if let Annotation::RateLimit(snapshot) = annotation {
                    println!(
                        "rate limit: {:?} {}/{} reset at {}",
                        snapshot.status, snapshot.remaining, snapshot.limit, snapshot.reset_at
                    );
                }
            }
            println!("ok");
            Ok(())
        }
        Commands::Sync { output } => {
            let snapshot = connector.sync_all().await?;
            print_json(&snapshot, output.as_deref())
        }
        Commands::Metadata => print_json(&connector.metadata(), None),
    }
}

fn print_json<T: serde::Serialize>(value: &T, output: Option<&std::path::Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| ConnectorError::internal_with_source("failed to render output", e))?;

    match output {
        Some(path) => std::fs::write(path, rendered).map_err(|e| {
            ConnectorError::internal_with_source(format!("写入输出文件失败: {}", path.display()), e)
        }),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
