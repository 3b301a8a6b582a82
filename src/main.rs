//! rsmmdetect 命令行入口
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use rsmmdetect::{
    ConfigManager, DetectorConfig, EncodingDetector, FileRuleLoader, NoopRuleLoader, RuleLoader, SnapshotRuleLoader,
};

#[derive(Parser, Debug)]
#[command(name = "rsmmdetect", version, about = "Detect legacy / standard Myanmar text encoding")]
struct Cli {
    /// 待检测文本（缺省时从标准输入读取）
    text: Vec<String>,

    /// JSON 规则定义文件
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// 远程 JSON 规则定义 URL
    #[cfg(feature = "remote-loader")]
    #[arg(long, conflicts_with = "rules")]
    remote: Option<String>,

    /// 本地 MessagePack 规则快照（优先读取，缺失时回写）
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// 按片段分别检测混合文本
    #[arg(short, long)]
    segments: bool,

    /// 格式化输出 JSON
    #[arg(short, long)]
    pretty: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let mut builder = ConfigManager::custom().verbose(cli.verbose);
    if let Some(path) = &cli.rules {
        builder = builder.rule_path(path);
    }
    if let Some(path) = &cli.snapshot {
        builder = builder.snapshot_path(path);
    }
    let config = builder.build();

    let loader = build_loader(&cli, &config)?;
    let detector = EncodingDetector::new(loader, config);

    let text = if cli.text.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read text from stdin")?;
        buf
    } else {
        cli.text.join(" ")
    };

    if cli.segments {
        let mixed = detector.detect_segments(&text).await?;
        print_json(&mixed, cli.pretty)?;
    } else {
        let verdict = detector.detect(&text).await?;
        print_json(&verdict, cli.pretty)?;
    }

    Ok(())
}

fn build_loader(cli: &Cli, config: &DetectorConfig) -> Result<Arc<dyn RuleLoader>> {
    if let Some(remote) = remote_loader(cli, config)? {
        return Ok(remote);
    }

    let loader: Arc<dyn RuleLoader> = match &config.rule_path {
        Some(path) => wrap_snapshot(FileRuleLoader::new(path), config),
        None => Arc::new(NoopRuleLoader),
    };
    Ok(loader)
}

#[cfg(feature = "remote-loader")]
fn remote_loader(cli: &Cli, config: &DetectorConfig) -> Result<Option<Arc<dyn RuleLoader>>> {
    let Some(url) = &cli.remote else {
        return Ok(None);
    };
    let remote = rsmmdetect::RemoteRuleLoader::new(url, config.http_timeout)?;
    Ok(Some(wrap_snapshot(remote, config)))
}

#[cfg(not(feature = "remote-loader"))]
fn remote_loader(_cli: &Cli, _config: &DetectorConfig) -> Result<Option<Arc<dyn RuleLoader>>> {
    Ok(None)
}

fn wrap_snapshot<L: RuleLoader + 'static>(loader: L, config: &DetectorConfig) -> Arc<dyn RuleLoader> {
    if config.use_snapshot {
        Arc::new(SnapshotRuleLoader::new(loader, &config.snapshot_path))
    } else {
        Arc::new(loader)
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
