//! setting-engine - ICE 行为配置工具
//!
//! 主入口程序

mod cli;

use anyhow::{anyhow, Result};
use clap::Parser;
use cli::{Args, Commands};
use setting_engine::agent::{AgentConfig, PortAllocation};
use setting_engine::config::{self, Config, ConfigSource, LoadedSettings};
use setting_engine::logging::init_logging;
use setting_engine::SettingEngine;
use std::path::Path;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    let config_path = Config::get_config_path(args.config.as_deref());

    match args.command {
        Commands::Init { path, force } => {
            init_logging(args.verbose, "info");
            write_default_config(&path.unwrap_or(config_path), force)
        }
        Commands::Show { json } => {
            let loaded = load(&config_path, args.verbose)?;
            show(&loaded.engine, json)
        }
        Commands::Check => {
            let loaded = load(&config_path, args.verbose)?;
            let agent = AgentConfig::from_settings(&loaded.engine);
            match loaded.source {
                ConfigSource::File => {
                    println!("OK: {} (端口分配: {})", config_path, agent.port_allocation)
                }
                ConfigSource::Default => println!(
                    "OK: 未找到 {}, 使用默认配置 (端口分配: {})",
                    config_path, agent.port_allocation
                ),
            }
            Ok(())
        }
        Commands::Plan { ips, port } => {
            let loaded = load(&config_path, args.verbose)?;
            plan(&loaded.engine, &ips, port)
        }
        #[cfg(feature = "webrtc")]
        Commands::Webrtc => {
            let loaded = load(&config_path, args.verbose)?;
            setting_engine::webrtc::build_api_from_config(&loaded.config)?;
            println!("webrtc-rs API 构建成功");
            Ok(())
        }
    }
}

/// 加载配置文件并初始化日志
///
/// 日志初始化之后再提示配置来源，避免提示丢失
fn load(config_path: &str, verbose: Option<u8>) -> Result<LoadedSettings> {
    let loaded = config::load_settings(config_path)?;
    init_logging(verbose, &loaded.config.logging.level);

    match loaded.source {
        ConfigSource::File => info!("配置加载成功: {}", config_path),
        ConfigSource::Default => warn!("配置文件不存在: {}, 使用默认配置", config_path),
    }
    Ok(loaded)
}

/// 显示解析后的配置
fn show(engine: &SettingEngine, json: bool) -> Result<()> {
    let agent = AgentConfig::from_settings(engine);

    if json {
        println!("{}", serde_json::to_string_pretty(&agent)?);
        return Ok(());
    }

    let source = |overridden: bool| if overridden { "显式设置" } else { "默认值" };

    println!("端口分配:     {}", agent.port_allocation);
    println!(
        "连接超时:     {:?} ({})",
        agent.connection_timeout.value,
        source(agent.connection_timeout.overridden)
    );
    println!(
        "保活间隔:     {:?} ({})",
        agent.keepalive_interval.value,
        source(agent.keepalive_interval.overridden)
    );
    let types: Vec<String> = agent.network_types.iter().map(|t| t.to_string()).collect();
    println!("网络类型:     {}", types.join(", "));
    println!("数据通道交付: {:?}", agent.data_channel_delivery);
    println!("NAT 改写:     {}", if agent.nat_rewrite { "启用" } else { "无" });
    Ok(())
}

/// 打印 host 候选规划
fn plan(engine: &SettingEngine, ips: &[std::net::IpAddr], port: Option<u16>) -> Result<()> {
    let agent = AgentConfig::from_settings(engine);

    let port = match (port, agent.port_allocation) {
        (Some(p), _) => p,
        (None, PortAllocation::Range { min, .. }) => min,
        (None, PortAllocation::System) => 0,
    };

    let candidates = agent.plan_host_candidates(ips, port);
    if candidates.is_empty() {
        return Err(anyhow!("没有可用的 host 候选 (检查网络类型过滤和 IP 协议族)"));
    }

    for c in &candidates {
        if c.local == c.advertised {
            println!("{:<5} {}", c.network_type, c.local);
        } else {
            println!("{:<5} {} -> {}", c.network_type, c.local, c.advertised);
        }
    }
    Ok(())
}

/// 写入默认配置文件
fn write_default_config(path: &str, force: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        return Err(anyhow!("配置文件已存在: {} (使用 --force 覆盖)", path));
    }

    std::fs::write(path, config::default_config_template())?;
    println!("配置文件已生成: {}", path);
    Ok(())
}
