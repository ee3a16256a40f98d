//! CLI argument definitions for setting-engine
//!
//! This module contains all command-line argument parsing logic.

use clap::{Parser, Subcommand};
use std::net::IpAddr;

/// setting-engine - 命令行参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径
    #[arg(short, long, global = true, env = "SETTING_ENGINE_CONFIG")]
    pub config: Option<String>,

    /// 日志级别 (0=warn, 1=info, 2=debug, 3=trace)
    #[arg(short, long, global = true)]
    pub verbose: Option<u8>,
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 显示 agent 最终使用的配置
    Show {
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },

    /// 校验配置文件
    Check,

    /// 规划 host 候选 (应用网络类型过滤和 NAT 改写)
    Plan {
        /// 本地 IP 地址，可重复指定
        #[arg(long = "ip", required = true)]
        ips: Vec<IpAddr>,

        /// 本地端口 (默认取端口范围下限)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// 生成配置文件
    Init {
        /// 配置文件路径
        #[arg(short, long)]
        path: Option<String>,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },

    /// 使用 webrtc-rs 构建 API 验证配置
    #[cfg(feature = "webrtc")]
    Webrtc,
}
