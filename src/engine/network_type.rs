//! 候选网络类型
//!
//! ICE 候选地址所属的传输协议与 IP 协议族

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// 候选网络类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// 未指定 (由 agent 决定如何处理)
    Unspecified,
    /// UDP over IPv4
    Udp4,
    /// UDP over IPv6
    Udp6,
    /// TCP over IPv4
    Tcp4,
    /// TCP over IPv6
    Tcp6,
}

/// agent 支持的全部网络类型 (过滤器为空时使用)
pub const SUPPORTED_NETWORK_TYPES: [NetworkType; 4] = [
    NetworkType::Udp4,
    NetworkType::Udp6,
    NetworkType::Tcp4,
    NetworkType::Tcp6,
];

impl NetworkType {
    /// 小写的传输协议标记，传给 NAT 规则: "udp" 或 "tcp"
    pub fn network_short(&self) -> &'static str {
        if self.is_udp() {
            "udp"
        } else if self.is_tcp() {
            "tcp"
        } else {
            ""
        }
    }

    pub fn is_udp(&self) -> bool {
        matches!(self, NetworkType::Udp4 | NetworkType::Udp6)
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, NetworkType::Tcp4 | NetworkType::Tcp6)
    }

    pub fn is_ipv4(&self) -> bool {
        matches!(self, NetworkType::Udp4 | NetworkType::Tcp4)
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self, NetworkType::Udp6 | NetworkType::Tcp6)
    }

    /// 地址协议族是否与该网络类型一致
    pub fn matches_ip(&self, ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(_) => self.is_ipv4(),
            IpAddr::V6(_) => self.is_ipv6(),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkType::Unspecified => "unspecified",
            NetworkType::Udp4 => "udp4",
            NetworkType::Udp6 => "udp6",
            NetworkType::Tcp4 => "tcp4",
            NetworkType::Tcp6 => "tcp6",
        };
        f.pad(s)
    }
}

/// 网络类型解析错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown network type: {0}")]
pub struct ParseNetworkTypeError(pub String);

impl FromStr for NetworkType {
    type Err = ParseNetworkTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp4" => Ok(NetworkType::Udp4),
            "udp6" => Ok(NetworkType::Udp6),
            "tcp4" => Ok(NetworkType::Tcp4),
            "tcp6" => Ok(NetworkType::Tcp6),
            "unspecified" => Ok(NetworkType::Unspecified),
            _ => Err(ParseNetworkTypeError(s.to_string())),
        }
    }
}
