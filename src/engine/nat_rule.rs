//! NAT 地址改写规则
//!
//! 将本地绑定的候选地址改写为对外公布的地址，适用于容器或局域网 NAT 场景

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

/// NAT 改写规则
///
/// 参数依次为小写的传输协议标记 (`"udp"` / `"tcp"`)、本地 IP、本地端口，
/// 返回对外公布的 IP 和端口。
///
/// agent 可能在多个候选收集路径上并发调用同一个规则，因此必须是
/// `Send + Sync` 的纯函数，结果不能依赖调用顺序。
pub type NatRule = Arc<dyn Fn(&str, IpAddr, u16) -> (IpAddr, u16) + Send + Sync>;

/// 从闭包创建 NAT 规则
pub fn nat_rule<F>(f: F) -> NatRule
where
    F: Fn(&str, IpAddr, u16) -> (IpAddr, u16) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 静态 1:1 地址映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatMapping {
    /// 本地绑定 IP
    pub local_ip: IpAddr,
    /// 对外公布的 IP
    pub external_ip: IpAddr,
    /// 仅匹配该传输协议 ("udp" / "tcp")，None = 全部
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// 对外公布的端口，None = 保持本地端口
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_port: Option<u16>,
}

impl NatMapping {
    fn matches(&self, network: &str, local_ip: &IpAddr) -> bool {
        if self.local_ip != *local_ip {
            return false;
        }
        match &self.network {
            Some(n) => n.eq_ignore_ascii_case(network),
            None => true,
        }
    }
}

/// 根据静态映射表构建 NAT 规则
///
/// 按顺序取第一条匹配的映射；没有匹配时原样返回本地地址。
pub fn static_nat_rule(mappings: Vec<NatMapping>) -> NatRule {
    let mappings: Arc<[NatMapping]> = mappings.into();
    Arc::new(move |network: &str, local_ip: IpAddr, local_port: u16| {
        mappings
            .iter()
            .find(|m| m.matches(network, &local_ip))
            .map(|m| (m.external_ip, m.external_port.unwrap_or(local_port)))
            .unwrap_or((local_ip, local_port))
    })
}
