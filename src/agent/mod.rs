//! Agent 配置解析
//!
//! agent 构建流程对 [`SettingEngine`] 的一次性读取：
//! 未设置的字段回退到内置默认值，已设置的字段原样使用。
//! 本模块不做任何网络 I/O。

use crate::engine::{NatRule, NetworkType, SettingEngine, SUPPORTED_NETWORK_TYPES};
use crate::logging::{Logger, LoggerFactory, TracingLoggerFactory};
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

/// 默认连接超时 (候选对静默多久后视为超时)
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// 默认保活间隔
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// host 候选端口分配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum PortAllocation {
    /// 由系统分配
    System,
    /// 限定在 [min, max] 范围内
    Range { min: u16, max: u16 },
}

impl PortAllocation {
    pub fn contains(&self, port: u16) -> bool {
        match self {
            PortAllocation::System => true,
            PortAllocation::Range { min, max } => (*min..=*max).contains(&port),
        }
    }
}

impl fmt::Display for PortAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortAllocation::System => write!(f, "system"),
            PortAllocation::Range { min, max } => write!(f, "{}-{}", min, max),
        }
    }
}

/// 数据通道交付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChannelDelivery {
    /// 通过 OnOpen/OnMessage 回调交付
    Callback,
    /// 调用方需显式 detach
    Detached,
}

/// 超时取值及其来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedTimeout {
    #[serde(rename = "ms", serialize_with = "serialize_millis")]
    pub value: Duration,
    /// 是否为显式设置 (否则为默认值)
    pub overridden: bool,
}

impl ResolvedTimeout {
    fn resolve(value: Option<Duration>, default: Duration) -> Self {
        match value {
            Some(v) => Self { value: v, overridden: true },
            None => Self { value: default, overridden: false },
        }
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// 计划中的 host 候选
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostCandidate {
    pub network_type: NetworkType,
    /// 本地绑定地址
    pub local: SocketAddr,
    /// 对外公布地址 (经 NAT 规则改写)
    pub advertised: SocketAddr,
}

/// 解析后的 agent 配置
#[derive(Clone, Serialize)]
pub struct AgentConfig {
    pub port_allocation: PortAllocation,
    pub connection_timeout: ResolvedTimeout,
    pub keepalive_interval: ResolvedTimeout,
    /// 实际参与收集的网络类型
    pub network_types: Vec<NetworkType>,
    pub data_channel_delivery: DataChannelDelivery,
    pub nat_rewrite: bool,
    #[serde(skip)]
    nat_rule: Option<NatRule>,
    #[serde(skip)]
    logger_factory: Arc<dyn LoggerFactory>,
}

impl AgentConfig {
    /// 读取 SettingEngine 的全部字段
    pub fn from_settings(settings: &SettingEngine) -> Self {
        let port_allocation = match settings.ephemeral_udp_port_range() {
            (0, 0) => PortAllocation::System,
            (min, max) => PortAllocation::Range { min, max },
        };

        let network_types = resolve_network_types(settings.network_types());

        let data_channel_delivery = if settings.data_channels_detached() {
            DataChannelDelivery::Detached
        } else {
            DataChannelDelivery::Callback
        };

        let logger_factory: Arc<dyn LoggerFactory> = match settings.logger_factory() {
            Some(f) => f.clone(),
            None => Arc::new(TracingLoggerFactory),
        };

        let nat_rule = settings.local_nat_rule().cloned();

        let config = Self {
            port_allocation,
            connection_timeout: ResolvedTimeout::resolve(
                settings.ice_connection_timeout(),
                DEFAULT_CONNECTION_TIMEOUT,
            ),
            keepalive_interval: ResolvedTimeout::resolve(
                settings.ice_keepalive_interval(),
                DEFAULT_KEEPALIVE_INTERVAL,
            ),
            network_types,
            data_channel_delivery,
            nat_rewrite: nat_rule.is_some(),
            nat_rule,
            logger_factory,
        };

        tracing::debug!("agent 配置解析完成: {:?}", config);
        config
    }

    /// 为子组件创建日志器
    pub fn logger(&self, scope: &str) -> Arc<dyn Logger> {
        self.logger_factory.new_logger(scope)
    }

    pub fn port_allowed(&self, port: u16) -> bool {
        self.port_allocation.contains(port)
    }

    pub fn allows(&self, network_type: NetworkType) -> bool {
        self.network_types.contains(&network_type)
    }

    /// 计算本地候选对外公布的地址
    ///
    /// 未设置 NAT 规则时原样返回
    pub fn advertised_addr(&self, network_type: NetworkType, local: SocketAddr) -> SocketAddr {
        match &self.nat_rule {
            Some(rule) => {
                let (ip, port) = rule(network_type.network_short(), local.ip(), local.port());
                SocketAddr::new(ip, port)
            }
            None => local,
        }
    }

    /// 规划 host 候选
    ///
    /// 每个本地 IP 与每个同协议族的允许网络类型组合成一个候选，
    /// NAT 规则对每个组合调用一次
    pub fn plan_host_candidates(&self, local_ips: &[IpAddr], port: u16) -> Vec<HostCandidate> {
        let mut candidates = Vec::new();
        for ip in local_ips {
            for network_type in &self.network_types {
                if !network_type.matches_ip(ip) {
                    continue;
                }
                let local = SocketAddr::new(*ip, port);
                candidates.push(HostCandidate {
                    network_type: *network_type,
                    local,
                    advertised: self.advertised_addr(*network_type, local),
                });
            }
        }

        if !self.port_allowed(port) {
            self.logger("ice")
                .warn(&format!("端口 {} 不在允许范围 {} 内", port, self.port_allocation));
        }

        candidates
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("port_allocation", &self.port_allocation)
            .field("connection_timeout", &self.connection_timeout)
            .field("keepalive_interval", &self.keepalive_interval)
            .field("network_types", &self.network_types)
            .field("data_channel_delivery", &self.data_channel_delivery)
            .field("nat_rewrite", &self.nat_rewrite)
            .finish()
    }
}

/// 空列表 = 全部支持的类型；否则保持顺序去重，丢弃无法识别的类型
fn resolve_network_types(filter: &[NetworkType]) -> Vec<NetworkType> {
    if filter.is_empty() {
        return SUPPORTED_NETWORK_TYPES.to_vec();
    }

    let mut resolved = Vec::with_capacity(filter.len());
    for network_type in filter {
        if *network_type == NetworkType::Unspecified {
            tracing::warn!("忽略未指定的网络类型");
            continue;
        }
        if !resolved.contains(network_type) {
            resolved.push(*network_type);
        }
    }
    resolved
}
