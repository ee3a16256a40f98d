//! SettingEngine 模块
//!
//! 汇集 WebRTC 标准 API 之外的 ICE 行为调优参数，
//! 填充完成后交给 agent 构建流程一次性读取

pub mod nat_rule;
pub mod network_type;

pub use nat_rule::{nat_rule, static_nat_rule, NatMapping, NatRule};
pub use network_type::{NetworkType, ParseNetworkTypeError, SUPPORTED_NETWORK_TYPES};

use crate::logging::LoggerFactory;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 端口范围错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PortRangeError {
    #[error("max below min (min={min}, max={max})")]
    MaxBelowMin { min: u16, max: u16 },
}

/// 临时 UDP 端口范围，(0, 0) 表示由系统分配
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EphemeralUdp {
    port_min: u16,
    port_max: u16,
}

#[derive(Debug, Clone, Copy, Default)]
struct Detach {
    data_channels: bool,
}

/// None 表示使用 agent 默认值，Some(ZERO) 是显式设置
#[derive(Debug, Clone, Copy, Default)]
struct Timeout {
    ice_connection: Option<Duration>,
    ice_keepalive: Option<Duration>,
}

#[derive(Clone, Default)]
struct Candidates {
    ice_network_types: Vec<NetworkType>,
    local_nat_rule: Option<NatRule>,
}

/// ICE 行为配置聚合器
///
/// 只在构建阶段由单个所有者顺序调用 setter，之后以 `&SettingEngine`
/// 交给 agent 构建流程，内部不做任何同步。
#[derive(Clone, Default)]
pub struct SettingEngine {
    ephemeral_udp: EphemeralUdp,
    detach: Detach,
    timeout: Timeout,
    candidates: Candidates,
    logger_factory: Option<Arc<dyn LoggerFactory>>,
}

impl SettingEngine {
    /// 创建空配置，所有字段均为未设置
    pub fn new() -> Self {
        Self::default()
    }

    /// 启用数据通道分离模式
    ///
    /// 启用后数据通道需要在 OnOpen 回调中显式 detach 才能使用
    pub fn detach_data_channels(&mut self) {
        self.detach.data_channels = true;
        tracing::debug!("启用数据通道分离模式");
    }

    /// 设置候选对的连接超时和保活间隔
    ///
    /// 两个值同时覆盖 agent 默认值，重复调用时整体替换
    pub fn set_connection_timeout(&mut self, connection_timeout: Duration, keepalive: Duration) {
        self.timeout.ice_connection = Some(connection_timeout);
        self.timeout.ice_keepalive = Some(keepalive);
        tracing::debug!(
            "设置 ICE 超时: connection={:?}, keepalive={:?}",
            connection_timeout,
            keepalive
        );
    }

    /// 限制 ICE UDP 连接可分配的临时端口范围
    ///
    /// 目前只影响 host 候选。`port_max < port_min` 时返回错误且不修改已有范围。
    pub fn set_ephemeral_udp_port_range(
        &mut self,
        port_min: u16,
        port_max: u16,
    ) -> Result<(), PortRangeError> {
        if port_max < port_min {
            tracing::warn!("拒绝无效端口范围: {}-{}", port_min, port_max);
            return Err(PortRangeError::MaxBelowMin {
                min: port_min,
                max: port_max,
            });
        }

        self.ephemeral_udp = EphemeralUdp { port_min, port_max };
        tracing::debug!("设置临时端口范围: {}-{}", port_min, port_max);
        Ok(())
    }

    /// 设置本地和 server reflexive 收集阶段允许的网络类型
    ///
    /// 整体替换之前的列表，空列表表示不限制
    pub fn set_network_types(&mut self, candidate_types: Vec<NetworkType>) {
        tracing::debug!("设置候选网络类型: {:?}", candidate_types);
        self.candidates.ice_network_types = candidate_types;
    }

    /// 设置本地 NAT 改写规则，None 清除已有规则
    pub fn set_local_nat_rule(&mut self, rule: Option<NatRule>) {
        tracing::debug!("NAT 改写规则: {}", if rule.is_some() { "已设置" } else { "已清除" });
        self.candidates.local_nat_rule = rule;
    }

    /// 设置日志器工厂
    pub fn set_logger_factory(&mut self, factory: Arc<dyn LoggerFactory>) {
        self.logger_factory = Some(factory);
    }

    /// 清除日志器工厂，恢复默认日志
    pub fn clear_logger_factory(&mut self) {
        self.logger_factory = None;
    }

    /// 临时端口范围 (port_min, port_max)
    pub fn ephemeral_udp_port_range(&self) -> (u16, u16) {
        (self.ephemeral_udp.port_min, self.ephemeral_udp.port_max)
    }

    pub fn data_channels_detached(&self) -> bool {
        self.detach.data_channels
    }

    pub fn ice_connection_timeout(&self) -> Option<Duration> {
        self.timeout.ice_connection
    }

    pub fn ice_keepalive_interval(&self) -> Option<Duration> {
        self.timeout.ice_keepalive
    }

    pub fn network_types(&self) -> &[NetworkType] {
        &self.candidates.ice_network_types
    }

    pub fn local_nat_rule(&self) -> Option<&NatRule> {
        self.candidates.local_nat_rule.as_ref()
    }

    pub fn logger_factory(&self) -> Option<&Arc<dyn LoggerFactory>> {
        self.logger_factory.as_ref()
    }
}

impl fmt::Debug for SettingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingEngine")
            .field("ephemeral_udp", &self.ephemeral_udp)
            .field("detach", &self.detach)
            .field("timeout", &self.timeout)
            .field("ice_network_types", &self.candidates.ice_network_types)
            .field("local_nat_rule", &self.candidates.local_nat_rule.is_some())
            .field("logger_factory", &self.logger_factory.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoopLoggerFactory;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_default_is_unset() {
        let s = SettingEngine::new();
        assert_eq!(s.ephemeral_udp_port_range(), (0, 0));
        assert!(!s.data_channels_detached());
        assert!(s.ice_connection_timeout().is_none());
        assert!(s.ice_keepalive_interval().is_none());
        assert!(s.network_types().is_empty());
        assert!(s.local_nat_rule().is_none());
        assert!(s.logger_factory().is_none());
    }

    #[test]
    fn test_port_range_valid() {
        let mut s = SettingEngine::new();
        for (min, max) in [(0, 0), (5000, 5000), (9999, 10000), (1, u16::MAX)] {
            s.set_ephemeral_udp_port_range(min, max).unwrap();
            assert_eq!(s.ephemeral_udp_port_range(), (min, max));
        }
    }

    #[test]
    fn test_port_range_rejected_keeps_previous() {
        let mut s = SettingEngine::new();
        s.set_ephemeral_udp_port_range(9999, 10000).unwrap();

        let err = s.set_ephemeral_udp_port_range(10000, 9999).unwrap_err();
        assert_eq!(err, PortRangeError::MaxBelowMin { min: 10000, max: 9999 });
        assert!(err.to_string().contains("max below min"));
        assert_eq!(s.ephemeral_udp_port_range(), (9999, 10000));

        assert!(s.set_ephemeral_udp_port_range(1, 0).is_err());
        assert_eq!(s.ephemeral_udp_port_range(), (9999, 10000));
    }

    #[test]
    fn test_connection_timeout_last_write_wins() {
        let mut s = SettingEngine::new();
        s.set_connection_timeout(Duration::from_secs(5), Duration::from_secs(1));
        s.set_connection_timeout(Duration::from_secs(20), Duration::from_millis(500));

        assert_eq!(s.ice_connection_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(s.ice_keepalive_interval(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_zero_timeout_is_present() {
        let mut s = SettingEngine::new();
        assert_eq!(s.ice_connection_timeout(), None);

        s.set_connection_timeout(Duration::ZERO, Duration::ZERO);
        assert_eq!(s.ice_connection_timeout(), Some(Duration::ZERO));
        assert_eq!(s.ice_keepalive_interval(), Some(Duration::ZERO));
    }

    #[test]
    fn test_network_types_replaced() {
        let mut s = SettingEngine::new();
        s.set_network_types(vec![NetworkType::Udp4, NetworkType::Tcp4]);
        s.set_network_types(vec![NetworkType::Udp6]);
        assert_eq!(s.network_types(), &[NetworkType::Udp6]);

        s.set_network_types(vec![]);
        assert!(s.network_types().is_empty());
    }

    #[test]
    fn test_detach_idempotent() {
        let mut s = SettingEngine::new();
        s.detach_data_channels();
        s.detach_data_channels();
        assert!(s.data_channels_detached());
    }

    #[test]
    fn test_nat_rule_set_and_clear() {
        let mut s = SettingEngine::new();
        let public = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
        s.set_local_nat_rule(Some(nat_rule(move |_, _, port| (public, port))));

        let rule = s.local_nat_rule().unwrap();
        assert_eq!(rule("udp", IpAddr::V4(Ipv4Addr::LOCALHOST), 4000), (public, 4000));

        s.set_local_nat_rule(None);
        assert!(s.local_nat_rule().is_none());
    }

    #[test]
    fn test_logger_factory_set_and_clear() {
        let mut s = SettingEngine::new();
        s.set_logger_factory(Arc::new(NoopLoggerFactory));
        assert!(s.logger_factory().is_some());
        s.clear_logger_factory();
        assert!(s.logger_factory().is_none());
    }

    #[test]
    fn test_debug_hides_closure() {
        let mut s = SettingEngine::new();
        s.set_local_nat_rule(Some(nat_rule(|_, ip, port| (ip, port))));
        let dbg = format!("{:?}", s);
        assert!(dbg.contains("local_nat_rule: true"));
    }
}
