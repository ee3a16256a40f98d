//! webrtc-rs 桥接模块
//!
//! 将 [`SettingEngine`] 转换为 webrtc-rs 的 `SettingEngine`，
//! 用于构建真实的 WebRTC API

use crate::config::Config;
use crate::engine::{NatMapping, NetworkType, SettingEngine};
use anyhow::{anyhow, Result};
use webrtc::api::setting_engine::SettingEngine as RtcSettingEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice::network_type::NetworkType as RtcNetworkType;
use webrtc::ice_transport::ice_candidate_type::RTCIceCandidateType;

fn to_rtc_network_type(network_type: NetworkType) -> RtcNetworkType {
    match network_type {
        NetworkType::Unspecified => RtcNetworkType::Unspecified,
        NetworkType::Udp4 => RtcNetworkType::Udp4,
        NetworkType::Udp6 => RtcNetworkType::Udp6,
        NetworkType::Tcp4 => RtcNetworkType::Tcp4,
        NetworkType::Tcp6 => RtcNetworkType::Tcp6,
    }
}

/// 将静态映射表转换为 webrtc-rs 的 1:1 NAT IP 列表 ("external/local")
///
/// webrtc-rs 只支持按 IP 改写，带协议过滤或端口改写的映射无法表达，返回 None
pub fn nat_1to1_ips(mappings: &[NatMapping]) -> Option<Vec<String>> {
    if mappings.is_empty() {
        return None;
    }
    if mappings
        .iter()
        .any(|m| m.network.is_some() || m.external_port.is_some())
    {
        return None;
    }
    Some(
        mappings
            .iter()
            .map(|m| format!("{}/{}", m.external_ip, m.local_ip))
            .collect(),
    )
}

/// 转换为 webrtc-rs SettingEngine
///
/// 连接超时映射为 ICE failed 超时。webrtc-rs 没有逐候选改写的钩子，
/// 因此自定义 NAT 规则不会生效，只记录警告。
pub fn to_webrtc_setting_engine(settings: &SettingEngine) -> Result<RtcSettingEngine> {
    convert(settings, None)
}

/// 从配置文件转换为 webrtc-rs SettingEngine
///
/// 配置中的静态 `nat_1to1` 映射会转换为 webrtc-rs 的 1:1 NAT IP
pub fn to_webrtc_setting_engine_from_config(config: &Config) -> Result<RtcSettingEngine> {
    let settings = config.into_setting_engine()?;
    convert(&settings, nat_1to1_ips(&config.candidates.nat_1to1))
}

fn convert(settings: &SettingEngine, nat_ips: Option<Vec<String>>) -> Result<RtcSettingEngine> {
    let mut rtc = RtcSettingEngine::default();

    let (port_min, port_max) = settings.ephemeral_udp_port_range();
    if (port_min, port_max) != (0, 0) {
        rtc.set_ephemeral_udp_port_range(port_min, port_max)
            .map_err(|e| anyhow!("设置临时端口范围失败: {:?}", e))?;
    }

    if settings.data_channels_detached() {
        rtc.detach_data_channels();
    }

    if settings.ice_connection_timeout().is_some() || settings.ice_keepalive_interval().is_some() {
        rtc.set_ice_timeouts(
            None,
            settings.ice_connection_timeout(),
            settings.ice_keepalive_interval(),
        );
    }

    if !settings.network_types().is_empty() {
        rtc.set_network_types(
            settings
                .network_types()
                .iter()
                .copied()
                .map(to_rtc_network_type)
                .collect(),
        );
    }

    match nat_ips {
        Some(ips) => {
            tracing::debug!("设置 1:1 NAT IP: {:?}", ips);
            rtc.set_nat_1to1_ips(ips, RTCIceCandidateType::Host);
        }
        None if settings.local_nat_rule().is_some() => {
            tracing::warn!("webrtc-rs 不支持自定义 NAT 改写规则，已忽略");
        }
        None => {}
    }

    tracing::info!("webrtc-rs SettingEngine 构建完成");
    Ok(rtc)
}

/// 使用 SettingEngine 构建 WebRTC API
pub fn build_api(settings: &SettingEngine) -> Result<API> {
    let rtc = to_webrtc_setting_engine(settings)?;
    Ok(APIBuilder::new().with_setting_engine(rtc).build())
}

/// 使用配置文件构建 WebRTC API
pub fn build_api_from_config(config: &Config) -> Result<API> {
    let rtc = to_webrtc_setting_engine_from_config(config)?;
    Ok(APIBuilder::new().with_setting_engine(rtc).build())
}
