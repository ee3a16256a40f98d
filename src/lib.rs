//! setting-engine - ICE 行为配置聚合库
//!
//! 收集端口范围、超时、候选过滤、数据通道分离、NAT 改写和日志后端等
//! 非默认参数，交给 agent 构建流程一次性读取

pub mod agent;
pub mod config;
pub mod engine;
pub mod logging;

// webrtc-rs 桥接 (需要 webrtc feature)
#[cfg(feature = "webrtc")]
pub mod webrtc;

pub use agent::AgentConfig;
pub use engine::{NatRule, NetworkType, PortRangeError, SettingEngine};
pub use logging::{Logger, LoggerFactory};
