//! 配置管理模块
//!
//! 从 TOML 文件加载 SettingEngine 参数

use crate::engine::{static_nat_rule, NatMapping, NetworkType, SettingEngine};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 配置来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// 从配置文件读取
    File,
    /// 文件不存在，使用默认配置
    Default,
}

/// 加载结果: 配置、来源以及由配置填充的 SettingEngine
#[derive(Debug)]
pub struct LoadedSettings {
    pub config: Config,
    pub source: ConfigSource,
    pub engine: SettingEngine,
}

/// 加载配置文件并构建 SettingEngine
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<LoadedSettings> {
    let (config, source) = Config::load_with_source(path)?;
    let engine = config.into_setting_engine()?;
    Ok(LoadedSettings {
        config,
        source,
        engine,
    })
}

/// 应用程序配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// 临时 UDP 端口范围
    #[serde(default)]
    pub ephemeral_udp: EphemeralUdpConfig,
    /// 数据通道分离
    #[serde(default)]
    pub detach: DetachConfig,
    /// ICE 超时
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// 候选过滤与 NAT 映射
    #[serde(default)]
    pub candidates: CandidatesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 临时端口范围配置 (0 = 不限制)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EphemeralUdpConfig {
    #[serde(default)]
    pub port_min: u16,
    #[serde(default)]
    pub port_max: u16,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DetachConfig {
    /// 是否启用数据通道分离模式
    #[serde(default)]
    pub data_channels: bool,
}

/// 超时配置 (毫秒)，两项必须同时设置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ice_connection_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ice_keepalive_ms: Option<u64>,
}

/// 候选配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CandidatesConfig {
    /// 允许的网络类型: udp4, udp6, tcp4, tcp6 (空 = 全部)
    #[serde(default)]
    pub network_types: Vec<String>,
    /// 静态 1:1 NAT 映射
    #[serde(default)]
    pub nat_1to1: Vec<NatMapping>,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// 从文件加载配置
    ///
    /// 文件不存在时返回默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (config, source) = Self::load_with_source(path)?;
        match source {
            ConfigSource::Default => tracing::warn!("配置文件不存在: {:?}, 使用默认配置", path),
            ConfigSource::File => tracing::info!("配置加载成功: {:?}", path),
        }
        Ok(config)
    }

    /// 加载配置并返回来源
    ///
    /// 不输出日志，调用方可在日志初始化之后再提示
    pub fn load_with_source<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource)> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok((Config::default(), ConfigSource::Default));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;
        let config = Self::parse(&content)?;

        Ok((config, ConfigSource::File))
    }

    /// 解析 TOML 文本
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("配置文件解析失败: {}", e))
    }

    /// 保存配置到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// 获取配置文件路径
    ///
    /// 优先级: 命令行指定 > 当前目录 > 用户主目录
    pub fn get_config_path(cli_path: Option<&str>) -> String {
        if let Some(p) = cli_path {
            return p.to_string();
        }

        if Path::new("setting-engine.toml").exists() {
            return "setting-engine.toml".to_string();
        }

        if let Ok(home) = std::env::var("HOME") {
            let config_path = format!("{}/.config/setting-engine/config.toml", home);
            if Path::new(&config_path).exists() {
                return config_path;
            }
        }

        "setting-engine.toml".to_string()
    }

    /// 解析网络类型列表
    pub fn network_types(&self) -> Result<Vec<NetworkType>> {
        self.candidates
            .network_types
            .iter()
            .map(|s| s.parse::<NetworkType>().map_err(|e| anyhow!("{}", e)))
            .collect()
    }

    /// 通过 SettingEngine 的 setter 应用配置
    ///
    /// 只调用配置中出现的项，未出现的项保持未设置
    pub fn into_setting_engine(&self) -> Result<SettingEngine> {
        let mut engine = SettingEngine::new();

        let udp = &self.ephemeral_udp;
        if udp.port_min != 0 || udp.port_max != 0 {
            engine
                .set_ephemeral_udp_port_range(udp.port_min, udp.port_max)
                .context("ephemeral_udp 端口范围无效")?;
        }

        if self.detach.data_channels {
            engine.detach_data_channels();
        }

        match (self.timeout.ice_connection_ms, self.timeout.ice_keepalive_ms) {
            (Some(connection), Some(keepalive)) => engine.set_connection_timeout(
                Duration::from_millis(connection),
                Duration::from_millis(keepalive),
            ),
            (None, None) => {}
            _ => {
                return Err(anyhow!(
                    "timeout.ice_connection_ms 与 timeout.ice_keepalive_ms 必须同时设置"
                ))
            }
        }

        if !self.candidates.network_types.is_empty() {
            engine.set_network_types(self.network_types()?);
        }

        if !self.candidates.nat_1to1.is_empty() {
            for m in &self.candidates.nat_1to1 {
                if let Some(network) = &m.network {
                    if !matches!(network.to_ascii_lowercase().as_str(), "udp" | "tcp") {
                        return Err(anyhow!("nat_1to1.network 只能是 udp 或 tcp: {}", network));
                    }
                }
            }
            engine.set_local_nat_rule(Some(static_nat_rule(self.candidates.nat_1to1.clone())));
        }

        Ok(engine)
    }
}

/// 生成默认配置文件内容 (带注释)
pub fn default_config_template() -> &'static str {
    r#"# setting-engine 配置文件

[ephemeral_udp]
# 临时端口范围, 0/0 = 由系统分配
port_min = 0
port_max = 0

[detach]
# 数据通道需在 OnOpen 中显式 detach
data_channels = false

[timeout]
# 两项必须同时设置, 省略则使用 agent 默认值
# ice_connection_ms = 30000
# ice_keepalive_ms = 10000

[candidates]
# 空 = 允许全部: udp4, udp6, tcp4, tcp6
network_types = []
# nat_1to1 = [{ local_ip = "10.0.0.2", external_ip = "203.0.113.7" }]

[logging]
level = "info"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.ephemeral_udp.port_min, 0);
        assert!(config.timeout.ice_connection_ms.is_none());

        let engine = config.into_setting_engine().unwrap();
        assert_eq!(engine.ephemeral_udp_port_range(), (0, 0));
        assert!(engine.ice_connection_timeout().is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let _parsed: Config = toml::from_str(&toml_str).unwrap();
    }

    #[test]
    fn test_template_parses() {
        let config = Config::parse(default_config_template()).unwrap();
        assert!(config.candidates.network_types.is_empty());
        config.into_setting_engine().unwrap();
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[ephemeral_udp]
port_min = 10000
port_max = 20000

[detach]
data_channels = true

[timeout]
ice_connection_ms = 0
ice_keepalive_ms = 2500

[candidates]
network_types = ["udp4", "TCP4"]
nat_1to1 = [{ local_ip = "10.0.0.2", external_ip = "203.0.113.7", network = "udp" }]
"#,
        )
        .unwrap();

        let engine = config.into_setting_engine().unwrap();
        assert_eq!(engine.ephemeral_udp_port_range(), (10000, 20000));
        assert!(engine.data_channels_detached());
        assert_eq!(engine.ice_connection_timeout(), Some(Duration::ZERO));
        assert_eq!(engine.ice_keepalive_interval(), Some(Duration::from_millis(2500)));
        assert_eq!(engine.network_types(), &[NetworkType::Udp4, NetworkType::Tcp4]);

        let rule = engine.local_nat_rule().unwrap();
        let local = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(
            rule("udp", local, 10001),
            (IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)), 10001)
        );
        assert_eq!(rule("tcp", local, 10001), (local, 10001));
    }

    #[test]
    fn test_invalid_port_range() {
        let config = Config::parse("[ephemeral_udp]\nport_min = 5000\nport_max = 4000\n").unwrap();
        let err = config.into_setting_engine().unwrap_err();
        assert!(format!("{:#}", err).contains("max below min"));
    }

    #[test]
    fn test_half_timeout_rejected() {
        let config = Config::parse("[timeout]\nice_connection_ms = 1000\n").unwrap();
        assert!(config.into_setting_engine().is_err());
    }

    #[test]
    fn test_unknown_network_type_rejected() {
        let config = Config::parse("[candidates]\nnetwork_types = [\"sctp\"]\n").unwrap();
        assert!(config.into_setting_engine().is_err());
    }

    #[test]
    fn test_invalid_nat_ip_rejected() {
        let result = Config::parse(
            "[candidates]\nnat_1to1 = [{ local_ip = \"not-an-ip\", external_ip = \"1.2.3.4\" }]\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_uses_default() {
        let config = Config::load("/nonexistent/setting-engine.toml").unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_settings_reports_missing_file() {
        let loaded = load_settings("/nonexistent/setting-engine.toml").unwrap();
        assert_eq!(loaded.source, ConfigSource::Default);
        assert_eq!(loaded.engine.ephemeral_udp_port_range(), (0, 0));
    }

    #[test]
    fn test_load_settings_reads_file() {
        let path = std::env::temp_dir().join(format!(
            "setting-engine-load-{}.toml",
            std::process::id()
        ));
        fs::write(&path, "[ephemeral_udp]\nport_min = 3000\nport_max = 3010\n").unwrap();

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.source, ConfigSource::File);
        assert_eq!(loaded.engine.ephemeral_udp_port_range(), (3000, 3010));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_nat_network_rejected() {
        let config = Config::parse(
            "[candidates]\nnat_1to1 = [{ local_ip = \"10.0.0.2\", external_ip = \"1.2.3.4\", network = \"sctp\" }]\n",
        )
        .unwrap();
        let err = config.into_setting_engine().unwrap_err();
        assert!(err.to_string().contains("sctp"));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "setting-engine-test-{}.toml",
            std::process::id()
        ));
        let mut config = Config::default();
        config.ephemeral_udp.port_min = 40000;
        config.ephemeral_udp.port_max = 40010;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.ephemeral_udp.port_min, 40000);
        assert_eq!(loaded.ephemeral_udp.port_max, 40010);
        let _ = fs::remove_file(&path);
    }
}
