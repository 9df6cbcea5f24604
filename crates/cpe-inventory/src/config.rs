//! Configuration for the cpe-inventory scanner.

use std::time::Duration;

use config::{Config, Environment, File};
use cpe_core::Credentials;
use ipnet::IpNet;
use serde::{Deserialize, Deserializer};

use crate::error::{InventoryError, Result};
use crate::subnet::host_count;

/// Largest subnet accepted for scanning, in usable addresses.
pub const MAX_SUBNET_HOSTS: u128 = 1 << 16;

/// Top-level inventory configuration.
///
/// Loaded from `cpe-inventory.toml` `[inventory]` section or
/// `CPE_INVENTORY__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    /// Subnets to scan, in CIDR notation, processed in this order.
    /// A single comma-separated string is accepted as well.
    #[serde(default, deserialize_with = "list_or_csv")]
    pub subnets: Vec<String>,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Secret tried first for privileged mode.
    #[serde(default)]
    pub enable_secret: String,

    /// Secret tried on a fresh session when the first one is rejected.
    #[serde(default)]
    pub alternate_enable_secret: String,

    /// Management port (default: 23).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-operation timeout in seconds for connect, enable and each command.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent sessions while scanning one subnet.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_sessions: usize,

    /// Directory receiving the report file.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Prefix of each device heading in the report.
    #[serde(default = "default_device_label")]
    pub device_label: String,
}

fn default_port() -> u16 {
    23
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    10
}

fn default_output_dir() -> String {
    "router_inventory".to_string()
}

fn default_device_label() -> String {
    "CISCO-ROUTER".to_string()
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            subnets: Vec::new(),
            username: String::new(),
            password: String::new(),
            enable_secret: String::new(),
            alternate_enable_secret: String::new(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_sessions: default_max_concurrent(),
            output_dir: default_output_dir(),
            device_label: default_device_label(),
        }
    }
}

/// Environment source for `CPE_INVENTORY__<FIELD>` variables.
///
/// Values stay strings; serde converts the numeric fields, so secrets such
/// as `007` or `TRUE` reach the device unchanged.
pub fn environment() -> Environment {
    Environment::with_prefix("CPE")
        .prefix_separator("_")
        .separator("__")
}

impl InventoryConfig {
    /// Load `<file_prefix>.toml` (optional) overlaid by the environment.
    pub fn load(file_prefix: &str) -> Result<Self> {
        Self::load_from(file_prefix, environment())
    }

    pub fn load_from(file_prefix: &str, env: Environment) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(file_prefix).required(false))
            .add_source(env)
            .build()?;

        match cfg.get::<InventoryConfig>("inventory") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.subnets.is_empty() {
            return Err(InventoryError::Config(
                "no subnets configured: set inventory.subnets or pass --subnet".to_string(),
            ));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(InventoryError::Config(
                "max_concurrent_sessions must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(InventoryError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        self.parsed_subnets().map(|_| ())
    }

    /// Parse every configured subnet, preserving configured order.
    pub fn parsed_subnets(&self) -> Result<Vec<IpNet>> {
        self.subnets.iter().map(|s| parse_subnet(s)).collect()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.username.clone(),
            self.password.clone(),
            self.enable_secret.clone(),
            self.alternate_enable_secret.clone(),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrCsv {
    List(Vec<String>),
    Csv(String),
}

fn list_or_csv<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items,
        ListOrCsv::Csv(s) => s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

/// Parse a CIDR subnet. Host bits must be zero, as in `10.0.0.0/24`, and
/// the subnet may hold at most [`MAX_SUBNET_HOSTS`] usable addresses.
pub fn parse_subnet(cidr: &str) -> Result<IpNet> {
    let net: IpNet = cidr
        .trim()
        .parse()
        .map_err(|e: ipnet::AddrParseError| InventoryError::InvalidSubnet {
            cidr: cidr.to_string(),
            reason: e.to_string(),
        })?;

    if net.trunc() != net {
        return Err(InventoryError::InvalidSubnet {
            cidr: cidr.to_string(),
            reason: format!("host bits set, did you mean {}?", net.trunc()),
        });
    }

    if host_count(&net) > MAX_SUBNET_HOSTS {
        return Err(InventoryError::InvalidSubnet {
            cidr: cidr.to_string(),
            reason: format!(
                "more than {MAX_SUBNET_HOSTS} host addresses, split it into smaller subnets"
            ),
        });
    }

    Ok(net)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = InventoryConfig::default();
        assert_eq!(config.port, 23);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_concurrent_sessions, 10);
        assert_eq!(config.output_dir, "router_inventory");
        assert_eq!(config.device_label, "CISCO-ROUTER");
    }

    #[test]
    fn test_validate_requires_subnets() {
        let config = InventoryConfig::default();
        assert!(matches!(config.validate(), Err(InventoryError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = InventoryConfig {
            subnets: vec!["10.0.0.0/30".to_string()],
            max_concurrent_sessions: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(InventoryError::Config(_))));
    }

    #[test]
    fn test_parse_subnet() {
        let net = parse_subnet("192.168.1.0/24").unwrap();
        assert_eq!(net.prefix_len(), 24);

        assert!(matches!(
            parse_subnet("192.168.1.7/24"),
            Err(InventoryError::InvalidSubnet { .. })
        ));
        assert!(matches!(
            parse_subnet("not-a-subnet"),
            Err(InventoryError::InvalidSubnet { .. })
        ));
    }

    #[test]
    fn test_parse_subnet_rejects_oversized() {
        assert!(parse_subnet("10.0.0.0/16").is_ok());
        assert!(parse_subnet("2001:db8::/112").is_ok());
        assert!(matches!(
            parse_subnet("10.0.0.0/8"),
            Err(InventoryError::InvalidSubnet { .. })
        ));
        assert!(matches!(
            parse_subnet("2001:db8::/64"),
            Err(InventoryError::InvalidSubnet { .. })
        ));

        let config = InventoryConfig {
            subnets: vec!["10.0.0.0/30".to_string(), "10.0.0.0/8".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(InventoryError::InvalidSubnet { .. })
        ));
    }

    fn env_with(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_env_secrets_are_kept_verbatim() {
        let env = env_with(&[
            ("CPE_INVENTORY__PASSWORD", "007"),
            ("CPE_INVENTORY__ENABLE_SECRET", "TRUE"),
            ("CPE_INVENTORY__ALTERNATE_ENABLE_SECRET", "1.50"),
            ("CPE_INVENTORY__SUBNETS", "10.0.0.0/30"),
        ]);
        let config = InventoryConfig::load_from("cpe-inventory-test-missing", env).unwrap();

        assert_eq!(config.password, "007");
        assert_eq!(config.enable_secret, "TRUE");
        assert_eq!(config.alternate_enable_secret, "1.50");
    }

    #[test]
    fn test_env_numbers_and_subnet_list() {
        let env = env_with(&[
            ("CPE_INVENTORY__PORT", "2323"),
            ("CPE_INVENTORY__TIMEOUT_SECS", "5"),
            ("CPE_INVENTORY__MAX_CONCURRENT_SESSIONS", "3"),
            ("CPE_INVENTORY__SUBNETS", "10.0.0.0/30, 10.0.1.0/30"),
        ]);
        let config = InventoryConfig::load_from("cpe-inventory-test-missing", env).unwrap();

        assert_eq!(config.port, 2323);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_concurrent_sessions, 3);
        assert_eq!(config.subnets, vec!["10.0.0.0/30", "10.0.1.0/30"]);
        assert_eq!(config.output_dir, "router_inventory");
    }

    #[test]
    fn test_missing_sources_give_defaults() {
        let config =
            InventoryConfig::load_from("cpe-inventory-test-missing", env_with(&[])).unwrap();
        assert!(config.subnets.is_empty());
        assert_eq!(config.port, 23);
    }

    #[test]
    fn test_parsed_subnets_keep_order() {
        let config = InventoryConfig {
            subnets: vec!["10.0.2.0/24".to_string(), "10.0.1.0/24".to_string()],
            ..Default::default()
        };
        let nets = config.parsed_subnets().unwrap();
        assert_eq!(nets[0].to_string(), "10.0.2.0/24");
        assert_eq!(nets[1].to_string(), "10.0.1.0/24");
    }
}
