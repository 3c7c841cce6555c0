use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Base URL clients reach the upload endpoint on. Presigned URLs are
    /// minted against this, so it must match the outward-facing address.
    pub public_base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImportConfig {
    /// Upload slot lifetime. Doubles as the transaction record TTL.
    pub slot_ttl_secs: u64,
    /// How often the sweeper scans tables for expired rows.
    pub sweep_interval_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            slot_ttl_secs: 300,
            sweep_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObjectStoreConfig {
    pub presign_secret: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            presign_secret: "dev-only-presign-secret".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditConfig {
    pub queue_size: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { queue_size: 1024 }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
