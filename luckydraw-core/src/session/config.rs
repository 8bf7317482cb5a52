use crate::error::{DrawError, Result};
use crate::prize::{validate_name, validate_total_count, PrizeRegistry};
use crate::storage::DOCUMENT_KEY;
use crate::types::LotteryAggregate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A prize to stock when no saved state exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeSeed {
    pub name: String,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PrizeSeed {
    pub fn new(name: &str, count: u32) -> Self {
        Self {
            name: name.to_string(),
            count,
            description: None,
        }
    }
}

/// Festival prize table used as the out-of-the-box pool.
pub const DEFAULT_PRIZES: &[(&str, u32)] = &[
    ("Smile - 帆布袋", 300),
    ("Smile - 精美故宫文创", 5),
    ("Smile - 帽子", 20),
    ("Smile - 文创", 30),
    ("Smile - 扇子", 26),
    ("Smile - 火锅筷", 7),
    ("课代表立正 - Hoodie", 50),
    ("大统华 - T&T Gift Card", 46),
    ("大统华 - 新年冰箱贴", 15),
    ("大统华 - 新年贴纸", 5),
    ("大统华 - 钥匙串", 5),
    ("RC医美 - 美妆礼品袋", 30),
    ("佳遇十番 - 小马挂件", 50),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub document_key: String,
    pub default_prizes: Vec<PrizeSeed>,
    /// Fixed seed for rehearsals; drawn from the OS when absent.
    pub rng_seed: Option<u64>,
    pub poll_interval_ms: u64,
    pub subscription_buffer: usize,
    pub command_buffer: usize,
    /// Prefer the remote copy over the cache when starting.
    pub sync_on_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            document_key: DOCUMENT_KEY.to_string(),
            default_prizes: DEFAULT_PRIZES
                .iter()
                .map(|(name, count)| PrizeSeed::new(name, *count))
                .collect(),
            rng_seed: None,
            poll_interval_ms: 500,
            subscription_buffer: 32,
            command_buffer: 64,
            sync_on_start: true,
        }
    }
}

impl SessionConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&raw)
            .map_err(|e| DrawError::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.document_key.trim().is_empty() {
            return Err(DrawError::config("Document key cannot be empty"));
        }

        if self.poll_interval_ms == 0 {
            return Err(DrawError::config("Poll interval must be greater than 0"));
        }

        if self.subscription_buffer == 0 || self.command_buffer == 0 {
            return Err(DrawError::config("Channel buffers must be greater than 0"));
        }

        for seed in &self.default_prizes {
            validate_name(&seed.name)
                .and_then(|_| validate_total_count(seed.count as f64))
                .map_err(|e| {
                    DrawError::config(format!("Default prize '{}': {}", seed.name, e))
                })?;
        }

        Ok(())
    }

    /// A fresh aggregate stocked with the default prizes, each with a new id.
    pub fn default_aggregate(&self) -> Result<LotteryAggregate> {
        let mut prizes = Vec::with_capacity(self.default_prizes.len());
        let mut registry = PrizeRegistry::new(&mut prizes);
        for seed in &self.default_prizes {
            registry.add(&seed.name, seed.count as f64, seed.description.as_deref())?;
        }
        Ok(LotteryAggregate::with_prizes(prizes))
    }
}
