use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// How smile intensity is computed from a face sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmileStrategy {
    /// Average of left/right mouth-smile blend shapes.
    BlendShape,
    /// Mouth height / width ratio from raw landmarks.
    Geometric,
}

impl SmileStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlendShape => "blend_shape",
            Self::Geometric => "geometric",
        }
    }
}

impl FromStr for SmileStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blend_shape" => Ok(Self::BlendShape),
            "geometric" => Ok(Self::Geometric),
            other => Err(format!("unknown smile strategy: {other}")),
        }
    }
}

/// All petjoy tunables. Loaded from the `pet_config` table at startup.
/// First boot writes defaults; subsequent boots read existing values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetCfg {
    // trigger arbitration
    pub cooldown_ms: u64,
    pub return_delay_ms: u64,
    pub default_pet: String,

    // expression classifier
    pub smile_strategy: SmileStrategy,
    pub smile_threshold: f32,
    pub geometric_threshold: f32,
    pub jaw_open_enabled: bool,
    pub jaw_open_threshold: f32,

    // producers
    pub speech_restart_ms: u64,
    pub inbox_buffer: usize,

    // shutdown
    pub shutdown_timeout_secs: u64,
}

/// Delay between "joy media ended" and the return to idle.
pub const RETURN_DELAY: Duration = Duration::from_millis(3000);

impl Default for PetCfg {
    fn default() -> Self {
        Self {
            cooldown_ms: 800,
            return_delay_ms: RETURN_DELAY.as_millis() as u64,
            default_pet: "usako".into(),
            smile_strategy: SmileStrategy::BlendShape,
            smile_threshold: 0.5,
            geometric_threshold: 0.22,
            jaw_open_enabled: false,
            jaw_open_threshold: 0.6,
            speech_restart_ms: 100,
            inbox_buffer: 256,
            shutdown_timeout_secs: 5,
        }
    }
}

impl PetCfg {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn return_delay(&self) -> Duration {
        Duration::from_millis(self.return_delay_ms)
    }

    pub fn speech_restart(&self) -> Duration {
        Duration::from_millis(self.speech_restart_ms)
    }

    /// Threshold for the configured smile strategy.
    pub fn active_smile_threshold(&self) -> f32 {
        match self.smile_strategy {
            SmileStrategy::BlendShape => self.smile_threshold,
            SmileStrategy::Geometric => self.geometric_threshold,
        }
    }

    /// Load config from `pet_config` table. If table is empty, seed with defaults.
    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM pet_config")
            .fetch_all(pool)
            .await?;

        if rows.is_empty() {
            let cfg = Self::default();
            cfg.seed(pool).await?;
            return Ok(cfg);
        }

        let map: HashMap<String, String> = rows.into_iter().collect();
        Ok(Self::from_map(&map))
    }

    /// Write all default values into `pet_config` table.
    async fn seed(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        for (key, value, desc) in &self.to_entries() {
            sqlx::query(
                "INSERT INTO pet_config (key, value, description) VALUES ($1, $2, $3) \
                 ON CONFLICT (key) DO NOTHING",
            )
            .bind(key)
            .bind(value)
            .bind(desc)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    pub fn from_map(m: &HashMap<String, String>) -> Self {
        let d = Self::default();
        Self {
            cooldown_ms: get_or(m, "cooldown_ms", d.cooldown_ms),
            return_delay_ms: get_or(m, "return_delay_ms", d.return_delay_ms),
            default_pet: get_or(m, "default_pet", d.default_pet),
            smile_strategy: get_or(m, "smile_strategy", d.smile_strategy),
            smile_threshold: get_or(m, "smile_threshold", d.smile_threshold),
            geometric_threshold: get_or(m, "geometric_threshold", d.geometric_threshold),
            jaw_open_enabled: get_or(m, "jaw_open_enabled", d.jaw_open_enabled),
            jaw_open_threshold: get_or(m, "jaw_open_threshold", d.jaw_open_threshold),
            speech_restart_ms: get_or(m, "speech_restart_ms", d.speech_restart_ms),
            inbox_buffer: get_or(m, "inbox_buffer", d.inbox_buffer),
            shutdown_timeout_secs: get_or(m, "shutdown_timeout_secs", d.shutdown_timeout_secs),
        }
    }

    fn to_entries(&self) -> Vec<(&str, String, &str)> {
        vec![
            ("cooldown_ms", self.cooldown_ms.to_string(), "Minimum ms between accepted triggers, all sources"),
            ("return_delay_ms", self.return_delay_ms.to_string(), "Delay after joy media end before idle"),
            ("default_pet", self.default_pet.clone(), "Pet shown at startup"),
            ("smile_strategy", self.smile_strategy.as_str().to_string(), "blend_shape or geometric"),
            ("smile_threshold", self.smile_threshold.to_string(), "Blend-shape smile threshold"),
            ("geometric_threshold", self.geometric_threshold.to_string(), "Mouth height/width ratio threshold"),
            ("jaw_open_enabled", self.jaw_open_enabled.to_string(), "Treat wide-open mouth as joy"),
            ("jaw_open_threshold", self.jaw_open_threshold.to_string(), "Jaw-open blend-shape threshold"),
            ("speech_restart_ms", self.speech_restart_ms.to_string(), "Delay before restarting ended speech stream"),
            ("inbox_buffer", self.inbox_buffer.to_string(), "Arbiter inbox capacity"),
            ("shutdown_timeout_secs", self.shutdown_timeout_secs.to_string(), "Graceful shutdown timeout seconds"),
        ]
    }
}

fn get_or<T: FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    map.get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
