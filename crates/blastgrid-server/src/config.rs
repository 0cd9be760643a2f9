use std::time::Duration;

use serde::Deserialize;

use blastgrid_core::room::RoomConfig;

/// Top-level server configuration, loaded from `blastgrid.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub rooms: RoomsConfig,
    #[serde(rename = "match")]
    pub match_rules: MatchRulesConfig,
}

/// Room registry limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub max_rooms: usize,
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
    /// Per-room broadcast buffer; lagging subscribers drop older messages.
    pub broadcast_capacity: usize,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            max_rooms: 100,
            idle_timeout_secs: 3600,
            idle_check_interval_secs: 60,
            broadcast_capacity: 256,
        }
    }
}

/// Match rules applied to every new room.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchRulesConfig {
    pub max_wins: u8,
    pub round_end_delay_ms: u64,
    /// Overrides the round's own tick rate.
    pub tick_rate_hz: Option<f32>,
    pub max_tick_delta_ms: u64,
}

impl Default for MatchRulesConfig {
    fn default() -> Self {
        Self {
            max_wins: 3,
            round_end_delay_ms: 3000,
            tick_rate_hz: None,
            max_tick_delta_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { field, reason } => write!(f, "{field} {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rooms.max_rooms == 0 {
            return Err(invalid("rooms.max_rooms", "must be > 0"));
        }
        if self.rooms.idle_timeout_secs == 0 {
            return Err(invalid("rooms.idle_timeout_secs", "must be > 0"));
        }
        if self.rooms.idle_check_interval_secs == 0 {
            return Err(invalid("rooms.idle_check_interval_secs", "must be > 0"));
        }
        if self.rooms.broadcast_capacity == 0 {
            return Err(invalid("rooms.broadcast_capacity", "must be > 0"));
        }
        if self.match_rules.max_wins == 0 {
            return Err(invalid("match.max_wins", "must be > 0"));
        }
        if let Some(hz) = self.match_rules.tick_rate_hz
            && !(hz.is_finite() && hz > 0.0 && hz <= 1000.0)
        {
            return Err(invalid("match.tick_rate_hz", "must be in (0, 1000]"));
        }
        if self.match_rules.max_tick_delta_ms == 0 {
            return Err(invalid("match.max_tick_delta_ms", "must be > 0"));
        }
        Ok(())
    }

    /// Match rules for a newly created room.
    pub fn room_config(&self) -> RoomConfig {
        let rules = &self.match_rules;
        RoomConfig {
            max_wins: rules.max_wins,
            round_end_delay: Duration::from_millis(rules.round_end_delay_ms),
            max_tick_delta: Duration::from_millis(rules.max_tick_delta_ms),
            tick_rate_hz: rules.tick_rate_hz,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.rooms.idle_timeout_secs)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_secs(self.rooms.idle_check_interval_secs)
    }

    /// Load config from `blastgrid.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("blastgrid.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from blastgrid.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse blastgrid.toml, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No blastgrid.toml found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `BLASTGRID_*` overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("BLASTGRID_MAX_ROOMS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.rooms.max_rooms = n;
        }
        if let Some(val) = lookup("BLASTGRID_IDLE_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.rooms.idle_timeout_secs = n;
        }
        if let Some(val) = lookup("BLASTGRID_TICK_RATE")
            && let Ok(hz) = val.parse::<f32>()
        {
            self.match_rules.tick_rate_hz = Some(hz);
        }
        if let Some(val) = lookup("BLASTGRID_MAX_WINS")
            && let Ok(n) = val.parse::<u8>()
        {
            self.match_rules.max_wins = n;
        }
        if let Some(val) = lookup("BLASTGRID_ROUND_END_DELAY_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.match_rules.round_end_delay_ms = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = ServerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.rooms.max_rooms, 100);
        assert_eq!(cfg.match_rules.max_wins, 3);
        assert!(cfg.match_rules.tick_rate_hz.is_none());
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[rooms]
max_rooms = 8

[match]
max_wins = 5
tick_rate_hz = 30.0
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.rooms.max_rooms, 8);
        assert_eq!(cfg.rooms.idle_timeout_secs, 3600);
        assert_eq!(cfg.match_rules.max_wins, 5);
        assert_eq!(cfg.match_rules.tick_rate_hz, Some(30.0));
        assert_eq!(cfg.match_rules.round_end_delay_ms, 3000);
    }

    #[test]
    fn room_config_converts_units() {
        let cfg = ServerConfig {
            match_rules: MatchRulesConfig {
                round_end_delay_ms: 250,
                max_tick_delta_ms: 50,
                ..MatchRulesConfig::default()
            },
            ..ServerConfig::default()
        };
        let room = cfg.room_config();
        assert_eq!(room.round_end_delay, Duration::from_millis(250));
        assert_eq!(room.max_tick_delta, Duration::from_millis(50));
        assert_eq!(room.max_wins, 3);
    }

    #[test]
    fn validate_rejects_zero_max_wins() {
        let mut cfg = ServerConfig::default();
        cfg.match_rules.max_wins = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "match.max_wins",
                reason: "must be > 0"
            })
        );
    }

    #[test]
    fn validate_rejects_bad_tick_rate() {
        let mut cfg = ServerConfig::default();
        cfg.match_rules.tick_rate_hz = Some(0.0);
        assert!(cfg.validate().is_err());
        cfg.match_rules.tick_rate_hz = Some(f32::NAN);
        assert!(cfg.validate().is_err());
        cfg.match_rules.tick_rate_hz = Some(20.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn overrides_apply_and_ignore_garbage() {
        let env: HashMap<&str, &str> = [
            ("BLASTGRID_MAX_ROOMS", "12"),
            ("BLASTGRID_TICK_RATE", "30"),
            ("BLASTGRID_MAX_WINS", "not-a-number"),
            ("BLASTGRID_ROUND_END_DELAY_MS", "500"),
        ]
        .into_iter()
        .collect();
        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.rooms.max_rooms, 12);
        assert_eq!(cfg.match_rules.tick_rate_hz, Some(30.0));
        assert_eq!(cfg.match_rules.max_wins, 3);
        assert_eq!(cfg.match_rules.round_end_delay_ms, 500);
        assert_eq!(cfg.rooms.idle_timeout_secs, 3600);
    }
}
