use serde::{Deserialize, Serialize};

/// Data-driven gameplay constants for an arena round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Grid rows for the generated level.
    pub rows: i32,
    /// Grid columns for the generated level.
    pub cols: i32,
    /// Optional ASCII layout replacing the generated level.
    pub layout: Option<Vec<String>>,
    /// Simulation tick rate in Hz.
    pub tick_rate: f32,
    /// Walking speed at multiplier 1.0 (tiles/s).
    pub base_speed: f32,
    /// Multiplier added per speed pickup.
    pub speed_per_pickup: f32,
    /// Bomb fuse (seconds).
    pub fuse_secs: f32,
    /// Fuse a chained bomb is collapsed to (seconds from the blast).
    pub chain_delay_secs: f32,
    /// Explosion flame lifetime (seconds).
    pub explosion_secs: f32,
    /// Block destruction animation (seconds).
    pub block_destroy_secs: f32,
    /// Death animation (seconds) before a combatant is removed.
    pub death_secs: f32,
    /// Seconds per walk animation frame.
    pub walk_frame_secs: f32,
    /// Seconds per pickup blink frame.
    pub powerup_blink_secs: f32,
    /// Upper bound on destructible blocks seeded per round.
    pub max_blocks: usize,
    pub max_flame_powerups: usize,
    pub max_bomb_powerups: usize,
    pub max_speed_powerups: usize,
    pub start_bombs: u8,
    pub start_strength: u8,
    pub start_speed_multiplier: f32,
    /// Half extent of the square hitbox (tiles).
    pub hitbox_half: f32,
    /// Distance of the movement probes ahead of the hitbox center.
    pub probe_lead: f32,
    /// Sideways offset of each movement probe from the center line.
    pub probe_lateral: f32,
    /// Fixed RNG seed for terrain. Random per round when unset.
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            rows: 13,
            cols: 15,
            layout: None,
            tick_rate: 60.0,
            base_speed: 3.0,
            speed_per_pickup: 0.4,
            fuse_secs: 2.5,
            chain_delay_secs: 0.1,
            explosion_secs: 0.5,
            block_destroy_secs: 0.5,
            death_secs: 1.0,
            walk_frame_secs: 0.15,
            powerup_blink_secs: 0.25,
            max_blocks: 50,
            max_flame_powerups: 6,
            max_bomb_powerups: 6,
            max_speed_powerups: 4,
            start_bombs: 1,
            start_strength: 1,
            start_speed_multiplier: 1.0,
            hitbox_half: 0.4,
            probe_lead: 0.45,
            probe_lateral: 0.3,
            seed: None,
        }
    }
}

impl ArenaConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("BLASTGRID_ARENA_CONFIG")
            && let Some(config) = Self::read(&path)
        {
            return config;
        }
        if let Some(config) = Self::read("config/arena.toml") {
            return config;
        }
        Self::default()
    }

    fn read(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<Self>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path, error = %e, "Invalid arena config, ignoring");
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ArenaConfig = toml::from_str("fuse_secs = 1.5\nmax_blocks = 10").unwrap();
        assert_eq!(config.fuse_secs, 1.5);
        assert_eq!(config.max_blocks, 10);
        assert_eq!(config.base_speed, ArenaConfig::default().base_speed);
        assert!(config.seed.is_none());
    }

    #[test]
    fn layout_parses_from_toml() {
        let config: ArenaConfig =
            toml::from_str("layout = [\"#####\", \"#0.1#\", \"#####\"]\nseed = 7").unwrap();
        assert_eq!(config.layout.as_ref().map(Vec::len), Some(3));
        assert_eq!(config.seed, Some(7));
    }
}
