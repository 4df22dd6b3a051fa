use serde::{Deserialize, Serialize};
use std::env;

use crate::allocation::WinPenalty;
use crate::allocation::weights::{DEFAULT_WIN_MULTIPLIER_FLOOR, DEFAULT_WIN_MULTIPLIERS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub raffle: RaffleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password: "admin".to_string(),
        }
    }
}

/// Voting and draw rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleConfig {
    /// Required sum of a participant's points; 0 disables the check.
    #[serde(default = "default_point_budget")]
    pub point_budget: i32,
    /// Cap on points per item; 0 disables the cap.
    #[serde(default)]
    pub max_per_item: i32,
    /// Minimum number of items with points > 0 in a submission.
    #[serde(default)]
    pub min_voted_items: usize,
    /// Multiplier by number of wins so far (index = wins).
    #[serde(default = "default_win_multipliers")]
    pub win_multipliers: Vec<f64>,
    /// Multiplier for win counts past the end of `win_multipliers`.
    #[serde(default = "default_win_multiplier_floor")]
    pub win_multiplier_floor: f64,
}

fn default_point_budget() -> i32 {
    100
}

fn default_win_multipliers() -> Vec<f64> {
    DEFAULT_WIN_MULTIPLIERS.to_vec()
}

fn default_win_multiplier_floor() -> f64 {
    DEFAULT_WIN_MULTIPLIER_FLOOR
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            point_budget: default_point_budget(),
            max_per_item: 0,
            min_voted_items: 0,
            win_multipliers: default_win_multipliers(),
            win_multiplier_floor: default_win_multiplier_floor(),
        }
    }
}

impl RaffleConfig {
    pub fn win_penalty(&self) -> WinPenalty {
        WinPenalty::new(self.win_multipliers.clone(), self.win_multiplier_floor)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.point_budget < 0 {
            return Err("point_budget must be >= 0".to_string());
        }
        if self.max_per_item < 0 {
            return Err("max_per_item must be >= 0".to_string());
        }
        self.win_penalty().validate()
    }
}

/// Parses a comma separated list such as `1.0,0.6,0.35`.
fn parse_multipliers(raw: &str) -> Option<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // no config file: fall back to environment variables entirely
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: get_env("DATABASE_URL")
                            .unwrap_or_else(|| "sqlite://raffle.db?mode=rwc".to_string()),
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 5u32),
                    },
                    admin: AdminConfig::default(),
                    raffle: RaffleConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // environment always wins over the file
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("ADMIN_PASSWORD") {
            config.admin.password = v;
        }
        if let Ok(v) = env::var("POINT_BUDGET")
            && let Ok(n) = v.parse()
        {
            config.raffle.point_budget = n;
        }
        if let Ok(v) = env::var("MAX_PER_ITEM")
            && let Ok(n) = v.parse()
        {
            config.raffle.max_per_item = n;
        }
        if let Ok(v) = env::var("MIN_VOTED_ITEMS")
            && let Ok(n) = v.parse()
        {
            config.raffle.min_voted_items = n;
        }
        if let Ok(v) = env::var("WIN_MULTIPLIERS") {
            config.raffle.win_multipliers =
                parse_multipliers(&v).ok_or("WIN_MULTIPLIERS must be a comma separated list of numbers")?;
        }
        if let Ok(v) = env::var("WIN_MULTIPLIER_FLOOR")
            && let Ok(n) = v.parse()
        {
            config.raffle.win_multiplier_floor = n;
        }

        config.raffle.validate()?;
        Ok(config)
    }

    fn parse(config_str: &str) -> Result<Self, String> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
url = "sqlite::memory:"
max_connections = 1
"#;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.admin.password, "admin");
        assert_eq!(config.raffle.point_budget, 100);
        assert_eq!(config.raffle.max_per_item, 0);
        assert_eq!(config.raffle.win_multipliers, vec![1.00, 0.60, 0.35, 0.20]);
        assert_eq!(config.raffle.win_multiplier_floor, 0.10);
        assert!(config.raffle.validate().is_ok());
    }

    #[test]
    fn test_raffle_section() {
        let raw = format!(
            "{MINIMAL}\n[raffle]\npoint_budget = 0\nmax_per_item = 40\nwin_multipliers = [1.0, 0.5]\nwin_multiplier_floor = 0.25\n"
        );
        let config = Config::parse(&raw).unwrap();
        assert_eq!(config.raffle.point_budget, 0);
        assert_eq!(config.raffle.max_per_item, 40);
        let penalty = config.raffle.win_penalty();
        assert_eq!(penalty.multiplier(1), 0.5);
        assert_eq!(penalty.multiplier(2), 0.25);
    }

    #[test]
    fn test_validate_rejects_increasing_table() {
        let raffle = RaffleConfig {
            win_multipliers: vec![0.5, 1.0],
            ..RaffleConfig::default()
        };
        assert!(raffle.validate().is_err());

        let raffle = RaffleConfig {
            point_budget: -1,
            ..RaffleConfig::default()
        };
        assert!(raffle.validate().is_err());
    }

    #[test]
    fn test_parse_multipliers() {
        assert_eq!(parse_multipliers("1, 0.6,0.35"), Some(vec![1.0, 0.6, 0.35]));
        assert_eq!(parse_multipliers("1,abc"), None);
    }
}
