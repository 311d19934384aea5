use crate::error::ConfigError;
use crate::store;
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MAX_LEADERS: usize = 10;
pub const TEAM_GAMES_PER_SEASON: u32 = 100;
pub const GAMES_IN_SEASON: i32 = 99;
pub const PLAYOFF_SPOTS: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub feed_path: PathBuf,
    pub reference_dir: PathBuf,
    pub from_season: Option<u16>,
    pub max_leaders: usize,
    pub team_games_per_season: u32,
    pub games_in_season: i32,
    pub playoff_spots: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            data_dir: PathBuf::from("data"),
            feed_path: PathBuf::from("tmp/blaseball-log.json"),
            reference_dir: PathBuf::from("data/reference"),
            from_season: None,
            max_leaders: MAX_LEADERS,
            team_games_per_season: TEAM_GAMES_PER_SEASON,
            games_in_season: GAMES_IN_SEASON,
            playoff_spots: PLAYOFF_SPOTS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Config::from_vars(|name| env::var(name).ok())
    }

    fn from_vars<F>(var: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(dir) = var("DATA_DIR") {
            config.reference_dir = Path::new(&dir).join("reference");
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = var("FEED_PATH") {
            config.feed_path = PathBuf::from(path);
        }
        if let Some(dir) = var("REFERENCE_DIR") {
            config.reference_dir = PathBuf::from(dir);
        }
        config.from_season = parse(&var, "FROM_SEASON")?;
        if let Some(n) = parse(&var, "MAX_LEADERS")? {
            config.max_leaders = n;
        }
        if let Some(n) = parse(&var, "TEAM_GAMES_PER_SEASON")? {
            config.team_games_per_season = n;
        }
        if let Some(n) = parse(&var, "GAMES_IN_SEASON")? {
            config.games_in_season = n;
        }
        if let Some(n) = parse(&var, "PLAYOFF_SPOTS")? {
            config.playoff_spots = n;
        }
        Ok(config)
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.data_dir.join(relative)
    }

    /// Seasons at or above this value are recomputed from the feed; seasons below it keep whatever
    /// was persisted by earlier runs.
    pub fn reprocess_floor(&self) -> u16 {
        if let Some(season) = self.from_season {
            return season;
        }
        let standings: Option<Value> = store::read_json(&self.path("standings/standings.json"));
        let floor = standings
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|seasons| seasons.keys().filter_map(|s| s.parse::<u16>().ok()).max())
            .unwrap_or(0);
        info!(floor, "inferred reprocess floor from standings");
        floor
    }
}

fn parse<F, T>(var: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match var(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use maplit::hashmap;
    use std::collections::HashMap;
    use std::path::Path;

    fn config(vars: HashMap<&str, &str>) -> Config {
        Config::from_vars(|name| vars.get(name).map(|v| (*v).to_string())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config(HashMap::new());
        assert_eq!(config.data_dir, Path::new("data"));
        assert_eq!(config.reference_dir, Path::new("data/reference"));
        assert_eq!(config.from_season, None);
        assert_eq!(config.max_leaders, 10);
        assert_eq!(config.team_games_per_season, 100);
        assert_eq!(config.games_in_season, 99);
    }

    #[test]
    fn test_overrides() {
        let config = config(hashmap! {
            "DATA_DIR" => "/srv/blaseball",
            "FROM_SEASON" => "11",
            "MAX_LEADERS" => "5",
        });
        assert_eq!(config.data_dir, Path::new("/srv/blaseball"));
        assert_eq!(config.reference_dir, Path::new("/srv/blaseball/reference"));
        assert_eq!(config.from_season, Some(11));
        assert_eq!(config.max_leaders, 5);
        assert_eq!(config.reprocess_floor(), 11);
    }

    #[test]
    fn test_invalid() {
        let vars = hashmap! { "FROM_SEASON" => "eleven" };
        let err = Config::from_vars(|name| vars.get(name).map(|v| (*v).to_string())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "FROM_SEASON must be a non-negative integer, got \"eleven\""
        );
    }

    #[test]
    fn test_floor_from_standings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("standings")).unwrap();
        std::fs::write(
            dir.path().join("standings/standings.json"),
            r#"{"2": {}, "10": {}, "9": {}}"#,
        )
        .unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        assert_eq!(config.reprocess_floor(), 10);

        let empty = Config {
            data_dir: dir.path().join("missing"),
            ..Config::default()
        };
        assert_eq!(empty.reprocess_floor(), 0);
    }
}
