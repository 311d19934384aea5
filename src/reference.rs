use crate::error::Anomaly;
use crate::history::History;
use crate::read_dir::{read_dir, Entries};
use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const REFERENCE_VERSION: u64 = 1;
const LEAGUES_FILE: &str = "leaguesAndDivisions.json";
const TEAMS_FILE: &str = "teams.json";

/// Team, division and league data maintained by the fetch layer.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ReferenceData {
    pub seasons: History<League>,
    pub teams: Vec<Team>,
    /// Milliseconds since the epoch.
    pub last_updated_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct League {
    #[serde(default)]
    pub divisions: Vec<Division>,
    #[serde(default)]
    pub subleagues: Vec<Subleague>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Division {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subleague: Option<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Subleague {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub divisions: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub shorthand: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaguesFile {
    seasons: BTreeMap<u16, League>,
    #[serde(default)]
    last_updated_at: Option<i64>,
}

/// Where a team sat in a season.
#[derive(Debug, Clone, Copy, Default)]
pub struct Membership<'a> {
    pub division: Option<&'a Division>,
    pub subleague: Option<&'a Subleague>,
}

#[derive(Debug, Hash)]
struct CacheKey<'a> {
    version: u64,
    entries: &'a Entries,
}

impl ReferenceData {
    pub fn load(dir: &Path) -> Result<ReferenceData> {
        let entries = read_dir(dir).map_err(|err| {
            Anomaly::UpstreamFetchFailure(format!("{}: {}", dir.display(), err))
        })?;
        let reference = match ReferenceData::load_from_cache(&entries) {
            Ok(cache) => {
                debug!(dir = %dir.display(), "reference data from cache");
                cache
            }
            Err(_) => {
                let reference = ReferenceData::parse(dir)?;
                if let Err(err) = reference.save_to_cache(&entries) {
                    debug!(%err, "unable to cache reference data");
                }
                reference
            }
        };
        reference.check_freshness(Utc::now().timestamp_millis());
        info!(
            seasons = reference.seasons.len(),
            latest = ?reference.seasons.latest(),
            teams = reference.teams.len(),
            "loaded reference data"
        );
        Ok(reference)
    }

    fn parse(dir: &Path) -> Result<ReferenceData> {
        let path = dir.join(LEAGUES_FILE);
        let file = File::open(&path)
            .map_err(|err| Anomaly::UpstreamFetchFailure(format!("{}: {}", path.display(), err)))?;
        let leagues: LeaguesFile = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let mut seasons = History::new();
        for (season, league) in leagues.seasons {
            seasons.insert(season, league);
        }
        seasons.dedup();

        let path = dir.join(TEAMS_FILE);
        let teams = match File::open(&path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(err) => {
                warn!(anomaly = %Anomaly::UpstreamFetchFailure(format!("{}: {}", path.display(), err)), "no teams");
                Vec::new()
            }
        };

        Ok(ReferenceData {
            seasons,
            teams,
            last_updated_at: leagues.last_updated_at,
        })
    }

    /// Stale data is still used; it only gets reported.
    fn check_freshness(&self, now_millis: i64) -> bool {
        let updated = match self.last_updated_at {
            Some(updated) => updated,
            None => return false,
        };
        let age = Duration::milliseconds(now_millis - updated);
        let fresh = age <= Duration::days(1);
        if !fresh {
            let updated = Utc
                .timestamp_millis_opt(updated)
                .single()
                .map(|at| at.to_rfc3339())
                .unwrap_or_default();
            warn!(
                %updated,
                hours = age.num_hours(),
                "reference data is more than a day old"
            );
        }
        fresh
    }

    /// Division and subleague for a team. Seasons missing from the data use the most recent
    /// earlier season.
    pub fn membership(&self, season: u16, team: &str) -> Membership<'_> {
        let league = match self.seasons.get(season) {
            Some(league) => league,
            None => return Membership::default(),
        };
        Membership {
            division: league
                .divisions
                .iter()
                .find(|d| d.teams.iter().any(|t| t == team)),
            subleague: league
                .subleagues
                .iter()
                .find(|s| s.teams.iter().any(|t| t == team)),
        }
    }

    fn load_from_cache(entries: &Entries) -> Result<ReferenceData> {
        let mut reader = GzDecoder::new(File::open(get_cache_path(entries)?)?);
        Ok(bincode::deserialize_from(&mut reader)?)
    }

    fn save_to_cache(&self, entries: &Entries) -> Result<()> {
        let cache_path = get_cache_path(entries)?;
        let mut writer = GzEncoder::new(Vec::new(), Compression::default());
        bincode::serialize_into(&mut writer, self)?;
        let data = writer.finish()?;
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(cache_path, data)?;
        Ok(())
    }
}

fn get_cache_path(entries: &Entries) -> Result<PathBuf> {
    let mut hasher = FxHasher::default();
    let key = CacheKey {
        version: REFERENCE_VERSION,
        entries,
    };
    key.hash(&mut hasher);
    Ok(dirs::cache_dir()
        .context("unable to find cache dir")?
        .join(env!("CARGO_PKG_NAME"))
        .join(format!("reference-{:x}.bincode.gz", hasher.finish())))
}
