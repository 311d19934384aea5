use crate::config::Config;
use crate::error::Anomaly;
use crate::snapshot::{GameRef, TeamRef};
use crate::store;
use crate::util::slugify;
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Position {
    Lineup,
    Rotation,
}

impl Position {
    pub fn roster_file(self) -> &'static str {
        match self {
            Position::Lineup => "players/batters.json",
            Position::Rotation => "players/pitchers.json",
        }
    }
}

impl Default for Position {
    fn default() -> Position {
        Position::Lineup
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerRecord {
    pub aliases: Vec<String>,
    pub id: String,
    pub current_team_id: Option<String>,
    pub current_team_name: Option<String>,
    pub debut_day: Option<u16>,
    pub debut_game_id: Option<String>,
    pub debut_season: Option<u16>,
    pub debut_team_id: Option<String>,
    pub debut_team_name: Option<String>,
    pub is_incinerated: bool,
    pub incinerated_game_day: Option<u16>,
    pub incinerated_game_id: Option<String>,
    pub incinerated_game_season: Option<u16>,
    pub last_game_day: Option<u16>,
    pub last_game_id: Option<String>,
    pub last_game_season: Option<u16>,
    pub name: String,
    pub position: Position,
    pub slug: String,
}

impl PlayerRecord {
    fn debut(id: &str, name: Option<&str>, position: Position, team: &TeamRef, game: &GameRef) -> PlayerRecord {
        let name = name.unwrap_or_default().to_owned();
        PlayerRecord {
            id: id.to_owned(),
            slug: slugify(&name),
            name,
            position,
            current_team_id: team.id.clone(),
            current_team_name: team.name.clone(),
            debut_day: Some(game.day),
            debut_game_id: Some(game.id.clone()),
            debut_season: Some(game.season),
            debut_team_id: team.id.clone(),
            debut_team_name: team.name.clone(),
            last_game_day: Some(game.day),
            last_game_id: Some(game.id.clone()),
            last_game_season: Some(game.season),
            ..PlayerRecord::default()
        }
    }

    fn add_alias(&mut self, alias: &str) {
        if !alias.is_empty() && alias != self.name && !self.aliases.iter().any(|a| a == alias) {
            self.aliases.push(alias.to_owned());
        }
    }

    fn rename(&mut self, name: &str) {
        if name.is_empty() || name == self.name {
            return;
        }
        let old = std::mem::replace(&mut self.name, name.to_owned());
        self.add_alias(&old);
        self.slug = slugify(name);
    }

    /// Folds in another record for the same player. This record's fields win; aliases are
    /// unioned and incineration sticks.
    fn absorb(&mut self, other: &PlayerRecord) {
        for alias in &other.aliases {
            self.add_alias(alias);
        }
        if other.name != self.name {
            self.add_alias(&other.name);
        }
        if other.is_incinerated && !self.is_incinerated {
            self.is_incinerated = true;
            self.incinerated_game_day = other.incinerated_game_day;
            self.incinerated_game_id = other.incinerated_game_id.clone();
            self.incinerated_game_season = other.incinerated_game_season;
        }
        macro_rules! prefer {
            ($($field:ident),*) => {
                $(
                    if self.$field.is_none() {
                        self.$field = other.$field.clone();
                    }
                )*
            };
        }
        prefer!(
            debut_day,
            debut_game_id,
            debut_season,
            debut_team_id,
            debut_team_name,
            current_team_id,
            current_team_name
        );
    }
}

/// Known players for one position, in first-seen order.
#[derive(Debug, Default)]
pub struct Roster {
    position: Position,
    players: IndexMap<String, PlayerRecord>,
}

impl Roster {
    pub fn new(position: Position, records: Vec<PlayerRecord>) -> Roster {
        let mut roster = Roster {
            position,
            players: IndexMap::new(),
        };
        for record in records {
            match roster.players.get_mut(&record.id) {
                Some(existing) => existing.absorb(&record),
                None => {
                    roster.players.insert(record.id.clone(), record);
                }
            }
        }
        roster
    }

    pub fn load(config: &Config, position: Position) -> Roster {
        let records: Vec<PlayerRecord> =
            store::read_json(&config.path(position.roster_file())).unwrap_or_default();
        Roster::new(position, records)
    }

    pub fn get(&self, id: &str) -> Option<&PlayerRecord> {
        self.players.get(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&PlayerRecord> {
        self.players.values().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Records a player being seen in a game: creates the record on debut, otherwise tracks name
    /// changes, the current team and the latest game.
    pub fn observe(&mut self, id: &str, name: Option<&str>, team: &TeamRef, game: &GameRef) {
        let position = self.position;
        let record = match self.players.get_mut(id) {
            Some(record) => record,
            None => {
                self.players.insert(
                    id.to_owned(),
                    PlayerRecord::debut(id, name, position, team, game),
                );
                return;
            }
        };
        if let Some(name) = name {
            record.rename(name);
        }
        if team.id.is_some() {
            record.current_team_id = team.id.clone();
            record.current_team_name = team.name.clone();
        }
        record.last_game_day = Some(game.day);
        record.last_game_id = Some(game.id.clone());
        record.last_game_season = Some(game.season);
    }

    pub fn incinerate(&mut self, name: &str, at: &GameRef) -> Result<(), Anomaly> {
        let id = self
            .find_by_name(name)
            .map(|p| p.id.clone())
            .ok_or_else(|| Anomaly::unresolved("incinerated player", name))?;
        let record = self
            .players
            .get_mut(&id)
            .ok_or_else(|| Anomaly::unresolved("incinerated player", name))?;
        record.is_incinerated = true;
        record.incinerated_game_day = Some(at.day);
        record.incinerated_game_id = Some(at.id.clone());
        record.incinerated_game_season = Some(at.season);
        Ok(())
    }

    pub fn records(&self) -> Vec<&PlayerRecord> {
        self.players.values().collect()
    }

    pub fn save(&self, config: &Config) -> Result<PathBuf> {
        let path = config.path(self.position.roster_file());
        store::write_json(&path, &self.records())?;
        Ok(path)
    }
}

/// Joins several rosters into one list. The first record seen for a player wins.
pub fn combine(rosters: Vec<Vec<PlayerRecord>>) -> Vec<PlayerRecord> {
    let mut combined: IndexMap<String, PlayerRecord> = IndexMap::new();
    for record in rosters.into_iter().flatten() {
        match combined.get_mut(&record.id) {
            Some(existing) => existing.absorb(&record),
            None => {
                combined.insert(record.id.clone(), record);
            }
        }
    }
    combined.into_iter().map(|(_, record)| record).collect()
}

#[instrument(name = "players", skip(config))]
pub fn run(config: &Config) -> Result<()> {
    let rosters = [Position::Rotation, Position::Lineup]
        .iter()
        .map(|position| {
            store::read_json::<Vec<PlayerRecord>>(&config.path(position.roster_file()))
                .unwrap_or_default()
        })
        .collect();
    let players = combine(rosters);
    let path = config.path("players/players.json");
    store::write_json(&path, &players)?;
    info!(players = players.len(), path = %path.display(), "combined rosters");
    Ok(())
}
