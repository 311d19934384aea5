use crate::error::Anomaly;
use crate::util::{non_empty, AwayHome, Side};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// One game's state as of a single tick. Every field is optional on the wire; `normalize` strips
/// nulls so the container default fills them in.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSnapshot {
    pub id: String,
    pub day: u16,
    pub season: u16,
    pub is_postseason: bool,
    pub inning: i32,
    pub top_of_inning: bool,
    pub away_team: Option<String>,
    pub away_team_name: Option<String>,
    pub away_team_nickname: Option<String>,
    pub home_team: Option<String>,
    pub home_team_name: Option<String>,
    pub home_team_nickname: Option<String>,
    pub away_pitcher: Option<String>,
    pub away_pitcher_name: Option<String>,
    pub home_pitcher: Option<String>,
    pub home_pitcher_name: Option<String>,
    pub away_batter: Option<String>,
    pub away_batter_name: Option<String>,
    pub home_batter: Option<String>,
    pub home_batter_name: Option<String>,
    pub away_score: f64,
    pub home_score: f64,
    pub half_inning_score: f64,
    pub last_update: String,
    pub bases_occupied: Vec<usize>,
    pub base_runners: Vec<String>,
    pub game_start: bool,
    pub game_complete: bool,
    pub weather: Option<usize>,
    pub outcomes: Vec<String>,
    pub shame: bool,
}

impl fmt::Debug for GameSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSnapshot")
            .field("id", &self.id)
            .field("season", &self.season)
            .field("day", &self.day)
            .field("inning", &self.inning)
            .field("top_of_inning", &self.top_of_inning)
            .field("last_update", &self.last_update)
            .finish()
    }
}

/// Season and phase a tally belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub postseason: bool,
    pub season: u16,
}

impl Scope {
    pub fn regular(season: u16) -> Scope {
        Scope {
            postseason: false,
            season,
        }
    }

    pub fn postseason(season: u16) -> Scope {
        Scope {
            postseason: true,
            season,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameRef {
    pub id: String,
    pub day: u16,
    pub season: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRef<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
}

/// Prepares a raw schedule entry: legacy `_id` is copied into `id` when `id` is absent, and null
/// fields are dropped.
pub fn normalize(raw: Value) -> Result<Value, Anomaly> {
    let mut object = match raw {
        Value::Object(object) => object,
        other => return Err(Anomaly::malformed("game snapshot", format!("not an object: {}", other))),
    };
    object.retain(|_, v| !v.is_null());
    if !object.contains_key("id") {
        if let Some(legacy) = object.get("_id").cloned() {
            object.insert("id".to_string(), legacy);
        }
    }
    Ok(Value::Object(object))
}

fn player_ref<'a>(id: &'a Option<String>, name: &'a Option<String>) -> Option<PlayerRef<'a>> {
    Some(PlayerRef {
        id: non_empty(id)?,
        name: non_empty(name),
    })
}

impl GameSnapshot {
    pub fn from_value(value: Value) -> Result<GameSnapshot, Anomaly> {
        serde_json::from_value(value).map_err(|err| Anomaly::malformed("game snapshot", err))
    }

    pub fn scope(&self) -> Scope {
        Scope {
            postseason: self.is_postseason,
            season: self.season,
        }
    }

    pub fn game_ref(&self) -> GameRef {
        GameRef {
            id: self.id.clone(),
            day: self.day,
            season: self.season,
        }
    }

    pub fn batting_side(&self) -> Side {
        Side::batting(self.top_of_inning)
    }

    pub fn fielding_side(&self) -> Side {
        self.batting_side().opponent()
    }

    pub fn batter(&self, side: Side) -> Option<PlayerRef<'_>> {
        match side {
            Side::Away => player_ref(&self.away_batter, &self.away_batter_name),
            Side::Home => player_ref(&self.home_batter, &self.home_batter_name),
        }
    }

    pub fn pitcher(&self, side: Side) -> Option<PlayerRef<'_>> {
        match side {
            Side::Away => player_ref(&self.away_pitcher, &self.away_pitcher_name),
            Side::Home => player_ref(&self.home_pitcher, &self.home_pitcher_name),
        }
    }

    /// The batter currently at the plate, if any.
    pub fn hitting(&self) -> Option<PlayerRef<'_>> {
        self.batter(self.batting_side())
    }

    /// The pitcher currently on the mound.
    pub fn fielding(&self) -> Option<PlayerRef<'_>> {
        self.pitcher(self.fielding_side())
    }

    pub fn team(&self, side: Side) -> TeamRef {
        let (id, name) = match side {
            Side::Away => (&self.away_team, &self.away_team_name),
            Side::Home => (&self.home_team, &self.home_team_name),
        };
        TeamRef {
            id: non_empty(id).map(str::to_owned),
            name: non_empty(name).map(str::to_owned),
        }
    }

    pub fn nickname(&self, side: Side) -> Option<&str> {
        non_empty(match side {
            Side::Away => &self.away_team_nickname,
            Side::Home => &self.home_team_nickname,
        })
    }

    pub fn scores(&self) -> AwayHome<f64> {
        AwayHome {
            away: self.away_score,
            home: self.home_score,
        }
    }

    pub fn runners_in_scoring_position(&self) -> bool {
        self.bases_occupied.iter().any(|&base| base == 1 || base == 2)
    }
}

#[cfg(test)]
pub mod tests {
    use super::{normalize, GameSnapshot, Scope};
    use crate::util::Side;
    use serde_json::{json, Value};

    /// Builds a snapshot from a JSON fixture, filling in a game that has started.
    pub fn snapshot(value: Value) -> GameSnapshot {
        let mut base = json!({
            "id": "G1",
            "season": 1,
            "day": 0,
            "gameStart": true,
            "awayTeam": "T-away",
            "awayTeamName": "Away Team",
            "awayTeamNickname": "Aways",
            "homeTeam": "T-home",
            "homeTeamName": "Home Team",
            "homeTeamNickname": "Homes",
            "awayPitcher": "AP",
            "awayPitcherName": "Away Pitcher",
            "homePitcher": "HP",
            "homePitcherName": "Home Pitcher",
        });
        if let (Some(base), Value::Object(fields)) = (base.as_object_mut(), value) {
            base.extend(fields);
        }
        GameSnapshot::from_value(normalize(base).unwrap()).unwrap()
    }

    #[test]
    fn test_normalize_legacy_id() {
        let value = normalize(json!({"_id": "G9", "lastUpdate": null, "day": 3})).unwrap();
        assert_eq!(value, json!({"_id": "G9", "id": "G9", "day": 3}));

        let value = normalize(json!({"_id": "old", "id": "new"})).unwrap();
        assert_eq!(value["id"], "new");

        assert!(normalize(json!([1, 2])).is_err());
    }

    #[test]
    fn test_null_fields_default() {
        let game = GameSnapshot::from_value(
            normalize(json!({"id": "G1", "awayBatter": null, "basesOccupied": null, "homeScore": 4.0}))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(game.away_batter, None);
        assert!(game.bases_occupied.is_empty());
        assert!((game.home_score - 4.0).abs() < f64::EPSILON);
        assert!(!game.game_start);
    }

    #[test]
    fn test_sides() {
        let game = snapshot(json!({
            "topOfInning": true,
            "awayBatter": "P1",
            "awayBatterName": "Player One",
            "homeBatter": "",
            "isPostseason": true,
            "season": 4,
        }));
        assert_eq!(game.hitting().map(|p| p.id), Some("P1"));
        assert_eq!(game.hitting().and_then(|p| p.name), Some("Player One"));
        assert_eq!(game.fielding().map(|p| p.id), Some("HP"));
        assert_eq!(game.batter(Side::Home), None);
        assert_eq!(game.team(Side::Away).id.as_deref(), Some("T-away"));
        assert_eq!(game.scope(), Scope::postseason(4));
    }

    #[test]
    fn test_risp() {
        assert!(!snapshot(json!({"basesOccupied": [0]})).runners_in_scoring_position());
        assert!(snapshot(json!({"basesOccupied": [1]})).runners_in_scoring_position());
        assert!(snapshot(json!({"basesOccupied": [0, 2]})).runners_in_scoring_position());
    }
}
