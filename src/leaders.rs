use crate::batting::BattingTally;
use crate::config::Config;
use crate::pitching::PitchingTally;
use crate::store;
use crate::tally::{Accumulator, Summary, Tally};
use anyhow::Result;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Kind {
    Batting,
    Pitching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    fn beats(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Sort::Asc => candidate < incumbent,
            Sort::Desc => candidate > incumbent,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub abbreviation: &'static str,
    pub id: &'static str,
    pub name: &'static str,
    pub sort: Sort,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_innings_per_team_game: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_plate_appearances_per_team_game: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Kind,
}

impl Category {
    const fn new(kind: Kind, abbreviation: &'static str, id: &'static str, name: &'static str, sort: Sort) -> Category {
        Category {
            abbreviation,
            id,
            name,
            sort,
            minimum_innings_per_team_game: None,
            minimum_plate_appearances_per_team_game: None,
            kind,
        }
    }

    const fn min_plate_appearances(self, per_team_game: f64) -> Category {
        Category {
            minimum_plate_appearances_per_team_game: Some(per_team_game),
            ..self
        }
    }

    const fn min_innings(self, per_team_game: f64) -> Category {
        Category {
            minimum_innings_per_team_game: Some(per_team_game),
            ..self
        }
    }

    /// Whether a line has enough playing time to be ranked in this category.
    pub fn qualifies<T: Tally>(&self, tally: &T, team_games: f64) -> bool {
        let gate = |field: &str, per_game: Option<f64>| match per_game {
            Some(per_game) => tally.value(field).unwrap_or(0.0) >= team_games * per_game,
            None => true,
        };
        gate("plateAppearances", self.minimum_plate_appearances_per_team_game)
            && gate("inningsPitched", self.minimum_innings_per_team_game)
    }
}

const fn batting(abbreviation: &'static str, id: &'static str, name: &'static str) -> Category {
    Category::new(Kind::Batting, abbreviation, id, name, Sort::Desc)
}

const fn pitching(abbreviation: &'static str, id: &'static str, name: &'static str, sort: Sort) -> Category {
    Category::new(Kind::Pitching, abbreviation, id, name, sort)
}

pub const CATEGORIES: &[Category] = &[
    batting("AVG", "battingAverage", "Batting Average").min_plate_appearances(3.0),
    batting("CS", "caughtStealing", "Caught Stealing"),
    batting("2B", "doublesHit", "Doubles Hit"),
    batting("GDP", "groundIntoDoublePlays", "Ground Into Double Plays"),
    batting("H", "hits", "Hits"),
    batting("HR", "homeRunsHit", "Home Runs Hit"),
    batting("OBP", "onBasePercentage", "On-base Percentage").min_plate_appearances(3.0),
    batting("RBI", "runsBattedIn", "Runs Batted In"),
    batting("SLG", "sluggingPercentage", "Slugging Percentage").min_plate_appearances(3.0),
    batting("SB", "stolenBases", "Stolen Bases"),
    batting("SO", "strikeouts", "Strikeouts"),
    batting("3B", "triplesHit", "Triples Hit"),
    pitching("BB", "basesOnBalls", "Bases on Balls", Sort::Desc),
    pitching("BB9", "basesOnBallsPerNine", "Walks Per 9 Innings", Sort::Asc).min_innings(1.0),
    pitching("ER", "earnedRuns", "Earned Runs", Sort::Desc),
    pitching("ERA", "earnedRunAverage", "Earned Run Average", Sort::Asc).min_innings(1.0),
    pitching("H", "hitsAllowed", "Hits Allowed", Sort::Desc),
    pitching("H9", "hitsAllowedPerNine", "Hits Allowed Per 9 Innings", Sort::Asc).min_innings(1.0),
    pitching("HR", "homeRuns", "Home Runs Allowed", Sort::Desc),
    pitching("HR9", "homeRunsPerNine", "Home Runs Allowed Per 9 Innings", Sort::Asc).min_innings(1.0),
    pitching("IP", "inningsPitched", "Innings Pitched", Sort::Desc),
    pitching("L", "losses", "Losses", Sort::Desc),
    pitching("QS", "qualityStarts", "Quality Starts", Sort::Desc),
    pitching("SHO", "shutouts", "Shutouts", Sort::Desc),
    pitching("SO", "strikeouts", "Strikeouts", Sort::Desc),
    pitching("SO/BB", "strikeoutToWalkRatio", "Strikeout-to-Walk Ratio", Sort::Desc).min_innings(1.0),
    pitching("SO9", "strikeoutsPerNine", "Strikeouts Per 9 Innings", Sort::Desc).min_innings(1.0),
    pitching("SO%", "strikeoutRate", "Strikeout Percentage", Sort::Desc).min_innings(1.0),
    pitching("WHIP", "walksAndHitsPerInningPitched", "Walks and Hits Per Inning Pitched", Sort::Asc)
        .min_innings(1.0),
    pitching("BB%", "walkRate", "Walk Percentage", Sort::Asc).min_innings(1.0),
    pitching("W-L%", "winningPercentage", "Winning Percentage", Sort::Desc).min_innings(1.0),
    pitching("W", "wins", "Wins", Sort::Desc),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leader {
    pub player_id: String,
    pub player_name: String,
    pub player_slug: String,
    pub team: Option<String>,
    pub team_name: Option<String>,
    pub value: f64,
}

impl Leader {
    fn new<T: Tally>(summary: &Summary<T>, tally: &T, value: f64) -> Leader {
        Leader {
            player_id: summary.id.clone(),
            player_name: summary.name.clone(),
            player_slug: summary.slug.clone(),
            team: tally.affiliation().team.clone(),
            team_name: tally.affiliation().team_name.clone(),
            value,
        }
    }
}

/// Inserts a qualifying line into an ordered leader list capped at `max`. The candidate goes in
/// front of the first entry it strictly beats, so earlier entries win ties. A candidate that beats
/// nobody still joins the end while there is room.
pub fn update<T: Tally>(
    leaders: &mut Vec<Leader>,
    category: &Category,
    summary: &Summary<T>,
    tally: &T,
    team_games: f64,
    max: usize,
) {
    if !category.qualifies(tally, team_games) {
        return;
    }
    let value = match tally.value(category.id) {
        Some(value) => value,
        None => return,
    };
    let position = leaders
        .iter()
        .position(|leader| category.sort.beats(value, leader.value))
        .unwrap_or_else(|| leaders.len());
    if position >= max {
        return;
    }
    leaders.insert(position, Leader::new(summary, tally, value));
    leaders.truncate(max);
}

/// Team games used to scale qualification thresholds, inferred per season from the most
/// appearances any player has made.
#[derive(Debug, Default)]
pub struct GamesPerSeason {
    seasons: BTreeMap<u16, u32>,
    fallback: u32,
}

impl GamesPerSeason {
    pub fn new(fallback: u32) -> GamesPerSeason {
        GamesPerSeason {
            seasons: BTreeMap::new(),
            fallback,
        }
    }

    pub fn observe<T: Tally>(&mut self, accumulator: &Accumulator<T>) {
        for summary in accumulator.players() {
            for (season, tally) in &summary.seasons {
                let games = self.seasons.entry(*season).or_default();
                *games = (*games).max(tally.appearances());
            }
        }
    }

    pub fn get(&self, season: Option<u16>) -> f64 {
        let games = season
            .and_then(|season| self.seasons.get(&season))
            .copied()
            .filter(|games| *games > 0)
            .unwrap_or(self.fallback);
        f64::from(games)
    }
}

#[derive(Debug, Default)]
struct Ranking {
    all_time: Vec<Leader>,
    seasons: BTreeMap<u16, Vec<Leader>>,
}

fn rank<T: Tally>(category: &Category, accumulator: &Accumulator<T>, games: &GamesPerSeason, max: usize) -> Ranking {
    let mut ranking = Ranking::default();
    for summary in accumulator.players() {
        update(
            &mut ranking.all_time,
            category,
            summary,
            &summary.career_season,
            games.get(None),
            max,
        );
        for (season, tally) in &summary.seasons {
            update(
                ranking.seasons.entry(*season).or_default(),
                category,
                summary,
                tally,
                games.get(Some(*season)),
                max,
            );
        }
    }
    ranking
}

type Board = BTreeMap<Kind, IndexMap<&'static str, Vec<Leader>>>;

#[derive(Debug, Default, Serialize)]
pub struct Leaderboards {
    #[serde(flatten)]
    pub seasons: BTreeMap<u16, Board>,
    #[serde(rename = "allTime")]
    pub all_time: Board,
}

pub fn leaderboards(
    batters: &Accumulator<BattingTally>,
    pitchers: &Accumulator<PitchingTally>,
    games: &GamesPerSeason,
    max: usize,
) -> Leaderboards {
    let rankings: Vec<(&Category, Ranking)> = CATEGORIES
        .par_iter()
        .map(|category| {
            let ranking = match category.kind {
                Kind::Batting => rank(category, batters, games, max),
                Kind::Pitching => rank(category, pitchers, games, max),
            };
            (category, ranking)
        })
        .collect();

    let mut boards = Leaderboards::default();
    for (category, ranking) in rankings {
        debug!(category = category.id, kind = ?category.kind, "ranked");
        boards
            .all_time
            .entry(category.kind)
            .or_default()
            .insert(category.id, ranking.all_time);
        for (season, leaders) in ranking.seasons {
            boards
                .seasons
                .entry(season)
                .or_default()
                .entry(category.kind)
                .or_default()
                .insert(category.id, leaders);
        }
    }
    boards
}

#[instrument(name = "leaders", skip(config))]
pub fn run(config: &Config) -> Result<()> {
    let batters: Accumulator<BattingTally> =
        store::read_json(&config.path("batting/batters.json")).unwrap_or_default();
    let pitchers: Accumulator<PitchingTally> =
        store::read_json(&config.path("pitching/pitchers.json")).unwrap_or_default();

    let mut games = GamesPerSeason::new(config.team_games_per_season);
    games.observe(&batters);
    games.observe(&pitchers);

    let boards = leaderboards(&batters, &pitchers, &games, config.max_leaders);
    store::write_json(&config.path("leaders/leaders.json"), &boards)?;
    store::write_json(&config.path("leaders/categories.json"), &CATEGORIES)?;
    info!(
        seasons = boards.seasons.len(),
        categories = CATEGORIES.len(),
        "wrote leaderboards"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{leaderboards, update, Category, GamesPerSeason, Kind, CATEGORIES};
    use crate::batting::{BattingStat, BattingTally};
    use crate::pitching::{PitchingStat, PitchingTally};
    use crate::snapshot::Scope;
    use crate::tally::Accumulator;

    fn category(id: &str) -> &'static Category {
        CATEGORIES.iter().find(|c| c.id == id).unwrap()
    }

    #[test]
    fn test_category_table() {
        assert_eq!(CATEGORIES.iter().filter(|c| c.kind == Kind::Batting).count(), 12);
        assert_eq!(CATEGORIES.iter().filter(|c| c.kind == Kind::Pitching).count(), 20);
        let json = serde_json::to_value(category("earnedRunAverage")).unwrap();
        assert_eq!(json["abbreviation"], "ERA");
        assert_eq!(json["sort"], "asc");
        assert_eq!(json["minimumInningsPerTeamGame"], 1.0);
        assert_eq!(json["type"], "pitching");
        assert!(json.get("minimumPlateAppearancesPerTeamGame").is_none());
    }

    #[test]
    fn test_cap() {
        let mut acc = Accumulator::<BattingTally>::new();
        for i in 1..=15 {
            acc.add(&format!("P{:02}", i), Scope::regular(1), BattingStat::Hits, f64::from(i));
        }
        acc.finalize();
        let hits = category("hits");
        let mut leaders = Vec::new();
        for summary in acc.players() {
            update(&mut leaders, hits, summary, &summary.seasons[&1], 100.0, 10);
        }
        let values: Vec<f64> = leaders.iter().map(|l| l.value).collect();
        assert_eq!(values, (6..=15).rev().map(f64::from).collect::<Vec<_>>());
        assert_eq!(leaders[0].player_id, "P15");
    }

    #[test]
    fn test_ascending_and_gate() {
        let mut acc = Accumulator::<PitchingTally>::new();
        let scope = Scope::regular(1);
        // 30 outs is 10 innings; 60 outs is 20.
        acc.add("ACE", scope, PitchingStat::OutsRecorded, 60.0);
        acc.add("ACE", scope, PitchingStat::EarnedRuns, 2.0);
        acc.add("MID", scope, PitchingStat::OutsRecorded, 60.0);
        acc.add("MID", scope, PitchingStat::EarnedRuns, 6.0);
        acc.add("SHORT", scope, PitchingStat::OutsRecorded, 3.0);
        acc.finalize();

        let era = category("earnedRunAverage");
        let mut leaders = Vec::new();
        for summary in acc.players() {
            update(&mut leaders, era, summary, &summary.seasons[&1], 10.0, 10);
        }
        let ids: Vec<&str> = leaders.iter().map(|l| l.player_id.as_str()).collect();
        assert_eq!(ids, vec!["ACE", "MID"]);
    }

    #[test]
    fn test_ties_keep_order() {
        let mut acc = Accumulator::<BattingTally>::new();
        acc.add("FIRST", Scope::regular(1), BattingStat::Hits, 3.0);
        acc.add("SECOND", Scope::regular(1), BattingStat::Hits, 3.0);
        acc.finalize();
        let mut leaders = Vec::new();
        for summary in acc.players() {
            update(&mut leaders, category("hits"), summary, &summary.seasons[&1], 100.0, 10);
        }
        assert_eq!(leaders[0].player_id, "FIRST");
        assert_eq!(leaders[1].player_id, "SECOND");
    }

    #[test]
    fn test_games_per_season() {
        let mut batters = Accumulator::<BattingTally>::new();
        batters.add("B1", Scope::regular(2), BattingStat::Appearances, 12.0);
        let mut pitchers = Accumulator::<PitchingTally>::new();
        pitchers.add("P1", Scope::regular(2), PitchingStat::Appearances, 15.0);
        pitchers.ensure("P2", None, Scope::regular(3));

        let mut games = GamesPerSeason::new(100);
        games.observe(&batters);
        games.observe(&pitchers);
        assert!((games.get(Some(2)) - 15.0).abs() < f64::EPSILON);
        assert!((games.get(Some(3)) - 100.0).abs() < f64::EPSILON);
        assert!((games.get(None) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_leaderboards_shape() {
        let mut batters = Accumulator::<BattingTally>::new();
        batters.add("B1", Scope::regular(2), BattingStat::Hits, 4.0);
        batters.add("B1", Scope::postseason(2), BattingStat::Hits, 9.0);
        batters.finalize();
        let pitchers = Accumulator::<PitchingTally>::new();
        let boards = leaderboards(&batters, &pitchers, &GamesPerSeason::new(100), 10);

        let json = serde_json::to_value(&boards).unwrap();
        assert_eq!(json["2"]["batting"]["hits"][0]["playerId"], "B1");
        assert_eq!(json["2"]["batting"]["hits"][0]["value"], 4.0);
        assert_eq!(json["allTime"]["batting"]["hits"][0]["value"], 4.0);
        assert_eq!(json["allTime"]["pitching"]["wins"], serde_json::json!([]));
        assert_eq!(json["2"]["batting"]["battingAverage"], serde_json::json!([]));
    }
}
