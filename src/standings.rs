use crate::config::Config;
use crate::error::Anomaly;
use crate::reference::{Membership, ReferenceData};
use crate::snapshot::{normalize, GameSnapshot};
use crate::stats::record_percentage;
use crate::store;
use crate::util::{round_tenth, slugify, Side};
use anyhow::Result;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

const WEATHER: &[&str] = &[
    "Void",
    "Sun 2",
    "Overcast",
    "Rainy",
    "Sandstorm",
    "Snowy",
    "Acidic",
    "Solar Eclipse",
    "Glitter",
    "Bloodwind",
    "Peanuts",
    "Birds",
    "Feedback",
    "Reverb",
    "Black Hole",
    "Coffee",
    "Coffee 2",
    "Coffee 3s",
    "Flooding",
    "???",
    "???",
    "???",
    "???",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct NoLabel {}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitType {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionLabel {
    pub division_id: String,
    pub division_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueLabel {
    pub league_id: String,
    pub league_name: String,
}

/// A win-loss record over some subset of games.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Split<L = NoLabel> {
    pub wins: i32,
    pub losses: i32,
    pub pct: f64,
    #[serde(flatten)]
    pub label: L,
}

impl<L> Split<L> {
    fn labeled(label: L) -> Split<L> {
        Split {
            wins: 0,
            losses: 0,
            pct: 0.0,
            label,
        }
    }

    fn win(&mut self) {
        self.wins += 1;
        self.pct = record_percentage(self.wins, self.losses);
    }

    fn lose(&mut self) {
        self.losses += 1;
        self.pct = record_percentage(self.wins, self.losses);
    }

    fn record(&mut self, won: bool) {
        if won {
            self.win();
        } else {
            self.lose();
        }
    }
}

fn typed(kind: &str) -> Split<SplitType> {
    Split::labeled(SplitType {
        kind: kind.to_owned(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRecords {
    pub home: Split<SplitType>,
    pub away: Split<SplitType>,
    pub extra_innings: Split<SplitType>,
    pub winners: Split<SplitType>,
    pub one_run: Split<SplitType>,
    pub shame: Split<SplitType>,
}

impl Default for SplitRecords {
    fn default() -> SplitRecords {
        SplitRecords {
            home: typed("home"),
            away: typed("away"),
            extra_innings: typed("extraInnings"),
            winners: typed("winners"),
            one_run: typed("oneRun"),
            shame: typed("shame"),
        }
    }
}

impl SplitRecords {
    fn side(&mut self, side: Side) -> &mut Split<SplitType> {
        match side {
            Side::Away => &mut self.away,
            Side::Home => &mut self.home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreakType {
    Wins,
    Losses,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub streak_type: Option<StreakType>,
    pub streak_number: u32,
    pub streak_code: String,
}

impl Streak {
    fn extend(&mut self, won: bool) {
        let kind = if won { StreakType::Wins } else { StreakType::Losses };
        if self.streak_type == Some(kind) {
            self.streak_number += 1;
        } else {
            self.streak_type = Some(kind);
            self.streak_number = 1;
        }
        self.streak_code = format!("{}{}", if won { 'W' } else { 'L' }, self.streak_number);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    pub team_id: String,
    pub team_name: String,
    pub team_slug: String,
    pub season: u16,
    pub streak: Streak,
    pub division_rank: usize,
    pub league_rank: usize,
    pub sport_rank: usize,
    pub games_played: u32,
    pub games_back: String,
    pub league_games_back: String,
    pub sport_games_back: String,
    pub division_games_back: String,
    pub league_record: Split,
    pub split_records: SplitRecords,
    pub weather_records: BTreeMap<usize, Split<SplitType>>,
    pub league_records: IndexMap<String, Split<LeagueLabel>>,
    pub division_records: IndexMap<String, Split<DivisionLabel>>,
    pub runs_allowed: f64,
    pub runs_scored: f64,
    pub elimination_number: String,
    pub division_champ: bool,
    pub division_leader: bool,
    pub league_leader: bool,
    pub sport_leader: bool,
    pub clinched: bool,
    pub magic_number: String,
    pub wins: i32,
    pub losses: i32,
    pub run_differential: f64,
    pub winning_percentage: f64,
}

impl TeamRecord {
    fn new(id: &str, name: &str, season: u16) -> TeamRecord {
        TeamRecord {
            team_id: id.to_owned(),
            team_name: name.to_owned(),
            team_slug: slugify(name),
            season,
            ..TeamRecord::default()
        }
    }

    fn differential(&self) -> i32 {
        self.wins - self.losses
    }
}

/// Runs credited to a side. "Sun 2" hands ten runs to the team it names; "Black Hole" hands ten to
/// every team it doesn't.
fn count_runs(game: &GameSnapshot, side: Side) -> f64 {
    let mut runs = *game.scores().get(side);
    for outcome in &game.outcomes {
        let named = mentions(outcome, game.nickname(side));
        if outcome.contains("Sun 2") && named {
            runs += 10.0;
        } else if outcome.contains("Black Hole") && !named {
            runs += 10.0;
        }
    }
    runs
}

/// Wins credited to a side: the game itself, plus one for a "Sun 2" and minus one for a
/// "Black Hole" that names the team.
fn count_wins(game: &GameSnapshot, side: Side, winner: Side) -> i32 {
    let mut wins = if side == winner { 1 } else { 0 };
    for outcome in &game.outcomes {
        let named = mentions(outcome, game.nickname(side));
        if outcome.contains("Sun 2") && named {
            wins += 1;
        } else if outcome.contains("Black Hole") && named {
            wins -= 1;
        }
    }
    wins
}

fn mentions(outcome: &str, nickname: Option<&str>) -> bool {
    nickname.map_or(false, |nickname| outcome.contains(nickname))
}

fn games_back(leader_differential: i32, differential: i32) -> String {
    let twice = leader_differential - differential;
    if twice % 2 == 0 {
        (twice / 2).to_string()
    } else {
        format!("{:.1}", f64::from(twice) / 2.0)
    }
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// One season's standings, folded game by game.
pub struct Standings<'r> {
    season: u16,
    reference: &'r ReferenceData,
    teams: Vec<TeamRecord>,
    index: FxHashMap<String, usize>,
    divisions: IndexMap<String, Vec<usize>>,
    leagues: IndexMap<String, Vec<usize>>,
}

impl<'r> Standings<'r> {
    pub fn new(season: u16, reference: &'r ReferenceData) -> Standings<'r> {
        Standings {
            season,
            reference,
            teams: Vec::new(),
            index: FxHashMap::default(),
            divisions: IndexMap::new(),
            leagues: IndexMap::new(),
        }
    }

    fn team(&mut self, game: &GameSnapshot, side: Side) -> Option<usize> {
        let team = game.team(side);
        let id = team.id?;
        if let Some(index) = self.index.get(&id) {
            return Some(*index);
        }
        let name = team.name.unwrap_or_default();
        self.teams.push(TeamRecord::new(&id, &name, self.season));
        self.index.insert(id, self.teams.len() - 1);
        Some(self.teams.len() - 1)
    }

    fn membership(&self, game: &GameSnapshot, side: Side) -> Membership<'r> {
        let team = game.team(side).id.unwrap_or_default();
        let membership = self.reference.membership(self.season, &team);
        if membership.division.is_none() {
            debug!(anomaly = %Anomaly::unresolved("division for team", team), season = self.season, "standings");
        }
        membership
    }

    /// Folds one game in. Games still in progress and postseason games don't count.
    pub fn record_game(&mut self, game: &GameSnapshot) {
        if !game.game_complete || game.is_postseason {
            return;
        }
        let winner = if game.home_score > game.away_score {
            Side::Home
        } else {
            Side::Away
        };
        let loser = winner.opponent();

        let (w, l) = match (self.team(game, winner), self.team(game, loser)) {
            (Some(w), Some(l)) if w != l => (w, l),
            _ => {
                warn!(anomaly = %Anomaly::malformed("game result", "missing or identical teams"), game = %game.id, "skipping game");
                return;
            }
        };
        let winner_membership = self.membership(game, winner);
        let loser_membership = self.membership(game, loser);

        let winner_runs = count_runs(game, winner);
        let loser_runs = count_runs(game, loser);
        let margin = (game.home_score - game.away_score).abs();
        let weather = game
            .weather
            .map(|w| (w, WEATHER.get(w).copied().unwrap_or_default()));

        let (winning, losing) = pair_mut(&mut self.teams, w, l);
        for (record, side, won) in [(&mut *winning, winner, true), (&mut *losing, loser, false)] {
            record.streak.extend(won);
            record.games_played += 1;
            record.wins += count_wins(game, side, winner);
            if !won {
                record.losses += 1;
            }
            record.winning_percentage = record_percentage(record.wins, record.losses);
        }

        winning.runs_scored += winner_runs;
        winning.runs_allowed += loser_runs;
        losing.runs_scored += loser_runs;
        losing.runs_allowed += winner_runs;
        winning.run_differential = round_tenth(winning.run_differential + winner_runs - loser_runs);
        losing.run_differential = round_tenth(losing.run_differential - (winner_runs - loser_runs));

        let same_league = match (winner_membership.subleague, loser_membership.subleague) {
            (Some(a), Some(b)) => a.id == b.id,
            _ => false,
        };
        if same_league {
            winning.league_record.win();
            losing.league_record.lose();
        }

        winning.split_records.side(winner).win();
        losing.split_records.side(loser).lose();

        // Splits that depend on both records after this game.
        let beat_a_winner = losing.winning_percentage > 0.5;
        let lost_to_a_winner = winning.winning_percentage > 0.5;
        if beat_a_winner {
            winning.split_records.winners.win();
        }
        if lost_to_a_winner {
            losing.split_records.winners.lose();
        }

        for (record, won) in [(&mut *winning, true), (&mut *losing, false)] {
            if game.inning > 8 {
                record.split_records.extra_innings.record(won);
            }
            if (margin - 1.0).abs() < f64::EPSILON {
                record.split_records.one_run.record(won);
            }
            if game.shame {
                record.split_records.shame.record(won);
            }
            if let Some((code, name)) = weather {
                record
                    .weather_records
                    .entry(code)
                    .or_insert_with(|| typed(name))
                    .record(won);
            }
        }

        if let (Some(wd), Some(ld)) = (winner_membership.division, loser_membership.division) {
            winning
                .division_records
                .entry(ld.id.clone())
                .or_insert_with(|| {
                    Split::labeled(DivisionLabel {
                        division_id: ld.id.clone(),
                        division_name: ld.name.clone(),
                    })
                })
                .win();
            losing
                .division_records
                .entry(wd.id.clone())
                .or_insert_with(|| {
                    Split::labeled(DivisionLabel {
                        division_id: wd.id.clone(),
                        division_name: wd.name.clone(),
                    })
                })
                .lose();
        }
        if let (Some(ws), Some(ls)) = (winner_membership.subleague, loser_membership.subleague) {
            winning
                .league_records
                .entry(ls.id.clone())
                .or_insert_with(|| {
                    Split::labeled(LeagueLabel {
                        league_id: ls.id.clone(),
                        league_name: ls.name.clone(),
                    })
                })
                .win();
            losing
                .league_records
                .entry(ws.id.clone())
                .or_insert_with(|| {
                    Split::labeled(LeagueLabel {
                        league_id: ws.id.clone(),
                        league_name: ws.name.clone(),
                    })
                })
                .lose();
        }

        for (index, membership) in [(w, winner_membership), (l, loser_membership)] {
            if let Some(division) = membership.division {
                let members = self.divisions.entry(division.id.clone()).or_default();
                if !members.contains(&index) {
                    members.push(index);
                }
            }
            if let Some(subleague) = membership.subleague {
                let members = self.leagues.entry(subleague.id.clone()).or_default();
                if !members.contains(&index) {
                    members.push(index);
                }
            }
        }
    }

    /// Orders by wins, keeping first-seen order among ties.
    fn sorted(&self, members: &[usize]) -> Vec<usize> {
        let mut sorted = members.to_vec();
        sorted.sort_by(|a, b| self.teams[*b].wins.cmp(&self.teams[*a].wins));
        sorted
    }

    /// Assigns ranks, games back and clinch numbers. Returns records grouped by division in
    /// division rank order.
    pub fn finish(mut self, games_in_season: i32, playoff_spots: usize) -> IndexMap<String, Vec<TeamRecord>> {
        let all: Vec<usize> = (0..self.teams.len()).collect();
        let sport = self.sorted(&all);
        if let Some(&leader) = sport.first() {
            self.teams[leader].sport_leader = true;
            let lead = self.teams[leader].differential();
            for (rank, &i) in sport.iter().enumerate() {
                let record = &mut self.teams[i];
                record.sport_rank = rank + 1;
                record.sport_games_back = if rank == 0 {
                    "-".to_owned()
                } else {
                    games_back(lead, record.differential())
                };
            }
        }

        for members in self.divisions.values() {
            let sorted = self.sorted(members);
            let lead = self.teams[sorted[0]].differential();
            self.teams[sorted[0]].division_leader = true;
            for (rank, &i) in sorted.iter().enumerate() {
                let record = &mut self.teams[i];
                record.division_rank = rank + 1;
                record.division_games_back = if rank == 0 {
                    "-".to_owned()
                } else {
                    games_back(lead, record.differential())
                };
            }
        }

        for members in self.leagues.values() {
            let sorted = self.sorted(members);
            self.teams[sorted[0]].league_leader = true;

            if sorted.len() > playoff_spots && playoff_spots > 0 {
                let first_out_losses = self.teams[sorted[playoff_spots]].losses;
                let last_in_wins = self.teams[sorted[playoff_spots - 1]].wins;
                for (rank, &i) in sorted.iter().enumerate() {
                    let record = &mut self.teams[i];
                    if rank < playoff_spots {
                        let magic = games_in_season + 1 - record.wins - first_out_losses;
                        record.clinched = magic <= 0;
                        record.magic_number = if magic <= 0 { "X".to_owned() } else { magic.to_string() };
                        record.elimination_number = "-".to_owned();
                    } else {
                        let tragic = games_in_season + 1 - last_in_wins - record.losses;
                        record.magic_number = "-".to_owned();
                        record.elimination_number = if tragic <= 0 { "E".to_owned() } else { tragic.to_string() };
                    }
                }
            } else {
                for &i in &sorted {
                    self.teams[i].magic_number = "-".to_owned();
                    self.teams[i].elimination_number = "-".to_owned();
                }
            }

            let lead = self.teams[sorted[0]].differential();
            for (rank, &i) in sorted.iter().enumerate() {
                let record = &mut self.teams[i];
                record.league_rank = rank + 1;
                record.league_games_back = if rank == 0 {
                    "-".to_owned()
                } else {
                    games_back(lead, record.differential())
                };
                record.games_back = record.league_games_back.clone();
            }
        }

        let mut by_division = IndexMap::new();
        for (division, members) in &self.divisions {
            let mut members = members.clone();
            members.sort_by_key(|i| self.teams[*i].division_rank);
            by_division.insert(
                division.clone(),
                members.into_iter().map(|i| self.teams[i].clone()).collect(),
            );
        }
        by_division
    }
}

type GameResults = BTreeMap<u16, BTreeMap<u16, Vec<Value>>>;

#[instrument(name = "standings", skip(config))]
pub fn run(config: &Config) -> Result<()> {
    let reference = ReferenceData::load(&config.reference_dir)?;
    let results: GameResults = store::read_json(&config.path("gameResults.json")).unwrap_or_default();

    let mut standings = BTreeMap::new();
    for (season, days) in results {
        let mut table = Standings::new(season, &reference);
        for games in days.into_values() {
            for raw in games {
                match normalize(raw).and_then(GameSnapshot::from_value) {
                    Ok(game) => table.record_game(&game),
                    Err(anomaly) => warn!(%anomaly, season, "skipping game result"),
                }
            }
        }
        standings.insert(season, table.finish(config.games_in_season, config.playoff_spots));
    }

    store::write_json(&config.path("standings/standings.json"), &standings)?;
    info!(seasons = standings.len(), "wrote standings");
    Ok(())
}
