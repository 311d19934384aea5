use crate::classify::{apply_rules, increment, incinerated, Event, Role, Rule, Sighting, Target};
use crate::error::Anomaly;
use crate::filter::Transition;
use crate::players::{Position, Roster};
use crate::stats;
use crate::tally::{Affiliation, Tally};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattingStat {
    Appearances,
    PlateAppearances,
    AtBats,
    AtBatsWithRunnersInScoringPosition,
    Hits,
    HitsWithRunnersInScoringPosition,
    DoublesHit,
    TriplesHit,
    HomeRunsHit,
    BasesOnBalls,
    Strikeouts,
    GroundIntoDoublePlays,
    SacrificeBunts,
    SacrificeFlies,
    RunsBattedIn,
    RunsScored,
    StolenBases,
    CaughtStealing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattingTally {
    pub appearances: u32,
    pub at_bats: u32,
    pub at_bats_with_runners_in_scoring_position: u32,
    pub bases_on_balls: u32,
    pub batting_average: f64,
    pub batting_average_with_runners_in_scoring_position: f64,
    pub caught_stealing: u32,
    pub doubles_hit: u32,
    pub ground_into_double_plays: u32,
    pub hits: u32,
    pub hits_with_runners_in_scoring_position: u32,
    pub home_runs_hit: u32,
    pub on_base_percentage: f64,
    pub on_base_plus_slugging: f64,
    pub plate_appearances: u32,
    pub runs_batted_in: f64,
    pub runs_scored: u32,
    pub sacrifice_bunts: u32,
    pub sacrifice_flies: u32,
    pub slugging_percentage: f64,
    pub stolen_bases: u32,
    pub strikeouts: u32,
    #[serde(flatten)]
    pub affiliation: Affiliation,
    pub total_bases: u32,
    pub triples_hit: u32,
}

impl BattingTally {
    fn counter(&mut self, stat: BattingStat) -> Option<&mut u32> {
        Some(match stat {
            BattingStat::Appearances => &mut self.appearances,
            BattingStat::PlateAppearances => &mut self.plate_appearances,
            BattingStat::AtBats => &mut self.at_bats,
            BattingStat::AtBatsWithRunnersInScoringPosition => {
                &mut self.at_bats_with_runners_in_scoring_position
            }
            BattingStat::Hits => &mut self.hits,
            BattingStat::HitsWithRunnersInScoringPosition => {
                &mut self.hits_with_runners_in_scoring_position
            }
            BattingStat::DoublesHit => &mut self.doubles_hit,
            BattingStat::TriplesHit => &mut self.triples_hit,
            BattingStat::HomeRunsHit => &mut self.home_runs_hit,
            BattingStat::BasesOnBalls => &mut self.bases_on_balls,
            BattingStat::Strikeouts => &mut self.strikeouts,
            BattingStat::GroundIntoDoublePlays => &mut self.ground_into_double_plays,
            BattingStat::SacrificeBunts => &mut self.sacrifice_bunts,
            BattingStat::SacrificeFlies => &mut self.sacrifice_flies,
            BattingStat::RunsScored => &mut self.runs_scored,
            BattingStat::StolenBases => &mut self.stolen_bases,
            BattingStat::CaughtStealing => &mut self.caught_stealing,
            BattingStat::RunsBattedIn => return None,
        })
    }
}

impl Tally for BattingTally {
    type Stat = BattingStat;

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn add(&mut self, stat: BattingStat, amount: f64) {
        match self.counter(stat) {
            Some(counter) => *counter += amount.max(0.0).round() as u32,
            None => self.runs_batted_in += amount,
        }
    }

    fn absorb(&mut self, other: &BattingTally) {
        self.appearances += other.appearances;
        self.plate_appearances += other.plate_appearances;
        self.at_bats += other.at_bats;
        self.at_bats_with_runners_in_scoring_position +=
            other.at_bats_with_runners_in_scoring_position;
        self.hits += other.hits;
        self.hits_with_runners_in_scoring_position += other.hits_with_runners_in_scoring_position;
        self.doubles_hit += other.doubles_hit;
        self.triples_hit += other.triples_hit;
        self.home_runs_hit += other.home_runs_hit;
        self.bases_on_balls += other.bases_on_balls;
        self.strikeouts += other.strikeouts;
        self.ground_into_double_plays += other.ground_into_double_plays;
        self.sacrifice_bunts += other.sacrifice_bunts;
        self.sacrifice_flies += other.sacrifice_flies;
        self.runs_batted_in += other.runs_batted_in;
        self.runs_scored += other.runs_scored;
        self.stolen_bases += other.stolen_bases;
        self.caught_stealing += other.caught_stealing;
    }

    fn finalize(&mut self) {
        self.batting_average = stats::batting_average(self.hits, self.at_bats);
        self.batting_average_with_runners_in_scoring_position = stats::batting_average(
            self.hits_with_runners_in_scoring_position,
            self.at_bats_with_runners_in_scoring_position,
        );
        self.on_base_percentage = stats::on_base_percentage(
            self.hits,
            self.bases_on_balls,
            self.at_bats,
            self.sacrifice_flies,
        );
        self.total_bases = stats::total_bases(
            self.hits,
            self.doubles_hit,
            self.triples_hit,
            self.home_runs_hit,
        );
        self.slugging_percentage = stats::slugging_percentage(self.total_bases, self.at_bats);
        self.on_base_plus_slugging = self.on_base_percentage + self.slugging_percentage;
    }

    fn affiliation(&self) -> &Affiliation {
        &self.affiliation
    }

    fn affiliation_mut(&mut self) -> &mut Affiliation {
        &mut self.affiliation
    }

    fn appearances(&self) -> u32 {
        self.appearances
    }

    fn value(&self, field: &str) -> Option<f64> {
        Some(match field {
            "appearances" => f64::from(self.appearances),
            "atBats" => f64::from(self.at_bats),
            "basesOnBalls" => f64::from(self.bases_on_balls),
            "battingAverage" => self.batting_average,
            "battingAverageWithRunnersInScoringPosition" => {
                self.batting_average_with_runners_in_scoring_position
            }
            "caughtStealing" => f64::from(self.caught_stealing),
            "doublesHit" => f64::from(self.doubles_hit),
            "groundIntoDoublePlays" => f64::from(self.ground_into_double_plays),
            "hits" => f64::from(self.hits),
            "homeRunsHit" => f64::from(self.home_runs_hit),
            "onBasePercentage" => self.on_base_percentage,
            "onBasePlusSlugging" => self.on_base_plus_slugging,
            "plateAppearances" => f64::from(self.plate_appearances),
            "runsBattedIn" => self.runs_batted_in,
            "runsScored" => f64::from(self.runs_scored),
            "sacrificeBunts" => f64::from(self.sacrifice_bunts),
            "sacrificeFlies" => f64::from(self.sacrifice_flies),
            "sluggingPercentage" => self.slugging_percentage,
            "stolenBases" => f64::from(self.stolen_bases),
            "strikeouts" => f64::from(self.strikeouts),
            "totalBases" => f64::from(self.total_bases),
            "triplesHit" => f64::from(self.triples_hit),
            _ => return None,
        })
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

const AT_BAT: &str = r"hits a|hit into|fielder's choice|strikes out|struck out|ground out|flyout";

fn batter(pattern: &str, stat: BattingStat) -> Rule<BattingStat> {
    Rule::new(pattern, Target::PrevBatter, stat)
}

lazy_static! {
    static ref RULES: Vec<Rule<BattingStat>> = {
        use BattingStat::*;
        vec![
            batter(&format!("{}|sacrifice|draws a walk", AT_BAT), PlateAppearances),
            batter(AT_BAT, AtBats),
            batter("home run|grand slam", RunsScored),
            batter("hits a", Hits),
            batter("hits a double", DoublesHit),
            batter("hits a triple", TriplesHit),
            batter("home run|grand slam", HomeRunsHit),
            batter("walk", BasesOnBalls),
            batter("strikes out|struck out", Strikeouts),
            batter("hit into a double play", GroundIntoDoublePlays),
            batter("scores on the sacrifice", SacrificeBunts),
            batter("sacrifice fly", SacrificeFlies),
        ]
    };
    static ref RISP_RULES: Vec<Rule<BattingStat>> = vec![
        batter(AT_BAT, BattingStat::AtBatsWithRunnersInScoringPosition),
        batter("hits a", BattingStat::HitsWithRunnersInScoringPosition),
    ];
    static ref DRIVES_IN: Regex = Regex::new(r"(?i)home run|scores|grand slam").expect("valid");
    static ref HOME_RUN: Regex = Regex::new(r"(?i)home run|grand slam").expect("valid");
    static ref RUNS_SCORE: Regex = Regex::new(r"(?i)(\d) scores").expect("valid");
    static ref RUNNER_SCORES: Regex = Regex::new(r"(?i)\D scores").expect("valid");
    static ref STEALS: Regex = Regex::new(r"(?i)steals (\w.*?)!").expect("valid");
    static ref CAUGHT_STEALING: Regex =
        Regex::new(r"(?i)(\w.*?) gets caught stealing").expect("valid");
}

pub struct Batting;

impl Role for Batting {
    type Tally = BattingTally;

    const NAME: &'static str = "batting";
    const POSITION: Position = Position::Lineup;

    fn classify(transition: Transition<'_>, roster: &Roster, events: &mut Vec<Event<BattingStat>>) {
        let curr = transition.curr;
        let scope = curr.scope();

        if let Some(batter) = curr.hitting() {
            events.push(Event::Sighted(Sighting {
                player: batter.id.to_owned(),
                name: batter.name.map(str::to_owned),
                scope,
                team: curr.team(curr.batting_side()),
                game: curr.game_ref(),
                roster: true,
                appearance: Some(BattingStat::Appearances),
            }));
        }

        let prev = match transition.prev {
            Some(prev) => prev,
            None => return,
        };
        if let Some(batter) = prev.hitting() {
            events.push(Event::Sighted(Sighting {
                player: batter.id.to_owned(),
                name: batter.name.map(str::to_owned),
                scope,
                team: prev.team(prev.batting_side()),
                game: curr.game_ref(),
                roster: false,
                appearance: None,
            }));
        }

        let text = curr.last_update.as_str();
        apply_rules(&RULES, &transition, text, events);
        if prev.runners_in_scoring_position() {
            apply_rules(&RISP_RULES, &transition, text, events);
        }

        if let Some(batter) = prev.hitting() {
            let driven_in = curr.half_inning_score - prev.half_inning_score;
            if DRIVES_IN.is_match(text) && driven_in > 0.0 {
                events.push(increment(batter.id, scope, BattingStat::RunsBattedIn, driven_in));
            }
        }

        for runner in scoring_runners(&prev.base_runners, text) {
            events.push(increment(runner, scope, BattingStat::RunsScored, 1.0));
        }

        if STEALS.is_match(text) {
            for runner in stealing_runners(&prev.bases_occupied, &curr.bases_occupied, &prev.base_runners) {
                events.push(increment(runner, scope, BattingStat::StolenBases, 1.0));
            }
        }

        if let Some(name) = CAUGHT_STEALING.captures(text).and_then(|c| c.get(1)) {
            for base in prev.bases_occupied.iter().copied() {
                if prev.bases_occupied.get(base) == curr.bases_occupied.get(base) {
                    continue;
                }
                let runner = match prev.base_runners.get(base) {
                    Some(runner) => runner,
                    None => continue,
                };
                match roster.get(runner) {
                    Some(record) if record.name == name.as_str() => {
                        events.push(increment(runner, scope, BattingStat::CaughtStealing, 1.0));
                    }
                    Some(_) => {}
                    None => {
                        let anomaly = Anomaly::unresolved("runner", runner.as_str());
                        debug!(%anomaly, "caught stealing");
                    }
                }
            }
        }

        if let Some(name) = incinerated(text, "hitter") {
            events.push(Event::Incinerated {
                name: name.to_owned(),
                at: prev.game_ref(),
            });
        }
    }
}

/// Runners credited with a run. An explicit "N scores" credits the first N runners; otherwise a
/// named runner scoring is assumed to be the lead runner. A home run clears the bases.
fn scoring_runners<'a>(runners: &'a [String], text: &str) -> Vec<&'a str> {
    let mut scored: Vec<&str> = Vec::new();
    if let Some(count) = RUNS_SCORE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|n| n.as_str().parse::<usize>().ok())
    {
        scored.extend(runners.iter().take(count).map(String::as_str));
    } else if RUNNER_SCORES.is_match(text) {
        scored.extend(runners.first().map(String::as_str));
    }
    if HOME_RUN.is_match(text) {
        scored.extend(runners.iter().map(String::as_str));
    }
    scored
}

/// Runners whose base changed during a steal. A runner stealing home leaves no trace in the
/// current bases, so a synthetic base 3 is put at the front before comparing. Base values double
/// as indices into the base lists.
fn stealing_runners<'a>(prev: &[usize], curr: &[usize], runners: &'a [String]) -> Vec<&'a str> {
    let mut bases = curr.to_vec();
    let mut stolen = Vec::new();
    for base in prev.iter().copied() {
        if base == 2 {
            bases.insert(0, 3);
        }
        if prev.get(base) != bases.get(base) {
            stolen.extend(runners.get(base).map(String::as_str));
        }
    }
    stolen
}

#[cfg(test)]
mod tests {
    use super::{scoring_runners, stealing_runners, Batting, BattingStat, BattingTally};
    use crate::classify::{Event, Role};
    use crate::filter::Transition;
    use crate::players::Roster;
    use crate::snapshot::tests::snapshot;
    use crate::snapshot::{GameRef, GameSnapshot, TeamRef};
    use crate::tally::Tally;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;

    fn runners(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_owned()).collect()
    }

    fn classify(prev: Option<&GameSnapshot>, curr: &GameSnapshot, roster: &Roster) -> Vec<Event<BattingStat>> {
        let mut events = Vec::new();
        Batting::classify(Transition { prev, curr }, roster, &mut events);
        events
    }

    fn increments(events: &[Event<BattingStat>]) -> Vec<(&str, BattingStat, f64)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Increment {
                    player,
                    stat,
                    amount,
                    ..
                } => Some((player.as_str(), *stat, *amount)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_scoring_runners() {
        let on_base = runners(&["R3", "R2", "R1"]);
        assert_eq!(
            scoring_runners(&on_base, "Lang Richardson hits a Single! 2 scores."),
            vec!["R3", "R2"]
        );
        assert_eq!(
            scoring_runners(&on_base, "Paula Mason draws a walk. Baby Urlacher scores!"),
            vec!["R3"]
        );
        assert_eq!(
            scoring_runners(&on_base, "Hendricks Rangel hits a grand slam!"),
            vec!["R3", "R2", "R1"]
        );
        assert!(scoring_runners(&[], "Marco Stink scores on the sacrifice.").is_empty());
        assert!(scoring_runners(&on_base, "Hurley Pacheco strikes out swinging.").is_empty());
    }

    #[test]
    fn test_stealing_runners() {
        let on_base = runners(&["R1"]);
        assert_eq!(stealing_runners(&[0], &[1], &on_base), vec!["R1"]);

        // Runner on third steals home.
        assert_eq!(stealing_runners(&[2, 0], &[0], &runners(&["R3", "R1"])), vec!["R3"]);

        assert!(stealing_runners(&[], &[], &[]).is_empty());
    }

    #[test]
    fn test_single() {
        let roster = Roster::default();
        let tick1 = snapshot(json!({
            "topOfInning": true,
            "awayBatter": "P1",
            "awayBatterName": "Player One",
            "lastUpdate": "Game start",
        }));
        let tick2 = snapshot(json!({
            "topOfInning": true,
            "awayBatter": "P2",
            "awayBatterName": "Player Two",
            "basesOccupied": [0],
            "baseRunners": ["P1"],
            "lastUpdate": "P1 hits a Single!",
        }));

        let events = classify(None, &tick1, &roster);
        assert_eq!(events.len(), 1);
        assert!(increments(&events).is_empty());

        let events = classify(Some(&tick1), &tick2, &roster);
        let mut incs = increments(&events);
        incs.sort_by_key(|(_, stat, _)| format!("{:?}", stat));
        assert_eq!(
            incs,
            vec![
                ("P1", BattingStat::AtBats, 1.0),
                ("P1", BattingStat::Hits, 1.0),
                ("P1", BattingStat::PlateAppearances, 1.0),
            ]
        );
    }

    #[test]
    fn test_three_run_home_run() {
        let roster = Roster::default();
        let prev = snapshot(json!({
            "topOfInning": false,
            "homeBatter": "P3",
            "homeBatterName": "Player Three",
            "basesOccupied": [2, 1, 0],
            "baseRunners": ["R3", "R2", "R1"],
            "halfInningScore": 0,
        }));
        let curr = snapshot(json!({
            "topOfInning": false,
            "homeBatter": "P4",
            "halfInningScore": 4,
            "lastUpdate": "P3 hits a 3-run home run!",
        }));
        let events = classify(Some(&prev), &curr, &roster);
        let incs = increments(&events);
        let count = |player: &str, stat: BattingStat| {
            incs.iter()
                .filter(|(p, s, _)| *p == player && *s == stat)
                .map(|(_, _, a)| a)
                .sum::<f64>()
        };
        assert_approx_eq!(count("P3", BattingStat::HomeRunsHit), 1.0);
        assert_approx_eq!(count("P3", BattingStat::RunsScored), 1.0);
        assert_approx_eq!(count("P3", BattingStat::RunsBattedIn), 4.0);
        assert_approx_eq!(count("P3", BattingStat::Hits), 1.0);
        for runner in &["R1", "R2", "R3"] {
            assert_approx_eq!(count(runner, BattingStat::RunsScored), 1.0);
        }
        // RISP: runners were on second and third.
        assert_approx_eq!(count("P3", BattingStat::HitsWithRunnersInScoringPosition), 1.0);
    }

    #[test]
    fn test_caught_stealing_checks_roster_name() {
        let mut roster = Roster::default();
        roster.observe("R1", Some("Runner One"), &TeamRef::default(), &GameRef::default());

        let prev = snapshot(json!({
            "topOfInning": true,
            "awayBatter": "P2",
            "basesOccupied": [0],
            "baseRunners": ["R1"],
        }));
        let curr = snapshot(json!({
            "topOfInning": true,
            "awayBatter": "P2",
            "lastUpdate": "Runner One gets caught stealing second base.",
        }));
        let events = classify(Some(&prev), &curr, &roster);
        let incs = increments(&events);
        assert_eq!(incs, vec![("R1", BattingStat::CaughtStealing, 1.0)]);

        let wrong = snapshot(json!({
            "topOfInning": true,
            "awayBatter": "P2",
            "lastUpdate": "Somebody Else gets caught stealing second base.",
        }));
        let events = classify(Some(&prev), &wrong, &roster);
        assert!(increments(&events).is_empty());
    }

    #[test]
    fn test_incineration_and_scope() {
        let prev = snapshot(json!({"season": 7, "day": 40, "id": "G7", "isPostseason": true}));
        let curr = snapshot(json!({
            "season": 7,
            "day": 40,
            "id": "G7",
            "isPostseason": true,
            "lastUpdate": "Rogue Umpire incinerated Boston Flowers hitter Fish Summer! Replaced by X",
        }));
        let events = classify(Some(&prev), &curr, &Roster::default());
        match events.last() {
            Some(Event::Incinerated { name, at }) => {
                assert_eq!(name, "Fish Summer");
                assert_eq!(at.id, "G7");
                assert_eq!(at.day, 40);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tally_add() {
        let mut tally = BattingTally::default();
        tally.add(BattingStat::Hits, 1.0);
        tally.add(BattingStat::RunsBattedIn, 2.0);
        tally.add(BattingStat::RunsBattedIn, 0.5);
        assert_eq!(tally.hits, 1);
        assert_approx_eq!(tally.runs_batted_in, 2.5);
        assert_approx_eq!(tally.value("runsBattedIn").unwrap(), 2.5);
        assert_eq!(tally.value("nonsense"), None);
    }
}
