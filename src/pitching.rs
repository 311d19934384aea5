use crate::classify::{apply_rules, increment, incinerated, Event, Role, Rule, Sighting, Target};
use crate::filter::Transition;
use crate::players::{Position, Roster};
use crate::stats;
use crate::tally::{Affiliation, Tally};
use crate::util::Side;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchingStat {
    Appearances,
    BattersFaced,
    BasesOnBalls,
    EarnedRuns,
    Flyouts,
    Groundouts,
    HitByPitches,
    HitsAllowed,
    HomeRuns,
    Losses,
    OutsRecorded,
    PitchCount,
    QualityStarts,
    Shutouts,
    Strikeouts,
    Wins,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PitchingTally {
    pub appearances: u32,
    pub batters_faced: u32,
    pub bases_on_balls: u32,
    pub bases_on_balls_per_nine: f64,
    pub earned_runs: f64,
    pub earned_run_average: f64,
    pub flyouts: u32,
    pub groundouts: u32,
    pub hit_by_pitches: u32,
    pub hits_allowed: u32,
    pub hits_allowed_per_nine: f64,
    pub home_runs: u32,
    pub home_runs_per_nine: f64,
    pub innings_pitched: f64,
    pub losses: u32,
    pub outs_recorded: u32,
    pub pitch_count: u32,
    pub quality_starts: u32,
    pub shutouts: u32,
    pub strikeouts: u32,
    pub strikeout_to_walk_ratio: f64,
    pub strikeouts_per_nine: f64,
    pub strikeout_rate: f64,
    #[serde(flatten)]
    pub affiliation: Affiliation,
    pub walks_and_hits_per_inning_pitched: f64,
    pub walk_rate: f64,
    pub winning_percentage: f64,
    pub wins: u32,
}

impl Tally for PitchingTally {
    type Stat = PitchingStat;

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn add(&mut self, stat: PitchingStat, amount: f64) {
        let counter = match stat {
            PitchingStat::EarnedRuns => {
                self.earned_runs += amount;
                return;
            }
            PitchingStat::Appearances => &mut self.appearances,
            PitchingStat::BattersFaced => &mut self.batters_faced,
            PitchingStat::BasesOnBalls => &mut self.bases_on_balls,
            PitchingStat::Flyouts => &mut self.flyouts,
            PitchingStat::Groundouts => &mut self.groundouts,
            PitchingStat::HitByPitches => &mut self.hit_by_pitches,
            PitchingStat::HitsAllowed => &mut self.hits_allowed,
            PitchingStat::HomeRuns => &mut self.home_runs,
            PitchingStat::Losses => &mut self.losses,
            PitchingStat::OutsRecorded => &mut self.outs_recorded,
            PitchingStat::PitchCount => &mut self.pitch_count,
            PitchingStat::QualityStarts => &mut self.quality_starts,
            PitchingStat::Shutouts => &mut self.shutouts,
            PitchingStat::Strikeouts => &mut self.strikeouts,
            PitchingStat::Wins => &mut self.wins,
        };
        *counter += amount.max(0.0).round() as u32;
    }

    fn absorb(&mut self, other: &PitchingTally) {
        self.appearances += other.appearances;
        self.batters_faced += other.batters_faced;
        self.bases_on_balls += other.bases_on_balls;
        self.earned_runs += other.earned_runs;
        self.flyouts += other.flyouts;
        self.groundouts += other.groundouts;
        self.hit_by_pitches += other.hit_by_pitches;
        self.hits_allowed += other.hits_allowed;
        self.home_runs += other.home_runs;
        self.losses += other.losses;
        self.outs_recorded += other.outs_recorded;
        self.pitch_count += other.pitch_count;
        self.quality_starts += other.quality_starts;
        self.shutouts += other.shutouts;
        self.strikeouts += other.strikeouts;
        self.wins += other.wins;
    }

    fn finalize(&mut self) {
        let ip = stats::innings_pitched(self.outs_recorded);
        self.innings_pitched = ip;
        self.earned_run_average = stats::earned_run_average(self.earned_runs, ip);
        self.bases_on_balls_per_nine = stats::per_nine(f64::from(self.bases_on_balls), ip);
        self.hits_allowed_per_nine = stats::per_nine(f64::from(self.hits_allowed), ip);
        self.home_runs_per_nine = stats::per_nine(f64::from(self.home_runs), ip);
        self.strikeouts_per_nine = stats::per_nine(f64::from(self.strikeouts), ip);
        self.strikeout_to_walk_ratio =
            stats::strikeout_to_walk(self.strikeouts, self.bases_on_balls);
        self.strikeout_rate = stats::rate(self.strikeouts, self.batters_faced);
        self.walk_rate = stats::rate(self.bases_on_balls, self.batters_faced);
        self.walks_and_hits_per_inning_pitched =
            stats::walks_and_hits_per_inning(self.bases_on_balls, self.hits_allowed, ip);
        self.winning_percentage = stats::winning_percentage(self.wins, self.losses);
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
            "battersFaced" => f64::from(self.batters_faced),
            "basesOnBalls" => f64::from(self.bases_on_balls),
            "basesOnBallsPerNine" => self.bases_on_balls_per_nine,
            "earnedRuns" => self.earned_runs,
            "earnedRunAverage" => self.earned_run_average,
            "flyouts" => f64::from(self.flyouts),
            "groundouts" => f64::from(self.groundouts),
            "hitByPitches" => f64::from(self.hit_by_pitches),
            "hitsAllowed" => f64::from(self.hits_allowed),
            "hitsAllowedPerNine" => self.hits_allowed_per_nine,
            "homeRuns" => f64::from(self.home_runs),
            "homeRunsPerNine" => self.home_runs_per_nine,
            "inningsPitched" => self.innings_pitched,
            "losses" => f64::from(self.losses),
            "outsRecorded" => f64::from(self.outs_recorded),
            "pitchCount" => f64::from(self.pitch_count),
            "qualityStarts" => f64::from(self.quality_starts),
            "shutouts" => f64::from(self.shutouts),
            "strikeouts" => f64::from(self.strikeouts),
            "strikeoutToWalkRatio" => self.strikeout_to_walk_ratio,
            "strikeoutsPerNine" => self.strikeouts_per_nine,
            "strikeoutRate" => self.strikeout_rate,
            "walksAndHitsPerInningPitched" => self.walks_and_hits_per_inning_pitched,
            "walkRate" => self.walk_rate,
            "winningPercentage" => self.winning_percentage,
            "wins" => f64::from(self.wins),
            _ => return None,
        })
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// Whole-phrase match, so "hits" doesn't fire on "hitsville".
fn phrases(pieces: &[&str]) -> String {
    format!(r"\b(?:{})\b", pieces.join("|"))
}

/// Charged to the pitcher who was on the mound before the event.
fn charged(pieces: &[&str], stat: PitchingStat) -> Rule<PitchingStat> {
    Rule::new(&phrases(pieces), Target::PrevPitcher, stat).after_prev()
}

lazy_static! {
    static ref RULES: Vec<Rule<PitchingStat>> = {
        use PitchingStat::*;
        vec![
            Rule::new(&phrases(&["game over"]), Target::AwayPitcher, Appearances),
            Rule::new(&phrases(&["game over"]), Target::HomePitcher, Appearances),
            charged(
                &["hit a", "hit into", "strikes out", "struck out", "caught stealing", "fielder's choice", "sacrifice"],
                OutsRecorded,
            ),
            charged(
                &[
                    "hit a", "hit into", "hits", "foul ball", "draws a", "game over", "strikes out",
                    "struck out", "reaches", "steals", "caught stealing", "fielder's choice", "sacrifice",
                ],
                PitchCount,
            ),
            charged(&["flyout"], Flyouts),
            charged(&["ground out"], Groundouts),
            charged(&["hits an?"], HitsAllowed),
            charged(&["draws a walk", "with a pitch"], BasesOnBalls),
            charged(&["with a pitch"], HitByPitches),
            charged(&["strikes out", "struck out"], Strikeouts),
            Rule::new(&phrases(&["batting for"]), Target::CurrPitcher, BattersFaced),
            charged(&["home run", "grand slam"], HomeRuns),
        ]
    };
    static ref GAME_OVER: Regex = Regex::new(&format!("(?i){}", phrases(&["game over"]))).expect("valid");
    static ref SCORES_BASERUNNER: Regex = Regex::new(r"\bScores Baserunner\b").expect("valid");
}

pub struct Pitching;

impl Role for Pitching {
    type Tally = PitchingTally;

    const NAME: &'static str = "pitching";
    const POSITION: Position = Position::Rotation;

    fn classify(transition: Transition<'_>, _roster: &Roster, events: &mut Vec<Event<PitchingStat>>) {
        let curr = transition.curr;
        let scope = curr.scope();

        for side in [curr.fielding_side(), Side::Away, Side::Home].iter().copied() {
            if let Some(pitcher) = curr.pitcher(side) {
                events.push(Event::Sighted(Sighting {
                    player: pitcher.id.to_owned(),
                    name: pitcher.name.map(str::to_owned),
                    scope,
                    team: curr.team(side),
                    game: curr.game_ref(),
                    roster: true,
                    appearance: None,
                }));
            }
        }

        // A player by this name would otherwise trip the scoring rules.
        let text = SCORES_BASERUNNER.replace(&curr.last_update, "");
        apply_rules(&RULES, &transition, &text, events);

        let game_over = GAME_OVER.is_match(&text);
        let scores = curr.scores();
        if game_over {
            let winner = if scores.home > scores.away {
                Side::Home
            } else {
                Side::Away
            };
            if let Some(pitcher) = curr.pitcher(winner) {
                events.push(increment(pitcher.id, scope, PitchingStat::Wins, 1.0));
            }
            if let Some(pitcher) = curr.pitcher(winner.opponent()) {
                events.push(increment(pitcher.id, scope, PitchingStat::Losses, 1.0));
            }
        }

        let prev = match transition.prev {
            Some(prev) => prev,
            None => return,
        };

        // Runs are charged to whoever is pitching against the scoring side.
        let before = prev.scores();
        for side in [Side::Away, Side::Home].iter().copied() {
            let runs = scores.get(side) - before.get(side);
            if runs > 0.0 {
                if let Some(pitcher) = curr.pitcher(side.opponent()) {
                    events.push(increment(pitcher.id, scope, PitchingStat::EarnedRuns, runs));
                }
            }
        }

        if game_over && !prev.game_complete {
            for side in [Side::Away, Side::Home].iter().copied() {
                let allowed = *scores.get(side.opponent());
                if let Some(pitcher) = curr.pitcher(side) {
                    if allowed <= 3.0 {
                        events.push(increment(pitcher.id, scope, PitchingStat::QualityStarts, 1.0));
                    }
                    if allowed == 0.0 {
                        events.push(increment(pitcher.id, scope, PitchingStat::Shutouts, 1.0));
                    }
                }
            }
        }

        if let Some(name) = incinerated(&text, "pitcher") {
            events.push(Event::Incinerated {
                name: name.to_owned(),
                at: prev.game_ref(),
            });
        }
    }
}
