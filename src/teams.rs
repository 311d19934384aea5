use crate::batting::BattingTally;
use crate::config::Config;
use crate::pitching::PitchingTally;
use crate::reference::{ReferenceData, Team};
use crate::store;
use crate::tally::{Accumulator, Summary, Tally};
use crate::util::slugify;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// One player's line for one season, as listed under a team.
#[derive(Debug, Serialize)]
pub struct PlayerLine<'a, T> {
    pub id: &'a str,
    pub name: &'a str,
    pub slug: &'a str,
    #[serde(flatten)]
    pub tally: &'a T,
}

#[derive(Debug, Serialize)]
pub struct Lines<'a, T> {
    pub seasons: BTreeMap<u16, Vec<PlayerLine<'a, T>>>,
    pub postseasons: BTreeMap<u16, Vec<PlayerLine<'a, T>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats<'a> {
    pub id: &'a str,
    pub full_name: &'a str,
    pub nickname: &'a str,
    pub slug: String,
    pub batting_stats: Lines<'a, BattingTally>,
    pub pitching_stats: Lines<'a, PitchingTally>,
}

fn lines<'a, T: Tally>(team: &str, accumulator: &'a Accumulator<T>) -> Lines<'a, T> {
    let collect = |pick: fn(&'a Summary<T>) -> &'a BTreeMap<u16, T>| {
        let mut by_season: BTreeMap<u16, Vec<PlayerLine<'a, T>>> = BTreeMap::new();
        for summary in accumulator.players() {
            for (season, tally) in pick(summary) {
                if tally.affiliation().team.as_deref() == Some(team) {
                    by_season.entry(*season).or_default().push(PlayerLine {
                        id: &summary.id,
                        name: &summary.name,
                        slug: &summary.slug,
                        tally,
                    });
                }
            }
        }
        by_season
    };
    Lines {
        seasons: collect(|summary| &summary.seasons),
        postseasons: collect(|summary| &summary.postseasons),
    }
}

/// Every season line whose team is `team`, including players who have since moved on.
pub fn team_stats<'a>(
    team: &'a Team,
    batters: &'a Accumulator<BattingTally>,
    pitchers: &'a Accumulator<PitchingTally>,
) -> TeamStats<'a> {
    TeamStats {
        id: &team.id,
        full_name: &team.full_name,
        nickname: &team.nickname,
        slug: slugify(&team.full_name),
        batting_stats: lines(&team.id, batters),
        pitching_stats: lines(&team.id, pitchers),
    }
}

#[instrument(name = "teams", skip(config))]
pub fn run(config: &Config) -> Result<()> {
    let reference = ReferenceData::load(&config.reference_dir)?;
    let batters: Accumulator<BattingTally> =
        store::read_json(&config.path("batting/batters.json")).unwrap_or_default();
    let pitchers: Accumulator<PitchingTally> =
        store::read_json(&config.path("pitching/pitchers.json")).unwrap_or_default();

    let teams: Vec<TeamStats<'_>> = reference
        .teams
        .iter()
        .map(|team| team_stats(team, &batters, &pitchers))
        .collect();
    for team in &teams {
        store::write_json(&config.path(&format!("teams/{}/playerStats.json", team.slug)), team)?;
    }
    store::write_json(&config.path("teams/teams.json"), &teams)?;
    info!(teams = teams.len(), "wrote team player stats");
    Ok(())
}
