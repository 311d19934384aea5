use crate::snapshot::{Scope, TeamRef};
use crate::util::slugify;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Team a tally is attributed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Affiliation {
    pub team: Option<String>,
    pub team_name: Option<String>,
}

impl Affiliation {
    /// Overwrites with whatever the latest observation knows.
    pub fn observe(&mut self, team: &TeamRef) {
        if let Some(id) = &team.id {
            self.team = Some(id.clone());
        }
        if let Some(name) = &team.name {
            self.team_name = Some(name.clone());
        }
    }

    /// Fills in anything missing from an older record.
    pub fn fill_from(&mut self, older: &Affiliation) {
        if self.team.as_deref().map_or(true, str::is_empty) {
            self.team = older.team.clone();
        }
        if self.team_name.as_deref().map_or(true, str::is_empty) {
            self.team_name = older.team_name.clone();
        }
    }
}

/// A bag of counters for one player in one scope, plus the metrics derived from them.
pub trait Tally: Default + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync {
    type Stat: Copy + fmt::Debug + PartialEq + Eq;

    fn add(&mut self, stat: Self::Stat, amount: f64);

    /// Adds another tally's counters into this one. Derived metrics are left alone.
    fn absorb(&mut self, other: &Self);

    /// Recomputes every derived metric from the counters.
    fn finalize(&mut self);

    fn affiliation(&self) -> &Affiliation;

    fn affiliation_mut(&mut self) -> &mut Affiliation;

    fn appearances(&self) -> u32;

    /// Looks up a counter or metric by its persisted field name.
    fn value(&self, field: &str) -> Option<f64>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[serde(bound(serialize = "T: Tally", deserialize = "T: Tally"))]
pub struct Summary<T> {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub seasons: BTreeMap<u16, T>,
    pub postseasons: BTreeMap<u16, T>,
    pub career_season: T,
    pub career_postseason: T,
}

impl<T: Tally> Summary<T> {
    fn new(id: &str) -> Summary<T> {
        Summary {
            id: id.to_owned(),
            ..Summary::default()
        }
    }

    fn rename(&mut self, name: &str) {
        if !name.is_empty() && name != self.name {
            self.name = name.to_owned();
            self.slug = slugify(name);
        }
    }

    pub fn scope_mut(&mut self, scope: Scope) -> &mut T {
        let map = if scope.postseason {
            &mut self.postseasons
        } else {
            &mut self.seasons
        };
        map.entry(scope.season).or_default()
    }

    pub fn get(&self, scope: Scope) -> Option<&T> {
        if scope.postseason {
            self.postseasons.get(&scope.season)
        } else {
            self.seasons.get(&scope.season)
        }
    }

    /// Lays freshly computed data over a persisted summary: seasons at or above `floor` are
    /// replaced wholesale, older seasons keep their persisted values.
    fn overlay(&mut self, newer: Summary<T>, floor: u16) {
        self.rename(&newer.name);
        overlay_seasons(&mut self.seasons, newer.seasons, floor);
        overlay_seasons(&mut self.postseasons, newer.postseasons, floor);
    }

    pub fn finalize(&mut self) {
        self.career_season = career(&mut self.seasons);
        self.career_postseason = career(&mut self.postseasons);
    }
}

fn overlay_seasons<T: Tally>(old: &mut BTreeMap<u16, T>, newer: BTreeMap<u16, T>, floor: u16) {
    for (season, mut tally) in newer.into_iter().filter(|(season, _)| *season >= floor) {
        if let Some(previous) = old.get(&season) {
            tally.affiliation_mut().fill_from(previous.affiliation());
        }
        old.insert(season, tally);
    }
}

fn career<T: Tally>(seasons: &mut BTreeMap<u16, T>) -> T {
    let mut total = T::default();
    for tally in seasons.values_mut() {
        tally.finalize();
        total.absorb(tally);
        let affiliation = tally.affiliation().clone();
        total.affiliation_mut().observe(&TeamRef {
            id: affiliation.team,
            name: affiliation.team_name,
        });
    }
    total.finalize();
    total
}

/// Every player's summary for one role, in first-seen order.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Tally", deserialize = "T: Tally"))]
#[serde(transparent)]
pub struct Accumulator<T> {
    players: IndexMap<String, Summary<T>>,
}

impl<T: Tally> Accumulator<T> {
    pub fn new() -> Accumulator<T> {
        Accumulator {
            players: IndexMap::new(),
        }
    }

    /// Creates the player's tally for `scope` if needed. Calling this repeatedly is harmless.
    pub fn ensure(&mut self, player: &str, name: Option<&str>, scope: Scope) -> &mut T {
        let summary = self
            .players
            .entry(player.to_owned())
            .or_insert_with(|| Summary::new(player));
        if let Some(name) = name {
            summary.rename(name);
        }
        summary.scope_mut(scope)
    }

    pub fn add(&mut self, player: &str, scope: Scope, stat: T::Stat, amount: f64) {
        self.ensure(player, None, scope).add(stat, amount);
    }

    pub fn get(&self, player: &str) -> Option<&Summary<T>> {
        self.players.get(player)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn players(&self) -> impl Iterator<Item = &Summary<T>> {
        self.players.values()
    }

    /// Merges this run's data into what was persisted before. Persisted players keep their
    /// position; players seen for the first time are appended.
    pub fn merge_existing(&mut self, existing: Accumulator<T>, floor: u16) {
        let fresh = std::mem::replace(&mut self.players, existing.players);
        for (id, summary) in fresh {
            match self.players.get_mut(&id) {
                Some(old) => old.overlay(summary, floor),
                None => {
                    self.players.insert(id, summary);
                }
            }
        }
    }

    pub fn finalize(&mut self) {
        for summary in self.players.values_mut() {
            summary.finalize();
        }
    }
}
