use crate::error::Anomaly;
use crate::feed::Tick;
use crate::snapshot::{normalize, GameSnapshot};
use crate::util::content_hash;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

/// A game's previous retained snapshot paired with its current one.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub prev: Option<&'a GameSnapshot>,
    pub curr: &'a GameSnapshot,
}

struct Retained {
    hash: u64,
    snapshot: GameSnapshot,
}

/// Turns the raw tick stream into per-game transitions, dropping everything that has already been
/// seen. Only the latest snapshot for each game and the set of seen hashes are kept.
#[derive(Default)]
pub struct TickFilter {
    floor: u16,
    last_tick: Option<u64>,
    seen_ticks: FxHashSet<u64>,
    seen_games: FxHashSet<u64>,
    games: FxHashMap<String, Retained>,
    stats: FilterStats,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub transitions: u64,
}

impl TickFilter {
    pub fn new(floor: u16) -> TickFilter {
        TickFilter {
            floor,
            ..TickFilter::default()
        }
    }

    /// Feeds one tick through the filter, calling `f` once for every game transition that should
    /// be classified. Returns the number of transitions produced.
    pub fn push<F>(&mut self, tick: Tick, mut f: F) -> usize
    where
        F: FnMut(Transition<'_>),
    {
        self.stats.ticks += 1;
        if tick.schedule.is_empty() {
            trace!("tick without games");
            self.stats.skipped_ticks += 1;
            return 0;
        }
        if let Some(season) = tick.sim.season {
            if season < self.floor {
                trace!(season, floor = self.floor, "tick below reprocess floor");
                self.stats.skipped_ticks += 1;
                return 0;
            }
        }

        let games = tick
            .schedule
            .into_iter()
            .filter(|raw| !raw.is_null())
            .filter_map(|raw| match normalize(raw) {
                Ok(value) => Some(value),
                Err(anomaly) => {
                    warn!(%anomaly, "skipping schedule entry");
                    None
                }
            })
            .collect::<Vec<Value>>();
        let tick_hash = content_hash(&Value::Array(games.clone()));

        if self.last_tick == Some(tick_hash) {
            trace!("tick identical to previous tick");
            self.stats.skipped_ticks += 1;
            return 0;
        }
        self.last_tick = Some(tick_hash);
        let duplicate = !self.seen_ticks.insert(tick_hash);
        if duplicate {
            self.stats.skipped_ticks += 1;
            info!(anomaly = %Anomaly::DuplicateTick { hash: tick_hash }, "skipping tick");
        }

        let mut produced = 0;
        for value in games {
            let hash = content_hash(&value);
            let curr = match GameSnapshot::from_value(value) {
                Ok(snapshot) if snapshot.id.is_empty() => {
                    warn!(anomaly = %Anomaly::malformed("game snapshot", "missing id"), "skipping game");
                    continue;
                }
                Ok(snapshot) => snapshot,
                Err(anomaly) => {
                    warn!(%anomaly, "skipping game");
                    continue;
                }
            };
            if !duplicate && self.accept(hash, &curr) {
                f(Transition {
                    prev: self.games.get(&curr.id).map(|r| &r.snapshot),
                    curr: &curr,
                });
                produced += 1;
            }
            self.games.insert(
                curr.id.clone(),
                Retained {
                    hash,
                    snapshot: curr,
                },
            );
        }
        self.stats.transitions += produced as u64;
        produced
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    fn accept(&mut self, hash: u64, curr: &GameSnapshot) -> bool {
        if !curr.game_start {
            trace!(game = %curr.id, "game not started");
            return false;
        }
        let prev = self.games.get(&curr.id);
        if let Some(prev) = prev {
            if prev.hash == hash {
                trace!(game = %curr.id, "game unchanged");
                return false;
            }
            if prev.snapshot.game_complete && curr.game_complete {
                trace!(game = %curr.id, "game already complete");
                return false;
            }
        }
        if !self.seen_games.insert(hash) {
            debug!(game = %curr.id, "game state already processed");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::TickFilter;
    use crate::feed::{Sim, Tick};
    use serde_json::{json, Value};

    fn tick(season: u16, games: Vec<Value>) -> Tick {
        Tick {
            schedule: games,
            sim: Sim {
                season: Some(season),
            },
        }
    }

    fn game(id: &str, update: &str) -> Value {
        json!({"id": id, "season": 5, "gameStart": true, "lastUpdate": update})
    }

    fn updates(filter: &mut TickFilter, tick: Tick) -> Vec<(Option<String>, String)> {
        let mut out = Vec::new();
        filter.push(tick, |t| {
            out.push((
                t.prev.map(|p| p.last_update.clone()),
                t.curr.last_update.clone(),
            ))
        });
        out
    }

    #[test]
    fn test_pairs_with_previous() {
        let mut filter = TickFilter::new(0);
        assert_eq!(
            updates(&mut filter, tick(5, vec![game("G1", "a"), game("G2", "x")])),
            vec![(None, "a".into()), (None, "x".into())]
        );
        assert_eq!(
            updates(&mut filter, tick(5, vec![game("G1", "b"), game("G2", "x")])),
            vec![(Some("a".into()), "b".into())]
        );
        // G2 is absent from this tick; its previous snapshot survives the gap.
        assert_eq!(
            updates(&mut filter, tick(5, vec![game("G1", "c")])),
            vec![(Some("b".into()), "c".into())]
        );
        assert_eq!(
            updates(&mut filter, tick(5, vec![game("G2", "y")])),
            vec![(Some("x".into()), "y".into())]
        );
    }

    #[test]
    fn test_duplicate_ticks() {
        let mut filter = TickFilter::new(0);
        let first = vec![game("G1", "a")];
        let second = vec![game("G1", "b")];
        assert_eq!(filter.push(tick(5, first.clone()), |_| {}), 1);
        assert_eq!(filter.push(tick(5, first.clone()), |_| {}), 0);
        assert_eq!(filter.push(tick(5, second.clone()), |_| {}), 1);
        // Replayed out of order: both whole-tick hashes were seen before.
        assert_eq!(filter.push(tick(5, first), |_| {}), 0);
        assert_eq!(filter.push(tick(5, second), |_| {}), 0);
        assert_eq!(filter.push(tick(5, vec![game("G1", "c")]), |_| {}), 1);
        let stats = filter.stats();
        assert_eq!(stats.ticks, 6);
        assert_eq!(stats.skipped_ticks, 3);
        assert_eq!(stats.transitions, 3);
    }

    #[test]
    fn test_skips() {
        let mut filter = TickFilter::new(6);
        assert_eq!(filter.push(tick(5, vec![game("G1", "a")]), |_| {}), 0);

        let mut filter = TickFilter::new(0);
        let unstarted = json!({"id": "G1", "gameStart": false, "lastUpdate": "soon"});
        assert_eq!(filter.push(tick(5, vec![unstarted, Value::Null, json!(7)]), |_| {}), 0);

        let done = |update: &str| json!({"id": "G1", "gameStart": true, "gameComplete": true, "lastUpdate": update});
        assert_eq!(filter.push(tick(5, vec![done("Game over.")]), |_| {}), 1);
        assert_eq!(filter.push(tick(5, vec![done("Game over. Really.")]), |_| {}), 0);
    }

    #[test]
    fn test_legacy_ids() {
        let mut filter = TickFilter::new(0);
        let legacy = json!({"_id": "G1", "gameStart": true, "lastUpdate": "a"});
        assert_eq!(filter.push(tick(5, vec![legacy]), |_| {}), 1);
        let mut prev = None;
        filter.push(tick(5, vec![game("G1", "b")]), |t| {
            prev = t.prev.map(|p| p.last_update.clone())
        });
        assert_eq!(prev.as_deref(), Some("a"));
    }
}
