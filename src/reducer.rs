use crate::batting::Batting;
use crate::classify::{Event, Role};
use crate::config::Config;
use crate::feed::{Tick, TickReader};
use crate::filter::{FilterStats, TickFilter, Transition};
use crate::pitching::Pitching;
use crate::players::Roster;
use crate::store;
use crate::tally::{Accumulator, Tally};
use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{info, instrument, warn};

/// Folds classified events for one role into its accumulator and roster.
pub struct Reducer<R: Role> {
    pub accumulator: Accumulator<R::Tally>,
    pub roster: Roster,
    /// Players already credited with an appearance, per game.
    appeared: FxHashMap<String, FxHashSet<String>>,
    events: Vec<Event<<R::Tally as Tally>::Stat>>,
}

impl<R: Role> Reducer<R> {
    pub fn new(roster: Roster) -> Reducer<R> {
        Reducer {
            accumulator: Accumulator::new(),
            roster,
            appeared: FxHashMap::default(),
            events: Vec::new(),
        }
    }

    #[instrument(
        name = "Reducer::step",
        level = "trace",
        skip(self, transition),
        fields(role = R::NAME, game = %transition.curr.id)
    )]
    pub fn step(&mut self, transition: Transition<'_>) {
        let mut events = std::mem::take(&mut self.events);
        R::classify(transition, &self.roster, &mut events);
        for event in events.drain(..) {
            self.apply(event);
        }
        self.events = events;

        if transition.curr.game_complete {
            self.appeared.remove(&transition.curr.id);
        }
    }

    pub fn apply(&mut self, event: Event<<R::Tally as Tally>::Stat>) {
        match event {
            Event::Sighted(sighting) => {
                let tally =
                    self.accumulator
                        .ensure(&sighting.player, sighting.name.as_deref(), sighting.scope);
                tally.affiliation_mut().observe(&sighting.team);
                if let Some(stat) = sighting.appearance {
                    let first = self
                        .appeared
                        .entry(sighting.game.id.clone())
                        .or_default()
                        .insert(sighting.player.clone());
                    if first {
                        tally.add(stat, 1.0);
                    }
                }
                if sighting.roster {
                    self.roster.observe(
                        &sighting.player,
                        sighting.name.as_deref(),
                        &sighting.team,
                        &sighting.game,
                    );
                }
            }
            Event::Increment {
                player,
                scope,
                stat,
                amount,
            } => self.accumulator.add(&player, scope, stat, amount),
            Event::Incinerated { name, at } => {
                if let Err(anomaly) = self.roster.incinerate(&name, &at) {
                    warn!(role = R::NAME, %anomaly, "incineration");
                } else {
                    info!(role = R::NAME, player = %name, game = %at.id, "incinerated");
                }
            }
        }
    }

    /// Merges into the persisted accumulator, recomputes derived metrics and writes both the
    /// stats and the roster.
    fn persist(mut self, config: &Config, file: &str, floor: u16) -> Result<()> {
        let path = config.path(file);
        let existing: Accumulator<R::Tally> = store::read_json(&path).unwrap_or_default();
        self.accumulator.merge_existing(existing, floor);
        self.accumulator.finalize();
        store::write_json(&path, &self.accumulator)?;
        let roster = self.roster.save(config)?;
        info!(
            role = R::NAME,
            players = self.accumulator.len(),
            roster_players = self.roster.len(),
            path = %path.display(),
            roster = %roster.display(),
            "wrote stats"
        );
        Ok(())
    }
}

/// Both reducers fed from one pass over the feed.
pub struct Pipeline {
    filter: TickFilter,
    pub batting: Reducer<Batting>,
    pub pitching: Reducer<Pitching>,
}

impl Pipeline {
    pub fn new(floor: u16, batters: Roster, pitchers: Roster) -> Pipeline {
        Pipeline {
            filter: TickFilter::new(floor),
            batting: Reducer::new(batters),
            pitching: Reducer::new(pitchers),
        }
    }

    pub fn push(&mut self, tick: Tick) {
        let batting = &mut self.batting;
        let pitching = &mut self.pitching;
        self.filter.push(tick, |transition| {
            batting.step(transition);
            pitching.step(transition);
        });
    }

    pub fn stats(&self) -> FilterStats {
        self.filter.stats()
    }
}

#[instrument(name = "stats", skip(config))]
pub fn run(config: &Config) -> Result<()> {
    let floor = config.reprocess_floor();
    let mut pipeline = Pipeline::new(
        floor,
        Roster::load(config, Batting::POSITION),
        Roster::load(config, Pitching::POSITION),
    );

    let reader = TickReader::open(&config.feed_path)?;
    for tick in reader {
        let tick = tick.with_context(|| format!("failed to read {}", config.feed_path.display()))?;
        pipeline.push(tick);
    }
    let stats = pipeline.stats();
    info!(
        floor,
        ticks = stats.ticks,
        skipped = stats.skipped_ticks,
        transitions = stats.transitions,
        "processed feed"
    );

    pipeline.batting.persist(config, "batting/batters.json", floor)?;
    pipeline.pitching.persist(config, "pitching/pitchers.json", floor)?;
    Ok(())
}
