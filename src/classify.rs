use crate::filter::Transition;
use crate::players::{Position, Roster};
use crate::snapshot::{GameRef, PlayerRef, Scope, TeamRef};
use crate::tally::Tally;
use crate::util::Side;
use lazy_static::lazy_static;
use regex::Regex;

/// What the classifier derived from one transition. Applying events is the reducer's job.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<S> {
    /// A player is on the field: make sure a tally exists and point it at the player's team.
    Sighted(Sighting<S>),
    Increment {
        player: String,
        scope: Scope,
        stat: S,
        amount: f64,
    },
    Incinerated {
        name: String,
        at: GameRef,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sighting<S> {
    pub player: String,
    pub name: Option<String>,
    pub scope: Scope,
    pub team: TeamRef,
    pub game: GameRef,
    /// Update the roster record for this player.
    pub roster: bool,
    /// Stat counted once per player per game.
    pub appearance: Option<S>,
}

/// One flavor of player statistics: batting or pitching.
pub trait Role {
    type Tally: Tally;

    const NAME: &'static str;
    const POSITION: Position;

    /// Derives events from a transition. Never fails; a rule that lacks the data it needs simply
    /// doesn't fire.
    fn classify(
        transition: Transition<'_>,
        roster: &Roster,
        events: &mut Vec<Event<<Self::Tally as Tally>::Stat>>,
    );
}

/// Whose tally a counting rule lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The batter at the plate before the event.
    PrevBatter,
    /// The pitcher on the mound before the event.
    PrevPitcher,
    /// The pitcher on the mound after the event.
    CurrPitcher,
    AwayPitcher,
    HomePitcher,
}

impl Target {
    pub fn resolve<'a>(self, transition: &Transition<'a>) -> Option<PlayerRef<'a>> {
        let curr = transition.curr;
        match self {
            Target::PrevBatter => transition.prev?.hitting(),
            Target::PrevPitcher => transition.prev?.fielding(),
            Target::CurrPitcher => curr.fielding(),
            Target::AwayPitcher => curr.pitcher(Side::Away),
            Target::HomePitcher => curr.pitcher(Side::Home),
        }
    }
}

/// A counting rule: when the description matches, `target` gets one `stat`.
pub struct Rule<S> {
    pattern: Regex,
    target: Target,
    stat: S,
    needs_prev: bool,
}

impl<S: Copy> Rule<S> {
    /// `pattern` is matched case-insensitively.
    pub fn new(pattern: &str, target: Target, stat: S) -> Rule<S> {
        Rule {
            pattern: Regex::new(&format!("(?i){}", pattern)).expect("rule pattern is valid"),
            target,
            stat,
            needs_prev: false,
        }
    }

    /// Only fires when the game had a previous snapshot.
    pub fn after_prev(mut self) -> Rule<S> {
        self.needs_prev = true;
        self
    }

    pub fn apply(&self, transition: &Transition<'_>, text: &str, events: &mut Vec<Event<S>>) {
        if self.needs_prev && transition.prev.is_none() {
            return;
        }
        if !self.pattern.is_match(text) {
            return;
        }
        if let Some(player) = self.target.resolve(transition) {
            events.push(Event::Increment {
                player: player.id.to_owned(),
                scope: transition.curr.scope(),
                stat: self.stat,
                amount: 1.0,
            });
        }
    }
}

pub fn apply_rules<S: Copy>(
    rules: &[Rule<S>],
    transition: &Transition<'_>,
    text: &str,
    events: &mut Vec<Event<S>>,
) {
    for rule in rules {
        rule.apply(transition, text, events);
    }
}

pub fn increment<S>(player: &str, scope: Scope, stat: S, amount: f64) -> Event<S> {
    Event::Increment {
        player: player.to_owned(),
        scope,
        stat,
        amount,
    }
}

lazy_static! {
    static ref INCINERATION: Regex =
        Regex::new(r"(?i)Rogue Umpire incinerated [\w\s]+ (hitter|pitcher) ([\w\s]+)!")
            .expect("incineration pattern is valid");
}

/// Name of the player an umpire incinerated, when `role` ("hitter" or "pitcher") matches.
pub fn incinerated<'t>(text: &'t str, role: &str) -> Option<&'t str> {
    let captures = INCINERATION.captures(text)?;
    if captures.get(1)?.as_str().eq_ignore_ascii_case(role) {
        Some(captures.get(2)?.as_str().trim())
    } else {
        None
    }
}
