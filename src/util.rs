use rustc_hash::FxHasher;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::hash::Hasher;

/// Lower-cased name with each run of whitespace replaced by a single `-`.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn round_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Structural hash of a JSON value. `serde_json::Map` keeps keys sorted, so two payloads that
/// differ only in key order hash the same.
pub fn content_hash(value: &Value) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(value.to_string().as_bytes());
    hasher.finish()
}

/// Treats an explicit `null` the same as a missing field.
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}


// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Away,
    Home,
}

impl Side {
    /// The side at bat: the away team hits in the top of an inning.
    pub fn batting(top_of_inning: bool) -> Side {
        if top_of_inning {
            Side::Away
        } else {
            Side::Home
        }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::Away => Side::Home,
            Side::Home => Side::Away,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AwayHome<T> {
    pub away: T,
    pub home: T,
}

impl<T> AwayHome<T> {
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Away => &self.away,
            Side::Home => &self.home,
        }
    }
}

#[cfg(test)]
#[test]
fn test_away_home() {
    let scores = AwayHome { away: 3, home: 5 };
    assert_eq!(*scores.get(Side::batting(true)), 3);
    assert_eq!(*scores.get(Side::batting(false).opponent()), 3);
}
