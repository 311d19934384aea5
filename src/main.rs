#![warn(clippy::pedantic, rust_2018_idioms)]

mod batting;
mod classify;
mod config;
mod error;
mod feed;
mod filter;
mod history;
mod leaders;
mod pitching;
mod players;
mod read_dir;
mod reducer;
mod reference;
mod snapshot;
mod standings;
mod stats;
mod store;
mod tally;
mod teams;
mod util;

use crate::config::Config;
use anyhow::{bail, Result};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

type Job = fn(&Config) -> Result<()>;

/// In run order: stats feed the rosters, leaderboards and team pages.
const JOBS: &[(&str, Job)] = &[
    ("stats", reducer::run),
    ("players", players::run),
    ("leaders", leaders::run),
    ("teams", teams::run),
    ("standings", standings::run),
];

fn select(requested: &[String]) -> Result<Vec<(&'static str, Job)>> {
    if requested.is_empty() {
        return Ok(JOBS.to_vec());
    }
    let mut jobs = Vec::new();
    for name in requested {
        match JOBS.iter().find(|(job, _)| *job == name.as_str()) {
            Some(job) => jobs.push(*job),
            None => bail!(
                "unknown job {:?}, expected one of: {}",
                name,
                JOBS.iter().map(|(job, _)| *job).collect::<Vec<_>>().join(", ")
            ),
        }
    }
    Ok(jobs)
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::from_env()?;
    let requested: Vec<String> = std::env::args().skip(1).collect();
    let jobs = select(&requested)?;

    let mut failed = 0;
    for (name, job) in jobs {
        info!(job = name, "starting");
        if let Err(err) = job(&config) {
            error!(job = name, "{:#}", err);
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{} job(s) failed", failed);
    }
    Ok(())
}
