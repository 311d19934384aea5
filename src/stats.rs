//! Derived statistics. Every ratio is 0 when its denominator is 0.

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn batting_average(hits: u32, at_bats: u32) -> f64 {
    ratio(f64::from(hits), f64::from(at_bats))
}

pub fn on_base_percentage(hits: u32, walks: u32, at_bats: u32, sacrifice_flies: u32) -> f64 {
    ratio(
        f64::from(hits + walks),
        f64::from(at_bats + walks + sacrifice_flies),
    )
}

pub fn total_bases(hits: u32, doubles: u32, triples: u32, home_runs: u32) -> u32 {
    let singles = hits.saturating_sub(doubles + triples + home_runs);
    singles + 2 * doubles + 3 * triples + 4 * home_runs
}

pub fn slugging_percentage(total_bases: u32, at_bats: u32) -> f64 {
    ratio(f64::from(total_bases), f64::from(at_bats))
}

/// Innings in baseball's tenths notation: 7 outs is 2.1, not 2.333.
pub fn innings_pitched(outs: u32) -> f64 {
    f64::from(outs / 3) + f64::from(outs % 3) / 10.0
}

pub fn per_nine(stat: f64, innings: f64) -> f64 {
    ratio(stat, innings) * 9.0
}

pub fn earned_run_average(earned_runs: f64, innings: f64) -> f64 {
    ratio(9.0 * earned_runs, innings)
}

pub fn walks_and_hits_per_inning(walks: u32, hits: u32, innings: f64) -> f64 {
    ratio(f64::from(walks + hits), innings)
}

pub fn rate(stat: u32, batters_faced: u32) -> f64 {
    ratio(f64::from(stat), f64::from(batters_faced))
}

pub fn strikeout_to_walk(strikeouts: u32, walks: u32) -> f64 {
    ratio(f64::from(strikeouts), f64::from(walks))
}

/// A pitcher without a decision counts as perfect.
pub fn winning_percentage(wins: u32, losses: u32) -> f64 {
    if wins > 0 {
        f64::from(wins) / f64::from(wins + losses)
    } else if losses > 0 {
        0.0
    } else {
        1.0
    }
}

/// Split records in standings: plain wins over games, 0 with no games.
pub fn record_percentage(wins: i32, losses: i32) -> f64 {
    ratio(f64::from(wins), f64::from(wins + losses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use proptest::prelude::*;

    #[test]
    fn test_batting_line() {
        // 10 AB, 4 H (1 2B, 1 HR), 2 BB, 1 SF
        let tb = total_bases(4, 1, 0, 1);
        assert_eq!(tb, 2 + 2 + 4);
        assert_approx_eq!(batting_average(4, 10), 0.4);
        assert_approx_eq!(on_base_percentage(4, 2, 10, 1), 6.0 / 13.0);
        assert_approx_eq!(slugging_percentage(tb, 10), 0.8);
        assert_approx_eq!(batting_average(0, 0), 0.0);
        assert_approx_eq!(on_base_percentage(0, 0, 0, 0), 0.0);
    }

    #[test]
    fn test_pitching_line() {
        assert_approx_eq!(innings_pitched(0), 0.0);
        assert_approx_eq!(innings_pitched(7), 2.1);
        assert_approx_eq!(innings_pitched(27), 9.0);
        assert_approx_eq!(earned_run_average(3.0, 9.0), 3.0);
        assert_approx_eq!(earned_run_average(3.0, 0.0), 0.0);
        assert_approx_eq!(per_nine(4.0, 6.0), 6.0);
        assert_approx_eq!(walks_and_hits_per_inning(2, 7, 9.0), 1.0);
        assert_approx_eq!(rate(5, 20), 0.25);
        assert_approx_eq!(rate(5, 0), 0.0);
        assert_approx_eq!(strikeout_to_walk(9, 0), 0.0);
        assert_approx_eq!(strikeout_to_walk(9, 3), 3.0);
    }

    #[test]
    fn test_winning_percentage() {
        assert_approx_eq!(winning_percentage(0, 0), 1.0);
        assert_approx_eq!(winning_percentage(0, 5), 0.0);
        assert_approx_eq!(winning_percentage(3, 2), 0.6);
        assert_approx_eq!(record_percentage(0, 0), 0.0);
        assert_approx_eq!(record_percentage(1, 3), 0.25);
    }

    proptest! {
        #[test]
        fn innings_tenths_digit(outs in 0_u32..100_000) {
            let ip = innings_pitched(outs);
            let tenths = ((ip * 10.0).round() as u64) % 10;
            prop_assert!(tenths <= 2);
            prop_assert_eq!(ip.trunc() as u32, outs / 3);
        }

        #[test]
        fn ops_is_obp_plus_slg(
            singles in 0_u32..200,
            doubles in 0_u32..60,
            triples in 0_u32..20,
            home_runs in 0_u32..60,
            outs in 0_u32..500,
            walks in 0_u32..100,
            sacrifice_flies in 0_u32..20,
        ) {
            let hits = singles + doubles + triples + home_runs;
            let at_bats = hits + outs;
            let obp = on_base_percentage(hits, walks, at_bats, sacrifice_flies);
            let slg = slugging_percentage(total_bases(hits, doubles, triples, home_runs), at_bats);
            let mut tally = crate::batting::BattingTally {
                hits,
                doubles_hit: doubles,
                triples_hit: triples,
                home_runs_hit: home_runs,
                at_bats,
                bases_on_balls: walks,
                sacrifice_flies,
                ..Default::default()
            };
            crate::tally::Tally::finalize(&mut tally);
            prop_assert!((tally.on_base_plus_slugging - (obp + slg)).abs() < 1e-9);
            prop_assert!((tally.on_base_plus_slugging - (tally.on_base_percentage + tally.slugging_percentage)).abs() < 1e-9);
        }
    }
}
