//! Short-horizon projection of an exchange-rate quote.
//!
//! The selected series is mean-reverting towards the quoted value: each step
//! adds `theta (x0 - x) dt + sigma Z` with a standard normal `Z`.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSeries {
    Buy,
    Sell,
    Spread,
}

impl fmt::Display for QuoteSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuoteSeries::Buy => "buy",
            QuoteSeries::Sell => "sell",
            QuoteSeries::Spread => "spread",
        })
    }
}

impl FromStr for QuoteSeries {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(QuoteSeries::Buy),
            "sell" => Ok(QuoteSeries::Sell),
            "spread" => Ok(QuoteSeries::Spread),
            other => bail!("unknown quote series '{other}'"),
        }
    }
}

/// Official buy and sell prices of one currency pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeQuote {
    pub buy: f64,
    pub sell: f64,
}

impl ExchangeQuote {
    /// `sell - buy`, rounded to 4 decimals.
    pub fn spread(&self) -> f64 {
        ((self.sell - self.buy) * 1e4).round() / 1e4
    }

    pub fn value(&self, series: QuoteSeries) -> f64 {
        match series {
            QuoteSeries::Buy => self.buy,
            QuoteSeries::Sell => self.sell,
            QuoteSeries::Spread => self.spread(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSettings {
    pub steps: usize,
    pub theta: f64,
    pub sigma: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            steps: 14,
            theta: 0.35,
            sigma: 0.008,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub series: QuoteSeries,
    pub quote: ExchangeQuote,
    /// Starts at the quoted value; one entry per step after that.
    pub path: Vec<f64>,
}

fn standard_normal(rng: &mut impl Rng) -> f64 {
    // Box-Muller; 1 - u keeps the logarithm finite.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

pub fn project(
    quote: ExchangeQuote,
    series: QuoteSeries,
    settings: &ProjectionSettings,
    rng: &mut impl Rng,
) -> Projection {
    let x0 = quote.value(series);
    let dt = 1.0 / settings.steps.max(1) as f64;
    let mut path = Vec::with_capacity(settings.steps + 1);
    path.push(x0);
    let mut x = x0;
    for _ in 0..settings.steps {
        x += settings.theta * (x0 - x) * dt + settings.sigma * standard_normal(rng);
        path.push(x);
    }
    Projection {
        series,
        quote,
        path,
    }
}

/// Reproducible projection driven by a seeded `StdRng`.
pub fn project_seeded(
    quote: ExchangeQuote,
    series: QuoteSeries,
    settings: &ProjectionSettings,
    seed: u64,
) -> Projection {
    let mut rng = StdRng::seed_from_u64(seed);
    project(quote, series, settings, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE: ExchangeQuote = ExchangeQuote {
        buy: 3.712,
        sell: 3.7195,
    };

    #[test]
    fn same_seed_same_path() {
        let settings = ProjectionSettings::default();
        let a = project_seeded(QUOTE, QuoteSeries::Sell, &settings, 7);
        let b = project_seeded(QUOTE, QuoteSeries::Sell, &settings, 7);
        let c = project_seeded(QUOTE, QuoteSeries::Sell, &settings, 8);
        assert_eq!(a, b);
        assert_ne!(a.path, c.path);
        assert_eq!(a.path.len(), 15);
        assert_eq!(a.path[0], 3.7195);
    }

    #[test]
    fn spread_is_rounded_difference() {
        assert_eq!(QUOTE.spread(), 0.0075);
        let p = project_seeded(QUOTE, QuoteSeries::Spread, &ProjectionSettings::default(), 1);
        assert_eq!(p.path[0], 0.0075);
    }

    #[test]
    fn without_noise_the_path_stays_at_the_quote() {
        let settings = ProjectionSettings {
            sigma: 0.0,
            ..ProjectionSettings::default()
        };
        let p = project_seeded(QUOTE, QuoteSeries::Buy, &settings, 3);
        assert!(p.path.iter().all(|x| *x == 3.712));
    }

    #[test]
    fn noise_stays_small() {
        let p = project_seeded(QUOTE, QuoteSeries::Buy, &ProjectionSettings::default(), 42);
        assert!(p.path.iter().all(|x| (x - 3.712).abs() < 0.2));
    }

    #[test]
    fn series_names_parse() {
        assert_eq!("Spread".parse::<QuoteSeries>().unwrap(), QuoteSeries::Spread);
        assert_eq!(" buy ".parse::<QuoteSeries>().unwrap(), QuoteSeries::Buy);
        assert!("mid".parse::<QuoteSeries>().is_err());
    }
}
