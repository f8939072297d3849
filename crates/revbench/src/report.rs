//! Latency and throughput statistics
//!
//! A single aggregator drains the outcome channel until every sender is gone,
//! then sorts the successful latencies and derives the report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::worker::Outcome;

/// Percentile points reported for every run
pub const PERCENTILES: [f64; 8] = [10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0, 99.9];

/// Nearest-rank index into `count` sorted samples, clamped to the last one
pub fn percentile_index(count: usize, percentile: f64) -> usize {
    let index = (count as f64 * percentile / 100.0) as usize;
    index.min(count.saturating_sub(1))
}

mod nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_nanos)
    }
}

/// Latency at one percentile point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Percentile {
    pub percentile: f64,
    #[serde(with = "nanos")]
    pub latency: Duration,
}

/// Statistics from a benchmark run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Wall-clock time of the whole aggregation
    #[serde(with = "nanos")]
    pub total_time: Duration,
    /// Number of successful operations
    pub count: usize,
    #[serde(with = "nanos")]
    pub fastest: Duration,
    #[serde(with = "nanos")]
    pub slowest: Duration,
    #[serde(with = "nanos")]
    pub average: Duration,
    pub requests_per_second: f64,
    pub percentiles: Vec<Percentile>,
    /// Failed operations, by error message
    pub errors: BTreeMap<String, u64>,
}

impl Stats {
    /// Build stats from unsorted successful latencies
    pub fn from_latencies(
        mut latencies: Vec<Duration>,
        errors: BTreeMap<String, u64>,
        total_time: Duration,
    ) -> Self {
        if latencies.is_empty() {
            return Self {
                total_time,
                errors,
                ..Default::default()
            };
        }

        latencies.sort_unstable();
        let count = latencies.len();
        let sum: Duration = latencies.iter().sum();
        let average = Duration::from_nanos((sum.as_nanos() / count as u128) as u64);
        let requests_per_second = if total_time.is_zero() {
            0.0
        } else {
            count as f64 / total_time.as_secs_f64()
        };

        let percentiles = PERCENTILES
            .iter()
            .map(|&percentile| Percentile {
                percentile,
                latency: latencies[percentile_index(count, percentile)],
            })
            .collect();

        Self {
            total_time,
            count,
            fastest: latencies[0],
            slowest: latencies[count - 1],
            average,
            requests_per_second,
            percentiles,
            errors,
        }
    }

    /// Total number of failed operations
    pub fn error_count(&self) -> u64 {
        self.errors.values().sum()
    }

    /// Format stats as a human-readable summary
    pub fn format(&self) -> String {
        let mut out = format!(
            "Summary:\n\
             \x20 Total:        {:>10.4} secs\n\
             \x20 Count:        {:>10}\n",
            self.total_time.as_secs_f64(),
            self.count
        );

        if self.count > 0 {
            out.push_str(&format!(
                "  Slowest:      {:>10.4} secs\n\
                 \x20 Fastest:      {:>10.4} secs\n\
                 \x20 Average:      {:>10.4} secs\n\
                 \x20 Requests/sec: {:>10.4}\n\
                 \n\
                 Latency distribution:\n",
                self.slowest.as_secs_f64(),
                self.fastest.as_secs_f64(),
                self.average.as_secs_f64(),
                self.requests_per_second
            ));
            for p in &self.percentiles {
                out.push_str(&format!(
                    "  {}% in {:.4} secs\n",
                    p.percentile,
                    p.latency.as_secs_f64()
                ));
            }
        }

        if !self.errors.is_empty() {
            out.push_str("\nError distribution:\n");
            for (message, count) in &self.errors {
                out.push_str(&format!("  [{}]\t{}\n", count, message));
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Single consumer of worker outcomes
pub struct Aggregator {
    outcomes: mpsc::Receiver<Outcome>,
}

/// Outcome channel with room for `capacity` in-flight outcomes
pub fn channel(capacity: usize) -> (mpsc::Sender<Outcome>, Aggregator) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, Aggregator { outcomes: rx })
}

impl Aggregator {
    /// Drain outcomes until every sender is dropped, then build the stats
    pub async fn run(mut self) -> Stats {
        let start = Instant::now();
        let mut latencies = Vec::new();
        let mut errors: BTreeMap<String, u64> = BTreeMap::new();

        while let Some(outcome) = self.outcomes.recv().await {
            match outcome.error {
                Some(message) => *errors.entry(message).or_default() += 1,
                None => latencies.push(outcome.latency),
            }
        }

        let total_time = start.elapsed();
        tracing::debug!(
            ok = latencies.len(),
            failed = errors.values().sum::<u64>(),
            "outcome channel closed"
        );
        Stats::from_latencies(latencies, errors, total_time)
    }
}
