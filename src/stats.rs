use std::collections::HashMap;

use circular_buffer::CircularBuffer;
use std::fmt::Write;
use std::time::Duration;
use tracing::info;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum StatsKind {
    EthPriceFetch,
    BlockRewardFetch,
    RoiCalculation,
}

const STATS_SIZE: usize = 1_000;
const PERCENTILES: [u32; 4] = [50, 90, 95, 99];

pub struct Stats {
    hm: HashMap<StatsKind, CircularBuffer<STATS_SIZE, Duration>>,
}

impl Stats {
    pub fn new() -> Stats {
        Stats { hm: HashMap::new() }
    }

    pub fn register_duration(&mut self, kind: StatsKind, duration: Duration) {
        let entry = self.hm.entry(kind).or_default();
        entry.push_back(duration)
    }

    pub fn records(&self, kind: StatsKind) -> usize {
        self.hm.get(&kind).map_or(0, |durations| durations.len())
    }

    pub fn percentile(&self, kind: StatsKind, percentile: u32) -> Option<Duration> {
        self.hm
            .get(&kind)
            .filter(|durations| !durations.is_empty())
            .map(|durations| get_percentile(durations, percentile))
    }

    pub fn print(&self) {
        // Accumulate everything and log once
        let mut buffer = String::new();

        for (kind, durations) in &self.hm {
            let _ = writeln!(buffer, "Stats for {:?} ({} records):", kind, self.records(*kind));

            if durations.is_empty() {
                let _ = writeln!(buffer, "  No records available.");
                continue;
            }

            let mean = durations.iter().sum::<Duration>() / durations.len() as u32;
            let _ = writeln!(buffer, "  Mean: {:?}", mean);
            for &percentile in PERCENTILES.iter() {
                if let Some(value) = self.percentile(*kind, percentile) {
                    let _ = writeln!(buffer, "  {}th Percentile: {:?}", percentile, value);
                }
            }
        }

        if !buffer.is_empty() {
            info!("{}", buffer);
        }
    }
}

fn get_percentile(durations: &CircularBuffer<STATS_SIZE, Duration>, percentile: u32) -> Duration {
    let mut sorted_times: Vec<_> = durations.iter().collect();
    sorted_times.sort();

    let index = ((percentile as f64 / 100.0) * sorted_times.len() as f64) as usize;
    *sorted_times[index.min(sorted_times.len() - 1)]
}
