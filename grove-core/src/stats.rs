use std::fmt::Debug;

use hashbrown::HashMap;

use crate::model::Observer;

#[derive(Clone, Default)]
/// Observer that keeps named training counters
pub struct StatsLogger {
    /// Counter name to value
    counts: HashMap<&'static str, u64>,
}

impl StatsLogger {
    /// Returns an empty StatsLogger
    pub fn new() -> StatsLogger {
        StatsLogger {
            counts: HashMap::new(),
        }
    }

    #[inline]
    /// Gets a counter, zero when never recorded
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Iterates over the recorded counters
    pub fn iter(&self) -> impl Iterator<Item = (&&'static str, &u64)> {
        self.counts.iter()
    }
}

impl Observer for StatsLogger {
    #[inline]
    fn record(&mut self, key: &'static str, amount: u64) {
        *self.counts.entry(key).or_insert(0) += amount;
    }

    fn merge(&mut self, other: StatsLogger) {
        for (k, v) in other.counts.into_iter() {
            *self.counts.entry(k).or_insert(0) += v;
        }
    }
}

impl Debug for StatsLogger {
    /// Prints the counters sorted by name
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut data: Vec<(&&'static str, &u64)> = self.counts.iter().collect();
        data.sort_by_key(|(k, _v)| **k);
        write!(f, "{:?}", data)
    }
}
