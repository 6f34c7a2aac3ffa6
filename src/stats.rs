//! Helpers for collecting statistics while evaluating the predictor.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::Pc;

/// Container for recording simple statistics while evaluating some model.
pub struct EvalStats {
    /// Per-PC statistics
    pub data: BTreeMap<Pc, PcData>,

    /// Number of correct predictions
    pub global_hits: usize,

    /// Number of records evaluated
    pub global_count: usize,
}
impl EvalStats {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            global_hits: 0,
            global_count: 0,
        }
    }

    /// Record one evaluated prediction.
    pub fn update(&mut self, pc: Pc, hit: bool) {
        self.global_count += 1;
        if hit {
            self.global_hits += 1;
        }
        let data = self.data.entry(pc).or_insert_with(PcData::new);
        data.occ += 1;
        if hit {
            data.hits += 1;
        }
    }

    /// Return the global hit rate.
    pub fn hit_rate(&self) -> f64 {
        self.global_hits as f64 / self.global_count as f64
    }

    /// Return the global miss count.
    pub fn global_miss(&self) -> usize {
        self.global_count - self.global_hits
    }

    /// Return the number of mispredictions per thousand records.
    pub fn mpki(&self) -> f64 {
        self.global_miss() as f64 / self.global_count as f64 * 1000.0
    }

    /// Returns the number of unique observed program counters.
    pub fn num_unique_pcs(&self) -> usize {
        self.data.len()
    }

    /// Return the `n` most frequent program counters with a poor hit rate.
    pub fn get_low_rate_pcs(&self, n: usize) -> Vec<(Pc, &PcData)> {
        self.data
            .iter()
            .filter(|(_, s)| s.occ > 100 && s.hit_rate() <= 0.55)
            .sorted_by(|x, y| x.1.occ.cmp(&y.1.occ))
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }
}

impl Default for EvalStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Container for per-PC statistics.
pub struct PcData {
    /// Number of times this program counter was encountered
    pub occ: usize,

    /// Number of correct predictions for this program counter
    pub hits: usize,
}
impl PcData {
    pub fn new() -> Self {
        Self { occ: 0, hits: 0 }
    }

    /// Return the hit rate for this program counter.
    pub fn hit_rate(&self) -> f64 {
        self.hits as f64 / self.occ as f64
    }
}
