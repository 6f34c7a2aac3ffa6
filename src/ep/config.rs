use crate::ep::*;
use crate::history::{PathTracker, MAX_HIST};

/// Geometry of a single [`EqComponent`].
#[derive(Clone, Copy, Debug)]
pub struct EqComponentConfig {
    /// Number of entries in the table
    pub size: usize,

    /// Number of global history bits folded into the index and tag
    pub ghist_bits: usize,

    /// Number of index bits
    pub index_bits: usize,

    /// Number of tag bits
    pub tag_bits: usize,
}
impl EqComponentConfig {
    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        // Two 3-bit counters and a tag per entry, plus the outcome buffer
        // and the folded path register.
        let entry_size = self.tag_bits + 6;
        entry_size * self.size + self.ghist_bits + self.index_bits + self.tag_bits
    }

    /// Use this configuration to create a new [`EqComponent`].
    pub fn build(self) -> EqComponent {
        assert_eq!(
            self.size,
            1 << self.index_bits,
            "component size must equal 2^index_bits"
        );
        assert!(
            self.index_bits + self.tag_bits <= 31,
            "index_bits + tag_bits must be <= 31"
        );
        assert!(self.ghist_bits <= MAX_HIST, "ghist_bits must be <= {}", MAX_HIST);
        EqComponent {
            path: PathTracker::new(self.ghist_bits, self.index_bits, self.tag_bits),
            entries: vec![EqEntry::new(0); self.size],
        }
    }
}

/// Configuration for an [`EqualityPredictor`].
///
/// Components are kept in the order they are added: index 0 is the base
/// component (conventionally untagged with little or no history), and
/// later components are expected to carry progressively longer histories.
#[derive(Clone, Debug, Default)]
pub struct EqConfig {
    /// Tagged component configurations
    pub comp: Vec<EqComponentConfig>,
}
impl EqConfig {
    pub fn new() -> Self {
        Self { comp: Vec::new() }
    }

    /// Add a component to the predictor.
    pub fn add_component(&mut self, c: EqComponentConfig) {
        self.comp.push(c);
    }

    pub fn total_entries(&self) -> usize {
        self.comp.iter().map(|c| c.size).sum()
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.comp.iter().map(|c| c.storage_bits()).sum()
    }

    /// Use this configuration to create a new [`EqualityPredictor`].
    pub fn build(self) -> EqualityPredictor {
        let comp = self
            .comp
            .iter()
            .map(|c| c.build())
            .collect::<Vec<EqComponent>>();
        let stat = EqStats::new(comp.len());
        EqualityPredictor {
            cfg: self,
            comp,
            stat,
            branch_queue: std::collections::VecDeque::with_capacity(MAX_BRANCH_SPEC_DISTANCE),
        }
    }
}
