//! Implementation of a tagged geometric-history equality predictor.

pub mod component;
pub mod config;
pub mod stat;

pub use component::*;
pub use config::*;
pub use stat::*;

use std::collections::VecDeque;

use rand::Rng;

use crate::counter::*;
use crate::{Pc, SeqNum};

/// Maximum number of in-flight speculative branches.
pub const MAX_BRANCH_SPEC_DISTANCE: usize = 64;

/// A tag hit recorded while scanning the components, with a snapshot of
/// the entry's state at selection time.
#[derive(Clone, Copy, Debug)]
pub struct EqHit {
    /// Index of the component providing the entry
    pub component: usize,

    /// Confidence of the entry
    pub confidence: Confidence,

    /// Predicted direction of the entry
    pub direction: bool,
}

/// The primary and alternate entries selected for a prediction.
///
/// The primary is the last hit (scanning from the shortest history to the
/// longest) whose confidence is at least that of every earlier hit; the
/// alternate is whatever the primary displaced. The alternate only exists
/// when at least two components hit.
#[derive(Clone, Copy, Debug, Default)]
pub struct EqSelection {
    pub primary: Option<EqHit>,
    pub alt: Option<EqHit>,
}

/// A TAGE-style predictor for the equality of a committed value with the
/// previous value committed at the same program counter.
///
/// Adapted from the "TAgged GEometric history length" family of branch
/// predictors; see "A case for (partially) TAgged GEometric history length
/// branch prediction" (Seznec, 2006). Each component maintains its own
/// folded path history, so speculative branches are folded in as they
/// issue and unwound exactly on a squash.
pub struct EqualityPredictor {
    /// The configuration used to create this object
    pub cfg: EqConfig,

    /// The components, ordered from the shortest history to the longest
    pub comp: Vec<EqComponent>,

    pub stat: EqStats,

    /// Sequence numbers of in-flight speculative branches, oldest first
    pub branch_queue: VecDeque<SeqNum>,
}
impl EqualityPredictor {
    /// Scan all components for tag hits and select the primary and
    /// alternate predicting entries.
    pub fn predicting_entries(&self, pc: Pc) -> EqSelection {
        let mut sel = EqSelection::default();
        for (i, component) in self.comp.iter().enumerate() {
            let Some(entry) = component.entry(pc) else {
                continue;
            };
            let hit = EqHit {
                component: i,
                confidence: entry.ctr.confidence(),
                direction: entry.ctr.direction(),
            };
            // Later components win ties, preferring longer histories.
            match sel.primary {
                Some(primary) if hit.confidence < primary.confidence => {}
                _ => {
                    sel.alt = sel.primary;
                    sel.primary = Some(hit);
                }
            }
        }
        sel
    }

    /// Predict whether the next value committed at `pc` will equal the
    /// last one. Returns `(Confidence::Low, false)` when nothing hits.
    pub fn predict(&self, pc: Pc) -> (Confidence, bool) {
        match self.predicting_entries(pc).primary {
            Some(p) => (p.confidence, p.direction),
            None => (Confidence::Low, false),
        }
    }

    /// Return the component index and a snapshot of the entry backing the
    /// current prediction for `pc`.
    pub fn predicting_entry(&self, pc: Pc) -> Option<(usize, EqEntry)> {
        let primary = self.predicting_entries(pc).primary?;
        let entry = self.comp[primary.component].entry(pc)?;
        Some((primary.component, *entry))
    }

    /// Record the resolved equality outcome for a committed value.
    ///
    /// Components with histories longer than the primary always train.
    /// The primary trains unless both it and the alternate are highly
    /// confident and the alternate agrees with the outcome, in which case
    /// the primary decays to yield to it. The alternate trains only while
    /// the primary is below high confidence. On a misprediction, a new
    /// entry is allocated in a longer component when one can be freed.
    pub fn on_value_commit(&mut self, pc: Pc, was_equal: bool) {
        let sel = self.predicting_entries(pc);
        let prediction = sel.primary.map_or(false, |p| p.direction);
        let mut longest_hitting = 0;

        if let Some(primary) = sel.primary {
            for i in 0..self.comp.len() {
                if self.comp[i].entry(pc).is_none() {
                    continue;
                }
                longest_hitting = i;
                self.stat.comp_hits[i] += 1;

                if i > primary.component {
                    self.comp[i].commit(pc, was_equal);
                } else if i == primary.component {
                    let train = i == 0
                        || primary.confidence != Confidence::High
                        || sel.alt.map_or(true, |alt| {
                            alt.confidence != Confidence::High || alt.direction != was_equal
                        });
                    if train {
                        self.comp[i].commit(pc, was_equal);
                    } else if let Some(entry) = self.comp[i].entry_mut(pc) {
                        // The alternate alone would have predicted this
                        // outcome with high confidence; weaken the primary
                        // so the entry can be reclaimed.
                        entry.ctr.decay();
                    }
                } else if sel.alt.is_some_and(|alt| alt.component == i) {
                    if primary.confidence != Confidence::High {
                        self.comp[i].commit(pc, was_equal);
                    }
                }
            }
        }

        if prediction != was_equal {
            self.allocate(pc, was_equal, longest_hitting + 1);
        }
        self.stat.commits += 1;
    }

    /// Try to allocate a new entry for `pc` in a component with a history
    /// longer than the longest current hit.
    ///
    /// The first conflict slot that is not highly confident is overwritten.
    /// Highly confident slots that were skipped over each decay with
    /// probability 1/4, so repeated mispredictions eventually free a slot.
    fn allocate(&mut self, pc: Pc, outcome: bool, start: usize) {
        let mut allocated = self.comp.len();
        for i in start..self.comp.len() {
            if self.comp[i].entry_conflict(pc).ctr.confidence() != Confidence::High {
                self.comp[i].allocate(pc, outcome);
                self.stat.allocs += 1;
                allocated = i;
                break;
            }
        }
        if allocated == self.comp.len() {
            self.stat.failed_allocs += 1;
        }

        let mut rng = rand::thread_rng();
        for i in start..allocated {
            if rng.gen_ratio(1, 4) {
                self.comp[i].entry_conflict_mut(pc).ctr.decay();
                self.stat.conflict_decays += 1;
            }
        }
    }

    /// Record a speculatively issued branch, folding its outcome into
    /// every component's history.
    pub fn update_on_branch(&mut self, seq_num: SeqNum, outcome: bool) {
        assert!(
            self.branch_queue.len() < MAX_BRANCH_SPEC_DISTANCE,
            "exceeded maximum speculative branch distance"
        );
        self.branch_queue.push_back(seq_num);
        for comp in self.comp.iter_mut() {
            comp.add_branch(outcome);
        }
    }

    /// Retire the oldest in-flight branch. The outcome bit stays in the
    /// finite history window, so no component state changes.
    pub fn on_branch_commit(&mut self, seq_num: SeqNum) {
        assert_eq!(
            self.branch_queue.front().copied(),
            Some(seq_num),
            "branches must be committed in queue order"
        );
        self.branch_queue.pop_front();
    }

    /// Squash every in-flight branch with a sequence number at or above
    /// `seq_num`, unwinding the history of every component to the
    /// surviving prefix. Counters trained under squashed speculation are
    /// left as they are.
    pub fn squash(&mut self, seq_num: SeqNum) {
        let mut num_to_revert = 0;
        while let Some(&last) = self.branch_queue.back() {
            if last < seq_num {
                break;
            }
            self.branch_queue.pop_back();
            num_to_revert += 1;
        }
        for comp in self.comp.iter_mut() {
            comp.revert_branches(num_to_revert);
        }
        self.stat.squashes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn build(configs: &[(usize, usize, usize, usize)]) -> EqualityPredictor {
        let mut cfg = EqConfig::new();
        for &(size, ghist_bits, index_bits, tag_bits) in configs {
            cfg.add_component(EqComponentConfig {
                size,
                ghist_bits,
                index_bits,
                tag_bits,
            });
        }
        cfg.build()
    }

    #[test]
    fn cold_predictor_predicts_not_equal() {
        let ep = build(&[(256, 8, 8, 0), (256, 16, 8, 8), (256, 32, 8, 8)]);
        assert_eq!(ep.predict(0x1234), (Confidence::Low, false));
    }

    #[test]
    fn convergence_to_high_confidence() {
        // Teach the predictor "equal iff the last two history bits are
        // both 1" and require better than 99% accuracy over the stream.
        let mut ep = build(&[(256, 0, 8, 0), (256, 4, 8, 8)]);
        let pc = 0x1000;
        let mut rng = StdRng::seed_from_u64(0x5eed);

        let mut correct = 0usize;
        let mut total = 0usize;
        let mut prev = false;
        for _ in 0..50_000 {
            let n = rng.gen::<bool>();
            ep.update_on_branch(0, n);
            ep.on_branch_commit(0);

            let target = prev && n;
            prev = n;

            let (_, predicted) = ep.predict(pc);
            if predicted == target {
                correct += 1;
            }
            total += 1;

            ep.on_value_commit(pc, target);
        }
        let accuracy = correct as f64 / total as f64;
        assert!(accuracy > 0.99, "accuracy {} too low", accuracy);

        // With history ending in 1, 1 the prediction is a confident
        // "equal", backed by a fully saturated entry.
        ep.update_on_branch(0, false);
        ep.update_on_branch(1, true);
        ep.update_on_branch(2, true);
        assert_eq!(ep.predict(pc), (Confidence::High, true));

        let (_, entry) = ep.predicting_entry(pc).unwrap();
        assert_eq!((entry.ctr.eq_ctr, entry.ctr.ne_ctr), (7, 0));
    }

    #[test]
    fn alternating_outcomes_stay_below_high_confidence() {
        let mut ep = build(&[(256, 8, 8, 0), (256, 16, 8, 8)]);
        let pc = 0x2000;
        for i in 0..100 {
            ep.on_value_commit(pc, i % 2 == 0);
        }
        let (confidence, _) = ep.predict(pc);
        assert_ne!(confidence, Confidence::High);
    }

    #[test]
    fn rapid_shift_flips_the_direction() {
        let mut ep = build(&[(256, 8, 8, 0), (256, 16, 8, 8)]);
        let pc = 0x3000;
        for _ in 0..50 {
            ep.on_value_commit(pc, true);
        }
        let (_, direction) = ep.predict(pc);
        assert_eq!(direction, true);

        for _ in 0..50 {
            ep.on_value_commit(pc, false);
        }
        let (_, direction) = ep.predict(pc);
        assert_eq!(direction, false);
    }

    #[test]
    fn misprediction_allocates_a_longer_component() {
        let mut ep = build(&[(256, 8, 8, 0), (256, 16, 8, 8)]);
        let pc = 0x4000;
        // The first commit mispredicts (cold default is "not equal") and
        // must allocate in the tagged component.
        ep.on_value_commit(pc, true);
        assert_eq!(ep.stat.allocs, 1);
        let entry = ep.comp[1].entry(pc).expect("allocated entry must hit");
        assert_eq!((entry.ctr.eq_ctr, entry.ctr.ne_ctr), (1, 0));
    }

    #[test]
    fn sustained_mispredictions_demote_high_confidence() {
        let mut ep = build(&[(256, 8, 8, 0), (256, 16, 8, 8)]);
        let pc = 0x4800;
        for _ in 0..10 {
            ep.on_value_commit(pc, true);
        }
        for _ in 0..5 {
            ep.on_value_commit(pc, false);
        }
        let sel = ep.predicting_entries(pc);
        assert_ne!(sel.primary.unwrap().confidence, Confidence::High);
    }

    #[test]
    fn squash_restores_the_prediction() {
        let mut ep = build(&[(256, 2, 8, 0), (256, 4, 8, 8)]);
        let pc = 0x1234;

        for i in 0..10u64 {
            let b = i % 2 == 0;
            ep.update_on_branch(i * 2, b);
            ep.update_on_branch(i * 2 + 1, b);
            ep.on_value_commit(pc, b);
        }
        ep.update_on_branch(30, true);
        ep.update_on_branch(40, true);

        ep.update_on_branch(50, false);
        ep.update_on_branch(60, false);

        let (_, direction) = ep.predict(pc);
        assert_eq!(direction, false);

        ep.squash(50);
        let (_, direction) = ep.predict(pc);
        assert_eq!(direction, true);
    }

    #[test]
    fn squash_drops_only_the_tail() {
        let mut ep = build(&[(256, 8, 8, 0)]);
        for seq in [10u64, 20, 30, 40] {
            ep.update_on_branch(seq, true);
        }
        ep.squash(25);
        assert_eq!(ep.branch_queue.len(), 2);
        assert_eq!(ep.branch_queue.back().copied(), Some(20));

        // The surviving prefix still commits in order.
        ep.on_branch_commit(10);
        ep.on_branch_commit(20);
        assert!(ep.branch_queue.is_empty());
    }

    #[test]
    #[should_panic(expected = "speculative branch distance")]
    fn branch_queue_overflow_is_fatal() {
        let mut ep = build(&[(256, 8, 8, 0)]);
        for seq in 0..=MAX_BRANCH_SPEC_DISTANCE as u64 {
            ep.update_on_branch(seq, true);
        }
    }

    #[test]
    #[should_panic(expected = "queue order")]
    fn out_of_order_commit_is_fatal() {
        let mut ep = build(&[(256, 8, 8, 0)]);
        ep.update_on_branch(1, true);
        ep.update_on_branch(2, false);
        ep.on_branch_commit(2);
    }
}
