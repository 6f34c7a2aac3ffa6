use crate::counter::*;
use crate::history::*;
use crate::Pc;

/// An entry in an [`EqComponent`] table.
#[derive(Clone, Copy, Debug)]
pub struct EqEntry {
    /// Tag identifying the owner of this slot. A zero tag with zeroed
    /// counters doubles as the never-allocated state.
    pub tag: u32,

    /// State machine tracking value equality at this slot
    pub ctr: DualCounter,
}
impl EqEntry {
    pub fn new(tag: u32) -> Self {
        Self {
            tag,
            ctr: DualCounter::new(),
        }
    }

    /// Returns true if this slot has never been trained or allocated.
    pub fn is_vacant(&self) -> bool {
        self.tag == 0 && self.ctr == DualCounter::new()
    }
}

/// A directly-mapped table of [`EqEntry`], indexed and tagged through its
/// own [`PathTracker`].
///
/// A component with no tag bits derives tag 0 for every lookup and so
/// hits on every access; this is how the base component is built.
pub struct EqComponent {
    /// Folded path history for this component
    pub path: PathTracker,

    /// Table of entries
    pub entries: Vec<EqEntry>,
}
impl EqComponent {
    /// Look up the slot for `pc`, ignoring the tag.
    pub fn entry_conflict(&self, pc: Pc) -> &EqEntry {
        &self.entries[self.path.get_index(pc)]
    }

    /// Mutable variant of [`EqComponent::entry_conflict`].
    pub fn entry_conflict_mut(&mut self, pc: Pc) -> &mut EqEntry {
        let index = self.path.get_index(pc);
        &mut self.entries[index]
    }

    /// Look up the slot for `pc`, returning it only on a tag hit.
    pub fn entry(&self, pc: Pc) -> Option<&EqEntry> {
        let tag = self.path.get_tag(pc);
        let entry = self.entry_conflict(pc);
        (entry.tag == tag).then_some(entry)
    }

    /// Mutable variant of [`EqComponent::entry`].
    pub fn entry_mut(&mut self, pc: Pc) -> Option<&mut EqEntry> {
        let tag = self.path.get_tag(pc);
        let index = self.path.get_index(pc);
        let entry = &mut self.entries[index];
        (entry.tag == tag).then_some(entry)
    }

    /// Overwrite the slot for `pc` with a fresh entry and train it once
    /// with the resolved outcome.
    pub fn allocate(&mut self, pc: Pc, outcome: bool) {
        let index = self.path.get_index(pc);
        let tag = self.path.get_tag(pc);
        self.entries[index] = EqEntry::new(tag);
        self.entries[index].ctr.update(outcome);
    }

    /// Train the slot for `pc` iff its tag matches.
    pub fn commit(&mut self, pc: Pc, outcome: bool) {
        if let Some(entry) = self.entry_mut(pc) {
            entry.ctr.update(outcome);
        }
    }

    /// Append a branch outcome to this component's history.
    pub fn add_branch(&mut self, outcome: bool) {
        self.path.add_branch(outcome);
    }

    /// Remove the `num` most recent branch outcomes from this component's
    /// history.
    pub fn revert_branches(&mut self, num: usize) {
        self.path.revert_branches(num);
    }

    /// Calculate what percentage of entries have been trained.
    pub fn utilization(&self) -> f64 {
        let vacant = self.entries.iter().filter(|e| e.is_vacant()).count() as f64;
        (1.0 - (vacant / self.entries.len() as f64)) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ep::EqComponentConfig;

    fn component(ghist_bits: usize, tag_bits: usize) -> EqComponent {
        EqComponentConfig {
            size: 256,
            ghist_bits,
            index_bits: 8,
            tag_bits,
        }
        .build()
    }

    #[test]
    fn untagged_component_always_hits() {
        let mut c = component(0, 0);
        for pc in [0x0u64, 0x40, 0x1234, 0xdead_beef] {
            assert!(c.entry(pc).is_some());
        }
        c.add_branch(true);
        assert!(c.entry(0x1234).is_some());
    }

    #[test]
    fn tagged_component_misses_until_allocated() {
        let mut c = component(8, 8);
        for _ in 0..4 {
            c.add_branch(true);
        }
        let pc = 0x1234;
        assert!(c.entry(pc).is_none());

        c.allocate(pc, true);
        let entry = c.entry(pc).expect("allocation must install a hit");
        assert_eq!((entry.ctr.eq_ctr, entry.ctr.ne_ctr), (1, 0));

        // A history change moves the mapping away from the allocated slot.
        c.add_branch(false);
        c.add_branch(true);
        assert!(c.entry(pc).is_none());
    }

    #[test]
    fn commit_honors_the_tag() {
        let mut c = component(8, 8);
        let pc = 0x4000;
        c.commit(pc, true);
        assert!(c.entry(pc).is_none());

        c.allocate(pc, true);
        c.commit(pc, true);
        let entry = c.entry(pc).unwrap();
        assert_eq!((entry.ctr.eq_ctr, entry.ctr.ne_ctr), (2, 0));
    }

    #[test]
    fn allocate_overwrites_the_slot() {
        let mut c = component(4, 8);
        let pc = 0x88;
        c.allocate(pc, true);
        for _ in 0..10 {
            c.commit(pc, true);
        }
        c.allocate(pc, false);
        let entry = c.entry(pc).unwrap();
        assert_eq!((entry.ctr.eq_ctr, entry.ctr.ne_ctr), (0, 1));
    }
}
