//! The last-committed-value table.

use std::collections::HashMap;

use crate::{Pc, Value};

/// A mapping from program counter to the value most recently committed by
/// the instruction at that address.
#[derive(Debug, Default)]
pub struct Lcvt {
    table: HashMap<Pc, Value>,
}
impl Lcvt {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Returns true if a committed value has been recorded for `pc`.
    pub fn has_value(&self, pc: Pc) -> bool {
        self.table.contains_key(&pc)
    }

    /// Return the last committed value for `pc`, or 0 when none has been
    /// recorded.
    pub fn lookup(&self, pc: Pc) -> Value {
        self.table.get(&pc).copied().unwrap_or(0)
    }

    /// Record a newly committed value for `pc`.
    pub fn update(&mut self, pc: Pc, val: Value) {
        self.table.insert(pc, val);
    }
}
