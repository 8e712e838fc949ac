//! Shared register bank
//!
//! A groups x slots grid owned by an agent and reset once per evaluation.
//! Learners bound to the same group can pass values to each other within one
//! decision. Group and slot indices wrap, so any stored index is valid.

/// Per-episode memory visible to every learner an agent evaluates
#[derive(Debug, Clone, PartialEq)]
pub struct SharedBank {
    groups: usize,
    slots: usize,
    values: Vec<f64>,
}

impl SharedBank {
    /// Zeroed bank; sizes below 1 are raised to 1
    pub fn new(groups: usize, slots: usize) -> Self {
        let groups = groups.max(1);
        let slots = slots.max(1);
        Self {
            groups,
            slots,
            values: vec![0.0; groups * slots],
        }
    }

    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    #[inline]
    fn offset(&self, group: usize, slot: usize) -> usize {
        (group % self.groups) * self.slots + slot % self.slots
    }

    #[inline]
    pub fn get(&self, group: usize, slot: usize) -> f64 {
        self.values[self.offset(group, slot)]
    }

    #[inline]
    pub fn slot_mut(&mut self, group: usize, slot: usize) -> &mut f64 {
        let offset = self.offset(group, slot);
        &mut self.values[offset]
    }

    /// All slots of one group
    pub fn group(&self, group: usize) -> &[f64] {
        let start = (group % self.groups) * self.slots;
        &self.values[start..start + self.slots]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
