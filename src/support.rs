//! Bounded assembly-support bookkeeping.
//!
//! An assembly's support is the set of neurons currently backing its
//! identity. Each entry carries an age: the number of rounds since the
//! neuron was last reinforced (a fresh winner has age 1). Capacity overflow
//! evicts the stalest entries first.

use hashbrown::HashMap;

use crate::components::NeuronId;

/// Per-assembly support map with age-based eviction.
///
/// `len() <= capacity()` holds after every [`update`](Self::update) call.
#[derive(Debug, Clone)]
pub struct SupportTracker {
    capacity: usize,
    ages: HashMap<NeuronId, u32>,
}

impl SupportTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ages: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    pub fn contains(&self, neuron: NeuronId) -> bool {
        self.ages.contains_key(&neuron)
    }

    /// Age of a supporting neuron: 1 for just-reinforced, growing by one per
    /// update since.
    pub fn age(&self, neuron: NeuronId) -> Option<u32> {
        self.ages.get(&neuron).copied()
    }

    /// Supporting neurons in ascending index order.
    pub fn neurons(&self) -> Vec<NeuronId> {
        let mut out: Vec<NeuronId> = self.ages.keys().copied().collect();
        out.sort_unstable();
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeuronId, u32)> + '_ {
        self.ages.iter().map(|(&n, &a)| (n, a))
    }

    /// Fold one round of winners into the support set.
    ///
    /// Every existing entry ages by 1, winners are reset to age 1 (inserted
    /// if absent), and overflow is resolved by evicting the oldest entries,
    /// ascending neuron index among equal ages, until the capacity bound
    /// holds again. With a capacity smaller than the winner set, even
    /// freshly reinforced entries can be evicted on the same pass.
    pub fn update(&mut self, winners: &[NeuronId]) {
        for age in self.ages.values_mut() {
            *age = age.saturating_add(1);
        }
        for &w in winners {
            self.ages.insert(w, 1);
        }

        if self.ages.len() <= self.capacity {
            return;
        }

        let excess = self.ages.len() - self.capacity;
        let mut entries: Vec<(NeuronId, u32)> = self.ages.iter().map(|(&n, &a)| (n, a)).collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        for (neuron, _) in entries.into_iter().take(excess) {
            self.ages.remove(&neuron);
        }
        tracing::trace!(evicted = excess, len = self.ages.len(), "support eviction");
    }
}
