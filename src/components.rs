use hashbrown::{HashMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prng::Prng;

/// Index of a neuron within its owning part's population, `0..n`.
pub type NeuronId = usize;

/// Type alias for synaptic strengths (non-negative, unbounded).
pub type Weight = f32;

/// Handle to a registered [`Area`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AreaId(pub(crate) usize);

/// Handle to a registered [`Stimulus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StimulusId(pub(crate) usize);

impl AreaId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl StimulusId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identity of any registered brain part.
///
/// Parts are referenced by handle everywhere (subconnectomes, connections,
/// assembly parents); there are no back-references between parts and the
/// brain that owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PartId {
    Area(AreaId),
    Stimulus(StimulusId),
}

impl PartId {
    pub fn as_area(self) -> Option<AreaId> {
        match self {
            PartId::Area(id) => Some(id),
            PartId::Stimulus(_) => None,
        }
    }

    pub fn is_area(self) -> bool {
        matches!(self, PartId::Area(_))
    }
}

impl From<AreaId> for PartId {
    fn from(id: AreaId) -> Self {
        PartId::Area(id)
    }
}

impl From<StimulusId> for PartId {
    fn from(id: StimulusId) -> Self {
        PartId::Stimulus(id)
    }
}

/// Static descriptor of a neural population that competes per round.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Area {
    /// Population size.
    pub n: usize,
    /// Winner-set size per round.
    pub k: usize,
    /// Plasticity rate applied to synapses arriving at this area.
    pub beta: f32,
}

impl Area {
    /// Conventional winner-set size for a population of `n` neurons.
    pub fn default_k(n: usize) -> usize {
        (n as f64).sqrt().round() as usize
    }

    /// Area with the conventional `k = round(sqrt(n))`.
    pub fn new(n: usize, beta: f32) -> Self {
        Self {
            n,
            k: Self::default_k(n),
            beta,
        }
    }

    /// Area with an explicit winner-set size.
    pub fn with_k(n: usize, k: usize, beta: f32) -> Self {
        Self { n, k, beta }
    }

    pub fn validate(&self) -> core::result::Result<(), &'static str> {
        if self.n == 0 {
            return Err("area population must be > 0");
        }
        if self.k == 0 {
            return Err("area winner-set size must be > 0");
        }
        if self.k > self.n {
            return Err("area winner-set size must be <= population size");
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err("area beta must be finite and >= 0");
        }
        Ok(())
    }
}

/// Static descriptor of an external input population.
///
/// All `n` stimulus neurons are treated as co-active whenever the stimulus
/// participates in a round; a stimulus never competes and never receives
/// synapses.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stimulus {
    pub n: usize,
    /// Present for symmetry with [`Area`]; plasticity into an area always
    /// uses the destination area's beta, never this one.
    pub beta: f32,
}

impl Stimulus {
    pub fn new(n: usize, beta: f32) -> Self {
        Self { n, beta }
    }

    pub fn validate(&self) -> core::result::Result<(), &'static str> {
        if self.n == 0 {
            return Err("stimulus population must be > 0");
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err("stimulus beta must be finite and >= 0");
        }
        Ok(())
    }
}

/// Directed synapse storage between one source part and one destination area.
///
/// The synaptic graph is random and lazily generated: a (pre, post) pair
/// absent from both maps has never been looked at, and its existence is
/// still governed by the brain's base generation probability. Once sampled,
/// the outcome is memoized for the lifetime of the brain so that re-reading
/// a pair can never change the simulation.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    /// Materialized synapses and their strengths.
    synapses: HashMap<(NeuronId, NeuronId), Weight>,
    /// Pairs whose generation draw already happened (superset of `synapses`
    /// keys as far as sampling is concerned; reinforced pairs are inserted
    /// directly into `synapses`).
    sampled: HashSet<(NeuronId, NeuronId)>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strength of an explicit synapse, if one has been materialized.
    pub fn weight(&self, pre: NeuronId, post: NeuronId) -> Option<Weight> {
        self.synapses.get(&(pre, post)).copied()
    }

    /// Number of materialized synapses.
    pub fn synapse_count(&self) -> usize {
        self.synapses.len()
    }

    /// Number of pairs whose generation draw has been performed.
    pub fn sampled_count(&self) -> usize {
        self.sampled.len()
    }

    /// Sum of all materialized synapse strengths.
    pub fn total_weight(&self) -> Weight {
        self.synapses.values().sum()
    }

    /// Current contribution of `pre -> post`, sampling the generation rule
    /// on first use. Returns 0.0 for pairs that sampled as unconnected.
    pub(crate) fn sampled_weight(
        &mut self,
        pre: NeuronId,
        post: NeuronId,
        p: f32,
        base_weight: Weight,
        rng: &mut Prng,
    ) -> Weight {
        if let Some(w) = self.synapses.get(&(pre, post)) {
            return *w;
        }
        if !self.sampled.insert((pre, post)) {
            // Already drawn, and it came up empty.
            return 0.0;
        }
        if rng.gen_bool(p) {
            self.synapses.insert((pre, post), base_weight);
            base_weight
        } else {
            0.0
        }
    }

    /// Scale an existing synapse by `factor`, or materialize one at
    /// `base_weight * factor`. Returns true when a synapse was created.
    pub(crate) fn reinforce(
        &mut self,
        pre: NeuronId,
        post: NeuronId,
        factor: f32,
        base_weight: Weight,
    ) -> bool {
        self.sampled.insert((pre, post));
        match self.synapses.entry((pre, post)) {
            hashbrown::hash_map::Entry::Occupied(mut e) => {
                *e.get_mut() *= factor;
                false
            }
            hashbrown::hash_map::Entry::Vacant(e) => {
                e.insert(base_weight * factor);
                true
            }
        }
    }
}
