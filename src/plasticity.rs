//! Hebbian weight updates: fire together, wire together, with geometric
//! reinforcement.
//!
//! After a round's winners are known, every (source winner, dest winner)
//! pair along an active connection is strengthened multiplicatively. Weights
//! are unbounded positive reals; there is no normalization step, and
//! floating-point accumulation error is tolerated rather than corrected.

use crate::components::{Connection, NeuronId, Weight};

/// Summary of one plasticity pass, aggregated per round for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlasticityStats {
    /// Existing synapses scaled by `(1 + beta)`.
    pub synapses_scaled: usize,
    /// Synapses materialized at `base_weight * (1 + beta)` because a
    /// co-winning pair had none yet.
    pub synapses_created: usize,
    /// Sum of absolute weight change applied.
    pub weight_delta_l1: f32,
}

impl PlasticityStats {
    pub fn merge(&mut self, other: PlasticityStats) {
        self.synapses_scaled += other.synapses_scaled;
        self.synapses_created += other.synapses_created;
        self.weight_delta_l1 += other.weight_delta_l1;
    }

    /// Total pairs touched by the pass.
    pub fn pairs(&self) -> usize {
        self.synapses_scaled + self.synapses_created
    }
}

/// Apply one round of Hebbian reinforcement along a single connection.
///
/// `source_active` is the source part's firing set for the round that was
/// just resolved (an area's previous winners, or a stimulus's full
/// population); `dest_winners` is the target area's fresh winner set. Only
/// pairs with both endpoints in those sets change; everything else on the
/// connection is untouched, so a round with an empty side is a no-op.
///
/// `beta` is the destination area's plasticity rate. Stimulus sources do not
/// get a say: the destination's beta governs every synapse arriving there.
pub(crate) fn apply_hebbian(
    conn: &mut Connection,
    source_active: &[NeuronId],
    dest_winners: &[NeuronId],
    beta: f32,
    base_weight: Weight,
) -> PlasticityStats {
    let factor = 1.0 + beta;
    let mut stats = PlasticityStats::default();

    for &pre in source_active {
        for &post in dest_winners {
            let before = conn.weight(pre, post).unwrap_or(0.0);
            if conn.reinforce(pre, post, factor, base_weight) {
                stats.synapses_created += 1;
                stats.weight_delta_l1 += base_weight * factor;
            } else {
                stats.synapses_scaled += 1;
                stats.weight_delta_l1 += before * beta;
            }
        }
    }

    stats
}
