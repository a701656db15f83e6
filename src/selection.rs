//! Winner selection: input-current accumulation and top-k ranking.
//!
//! Selection is pure with respect to winner state. The only mutations are
//! memoized synapse generation on the traversed connections and the advance
//! of the sampling RNG stream, both of which are deterministic under a fixed
//! seed.

use crate::components::{Connection, NeuronId, Weight};
use crate::prng::Prng;

/// Accumulate the input currents contributed by one active connection.
///
/// For every (active source neuron, candidate dest neuron) pair the explicit
/// synapse weight is added if one exists; otherwise the pair's existence is
/// drawn once from Bernoulli(`p`) and memoized on the connection, so the
/// baseline contribution of a still-unconnected pair is decided exactly once
/// per brain lifetime.
///
/// `currents` must have one slot per destination neuron and is accumulated
/// into, not overwritten, so several source parts can feed one target.
pub(crate) fn accumulate_inputs(
    conn: &mut Connection,
    active_source: &[NeuronId],
    p: f32,
    base_weight: Weight,
    rng: &mut Prng,
    currents: &mut [f32],
) {
    for &pre in active_source {
        for (post, current) in currents.iter_mut().enumerate() {
            let w = conn.sampled_weight(pre, post, p, base_weight, rng);
            if w != 0.0 {
                *current += w;
            }
        }
    }
}

/// Select the `k` highest-current candidates, ties broken by neuron index
/// ascending. Returns the winner set in ascending index order.
///
/// Callers guarantee `k <= currents.len()`; area registration rejects any
/// configuration that could violate that here.
pub fn top_k(currents: &[f32], k: usize) -> Vec<NeuronId> {
    debug_assert!(k <= currents.len());

    let mut order: Vec<NeuronId> = (0..currents.len()).collect();
    let rank = |&a: &NeuronId, &b: &NeuronId| {
        currents[b]
            .total_cmp(&currents[a])
            .then_with(|| a.cmp(&b))
    };

    // Partition the top k to the front before ranking only that prefix.
    if k < order.len() {
        order.select_nth_unstable_by(k, rank);
        order.truncate(k);
    }
    order.sort_unstable();
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_picks_highest_currents() {
        let currents = [0.5, 2.0, 0.1, 3.0, 1.0];
        assert_eq!(top_k(&currents, 2), vec![1, 3]);
    }

    #[test]
    fn ties_break_toward_lower_indices() {
        let currents = [1.0, 1.0, 1.0, 1.0];
        assert_eq!(top_k(&currents, 2), vec![0, 1]);

        let currents = [0.0, 1.0, 1.0, 1.0];
        assert_eq!(top_k(&currents, 2), vec![1, 2]);
    }

    #[test]
    fn k_equal_to_population_returns_everyone() {
        let currents = [0.3, 0.1, 0.2];
        assert_eq!(top_k(&currents, 3), vec![0, 1, 2]);
    }

    #[test]
    fn accumulation_sums_across_active_sources() {
        let mut conn = Connection::new();
        let mut rng = Prng::new(1);
        let mut currents = vec![0.0; 4];

        // p = 1.0 materializes every pair, so each of the three active
        // source neurons contributes base_weight to every candidate.
        accumulate_inputs(&mut conn, &[0, 1, 2], 1.0, 1.0, &mut rng, &mut currents);
        assert!(currents.iter().all(|&c| (c - 3.0).abs() < 1e-6));
        assert_eq!(conn.synapse_count(), 12);
    }

    #[test]
    fn accumulation_with_zero_probability_adds_nothing() {
        let mut conn = Connection::new();
        let mut rng = Prng::new(1);
        let mut currents = vec![0.0; 4];

        accumulate_inputs(&mut conn, &[0, 1], 0.0, 1.0, &mut rng, &mut currents);
        assert!(currents.iter().all(|&c| c == 0.0));
        assert_eq!(conn.synapse_count(), 0);
        assert_eq!(conn.sampled_count(), 8);
    }
}
