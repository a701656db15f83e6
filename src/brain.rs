//! The brain: part registries, per-area winner state, and the round
//! controller that drives winner selection and plasticity.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::{debug, trace};

use crate::components::{Area, AreaId, Connection, NeuronId, PartId, Stimulus, StimulusId, Weight};
use crate::error::{BrainError, Result};
use crate::plasticity::{self, PlasticityStats};
use crate::prng::{mix64, Prng};
use crate::selection;

/// Engine-wide configuration.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BrainConfig {
    /// Base synapse generation probability for never-sampled neuron pairs.
    pub p: f32,
    /// Strength at which a generated synapse is materialized.
    pub base_weight: Weight,
    /// Rounds an assembly operation runs when the assembly does not carry
    /// its own repetition count.
    pub default_rounds: usize,
    /// If set, makes every simulation result reproducible.
    pub seed: Option<u64>,
}

impl Default for BrainConfig {
    /// Defaults follow the standard Assembly Calculus operating point:
    /// sparse random connectivity (p = 0.01) with unit base weights.
    fn default() -> Self {
        Self {
            p: 0.01,
            base_weight: 1.0,
            default_rounds: 10,
            seed: None,
        }
    }
}

impl BrainConfig {
    /// Set the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the synapse generation probability.
    pub fn with_p(mut self, p: f32) -> Self {
        self.p = p;
        self
    }

    /// Set the materialization strength for generated synapses.
    pub fn with_base_weight(mut self, base_weight: Weight) -> Self {
        self.base_weight = base_weight;
        self
    }

    /// Set the default rounds per assembly operation.
    pub fn with_default_rounds(mut self, rounds: usize) -> Self {
        self.default_rounds = rounds;
        self
    }

    /// Validate the configuration, returning an error message if invalid.
    pub fn validate(&self) -> core::result::Result<(), &'static str> {
        if !self.p.is_finite() || self.p <= 0.0 || self.p > 1.0 {
            return Err("p must be in (0, 1]");
        }
        if !self.base_weight.is_finite() || self.base_weight <= 0.0 {
            return Err("base_weight must be finite and > 0");
        }
        if self.default_rounds == 0 {
            return Err("default_rounds must be >= 1");
        }
        Ok(())
    }
}

/// Summary of the most recent `next_round` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundStats {
    /// Round counter after the call.
    pub round: u64,
    /// Iterations executed.
    pub iterations: usize,
    /// Target areas processed per iteration.
    pub targets: usize,
    /// Aggregated plasticity activity across the whole call.
    pub plasticity: PlasticityStats,
}

/// Runtime diagnostics about the brain's current state.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics {
    pub area_count: usize,
    pub stimulus_count: usize,
    /// Connections that have carried activity at least once.
    pub connection_count: usize,
    /// Materialized synapses across all connections.
    pub synapse_count: usize,
    /// Neuron pairs whose generation draw already happened.
    pub sampled_pair_count: usize,
    pub round: u64,
}

/// One target area's work for a single iteration: its sampling stream plus
/// the snapshot of every incoming (source, active set, connection) triple.
/// Connections are moved out of the brain for the duration of the selection
/// pass so independent targets can be computed in parallel.
struct TargetJob {
    area: AreaId,
    n: usize,
    k: usize,
    rng: Prng,
    sources: Vec<(PartId, Vec<NeuronId>, Connection)>,
}

/// A simulated brain: registered parts, lazily generated synaptic graph,
/// per-area winner state, and a monotone round counter.
///
/// All state is process-local and single-owner; one `Brain` is driven by one
/// caller at a time. The optional `parallel` feature computes winner
/// selection for independent target areas on the rayon pool without changing
/// any result.
pub struct Brain {
    cfg: BrainConfig,
    areas: Vec<Area>,
    stimuli: Vec<Stimulus>,
    connections: HashMap<(PartId, AreaId), Connection>,
    winners: Vec<Vec<NeuronId>>,
    /// Per-area winner history: neuron -> number of rounds won.
    winner_counts: Vec<HashMap<NeuronId, u64>>,
    inhibited: HashSet<(PartId, AreaId)>,
    rng: Prng,
    round: u64,
    last_stats: RoundStats,
}

impl Brain {
    pub fn new(cfg: BrainConfig) -> Result<Self> {
        cfg.validate().map_err(BrainError::config)?;
        Ok(Self {
            cfg,
            areas: Vec::new(),
            stimuli: Vec::new(),
            connections: HashMap::new(),
            winners: Vec::new(),
            winner_counts: Vec::new(),
            inhibited: HashSet::new(),
            rng: Prng::new(cfg.seed.unwrap_or(1)),
            round: 0,
            last_stats: RoundStats::default(),
        })
    }

    pub fn config(&self) -> &BrainConfig {
        &self.cfg
    }

    /// Register an area. Fails fast on invalid sizes; `k > n` is a
    /// configuration error here, never a runtime event later.
    pub fn add_area(&mut self, area: Area) -> Result<AreaId> {
        area.validate().map_err(BrainError::config)?;
        let id = AreaId(self.areas.len());
        self.areas.push(area);
        self.winners.push(Vec::new());
        self.winner_counts.push(HashMap::new());
        Ok(id)
    }

    /// Register a stimulus.
    pub fn add_stimulus(&mut self, stimulus: Stimulus) -> Result<StimulusId> {
        stimulus.validate().map_err(BrainError::config)?;
        let id = StimulusId(self.stimuli.len());
        self.stimuli.push(stimulus);
        Ok(id)
    }

    /// Descriptor of a registered area.
    ///
    /// # Panics
    /// Panics if the handle comes from a different brain.
    pub fn area(&self, id: AreaId) -> &Area {
        &self.areas[id.0]
    }

    /// Descriptor of a registered stimulus.
    ///
    /// # Panics
    /// Panics if the handle comes from a different brain.
    pub fn stimulus(&self, id: StimulusId) -> &Stimulus {
        &self.stimuli[id.0]
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    pub fn stimulus_count(&self) -> usize {
        self.stimuli.len()
    }

    /// Current winner set of an area, ascending neuron index.
    pub fn winners(&self, area: AreaId) -> &[NeuronId] {
        &self.winners[area.0]
    }

    /// Owned copy of an area's winner set.
    pub fn get_winners(&self, area: AreaId) -> Vec<NeuronId> {
        self.winners[area.0].clone()
    }

    /// Overwrite an area's winner set, e.g. to fire an assembly's
    /// representative neurons. Indices are deduplicated and validated
    /// against the area's population.
    pub fn set_winners(&mut self, area: AreaId, winners: &[NeuronId]) -> Result<()> {
        let a = self.check_area(area)?;
        if let Some(&bad) = winners.iter().find(|&&w| w >= a.n) {
            return Err(BrainError::invariant(format!(
                "winner index {bad} out of range for area of size {}",
                a.n
            )));
        }
        let mut set: Vec<NeuronId> = winners.to_vec();
        set.sort_unstable();
        set.dedup();
        self.winners[area.0] = set;
        Ok(())
    }

    /// Reset an area's winner set to empty.
    pub fn clear_winners(&mut self, area: AreaId) -> Result<()> {
        self.check_area(area)?;
        self.winners[area.0].clear();
        Ok(())
    }

    /// Winner history of an area: neuron -> number of rounds it has won.
    pub fn support(&self, area: AreaId) -> &HashMap<NeuronId, u64> {
        &self.winner_counts[area.0]
    }

    /// Suppress a (source, target) link: while inhibited it contributes no
    /// input current and receives no plasticity, even when listed in a
    /// subconnectome.
    pub fn inhibit(&mut self, source: PartId, target: AreaId) -> Result<()> {
        self.check_part(source)?;
        self.check_area(target)?;
        self.inhibited.insert((source, target));
        Ok(())
    }

    /// Lift a suppression installed by [`inhibit`](Self::inhibit).
    pub fn disinhibit(&mut self, source: PartId, target: AreaId) -> Result<()> {
        self.check_part(source)?;
        self.check_area(target)?;
        self.inhibited.remove(&(source, target));
        Ok(())
    }

    pub fn is_inhibited(&self, source: PartId, target: AreaId) -> bool {
        self.inhibited.contains(&(source, target))
    }

    /// Weight of a materialized synapse on the `source -> dest` connection.
    pub fn synapse_weight(
        &self,
        source: PartId,
        dest: AreaId,
        pre: NeuronId,
        post: NeuronId,
    ) -> Option<Weight> {
        self.connections.get(&(source, dest))?.weight(pre, post)
    }

    /// Synapse storage for one directed connection, if it has ever carried
    /// activity.
    pub fn connection(&self, source: PartId, dest: AreaId) -> Option<&Connection> {
        self.connections.get(&(source, dest))
    }

    /// Global round counter: increases by one per executed iteration.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn last_round_stats(&self) -> &RoundStats {
        &self.last_stats
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut synapse_count = 0;
        let mut sampled_pair_count = 0;
        for conn in self.connections.values() {
            synapse_count += conn.synapse_count();
            sampled_pair_count += conn.sampled_count();
        }
        Diagnostics {
            area_count: self.areas.len(),
            stimulus_count: self.stimuli.len(),
            connection_count: self.connections.len(),
            synapse_count,
            sampled_pair_count,
            round: self.round,
        }
    }

    /// Run `iterations` simulation rounds over the given subconnectome.
    ///
    /// `subconnectome` maps each firing source part to the target areas it
    /// projects into this round. Per iteration: every target area's input
    /// currents are accumulated from a snapshot of its sources' active sets
    /// (an area's current winners, a stimulus's full population), the top-k
    /// candidates win, and Hebbian plasticity strengthens every co-winning
    /// pair. With `replace` false the fresh winners are merged into the
    /// target's prior set instead of overwriting it.
    ///
    /// The whole subconnectome is validated before any state changes, so a
    /// failed call leaves the brain exactly as it was. Target areas within
    /// one iteration are independent: selection reads the pre-round
    /// snapshot, and application order cannot change the result.
    pub fn next_round(
        &mut self,
        subconnectome: &[(PartId, Vec<PartId>)],
        replace: bool,
        iterations: usize,
    ) -> Result<()> {
        // Validation pass: nothing below may mutate until this completes.
        let mut targets_map: BTreeMap<AreaId, Vec<PartId>> = BTreeMap::new();
        for (source, targets) in subconnectome {
            self.check_part(*source)?;
            for target in targets {
                let area = match target {
                    PartId::Area(area) => *area,
                    PartId::Stimulus(_) => {
                        return Err(BrainError::invariant(
                            "projection target must be an area, got a stimulus",
                        ))
                    }
                };
                self.check_area(area)?;
                targets_map.entry(area).or_default().push(*source);
            }
        }
        for sources in targets_map.values_mut() {
            sources.sort_unstable();
            sources.dedup();
        }

        debug!(
            targets = targets_map.len(),
            iterations, replace, "advancing rounds"
        );

        let p = self.cfg.p;
        let base_weight = self.cfg.base_weight;
        let mut call_stats = PlasticityStats::default();

        for _ in 0..iterations {
            let salt = self.rng.next_u64();

            // Snapshot every source's active set before any winner state or
            // synapse weight changes this iteration.
            let mut active: BTreeMap<PartId, Vec<NeuronId>> = BTreeMap::new();
            for sources in targets_map.values() {
                for &source in sources {
                    if !active.contains_key(&source) {
                        let set = self.active_set(source);
                        active.insert(source, set);
                    }
                }
            }

            let mut jobs: Vec<TargetJob> = Vec::with_capacity(targets_map.len());
            for (&target, sources) in &targets_map {
                let (n, k) = {
                    let area = &self.areas[target.0];
                    (area.n, area.k)
                };
                let mut job_sources = Vec::with_capacity(sources.len());
                for &s in sources {
                    if self.inhibited.contains(&(s, target)) {
                        continue;
                    }
                    let conn = self.connections.remove(&(s, target)).unwrap_or_default();
                    job_sources.push((s, active[&s].clone(), conn));
                }
                jobs.push(TargetJob {
                    area: target,
                    n,
                    k,
                    rng: Prng::new(mix64(salt, target.0 as u64)),
                    sources: job_sources,
                });
            }

            let select = |mut job: TargetJob| -> (TargetJob, Vec<NeuronId>) {
                let mut currents = vec![0.0f32; job.n];
                for (_, active_set, conn) in job.sources.iter_mut() {
                    selection::accumulate_inputs(
                        conn,
                        active_set,
                        p,
                        base_weight,
                        &mut job.rng,
                        &mut currents,
                    );
                }
                let winners = selection::top_k(&currents, job.k);
                (job, winners)
            };

            #[cfg(feature = "parallel")]
            let selected: Vec<(TargetJob, Vec<NeuronId>)> =
                jobs.into_par_iter().map(select).collect();
            #[cfg(not(feature = "parallel"))]
            let selected: Vec<(TargetJob, Vec<NeuronId>)> = jobs.into_iter().map(select).collect();

            for (job, new_winners) in selected {
                let beta = self.areas[job.area.0].beta;
                for (source, active_set, mut conn) in job.sources {
                    call_stats.merge(plasticity::apply_hebbian(
                        &mut conn,
                        &active_set,
                        &new_winners,
                        beta,
                        base_weight,
                    ));
                    self.connections.insert((source, job.area), conn);
                }

                let history = &mut self.winner_counts[job.area.0];
                for &w in &new_winners {
                    *history.entry(w).or_insert(0) += 1;
                }

                trace!(
                    area = job.area.0,
                    winners = new_winners.len(),
                    "target resolved"
                );

                if replace {
                    self.winners[job.area.0] = new_winners;
                } else {
                    let merged = &mut self.winners[job.area.0];
                    merged.extend(new_winners);
                    merged.sort_unstable();
                    merged.dedup();
                }
            }

            self.round += 1;
        }

        self.last_stats = RoundStats {
            round: self.round,
            iterations,
            targets: targets_map.len(),
            plasticity: call_stats,
        };
        Ok(())
    }

    /// The set of source neurons that fire when `part` participates in a
    /// round: an area's current winners, or all of a stimulus's neurons.
    fn active_set(&self, part: PartId) -> Vec<NeuronId> {
        match part {
            PartId::Area(a) => self.winners[a.0].clone(),
            PartId::Stimulus(s) => (0..self.stimuli[s.0].n).collect(),
        }
    }

    pub(crate) fn check_area(&self, id: AreaId) -> Result<&Area> {
        self.areas
            .get(id.0)
            .ok_or_else(|| BrainError::config(format!("area {} is not registered", id.0)))
    }

    pub(crate) fn check_part(&self, id: PartId) -> Result<()> {
        let known = match id {
            PartId::Area(a) => a.0 < self.areas.len(),
            PartId::Stimulus(s) => s.0 < self.stimuli.len(),
        };
        if known {
            Ok(())
        } else {
            Err(BrainError::config(format!("{id:?} is not registered")))
        }
    }
}
