//! Symbolic assembly layer: named neuron sets and the operations that
//! recruit them.
//!
//! An assembly is defined primarily by its parents, the stimuli and/or
//! assemblies that were fired to create it. The operations here (`project`,
//! `reciprocal_project`, `merge`, `associate`) are explicit method calls on
//! a registry that drives a [`Brain`] passed in by the caller; there is no
//! operator sugar and no implicit context. Assemblies reference each other
//! by id, never by direct links, so the object graph stays acyclic.

use hashbrown::HashMap;

use tracing::debug;

use crate::brain::Brain;
use crate::components::{AreaId, NeuronId, StimulusId};
use crate::error::{BrainError, Result};
use crate::prng::mix64;
use crate::support::SupportTracker;

/// Identity of an assembly, derived from its area and sorted parent set, so
/// equivalent assemblies resolve to the same id and repeated operations
/// reinforce one record instead of multiplying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssemblyId(u64);

/// What can be fired to create an assembly: a previously formed assembly or
/// a raw stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Projectable {
    Assembly(AssemblyId),
    Stimulus(StimulusId),
}

impl From<AssemblyId> for Projectable {
    fn from(id: AssemblyId) -> Self {
        Projectable::Assembly(id)
    }
}

impl From<StimulusId> for Projectable {
    fn from(id: StimulusId) -> Self {
        Projectable::Stimulus(id)
    }
}

fn projectable_tag(p: Projectable) -> u64 {
    match p {
        Projectable::Assembly(id) => mix64(1, id.0),
        Projectable::Stimulus(s) => mix64(2, s.index() as u64),
    }
}

/// Hash (area, parents) into an [`AssemblyId`]. Parents must already be
/// sorted so that parent order never changes the identity.
fn assembly_hash(area: AreaId, parents: &[Projectable]) -> AssemblyId {
    let mut h = mix64(0x41_53_4D_42, area.index() as u64);
    for &p in parents {
        h = mix64(h, projectable_tag(p));
    }
    AssemblyId(h)
}

/// A formed assembly: its lineage, where it lives, and the bounded support
/// set backing its identity.
#[derive(Debug, Clone)]
pub struct Assembly {
    id: AssemblyId,
    parents: Vec<Projectable>,
    area: AreaId,
    /// Rounds each operation on this assembly runs.
    rounds: usize,
    support: SupportTracker,
    /// Winner snapshot from the last time this assembly was reinforced;
    /// this is the set fired on its behalf.
    representatives: Vec<NeuronId>,
}

impl Assembly {
    pub fn id(&self) -> AssemblyId {
        self.id
    }

    pub fn area(&self) -> AreaId {
        self.area
    }

    pub fn parents(&self) -> &[Projectable] {
        &self.parents
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn support(&self) -> &SupportTracker {
        &self.support
    }

    pub fn representatives(&self) -> &[NeuronId] {
        &self.representatives
    }
}

/// Registry of assemblies plus the operations that create and reinforce
/// them. One store typically accompanies one brain, but the pairing is the
/// caller's: every operation takes the brain explicitly.
#[derive(Debug, Default)]
pub struct AssemblyStore {
    items: Vec<Assembly>,
    index: HashMap<AssemblyId, usize>,
}

impl AssemblyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: AssemblyId) -> Option<&Assembly> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    /// Support set of an assembly, if it exists.
    pub fn support(&self, id: AssemblyId) -> Option<&SupportTracker> {
        self.get(id).map(Assembly::support)
    }

    /// Representative neurons of an assembly, if it exists.
    pub fn representatives(&self, id: AssemblyId) -> Option<&[NeuronId]> {
        self.get(id).map(Assembly::representatives)
    }

    /// Project a stimulus into an area, forming (or reinforcing) the
    /// top-level assembly whose only parent is the stimulus.
    ///
    /// Runs `rounds` simulation rounds of stimulus -> area plus the area's
    /// recurrent edge, then records the resulting winners as the assembly's
    /// representatives and folds them into its support.
    pub fn project_stimulus(
        &mut self,
        brain: &mut Brain,
        stimulus: StimulusId,
        area: AreaId,
        support_size: usize,
        rounds: usize,
    ) -> Result<AssemblyId> {
        brain.check_part(stimulus.into())?;
        brain.check_area(area)?;
        Self::check_op_params(support_size, rounds)?;

        brain.clear_winners(area)?;
        brain.next_round(
            &[
                (stimulus.into(), vec![area.into()]),
                (area.into(), vec![area.into()]),
            ],
            true,
            rounds,
        )?;

        let winners = brain.get_winners(area);
        let id = self.reinforce_record(
            vec![stimulus.into()],
            area,
            support_size,
            rounds,
            &winners,
        );
        debug!(?id, winners = winners.len(), "stimulus projected");
        Ok(id)
    }

    /// Project an assembly into an area, forming (or reinforcing) a child
    /// assembly there. The child inherits the parent's support capacity and
    /// round count.
    pub fn project(
        &mut self,
        brain: &mut Brain,
        parent: AssemblyId,
        area: AreaId,
    ) -> Result<AssemblyId> {
        brain.check_area(area)?;
        let (parent_area, reps, support_size, rounds) = {
            let p = self.checked(parent)?;
            (
                p.area,
                p.representatives.clone(),
                p.support.capacity(),
                p.rounds,
            )
        };

        brain.set_winners(parent_area, &reps)?;
        brain.clear_winners(area)?;
        brain.next_round(
            &[
                (parent_area.into(), vec![area.into()]),
                (area.into(), vec![area.into()]),
            ],
            true,
            rounds,
        )?;

        let winners = brain.get_winners(area);
        let id = self.reinforce_record(vec![parent.into()], area, support_size, rounds, &winners);
        debug!(?id, winners = winners.len(), "assembly projected");
        Ok(id)
    }

    /// Project an assembly into an area and then fire the new assembly back
    /// into the parent's area, leaving strong links in both directions. The
    /// parent's support and representatives are refreshed by the
    /// back-projection.
    pub fn reciprocal_project(
        &mut self,
        brain: &mut Brain,
        parent: AssemblyId,
        area: AreaId,
    ) -> Result<AssemblyId> {
        let child = self.project(brain, parent, area)?;

        let (parent_area, rounds) = {
            let p = self.checked(parent)?;
            (p.area, p.rounds)
        };
        let child_reps = self.checked(child)?.representatives.clone();

        brain.set_winners(area, &child_reps)?;
        brain.clear_winners(parent_area)?;
        brain.next_round(
            &[
                (area.into(), vec![parent_area.into()]),
                (parent_area.into(), vec![parent_area.into()]),
            ],
            true,
            rounds,
        )?;

        let winners = brain.get_winners(parent_area);
        let p = &mut self.items[self.index[&parent]];
        p.support.update(&winners);
        p.representatives = winners;
        Ok(child)
    }

    /// Merge two assemblies from different areas into a third area, forming
    /// an assembly with both as parents. Both parents fire simultaneously
    /// for `max` of the parents' round counts.
    pub fn merge(
        &mut self,
        brain: &mut Brain,
        a: AssemblyId,
        b: AssemblyId,
        area: AreaId,
    ) -> Result<AssemblyId> {
        brain.check_area(area)?;
        let (area_a, reps_a, support_size, rounds_a) = {
            let x = self.checked(a)?;
            (x.area, x.representatives.clone(), x.support.capacity(), x.rounds)
        };
        let (area_b, reps_b, rounds_b) = {
            let x = self.checked(b)?;
            (x.area, x.representatives.clone(), x.rounds)
        };
        if area_a == area_b {
            return Err(BrainError::invariant(
                "merge expects assemblies from different areas",
            ));
        }

        let rounds = rounds_a.max(rounds_b);
        brain.set_winners(area_a, &reps_a)?;
        brain.set_winners(area_b, &reps_b)?;
        brain.clear_winners(area)?;
        brain.next_round(
            &[
                (area_a.into(), vec![area.into()]),
                (area_b.into(), vec![area.into()]),
                (area.into(), vec![area.into()]),
            ],
            true,
            rounds,
        )?;

        let winners = brain.get_winners(area);
        let mut parents = vec![Projectable::from(a), Projectable::from(b)];
        parents.sort_unstable();
        let id = self.reinforce_record(parents, area, support_size, rounds, &winners);
        debug!(?id, winners = winners.len(), "assemblies merged");
        Ok(id)
    }

    /// Associate two assemblies living in the same area by co-firing their
    /// representative sets through the area's recurrent edge. Both supports
    /// absorb the resulting winners; no new assembly is formed.
    pub fn associate(&mut self, brain: &mut Brain, a: AssemblyId, b: AssemblyId) -> Result<()> {
        let (area_a, reps_a, rounds_a) = {
            let x = self.checked(a)?;
            (x.area, x.representatives.clone(), x.rounds)
        };
        let (area_b, reps_b, rounds_b) = {
            let x = self.checked(b)?;
            (x.area, x.representatives.clone(), x.rounds)
        };
        if area_a != area_b {
            return Err(BrainError::invariant(
                "associate expects assemblies in the same area",
            ));
        }

        let mut joint: Vec<NeuronId> = reps_a;
        joint.extend(reps_b);
        joint.sort_unstable();
        joint.dedup();

        brain.set_winners(area_a, &joint)?;
        brain.next_round(
            &[(area_a.into(), vec![area_a.into()])],
            true,
            rounds_a.max(rounds_b),
        )?;

        let winners = brain.get_winners(area_a);
        for id in [a, b] {
            let rec = &mut self.items[self.index[&id]];
            rec.support.update(&winners);
        }
        Ok(())
    }

    fn check_op_params(support_size: usize, rounds: usize) -> Result<()> {
        if support_size == 0 {
            return Err(BrainError::config("support capacity must be >= 1"));
        }
        if rounds == 0 {
            return Err(BrainError::config("operation rounds must be >= 1"));
        }
        Ok(())
    }

    fn checked(&self, id: AssemblyId) -> Result<&Assembly> {
        self.get(id)
            .ok_or_else(|| BrainError::invariant(format!("unknown assembly {id:?}")))
    }

    /// Create the record for (parents, area) if it does not exist, then fold
    /// the given winners into its support and representatives.
    fn reinforce_record(
        &mut self,
        parents: Vec<Projectable>,
        area: AreaId,
        support_size: usize,
        rounds: usize,
        winners: &[NeuronId],
    ) -> AssemblyId {
        let id = assembly_hash(area, &parents);
        let idx = match self.index.get(&id) {
            Some(&i) => i,
            None => {
                let i = self.items.len();
                self.items.push(Assembly {
                    id,
                    parents,
                    area,
                    rounds,
                    support: SupportTracker::new(support_size),
                    representatives: Vec::new(),
                });
                self.index.insert(id, i);
                i
            }
        };
        let rec = &mut self.items[idx];
        rec.support.update(winners);
        rec.representatives = winners.to_vec();
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::BrainConfig;
    use crate::components::{Area, Stimulus};

    fn brain_with(seed: u64) -> (Brain, StimulusId, AreaId, AreaId, AreaId) {
        let mut brain = Brain::new(BrainConfig::default().with_seed(seed).with_p(0.05)).unwrap();
        let stim = brain.add_stimulus(Stimulus::new(30, 0.05)).unwrap();
        let a = brain.add_area(Area::with_k(200, 10, 0.05)).unwrap();
        let b = brain.add_area(Area::with_k(200, 10, 0.05)).unwrap();
        let c = brain.add_area(Area::with_k(200, 10, 0.05)).unwrap();
        (brain, stim, a, b, c)
    }

    #[test]
    fn stimulus_projection_forms_an_assembly_with_k_representatives() {
        let (mut brain, stim, a, _, _) = brain_with(11);
        let mut store = AssemblyStore::new();

        let id = store.project_stimulus(&mut brain, stim, a, 20, 3).unwrap();
        let asm = store.get(id).unwrap();

        assert_eq!(asm.area(), a);
        assert_eq!(asm.representatives().len(), 10);
        assert_eq!(asm.support().len(), 10);
        assert!(asm
            .representatives()
            .iter()
            .all(|&w| asm.support().age(w) == Some(1)));
    }

    #[test]
    fn repeated_projection_reinforces_the_same_assembly() {
        let (mut brain, stim, a, _, _) = brain_with(11);
        let mut store = AssemblyStore::new();

        let first = store.project_stimulus(&mut brain, stim, a, 20, 3).unwrap();
        let second = store.project_stimulus(&mut brain, stim, a, 20, 3).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn projection_chains_create_child_assemblies() {
        let (mut brain, stim, a, b, _) = brain_with(12);
        let mut store = AssemblyStore::new();

        let parent = store.project_stimulus(&mut brain, stim, a, 20, 3).unwrap();
        let child = store.project(&mut brain, parent, b).unwrap();

        let rec = store.get(child).unwrap();
        assert_eq!(rec.area(), b);
        assert_eq!(rec.parents(), &[Projectable::Assembly(parent)]);
        assert_eq!(rec.representatives().len(), 10);
        // Child inherits the parent's operation parameters.
        assert_eq!(rec.rounds(), 3);
        assert_eq!(rec.support().capacity(), 20);
    }

    #[test]
    fn merged_support_is_exactly_the_rounds_winners_at_age_one() {
        let (mut brain, stim, a, b, c) = brain_with(13);
        let mut store = AssemblyStore::new();

        let in_a = store.project_stimulus(&mut brain, stim, a, 20, 1).unwrap();
        let in_b = store.project_stimulus(&mut brain, stim, b, 20, 1).unwrap();
        let merged = store.merge(&mut brain, in_a, in_b, c).unwrap();

        let rec = store.get(merged).unwrap();
        let winners = brain.get_winners(c);
        assert_eq!(rec.support().neurons(), winners);
        assert!(rec.support().iter().all(|(_, age)| age == 1));
    }

    #[test]
    fn merge_is_order_insensitive_in_identity() {
        let (mut brain, stim, a, b, c) = brain_with(14);
        let mut store = AssemblyStore::new();

        let in_a = store.project_stimulus(&mut brain, stim, a, 20, 1).unwrap();
        let in_b = store.project_stimulus(&mut brain, stim, b, 20, 1).unwrap();

        let ab = store.merge(&mut brain, in_a, in_b, c).unwrap();
        let ba = store.merge(&mut brain, in_b, in_a, c).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn merge_rejects_assemblies_from_the_same_area() {
        let (mut brain, stim, a, _, c) = brain_with(15);
        let mut store = AssemblyStore::new();

        let x = store.project_stimulus(&mut brain, stim, a, 20, 1).unwrap();
        let err = store.merge(&mut brain, x, x, c).unwrap_err();
        assert!(matches!(err, BrainError::InvariantViolation(_)));
    }

    #[test]
    fn associate_rejects_assemblies_from_different_areas() {
        let (mut brain, stim, a, b, _) = brain_with(16);
        let mut store = AssemblyStore::new();

        let in_a = store.project_stimulus(&mut brain, stim, a, 20, 1).unwrap();
        let in_b = store.project_stimulus(&mut brain, stim, b, 20, 1).unwrap();
        let err = store.associate(&mut brain, in_a, in_b).unwrap_err();
        assert!(matches!(err, BrainError::InvariantViolation(_)));
    }

    #[test]
    fn associate_reinforces_both_supports() {
        let (mut brain, stim, a, b, c) = brain_with(17);
        let mut store = AssemblyStore::new();

        // Two distinct assemblies in area c, formed from different lineages.
        let in_a = store.project_stimulus(&mut brain, stim, a, 20, 2).unwrap();
        let in_b = store.project_stimulus(&mut brain, stim, b, 20, 2).unwrap();
        let x = store.project(&mut brain, in_a, c).unwrap();
        let y = store.project(&mut brain, in_b, c).unwrap();
        assert_ne!(x, y);

        store.associate(&mut brain, x, y).unwrap();
        let winners = brain.get_winners(c);
        for id in [x, y] {
            let support = store.support(id).unwrap();
            assert!(winners.iter().all(|&w| support.age(w) == Some(1)));
        }
    }

    #[test]
    fn reciprocal_projection_refreshes_the_parent() {
        let (mut brain, stim, a, b, _) = brain_with(18);
        let mut store = AssemblyStore::new();

        let parent = store.project_stimulus(&mut brain, stim, a, 20, 2).unwrap();
        let child = store.reciprocal_project(&mut brain, parent, b).unwrap();

        let p = store.get(parent).unwrap();
        let c = store.get(child).unwrap();
        assert_eq!(c.area(), b);
        // The back-projection re-reinforced the parent this round.
        assert!(p
            .representatives()
            .iter()
            .all(|&w| p.support().age(w) == Some(1)));
        assert_eq!(p.representatives(), brain.winners(a));
    }

    #[test]
    fn operations_on_unknown_assemblies_fail_cleanly() {
        let (mut brain, _stim, a, _, _) = brain_with(19);
        let mut store = AssemblyStore::new();

        let ghost = AssemblyId(0xBAD);
        assert!(matches!(
            store.project(&mut brain, ghost, a),
            Err(BrainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn zero_round_or_zero_capacity_operations_are_rejected() {
        let (mut brain, stim, a, _, _) = brain_with(20);
        let mut store = AssemblyStore::new();

        assert!(store.project_stimulus(&mut brain, stim, a, 0, 1).is_err());
        assert!(store.project_stimulus(&mut brain, stim, a, 20, 0).is_err());
    }
}
