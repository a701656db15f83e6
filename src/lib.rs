//! # assemblage
//!
//! An Assembly Calculus simulation engine: populations of neurons linked by
//! a lazily-generated random synaptic graph, where firing a set of neurons
//! into a target area recruits a winner-take-k assembly there and Hebbian
//! plasticity wires the co-active sets together.
//!
//! ## Quick Start
//!
//! ```
//! use assemblage::prelude::*;
//!
//! // A brain with reproducible sampling.
//! let mut brain = Brain::new(BrainConfig::default().with_seed(42)).unwrap();
//! let stim = brain.add_stimulus(Stimulus::new(50, 0.05)).unwrap();
//! let area = brain.add_area(Area::with_k(400, 20, 0.05)).unwrap();
//!
//! // Project the stimulus: five rounds of winner selection + plasticity.
//! let mut assemblies = AssemblyStore::new();
//! let id = assemblies
//!     .project_stimulus(&mut brain, stim, area, 40, 5)
//!     .unwrap();
//!
//! assert_eq!(assemblies.representatives(id).unwrap().len(), 20);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization support for configs and descriptors
//! - `parallel`: winner selection for independent target areas runs on the
//!   rayon pool (results are identical to the single-threaded path)
//!
//! ## Modules
//!
//! - [`brain`]: part registries, winner state, and the round controller
//! - [`assembly`]: symbolic layer with project / merge / associate operations
//! - [`selection`]: input-current accumulation and top-k ranking
//! - [`plasticity`]: multiplicative Hebbian weight updates
//! - [`support`]: bounded assembly support with age-based eviction
//! - [`components`]: areas, stimuli, and connection storage

pub mod assembly;
pub mod brain;
pub mod components;
pub mod error;
pub mod plasticity;
pub mod prng;
pub mod selection;
pub mod support;

/// Prelude module for convenient imports.
///
/// ```
/// use assemblage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assembly::{Assembly, AssemblyId, AssemblyStore, Projectable};
    pub use crate::brain::{Brain, BrainConfig, Diagnostics, RoundStats};
    pub use crate::components::{
        Area, AreaId, Connection, NeuronId, PartId, Stimulus, StimulusId, Weight,
    };
    pub use crate::error::{BrainError, Result};
    pub use crate::plasticity::PlasticityStats;
    pub use crate::support::SupportTracker;
}
