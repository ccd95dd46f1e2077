//! Gillespie stochastic simulation of chemical reaction networks.
//!
//! A [`ReactionNetwork`] is an ordered list of reactions with integer
//! stoichiometry and mass-action rate constants. Propensities follow the
//! combinatorial convention `k * prod C(x_s, m_s)`. A [`TrajectoryRunner`] advances
//! a [`State`] one event at a time, drawing two uniforms per event (waiting time,
//! then reaction choice), until a classifier absorbs the state, nothing can fire,
//! or a time or step budget runs out.
//!
//! ```
//! use crn_ssa::{simulate, Reaction, ReactionNetwork, RunLimits, State, StopReason, Stoichiometry};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let network = ReactionNetwork::new(vec![Reaction::new(
//!     Stoichiometry::new().with("A", 2),
//!     Stoichiometry::new().with("B", 3),
//!     1.0,
//! )])?;
//! let initial = network.state([("A", 4)])?;
//! let never = |_: &State| None::<&str>;
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let outcome = simulate(&network, &initial, &never, RunLimits::default(), &mut rng)?;
//! assert_eq!(outcome.stop_reason, StopReason::NoReaction);
//! assert_eq!(outcome.final_state.get("B"), 6);
//! # Ok::<(), crn_ssa::SimError>(())
//! ```

pub mod combinatorics;
pub mod ensemble;
pub mod error;
pub mod loader;
pub mod network;
pub mod propensity;
pub mod runner;
pub mod sequencer;
pub mod state;
pub mod stepper;

pub use combinatorics::choose;
pub use ensemble::{
    derive_seed, Ensemble, EnsembleConfig, EnsembleSummary, SpeciesStats, SweepPoint,
};
pub use error::{ParseError, Result, SimError};
pub use network::{Reaction, ReactionNetwork, SpeciesIndex, Stoichiometry};
pub use propensity::{propensity, total_propensity, Propensities};
pub use runner::{
    simulate, Classifier, EventLog, NeverAbsorb, Observer, RunLimits, StopReason, TimeSeries,
    TrajectoryOutcome, TrajectoryRunner,
};
pub use sequencer::{SequencedOutcome, Sequencer};
pub use state::State;
pub use stepper::{
    select_reaction, waiting_time, Event, StepOutcome, Stepper, UniformSource, MIN_UNIFORM,
};
