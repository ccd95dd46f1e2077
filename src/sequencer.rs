//! Deterministic, round-based execution of a reaction network.
//!
//! Each round walks the reactions in network order and fires every reaction whose
//! reactants are available at that moment, once. Later reactions in a round see
//! the effect of earlier ones. Rate constants are ignored.

use log::debug;

use crate::error::{Result, SimError};
use crate::network::ReactionNetwork;
use crate::runner::{Classifier, StopReason};
use crate::state::State;

#[derive(Clone, Debug, PartialEq)]
pub struct SequencedOutcome<L> {
    pub final_state: State,
    /// Never [`StopReason::TimeBudgetExceeded`]; the round budget reports as
    /// [`StopReason::StepBudgetExceeded`].
    pub stop_reason: StopReason<L>,
    pub rounds: u64,
    pub firings: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct Sequencer<'a> {
    network: &'a ReactionNetwork,
    max_rounds: u64,
}

impl<'a> Sequencer<'a> {
    pub fn new(network: &'a ReactionNetwork, max_rounds: u64) -> Self {
        Self {
            network,
            max_rounds,
        }
    }

    pub fn is_applicable(&self, state: &State, reaction: usize) -> bool {
        if !state.belongs_to(self.network) {
            return self.network.reactions()[reaction]
                .reactants()
                .iter()
                .all(|(name, multiplicity)| state.get(name) >= multiplicity);
        }
        self.network.compiled()[reaction]
            .reactants
            .iter()
            .all(|r| state.counts()[r.species] >= r.count)
    }

    pub fn run<C: Classifier>(
        &self,
        initial: &State,
        classifier: &C,
    ) -> Result<SequencedOutcome<C::Label>> {
        if !initial.belongs_to(self.network) {
            return Err(SimError::StateMismatch);
        }
        if let Some((species, count)) = initial.first_negative() {
            return Err(SimError::NegativeCount {
                species: species.to_owned(),
                count,
            });
        }

        let mut state = initial.clone();
        let mut rounds = 0u64;
        let mut firings = 0u64;
        let stop_reason = 'run: {
            if let Some(label) = classifier.classify(&state) {
                break 'run StopReason::Absorbed(label);
            }
            while rounds < self.max_rounds {
                rounds += 1;
                let mut fired = false;
                for reaction in 0..self.network.len() {
                    if self.is_applicable(&state, reaction) {
                        state.apply(self.network, reaction);
                        firings += 1;
                        fired = true;
                    }
                }
                if !fired {
                    break 'run StopReason::NoReaction;
                }
                if let Some(label) = classifier.classify(&state) {
                    break 'run StopReason::Absorbed(label);
                }
            }
            StopReason::StepBudgetExceeded
        };

        debug!(
            "sequenced run stopped after {} rounds and {} firings",
            rounds, firings
        );
        Ok(SequencedOutcome {
            final_state: state,
            stop_reason,
            rounds,
            firings,
        })
    }
}
