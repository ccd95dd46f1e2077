use rand::{Rng, RngCore};

use crate::network::ReactionNetwork;
use crate::propensity::fill_propensities;
use crate::state::State;

/// Floor applied to the time draw before taking its logarithm.
pub const MIN_UNIFORM: f64 = 1e-300;

/// A stream of independent uniform draws in `[0, 1)`.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

impl<R: RngCore> UniformSource for R {
    #[inline]
    fn next_uniform(&mut self) -> f64 {
        self.r#gen::<f64>()
    }
}

/// One proposed or committed reaction firing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Event {
    pub dt: f64,
    pub reaction: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    Fired(Event),
    /// Total propensity is zero: nothing can fire from this state.
    NoReaction,
}

/// Exponential waiting time with rate `total` from the uniform draw `u`.
#[inline]
pub fn waiting_time(total: f64, u: f64) -> f64 {
    -u.max(MIN_UNIFORM).ln() / total
}

/// Roulette-wheel selection: the first reaction with positive propensity whose
/// cumulative sum reaches `threshold`.
///
/// Falls back to the last reaction with positive propensity when rounding keeps
/// the cumulative sum below the threshold. Returns `None` only if every
/// propensity is zero.
pub fn select_reaction(propensities: &[f64], threshold: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (idx, &value) in propensities.iter().enumerate() {
        if value <= 0.0 {
            continue;
        }
        cumulative += value;
        last_positive = Some(idx);
        if cumulative >= threshold {
            return Some(idx);
        }
    }
    last_positive
}

/// Single SSA iteration with a reusable propensity buffer.
///
/// A fired step consumes exactly two draws from the random source (time first,
/// then selection); detecting that nothing can fire consumes none.
#[derive(Clone, Debug, Default)]
pub struct Stepper {
    propensities: Vec<f64>,
    total: f64,
}

impl Stepper {
    pub fn new(network: &ReactionNetwork) -> Self {
        Self {
            propensities: vec![0.0; network.len()],
            total: 0.0,
        }
    }

    /// Samples the next event without touching `state`.
    ///
    /// A state built for a different network is read by species name.
    pub fn propose<R: UniformSource>(
        &mut self,
        network: &ReactionNetwork,
        state: &State,
        rng: &mut R,
    ) -> StepOutcome {
        if self.propensities.len() != network.len() {
            self.propensities.resize(network.len(), 0.0);
        }
        self.total = fill_propensities(network, state, &mut self.propensities);
        if self.total.is_nan() || self.total <= 0.0 {
            return StepOutcome::NoReaction;
        }
        let dt = waiting_time(self.total, rng.next_uniform());
        let threshold = rng.next_uniform() * self.total;
        match select_reaction(&self.propensities, threshold) {
            Some(reaction) => StepOutcome::Fired(Event { dt, reaction }),
            None => StepOutcome::NoReaction,
        }
    }

    /// Samples the next event and applies it to `state`.
    pub fn step<R: UniformSource>(
        &mut self,
        network: &ReactionNetwork,
        state: &mut State,
        rng: &mut R,
    ) -> StepOutcome {
        let outcome = self.propose(network, state, rng);
        if let StepOutcome::Fired(event) = outcome {
            state.apply(network, event.reaction);
        }
        outcome
    }

    pub fn propensities(&self) -> &[f64] {
        &self.propensities
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Reaction, Stoichiometry};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::VecDeque;

    /// Replays a fixed list of draws and panics when it runs dry.
    struct ScriptedUniforms(VecDeque<f64>);

    impl ScriptedUniforms {
        fn new(values: &[f64]) -> Self {
            Self(values.iter().copied().collect())
        }
    }

    impl UniformSource for ScriptedUniforms {
        fn next_uniform(&mut self) -> f64 {
            self.0.pop_front().expect("scripted draws exhausted")
        }
    }

    fn sources(rates: &[f64]) -> ReactionNetwork {
        let reactions = rates
            .iter()
            .enumerate()
            .map(|(idx, &rate)| {
                Reaction::new(
                    Stoichiometry::new(),
                    Stoichiometry::new().with(format!("S{idx}"), 1),
                    rate,
                )
            })
            .collect();
        ReactionNetwork::new(reactions).unwrap()
    }

    #[test]
    fn selection_skips_zero_entries_and_uses_ge() {
        let props = [0.0, 2.0, 0.0, 5.0];
        assert_eq!(select_reaction(&props, 0.0), Some(1));
        assert_eq!(select_reaction(&props, 2.0), Some(1));
        assert_eq!(select_reaction(&props, 2.0001), Some(3));
        assert_eq!(select_reaction(&props, 7.0), Some(3));
        assert_eq!(select_reaction(&props, 7.5), Some(3));
        assert_eq!(select_reaction(&[0.0, 0.0], 0.0), None);
    }

    #[test]
    fn zero_draw_gives_finite_waiting_time() {
        let dt = waiting_time(4.0, 0.0);
        assert!(dt.is_finite());
        assert!((dt - (-(1e-300f64).ln() / 4.0)).abs() < 1e-12);
    }

    #[test]
    fn scripted_draws_pick_expected_reaction() {
        let network = sources(&[1.0, 3.0]);
        let mut state = network.empty_state();
        let mut stepper = Stepper::new(&network);
        let mut rng = ScriptedUniforms::new(&[0.5, 0.3]);
        let outcome = stepper.step(&network, &mut state, &mut rng);
        let expected_dt = -(0.5f64).ln() / 4.0;
        match outcome {
            StepOutcome::Fired(event) => {
                assert_eq!(event.reaction, 1);
                assert!((event.dt - expected_dt).abs() < 1e-15);
            }
            StepOutcome::NoReaction => panic!("expected a firing"),
        }
        assert_eq!(state.get("S1"), 1);
        assert!(rng.0.is_empty());
    }

    #[test]
    fn no_reaction_consumes_no_draws() {
        let network = ReactionNetwork::new(vec![Reaction::new(
            Stoichiometry::new().with("A", 1),
            Stoichiometry::new(),
            1.0,
        )])
        .unwrap();
        let mut state = network.empty_state();
        let mut rng = ScriptedUniforms::new(&[]);
        let outcome = Stepper::new(&network).step(&network, &mut state, &mut rng);
        assert_eq!(outcome, StepOutcome::NoReaction);
    }

    #[test]
    fn propose_does_not_mutate_state() {
        let network = sources(&[1.0]);
        let state = network.empty_state();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = Stepper::new(&network).propose(&network, &state, &mut rng);
        assert!(matches!(outcome, StepOutcome::Fired(_)));
        assert_eq!(state.get("S0"), 0);
    }

    #[test]
    fn selection_frequencies_follow_propensities() {
        let rates = [1.0, 2.0, 3.0, 4.0];
        let network = sources(&rates);
        let state = network.empty_state();
        let mut stepper = Stepper::new(&network);
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let draws = 100_000;
        let mut hits = [0usize; 4];
        for _ in 0..draws {
            match stepper.propose(&network, &state, &mut rng) {
                StepOutcome::Fired(event) => hits[event.reaction] += 1,
                StepOutcome::NoReaction => panic!("source reactions always fire"),
            }
        }
        for (idx, &count) in hits.iter().enumerate() {
            let observed = count as f64 / draws as f64;
            let expected = rates[idx] / 10.0;
            assert!(
                (observed - expected).abs() < 0.01,
                "reaction {idx}: observed {observed}, expected {expected}"
            );
        }
    }

    #[test]
    fn waiting_times_have_mean_inverse_total() {
        let network = sources(&[2.0, 3.0]);
        let state = network.empty_state();
        let mut stepper = Stepper::new(&network);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let draws = 50_000;
        let mut sum = 0.0;
        for _ in 0..draws {
            if let StepOutcome::Fired(event) = stepper.propose(&network, &state, &mut rng) {
                sum += event.dt;
            }
        }
        let mean = sum / draws as f64;
        assert!((mean - 0.2).abs() < 0.005, "mean waiting time {mean}");
    }

    fn conversion(from: &str, to: &str) -> ReactionNetwork {
        ReactionNetwork::new(vec![Reaction::new(
            Stoichiometry::new().with(from, 1),
            Stoichiometry::new().with(to, 1),
            1.0,
        )])
        .unwrap()
    }

    #[test]
    fn foreign_state_is_read_by_species_name() {
        let forward = conversion("A", "B");
        let backward = conversion("B", "A");

        // only A is present, so B -> A cannot fire
        let mut state = forward.state([("A", 5)]).unwrap();
        let mut rng = ScriptedUniforms::new(&[]);
        let outcome = Stepper::new(&backward).step(&backward, &mut state, &mut rng);
        assert_eq!(outcome, StepOutcome::NoReaction);
        assert_eq!(state.get("A"), 5);
        assert_eq!(state.get("B"), 0);

        let mut state = forward.state([("B", 3)]).unwrap();
        let mut rng = ScriptedUniforms::new(&[0.5, 0.5]);
        let mut stepper = Stepper::new(&backward);
        let outcome = stepper.step(&backward, &mut state, &mut rng);
        assert!(matches!(outcome, StepOutcome::Fired(Event { reaction: 0, .. })));
        assert_eq!(stepper.total(), 3.0);
        assert_eq!(state.get("A"), 1);
        assert_eq!(state.get("B"), 2);
    }

    #[test]
    fn smaller_foreign_state_does_not_panic() {
        let single = ReactionNetwork::new(vec![Reaction::new(
            Stoichiometry::new().with("A", 1),
            Stoichiometry::new(),
            1.0,
        )])
        .unwrap();
        let pair = conversion("B", "A");
        let state = single.state([("A", 2)]).unwrap();
        let mut rng = ScriptedUniforms::new(&[]);
        let outcome = Stepper::new(&pair).propose(&pair, &state, &mut rng);
        assert_eq!(outcome, StepOutcome::NoReaction);
    }
}
