//! Combinatorial mass-action propensities.
//!
//! The propensity of a reaction is its rate constant times, for every reactant,
//! the number of ways to choose the required molecules from those present:
//! `k * prod C(x_s, m_s)`. It is exactly zero whenever some reactant is short.

use crate::combinatorics::choose;
use crate::network::{CompiledReaction, Reaction, ReactionNetwork};
use crate::state::State;

/// `rate * prod C(count, multiplicity)` over `(count, multiplicity)` pairs.
#[inline]
fn mass_action(rate: f64, reactants: impl IntoIterator<Item = (i64, i64)>) -> f64 {
    let mut value = rate;
    if value == 0.0 {
        return 0.0;
    }
    for (count, multiplicity) in reactants {
        let ways = choose(count, multiplicity);
        if ways == 0 {
            return 0.0;
        }
        value *= ways as f64;
    }
    value
}

/// Propensity of `reaction` in `state`, resolving species by name.
pub fn propensity(state: &State, reaction: &Reaction) -> f64 {
    mass_action(
        reaction.rate_constant(),
        reaction
            .reactants()
            .iter()
            .map(|(species, multiplicity)| (state.get(species), multiplicity)),
    )
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Propensities {
    pub values: Vec<f64>,
    pub total: f64,
}

impl Propensities {
    /// Probability that reaction `idx` is the next to fire, 0 if nothing can fire.
    pub fn probability(&self, idx: usize) -> f64 {
        if self.total > 0.0 {
            self.values.get(idx).copied().unwrap_or(0.0) / self.total
        } else {
            0.0
        }
    }
}

pub fn total_propensity(state: &State, network: &ReactionNetwork) -> Propensities {
    let mut values = vec![0.0; network.len()];
    let total = fill_propensities(network, state, &mut values);
    Propensities { values, total }
}

/// Writes every reaction's propensity into `values` and returns their sum.
///
/// States built for another network are read by species name.
pub(crate) fn fill_propensities(
    network: &ReactionNetwork,
    state: &State,
    values: &mut [f64],
) -> f64 {
    if state.belongs_to(network) {
        return recompute_propensities(network.compiled(), state.counts(), values);
    }
    let mut total = 0.0;
    for (slot, reaction) in values.iter_mut().zip(network.reactions()) {
        *slot = propensity(state, reaction);
        total += *slot;
    }
    total
}

impl CompiledReaction {
    #[inline]
    pub(crate) fn propensity(&self, state: &[i64]) -> f64 {
        mass_action(
            self.rate_constant,
            self.reactants.iter().map(|r| (state[r.species], r.count)),
        )
    }
}

pub(crate) fn recompute_propensities(
    reactions: &[CompiledReaction],
    state: &[i64],
    propensities: &mut [f64],
) -> f64 {
    let mut total = 0.0;
    for (slot, reaction) in propensities.iter_mut().zip(reactions) {
        let value = reaction.propensity(state);
        total += value;
        *slot = value;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Stoichiometry;

    fn network() -> ReactionNetwork {
        ReactionNetwork::new(vec![
            // 2X1 + X2 -> 4X3
            Reaction::new(
                Stoichiometry::new().with("x1", 2).with("x2", 1),
                Stoichiometry::new().with("x3", 4),
                1.0,
            ),
            // X1 + 2X3 -> 3X2
            Reaction::new(
                Stoichiometry::new().with("x1", 1).with("x3", 2),
                Stoichiometry::new().with("x2", 3),
                2.0,
            ),
            // X2 + X3 -> 2X1
            Reaction::new(
                Stoichiometry::new().with("x2", 1).with("x3", 1),
                Stoichiometry::new().with("x1", 2),
                3.0,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn mass_action_matches_hand_computation() {
        let network = network();
        let state = network.state([("x1", 9), ("x2", 8), ("x3", 7)]).unwrap();
        let props = total_propensity(&state, &network);
        assert_eq!(props.values, vec![36.0 * 8.0, 2.0 * 9.0 * 21.0, 3.0 * 56.0]);
        assert!((props.total - (288.0 + 378.0 + 168.0)).abs() < 1e-9);
        assert!((props.probability(0) - 288.0 / 834.0).abs() < 1e-12);
    }

    #[test]
    fn by_name_and_compiled_agree() {
        let network = network();
        let state = network.state([("x1", 110), ("x2", 26), ("x3", 55)]).unwrap();
        let props = total_propensity(&state, &network);
        for (idx, reaction) in network.reactions().iter().enumerate() {
            assert_eq!(props.values[idx], propensity(&state, reaction));
        }
    }

    #[test]
    fn understocked_reactant_gives_exact_zero() {
        let network = network();
        let state = network.state([("x1", 1), ("x2", 5), ("x3", 0)]).unwrap();
        let props = total_propensity(&state, &network);
        assert_eq!(props.values, vec![0.0, 0.0, 0.0]);
        assert_eq!(props.total, 0.0);
        assert_eq!(props.probability(0), 0.0);
    }

    #[test]
    fn propensity_never_decreases_with_more_reactant() {
        let network = network();
        let reaction = &network.reactions()[0];
        let mut previous = 0.0;
        for x1 in 0..40 {
            let state = network.state([("x1", x1), ("x2", 3)]).unwrap();
            let value = propensity(&state, reaction);
            assert!(value >= previous);
            if x1 < 2 {
                assert_eq!(value, 0.0);
            }
            previous = value;
        }
    }

    #[test]
    fn zero_rate_reaction_is_silent() {
        let network = ReactionNetwork::new(vec![Reaction::new(
            Stoichiometry::new(),
            Stoichiometry::new().with("A", 1),
            0.0,
        )])
        .unwrap();
        let props = total_propensity(&network.empty_state(), &network);
        assert_eq!(props.total, 0.0);
    }
}
