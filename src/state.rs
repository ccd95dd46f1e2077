use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;

use crate::network::{Reaction, ReactionNetwork, SpeciesIndex};

/// Species counts for one trajectory.
///
/// Species referenced by the network live in a dense vector indexed the same way
/// as the network's compiled reactions; any other species (for example a scenario
/// parameter read only by a classifier) is kept by name. Looking up an unknown
/// species yields 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    species: Arc<SpeciesIndex>,
    counts: Vec<i64>,
    extra: BTreeMap<String, i64>,
}

impl State {
    pub(crate) fn empty(species: Arc<SpeciesIndex>) -> Self {
        let counts = vec![0; species.len()];
        Self {
            species,
            counts,
            extra: BTreeMap::new(),
        }
    }

    pub fn get(&self, species: &str) -> i64 {
        match self.species.get(species) {
            Some(idx) => self.counts[idx],
            None => self.extra.get(species).copied().unwrap_or(0),
        }
    }

    pub fn set(&mut self, species: &str, count: i64) {
        match self.species.get(species) {
            Some(idx) => self.counts[idx] = count,
            None => {
                self.extra.insert(species.to_owned(), count);
            }
        }
    }

    pub fn add(&mut self, species: &str, delta: i64) {
        let current = self.get(species);
        self.set(species, current + delta);
    }

    /// All known species with their counts: network species first, in network
    /// order, then the remaining ones by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.species
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.counts.iter().copied())
            .chain(self.extra.iter().map(|(name, &count)| (name.as_str(), count)))
    }

    pub fn to_map(&self) -> BTreeMap<String, i64> {
        self.iter()
            .map(|(name, count)| (name.to_owned(), count))
            .collect()
    }

    pub fn first_negative(&self) -> Option<(&str, i64)> {
        self.iter().find(|&(_, count)| count < 0)
    }

    /// Applies the stoichiometry of reaction `reaction` of `network` in one update.
    ///
    /// A state built for a different network is updated by species name.
    ///
    /// # Panics
    ///
    /// Panics if `reaction` is out of range for `network`.
    pub fn apply(&mut self, network: &ReactionNetwork, reaction: usize) {
        if !self.belongs_to(network) {
            self.apply_by_name(reaction, &network.reactions()[reaction]);
            return;
        }
        for delta in &network.compiled()[reaction].deltas {
            let count = &mut self.counts[delta.species];
            *count += delta.delta;
            if *count < 0 {
                warn!(
                    "reaction {} drove species '{}' negative ({})",
                    reaction,
                    self.species.name(delta.species),
                    *count
                );
            }
        }
    }

    fn apply_by_name(&mut self, idx: usize, reaction: &Reaction) {
        for (name, multiplicity) in reaction.reactants().iter() {
            self.add(name, -multiplicity);
        }
        for (name, multiplicity) in reaction.products().iter() {
            self.add(name, multiplicity);
        }
        for (name, _) in reaction.reactants().iter() {
            let count = self.get(name);
            if count < 0 {
                warn!("reaction {idx} drove species '{name}' negative ({count})");
            }
        }
    }

    pub(crate) fn counts(&self) -> &[i64] {
        &self.counts
    }

    pub(crate) fn belongs_to(&self, network: &ReactionNetwork) -> bool {
        let own = network.species_arc();
        Arc::ptr_eq(&self.species, own) || *self.species == **own
    }
}
