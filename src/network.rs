use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SimError};
use crate::state::State;

/// Multiset of species taking part on one side of a reaction.
///
/// Adding the same species twice sums the multiplicities. Multiplicities are only
/// checked when the reaction is placed into a [`ReactionNetwork`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stoichiometry {
    terms: BTreeMap<String, i64>,
}

impl Stoichiometry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, species: impl Into<String>, multiplicity: i64) -> Self {
        self.add(species, multiplicity);
        self
    }

    pub fn add(&mut self, species: impl Into<String>, multiplicity: i64) {
        *self.terms.entry(species.into()).or_insert(0) += multiplicity;
    }

    pub fn get(&self, species: &str) -> i64 {
        self.terms.get(species).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.terms.iter().map(|(name, &m)| (name.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for Stoichiometry {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (species, multiplicity) in iter {
            out.add(species, multiplicity);
        }
        out
    }
}

impl fmt::Display for Stoichiometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("0");
        }
        for (idx, (name, m)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(" + ")?;
            }
            if m == 1 {
                write!(f, "{name}")?;
            } else {
                write!(f, "{m} {name}")?;
            }
        }
        Ok(())
    }
}

/// A single reaction: reactants, products and a mass-action rate constant.
#[derive(Clone, Debug, PartialEq)]
pub struct Reaction {
    reactants: Stoichiometry,
    products: Stoichiometry,
    rate_constant: f64,
}

impl Reaction {
    pub fn new(reactants: Stoichiometry, products: Stoichiometry, rate_constant: f64) -> Self {
        Self {
            reactants,
            products,
            rate_constant,
        }
    }

    pub fn reactants(&self) -> &Stoichiometry {
        &self.reactants
    }

    pub fn products(&self) -> &Stoichiometry {
        &self.products
    }

    pub fn rate_constant(&self) -> f64 {
        self.rate_constant
    }

    /// Net change in the count of `species` when this reaction fires.
    pub fn net_change(&self, species: &str) -> i64 {
        self.products.get(species) - self.reactants.get(species)
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (k = {})",
            self.reactants, self.products, self.rate_constant
        )
    }
}

/// Dense numbering of the species referenced by a network.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SpeciesIndex {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl SpeciesIndex {
    fn intern(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.lookup.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_owned());
        self.lookup.insert(name.to_owned(), idx);
        idx
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Reactant {
    pub(crate) species: usize,
    pub(crate) count: i64,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SpeciesDelta {
    pub(crate) species: usize,
    pub(crate) delta: i64,
}

/// Index-resolved form of a [`Reaction`] used on the hot path.
#[derive(Clone, Debug)]
pub(crate) struct CompiledReaction {
    pub(crate) rate_constant: f64,
    pub(crate) reactants: Vec<Reactant>,
    pub(crate) deltas: Vec<SpeciesDelta>,
}

/// Immutable, validated, ordered collection of reactions.
///
/// Reaction indices are positions in the list passed to [`ReactionNetwork::new`].
/// Species names are resolved to dense indices once here; states built through
/// [`ReactionNetwork::state`] share that numbering.
#[derive(Clone, Debug)]
pub struct ReactionNetwork {
    reactions: Vec<Reaction>,
    compiled: Vec<CompiledReaction>,
    species: Arc<SpeciesIndex>,
}

impl ReactionNetwork {
    pub fn new(reactions: Vec<Reaction>) -> Result<Self> {
        if reactions.is_empty() {
            return Err(SimError::EmptyNetwork);
        }
        let mut species = SpeciesIndex::default();
        for (idx, reaction) in reactions.iter().enumerate() {
            validate_reaction(idx, reaction)?;
            for (name, _) in reaction.reactants.iter().chain(reaction.products.iter()) {
                species.intern(name);
            }
        }
        let compiled = reactions
            .iter()
            .map(|reaction| compile_reaction(&species, reaction))
            .collect();
        Ok(Self {
            reactions,
            compiled,
            species: Arc::new(species),
        })
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn reaction(&self, idx: usize) -> Option<&Reaction> {
        self.reactions.get(idx)
    }

    pub fn species(&self) -> &SpeciesIndex {
        &self.species
    }

    pub(crate) fn species_arc(&self) -> &Arc<SpeciesIndex> {
        &self.species
    }

    pub(crate) fn compiled(&self) -> &[CompiledReaction] {
        &self.compiled
    }

    /// Builds a state for this network from `(species, count)` pairs.
    ///
    /// Species the network never mentions are kept as well, so classifiers can read
    /// them. Missing species start at zero. A later pair for the same species wins.
    pub fn state<S, I>(&self, counts: I) -> Result<State>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, i64)>,
    {
        let mut state = State::empty(Arc::clone(&self.species));
        for (name, count) in counts {
            let name = name.as_ref();
            if count < 0 {
                return Err(SimError::NegativeCount {
                    species: name.to_owned(),
                    count,
                });
            }
            state.set(name, count);
        }
        Ok(state)
    }

    pub fn empty_state(&self) -> State {
        State::empty(Arc::clone(&self.species))
    }
}

fn validate_reaction(idx: usize, reaction: &Reaction) -> Result<()> {
    let rate = reaction.rate_constant;
    if !rate.is_finite() || rate < 0.0 {
        return Err(SimError::InvalidRate {
            reaction: idx,
            rate,
        });
    }
    for (name, multiplicity) in reaction.reactants.iter().chain(reaction.products.iter()) {
        if name.is_empty() {
            return Err(SimError::EmptySpeciesName { reaction: idx });
        }
        if multiplicity <= 0 {
            return Err(SimError::InvalidMultiplicity {
                reaction: idx,
                species: name.to_owned(),
                multiplicity,
            });
        }
    }
    Ok(())
}

fn compile_reaction(species: &SpeciesIndex, reaction: &Reaction) -> CompiledReaction {
    let index = |name: &str| {
        species
            .get(name)
            .unwrap_or_else(|| unreachable!("species '{name}' was interned during validation"))
    };
    let reactants = reaction
        .reactants
        .iter()
        .map(|(name, count)| Reactant {
            species: index(name),
            count,
        })
        .collect();

    let mut net: BTreeMap<usize, i64> = BTreeMap::new();
    for (name, m) in reaction.reactants.iter() {
        *net.entry(index(name)).or_insert(0) -= m;
    }
    for (name, m) in reaction.products.iter() {
        *net.entry(index(name)).or_insert(0) += m;
    }
    let deltas = net
        .into_iter()
        .filter_map(|(species, delta)| (delta != 0).then_some(SpeciesDelta { species, delta }))
        .collect();

    CompiledReaction {
        rate_constant: reaction.rate_constant,
        reactants,
        deltas,
    }
}
