use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::network::ReactionNetwork;
use crate::runner::{Classifier, RunLimits, TrajectoryOutcome, TrajectoryRunner};
use crate::state::State;

const DEFAULT_SEED: u64 = 0xDEADBEEFCAFEBABE;

/// Seed of trajectory `trajectory` derived from a base seed with SplitMix64.
pub fn derive_seed(seed: Option<u64>, trajectory: u64) -> u64 {
    const GOLDEN_GAMMA: u64 = 0x9E3779B97F4A7C15;
    let base = seed.unwrap_or(DEFAULT_SEED);
    let mut z = base ^ trajectory.wrapping_mul(GOLDEN_GAMMA);
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Trajectories per run (per parameter value for a sweep).
    pub n_trajectories: usize,
    /// Size of a dedicated thread pool; `None` uses rayon's global pool.
    pub n_threads: Option<usize>,
    pub seed: Option<u64>,
    pub limits: RunLimits,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_trajectories: 1,
            n_threads: None,
            seed: None,
            limits: RunLimits::default(),
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_trajectories == 0 {
            return Err(SimError::InvalidArgument(
                "number of trajectories must be greater than zero".into(),
            ));
        }
        if self.n_threads == Some(0) {
            return Err(SimError::InvalidArgument(
                "n_threads must be greater than zero when set".into(),
            ));
        }
        self.limits.validate()
    }
}

/// Outcomes of the trajectories run for one parameter value of a sweep.
#[derive(Clone, Debug)]
pub struct SweepPoint<P, L> {
    pub parameter: P,
    pub outcomes: Vec<TrajectoryOutcome<L>>,
}

/// Runs many independent trajectories in parallel.
///
/// Trajectory `i` draws from its own `ChaCha8Rng` seeded with
/// `derive_seed(config.seed, i)`, so results do not depend on the thread count.
pub struct Ensemble<'a, C> {
    network: &'a ReactionNetwork,
    classifier: &'a C,
    config: EnsembleConfig,
}

impl<'a, C> Ensemble<'a, C>
where
    C: Classifier + Sync,
    C::Label: Send,
{
    pub fn new(
        network: &'a ReactionNetwork,
        classifier: &'a C,
        config: EnsembleConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            network,
            classifier,
            config,
        })
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Runs `n_trajectories` trajectories from the same initial state.
    pub fn run(&self, initial: &State) -> Result<Vec<TrajectoryOutcome<C::Label>>> {
        self.run_with(|_| Ok(initial.clone()))
    }

    /// Runs `n_trajectories` trajectories, asking `prepare` for each initial state.
    pub fn run_with<F>(&self, prepare: F) -> Result<Vec<TrajectoryOutcome<C::Label>>>
    where
        F: Fn(usize) -> Result<State> + Sync,
    {
        self.run_indexed(self.config.n_trajectories, prepare)
    }

    /// Runs `n_trajectories` trajectories for each value in `parameters`, letting
    /// `adjust` tailor a copy of `initial` to the value (for example setting an
    /// initial-condition species).
    pub fn sweep<P, F>(
        &self,
        initial: &State,
        parameters: &[P],
        adjust: F,
    ) -> Result<Vec<SweepPoint<P, C::Label>>>
    where
        P: Clone + Sync,
        F: Fn(&mut State, &P) + Sync,
    {
        let per_point = self.config.n_trajectories;
        let outcomes = self.run_indexed(parameters.len() * per_point, |idx| {
            let mut state = initial.clone();
            adjust(&mut state, &parameters[idx / per_point]);
            Ok(state)
        })?;
        let mut outcomes = outcomes.into_iter();
        Ok(parameters
            .iter()
            .map(|parameter| SweepPoint {
                parameter: parameter.clone(),
                outcomes: outcomes.by_ref().take(per_point).collect(),
            })
            .collect())
    }

    fn run_indexed<F>(&self, total: usize, prepare: F) -> Result<Vec<TrajectoryOutcome<C::Label>>>
    where
        F: Fn(usize) -> Result<State> + Sync,
    {
        let runner = TrajectoryRunner::new(self.network, self.classifier, self.config.limits)?;
        let seed = self.config.seed;
        debug!(
            "running {} trajectories over {} reactions (seed {:?}, threads {:?})",
            total,
            self.network.len(),
            seed,
            self.config.n_threads
        );

        let simulate = || -> Result<Vec<TrajectoryOutcome<C::Label>>> {
            (0..total)
                .into_par_iter()
                .map(|idx| {
                    let initial = prepare(idx)?;
                    let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, idx as u64));
                    runner.run(&initial, &mut rng)
                })
                .collect()
        };

        let outcomes = match self.config.n_threads {
            Some(n) => ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| SimError::ThreadPool(e.to_string()))?
                .install(simulate)?,
            None => simulate()?,
        };
        debug!("finished {} trajectories", outcomes.len());
        Ok(outcomes)
    }
}

/// Mean and spread of one species' final counts across trajectories.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpeciesStats {
    pub mean: f64,
    /// Population variance (divides by n).
    pub variance: f64,
    /// Sample standard deviation (divides by n - 1); 0 for a single trajectory.
    pub sample_std_dev: f64,
}

impl SpeciesStats {
    fn from_values(values: &[f64]) -> Self {
        let n = values.len() as f64;
        if values.is_empty() {
            return Self {
                mean: 0.0,
                variance: 0.0,
                sample_std_dev: 0.0,
            };
        }
        let mean = values.iter().sum::<f64>() / n;
        let squares: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        let sample_std_dev = if values.len() > 1 {
            (squares / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        Self {
            mean,
            variance: squares / n,
            sample_std_dev,
        }
    }
}

/// Tabulation of an ensemble's outcomes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnsembleSummary {
    pub trajectories: usize,
    /// Count of trajectories per stop reason, keyed by its display text.
    pub stop_reasons: BTreeMap<String, usize>,
    pub species: BTreeMap<String, SpeciesStats>,
    pub mean_elapsed: f64,
    pub mean_steps: f64,
}

impl EnsembleSummary {
    pub fn from_outcomes<L: fmt::Display>(outcomes: &[TrajectoryOutcome<L>]) -> Self {
        let mut stop_reasons = BTreeMap::new();
        let mut finals: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for outcome in outcomes {
            *stop_reasons
                .entry(outcome.stop_reason.to_string())
                .or_insert(0) += 1;
            for (name, _) in outcome.final_state.iter() {
                finals.entry(name.to_owned()).or_default();
            }
        }
        for (name, values) in finals.iter_mut() {
            values.extend(
                outcomes
                    .iter()
                    .map(|outcome| outcome.final_state.get(name) as f64),
            );
        }
        let n = outcomes.len().max(1) as f64;
        Self {
            trajectories: outcomes.len(),
            stop_reasons,
            species: finals
                .into_iter()
                .map(|(name, values)| (name, SpeciesStats::from_values(&values)))
                .collect(),
            mean_elapsed: outcomes.iter().map(|o| o.elapsed).sum::<f64>() / n,
            mean_steps: outcomes.iter().map(|o| o.steps as f64).sum::<f64>() / n,
        }
    }

    pub fn fraction(&self, reason: &str) -> f64 {
        if self.trajectories == 0 {
            return 0.0;
        }
        self.stop_reasons.get(reason).copied().unwrap_or(0) as f64 / self.trajectories as f64
    }
}
