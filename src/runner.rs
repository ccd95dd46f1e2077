use std::fmt;

use log::{debug, trace};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SimError};
use crate::network::ReactionNetwork;
use crate::state::State;
use crate::stepper::{Event, StepOutcome, Stepper, UniformSource};

/// Budgets bounding a single trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Simulated-time ceiling; an event that would cross it is discarded.
    /// Unbounded is written as `null`.
    #[serde(
        serialize_with = "serialize_time_bound",
        deserialize_with = "deserialize_time_bound"
    )]
    pub max_time: f64,
    pub max_steps: u64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_time: f64::INFINITY,
            max_steps: u64::MAX,
        }
    }
}

impl RunLimits {
    pub fn new(max_time: f64, max_steps: u64) -> Self {
        Self {
            max_time,
            max_steps,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_time.is_nan() || self.max_time < 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "max_time must be non-negative, got {}",
                self.max_time
            )));
        }
        Ok(())
    }
}

fn serialize_time_bound<S: Serializer>(bound: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    bound.is_finite().then_some(*bound).serialize(serializer)
}

fn deserialize_time_bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

/// Decides whether a state is absorbing, and under which label.
pub trait Classifier {
    type Label;

    fn classify(&self, state: &State) -> Option<Self::Label>;
}

impl<F, L> Classifier for F
where
    F: Fn(&State) -> Option<L>,
{
    type Label = L;

    fn classify(&self, state: &State) -> Option<L> {
        self(state)
    }
}

/// Classifier that never declares absorption.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverAbsorb;

impl Classifier for NeverAbsorb {
    type Label = String;

    fn classify(&self, _state: &State) -> Option<String> {
        None
    }
}

/// Why a trajectory stopped. All variants are normal outcomes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason<L> {
    Absorbed(L),
    NoReaction,
    TimeBudgetExceeded,
    StepBudgetExceeded,
}

impl<L> StopReason<L> {
    pub fn label(&self) -> Option<&L> {
        match self {
            Self::Absorbed(label) => Some(label),
            _ => None,
        }
    }

    pub fn is_absorbed(&self) -> bool {
        matches!(self, Self::Absorbed(_))
    }
}

impl<L: fmt::Display> fmt::Display for StopReason<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absorbed(label) => write!(f, "{label}"),
            Self::NoReaction => f.write_str("no reaction can fire"),
            Self::TimeBudgetExceeded => f.write_str("time budget exceeded"),
            Self::StepBudgetExceeded => f.write_str("step budget exceeded"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryOutcome<L> {
    pub final_state: State,
    pub stop_reason: StopReason<L>,
    /// Simulated time of the last committed event.
    pub elapsed: f64,
    pub steps: u64,
}

/// Hooks into a running trajectory. Every call sees a fully applied state.
pub trait Observer {
    fn on_start(&mut self, _time: f64, _state: &State) {}

    /// Called after `event` has been committed; `time` includes its waiting time.
    fn on_event(&mut self, time: f64, event: &Event, state: &State);

    fn on_finish(&mut self, _time: f64, _state: &State) {}
}

impl Observer for () {
    fn on_event(&mut self, _time: f64, _event: &Event, _state: &State) {}
}

/// Records every committed `(dt, reaction)` pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn reactions(&self) -> impl Iterator<Item = usize> + '_ {
        self.events.iter().map(|event| event.reaction)
    }
}

impl Observer for EventLog {
    fn on_event(&mut self, _time: f64, event: &Event, _state: &State) {
        self.events.push(*event);
    }
}

/// Samples the counts of the network species at fixed time points.
///
/// The row for time point `t` holds the state in force at `t`. Points past the
/// end of the trajectory are filled with the final state.
#[derive(Clone, Debug)]
pub struct TimeSeries {
    species: Vec<String>,
    t_points: Vec<f64>,
    rows: Vec<Vec<i64>>,
    current: Vec<i64>,
}

impl TimeSeries {
    pub fn new(network: &ReactionNetwork, t_points: Vec<f64>) -> Result<Self> {
        if t_points.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(SimError::InvalidArgument(
                "t_points must be finite and non-negative".into(),
            ));
        }
        if t_points.windows(2).any(|w| w[0] > w[1]) {
            return Err(SimError::InvalidArgument(
                "t_points must be sorted in ascending order".into(),
            ));
        }
        Ok(Self {
            species: network.species().names().to_vec(),
            rows: Vec::with_capacity(t_points.len()),
            t_points,
            current: Vec::new(),
        })
    }

    pub fn t_points(&self) -> &[f64] {
        &self.t_points
    }

    pub fn rows(&self) -> &[Vec<i64>] {
        &self.rows
    }

    pub fn column(&self, species: &str) -> Option<Vec<i64>> {
        let idx = self.species.iter().position(|name| name == species)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    fn record_until(&mut self, time: f64, inclusive: bool) {
        while let Some(&tp) = self.t_points.get(self.rows.len()) {
            let due = if inclusive { tp <= time } else { tp < time };
            if !due {
                break;
            }
            self.rows.push(self.current.clone());
        }
    }

    fn snapshot(&mut self, state: &State) {
        self.current.clear();
        self.current
            .extend(self.species.iter().map(|name| state.get(name)));
    }
}

impl Observer for TimeSeries {
    fn on_start(&mut self, time: f64, state: &State) {
        self.rows.clear();
        self.snapshot(state);
        self.record_until(time, true);
    }

    fn on_event(&mut self, time: f64, _event: &Event, state: &State) {
        self.record_until(time, false);
        self.snapshot(state);
    }

    fn on_finish(&mut self, _time: f64, state: &State) {
        self.snapshot(state);
        while self.rows.len() < self.t_points.len() {
            self.rows.push(self.current.clone());
        }
    }
}

/// Drives the SSA stepper from an initial state until a terminal outcome.
#[derive(Debug)]
pub struct TrajectoryRunner<'a, C> {
    network: &'a ReactionNetwork,
    classifier: &'a C,
    limits: RunLimits,
}

impl<'a, C: Classifier> TrajectoryRunner<'a, C> {
    pub fn new(network: &'a ReactionNetwork, classifier: &'a C, limits: RunLimits) -> Result<Self> {
        limits.validate()?;
        Ok(Self {
            network,
            classifier,
            limits,
        })
    }

    pub fn network(&self) -> &ReactionNetwork {
        self.network
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }

    pub fn run<R: UniformSource>(
        &self,
        initial: &State,
        rng: &mut R,
    ) -> Result<TrajectoryOutcome<C::Label>> {
        self.run_observed(initial, rng, &mut ())
    }

    /// Runs one trajectory, reporting start, every committed event and the end
    /// to `observer`.
    pub fn run_observed<R: UniformSource, O: Observer>(
        &self,
        initial: &State,
        rng: &mut R,
        observer: &mut O,
    ) -> Result<TrajectoryOutcome<C::Label>> {
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
        let mut stepper = Stepper::new(self.network);
        let mut time = 0.0;
        let mut steps = 0u64;
        observer.on_start(time, &state);

        let stop_reason = 'run: {
            if let Some(label) = self.classifier.classify(&state) {
                break 'run StopReason::Absorbed(label);
            }
            while steps < self.limits.max_steps {
                let event = match stepper.propose(self.network, &state, rng) {
                    StepOutcome::Fired(event) => event,
                    StepOutcome::NoReaction => break 'run StopReason::NoReaction,
                };
                if time + event.dt > self.limits.max_time {
                    break 'run StopReason::TimeBudgetExceeded;
                }
                time += event.dt;
                state.apply(self.network, event.reaction);
                steps += 1;
                trace!(
                    "step {} t={} fired reaction {} (dt={})",
                    steps,
                    time,
                    event.reaction,
                    event.dt
                );
                observer.on_event(time, &event, &state);
                if let Some(label) = self.classifier.classify(&state) {
                    break 'run StopReason::Absorbed(label);
                }
            }
            StopReason::StepBudgetExceeded
        };

        observer.on_finish(time, &state);
        debug!(
            "trajectory stopped after {} steps at t={} ({})",
            steps,
            time,
            describe(&stop_reason)
        );
        Ok(TrajectoryOutcome {
            final_state: state,
            stop_reason,
            elapsed: time,
            steps,
        })
    }
}

fn describe<L>(reason: &StopReason<L>) -> &'static str {
    match reason {
        StopReason::Absorbed(_) => "absorbed",
        StopReason::NoReaction => "no reaction can fire",
        StopReason::TimeBudgetExceeded => "time budget exceeded",
        StopReason::StepBudgetExceeded => "step budget exceeded",
    }
}

/// Runs a single trajectory; shorthand for [`TrajectoryRunner::run`].
pub fn simulate<C: Classifier, R: UniformSource>(
    network: &ReactionNetwork,
    initial: &State,
    classifier: &C,
    limits: RunLimits,
    rng: &mut R,
) -> Result<TrajectoryOutcome<C::Label>> {
    TrajectoryRunner::new(network, classifier, limits)?.run(initial, rng)
}
