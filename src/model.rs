use tracing::warn;

use crate::{AutomatonType, Show};

mod markov_chain;
pub use markov_chain::MarkovChain;

mod mdp;
pub use mdp::Mdp;

mod smm;
pub use smm::StochasticMealyMachine;

/// Parser for the DOT dialect written by the learner.
pub mod dot;

/// Generation of random traces from learned models.
#[cfg(feature = "random")]
pub mod random;

/// States of all models are indexed consecutively, starting from zero.
pub type StateIndex = usize;

/// Maximal deviation of the probabilities of a distribution from one, before the distribution
/// is considered broken.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// A model as produced by the learner, tagged with its [`AutomatonType`].
#[derive(Debug, Clone, PartialEq)]
pub enum LearnedModel {
    /// A learned Markov chain.
    Mc(MarkovChain),
    /// A learned Markov decision process.
    Mdp(Mdp),
    /// A learned stochastic Mealy machine.
    Smm(StochasticMealyMachine),
}

impl LearnedModel {
    /// The type of the contained model.
    pub fn automaton_type(&self) -> AutomatonType {
        match self {
            LearnedModel::Mc(_) => AutomatonType::Mc,
            LearnedModel::Mdp(_) => AutomatonType::Mdp,
            LearnedModel::Smm(_) => AutomatonType::Smm,
        }
    }

    /// Number of states of the contained model.
    pub fn size(&self) -> usize {
        match self {
            LearnedModel::Mc(mc) => mc.size(),
            LearnedModel::Mdp(mdp) => mdp.size(),
            LearnedModel::Smm(smm) => smm.size(),
        }
    }

    /// The initial state of the contained model.
    pub fn initial(&self) -> StateIndex {
        match self {
            LearnedModel::Mc(mc) => mc.initial(),
            LearnedModel::Mdp(mdp) => mdp.initial(),
            LearnedModel::Smm(smm) => smm.initial(),
        }
    }

    /// Returns the Markov chain, if that is what the model is.
    pub fn as_mc(&self) -> Option<&MarkovChain> {
        match self {
            LearnedModel::Mc(mc) => Some(mc),
            _ => None,
        }
    }

    /// Returns the Markov decision process, if that is what the model is.
    pub fn as_mdp(&self) -> Option<&Mdp> {
        match self {
            LearnedModel::Mdp(mdp) => Some(mdp),
            _ => None,
        }
    }

    /// Returns the stochastic Mealy machine, if that is what the model is.
    pub fn as_smm(&self) -> Option<&StochasticMealyMachine> {
        match self {
            LearnedModel::Smm(smm) => Some(smm),
            _ => None,
        }
    }
}

impl From<MarkovChain> for LearnedModel {
    fn from(value: MarkovChain) -> Self {
        LearnedModel::Mc(value)
    }
}

impl From<Mdp> for LearnedModel {
    fn from(value: Mdp) -> Self {
        LearnedModel::Mdp(value)
    }
}

impl From<StochasticMealyMachine> for LearnedModel {
    fn from(value: StochasticMealyMachine) -> Self {
        LearnedModel::Smm(value)
    }
}

impl Show for LearnedModel {
    fn show(&self) -> String {
        match self {
            LearnedModel::Mc(mc) => mc.show(),
            LearnedModel::Mdp(mdp) => mdp.show(),
            LearnedModel::Smm(smm) => smm.show(),
        }
    }
}

/// Checks that the given probabilities form a distribution. Empty distributions are fine, they
/// belong to states the learner never saw leaving. Emits a warning for everything else.
pub(crate) fn check_distribution<I>(context: impl FnOnce() -> String, probabilities: I) -> bool
where
    I: IntoIterator<Item = f64>,
{
    let mut count = 0usize;
    let mut sum = 0.0;
    for p in probabilities {
        count += 1;
        sum += p;
    }
    if count == 0 || (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE {
        true
    } else {
        warn!("probabilities of {} sum to {sum}", context());
        false
    }
}

/// Builds the transition table that all models use for their [`Show`] implementation. The
/// first row is the header, the initial state is highlighted.
pub(crate) fn transition_table<R>(header: Vec<String>, rows: R, initial: usize) -> String
where
    R: IntoIterator<Item = Vec<String>>,
{
    use owo_colors::OwoColorize;

    let mut builder = tabled::builder::Builder::default();
    builder.push_record(header);
    for (idx, mut row) in rows.into_iter().enumerate() {
        if idx == initial {
            if let Some(state) = row.first_mut() {
                *state = format!("-> {}", state).bold().to_string();
            }
        }
        builder.push_record(row);
    }

    builder
        .build()
        .with(tabled::settings::Style::rounded())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributions() {
        assert!(check_distribution(String::new, []));
        assert!(check_distribution(String::new, [0.25, 0.75]));
        assert!(check_distribution(String::new, [1.0 / 3.0; 3]));
        assert!(!check_distribution(String::new, [0.5, 0.4]));
    }

    #[test]
    fn model_tags() {
        let mut mc = MarkovChain::new();
        mc.add_state("q0", "start");
        let model = LearnedModel::from(mc);
        assert_eq!(model.automaton_type(), AutomatonType::Mc);
        assert_eq!(model.size(), 1);
        assert!(model.as_mc().is_some());
        assert!(model.as_mdp().is_none());
        assert!(model.as_smm().is_none());
    }
}
