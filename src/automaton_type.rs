use std::{fmt::Display, str::FromStr};

use crate::config::ConfigError;

/// The kind of automaton that the learner should infer. The learner only knows these three,
/// every other value is rejected before a process is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AutomatonType {
    /// Markov Chain, a probabilistic automaton without inputs.
    Mc,
    /// Markov Decision Process, states are labelled with outputs and inputs select a distribution.
    Mdp,
    /// Stochastic Mealy Machine, outputs are emitted on transitions.
    Smm,
}

impl AutomatonType {
    /// All automaton types, in the order `mc`, `mdp`, `smm`.
    pub const ALL: [AutomatonType; 3] = [AutomatonType::Mc, AutomatonType::Mdp, AutomatonType::Smm];

    /// The name the learner expects after its `-type` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomatonType::Mc => "mc",
            AutomatonType::Mdp => "mdp",
            AutomatonType::Smm => "smm",
        }
    }

    /// Returns true if models of this type carry inputs.
    pub fn has_inputs(&self) -> bool {
        !matches!(self, AutomatonType::Mc)
    }

    /// Returns true if every trace of this type starts with the initial output of the model.
    pub fn starts_with_initial_output(&self) -> bool {
        !matches!(self, AutomatonType::Smm)
    }
}

impl Display for AutomatonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AutomatonType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mc" => Ok(AutomatonType::Mc),
            "mdp" => Ok(AutomatonType::Mdp),
            "smm" => Ok(AutomatonType::Smm),
            other => Err(ConfigError::UnknownAutomatonType(other.to_string())),
        }
    }
}

impl TryFrom<&str> for AutomatonType {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::AutomatonType;
    use crate::config::ConfigError;

    #[test]
    fn parse_known_types() {
        for ty in AutomatonType::ALL {
            assert_eq!(ty.as_str().parse::<AutomatonType>(), Ok(ty));
            assert_eq!(ty.to_string(), ty.as_str());
        }
    }

    #[test]
    fn reject_unknown_types() {
        for name in ["", "MDP", "dfa", "mealy", " mc"] {
            assert_eq!(
                name.parse::<AutomatonType>(),
                Err(ConfigError::UnknownAutomatonType(name.to_string()))
            );
        }
    }
}
