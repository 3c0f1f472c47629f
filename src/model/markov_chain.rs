use itertools::Itertools;

use crate::{
    model::{check_distribution, transition_table, StateIndex},
    Show,
};

/// A Markov chain in which every state carries an output label. Leaving a state picks one of its
/// outgoing transitions according to their probabilities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkovChain {
    names: Vec<String>,
    outputs: Vec<String>,
    transitions: Vec<Vec<(StateIndex, f64)>>,
    initial: StateIndex,
}

impl MarkovChain {
    /// Creates an empty Markov chain. The initial state defaults to the first state that is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state with the given identifier and output and returns its index.
    pub fn add_state<N: Into<String>, O: Into<String>>(&mut self, name: N, output: O) -> StateIndex {
        self.names.push(name.into());
        self.outputs.push(output.into());
        self.transitions.push(Vec::new());
        self.names.len() - 1
    }

    /// Adds a transition from `source` to `target` that is taken with probability `probability`.
    ///
    /// # Panics
    /// If `source` is not a state of the chain.
    pub fn add_transition(&mut self, source: StateIndex, target: StateIndex, probability: f64) {
        self.transitions[source].push((target, probability));
    }

    /// Designates the initial state.
    pub fn set_initial(&mut self, initial: StateIndex) {
        self.initial = initial;
    }

    /// The initial state.
    pub fn initial(&self) -> StateIndex {
        self.initial
    }

    /// The number of states.
    pub fn size(&self) -> usize {
        self.names.len()
    }

    /// Iterates over all state indices.
    pub fn state_indices(&self) -> std::ops::Range<StateIndex> {
        0..self.size()
    }

    /// The identifier of a state, as it appeared in the DOT file.
    pub fn name(&self, state: StateIndex) -> Option<&str> {
        self.names.get(state).map(String::as_str)
    }

    /// Looks up a state by its identifier.
    pub fn state_by_name(&self, name: &str) -> Option<StateIndex> {
        self.names.iter().position(|n| n == name)
    }

    /// The output of a state.
    pub fn output(&self, state: StateIndex) -> Option<&str> {
        self.outputs.get(state).map(String::as_str)
    }

    /// The output of the initial state, every trace of the chain starts with it.
    pub fn initial_output(&self) -> Option<&str> {
        self.output(self.initial)
    }

    /// All outgoing transitions of a state as pairs of target and probability. Empty if the
    /// state does not exist.
    pub fn transitions_from(&self, state: StateIndex) -> &[(StateIndex, f64)] {
        self.transitions
            .get(state)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The probability of moving from `source` to `target` in one step.
    pub fn probability(&self, source: StateIndex, target: StateIndex) -> f64 {
        self.transitions_from(source)
            .iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, p)| p)
            .sum()
    }

    /// Checks that the outgoing probabilities of every state sum up to one, logging a warning
    /// for each state where they do not.
    pub fn is_stochastic(&self) -> bool {
        self.state_indices()
            .map(|q| {
                check_distribution(
                    || format!("state {}", self.names[q]),
                    self.transitions[q].iter().map(|(_, p)| *p),
                )
            })
            .fold(true, |acc, ok| acc && ok)
    }
}

impl Show for MarkovChain {
    fn show(&self) -> String {
        let header = vec![
            "State".to_string(),
            "Output".to_string(),
            "Successors".to_string(),
        ];
        let rows = self.state_indices().map(|q| {
            vec![
                self.names[q].clone(),
                self.outputs[q].clone(),
                self.transitions[q]
                    .iter()
                    .map(|(t, p)| format!("{}: {}", self.names[*t], p))
                    .join(", "),
            ]
        });
        transition_table(header, rows, self.initial)
    }
}

#[cfg(test)]
mod tests {
    use super::MarkovChain;
    use crate::Show;

    fn coin() -> MarkovChain {
        let mut mc = MarkovChain::new();
        let q0 = mc.add_state("q0", "start");
        let q1 = mc.add_state("q1", "heads");
        let q2 = mc.add_state("q2", "tails");
        mc.add_transition(q0, q1, 0.5);
        mc.add_transition(q0, q2, 0.5);
        mc.add_transition(q1, q1, 1.0);
        mc.add_transition(q2, q0, 0.25);
        mc.add_transition(q2, q2, 0.75);
        mc
    }

    #[test]
    fn lookup() {
        let mc = coin();
        assert_eq!(mc.size(), 3);
        assert_eq!(mc.initial(), 0);
        assert_eq!(mc.initial_output(), Some("start"));
        assert_eq!(mc.state_by_name("q2"), Some(2));
        assert_eq!(mc.output(1), Some("heads"));
        assert_eq!(mc.probability(2, 2), 0.75);
        assert_eq!(mc.probability(1, 0), 0.0);
        assert!(mc.transitions_from(7).is_empty());
        assert!(mc.is_stochastic());
    }

    #[test]
    fn broken_distribution() {
        let mut mc = coin();
        mc.add_transition(1, 2, 0.5);
        assert!(!mc.is_stochastic());
    }

    #[test]
    fn table_mentions_all_states() {
        let table = coin().show();
        for needle in ["q0", "q1", "q2", "heads", "tails", "q2: 0.75"] {
            assert!(table.contains(needle), "{needle} missing in\n{table}");
        }
    }
}
