use itertools::Itertools;

use crate::{
    model::{check_distribution, transition_table, StateIndex},
    Map, Show,
};

/// A stochastic Mealy machine. States are not labelled, instead reading an input in a state
/// picks a pair of output and successor state according to a distribution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StochasticMealyMachine {
    names: Vec<String>,
    transitions: Vec<Map<String, Vec<(StateIndex, String, f64)>>>,
    initial: StateIndex,
}

impl StochasticMealyMachine {
    /// Creates an empty machine. The initial state defaults to the first state that is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state with the given identifier and returns its index.
    pub fn add_state<N: Into<String>>(&mut self, name: N) -> StateIndex {
        self.names.push(name.into());
        self.transitions.push(Map::default());
        self.names.len() - 1
    }

    /// Adds a transition that reads `input` in `source`, emits `output` and moves to `target`
    /// with the given probability.
    ///
    /// # Panics
    /// If `source` is not a state of the machine.
    pub fn add_transition<I: Into<String>, O: Into<String>>(
        &mut self,
        source: StateIndex,
        input: I,
        output: O,
        target: StateIndex,
        probability: f64,
    ) {
        self.transitions[source]
            .entry(input.into())
            .or_default()
            .push((target, output.into(), probability));
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

    /// All inputs that occur anywhere in the machine, sorted.
    pub fn inputs(&self) -> Vec<&str> {
        self.transitions
            .iter()
            .flat_map(|m| m.keys())
            .map(String::as_str)
            .sorted()
            .dedup()
            .collect()
    }

    /// The inputs that are enabled in the given state, sorted.
    pub fn enabled_inputs(&self, state: StateIndex) -> Vec<&str> {
        self.transitions
            .get(state)
            .into_iter()
            .flat_map(|m| m.keys())
            .map(String::as_str)
            .sorted()
            .collect()
    }

    /// All outputs that occur anywhere in the machine, sorted.
    pub fn outputs(&self) -> Vec<&str> {
        self.transitions
            .iter()
            .flat_map(|m| m.values())
            .flatten()
            .map(|(_, o, _)| o.as_str())
            .sorted()
            .dedup()
            .collect()
    }

    /// The distribution over (successor, output) pairs when reading `input` in `state`. Empty
    /// if the input is not enabled there.
    pub fn successors(&self, state: StateIndex, input: &str) -> &[(StateIndex, String, f64)] {
        self.transitions
            .get(state)
            .and_then(|m| m.get(input))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The probability of observing `output` when reading `input` in `state`.
    pub fn output_probability(&self, state: StateIndex, input: &str, output: &str) -> f64 {
        self.successors(state, input)
            .iter()
            .filter(|(_, o, _)| o == output)
            .map(|(_, _, p)| p)
            .sum()
    }

    /// Checks that the distribution of every state and enabled input sums up to one, logging a
    /// warning for each one that does not.
    pub fn is_stochastic(&self) -> bool {
        self.state_indices()
            .flat_map(|q| self.transitions[q].iter().map(move |(i, d)| (q, i, d)))
            .map(|(q, input, dist)| {
                check_distribution(
                    || format!("state {} on input {input}", self.names[q]),
                    dist.iter().map(|(_, _, p)| *p),
                )
            })
            .fold(true, |acc, ok| acc && ok)
    }
}

impl Show for StochasticMealyMachine {
    fn show(&self) -> String {
        let inputs = self.inputs();
        let header = std::iter::once("State".to_string())
            .chain(inputs.iter().map(|i| i.to_string()))
            .collect();
        let rows = self.state_indices().map(|q| {
            let mut row = vec![self.names[q].clone()];
            row.extend(inputs.iter().map(|input| {
                let dist = self.successors(q, input);
                if dist.is_empty() {
                    "-".to_string()
                } else {
                    dist.iter()
                        .map(|(t, o, p)| format!("{o}/{}: {p}", self.names[*t]))
                        .join(", ")
                }
            }));
            row
        });
        transition_table(header, rows, self.initial)
    }
}

#[cfg(test)]
mod tests {
    use super::StochasticMealyMachine;
    use crate::Show;

    fn faulty_switch() -> StochasticMealyMachine {
        let mut smm = StochasticMealyMachine::new();
        let off = smm.add_state("q0");
        let on = smm.add_state("q1");
        smm.add_transition(off, "press", "light", on, 0.9);
        smm.add_transition(off, "press", "dark", off, 0.1);
        smm.add_transition(on, "press", "dark", off, 1.0);
        smm.add_transition(on, "wait", "light", on, 1.0);
        smm
    }

    #[test]
    fn outputs_and_probabilities() {
        let smm = faulty_switch();
        assert_eq!(smm.inputs(), vec!["press", "wait"]);
        assert_eq!(smm.outputs(), vec!["dark", "light"]);
        assert_eq!(smm.enabled_inputs(0), vec!["press"]);
        assert_eq!(smm.output_probability(0, "press", "light"), 0.9);
        assert_eq!(smm.output_probability(0, "wait", "light"), 0.0);
        assert_eq!(smm.successors(1, "press").len(), 1);
        assert!(smm.is_stochastic());
    }

    #[test]
    fn table_shows_outputs() {
        let table = faulty_switch().show();
        for needle in ["press", "light/q1: 0.9", "dark/q0: 0.1"] {
            assert!(table.contains(needle), "{needle} missing in\n{table}");
        }
    }
}
