use itertools::Itertools;

use crate::{
    model::{check_distribution, transition_table, StateIndex},
    Map, Show,
};

/// A Markov decision process. Every state is labelled with an output, and for every input that
/// is enabled in a state there is a distribution over successor states.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mdp {
    names: Vec<String>,
    outputs: Vec<String>,
    transitions: Vec<Map<String, Vec<(StateIndex, f64)>>>,
    initial: StateIndex,
}

impl Mdp {
    /// Creates an empty MDP. The initial state defaults to the first state that is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state with the given identifier and output and returns its index.
    pub fn add_state<N: Into<String>, O: Into<String>>(&mut self, name: N, output: O) -> StateIndex {
        self.names.push(name.into());
        self.outputs.push(output.into());
        self.transitions.push(Map::default());
        self.names.len() - 1
    }

    /// Adds a transition on `input` from `source` to `target` with the given probability.
    ///
    /// # Panics
    /// If `source` is not a state of the MDP.
    pub fn add_transition<I: Into<String>>(
        &mut self,
        source: StateIndex,
        input: I,
        target: StateIndex,
        probability: f64,
    ) {
        self.transitions[source]
            .entry(input.into())
            .or_default()
            .push((target, probability));
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

    /// The output of the initial state, every trace of the MDP starts with it.
    pub fn initial_output(&self) -> Option<&str> {
        self.output(self.initial)
    }

    /// All inputs that occur anywhere in the MDP, sorted.
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

    /// The distribution over successors when reading `input` in `state`. Empty if the input is
    /// not enabled there.
    pub fn successors(&self, state: StateIndex, input: &str) -> &[(StateIndex, f64)] {
        self.transitions
            .get(state)
            .and_then(|m| m.get(input))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The probability of reaching `target` from `source` on `input`.
    pub fn probability(&self, source: StateIndex, input: &str, target: StateIndex) -> f64 {
        self.successors(source, input)
            .iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, p)| p)
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
                    dist.iter().map(|(_, p)| *p),
                )
            })
            .fold(true, |acc, ok| acc && ok)
    }
}

impl Show for Mdp {
    fn show(&self) -> String {
        let inputs = self.inputs();
        let header = ["State".to_string(), "Output".to_string()]
            .into_iter()
            .chain(inputs.iter().map(|i| i.to_string()))
            .collect();
        let rows = self.state_indices().map(|q| {
            let mut row = vec![self.names[q].clone(), self.outputs[q].clone()];
            row.extend(inputs.iter().map(|input| {
                let dist = self.successors(q, input);
                if dist.is_empty() {
                    "-".to_string()
                } else {
                    dist.iter()
                        .map(|(t, p)| format!("{}: {}", self.names[*t], p))
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
    use super::Mdp;
    use crate::Show;

    fn slippery() -> Mdp {
        let mut mdp = Mdp::new();
        let q0 = mdp.add_state("q0", "start");
        let q1 = mdp.add_state("q1", "goal");
        let q2 = mdp.add_state("q2", "mud");
        mdp.add_transition(q0, "walk", q1, 0.8);
        mdp.add_transition(q0, "walk", q2, 0.2);
        mdp.add_transition(q0, "wait", q0, 1.0);
        mdp.add_transition(q2, "walk", q1, 1.0);
        mdp
    }

    #[test]
    fn inputs_and_successors() {
        let mdp = slippery();
        assert_eq!(mdp.inputs(), vec!["wait", "walk"]);
        assert_eq!(mdp.enabled_inputs(2), vec!["walk"]);
        assert!(mdp.enabled_inputs(1).is_empty());
        assert_eq!(mdp.successors(0, "walk"), &[(1, 0.8), (2, 0.2)]);
        assert!(mdp.successors(1, "walk").is_empty());
        assert_eq!(mdp.probability(0, "walk", 2), 0.2);
        assert_eq!(mdp.initial_output(), Some("start"));
        assert!(mdp.is_stochastic());
    }

    #[test]
    fn table_has_input_columns() {
        let table = slippery().show();
        for needle in ["walk", "wait", "q1: 0.8", "mud"] {
            assert!(table.contains(needle), "{needle} missing in\n{table}");
        }
    }
}
