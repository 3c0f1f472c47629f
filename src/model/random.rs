use fastrand::Rng;

use crate::{
    model::{MarkovChain, Mdp, StochasticMealyMachine},
    sample::{Sample, SampleError},
};

/// Picks one of the given items, each with a probability proportional to its weight. Returns
/// `None` if there is nothing to pick from.
fn pick<'a, T, F: Fn(&T) -> f64>(rng: &mut Rng, items: &'a [T], weight: F) -> Option<&'a T> {
    let total: f64 = items.iter().map(&weight).sum();
    if items.is_empty() || total <= 0.0 {
        return None;
    }
    let mut threshold = rng.f64() * total;
    for item in items {
        let w = weight(item);
        if threshold < w {
            return Some(item);
        }
        threshold -= w;
    }
    items.last()
}

impl MarkovChain {
    /// Walks through the chain for at most `steps` transitions, starting in the initial state,
    /// and returns the outputs of all visited states. The walk ends early in a state without
    /// outgoing transitions.
    pub fn random_trace(&self, steps: usize) -> Vec<String> {
        self.random_trace_with(&mut Rng::new(), steps)
    }

    /// Like [`MarkovChain::random_trace`], but draws from the given generator.
    pub fn random_trace_with(&self, rng: &mut Rng, steps: usize) -> Vec<String> {
        let mut state = self.initial();
        let mut trace: Vec<String> = self.output(state).map(str::to_string).into_iter().collect();
        for _ in 0..steps {
            let Some((target, _)) = pick(rng, self.transitions_from(state), |(_, p)| *p) else {
                break;
            };
            state = *target;
            trace.extend(self.output(state).map(str::to_string));
        }
        trace
    }

    /// Generates `count` random traces of at most `steps` transitions each and collects them
    /// into a [`Sample`].
    pub fn random_sample(&self, count: usize, steps: usize) -> Result<Sample, SampleError> {
        let mut rng = Rng::new();
        Sample::markov_chain((0..count).map(|_| self.random_trace_with(&mut rng, steps)))
    }
}

impl Mdp {
    /// Walks through the MDP for at most `steps` transitions, choosing inputs uniformly among
    /// the enabled ones. Returns the initial output and the observed input/output pairs. The walk
    /// ends early in a state without enabled inputs.
    pub fn random_trace(&self, steps: usize) -> (String, Vec<(String, String)>) {
        self.random_trace_with(&mut Rng::new(), steps)
    }

    /// Like [`Mdp::random_trace`], but draws from the given generator.
    pub fn random_trace_with(&self, rng: &mut Rng, steps: usize) -> (String, Vec<(String, String)>) {
        let mut state = self.initial();
        let initial_output = self.output(state).unwrap_or_default().to_string();
        let mut steps_taken = Vec::new();
        for _ in 0..steps {
            let inputs = self.enabled_inputs(state);
            if inputs.is_empty() {
                break;
            }
            let input = inputs[rng.usize(..inputs.len())];
            let Some((target, _)) = pick(rng, self.successors(state, input), |(_, p)| *p) else {
                break;
            };
            state = *target;
            steps_taken.push((
                input.to_string(),
                self.output(state).unwrap_or_default().to_string(),
            ));
        }
        (initial_output, steps_taken)
    }

    /// Generates `count` random traces of at most `steps` transitions each and collects them
    /// into a [`Sample`].
    pub fn random_sample(&self, count: usize, steps: usize) -> Result<Sample, SampleError> {
        let mut rng = Rng::new();
        Sample::mdp((0..count).map(|_| self.random_trace_with(&mut rng, steps)))
    }
}

impl StochasticMealyMachine {
    /// Walks through the machine for at most `steps` transitions, choosing inputs uniformly
    /// among the enabled ones, and returns the observed input/output pairs. The walk ends early
    /// in a state without enabled inputs.
    pub fn random_trace(&self, steps: usize) -> Vec<(String, String)> {
        self.random_trace_with(&mut Rng::new(), steps)
    }

    /// Like [`StochasticMealyMachine::random_trace`], but draws from the given generator.
    pub fn random_trace_with(&self, rng: &mut Rng, steps: usize) -> Vec<(String, String)> {
        let mut state = self.initial();
        let mut trace = Vec::new();
        for _ in 0..steps {
            let inputs = self.enabled_inputs(state);
            if inputs.is_empty() {
                break;
            }
            let input = inputs[rng.usize(..inputs.len())];
            let Some((target, output, _)) =
                pick(rng, self.successors(state, input), |(_, _, p)| *p)
            else {
                break;
            };
            state = *target;
            trace.push((input.to_string(), output.clone()));
        }
        trace
    }

    /// Generates `count` random traces of at most `steps` transitions each and collects them
    /// into a [`Sample`]. Walks that end before their first step are dropped.
    pub fn random_sample(&self, count: usize, steps: usize) -> Result<Sample, SampleError> {
        let mut rng = Rng::new();
        Sample::smm(
            (0..count)
                .map(|_| self.random_trace_with(&mut rng, steps))
                .filter(|trace| !trace.is_empty()),
        )
    }
}

#[cfg(test)]
mod tests {
    use fastrand::Rng;

    use crate::prelude::*;

    #[test]
    fn markov_chain_walk() {
        let mut mc = MarkovChain::new();
        let q0 = mc.add_state("q0", "a");
        let q1 = mc.add_state("q1", "b");
        let q2 = mc.add_state("q2", "c");
        mc.add_transition(q0, q1, 1.0);
        mc.add_transition(q1, q2, 1.0);

        let trace = mc.random_trace_with(&mut Rng::with_seed(7), 10);
        assert_eq!(trace, vec!["a", "b", "c"]);
        assert_eq!(mc.random_trace(1), vec!["a", "b"]);
        assert_eq!(mc.random_trace(0), vec!["a"]);

        let sample = mc.random_sample(4, 5).unwrap();
        assert_eq!(sample.len(), 4);
        assert_eq!(sample.automaton_type(), AutomatonType::Mc);
    }

    #[test]
    fn mdp_walk_follows_enabled_inputs() {
        let mut mdp = Mdp::new();
        let q0 = mdp.add_state("q0", "start");
        let q1 = mdp.add_state("q1", "left");
        let q2 = mdp.add_state("q2", "right");
        mdp.add_transition(q0, "go", q1, 0.5);
        mdp.add_transition(q0, "go", q2, 0.5);
        mdp.add_transition(q1, "back", q0, 1.0);

        let mut rng = Rng::with_seed(42);
        for _ in 0..20 {
            let (initial, steps) = mdp.random_trace_with(&mut rng, 6);
            assert_eq!(initial, "start");
            assert!(!steps.is_empty());
            for (idx, (input, output)) in steps.iter().enumerate() {
                if idx % 2 == 0 {
                    assert_eq!(input, "go");
                    assert!(output == "left" || output == "right");
                } else {
                    assert_eq!(input, "back");
                    assert_eq!(output, "start");
                }
            }
        }
        assert_eq!(mdp.random_sample(3, 4).unwrap().len(), 3);
    }

    #[test]
    fn smm_walk_without_transitions() {
        let mut smm = StochasticMealyMachine::new();
        smm.add_state("q0");
        assert!(smm.random_trace(5).is_empty());
        assert!(smm.random_sample(3, 5).unwrap().is_empty());

        smm.add_transition(0, "ping", "pong", 0, 1.0);
        assert_eq!(
            smm.random_trace(2),
            vec![
                ("ping".to_string(), "pong".to_string()),
                ("ping".to_string(), "pong".to_string())
            ]
        );
    }
}
