//! The learner writes its models as small graphviz files. A Markov chain for example looks like
//! ```text
//! digraph g {
//! q0 [shape="circle",label="start"];
//! q1 [shape="circle",label="heads"];
//! q0->q1 [label="1.0"];
//! __start0 [label="" shape="none"];
//! __start0 -> q0  [label=""];
//! }
//! ```
//! States of Markov chains and MDPs are labelled with their output, transitions carry the
//! probability (`p`), input and probability (`input:p`) or input, output and probability
//! (`input/output:p`) for Markov chains, MDPs and stochastic Mealy machines respectively.
//! The edge leaving the pseudo state `__start0` marks the initial state.

use thiserror::Error;
use tracing::{trace, warn};

use crate::{
    model::{LearnedModel, MarkovChain, Mdp, StateIndex, StochasticMealyMachine},
    AutomatonType, Map,
};

const START_PREFIX: &str = "__start";
const FALLBACK_INITIAL: &str = "q0";

/// Abstracts the errors that can occur when parsing a model from its DOT representation.
/// Line numbers start at one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum DotParseError {
    #[error("line {line}: malformed statement `{statement}`")]
    MalformedStatement { line: usize, statement: String },
    #[error("line {line}: state `{state}` has no label")]
    MissingStateLabel { line: usize, state: String },
    #[error("line {line}: state `{state}` is declared twice")]
    DuplicateState { line: usize, state: String },
    #[error("line {line}: transition from `{from}` to `{to}` has no label")]
    MissingTransitionLabel { line: usize, from: String, to: String },
    #[error("line {line}: transition label `{label}` does not fit a {automaton_type} model")]
    MalformedTransitionLabel {
        line: usize,
        label: String,
        automaton_type: AutomatonType,
    },
    #[error("line {line}: `{value}` is not a probability")]
    InvalidProbability { line: usize, value: String },
    #[error("line {line}: reference to undeclared state `{state}`")]
    UnknownState { line: usize, state: String },
    #[error("the graph does not contain any states")]
    NoStates,
    #[error("could not determine the initial state, there is neither a start edge nor a state `q0`")]
    MissingInitialState,
}

/// Parses a model of the given type.
pub fn parse_dot(dot: &str, automaton_type: AutomatonType) -> Result<LearnedModel, DotParseError> {
    Ok(match automaton_type {
        AutomatonType::Mc => parse_markov_chain(dot)?.into(),
        AutomatonType::Mdp => parse_mdp(dot)?.into(),
        AutomatonType::Smm => parse_smm(dot)?.into(),
    })
}

/// Parses a Markov chain, transitions are labelled with their probability only.
pub fn parse_markov_chain(dot: &str) -> Result<MarkovChain, DotParseError> {
    let graph = Graph::parse(dot)?;
    let mut mc = MarkovChain::new();
    for node in &graph.nodes {
        mc.add_state(node.name.clone(), node.required_label()?);
    }
    for edge in &graph.edges {
        let (source, target) = graph.endpoints(edge)?;
        let probability = parse_probability(edge.line, edge.required_label()?)?;
        mc.add_transition(source, target, probability);
    }
    mc.set_initial(graph.initial()?);
    mc.is_stochastic();
    Ok(mc)
}

/// Parses a Markov decision process, transitions are labelled with `input:probability`.
pub fn parse_mdp(dot: &str) -> Result<Mdp, DotParseError> {
    let graph = Graph::parse(dot)?;
    let mut mdp = Mdp::new();
    for node in &graph.nodes {
        mdp.add_state(node.name.clone(), node.required_label()?);
    }
    for edge in &graph.edges {
        let (source, target) = graph.endpoints(edge)?;
        let label = edge.required_label()?;
        let (input, probability) = split_probability(edge.line, label, AutomatonType::Mdp)?;
        // outputs live in the states, an input/output pair belongs to a Mealy machine
        if input.contains('/') {
            return Err(DotParseError::MalformedTransitionLabel {
                line: edge.line,
                label: label.to_string(),
                automaton_type: AutomatonType::Mdp,
            });
        }
        mdp.add_transition(source, input, target, probability);
    }
    mdp.set_initial(graph.initial()?);
    mdp.is_stochastic();
    Ok(mdp)
}

/// Parses a stochastic Mealy machine, transitions are labelled with
/// `input/output:probability`. State labels are ignored.
pub fn parse_smm(dot: &str) -> Result<StochasticMealyMachine, DotParseError> {
    let graph = Graph::parse(dot)?;
    let mut smm = StochasticMealyMachine::new();
    for node in &graph.nodes {
        smm.add_state(node.name.clone());
    }
    for edge in &graph.edges {
        let (source, target) = graph.endpoints(edge)?;
        let label = edge.required_label()?;
        let (io, probability) = split_probability(edge.line, label, AutomatonType::Smm)?;
        let Some((input, output)) = io.split_once('/').filter(|(i, o)| !i.is_empty() && !o.is_empty())
        else {
            return Err(DotParseError::MalformedTransitionLabel {
                line: edge.line,
                label: label.to_string(),
                automaton_type: AutomatonType::Smm,
            });
        };
        smm.add_transition(source, input, output, target, probability);
    }
    smm.set_initial(graph.initial()?);
    smm.is_stochastic();
    Ok(smm)
}

/// Splits `prefix:probability` at the last colon.
fn split_probability(
    line: usize,
    label: &str,
    automaton_type: AutomatonType,
) -> Result<(&str, f64), DotParseError> {
    match label.rsplit_once(':') {
        Some((prefix, p)) if !prefix.is_empty() => Ok((prefix, parse_probability(line, p)?)),
        _ => Err(DotParseError::MalformedTransitionLabel {
            line,
            label: label.to_string(),
            automaton_type,
        }),
    }
}

fn parse_probability(line: usize, value: &str) -> Result<f64, DotParseError> {
    match value.trim().parse::<f64>() {
        Ok(p) if (0.0..=1.0).contains(&p) => Ok(p),
        _ => Err(DotParseError::InvalidProbability {
            line,
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    line: usize,
    name: String,
    label: Option<String>,
}

impl Node {
    fn required_label(&self) -> Result<&str, DotParseError> {
        self.label
            .as_deref()
            .ok_or_else(|| DotParseError::MissingStateLabel {
                line: self.line,
                state: self.name.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    line: usize,
    source: String,
    target: String,
    label: Option<String>,
}

impl Edge {
    fn required_label(&self) -> Result<&str, DotParseError> {
        self.label
            .as_deref()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| DotParseError::MissingTransitionLabel {
                line: self.line,
                from: self.source.clone(),
                to: self.target.clone(),
            })
    }
}

/// The statements of a DOT file that matter for models, with pseudo states filtered out.
#[derive(Debug, Clone, Default)]
struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    indices: Map<String, StateIndex>,
    start: Option<Edge>,
}

impl Graph {
    fn parse(dot: &str) -> Result<Self, DotParseError> {
        let mut graph = Graph::default();

        for (idx, raw) in dot.lines().enumerate() {
            let line = idx + 1;
            for statement in split_statements(raw) {
                graph.add_statement(line, statement)?;
            }
        }

        if graph.nodes.is_empty() {
            return Err(DotParseError::NoStates);
        }
        trace!(
            "parsed graph with {} states and {} transitions",
            graph.nodes.len(),
            graph.edges.len()
        );
        Ok(graph)
    }

    fn add_statement(&mut self, line: usize, statement: &str) -> Result<(), DotParseError> {
        if statement.is_empty()
            || statement == "}"
            || statement.starts_with("//")
            || (statement.starts_with("digraph") && statement.ends_with('{'))
        {
            return Ok(());
        }

        let malformed = || DotParseError::MalformedStatement {
            line,
            statement: statement.to_string(),
        };

        let (head, attributes) = match find_unquoted(statement, '[') {
            Some(open) => {
                let close = statement.rfind(']').filter(|&c| c > open).ok_or_else(malformed)?;
                let attributes = parse_attributes(&statement[open + 1..close]).ok_or_else(malformed)?;
                (statement[..open].trim(), attributes)
            }
            None => (statement.trim(), Vec::new()),
        };
        let label = attributes
            .into_iter()
            .find(|(key, _)| key == "label")
            .map(|(_, value)| value);

        if let Some((source, target)) = head.split_once("->") {
            let source = unquote(source.trim());
            let target = unquote(target.trim());
            if source.is_empty() || target.is_empty() {
                return Err(malformed());
            }
            let edge = Edge {
                line,
                source,
                target,
                label,
            };
            if edge.source.starts_with(START_PREFIX) {
                self.start = Some(edge);
            } else {
                self.edges.push(edge);
            }
            return Ok(());
        }

        // default attribute statements and graph attributes such as `rankdir=LR`
        if matches!(head, "node" | "edge" | "graph") || head.contains('=') {
            return Ok(());
        }

        let name = unquote(head);
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(malformed());
        }
        if name.starts_with(START_PREFIX) {
            return Ok(());
        }
        if self.indices.contains_key(&name) {
            return Err(DotParseError::DuplicateState { line, state: name });
        }
        self.indices.insert(name.clone(), self.nodes.len());
        self.nodes.push(Node { line, name, label });
        Ok(())
    }

    fn index(&self, line: usize, name: &str) -> Result<StateIndex, DotParseError> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| DotParseError::UnknownState {
                line,
                state: name.to_string(),
            })
    }

    fn endpoints(&self, edge: &Edge) -> Result<(StateIndex, StateIndex), DotParseError> {
        Ok((
            self.index(edge.line, &edge.source)?,
            self.index(edge.line, &edge.target)?,
        ))
    }

    fn initial(&self) -> Result<StateIndex, DotParseError> {
        match &self.start {
            Some(edge) => self.index(edge.line, &edge.target),
            None => {
                warn!("no start edge found, falling back to state `{FALLBACK_INITIAL}`");
                self.indices
                    .get(FALLBACK_INITIAL)
                    .copied()
                    .ok_or(DotParseError::MissingInitialState)
            }
        }
    }
}

/// Splits a line at semicolons that are not part of a quoted string.
fn split_statements(line: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (pos, chr) in line.char_indices() {
        match chr {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                statements.push(line[start..pos].trim());
                start = pos + 1;
            }
            _ => {}
        }
    }
    statements.push(line[start..].trim());
    statements
}

fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (pos, chr) in s.char_indices() {
        match chr {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(pos),
            _ => {}
        }
    }
    None
}

fn unquote(s: &str) -> String {
    match s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\""),
        None => s.to_string(),
    }
}

/// Parses an attribute list such as `shape="circle",label="a, b" color=red`. Returns `None` if
/// the list is malformed.
fn parse_attributes(s: &str) -> Option<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    let mut chars = s.chars().peekable();
    let is_separator = |c: char| c.is_whitespace() || c == ',' || c == ';';

    loop {
        while chars.next_if(|&c| is_separator(c)).is_some() {}
        if chars.peek().is_none() {
            return Some(attributes);
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|&c| c != '=' && !is_separator(c)) {
            key.push(c);
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.next() != Some('=') || key.is_empty() {
            return None;
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            loop {
                match chars.next()? {
                    '\\' => match chars.next()? {
                        '"' => value.push('"'),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    },
                    '"' => break,
                    c => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|&c| !is_separator(c)) {
                value.push(c);
            }
        }
        attributes.push((key, value));
    }
}
