use std::{
    io::{BufRead, BufWriter, Write},
    path::Path,
};

use itertools::Itertools;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, trace};

use crate::AutomatonType;

/// Abstracts the types of errors that can occur when building, reading or writing a [`Sample`].
/// Traces and lines are counted from one.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SampleError {
    #[error("trace {trace} contains the symbol `{symbol}`, symbols must be non-empty and may not contain `,` or line breaks")]
    InvalidSymbol { trace: usize, symbol: String },
    #[error("trace {trace} is empty")]
    EmptyTrace { trace: usize },
    #[error("trace {trace} starts with `{found}`, but all traces have to start with `{expected}`")]
    InconsistentInitialOutput {
        trace: usize,
        expected: String,
        found: String,
    },
    #[error("line {line} has {symbols} symbols, which does not fit a {automaton_type} sample")]
    MalformedLine {
        line: usize,
        symbols: usize,
        automaton_type: AutomatonType,
    },
    #[error("could not read or write sample: {0}")]
    Io(#[from] std::io::Error),
}

/// A collection of traces in the format the learner reads: one trace per line, symbols
/// separated by commas.
/// - Markov chain traces are sequences of outputs, `o0,o1,o2`.
/// - MDP traces start with the initial output, followed by input/output pairs, `o0,i1,o1,i2,o2`.
/// - Stochastic Mealy machine traces consist of input/output pairs only, `i1,o1,i2,o2`.
///
/// For Markov chains and MDPs all traces have to start with the same initial output.
///
/// ```
/// use jalergia::prelude::*;
///
/// let sample = Sample::mdp([
///     ("start", vec![("walk", "goal")]),
///     ("start", vec![("walk", "mud"), ("walk", "goal")]),
/// ])
/// .unwrap();
/// let mut out = Vec::new();
/// sample.write_to(&mut out).unwrap();
/// assert_eq!(out, b"start,walk,goal\nstart,walk,mud,walk,goal\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    automaton_type: AutomatonType,
    traces: Vec<Vec<String>>,
}

impl Sample {
    /// Builds a sample for learning a Markov chain from sequences of outputs.
    pub fn markov_chain<I, T, S>(traces: I) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_lines(
            AutomatonType::Mc,
            traces
                .into_iter()
                .map(|trace| trace.into_iter().map(Into::into).collect::<Vec<String>>()),
        )
    }

    /// Builds a sample for learning an MDP from pairs of initial output and input/output steps.
    pub fn mdp<I, O, T, S>(traces: I) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = (O, T)>,
        O: Into<String>,
        T: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self::from_lines(
            AutomatonType::Mdp,
            traces.into_iter().map(|(initial, steps)| {
                std::iter::once::<String>(initial.into())
                    .chain(
                        steps
                            .into_iter()
                            .flat_map(|(i, o)| -> [String; 2] { [i.into(), o.into()] }),
                    )
                    .collect::<Vec<String>>()
            }),
        )
    }

    /// Builds a sample for learning a stochastic Mealy machine from input/output steps.
    pub fn smm<I, T, S>(traces: I) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self::from_lines(
            AutomatonType::Smm,
            traces.into_iter().map(|steps| {
                steps
                    .into_iter()
                    .flat_map(|(i, o)| -> [String; 2] { [i.into(), o.into()] })
                    .collect::<Vec<String>>()
            }),
        )
    }

    /// Reads a sample in the line format of the learner. Empty lines are skipped, the symbols of
    /// a line are taken as they are, so a line of whitespace is a trace with a single symbol.
    pub fn parse<R: BufRead>(reader: R, automaton_type: AutomatonType) -> Result<Self, SampleError> {
        let mut lines = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let symbols = line.split(',').map(str::to_string).collect_vec();
            let fits = match automaton_type {
                AutomatonType::Mc => true,
                AutomatonType::Mdp => symbols.len() % 2 == 1,
                AutomatonType::Smm => symbols.len() % 2 == 0,
            };
            if !fits {
                return Err(SampleError::MalformedLine {
                    line: idx + 1,
                    symbols: symbols.len(),
                    automaton_type,
                });
            }
            lines.push(symbols);
        }
        Self::from_lines(automaton_type, lines)
    }

    fn from_lines<I>(automaton_type: AutomatonType, lines: I) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let traces = lines.into_iter().collect_vec();

        for (idx, trace) in traces.iter().enumerate() {
            if trace.is_empty() {
                return Err(SampleError::EmptyTrace { trace: idx + 1 });
            }
            if let Some(symbol) = trace.iter().find(|s| !is_valid_symbol(s)) {
                return Err(SampleError::InvalidSymbol {
                    trace: idx + 1,
                    symbol: symbol.clone(),
                });
            }
        }

        if automaton_type.starts_with_initial_output() {
            if let Some(expected) = traces.first().map(|t| &t[0]) {
                if let Some((idx, trace)) = traces
                    .iter()
                    .enumerate()
                    .find(|(_, trace)| &trace[0] != expected)
                {
                    return Err(SampleError::InconsistentInitialOutput {
                        trace: idx + 1,
                        expected: expected.clone(),
                        found: trace[0].clone(),
                    });
                }
            }
        }

        trace!("built {automaton_type} sample with {} traces", traces.len());
        Ok(Self {
            automaton_type,
            traces,
        })
    }

    /// The type of automaton this sample is meant for.
    pub fn automaton_type(&self) -> AutomatonType {
        self.automaton_type
    }

    /// The number of traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Returns true if the sample contains no traces.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// The traces as they are written to the input file, one vector of symbols per line.
    pub fn traces(&self) -> &[Vec<String>] {
        &self.traces
    }

    /// The output that all traces start with. Always `None` for samples of stochastic Mealy
    /// machines.
    pub fn initial_output(&self) -> Option<&str> {
        if !self.automaton_type.starts_with_initial_output() {
            return None;
        }
        self.traces.first().map(|t| t[0].as_str())
    }

    /// Writes the sample in the line format of the learner.
    pub fn write_to<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let mut writer = BufWriter::new(writer);
        for trace in &self.traces {
            writeln!(writer, "{}", trace.iter().join(","))?;
        }
        writer.flush()
    }

    /// Writes the sample to the file at `path`, replacing its contents.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        self.write_to(std::fs::File::create(path)?)
    }

    /// Writes the sample to a fresh temporary file. The file is deleted when the returned
    /// handle is dropped.
    pub fn to_tempfile(&self) -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("jalergia-sample-")
            .suffix(".txt")
            .tempfile()?;
        self.write_to(file.as_file_mut())?;
        debug!(
            "wrote {} traces to {}",
            self.traces.len(),
            file.path().display()
        );
        Ok(file)
    }
}

fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty() && !symbol.contains([',', '\n', '\r'])
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn markov_chain_lines() {
        let sample = Sample::markov_chain([vec!["a", "b", "b"], vec!["a", "c"]]).unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.initial_output(), Some("a"));
        let mut out = Vec::new();
        sample.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b,b\na,c\n");
    }

    #[test]
    fn smm_lines_have_no_initial_output() {
        let sample = Sample::smm([vec![("press", "light")], vec![("wait", "dark"), ("press", "light")]])
            .unwrap();
        assert_eq!(sample.initial_output(), None);
        assert_eq!(
            sample.traces()[1],
            vec!["wait", "dark", "press", "light"]
        );
    }

    #[test]
    fn inconsistent_initial_output() {
        let err = Sample::markov_chain([vec!["a", "b"], vec!["a"], vec!["b", "a"]]).unwrap_err();
        assert!(matches!(
            err,
            SampleError::InconsistentInitialOutput { trace: 3, ref expected, ref found }
                if expected == "a" && found == "b"
        ));
        // smm traces do not share an initial output
        assert!(Sample::smm([vec![("x", "1")], vec![("y", "2")]]).is_ok());
    }

    #[test]
    fn invalid_symbols_and_empty_traces() {
        assert!(matches!(
            Sample::markov_chain([vec!["a", "b,c"]]),
            Err(SampleError::InvalidSymbol { trace: 1, .. })
        ));
        assert!(matches!(
            Sample::mdp([("a", vec![("", "b")])]),
            Err(SampleError::InvalidSymbol { trace: 1, .. })
        ));
        assert!(matches!(
            Sample::smm([vec![("a", "b")], vec![]]),
            Err(SampleError::EmptyTrace { trace: 2 })
        ));
        assert!(Sample::markov_chain(Vec::<Vec<String>>::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn parse_lines() {
        let input = "init,a,x,b,y\n\ninit,a,y\r\n";
        let sample = Sample::parse(input.as_bytes(), AutomatonType::Mdp).unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.traces()[1], vec!["init", "a", "y"]);

        // only empty lines are skipped, whitespace is a symbol
        let err = Sample::parse("x\n \n\nx,y\n".as_bytes(), AutomatonType::Mc).unwrap_err();
        assert!(matches!(
            err,
            SampleError::InconsistentInitialOutput { trace: 2, ref found, .. } if found == " "
        ));
        let sample = Sample::parse(" \n\n \n".as_bytes(), AutomatonType::Mc).unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.initial_output(), Some(" "));

        assert!(matches!(
            Sample::parse("a,b\n".as_bytes(), AutomatonType::Mdp),
            Err(SampleError::MalformedLine { line: 1, symbols: 2, .. })
        ));
        assert!(matches!(
            Sample::parse("a,b\na,b,c\n".as_bytes(), AutomatonType::Smm),
            Err(SampleError::MalformedLine { line: 2, symbols: 3, .. })
        ));
    }

    #[test]
    fn tempfile_contents() {
        let sample = Sample::smm([vec![("i", "o")]]).unwrap();
        let file = sample.to_tempfile().unwrap();
        let mut contents = String::new();
        std::fs::File::open(file.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "i,o\n");
        assert_eq!(
            Sample::parse(contents.as_bytes(), AutomatonType::Smm).unwrap(),
            sample
        );
    }
}
