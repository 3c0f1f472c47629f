use std::path::{Path, PathBuf};

use thiserror::Error;

/// Epsilon used when none is given explicitly.
pub const DEFAULT_EPSILON: f64 = 0.005;
/// Heap flag handed to the JVM when none is given explicitly.
pub const DEFAULT_HEAP: &str = "-Xmx2048M";
/// The stem of the file the learner writes its model to, it appends `.dot` itself.
pub const DEFAULT_OUTPUT_STEM: &str = "jAlergiaModel";

/// Errors in the parameters of a learner run. These are detected before anything touches the
/// file system or a process is launched.
#[derive(Debug, Clone, PartialEq, Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("unknown automaton type `{0}`, expected one of mdp, smm or mc")]
    UnknownAutomatonType(String),
    #[error("epsilon must be a number in (0, 2], got {0}")]
    InvalidEpsilon(f64),
}

/// Determines where the learner writes the learned model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputLocation {
    /// Each run gets a fresh temporary directory, which is removed once the model has been
    /// loaded. Concurrent runs never share an output file.
    #[default]
    Temporary,
    /// The learner writes to `<stem>.dot`. A stale file at that location is removed before the
    /// run and the produced file is left in place afterwards.
    Stem(PathBuf),
}

impl OutputLocation {
    /// The location used by older tooling, `jAlergiaModel.dot` in the current working directory.
    pub fn legacy() -> Self {
        OutputLocation::Stem(PathBuf::from(DEFAULT_OUTPUT_STEM))
    }

    /// Writes the model to `<stem>.dot`.
    pub fn stem<P: Into<PathBuf>>(stem: P) -> Self {
        OutputLocation::Stem(stem.into())
    }
}

/// Parameters of a single learner run. Construct it via [`Default`] and adjust it with the
/// `with_*` methods, then call [`LearnerConfig::validate`] (which [`crate::JAlergia`] does
/// before every run).
///
/// ```
/// use jalergia::prelude::*;
///
/// let config = LearnerConfig::default()
///     .with_epsilon(0.01)
///     .with_heap("-Xmx12G");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LearnerConfig {
    epsilon: f64,
    heap: String,
    output: OutputLocation,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            heap: DEFAULT_HEAP.to_string(),
            output: OutputLocation::Temporary,
        }
    }
}

impl LearnerConfig {
    /// Sets the epsilon of the Hoeffding compatibility check.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the heap flag for the JVM, e.g. `-Xmx12G`. The value is passed through unchanged.
    pub fn with_heap<S: Into<String>>(mut self, heap: S) -> Self {
        self.heap = heap.into();
        self
    }

    /// Sets where the learner writes its model.
    pub fn with_output(mut self, output: OutputLocation) -> Self {
        self.output = output;
        self
    }

    /// Returns the configured epsilon.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the configured heap flag.
    pub fn heap(&self) -> &str {
        &self.heap
    }

    /// Returns the configured output location.
    pub fn output(&self) -> &OutputLocation {
        &self.output
    }

    /// Checks the parameters against what the learner accepts. Epsilon has to be finite and lie
    /// in the half open interval (0, 2].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 || self.epsilon > 2.0 {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        Ok(())
    }
}

/// Returns the path of the DOT file that the learner writes for the given stem.
pub(crate) fn dot_file_for_stem(stem: &Path) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(".dot");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn defaults() {
        let config = LearnerConfig::default();
        assert_eq!(config.epsilon(), 0.005);
        assert_eq!(config.heap(), "-Xmx2048M");
        assert_eq!(config.output(), &OutputLocation::Temporary);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn epsilon_bounds() {
        for eps in [1e-9, 0.05, 1.0, 2.0] {
            assert!(LearnerConfig::default().with_epsilon(eps).validate().is_ok());
        }
        for eps in [0.0, -1.0, 2.0001, f64::INFINITY] {
            assert_eq!(
                LearnerConfig::default().with_epsilon(eps).validate(),
                Err(ConfigError::InvalidEpsilon(eps))
            );
        }
        assert!(LearnerConfig::default()
            .with_epsilon(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn dot_file_keeps_stem_extension() {
        assert_eq!(
            dot_file_for_stem(Path::new("out/model.v1")),
            Path::new("out/model.v1.dot")
        );
        assert_eq!(
            OutputLocation::legacy(),
            OutputLocation::stem("jAlergiaModel")
        );
    }
}
