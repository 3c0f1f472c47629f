use std::{
    error::Error as StdError,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::{
    config::{dot_file_for_stem, ConfigError, LearnerConfig, OutputLocation, DEFAULT_OUTPUT_STEM},
    loader::{AutomatonLoader, DotLoader},
    model::LearnedModel,
    process::{ExternalLearner, Invocation, JavaLearner, LearnerStatus},
    sample::{Sample, SampleError},
    AutomatonType,
};

/// Everything that can go wrong during a learner run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The parameters were rejected before anything else happened.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The input file does not exist (or is not a file).
    #[error("input file {} not found", .0.display())]
    InputNotFound(PathBuf),
    /// A file system operation around the run failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// What was attempted.
        action: &'static str,
        /// The path the operation was applied to.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The learner process could not be started.
    #[error("could not launch the learner: {0}")]
    Spawn(#[source] std::io::Error),
    /// The learner process terminated unsuccessfully.
    #[error("the learner failed with {0}")]
    LearnerFailed(LearnerStatus),
    /// The learner exited successfully, but did not write the model.
    #[error("the learner did not produce {}", .0.display())]
    OutputMissing(PathBuf),
    /// The loader could not turn the produced file into a model.
    #[error("could not load the learned model: {0}")]
    Load(#[source] Box<dyn StdError + Send + Sync>),
    /// The sample could not be written to an input file.
    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// Drives the external learner: validates the configuration, prepares input and output files,
/// launches the learner and hands its result to the loader.
///
/// By default the learner is a [`JavaLearner`] configured from the environment and the loader is
/// the [`DotLoader`], so [`JAlergia::run`] returns a [`LearnedModel`].
/// ```no_run
/// use jalergia::prelude::*;
///
/// let learner = JAlergia::new().with_config(LearnerConfig::default().with_epsilon(0.05));
/// let model = learner.run("traces.txt", AutomatonType::Smm).unwrap();
/// println!("{}", model.show());
/// ```
#[derive(Debug, Clone)]
pub struct JAlergia<L = JavaLearner, D = DotLoader> {
    learner: L,
    loader: D,
    config: LearnerConfig,
}

impl JAlergia {
    /// Uses [`JavaLearner::from_env`], the [`DotLoader`] and the default configuration.
    pub fn new() -> Self {
        Self {
            learner: JavaLearner::from_env(),
            loader: DotLoader,
            config: LearnerConfig::default(),
        }
    }
}

impl Default for JAlergia {
    fn default() -> Self {
        Self::new()
    }
}

impl<L, D> JAlergia<L, D> {
    /// Replaces the learner.
    pub fn with_learner<L2>(self, learner: L2) -> JAlergia<L2, D> {
        JAlergia {
            learner,
            loader: self.loader,
            config: self.config,
        }
    }

    /// Replaces the loader.
    pub fn with_loader<D2>(self, loader: D2) -> JAlergia<L, D2> {
        JAlergia {
            learner: self.learner,
            loader,
            config: self.config,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: LearnerConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration used for every run.
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// The learner.
    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// The loader.
    pub fn loader(&self) -> &D {
        &self.loader
    }
}

impl<L: ExternalLearner, D: AutomatonLoader> JAlergia<L, D> {
    /// Learns an automaton of the given type from the traces in `input`.
    ///
    /// The run removes a stale output file, makes sure the input exists, launches the learner
    /// and blocks until it exits. If the learner produced its DOT file, the result of the loader
    /// is returned as it is.
    pub fn run<P: AsRef<Path>>(
        &self,
        input: P,
        automaton_type: AutomatonType,
    ) -> Result<D::Output, RunError> {
        self.config.validate().map_err(|e| {
            error!("rejecting configuration: {e}");
            e
        })?;

        // keeps a temporary output directory alive until the model is loaded
        let (stem, _tempdir) = match self.config.output() {
            OutputLocation::Temporary => {
                let dir = tempfile::Builder::new()
                    .prefix("jalergia-")
                    .tempdir()
                    .map_err(|source| RunError::Io {
                        action: "could not create temporary directory in",
                        path: std::env::temp_dir(),
                        source,
                    })?;
                (dir.path().join(DEFAULT_OUTPUT_STEM), Some(dir))
            }
            OutputLocation::Stem(stem) => (stem.clone(), None),
        };

        let output_file = dot_file_for_stem(&stem);
        if output_file.exists() {
            debug!("removing stale output {}", output_file.display());
            std::fs::remove_file(&output_file).map_err(|source| RunError::Io {
                action: "could not remove stale output",
                path: output_file.clone(),
                source,
            })?;
        }

        let input = resolve_input(input.as_ref())?;

        let invocation = Invocation::new(
            &input,
            &stem,
            automaton_type,
            self.config.epsilon(),
            self.config.heap(),
        );
        info!(
            "learning {automaton_type} from {} with epsilon {}",
            input.display(),
            self.config.epsilon()
        );

        let start = std::time::Instant::now();
        let status = self.learner.learn(&invocation).map_err(|e| {
            error!("could not launch the learner: {e}");
            RunError::Spawn(e)
        })?;
        debug!("learner finished after {}ms", start.elapsed().as_millis());

        if !status.success() {
            error!("learner failed with {status}");
            return Err(RunError::LearnerFailed(status));
        }
        if !output_file.exists() {
            error!("learner did not produce {}", output_file.display());
            return Err(RunError::OutputMissing(output_file));
        }

        trace!("handing {} to the loader", output_file.display());
        self.loader
            .load(&output_file, automaton_type)
            .map_err(|e| {
                error!("could not load the learned model: {e}");
                RunError::Load(Box::new(e))
            })
    }

    /// Like [`JAlergia::run`], but takes the automaton type by its name (`mdp`, `smm` or `mc`).
    /// An unknown name is rejected before anything touches the file system.
    pub fn run_named<P: AsRef<Path>>(
        &self,
        input: P,
        automaton_type: &str,
    ) -> Result<D::Output, RunError> {
        let automaton_type = automaton_type.parse::<AutomatonType>().map_err(|e| {
            error!("{e}");
            e
        })?;
        self.run(input, automaton_type)
    }

    /// Writes the sample to a temporary input file and learns an automaton of the sample's type.
    pub fn run_sample(&self, sample: &Sample) -> Result<D::Output, RunError> {
        let input = sample.to_tempfile().map_err(SampleError::from)?;
        self.run(input.path(), sample.automaton_type())
    }
}

/// Turns the input into an absolute path, failing if there is no file.
fn resolve_input(input: &Path) -> Result<PathBuf, RunError> {
    let not_found = || {
        error!("input file {} not found", input.display());
        RunError::InputNotFound(input.to_path_buf())
    };

    let absolute = match std::fs::canonicalize(input) {
        Ok(path) => path,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(source) => {
            return Err(RunError::Io {
                action: "could not resolve input",
                path: input.to_path_buf(),
                source,
            })
        }
    };
    if !absolute.is_file() {
        return Err(not_found());
    }
    Ok(absolute)
}

/// Runs the learner on the file at `path` with the default learner and loader.
///
/// `automaton_type` has to be one of `mdp`, `smm` or `mc`, `eps` is the epsilon of the
/// compatibility check (usually `0.005`) and `heap` the heap flag for the JVM (usually
/// `-Xmx2048M`). The model is written to a temporary location.
pub fn run_jalergia<P: AsRef<Path>>(
    path: P,
    automaton_type: &str,
    eps: f64,
    heap: &str,
) -> Result<LearnedModel, RunError> {
    JAlergia::new()
        .with_config(
            LearnerConfig::default()
                .with_epsilon(eps)
                .with_heap(heap),
        )
        .run_named(path, automaton_type)
}
