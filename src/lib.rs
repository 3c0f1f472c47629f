//! Library for learning probabilistic automata with the external jAlergia learner.
//!
//! jAlergia is a Java implementation of the Alergia/IOAlergia family of state-merging algorithms. It
//! reads traces from a file, learns a Markov Chain (MC), a Markov Decision Process (MDP) or a
//! Stochastic Mealy Machine (SMM) and writes the result as a DOT graph. This crate does not learn
//! anything on its own, it drives the learner process and turns its output into typed models.
//!
//! The central type is [`JAlergia`], which combines an [`ExternalLearner`] (usually the
//! [`JavaLearner`] that spawns `java -jar alergia.jar`) with an [`AutomatonLoader`] (usually the
//! [`DotLoader`]). A run goes through three steps:
//! 1. remove a stale output file and make sure the input file exists,
//! 2. launch the learner and block until it exits,
//! 3. check that the learner produced its DOT file and hand it to the loader.
//!
//! Every step reports failures through [`RunError`], so a caller can tell a missing input file
//! apart from a crashed learner or a learner that exited cleanly without producing a model.
//! Parameters of the learner are collected in a [`LearnerConfig`], which is validated before any
//! process is started.
//!
//! For quick experiments there is [`run_jalergia`], which takes the automaton type as a string and
//! uses the default learner and loader:
//! ```no_run
//! use jalergia::prelude::*;
//!
//! let model = jalergia::run_jalergia("traces.txt", "mdp", 0.005, "-Xmx2048M").unwrap();
//! println!("{}", model.show());
//! ```
//!
//! Traces that only exist in memory can be written to a learner input file through [`Sample`],
//! see [`JAlergia::run_sample`].
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Runner, learner, loader, models and samples in one import, `use jalergia::prelude::*;`.
pub mod prelude {
    pub use super::{
        automaton_type::AutomatonType,
        config::{ConfigError, LearnerConfig, OutputLocation},
        loader::{AutomatonLoader, DotLoadError, DotLoader},
        model::{
            dot::DotParseError, LearnedModel, MarkovChain, Mdp, StateIndex,
            StochasticMealyMachine,
        },
        process::{ExternalLearner, Invocation, JavaLearner, LearnerStatus},
        runner::{run_jalergia, JAlergia, RunError},
        sample::{Sample, SampleError},
        Map, Show,
    };
}

/// Defines the three kinds of automata the learner can produce.
pub mod automaton_type;
pub use automaton_type::AutomatonType;

/// Configuration of a single learner run.
pub mod config;
pub use config::{ConfigError, LearnerConfig, OutputLocation};

/// Launching the external learner process.
pub mod process;
pub use process::{ExternalLearner, JavaLearner};

/// The seam between a finished learner run and the in-memory model.
pub mod loader;
pub use loader::{AutomatonLoader, DotLoader};

/// Typed probabilistic models and the parser for the DOT files the learner writes.
pub mod model;
pub use model::LearnedModel;

/// Ties learner and loader together.
pub mod runner;
pub use runner::{run_jalergia, JAlergia, RunError};

/// Traces that can be written to a learner input file.
pub mod sample;
pub use sample::Sample;

/// Type alias for maps, we use this to hide which type of `HashMap` we are actually using.
pub type Map<K, V> = fxhash::FxHashMap<K, V>;

/// Helper trait which can be used to display models.
pub trait Show {
    /// Returns a human readable representation of `self`, for a model this is a table of its
    /// transitions. This is mainly used for debugging and for the output of the command line
    /// tool.
    fn show(&self) -> String;
}
