use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::{
    model::{dot::parse_dot, dot::DotParseError, LearnedModel},
    AutomatonType,
};

/// Turns the file produced by the learner into a model. The loader receives the path of the
/// output file and the automaton type that was requested from the learner, whatever it returns
/// is handed to the caller of the run unchanged.
///
/// Closures taking a `&Path` and an [`AutomatonType`] are loaders as well.
pub trait AutomatonLoader {
    /// What the loader produces.
    type Output;
    /// The error type of the loader.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Loads the model from `path`.
    fn load(&self, path: &Path, automaton_type: AutomatonType) -> Result<Self::Output, Self::Error>;
}

impl<F, T, E> AutomatonLoader for F
where
    F: Fn(&Path, AutomatonType) -> Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Output = T;
    type Error = E;

    fn load(&self, path: &Path, automaton_type: AutomatonType) -> Result<T, E> {
        self(path, automaton_type)
    }
}

/// Errors of the [`DotLoader`].
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum DotLoadError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: DotParseError,
    },
}

/// Loads the DOT files written by the learner into a [`LearnedModel`], see
/// [`crate::model::dot`] for the format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DotLoader;

impl AutomatonLoader for DotLoader {
    type Output = LearnedModel;
    type Error = DotLoadError;

    fn load(&self, path: &Path, automaton_type: AutomatonType) -> Result<LearnedModel, DotLoadError> {
        let dot = std::fs::read_to_string(path).map_err(|source| DotLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = parse_dot(&dot, automaton_type).map_err(|source| DotLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "loaded {automaton_type} with {} states from {}",
            model.size(),
            path.display()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.dot");
        std::fs::write(
            &path,
            "digraph g {\nq0 [shape=\"circle\",label=\"q0\"];\nq0->q0 [label=\"tick/tock:1.0\"];\n__start0 -> q0  [label=\"\"];\n}\n",
        )
        .unwrap();

        let model = DotLoader.load(&path, AutomatonType::Smm).unwrap();
        let smm = model.as_smm().unwrap();
        assert_eq!(smm.output_probability(0, "tick", "tock"), 1.0);

        assert!(matches!(
            DotLoader.load(&path, AutomatonType::Mdp),
            Err(DotLoadError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DotLoader.load(&dir.path().join("absent.dot"), AutomatonType::Mc),
            Err(DotLoadError::Io { .. })
        ));
    }

    #[test]
    fn closures_are_loaders() {
        let loader = |path: &Path, ty: AutomatonType| -> Result<String, std::io::Error> {
            Ok(format!("{ty}@{}", path.display()))
        };
        assert_eq!(
            loader.load(Path::new("x.dot"), AutomatonType::Mc).unwrap(),
            "mc@x.dot"
        );
    }
}
