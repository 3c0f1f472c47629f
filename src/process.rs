use std::{
    ffi::OsString,
    fmt::Display,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use itertools::Itertools;
use tracing::{debug, trace};

use crate::{config::dot_file_for_stem, AutomatonType};

/// Java executable used when nothing else is configured.
pub const DEFAULT_JAVA: &str = "java";
/// Location of the learner archive used when nothing else is configured.
pub const DEFAULT_JAR: &str = "alergia.jar";

/// How the learner process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnerStatus {
    /// The process exited with status zero.
    Success,
    /// The process exited with a non-zero status. The code is `None` if the process was
    /// terminated by a signal.
    Failed {
        /// The exit code, if there is one.
        code: Option<i32>,
    },
}

impl LearnerStatus {
    /// Returns true if the learner exited with status zero.
    pub fn success(&self) -> bool {
        matches!(self, LearnerStatus::Success)
    }
}

impl From<ExitStatus> for LearnerStatus {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            LearnerStatus::Success
        } else {
            LearnerStatus::Failed {
                code: status.code(),
            }
        }
    }
}

impl Display for LearnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearnerStatus::Success => write!(f, "exit status 0"),
            LearnerStatus::Failed { code: Some(code) } => write!(f, "exit status {code}"),
            LearnerStatus::Failed { code: None } => write!(f, "terminated by signal"),
        }
    }
}

/// Everything a learner needs to know for one run. The input path is always absolute and
/// points to an existing file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invocation<'a> {
    input: &'a Path,
    output_stem: &'a Path,
    automaton_type: AutomatonType,
    epsilon: f64,
    heap: &'a str,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        input: &'a Path,
        output_stem: &'a Path,
        automaton_type: AutomatonType,
        epsilon: f64,
        heap: &'a str,
    ) -> Self {
        Self {
            input,
            output_stem,
            automaton_type,
            epsilon,
            heap,
        }
    }

    /// The absolute path of the trace file.
    pub fn input(&self) -> &'a Path {
        self.input
    }

    /// The stem the learner saves its model under.
    pub fn output_stem(&self) -> &'a Path {
        self.output_stem
    }

    /// The file the learner is expected to produce, i.e. the stem with `.dot` appended.
    pub fn output_file(&self) -> PathBuf {
        dot_file_for_stem(self.output_stem)
    }

    /// The requested automaton type.
    pub fn automaton_type(&self) -> AutomatonType {
        self.automaton_type
    }

    /// The epsilon of the compatibility check.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The heap flag for the JVM.
    pub fn heap(&self) -> &'a str {
        self.heap
    }

    /// The arguments understood by the learner itself, that is everything after the archive:
    /// `-path <input> -eps <epsilon> -type <type> -save <stem>`.
    pub fn learner_arguments(&self) -> Vec<OsString> {
        vec![
            "-path".into(),
            self.input.as_os_str().to_owned(),
            "-eps".into(),
            self.epsilon.to_string().into(),
            "-type".into(),
            self.automaton_type.as_str().into(),
            "-save".into(),
            self.output_stem.as_os_str().to_owned(),
        ]
    }
}

/// Something that can run the learner for an [`Invocation`] and block until it is done.
/// A successful run is expected to leave a DOT file at [`Invocation::output_file`].
/// Closures taking an `&Invocation` are learners as well, which is mostly useful for testing.
pub trait ExternalLearner {
    /// Runs the learner to completion. An `Err` means the learner could not be started at all,
    /// how it terminated is reported through the returned [`LearnerStatus`].
    fn learn(&self, invocation: &Invocation<'_>) -> std::io::Result<LearnerStatus>;
}

impl<F> ExternalLearner for F
where
    F: Fn(&Invocation<'_>) -> std::io::Result<LearnerStatus>,
{
    fn learn(&self, invocation: &Invocation<'_>) -> std::io::Result<LearnerStatus> {
        self(invocation)
    }
}

/// Runs the learner archive in a JVM, i.e.
/// `java <heap> -jar alergia.jar -path <input> -eps <epsilon> -type <type> -save <stem>`.
/// Standard output and error of the process are inherited, so the progress messages of the
/// learner show up on the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaLearner {
    java: PathBuf,
    jar: PathBuf,
}

impl Default for JavaLearner {
    fn default() -> Self {
        Self {
            java: PathBuf::from(DEFAULT_JAVA),
            jar: PathBuf::from(DEFAULT_JAR),
        }
    }
}

impl JavaLearner {
    /// Creates a learner for the given archive, using `java` from the `PATH`.
    pub fn new<P: Into<PathBuf>>(jar: P) -> Self {
        Self {
            jar: jar.into(),
            ..Default::default()
        }
    }

    /// Like [`JavaLearner::default`], but the executable and the archive can be overridden by
    /// setting the `JALERGIA_JAVA` and `JALERGIA_JAR` environment variables.
    pub fn from_env() -> Self {
        let java = std::env::var_os("JALERGIA_JAVA").unwrap_or_else(|| DEFAULT_JAVA.into());
        let jar = std::env::var_os("JALERGIA_JAR").unwrap_or_else(|| DEFAULT_JAR.into());
        Self {
            java: java.into(),
            jar: jar.into(),
        }
    }

    /// Sets the executable that is used to launch the archive.
    pub fn with_java<P: Into<PathBuf>>(mut self, java: P) -> Self {
        self.java = java.into();
        self
    }

    /// Sets the location of the learner archive.
    pub fn with_jar<P: Into<PathBuf>>(mut self, jar: P) -> Self {
        self.jar = jar.into();
        self
    }

    /// The executable that launches the archive.
    pub fn java(&self) -> &Path {
        &self.java
    }

    /// The location of the learner archive.
    pub fn jar(&self) -> &Path {
        &self.jar
    }

    /// All arguments passed to the executable, in order.
    pub fn arguments(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            invocation.heap().into(),
            "-jar".into(),
            self.jar.as_os_str().to_owned(),
        ];
        args.extend(invocation.learner_arguments());
        args
    }
}

impl ExternalLearner for JavaLearner {
    fn learn(&self, invocation: &Invocation<'_>) -> std::io::Result<LearnerStatus> {
        let args = self.arguments(invocation);
        debug!(
            "launching {} {}",
            self.java.display(),
            args.iter().map(|a| a.to_string_lossy()).join(" ")
        );

        let mut child = Command::new(&self.java).args(&args).spawn()?;
        let status = child.wait()?;
        trace!("learner process exited with {status}");

        Ok(status.into())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn argument_order() {
        let invocation = Invocation::new(
            Path::new("/data/traces.txt"),
            Path::new("/tmp/run/jAlergiaModel"),
            AutomatonType::Mdp,
            0.005,
            "-Xmx2048M",
        );
        let learner = JavaLearner::new("lib/alergia.jar");
        let args = learner
            .arguments(&invocation)
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            args,
            [
                "-Xmx2048M",
                "-jar",
                "lib/alergia.jar",
                "-path",
                "/data/traces.txt",
                "-eps",
                "0.005",
                "-type",
                "mdp",
                "-save",
                "/tmp/run/jAlergiaModel"
            ]
        );
        assert_eq!(
            invocation.output_file(),
            Path::new("/tmp/run/jAlergiaModel.dot")
        );
        assert_eq!(learner.java(), Path::new("java"));
    }

    #[test]
    fn missing_executable_cannot_spawn() {
        let invocation = Invocation::new(
            Path::new("/data/traces.txt"),
            Path::new("model"),
            AutomatonType::Mc,
            0.01,
            "-Xmx1G",
        );
        let learner = JavaLearner::default().with_java("/nonexistent/bin/java-for-jalergia");
        assert!(learner.learn(&invocation).is_err());
    }

    #[test]
    fn status_display() {
        assert!(LearnerStatus::Success.success());
        assert!(!LearnerStatus::Failed { code: Some(1) }.success());
        assert_eq!(
            LearnerStatus::Failed { code: Some(3) }.to_string(),
            "exit status 3"
        );
    }
}
