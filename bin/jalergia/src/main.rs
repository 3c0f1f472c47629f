use std::path::PathBuf;

use jalergia::prelude::*;

use tracing::{debug, error, info, trace};
use tracing_subscriber::{filter, prelude::*};

use clap::{value_parser, Arg, ArgMatches, Command};

fn cli() -> clap::Command {
    Command::new("jalergia")
    .about("Learn probabilistic automata from traces with jAlergia")
    .subcommand_required(true)
    .arg(
        Arg::new("verbosity")
        .short('v')
        .long("verbosity")
        .num_args(0..=1)
        .require_equals(true)
        .value_parser(["info", "debug", "trace"])
        .default_missing_value("info")
    )
    .subcommand(
        Command::new("learn")
        .about("runs the learner on a trace file and prints the learned model")
        .arg(
            Arg::new("input")
            .short('i')
            .long("input")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("file with one comma separated trace per line")
        )
        .arg(automaton_type_arg())
        .arg(
            Arg::new("eps")
            .short('e')
            .long("eps")
            .value_parser(value_parser!(f64))
            .default_value("0.005")
            .help("epsilon of the compatibility check")
        )
        .arg(
            Arg::new("heap")
            .long("heap")
            .allow_hyphen_values(true)
            .default_value(jalergia::config::DEFAULT_HEAP)
            .help("heap flag passed to the JVM")
        )
        .arg(
            Arg::new("jar")
            .long("jar")
            .value_parser(value_parser!(PathBuf))
            .help("location of alergia.jar, defaults to $JALERGIA_JAR or ./alergia.jar")
        )
        .arg(
            Arg::new("java")
            .long("java")
            .value_parser(value_parser!(PathBuf))
            .help("java executable, defaults to $JALERGIA_JAVA or java")
        )
        .arg(
            Arg::new("save")
            .short('s')
            .long("save")
            .value_parser(value_parser!(PathBuf))
            .help("keep the learned model at <save>.dot instead of a temporary location")
        )
    )
    .subcommand(
        Command::new("show")
        .about("loads a DOT file written by the learner and prints it")
        .arg(automaton_type_arg())
        .arg(
            Arg::new("file")
            .required(true)
            .value_parser(value_parser!(PathBuf))
        )
    )
}

fn automaton_type_arg() -> Arg {
    Arg::new("type")
        .short('t')
        .long("type")
        .required(true)
        .value_parser(["mc", "mdp", "smm"])
        .help("kind of automaton")
}

fn setup_logging(matches: &ArgMatches) {
    let level = match matches
        .try_get_one::<String>("verbosity")
        .ok()
        .flatten()
        .map(|m| m.as_str())
    {
        Some("trace") => filter::LevelFilter::TRACE,
        Some("debug") => filter::LevelFilter::DEBUG,
        Some("info") => filter::LevelFilter::INFO,
        _ => filter::LevelFilter::WARN,
    };

    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(stderr_log.with_filter(level))
        .init();

    trace!("setup {level} logging");
}

fn automaton_type(matches: &ArgMatches) -> Result<AutomatonType, ConfigError> {
    matches
        .get_one::<String>("type")
        .map(String::as_str)
        .unwrap_or_default()
        .parse()
}

fn learn(matches: &ArgMatches) -> Result<LearnedModel, RunError> {
    let ty = automaton_type(matches)?;

    let mut learner = JavaLearner::from_env();
    if let Some(jar) = matches.get_one::<PathBuf>("jar") {
        learner = learner.with_jar(jar);
    }
    if let Some(java) = matches.get_one::<PathBuf>("java") {
        learner = learner.with_java(java);
    }
    debug!(
        "using {} with {}",
        learner.java().display(),
        learner.jar().display()
    );

    let mut config = LearnerConfig::default();
    if let Some(eps) = matches.get_one::<f64>("eps") {
        config = config.with_epsilon(*eps);
    }
    if let Some(heap) = matches.get_one::<String>("heap") {
        config = config.with_heap(heap.as_str());
    }
    if let Some(stem) = matches.get_one::<PathBuf>("save") {
        config = config.with_output(OutputLocation::stem(stem));
    }

    let input = matches
        .get_one::<PathBuf>("input")
        .cloned()
        .unwrap_or_default();

    let start = std::time::Instant::now();
    let model = JAlergia::new()
        .with_learner(learner)
        .with_config(config)
        .run(input, ty)?;
    info!(
        "learned {ty} with {} states in {}ms",
        model.size(),
        start.elapsed().as_millis()
    );
    Ok(model)
}

fn show(matches: &ArgMatches) -> Result<LearnedModel, Box<dyn std::error::Error>> {
    let ty = automaton_type(matches)?;
    let file = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .unwrap_or_default();
    Ok(DotLoader.load(&file, ty)?)
}

pub fn main() {
    let matches = cli().get_matches();

    setup_logging(&matches);

    let result = match matches.subcommand() {
        Some(("learn", sub_matches)) => learn(sub_matches).map_err(Box::<dyn std::error::Error>::from),
        Some(("show", sub_matches)) => show(sub_matches),
        _ => unreachable!(),
    };

    match result {
        Ok(model) => print!("{}", model.show()),
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn learn_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "jalergia", "-v=debug", "learn", "--input", "traces.txt", "--type", "mdp",
                "--heap", "-Xmx4G", "--save", "out/model",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "learn");
        assert_eq!(automaton_type(sub).unwrap(), AutomatonType::Mdp);
        assert_eq!(sub.get_one::<f64>("eps"), Some(&0.005));
        assert_eq!(sub.get_one::<String>("heap").unwrap(), "-Xmx4G");
        assert_eq!(
            sub.get_one::<PathBuf>("save"),
            Some(&PathBuf::from("out/model"))
        );

        assert!(cli()
            .try_get_matches_from(["jalergia", "learn", "--input", "x", "--type", "dfa"])
            .is_err());
    }
}
