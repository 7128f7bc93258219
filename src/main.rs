//! Replays a recorded editing session and prints the resulting annotations.
//!
//! Usage: `rvat-replay [--config <path>] <script.json>`

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use clap::Parser;
    use rvat::replay::{SessionScript, run_script};
    use rvat::{EngineConfig, LogLevel};

    #[derive(Parser, Debug)]
    #[command(
        name = "rvat-replay",
        about = "Replay a recorded annotation session and print the result as JSON"
    )]
    pub struct Args {
        /// Engine configuration file (defaults to the user config directory)
        #[arg(short, long, value_name = "PATH")]
        pub config: Option<PathBuf>,
        /// Session script to replay
        #[arg(value_name = "SCRIPT")]
        pub script: PathBuf,
    }

    /// Install the logger before anything can log.
    /// Returns true when `RUST_LOG` controls the level.
    fn init_logging() -> bool {
        let from_env = std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some();
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if !from_env {
            builder.filter_level(log::LevelFilter::Trace);
        }
        builder.init();
        if !from_env {
            log::set_max_level(LogLevel::default().to_level_filter());
        }
        from_env
    }

    fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, String> {
        if let Some(path) = path {
            return EngineConfig::load_from(path).map_err(|e| format!("{:?}: {}", path, e));
        }
        let Some(path) = EngineConfig::default_path() else {
            return Ok(EngineConfig::default());
        };

        EngineConfig::load_if_exists(&path)
            .map(Option::unwrap_or_default)
            .map_err(|e| format!("{:?}: {}", path, e))
    }

    fn run(args: &Args) -> Result<String, String> {
        let level_from_env = init_logging();
        let config = load_config(args.config.as_ref())?;
        if !level_from_env {
            log::set_max_level(config.log_level.to_level_filter());
        }

        let script =
            SessionScript::load(&args.script).map_err(|e| format!("{:?}: {}", args.script, e))?;
        let report = run_script(&script, &config).map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&report).map_err(|e| e.to_string())
    }

    pub fn main() -> ExitCode {
        let args = Args::parse();

        match run(&args) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use clap::CommandFactory;

        use super::*;

        #[test]
        fn test_command_is_well_formed() {
            Args::command().debug_assert();
        }

        #[test]
        fn test_parse_config_and_script() {
            let args = Args::try_parse_from(["rvat-replay", "-c", "engine.json", "session.json"])
                .unwrap();
            assert_eq!(args.config, Some(PathBuf::from("engine.json")));
            assert_eq!(args.script, PathBuf::from("session.json"));

            let args = Args::try_parse_from(["rvat-replay", "session.json"]).unwrap();
            assert_eq!(args.config, None);
        }

        #[test]
        fn test_script_is_required() {
            assert!(Args::try_parse_from(["rvat-replay", "--config", "engine.json"]).is_err());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::main()
}

// The replay driver needs a filesystem
#[cfg(target_arch = "wasm32")]
fn main() {}
