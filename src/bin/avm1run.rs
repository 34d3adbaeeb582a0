//! Command line runner for decoded AVM1 action streams
//!
//! Usage: avm1run [options] <program.json>
//!
//! Options:
//!   --settings <file>  JSON settings document (see `flashvm::Settings`)
//!   --swf <n>          SWF version of the movie (overrides the settings file)
//!   --no-timeout       Disable hang detection
//!   --trace-actions    Log every executed action
//!
//! The program file holds an array of action records:
//! `[{"code": 150, "args": [{"type": "string", "value": "hi"}]}, {"code": 38}]`.
//! The actions run with `_level0` as target; `trace` output goes to stdout.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use flashvm::{ActionsData, Avm1, Settings, StdActionHost};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// CLI configuration
struct Config {
    program_path: PathBuf,
    settings_path: Option<PathBuf>,
    swf_version: Option<u8>,
    no_timeout: bool,
    trace_actions: bool,
}

fn parse_args() -> Result<Config, String> {
    let args: Vec<String> = env::args().collect();
    let program_name = args.first().map_or("avm1run", |s| s.as_str());

    let mut settings_path = None;
    let mut swf_version = None;
    let mut no_timeout = false;
    let mut trace_actions = false;
    let mut program_arg: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        let Some(arg) = args.get(i) else {
            break;
        };
        match arg.as_str() {
            "--settings" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| "--settings requires a file".to_string())?;
                settings_path = Some(PathBuf::from(path));
            }
            "--swf" => {
                i += 1;
                swf_version = Some(
                    args.get(i)
                        .ok_or_else(|| "--swf requires a value".to_string())?
                        .parse::<u8>()
                        .map_err(|_| "--swf must be an integer between 0 and 255".to_string())?,
                );
            }
            "--no-timeout" => no_timeout = true,
            "--trace-actions" => trace_actions = true,
            other if other.starts_with('-') => return Err(format!("Unknown option: {}", other)),
            other => program_arg = Some(other),
        }
        i += 1;
    }

    let program_arg = program_arg.ok_or_else(|| {
        format!(
            "Usage: {} [--settings <file>] [--swf <n>] [--no-timeout] [--trace-actions] <program.json>",
            program_name
        )
    })?;

    Ok(Config {
        program_path: PathBuf::from(program_arg),
        settings_path,
        swf_version,
        no_timeout,
        trace_actions,
    })
}

fn load_settings(config: &Config) -> Result<Settings, String> {
    let mut settings = match &config.settings_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
            serde_json::from_str::<Settings>(&text)
                .map_err(|e| format!("Invalid settings in '{}': {}", path.display(), e))?
        }
        None => Settings::default(),
    };
    if let Some(version) = config.swf_version {
        settings.swf_version = version;
    }
    if config.no_timeout {
        settings.hang_timeout_ms = None;
    }
    if config.trace_actions {
        settings.trace_actions = true;
    }
    Ok(settings)
}

fn run() -> Result<(), String> {
    let config = parse_args()?;
    let settings = load_settings(&config)?;

    let source = fs::read_to_string(&config.program_path)
        .map_err(|e| format!("Failed to read '{}': {}", config.program_path.display(), e))?;
    let actions = ActionsData::from_json(&source).map_err(|e| e.to_string())?;
    log::debug!(
        "loaded {} actions from {} (swf {})",
        actions.len(),
        config.program_path.display(),
        settings.swf_version
    );

    let mut avm = Avm1::with_host(settings, Box::new(StdActionHost::new()));
    let root = avm.create_root_movie_clip(0);

    let start = Instant::now();
    let result = avm.execute_actions(&actions, root);
    log::debug!("finished in {:?}", start.elapsed());

    result.map_err(|e| e.to_string())
}
