use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use ringleader::agent::AgentConfig;
use ringleader::app::{App, AppRuntime};
use ringleader::command::CommandDispatcher;
use ringleader::config::{Args, Config};
use ringleader::container::{ContainerAdapter, Engine};
use ringleader::github::GitHub;
use ringleader::persistence::Store;
use ringleader::vcs::{repo_hash, Git};
use ringleader::workstream::WorkstreamManager;

/// Startup failures map to these exit codes (§6): 0 on clean quit (handled
/// inside `App::run`), nonzero when the process can't even get to the
/// event loop — an unreadable state file or a missing container runtime.
const EXIT_STARTUP_FAILURE: u8 = 1;

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
    };

    init_logging(&args);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
    };

    runtime.block_on(async_main(args, config))
}

async fn async_main(args: Args, config: Config) -> ExitCode {
    let repo_path = match args.repo.clone() {
        Some(path) => path,
        None => match std::env::current_dir() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("could not resolve current directory: {e}");
                return ExitCode::from(EXIT_STARTUP_FAILURE);
            }
        },
    };

    let git = Arc::new(Git::new(repo_path.clone()));
    let fingerprint = repo_hash(&repo_path).await;

    let store = Store::new(Store::state_dir(), &fingerprint);
    if args.print_state_path {
        println!("{}", store.path().display());
        return ExitCode::SUCCESS;
    }

    let container: Arc<dyn ContainerAdapter> = Arc::new(Engine::new(config.container_engine.clone()));

    let mut state = match store.load().await {
        Ok(Some(state)) => state,
        Ok(None) => ringleader::workstream::AppState::new(&fingerprint),
        Err(e) => {
            eprintln!("could not read saved state, starting empty: {e}");
            ringleader::workstream::AppState::new(&fingerprint)
        }
    };

    Store::repair(&mut state, container.as_ref(), &AgentConfig::default().session_files_path).await;
    if let Err(e) = store.save(&state).await {
        log::warn!("failed to persist repaired state: {e}");
    }

    let workstreams = WorkstreamManager::from_state(state, config.max_workstreams);
    let app_runtime = AppRuntime::new(workstreams);

    let github = GitHub::new(repo_path.clone());
    let dispatcher = Arc::new(CommandDispatcher::new(
        container,
        git,
        github,
        store,
        AgentConfig::default().session_files_path,
    ));

    let app = App::new(app_runtime, dispatcher, config);
    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ringleader exited with an error: {e}");
            ExitCode::from(EXIT_STARTUP_FAILURE)
        }
    }
}

/// Initializes `env_logger` at a verbosity derived from `-v`/`-vv`/`-vvv`,
/// writing to `--log-file` when given so stderr stays free for the TUI's
/// alternate screen. Falls back to the default state directory otherwise,
/// so logs survive across runs without cluttering the working directory.
fn init_logging(args: &Args) {
    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let log_path = args.log_file.clone().unwrap_or_else(|| Store::state_dir().join("ringleader.log"));
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let target = std::fs::OpenOptions::new().create(true).append(true).open(&log_path);
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    match target {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("could not open log file {}: {e}; logging to stderr", log_path.display());
        }
    }
    builder.init();
}
