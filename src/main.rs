use phd_persistence::{build_pool, PgFormProgressStore, PgFormSubmissionStore, PoolProvider};
use phd_tracker::cli::{self, Command, Outcome, USAGE};
use phd_tracker::config::AppConfig;
use phd_tracker::errors::AppError;
use phd_tracker::logging;

/// Carga la configuración y abre el pool; solo los comandos con store llegan aquí.
fn with_stores<F>(work: F) -> Result<Outcome, AppError>
    where F: FnOnce(&AppConfig, PoolProvider) -> Result<Outcome, AppError>
{
    let config = AppConfig::from_env()?;
    let db = &config.database;
    let provider = PoolProvider { pool: build_pool(&db.url, db.min_connections, db.max_connections)? };
    work(&config, provider)
}

fn main() {
    logging::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match cli::parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(e.exit_code());
        }
    };
    let outcome = match command {
        Command::Help => {
            println!("{USAGE}");
            return;
        }
        Command::Progress(cmd) => with_stores(|config, provider| {
            let mut store = PgFormProgressStore::new(provider);
            cli::run_progress(cmd, &mut store, config.retention_days)
        }),
        Command::Submission(cmd) => with_stores(|config, provider| {
            let mut store = PgFormSubmissionStore::new(provider).with_policy(config.transition_policy);
            cli::run_submission(cmd, &mut store)
        }),
    };
    match outcome {
        Ok(Outcome::Json(value)) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(5);
            }
        },
        Ok(Outcome::NotFound(msg)) => {
            eprintln!("{msg}");
            std::process::exit(4);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}
