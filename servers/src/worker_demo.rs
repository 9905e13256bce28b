//! # Worker Demo
//!
//! A host process that emits through every destination: console, tracker,
//! the leveled `log` facade (rendered by `env_logger`) and the diagnostic
//! channel. Point `STREAMLOG_TRACKER_URI` at a running `server_tracker` to
//! see the tracker messages arrive there; without it they are echoed locally.

use anyhow::Result;
use clap::Parser;
use static_init::dynamic;

use lib_streamlog::{log_at, ods_log, ods_lognlf};

// load .env files before anything else
#[dynamic]
static DOTENV_INIT: () = {
    let dotenv_os: &str = if cfg!(target_os = "windows") {
        ".env.windows"
    } else {
        ".env.linux"
    };
    dotenvy::dotenv().ok();
    dotenvy::from_filename(dotenv_os).ok();
};

#[derive(Parser, Debug, Clone)]
#[clap(about = "Emits sample messages through every streamlog destination", version)]
struct Args {
    #[clap(long, env = "WORKER_ROUNDS", default_value_t = 3, help = "Number of simulated training rounds.")]
    rounds: u32,
}

/// Simulated training error for `round`; defined for every `u32`.
fn train_error(round: u32) -> f64 {
    1.0 / (f64::from(round) + 2.0)
}

fn main() -> Result<()> {
    let _ = &*DOTENV_INIT;
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = lib_streamlog::init_from_env() {
        log::error!("invalid logging configuration, keeping defaults: {}", e);
    }
    let router = lib_streamlog::router();
    log::info!("{}", router.config());

    ods_log!("worker {} starting", std::process::id());

    log_at!(CONSOLE).append("value=").append(42);

    for round in 0..args.rounds {
        let error = train_error(round);
        ods_lognlf!(".");
        log_at!(TRACKER)
            .append('[')
            .append(round)
            .append("]\ttrain-error:")
            .append(format_args!("{:.6}", error));
    }
    ods_log!("");

    log_at!(INFO, "finished {} rounds", args.rounds);
    if args.rounds == 0 {
        log_at!(WARNING).append("nothing was trained");
    }
    Ok(())
}
