//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `mailreg_core` linkage.
//! - Given a database path, initialize it and report the first delivery page.
//!
//! Usage: `mailreg_cli [db_path] [log_dir]`. `log_dir` must be absolute and
//! defaults to `<temp dir>/mailreg-logs`.

use mailreg_core::{
    default_log_level, init_logging, open_db, SqliteEmailRepository, SubscriberService,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const PROBE_PAGE_SIZE: i64 = 100;
const DEFAULT_LOG_SUBDIR: &str = "mailreg-logs";

fn main() -> ExitCode {
    println!("mailreg_core ping={}", mailreg_core::ping());
    println!("mailreg_core version={}", mailreg_core::core_version());

    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        return ExitCode::SUCCESS;
    };
    let log_dir = resolve_log_dir(args.next());

    // Logging is best effort; the probe still runs without it.
    if let Err(err) = start_logging(&log_dir) {
        eprintln!("mailreg_core log_dir={} logging_error={err}", log_dir.display());
    }

    match probe_database(&db_path) {
        Ok(active) => {
            println!("mailreg_core db={db_path} active_first_page={active}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("mailreg_core db={db_path} error={err}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_log_dir(arg: Option<String>) -> PathBuf {
    arg.map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_SUBDIR))
}

fn start_logging(log_dir: &Path) -> Result<(), String> {
    init_logging(default_log_level(), &log_dir.to_string_lossy())
}

fn probe_database(db_path: &str) -> Result<usize, Box<dyn Error>> {
    let conn = open_db(db_path)?;
    let service = SubscriberService::new(SqliteEmailRepository::try_new(&conn)?);
    Ok(service.delivery_batch(1, PROBE_PAGE_SIZE)?.len())
}
