// src/main.rs

mod core;
mod platform_layer;

use crate::core::{
    ConfigManagerOperations, CoreConfigManager, DEFAULT_APP_NAME, DiagnosticsConfig,
    DiagnosticsEvent, DiagnosticsSession, notifier_for,
};
use simplelog::{ColorChoice, CombinedLogger, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::{self, File};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

const INTERNAL_LOG_FILENAME: &str = "internal-trace.txt";
const WORKER_COUNT: usize = 2;

/*
 * Loads the diagnostics configuration, falling back to defaults when the file
 * is unreadable. There is no logger yet, so problems go to stderr.
 */
fn load_config() -> DiagnosticsConfig {
    match CoreConfigManager::new().load_config(DEFAULT_APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not load diagnostics configuration, using defaults: {e}");
            DiagnosticsConfig::default()
        }
    }
}

/*
 * Opens the internal trace file in the sessions root, next to the session
 * folders. Needs no session, so it exists before provisioning starts.
 */
fn open_internal_trace(config: &DiagnosticsConfig) -> Option<File> {
    let root = config.sessions_root()?;
    let opened = fs::create_dir_all(&root).and_then(|()| File::create(root.join(INTERNAL_LOG_FILENAME)));
    match opened {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Could not create internal trace file in {root:?}: {e}");
            None
        }
    }
}

/*
 * Installs the `log` backend for the crate's own messages: the terminal plus
 * the internal trace file. Must run before the session is initialized, or
 * provisioning messages (stale folders that could not be removed) are lost.
 */
fn init_internal_logging(config: &DiagnosticsConfig) {
    let level = config.level_filter();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(file) = open_internal_trace(config) {
        loggers.push(WriteLogger::new(level, simplelog::Config::default(), file));
    }
    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("Could not install logger: {e}");
    }
}

// Maps the session's first error code onto a process exit status byte.
fn exit_status_for(first_error_code: i32) -> u8 {
    if first_error_code == 0 {
        return 0;
    }
    match (first_error_code & 0xFF) as u8 {
        0 => 1,
        low => low,
    }
}

fn main() -> ExitCode {
    let config = load_config();
    init_internal_logging(&config);
    let notifier = notifier_for(config.show_error_dialogs, config.error_dialog_debounce());

    let session = match DiagnosticsSession::initialize(&config, notifier) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            log::error!("main: Failed to start diagnostics session: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "main: Diagnostics session started at {} (primary thread: {})",
        session.created_at(),
        session.is_primary_thread()
    );

    session.subscribe(Arc::new(|event: DiagnosticsEvent| {
        log::debug!("main: Diagnostics event {event:?}");
    }));

    session.log("a");
    let workers: Vec<_> = (1..=WORKER_COUNT)
        .map(|i| {
            let session = Arc::clone(&session);
            thread::Builder::new()
                .name(format!("Conversion {i}"))
                .spawn(move || session.log("b"))
        })
        .collect();
    for worker in workers {
        match worker {
            Ok(handle) => {
                if handle.join().is_err() {
                    session.record_error("A conversion worker panicked");
                }
            }
            Err(e) => session.log_error_code(
                e.raw_os_error().unwrap_or(-1),
                &format!("Could not start conversion worker: {e}"),
            ),
        }
    }

    let data = session.data();
    session.assert(!data.is_empty());
    session.assert_msg(
        data.len() == WORKER_COUNT + 1,
        "Expected one diagnostics sink per conversion thread",
    );

    for summary in &data {
        log::info!(
            "main: Sink '{}' wrote {} line(s) to {:?}",
            summary.name,
            summary.lines_written,
            summary.log_path
        );
    }

    session.release();
    ExitCode::from(exit_status_for(session.first_error_code()))
}
