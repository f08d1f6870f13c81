/*
 * The diagnostics session: one explicitly created object per process run that
 * every component which logs is handed (usually as `Arc<DiagnosticsSession>`).
 *
 * A session owns a freshly provisioned session folder and a registry of
 * per-thread sinks. The thread that initializes the session is the primary
 * thread: its sink is always named "Application" and its lines are mirrored to
 * the console. Any other thread gets a sink the first time it logs, named after
 * the platform thread name plus a discovery ordinal that only ever grows.
 *
 * Logging calls never fail outward. Problems writing a sink are reported to
 * the console fallback, not to another sink.
 */
use crate::core::clock;
use crate::core::config::DiagnosticsConfig;
use crate::core::console::{self, LineSeverity};
use crate::core::error::{DiagnosticsError, Result};
use crate::core::notifier::UserNotifierOperations;
use crate::core::session_folder;
use crate::core::thread_diagnostics::{DiagnosticsSummary, ThreadDiagnostics};
use crate::core::thread_key::ThreadKey;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;
use time::OffsetDateTime;

pub const PRIMARY_THREAD_NAME: &str = "Application";
const UNNAMED_THREAD_NAME: &str = "Thread";
pub const RELEASE_CONFIRMATION: &str = "Diagnostics manager released correctly.";
pub const DEFAULT_ASSERT_MESSAGE: &str = "Assertion failed";
const ERROR_LINE_PREFIX: &str = "Error: ";
const SINK_LOOKUP_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticsEvent {
    // The set of tracked sinks changed; `data()` returns something new.
    DataChanged,
}

pub trait DiagnosticsObserver: Send + Sync {
    fn on_diagnostics_event(&self, event: DiagnosticsEvent);
}

impl<F> DiagnosticsObserver for F
where
    F: Fn(DiagnosticsEvent) + Send + Sync,
{
    fn on_diagnostics_event(&self, event: DiagnosticsEvent) {
        self(event)
    }
}

struct SinkEntry {
    sequence: u64,
    sink: Arc<Mutex<ThreadDiagnostics>>,
}

#[derive(Default)]
struct SinkRegistry {
    sinks: HashMap<ThreadKey, SinkEntry>,
    // Non-primary threads discovered so far. Never reset, not even by release.
    discovered_threads: u64,
    next_sequence: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DiagnosticsSession {
    folder_path: PathBuf,
    created_at: OffsetDateTime,
    primary_thread: ThreadKey,
    mirror_console: bool,
    notifier: Box<dyn UserNotifierOperations>,
    registry: Mutex<SinkRegistry>,
    observers: RwLock<Vec<Arc<dyn DiagnosticsObserver>>>,
    first_error_code: AtomicI32,
}

impl DiagnosticsSession {
    /*
     * Starts a session under the directory `config` points at: the
     * `root_override` when set (created if missing), otherwise the per-user
     * data directory of `config.app_name`. The calling thread becomes the
     * primary thread. Fails when no session folder can be created; nothing
     * can be logged without one.
     */
    pub fn initialize(
        config: &DiagnosticsConfig,
        notifier: Box<dyn UserNotifierOperations>,
    ) -> Result<Self> {
        let root = config
            .sessions_root()
            .ok_or(DiagnosticsError::NoUserDataDirectory)?;
        if config.root_override.is_some() {
            fs::create_dir_all(&root)?;
        }
        Self::initialize_in(&root, config, notifier)
    }

    /*
     * Starts a session in an existing `root` directory. Stale sessions under
     * `root` are pruned first; then this run's folder is created and the
     * first line, naming the folder, is logged on the calling thread.
     */
    pub fn initialize_in(
        root: &Path,
        config: &DiagnosticsConfig,
        notifier: Box<dyn UserNotifierOperations>,
    ) -> Result<Self> {
        let created_at = clock::local_now();
        let folder_path = session_folder::provision_session_folder(root, created_at)?;

        let session = DiagnosticsSession {
            folder_path,
            created_at,
            primary_thread: ThreadKey::current(),
            mirror_console: config.mirror_console,
            notifier,
            registry: Mutex::new(SinkRegistry::default()),
            observers: RwLock::new(Vec::new()),
            first_error_code: AtomicI32::new(0),
        };
        log::info!(
            "DiagnosticsSession: Started session at {:?}",
            session.folder_path
        );
        session.log(&format!(
            "Diagnostics stored at path '{}'",
            session.folder_path.display()
        ));
        Ok(session)
    }

    pub fn folder_path(&self) -> &Path {
        &self.folder_path
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn is_primary_thread(&self) -> bool {
        ThreadKey::current() == self.primary_thread
    }

    // Records an informational line on the calling thread's sink.
    pub fn log(&self, message: &str) {
        self.log_internal(LineSeverity::Information, message, true);
    }

    /*
     * Tells the user about `message` (blocking, depending on the notifier)
     * and then records it as an error line.
     */
    pub fn log_error(&self, message: &str) {
        self.notify_user(message);
        self.record_error(message);
    }

    /*
     * Remembers `error_code` if it is the first nonzero code of the session,
     * then reports the message with the code appended in hex.
     */
    pub fn log_error_code(&self, error_code: i32, message: &str) {
        if error_code != 0 {
            let _ = self.first_error_code.compare_exchange(
                0,
                error_code,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        }
        self.log_error(&format!("{message} (code 0x{error_code:X})"));
    }

    // Records an error line without notifying the user.
    pub fn record_error(&self, message: &str) {
        self.log_internal(
            LineSeverity::Error,
            &format!("{ERROR_LINE_PREFIX}{message}"),
            true,
        );
    }

    // Notifies the user without recording anything.
    pub fn notify_user(&self, message: &str) {
        self.notifier.notify_error(message);
    }

    pub fn assert(&self, condition: bool) {
        self.assert_msg(condition, DEFAULT_ASSERT_MESSAGE);
    }

    pub fn assert_msg(&self, condition: bool, message: &str) {
        if !condition {
            self.log_error(message);
        }
    }

    pub fn first_error_code(&self) -> i32 {
        self.first_error_code.load(Ordering::SeqCst)
    }

    /*
     * Summaries of every tracked sink, in discovery order. The records are
     * copies; later logging does not change them.
     */
    pub fn data(&self) -> Vec<DiagnosticsSummary> {
        let mut entries: Vec<(u64, Arc<Mutex<ThreadDiagnostics>>)> = {
            let registry = lock(&self.registry);
            registry
                .sinks
                .values()
                .map(|entry| (entry.sequence, Arc::clone(&entry.sink)))
                .collect()
        };
        entries.sort_by_key(|(sequence, _)| *sequence);
        entries
            .into_iter()
            .map(|(sequence, sink)| {
                let sink = lock(&sink);
                sink.summary(sequence)
            })
            .collect()
    }

    pub fn subscribe(&self, observer: Arc<dyn DiagnosticsObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /*
     * Writes the release confirmation on the calling thread's sink, then
     * flushes and closes every sink and forgets them. The confirmation is the
     * releasing thread's last line. With no sinks tracked this does nothing,
     * so a repeated release does not bring a sink back just to confirm.
     */
    pub fn release(&self) {
        if lock(&self.registry).sinks.is_empty() {
            log::debug!("DiagnosticsSession: Release called with no sinks, nothing to do.");
            return;
        }

        // Not announced: a sink opened just for this line is drained below.
        self.log_internal(LineSeverity::Information, RELEASE_CONFIRMATION, false);

        let released: Vec<SinkEntry> = {
            let mut registry = lock(&self.registry);
            registry.sinks.drain().map(|(_, entry)| entry).collect()
        };
        let count = released.len();
        for entry in released {
            let mut sink = lock(&entry.sink);
            if let Err(e) = sink.release() {
                console::report_internal_failure(
                    &format!("failed to release sink '{}'", sink.name()),
                    &e,
                );
            }
        }
        log::debug!("DiagnosticsSession: Released {count} sink(s).");
    }

    /*
     * Writes `line` to the calling thread's sink. A sink looked up here can be
     * drained and closed by a concurrent `release` before its lock is taken;
     * such a sink is skipped and the lookup repeated, which opens a fresh one.
     */
    fn log_internal(&self, severity: LineSeverity, line: &str, announce_new_sink: bool) {
        let thread_key = ThreadKey::current();

        if self.mirror_console && thread_key == self.primary_thread {
            console::mirror_line(severity, line);
        }

        for _ in 0..SINK_LOOKUP_ATTEMPTS {
            let (sink, created) = match self.sink_for(thread_key) {
                Ok(found) => found,
                Err(e) => {
                    console::report_internal_failure(
                        &format!("failed to open sink for thread {thread_key}"),
                        &e,
                    );
                    return;
                }
            };

            if created && announce_new_sink {
                self.notify_observers(DiagnosticsEvent::DataChanged);
            }

            let mut sink = lock(&sink);
            if !sink.is_open() {
                log::debug!(
                    "DiagnosticsSession: Sink '{}' was released while in use, reopening.",
                    sink.name()
                );
                continue;
            }
            if let Err(e) = sink.log(line) {
                console::report_internal_failure(
                    &format!("failed to write to sink '{}'", sink.name()),
                    &e,
                );
            }
            return;
        }

        console::report_internal_failure(
            &format!("failed to record a line for thread {thread_key}"),
            &io::Error::new(
                io::ErrorKind::Interrupted,
                "sink kept being released while in use",
            ),
        );
    }

    /*
     * Looks up the calling thread's sink, creating it on first use. Lookup,
     * naming and insertion form one critical section so a thread key can
     * never end up with two sinks. The bool is true when the sink was created
     * by this call.
     */
    fn sink_for(&self, thread_key: ThreadKey) -> io::Result<(Arc<Mutex<ThreadDiagnostics>>, bool)> {
        let mut registry = lock(&self.registry);
        if let Some(entry) = registry.sinks.get(&thread_key) {
            return Ok((Arc::clone(&entry.sink), false));
        }

        let name = if thread_key == self.primary_thread {
            PRIMARY_THREAD_NAME.to_string()
        } else {
            registry.discovered_threads += 1;
            let current = thread::current();
            format!(
                "{} ({})",
                current.name().unwrap_or(UNNAMED_THREAD_NAME),
                registry.discovered_threads
            )
        };

        let mut sink = ThreadDiagnostics::new(name);
        sink.initialize(&self.folder_path, thread_key)?;
        let sink = Arc::new(Mutex::new(sink));

        let sequence = registry.next_sequence;
        registry.next_sequence += 1;
        registry.sinks.insert(
            thread_key,
            SinkEntry {
                sequence,
                sink: Arc::clone(&sink),
            },
        );
        Ok((sink, true))
    }

    // Runs with no session lock held, so observers may log.
    fn notify_observers(&self, event: DiagnosticsEvent) {
        let observers: Vec<Arc<dyn DiagnosticsObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_diagnostics_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notifier::SilentNotifier;
    use tempfile::tempdir;

    fn quiet_config() -> DiagnosticsConfig {
        DiagnosticsConfig {
            mirror_console: false,
            show_error_dialogs: false,
            ..DiagnosticsConfig::default()
        }
    }

    #[test]
    fn test_logging_recovers_from_poisoned_locks() {
        // Arrange
        let dir = tempdir().unwrap();
        let session = Arc::new(
            DiagnosticsSession::initialize_in(dir.path(), &quiet_config(), Box::new(SilentNotifier))
                .unwrap(),
        );
        let primary_sink = {
            let registry = lock(&session.registry);
            let entry = registry.sinks.values().next().unwrap();
            Arc::clone(&entry.sink)
        };

        // Act: panic while holding the registry lock, then the sink lock.
        let holder = Arc::clone(&session);
        let _ = thread::spawn(move || {
            let _registry = holder.registry.lock().unwrap();
            panic!("panicked while holding the registry");
        })
        .join();
        let sink_holder = Arc::clone(&primary_sink);
        let _ = thread::spawn(move || {
            let _sink = sink_holder.lock().unwrap();
            panic!("panicked while holding a sink");
        })
        .join();
        assert!(session.registry.is_poisoned());
        assert!(primary_sink.is_poisoned());

        session.log("after both panics");
        session.record_error("still recorded");

        // Assert
        let data = session.data();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].name, PRIMARY_THREAD_NAME);
        assert_eq!(data[0].lines_written, 3);
        let log_path = data[0].log_path.clone().unwrap();

        session.release();
        let contents = fs::read_to_string(log_path).unwrap();
        assert!(contents.contains("] after both panics"));
        assert!(contents.contains("] Error: still recorded"));
        assert!(session.data().is_empty());
    }
}
