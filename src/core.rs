/*
 * This module consolidates the platform-agnostic diagnostics logic of the
 * application: the explicitly owned `DiagnosticsSession`, the per-thread sinks
 * it manages, session-folder provisioning, configuration and the seams
 * (`UserNotifierOperations`, `ConfigManagerOperations`, `DiagnosticsObserver`)
 * used to swap behavior in tests and non-interactive embeddings.
 */
pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod notifier;
pub mod path_utils;
pub mod session_folder;
pub mod session_manager;
pub mod thread_diagnostics;
pub mod thread_key;


pub use config::{ConfigManagerOperations, CoreConfigManager, DEFAULT_APP_NAME, DiagnosticsConfig};
pub use notifier::notifier_for;
pub use session_manager::{DiagnosticsEvent, DiagnosticsSession};

#[cfg(test)]
pub use notifier::SilentNotifier;

#[cfg(test)]
pub use thread_diagnostics::DiagnosticsSummary;
