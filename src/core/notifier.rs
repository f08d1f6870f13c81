/*
 * The user-facing half of error reporting. The session records every error
 * line itself; whether and how the user is told about it is decided by the
 * `UserNotifierOperations` implementation it was initialized with. Tests and
 * non-interactive embeddings use `SilentNotifier`; the desktop application
 * uses `MessageBoxNotifier`, optionally wrapped in `DebouncedNotifier`.
 */
use crate::platform_layer;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait UserNotifierOperations: Send + Sync {
    // May block the calling thread until the user acknowledges the message.
    fn notify_error(&self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MessageBoxNotifier;

impl UserNotifierOperations for MessageBoxNotifier {
    fn notify_error(&self, message: &str) {
        platform_layer::show_error_dialog(platform_layer::ERROR_DIALOG_TITLE, message);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl UserNotifierOperations for SilentNotifier {
    fn notify_error(&self, message: &str) {
        log::trace!("SilentNotifier: Suppressed user notification: {message}");
    }
}

/*
 * Forwards at most one notification per `window` to the wrapped notifier.
 * Suppressed messages are only traced; the caller still records them.
 */
pub struct DebouncedNotifier<N: UserNotifierOperations> {
    inner: N,
    window: Duration,
    last_shown: Mutex<Option<Instant>>,
}

impl<N: UserNotifierOperations> DebouncedNotifier<N> {
    pub fn new(inner: N, window: Duration) -> Self {
        DebouncedNotifier {
            inner,
            window,
            last_shown: Mutex::new(None),
        }
    }

    fn should_show(&self, now: Instant) -> bool {
        let mut last = self
            .last_shown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *last {
            Some(previous) if now.duration_since(previous) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl<N: UserNotifierOperations> UserNotifierOperations for DebouncedNotifier<N> {
    fn notify_error(&self, message: &str) {
        if self.should_show(Instant::now()) {
            self.inner.notify_error(message);
        } else {
            log::debug!("DebouncedNotifier: Suppressed repeated error dialog: {message}");
        }
    }
}

/*
 * Picks the notifier for a configuration: silent when dialogs are disabled,
 * a message box otherwise, debounced when a nonzero window is configured.
 */
pub fn notifier_for(show_dialogs: bool, debounce: Duration) -> Box<dyn UserNotifierOperations> {
    if !show_dialogs {
        return Box::new(SilentNotifier);
    }
    if debounce.is_zero() {
        Box::new(MessageBoxNotifier)
    } else {
        Box::new(DebouncedNotifier::new(MessageBoxNotifier, debounce))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::UserNotifierOperations;
    use std::sync::Mutex;

    // Records notifications instead of showing them.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl UserNotifierOperations for RecordingNotifier {
        fn notify_error(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    impl UserNotifierOperations for std::sync::Arc<RecordingNotifier> {
        fn notify_error(&self, message: &str) {
            self.as_ref().notify_error(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingNotifier;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_debounced_notifier_suppresses_within_window() {
        // Arrange
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier = DebouncedNotifier::new(recorder.clone(), Duration::from_secs(60));

        // Act
        notifier.notify_error("first");
        notifier.notify_error("second");
        notifier.notify_error("third");

        // Assert
        assert_eq!(recorder.messages(), vec!["first".to_string()]);
    }

    #[test]
    fn test_debounced_notifier_shows_again_after_window() {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier = DebouncedNotifier::new(recorder.clone(), Duration::from_millis(10));
        let start = Instant::now();

        assert!(notifier.should_show(start));
        assert!(!notifier.should_show(start + Duration::from_millis(5)));
        assert!(notifier.should_show(start + Duration::from_millis(20)));
    }

    #[test]
    fn test_zero_window_never_suppresses() {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier = DebouncedNotifier::new(recorder.clone(), Duration::ZERO);

        notifier.notify_error("a");
        notifier.notify_error("b");

        assert_eq!(recorder.messages().len(), 2);
    }
}
