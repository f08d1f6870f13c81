/*
 * Blocking modal notification used to surface diagnostics errors to the user.
 * On Windows this is a standard `MessageBoxW` with an OK button and the error
 * icon; it suspends the calling thread until dismissed. Other targets have no
 * native modal here and print the message to stderr instead.
 */

pub const ERROR_DIALOG_TITLE: &str = "Error";

#[cfg(target_os = "windows")]
pub fn show_error_dialog(title: &str, message: &str) {
    use windows::Win32::UI::WindowsAndMessaging::{MB_ICONERROR, MB_OK, MessageBoxW};
    use windows::core::HSTRING;

    log::trace!("MessageBox: Showing '{title}' dialog");
    // SAFETY: both strings are valid, NUL-terminated HSTRINGs for the whole call and
    // no owner window is passed.
    let result = unsafe {
        MessageBoxW(
            None,
            &HSTRING::from(message),
            &HSTRING::from(title),
            MB_OK | MB_ICONERROR,
        )
    };
    if result.0 == 0 {
        log::error!(
            "MessageBox: MessageBoxW failed: {:?}",
            windows::core::Error::from_win32()
        );
    }
}

#[cfg(not(target_os = "windows"))]
pub fn show_error_dialog(title: &str, message: &str) {
    use std::io::Write;

    log::trace!("MessageBox: No native dialog on this platform, writing '{title}' to stderr");
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "[{title}] {message}");
}
