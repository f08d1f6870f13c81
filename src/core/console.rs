/*
 * Console side of the diagnostics session: the primary thread's lines are
 * echoed to stdout (informational) or stderr (errors) in a color matching the
 * line's severity, and internal failures of the diagnostics machinery itself
 * are reported here instead of being routed back into a sink.
 */
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSeverity {
    Information,
    Error,
}

impl LineSeverity {
    fn color(self) -> Color {
        match self {
            LineSeverity::Information => Color::White,
            LineSeverity::Error => Color::Red,
        }
    }
}

/*
 * Writes `line` to `out` wrapped in a foreground color change and a reset.
 */
pub fn write_colored_line<W: Write>(out: &mut W, severity: LineSeverity, line: &str) -> io::Result<()> {
    queue!(
        out,
        SetForegroundColor(severity.color()),
        Print(line),
        ResetColor,
        Print("\n")
    )?;
    out.flush()
}

/*
 * Echoes a primary-thread line to the console. Errors go to stderr.
 */
pub fn mirror_line(severity: LineSeverity, line: &str) {
    let result = match severity {
        LineSeverity::Information => write_colored_line(&mut io::stdout().lock(), severity, line),
        LineSeverity::Error => write_colored_line(&mut io::stderr().lock(), severity, line),
    };
    if let Err(e) = result {
        log::warn!("Console: Failed to mirror diagnostics line: {e}");
    }
}

/*
 * Last-resort reporting for failures inside the diagnostics session. Must not
 * call back into the session.
 */
pub fn report_internal_failure(context: &str, error: &dyn std::error::Error) {
    log::error!("Diagnostics: {context}: {error}");
    let mut err = io::stderr().lock();
    // Nothing left to report a failed stderr write to.
    let _ = writeln!(err, "[diagnostics] {context}: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_colored_line_wraps_text_in_color_and_reset() {
        // Arrange
        let mut buffer: Vec<u8> = Vec::new();

        // Act
        write_colored_line(&mut buffer, LineSeverity::Error, "Error: disk full").unwrap();

        // Assert
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Error: disk full"));
        assert!(text.ends_with('\n'));
        #[cfg(not(windows))]
        assert!(
            text.starts_with("\u{1b}["),
            "expected a color escape before the text: {text:?}"
        );
    }

    #[test]
    fn test_severities_use_distinct_colors() {
        assert_ne!(LineSeverity::Information.color(), LineSeverity::Error.color());
    }
}
