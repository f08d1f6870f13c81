/*
 * The per-thread diagnostic sink. Each logical thread that logs gets one
 * `ThreadDiagnostics`, which owns a log file inside the session folder and
 * appends timestamped lines to it. Only the owning thread appends; the session
 * manager touches a sink from another thread solely to read its summary or to
 * release it.
 *
 * Lifecycle: `new(name)` -> `initialize(folder, thread_key)` -> `log(..)`* ->
 * `release()`. Logging before `initialize` or after `release` is an error the
 * caller reports through its console fallback.
 */
use crate::core::clock;
use crate::core::path_utils;
use crate::core::thread_key::ThreadKey;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

const LOG_FILE_EXTENSION: &str = "log";

/*
 * Point-in-time description of a sink, handed to observers and UI layers
 * instead of the sink itself.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsSummary {
    pub name: String,
    pub thread_key: Option<ThreadKey>,
    pub sequence: u64,
    pub log_path: Option<PathBuf>,
    pub lines_written: usize,
    pub is_open: bool,
}

#[derive(Debug)]
pub struct ThreadDiagnostics {
    name: String,
    thread_key: Option<ThreadKey>,
    log_path: Option<PathBuf>,
    writer: Option<LineWriter<File>>,
    lines_written: usize,
}

impl ThreadDiagnostics {
    pub fn new(name: impl Into<String>) -> Self {
        ThreadDiagnostics {
            name: name.into(),
            thread_key: None,
            log_path: None,
            writer: None,
            lines_written: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /*
     * Opens the backing file `<sanitized name>.log` in `folder` and writes the
     * header line. The file is created with `create_new`, falling through to
     * `name (n).log` if a sink of the same name already left a file behind
     * (e.g. the primary sink re-created after a release).
     */
    pub fn initialize(&mut self, folder: &Path, thread_key: ThreadKey) -> io::Result<()> {
        let base = folder.join(format!(
            "{}.{LOG_FILE_EXTENSION}",
            path_utils::sanitize_file_name(&self.name)
        ));

        let mut index = 0;
        let (path, file) = loop {
            let candidate = path_utils::numbered_variant(&base, index);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(file) => break (candidate, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => index += 1,
                Err(e) => return Err(e),
            }
        };

        log::debug!(
            "ThreadDiagnostics: Opened sink '{}' for thread {thread_key} at {path:?}",
            self.name
        );
        self.thread_key = Some(thread_key);
        self.log_path = Some(path);
        self.writer = Some(LineWriter::new(file));

        let header = format!("Diagnostics for '{}' (thread {thread_key})", self.name);
        self.write_line(&header)
    }

    // Appends one timestamped line.
    pub fn log(&mut self, text: &str) -> io::Result<()> {
        self.write_line(text)?;
        self.lines_written += 1;
        Ok(())
    }

    /*
     * Flushes buffered output, syncs the file to disk and closes it. Releasing
     * an already closed sink is a no-op.
     */
    pub fn release(&mut self) -> io::Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush()?;
        writer.get_ref().sync_all()?;
        log::trace!("ThreadDiagnostics: Released sink '{}'", self.name);
        Ok(())
    }

    pub fn summary(&self, sequence: u64) -> DiagnosticsSummary {
        DiagnosticsSummary {
            name: self.name.clone(),
            thread_key: self.thread_key,
            sequence,
            log_path: self.log_path.clone(),
            lines_written: self.lines_written,
            is_open: self.is_open(),
        }
    }

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("sink '{}' is not open", self.name),
            )
        })?;
        let stamp = clock::format_line_timestamp(clock::local_now());
        // One write per line so a line never straddles two buffer flushes.
        let line = format!("[{stamp}] {text}\n");
        writer.write_all(line.as_bytes())
    }
}

impl Drop for ThreadDiagnostics {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!(
                "ThreadDiagnostics: Failed to release sink '{}' on drop: {e}",
                self.name
            );
        }
    }
}
