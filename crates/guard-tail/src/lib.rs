//! # guard-tail
//!
//! Rotation-safe tailing of live log files.
//!
//! [`LogTailer`] produces an unending sequence of complete text lines from a
//! watched file, in the spirit of `tail -F`:
//!
//! - the file is opened at its current end, so historical content is never
//!   replayed
//! - a change of file identity (device + inode) is treated as rotation: the
//!   old handle is closed and the new file is opened at its end
//! - a missing file or a read error is retried on a fixed coarse interval
//!   and never surfaces to the caller; the open handle and its position are
//!   kept across errors, so only rotation ever resets the read position
//! - lines are decoded lossily, so bytes that are not valid UTF-8 cannot
//!   stall or desynchronize the stream
//!
//! The sequence never terminates normally; the process is expected to run
//! until externally stopped.
//!
//! ## Known limitation
//!
//! At a rotation boundary, a line written in the narrow gap between the
//! identity check and the reopen may be skipped. This is a documented
//! best-effort bound, accepted in exchange for never replaying or
//! duplicating lines.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, trace};

/// File identity used for rotation detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId {
    dev: u64,
    ino: u64,
}

#[derive(Debug)]
struct OpenFile {
    reader: BufReader<File>,
    id: FileId,
}

/// Tails one log file, yielding complete lines forever.
///
/// Construction performs no I/O; the file may not exist yet.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    open: Option<OpenFile>,
    /// Partial line bytes carried across polls until the newline arrives.
    pending: Vec<u8>,
    /// Sleep between polls when no new data is available.
    poll_interval: Duration,
    /// Sleep after a missing file or read error.
    retry_interval: Duration,
}

impl LogTailer {
    /// Creates a tailer for the given path with default intervals
    /// (500ms idle poll, 1s error retry).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_intervals(path, Duration::from_millis(500), Duration::from_secs(1))
    }

    /// Creates a tailer with explicit poll and retry intervals.
    #[must_use]
    pub fn with_intervals(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            open: None,
            pending: Vec::new(),
            poll_interval,
            retry_interval,
        }
    }

    /// The watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the next complete line, waiting as long as necessary.
    ///
    /// Never fails and never ends: missing files and read errors are
    /// retried internally on the configured intervals. An error leaves the
    /// open handle and any buffered partial line in place, so already
    /// written lines are still delivered once the retry succeeds.
    pub async fn next_line(&mut self) -> String {
        loop {
            match self.poll() {
                Ok(Some(line)) => return line,
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(err) => {
                    trace!(path = %self.path.display(), error = %err, "tail poll failed, retrying");
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }

    /// One poll step: refresh file identity, then try to read one line.
    fn poll(&mut self) -> io::Result<Option<String>> {
        self.check_identity()?;
        self.read_complete_line()
    }

    /// Detects identity changes and (re)opens the file at its end.
    ///
    /// When the path has vanished mid-rotation but a handle is still open,
    /// the handle is kept and drained until the new file appears.
    fn check_identity(&mut self) -> io::Result<()> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(err) if self.open.is_some() => {
                trace!(path = %self.path.display(), error = %err, "path unavailable, draining open handle");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let id = FileId {
            dev: metadata.dev(),
            ino: metadata.ino(),
        };

        let needs_open = self.open.as_ref().is_none_or(|open| open.id != id);
        if needs_open {
            if self.open.is_some() {
                debug!(path = %self.path.display(), "file identity changed, reopening");
            }
            let mut file = File::open(&self.path)?;
            file.seek(SeekFrom::End(0))?;
            self.open = Some(OpenFile {
                reader: BufReader::new(file),
                id,
            });
            self.pending.clear();
        }
        Ok(())
    }

    /// Reads available bytes; emits a line only once its newline arrived.
    ///
    /// Reads raw bytes and decodes lossily, so invalid UTF-8 in the log
    /// cannot fail the read or lose position.
    fn read_complete_line(&mut self) -> io::Result<Option<String>> {
        let Some(open) = self.open.as_mut() else {
            return Ok(None);
        };

        let read = open.reader.read_until(b'\n', &mut self.pending)?;
        if read == 0 {
            return Ok(None);
        }

        if self.pending.last() != Some(&b'\n') {
            // Writer is mid-line; wait for the rest.
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        self.pending.clear();
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_tailer(path: &Path) -> LogTailer {
        LogTailer::with_intervals(path, Duration::from_millis(5), Duration::from_millis(5))
    }

    fn append(path: &Path, text: &str) {
        append_bytes(path, text.as_bytes());
    }

    fn append_bytes(path: &Path, bytes: &[u8]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("open for append");
        file.write_all(bytes).expect("write");
        file.flush().expect("flush");
    }

    async fn expect_line(tailer: &mut LogTailer) -> String {
        timeout(WAIT, tailer.next_line()).await.expect("line in time")
    }

    #[tokio::test]
    async fn reads_lines_appended_after_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.log");
        append(&path, "historical line\n");

        let mut tailer = fast_tailer(&path);
        // First poll opens at EOF; the historical line is never replayed.
        let reader = tokio::spawn(async move {
            let line = tailer.next_line().await;
            (line, tailer)
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "fresh line\n");

        let (line, mut tailer) = timeout(WAIT, reader).await.expect("join in time").expect("join");
        assert_eq!(line, "fresh line");

        append(&path, "second line\n");
        assert_eq!(expect_line(&mut tailer).await, "second line");
    }

    #[tokio::test]
    async fn survives_rotation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.log");
        append(&path, "");

        let mut tailer = fast_tailer(&path);
        let reader = tokio::spawn(async move {
            let line = tailer.next_line().await;
            (line, tailer)
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "before rotation\n");
        let (line, mut tailer) = timeout(WAIT, reader).await.expect("join in time").expect("join");
        assert_eq!(line, "before rotation");

        // Rotate: move the file aside and start a new one at the same path.
        std::fs::rename(&path, dir.path().join("auth.log.1")).expect("rename");
        append(&path, "");

        // Give the tailer a chance to notice the new identity, then write.
        let reader = tokio::spawn(async move {
            let line = tailer.next_line().await;
            (line, tailer)
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&path, "after rotation\n");

        let (line, _tailer) = timeout(WAIT, reader).await.expect("join in time").expect("join");
        assert_eq!(line, "after rotation");
    }

    #[tokio::test]
    async fn waits_for_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("not-yet.log");

        let mut tailer = fast_tailer(&path);
        let reader = tokio::spawn(async move { tailer.next_line().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "");
        // Let the tailer open the (empty) file before the payload arrives,
        // since the first open seeks to end of file.
        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&path, "finally\n");

        let line = timeout(WAIT, reader).await.expect("line in time").expect("join");
        assert_eq!(line, "finally");
    }

    #[tokio::test]
    async fn partial_line_held_until_complete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.log");
        append(&path, "");

        let mut tailer = fast_tailer(&path);
        let reader = tokio::spawn(async move {
            let line = tailer.next_line().await;
            (line, tailer)
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        append(&path, "half a ");
        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "line\n");

        let (line, _tailer) = timeout(WAIT, reader).await.expect("join in time").expect("join");
        assert_eq!(line, "half a line");
    }

    #[tokio::test]
    async fn consecutive_lines_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.log");
        append(&path, "");

        let mut tailer = fast_tailer(&path);
        let reader = tokio::spawn(async move {
            let first = tailer.next_line().await;
            let second = tailer.next_line().await;
            let third = tailer.next_line().await;
            vec![first, second, third]
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "one\ntwo\nthree\n");

        let lines = timeout(WAIT, reader).await.expect("lines in time").expect("join");
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_drop_following_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.log");
        append(&path, "");

        let mut tailer = fast_tailer(&path);
        let reader = tokio::spawn(async move {
            let first = tailer.next_line().await;
            let second = tailer.next_line().await;
            (first, second)
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        append_bytes(&path, b"\xff\xfe garbage\n");
        append(&path, "good line\n");

        let (first, second) = timeout(WAIT, reader).await.expect("lines in time").expect("join");
        // The undecodable line is delivered lossily and the next line is
        // never skipped.
        assert!(first.contains("garbage"));
        assert_eq!(second, "good line");
    }

    #[tokio::test]
    async fn renamed_file_drained_until_replacement_appears() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.log");
        append(&path, "");

        let mut tailer = fast_tailer(&path);
        let reader = tokio::spawn(async move {
            let line = tailer.next_line().await;
            (line, tailer)
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "opener\n");
        let (line, mut tailer) =
            timeout(WAIT, reader).await.expect("join in time").expect("join");
        assert_eq!(line, "opener");

        // Rotate the file away without creating a replacement; lines still
        // landing in the old inode must be delivered from the open handle.
        let rotated = dir.path().join("auth.log.1");
        std::fs::rename(&path, &rotated).expect("rename");
        append(&rotated, "written after rename\n");

        assert_eq!(expect_line(&mut tailer).await, "written after rename");
    }

    #[test]
    fn construction_does_no_io() {
        let tailer = LogTailer::new("/definitely/not/a/real/path.log");
        assert_eq!(tailer.path(), Path::new("/definitely/not/a/real/path.log"));
    }
}
