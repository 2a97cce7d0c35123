//! Output destinations
//!
//! A [`Destination`] is a shared handle around a writer. Sinks are keyed by
//! handle identity: two handles are the same destination only if one was
//! cloned from the other, no matter what they write to.

use super::error::{LoggerError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, OnceLock};

type SharedWriter = Arc<Mutex<dyn Write + Send>>;

#[derive(Clone)]
pub struct Destination {
    writer: SharedWriter,
    label: Arc<str>,
}

impl Destination {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self::labelled(writer, "writer")
    }

    fn labelled<W: Write + Send + 'static>(writer: W, label: &str) -> Self {
        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        Self {
            writer,
            label: Arc::from(label),
        }
    }

    /// Process standard output; every call returns the same destination
    pub fn stdout() -> Self {
        static STDOUT: OnceLock<Destination> = OnceLock::new();
        STDOUT
            .get_or_init(|| Self::labelled(io::stdout(), "stdout"))
            .clone()
    }

    /// Process standard error; every call returns the same destination
    pub fn stderr() -> Self {
        static STDERR: OnceLock<Destination> = OnceLock::new();
        STDERR
            .get_or_init(|| Self::labelled(io::stderr(), "stderr"))
            .clone()
    }

    /// Open `path` for appending, creating it if needed
    ///
    /// Output is buffered and flushed after every record.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rust_kvlog::Destination;
    ///
    /// let destination = Destination::file("/var/log/app.log").unwrap();
    /// ```
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "opening log file",
                    format!("cannot open {}", path.display()),
                    e,
                )
            })?;

        Ok(Self::labelled(
            BufWriter::new(file),
            &path.display().to_string(),
        ))
    }

    /// An in-memory destination and a reader for what gets written to it
    pub fn memory() -> (Self, MemoryBuffer) {
        let buffer = MemoryBuffer::new();
        (Self::labelled(buffer.clone(), "memory"), buffer)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// True if both handles refer to the same underlying writer
    pub fn same_as(&self, other: &Destination) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.writer), Arc::as_ptr(&other.writer))
    }

    /// Write one encoded record in a single call and flush it
    pub(crate) fn write_record(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(bytes)?;
        writer.flush()
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Growable in-memory writer shared between clones
///
/// # Example
///
/// ```
/// use rust_kvlog::{Broker, Destination, LogfmtFormatter};
///
/// let broker = Broker::new();
/// let (destination, buffer) = Destination::memory();
/// let sink = broker.sink_to(&destination, LogfmtFormatter::new());
/// sink.start();
///
/// broker.logger().log(["msg", "ready"]);
/// assert_eq!(buffer.contents(), "msg=ready\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }

    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_identity() {
        let (a, _) = Destination::memory();
        let (b, _) = Destination::memory();

        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
        assert!(Destination::stdout().same_as(&Destination::stdout()));
        assert!(!Destination::stdout().same_as(&Destination::stderr()));
    }

    #[test]
    fn test_write_record_reaches_buffer() {
        let (destination, buffer) = Destination::memory();
        destination.write_record(b"a=1\n").unwrap();
        destination.write_record(b"b=2\n").unwrap();

        assert_eq!(buffer.lines(), vec!["a=1", "b=2"]);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_file_destination_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");

        let destination = Destination::file(&path).unwrap();
        destination.write_record(b"first=1\n").unwrap();
        drop(destination);

        let destination = Destination::file(&path).unwrap();
        destination.write_record(b"second=2\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first=1\nsecond=2\n");
    }

    #[test]
    fn test_file_destination_open_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("app.log");

        let err = Destination::file(&path).unwrap_err();
        assert!(matches!(err, LoggerError::IoOperation { .. }));
    }
}
