//! Harness logging
//!
//! Every record at debug level and above is written to the trace file of the
//! scenario being run (`harness_<scenario>_output.txt`); records at or above
//! the console level are echoed to stderr as well. The protocol trace is
//! logged under the `protocol` target.

use chrono::Local;
use log::LevelFilter;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Log destination that can be switched from one file to the next
#[derive(Clone, Default)]
pub struct TraceSink {
    file: Arc<Mutex<Option<File>>>,
}

impl TraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send subsequent records to a fresh file at `path`
    pub fn redirect(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = File::create(path)?;
        let mut current = self.file.lock();
        if let Some(previous) = current.as_mut() {
            previous.flush()?;
        }
        *current = Some(file);
        Ok(())
    }

    /// Stop writing to the current file; records are discarded until the next redirect
    pub fn close(&self) -> io::Result<()> {
        if let Some(mut previous) = self.file.lock().take() {
            previous.flush()?;
        }
        Ok(())
    }
}

impl Write for TraceSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.lock().as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock().as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Install the global logger and return the sink it writes to
///
/// `RUST_LOG` still applies on top of the defaults.
pub fn init_logging(console: LevelFilter) -> anyhow::Result<TraceSink> {
    let sink = TraceSink::new();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Debug.max(console))
        .parse_default_env()
        .format(move |buf, record| {
            let line = format!(
                "{} [{:5}] {}: {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            );
            if record.level() <= console {
                eprintln!("{}", line);
            }
            writeln!(buf, "{}", line)
        })
        .target(env_logger::Target::Pipe(Box::new(sink.clone())))
        .try_init()?;
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_switches_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("harness_first_output.txt");
        let second = dir.path().join("harness_second_output.txt");

        let mut sink = TraceSink::new();
        // Discarded: no file yet
        sink.write_all(b"startup\n").unwrap();

        sink.redirect(&first).unwrap();
        sink.write_all(b"one\n").unwrap();
        sink.redirect(&second).unwrap();
        sink.write_all(b"two\n").unwrap();
        sink.close().unwrap();
        sink.write_all(b"after close\n").unwrap();

        assert_eq!(std::fs::read_to_string(first).unwrap(), "one\n");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "two\n");
    }

    #[test]
    fn test_clones_share_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness_shared_output.txt");
        let sink = TraceSink::new();
        let mut clone = sink.clone();
        sink.redirect(&path).unwrap();
        clone.write_all(b"shared\n").unwrap();
        clone.flush().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "shared\n");
    }
}
