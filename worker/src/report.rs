//! The shared append-only log and the sinks that feed it.

use std::{
    cell::RefCell,
    fmt::Display,
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, TimeZone};
use log::{debug, error, warn};
use world::Communicator;

use crate::{Result, config::LogMode};

pub const DEFAULT_LOG: &str = "mpi_log.txt";

/// `HH:MM DD/MM-YYYY`
pub const HEADER_TIME_FORMAT: &str = "%H:%M %d/%m-%Y";

/// Renders the session header, surrounding newlines included.
pub fn header_line<Tz>(size: usize, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("\n== {size} ranks, {} ==\n", now.format(HEADER_TIME_FORMAT))
}

/// Appends the session header for a world of `size` ranks, stamped with the local time.
pub fn write_header(path: &Path, size: usize) -> io::Result<()> {
    append(path, &header_line(size, &Local::now()))
}

/// Appends `line` and its newline with a single write.
pub fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut text = String::with_capacity(line.len() + 1);
    text.push_str(line);
    text.push('\n');
    append(path, &text)
}

fn append(path: &Path, text: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())
}

/// Destination of report lines.
pub trait ReportSink {
    /// Records one report line. Every line is also echoed to stdout.
    fn record(&self, line: &str) -> Result<()>;

    /// Records the line of a run that never finished.
    ///
    /// Nothing runs after an aborted run, so the line must reach the log here.
    fn record_aborted(&self, line: &str) -> Result<()> {
        self.record(line)
    }

    /// Collective, makes every recorded line of every rank reach the log.
    fn flush(&self, _world: &mut dyn Communicator) -> Result<()> {
        Ok(())
    }
}

/// Builds the sink for `mode` writing into `path`.
pub fn sink(mode: LogMode, path: &Path) -> Box<dyn ReportSink> {
    match mode {
        LogMode::Gather => Box::new(GatherSink::new(path)),
        LogMode::Append => Box::new(AppendSink::new(path)),
    }
}

/// Every rank appends its own lines to the shared log as they come.
///
/// Ranks are not coordinated, lines of different ranks land in whatever
/// order the filesystem serializes the appends.
pub struct AppendSink {
    path: PathBuf,
}

impl AppendSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for AppendSink {
    fn record(&self, line: &str) -> Result<()> {
        append_line(&self.path, line)?;
        println!("{line}");
        Ok(())
    }
}

/// Lines are echoed right away but only written to the log by rank 0, on `flush`.
pub struct GatherSink {
    path: PathBuf,
    pending: RefCell<Vec<String>>,
}

impl GatherSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending: RefCell::new(Vec::new()),
        }
    }
}

impl ReportSink for GatherSink {
    fn record(&self, line: &str) -> Result<()> {
        println!("{line}");
        self.pending.borrow_mut().push(line.to_string());
        Ok(())
    }

    /// The world may be unusable by now, this rank writes its line itself.
    fn record_aborted(&self, line: &str) -> Result<()> {
        println!("{line}");
        append_line(&self.path, line)?;
        Ok(())
    }

    fn flush(&self, world: &mut dyn Communicator) -> Result<()> {
        let local = self.pending.take().join("\n");

        let Some(chunks) = world.gather(local)? else {
            return Ok(());
        };

        let mut text = String::new();
        for line in chunks.iter().flat_map(|chunk| chunk.lines()) {
            text.push_str(line);
            text.push('\n');
        }

        debug!(ranks = chunks.len(); "writing gathered reports");
        if !text.is_empty() {
            append(&self.path, &text)?;
        }

        Ok(())
    }
}

impl Drop for GatherSink {
    fn drop(&mut self) {
        let pending = self.pending.take();
        if pending.is_empty() {
            return;
        }

        warn!(lines = pending.len(); "reports never flushed, writing them locally");
        for line in &pending {
            if let Err(e) = append_line(&self.path, line) {
                error!(path:? = self.path; "failed to write unflushed report: {e}");
            }
        }
    }
}
