//! Wall-clock timing of a unit of work, reported once per invocation.

use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use log::error;
use world::WorldContext;

use crate::{Result, report::ReportSink};

/// Amount of characters of the result kept in a report line.
pub const PREVIEW_CHARS: usize = 30;

/// Result text reported when the timed work never produced a result.
pub const ABORTED: &str = "<aborted>";

/// Shortens `result` for a report line.
///
/// # Returns
/// The first `PREVIEW_CHARS` characters followed by `...` if `result` is at
/// least that long, otherwise the whole `result` followed by a space.
pub fn preview(result: &str) -> String {
    let head: String = result.chars().take(PREVIEW_CHARS).collect();

    if result.chars().count() >= PREVIEW_CHARS {
        format!("{head}...")
    } else {
        format!("{head} ")
    }
}

/// The outcome of one timed invocation.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub rank: usize,
    pub name: &'a str,
    pub elapsed: Duration,
    pub result: &'a str,
}

impl Report<'_> {
    /// Renders the report as a log line, without the trailing newline.
    pub fn line(&self) -> String {
        format!(
            "RANK {} | {} took {:.6}s | {}",
            self.rank,
            self.name,
            self.elapsed.as_secs_f64(),
            preview(self.result)
        )
    }
}

/// Times `work` and records its report into `sink`.
///
/// The result is stringified before the clock stops.
///
/// # Arguments
/// * `ctx` - Identity of this process, tags the report.
/// * `name` - The operation name in the report.
/// * `sink` - Where the report line goes.
/// * `work` - The unit of work to time.
///
/// # Returns
/// The stringified result of `work`, or the sink's error.
pub fn timed<T, F>(ctx: WorldContext, name: &str, sink: &dyn ReportSink, work: F) -> Result<String>
where
    T: Display,
    F: FnOnce() -> T,
{
    let timer = ScopedTimer::start(ctx, name, sink);
    let result = work().to_string();
    timer.finish(result)
}

/// A running clock that reports when it goes out of scope.
///
/// `finish` records the report with the given result. A timer dropped
/// without `finish`, through an early return or a panic, still records its
/// report with `ABORTED` as the result.
pub struct ScopedTimer<'a> {
    ctx: WorldContext,
    name: &'a str,
    sink: &'a dyn ReportSink,
    start: Instant,
    reported: bool,
}

impl<'a> ScopedTimer<'a> {
    /// Starts the clock.
    pub fn start(ctx: WorldContext, name: &'a str, sink: &'a dyn ReportSink) -> Self {
        Self {
            ctx,
            name,
            sink,
            start: Instant::now(),
            reported: false,
        }
    }

    /// Stops the clock and records the report.
    ///
    /// # Arguments
    /// * `result` - The stringified result of the timed work.
    ///
    /// # Returns
    /// `result` back, or the sink's error.
    pub fn finish(mut self, result: String) -> Result<String> {
        let elapsed = self.start.elapsed();
        self.reported = true;
        let line = self.line(elapsed, &result);
        self.sink.record(&line)?;
        Ok(result)
    }

    fn line(&self, elapsed: Duration, result: &str) -> String {
        let report = Report {
            rank: self.ctx.rank(),
            name: self.name,
            elapsed,
            result,
        };

        report.line()
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        if self.reported {
            return;
        }

        let line = self.line(self.start.elapsed(), ABORTED);
        if let Err(e) = self.sink.record_aborted(&line) {
            error!(rank = self.ctx.rank(), operation = self.name; "failed to report aborted run: {e}");
        }
    }
}
