//! A GEMV micro-benchmark run by every worker of a distributed group.
//!
//! Each worker times a fixed amount of identical `alpha * (A @ B) + beta * C`
//! computations and reports the elapsed time, tagged with its rank, to a
//! shared log file and to stdout.

pub mod bench;
pub mod config;
pub mod error;
pub mod gemv;
pub mod report;
pub mod timer;

pub use config::{BenchConfig, LogMode};
pub use error::{BenchErr, Result};
