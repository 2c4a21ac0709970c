use std::{
    collections::BTreeSet,
    fs,
    net::TcpListener,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use regex::Regex;
use tempfile::TempDir;
use world::{Communicator, SoloWorld, TcpWorld, WorldContext};
use worker::{BenchConfig, LogMode, bench};

const TIMEOUT: Duration = Duration::from_secs(10);
const REPORT: &str = r"^RANK (\d+) \| GEMV took \d+\.\d{6}s \| .*$";
const HEADER: &str = r"^== (\d+) ranks, \d{2}:\d{2} \d{2}/\d{2}-\d{4} ==$";

fn config(log_path: PathBuf, log_mode: LogMode) -> BenchConfig {
    BenchConfig {
        iterations: NonZeroUsize::new(20).unwrap(),
        size: NonZeroUsize::new(32).unwrap(),
        seed: Some(1234),
        log_path,
        log_mode,
        ..BenchConfig::default()
    }
}

/// Runs the benchmark on `size` ranks, each on its own thread, over loopback tcp.
fn run_ranks(size: usize, config: BenchConfig) -> Vec<String> {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let config = Arc::new(config);

    let mut handles = Vec::with_capacity(size);

    let root_config = Arc::clone(&config);
    handles.push(thread::spawn(move || {
        let world = TcpWorld::coordinator(listener, size, TIMEOUT).unwrap();
        run_one(Box::new(world), &root_config)
    }));

    for rank in 1..size {
        let addr = addr.clone();
        let config = Arc::clone(&config);
        handles.push(thread::spawn(move || {
            let ctx = WorldContext::new(rank, size).unwrap();
            let world = TcpWorld::join(ctx, &addr, TIMEOUT).unwrap();
            run_one(Box::new(world), &config)
        }));
    }

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn run_one(mut world: Box<dyn Communicator>, config: &BenchConfig) -> String {
    let result = bench::run(world.as_mut(), config).unwrap();
    world.finalize().unwrap();
    result
}

/// Splits the log into header and report lines, checking every line is one or the other.
fn read_log(path: &Path) -> (Vec<usize>, Vec<usize>) {
    let header = Regex::new(HEADER).unwrap();
    let report = Regex::new(REPORT).unwrap();

    let mut headers = Vec::new();
    let mut reports = Vec::new();

    for line in fs::read_to_string(path).unwrap().lines() {
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = header.captures(line) {
            headers.push(caps[1].parse().unwrap());
        } else if let Some(caps) = report.captures(line) {
            reports.push(caps[1].parse().unwrap());
        } else {
            panic!("unexpected log line {line:?}");
        }
    }

    (headers, reports)
}

#[test]
fn four_ranks_gather_one_header_and_four_reports() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mpi_log.txt");

    let results = run_ranks(4, config(path.clone(), LogMode::Gather));
    assert_eq!(results.len(), 4);

    let (headers, reports) = read_log(&path);
    assert_eq!(headers, vec![4]);
    // Gathered reports land in rank order.
    assert_eq!(reports, vec![0, 1, 2, 3]);
}

#[test]
fn four_ranks_appending_on_their_own() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mpi_log.txt");

    run_ranks(4, config(path.clone(), LogMode::Append));

    let (headers, reports) = read_log(&path);
    assert_eq!(headers, vec![4]);

    let ranks: BTreeSet<_> = reports.iter().copied().collect();
    assert_eq!(reports.len(), 4);
    assert_eq!(ranks, (0..4).collect::<BTreeSet<_>>());
}

#[test]
fn sessions_accumulate_in_the_same_log() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mpi_log.txt");

    run_ranks(2, config(path.clone(), LogMode::Gather));
    run_ranks(3, config(path.clone(), LogMode::Gather));

    let (headers, reports) = read_log(&path);
    assert_eq!(headers, vec![2, 3]);
    assert_eq!(reports, vec![0, 1, 0, 1, 2]);
}

#[test]
fn header_is_preceded_by_a_blank_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mpi_log.txt");

    run_ranks(2, config(path.clone(), LogMode::Gather));

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("\n== 2 ranks, "));
}

#[test]
fn seeded_runs_are_reproducible() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path().join("mpi_log.txt"), LogMode::Gather);

    let first = bench::run(&mut SoloWorld::new(), &config).unwrap();
    let second = bench::run(&mut SoloWorld::new(), &config).unwrap();
    assert_eq!(first, second);

    let tcp = run_ranks(2, config.clone());
    assert_eq!(tcp[0], first);
    assert_ne!(tcp[1], first);
}

#[test]
fn result_is_the_flattened_vector() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path().join("mpi_log.txt"), LogMode::Append);
    config.size = NonZeroUsize::new(3).unwrap();

    let result = bench::run(&mut SoloWorld::new(), &config).unwrap();

    assert!(result.starts_with('[') && result.ends_with(']'));
    assert_eq!(result.split(", ").count(), 3);
}

#[test]
fn unwritable_log_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path().join("missing").join("mpi_log.txt"), LogMode::Gather);

    assert!(bench::run(&mut SoloWorld::new(), &config).is_err());
}
