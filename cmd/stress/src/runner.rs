//! Stress runner: drives producers and consumers against one buffer and
//! checks what came out against what went in.

use std::path::Path;
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use anyhow::{Context, Result};
use boundbuf::{BlockBuffer, Done, PutTimeoutError, TakeTimeoutError, TryPutError, TryTakeError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Mode, StressConfig};

/// At most this many violations are listed individually in a report.
const MAX_LISTED_VIOLATIONS: usize = 20;

/// Payload moved through the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub producer: usize,
    pub seq: u64,
}

/// Counters kept by one producer thread.
#[derive(Debug, Default)]
struct ProducerStats {
    accepted: u64,
    timeouts: u64,
    would_block: u64,
}

/// Everything one consumer thread took, in the order it took it.
#[derive(Debug, Default)]
struct ConsumerLog {
    items: Vec<Item>,
    timeouts: u64,
    would_block: u64,
    max_len_seen: usize,
}

/// Outcome of a stress run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: String,
    pub config: StressConfig,
    pub elapsed_ms: u64,
    /// Items the buffer accepted.
    pub accepted: u64,
    /// Items consumers took.
    pub received: u64,
    /// Items never accepted because the buffer closed first.
    pub rejected: u64,
    pub timeouts: u64,
    pub would_block: u64,
    pub max_len_seen: usize,
    /// The deadline elapsed and the buffer was force-closed.
    pub stalled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

impl Report {
    /// Returns true if the run finished in time with no violations.
    pub fn ok(&self) -> bool {
        !self.stalled && self.violations.is_empty()
    }
}

/// Runs one stress pass with the given configuration.
pub fn run(cfg: &StressConfig) -> Result<Report> {
    cfg.validate()?;

    let buf = BlockBuffer::<Item>::new(cfg.capacity)?;
    let finished = BlockBuffer::<()>::new(1)?;

    info!(
        capacity = cfg.capacity,
        producers = cfg.producers,
        consumers = cfg.consumers,
        items = cfg.total_items(),
        mode = ?cfg.mode,
        "stress run starting"
    );

    let start = Instant::now();
    let (producers, consumers, stalled) = thread::scope(|s| {
        let watchdog = s.spawn(|| match finished.take_timeout(cfg.deadline()) {
            Err(TakeTimeoutError::Timeout) => {
                warn!(deadline_secs = cfg.deadline_secs, "deadline elapsed, closing buffer");
                buf.close();
                true
            }
            _ => false,
        });

        let consumers: Vec<_> = (0..cfg.consumers)
            .map(|id| {
                let buf = &buf;
                s.spawn(move || consume(id, buf, cfg))
            })
            .collect();

        let producers: Vec<_> = (0..cfg.producers)
            .map(|id| {
                let buf = &buf;
                s.spawn(move || produce(id, buf, cfg))
            })
            .collect();

        // Join everything before reporting a panic; an early return here
        // would leave the scope waiting on threads nobody will close for.
        let producers = join_all(producers, "producer");
        buf.close();
        let consumers = join_all(consumers, "consumer");
        finished.close();
        let stalled = watchdog.join().unwrap_or(true);

        (producers, consumers, stalled)
    });
    let elapsed = start.elapsed();

    let producers = producers?;
    let consumers = consumers?;

    let accepted: Vec<u64> = producers.iter().map(|p| p.accepted).collect();
    let violations = verify(cfg, &accepted, &consumers);

    let total_accepted: u64 = accepted.iter().sum();
    let received = consumers.iter().map(|c| c.items.len() as u64).sum();
    let report = Report {
        timestamp: Utc::now().to_rfc3339(),
        config: cfg.clone(),
        elapsed_ms: elapsed.as_millis() as u64,
        accepted: total_accepted,
        received,
        rejected: cfg.total_items() - total_accepted,
        timeouts: producers.iter().map(|p| p.timeouts).sum::<u64>()
            + consumers.iter().map(|c| c.timeouts).sum::<u64>(),
        would_block: producers.iter().map(|p| p.would_block).sum::<u64>()
            + consumers.iter().map(|c| c.would_block).sum::<u64>(),
        max_len_seen: consumers.iter().map(|c| c.max_len_seen).max().unwrap_or(0),
        stalled,
        violations,
    };

    info!(
        elapsed_ms = report.elapsed_ms,
        accepted = report.accepted,
        received = report.received,
        violations = report.violations.len(),
        "stress run finished"
    );
    Ok(report)
}

fn join_all<T>(handles: Vec<ScopedJoinHandle<'_, T>>, role: &str) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(handles.len());
    let mut panicked = 0;
    for handle in handles {
        match handle.join() {
            Ok(v) => out.push(v),
            Err(_) => panicked += 1,
        }
    }
    if panicked > 0 {
        anyhow::bail!("{} {} thread(s) panicked", panicked, role);
    }
    Ok(out)
}

fn produce(id: usize, buf: &BlockBuffer<Item>, cfg: &StressConfig) -> ProducerStats {
    let mut stats = ProducerStats::default();

    for seq in 0..cfg.items_per_producer {
        let item = Item { producer: id, seq };
        if !put_one(buf, item, cfg, &mut stats) {
            debug!(producer = id, seq, "buffer closed, producer stopping");
            break;
        }
        stats.accepted += 1;
    }

    debug!(producer = id, accepted = stats.accepted, "producer done");
    stats
}

/// Puts one item using the configured mode. Returns false once the buffer
/// is closed.
fn put_one(
    buf: &BlockBuffer<Item>,
    mut item: Item,
    cfg: &StressConfig,
    stats: &mut ProducerStats,
) -> bool {
    match cfg.mode {
        Mode::Blocking => buf.put(item).is_ok(),
        Mode::Timed => loop {
            match buf.put_timeout(item, cfg.op_timeout()) {
                Ok(()) => return true,
                Err(PutTimeoutError::Timeout(v)) => {
                    stats.timeouts += 1;
                    item = v;
                }
                Err(PutTimeoutError::Closed(_)) => return false,
            }
        },
        Mode::Try => loop {
            match buf.try_put(item) {
                Ok(()) => return true,
                Err(TryPutError::Full(v)) => {
                    stats.would_block += 1;
                    item = v;
                    thread::yield_now();
                }
                Err(TryPutError::Closed(_)) => return false,
            }
        },
    }
}

fn consume(id: usize, buf: &BlockBuffer<Item>, cfg: &StressConfig) -> ConsumerLog {
    let mut log = ConsumerLog::default();

    loop {
        log.max_len_seen = log.max_len_seen.max(buf.len());

        let item = match cfg.mode {
            Mode::Blocking => match buf.take() {
                Ok(item) => item,
                Err(Done) => break,
            },
            Mode::Timed => match buf.take_timeout(cfg.op_timeout()) {
                Ok(item) => item,
                Err(TakeTimeoutError::Timeout) => {
                    log.timeouts += 1;
                    continue;
                }
                Err(TakeTimeoutError::Done) => break,
            },
            Mode::Try => match buf.try_take() {
                Ok(item) => item,
                Err(TryTakeError::Empty) => {
                    log.would_block += 1;
                    thread::yield_now();
                    continue;
                }
                Err(TryTakeError::Done) => break,
            },
        };
        log.items.push(item);
    }

    debug!(consumer = id, received = log.items.len(), "consumer done");
    log
}

/// Checks consumer logs against what producers report as accepted.
///
/// Producers put `seq` in increasing order and stop at the first rejection,
/// so producer `p` had exactly `0..accepted[p]` accepted.
fn verify(cfg: &StressConfig, accepted: &[u64], logs: &[ConsumerLog]) -> Vec<String> {
    let mut violations = Vec::new();
    let mut omitted = 0usize;
    let mut report = |msg: String| {
        if violations.len() < MAX_LISTED_VIOLATIONS {
            violations.push(msg);
        } else {
            omitted += 1;
        }
    };

    let mut counts: Vec<Vec<u32>> = accepted.iter().map(|&n| vec![0; n as usize]).collect();

    for (consumer, log) in logs.iter().enumerate() {
        let mut last_seq: Vec<Option<u64>> = vec![None; accepted.len()];

        for item in &log.items {
            let Some(slots) = counts.get_mut(item.producer) else {
                report(format!(
                    "consumer {} got item from unknown producer {}",
                    consumer, item.producer
                ));
                continue;
            };
            match slots.get_mut(item.seq as usize) {
                Some(n) => *n += 1,
                None => report(format!(
                    "consumer {} got item {}:{} that was never accepted",
                    consumer, item.producer, item.seq
                )),
            }

            if let Some(prev) = last_seq[item.producer] {
                if item.seq <= prev {
                    report(format!(
                        "consumer {} saw producer {} out of order: {} after {}",
                        consumer, item.producer, item.seq, prev
                    ));
                }
            }
            last_seq[item.producer] = Some(item.seq);
        }

        if log.max_len_seen > cfg.capacity {
            report(format!(
                "consumer {} saw len {} above capacity {}",
                consumer, log.max_len_seen, cfg.capacity
            ));
        }
    }

    for (producer, slots) in counts.iter().enumerate() {
        for (seq, &n) in slots.iter().enumerate() {
            match n {
                1 => {}
                0 => report(format!("item {}:{} lost", producer, seq)),
                n => report(format!("item {}:{} delivered {} times", producer, seq, n)),
            }
        }
    }

    if omitted > 0 {
        violations.push(format!("... and {} more", omitted));
    }
    violations
}

/// Save report to file.
pub fn save_report(report: &Report, path: &Path) -> Result<()> {
    let data = serde_json::to_string_pretty(report).context("failed to encode report")?;
    std::fs::write(path, data)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    Ok(())
}

/// Print a human-readable summary.
pub fn print_summary(report: &Report) {
    let cfg = &report.config;
    println!("{}", "=".repeat(60));
    println!("STRESS SUMMARY");
    println!("{}", "=".repeat(60));
    println!(
        "mode={:?} capacity={} producers={} consumers={}",
        cfg.mode, cfg.capacity, cfg.producers, cfg.consumers
    );
    println!("{}", "-".repeat(60));
    println!("{:<16} {:>12}", "elapsed (ms)", report.elapsed_ms);
    println!("{:<16} {:>12}", "accepted", report.accepted);
    println!("{:<16} {:>12}", "received", report.received);
    println!("{:<16} {:>12}", "rejected", report.rejected);
    println!("{:<16} {:>12}", "timeouts", report.timeouts);
    println!("{:<16} {:>12}", "would block", report.would_block);
    println!("{:<16} {:>12}", "max len seen", report.max_len_seen);
    println!("{}", "-".repeat(60));

    if report.stalled {
        println!("STALLED: deadline of {}s elapsed", cfg.deadline_secs);
    }
    for v in &report.violations {
        println!("VIOLATION: {}", v);
    }
    if report.ok() {
        println!("OK");
    }
}
