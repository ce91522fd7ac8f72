//! aggregate.rs — derived dashboard views over one log snapshot.
//! Pure functions: snapshot + wall-clock + an injected randomness source in,
//! view out. No network, no mutation, no hidden state.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use lazy_static::lazy_static;
use rand::Rng;

use crate::gateway::{LogEntry, StatsResponse};
use crate::poller::LogSnapshot;

/// Timestamp format written by the gateway's log store.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DAY_BUCKETS: usize = 7;
pub const HOUR_BLOCKS: usize = 6;

/// Simulated per-entry response duration: base seconds plus a bounded
/// perturbation in `[0, RESPONSE_JITTER_SECS)`. A simulation, not a
/// measurement; also the value an empty block reports.
pub const BASE_RESPONSE_SECS: f64 = 15.0;
pub const RESPONSE_JITTER_SECS: f64 = 10.0;

/// Fixed response-time set shown when no snapshot has ever been fetched.
pub const FALLBACK_RESPONSE_TIMES: [f64; HOUR_BLOCKS] = [15.0, 12.0, 22.0, 28.0, 25.0, 18.0];

pub fn notification_window() -> Duration {
    Duration::minutes(5)
}

pub fn operator_window() -> Duration {
    Duration::hours(1)
}

fn parse_time(entry: &LogEntry) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&entry.time, TIME_FORMAT).ok()
}

// ── Histograms ───────────────────────────────────────

/// Seven weekday buckets, Sunday = 0. Entries whose timestamp does not
/// parse are skipped, not counted, not errored.
pub fn call_volume_by_day(snapshot: &LogSnapshot) -> [u32; DAY_BUCKETS] {
    let mut buckets = [0u32; DAY_BUCKETS];
    for entry in snapshot.entries() {
        if let Some(t) = parse_time(entry) {
            buckets[t.weekday().num_days_from_sunday() as usize] += 1;
        }
    }
    buckets
}

/// Six four-hour blocks (00/04/08/12/16/20). Each block reports the mean
/// simulated duration of its entries; empty blocks report the base value.
/// With no snapshot available at all, the fixed fallback set is returned.
pub fn response_time_by_block(snapshot: &LogSnapshot, rng: &mut impl Rng) -> [f64; HOUR_BLOCKS] {
    if snapshot.is_unavailable() {
        return FALLBACK_RESPONSE_TIMES;
    }

    let mut sums = [0.0f64; HOUR_BLOCKS];
    let mut counts = [0u32; HOUR_BLOCKS];

    for entry in snapshot.entries() {
        if let Some(t) = parse_time(entry) {
            let block = (t.hour() / 4) as usize;
            sums[block] += BASE_RESPONSE_SECS + rng.gen_range(0.0..RESPONSE_JITTER_SECS);
            counts[block] += 1;
        }
    }

    let mut blocks = [BASE_RESPONSE_SECS; HOUR_BLOCKS];
    for i in 0..HOUR_BLOCKS {
        if counts[i] > 0 {
            blocks[i] = sums[i] / counts[i] as f64;
        }
    }
    blocks
}

// ── Windows ──────────────────────────────────────────

/// Entries whose timestamp falls within the trailing `window` ending at
/// `now`. Unparsable timestamps and future entries are excluded.
pub fn entries_within<'a>(
    snapshot: &'a LogSnapshot,
    now: NaiveDateTime,
    window: Duration,
) -> Vec<&'a LogEntry> {
    snapshot
        .entries()
        .iter()
        .filter(|entry| {
            parse_time(entry)
                .map(|t| t <= now && now.signed_duration_since(t) <= window)
                .unwrap_or(false)
        })
        .collect()
}

/// Cardinality of the 5-minute recent-activity window.
pub fn notification_count(snapshot: &LogSnapshot, now: NaiveDateTime) -> usize {
    entries_within(snapshot, now, notification_window()).len()
}

/// One-hour-window activity count, the input to the operator load
/// distribution.
pub fn recent_hour_count(snapshot: &LogSnapshot, now: NaiveDateTime) -> usize {
    entries_within(snapshot, now, operator_window()).len()
}

/// Newest entries for the recent-activity feed. The gateway serves the log
/// list newest-first, so this is a prefix.
pub fn latest_entries(snapshot: &LogSnapshot, limit: usize) -> Vec<&LogEntry> {
    snapshot.entries().iter().take(limit).collect()
}

// ── Operators ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    Online,
    Lunch,
    Offline,
}

#[derive(Debug, Clone)]
pub struct Operator {
    pub name: String,
    pub status: OperatorStatus,
}

impl Operator {
    pub fn new(name: impl Into<String>, status: OperatorStatus) -> Self {
        Operator { name: name.into(), status }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorLoad {
    pub name: String,
    pub status: OperatorStatus,
    pub active_chats: u32,
}

lazy_static! {
    /// Fixed dashboard roster.
    pub static ref DEFAULT_ROSTER: Vec<Operator> = vec![
        Operator::new("Alisher", OperatorStatus::Online),
        Operator::new("Nigora", OperatorStatus::Online),
        Operator::new("Dilshod", OperatorStatus::Lunch),
    ];
}

/// Distribute the 1-hour-window activity across the roster. Only online
/// operators carry load: half the recent count, a bounded variation in
/// `[-2, 2]`, and a positional offset, floored at zero. Everyone else
/// reports zero.
pub fn operator_load(
    roster: &[Operator],
    recent_count: usize,
    rng: &mut impl Rng,
) -> Vec<OperatorLoad> {
    roster
        .iter()
        .enumerate()
        .map(|(position, op)| {
            let active_chats = if op.status == OperatorStatus::Online {
                let base = (recent_count / 2) as i64;
                let variation = rng.gen_range(-2i64..=2);
                (base + variation + position as i64).max(0) as u32
            } else {
                0
            };
            OperatorLoad {
                name: op.name.clone(),
                status: op.status,
                active_chats,
            }
        })
        .collect()
}

/// (online, total) roster counts for the summary footer.
pub fn online_summary(roster: &[Operator]) -> (usize, usize) {
    let online = roster
        .iter()
        .filter(|op| op.status == OperatorStatus::Online)
        .count();
    (online, roster.len())
}

// ── Stats derivations ────────────────────────────────

/// Average response time derived from the efficiency percentage,
/// `(100 − efficiency) / 10`. Falls back to 0.8 s when the string does
/// not parse, matching the dashboard's placeholder.
pub fn average_response_secs(stats: &StatsResponse) -> f64 {
    stats
        .efficiency
        .trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .map(|efficiency| (100.0 - efficiency) / 10.0)
        .unwrap_or(0.8)
}
