// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Scheduling behavior tests
//!
//! These tests drive the poll scheduler with a scripted rack reader instead
//! of real hardware and with tokio's paused clock, so sleeps between rounds
//! are observable as virtual time without slowing the test suite down.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{timeout, Instant};

use rack_modbus_logger::config::Config;
use rack_modbus_logger::daemon::{PollScheduler, RepeatCount, RequestPlan};
use rack_modbus_logger::decoding::encode_registers;
use rack_modbus_logger::directory::{RackDirectory, RackId, RackSelector};
use rack_modbus_logger::logfile::MemorySink;
use rack_modbus_logger::modbus::{RackReader, RegisterRead, SessionError};

/// Scripted [`RackReader`]: records every attempt and fails for a chosen
/// subset of racks, returning a fixed register block otherwise.
#[derive(Clone)]
struct ScriptedReader {
    attempts: Arc<Mutex<Vec<RackId>>>,
    failing: HashSet<RackId>,
    registers: Vec<u16>,
}

impl ScriptedReader {
    fn new(failing: impl IntoIterator<Item = RackId>) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(Vec::new())),
            failing: failing.into_iter().collect(),
            registers: encode_registers(&[1.5, -2.25]),
        }
    }

    fn with_registers(mut self, registers: Vec<u16>) -> Self {
        self.registers = registers;
        self
    }
}

#[async_trait]
impl RackReader for ScriptedReader {
    async fn read_rack(
        &self,
        rack_id: RackId,
        address: SocketAddr,
    ) -> Result<RegisterRead, SessionError> {
        self.attempts.lock().unwrap().push(rack_id);
        if self.failing.contains(&rack_id) {
            return Err(SessionError::ConnectionFailed {
                rack_id,
                address,
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        Ok(RegisterRead {
            timestamp: 1_700_000_000,
            registers: self.registers.clone(),
        })
    }
}

fn directory() -> RackDirectory {
    Config::default().build_directory().unwrap()
}

fn plan(selector: RackSelector, repeat: RepeatCount, interval_secs: u64) -> RequestPlan {
    RequestPlan {
        selector,
        repeat,
        interval: Duration::from_secs(interval_secs),
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_rounds_over_ten_racks_make_thirty_attempts() {
    // Every connect fails; the attempt count must not depend on outcomes.
    let reader = ScriptedReader::new(RackId::ALL);
    let attempts = reader.attempts.clone();
    let mut sink = MemorySink::new();

    let scheduler = PollScheduler::new(
        &directory(),
        plan(RackSelector::All, RepeatCount::Finite(3), 7),
        reader,
        &mut sink,
    )
    .unwrap();
    let active: Vec<RackId> = scheduler.active_racks().collect();
    assert_eq!(active, RackId::ALL);

    let started = Instant::now();
    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.rounds, 3);
    assert_eq!(summary.connect_attempts, 30);
    assert_eq!(summary.failures, 30);
    assert_eq!(summary.records_logged, 0);
    assert_eq!(attempts.lock().unwrap().len(), 30);
    assert!(sink.lines().is_empty());
    // Two sleeps separate three rounds; no sleep after the last one.
    assert_eq!(started.elapsed(), Duration::from_secs(14));
}

#[tokio::test(start_paused = true)]
async fn test_failing_rack_is_skipped_but_not_blacklisted() {
    let reader = ScriptedReader::new([RackId::B]);
    let attempts_handle = reader.attempts.clone();
    let mut sink = MemorySink::new();

    let scheduler = PollScheduler::new(
        &directory(),
        plan(RackSelector::All, RepeatCount::Finite(2), 1),
        reader,
        &mut sink,
    )
    .unwrap();
    let summary = scheduler.run().await.unwrap();

    // 9 racks succeed per round, B fails per round.
    assert_eq!(summary.connect_attempts, 20);
    assert_eq!(summary.records_logged, 18);
    assert_eq!(summary.failures, 2);
    assert_eq!(sink.lines().len(), 18);
    for line in sink.lines() {
        let rack_field = line.split(',').nth(1).unwrap();
        assert_ne!(rack_field, "B");
    }

    // B was attempted again in round 2 despite failing in round 1, and the
    // racks after B were still polled in round 1.
    let attempts = attempts_handle.lock().unwrap();
    let b_attempts = attempts.iter().filter(|id| **id == RackId::B).count();
    assert_eq!(b_attempts, 2);
    assert_eq!(attempts[..10], RackId::ALL);
    assert_eq!(attempts[10..], RackId::ALL);
}

#[tokio::test(start_paused = true)]
async fn test_single_round_has_no_trailing_sleep() {
    let reader = ScriptedReader::new([]);
    let mut sink = MemorySink::new();

    let scheduler = PollScheduler::new(
        &directory(),
        plan(
            RackSelector::Single(RackId::A),
            RepeatCount::Finite(1),
            300,
        ),
        reader,
        &mut sink,
    )
    .unwrap();

    let started = Instant::now();
    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.records_logged, 1);
    // Under the paused clock any sleep would advance virtual time; the run
    // must finish without one.
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_zero_requests_do_nothing() {
    let reader = ScriptedReader::new([]);
    let attempts = reader.attempts.clone();
    let mut sink = MemorySink::new();

    let scheduler = PollScheduler::new(
        &directory(),
        plan(RackSelector::All, RepeatCount::Finite(0), 1),
        reader,
        &mut sink,
    )
    .unwrap();

    let started = Instant::now();
    let summary = scheduler.run().await.unwrap();
    assert_eq!(summary, Default::default());
    assert!(attempts.lock().unwrap().is_empty());
    assert!(sink.lines().is_empty());
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_forever_plan_outlives_a_large_horizon() {
    let reader = ScriptedReader::new([]);
    let attempts = reader.attempts.clone();
    let mut sink = MemorySink::new();

    let scheduler = PollScheduler::new(
        &directory(),
        plan(RackSelector::Single(RackId::A), RepeatCount::Forever, 60),
        reader,
        &mut sink,
    )
    .unwrap();

    // One virtual hour of polling at a 60s interval: the run future must
    // still be pending when the horizon fires.
    let outcome = timeout(Duration::from_secs(3600), scheduler.run()).await;
    assert!(outcome.is_err(), "forever plan terminated on its own");
    assert!(attempts.lock().unwrap().len() >= 30);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_block_is_logged_and_skipped() {
    // 47 registers cannot be split into pairs; the record is dropped but
    // the run keeps going.
    let reader = ScriptedReader::new([]).with_registers(vec![0u16; 47]);
    let mut sink = MemorySink::new();

    let scheduler = PollScheduler::new(
        &directory(),
        plan(RackSelector::Single(RackId::C), RepeatCount::Finite(2), 1),
        reader,
        &mut sink,
    )
    .unwrap();
    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.connect_attempts, 2);
    assert_eq!(summary.failures, 2);
    assert_eq!(summary.records_logged, 0);
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn test_logged_lines_carry_timestamp_rack_and_values() {
    let reader = ScriptedReader::new([]);
    let mut sink = MemorySink::new();

    let scheduler = PollScheduler::new(
        &directory(),
        plan(RackSelector::Single(RackId::E), RepeatCount::Finite(1), 0),
        reader,
        &mut sink,
    )
    .unwrap();
    scheduler.run().await.unwrap();

    assert_eq!(sink.lines(), ["1700000000,E,1.5,-2.25\n"]);
}

#[tokio::test]
async fn test_selector_mismatch_fails_before_polling() {
    let entries = vec![(RackId::A, "10.0.0.1:502".parse().unwrap())];
    let small_directory = RackDirectory::new(entries).unwrap();
    let reader = ScriptedReader::new([]);
    let attempts = reader.attempts.clone();
    let mut sink = MemorySink::new();

    let result = PollScheduler::new(
        &small_directory,
        plan(RackSelector::Single(RackId::B), RepeatCount::Finite(1), 0),
        reader,
        &mut sink,
    );
    assert!(result.is_err());
    assert!(attempts.lock().unwrap().is_empty());
}
