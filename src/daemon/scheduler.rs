// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll scheduler
//!
//! Sequential round-based polling of the rack fleet. One round is one pass
//! over the active rack set; rounds are separated by the configured
//! interval, and there is no sleep after the final round of a bounded run.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info};
use tokio::time::sleep;

use crate::decoding::{decode_registers, MeasurementRecord};
use crate::directory::{RackDirectory, RackId, RackSelector, UnknownRack};
use crate::logfile::RecordSink;
use crate::modbus::RackReader;

/// How many polling rounds a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatCount {
    /// Poll until externally interrupted.
    Forever,
    /// Poll exactly this many rounds. `Finite(0)` makes no requests at all.
    Finite(u64),
}

impl RepeatCount {
    /// Whether `request_index` is past the end of the run.
    fn is_done(&self, request_index: u64) -> bool {
        match self {
            RepeatCount::Forever => false,
            RepeatCount::Finite(count) => request_index >= *count,
        }
    }
}

/// Immutable description of one run, validated before polling starts.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    /// Which racks to poll.
    pub selector: RackSelector,
    /// How many rounds to run.
    pub repeat: RepeatCount,
    /// Pause between consecutive rounds.
    pub interval: Duration,
}

/// Counters for a completed bounded run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Rounds that were started.
    pub rounds: u64,
    /// Sessions attempted, successful or not (one per (request, rack) pair).
    pub connect_attempts: u64,
    /// Records appended to the sink.
    pub records_logged: u64,
    /// Pairs abandoned because of a session, decode, or sink failure.
    pub failures: u64,
}

/// Drives rounds of protocol sessions across the active rack set.
pub struct PollScheduler<R: RackReader, S: RecordSink> {
    plan: RequestPlan,
    // Selector resolved against the directory once at construction; the
    // active set and its order never change during a run.
    racks: Vec<(RackId, SocketAddr)>,
    reader: R,
    sink: S,
}

impl<R: RackReader, S: RecordSink> PollScheduler<R, S> {
    /// Create a scheduler for a validated plan.
    ///
    /// Resolves the rack selector against the directory immediately so that
    /// a validator/directory mismatch surfaces here, before any polling,
    /// instead of as a recurring per-round error.
    pub fn new(
        directory: &RackDirectory,
        plan: RequestPlan,
        reader: R,
        sink: S,
    ) -> Result<Self, UnknownRack> {
        let mut racks = Vec::new();
        for rack_id in plan.selector.resolve(directory)? {
            racks.push((rack_id, directory.address_of(rack_id)?));
        }
        Ok(Self {
            plan,
            racks,
            reader,
            sink,
        })
    }

    /// The resolved active rack set, in polling order.
    pub fn active_racks(&self) -> impl Iterator<Item = RackId> + '_ {
        self.racks.iter().map(|(id, _)| *id)
    }

    /// Run the plan to completion.
    ///
    /// Returns only for bounded plans; with [`RepeatCount::Forever`] the
    /// future never resolves and the process must be externally
    /// interrupted. Partial rounds at interrupt time are acceptable -
    /// already appended records are complete lines.
    pub async fn run(mut self) -> Result<PollSummary> {
        let mut summary = PollSummary::default();
        let mut request_index: u64 = 0;

        info!(
            "Polling {} rack(s) ({}), repeat {:?}, interval {}s",
            self.racks.len(),
            self.plan.selector,
            self.plan.repeat,
            self.plan.interval.as_secs()
        );

        while !self.plan.repeat.is_done(request_index) {
            self.poll_round(request_index, &mut summary).await;
            summary.rounds += 1;
            request_index += 1;

            // Sleep separates rounds; after the last scheduled round the
            // run ends immediately instead of dead-waiting.
            if !self.plan.repeat.is_done(request_index) {
                sleep(self.plan.interval).await;
            }
        }

        info!(
            "Run complete: {} round(s), {} attempt(s), {} record(s) logged, {} failure(s)",
            summary.rounds, summary.connect_attempts, summary.records_logged, summary.failures
        );
        Ok(summary)
    }

    /// One pass over the active rack set.
    ///
    /// Every rack reaches a terminal outcome (record logged or failure
    /// skipped) before the round ends. No failure aborts the round and no
    /// rack is blacklisted; the next round retries everything.
    async fn poll_round(&mut self, request_index: u64, summary: &mut PollSummary) {
        debug!("Starting round {}", request_index);

        for (rack_id, address) in &self.racks {
            summary.connect_attempts += 1;

            let read = match self.reader.read_rack(*rack_id, *address).await {
                Ok(read) => read,
                Err(err) => {
                    error!("{}", err);
                    summary.failures += 1;
                    continue;
                }
            };
            debug!(
                "Input registers 0 - {} from rack {} are {:?}",
                read.registers.len().saturating_sub(1),
                rack_id,
                read.registers
            );

            let values = match decode_registers(&read.registers) {
                Ok(values) => values,
                Err(err) => {
                    error!(
                        "Discarding read from rack {} on {}: {}",
                        rack_id, address, err
                    );
                    summary.failures += 1;
                    continue;
                }
            };
            debug!("Decoded values from rack {} are {:?}", rack_id, values);

            let record = MeasurementRecord::new(read.timestamp, *rack_id, values);
            if let Err(err) = self.sink.append(&record.to_csv_line()) {
                error!(
                    "Failed to append record for rack {} to the log file: {}",
                    rack_id, err
                );
                summary.failures += 1;
                continue;
            }

            info!(
                "Logged {} value(s) from rack {} at {}",
                record.values.len(),
                rack_id,
                record.timestamp
            );
            summary.records_logged += 1;
        }
    }
}
