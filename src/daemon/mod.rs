// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Polling daemon
//!
//! The scheduler that drives the whole run: it iterates request indices
//! (bounded or unbounded), walks the selected rack set in directory order,
//! runs one protocol session per (request, rack) pair, decodes the result
//! and appends it to the log sink, then sleeps until the next round.
//!
//! Failures of individual racks are isolated: they are logged and the run
//! continues with the next rack. The only ways a run ends are reaching the
//! configured request count or an external interrupt.

pub mod scheduler;

pub use scheduler::{PollScheduler, PollSummary, RepeatCount, RequestPlan};
