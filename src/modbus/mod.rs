// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus/TCP protocol session
//!
//! One session is one attempt to retrieve one register block from one rack:
//! connect, a single fixed read of input registers 0-47, close. Sessions are
//! never reused across requests; each (request, rack) pair opens a fresh
//! connection. Stateless-per-request trades reconnect latency for immunity
//! to stale connections on flaky industrial networks.

pub mod session;

pub use session::{
    ModbusSession, RackReader, RegisterRead, SessionError, INPUT_REGISTER_COUNT,
    INPUT_REGISTER_START,
};
