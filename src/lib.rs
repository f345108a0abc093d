// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor rack telemetry logger
//!
//! This library polls sensor rack controllers over Modbus/TCP, decodes their
//! input registers into floating point measurements, and appends timestamped
//! records to a log file. The main components are:
//!
//! - [`directory`]: the static mapping between rack ids and network addresses
//! - [`decoding`]: register-pair to float decoding and record serialization
//! - [`modbus`]: the per-request Modbus/TCP session (connect, read, close)
//! - [`logfile`]: the append-only record sink
//! - [`daemon`]: the polling scheduler driving rounds across the rack fleet

pub mod config;
pub mod daemon;
pub mod decoding;
pub mod directory;
pub mod logfile;
pub mod modbus;
