// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register decoding and record serialization
//!
//! The rack controllers expose their measurements as pairs of 16-bit input
//! registers, each pair holding one IEEE-754 binary32 value with the most
//! significant word first. This module turns a raw register block into a
//! [`MeasurementRecord`] and renders the record as one CSV line for the log
//! file.

use std::fmt::Write;

use thiserror::Error;

use crate::directory::RackId;

/// Errors decoding a register block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The block length is odd, so the last register has no pair partner.
    /// Nothing is decoded; a truncated record would silently misreport the
    /// rack.
    #[error("register block of length {0} cannot be split into 16-bit pairs")]
    MalformedBlock(usize),
}

/// Decode a register block into floating point measurements.
///
/// Registers are consumed in pairs `(r[0], r[1]), (r[2], r[3]), ...`; each
/// pair is concatenated high:low into 32 bits and reinterpreted as an
/// IEEE-754 binary32 value. The most-significant-word-first order is the
/// rack hardware's native register layout and must not be changed.
///
/// No arithmetic is performed, so the round trip through the device's
/// registers is bit-exact.
pub fn decode_registers(registers: &[u16]) -> Result<Vec<f32>, DecodeError> {
    if registers.len() % 2 != 0 {
        return Err(DecodeError::MalformedBlock(registers.len()));
    }

    Ok(registers
        .chunks_exact(2)
        .map(|pair| f32::from_bits((u32::from(pair[0]) << 16) | u32::from(pair[1])))
        .collect())
}

/// Encode floating point values into register pairs, most significant word
/// first. The inverse of [`decode_registers`]; the rack simulator uses it to
/// publish synthetic measurements.
pub fn encode_registers(values: &[f32]) -> Vec<u16> {
    let mut registers = Vec::with_capacity(values.len() * 2);
    for value in values {
        let bits = value.to_bits();
        registers.push((bits >> 16) as u16);
        registers.push(bits as u16);
    }
    registers
}

/// One logged measurement: a timestamp, the rack it came from, and the
/// decoded values in register order.
///
/// Records are serialized and discarded immediately after a successful read;
/// nothing retains them in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// Unix timestamp (UTC seconds) captured between connect and read.
    pub timestamp: i64,
    /// The rack the values were read from.
    pub rack_id: RackId,
    /// Decoded measurements, half as many as the register block had words.
    pub values: Vec<f32>,
}

impl MeasurementRecord {
    pub fn new(timestamp: i64, rack_id: RackId, values: Vec<f32>) -> Self {
        Self {
            timestamp,
            rack_id,
            values,
        }
    }

    /// Render the record as one log line:
    /// `timestamp,rackId,value0,...,valueN` terminated by a newline.
    ///
    /// Floats use Rust's shortest round-trip representation, which is
    /// locale-independent and recovers the exact 32-bit value on re-parse.
    pub fn to_csv_line(&self) -> String {
        let mut line = String::with_capacity(16 + self.values.len() * 12);
        write!(line, "{},{}", self.timestamp, self.rack_id).expect("writing to a String");
        for value in &self.values {
            write!(line, ",{}", value).expect("writing to a String");
        }
        line.push('\n');
        line
    }
}
