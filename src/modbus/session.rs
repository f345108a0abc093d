// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-request Modbus/TCP session against one rack controller.

use std::net::SocketAddr;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use thiserror::Error;
use tokio_modbus::prelude::*;

use crate::directory::RackId;

/// First input register of the telemetry block.
pub const INPUT_REGISTER_START: u16 = 0;
/// Number of input registers in the telemetry block (24 float values).
pub const INPUT_REGISTER_COUNT: u16 = 48;

/// Failure of one session, with enough context to diagnose the rack.
///
/// All variants are non-fatal for the scheduler: the (request, rack) pair is
/// abandoned and the next scheduled round is the retry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport connection could not be established.
    #[error("connecting to rack {rack_id} on {address} failed: {source}")]
    ConnectionFailed {
        rack_id: RackId,
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The transport or protocol layer failed while the read was in flight.
    #[error("reading input registers from rack {rack_id} on {address} failed: {source}")]
    Protocol {
        rack_id: RackId,
        address: SocketAddr,
        #[source]
        source: tokio_modbus::Error,
    },

    /// The rack answered the read with a well-formed Modbus exception
    /// response instead of data.
    #[error(
        "request for input registers 0 - 47 from rack {rack_id} on {address} \
         returned exception {exception:?}"
    )]
    Device {
        rack_id: RackId,
        address: SocketAddr,
        exception: ExceptionCode,
    },
}

impl SessionError {
    /// The rack the failed session was addressing.
    pub fn rack_id(&self) -> RackId {
        match self {
            SessionError::ConnectionFailed { rack_id, .. }
            | SessionError::Protocol { rack_id, .. }
            | SessionError::Device { rack_id, .. } => *rack_id,
        }
    }
}

/// Result of one successful read: the raw register block and the moment it
/// was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRead {
    /// Unix timestamp (UTC seconds) captured after the connection was
    /// established and before the read was issued, so it reflects read time
    /// rather than scheduling time.
    pub timestamp: i64,
    /// The raw input registers as delivered by the rack.
    pub registers: Vec<u16>,
}

/// The seam between the scheduler and the wire.
///
/// One call performs one complete session (connect, read, close). The
/// scheduler only depends on this trait, so tests can substitute a scripted
/// reader for real rack hardware.
#[async_trait]
pub trait RackReader: Send + Sync {
    async fn read_rack(
        &self,
        rack_id: RackId,
        address: SocketAddr,
    ) -> Result<RegisterRead, SessionError>;
}

/// Production [`RackReader`] backed by a tokio-modbus TCP client.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModbusSession;

impl ModbusSession {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RackReader for ModbusSession {
    async fn read_rack(
        &self,
        rack_id: RackId,
        address: SocketAddr,
    ) -> Result<RegisterRead, SessionError> {
        let mut ctx =
            tcp::connect(address)
                .await
                .map_err(|source| SessionError::ConnectionFailed {
                    rack_id,
                    address,
                    source,
                })?;
        debug!("Connected to rack {} on {}", rack_id, address);

        let timestamp = Utc::now().timestamp();
        let outcome = ctx
            .read_input_registers(INPUT_REGISTER_START, INPUT_REGISTER_COUNT)
            .await;

        // The connection is released on every exit path, read failures
        // included; rack controllers have few listener slots and repeated
        // polling rounds would exhaust them. Dropping `ctx` closes the
        // socket as well, the explicit disconnect just does it politely.
        if let Err(err) = ctx.disconnect().await {
            debug!("Disconnect from rack {} on {}: {}", rack_id, address, err);
        }

        match outcome {
            Ok(Ok(registers)) => Ok(RegisterRead {
                timestamp,
                registers,
            }),
            Ok(Err(exception)) => Err(SessionError::Device {
                rack_id,
                address,
                exception,
            }),
            Err(source) => Err(SessionError::Protocol {
                rack_id,
                address,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_carry_rack_context() {
        let address: SocketAddr = "192.168.1.161:502".parse().unwrap();
        let err = SessionError::ConnectionFailed {
            rack_id: RackId::B,
            address,
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(err.rack_id(), RackId::B);
        let message = err.to_string();
        assert!(message.contains("rack B"));
        assert!(message.contains("192.168.1.161:502"));

        let err = SessionError::Device {
            rack_id: RackId::C,
            address,
            exception: ExceptionCode::IllegalDataAddress,
        };
        assert!(err.to_string().contains("input registers 0 - 47"));
    }

    #[tokio::test]
    async fn test_connect_failure_is_classified() {
        // Port 1 on loopback is not listening; the connect must fail fast
        // and be reported as ConnectionFailed, not as a read error.
        let address: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = ModbusSession::new().read_rack(RackId::A, address).await;
        match result {
            Err(SessionError::ConnectionFailed { rack_id, .. }) => {
                assert_eq!(rack_id, RackId::A);
            }
            other => panic!("expected ConnectionFailed, got {:?}", other.map(|_| ())),
        }
    }
}
