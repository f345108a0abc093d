// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus/TCP sensor rack simulator
//!
//! Serves the 48-register telemetry block of one rack controller so the
//! logger can be exercised without hardware. The 24 float values drift
//! slowly over time and are re-encoded into the input registers once per
//! second.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin rack_simulator -- --port 1502
//! ```
//!
//! Then point the logger at it with a one-rack directory:
//!
//! ```yaml
//! racks:
//!   - id: A
//!     host: 127.0.0.1
//!     port: 1502
//! ```

use std::{
    future,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use clap::Parser;
use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio_modbus::prelude::*;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use rack_modbus_logger::decoding::encode_registers;
use rack_modbus_logger::modbus::INPUT_REGISTER_COUNT;

/// Simulate one sensor rack controller over Modbus/TCP
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// TCP port to listen on (502 needs elevated privileges)
    #[arg(long, default_value_t = 1502)]
    port: u16,

    /// Seconds between simulated measurement updates
    #[arg(long, default_value_t = 1)]
    update_interval: u64,
}

/// Serves read requests for the telemetry register block.
///
/// Only "read input registers" is answered with data; everything else gets
/// `IllegalFunction`, which is also a convenient way to exercise the
/// logger's device-error path.
#[derive(Clone)]
struct RackSimulatorService {
    registers: Arc<Mutex<Vec<u16>>>,
}

impl tokio_modbus::server::Service for RackSimulatorService {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let res = match req {
            Request::ReadInputRegisters(addr, cnt) => {
                debug!(
                    "Reading {} input registers starting from address {}",
                    cnt, addr
                );
                register_read(&self.registers.lock().unwrap(), addr, cnt)
                    .map(Response::ReadInputRegisters)
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        future::ready(res)
    }
}

impl RackSimulatorService {
    fn new() -> Self {
        Self {
            registers: Arc::new(Mutex::new(encode_registers(&simulated_values(0)))),
        }
    }

    fn refresh(&self, tick: u64) {
        let mut registers = self.registers.lock().unwrap();
        *registers = encode_registers(&simulated_values(tick));
    }
}

/// Synthetic measurements: 24 channels drifting around distinct baselines.
fn simulated_values(tick: u64) -> Vec<f32> {
    (0..usize::from(INPUT_REGISTER_COUNT / 2))
        .map(|channel| {
            let baseline = 20.0 + channel as f32;
            let phase = (tick as f32 / 10.0) + channel as f32 / 3.0;
            baseline + phase.sin()
        })
        .collect()
}

/// Read a register range, failing with `IllegalDataAddress` when the range
/// leaves the telemetry block.
fn register_read(registers: &[u16], addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
    let start = usize::from(addr);
    let end = start + usize::from(cnt);
    if end > registers.len() {
        error!("Exception::IllegalDataAddress");
        return Err(ExceptionCode::IllegalDataAddress);
    }
    Ok(registers[start..end].to_vec())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    let listener = TcpListener::bind(socket_addr).await?;
    info!("Rack simulator listening on {}", socket_addr);

    let service = RackSimulatorService::new();

    // Background refresh of the simulated measurements
    let refresh_service = service.clone();
    let update_interval = Duration::from_secs(args.update_interval.max(1));
    tokio::spawn(async move {
        let mut tick: u64 = 0;
        loop {
            tokio::time::sleep(update_interval).await;
            tick += 1;
            refresh_service.refresh(tick);
        }
    });

    let server = Server::new(listener);
    let on_connected = move |stream, socket_addr| {
        let service = service.clone();
        async move { accept_tcp_connection(stream, socket_addr, move |_socket_addr| Ok(Some(service.clone()))) }
    };
    let on_process_error = |err| {
        error!("Rack simulator error: {err}");
    };
    server.serve(&on_connected, on_process_error).await?;

    Ok(())
}
