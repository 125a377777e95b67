// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous Modbus/TCP client over `std::net::TcpStream`, framed with
//! `rmodbus`. Grounded on `client.py`'s wrap-every-call-in-try/except
//! shape: any I/O or framing failure collapses to `None`/`false` and
//! drops the connection rather than propagating (§7).

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use rmodbus::client::ModbusRequest;
use rmodbus::{guess_response_frame_len, ModbusProto};

use super::transport::ModbusTransport;

/// A client bound to one remote terminal's `(host, port, unit id)`.
pub struct TcpModbusClient {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    retries: u32,
    stream: Option<TcpStream>,
}

impl TcpModbusClient {
    pub fn new(host: impl Into<String>, port: u16, unit_id: u8, timeout: Duration, retries: u32) -> Self {
        Self { host: host.into(), port, unit_id, timeout, retries, stream: None }
    }

    fn attempt<T>(&mut self, mut f: impl FnMut(&mut TcpStream, u8) -> Option<T>) -> Option<T> {
        for _ in 0..=self.retries {
            if self.stream.is_none() && !self.connect() {
                return None;
            }
            let Some(stream) = self.stream.as_mut() else {
                return None;
            };
            match f(stream, self.unit_id) {
                Some(v) => return Some(v),
                None => {
                    self.stream = None;
                    if !self.connect() {
                        return None;
                    }
                }
            }
        }
        None
    }

    fn roundtrip(stream: &mut TcpStream, request: &[u8]) -> Option<Vec<u8>> {
        stream.write_all(request).ok()?;
        let mut head = [0u8; 6];
        stream.read_exact(&mut head).ok()?;
        let len = guess_response_frame_len(&head, ModbusProto::TcpUdp).ok()?;
        let mut response = head.to_vec();
        if len as usize > head.len() {
            let mut rest = vec![0u8; len as usize - head.len()];
            stream.read_exact(&mut rest).ok()?;
            response.extend(rest);
        }
        Some(response)
    }
}

impl ModbusTransport for TcpModbusClient {
    fn connect(&mut self) -> bool {
        let addr = format!("{}:{}", self.host, self.port);
        match TcpStream::connect(&addr) {
            Ok(stream) => {
                let _ = stream.set_read_timeout(Some(self.timeout));
                let _ = stream.set_write_timeout(Some(self.timeout));
                let _ = stream.set_nodelay(true);
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                tracing::debug!(host = %self.host, port = self.port, error = %e, "modbus connect failed");
                self.stream = None;
                false
            }
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn read_coils(&mut self, address: u16, count: u16) -> Option<Vec<bool>> {
        self.attempt(|stream, unit_id| {
            let mut mreq = ModbusRequest::new(unit_id, ModbusProto::TcpUdp);
            let mut request = Vec::new();
            mreq.generate_get_coils(address, count, &mut request).ok()?;
            let response = Self::roundtrip(stream, &request)?;
            let mut out = Vec::new();
            mreq.parse_bool(&response, &mut out).ok()?;
            Some(out)
        })
    }

    fn write_coil(&mut self, address: u16, value: bool) -> bool {
        self.attempt(|stream, unit_id| {
            let mut mreq = ModbusRequest::new(unit_id, ModbusProto::TcpUdp);
            let mut request = Vec::new();
            mreq.generate_set_coil(address, value, &mut request).ok()?;
            let response = Self::roundtrip(stream, &request)?;
            mreq.parse_ok(&response).ok()?;
            Some(())
        })
        .is_some()
    }

    fn read_holding_registers(&mut self, address: u16, count: u16) -> Option<Vec<u16>> {
        self.attempt(|stream, unit_id| {
            let mut mreq = ModbusRequest::new(unit_id, ModbusProto::TcpUdp);
            let mut request = Vec::new();
            mreq.generate_get_holdings(address, count, &mut request).ok()?;
            let response = Self::roundtrip(stream, &request)?;
            let mut out = Vec::new();
            mreq.parse_u16(&response, &mut out).ok()?;
            Some(out)
        })
    }

    fn write_register(&mut self, address: u16, value: u16) -> bool {
        self.attempt(|stream, unit_id| {
            let mut mreq = ModbusRequest::new(unit_id, ModbusProto::TcpUdp);
            let mut request = Vec::new();
            mreq.generate_set_holding(address, value, &mut request).ok()?;
            let response = Self::roundtrip(stream, &request)?;
            mreq.parse_ok(&response).ok()?;
            Some(())
        })
        .is_some()
    }
}
