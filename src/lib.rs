//! # libgsm - socket driver for AT-command cellular modems
//!
//! `libgsm` lets firmware open several TCP and TLS connections through a
//! cellular modem that speaks an AT command set over a single serial link.
//! Command replies, unsolicited notifications and socket payload all share
//! that link; the driver keeps them apart and exposes each connection as an
//! ordinary byte stream. It is designed for embedded systems and supports
//! `no_std` environments.
//!
//! ## Features
//!
//! - Up to six multiplexed sockets, plain TCP or TLS terminated in the modem
//! - Table-driven command vocabulary ([`modem::Dialect`]), Quectel MC20 built in
//! - Bounded, cooperative waits: every command has a deadline, and all
//!   sleeping goes through a user-supplied [`modem::Clock`]
//! - Fixed-capacity receive buffers, no allocator required
//! - Sockets implement the [`network`] stream traits
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libgsm = "0.1.0"
//! ```
//!
//! ### Opening a socket
//!
//! ```rust,no_run
//! use libgsm::modem::{Clock, Modem, Transport};
//! use libgsm::network::{Close, Read, Write};
//! # struct Uart;
//! # impl libgsm::network::Read for Uart {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl libgsm::network::Write for Uart {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Transport for Uart {
//! #     fn available(&mut self) -> usize { 0 }
//! # }
//! # struct Ticks(u64);
//! # impl Clock for Ticks {
//! #     fn now_ms(&mut self) -> u64 { self.0 += 1; self.0 }
//! #     fn delay_ms(&mut self, ms: u32) { self.0 += ms as u64; }
//! # }
//! # fn main() -> Result<(), libgsm::network::error::Error> {
//!
//! let mut modem: Modem<_, _> = Modem::new(Uart, Ticks(0));
//! if !modem.test_at(10_000) {
//!     return Ok(());
//! }
//!
//! let mut socket = modem.socket(0)?;
//! socket.connect("example.com", 443, true)?;
//! socket.write(b"GET / HTTP/1.0\r\n\r\n")?;
//!
//! let mut buf = [0u8; 128];
//! let n = socket.read(&mut buf)?;
//! socket.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux hosts driving a modem over a USB serial adapter
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support, including `modem::StdClock` (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging
//! - `log`: Route driver logging through the `log` crate

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

mod fmt;

/// Stream traits and the error type shared by every layer.
pub mod network;

/// The modem driver: transport, response matcher, notification handling
/// and the socket engine.
pub mod modem;
