//! Cellular modem driver multiplexing sockets over one AT command link.
//!
//! The [`Modem`] owns the serial [`Transport`] and a table of up to
//! [`MAX_SOCKETS`] logical sockets. Command replies, unsolicited notifications
//! and socket payload all arrive interleaved on the same link; the driver
//! untangles them in a single cooperative flow of control:
//!
//! ```text
//!  connect/close/write/read ──▶ engine ──▶ transport writer ──▶ serial link
//!                                 │                                  │
//!                                 ▼                                  ▼
//!                           socket table ◀── notification demux ◀── response matcher
//!                                 ▲                                  ▲
//!                                 └────────── maintenance pump ──────┘
//! ```
//!
//! * The **response matcher** ([`Modem::wait_for`]) consumes bytes until a
//!   caller-supplied terminator is seen or the deadline passes. Notification
//!   prefixes are recognised along the way and handed to the demultiplexer
//!   without the caller ever seeing them.
//! * The **notification demultiplexer** updates socket flags, and for secure
//!   sockets pulls payload into the socket's [`RingBuffer`] on the spot,
//!   re-entering the matcher to do so.
//! * The **engine** runs the open/send/read/close sequences for plain and
//!   secure sockets, choosing commands from the [`Dialect`] table.
//! * The **maintenance pump** ([`Modem::pump`]) processes notifications that
//!   arrived while no command was outstanding and refreshes how much data the
//!   modem holds for each plain socket.
//!
//! # Usage
//!
//! ```rust
//! use libgsm::modem::{Clock, Modem, Transport};
//! use libgsm::network::{Read, Write};
//!
//! struct Uart;
//! impl Read for Uart {
//!     type Error = ();
//!     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> { Ok(0) }
//! }
//! impl Write for Uart {
//!     type Error = ();
//!     fn write(&mut self, buf: &[u8]) -> Result<usize, ()> { Ok(buf.len()) }
//!     fn flush(&mut self) -> Result<(), ()> { Ok(()) }
//! }
//! impl Transport for Uart {
//!     fn available(&mut self) -> usize { 0 }
//! }
//!
//! struct Ticks(u64);
//! impl Clock for Ticks {
//!     fn now_ms(&mut self) -> u64 { self.0 += 1; self.0 }
//!     fn delay_ms(&mut self, ms: u32) { self.0 += ms as u64; }
//! }
//!
//! let mut modem: Modem<Uart, Ticks> = Modem::new(Uart, Ticks(0));
//! // A silent modem never confirms the connection.
//! assert!(modem.connect(0, "example.com", 80, false).is_err());
//! assert!(!modem.is_connected(0));
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// `send_command` with arguments of mixed types.
macro_rules! at {
    ($modem:expr $(, $arg:expr)* $(,)?) => {
        $modem.send_command(&[$($crate::modem::transport::AtArg::from($arg)),*])
    };
}

pub mod client;
pub mod config;
pub mod dialect;
mod engine;
pub mod matcher;
pub mod ring;
pub mod socket;
pub mod transport;
mod urc;

pub use client::Socket;
pub use config::Config;
pub use dialect::{Dialect, MC20};
pub use matcher::{MATCH_WINDOW, Terminators};
pub use ring::RingBuffer;
pub use socket::{MAX_SOCKETS, SocketDescriptor, SocketId, SocketKind, SocketState};
#[cfg(feature = "std")]
pub use transport::StdClock;
pub use transport::{AtArg, Clock, Transport};

pub use crate::network::error::Error;

use socket::SocketTable;

/// Receive buffer size of each socket unless overridden.
pub const DEFAULT_RX_BUFFER: usize = 256;

/// Driver for one modem on one serial link.
///
/// `RX` is the receive buffer capacity of every socket.
pub struct Modem<T: Transport, C: Clock, const RX: usize = DEFAULT_RX_BUFFER> {
    transport: T,
    clock: C,
    config: Config,
    dialect: &'static Dialect,
    sockets: SocketTable<RX>,
}

impl<T: Transport, C: Clock, const RX: usize> Modem<T, C, RX> {
    /// Driver with the default [`Config`] speaking the [`MC20`] dialect.
    pub fn new(transport: T, clock: C) -> Self {
        Self::with_config(transport, clock, Config::default())
    }

    pub fn with_config(transport: T, clock: C, config: Config) -> Self {
        Self {
            transport,
            clock,
            config,
            dialect: &MC20,
            sockets: SocketTable::new(),
        }
    }

    /// Switch to another modem family's command table.
    pub fn with_dialect(mut self, dialect: &'static Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    /// Read-only view of a socket's bookkeeping.
    pub fn descriptor(&self, id: SocketId) -> Result<&SocketDescriptor<RX>, Error> {
        self.sockets.get(id)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Direct access to the serial link. Bytes read through this reference
    /// bypass notification handling.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Give the transport and clock back.
    pub fn release(self) -> (T, C) {
        (self.transport, self.clock)
    }

    /// Send `AT` followed by `args` and the line terminator.
    ///
    /// This is the only path by which commands reach the modem; code outside
    /// the socket engine (bring-up, SIM or network queries) uses it together
    /// with [`wait_for`](Self::wait_for).
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use libgsm::modem::AtArg;
    ///
    /// modem.send_command(&[AtArg::from("+QIDNSIP="), AtArg::from(1u8)])?;
    /// assert_eq!(modem.wait_response(1_000), Some(1));
    /// ```
    pub fn send_command(&mut self, args: &[AtArg<'_>]) -> Result<(), Error> {
        transport::log_command(args);
        transport::write_command(&mut self.transport, args)?;
        self.clock.yield_now();
        Ok(())
    }

    /// Probe the modem with bare `AT` until it answers `OK` or `timeout_ms`
    /// elapses.
    pub fn test_at(&mut self, timeout_ms: u32) -> bool {
        let start = self.clock.now_ms();
        while self.elapsed_since(start) < timeout_ms as u64 {
            if self.send_command(&[]).is_ok() && self.wait_response(200) == Some(1) {
                self.clock.delay_ms(100);
                return true;
            }
            self.clock.delay_ms(100);
        }
        false
    }

    fn elapsed_since(&mut self, start: u64) -> u64 {
        self.clock.now_ms().wrapping_sub(start)
    }
}

impl<T, C, const RX: usize> core::fmt::Debug for Modem<T, C, RX>
where
    T: Transport + core::fmt::Debug,
    C: Clock + core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Modem")
            .field("transport", &self.transport)
            .field("clock", &self.clock)
            .field("config", &self.config)
            .field("dialect", &self.dialect.name)
            .field("sockets", &self.sockets)
            .finish()
    }
}
