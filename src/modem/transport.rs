//! The serial link to the modem and the command writer on top of it.

use crate::fmt::{Bytes, trace};
use crate::network::error::Error;
use crate::network::{Read, Write};

/// Line terminator appended to every command.
pub const NL: &str = "\r\n";

/// A buffered, byte-oriented serial channel.
///
/// The driver owns the transport exclusively: nothing else may read from it
/// while a [`Modem`](super::Modem) holds it.
pub trait Transport: Read + Write {
    /// Bytes that can be read right now without waiting.
    fn available(&mut self) -> usize;
}

/// Time source and scheduling hooks for the driver's wait loops.
///
/// The driver never blocks except through this trait, so a bare-metal
/// implementation can service interrupts or feed a watchdog in
/// [`yield_now`](Clock::yield_now).
pub trait Clock {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&mut self) -> u64;
    /// Sleep for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
    /// Give background work a chance to run while waiting for bytes.
    fn yield_now(&mut self) {}
}

/// [`Clock`] backed by `std::time`.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&mut self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }

    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}

/// One piece of a command line.
///
/// Commands are assembled from mixed literal and numeric parts, e.g.
/// `AT+QISEND=` `2` `,` `128`. Each part is written to the transport as soon
/// as it is encoded; nothing is staged in a line buffer.
#[derive(Debug, Clone, Copy)]
pub enum AtArg<'a> {
    Str(&'a str),
    Bytes(&'a [u8]),
    Char(char),
    Uint(u64),
    Int(i64),
}

impl<'a> From<&'a str> for AtArg<'a> {
    fn from(value: &'a str) -> Self {
        AtArg::Str(value)
    }
}

impl<'a> From<&'a [u8]> for AtArg<'a> {
    fn from(value: &'a [u8]) -> Self {
        AtArg::Bytes(value)
    }
}

impl From<char> for AtArg<'_> {
    fn from(value: char) -> Self {
        AtArg::Char(value)
    }
}

macro_rules! at_arg_uint {
    ($($t:ty),*) => {
        $(impl From<$t> for AtArg<'_> {
            fn from(value: $t) -> Self {
                AtArg::Uint(value as u64)
            }
        })*
    };
}

macro_rules! at_arg_int {
    ($($t:ty),*) => {
        $(impl From<$t> for AtArg<'_> {
            fn from(value: $t) -> Self {
                AtArg::Int(value as i64)
            }
        })*
    };
}

at_arg_uint!(u8, u16, u32, u64, usize);
at_arg_int!(i8, i16, i32, i64);

/// Write `AT`, every argument and the line terminator, then flush.
pub fn write_command<T: Transport + ?Sized>(transport: &mut T, args: &[AtArg<'_>]) -> Result<(), Error> {
    write_all(transport, b"AT")?;
    for arg in args {
        write_arg(transport, arg)?;
    }
    write_all(transport, NL.as_bytes())?;
    transport.flush().map_err(|_| Error::WriteError)
}

/// Write raw bytes, retrying short writes until everything is accepted.
pub fn write_all<T: Transport + ?Sized>(transport: &mut T, mut data: &[u8]) -> Result<(), Error> {
    while !data.is_empty() {
        match transport.write(data) {
            Ok(0) | Err(_) => return Err(Error::WriteError),
            Ok(n) => data = &data[n.min(data.len())..],
        }
    }
    Ok(())
}

/// Take one byte if the transport has one ready.
pub fn read_byte<T: Transport + ?Sized>(transport: &mut T) -> Option<u8> {
    if transport.available() == 0 {
        return None;
    }
    let mut byte = [0u8; 1];
    match transport.read(&mut byte) {
        Ok(1) => Some(byte[0]),
        Ok(_) => None,
        Err(_) => {
            trace!("transport read failed");
            None
        }
    }
}

fn write_arg<T: Transport + ?Sized>(transport: &mut T, arg: &AtArg<'_>) -> Result<(), Error> {
    let mut scratch = [0u8; 20];
    match *arg {
        AtArg::Str(s) => write_all(transport, s.as_bytes()),
        AtArg::Bytes(b) => write_all(transport, b),
        AtArg::Char(c) => write_all(transport, c.encode_utf8(&mut scratch[..4]).as_bytes()),
        AtArg::Uint(v) => write_all(transport, encode_uint(v, &mut scratch)),
        AtArg::Int(v) => {
            if v < 0 {
                write_all(transport, b"-")?;
            }
            write_all(transport, encode_uint(v.unsigned_abs(), &mut scratch))
        }
    }
}

/// Decimal digits of `value`, written right-aligned into `buf`.
fn encode_uint(mut value: u64, buf: &mut [u8; 20]) -> &[u8] {
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    &buf[start..]
}

pub(crate) fn log_command(args: &[AtArg<'_>]) {
    for arg in args {
        if let AtArg::Str(s) = arg {
            trace!("AT> {}", Bytes(s.as_bytes()));
            break;
        }
    }
}
