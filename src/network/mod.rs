//! Stream traits shared by the modem transport and the sockets it exposes.
//!
//! The serial link to the modem is consumed through [`Read`] and [`Write`],
//! and every modem socket is handed back to applications as a [`Connection`],
//! so protocol code written against these traits does not care whether it
//! runs over a UART or over one multiplexed modem channel.

#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connection, Read, Write};
}

/// Byte source.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data into `buf`, returning how many bytes were filled. `Ok(0)`
    /// means nothing is ready right now.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Byte sink.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Orderly shutdown of a connection.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}
