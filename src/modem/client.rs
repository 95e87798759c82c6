//! Stream-style handle onto one modem socket.
//!
//! A [`Socket`] borrows the [`Modem`] and implements the
//! [`network`](crate::network) traits, so protocol code written against
//! [`Connection`] runs unchanged over a modem channel.
//!
//! ```rust,ignore
//! use libgsm::network::{Close, Read, Write};
//!
//! let mut socket = modem.socket(0)?;
//! socket.connect("example.com", 80, false)?;
//! socket.write(b"GET / HTTP/1.0\r\n\r\n")?;
//!
//! let mut buf = [0u8; 64];
//! while socket.is_open() {
//!     let n = socket.read(&mut buf)?;
//!     // ...
//! }
//! socket.close()?;
//! ```

use super::Modem;
use super::socket::SocketId;
use super::transport::{Clock, Transport};
use crate::network::error::Error;
use crate::network::{Close, Connection, Read, Write};

/// One socket of a [`Modem`], usable as a [`Connection`].
pub struct Socket<'m, T: Transport, C: Clock, const RX: usize> {
    modem: &'m mut Modem<T, C, RX>,
    id: SocketId,
}

impl<T: Transport, C: Clock, const RX: usize> Modem<T, C, RX> {
    /// Borrow socket `id` as a stream handle.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSocket`] if `id` is out of range.
    pub fn socket(&mut self, id: SocketId) -> Result<Socket<'_, T, C, RX>, Error> {
        self.sockets.get(id)?;
        Ok(Socket { modem: self, id })
    }
}

impl<T: Transport, C: Clock, const RX: usize> Socket<'_, T, C, RX> {
    pub fn id(&self) -> SocketId {
        self.id
    }

    /// See [`Modem::connect`].
    pub fn connect(&mut self, host: &str, port: u16, secure: bool) -> Result<(), Error> {
        self.modem.connect(self.id, host, port, secure)
    }

    /// See [`Modem::available`].
    pub fn available(&mut self) -> Result<usize, Error> {
        self.modem.available(self.id)
    }

    /// See [`Modem::is_connected`].
    pub fn is_connected(&mut self) -> bool {
        self.modem.is_connected(self.id)
    }

    /// `true` while connected or while data received before a remote close
    /// is still waiting to be read.
    pub fn is_open(&mut self) -> bool {
        self.available().is_ok_and(|n| n > 0) || self.modem.is_connected(self.id)
    }

    /// The driver behind this handle, for straight-line commands.
    pub fn modem(&mut self) -> &mut Modem<T, C, RX> {
        self.modem
    }
}

impl<T: Transport, C: Clock, const RX: usize> Read for Socket<'_, T, C, RX> {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.modem.read(self.id, buf)
    }
}

impl<T: Transport, C: Clock, const RX: usize> Write for Socket<'_, T, C, RX> {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.modem.write(self.id, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.modem.transport_mut().flush().map_err(|_| Error::WriteError)
    }
}

impl<T: Transport, C: Clock, const RX: usize> Close for Socket<'_, T, C, RX> {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.modem.close(self.id)
    }
}

impl<T: Transport, C: Clock, const RX: usize> Connection for Socket<'_, T, C, RX> {}

impl<T: Transport, C: Clock, const RX: usize> core::fmt::Debug for Socket<'_, T, C, RX> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.id)
            .field("state", &self.modem.sockets.get(self.id).map(|slot| slot.state()))
            .finish()
    }
}
