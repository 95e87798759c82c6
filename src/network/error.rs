//! Common error types for network operations

/// A common error type for modem and socket operations.
///
/// Every failure the driver can observe is recovered locally and reported
/// through this enum; none of them leaves the driver in an unusable state.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation was attempted on a socket that is not open.
    NotOpen,
    /// The transport rejected a write.
    WriteError,
    /// The transport failed while reading.
    ReadError,
    /// The modem refused to open the connection.
    ConnectionRefused,
    /// No recognised reply arrived before the deadline.
    Timeout,
    /// The remote peer closed the connection.
    ConnectionClosed,
    /// The host name could not be encoded into a command.
    InvalidAddress,
    /// A reply disagreed with the request it answers.
    ProtocolError,
    /// The socket id is outside the socket table.
    InvalidSocket,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::InvalidSocket => defmt::write!(f, "InvalidSocket"),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::NotOpen => "socket is not open",
            Error::WriteError => "transport write failed",
            Error::ReadError => "transport read failed",
            Error::ConnectionRefused => "connection refused",
            Error::Timeout => "timed out waiting for the modem",
            Error::ConnectionClosed => "connection closed by peer",
            Error::InvalidAddress => "invalid address",
            Error::ProtocolError => "unexpected reply from the modem",
            Error::InvalidSocket => "socket id out of range",
        };
        f.write_str(text)
    }
}
