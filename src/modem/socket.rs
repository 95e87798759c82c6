//! Per-socket bookkeeping and the fixed socket table.

use super::ring::RingBuffer;
use crate::network::error::Error;

/// Number of logical sockets the modem multiplexes.
pub const MAX_SOCKETS: usize = 6;

/// Socket identifier, an index into the socket table.
pub type SocketId = u8;

/// Which command vocabulary a socket uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketKind {
    /// Plain TCP.
    Plain,
    /// TLS terminated inside the modem.
    Secure,
}

impl SocketKind {
    /// Pick the variant from a `secure` flag.
    pub fn from_secure(secure: bool) -> Self {
        if secure {
            SocketKind::Secure
        } else {
            SocketKind::Plain
        }
    }
}

/// Connection state of one socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketState {
    /// Never opened, or the last open attempt failed.
    Disconnected,
    /// Open command issued, confirmation outstanding.
    Connecting,
    /// Open confirmed by the modem.
    Connected,
    /// Close command issued, confirmation outstanding.
    Closing,
    /// Closed locally or by the peer.
    Closed,
}

/// Everything the driver tracks for one logical socket.
#[derive(Debug)]
pub struct SocketDescriptor<const RX: usize> {
    kind: Option<SocketKind>,
    state: SocketState,
    /// Bytes the modem reported as waiting but that have not been pulled yet.
    pub(crate) remote_available: usize,
    /// Data may be waiting at the modem: set by a data-ready notification or
    /// by a secure pull that filled its whole chunk, cleared once acted on.
    pub(crate) pending_notification: bool,
    /// The last send left the modem before the peer acknowledged it.
    pub(crate) unacknowledged: bool,
    pub(crate) rx: RingBuffer<RX>,
}

impl<const RX: usize> SocketDescriptor<RX> {
    const fn new() -> Self {
        Self {
            kind: None,
            state: SocketState::Disconnected,
            remote_available: 0,
            pending_notification: false,
            unacknowledged: false,
            rx: RingBuffer::new(),
        }
    }

    /// Variant this slot is bound to, if any.
    pub fn kind(&self) -> Option<SocketKind> {
        self.kind
    }

    /// `true` once a socket variant has been attached to this slot.
    pub fn is_bound(&self) -> bool {
        self.kind.is_some()
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    /// `true` only in [`SocketState::Connected`].
    pub fn connected(&self) -> bool {
        self.state == SocketState::Connected
    }

    /// Bytes sitting in the local receive buffer.
    pub fn locally_buffered(&self) -> usize {
        self.rx.len()
    }

    /// Bytes the modem still holds for this socket.
    pub fn remote_available(&self) -> usize {
        self.remote_available
    }

    pub fn pending_notification(&self) -> bool {
        self.pending_notification
    }

    /// `true` if the ack poll bound ran out after the last write. The bytes
    /// were accepted by the modem; only their delivery is unconfirmed.
    pub fn unacknowledged(&self) -> bool {
        self.unacknowledged
    }

    /// Readable while anything is buffered locally or waiting at the modem,
    /// regardless of the connected flag.
    pub fn readable(&self) -> bool {
        self.locally_buffered() > 0 || self.remote_available > 0
    }

    /// Attach a variant and reset every counter for a fresh connection.
    pub(crate) fn rebind(&mut self, kind: SocketKind) {
        self.kind = Some(kind);
        self.state = SocketState::Disconnected;
        self.remote_available = 0;
        self.pending_notification = false;
        self.unacknowledged = false;
        self.rx.clear();
    }

    pub(crate) fn set_state(&mut self, state: SocketState) {
        self.state = state;
    }

    /// Peer-side close. Buffered data stays readable.
    pub(crate) fn mark_remote_closed(&mut self) {
        if matches!(
            self.state,
            SocketState::Connected | SocketState::Connecting | SocketState::Closing
        ) {
            self.state = SocketState::Closed;
        }
    }

    /// Local close: drop the connected flag and anything buffered.
    pub(crate) fn mark_local_closed(&mut self) {
        self.state = SocketState::Closing;
        self.remote_available = 0;
        self.pending_notification = false;
        self.rx.clear();
    }
}

/// Arena of socket descriptors addressed by [`SocketId`].
#[derive(Debug)]
pub struct SocketTable<const RX: usize> {
    slots: [SocketDescriptor<RX>; MAX_SOCKETS],
}

impl<const RX: usize> SocketTable<RX> {
    /// A table with every slot unbound.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| SocketDescriptor::new()),
        }
    }

    /// Look up a slot, rejecting ids outside the table.
    pub fn get(&self, id: SocketId) -> Result<&SocketDescriptor<RX>, Error> {
        self.slots.get(id as usize).ok_or(Error::InvalidSocket)
    }

    pub(crate) fn get_mut(&mut self, id: SocketId) -> Result<&mut SocketDescriptor<RX>, Error> {
        self.slots.get_mut(id as usize).ok_or(Error::InvalidSocket)
    }

    /// Slot for a notification-supplied id, only if it is in range and bound.
    pub(crate) fn bound_mut(&mut self, id: i32) -> Option<&mut SocketDescriptor<RX>> {
        let index = usize::try_from(id).ok()?;
        self.slots.get_mut(index).filter(|slot| slot.is_bound())
    }

    /// Ids of plain sockets whose data-ready flag is set.
    pub(crate) fn pending_plain(&self) -> impl Iterator<Item = SocketId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.kind == Some(SocketKind::Plain) && slot.pending_notification)
            .map(|(id, _)| id as SocketId)
    }
}

impl<const RX: usize> Default for SocketTable<RX> {
    fn default() -> Self {
        Self::new()
    }
}
