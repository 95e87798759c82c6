//! Unsolicited result codes: socket closed and data-ready notifications.

use super::dialect::Dialect;
use super::matcher::FIELD_LEN;
use super::socket::{SocketId, SocketKind};
use super::transport::{Clock, Transport};
use super::Modem;
use crate::fmt::{Bytes, debug, warn};

/// Notification families, by prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Urc {
    /// `"closed",<id>` on a plain socket.
    Closed,
    /// `<context>,<role>,<id>...`: data waiting on a plain socket.
    DataReady,
    /// `"recv"|"closed",<id>` on a secure socket.
    Secure,
}

impl Urc {
    /// Notification whose prefix `window` ends with.
    pub fn recognise(dialect: &Dialect, window: &[u8]) -> Option<Self> {
        let [closed, data_ready, secure] = dialect.urc_prefixes();
        if window.ends_with(closed) {
            Some(Urc::Closed)
        } else if window.ends_with(data_ready) {
            Some(Urc::DataReady)
        } else if window.ends_with(secure) {
            Some(Urc::Secure)
        } else {
            None
        }
    }
}

impl<T: Transport, C: Clock, const RX: usize> Modem<T, C, RX> {
    /// Parse the body following a recognised prefix and apply it.
    ///
    /// Every read here is bounded by the stream timeout, so a truncated
    /// notification costs at most a few field deadlines.
    pub(crate) fn handle_urc(&mut self, urc: Urc) {
        match urc {
            Urc::Closed => {
                if let Some(id) = self.subtyped_urc_id(b"closed") {
                    debug!("urc: socket {} closed", id);
                    self.remote_closed(id);
                }
            }
            Urc::DataReady => self.on_data_ready(),
            Urc::Secure => self.on_secure_urc(),
        }
    }

    /// Parse `"<subtype>",<id>` and return the id if the subtype is `wanted`.
    /// Other subtypes are skipped to the end of the line.
    fn subtyped_urc_id(&mut self, wanted: &[u8]) -> Option<i32> {
        let (subtype, id) = self.subtyped_urc()?;
        if subtype.as_slice() == wanted { id } else { None }
    }

    fn subtyped_urc(&mut self) -> Option<(heapless::Vec<u8, FIELD_LEN>, Option<i32>)> {
        if !self.skip_until(b'"') {
            return None;
        }
        let subtype = self.read_field(b"\"")?.text;
        let separator = self.read_field(b",\n")?;
        if separator.delim == b'\n' {
            debug!("urc: {} without socket id", Bytes(&subtype));
            return Some((subtype, None));
        }
        let id = self.read_field(b"\n")?.int();
        Some((subtype, id))
    }

    fn on_data_ready(&mut self) {
        // <context>,<role>,<id>[,<num>,<len>,<total>]
        let mut id = None;
        for position in 0..3 {
            let Some(field) = self.read_field(b",\n") else {
                return;
            };
            if position == 2 {
                id = field.int();
                if field.delim == b',' {
                    self.skip_until(b'\n');
                }
            } else if field.delim == b'\n' {
                debug!("urc: truncated data-ready notification");
                return;
            }
        }

        let Some(id) = id else { return };
        if let Some(slot) = self.sockets.bound_mut(id) {
            debug!("urc: data ready on socket {}", id);
            slot.pending_notification = true;
        }
    }

    fn on_secure_urc(&mut self) {
        let Some((subtype, id)) = self.subtyped_urc() else {
            return;
        };
        let Some(id) = id else { return };
        match subtype.as_slice() {
            b"recv" => self.secure_data_ready(id),
            b"closed" => {
                debug!("urc: secure socket {} closed", id);
                self.remote_closed(id);
            }
            other => debug!("urc: ignoring secure subtype {}", Bytes(other)),
        }
    }

    fn remote_closed(&mut self, id: i32) {
        if let Some(slot) = self.sockets.bound_mut(id) {
            slot.mark_remote_closed();
        }
    }

    /// Secure sockets have no "how much is waiting" query, so a data-ready
    /// notification pulls a chunk straight away.
    fn secure_data_ready(&mut self, id: i32) {
        let Some(slot) = self.sockets.bound_mut(id) else {
            return;
        };
        if slot.kind() != Some(SocketKind::Secure) {
            return;
        }
        let free = slot.rx.free();
        let chunk = self.config.secure_read_chunk.min(free);
        if chunk == 0 {
            // Leave the data at the modem; the next read pulls it.
            warn!("urc: socket {} buffer full, deferring pull", id);
            slot.pending_notification = true;
            return;
        }
        let socket = id as SocketId;
        match self.pull(socket, chunk) {
            Ok(pulled) => debug!(
                "urc: socket {} pulled {} of {} bytes",
                id, pulled.captured, pulled.reported
            ),
            Err(e) => warn!("urc: pull on socket {} failed: {:?}", id, e),
        }
    }
}
