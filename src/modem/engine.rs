//! Socket operations: open, close, send, receive and the maintenance pump.

use heapless::Vec;

use super::Modem;
use super::dialect::{OpenForm, Profile};
use super::matcher::{ERROR, MATCH_WINDOW, OK, Terminators, parse_int};
use super::socket::{MAX_SOCKETS, SocketId, SocketKind, SocketState};
use super::transport::{self, Clock, Transport};
use crate::fmt::{debug, trace, warn};
use crate::network::Write;
use crate::network::error::Error;

/// Outcome of one read-data command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Pulled {
    /// Count echoed by the modem; this many payload bytes were consumed.
    pub reported: usize,
    /// Bytes that fitted into the receive buffer.
    pub captured: usize,
}

impl<T: Transport, C: Clock, const RX: usize> Modem<T, C, RX> {
    /// Open a TCP connection on socket `id`, over TLS if `secure`.
    ///
    /// A socket that is still live is closed first. The slot is rebound to
    /// the requested variant and its buffer cleared, so stale data from a
    /// previous connection is never returned. On any failure the socket ends
    /// up [`Disconnected`](SocketState::Disconnected).
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidSocket`] if `id` is out of range.
    /// * [`Error::InvalidAddress`] if `host` is empty or contains quotes,
    ///   spaces or control characters.
    /// * [`Error::ConnectionRefused`] if the modem rejects the request.
    /// * [`Error::Timeout`] if no confirmation arrives in time.
    /// * [`Error::ProtocolError`] if the confirmation names another socket
    ///   or cannot be parsed.
    pub fn connect(&mut self, id: SocketId, host: &str, port: u16, secure: bool) -> Result<(), Error> {
        let slot = self.sockets.get(id)?;
        if !valid_host(host) {
            return Err(Error::InvalidAddress);
        }
        if slot.is_bound()
            && matches!(
                slot.state(),
                SocketState::Connected | SocketState::Connecting | SocketState::Closing
            )
        {
            self.close(id)?;
        }

        let kind = SocketKind::from_secure(secure);
        let slot = self.sockets.get_mut(id)?;
        slot.rebind(kind);
        slot.set_state(SocketState::Connecting);

        debug!("socket {}: connecting to {}:{} ({:?})", id, host, port, kind);
        let dialect = self.dialect;
        let result = self.open(id, host, port, dialect.profile(kind));
        let state = match result {
            Ok(()) => SocketState::Connected,
            Err(_) => SocketState::Disconnected,
        };
        self.sockets.get_mut(id)?.set_state(state);
        debug!("socket {}: {:?}", id, state);
        result
    }

    fn open(&mut self, id: SocketId, host: &str, port: u16, profile: &Profile) -> Result<(), Error> {
        match profile.open_form {
            OpenForm::Protocol(protocol) => {
                at!(self, profile.open, id, ",\"", protocol, "\",\"", host, "\",", port)?
            }
            OpenForm::Context { mode } => {
                at!(self, profile.open, id, ',', id, ",\"", host, "\",", port, ',', mode)?
            }
        }
        match self.wait_response(self.config.command_timeout_ms) {
            Some(1) => {}
            Some(_) => return Err(Error::ConnectionRefused),
            None => return Err(Error::Timeout),
        }

        let terminators = match profile.open_refused {
            Some(refused) => Terminators::new(&[profile.open_confirm, ERROR, refused]),
            None => Terminators::new(&[profile.open_confirm]),
        };
        let mut reply: Vec<u8, MATCH_WINDOW> = Vec::new();
        match self.wait_for_capture(profile.open_timeout_ms, &terminators, &mut reply) {
            Some(1) => {}
            Some(_) => return Err(Error::ConnectionRefused),
            None => return Err(Error::Timeout),
        }

        if profile.confirm_carries_status {
            let echoed = self.read_int(b",");
            let status = self.read_int(b"\n");
            if echoed != Some(id as i32) {
                warn!("socket {}: open confirmed for {:?}", id, echoed);
                return Err(Error::ProtocolError);
            }
            match status {
                Some(0) => Ok(()),
                Some(_) => Err(Error::ConnectionRefused),
                None => Err(Error::ProtocolError),
            }
        } else {
            match echoed_id(&reply, profile.open_confirm) {
                Some(echoed) if echoed != id as i32 => {
                    warn!("socket {}: open confirmed for {}", id, echoed);
                    Err(Error::ProtocolError)
                }
                _ => Ok(()),
            }
        }
    }

    /// Close socket `id`.
    ///
    /// The socket stops being connected and its buffer is discarded before
    /// the close directive is even sent; the modem's confirmation is waited
    /// for but its outcome ignored. Closing an unbound or already closed
    /// socket is harmless.
    pub fn close(&mut self, id: SocketId) -> Result<(), Error> {
        let slot = self.sockets.get_mut(id)?;
        let Some(kind) = slot.kind() else {
            return Ok(());
        };
        slot.mark_local_closed();

        let dialect = self.dialect;
        let profile = dialect.profile(kind);
        let sent = at!(self, profile.close, id);
        if sent.is_ok() {
            let _ = self.wait_for(profile.close_timeout_ms, &Terminators::new(&[profile.close_ok]));
        }
        self.sockets.get_mut(id)?.set_state(SocketState::Closed);
        debug!("socket {}: closed", id);
        sent
    }

    /// Send up to [`Config::max_send_len`](super::Config::max_send_len)
    /// bytes of `data` in a single send command and return how many were
    /// accepted. Larger payloads are not split: call again with the rest.
    ///
    /// For plain sockets the call then polls the modem until the peer has
    /// acknowledged everything, giving up after
    /// [`Config::ack_poll_limit`](super::Config::ack_poll_limit) polls. The
    /// count is returned either way, since the modem has taken the bytes;
    /// [`SocketDescriptor::unacknowledged`](super::SocketDescriptor::unacknowledged)
    /// tells whether delivery was confirmed.
    ///
    /// # Errors
    ///
    /// * [`Error::NotOpen`] if the socket was never connected.
    /// * [`Error::ConnectionClosed`] if it has been closed since.
    /// * [`Error::Timeout`] if the modem never prompts for the payload.
    /// * [`Error::ProtocolError`] if the send is rejected before the payload.
    /// * [`Error::WriteError`] if the transport fails or the modem does not
    ///   accept the payload.
    pub fn write(&mut self, id: SocketId, data: &[u8]) -> Result<usize, Error> {
        let kind = self.sockets.get(id)?.kind().ok_or(Error::NotOpen)?;
        self.pump()?;

        let slot = self.sockets.get(id)?;
        if !slot.connected() {
            return Err(match slot.state() {
                SocketState::Closed | SocketState::Closing => Error::ConnectionClosed,
                _ => Error::NotOpen,
            });
        }
        if data.is_empty() {
            return Ok(0);
        }

        let len = data.len().min(self.config.max_send_len);
        let dialect = self.dialect;
        let profile = dialect.profile(kind);
        at!(self, profile.send, id, ',', len)?;
        match self.wait_for(self.config.command_timeout_ms, &Terminators::new(&[profile.send_prompt])) {
            Some(1) => {}
            Some(_) => return Err(Error::ProtocolError),
            None => return Err(Error::Timeout),
        }

        transport::write_all(&mut self.transport, &data[..len])?;
        self.transport.flush().map_err(|_| Error::WriteError)?;
        match self.wait_for(self.config.command_timeout_ms, &Terminators::new(&[profile.send_ok])) {
            Some(1) => {}
            Some(_) => return Err(Error::WriteError),
            None => return Err(Error::Timeout),
        }
        trace!("socket {}: sent {} bytes", id, len);

        if profile.ack_drain {
            let acked = self.drain_acks(id);
            if !acked {
                warn!("socket {}: {} bytes sent but not acknowledged", id, len);
            }
            self.sockets.get_mut(id)?.unacknowledged = !acked;
        }
        Ok(len)
    }

    /// Poll until the peer has acknowledged everything sent on `id`. `false`
    /// if the poll bound runs out, the socket closes or the link fails first.
    fn drain_acks(&mut self, id: SocketId) -> bool {
        let dialect = self.dialect;
        let limit = self.config.ack_poll_limit;
        for poll in 0..limit {
            if poll > 0 {
                self.clock.delay_ms(self.config.ack_poll_interval_ms);
            }
            if at!(self, dialect.ack_query, id).is_err() {
                return false;
            }
            let terminators = Terminators::new(&[dialect.ack_reply]);
            if self.wait_for(self.config.command_timeout_ms, &terminators) != Some(1) {
                continue;
            }
            // <sent>,<acked>,<unacked>
            self.skip_until(b',');
            self.skip_until(b',');
            let unacked = self.read_int(b"\n");
            self.wait_response(self.config.command_timeout_ms);

            if unacked == Some(0) {
                return true;
            }
            if !self.sockets.get(id).is_ok_and(|slot| slot.connected()) {
                return false;
            }
        }
        limit == 0
    }

    /// Move up to `buf.len()` received bytes into `buf`.
    ///
    /// Runs the maintenance pump, then serves bytes from the socket's buffer,
    /// pulling more from the modem whenever the buffer runs dry and the
    /// modem has data for the socket. Returns `Ok(0)` when nothing is
    /// available; it never waits for data to arrive. Data buffered before a
    /// remote close is still returned.
    pub fn read(&mut self, id: SocketId, buf: &mut [u8]) -> Result<usize, Error> {
        let kind = self.sockets.get(id)?.kind().ok_or(Error::NotOpen)?;
        if buf.is_empty() {
            return Ok(0);
        }
        self.pump()?;

        let mut copied = 0;
        loop {
            copied += self.sockets.get_mut(id)?.rx.pop_into(&mut buf[copied..]);
            if copied == buf.len() || !self.refill(id, kind)? {
                break;
            }
        }
        trace!("socket {}: read {} bytes", id, copied);
        Ok(copied)
    }

    /// Refill an empty receive buffer. `false` once nothing more can be had.
    fn refill(&mut self, id: SocketId, kind: SocketKind) -> Result<bool, Error> {
        match kind {
            SocketKind::Plain => {
                if self.sockets.get(id)?.remote_available == 0 {
                    self.pump()?;
                }
                let slot = self.sockets.get(id)?;
                let want = slot.remote_available.min(slot.rx.free());
                if want == 0 {
                    return Ok(!slot.rx.is_empty());
                }
                let pulled = self.pull(id, want)?;
                if pulled.reported == 0 {
                    self.sockets.get_mut(id)?.remote_available = 0;
                }
                Ok(pulled.captured > 0)
            }
            SocketKind::Secure => {
                self.pump()?;
                let slot = self.sockets.get_mut(id)?;
                if !slot.rx.is_empty() {
                    return Ok(true);
                }
                if !slot.connected() && !slot.pending_notification {
                    return Ok(false);
                }
                slot.pending_notification = false;
                let chunk = self.config.secure_read_chunk.min(slot.rx.free());
                if chunk == 0 {
                    return Ok(false);
                }
                let was_connected = slot.connected();
                let pulled = self.pull(id, chunk)?;
                if pulled.reported == 0 && was_connected {
                    self.probe_connected(id)?;
                }
                Ok(pulled.captured > 0)
            }
        }
    }

    /// Issue one read-data command for at most `max` bytes and move the
    /// payload into the socket's buffer, returning how many bytes were
    /// captured. Payload that does not fit is consumed from the link and
    /// lost, so a short count after a full buffer means overflow.
    pub fn read_data(&mut self, id: SocketId, max: usize) -> Result<usize, Error> {
        self.sockets.get(id)?.kind().ok_or(Error::NotOpen)?;
        self.pull(id, max).map(|pulled| pulled.captured)
    }

    pub(crate) fn pull(&mut self, id: SocketId, max: usize) -> Result<Pulled, Error> {
        let kind = self.sockets.get(id)?.kind().ok_or(Error::NotOpen)?;
        let dialect = self.dialect;
        let profile = dialect.profile(kind);
        at!(self, profile.read, id, ',', max)?;
        let terminators = Terminators::new(&[profile.read_reply, OK, ERROR]);
        if self.wait_for(self.config.command_timeout_ms, &terminators) != Some(1) {
            return Ok(Pulled::default());
        }

        // <address>,<type>,<length>\r\n<payload>
        self.skip_until(b',');
        self.skip_until(b',');
        let reported = self
            .read_int(b"\n")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);

        let mut consumed = 0;
        let mut captured = 0;
        while consumed < reported {
            let Some(byte) = self.next_byte() else {
                warn!("socket {}: payload cut short at {} of {}", id, consumed, reported);
                break;
            };
            consumed += 1;
            if self.sockets.get_mut(id)?.rx.push(byte) {
                captured += 1;
            }
        }
        if captured < consumed {
            warn!("socket {}: receive buffer full, dropped {} bytes", id, consumed - captured);
        }
        self.wait_response(self.config.command_timeout_ms);

        let slot = self.sockets.get_mut(id)?;
        match kind {
            SocketKind::Plain => {
                slot.remote_available = slot.remote_available.saturating_sub(reported);
            }
            // A full chunk may have left more behind, even after a close.
            SocketKind::Secure if max > 0 && reported >= max => slot.pending_notification = true,
            SocketKind::Secure => {}
        }
        trace!("socket {}: pulled {}/{} bytes", id, captured, reported);
        Ok(Pulled { reported, captured })
    }

    /// Ask how many bytes the modem holds for plain socket `id`.
    fn probe_available(&mut self, id: SocketId) -> Result<usize, Error> {
        let dialect = self.dialect;
        let profile = &dialect.plain;
        at!(self, profile.read, id, ',', 0u8)?;
        let terminators = Terminators::new(&[profile.read_reply, OK, ERROR]);
        if self.wait_for(self.config.command_timeout_ms, &terminators) != Some(1) {
            return Ok(0);
        }
        self.skip_until(b',');
        self.skip_until(b',');
        let waiting = self
            .read_int(b"\n")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        self.wait_response(self.config.command_timeout_ms);
        debug!("socket {}: {} bytes waiting", id, waiting);
        Ok(waiting)
    }

    /// Query the modem's view of secure socket `id`. A definite "not
    /// connected" answer marks the socket closed; no answer at all leaves it
    /// as it was.
    fn probe_connected(&mut self, id: SocketId) -> Result<bool, Error> {
        let dialect = self.dialect;
        at!(self, dialect.state_query)?;
        let terminators = Terminators::new(&[dialect.state_reply, OK, ERROR]);

        let mut connected = false;
        let mut answered = false;
        loop {
            match self.wait_for(self.config.command_timeout_ms, &terminators) {
                Some(1) => {}
                Some(_) => {
                    answered = true;
                    break;
                }
                None => break,
            }
            // <id>,<type>,<address>,<port>,<state>[,...]
            let Some(line) = self.read_field(b",\n") else {
                break;
            };
            if line.delim == b'\n' || line.int() != Some(id as i32) {
                if line.delim == b',' {
                    self.skip_until(b'\n');
                }
                continue;
            }
            for _ in 0..3 {
                self.skip_until(b',');
            }
            if let Some(state) = self.read_field(b",\n") {
                connected = state.trimmed() == dialect.state_connected.as_bytes();
                if state.delim == b',' {
                    self.skip_until(b'\n');
                }
            }
        }

        let slot = self.sockets.get_mut(id)?;
        if answered && !connected {
            debug!("socket {}: modem reports it closed", id);
            slot.mark_remote_closed();
        }
        Ok(slot.connected())
    }

    /// Catch up with the modem outside of any command.
    ///
    /// Every plain socket flagged by a data-ready notification gets its
    /// waiting byte count refreshed, then any bytes already sitting in the
    /// transport are run through the matcher so their notifications are
    /// applied. Sockets flagged during that second step are refreshed too.
    /// Call it regularly when no other socket operation is running.
    pub fn pump(&mut self) -> Result<(), Error> {
        self.refresh_pending()?;
        let mut drained = false;
        while self.transport.available() > 0 {
            self.wait_for(self.config.pump_timeout_ms, &Terminators::none());
            drained = true;
        }
        if drained {
            self.refresh_pending()?;
        }
        Ok(())
    }

    fn refresh_pending(&mut self) -> Result<(), Error> {
        let pending: Vec<SocketId, MAX_SOCKETS> = self.sockets.pending_plain().collect();
        for id in pending {
            self.sockets.get_mut(id)?.pending_notification = false;
            let waiting = self.probe_available(id)?;
            self.sockets.get_mut(id)?.remote_available = waiting;
        }
        Ok(())
    }

    /// Bytes that can be read from socket `id` without waiting: what is
    /// buffered locally plus what the modem reports holding. Secure sockets
    /// cannot be asked, so an empty secure buffer is refilled only when a
    /// notification says the modem holds data for it.
    pub fn available(&mut self, id: SocketId) -> Result<usize, Error> {
        let Some(kind) = self.sockets.get(id)?.kind() else {
            return Ok(0);
        };
        if self.sockets.get(id)?.rx.is_empty() {
            self.pump()?;
            let slot = self.sockets.get_mut(id)?;
            if kind == SocketKind::Secure && slot.rx.is_empty() && slot.pending_notification {
                slot.pending_notification = false;
                let chunk = self.config.secure_read_chunk.min(slot.rx.free());
                self.pull(id, chunk)?;
            }
        }
        let slot = self.sockets.get(id)?;
        Ok(slot.locally_buffered() + slot.remote_available)
    }

    /// Whether socket `id` is connected, after applying any pending
    /// notifications. Buffered data may still be readable when this is
    /// `false`.
    pub fn is_connected(&mut self, id: SocketId) -> bool {
        if self.pump().is_err() {
            trace!("socket {}: pump failed", id);
        }
        self.sockets.get(id).is_ok_and(|slot| slot.connected())
    }
}

/// Hostnames and addresses are sent quoted, so they must be printable and
/// free of quotes.
fn valid_host(host: &str) -> bool {
    !host.is_empty() && host.bytes().all(|b| b.is_ascii_graphic() && b != b'"')
}

/// Socket id printed ahead of `confirm` on the last line of `reply`, as in
/// `2, CONNECT OK`.
fn echoed_id(reply: &[u8], confirm: &[u8]) -> Option<i32> {
    let head = reply.strip_suffix(confirm)?;
    let line = head.rsplit(|&b| b == b'\n').next()?;
    parse_int(line)
}
