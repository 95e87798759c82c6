//! Command vocabulary of a modem family.
//!
//! Everything vendor specific lives here as data: directive names, the
//! terminators that acknowledge them, deadlines and notification prefixes.
//! The engine picks the [`Profile`] for a socket from its
//! [`SocketKind`](super::socket::SocketKind) tag and never branches on the
//! modem model itself.

use super::socket::SocketKind;

/// How the arguments of an open directive are laid out after the socket id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenForm {
    /// `<id>,"<protocol>","<host>",<port>`
    Protocol(&'static str),
    /// `<id>,<context id>,"<host>",<port>,<mode>`, where the context id
    /// mirrors the socket id.
    Context {
        /// Trailing access-mode argument.
        mode: u8,
    },
}

/// Commands and replies for one socket variant.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    /// Open directive, without the `AT` prefix.
    pub open: &'static str,
    pub open_form: OpenForm,
    /// Reply that confirms the connection.
    pub open_confirm: &'static [u8],
    /// Reply that reports a refused connection, when the modem sends one.
    pub open_refused: Option<&'static [u8]>,
    /// The confirmation is followed by `<id>,<status>` that must echo the
    /// request, status `0` meaning success.
    pub confirm_carries_status: bool,
    pub open_timeout_ms: u32,

    pub close: &'static str,
    pub close_ok: &'static [u8],
    pub close_timeout_ms: u32,

    /// Send directive, followed by `<id>,<len>`.
    pub send: &'static str,
    pub send_prompt: &'static [u8],
    pub send_ok: &'static [u8],

    /// Read directive, followed by `<id>,<len>`.
    pub read: &'static str,
    pub read_reply: &'static [u8],

    /// Poll unacknowledged bytes after every send.
    pub ack_drain: bool,
}

/// Full vocabulary of a modem family.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    /// Human-readable family name, used in logs.
    pub name: &'static str,
    pub plain: Profile,
    pub secure: Profile,

    /// Unacknowledged-bytes query, followed by `<id>`.
    pub ack_query: &'static str,
    /// Reply header; the unacknowledged count is the third field.
    pub ack_reply: &'static [u8],

    /// Overall secure-socket status query.
    pub state_query: &'static str,
    /// Per-socket line header of the status reply.
    pub state_reply: &'static [u8],
    /// Value of the state field that means "connected".
    pub state_connected: &'static str,

    /// `"<subtype>",<id>` follows; subtype `closed` is handled.
    pub urc_closed: &'static [u8],
    /// `<context>,<role>,<id>[,...]` follows.
    pub urc_data_ready: &'static [u8],
    /// `"<subtype>",<id>` follows; subtypes `recv` and `closed` are handled.
    pub urc_secure: &'static [u8],
}

impl Dialect {
    /// Profile matching a socket variant.
    pub fn profile(&self, kind: SocketKind) -> &Profile {
        match kind {
            SocketKind::Plain => &self.plain,
            SocketKind::Secure => &self.secure,
        }
    }

    /// Notification prefixes, in the order the matcher checks them.
    pub fn urc_prefixes(&self) -> [&'static [u8]; 3] {
        [self.urc_closed, self.urc_data_ready, self.urc_secure]
    }
}

/// Quectel MC20 (and the M66/M95 family sharing its TCP/IP command set).
pub const MC20: Dialect = Dialect {
    name: "MC20",
    plain: Profile {
        open: "+QIOPEN=",
        open_form: OpenForm::Protocol("TCP"),
        open_confirm: b"CONNECT OK",
        open_refused: Some(b"CONNECT FAIL"),
        confirm_carries_status: false,
        open_timeout_ms: 75_000,
        close: "+QICLOSE=",
        close_ok: b", CLOSE OK",
        close_timeout_ms: 1_000,
        send: "+QISEND=",
        send_prompt: b">",
        send_ok: b"\r\nSEND OK",
        read: "+QIRD=0,1,",
        read_reply: b"+QIRD:",
        ack_drain: true,
    },
    secure: Profile {
        open: "+QSSLOPEN=",
        open_form: OpenForm::Context { mode: 0 },
        open_confirm: b"\r\n+QSSLOPEN:",
        open_refused: None,
        confirm_carries_status: true,
        open_timeout_ms: 90_000,
        close: "+QSSLCLOSE=",
        close_ok: b"CLOSE OK",
        close_timeout_ms: 1_000,
        send: "+QSSLSEND=",
        send_prompt: b">",
        send_ok: b"\r\nSEND OK",
        read: "+QSSLRECV=0,",
        read_reply: b"+QSSLRECV:",
        ack_drain: false,
    },
    ack_query: "+QISACK=",
    ack_reply: b"+QISACK:",
    state_query: "+QSSLSTATE",
    state_reply: b"+QSSLSTATE:",
    state_connected: "CONNECTED",
    urc_closed: b"\r\n+QIURC:",
    urc_data_ready: b"\r\n+QIRDI:",
    urc_secure: b"\r\n+QSSLURC:",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_follow_socket_kind() {
        assert_eq!(MC20.profile(SocketKind::Plain).close, "+QICLOSE=");
        assert_eq!(MC20.profile(SocketKind::Secure).close, "+QSSLCLOSE=");
    }

    #[test]
    fn secure_open_waits_longer_than_plain() {
        assert!(MC20.secure.open_timeout_ms > MC20.plain.open_timeout_ms);
    }

    #[test]
    fn only_plain_sockets_drain_acks() {
        assert!(MC20.plain.ack_drain);
        assert!(!MC20.secure.ack_drain);
    }
}
