//! Response matcher and the bounded field readers used to parse replies.

use heapless::Vec;

use super::transport::{Clock, Transport, read_byte};
use super::urc::Urc;
use super::Modem;
use crate::fmt::{Bytes, debug, trace};

/// Bytes of trailing context kept while matching. Must be at least as long
/// as the longest terminator or notification prefix.
pub const MATCH_WINDOW: usize = 64;

/// Longest reply field kept by [`Field`]; extra bytes are dropped.
pub(crate) const FIELD_LEN: usize = 32;

/// Generic success reply.
pub const OK: &[u8] = b"OK\r\n";
/// Generic failure reply.
pub const ERROR: &[u8] = b"ERROR\r\n";

const SLOTS: usize = 5;

/// Up to five literal replies a caller is waiting for.
///
/// Slots are numbered from 1. The default set holds [`OK`] in slot 1 and
/// [`ERROR`] in slot 2; [`Terminators::new`] overrides slots from the front,
/// so a caller waiting for one custom reply still stops on `ERROR`.
///
/// # Examples
///
/// ```rust
/// use libgsm::modem::matcher::{ERROR, Terminators};
///
/// let t = Terminators::new(&[b">"]);
/// assert_eq!(t.get(1), Some(&b">"[..]));
/// assert_eq!(t.get(2), Some(ERROR));
/// assert_eq!(t.get(3), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminators<'a> {
    slots: [Option<&'a [u8]>; SLOTS],
}

impl<'a> Terminators<'a> {
    /// No terminators at all: the matcher only processes notifications until
    /// the deadline.
    pub const fn none() -> Self {
        Self {
            slots: [None; SLOTS],
        }
    }

    /// Defaults with the first `overrides.len()` slots replaced. Anything
    /// past the fifth entry is ignored.
    pub fn new(overrides: &[&'a [u8]]) -> Self {
        let mut terminators = Self::default();
        for (slot, &value) in terminators.slots.iter_mut().zip(overrides) {
            *slot = Some(value);
        }
        terminators
    }

    /// Terminator in 1-based slot `index`.
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        index
            .checked_sub(1)
            .and_then(|i| self.slots.get(i).copied().flatten())
    }

    /// 1-based index of the first terminator `window` ends with.
    pub fn match_suffix(&self, window: &[u8]) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(t) if !t.is_empty() && window.ends_with(t)))
            .map(|i| i + 1)
    }
}

impl Default for Terminators<'_> {
    fn default() -> Self {
        Self {
            slots: [Some(OK), Some(ERROR), None, None, None],
        }
    }
}

/// Receives every byte the matcher accepts into its window.
pub(crate) trait Capture {
    fn push(&mut self, byte: u8);
    fn reset(&mut self);
}

impl<const N: usize> Capture for Vec<u8, N> {
    fn push(&mut self, byte: u8) {
        let _ = Vec::<u8, N>::push(self, byte);
    }

    fn reset(&mut self) {
        self.clear();
    }
}

/// Rolling tail of the incoming stream.
struct Window {
    bytes: Vec<u8, MATCH_WINDOW>,
}

impl Window {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn push(&mut self, byte: u8) {
        if self.bytes.is_full() {
            self.bytes.remove(0);
        }
        let _ = self.bytes.push(byte);
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn clear(&mut self) {
        self.bytes.clear();
    }
}

/// One field of a reply body and the delimiter that ended it.
#[derive(Debug)]
pub(crate) struct Field {
    pub text: Vec<u8, FIELD_LEN>,
    pub delim: u8,
}

impl Field {
    pub fn int(&self) -> Option<i32> {
        parse_int(&self.text)
    }

    /// Field text without surrounding whitespace or quotes.
    pub fn trimmed(&self) -> &[u8] {
        trim(&self.text)
    }
}

/// Leading decimal integer of `text`, after whitespace and quotes.
pub(crate) fn parse_int(text: &[u8]) -> Option<i32> {
    let text = trim(text);
    let (negative, digits) = match text.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, text),
    };
    let mut value: i32 = 0;
    let mut seen = false;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = value.checked_mul(10)?.checked_add((b - b'0') as i32)?;
        seen = true;
    }
    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

fn trim(mut text: &[u8]) -> &[u8] {
    while let Some((first, rest)) = text.split_first() {
        if first.is_ascii_whitespace() || *first == b'"' {
            text = rest;
        } else {
            break;
        }
    }
    while let Some((last, rest)) = text.split_last() {
        if last.is_ascii_whitespace() || *last == b'"' {
            text = rest;
        } else {
            break;
        }
    }
    text
}

impl<T: Transport, C: Clock, const RX: usize> Modem<T, C, RX> {
    /// Consume bytes until the stream ends with one of `terminators`.
    ///
    /// Returns the 1-based slot of the terminator that matched, or `None` if
    /// `timeout_ms` elapsed first. When two terminators complete on the same
    /// byte the lower slot wins. Notifications met on the way are handled and
    /// removed from the stream; they neither reset nor extend the deadline.
    /// Null bytes are ignored.
    ///
    /// Handling a notification may re-enter this method (a secure data-ready
    /// notification pulls payload through a nested command), which is safe
    /// because all scan state lives on this call's stack.
    pub fn wait_for(&mut self, timeout_ms: u32, terminators: &Terminators<'_>) -> Option<usize> {
        self.match_reply(timeout_ms, terminators, None)
    }

    /// [`wait_for`](Self::wait_for) with the default `OK`/`ERROR` set.
    pub fn wait_response(&mut self, timeout_ms: u32) -> Option<usize> {
        self.wait_for(timeout_ms, &Terminators::default())
    }

    /// [`wait_for`](Self::wait_for) that also hands back the reply text seen
    /// since the last notification, terminator included. Text beyond `N`
    /// bytes is dropped.
    pub fn wait_for_capture<const N: usize>(
        &mut self,
        timeout_ms: u32,
        terminators: &Terminators<'_>,
        reply: &mut Vec<u8, N>,
    ) -> Option<usize> {
        reply.clear();
        self.match_reply(timeout_ms, terminators, Some(reply as &mut dyn Capture))
    }

    /// [`wait_for_capture`](Self::wait_for_capture) with the default
    /// `OK`/`ERROR` set, for queries whose answer is the reply text itself.
    pub fn wait_response_into<const N: usize>(
        &mut self,
        timeout_ms: u32,
        reply: &mut Vec<u8, N>,
    ) -> Option<usize> {
        self.wait_for_capture(timeout_ms, &Terminators::default(), reply)
    }

    fn match_reply(
        &mut self,
        timeout_ms: u32,
        terminators: &Terminators<'_>,
        mut capture: Option<&mut dyn Capture>,
    ) -> Option<usize> {
        let start = self.clock.now_ms();
        let mut window = Window::new();
        loop {
            self.clock.yield_now();
            while let Some(byte) = read_byte(&mut self.transport) {
                if byte == 0 {
                    continue;
                }
                window.push(byte);
                if let Some(sink) = capture.as_mut() {
                    sink.push(byte);
                }
                if let Some(index) = terminators.match_suffix(window.as_slice()) {
                    trace!("AT< matched slot {}", index);
                    return Some(index);
                }
                if let Some(urc) = Urc::recognise(self.dialect, window.as_slice()) {
                    self.handle_urc(urc);
                    window.clear();
                    if let Some(sink) = capture.as_mut() {
                        sink.reset();
                    }
                }
                if self.elapsed_since(start) >= timeout_ms as u64 {
                    break;
                }
            }
            if self.elapsed_since(start) >= timeout_ms as u64 {
                break;
            }
        }

        let residue = trim(window.as_slice());
        if !residue.is_empty() {
            debug!("unhandled: {}", Bytes(residue));
        }
        None
    }

    /// Wait for one byte, up to the stream timeout.
    pub(crate) fn next_byte(&mut self) -> Option<u8> {
        let start = self.clock.now_ms();
        loop {
            if let Some(byte) = read_byte(&mut self.transport) {
                return Some(byte);
            }
            if self.elapsed_since(start) >= self.config.stream_timeout_ms as u64 {
                return None;
            }
            self.clock.yield_now();
        }
    }

    /// Read up to (not including) the first byte in `delims`. `None` if the
    /// stream timeout passes first.
    pub(crate) fn read_field(&mut self, delims: &[u8]) -> Option<Field> {
        let start = self.clock.now_ms();
        let mut text = Vec::new();
        loop {
            match read_byte(&mut self.transport) {
                Some(byte) if delims.contains(&byte) => return Some(Field { text, delim: byte }),
                Some(0) => {}
                Some(byte) => {
                    let _ = text.push(byte);
                }
                None => {
                    if self.elapsed_since(start) >= self.config.stream_timeout_ms as u64 {
                        return None;
                    }
                    self.clock.yield_now();
                }
            }
        }
    }

    /// Discard through the next `delim`. `false` on timeout.
    pub(crate) fn skip_until(&mut self, delim: u8) -> bool {
        let start = self.clock.now_ms();
        loop {
            match read_byte(&mut self.transport) {
                Some(byte) if byte == delim => return true,
                Some(_) => {}
                None => {
                    if self.elapsed_since(start) >= self.config.stream_timeout_ms as u64 {
                        return false;
                    }
                    self.clock.yield_now();
                }
            }
        }
    }

    /// Integer field ending at one of `delims`.
    pub(crate) fn read_int(&mut self, delims: &[u8]) -> Option<i32> {
        self.read_field(delims).and_then(|field| field.int())
    }
}
