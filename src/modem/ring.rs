//! Fixed-capacity receive queue owned by each modem socket.

use heapless::Deque;

/// A bounded FIFO of received bytes.
///
/// Capacity is fixed at compile time. Pushing into a full buffer drops the
/// byte and reports it, which is how socket reads surface overflow.
///
/// # Examples
///
/// ```rust
/// use libgsm::modem::ring::RingBuffer;
///
/// let mut rx: RingBuffer<4> = RingBuffer::new();
/// assert_eq!(rx.extend(b"hello"), 4);
/// assert_eq!(rx.free(), 0);
///
/// let mut out = [0u8; 8];
/// assert_eq!(rx.pop_into(&mut out), 4);
/// assert_eq!(&out[..4], b"hell");
/// ```
#[derive(Debug)]
pub struct RingBuffer<const N: usize> {
    queue: Deque<u8, N>,
}

impl<const N: usize> RingBuffer<N> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Total capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Space left before the buffer is full.
    pub fn free(&self) -> usize {
        N - self.queue.len()
    }

    /// Queue one byte. Returns `false` if the buffer was full and the byte
    /// was dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        self.queue.push_back(byte).is_ok()
    }

    /// Queue as many bytes of `data` as fit, returning how many were taken.
    pub fn extend(&mut self, data: &[u8]) -> usize {
        let mut taken = 0;
        for &byte in data {
            if !self.push(byte) {
                break;
            }
            taken += 1;
        }
        taken
    }

    /// Remove the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        self.queue.pop_front()
    }

    /// Look at the oldest byte without removing it.
    pub fn peek(&self) -> Option<u8> {
        self.queue.front().copied()
    }

    /// Move up to `out.len()` bytes into `out`, oldest first.
    pub fn pop_into(&mut self, out: &mut [u8]) -> usize {
        let mut count = 0;
        while count < out.len() {
            match self.queue.pop_front() {
                Some(byte) => {
                    out[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
