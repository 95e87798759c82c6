use std::collections::VecDeque;

use libgsm::modem::{Clock, Transport};
use libgsm::network::{Read, Write};

pub mod matcher;
pub mod read;

/// Serial link that answers each command line instantly.
#[derive(Default)]
pub struct Link {
    inbox: VecDeque<u8>,
    line: Vec<u8>,
    /// Payload served to every read-data command.
    pub payload: Vec<u8>,
}

impl Link {
    pub fn push(&mut self, bytes: &[u8]) {
        self.inbox.extend(bytes);
    }

    fn respond(&mut self, line: &str) {
        let reply = if line.starts_with("AT+QIOPEN=") {
            let id = &line["AT+QIOPEN=".len()..][..1];
            format!("\r\nOK\r\n\r\n{id}, CONNECT OK\r\n")
        } else if line.starts_with("AT+QSSLOPEN=") {
            let id = &line["AT+QSSLOPEN=".len()..][..1];
            format!("\r\nOK\r\n\r\n+QSSLOPEN: {id},0\r\n")
        } else if line.ends_with(",0") && line.starts_with("AT+QIRD=") {
            format!("\r\n+QIRD: 10.0.0.1:80,TCP,{}\r\n\r\nOK\r\n", self.payload.len())
        } else if line.starts_with("AT+QIRD=") {
            format!("\r\n+QIRD: 10.0.0.1:80,TCP,{}\r\n", self.payload.len())
        } else if line.starts_with("AT+QSSLRECV=") {
            format!("\r\n+QSSLRECV: 0,0,{}\r\n", self.payload.len())
        } else {
            "\r\nOK\r\n".to_string()
        };
        self.inbox.extend(reply.as_bytes());
        if (line.starts_with("AT+QIRD=") && !line.ends_with(",0")) || line.starts_with("AT+QSSLRECV=") {
            let payload = self.payload.clone();
            self.inbox.extend(payload);
            self.inbox.extend(b"\r\nOK\r\n");
        }
    }
}

impl Read for Link {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.inbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for Link {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            self.line.push(byte);
            if self.line.ends_with(b"\r\n") {
                let line = String::from_utf8_lossy(&self.line[..self.line.len() - 2]).into_owned();
                self.line.clear();
                self.respond(&line);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Transport for Link {
    fn available(&mut self) -> usize {
        self.inbox.len()
    }
}

/// Time only moves when the driver yields or sleeps.
#[derive(Default)]
pub struct Ticks(u64);

impl Clock for Ticks {
    fn now_ms(&mut self) -> u64 {
        self.0
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0 += ms as u64;
    }

    fn yield_now(&mut self) {
        self.0 += 1;
    }
}
