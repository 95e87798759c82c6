//! Scripted MC20 stand-in and a virtual clock for driving the modem in tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use libgsm::modem::{Clock, Config, DEFAULT_RX_BUFFER, MAX_SOCKETS, Modem, Transport};
use libgsm::network::{Read, Write};

pub const PEER: &str = "10.0.0.1";

/// Virtual milliseconds shared by the clock and the fake modem.
#[derive(Debug, Clone, Default)]
pub struct Timeline(Rc<Cell<u64>>);

impl Timeline {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

/// Time moves 1 ms per yield and by the full amount per delay.
#[derive(Debug)]
pub struct VirtualClock {
    time: Timeline,
}

impl Clock for VirtualClock {
    fn now_ms(&mut self) -> u64 {
        self.time.now()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.time.advance(ms as u64);
    }

    fn yield_now(&mut self) {
        self.time.advance(1);
    }
}

/// What the far end of one modem socket looks like.
#[derive(Debug, Default, Clone)]
pub struct RemoteSocket {
    pub open: bool,
    pub secure: bool,
    /// Received from the peer, held by the modem until read.
    pub waiting: VecDeque<u8>,
    /// Payload the driver sent.
    pub sent: Vec<u8>,
}

#[derive(Debug)]
struct PendingSend {
    id: usize,
    remaining: usize,
    start: usize,
}

/// Answers AT commands the way an MC20 does, one reply per command line.
#[derive(Debug)]
pub struct FakeModem {
    time: Timeline,
    inbox: VecDeque<u8>,
    scheduled: Vec<(u64, Vec<u8>)>,
    line: Vec<u8>,
    payload: Option<PendingSend>,
    pub commands: Vec<String>,
    pub sockets: [RemoteSocket; MAX_SOCKETS],
    /// Peers echo back whatever they receive.
    pub echo: bool,
    /// Ignore every command.
    pub silent: bool,
    /// Refuse every plain open with `CONNECT FAIL`.
    pub refuse: bool,
    /// Socket id reported in open confirmations instead of the requested one.
    pub confirm_as: Option<usize>,
    /// Status reported in secure open confirmations.
    pub tls_status: u8,
    /// Report unacknowledged bytes forever.
    pub never_ack: bool,
}

impl FakeModem {
    fn new(time: Timeline) -> Self {
        Self {
            time,
            inbox: VecDeque::new(),
            scheduled: Vec::new(),
            line: Vec::new(),
            payload: None,
            commands: Vec::new(),
            sockets: Default::default(),
            echo: false,
            silent: false,
            refuse: false,
            confirm_as: None,
            tls_status: 0,
            never_ack: false,
        }
    }

    /// Make `bytes` readable right away.
    pub fn push(&mut self, bytes: &[u8]) {
        self.inbox.extend(bytes);
    }

    /// Make `bytes` readable once virtual time reaches `at`.
    pub fn schedule(&mut self, at: u64, bytes: &[u8]) {
        self.scheduled.push((at, bytes.to_vec()));
        self.scheduled.sort_by_key(|(at, _)| *at);
    }

    /// The peer sends `data`; the modem buffers it and raises a notification.
    pub fn peer_sends(&mut self, id: usize, data: &[u8]) {
        self.sockets[id].waiting.extend(data);
        if self.sockets[id].secure {
            self.push(format!("\r\n+QSSLURC: \"recv\",{id}\r\n").as_bytes());
        } else {
            self.push(format!("\r\n+QIRDI: 0,1,{id}\r\n").as_bytes());
        }
    }

    /// The peer hangs up and the modem says so.
    pub fn peer_closes(&mut self, id: usize) {
        self.sockets[id].open = false;
        if self.sockets[id].secure {
            self.push(format!("\r\n+QSSLURC: \"closed\",{id}\r\n").as_bytes());
        } else {
            self.push(format!("\r\n+QIURC: \"closed\",{id}\r\n").as_bytes());
        }
    }

    /// Number of commands sent that start with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.commands.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn last_command(&self) -> Option<&str> {
        self.commands.last().map(String::as_str)
    }

    fn release_due(&mut self) {
        let now = self.time.now();
        while self.scheduled.first().is_some_and(|(at, _)| *at <= now) {
            let (_, bytes) = self.scheduled.remove(0);
            self.inbox.extend(bytes);
        }
    }

    fn reply(&mut self, text: &str) {
        self.push(text.as_bytes());
    }

    fn accept(&mut self, byte: u8) {
        if let Some(send) = self.payload.as_mut() {
            self.sockets[send.id].sent.push(byte);
            send.remaining -= 1;
            if send.remaining == 0 {
                let PendingSend { id, start, .. } = self.payload.take().unwrap();
                self.reply("\r\nSEND OK\r\n");
                if self.echo {
                    let data = self.sockets[id].sent[start..].to_vec();
                    self.peer_sends(id, &data);
                }
            }
            return;
        }

        self.line.push(byte);
        if self.line.ends_with(b"\r\n") {
            let mut line = std::mem::take(&mut self.line);
            line.truncate(line.len() - 2);
            self.execute(String::from_utf8_lossy(&line).into_owned());
        }
    }

    fn execute(&mut self, line: String) {
        self.commands.push(line.clone());
        if self.silent {
            return;
        }
        let Some(command) = line.strip_prefix("AT") else {
            return;
        };
        let (name, args) = command.split_once('=').unwrap_or((command, ""));
        let args: Vec<&str> = args.split(',').collect();
        let num = |i: usize| -> usize { args[i].trim().parse().unwrap() };

        match name {
            "" => self.reply("\r\nOK\r\n"),
            "+QIOPEN" => {
                let id = num(0);
                self.sockets[id] = RemoteSocket::default();
                if self.refuse {
                    self.reply(&format!("\r\nOK\r\n\r\n{id}, CONNECT FAIL\r\n"));
                    return;
                }
                let confirmed = self.confirm_as.unwrap_or(id);
                self.sockets[id].open = confirmed == id;
                self.reply(&format!("\r\nOK\r\n\r\n{confirmed}, CONNECT OK\r\n"));
            }
            "+QSSLOPEN" => {
                let id = num(0);
                assert_eq!(num(1), id, "context id mirrors the socket id");
                self.sockets[id] = RemoteSocket {
                    secure: true,
                    ..Default::default()
                };
                let confirmed = self.confirm_as.unwrap_or(id);
                let status = self.tls_status;
                self.sockets[id].open = confirmed == id && status == 0;
                self.reply(&format!("\r\nOK\r\n\r\n+QSSLOPEN: {confirmed},{status}\r\n"));
            }
            "+QICLOSE" | "+QSSLCLOSE" => {
                let id = num(0);
                if !self.sockets[id].open {
                    self.reply("\r\nERROR\r\n");
                } else if name == "+QICLOSE" {
                    self.sockets[id].open = false;
                    self.reply(&format!("\r\n{id}, CLOSE OK\r\n"));
                } else {
                    self.sockets[id].open = false;
                    self.reply("\r\nCLOSE OK\r\n");
                }
            }
            "+QISEND" | "+QSSLSEND" => {
                let (id, len) = (num(0), num(1));
                if !self.sockets[id].open {
                    self.reply("\r\nERROR\r\n");
                    return;
                }
                let start = self.sockets[id].sent.len();
                self.payload = Some(PendingSend {
                    id,
                    remaining: len,
                    start,
                });
                self.reply("\r\n> ");
            }
            "+QISACK" => {
                let id = num(0);
                let sent = self.sockets[id].sent.len();
                let unacked = if self.never_ack { sent.min(12) } else { 0 };
                self.reply(&format!(
                    "\r\n+QISACK: {sent}, {}, {unacked}\r\n\r\nOK\r\n",
                    sent - unacked
                ));
            }
            "+QIRD" => {
                let (id, max) = (num(2), num(3));
                let waiting = self.sockets[id].waiting.len();
                if waiting == 0 {
                    self.reply("\r\nOK\r\n");
                } else if max == 0 {
                    self.reply(&format!("\r\n+QIRD: {PEER}:80,TCP,{waiting}\r\n\r\nOK\r\n"));
                } else {
                    let data = self.take_waiting(id, max);
                    self.reply(&format!("\r\n+QIRD: {PEER}:80,TCP,{}\r\n", data.len()));
                    self.push(&data);
                    self.reply("\r\nOK\r\n");
                }
            }
            "+QSSLRECV" => {
                let (id, max) = (num(1), num(2));
                let data = self.take_waiting(id, max);
                self.reply(&format!("\r\n+QSSLRECV: 0,{id},{}\r\n", data.len()));
                self.push(&data);
                self.reply("\r\nOK\r\n");
            }
            "+QSSLSTATE" => {
                for id in 0..MAX_SOCKETS {
                    if !self.sockets[id].secure {
                        continue;
                    }
                    let state = if self.sockets[id].open { "CONNECTED" } else { "CLOSED" };
                    self.reply(&format!(
                        "\r\n+QSSLSTATE: {id},\"TCP\",\"{PEER}\",443,\"{state}\",0\r\n"
                    ));
                }
                self.reply("\r\nOK\r\n");
            }
            _ => self.reply("\r\nERROR\r\n"),
        }
    }

    fn take_waiting(&mut self, id: usize, max: usize) -> Vec<u8> {
        let waiting = &mut self.sockets[id].waiting;
        let n = max.min(waiting.len());
        waiting.drain(..n).collect()
    }
}

impl Read for FakeModem {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.release_due();
        let mut n = 0;
        while n < buf.len() {
            match self.inbox.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for FakeModem {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            self.accept(byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Transport for FakeModem {
    fn available(&mut self) -> usize {
        self.release_due();
        self.inbox.len()
    }
}

pub type TestModem<const RX: usize> = Modem<FakeModem, VirtualClock, RX>;

/// A driver wired to a fresh fake modem, plus a handle on virtual time.
pub fn setup() -> (TestModem<DEFAULT_RX_BUFFER>, Timeline) {
    setup_with(Config::default())
}

pub fn setup_with<const RX: usize>(config: Config) -> (TestModem<RX>, Timeline) {
    let time = Timeline::default();
    let fake = FakeModem::new(time.clone());
    let clock = VirtualClock { time: time.clone() };
    (Modem::with_config(fake, clock, config), time)
}

/// Shorthand for the fake behind a driver.
pub fn fake<const RX: usize>(modem: &mut TestModem<RX>) -> &mut FakeModem {
    modem.transport_mut()
}
