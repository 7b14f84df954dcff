//! Fixtures and an in-memory serial port for unit tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Sampling readback captured from a YC99T-5C bench.
pub(crate) const SAMPLING_RESPONSE: [u8; 91] = [
    0x7E, 0x53, 0x00, 0x00, 0x00, 0xB2, 0x00, 0x00, 0x7D, 0xFF, 0x5B, 0x43, 0x00, 0x00, 0x00,
    0x00, 0xE0, 0xFF, 0x9F, 0x40, 0x00, 0x00, 0x00, 0x00, 0x93, 0x7F, 0x89, 0x44, 0x52, 0xFB,
    0x4E, 0xBD, 0x6C, 0x00, 0x5C, 0x43, 0x00, 0x00, 0x70, 0x43, 0xD6, 0x00, 0xA0, 0x40, 0x8F,
    0x02, 0x70, 0x43, 0xFF, 0x80, 0x89, 0x44, 0x64, 0x35, 0xF1, 0xBD, 0xD2, 0xFF, 0x5B, 0x43,
    0x00, 0x00, 0xF0, 0x42, 0x60, 0x00, 0xA0, 0x40, 0x1F, 0x05, 0xF0, 0x42, 0x36, 0x80, 0x89,
    0x44, 0xA1, 0x38, 0xC9, 0xBD, 0x64, 0x40, 0x4E, 0x45, 0xEB, 0x7A, 0x88, 0xBE, 0xF5, 0x1C,
    0xFF,
];

/// How long the mock reader blocks before reporting silence.
const READ_GAP: Duration = Duration::from_millis(5);

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;
type Replies = Arc<Mutex<VecDeque<Vec<Vec<u8>>>>>;

/// Scripted serial port: every write pops the next queued reply into the read side.
#[derive(Clone, Default)]
pub(crate) struct MockPort {
    inbox: Queue,
    replies: Replies,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockPort {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reader(&self) -> MockReader {
        MockReader {
            inbox: Arc::clone(&self.inbox),
        }
    }

    pub(crate) fn writer(&self) -> MockWriter {
        MockWriter {
            port: self.clone(),
        }
    }

    /// Queues a reply that becomes readable after the next write.
    pub(crate) fn reply_with(&self, bytes: Vec<u8>) {
        self.reply_in_chunks(vec![bytes]);
    }

    /// Queues a reply that arrives as several reads with no gap between them.
    pub(crate) fn reply_in_chunks(&self, chunks: Vec<Vec<u8>>) {
        self.replies.lock().unwrap().push_back(chunks);
    }

    /// Makes bytes readable right away, as consecutive reads with no gap between them.
    pub(crate) fn inject(&self, chunks: &[&[u8]]) {
        let mut inbox = self.inbox.lock().unwrap();
        for chunk in chunks {
            inbox.push_back(chunk.to_vec());
        }
    }

    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }
}

pub(crate) struct MockReader {
    inbox: Queue,
}

impl Read for MockReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let next = self.inbox.lock().unwrap().pop_front();
        match next {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    let rest = chunk.split_off(n);
                    self.inbox.lock().unwrap().push_front(rest);
                }
                Ok(n)
            }
            None => {
                thread::sleep(READ_GAP);
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
            }
        }
    }
}

pub(crate) struct MockWriter {
    port: MockPort,
}

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.written.lock().unwrap().push(buf.to_vec());
        if let Some(chunks) = self.port.replies.lock().unwrap().pop_front() {
            self.port.inbox.lock().unwrap().extend(chunks);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
