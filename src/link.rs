//! Serial transaction engine.
//!
//! A background reader accumulates incoming bytes and treats a read that
//! returns nothing within the port timeout as the end of a frame. The finished
//! buffer is published into a single slot; [`Link::transaction`] writes a
//! frame and waits for that slot to fill.

use std::io::{self, Read, Write};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serialport::{DataBits, Parity, StopBits};

use crate::error::{Error, Result};

const READ_CHUNK: usize = 256;

/// Timing of the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Silence that ends a frame; also the read timeout of the port.
    pub silence_gap: Duration,
    /// Longest single wait between checks of the receive slot.
    pub poll_interval: Duration,
    /// Default time to wait for a response.
    pub transaction_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            silence_gap: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
            transaction_timeout: Duration::from_secs(10),
        }
    }
}

/// State shared between the caller and the reader thread.
struct Shared {
    slot: Mutex<Option<Vec<u8>>>,
    ready: Condvar,
    running: AtomicBool,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Option<Vec<u8>>> {
        // The slot holds plain bytes, a panic elsewhere cannot leave it half-written.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, pending: &mut Vec<u8>) {
        if pending.is_empty() {
            return;
        }
        let buffer = mem::take(pending);
        debug!("RX {}", hex::encode_upper(&buffer));
        let mut slot = self.lock_slot();
        if let Some(old) = slot.replace(buffer) {
            warn!("Unclaimed buffer overwritten - {} bytes dropped", old.len());
        }
        self.ready.notify_all();
    }
}

/// Clears the in-flight flag when a transaction ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An open connection to the instrument.
pub struct Link {
    writer: Mutex<Box<dyn Write + Send>>,
    shared: Arc<Shared>,
    in_flight: AtomicBool,
    config: LinkConfig,
    reader: Option<JoinHandle<()>>,
}

impl Link {
    /// Opens `path` at `baud_rate` (8N1) and starts the reader thread.
    pub fn open(path: &str, baud_rate: u32, config: LinkConfig) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(config.silence_gap)
            .open()?;
        let reader = port.try_clone()?;
        info!("Opened {} at {} baud", path, baud_rate);
        Self::spawn(reader, Box::new(port), config)
    }

    /// Starts the reader thread on any reader/writer pair.
    ///
    /// `reader` must return (with zero bytes or a timeout error) when no data
    /// arrives within roughly `config.silence_gap`.
    pub fn spawn<R>(reader: R, writer: Box<dyn Write + Send>, config: LinkConfig) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(None),
            ready: Condvar::new(),
            running: AtomicBool::new(true),
        });
        let thread_shared = Arc::clone(&shared);
        let gap = config.silence_gap;
        let handle = thread::Builder::new()
            .name("geny-reader".into())
            .spawn(move || read_loop(reader, &thread_shared, gap))?;
        Ok(Self {
            writer: Mutex::new(writer),
            shared,
            in_flight: AtomicBool::new(false),
            config,
            reader: Some(handle),
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Writes `frame` and waits up to `timeout` for the next received buffer.
    ///
    /// Returns `Ok(None)` when nothing arrives in time and [`Error::Busy`] when
    /// another transaction is still waiting.
    pub fn transaction(&self, frame: &[u8], timeout: Duration) -> Result<Option<Vec<u8>>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        if let Some(stale) = self.shared.lock_slot().take() {
            warn!("Discarding {} stale bytes: {}", stale.len(), hex::encode_upper(&stale));
        }

        debug!("TX {}", hex::encode_upper(frame));
        {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            writer.write_all(frame)?;
            writer.flush()?;
        }

        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.lock_slot();
        loop {
            if let Some(buffer) = slot.take() {
                return Ok(Some(buffer));
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("No response within {:?}", timeout);
                return Ok(None);
            }
            let wait = (deadline - now).min(self.config.poll_interval);
            slot = self
                .shared
                .ready
                .wait_timeout(slot, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Stops the reader thread and waits for it to exit.
    pub fn close(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                warn!("Serial reader thread panicked");
            }
            info!("Serial link closed");
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_loop<R: Read>(mut reader: R, shared: &Shared, gap: Duration) {
    let mut chunk = [0u8; READ_CHUNK];
    let mut pending = Vec::new();
    while shared.running.load(Ordering::Acquire) {
        match reader.read(&mut chunk) {
            Ok(0) => shared.publish(&mut pending),
            Ok(n) => pending.extend_from_slice(&chunk[..n]),
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                shared.publish(&mut pending)
            }
            Err(e) => {
                warn!("Serial read error: {}", e);
                shared.publish(&mut pending);
                thread::sleep(gap);
            }
        }
    }
    debug!("Serial reader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_command, ResponseFrame};
    use crate::testing::MockPort;

    fn config() -> LinkConfig {
        LinkConfig {
            silence_gap: Duration::from_millis(5),
            poll_interval: Duration::from_millis(20),
            transaction_timeout: Duration::from_millis(500),
        }
    }

    fn link(port: &MockPort) -> Link {
        Link::spawn(port.reader(), Box::new(port.writer()), config()).unwrap()
    }

    #[test]
    fn transaction_returns_the_reply() {
        let port = MockPort::new();
        let reply = ResponseFrame::encode(0x80, 0, &[]);
        port.reply_with(reply.clone());
        let link = link(&port);

        let login = encode_command(0x80, &[]);
        let received = link.transaction(&login, Duration::from_secs(2)).unwrap();
        assert_eq!(received, Some(reply));
        assert_eq!(port.written(), vec![login]);
    }

    #[test]
    fn consecutive_reads_are_joined_until_silence() {
        let port = MockPort::new();
        let link = link(&port);
        let reply = ResponseFrame::encode(0xD2, 0, &[0; 80]);
        let (head, tail) = reply.split_at(30);

        port.reply_in_chunks(vec![head.to_vec(), tail.to_vec()]);

        let received = link
            .transaction(&encode_command(0xD2, &[1]), Duration::from_secs(2))
            .unwrap();
        assert_eq!(received, Some(reply));
    }

    #[test]
    fn times_out_within_one_poll_interval() {
        let port = MockPort::new();
        let link = link(&port);
        let timeout = Duration::from_millis(200);

        let started = Instant::now();
        let received = link.transaction(&encode_command(0x80, &[]), timeout).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(received, None);
        assert!(elapsed >= timeout, "returned after {:?}", elapsed);
        // One poll interval plus scheduling slack.
        assert!(
            elapsed < timeout + link.config().poll_interval + Duration::from_millis(150),
            "returned after {:?}",
            elapsed
        );
    }

    #[test]
    fn stale_buffer_is_not_returned_to_the_next_transaction() {
        let port = MockPort::new();
        let link = link(&port);

        port.inject(&[&[0x7E, 0x00, 0xFF]]);
        thread::sleep(Duration::from_millis(100));

        let received = link
            .transaction(&encode_command(0x81, &[]), Duration::from_millis(100))
            .unwrap();
        assert_eq!(received, None);
    }

    #[test]
    fn concurrent_transaction_is_busy() {
        let port = MockPort::new();
        let link = Arc::new(link(&port));

        let waiting = {
            let link = Arc::clone(&link);
            thread::spawn(move || link.transaction(&encode_command(0x80, &[]), Duration::from_millis(400)))
        };
        thread::sleep(Duration::from_millis(100));

        let second = link.transaction(&encode_command(0x81, &[]), Duration::from_millis(50));
        assert!(matches!(second, Err(Error::Busy)));
        assert_eq!(waiting.join().unwrap().unwrap(), None);

        // The guard is released once the first call returns.
        port.reply_with(vec![0x7E, 0xFF]);
        let third = link
            .transaction(&encode_command(0x81, &[]), Duration::from_secs(2))
            .unwrap();
        assert_eq!(third, Some(vec![0x7E, 0xFF]));
    }

    #[test]
    fn close_stops_the_reader() {
        let port = MockPort::new();
        let mut link = link(&port);
        link.close();
        assert!(link.reader.is_none());
        // Closing twice is harmless.
        link.close();
    }
}
