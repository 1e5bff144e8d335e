// SPDX-License-Identifier: MIT
//
// InputReader — the background thread that pulls raw bytes off the tty.
//
// Byte buffers travel on a pair of channels in a ping-pong: the data
// channel is a rendezvous (capacity 0), so a send blocks until the
// consumer takes the chunk, and the hand-back channel (capacity 1)
// returns the emptied buffer for reuse. At most one buffer is in flight,
// the reader never reads ahead of the consumer, and steady-state input
// allocates nothing.
//
// The read loop polls with a short timeout so a stop request is noticed
// within one tick even when the tty is silent.

#![allow(unsafe_code)]

use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::JoinHandle;

/// Capacity each traveling buffer is (re)sized to before a read.
const READ_BUF_SIZE: usize = 4096;

/// How long one poll tick waits before rechecking the stop flag.
const POLL_TIMEOUT_MS: i32 = 50;

/// Handle to the reader thread. Dropping it stops the thread.
pub struct InputReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl InputReader {
    /// Spawn a reader on `fd`.
    ///
    /// Returns the handle plus the consumer's two channel ends: chunks of
    /// input arrive on the receiver, and each received buffer must be
    /// cleared and pushed back through the sender before the reader will
    /// deliver the next chunk.
    #[must_use]
    pub fn spawn(fd: RawFd) -> (Self, Receiver<Vec<u8>>, SyncSender<Vec<u8>>) {
        let (data_tx, data_rx) = sync_channel::<Vec<u8>>(0);
        let (back_tx, back_rx) = sync_channel::<Vec<u8>>(1);
        let stop = Arc::new(AtomicBool::new(false));

        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("termgrid-input".into())
            .spawn(move || reader_loop(fd, &data_tx, &back_rx, &thread_stop))
            .expect("spawn input reader thread");

        (
            Self {
                handle: Some(handle),
                stop,
            },
            data_rx,
            back_tx,
        )
    }

    /// Signal the thread to exit and wait for it. Idempotent.
    ///
    /// The caller must have dropped its data receiver first if the reader
    /// could be blocked mid-send; a disconnected send also ends the loop.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reader_loop(
    fd: RawFd,
    data_tx: &SyncSender<Vec<u8>>,
    back_rx: &Receiver<Vec<u8>>,
    stop: &AtomicBool,
) {
    let mut buf = vec![0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Acquire) {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: pfd points at one valid pollfd for the duration of the call.
        let ready = unsafe { libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS) };
        if ready < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            break;
        }
        if ready == 0 || pfd.revents & libc::POLLIN == 0 {
            continue;
        }

        // SAFETY: buf holds READ_BUF_SIZE writable bytes at this point.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            break;
        }
        if n == 0 {
            break; // EOF
        }
        #[allow(clippy::cast_sign_loss)] // n > 0 checked above.
        buf.truncate(n as usize);

        // Rendezvous: blocks until the consumer takes the chunk.
        if data_tx.send(buf).is_err() {
            return;
        }
        // Then wait for the emptied buffer to come back.
        let Ok(returned) = back_rx.recv() else { return };
        buf = returned;
        buf.clear();
        buf.resize(READ_BUF_SIZE, 0);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::io::FromRawFd;
    use std::time::Duration;

    /// A unix pipe standing in for the tty fd.
    fn pipe() -> (RawFd, std::fs::File) {
        let mut fds = [0; 2];
        // SAFETY: fds points at two writable ints.
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0);
        // SAFETY: fds[1] is the freshly created write end, owned here.
        let writer = unsafe { std::fs::File::from_raw_fd(fds[1]) };
        (fds[0], writer)
    }

    #[test]
    fn delivers_written_bytes() {
        let (read_fd, mut writer) = pipe();
        let (mut reader, data_rx, _back_tx) = InputReader::spawn(read_fd);

        writer.write_all(b"hello").unwrap();
        let chunk = data_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(&chunk[..], b"hello");

        drop(data_rx);
        reader.stop();
    }

    #[test]
    fn second_chunk_waits_for_hand_back() {
        let (read_fd, mut writer) = pipe();
        let (mut reader, data_rx, back_tx) = InputReader::spawn(read_fd);

        writer.write_all(b"one").unwrap();
        let mut chunk = data_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(&chunk[..], b"one");

        // Buffer not returned yet: the next chunk must not arrive.
        writer.write_all(b"two").unwrap();
        assert!(
            data_rx.recv_timeout(Duration::from_millis(200)).is_err(),
            "chunk delivered before buffer hand-back"
        );

        chunk.clear();
        back_tx.send(chunk).unwrap();
        let chunk = data_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(&chunk[..], b"two");

        drop(data_rx);
        reader.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let (read_fd, _writer) = pipe();
        let (mut reader, data_rx, _back_tx) = InputReader::spawn(read_fd);
        drop(data_rx);
        reader.stop();
        reader.stop();
        // SAFETY: read_fd was opened by pipe() above and is no longer read.
        unsafe { libc::close(read_fd) };
    }

    #[test]
    fn thread_exits_when_receiver_dropped() {
        let (read_fd, mut writer) = pipe();
        let (mut reader, data_rx, _back_tx) = InputReader::spawn(read_fd);
        drop(data_rx);
        // A pending write must not wedge stop(): the send fails and the
        // loop returns.
        writer.write_all(b"x").unwrap();
        reader.stop();
        // SAFETY: as above.
        unsafe { libc::close(read_fd) };
    }
}
