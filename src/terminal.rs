// SPDX-License-Identifier: MIT
//
// Terminal — the tty session. Owns the raw-mode switch, the alternate
// screen, the resize latches, and the input pipeline; everything grid-
// and byte-shaped lives in `screen` and `input`.
//
// One session per process: the terminal is a singleton resource, and a
// second `init` while one is live is an error rather than a fight over
// termios state.

#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Mutex, Once};
use std::time::Duration;

use crate::cell::{Attr, Cell};
use crate::input::{Event, InputMode, extract_event};
use crate::reader::InputReader;
use crate::screen::Screen;

/// How long `poll_event` waits on the input channel between checks of
/// the resize latch. A wake on this tick never resolves a held escape
/// sequence; only further input or shutdown does that.
const WAKE_MS: u64 = 50;

/// Geometry fallback when the size query fails.
const FALLBACK_SIZE: (i32, i32) = (80, 24);

/// Escape bytes a panic must get out even with all state lost: cursor
/// visible, attributes reset, normal screen, keypad mode off.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[?25h\x1b[m\x1b[?1049l\x1b[?1l\x1b>";

/// Errors raised while opening the terminal session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("stdin/stdout is not a terminal")]
    NotATty,
    #[error("a terminal session is already open in this process")]
    AlreadyOpen,
}

/// Guards the one-session-per-process invariant.
static LIVE: AtomicBool = AtomicBool::new(false);

/// The termios state a panic handler restores, while a session is live.
static TERMIOS_BACKUP: Mutex<Option<(RawFd, libc::termios)>> = Mutex::new(None);

static PANIC_HOOK: Once = Once::new();

fn backup_slot() -> std::sync::MutexGuard<'static, Option<(RawFd, libc::termios)>> {
    TERMIOS_BACKUP
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Undoes raw mode and clears the termios backup if session setup fails
/// between `enter_raw_mode` and the `Terminal` being constructed.
/// Disarmed on success; from then on `Terminal::close` owns the restore.
struct RawModeGuard {
    fd: RawFd,
    orig: libc::termios,
    armed: bool,
}

impl RawModeGuard {
    fn arm(fd: RawFd, orig: libc::termios) -> Self {
        *backup_slot() = Some((fd, orig));
        Self {
            fd,
            orig,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.armed {
            // SAFETY: fd is still open (the caller holds the File) and
            // orig came from tcgetattr on the same fd.
            unsafe {
                libc::tcsetattr(self.fd, libc::TCSAFLUSH, &raw const self.orig);
            }
            *backup_slot() = None;
        }
    }
}

/// A live terminal session.
///
/// Obtained from [`Terminal::init`]; dropping it (or calling
/// [`shutdown`](Self::shutdown)) restores the terminal.
pub struct Terminal {
    screen: Screen,
    out: File,
    // Held so the input fd stays open for the reader thread.
    _input: File,
    in_fd: RawFd,
    orig_termios: libc::termios,
    input_mode: InputMode,
    pending: Vec<u8>,
    data_rx: Option<Receiver<Vec<u8>>>,
    back_tx: SyncSender<Vec<u8>>,
    reader: InputReader,
    closed: bool,
}

impl Terminal {
    /// Open the session: raw mode, alternate screen, hidden cursor,
    /// resize handler, input reader.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyOpen`] if a session is live in this process,
    /// [`Error::NotATty`] if the controlling terminal cannot be used,
    /// [`Error::Io`] for any OS failure along the way.
    pub fn init() -> Result<Self, Error> {
        if LIVE.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyOpen);
        }
        Self::open_session().inspect_err(|_| LIVE.store(false, Ordering::Release))
    }

    fn open_session() -> Result<Self, Error> {
        let input = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
        let mut out = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
        let in_fd = input.as_raw_fd();

        // SAFETY: in_fd is a valid open descriptor.
        if unsafe { libc::isatty(in_fd) } == 0 {
            return Err(Error::NotATty);
        }

        let orig_termios = enter_raw_mode(in_fd)?;
        // From here until the session is constructed, any failure must
        // undo raw mode and drop the backup: no Terminal exists yet, so
        // Drop cannot, and a stale backup would point the panic hook at
        // a recycled fd.
        let guard = RawModeGuard::arm(in_fd, orig_termios);
        install_panic_hook();

        let caps = crate::caps::Capabilities::xterm();
        out.write_all(caps.enter_ca.as_bytes())?;
        out.write_all(caps.enter_keypad.as_bytes())?;
        out.write_all(caps.hide_cursor.as_bytes())?;
        out.write_all(caps.clear_screen.as_bytes())?;
        out.flush()?;

        let (w, h) = query_size(out.as_raw_fd());
        crate::signal::install();
        let (reader, data_rx, back_tx) = InputReader::spawn(in_fd);
        guard.disarm();

        #[allow(clippy::cast_sign_loss)] // query_size never returns negatives.
        let (w, h) = (w as usize, h as usize);
        Ok(Self {
            screen: Screen::new(w, h, caps),
            out,
            _input: input,
            in_fd,
            orig_termios,
            input_mode: InputMode::Esc,
            pending: Vec::new(),
            data_rx: Some(data_rx),
            back_tx,
            reader,
            closed: false,
        })
    }

    // ── Drawing ─────────────────────────────────────────────────────────

    /// Grid dimensions as `(width, height)`.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> (i32, i32) {
        self.screen.size()
    }

    /// Write one cell into the back buffer. Out-of-range is a no-op.
    #[inline]
    pub fn put_cell(&mut self, x: i32, y: i32, cell: Cell) {
        self.screen.put_cell(x, y, cell);
    }

    /// [`put_cell`](Self::put_cell) from individual fields.
    #[inline]
    pub fn change_cell(&mut self, x: i32, y: i32, ch: char, fg: Attr, bg: Attr) {
        self.screen.change_cell(x, y, ch, fg, bg);
    }

    /// Copy a `w`-wide rectangle of cells into the back buffer.
    #[inline]
    pub fn blit(&mut self, x: i32, y: i32, w: usize, cells: &[Cell]) {
        self.screen.blit(x, y, w, cells);
    }

    /// Reset the back buffer to blanks with the clear attributes.
    ///
    /// Consumes any pending resize first, so the clear applies to the
    /// current geometry.
    pub fn clear(&mut self) {
        self.apply_pending_resize();
        self.screen.clear();
    }

    /// Set the attributes later [`clear`](Self::clear) calls paint with.
    pub const fn set_clear_attributes(&mut self, fg: Attr, bg: Attr) {
        self.screen.set_clear_attributes(fg, bg);
    }

    /// Position the cursor; `(-1, -1)` hides it.
    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.screen.set_cursor(x, y);
    }

    /// Hide the cursor.
    pub fn hide_cursor(&mut self) {
        self.screen.hide_cursor();
    }

    /// Diff the back buffer against what the terminal shows and flush
    /// the minimal update.
    ///
    /// Consumes any pending resize first. Write failures are dropped;
    /// the next present retries against a terminal that is either back
    /// or gone for good.
    pub fn present(&mut self) {
        self.apply_pending_resize();
        self.screen.present();
        self.flush_output();
    }

    fn apply_pending_resize(&mut self) {
        if crate::signal::draw_take() {
            let (w, h) = query_size(self.out.as_raw_fd());
            #[allow(clippy::cast_sign_loss)] // query_size never returns negatives.
            self.screen.resize(w as usize, h as usize);
        }
    }

    fn flush_output(&mut self) {
        if !self.screen.output_bytes().is_empty() {
            let _ = self.out.write_all(self.screen.output_bytes());
            let _ = self.out.flush();
            self.screen.clear_output();
        }
    }

    // ── Input ───────────────────────────────────────────────────────────

    /// Block until the next event.
    ///
    /// Key events come from the decoder over whatever bytes have
    /// arrived; a resize observed on the input latch yields
    /// [`Event::Resize`] with fresh geometry. A lone ESC with no
    /// follow-up bytes is held, not timed out.
    pub fn poll_event(&mut self) -> Event {
        let keys = self.screen.caps().keys;
        if let Some(event) = extract_event(&mut self.pending, self.input_mode, keys) {
            return event;
        }
        loop {
            if crate::signal::input_take() {
                let (w, h) = query_size(self.out.as_raw_fd());
                return Event::Resize { w, h };
            }
            let Some(rx) = self.data_rx.as_ref() else {
                // Reader is gone; only resizes can still arrive.
                std::thread::sleep(Duration::from_millis(WAKE_MS));
                continue;
            };
            match rx.recv_timeout(Duration::from_millis(WAKE_MS)) {
                Ok(mut chunk) => {
                    self.pending.extend_from_slice(&chunk);
                    chunk.clear();
                    let _ = self.back_tx.send(chunk);
                    if let Some(event) = extract_event(&mut self.pending, self.input_mode, keys) {
                        return event;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.data_rx = None,
            }
        }
    }

    /// Set how a leading ESC byte is interpreted, returning the mode now
    /// in effect. [`InputMode::Current`] queries without changing it.
    pub const fn set_input_mode(&mut self, mode: InputMode) -> InputMode {
        if !matches!(mode, InputMode::Current) {
            self.input_mode = mode;
        }
        self.input_mode
    }

    // ── Shutdown ────────────────────────────────────────────────────────

    /// Restore the terminal and end the session. Equivalent to dropping.
    pub fn shutdown(self) {}

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let caps = self.screen.caps();
        let _ = self.out.write_all(caps.show_cursor.as_bytes());
        let _ = self.out.write_all(caps.sgr0.as_bytes());
        let _ = self.out.write_all(caps.clear_screen.as_bytes());
        let _ = self.out.write_all(caps.exit_ca.as_bytes());
        let _ = self.out.write_all(caps.exit_keypad.as_bytes());
        let _ = self.out.flush();

        // SAFETY: in_fd is still open (we hold the File) and orig_termios
        // came from tcgetattr on the same fd.
        unsafe {
            libc::tcsetattr(self.in_fd, libc::TCSAFLUSH, &raw const self.orig_termios);
        }
        *backup_slot() = None;

        // Unblock a reader parked mid-send, then join it.
        drop(self.data_rx.take());
        self.reader.stop();

        LIVE.store(false, Ordering::Release);
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.close();
    }
}

// ─── Raw mode and geometry ───────────────────────────────────────────────────

/// Switch `fd` to raw mode, returning the previous termios state.
fn enter_raw_mode(fd: RawFd) -> std::io::Result<libc::termios> {
    // SAFETY: zeroed termios is a valid out-param for tcgetattr.
    let mut orig: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: fd is a valid tty descriptor, orig points at writable memory.
    if unsafe { libc::tcgetattr(fd, &raw mut orig) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let mut edited = orig;
    raw_termios(&mut edited);

    // SAFETY: edited is fully initialized above.
    if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const edited) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(orig)
}

/// Apply the raw-mode flag edits in place: no echo, no line buffering,
/// no signal keys, no flow control, no output post-processing, 8-bit
/// chars, byte-at-a-time reads.
fn raw_termios(t: &mut libc::termios) {
    t.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON);
    t.c_oflag &= !libc::OPOST;
    t.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    t.c_cflag &= !(libc::CSIZE | libc::PARENB);
    t.c_cflag |= libc::CS8;
    t.c_cc[libc::VMIN] = 1;
    t.c_cc[libc::VTIME] = 0;
}

/// Query the window size, falling back to 80x24 when the ioctl fails.
fn query_size(fd: RawFd) -> (i32, i32) {
    // SAFETY: zeroed winsize is a valid out-param for TIOCGWINSZ.
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    // SAFETY: ws points at writable memory for the duration of the call.
    let rc = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) };
    if rc != 0 || ws.ws_col == 0 || ws.ws_row == 0 {
        return FALLBACK_SIZE;
    }
    (i32::from(ws.ws_col), i32::from(ws.ws_row))
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some((fd, orig)) = *backup_slot() {
                // SAFETY: fd and orig were captured from a live session;
                // worst case the fd is stale and the calls fail harmlessly.
                unsafe {
                    libc::write(
                        fd,
                        EMERGENCY_RESTORE.as_ptr().cast(),
                        EMERGENCY_RESTORE.len(),
                    );
                    libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const orig);
                }
            }
            previous(info);
        }));
    });
}

// ─── Tests ───────────────────────────────────────────────────────────────────
