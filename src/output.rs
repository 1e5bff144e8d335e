// SPDX-License-Identifier: MIT
//
// Output buffering and minimal escape emission.
//
// Two pieces cooperate on the render hot path:
//
//   OutputBuffer — accumulates every byte of a frame in memory so the
//   whole update reaches the terminal in a single write. No per-escape
//   syscalls, no partially-painted frames.
//
//   CellEmitter — remembers the last attribute pair and cursor position
//   it emitted and skips what wouldn't change anything. A run of cells
//   sharing one style costs one SGR sequence, and sequential cells cost
//   no cursor moves at all (the terminal advances on its own).
//
// The emitter's state is only valid within one present pass; the renderer
// invalidates it before each diff so the first changed cell always gets
// explicit positioning and attributes.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use crate::caps::Capabilities;
use crate::cell::Attr;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// Byte accumulator for a single terminal write.
///
/// Default capacity: 16 KB — enough for most frames without reallocation.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a capability template or any other string.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Append one character as UTF-8, whatever its encoded byte width.
    #[inline]
    pub fn push_char(&mut self, ch: char) {
        let mut enc = [0u8; 4];
        self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
    }

    /// Drop the accumulated bytes, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to `w` and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing happens via flush_to; this satisfies write! users.
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellEmitter ─────────────────────────────────────────────────────────────

/// Stateful emitter that skips redundant attribute and cursor output.
///
/// Tracks the last *emitted* attribute pair (not per-cell state) so runs
/// of same-styled cells share one SGR sequence, and tracks where the
/// terminal cursor landed so sequential writes need no explicit moves.
pub struct CellEmitter {
    /// Attribute pair the terminal currently has active, if known.
    last_attr: Option<(Attr, Attr)>,
    /// Column and row the terminal cursor occupies, if known.
    cursor: Option<(usize, usize)>,
}

impl CellEmitter {
    /// Create an emitter with no known terminal state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_attr: None,
            cursor: None,
        }
    }

    /// Forget all tracked state.
    ///
    /// Called at the start of each present pass and after anything else
    /// wrote to the terminal (a clear, a mode switch): stale tracking
    /// would suppress output the terminal actually needs.
    pub const fn invalidate(&mut self) {
        self.last_attr = None;
        self.cursor = None;
    }

    /// Emit an attribute change iff `(fg, bg)` differs from the last
    /// emitted pair.
    ///
    /// The sequence starts from a full reset (sgr0) so no stale style
    /// leaks between runs, then layers color codes and style bits. As in
    /// the attribute model's wire format, bold is honored on the
    /// foreground operand and underline on the background operand.
    pub fn send_attr(&mut self, out: &mut OutputBuffer, caps: &Capabilities, fg: Attr, bg: Attr) {
        if self.last_attr == Some((fg, bg)) {
            return;
        }
        self.last_attr = Some((fg, bg));

        out.push_str(caps.sgr0);

        let fgcol = fg.color();
        let bgcol = bg.color();
        if fgcol != Attr::DEFAULT {
            if bgcol != Attr::DEFAULT {
                let _ = write!(out, "\x1b[3{};4{}m", fgcol.bits(), bgcol.bits());
            } else {
                let _ = write!(out, "\x1b[3{}m", fgcol.bits());
            }
        } else if bgcol != Attr::DEFAULT {
            let _ = write!(out, "\x1b[4{}m", bgcol.bits());
        }

        if fg.is_bold() {
            out.push_str("\x1b[1m");
        }
        if bg.is_underline() {
            out.push_str("\x1b[4m");
        }
    }

    /// Emit one character at `(x, y)`, moving the cursor only when the
    /// terminal isn't already there.
    pub fn send_char(
        &mut self,
        out: &mut OutputBuffer,
        caps: &Capabilities,
        x: usize,
        y: usize,
        ch: char,
    ) {
        if self.cursor != Some((x, y)) {
            caps.move_cursor(out, x, y);
        }
        out.push_char(ch);
        // The terminal advances by the character's display width; a cell
        // always occupies at least one column.
        let advance = ch.width().unwrap_or(1).max(1);
        self.cursor = Some((x + advance, y));
    }
}

impl Default for CellEmitter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
