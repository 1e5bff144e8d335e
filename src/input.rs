// SPDX-License-Identifier: MIT
//
// Terminal input decoding.
//
// Turns raw tty bytes into structured key events. The decoder is a total
// function over the pending byte buffer: every call either produces one
// event (consuming a prefix of the buffer) or reports that more bytes are
// needed. It never fails and never panics, whatever the byte content.
//
// The hard part is the inherent ESC ambiguity. A 0x1B byte can be a
// standalone Escape keypress or the start of a multi-byte escape sequence,
// and the byte stream alone cannot distinguish the two. The rules here:
//
// - The buffer holds an exact known sequence → the named key.
// - The buffer is a strict, still-extendable prefix of a known sequence →
//   hold and wait for more bytes.
// - No known sequence can possibly match → the input mode decides:
//   Esc mode consumes the 0x1B as a literal Escape key; Alt mode consumes
//   it as a modifier prefix and re-classifies the rest with ALT set.
// - A lone 0x1B with nothing after it is held regardless of mode. There is
//   deliberately no timeout: the decoder waits for the next read.
//
// Multi-byte UTF-8 is never mis-decoded from a partial prefix: a lead byte
// whose continuation bytes have not all arrived is held. Bytes that cannot
// begin or complete a valid sequence decode as U+FFFD, one byte at a time.

use bitflags::bitflags;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Identity of a named (non-character) key.
///
/// Control keys carry their ASCII control byte value, so many constants
/// alias ([`Key::ENTER`] is Ctrl-M, [`Key::TAB`] is Ctrl-I, and so on).
/// Function and navigation keys are numbered down from `0xFFFF`, matching
/// the order of the capability key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub u16);

impl Key {
    // ── Function / navigation keys (0xFFFF downward) ────────────
    pub const F1: Self = Self(0xFFFF);
    pub const F2: Self = Self(0xFFFE);
    pub const F3: Self = Self(0xFFFD);
    pub const F4: Self = Self(0xFFFC);
    pub const F5: Self = Self(0xFFFB);
    pub const F6: Self = Self(0xFFFA);
    pub const F7: Self = Self(0xFFF9);
    pub const F8: Self = Self(0xFFF8);
    pub const F9: Self = Self(0xFFF7);
    pub const F10: Self = Self(0xFFF6);
    pub const F11: Self = Self(0xFFF5);
    pub const F12: Self = Self(0xFFF4);
    pub const INSERT: Self = Self(0xFFF3);
    pub const DELETE: Self = Self(0xFFF2);
    pub const HOME: Self = Self(0xFFF1);
    pub const END: Self = Self(0xFFF0);
    pub const PGUP: Self = Self(0xFFEF);
    pub const PGDN: Self = Self(0xFFEE);
    pub const ARROW_UP: Self = Self(0xFFED);
    pub const ARROW_DOWN: Self = Self(0xFFEC);
    pub const ARROW_LEFT: Self = Self(0xFFEB);
    pub const ARROW_RIGHT: Self = Self(0xFFEA);

    // ── Control range (the byte itself) ─────────────────────────
    pub const CTRL_TILDE: Self = Self(0x00);
    pub const CTRL_2: Self = Self(0x00);
    pub const CTRL_A: Self = Self(0x01);
    pub const CTRL_B: Self = Self(0x02);
    pub const CTRL_C: Self = Self(0x03);
    pub const CTRL_D: Self = Self(0x04);
    pub const CTRL_E: Self = Self(0x05);
    pub const CTRL_F: Self = Self(0x06);
    pub const CTRL_G: Self = Self(0x07);
    pub const BACKSPACE: Self = Self(0x08);
    pub const CTRL_H: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const CTRL_I: Self = Self(0x09);
    pub const CTRL_J: Self = Self(0x0A);
    pub const CTRL_K: Self = Self(0x0B);
    pub const CTRL_L: Self = Self(0x0C);
    pub const ENTER: Self = Self(0x0D);
    pub const CTRL_M: Self = Self(0x0D);
    pub const CTRL_N: Self = Self(0x0E);
    pub const CTRL_O: Self = Self(0x0F);
    pub const CTRL_P: Self = Self(0x10);
    pub const CTRL_Q: Self = Self(0x11);
    pub const CTRL_R: Self = Self(0x12);
    pub const CTRL_S: Self = Self(0x13);
    pub const CTRL_T: Self = Self(0x14);
    pub const CTRL_U: Self = Self(0x15);
    pub const CTRL_V: Self = Self(0x16);
    pub const CTRL_W: Self = Self(0x17);
    pub const CTRL_X: Self = Self(0x18);
    pub const CTRL_Y: Self = Self(0x19);
    pub const CTRL_Z: Self = Self(0x1A);
    pub const ESC: Self = Self(0x1B);
    pub const CTRL_LSQ_BRACKET: Self = Self(0x1B);
    pub const CTRL_3: Self = Self(0x1B);
    pub const CTRL_4: Self = Self(0x1C);
    pub const CTRL_BACKSLASH: Self = Self(0x1C);
    pub const CTRL_5: Self = Self(0x1D);
    pub const CTRL_RSQ_BRACKET: Self = Self(0x1D);
    pub const CTRL_6: Self = Self(0x1E);
    pub const CTRL_7: Self = Self(0x1F);
    pub const CTRL_SLASH: Self = Self(0x1F);
    pub const CTRL_UNDERSCORE: Self = Self(0x1F);
    pub const SPACE: Self = Self(0x20);
    pub const BACKSPACE2: Self = Self(0x7F);
    pub const CTRL_8: Self = Self(0x7F);
}

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Mod: u8 {
        /// The Alt key, reported as an ESC prefix in Alt input mode.
        const ALT = 0x01;
    }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A keyboard event.
///
/// Exactly one of `key` / `ch` is meaningful: when `ch` is `'\0'` the event
/// is a named key identified by `key`; when `ch` is any other character the
/// event is that character and `key` must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Active modifiers ([`Mod::ALT`] or empty).
    pub mods: Mod,
    /// Named key, valid only when `ch == '\0'`.
    pub key: Key,
    /// Character, `'\0'` for named keys.
    pub ch: char,
}

/// A decoded terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),
    /// The terminal was resized to `w` columns by `h` rows.
    Resize { w: i32, h: i32 },
}

/// Policy for an ESC byte that cannot extend into any known sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Query selector for [`set_input_mode`](crate::terminal::Terminal::set_input_mode):
    /// returns the current mode without changing it.
    Current,
    /// An unmatched ESC is a literal Escape keypress.
    #[default]
    Esc,
    /// An unmatched ESC is an Alt prefix for the following key.
    Alt,
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// One entry in the known-sequence table: raw bytes and the key they name.
pub type KeySeq = (&'static [u8], Key);

/// Extract one event from the pending buffer, draining the consumed bytes.
///
/// Returns `None` when the buffer holds no complete event yet; the bytes
/// stay pending and the caller retries after the next read. Total: never
/// fails, never panics, regardless of byte content.
pub fn extract_event(pending: &mut Vec<u8>, mode: InputMode, keys: &[KeySeq]) -> Option<Event> {
    let (event, consumed) = decode(pending, mode, keys)?;
    pending.drain(..consumed);
    Some(Event::Key(event))
}

/// Classify the buffer head without mutating it.
///
/// Returns the event and the number of bytes it consumed, or `None` when
/// more bytes are needed.
fn decode(buf: &[u8], mode: InputMode, keys: &[KeySeq]) -> Option<(KeyEvent, usize)> {
    let first = *buf.first()?;

    if first == 0x1B {
        return decode_escape(buf, mode, keys);
    }

    // Control range, space, and backspace are named keys carrying their
    // own byte value; the character field stays zero.
    if first <= 0x20 || first == 0x7F {
        return Some((named(Key(u16::from(first))), 1));
    }

    decode_utf8(buf)
}

/// Classify a buffer known to start with ESC (0x1B).
fn decode_escape(buf: &[u8], mode: InputMode, keys: &[KeySeq]) -> Option<(KeyEvent, usize)> {
    if buf.len() == 1 {
        // A lone ESC is indistinguishable from a sequence in flight.
        // Held in both modes; the next read resolves it.
        return None;
    }

    // Longest exact match wins; any strict extendable prefix holds.
    let mut matched: Option<(usize, Key)> = None;
    let mut extendable = false;
    for &(seq, key) in keys {
        if buf.len() >= seq.len() {
            if buf[..seq.len()] == *seq && matched.is_none_or(|(n, _)| seq.len() > n) {
                matched = Some((seq.len(), key));
            }
        } else if seq.starts_with(buf) {
            extendable = true;
        }
    }
    if let Some((consumed, key)) = matched {
        return Some((named(key), consumed));
    }
    if extendable {
        return None;
    }

    match mode {
        InputMode::Alt => {
            // ESC is a modifier prefix: re-classify the rest and tag it.
            let (mut event, consumed) = decode(&buf[1..], mode, keys)?;
            event.mods |= Mod::ALT;
            Some((event, consumed + 1))
        }
        // Esc mode (and the Current selector, which a session never
        // stores): the ESC byte alone is the Escape key.
        InputMode::Esc | InputMode::Current => Some((named(Key::ESC), 1)),
    }
}

/// Decode a UTF-8 character from the buffer head.
fn decode_utf8(buf: &[u8]) -> Option<(KeyEvent, usize)> {
    let Some(len) = utf8_len(buf[0]) else {
        // Not a valid lead byte (bare continuation or 0xF8..). Consume it
        // as U+FFFD so the stream stays decodable.
        return Some((character(char::REPLACEMENT_CHARACTER), 1));
    };
    if buf.len() < len {
        // Never mis-decode a partial sequence: wait for the rest.
        return None;
    }
    if let Ok(s) = std::str::from_utf8(&buf[..len]) {
        if let Some(ch) = s.chars().next() {
            return Some((character(ch), len));
        }
    }
    Some((character(char::REPLACEMENT_CHARACTER), 1))
}

/// Expected sequence length for a UTF-8 lead byte, `None` if it isn't one.
///
/// ASCII never reaches here (handled by the control/character split above)
/// but is mapped anyway to keep the function total.
const fn utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None,
    }
}

const fn named(key: Key) -> KeyEvent {
    KeyEvent {
        mods: Mod::empty(),
        key,
        ch: '\0',
    }
}

const fn character(ch: char) -> KeyEvent {
    KeyEvent {
        mods: Mod::empty(),
        key: Key(0),
        ch,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
