// SPDX-License-Identifier: MIT
//
// Terminal capabilities — the escape-sequence vocabulary.
//
// Everything the crate writes to or expects from the terminal is named
// here: mode-switch and cursor templates on the output side, and the table
// of known input sequences on the input side. The rest of the crate never
// spells out an escape sequence; it asks this module by name.
//
// The real capability database lookup (terminfo) is a collaborator outside
// this crate. What ships here is the xterm-compatible set those lookups
// resolve to on effectively every modern terminal, exposed through the
// same keyed interface a database-backed set would use.

use std::io::Write;

use crate::input::{Key, KeySeq};
use crate::output::OutputBuffer;

/// A named set of escape-sequence capabilities.
///
/// Output templates are fixed byte strings except [`move_cursor`]
/// (parameterized by position). The `keys` table maps every known input
/// escape sequence to the key it names; the decoder prefix-matches
/// against it.
///
/// [`move_cursor`]: Self::move_cursor
pub struct Capabilities {
    /// Switch to the alternate screen (smcup).
    pub enter_ca: &'static str,
    /// Restore the normal screen (rmcup).
    pub exit_ca: &'static str,
    /// Application keypad mode on (smkx).
    pub enter_keypad: &'static str,
    /// Application keypad mode off (rmkx).
    pub exit_keypad: &'static str,
    /// Make the cursor visible (cnorm).
    pub show_cursor: &'static str,
    /// Make the cursor invisible (civis).
    pub hide_cursor: &'static str,
    /// Clear the whole screen and home the cursor (clear).
    pub clear_screen: &'static str,
    /// Reset all display attributes (sgr0).
    pub sgr0: &'static str,
    /// Known input escape sequences and the keys they name.
    pub keys: &'static [KeySeq],
}

impl Capabilities {
    /// The built-in xterm-compatible capability set.
    #[inline]
    #[must_use]
    pub const fn xterm() -> &'static Self {
        &XTERM
    }

    /// Emit a cursor move to `(x, y)`.
    ///
    /// This is the one place 0-based grid coordinates become the 1-based
    /// row;column pair the terminal expects. Everything above this
    /// boundary is 0-based.
    #[inline]
    pub fn move_cursor(&self, out: &mut OutputBuffer, x: usize, y: usize) {
        // Writing into a Vec-backed buffer cannot fail.
        let _ = write!(out, "\x1b[{};{}H", y + 1, x + 1);
    }
}

/// The xterm capability set.
static XTERM: Capabilities = Capabilities {
    enter_ca: "\x1b[?1049h",
    exit_ca: "\x1b[?1049l",
    enter_keypad: "\x1b[?1h\x1b=",
    exit_keypad: "\x1b[?1l\x1b>",
    show_cursor: "\x1b[?25h",
    hide_cursor: "\x1b[?25l",
    clear_screen: "\x1b[H\x1b[2J",
    sgr0: "\x1b[m",
    keys: XTERM_KEYS,
};

/// Input sequences xterm-class terminals produce, SS3 and CSI variants
/// both. Order does not matter: the decoder takes the longest exact
/// match and holds on any extendable prefix.
static XTERM_KEYS: &[KeySeq] = &[
    (b"\x1bOP", Key::F1),
    (b"\x1bOQ", Key::F2),
    (b"\x1bOR", Key::F3),
    (b"\x1bOS", Key::F4),
    (b"\x1b[15~", Key::F5),
    (b"\x1b[17~", Key::F6),
    (b"\x1b[18~", Key::F7),
    (b"\x1b[19~", Key::F8),
    (b"\x1b[20~", Key::F9),
    (b"\x1b[21~", Key::F10),
    (b"\x1b[23~", Key::F11),
    (b"\x1b[24~", Key::F12),
    (b"\x1b[2~", Key::INSERT),
    (b"\x1b[3~", Key::DELETE),
    (b"\x1bOH", Key::HOME),
    (b"\x1b[H", Key::HOME),
    (b"\x1b[1~", Key::HOME),
    (b"\x1bOF", Key::END),
    (b"\x1b[F", Key::END),
    (b"\x1b[4~", Key::END),
    (b"\x1b[5~", Key::PGUP),
    (b"\x1b[6~", Key::PGDN),
    (b"\x1bOA", Key::ARROW_UP),
    (b"\x1b[A", Key::ARROW_UP),
    (b"\x1bOB", Key::ARROW_DOWN),
    (b"\x1b[B", Key::ARROW_DOWN),
    (b"\x1bOD", Key::ARROW_LEFT),
    (b"\x1b[D", Key::ARROW_LEFT),
    (b"\x1bOC", Key::ARROW_RIGHT),
    (b"\x1b[C", Key::ARROW_RIGHT),
];

// ─── Tests ───────────────────────────────────────────────────────────────────
