// SPDX-License-Identifier: MIT
//
// termgrid — a minimal cell-grid terminal toolkit.
//
// The terminal is modeled as a grid of styled cells behind a pair of
// buffers: callers paint the back buffer however they like, and
// `present` diffs it against the front buffer (the terminal's last
// known contents) to emit the smallest escape-sequence update. Input
// arrives as decoded key events from a background reader thread, with
// window resizes folded into the same event stream.
//
// Layer map, bottom up:
//
//   cell      Attr and Cell, the two value types everything carries
//   buffer    CellBuffer, the flat row-major grid
//   caps      escape-sequence capability table (xterm built in)
//   output    byte accumulator + stateful sequence emitter
//   screen    back/front pair, cursor, diff renderer (pure)
//   input     event model + escape-sequence decoder (pure)
//   reader    background tty reader with ping-pong buffer reuse
//   signal    SIGWINCH latches
//   terminal  the tty session tying it all together
//
// `screen` and `input` touch no OS state, so the render and decode
// contracts are tested without a terminal.

pub mod buffer;
pub mod caps;
pub mod cell;
pub mod input;
pub mod output;
pub mod screen;

#[cfg(unix)]
pub mod reader;
#[cfg(unix)]
mod signal;
#[cfg(unix)]
pub mod terminal;

pub use buffer::CellBuffer;
pub use cell::{Attr, Cell};
pub use input::{Event, InputMode, Key, KeyEvent, Mod};
pub use screen::{CURSOR_HIDDEN, Screen};

#[cfg(unix)]
pub use terminal::{Error, Terminal};
