// SPDX-License-Identifier: MIT
//
// Screen — the double-buffered grid pair and the differential renderer.
//
// The back buffer is what callers paint; the front buffer mirrors what the
// terminal last showed. `present` walks both in row-major order and emits
// output only where they differ, updating the front as it goes. After the
// scan the two buffers are identical, so an unchanged screen costs zero
// bytes on the next pass.
//
// Screen is deliberately OS-free: it renders into an OutputBuffer and
// hands back the bytes. The session layer (`terminal`) owns the tty and
// the resize signals; it resolves any pending resize *before* calling in
// here, so the diff never runs against stale geometry. Keeping this type
// pure is what makes the render contract directly testable.

use crate::buffer::CellBuffer;
use crate::caps::Capabilities;
use crate::cell::{Attr, Cell};
use crate::output::{CellEmitter, OutputBuffer};

/// Cursor coordinate meaning "no cursor drawn".
pub const CURSOR_HIDDEN: i32 = -1;

/// The double-buffered cell grid with its cursor and clear state.
pub struct Screen {
    back: CellBuffer,
    front: CellBuffer,
    out: OutputBuffer,
    emitter: CellEmitter,
    caps: &'static Capabilities,
    cursor_x: i32,
    cursor_y: i32,
    clear_fg: Attr,
    clear_bg: Attr,
}

impl Screen {
    /// Create a screen with both grids blank and the cursor hidden.
    #[must_use]
    pub fn new(width: usize, height: usize, caps: &'static Capabilities) -> Self {
        Self {
            back: CellBuffer::new(width, height),
            front: CellBuffer::new(width, height),
            out: OutputBuffer::new(),
            emitter: CellEmitter::new(),
            caps,
            cursor_x: CURSOR_HIDDEN,
            cursor_y: CURSOR_HIDDEN,
            clear_fg: Attr::DEFAULT,
            clear_bg: Attr::DEFAULT,
        }
    }

    /// Grid dimensions as `(width, height)`.
    // Grid dimensions come from the terminal geometry query and fit
    // comfortably in i32.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    #[inline]
    #[must_use]
    pub const fn size(&self) -> (i32, i32) {
        (self.back.width() as i32, self.back.height() as i32)
    }

    /// The capability set this screen emits with.
    #[inline]
    #[must_use]
    pub const fn caps(&self) -> &'static Capabilities {
        self.caps
    }

    // ── Back-buffer writes ──────────────────────────────────────────────

    /// Write one cell into the back buffer. Out-of-range is a silent no-op.
    #[inline]
    pub fn put_cell(&mut self, x: i32, y: i32, cell: Cell) {
        self.back.put(x, y, cell);
    }

    /// [`put_cell`](Self::put_cell) with the cell built from its fields.
    #[inline]
    pub fn change_cell(&mut self, x: i32, y: i32, ch: char, fg: Attr, bg: Attr) {
        self.back.put(x, y, Cell::new(ch, fg, bg));
    }

    /// Copy a rectangle into the back buffer; see [`CellBuffer::blit`].
    #[inline]
    pub fn blit(&mut self, x: i32, y: i32, w: usize, cells: &[Cell]) {
        self.back.blit(x, y, w, cells);
    }

    /// Reset the back buffer to blanks carrying the clear attributes.
    pub fn clear(&mut self) {
        self.back.clear(self.clear_fg, self.clear_bg);
    }

    /// Set the attributes future [`clear`](Self::clear) calls paint with.
    pub const fn set_clear_attributes(&mut self, fg: Attr, bg: Attr) {
        self.clear_fg = fg;
        self.clear_bg = bg;
    }

    /// Direct read access to the back buffer (tests and tooling).
    #[inline]
    #[must_use]
    pub const fn back(&self) -> &CellBuffer {
        &self.back
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    /// Position the logical cursor, emitting visibility transitions.
    ///
    /// A show sequence goes out only on hidden→visible, a hide sequence
    /// only on visible→hidden; same-state calls emit neither. While
    /// visible, the new position is emitted as a move. The bytes land in
    /// the pending output and reach the terminal with the next flush.
    pub fn set_cursor(&mut self, x: i32, y: i32) {
        let was_hidden = is_cursor_hidden(self.cursor_x, self.cursor_y);
        let now_hidden = is_cursor_hidden(x, y);

        if was_hidden && !now_hidden {
            self.out.push_str(self.caps.show_cursor);
        }
        if !was_hidden && now_hidden {
            self.out.push_str(self.caps.hide_cursor);
        }

        self.cursor_x = x;
        self.cursor_y = y;
        if !now_hidden {
            #[allow(clippy::cast_sign_loss)] // Visible cursor is non-negative.
            self.caps.move_cursor(&mut self.out, x as usize, y as usize);
        }
    }

    /// Shorthand for `set_cursor(CURSOR_HIDDEN, CURSOR_HIDDEN)`.
    pub fn hide_cursor(&mut self) {
        self.set_cursor(CURSOR_HIDDEN, CURSOR_HIDDEN);
    }

    // ── Resize ──────────────────────────────────────────────────────────

    /// Adopt new terminal geometry.
    ///
    /// Both grids are reinitialized (content discarded, not reflowed) and
    /// a clear-screen goes out so the terminal matches the now-blank
    /// front buffer. The caller invokes this before any diff against the
    /// new geometry.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.back.resize(width, height);
        self.front.resize(width, height);
        self.back.clear(self.clear_fg, self.clear_bg);
        self.front.clear(self.clear_fg, self.clear_bg);

        self.emitter.invalidate();
        self.emitter
            .send_attr(&mut self.out, self.caps, self.clear_fg, self.clear_bg);
        self.out.push_str(self.caps.clear_screen);
    }

    // ── Present ─────────────────────────────────────────────────────────

    /// Diff the back buffer against the front and append the minimal
    /// update to the pending output.
    ///
    /// For every differing cell: an attribute sequence if the pair
    /// differs from the last one *emitted*, a cursor move unless the
    /// terminal is already there, then the character. The front cell is
    /// updated in place. After the scan, one final move positions the
    /// visible cursor (nothing if hidden).
    ///
    /// Cannot fail: output goes to an in-memory buffer. The caller
    /// flushes it with [`output_bytes`](Self::output_bytes) /
    /// [`clear_output`](Self::clear_output).
    pub fn present(&mut self) {
        // Anything may have touched the terminal since the last pass.
        self.emitter.invalidate();

        let width = self.back.width();
        let height = self.back.height();

        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                let cell = self.back.cells()[i];
                if self.front.cells()[i] == cell {
                    continue;
                }
                self.emitter.send_attr(&mut self.out, self.caps, cell.fg, cell.bg);
                self.emitter.send_char(&mut self.out, self.caps, x, y, cell.ch);
                self.front.cells_mut()[i] = cell;
            }
        }

        if !is_cursor_hidden(self.cursor_x, self.cursor_y) {
            #[allow(clippy::cast_sign_loss)] // Visible cursor is non-negative.
            self.caps
                .move_cursor(&mut self.out, self.cursor_x as usize, self.cursor_y as usize);
        }
    }

    /// The pending output bytes (everything accumulated since the last
    /// [`clear_output`](Self::clear_output)).
    #[inline]
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.out.as_bytes()
    }

    /// Discard the pending output after it has been written out.
    #[inline]
    pub fn clear_output(&mut self) {
        self.out.clear();
    }
}

/// Whether a coordinate pair is the hidden-cursor sentinel.
#[inline]
const fn is_cursor_hidden(x: i32, y: i32) -> bool {
    x == CURSOR_HIDDEN || y == CURSOR_HIDDEN
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn screen(w: usize, h: usize) -> Screen {
        Screen::new(w, h, Capabilities::xterm())
    }

    /// Present and return the emitted bytes as a string, leaving the
    /// screen ready for the next pass.
    fn present_str(s: &mut Screen) -> String {
        s.present();
        let out = String::from_utf8(s.output_bytes().to_vec()).unwrap();
        s.clear_output();
        out
    }

    // ── Idempotence / empty diffs ────────────────────────────────────────

    #[test]
    fn fresh_screen_presents_nothing() {
        // Back and front start identical; the cursor starts hidden.
        let mut s = screen(10, 4);
        assert_eq!(present_str(&mut s), "");
    }

    #[test]
    fn two_presents_without_mutation_emit_once() {
        let mut s = screen(10, 4);
        s.change_cell(1, 1, 'A', Attr::RED, Attr::BLACK);
        let first = present_str(&mut s);
        assert!(!first.is_empty());
        assert_eq!(present_str(&mut s), "", "second present must be empty");
    }

    // ── Diff precision ──────────────────────────────────────────────────

    #[test]
    fn single_change_emits_exactly_one_update() {
        let mut s = screen(10, 4);
        s.change_cell(3, 2, 'A', Attr::RED, Attr::BLACK);
        assert_eq!(present_str(&mut s), "\x1b[m\x1b[31;40m\x1b[3;4HA");
    }

    #[test]
    fn same_styled_run_shares_one_attribute_sequence() {
        let mut s = screen(10, 1);
        for (i, ch) in ['a', 'b', 'c'].into_iter().enumerate() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            s.change_cell(i as i32, 0, ch, Attr::GREEN, Attr::DEFAULT);
        }
        assert_eq!(present_str(&mut s), "\x1b[m\x1b[32m\x1b[1;1Habc");
    }

    #[test]
    fn style_change_mid_run_emits_new_attributes() {
        let mut s = screen(10, 1);
        s.change_cell(0, 0, 'a', Attr::GREEN, Attr::DEFAULT);
        s.change_cell(1, 0, 'b', Attr::RED, Attr::DEFAULT);
        assert_eq!(
            present_str(&mut s),
            "\x1b[m\x1b[32m\x1b[1;1Ha\x1b[m\x1b[31mb"
        );
    }

    #[test]
    fn unmodified_cells_produce_no_output() {
        let mut s = screen(10, 4);
        s.change_cell(0, 0, 'x', Attr::DEFAULT, Attr::DEFAULT);
        s.change_cell(9, 3, 'y', Attr::DEFAULT, Attr::DEFAULT);
        let out = present_str(&mut s);
        // Two isolated updates: one attr reset, two moves, two chars.
        assert_eq!(out, "\x1b[m\x1b[1;1Hx\x1b[4;10Hy");
    }

    #[test]
    fn reverting_a_cell_emits_the_blank() {
        let mut s = screen(4, 1);
        s.change_cell(0, 0, 'x', Attr::DEFAULT, Attr::DEFAULT);
        present_str(&mut s);
        s.put_cell(0, 0, Cell::BLANK);
        assert_eq!(present_str(&mut s), "\x1b[m\x1b[1;1H ");
    }

    // ── Front/back synchronization ──────────────────────────────────────

    #[test]
    fn present_copies_back_to_front() {
        let mut s = screen(4, 2);
        s.change_cell(2, 1, 'z', Attr::CYAN, Attr::BLACK);
        s.present();
        s.clear_output();
        assert_eq!(s.front.cells(), s.back.cells());
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn cursor_starts_hidden() {
        let mut s = screen(4, 2);
        assert_eq!(present_str(&mut s), "", "hidden cursor emits no move");
    }

    #[test]
    fn show_emitted_only_on_hidden_to_visible() {
        let mut s = screen(10, 10);
        s.set_cursor(5, 5);
        let out = String::from_utf8(s.output_bytes().to_vec()).unwrap();
        assert_eq!(out, "\x1b[?25h\x1b[6;6H");
        s.clear_output();

        // Visible → visible: move only, no show/hide.
        s.set_cursor(6, 6);
        let out = String::from_utf8(s.output_bytes().to_vec()).unwrap();
        assert_eq!(out, "\x1b[7;7H");
        s.clear_output();
    }

    #[test]
    fn hide_emitted_only_on_visible_to_hidden() {
        let mut s = screen(10, 10);
        s.set_cursor(5, 5);
        s.clear_output();

        s.set_cursor(CURSOR_HIDDEN, CURSOR_HIDDEN);
        let out = String::from_utf8(s.output_bytes().to_vec()).unwrap();
        assert_eq!(out, "\x1b[?25l");
        s.clear_output();

        // Hidden → hidden: nothing.
        s.hide_cursor();
        assert!(s.output_bytes().is_empty());
    }

    #[test]
    fn visible_cursor_gets_final_move_on_present() {
        let mut s = screen(10, 10);
        s.set_cursor(2, 3);
        s.clear_output();
        assert_eq!(present_str(&mut s), "\x1b[4;3H");
    }

    // ── Clear attributes ────────────────────────────────────────────────

    #[test]
    fn clear_uses_session_clear_attributes() {
        let mut s = screen(3, 1);
        s.set_clear_attributes(Attr::WHITE, Attr::BLUE);
        s.clear();
        assert!(
            s.back
                .cells()
                .iter()
                .all(|c| *c == Cell::blank(Attr::WHITE, Attr::BLUE))
        );
    }

    #[test]
    fn clear_attributes_only_affect_later_clears() {
        let mut s = screen(3, 1);
        s.clear();
        assert_eq!(s.back.cells()[0], Cell::BLANK);
        s.set_clear_attributes(Attr::WHITE, Attr::BLUE);
        assert_eq!(s.back.cells()[0], Cell::BLANK, "no retroactive repaint");
    }

    // ── Resize ──────────────────────────────────────────────────────────

    #[test]
    fn resize_reinitializes_both_grids() {
        let mut s = screen(4, 2);
        s.change_cell(0, 0, 'x', Attr::RED, Attr::BLACK);
        present_str(&mut s);

        s.resize(6, 3);
        assert_eq!(s.size(), (6, 3));
        assert_eq!(s.back.cells().len(), 18);
        assert_eq!(s.front.cells(), s.back.cells());
        assert!(s.back.cells().iter().all(|c| *c == Cell::BLANK));
    }

    #[test]
    fn resize_emits_clear_screen() {
        let mut s = screen(4, 2);
        s.resize(6, 3);
        let out = String::from_utf8(s.output_bytes().to_vec()).unwrap();
        assert!(out.ends_with("\x1b[H\x1b[2J"));
    }

    #[test]
    fn present_after_resize_redraws_changed_cells_only() {
        let mut s = screen(4, 2);
        s.resize(6, 3);
        s.clear_output();
        s.change_cell(1, 1, 'q', Attr::DEFAULT, Attr::DEFAULT);
        assert_eq!(present_str(&mut s), "\x1b[m\x1b[2;2Hq");
    }

    // ── End-to-end shape ────────────────────────────────────────────────

    #[test]
    fn end_to_end_single_cell() {
        let mut s = screen(80, 24);
        s.change_cell(0, 0, 'X', Attr::WHITE, Attr::BLACK);

        let out = present_str(&mut s);
        assert!(out.contains("\x1b[37;40m"), "white on black: {out:?}");
        assert!(out.contains("\x1b[1;1H"), "move to row 1 col 1: {out:?}");
        assert!(out.contains('X'));

        assert_eq!(present_str(&mut s), "", "no changes, no output");
    }

    #[test]
    fn wide_character_cell() {
        let mut s = screen(10, 1);
        s.change_cell(0, 0, '中', Attr::DEFAULT, Attr::DEFAULT);
        s.change_cell(2, 0, 'x', Attr::DEFAULT, Attr::DEFAULT);
        // The wide char advances the terminal cursor two columns, so the
        // cell at x=2 needs no second move.
        assert_eq!(present_str(&mut s), "\x1b[m\x1b[1;1H中x");
    }
}
