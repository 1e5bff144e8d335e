// SPDX-License-Identifier: MIT
//
// CellBuffer — the 2D cell grid that callers paint to.
//
// A flat `Vec<Cell>` with row-major indexing: a row's cells are contiguous
// in memory, so the renderer's left-to-right scan is a linear walk. Two of
// these exist per session — the back buffer (caller-mutated) and the front
// buffer (a mirror of what the terminal last showed).
//
// Bounds policy: all write operations absorb out-of-range coordinates as
// silent no-ops. `put` drops the single cell; `blit` drops the entire
// rectangle when any edge crosses the grid (all-or-nothing, never clipped).
// This keeps the hot path branch-light — no error values, no panics.
//
// Memory: a 200×50 terminal is 10,000 cells × 8 bytes = 80 KB per buffer.
// Two buffers per session is nothing.

use crate::cell::{Attr, Cell};

/// A row-major grid of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl CellBuffer {
    /// Allocate a `width × height` grid of blank cells.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; width * height],
        }
    }

    /// Grid width in columns.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Grid height in rows.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// The cells in row-major order (`length == width * height`).
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable view of the cells in row-major order.
    #[inline]
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Reset every cell to a blank carrying the given clear attributes.
    pub fn clear(&mut self, fg: Attr, bg: Attr) {
        self.cells.fill(Cell::blank(fg, bg));
    }

    /// Reallocate to new dimensions, discarding all content.
    ///
    /// No reflow, no migration: the grid comes back blank. Callers that
    /// need specific clear attributes follow up with [`clear`](Self::clear).
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width * height, Cell::BLANK);
    }

    /// The cell at `(x, y)`, or `None` when out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        let (x, y) = self.checked_pos(x, y)?;
        Some(self.cells[y * self.width + x])
    }

    /// Write one cell at `(x, y)`.
    ///
    /// Out-of-range coordinates (including negative ones) are a silent
    /// no-op: nothing is written, nothing is reported.
    #[inline]
    pub fn put(&mut self, x: i32, y: i32, cell: Cell) {
        if let Some((x, y)) = self.checked_pos(x, y) {
            self.cells[y * self.width + x] = cell;
        }
    }

    /// Copy a rectangle of cells into the grid at `(x, y)`, row by row.
    ///
    /// The rectangle is `w` columns wide and `cells.len() / w` rows tall
    /// (`w > 0` is a contract precondition and is not validated — `w == 0`
    /// panics on the division). The copy is all-or-nothing: if any edge of
    /// the implied rectangle falls outside the grid, the whole operation is
    /// discarded and the grid is left untouched. No clipping, ever.
    pub fn blit(&mut self, x: i32, y: i32, w: usize, cells: &[Cell]) {
        let h = cells.len() / w;
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x + w > self.width || y + h > self.height {
            return;
        }

        let mut dst = y * self.width + x;
        let mut src = 0;
        for _ in 0..h {
            self.cells[dst..dst + w].copy_from_slice(&cells[src..src + w]);
            dst += self.width;
            src += w;
        }
    }

    /// Translate signed coordinates into an in-range index pair.
    #[inline]
    fn checked_pos(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        (x < self.width && y < self.height).then_some((x, y))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(ch: char) -> Cell {
        Cell::new(ch, Attr::RED, Attr::BLACK)
    }

    // ── Construction ─────────────────────────────────────────────────────

    #[test]
    fn new_buffer_is_blank() {
        let buf = CellBuffer::new(10, 5);
        assert_eq!(buf.width(), 10);
        assert_eq!(buf.height(), 5);
        assert_eq!(buf.cells().len(), 50);
        assert!(buf.cells().iter().all(|c| *c == Cell::BLANK));
    }

    #[test]
    fn zero_size_buffer() {
        let buf = CellBuffer::new(0, 0);
        assert!(buf.cells().is_empty());
    }

    // ── Clear ────────────────────────────────────────────────────────────

    #[test]
    fn clear_applies_attributes_everywhere() {
        let mut buf = CellBuffer::new(4, 3);
        buf.put(1, 1, cell('x'));
        buf.clear(Attr::WHITE, Attr::BLUE);
        assert!(
            buf.cells()
                .iter()
                .all(|c| *c == Cell::blank(Attr::WHITE, Attr::BLUE))
        );
    }

    // ── Resize ───────────────────────────────────────────────────────────

    #[test]
    fn resize_discards_content() {
        let mut buf = CellBuffer::new(4, 3);
        buf.put(0, 0, cell('x'));
        buf.resize(6, 2);
        assert_eq!(buf.width(), 6);
        assert_eq!(buf.height(), 2);
        assert_eq!(buf.cells().len(), 12);
        assert!(buf.cells().iter().all(|c| *c == Cell::BLANK));
    }

    // ── Put / get bounds ─────────────────────────────────────────────────

    #[test]
    fn put_and_get_round_trip() {
        let mut buf = CellBuffer::new(4, 3);
        buf.put(2, 1, cell('A'));
        assert_eq!(buf.get(2, 1), Some(cell('A')));
    }

    #[test]
    fn put_out_of_range_is_noop() {
        let mut buf = CellBuffer::new(4, 3);
        let before = buf.clone();

        buf.put(-1, 0, cell('x'));
        buf.put(0, -1, cell('x'));
        buf.put(4, 0, cell('x')); // x == width
        buf.put(0, 3, cell('x')); // y == height
        buf.put(i32::MIN, i32::MIN, cell('x'));

        assert_eq!(buf, before);
    }

    #[test]
    fn get_out_of_range_is_none() {
        let buf = CellBuffer::new(4, 3);
        assert_eq!(buf.get(-1, 0), None);
        assert_eq!(buf.get(4, 0), None);
        assert_eq!(buf.get(0, 3), None);
    }

    #[test]
    fn put_at_corners() {
        let mut buf = CellBuffer::new(4, 3);
        buf.put(0, 0, cell('a'));
        buf.put(3, 2, cell('b'));
        assert_eq!(buf.get(0, 0), Some(cell('a')));
        assert_eq!(buf.get(3, 2), Some(cell('b')));
    }

    // ── Blit ─────────────────────────────────────────────────────────────

    #[test]
    fn blit_copies_rectangle() {
        let mut buf = CellBuffer::new(5, 4);
        let rect = [cell('a'), cell('b'), cell('c'), cell('d')]; // 2×2
        buf.blit(1, 1, 2, &rect);

        assert_eq!(buf.get(1, 1), Some(cell('a')));
        assert_eq!(buf.get(2, 1), Some(cell('b')));
        assert_eq!(buf.get(1, 2), Some(cell('c')));
        assert_eq!(buf.get(2, 2), Some(cell('d')));
        // Neighbors untouched.
        assert_eq!(buf.get(0, 0), Some(Cell::BLANK));
        assert_eq!(buf.get(3, 1), Some(Cell::BLANK));
    }

    #[test]
    fn blit_full_grid() {
        let mut buf = CellBuffer::new(2, 2);
        let rect = [cell('a'), cell('b'), cell('c'), cell('d')];
        buf.blit(0, 0, 2, &rect);
        assert_eq!(buf.cells(), &rect);
    }

    #[test]
    fn blit_out_of_range_leaves_grid_unchanged() {
        let mut buf = CellBuffer::new(5, 4);
        buf.put(0, 0, cell('k'));
        let before = buf.clone();

        let rect = [cell('a'), cell('b'), cell('c'), cell('d')]; // 2×2

        buf.blit(4, 0, 2, &rect); // right edge crosses width
        assert_eq!(buf, before, "crossing right edge must change nothing");

        buf.blit(0, 3, 2, &rect); // bottom edge crosses height
        assert_eq!(buf, before, "crossing bottom edge must change nothing");

        buf.blit(-1, 0, 2, &rect); // negative x
        assert_eq!(buf, before, "negative x must change nothing");

        buf.blit(0, -1, 2, &rect); // negative y
        assert_eq!(buf, before, "negative y must change nothing");
    }

    #[test]
    fn blit_never_partially_copies() {
        // A rectangle that fits horizontally but not vertically must not
        // copy even its in-range rows.
        let mut buf = CellBuffer::new(3, 2);
        let before = buf.clone();
        let rect = [
            cell('a'),
            cell('b'),
            cell('c'),
            cell('d'),
            cell('e'),
            cell('f'),
        ]; // 2×3
        buf.blit(0, 0, 2, &rect);
        assert_eq!(buf, before);
    }

    #[test]
    fn blit_height_derived_by_floor_division() {
        // 5 cells at width 2 imply height 2; the trailing cell is ignored.
        let mut buf = CellBuffer::new(4, 4);
        let rect = [cell('a'), cell('b'), cell('c'), cell('d'), cell('e')];
        buf.blit(0, 0, 2, &rect);
        assert_eq!(buf.get(1, 1), Some(cell('d')));
        assert_eq!(buf.get(0, 2), Some(Cell::BLANK));
    }

    #[test]
    fn blit_empty_slice_is_noop() {
        let mut buf = CellBuffer::new(3, 3);
        let before = buf.clone();
        buf.blit(1, 1, 2, &[]);
        assert_eq!(buf, before);
    }
}
