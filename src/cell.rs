// SPDX-License-Identifier: MIT
//
// Cell — the atomic unit of the character grid.
//
// Every position on screen is one Cell: a Unicode codepoint plus foreground
// and background attributes. The whole crate exists to produce, diff, and
// output these. Cells are plain value types; the diff in `screen::present`
// is a derived equality comparison on the full 8-byte struct.
//
// The attribute model is deliberately small: 8 named base colors plus
// "default", and two independent style bits (bold, underline). The color
// sub-field is mutually exclusive by construction — colors are selected,
// never OR-combined — while the style bits OR onto any color.

use std::ops::{BitOr, BitOrAssign};

// ─── Attr ────────────────────────────────────────────────────────────────────

/// A cell attribute: one base color plus optional style bits.
///
/// The low four bits select exactly one of nine colors ([`Attr::BLACK`]
/// through [`Attr::WHITE`], or [`Attr::DEFAULT`]). [`Attr::BOLD`] and
/// [`Attr::UNDERLINE`] live above the color sub-field and combine with any
/// color via `|`:
///
/// ```
/// use termgrid::cell::Attr;
///
/// let style = Attr::RED | Attr::BOLD;
/// assert_eq!(style.color(), Attr::RED);
/// assert!(style.is_bold());
/// assert!(!style.is_underline());
/// ```
///
/// Colors themselves cannot be combined: `Attr::RED | Attr::GREEN` would
/// produce a different color value, not a blend. Select one color, then OR
/// style bits onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attr(u16);

/// Mask for the mutually-exclusive color sub-field.
const COLOR_MASK: u16 = 0x0F;

impl Attr {
    pub const BLACK: Self = Self(0);
    pub const RED: Self = Self(1);
    pub const GREEN: Self = Self(2);
    pub const YELLOW: Self = Self(3);
    pub const BLUE: Self = Self(4);
    pub const MAGENTA: Self = Self(5);
    pub const CYAN: Self = Self(6);
    pub const WHITE: Self = Self(7);
    /// The terminal's own default color.
    pub const DEFAULT: Self = Self(8);

    /// Increased intensity (SGR 1).
    pub const BOLD: Self = Self(0x10);
    /// Underlined text (SGR 4).
    pub const UNDERLINE: Self = Self(0x20);

    /// The color sub-field, with style bits stripped.
    #[inline]
    #[must_use]
    pub const fn color(self) -> Self {
        Self(self.0 & COLOR_MASK)
    }

    /// Whether the bold style bit is set.
    #[inline]
    #[must_use]
    pub const fn is_bold(self) -> bool {
        self.0 & Self::BOLD.0 != 0
    }

    /// Whether the underline style bit is set.
    #[inline]
    #[must_use]
    pub const fn is_underline(self) -> bool {
        self.0 & Self::UNDERLINE.0 != 0
    }

    /// The raw bit pattern.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl Default for Attr {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for Attr {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Attr {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single grid cell: one character with foreground and background styling.
///
/// Two cells are equal iff all three fields match — this is exactly the
/// comparison the differential renderer performs per position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// The character to display.
    pub ch: char,
    /// Foreground attribute.
    pub fg: Attr,
    /// Background attribute.
    pub bg: Attr,
}

impl Cell {
    /// A blank cell: space character, default colors.
    pub const BLANK: Self = Self {
        ch: ' ',
        fg: Attr::DEFAULT,
        bg: Attr::DEFAULT,
    };

    /// Create a cell from its three fields.
    #[inline]
    #[must_use]
    pub const fn new(ch: char, fg: Attr, bg: Attr) -> Self {
        Self { ch, fg, bg }
    }

    /// A blank cell carrying the given clear attributes.
    #[inline]
    #[must_use]
    pub const fn blank(fg: Attr, bg: Attr) -> Self {
        Self { ch: ' ', fg, bg }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::BLANK
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
