use rand::Rng;

use crate::document::{Document, NodeId};

pub const FALLBACK_COLOR: &str = "black";
pub const SELECTED_SWATCH_PX: u32 = 96;
pub const SWATCH_PX: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("swatch {index} out of range (palette has {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Shuffled set of colours a player paints with. Exactly one swatch is
/// selected whenever the palette is non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<String>,
    selected: usize,
}

impl Palette {
    /// Deduplicates `fills` (missing ones become `fallback`), shuffles them and
    /// selects the middle swatch.
    pub fn build<I, R>(fills: I, fallback: &str, rng: &mut R) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
        R: Rng + ?Sized,
    {
        let mut colors: Vec<String> = Vec::new();
        for fill in fills {
            let color = fill.unwrap_or_else(|| fallback.to_string());
            if !colors.contains(&color) {
                colors.push(color);
            }
        }
        shuffle(&mut colors, rng);
        let selected = colors.len() / 2;
        Self { colors, selected }
    }

    pub fn from_pieces<R: Rng + ?Sized>(
        doc: &Document,
        pieces: &[NodeId],
        fallback: &str,
        rng: &mut R,
    ) -> Self {
        let fills = pieces
            .iter()
            .map(|piece| doc.attr(*piece, "fill").map(str::to_string));
        Self::build(fills, fallback, rng)
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_color(&self) -> Option<&str> {
        self.colors.get(self.selected).map(String::as_str)
    }

    /// Moves the selection, returning the previously selected index.
    pub fn select(&mut self, index: usize) -> Result<usize, PaletteError> {
        if index >= self.colors.len() {
            return Err(PaletteError::OutOfRange {
                index,
                len: self.colors.len(),
            });
        }
        let previous = self.selected;
        self.selected = index;
        Ok(previous)
    }

    /// Rendered edge length of swatch `index`.
    pub fn swatch_size(&self, index: usize) -> u32 {
        if index == self.selected {
            SELECTED_SWATCH_PX
        } else {
            SWATCH_PX
        }
    }
}

/// In-place Fisher-Yates, walking from the last slot to the first.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (2..=items.len()).rev() {
        let k = rng.random_range(0..i);
        items.swap(k, i - 1);
    }
}
