use serde::{Deserialize, Serialize};

use crate::audio::{CORRECT_ALL_SOUND, MODIFIED_SOUND};
use crate::document::Document;

pub const CLEAR_SCORE: u8 = 85;
pub const RASTER_SIZE_DEFAULT: u32 = 256;

/// Straight-alpha RGBA8 pixels, row major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub const CHANNELS: usize = 4;

    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            width: RASTER_SIZE_DEFAULT,
            height: RASTER_SIZE_DEFAULT,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RasterError {
    #[error("raster size {width}x{height} is not drawable")]
    InvalidSize { width: u32, height: u32 },
    #[error("document rejected by renderer: {0}")]
    Parse(String),
    #[error("render failed: {0}")]
    Render(String),
}

/// Document-to-pixels capability. Output must be identical for identical
/// input and always `width * height * 4` bytes long.
#[allow(async_fn_in_trait)]
pub trait Rasterizer {
    async fn rasterize(
        &self,
        doc: &Document,
        config: RasterConfig,
    ) -> Result<PixelBuffer, RasterError>;
}

/// Percentage of buffer elements that are equal, rounded.
///
/// Elements are compared one byte at a time over the working buffer's
/// length; bytes missing from `reference` count as mismatches.
pub fn match_score(reference: &PixelBuffer, working: &PixelBuffer) -> u8 {
    let total = working.data.len();
    if total == 0 {
        return 0;
    }
    let matched = working
        .data
        .iter()
        .zip(reference.data.iter())
        .filter(|(a, b)| a == b)
        .count();
    let score = (100.0 * matched as f64 / total as f64).round();
    score.clamp(0.0, 100.0) as u8
}

/// Feedback after a scored move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    Success,
    Changed,
}

impl Cue {
    pub fn sound_name(self) -> &'static str {
        match self {
            Cue::Success => CORRECT_ALL_SOUND.name,
            Cue::Changed => MODIFIED_SOUND.name,
        }
    }
}

/// Latest and best score of one problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreBoard {
    latest: u8,
    best: u8,
}

impl ScoreBoard {
    pub fn new(clear_score: u8) -> Self {
        Self {
            latest: 0,
            best: clear_score,
        }
    }

    pub fn latest(&self) -> u8 {
        self.latest
    }

    pub fn best(&self) -> u8 {
        self.best
    }

    pub fn record(&mut self, score: u8) -> Cue {
        self.latest = score;
        if score > self.best {
            self.best = score;
            Cue::Success
        } else {
            Cue::Changed
        }
    }
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self::new(CLEAR_SCORE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(data: &[u8]) -> PixelBuffer {
        PixelBuffer::new(1, 1, data.to_vec())
    }

    #[test]
    fn identical_buffers_score_full() {
        let a = buffer(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(match_score(&a, &a.clone()), 100);
    }

    #[test]
    fn score_counts_elements_not_pixels() {
        let reference = buffer(&[255, 0, 0, 255]);
        let working = buffer(&[255, 255, 255, 255]);
        assert_eq!(match_score(&reference, &working), 50);
    }

    #[test]
    fn score_rounds_half_up() {
        let reference = buffer(&[0; 8]);
        let mut data = vec![0u8; 8];
        data[..3].fill(1);
        assert_eq!(match_score(&reference, &buffer(&data)), 63);
    }

    #[test]
    fn empty_and_short_buffers() {
        assert_eq!(match_score(&buffer(&[1]), &buffer(&[])), 0);
        assert_eq!(match_score(&buffer(&[9, 9]), &buffer(&[9, 9, 9, 9])), 50);
    }

    #[test]
    fn best_starts_at_floor_and_only_rises() {
        let mut board = ScoreBoard::default();
        assert_eq!(board.best(), CLEAR_SCORE);
        assert_eq!(board.latest(), 0);
        assert_eq!(board.record(60), Cue::Changed);
        assert_eq!(board.best(), CLEAR_SCORE);
        assert_eq!(board.latest(), 60);
        assert_eq!(board.record(85), Cue::Changed);
        assert_eq!(board.record(100), Cue::Success);
        assert_eq!(board.record(90), Cue::Changed);
        assert_eq!(board.best(), 100);
        assert_eq!(board.latest(), 90);
        assert_eq!(Cue::Success.sound_name(), "correctAll");
        assert_eq!(Cue::Changed.sound_name(), "modified");
    }
}
