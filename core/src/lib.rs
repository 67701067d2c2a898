pub mod assets;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod document;
pub mod element_id;
pub mod extract;
pub mod geometry;
pub mod interaction;
pub mod normalize;
pub mod palette;
pub mod scoring;
pub mod session;
pub mod style;

pub use assets::{AssetError, AssetSource, ManifestCache, parse_manifest};
pub use audio::{AudioBackend, AudioBank, AudioError, CUE_SOUNDS, Sound};
pub use catalog::{COURSE_CATALOG, CourseCatalogEntry, course_by_slug};
pub use config::{ConfigError, PuzzleConfig};
pub use document::{Document, DocumentError, NodeId};
pub use extract::{Extraction, PIECE_TAGS, Rejection, extract_pieces};
pub use geometry::{BoxLayout, Layout, LayoutEngine, LayoutError, Point, Rect, ViewBox};
pub use interaction::{Board, EventOutcome, OutlineStyle, Piece, PuzzleEvent};
pub use normalize::{NormalizeReport, Normalizer, Warning};
pub use palette::{Palette, PaletteError};
pub use scoring::{
    CLEAR_SCORE, Cue, PixelBuffer, RasterConfig, RasterError, Rasterizer, ScoreBoard, match_score,
};
pub use session::{Feedback, Phase, Problem, Session, SessionError, build_problem};
