use std::collections::HashMap;

use crate::document::{Document, NodeId};
use crate::extract::is_piece_tag;
use crate::geometry::{Layout, Point};
use crate::palette::Palette;
use crate::style::StyleDeclaration;

/// A colourable shape plus the inline stroke values it had before the
/// outline overrides were applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub node: NodeId,
    pub original_stroke: Option<String>,
    pub original_stroke_width: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutlineStyle {
    pub canvas_fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

impl OutlineStyle {
    /// Outline sized so it renders one pixel wide when the illustration's
    /// viewBox height is shown at `display_px`.
    pub fn scaled(canvas_fill: &str, stroke: &str, view_box_height: f64, display_px: u32) -> Self {
        Self {
            canvas_fill: canvas_fill.to_string(),
            stroke: stroke.to_string(),
            stroke_width: view_box_height / f64::from(display_px.max(1)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PuzzleEvent {
    /// A pointer activated `target` at `point`, given in layout canvas
    /// coordinates.
    PieceActivated { target: NodeId, point: Point },
    SwatchSelected { index: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Painted { piece: NodeId, color: String },
    SwatchChanged { previous: usize, current: usize },
    Ignored,
}

#[derive(Clone, Debug, Default)]
pub struct Board {
    pieces: Vec<Piece>,
    by_node: HashMap<NodeId, usize>,
}

impl Board {
    pub fn prepare(doc: &mut Document, nodes: &[NodeId], outline: &OutlineStyle) -> Self {
        let mut board = Board::default();
        for &node in nodes {
            let mut style = StyleDeclaration::of(doc, node);
            let piece = Piece {
                node,
                original_stroke: style.get("stroke").map(str::to_string),
                original_stroke_width: style.get("stroke-width").map(str::to_string),
            };
            style.set("fill", outline.canvas_fill.as_str());
            style.set("stroke", outline.stroke.as_str());
            if outline.stroke_width.is_finite() && outline.stroke_width > 0.0 {
                style.set("stroke-width", outline.stroke_width.to_string());
            }
            style.set("cursor", "pointer");
            style.store(doc, node);
            board.by_node.insert(node, board.pieces.len());
            board.pieces.push(piece);
        }
        board
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn is_piece(&self, node: NodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    pub fn piece(&self, node: NodeId) -> Option<&Piece> {
        self.by_node.get(&node).map(|idx| &self.pieces[*idx])
    }

    /// Piece an activation on `target` should paint.
    ///
    /// A piece (or anything nested in one) resolves to itself. Another shape
    /// resolves to the topmost piece under `point`.
    pub fn resolve_target<L: Layout + ?Sized>(
        &self,
        doc: &Document,
        layout: Option<&L>,
        target: NodeId,
        point: Point,
    ) -> Option<NodeId> {
        if let Some(piece) = std::iter::once(target)
            .chain(doc.ancestors(target))
            .find(|node| self.is_piece(*node))
        {
            return Some(piece);
        }
        if !is_piece_tag(doc, target) {
            return None;
        }
        layout?
            .elements_at(point)
            .into_iter()
            .find(|node| self.is_piece(*node))
    }

    pub fn paint(&self, doc: &mut Document, node: NodeId, color: &str) -> bool {
        let Some(piece) = self.piece(node) else {
            return false;
        };
        doc.set_attr(node, "fill", color);
        let mut style = StyleDeclaration::of(doc, node);
        style.remove("fill");
        match &piece.original_stroke {
            Some(stroke) => style.set("stroke", stroke.as_str()),
            None => {
                style.remove("stroke");
            }
        }
        match &piece.original_stroke_width {
            Some(width) => style.set("stroke-width", width.as_str()),
            None => {
                style.remove("stroke-width");
            }
        }
        style.store(doc, node);
        true
    }

    pub fn handle<L: Layout + ?Sized>(
        &self,
        doc: &mut Document,
        palette: &mut Palette,
        layout: Option<&L>,
        event: PuzzleEvent,
    ) -> EventOutcome {
        match event {
            PuzzleEvent::SwatchSelected { index } => match palette.select(index) {
                Ok(previous) => EventOutcome::SwatchChanged {
                    previous,
                    current: index,
                },
                Err(err) => {
                    tracing::debug!(%err, "swatch selection ignored");
                    EventOutcome::Ignored
                }
            },
            PuzzleEvent::PieceActivated { target, point } => {
                let Some(piece) = self.resolve_target(doc, layout, target, point) else {
                    tracing::debug!(target = target.index(), "activation hit no piece");
                    return EventOutcome::Ignored;
                };
                let Some(color) = palette.selected_color().map(str::to_string) else {
                    return EventOutcome::Ignored;
                };
                self.paint(doc, piece, &color);
                EventOutcome::Painted { piece, color }
            }
        }
    }
}
