use std::fmt;

use crate::document::{Document, NodeId};
use crate::geometry::Layout;

pub const PIECE_TAGS: &[&str] = &[
    "rect", "circle", "ellipse", "line", "polyline", "polygon", "path", "text",
];

pub const AREA_RATIO_DEFAULT: f64 = 0.05;

/// Fill a shape gets when nothing in its ancestry sets one.
pub const INITIAL_FILL: &str = "black";

pub fn is_piece_tag(doc: &Document, node: NodeId) -> bool {
    doc.tag(node).is_some_and(|tag| PIECE_TAGS.contains(&tag))
}

pub fn shape_nodes(doc: &Document) -> Vec<NodeId> {
    doc.elements()
        .into_iter()
        .filter(|node| is_piece_tag(doc, *node))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Rejection {
    NotRendered,
    TooSmall { area: f64, threshold: f64 },
    NoFill,
    FillNone,
    PaintServer { fill: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotRendered => f.write_str("not rendered"),
            Rejection::TooSmall { area, threshold } => {
                write!(f, "area {area:.1} below threshold {threshold:.1}")
            }
            Rejection::NoFill => f.write_str("no fill"),
            Rejection::FillNone => f.write_str("fill is none"),
            Rejection::PaintServer { fill } => write!(f, "fill {fill} is a paint server"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub pieces: Vec<NodeId>,
    pub rejected: Vec<(NodeId, Rejection)>,
}

pub fn inherited_attr<'a>(doc: &'a Document, node: NodeId, name: &str) -> Option<&'a str> {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .find_map(|current| doc.attr(current, name).filter(|value| !value.is_empty()))
}

/// Writes the effective fill and stroke directly onto `node`, with
/// `currentColor` replaced by the inherited `color`.
pub fn reset_current_color(doc: &mut Document, node: NodeId) {
    let resolve = |value: &str| {
        if value.trim().eq_ignore_ascii_case("currentcolor") {
            inherited_attr(doc, node, "color")
                .filter(|color| !color.trim().eq_ignore_ascii_case("currentcolor"))
                .unwrap_or(INITIAL_FILL)
                .to_string()
        } else {
            value.to_string()
        }
    };
    let fill = resolve(inherited_attr(doc, node, "fill").unwrap_or(INITIAL_FILL));
    let stroke = inherited_attr(doc, node, "stroke").map(resolve);
    doc.set_attr(node, "fill", fill);
    if let Some(stroke) = stroke {
        doc.set_attr(node, "stroke", stroke);
    }
}

/// Picks the shapes that qualify as pieces.
///
/// Every shape first gets its inherited paint written onto it. A shape is then
/// kept when its rendered box covers at least `area_ratio` of the canvas and
/// it has a plain colour fill.
pub fn extract_pieces<L: Layout + ?Sized>(
    doc: &mut Document,
    layout: &L,
    area_ratio: f64,
) -> Extraction {
    let canvas = layout.canvas();
    let threshold = canvas.area() * area_ratio;
    let mut extraction = Extraction::default();
    for node in shape_nodes(doc) {
        reset_current_color(doc, node);
        let Some(rect) = layout.bounding_box(node) else {
            extraction.rejected.push((node, Rejection::NotRendered));
            continue;
        };
        let area = rect.area();
        if area < threshold {
            extraction
                .rejected
                .push((node, Rejection::TooSmall { area, threshold }));
            continue;
        }
        let rejection = match doc.attr(node, "fill").map(str::trim) {
            None | Some("") => Some(Rejection::NoFill),
            Some("none") => Some(Rejection::FillNone),
            Some(fill) if fill.starts_with("url(") => Some(Rejection::PaintServer {
                fill: fill.to_string(),
            }),
            Some(_) => None,
        };
        match rejection {
            Some(rejection) => extraction.rejected.push((node, rejection)),
            None => extraction.pieces.push(node),
        }
    }
    tracing::debug!(
        pieces = extraction.pieces.len(),
        rejected = extraction.rejected.len(),
        threshold,
        "pieces extracted"
    );
    extraction
}
