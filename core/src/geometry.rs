use crate::document::{Document, NodeId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// `(min-x, min-y, width, height)` of an illustration's coordinate space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Attribute form, numbers space separated.
    pub fn to_attribute(&self) -> String {
        format!("{} {} {} {}", self.min_x, self.min_y, self.width, self.height)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LayoutError {
    #[error("document could not be laid out: {0}")]
    Unrenderable(String),
}

/// Rendered geometry of a document, in canvas coordinates.
pub trait Layout {
    /// Box of the whole rendered illustration.
    fn canvas(&self) -> Rect;

    /// Rendered box of `node`, `None` when it is not part of the rendered
    /// scene (inside `<defs>`, hidden, zero geometry dropped by the renderer).
    fn bounding_box(&self, node: NodeId) -> Option<Rect>;

    /// Rendered shapes under `point`, topmost first.
    fn elements_at(&self, point: Point) -> Vec<NodeId>;
}

pub trait LayoutEngine {
    type Layout: Layout;

    fn layout(&self, doc: &Document) -> Result<Self::Layout, LayoutError>;
}

/// Layout made of axis-aligned boxes, hit-tested by box containment.
#[derive(Clone, Debug)]
pub struct BoxLayout {
    canvas: Rect,
    entries: Vec<(NodeId, Rect)>,
}

impl BoxLayout {
    pub fn new(canvas: Rect) -> Self {
        Self {
            canvas,
            entries: Vec::new(),
        }
    }

    /// Adds `node` above everything inserted before it.
    pub fn insert(&mut self, node: NodeId, rect: Rect) {
        self.entries.push((node, rect));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Layout for BoxLayout {
    fn canvas(&self) -> Rect {
        self.canvas
    }

    fn bounding_box(&self, node: NodeId) -> Option<Rect> {
        self.entries
            .iter()
            .filter(|(id, _)| *id == node)
            .map(|(_, rect)| *rect)
            .reduce(|acc, rect| acc.union(&rect))
    }

    fn elements_at(&self, point: Point) -> Vec<NodeId> {
        let mut out = Vec::new();
        for (node, rect) in self.entries.iter().rev() {
            if rect.contains(point) && !out.contains(node) {
                out.push(*node);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_layout_orders_hits_topmost_first() {
        let mut layout = BoxLayout::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        layout.insert(NodeId::from_index(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        layout.insert(NodeId::from_index(2), Rect::new(10.0, 10.0, 20.0, 20.0));
        let hits = layout.elements_at(Point::new(15.0, 15.0));
        assert_eq!(hits, vec![NodeId::from_index(2), NodeId::from_index(1)]);
        let hits = layout.elements_at(Point::new(80.0, 80.0));
        assert_eq!(hits, vec![NodeId::from_index(1)]);
    }

    #[test]
    fn view_box_attribute_formats_like_numbers() {
        assert_eq!(ViewBox::new(0.0, 0.0, 100.0, 12.5).to_attribute(), "0 0 100 12.5");
        assert!(!ViewBox::new(0.0, 0.0, f64::NAN, 1.0).is_finite());
    }

    #[test]
    fn bounding_box_unions_repeated_entries() {
        let mut layout = BoxLayout::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let node = NodeId::from_index(3);
        layout.insert(node, Rect::new(0.0, 0.0, 2.0, 2.0));
        layout.insert(node, Rect::new(4.0, 4.0, 2.0, 2.0));
        assert_eq!(layout.bounding_box(node), Some(Rect::new(0.0, 0.0, 6.0, 6.0)));
        assert_eq!(layout.bounding_box(NodeId::from_index(9)), None);
    }
}
