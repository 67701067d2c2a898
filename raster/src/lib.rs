use std::collections::HashMap;
use std::sync::Arc;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use nurie_core::extract::shape_nodes;
use nurie_core::{
    Document, Layout, LayoutEngine, LayoutError, NodeId, PixelBuffer, Point, RasterConfig,
    RasterError, Rasterizer, Rect,
};
use resvg::tiny_skia;
use resvg::usvg;

const KEY_ID_PREFIX: &str = "nurie-key-";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("image encode failed: {0}")]
    Encode(String),
    #[error("invalid image dimensions")]
    Dimensions,
}

/// Renderer shared by rasterization and layout. Cloning shares the font
/// database.
#[derive(Clone)]
pub struct ResvgBackend {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl Default for ResvgBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResvgBackend {
    /// Backend with the system fonts when the `system-fonts` feature is on.
    /// Without it the font database starts empty: `<text>` lays out to
    /// nothing, so it never becomes a piece, until fonts are added with
    /// [`ResvgBackend::with_font_data`].
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut fontdb = usvg::fontdb::Database::new();
        #[cfg(feature = "system-fonts")]
        fontdb.load_system_fonts();
        tracing::debug!(faces = fontdb.len(), "font database ready");
        Self::with_fontdb(Arc::new(fontdb))
    }

    pub fn with_fontdb(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }

    /// [`ResvgBackend::new`] plus the given font files. Data that is not a
    /// font is skipped.
    pub fn with_font_data(fonts: impl IntoIterator<Item = Vec<u8>>) -> Self {
        let mut fontdb = (*Self::new().fontdb).clone();
        for data in fonts {
            fontdb.load_font_data(data);
        }
        tracing::debug!(faces = fontdb.len(), "font database ready");
        Self::with_fontdb(Arc::new(fontdb))
    }

    pub fn font_faces(&self) -> usize {
        self.fontdb.len()
    }

    fn options(&self) -> usvg::Options<'static> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        options
    }

    fn parse(&self, markup: &str) -> Result<usvg::Tree, usvg::Error> {
        usvg::Tree::from_str(markup, &self.options())
    }

    pub fn render(&self, doc: &Document, config: RasterConfig) -> Result<PixelBuffer, RasterError> {
        let invalid = RasterError::InvalidSize {
            width: config.width,
            height: config.height,
        };
        let mut pixmap = tiny_skia::Pixmap::new(config.width, config.height).ok_or(invalid)?;
        let tree = self
            .parse(&doc.to_svg_string())
            .map_err(|err| RasterError::Parse(err.to_string()))?;
        let size = tree.size();
        let (width, height) = (config.width as f32, config.height as f32);
        let scale = (width / size.width()).min(height / size.height());
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RasterError::Render(format!(
                "illustration size {}x{} cannot be scaled",
                size.width(),
                size.height()
            )));
        }
        let dx = (width - size.width() * scale) / 2.0;
        let dy = (height - size.height() * scale) / 2.0;
        let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, dx, dy);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        let mut data = Vec::with_capacity(pixmap.pixels().len() * PixelBuffer::CHANNELS);
        for pixel in pixmap.pixels() {
            let color = pixel.demultiply();
            data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Ok(PixelBuffer::new(config.width, config.height, data))
    }
}

impl Rasterizer for ResvgBackend {
    async fn rasterize(
        &self,
        doc: &Document,
        config: RasterConfig,
    ) -> Result<PixelBuffer, RasterError> {
        self.render(doc, config)
    }
}

impl LayoutEngine for ResvgBackend {
    type Layout = ShapeLayout;

    fn layout(&self, doc: &Document) -> Result<ShapeLayout, LayoutError> {
        let mut keyed = doc.clone();
        let keys = assign_key_ids(&mut keyed);
        let tree = self
            .parse(&keyed.to_svg_string())
            .map_err(|err| LayoutError::Unrenderable(err.to_string()))?;
        let size = tree.size();
        let mut layout = ShapeLayout {
            canvas: Rect::new(0.0, 0.0, f64::from(size.width()), f64::from(size.height())),
            entries: Vec::new(),
        };
        collect_shapes(tree.root(), None, &keys, &mut layout.entries);
        tracing::debug!(
            shapes = keys.len(),
            rendered = layout.entries.len(),
            "layout computed"
        );
        Ok(layout)
    }
}

/// Keys every shape by an id the renderer will carry through: its own id
/// when that is unique, otherwise a generated one.
fn assign_key_ids(doc: &mut Document) -> HashMap<String, NodeId> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for node in doc.elements() {
        if let Some(id) = doc.attr(node, "id") {
            *seen.entry(id.to_string()).or_default() += 1;
        }
    }
    let mut keys = HashMap::new();
    for node in shape_nodes(doc) {
        let key = match doc.attr(node, "id") {
            Some(id) if !id.is_empty() && seen.get(id) == Some(&1) => id.to_string(),
            _ => {
                let id = format!("{KEY_ID_PREFIX}{}", node.index());
                doc.set_attr(node, "id", id.as_str());
                id
            }
        };
        keys.insert(key, node);
    }
    keys
}

fn collect_shapes(
    group: &usvg::Group,
    owner: Option<NodeId>,
    keys: &HashMap<String, NodeId>,
    out: &mut Vec<ShapeEntry>,
) {
    for child in group.children() {
        let owner = keys.get(child.id()).copied().or(owner);
        match child {
            usvg::Node::Group(group) => collect_shapes(group, owner, keys, out),
            usvg::Node::Text(text) => collect_shapes(text.flattened(), owner, keys, out),
            usvg::Node::Path(path) => {
                if let Some(owner) = owner.filter(|_| path.is_visible()) {
                    out.push(ShapeEntry::new(owner, path));
                }
            }
            usvg::Node::Image(_) => {}
        }
    }
}

#[derive(Clone, Debug)]
struct ShapeEntry {
    node: NodeId,
    bbox: Rect,
    path: tiny_skia::Path,
    transform: tiny_skia::Transform,
    fill_rule: Option<tiny_skia::FillRule>,
    stroke_width: Option<f32>,
}

impl ShapeEntry {
    fn new(node: NodeId, path: &usvg::Path) -> Self {
        let bbox = path.abs_bounding_box();
        Self {
            node,
            bbox: Rect::new(
                f64::from(bbox.x()),
                f64::from(bbox.y()),
                f64::from(bbox.width()),
                f64::from(bbox.height()),
            ),
            path: path.data().clone(),
            transform: path.abs_transform(),
            fill_rule: path.fill().map(|fill| match fill.rule() {
                usvg::FillRule::NonZero => tiny_skia::FillRule::Winding,
                usvg::FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
            }),
            stroke_width: path.stroke().map(|stroke| stroke.width().get()),
        }
    }

    /// Whether the painted geometry covers `point`, sampled without
    /// anti-aliasing at the pixel centred on it.
    fn covers(&self, point: Point) -> bool {
        let Some(mut pixmap) = tiny_skia::Pixmap::new(1, 1) else {
            return false;
        };
        let transform = tiny_skia::Transform::from_translate(
            0.5 - point.x as f32,
            0.5 - point.y as f32,
        )
        .pre_concat(self.transform);
        let mut paint = tiny_skia::Paint::default();
        paint.anti_alias = false;
        paint.set_color_rgba8(0, 0, 0, 255);
        if let Some(rule) = self.fill_rule {
            pixmap.fill_path(&self.path, &paint, rule, transform, None);
        }
        if let Some(width) = self.stroke_width {
            let stroke = tiny_skia::Stroke {
                width,
                ..tiny_skia::Stroke::default()
            };
            pixmap.stroke_path(&self.path, &paint, &stroke, transform, None);
        }
        pixmap.pixel(0, 0).is_some_and(|pixel| pixel.alpha() > 0)
    }
}

#[derive(Clone, Debug)]
pub struct ShapeLayout {
    canvas: Rect,
    entries: Vec<ShapeEntry>,
}

impl ShapeLayout {
    pub fn rendered_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = Vec::new();
        for entry in &self.entries {
            if !nodes.contains(&entry.node) {
                nodes.push(entry.node);
            }
        }
        nodes
    }
}

impl Layout for ShapeLayout {
    fn canvas(&self) -> Rect {
        self.canvas
    }

    fn bounding_box(&self, node: NodeId) -> Option<Rect> {
        self.entries
            .iter()
            .filter(|entry| entry.node == node)
            .map(|entry| entry.bbox)
            .reduce(|acc, rect| acc.union(&rect))
    }

    fn elements_at(&self, point: Point) -> Vec<NodeId> {
        let mut hits = Vec::new();
        for entry in self.entries.iter().rev() {
            if !hits.contains(&entry.node) && entry.covers(point) {
                hits.push(entry.node);
            }
        }
        hits
    }
}

pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>, ExportError> {
    let expected = pixels.width as usize * pixels.height as usize * PixelBuffer::CHANNELS;
    if pixels.width == 0 || pixels.height == 0 || pixels.data.len() != expected {
        return Err(ExportError::Dimensions);
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            &pixels.data,
            pixels.width,
            pixels.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|err| ExportError::Encode(err.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ResvgBackend {
        ResvgBackend::with_fontdb(Arc::new(usvg::fontdb::Database::new()))
    }

    #[test]
    fn render_fits_and_centers() {
        let doc = Document::parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 10"><rect width="20" height="10" fill="#ff0000"/></svg>"##,
        )
        .expect("parse");
        let pixels = backend()
            .render(&doc, RasterConfig { width: 8, height: 8 })
            .expect("render");
        assert_eq!(pixels.len(), 8 * 8 * 4);
        let at = |x: usize, y: usize| {
            let i = (y * 8 + x) * 4;
            [pixels.data[i], pixels.data[i + 1], pixels.data[i + 2], pixels.data[i + 3]]
        };
        assert_eq!(at(0, 0), [0, 0, 0, 0]);
        assert_eq!(at(4, 4), [255, 0, 0, 255]);
        assert_eq!(at(4, 7), [0, 0, 0, 0]);
    }

    #[test]
    fn zero_size_is_rejected() {
        let doc = Document::parse(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"/>"#)
            .expect("parse");
        assert!(matches!(
            backend().render(&doc, RasterConfig { width: 0, height: 4 }),
            Err(RasterError::InvalidSize { .. })
        ));
    }

    #[test]
    fn duplicate_ids_get_generated_keys() {
        let mut doc = Document::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="a"/><rect id="a"/><circle id="c"/><path/></svg>"#,
        )
        .expect("parse");
        let keys = assign_key_ids(&mut doc);
        assert_eq!(keys.len(), 4);
        assert!(keys.contains_key("c"));
        assert!(!keys.contains_key("a"));
        assert_eq!(
            keys.keys().filter(|key| key.starts_with(KEY_ID_PREFIX)).count(),
            3
        );
    }

    #[test]
    fn garbage_font_data_is_skipped() {
        let base = ResvgBackend::new().font_faces();
        let backend = ResvgBackend::with_font_data([b"not a font".to_vec(), Vec::new()]);
        assert_eq!(backend.font_faces(), base);
    }

    #[test]
    fn png_encoding_checks_dimensions() {
        let pixels = PixelBuffer::new(2, 1, vec![255; 8]);
        let png = encode_png(&pixels).expect("png");
        assert_eq!(&png[1..4], b"PNG");
        assert!(matches!(
            encode_png(&PixelBuffer::new(2, 2, vec![0; 8])),
            Err(ExportError::Dimensions)
        ));
    }
}
