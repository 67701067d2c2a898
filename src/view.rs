use nurie_core::catalog::COURSE_CATALOG;
use nurie_core::document::NODE_INDEX_ATTR;
use nurie_core::{Layout, NodeId, Palette, Point, Rect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement};

use crate::app::WebSession;

pub(crate) const REFERENCE_SLOT: u32 = 0;
pub(crate) const WORKING_SLOT: u32 = 1;

pub(crate) fn document() -> Option<Document> {
    web_sys::window()?.document()
}

pub(crate) fn by_id(id: &str) -> Option<Element> {
    document()?.get_element_by_id(id)
}

/// `#problems .iconContainer` number `slot`.
pub(crate) fn icon_container(slot: u32) -> Option<Element> {
    let list = document()?
        .query_selector_all("#problems .iconContainer")
        .ok()?;
    list.item(slot)?.dyn_into::<Element>().ok()
}

pub(crate) fn render(session: &WebSession) {
    if let Err(err) = try_render(session) {
        gloo::console::error!("render failed", err);
    }
}

fn try_render(session: &WebSession) -> Result<(), JsValue> {
    render_attribution(session.course());
    let Some(problem) = session.problem() else {
        for slot in [REFERENCE_SLOT, WORKING_SLOT] {
            if let Some(container) = icon_container(slot) {
                container.set_inner_html("");
            }
        }
        if let Some(panel) = by_id("colorPanel") {
            panel.set_inner_html("");
        }
        return Ok(());
    };
    if let Some(container) = icon_container(REFERENCE_SLOT) {
        container.set_inner_html(&problem.reference().to_svg_string());
        fill_container(&container)?;
    }
    render_working(session)?;
    render_palette(problem.palette())?;
    render_score(problem.scores().latest());
    Ok(())
}

pub(crate) fn render_working(session: &WebSession) -> Result<(), JsValue> {
    let (Some(problem), Some(container)) = (session.problem(), icon_container(WORKING_SLOT)) else {
        return Ok(());
    };
    container.set_inner_html(&problem.working().to_svg_string_indexed());
    fill_container(&container)
}

fn fill_container(container: &Element) -> Result<(), JsValue> {
    if let Some(svg) = container.first_element_child() {
        svg.set_attribute("width", "100%")?;
        svg.set_attribute("height", "100%")?;
    }
    Ok(())
}

pub(crate) fn render_palette(palette: &Palette) -> Result<(), JsValue> {
    let (Some(doc), Some(panel)) = (document(), by_id("colorPanel")) else {
        return Ok(());
    };
    panel.set_inner_html("");
    for (index, color) in palette.colors().iter().enumerate() {
        let button = doc.create_element("button")?.dyn_into::<HtmlElement>()?;
        button.set_attribute("type", "button")?;
        button.set_attribute("class", "border border-5 rounded-circle")?;
        button.set_attribute("data-index", &index.to_string())?;
        let size = format!("{}px", palette.swatch_size(index));
        let style = button.style();
        style.set_property("width", &size)?;
        style.set_property("height", &size)?;
        style.set_property("background-color", color)?;
        panel.append_child(&button)?;
    }
    Ok(())
}

pub(crate) fn render_score(score: u8) {
    if let Some(node) = by_id("score") {
        node.set_text_content(Some(&score.to_string()));
    }
}

pub(crate) fn render_attribution(course: Option<&str>) {
    let Some(attribution) = by_id("attribution") else {
        return;
    };
    let selected = course.and_then(|slug| COURSE_CATALOG.iter().position(|entry| entry.slug == slug));
    let children = attribution.children();
    for index in 0..children.length() {
        let Some(child) = children.item(index) else {
            continue;
        };
        let Ok(child) = child.dyn_into::<HtmlElement>() else {
            continue;
        };
        let display = if Some(index as usize) == selected { "block" } else { "none" };
        let _ = child.style().set_property("display", display);
    }
}

pub(crate) fn swatch_index(target: &Element) -> Option<usize> {
    let button = target.closest("#colorPanel button").ok()??;
    button.get_attribute("data-index")?.parse().ok()
}

/// Document node rendered as `target` or its nearest indexed ancestor.
pub(crate) fn node_for(target: &Element) -> Option<NodeId> {
    let selector = format!("[{NODE_INDEX_ATTR}]");
    let element = target.closest(&selector).ok()??;
    let index = element.get_attribute(NODE_INDEX_ATTR)?.parse().ok()?;
    Some(NodeId::from_index(index))
}

/// Maps client coordinates to the layout canvas of the working copy.
pub(crate) fn canvas_point<L: Layout>(layout: Option<&L>, client_x: f64, client_y: f64) -> Point {
    let Some(layout) = layout else {
        return Point::new(client_x, client_y);
    };
    let Some(svg) = icon_container(WORKING_SLOT).and_then(|container| container.first_element_child()) else {
        return Point::new(client_x, client_y);
    };
    let bounds = svg.get_bounding_client_rect();
    let shown = Rect::new(bounds.left(), bounds.top(), bounds.width(), bounds.height());
    unfit_point(layout.canvas(), shown, client_x, client_y)
}

/// Inverse of drawing `canvas` scaled to fit and centred inside `shown`.
fn unfit_point(canvas: Rect, shown: Rect, x: f64, y: f64) -> Point {
    if canvas.width <= 0.0 || canvas.height <= 0.0 {
        return Point::new(x - shown.x, y - shown.y);
    }
    let scale = (shown.width / canvas.width).min(shown.height / canvas.height);
    if scale <= 0.0 || !scale.is_finite() {
        return Point::new(canvas.x, canvas.y);
    }
    let offset_x = (shown.width - canvas.width * scale) / 2.0;
    let offset_y = (shown.height - canvas.height * scale) / 2.0;
    Point::new(
        canvas.x + (x - shown.x - offset_x) / scale,
        canvas.y + (y - shown.y - offset_y) / scale,
    )
}

/// Disables page input while a step holds the session.
pub(crate) fn set_busy(busy: bool) {
    for id in ["startButton", "course"] {
        if let Some(node) = by_id(id) {
            let _ = if busy {
                node.set_attribute("disabled", "")
            } else {
                node.remove_attribute("disabled")
            };
        }
    }
    let pointer = if busy { "none" } else { "auto" };
    for target in [by_id("colorPanel"), icon_container(WORKING_SLOT)].into_iter().flatten() {
        if let Ok(element) = target.dyn_into::<HtmlElement>() {
            let _ = element.style().set_property("pointer-events", pointer);
        }
    }
    if let Some(problems) = by_id("problems") {
        let _ = problems.set_attribute("aria-busy", if busy { "true" } else { "false" });
    }
}

/// On-screen width of the working copy, used to scale outlines.
pub(crate) fn working_display_px() -> Option<u32> {
    let container = icon_container(WORKING_SLOT)?;
    let width = container.client_width();
    (width > 0).then_some(width as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfit_point_undoes_letterboxing() {
        let canvas = Rect::new(0.0, 0.0, 100.0, 50.0);
        let shown = Rect::new(10.0, 20.0, 200.0, 200.0);
        // scaled by 2, centred vertically with 50px bands
        let point = unfit_point(canvas, shown, 10.0, 70.0);
        assert_eq!((point.x, point.y), (0.0, 0.0));
        let point = unfit_point(canvas, shown, 210.0, 170.0);
        assert_eq!((point.x, point.y), (100.0, 50.0));
    }

    #[test]
    fn unfit_point_survives_empty_canvas() {
        let shown = Rect::new(5.0, 5.0, 100.0, 100.0);
        let point = unfit_point(Rect::new(0.0, 0.0, 0.0, 0.0), shown, 15.0, 25.0);
        assert_eq!((point.x, point.y), (10.0, 20.0));
    }
}
