use std::collections::HashSet;

use nurie_core::extract::extract_pieces;
use nurie_core::{BoxLayout, Document, Normalizer, PixelBuffer, Rect, match_score};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn rect_svg(rects: &[(f64, f64, f64, f64)]) -> String {
    let mut svg = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">"#);
    for (idx, (x, y, w, h)) in rects.iter().enumerate() {
        svg.push_str(&format!(
            r##"<rect id="r{idx}" x="{x}" y="{y}" width="{w}" height="{h}" fill="#{:06x}"/>"##,
            idx * 4099
        ));
    }
    svg.push_str("</svg>");
    svg
}

fn piece_count(rects: &[(f64, f64, f64, f64)], ratio: f64) -> usize {
    let mut doc = Document::parse(&rect_svg(rects)).expect("parse");
    let mut layout = BoxLayout::new(Rect::new(0.0, 0.0, 100.0, 100.0));
    for (idx, (x, y, w, h)) in rects.iter().enumerate() {
        let node = doc.find_by_id(&format!("r{idx}")).expect("rect");
        layout.insert(node, Rect::new(*x, *y, *w, *h));
    }
    extract_pieces(&mut doc, &layout, ratio).pieces.len()
}

fn referenced_ids(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find("url(#") {
        let tail = &rest[start + 5..];
        let Some(end) = tail.find(')') else { break };
        out.push(tail[..end].to_string());
        rest = &tail[end..];
    }
    if let Some(id) = value.strip_prefix('#') {
        out.push(id.to_string());
    }
    out
}

proptest! {
    #[test]
    fn smaller_area_ratio_never_loses_pieces(
        rects in prop::collection::vec((0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64), 0..12),
        a in 0.0..1.0f64,
        b in 0.0..1.0f64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(piece_count(&rects, low) >= piece_count(&rects, high));
    }

    #[test]
    fn normalized_ids_are_unique_and_references_resolve(
        picks in prop::collection::vec((0usize..4, 0usize..4), 1..10),
        seed in any::<u64>(),
    ) {
        let mut svg = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="10" height="10"><defs>"#);
        for grad in 0..4 {
            svg.push_str(&format!(r#"<linearGradient id="g{grad}"/>"#));
        }
        svg.push_str("</defs>");
        for (idx, (id, grad)) in picks.iter().enumerate() {
            if idx % 3 == 2 {
                svg.push_str(&format!(r##"<use xlink:href="#s{id}"/>"##));
            }
            svg.push_str(&format!(
                r##"<rect id="s{id}" fill="url(#g{grad})" style="stroke:url('#g{grad}')"/>"##
            ));
        }
        svg.push_str("</svg>");

        let mut doc = Document::parse(&svg).expect("parse");
        let mut rng = StdRng::seed_from_u64(seed);
        Normalizer::new(16).normalize(&mut doc, &mut rng);

        let mut ids = HashSet::new();
        for node in doc.elements() {
            if let Some(id) = doc.attr(node, "id") {
                prop_assert!(ids.insert(id.to_string()), "duplicate id {}", id);
            }
            prop_assert_ne!(doc.tag(node), Some("use"));
        }
        for node in doc.elements() {
            let element = doc.element(node).expect("element");
            for attr in &element.attributes {
                if attr.name.local == "id" {
                    continue;
                }
                for target in referenced_ids(&attr.value) {
                    prop_assert!(ids.contains(&target), "dangling {}", target);
                }
            }
        }
    }

    #[test]
    fn score_is_a_percentage(
        reference in prop::collection::vec(any::<u8>(), 0..64),
        working in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let reference = PixelBuffer::new(0, 0, reference);
        let working = PixelBuffer::new(0, 0, working);
        let score = match_score(&reference, &working);
        prop_assert!(score <= 100);
        prop_assert_eq!(match_score(&working, &working), if working.is_empty() { 0 } else { 100 });
    }
}
