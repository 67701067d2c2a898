use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::Rng;

use crate::document::{Attribute, Document, NodeId, XLINK_NS};
use crate::element_id::{ELEMENT_ID_LEN, generate_element_id};
use crate::geometry::ViewBox;
use crate::style::{StyleDeclaration, is_presentation_attribute, strip_important};

const MAX_INLINE_PASSES: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    DanglingReference {
        node: NodeId,
        attribute: String,
        target: String,
    },
    MissingReferenceTarget { node: NodeId, target: String },
    /// `<use>` elements still present after inlining gave up.
    UnresolvedReferenceCycle { remaining: usize },
    /// The resolved viewBox has non-numeric components and was not written.
    InvalidViewBox { value: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DanglingReference {
                node,
                attribute,
                target,
            } => write!(
                f,
                "attribute {attribute} on node {} references unknown id '{target}'",
                node.index()
            ),
            Warning::MissingReferenceTarget { node, target } => write!(
                f,
                "<use> node {} references unknown id '{target}'",
                node.index()
            ),
            Warning::UnresolvedReferenceCycle { remaining } => {
                write!(f, "{remaining} <use> elements left unresolved (reference cycle)")
            }
            Warning::InvalidViewBox { value } => write!(f, "invalid viewBox '{value}'"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizeReport {
    pub view_box: ViewBox,
    pub warnings: Vec<Warning>,
}

#[derive(Clone, Copy, Debug)]
pub struct Normalizer {
    pub id_length: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            id_length: ELEMENT_ID_LEN,
        }
    }
}

impl Normalizer {
    pub fn new(id_length: usize) -> Self {
        Self { id_length }
    }

    pub fn normalize<R: Rng + ?Sized>(&self, doc: &mut Document, rng: &mut R) -> NormalizeReport {
        migrate_inline_styles(doc);
        hoist_root_presentation(doc);
        let mut warnings = inline_references(doc);
        warnings.extend(uniquify_ids(doc, rng, self.id_length));
        let view_box = resolve_view_box(doc);
        if !apply_view_box(doc, view_box) {
            let warning = Warning::InvalidViewBox {
                value: view_box.to_attribute(),
            };
            tracing::warn!(%warning, "viewBox left unset");
            warnings.push(warning);
        }
        NormalizeReport { view_box, warnings }
    }
}

pub fn migrate_inline_styles(doc: &mut Document) -> usize {
    let mut promoted_total = 0;
    for node in doc.elements() {
        let Some(text) = doc.attr(node, "style") else {
            continue;
        };
        let mut style = StyleDeclaration::parse(text);
        let promoted: Vec<(String, String)> = style
            .declarations()
            .iter()
            .filter(|decl| is_presentation_attribute(&decl.property))
            .map(|decl| (decl.property.clone(), strip_important(&decl.value).to_string()))
            .collect();
        if promoted.is_empty() {
            continue;
        }
        for (property, value) in &promoted {
            doc.set_attr(node, property, value.as_str());
            style.remove(property);
        }
        style.store(doc, node);
        promoted_total += promoted.len();
    }
    promoted_total
}

/// Moves presentation attributes found on the root `<svg>` onto a new `<g>`
/// that wraps all of the root's children.
pub fn hoist_root_presentation(doc: &mut Document) -> Option<NodeId> {
    let root = doc.root();
    let hoisted: Vec<Attribute> = doc
        .element(root)?
        .attributes
        .iter()
        .filter(|attr| attr.name.ns.is_none() && is_presentation_attribute(&attr.name.local))
        .cloned()
        .collect();
    if hoisted.is_empty() {
        return None;
    }
    let group = doc.create_element("g");
    for attr in hoisted {
        doc.remove_attr(root, &attr.name.local);
        doc.set_attr(group, &attr.name.local, attr.value);
    }
    let children = doc.children(root).to_vec();
    for child in children {
        doc.append_child(group, child);
    }
    doc.append_child(root, group);
    Some(group)
}

pub fn use_target(doc: &Document, node: NodeId) -> Option<&str> {
    let href = doc
        .attr_ns(node, Some(XLINK_NS), "href")
        .or_else(|| doc.attr(node, "href"))?;
    href.trim()
        .strip_prefix('#')
        .filter(|id| !id.is_empty())
}

pub fn inline_references(doc: &mut Document) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let mut skipped: HashSet<NodeId> = HashSet::new();
    let mut cyclic: HashSet<NodeId> = HashSet::new();
    for _ in 0..MAX_INLINE_PASSES {
        let pending = pending_uses(doc, &skipped);
        if pending.is_empty() {
            break;
        }
        let ids = first_ids(doc);
        for use_node in pending {
            let Some(target_id) = use_target(doc, use_node).map(str::to_string) else {
                skipped.insert(use_node);
                continue;
            };
            let Some(target) = ids.get(&target_id).copied() else {
                let warning = Warning::MissingReferenceTarget {
                    node: use_node,
                    target: target_id,
                };
                tracing::warn!(%warning, "reference left in place");
                warnings.push(warning);
                skipped.insert(use_node);
                continue;
            };
            if target == use_node || doc.ancestors(use_node).any(|node| node == target) {
                cyclic.insert(use_node);
                skipped.insert(use_node);
                continue;
            }
            let copy = doc.deep_clone(target);
            let carried: Vec<Attribute> = doc
                .element(use_node)
                .map(|element| {
                    element
                        .attributes
                        .iter()
                        .filter(|attr| attr.name.local != "href")
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for attr in carried {
                doc.set_qualified_attr(copy, attr.name, attr.value);
            }
            doc.remove_attr(copy, "id");
            doc.replace_node(use_node, copy);
        }
    }
    let attached: HashSet<NodeId> = doc.elements().into_iter().collect();
    let remaining = pending_uses(doc, &skipped).len()
        + cyclic.iter().filter(|node| attached.contains(node)).count();
    if remaining > 0 {
        let warning = Warning::UnresolvedReferenceCycle { remaining };
        tracing::warn!(%warning, "reference inlining stopped");
        warnings.push(warning);
    }
    warnings
}

fn pending_uses(doc: &Document, skipped: &HashSet<NodeId>) -> Vec<NodeId> {
    doc.elements()
        .into_iter()
        .filter(|node| doc.tag(*node) == Some("use") && !skipped.contains(node))
        .collect()
}

fn first_ids(doc: &Document) -> HashMap<String, NodeId> {
    let mut ids = HashMap::new();
    for node in doc.elements() {
        if let Some(id) = doc.attr(node, "id") {
            ids.entry(id.to_string()).or_insert(node);
        }
    }
    ids
}

/// Gives every element a fresh random id and rewrites `url(#..)` and `#..`
/// references to match.
pub fn uniquify_ids<R: Rng + ?Sized>(doc: &mut Document, rng: &mut R, len: usize) -> Vec<Warning> {
    let mut renamed: HashMap<String, String> = HashMap::new();
    let mut issued: HashSet<String> = HashSet::new();
    let nodes = doc.elements();
    for node in &nodes {
        let Some(old) = doc.attr(*node, "id").map(str::to_string) else {
            continue;
        };
        let fresh = loop {
            let candidate = generate_element_id(rng, len);
            if issued.insert(candidate.clone()) {
                break candidate;
            }
        };
        doc.set_attr(*node, "id", fresh.as_str());
        renamed.insert(old, fresh);
    }

    let mut warnings = Vec::new();
    for node in nodes {
        let Some(element) = doc.element_mut(node) else {
            continue;
        };
        for attr in element.attributes.iter_mut() {
            if attr.name.ns.is_none() && attr.name.local == "id" {
                continue;
            }
            let mut missing = Vec::new();
            let rewritten = if attr.name.local == "href" && attr.value.trim_start().starts_with('#') {
                rewrite_fragment(&attr.value, &renamed, &mut missing)
            } else if attr.value.contains("url(") {
                rewrite_url_references(&attr.value, &renamed, &mut missing)
            } else {
                None
            };
            if let Some(value) = rewritten {
                attr.value = value;
            }
            for target in missing {
                let warning = Warning::DanglingReference {
                    node,
                    attribute: attr.name.local.clone(),
                    target,
                };
                tracing::warn!(%warning, "reference not rewritten");
                warnings.push(warning);
            }
        }
    }
    warnings
}

fn rewrite_fragment(
    value: &str,
    renamed: &HashMap<String, String>,
    missing: &mut Vec<String>,
) -> Option<String> {
    let id = value.trim().strip_prefix('#').filter(|id| !id.is_empty())?;
    match renamed.get(id) {
        Some(fresh) => Some(format!("#{fresh}")),
        None => {
            missing.push(id.to_string());
            None
        }
    }
}

fn rewrite_url_references(
    value: &str,
    renamed: &HashMap<String, String>,
    missing: &mut Vec<String>,
) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut changed = false;
    while let Some(start) = rest.find("url(") {
        let body_start = start + "url(".len();
        let Some(close) = rest[body_start..].find(')') else {
            break;
        };
        let body = &rest[body_start..body_start + close];
        let inner = body.trim().trim_matches(|ch| ch == '"' || ch == '\'');
        out.push_str(&rest[..body_start]);
        match inner.strip_prefix('#') {
            Some(id) => match renamed.get(id) {
                Some(fresh) => {
                    out.push('#');
                    out.push_str(fresh);
                    changed = true;
                }
                None => {
                    missing.push(id.to_string());
                    out.push_str(body);
                }
            },
            None => out.push_str(body),
        }
        out.push(')');
        rest = &rest[body_start + close + 1..];
    }
    out.push_str(rest);
    changed.then_some(out)
}

pub fn resolve_view_box(doc: &Document) -> ViewBox {
    let root = doc.root();
    if let Some(raw) = doc.attr(root, "viewBox").filter(|raw| !raw.trim().is_empty()) {
        return parse_view_box(raw);
    }
    let width = length_to_px(doc.attr(root, "width"));
    let height = length_to_px(doc.attr(root, "height"));
    ViewBox::new(0.0, 0.0, width, height)
}

pub fn parse_view_box(raw: &str) -> ViewBox {
    let mut numbers = raw
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<f64>().unwrap_or(f64::NAN));
    let mut next = || numbers.next().unwrap_or(f64::NAN);
    ViewBox::new(next(), next(), next(), next())
}

pub fn apply_view_box(doc: &mut Document, view_box: ViewBox) -> bool {
    if !view_box.is_finite() {
        return false;
    }
    let root = doc.root();
    doc.set_attr(root, "viewBox", view_box.to_attribute());
    true
}

/// CSS length to pixels at 96 DPI. Missing or non-numeric input is NaN;
/// unknown units keep the bare number.
pub fn length_to_px(value: Option<&str>) -> f64 {
    let Some(value) = value else {
        return f64::NAN;
    };
    let trimmed = value.trim();
    let number_part = trimmed.trim_end_matches(|ch: char| ch.is_ascii_alphabetic() || ch == '%');
    let unit = trimmed[number_part.len()..].to_ascii_lowercase();
    let Ok(number) = number_part.trim().parse::<f64>() else {
        return f64::NAN;
    };
    match unit.as_str() {
        "in" => number * 96.0,
        "cm" => number * 96.0 / 2.54,
        "mm" => number * 96.0 / 25.4,
        "pt" => number * 96.0 / 72.0,
        "pc" => number * 16.0,
        _ => number,
    }
}
