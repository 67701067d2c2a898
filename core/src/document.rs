use std::collections::BTreeMap;
use std::fmt::Write;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Attribute added by [`Document::to_svg_string_indexed`] so a host can map a
/// rendered element back to its node.
pub const NODE_INDEX_ATTR: &str = "data-nurie-node";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document parse failed: {0}")]
    Parse(#[from] roxmltree::Error),
    #[error("root element is <{0}>, expected <svg>")]
    NotSvg(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualName {
    pub ns: Option<String>,
    pub prefix: Option<String>,
    pub local: String,
}

impl QualName {
    pub fn local(name: &str) -> Self {
        Self {
            ns: None,
            prefix: None,
            local: name.to_string(),
        }
    }

    pub fn svg(name: &str) -> Self {
        Self {
            ns: Some(SVG_NS.to_string()),
            prefix: None,
            local: name.to_string(),
        }
    }

    pub fn xlink(name: &str) -> Self {
        Self {
            ns: Some(XLINK_NS.to_string()),
            prefix: Some("xlink".to_string()),
            local: name.to_string(),
        }
    }

    fn is_svg(&self) -> bool {
        match self.ns.as_deref() {
            None => true,
            Some(ns) => ns == SVG_NS,
        }
    }

    fn matches(&self, ns: Option<&str>, local: &str) -> bool {
        self.local == local && self.ns.as_deref() == ns
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: QualName,
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(text, options)?;
        let source_root = xml.root_element();
        if source_root.tag_name().name() != "svg" {
            return Err(DocumentError::NotSvg(source_root.tag_name().name().to_string()));
        }
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = doc.import(source_root, None);
        doc.root = root;
        Ok(doc)
    }

    fn import(&mut self, source: roxmltree::Node<'_, '_>, parent: Option<NodeId>) -> NodeId {
        let tag = source.tag_name();
        let name = QualName {
            ns: tag.namespace().map(str::to_string),
            prefix: tag
                .namespace()
                .filter(|ns| *ns != SVG_NS)
                .and_then(|ns| source.lookup_prefix(ns))
                .map(str::to_string),
            local: tag.name().to_string(),
        };
        let attributes = source
            .attributes()
            .map(|attr| Attribute {
                name: QualName {
                    ns: attr.namespace().map(str::to_string),
                    prefix: attr
                        .namespace()
                        .and_then(|ns| source.lookup_prefix(ns))
                        .map(str::to_string),
                    local: attr.name().to_string(),
                },
                value: attr.value().to_string(),
            })
            .collect();
        let id = self.push(NodeKind::Element(Element { name, attributes }), parent);
        for child in source.children() {
            if child.is_element() {
                let child_id = self.import(child, Some(id));
                self.nodes[id.0].children.push(child_id);
            } else if child.is_text() {
                let text = child.text().unwrap_or_default().to_string();
                let child_id = self.push(NodeKind::Text(text), Some(id));
                self.nodes[id.0].children.push(child_id);
            }
        }
        id
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.0).map(|data| &data.kind)
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match self.kind(node)? {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node.0)?.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node)
            .filter(|element| element.name.is_svg())
            .map(|element| element.name.local.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|data| data.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|data| data.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |current| self.parent(*current))
    }

    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if self.element(current).is_none() {
                continue;
            }
            out.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attr_ns(node, None, name)
    }

    pub fn attr_ns(&self, node: NodeId, ns: Option<&str>, name: &str) -> Option<&str> {
        self.element(node)?
            .attributes
            .iter()
            .find(|attr| attr.name.matches(ns, name))
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        self.set_qualified_attr(node, QualName::local(name), value);
    }

    pub fn set_qualified_attr(&mut self, node: NodeId, name: QualName, value: impl Into<String>) {
        let value = value.into();
        let Some(element) = self.element_mut(node) else {
            return;
        };
        if let Some(existing) = element
            .attributes
            .iter_mut()
            .find(|attr| attr.name.matches(name.ns.as_deref(), &name.local))
        {
            existing.value = value;
        } else {
            element.attributes.push(Attribute { name, value });
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Option<String> {
        self.remove_attr_ns(node, None, name)
    }

    pub fn remove_attr_ns(&mut self, node: NodeId, ns: Option<&str>, name: &str) -> Option<String> {
        let element = self.element_mut(node)?;
        let index = element
            .attributes
            .iter()
            .position(|attr| attr.name.matches(ns, name))?;
        Some(element.attributes.remove(index).value)
    }

    pub fn create_element(&mut self, local: &str) -> NodeId {
        self.push(
            NodeKind::Element(Element {
                name: QualName::svg(local),
                attributes: Vec::new(),
            }),
            None,
        )
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }

    /// Puts `replacement` where `old` was; `old` ends up detached.
    pub fn replace_node(&mut self, old: NodeId, replacement: NodeId) {
        if old == replacement {
            return;
        }
        self.detach(replacement);
        let Some(parent) = self.nodes[old.0].parent.take() else {
            return;
        };
        if let Some(slot) = self.nodes[parent.0]
            .children
            .iter_mut()
            .find(|child| **child == old)
        {
            *slot = replacement;
        }
        self.nodes[replacement.0].parent = Some(parent);
    }

    pub fn deep_clone(&mut self, node: NodeId) -> NodeId {
        let kind = self.nodes[node.0].kind.clone();
        let copy = self.push(kind, None);
        let children = self.nodes[node.0].children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|node| self.attr(*node, "id") == Some(id))
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(_)) => {
                for child in self.children(node) {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    pub fn to_svg_string(&self) -> String {
        self.serialize(false)
    }

    /// Like [`Document::to_svg_string`], tagging every element with
    /// [`NODE_INDEX_ATTR`].
    pub fn to_svg_string_indexed(&self) -> String {
        self.serialize(true)
    }

    fn serialize(&self, indexed: bool) -> String {
        let prefixes = self.collect_prefixes();
        let mut out = String::new();
        self.write_node(self.root, &prefixes, indexed, true, &mut out);
        out
    }

    fn collect_prefixes(&self) -> BTreeMap<String, String> {
        let mut prefixes = BTreeMap::new();
        let mut generated = 0usize;
        let mut note = |name: &QualName, prefixes: &mut BTreeMap<String, String>| {
            let Some(ns) = name.ns.as_deref() else {
                return;
            };
            if ns == SVG_NS || ns == XML_NS || prefixes.contains_key(ns) {
                return;
            }
            let prefix = match name.prefix.as_deref() {
                Some(prefix) => prefix.to_string(),
                None if ns == XLINK_NS => "xlink".to_string(),
                None => {
                    generated += 1;
                    format!("ns{generated}")
                }
            };
            prefixes.insert(ns.to_string(), prefix);
        };
        for node in self.elements() {
            if let Some(element) = self.element(node) {
                note(&element.name, &mut prefixes);
                for attr in &element.attributes {
                    note(&attr.name, &mut prefixes);
                }
            }
        }
        prefixes
    }

    fn write_node(
        &self,
        node: NodeId,
        prefixes: &BTreeMap<String, String>,
        indexed: bool,
        is_root: bool,
        out: &mut String,
    ) {
        let element = match self.kind(node) {
            Some(NodeKind::Text(text)) => {
                escape_into(text, false, out);
                return;
            }
            Some(NodeKind::Element(element)) => element,
            None => return,
        };
        let tag = qualified(&element.name, prefixes);
        out.push('<');
        out.push_str(&tag);
        if is_root {
            let _ = write!(out, " xmlns=\"{SVG_NS}\"");
            for (ns, prefix) in prefixes {
                let _ = write!(out, " xmlns:{prefix}=\"");
                escape_into(ns, true, out);
                out.push('"');
            }
        }
        for attr in &element.attributes {
            out.push(' ');
            out.push_str(&qualified(&attr.name, prefixes));
            out.push_str("=\"");
            escape_into(&attr.value, true, out);
            out.push('"');
        }
        if indexed {
            let _ = write!(out, " {NODE_INDEX_ATTR}=\"{}\"", node.0);
        }
        let children = self.children(node);
        if children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in children {
            self.write_node(*child, prefixes, indexed, false, out);
        }
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}

fn qualified(name: &QualName, prefixes: &BTreeMap<String, String>) -> String {
    match name.ns.as_deref() {
        None | Some(SVG_NS) => name.local.clone(),
        Some(XML_NS) => format!("xml:{}", name.local),
        Some(ns) => match prefixes.get(ns) {
            Some(prefix) => format!("{prefix}:{}", name.local),
            None => name.local.clone(),
        },
    }
}

fn escape_into(value: &str, attribute: bool, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 10 10">
  <defs><circle id="dot" r="2" fill="#123456"/></defs>
  <use xlink:href="#dot" x="1"/>
  <text x="1" y="9">a &amp; b</text>
</svg>"##;

    #[test]
    fn parse_keeps_namespaced_attributes() {
        let doc = Document::parse(SAMPLE).expect("parse");
        let use_node = doc
            .elements()
            .into_iter()
            .find(|node| doc.tag(*node) == Some("use"))
            .expect("use");
        assert_eq!(doc.attr_ns(use_node, Some(XLINK_NS), "href"), Some("#dot"));
        assert_eq!(doc.attr(use_node, "href"), None);
    }

    #[test]
    fn serialize_round_trips_through_parse() {
        let doc = Document::parse(SAMPLE).expect("parse");
        let text = doc.to_svg_string();
        assert!(text.contains("xmlns:xlink=\"http://www.w3.org/1999/xlink\""));
        assert!(text.contains("xlink:href=\"#dot\""));
        assert!(text.contains("a &amp; b"));
        let again = Document::parse(&text).expect("reparse");
        assert_eq!(again.elements().len(), doc.elements().len());
    }

    #[test]
    fn rejects_non_svg_root() {
        let err = Document::parse("<html/>").expect_err("not svg");
        assert!(matches!(err, DocumentError::NotSvg(name) if name == "html"));
    }

    #[test]
    fn replace_and_clone_detach_old_nodes() {
        let mut doc = Document::parse(SAMPLE).expect("parse");
        let dot = doc.find_by_id("dot").expect("dot");
        let use_node = doc
            .elements()
            .into_iter()
            .find(|node| doc.tag(*node) == Some("use"))
            .expect("use");
        let copy = doc.deep_clone(dot);
        assert_eq!(doc.parent(copy), None);
        doc.replace_node(use_node, copy);
        assert_eq!(doc.parent(use_node), None);
        let circles = doc
            .elements()
            .into_iter()
            .filter(|node| doc.tag(*node) == Some("circle"))
            .count();
        assert_eq!(circles, 2);
        assert!(!doc.elements().contains(&use_node));
    }

    #[test]
    fn indexed_serialization_tags_elements() {
        let doc = Document::parse(SAMPLE).expect("parse");
        let text = doc.to_svg_string_indexed();
        assert!(text.contains(&format!("{NODE_INDEX_ATTR}=\"0\"")));
    }

    #[test]
    fn ancestors_walk_to_root() {
        let doc = Document::parse(SAMPLE).expect("parse");
        let dot = doc.find_by_id("dot").expect("dot");
        let chain: Vec<_> = doc.ancestors(dot).collect();
        assert_eq!(chain.last(), Some(&doc.root()));
        assert_eq!(chain.len(), 2);
    }
}
