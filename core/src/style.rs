use crate::document::{Document, NodeId};

/// SVG presentation attributes: properties that may be written either as an
/// attribute or inside a `style` declaration.
pub const PRESENTATION_ATTRIBUTES: &[&str] = &[
    "alignment-baseline",
    "baseline-shift",
    "clip",
    "clip-path",
    "clip-rule",
    "color",
    "color-interpolation",
    "color-interpolation-filters",
    "color-profile",
    "color-rendering",
    "cursor",
    "direction",
    "display",
    "dominant-baseline",
    "enable-background",
    "fill",
    "fill-opacity",
    "fill-rule",
    "filter",
    "flood-color",
    "flood-opacity",
    "font-family",
    "font-size",
    "font-size-adjust",
    "font-stretch",
    "font-style",
    "font-variant",
    "font-weight",
    "glyph-orientation-horizontal",
    "glyph-orientation-vertical",
    "image-rendering",
    "kerning",
    "letter-spacing",
    "lighting-color",
    "marker-end",
    "marker-mid",
    "marker-start",
    "mask",
    "opacity",
    "overflow",
    "pointer-events",
    "shape-rendering",
    "solid-color",
    "solid-opacity",
    "stop-color",
    "stop-opacity",
    "stroke",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "stroke-opacity",
    "stroke-width",
    "text-anchor",
    "text-decoration",
    "text-rendering",
    "transform",
    "unicode-bidi",
    "vector-effect",
    "visibility",
    "word-spacing",
    "writing-mode",
];

pub fn is_presentation_attribute(name: &str) -> bool {
    PRESENTATION_ATTRIBUTES.contains(&name)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

/// Parsed inline `style` attribute, declaration order preserved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    declarations: Vec<Declaration>,
}

impl StyleDeclaration {
    pub fn parse(text: &str) -> Self {
        let declarations = split_outside_parens(text, ';')
            .into_iter()
            .filter_map(|chunk| {
                let (property, value) = chunk.split_once(':')?;
                let property = property.trim().to_ascii_lowercase();
                if property.is_empty() {
                    return None;
                }
                Some(Declaration {
                    property,
                    value: value.trim().to_string(),
                })
            })
            .collect();
        Self { declarations }
    }

    pub fn of(doc: &Document, node: NodeId) -> Self {
        doc.attr(node, "style").map(Self::parse).unwrap_or_default()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|decl| decl.property == property)
            .map(|decl| decl.value.as_str())
    }

    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        self.declarations.retain(|decl| decl.property != property);
        self.declarations.push(Declaration {
            property: property.to_string(),
            value,
        });
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let value = self.get(property).map(str::to_string);
        self.declarations.retain(|decl| decl.property != property);
        value
    }

    /// Writes the declaration back to `node`, dropping the attribute when
    /// nothing is left.
    pub fn store(&self, doc: &mut Document, node: NodeId) {
        if self.declarations.is_empty() {
            doc.remove_attr(node, "style");
        } else {
            doc.set_attr(node, "style", self.to_string());
        }
    }
}

impl std::fmt::Display for StyleDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, decl) in self.declarations.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {};", decl.property, decl.value)?;
        }
        Ok(())
    }
}

/// Drops a trailing `!important` marker.
pub fn strip_important(value: &str) -> &str {
    let trimmed = value.trim_end();
    let tail = trimmed
        .len()
        .checked_sub("!important".len())
        .and_then(|cut| Some((cut, trimmed.get(cut..)?)));
    match tail {
        Some((cut, tail)) if tail.eq_ignore_ascii_case("!important") => trimmed[..cut].trim_end(),
        _ => trimmed,
    }
}

fn split_outside_parens(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    for (idx, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ch) if ch == separator && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
