use std::collections::BTreeMap;

/// One materialized XML subtree node. Transient: built while a record tag is
/// open, flattened, then dropped, so peak memory stays bounded by a single
/// record subtree rather than the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Namespace-stripped tag name.
    pub tag: String,
    /// Concatenated non-markup text content, if any.
    pub text: Option<String>,
    /// Namespace-stripped attribute names with their values, in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(tag: String) -> Self {
        Self {
            tag,
            text: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn append_text(&mut self, fragment: &str) {
        self.text.get_or_insert_with(String::new).push_str(fragment);
    }

    /// Adds a text fragment; whitespace-only fragments between child elements
    /// are dropped so indentation never shows up as element text.
    pub fn push_text(&mut self, fragment: &str) {
        if !fragment.trim().is_empty() {
            self.append_text(fragment);
        }
    }
}

/// Collapses a subtree into a flat key -> value mapping.
///
/// Keys are the underscore-joined path of tag names from the subtree root.
/// Each call returns its own mapping and parents merge explicitly, so the
/// result for a given subtree never depends on sibling traversal state.
///
/// Merge order within one element: children first (later siblings overwrite
/// earlier ones on key collision), then the element's own text at the prefix
/// key, then its attributes at `prefix_attr` keys.
///
/// At the subtree root the prefix is empty; the root's children keep
/// root-relative keys while the root's own text and attributes are keyed
/// under the root's tag name:
/// `<situationRecord unit="kmh"><speed>80</speed></situationRecord>`
/// yields `{speed: "80", situationRecord_unit: "kmh"}`.
pub fn flatten_element(element: &XmlElement, prefix: &str) -> BTreeMap<String, String> {
    let mut items = BTreeMap::new();

    for child in &element.children {
        let child_key = if prefix.is_empty() {
            child.tag.clone()
        } else {
            format!("{prefix}_{}", child.tag)
        };
        items.extend(flatten_element(child, &child_key));
    }

    let own_key = if prefix.is_empty() {
        element.tag.as_str()
    } else {
        prefix
    };

    if let Some(text) = element.text.as_deref() {
        let text = text.trim();
        if !text.is_empty() {
            items.insert(own_key.to_string(), text.to_string());
        }
    }

    for (name, value) in &element.attributes {
        items.insert(format!("{own_key}_{name}"), value.clone());
    }

    items
}
