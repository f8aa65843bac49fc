//! In-memory record tree for the decompressed save payload.
//!
//! The payload is UTF-8 XML: a root element wrapping named `class` elements,
//! `array` elements with `name`/`type`/`count` attributes, and scalar leaves
//! (`u8`, `s8`, `u16`, `s16`, `u32`) carrying `name` and numeric `value`
//! attributes. The tree is parsed once per load into an arena addressed by
//! [`NodeId`] handles; structure never changes afterwards, only `value`
//! attributes do. Attribute order and inter-element whitespace are kept so
//! re-serialization is byte-stable; the container checksum is computed over
//! exactly these bytes.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Result, SaveError};

/// Handle into the tree arena. Stable for the lifetime of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<NodeId>,
    /// Raw text between the start tag and the first child.
    text: String,
    /// Raw text between this element's end tag and the next sibling.
    tail: String,
}

/// One step of a lookup chain: an element tag plus optional `name` and
/// `type` attribute requirements. Repeated siblings are told apart by their
/// declared `type`.
#[derive(Debug, Clone, Copy)]
pub struct Sel<'a> {
    tag: &'a str,
    name: Option<&'a str>,
    kind: Option<&'a str>,
}

impl<'a> Sel<'a> {
    pub fn tag(tag: &'a str) -> Self {
        Self {
            tag,
            name: None,
            kind: None,
        }
    }

    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn typed(mut self, kind: &'a str) -> Self {
        self.kind = Some(kind);
        self
    }

    fn matches(&self, node: &NodeData) -> bool {
        if node.tag != self.tag {
            return false;
        }
        if let Some(name) = self.name
            && attr_of(node, "name") != Some(name)
        {
            return false;
        }
        if let Some(kind) = self.kind
            && attr_of(node, "type") != Some(kind)
        {
            return false;
        }
        true
    }

    fn describe(&self) -> String {
        let mut out = self.tag.to_string();
        if let Some(name) = self.name {
            out.push_str(&format!("[name={name}]"));
        }
        if let Some(kind) = self.kind {
            out.push_str(&format!("[type={kind}]"));
        }
        out
    }
}

fn describe_path(path: &[Sel<'_>]) -> String {
    path.iter()
        .map(Sel::describe)
        .collect::<Vec<_>>()
        .join("/")
}

fn attr_of<'n>(node: &'n NodeData, key: &str) -> Option<&'n str> {
    node.attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    /// Parse the inflated payload. Malformed XML is a decode failure: the
    /// container was intact but its contents are not this schema.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut nodes: Vec<NodeData> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let id = alloc(&mut nodes, node_from_start(&start)?);
                    attach(&mut nodes, &stack, &mut root, id)?;
                    stack.push(id);
                }
                Ok(Event::Empty(start)) => {
                    let id = alloc(&mut nodes, node_from_start(&start)?);
                    attach(&mut nodes, &stack, &mut root, id)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(text)) => {
                    let text = text
                        .unescape()
                        .map_err(|e| SaveError::Decode(format!("bad payload text: {e}")))?;
                    match stack.last() {
                        Some(&parent) => {
                            // Text after a child is that child's tail; text
                            // before any child belongs to the parent.
                            match nodes[parent.0 as usize].children.last().copied() {
                                Some(last_child) => {
                                    nodes[last_child.0 as usize].tail.push_str(&text);
                                }
                                None => nodes[parent.0 as usize].text.push_str(&text),
                            }
                        }
                        None => {
                            // Whitespace around the root (and after the XML
                            // declaration) is not part of any node; the
                            // writer owns that framing.
                            if let Some(root) = root {
                                nodes[root.0 as usize].tail.push_str(&text);
                            }
                        }
                    }
                }
                Ok(Event::CData(_)) | Ok(Event::DocType(_)) => {
                    return Err(SaveError::Decode(
                        "payload contains markup the save schema never uses".to_string(),
                    ));
                }
                Ok(Event::Eof) => break,
                // Declarations, comments, processing instructions.
                Ok(_) => {}
                Err(e) => {
                    return Err(SaveError::Decode(format!("payload is not well-formed: {e}")));
                }
            }
        }

        let root = root.ok_or_else(|| {
            SaveError::Decode("payload has no root element".to_string())
        })?;
        Ok(Self { nodes, root })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        attr_of(self.node(id), key)
    }

    /// The node's `name` attribute, when present.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "name")
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Numeric `value` attribute of a scalar leaf.
    pub fn value(&self, id: NodeId) -> Result<i64> {
        let raw = self
            .attr(id, "value")
            .ok_or_else(|| self.missing_value(id))?;
        raw.parse().map_err(|_| {
            SaveError::Decode(format!(
                "non-numeric value {raw:?} on <{}>",
                self.node_label(id)
            ))
        })
    }

    /// Overwrite a scalar leaf's `value` attribute in place. The attribute
    /// must already exist: structure is fixed by the schema.
    pub fn set_value(&mut self, id: NodeId, value: i64) -> Result<()> {
        let node = &mut self.nodes[id.0 as usize];
        for (key, slot) in &mut node.attrs {
            if key == "value" {
                *slot = value.to_string();
                return Ok(());
            }
        }
        Err(self.missing_value(id))
    }

    fn missing_value(&self, id: NodeId) -> SaveError {
        SaveError::Schema {
            path: format!("{}@value", self.node_label(id)),
        }
    }

    fn node_label(&self, id: NodeId) -> String {
        let node = self.node(id);
        match attr_of(node, "name") {
            Some(name) => format!("{}[name={name}]", node.tag),
            None => node.tag.clone(),
        }
    }

    /// First match for a selector chain, in document order. The first
    /// selector searches descendants (self included); each further selector
    /// steps to the first matching direct child.
    pub fn find(&self, from: NodeId, path: &[Sel<'_>]) -> Option<NodeId> {
        let (first, rest) = path.split_first()?;
        let mut current = self.descendant_match(from, first)?;
        for sel in rest {
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|&child| sel.matches(self.node(child)))?;
        }
        Some(current)
    }

    /// Every match for a selector chain, in document order. The first
    /// selector matches descendants (self included); each further selector
    /// steps to matching direct children of every node matched so far.
    pub fn find_all(&self, from: NodeId, path: &[Sel<'_>]) -> Vec<NodeId> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        let mut current = self.collect_descendants(from, first);
        for sel in rest {
            let mut next = Vec::new();
            for id in current {
                for &child in self.children(id) {
                    if sel.matches(self.node(child)) {
                        next.push(child);
                    }
                }
            }
            current = next;
        }
        current
    }

    /// Every descendant (document order) matching the selector.
    pub fn collect_descendants(&self, from: NodeId, sel: &Sel<'_>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if sel.matches(self.node(id)) {
                out.push(id);
            }
            for &child in self.node(id).children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Like [`find`](Self::find) but required: a miss is a schema error
    /// naming the failed chain.
    pub fn get(&self, from: NodeId, path: &[Sel<'_>]) -> Result<NodeId> {
        self.find(from, path).ok_or_else(|| SaveError::Schema {
            path: describe_path(path),
        })
    }

    /// Required direct-child lookup.
    pub fn get_child(&self, parent: NodeId, sel: &Sel<'_>) -> Result<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| sel.matches(self.node(child)))
            .ok_or_else(|| SaveError::Schema {
                path: format!("{}/{}", self.node_label(parent), sel.describe()),
            })
    }

    fn descendant_match(&self, from: NodeId, sel: &Sel<'_>) -> Option<NodeId> {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if sel.matches(self.node(id)) {
                return Some(id);
            }
            for &child in self.node(id).children.iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    /// The exact byte stream the container codec compresses: declaration
    /// line, attributes in stored order, empty elements self-closed with no
    /// space before `/>`.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 48);
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        self.write_node(self.root, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push('<');
        out.push_str(&node.tag);
        for (key, value) in &node.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            push_escaped(out, value, true);
            out.push('"');
        }
        if node.children.is_empty() && node.text.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            push_escaped(out, &node.text, false);
            for &child in &node.children {
                self.write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&node.tag);
            out.push('>');
        }
        push_escaped(out, &node.tail, false);
    }

    /// Re-indented dump for display and external diffing; never read back.
    pub fn to_pretty_xml(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 48);
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        self.write_pretty(self.root, 0, &mut out);
        out
    }

    fn write_pretty(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push('<');
        out.push_str(&node.tag);
        for (key, value) in &node.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            push_escaped(out, value, true);
            out.push('"');
        }
        if node.children.is_empty() {
            out.push_str("/>\n");
        } else {
            out.push_str(">\n");
            for &child in &node.children {
                self.write_pretty(child, depth + 1, out);
            }
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str("</");
            out.push_str(&node.tag);
            out.push_str(">\n");
        }
    }

    /// Whitespace-free single-line dump.
    pub fn to_compact_xml(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 40);
        self.write_compact(self.root, &mut out);
        out
    }

    fn write_compact(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push('<');
        out.push_str(&node.tag);
        for (key, value) in &node.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            push_escaped(out, value, true);
            out.push('"');
        }
        if node.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            for &child in &node.children {
                self.write_compact(child, out);
            }
            out.push_str("</");
            out.push_str(&node.tag);
            out.push('>');
        }
    }
}

fn alloc(nodes: &mut Vec<NodeData>, node: NodeData) -> NodeId {
    let id = NodeId(nodes.len() as u32);
    nodes.push(node);
    id
}

fn attach(
    nodes: &mut [NodeData],
    stack: &[NodeId],
    root: &mut Option<NodeId>,
    id: NodeId,
) -> Result<()> {
    match stack.last() {
        Some(&parent) => {
            nodes[parent.0 as usize].children.push(id);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(id);
            Ok(())
        }
        None => Err(SaveError::Decode(
            "payload has more than one root element".to_string(),
        )),
    }
}

fn node_from_start(start: &BytesStart<'_>) -> Result<NodeData> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SaveError::Decode(format!("bad attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| SaveError::Decode(format!("bad attribute value: {e}")))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(NodeData {
        tag,
        attrs,
        children: Vec::new(),
        text: String::new(),
        tail: String::new(),
    })
}

fn push_escaped(out: &mut String, raw: &str, quote: bool) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
