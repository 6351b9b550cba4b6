//! XML element trees
//!
//! The codec exchanges in-memory element trees, never raw bytes. This module
//! provides that tree together with the collaborators that move it to and
//! from text: a `quick-xml` reader with scoped namespace resolution, an
//! adapter from `roxmltree` documents, and a `quick-xml` writer.

use crate::error::{Error, Position, Result};
use crate::limits::Limits;
use crate::namespaces::{well_known_prefix, NamespaceContext, QName, XML_NAMESPACE};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// XML Element in the document tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Element attributes (order is not significant)
    pub attributes: IndexMap<QName, String>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Where the element starts in its source document
    pub position: Option<Position>,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
            position: None,
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute_qname(&self, qname: &QName) -> Option<&str> {
        self.attributes.get(qname).map(|s| s.as_str())
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, qname: QName, value: impl Into<String>) {
        self.attributes.insert(qname, value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Set text content
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Builder form of [`Element::set_attribute`]
    pub fn with_attribute(mut self, qname: QName, value: impl Into<String>) -> Self {
        self.set_attribute(qname, value);
        self
    }

    /// Builder form of [`Element::set_text`]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Builder form of [`Element::add_child`]
    pub fn with_child(mut self, child: Element) -> Self {
        self.add_child(child);
        self
    }

    /// Local names of the children, in document order
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.local_name()).collect()
    }

    fn append_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Called once an element with a start and an end tag is complete.
    /// Leaf text is kept verbatim (`<a></a>` holds `""`, `<a/>` holds
    /// nothing); whitespace between child elements is dropped.
    fn settle_text(&mut self) {
        if self.children.is_empty() {
            if self.text.is_none() {
                self.text = Some(String::new());
            }
        } else if self.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            self.text = None;
        }
    }

    /// Convert a `roxmltree` element node, keeping its source position
    pub fn from_roxmltree(doc: &roxmltree::Document<'_>, node: roxmltree::Node<'_, '_>) -> Self {
        let qname = QName::new(node.tag_name().namespace(), node.tag_name().name());
        let mut element = Element::new(qname);

        let pos = doc.text_pos_at(node.range().start);
        element.position = Some(Position::new(pos.row, pos.col));

        for attr in node.attributes() {
            element
                .attributes
                .insert(QName::new(attr.namespace(), attr.name()), attr.value().to_string());
        }

        let text: String = node
            .children()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        element.children = node
            .children()
            .filter(|n| n.is_element())
            .map(|n| Element::from_roxmltree(doc, n))
            .collect();
        if !doc.input_text()[node.range()].ends_with("/>") {
            element.text = Some(text);
            element.settle_text();
        }
        element
    }
}

impl PartialEq for Element {
    /// Trees compare by name, attributes (as a map), text and children;
    /// source positions are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.qname == other.qname
            && self.attributes == other.attributes
            && self.text == other.text
            && self.children == other.children
    }
}

/// XML Document representation
#[derive(Debug, Clone)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
}

impl Document {
    /// Wrap a root element
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes with default limits
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from bytes
    pub fn parse_with_limits(xml: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let lines = LineIndex::new(xml);
        let mut reader = Reader::from_reader(xml);

        let mut root: Option<Element> = None;
        let mut stack: Vec<(Element, NamespaceContext)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                Error::Xml(format!(
                    "Error parsing XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;
            match event {
                Event::Start(e) => {
                    let start = reader.buffer_position().saturating_sub(e.len() + 2);
                    limits.check_xml_depth(stack.len() + 1)?;
                    let (mut element, context) = Self::parse_element(&e, &stack, limits)?;
                    element.position = Some(lines.position(start));
                    stack.push((element, context));
                }
                Event::Empty(e) => {
                    let start = reader.buffer_position().saturating_sub(e.len() + 3);
                    limits.check_xml_depth(stack.len() + 1)?;
                    let (mut element, _) = Self::parse_element(&e, &stack, limits)?;
                    element.position = Some(lines.position(start));
                    Self::attach(&mut stack, &mut root, element, limits)?;
                }
                Event::End(_) => {
                    if let Some((mut element, _)) = stack.pop() {
                        element.settle_text();
                        Self::attach(&mut stack, &mut root, element, limits)?;
                    }
                }
                Event::Text(e) => {
                    if let Some((current, _)) = stack.last_mut() {
                        current.append_text(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some((current, _)) = stack.last_mut() {
                        let text = String::from_utf8(e.into_inner().into_owned())
                            .map_err(|e| Error::Xml(format!("Invalid CDATA: {}", e)))?;
                        current.append_text(&text);
                    }
                }
                Event::Eof => break,
                _ => {} // Ignore comments, processing instructions, declarations
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Xml("Unexpected end of document".to_string()));
        }
        root.map(Document::new)
            .ok_or_else(|| Error::Xml("Document has no root element".to_string()))
    }

    /// Parse an XML document with `roxmltree`
    pub fn parse_with_roxmltree(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        Ok(Self::from_roxmltree(&doc))
    }

    /// Convert an already parsed `roxmltree` document
    pub fn from_roxmltree(doc: &roxmltree::Document<'_>) -> Self {
        Self::new(Element::from_roxmltree(doc, doc.root_element()))
    }

    fn parse_element(
        start: &BytesStart,
        stack: &[(Element, NamespaceContext)],
        limits: &Limits,
    ) -> Result<(Element, NamespaceContext)> {
        let mut context = stack
            .last()
            .map(|(_, ctx)| ctx.clone())
            .unwrap_or_default();

        let mut raw_attributes = Vec::new();
        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
                .to_string();
            let attr_value = attr.unescape_value()?.to_string();

            if attr_name == "xmlns" {
                context.set_default_namespace(attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                context.add_prefix(prefix, attr_value);
            } else {
                raw_attributes.push((attr_name, attr_value));
            }
        }
        limits.check_attributes(raw_attributes.len())?;

        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();
        let mut element = Element::new(context.resolve(&name)?);
        for (name, value) in raw_attributes {
            element
                .attributes
                .insert(context.resolve_attribute(&name)?, value);
        }

        Ok((element, context))
    }

    fn attach(
        stack: &mut [(Element, NamespaceContext)],
        root: &mut Option<Element>,
        element: Element,
        limits: &Limits,
    ) -> Result<()> {
        if let Some((parent, _)) = stack.last_mut() {
            limits.check_children(parent.children.len() + 1)?;
            parent.add_child(element);
        } else if root.is_some() {
            return Err(Error::Xml("Multiple root elements".to_string()));
        } else {
            *root = Some(element);
        }
        Ok(())
    }

    /// Serialize to compact XML text
    pub fn to_xml(&self) -> Result<String> {
        self.write(Writer::new(Vec::new()))
    }

    /// Serialize to indented XML text
    pub fn to_xml_pretty(&self, indent: usize) -> Result<String> {
        self.write(Writer::new_with_indent(Vec::new(), b' ', indent))
    }

    fn write(&self, mut writer: Writer<Vec<u8>>) -> Result<String> {
        let prefixes = PrefixMap::for_tree(&self.root);
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        write_element(&mut writer, &self.root, &prefixes, true)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::Xml(format!("Writer produced invalid UTF-8: {}", e)))
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Xml(format!("Failed to write XML: {}", e)))
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    prefixes: &PrefixMap,
    is_root: bool,
) -> Result<()> {
    let name = prefixes.qualified(&element.qname);
    let mut start = BytesStart::new(name.clone());

    if is_root {
        for (key, namespace) in prefixes.declarations() {
            start.push_attribute((key.as_str(), namespace));
        }
    }
    for (qname, value) in &element.attributes {
        start.push_attribute((prefixes.qualified(qname).as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    if let Some(text) = &element.text {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child, prefixes, false)?;
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

/// Byte offsets of line starts, for turning reader offsets into positions
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(input: &[u8]) -> Self {
        let mut starts = vec![0];
        starts.extend(
            input
                .iter()
                .enumerate()
                .filter(|(_, b)| **b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    fn position(&self, offset: usize) -> Position {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = offset - self.starts[line];
        Position::new(line as u32 + 1, column as u32 + 1)
    }
}

/// Prefixes assigned to the namespaces used in a tree being written
struct PrefixMap {
    prefixes: IndexMap<String, String>,
}

impl PrefixMap {
    fn for_tree(root: &Element) -> Self {
        let mut map = Self {
            prefixes: IndexMap::new(),
        };
        map.collect(root);
        map
    }

    fn collect(&mut self, element: &Element) {
        if let Some(ns) = element.namespace() {
            self.declare(ns);
        }
        for qname in element.attributes.keys() {
            if let Some(ns) = qname.namespace() {
                self.declare(ns);
            }
        }
        for child in &element.children {
            self.collect(child);
        }
    }

    fn declare(&mut self, namespace: &str) {
        if self.prefixes.contains_key(namespace) {
            return;
        }
        let prefix = match well_known_prefix(namespace) {
            Some(prefix) => prefix.to_string(),
            None => format!("ns{}", self.prefixes.len()),
        };
        self.prefixes.insert(namespace.to_string(), prefix);
    }

    fn qualified(&self, qname: &QName) -> String {
        match qname.namespace().and_then(|ns| self.prefixes.get(ns)) {
            Some(prefix) => format!("{}:{}", prefix, qname.local_name),
            None => qname.local_name.clone(),
        }
    }

    /// `xmlns:prefix` declarations for the root element
    fn declarations(&self) -> impl Iterator<Item = (String, &str)> {
        self.prefixes
            .iter()
            .filter(|(ns, _)| ns.as_str() != XML_NAMESPACE)
            .map(|(ns, prefix)| (format!("xmlns:{}", prefix), ns.as_str()))
    }
}
