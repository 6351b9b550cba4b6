//! Element tree to entity
//!
//! Child elements are matched against the kind's element fields in
//! propOrder, strictly left to right. Each field, or each choice group taken
//! as a whole, is one particle of the sequence; once the cursor has moved
//! past a particle, a later element cannot fill it.

use super::{DecodeOptions, ReferenceMode};
use crate::documents::Element;
use crate::error::{Error, Position, Result};
use crate::model::{Entity, EntityBuilder};
use crate::namespaces::{QName, GML_NAMESPACE};
use crate::schema::{ChoiceGroup, FieldDef, FieldType, KindLayout, Schema};
use crate::values::{Reference, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// Where the cursor stands within a kind's content model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No child consumed yet
    Start,
    /// Required particles remain ahead of or at the cursor
    ReadingRequiredPrefix,
    /// Only optional or repeating particles remain
    ReadingOptionalsAndRepeats,
    /// Every particle closed
    Complete,
    /// Decoding failed
    Error,
}

/// One slot of the content sequence
#[derive(Debug, Clone, Copy)]
enum Particle<'l> {
    Field(usize),
    Choice(&'l ChoiceGroup),
}

impl<'l> Particle<'l> {
    fn members(&self) -> &[usize] {
        match self {
            Particle::Field(index) => std::slice::from_ref(index),
            Particle::Choice(group) => &group.members,
        }
    }

    fn is_required(&self, layout: &KindLayout) -> bool {
        match self {
            Particle::Field(index) => !layout.field(*index).occurs.is_emptiable(),
            Particle::Choice(group) => group.required,
        }
    }
}

fn particles(layout: &KindLayout) -> Vec<Particle<'_>> {
    let mut particles: Vec<Particle<'_>> = Vec::new();
    for &index in layout.element_fields() {
        match layout.choice_of(index) {
            Some(group) => {
                let same_group = matches!(particles.last(), Some(Particle::Choice(last)) if last.id == group.id);
                if !same_group {
                    particles.push(Particle::Choice(group));
                }
            }
            None => particles.push(Particle::Field(index)),
        }
    }
    particles
}

/// Sequence cursor over one entity's children
struct Cursor<'l> {
    layout: &'l KindLayout,
    particles: Vec<Particle<'l>>,
    last_required: Option<usize>,
    position: usize,
    count: usize,
    chosen: Option<usize>,
    state: State,
}

impl<'l> Cursor<'l> {
    fn new(layout: &'l KindLayout) -> Self {
        let particles = particles(layout);
        let last_required = particles.iter().rposition(|p| p.is_required(layout));
        Self {
            layout,
            particles,
            last_required,
            position: 0,
            count: 0,
            chosen: None,
            state: State::Start,
        }
    }

    fn transition(&mut self, state: State) {
        if self.state != state {
            trace!(kind = self.layout.name(), from = ?self.state, to = ?state, "cursor state");
            self.state = state;
        }
    }

    fn reading_state(&self) -> State {
        match self.last_required {
            Some(last) if self.position < last || (self.position == last && self.count == 0) => {
                State::ReadingRequiredPrefix
            }
            _ => State::ReadingOptionalsAndRepeats,
        }
    }

    fn field_matching(&self, particle: &Particle<'_>, qname: &QName) -> Option<usize> {
        particle
            .members()
            .iter()
            .copied()
            .find(|&m| self.layout.field(m).xml_name == *qname)
    }

    /// Field that `qname` fills: at the cursor or at a later particle
    ///
    /// Moves the cursor forward as needed, closing the particles it passes.
    /// `Ok(None)` means no remaining particle accepts the element.
    fn accept(&mut self, qname: &QName, at: Option<Position>) -> Result<Option<usize>> {
        let result = self.try_accept(qname, at);
        match &result {
            Err(_) => self.transition(State::Error),
            Ok(_) => self.transition(self.reading_state()),
        }
        result
    }

    fn try_accept(&mut self, qname: &QName, at: Option<Position>) -> Result<Option<usize>> {
        let kind = self.layout.name();
        let target = (self.position..self.particles.len())
            .find_map(|p| self.field_matching(&self.particles[p], qname).map(|f| (p, f)));
        let Some((target, field)) = target else {
            return Ok(None);
        };
        while self.position < target {
            self.close(at)?;
        }

        let def = self.layout.field(field);
        match self.chosen {
            None => self.require_branch_fields(field, None, Some(field), at)?,
            Some(chosen) if chosen == field => {
                if def.occurs.is_over(self.count) {
                    return Err(Error::cardinality(
                        kind,
                        &def.name,
                        format!("more than {} occurrence(s)", self.count),
                    )
                    .at(at));
                }
            }
            Some(chosen) if self.follows_in_branch(chosen, field) => {
                self.check_minimum(chosen, at)?;
                self.require_branch_fields(field, Some(chosen), Some(field), at)?;
                self.count = 0;
            }
            Some(chosen) => {
                return Err(Error::cardinality(
                    kind,
                    &def.name,
                    format!("choice already holds {}", self.layout.field(chosen).name),
                )
                .at(at));
            }
        }

        self.chosen = Some(field);
        self.count += 1;
        Ok(Some(field))
    }

    /// Whether `field` comes after `chosen` in the same choice branch
    fn follows_in_branch(&self, chosen: usize, field: usize) -> bool {
        chosen < field
            && self
                .layout
                .choice_of(field)
                .is_some_and(|group| group.branch_of(field).contains(&chosen))
    }

    /// Report the first required field of `field`'s branch strictly between
    /// `after` and `before` (open ends when `None`)
    fn require_branch_fields(
        &self,
        field: usize,
        after: Option<usize>,
        before: Option<usize>,
        at: Option<Position>,
    ) -> Result<()> {
        let Some(group) = self.layout.choice_of(field) else {
            return Ok(());
        };
        let skipped = group.branch_of(field).iter().copied().find(|&m| {
            after.map_or(true, |a| m > a)
                && before.map_or(true, |b| m < b)
                && !self.layout.field(m).occurs.is_emptiable()
        });
        match skipped {
            Some(m) => Err(Error::missing(self.layout.name(), &self.layout.field(m).name).at(at)),
            None => Ok(()),
        }
    }

    fn check_minimum(&self, field: usize, at: Option<Position>) -> Result<()> {
        let def = self.layout.field(field);
        if def.occurs.is_missing(self.count) {
            return Err(Error::cardinality(
                self.layout.name(),
                &def.name,
                format!("{} occurrence(s) found, {} required", self.count, def.occurs),
            )
            .at(at));
        }
        Ok(())
    }

    /// Close the particle at the cursor and move to the next one
    fn close(&mut self, at: Option<Position>) -> Result<()> {
        let particle = self.particles[self.position];
        match self.chosen {
            None if particle.is_required(self.layout) => {
                let name = match particle {
                    Particle::Field(index) => self.layout.field(index).name.as_str(),
                    Particle::Choice(group) => group.label.as_str(),
                };
                return Err(Error::missing(self.layout.name(), name).at(at));
            }
            Some(field) => {
                self.check_minimum(field, at)?;
                self.require_branch_fields(field, Some(field), None, at)?;
            }
            None => {}
        }
        self.position += 1;
        self.count = 0;
        self.chosen = None;
        Ok(())
    }

    /// Close every remaining particle
    fn finish(&mut self, at: Option<Position>) -> Result<()> {
        while self.position < self.particles.len() {
            if let Err(err) = self.close(at) {
                self.transition(State::Error);
                return Err(err);
            }
        }
        self.transition(State::Complete);
        Ok(())
    }
}

/// Decoder for one decode call
pub(crate) struct Decoder<'a> {
    schema: &'a Schema,
    options: &'a DecodeOptions,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(schema: &'a Schema, options: &'a DecodeOptions) -> Self {
        Self { schema, options }
    }

    pub(crate) fn decode_root(&self, element: &Element, hint: Option<&str>) -> Result<Entity> {
        let layout = self.resolve_root(element, hint)?;
        debug!(kind = layout.name(), element = %element.qname, "decoding document root");
        self.decode_entity(element, &layout, 0)
    }

    fn resolve_root(&self, element: &Element, hint: Option<&str>) -> Result<Arc<KindLayout>> {
        let hinted = hint.map(|h| self.schema.layout(h)).transpose()?;
        match (self.schema.resolve_element(&element.qname), hinted) {
            (Some(layout), Some(expected)) if !layout.derives_from(expected.name()) => {
                Err(Error::type_mismatch(
                    expected.name(),
                    element.local_name(),
                    format!("entity derived from {}", expected.name()),
                    layout.name(),
                )
                .at(element.position))
            }
            (Some(layout), _) => Ok(Arc::clone(layout)),
            (None, Some(expected)) if !expected.is_abstract() && expected.element().is_none() => {
                Ok(Arc::clone(expected))
            }
            (None, Some(expected)) => {
                Err(Error::unexpected(expected.name(), &element.qname).at(element.position))
            }
            (None, None) => Err(Error::UnknownKind(element.qname.to_string()).at(element.position)),
        }
    }

    fn decode_entity(&self, element: &Element, layout: &Arc<KindLayout>, depth: usize) -> Result<Entity> {
        let limits = &self.options.limits;
        limits.check_xml_depth(depth)?;
        limits.check_attributes(element.attributes.len())?;
        limits.check_children(element.children.len())?;

        let mut builder = EntityBuilder::new(Arc::clone(layout));
        self.decode_attributes(element, layout, &mut builder)?;
        self.decode_text(element, layout, &mut builder)?;

        let mut cursor = Cursor::new(layout);
        for child in &element.children {
            let Some(index) = cursor.accept(&child.qname, child.position)? else {
                if layout.is_open() && layout.element_field_named(&child.qname).is_none() {
                    trace!(kind = layout.name(), element = %child.qname, "keeping open content");
                    builder.add_open_content(child.clone())?;
                    continue;
                }
                return Err(Error::unexpected(layout.name(), &child.qname).at(child.position));
            };
            let field = layout.field(index);
            let value = self.decode_value(layout, field, child, depth)?;
            builder
                .add(&field.name, value)
                .map_err(|e| e.at(child.position))?;
        }
        cursor.finish(element.position)?;

        builder.finalize().map_err(|e| e.at(element.position))
    }

    fn decode_attributes(
        &self,
        element: &Element,
        layout: &KindLayout,
        builder: &mut EntityBuilder,
    ) -> Result<()> {
        for &index in layout.attribute_fields() {
            let field = layout.field(index);
            if let Some(text) = element.get_attribute_qname(&field.xml_name) {
                let value = parse_primitive(layout, field, text).map_err(|e| e.at(element.position))?;
                builder.set(&field.name, value)?;
            }
        }
        if layout.is_open() {
            return Ok(());
        }
        for qname in element.attributes.keys() {
            let declared = layout
                .attribute_fields()
                .iter()
                .any(|&i| layout.field(i).xml_name == *qname);
            if !declared && qname.namespace() == Some(GML_NAMESPACE) {
                return Err(Error::unexpected(layout.name(), format!("@{}", qname)).at(element.position));
            }
        }
        Ok(())
    }

    fn decode_text(&self, element: &Element, layout: &KindLayout, builder: &mut EntityBuilder) -> Result<()> {
        let Some(index) = layout.text_field() else {
            return match element.text.as_deref() {
                Some(text) if !layout.is_open() && !text.trim().is_empty() => {
                    Err(Error::unexpected(layout.name(), "#text").at(element.position))
                }
                _ => Ok(()),
            };
        };
        let field = layout.field(index);
        let has_empty_form = match field.field_type {
            FieldType::Primitive(kind) => kind.has_empty_form(),
            _ => false,
        };
        // `<a></a>` carries "" where the type has an empty form; `<a/>` only
        // when the field is required
        let text = match element.text.as_deref() {
            Some("") if !has_empty_form && field.occurs.is_emptiable() => return Ok(()),
            Some(text) => text,
            None if has_empty_form && !field.occurs.is_emptiable() => "",
            None => return Ok(()),
        };
        let value = parse_primitive(layout, field, text).map_err(|e| e.at(element.position))?;
        builder.set(&field.name, value)
    }

    fn decode_value(
        &self,
        layout: &KindLayout,
        field: &FieldDef,
        child: &Element,
        depth: usize,
    ) -> Result<Value> {
        match &field.field_type {
            FieldType::Primitive(_) => {
                if let Some(nested) = child.children.first() {
                    return Err(Error::unexpected(layout.name(), &nested.qname).at(nested.position));
                }
                let text = child.text.as_deref().unwrap_or("");
                parse_primitive(layout, field, text).map_err(|e| e.at(child.position))
            }
            FieldType::Inline(kind) => {
                let target = self.schema.layout(kind)?;
                Ok(Value::Entity(self.decode_entity(child, target, depth + 1)?))
            }
            FieldType::Property(kind) => {
                let object = match child.children.as_slice() {
                    [object] => object,
                    [] => return Err(Error::missing(layout.name(), &field.name).at(child.position)),
                    [_, extra, ..] => {
                        return Err(Error::unexpected(layout.name(), &extra.qname).at(extra.position))
                    }
                };
                let target = self
                    .schema
                    .resolve_element(&object.qname)
                    .ok_or_else(|| Error::unexpected(layout.name(), &object.qname).at(object.position))?;
                if !target.derives_from(kind) {
                    return Err(Error::type_mismatch(
                        layout.name(),
                        &field.name,
                        field.field_type.to_string(),
                        target.name(),
                    )
                    .at(object.position));
                }
                trace!(field = %field.name, kind = target.name(), "substitution group dispatch");
                Ok(Value::Entity(self.decode_entity(object, target, depth + 2)?))
            }
            FieldType::Reference => {
                let href = child
                    .get_attribute_qname(&QName::xlink("href"))
                    .ok_or_else(|| {
                        Error::missing(layout.name(), &format!("{}/@xlink:href", field.name))
                            .at(child.position)
                    })?;
                self.check_reference(layout, field, href)
                    .map_err(|e| e.at(child.position))?;
                Ok(Value::Reference(Reference::new(href)))
            }
        }
    }

    fn check_reference(&self, layout: &KindLayout, field: &FieldDef, href: &str) -> Result<()> {
        match &self.options.reference_mode {
            ReferenceMode::Deferred => {
                trace!(kind = layout.name(), field = %field.name, href, "deferring reference");
                Ok(())
            }
            ReferenceMode::Strict(catalog) => match catalog.get(href) {
                Some(_) => Ok(()),
                None => Err(Error::UnresolvedReference {
                    kind: layout.name().to_string(),
                    field: field.name.clone(),
                    target: href.to_string(),
                }),
            },
        }
    }
}

fn parse_primitive(layout: &KindLayout, field: &FieldDef, text: &str) -> Result<Value> {
    let FieldType::Primitive(kind) = field.field_type else {
        return Err(Error::Schema(format!(
            "field {}.{} is not primitive",
            layout.name(),
            field.name
        )));
    };
    kind.parse(text).map_err(|reason| Error::MalformedPrimitive {
        kind: layout.name().to_string(),
        field: field.name.clone(),
        expected: kind.name().to_string(),
        value: text.to_string(),
        reason,
    })
}
