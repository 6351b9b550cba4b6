//! Entities and their builder phase
//!
//! An [`EntityBuilder`] is the only mutable form of an entity. Every write
//! is checked against the kind's layout (declared type, occurrence bounds,
//! choice exclusivity). [`EntityBuilder::finalize`] checks that every
//! required field is present and freezes the builder into an [`Entity`],
//! whose repeated fields are exposed as read-only slices.
//!
//! Kinds with open content also carry the undeclared child elements they
//! were given, as raw element trees in document order.

use crate::documents::Element;
use crate::error::{Error, Result};
use crate::schema::{FieldDef, FieldType, KindLayout};
use crate::values::{Reference, Value};
use rust_decimal::Decimal;
use std::sync::Arc;

/// An entity under construction
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    layout: Arc<KindLayout>,
    slots: Vec<Vec<Value>>,
    open_content: Vec<Element>,
}

impl EntityBuilder {
    /// Create a builder with every slot empty
    pub(crate) fn new(layout: Arc<KindLayout>) -> Self {
        let slots = vec![Vec::new(); layout.fields().len()];
        Self {
            layout,
            slots,
            open_content: Vec::new(),
        }
    }

    /// Kind name
    pub fn kind(&self) -> &str {
        self.layout.name()
    }

    /// Layout of the kind
    pub fn layout(&self) -> &Arc<KindLayout> {
        &self.layout
    }

    /// First value of a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values(field).first()
    }

    /// All values of a field (empty for unknown fields)
    pub fn values(&self, field: &str) -> &[Value] {
        match self.layout.field_index(field) {
            Some(index) => &self.slots[index],
            None => &[],
        }
    }

    /// Set a single-valued field, replacing its previous value
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.layout.require_field(field)?;
        let value = value.into();
        let def = self.layout.field(index);
        if def.occurs.is_multiple() {
            return Err(Error::cardinality(
                self.kind(),
                field,
                "repeated field; use add",
            ));
        }
        self.check_type(def, &value)?;
        self.check_choice(index)?;
        self.slots[index] = vec![value];
        Ok(())
    }

    /// Append a value to a field
    pub fn add(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.layout.require_field(field)?;
        let value = value.into();
        let def = self.layout.field(index);
        self.check_type(def, &value)?;
        if def.occurs.is_over(self.slots[index].len()) {
            return Err(Error::cardinality(
                self.kind(),
                field,
                format!(
                    "already holds {} value(s), bounds {}",
                    self.slots[index].len(),
                    def.occurs
                ),
            ));
        }
        self.check_choice(index)?;
        self.slots[index].push(value);
        Ok(())
    }

    /// Set or add depending on the field's cardinality, builder style
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let index = self.layout.require_field(field)?;
        if self.layout.field(index).occurs.is_multiple() {
            self.add(field, value)?;
        } else {
            self.set(field, value)?;
        }
        Ok(self)
    }

    /// Remove the value at `position` of a field
    pub fn remove(&mut self, field: &str, position: usize) -> Result<Value> {
        let index = self.layout.require_field(field)?;
        if position >= self.slots[index].len() {
            return Err(Error::cardinality(
                self.kind(),
                field,
                format!("no value at position {}", position),
            ));
        }
        Ok(self.slots[index].remove(position))
    }

    /// Remove every value of a field
    pub fn clear(&mut self, field: &str) -> Result<()> {
        let index = self.layout.require_field(field)?;
        self.slots[index].clear();
        Ok(())
    }

    /// Append an undeclared child element to an open kind
    pub fn add_open_content(&mut self, element: Element) -> Result<()> {
        if !self.layout.is_open() || self.layout.element_field_named(&element.qname).is_some() {
            return Err(Error::unexpected(self.kind(), &element.qname));
        }
        self.open_content.push(element);
        Ok(())
    }

    /// Drop every open content element
    pub fn clear_open_content(&mut self) {
        self.open_content.clear();
    }

    /// Check required fields and freeze
    pub fn finalize(self) -> Result<Entity> {
        let kind = self.layout.name();
        for (index, field) in self.layout.fields().iter().enumerate() {
            let count = self.slots[index].len();
            let unchosen = self
                .layout
                .choice_of(index)
                .is_some_and(|group| !self.is_populated(group.branch_of(index)));
            if count == 0 && (unchosen || field.occurs.is_emptiable()) {
                continue;
            }
            if count == 0 {
                return Err(Error::missing(kind, &field.name));
            }
            if field.occurs.is_missing(count) {
                return Err(Error::cardinality(
                    kind,
                    &field.name,
                    format!("{} value(s) given, {} required", count, field.occurs),
                ));
            }
        }
        for group in self.layout.choices() {
            let populated = group
                .branches
                .iter()
                .filter(|branch| self.is_populated(branch))
                .count();
            if populated == 0 && group.required {
                return Err(Error::missing(kind, &group.label));
            }
            if populated > 1 {
                return Err(Error::cardinality(
                    kind,
                    &group.label,
                    "more than one choice alternative populated",
                ));
            }
        }
        Ok(Entity {
            layout: self.layout,
            slots: self.slots,
            open_content: self.open_content,
        })
    }

    fn check_type(&self, def: &FieldDef, value: &Value) -> Result<()> {
        let matches = match (&def.field_type, value) {
            (FieldType::Primitive(kind), v) => v.primitive_kind() == Some(*kind),
            (FieldType::Inline(kind), Value::Entity(e)) => e.kind() == kind,
            // the wrapped object is written under its own global element
            (FieldType::Property(kind), Value::Entity(e)) => {
                e.layout().derives_from(kind) && e.layout().element().is_some()
            }
            (FieldType::Reference, Value::Reference(_)) => true,
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(Error::type_mismatch(
                self.kind(),
                &def.name,
                def.field_type.to_string(),
                value.type_name(),
            ))
        }
    }

    fn is_populated(&self, fields: &[usize]) -> bool {
        fields.iter().any(|&m| !self.slots[m].is_empty())
    }

    /// Reject a write when another alternative of the field's choice is populated
    fn check_choice(&self, index: usize) -> Result<()> {
        if let Some(group) = self.layout.choice_of(index) {
            let branch = group.branch_of(index);
            if let Some(&other) = group
                .members
                .iter()
                .find(|&m| !branch.contains(m) && !self.slots[*m].is_empty())
            {
                return Err(Error::cardinality(
                    self.kind(),
                    &self.layout.field(index).name,
                    format!(
                        "choice {} already holds {}",
                        group.id,
                        self.layout.field(other).name
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// A finalized, read-only entity
#[derive(Debug, Clone)]
pub struct Entity {
    layout: Arc<KindLayout>,
    slots: Vec<Vec<Value>>,
    open_content: Vec<Element>,
}

impl Entity {
    /// Kind name
    pub fn kind(&self) -> &str {
        self.layout.name()
    }

    /// Layout of the kind
    pub fn layout(&self) -> &Arc<KindLayout> {
        &self.layout
    }

    /// First value of a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values(field).first()
    }

    /// All values of a field, in stored order (empty for unknown fields)
    pub fn values(&self, field: &str) -> &[Value] {
        match self.layout.field_index(field) {
            Some(index) => &self.slots[index],
            None => &[],
        }
    }

    /// Values of the field at an index of the layout
    pub fn slot(&self, index: usize) -> &[Value] {
        &self.slots[index]
    }

    /// Every field with its values, in propOrder
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDef, &[Value])> {
        self.layout
            .fields()
            .iter()
            .zip(self.slots.iter().map(|s| s.as_slice()))
    }

    /// String value of a field
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Decimal value of a field
    pub fn get_decimal(&self, field: &str) -> Option<Decimal> {
        self.get(field).and_then(Value::as_decimal)
    }

    /// Nested entity held by a field
    pub fn get_entity(&self, field: &str) -> Option<&Entity> {
        self.get(field).and_then(Value::as_entity)
    }

    /// Reference held by a field
    pub fn get_reference(&self, field: &str) -> Option<&Reference> {
        self.get(field).and_then(Value::as_reference)
    }

    /// Undeclared child elements kept by an open kind
    pub fn open_content(&self) -> &[Element] {
        &self.open_content
    }

    /// The `gml:id` of this entity, if the kind declares one and it is set
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// Reopen as an independent builder; the entity itself is unchanged
    pub fn to_builder(&self) -> EntityBuilder {
        EntityBuilder {
            layout: Arc::clone(&self.layout),
            slots: self.slots.clone(),
            open_content: self.open_content.clone(),
        }
    }
}
