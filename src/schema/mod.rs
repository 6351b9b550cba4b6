//! Schema tables
//!
//! A schema is the closed set of kinds an entity can have. Each kind names
//! an optional parent kind, the global element that carries it (for
//! concrete kinds), whether its content model is open, and its own fields.
//! Building a schema flattens every kind into a [`KindLayout`]: the parent's
//! fields first, then the kind's own, which is the propOrder used by
//! construction, encoding, decoding, equality and the debug formatter.
//!
//! Schemas are built once and shared read-only behind an [`Arc`].

mod description;
mod fields;
pub mod gml;
mod occurs;

pub use description::{
    FieldDescription, FormDescription, KindDescription, MaxOccurs, SchemaDescription,
    TypeDescription,
};
pub use fields::{Container, FieldDef, FieldForm, FieldType};
pub use occurs::Occurs;

use crate::error::{Error, Result};
use crate::model::EntityBuilder;
use crate::names::validate_ncname;
use crate::namespaces::QName;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Definition of one kind as supplied by a schema provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDef {
    /// Kind name (schema type name)
    pub name: String,
    /// Kind extended by this one
    pub parent: Option<String>,
    /// Global element carrying this kind
    pub element: Option<QName>,
    /// Abstract kinds cannot be instantiated
    pub is_abstract: bool,
    /// Open content models ignore unknown child elements
    pub open: bool,
    /// Fields declared by this kind (excluding inherited ones)
    pub fields: Vec<FieldDef>,
}

impl KindDef {
    /// Create a concrete, closed kind with no parent and no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            element: None,
            is_abstract: false,
            open: false,
            fields: Vec::new(),
        }
    }

    /// Extend a parent kind
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Register the global element carrying this kind
    pub fn element(mut self, qname: QName) -> Self {
        self.element = Some(qname);
        self
    }

    /// Mark the kind abstract
    pub fn abstract_kind(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark the content model open
    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    /// Append a field
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// A set of mutually exclusive alternatives
///
/// Most alternatives are a single field. A branch groups adjacent fields
/// that are populated together, such as `lowerCorner` and `upperCorner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceGroup {
    /// Group identifier
    pub id: String,
    /// Indices of the member fields in the kind's field table
    pub members: Vec<usize>,
    /// Members partitioned into alternatives, in propOrder
    pub branches: Vec<Vec<usize>>,
    /// Whether one alternative must be populated
    pub required: bool,
    /// Alternatives joined with `|`, branch fields with `+`, used in error reports
    pub label: String,
}

impl ChoiceGroup {
    /// The alternative a member field belongs to
    pub fn branch_of(&self, field: usize) -> &[usize] {
        self.branches
            .iter()
            .find(|branch| branch.contains(&field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A kind flattened with its ancestors' fields
#[derive(Debug, Clone)]
pub struct KindLayout {
    name: String,
    parent: Option<String>,
    ancestry: Vec<String>,
    element: Option<QName>,
    is_abstract: bool,
    open: bool,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
    choices: Vec<ChoiceGroup>,
    field_choice: Vec<Option<usize>>,
    element_fields: Vec<usize>,
    attribute_fields: Vec<usize>,
    text_field: Option<usize>,
}

impl KindLayout {
    /// Kind name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent kind name
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// This kind followed by its ancestors, nearest first
    pub fn ancestry(&self) -> &[String] {
        &self.ancestry
    }

    /// Whether this kind is `kind` or extends it, directly or indirectly
    pub fn derives_from(&self, kind: &str) -> bool {
        self.ancestry.iter().any(|k| k == kind)
    }

    /// Global element carrying this kind
    pub fn element(&self) -> Option<&QName> {
        self.element.as_ref()
    }

    /// Whether the kind is abstract
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether unknown child elements are ignored
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Effective fields in propOrder
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Field at an index of the effective table
    pub fn field(&self, index: usize) -> &FieldDef {
        &self.fields[index]
    }

    /// Index of a field by name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Index of a field by name, or `UnknownField`
    pub fn require_field(&self, name: &str) -> Result<usize> {
        self.field_index(name)
            .ok_or_else(|| Error::unknown_field(&self.name, name))
    }

    /// Choice groups of this kind
    pub fn choices(&self) -> &[ChoiceGroup] {
        &self.choices
    }

    /// Choice group the field at `index` belongs to
    pub fn choice_of(&self, index: usize) -> Option<&ChoiceGroup> {
        self.field_choice[index].map(|c| &self.choices[c])
    }

    /// Indices of element-form fields in propOrder
    pub fn element_fields(&self) -> &[usize] {
        &self.element_fields
    }

    /// Element-form field carried by an element name
    pub fn element_field_named(&self, qname: &QName) -> Option<usize> {
        self.element_fields
            .iter()
            .copied()
            .find(|&i| self.fields[i].xml_name == *qname)
    }

    /// Indices of attribute fields
    pub fn attribute_fields(&self) -> &[usize] {
        &self.attribute_fields
    }

    /// Index of the text-content field
    pub fn text_field(&self) -> Option<usize> {
        self.text_field
    }
}

/// A built, read-only schema
#[derive(Debug)]
pub struct Schema {
    layouts: IndexMap<String, Arc<KindLayout>>,
    elements: HashMap<QName, String>,
}

impl Schema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Layout of a kind
    pub fn layout(&self, kind: &str) -> Result<&Arc<KindLayout>> {
        self.layouts
            .get(kind)
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))
    }

    /// Names of all kinds, in declaration order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(|k| k.as_str())
    }

    /// Number of kinds
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Whether the schema has no kinds
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Kind carried by a global element
    pub fn resolve_element(&self, qname: &QName) -> Option<&Arc<KindLayout>> {
        self.elements.get(qname).and_then(|k| self.layouts.get(k))
    }

    /// Whether `kind` is `base` or derives from it
    pub fn is_derived_from(&self, kind: &str, base: &str) -> bool {
        self.layouts
            .get(kind)
            .map_or(false, |layout| layout.derives_from(base))
    }

    /// Concrete element-bearing kinds that may substitute for `base`
    pub fn substitutes(&self, base: &str) -> Vec<&Arc<KindLayout>> {
        self.layouts
            .values()
            .filter(|l| !l.is_abstract() && l.element().is_some() && l.derives_from(base))
            .collect()
    }

    /// Start constructing an entity: every slot empty, nothing validated yet
    pub fn construct(&self, kind: &str) -> Result<EntityBuilder> {
        let layout = self.layout(kind)?;
        if layout.is_abstract() {
            return Err(Error::AbstractKind(kind.to_string()));
        }
        Ok(EntityBuilder::new(Arc::clone(layout)))
    }
}

/// Collects kind definitions and validates them into a [`Schema`]
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    kinds: Vec<KindDef>,
}

impl SchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kind definition
    pub fn kind(mut self, kind: KindDef) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Add a kind definition in place
    pub fn add_kind(&mut self, kind: KindDef) {
        self.kinds.push(kind);
    }

    /// Validate the definitions and flatten every kind
    pub fn build(self) -> Result<Arc<Schema>> {
        let mut defs: IndexMap<String, KindDef> = IndexMap::new();
        for kind in self.kinds {
            validate_ncname(&kind.name)?;
            if defs.contains_key(&kind.name) {
                return Err(Error::Schema(format!("kind {} is defined twice", kind.name)));
            }
            defs.insert(kind.name.clone(), kind);
        }

        let mut layouts: HashMap<String, Arc<KindLayout>> = HashMap::new();
        for name in defs.keys() {
            let mut visiting = Vec::new();
            flatten(name, &defs, &mut layouts, &mut visiting)?;
        }

        let mut ordered = IndexMap::new();
        let mut elements = HashMap::new();
        for name in defs.keys() {
            let layout = Arc::clone(&layouts[name]);
            check_field_types(&layout, &layouts)?;
            if let Some(qname) = layout.element() {
                if let Some(previous) = elements.insert(qname.clone(), name.clone()) {
                    return Err(Error::Schema(format!(
                        "element {} is registered by both {} and {}",
                        qname, previous, name
                    )));
                }
            }
            ordered.insert(name.clone(), layout);
        }

        Ok(Arc::new(Schema {
            layouts: ordered,
            elements,
        }))
    }
}

fn flatten(
    name: &str,
    defs: &IndexMap<String, KindDef>,
    layouts: &mut HashMap<String, Arc<KindLayout>>,
    visiting: &mut Vec<String>,
) -> Result<Arc<KindLayout>> {
    if let Some(layout) = layouts.get(name) {
        return Ok(Arc::clone(layout));
    }
    if visiting.iter().any(|v| v == name) {
        return Err(Error::Schema(format!(
            "kind {} extends itself through {}",
            name,
            visiting.join(" -> ")
        )));
    }
    let def = defs
        .get(name)
        .ok_or_else(|| Error::UnknownKind(name.to_string()))?;

    visiting.push(name.to_string());
    let (mut fields, mut ancestry) = match &def.parent {
        Some(parent) => {
            if !defs.contains_key(parent) {
                return Err(Error::Schema(format!(
                    "kind {} extends unknown kind {}",
                    name, parent
                )));
            }
            let parent_layout = flatten(parent, defs, layouts, visiting)?;
            (
                parent_layout.fields.clone(),
                parent_layout.ancestry.clone(),
            )
        }
        None => (Vec::new(), Vec::new()),
    };
    visiting.pop();

    ancestry.insert(0, name.to_string());
    fields.extend(def.fields.iter().cloned());

    let layout = Arc::new(build_layout(def, fields, ancestry)?);
    layouts.insert(name.to_string(), Arc::clone(&layout));
    Ok(layout)
}

fn build_layout(def: &KindDef, fields: Vec<FieldDef>, ancestry: Vec<String>) -> Result<KindLayout> {
    let kind = &def.name;
    if let Some(qname) = &def.element {
        validate_ncname(&qname.local_name)?;
    }

    let mut index = HashMap::new();
    let mut xml_names = HashSet::new();
    let mut element_fields = Vec::new();
    let mut attribute_fields = Vec::new();
    let mut text_field = None;

    for (i, field) in fields.iter().enumerate() {
        validate_ncname(&field.name)?;
        validate_ncname(&field.xml_name.local_name)?;
        if index.insert(field.name.clone(), i).is_some() {
            return Err(Error::Schema(format!(
                "field {}.{} is declared twice",
                kind, field.name
            )));
        }
        if field.occurs.max == Some(0) || field.occurs.max.map_or(false, |m| m < field.occurs.min) {
            return Err(Error::Schema(format!(
                "field {}.{} has impossible bounds {}",
                kind, field.name, field.occurs
            )));
        }
        match field.form {
            FieldForm::Element => {
                if !xml_names.insert(field.xml_name.clone()) {
                    return Err(Error::Schema(format!(
                        "element {} appears twice in {}",
                        field.xml_name, kind
                    )));
                }
                element_fields.push(i);
            }
            FieldForm::Attribute | FieldForm::Text => {
                if !field.occurs.is_single() || !matches!(field.field_type, FieldType::Primitive(_)) {
                    return Err(Error::Schema(format!(
                        "attribute or text field {}.{} must hold at most one primitive",
                        kind, field.name
                    )));
                }
                if field.choice.is_some() {
                    return Err(Error::Schema(format!(
                        "attribute or text field {}.{} cannot be in a choice",
                        kind, field.name
                    )));
                }
                if field.form == FieldForm::Text {
                    if text_field.is_some() {
                        return Err(Error::Schema(format!("{} has two text fields", kind)));
                    }
                    text_field = Some(i);
                } else {
                    attribute_fields.push(i);
                }
            }
        }
    }

    let (choices, field_choice) = build_choices(kind, &fields, &element_fields)?;

    Ok(KindLayout {
        name: kind.clone(),
        parent: def.parent.clone(),
        ancestry,
        element: def.element.clone(),
        is_abstract: def.is_abstract,
        open: def.open,
        fields,
        index,
        choices,
        field_choice,
        element_fields,
        attribute_fields,
        text_field,
    })
}

/// Group choice members; members must be adjacent in propOrder so the
/// decoder can treat the group as a single sequence slot, and so must the
/// fields of one branch.
fn build_choices(
    kind: &str,
    fields: &[FieldDef],
    element_fields: &[usize],
) -> Result<(Vec<ChoiceGroup>, Vec<Option<usize>>)> {
    let mut choices: Vec<ChoiceGroup> = Vec::new();
    let mut field_choice = vec![None; fields.len()];
    let mut previous: Option<&str> = None;
    let mut previous_branch: Option<&str> = None;
    let mut seen_branches: Vec<&str> = Vec::new();

    for &i in element_fields {
        let field = &fields[i];
        let Some(id) = field.choice.as_deref() else {
            previous = None;
            continue;
        };
        validate_ncname(id)?;
        if previous != Some(id) {
            if choices.iter().any(|c| c.id == id) {
                return Err(Error::Schema(format!(
                    "members of choice {} in {} are not adjacent",
                    id, kind
                )));
            }
            choices.push(ChoiceGroup {
                id: id.to_string(),
                members: Vec::new(),
                branches: Vec::new(),
                required: true,
                label: String::new(),
            });
            previous_branch = None;
            seen_branches.clear();
        }
        let group_index = choices.len() - 1;
        let group = &mut choices[group_index];
        group.members.push(i);
        match field.branch.as_deref() {
            Some(branch) if previous_branch == Some(branch) => {
                if let Some(last) = group.branches.last_mut() {
                    last.push(i);
                }
            }
            Some(branch) => {
                if seen_branches.contains(&branch) {
                    return Err(Error::Schema(format!(
                        "fields of branch {} of choice {} in {} are not adjacent",
                        branch, id, kind
                    )));
                }
                seen_branches.push(branch);
                group.branches.push(vec![i]);
            }
            None => group.branches.push(vec![i]),
        }
        field_choice[i] = Some(group_index);
        previous = Some(id);
        previous_branch = field.branch.as_deref();
    }

    for group in &mut choices {
        group.required = group
            .branches
            .iter()
            .all(|branch| branch.iter().any(|&m| !fields[m].occurs.is_emptiable()));
        group.label = group
            .branches
            .iter()
            .map(|branch| {
                branch
                    .iter()
                    .map(|&m| fields[m].name.as_str())
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect::<Vec<_>>()
            .join("|");
    }

    Ok((choices, field_choice))
}

fn check_field_types(layout: &KindLayout, layouts: &HashMap<String, Arc<KindLayout>>) -> Result<()> {
    for field in layout.fields() {
        match &field.field_type {
            FieldType::Inline(kind) => {
                let target = layouts.get(kind).ok_or_else(|| {
                    Error::Schema(format!(
                        "field {}.{} refers to unknown kind {}",
                        layout.name(),
                        field.name,
                        kind
                    ))
                })?;
                if target.is_abstract() {
                    return Err(Error::Schema(format!(
                        "inline field {}.{} cannot hold abstract kind {}",
                        layout.name(),
                        field.name,
                        kind
                    )));
                }
            }
            FieldType::Property(kind) => {
                if !layouts.contains_key(kind) {
                    return Err(Error::Schema(format!(
                        "field {}.{} refers to unknown kind {}",
                        layout.name(),
                        field.name,
                        kind
                    )));
                }
            }
            FieldType::Primitive(_) | FieldType::Reference => {}
        }
    }
    Ok(())
}
