//! Catalog of identified definitions
//!
//! Reference-valued fields (`usesAxis`, `definitionRef`, `unitsSystem`, ...)
//! hold an `xlink:href` rather than the definition itself. A [`Catalog`]
//! maps `gml:id` values to the entities they identify so those references can
//! be looked up, either while decoding (strict reference mode) or afterwards.
//!
//! # Href forms
//!
//! - `#id` - a fragment identifier in the same document
//! - `id` - a bare identifier
//! - `http://example.org/crs.xml#id` - a URL; its fragment is the identifier
//! - `urn:ogc:def:crs:EPSG::4326` - any other URI is looked up verbatim

use crate::error::{Error, Result};
use crate::model::Entity;
use crate::values::Value;
use indexmap::IndexMap;
use tracing::debug;
use url::Url;

/// Identified definitions, keyed by `gml:id`
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: IndexMap<String, Entity>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity under an identifier, returning any entity it replaces
    pub fn register(&mut self, id: impl Into<String>, entity: Entity) -> Option<Entity> {
        let id = id.into();
        let previous = self.entries.insert(id.clone(), entity);
        if previous.is_some() {
            debug!(id = %id, "catalog entry replaced");
        }
        previous
    }

    /// Register every entity that carries a `gml:id`
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut catalog = Self::new();
        for entity in entities {
            if let Some(id) = entity.id().map(str::to_string) {
                catalog.register(id, entity);
            }
        }
        catalog
    }

    /// Register every identified entity found in a dictionary tree,
    /// the dictionary itself included
    pub fn from_dictionary(dictionary: &Entity) -> Self {
        let mut catalog = Self::new();
        catalog.collect(dictionary);
        catalog
    }

    fn collect(&mut self, entity: &Entity) {
        if let Some(id) = entity.id() {
            self.register(id, entity.clone());
        }
        for (_, values) in entity.fields() {
            for value in values {
                if let Value::Entity(child) = value {
                    self.collect(child);
                }
            }
        }
    }

    /// Number of registered identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identifiers in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Look up an href
    pub fn get(&self, href: &str) -> Option<&Entity> {
        let href = href.trim();
        if let Some(entity) = self.entries.get(href) {
            return Some(entity);
        }
        lookup_key(href).and_then(|key| self.entries.get(&key))
    }

    /// Look up an href, failing with `UnresolvedReference`
    pub fn resolve(&self, href: &str) -> Result<&Entity> {
        self.get(href).ok_or_else(|| Error::UnresolvedReference {
            kind: "Catalog".to_string(),
            field: "href".to_string(),
            target: href.to_string(),
        })
    }

    /// Every reference in an entity tree that does not resolve
    pub fn unresolved(&self, entity: &Entity) -> Vec<Error> {
        let mut errors = Vec::new();
        self.check(entity, &mut errors);
        errors
    }

    fn check(&self, entity: &Entity, errors: &mut Vec<Error>) {
        for (field, values) in entity.fields() {
            for value in values {
                match value {
                    Value::Reference(reference) if self.get(reference.href()).is_none() => {
                        errors.push(Error::UnresolvedReference {
                            kind: entity.kind().to_string(),
                            field: field.name.clone(),
                            target: reference.href().to_string(),
                        });
                    }
                    Value::Entity(child) => self.check(child, errors),
                    _ => {}
                }
            }
        }
    }
}

/// Identifier named by an href, when it differs from the href itself
fn lookup_key(href: &str) -> Option<String> {
    if let Some(fragment) = href.strip_prefix('#') {
        return Some(fragment.to_string());
    }
    Url::parse(href)
        .ok()
        .and_then(|url| url.fragment().map(str::to_string))
}
