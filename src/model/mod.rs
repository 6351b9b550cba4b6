//! Entity model
//!
//! Entities are instances of schema kinds. They are built through an
//! [`EntityBuilder`], compared structurally with [`structural_eq`], hashed
//! with the stable [`structural_hash`], and rendered for debugging with
//! [`describe`].

mod describe;
mod entity;
mod equality;

pub use describe::describe;
pub use entity::{Entity, EntityBuilder};
pub use equality::{
    structural_eq, structural_hash, structural_hash_with, value_eq, ComparisonMode,
};
