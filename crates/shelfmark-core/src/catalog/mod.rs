//! Declarative schema metadata: entity shapes and the relationship graph.

pub mod entity;
pub mod relation;

pub use entity::{EntityDef, EntityKind, FieldDef, FieldType, FieldValue, Record};
pub use relation::{relations_referencing, Cardinality, DeleteBehavior, RelationDef, RELATIONS};
