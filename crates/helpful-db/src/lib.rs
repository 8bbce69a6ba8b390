//! # helpful-db
//!
//! The persistence seam the views need: model metadata with verbose names
//! and relations, a dynamic [`Instance`] type, the async [`ObjectStore`]
//! trait with an in-memory implementation, and the [`NestedObjects`]
//! collector that walks the dependent-object graph before a delete.

pub mod collector;
pub mod memory;
pub mod model;
pub mod store;
pub mod value;

pub use collector::{NestedObject, NestedObjects};
pub use memory::MemoryStore;
pub use model::{FieldDef, FieldType, Instance, ModelMeta, OnDelete};
pub use store::ObjectStore;
pub use value::Value;
