//! The object store seam.
//!
//! Views never talk to a database directly; they go through an
//! [`ObjectStore`]. The trait is async so a SQL-backed implementation can be
//! dropped in behind the same views as [`MemoryStore`](crate::MemoryStore).

use async_trait::async_trait;

use helpful_core::HelpfulResult;

use crate::model::{FieldDef, Instance, ModelMeta};
use crate::value::Value;

/// Persistence operations the generic views need.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns every model registered with this store.
    fn models(&self) -> Vec<&'static ModelMeta>;

    /// Fetches one instance by primary key.
    ///
    /// Returns [`HelpfulError::DoesNotExist`](helpful_core::HelpfulError::DoesNotExist)
    /// when there is no such row.
    async fn get(&self, meta: &'static ModelMeta, pk: i64) -> HelpfulResult<Instance>;

    /// Returns all instances of a model, ordered by primary key.
    async fn all(&self, meta: &'static ModelMeta) -> HelpfulResult<Vec<Instance>>;

    /// Returns the instances whose `field` equals `value`.
    async fn filter_eq(
        &self,
        meta: &'static ModelMeta,
        field: &str,
        value: &Value,
    ) -> HelpfulResult<Vec<Instance>>;

    /// Inserts or updates an instance, assigning a primary key on insert.
    async fn save(&self, instance: &mut Instance) -> HelpfulResult<()>;

    /// Deletes a single row. Does not cascade.
    async fn delete(&self, meta: &'static ModelMeta, pk: i64) -> HelpfulResult<()>;

    /// Returns the `(model, foreign key)` pairs that reference `meta`.
    fn related_fields(&self, meta: &ModelMeta) -> Vec<(&'static ModelMeta, &'static FieldDef)> {
        let target = meta.label();
        let target = target.as_str();
        self.models()
            .into_iter()
            .flat_map(move |model| {
                model
                    .foreign_keys()
                    .filter(move |field| field.foreign_key().is_some_and(|(to, _)| to == target))
                    .map(move |field| (model, field))
            })
            .collect()
    }
}
