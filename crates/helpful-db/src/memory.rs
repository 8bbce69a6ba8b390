//! An in-memory [`ObjectStore`].
//!
//! Rows live in per-model `BTreeMap`s keyed by primary key behind a
//! `tokio::sync::RwLock`. Used by tests and demos; it enforces nothing beyond
//! primary-key existence.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use helpful_core::{HelpfulError, HelpfulResult};

use crate::model::{Instance, ModelMeta};
use crate::store::ObjectStore;
use crate::value::Value;

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, Instance>,
    next_id: i64,
}

/// An in-memory object store.
///
/// # Examples
///
/// ```
/// use helpful_db::{Instance, MemoryStore, ModelMeta, ObjectStore};
/// use std::sync::LazyLock;
///
/// static TAG: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta::new("blog", "tag"));
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new(vec![&*TAG]);
/// let mut tag = Instance::new(&TAG);
/// store.save(&mut tag).await.unwrap();
/// assert_eq!(tag.pk(), Some(1));
/// assert_eq!(store.count(&TAG).await, 1);
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    models: Vec<&'static ModelMeta>,
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    /// Creates a store with the given models registered.
    pub fn new(models: Vec<&'static ModelMeta>) -> Self {
        Self {
            models,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of rows stored for a model.
    pub async fn count(&self, meta: &ModelMeta) -> usize {
        self.tables
            .read()
            .await
            .get(&meta.label())
            .map_or(0, |table| table.rows.len())
    }

    /// Returns `true` if the row exists.
    pub async fn exists(&self, meta: &ModelMeta, pk: i64) -> bool {
        self.tables
            .read()
            .await
            .get(&meta.label())
            .is_some_and(|table| table.rows.contains_key(&pk))
    }

    fn ensure_registered(&self, meta: &ModelMeta) -> HelpfulResult<()> {
        if self.models.iter().any(|m| m.label() == meta.label()) {
            Ok(())
        } else {
            Err(HelpfulError::ImproperlyConfigured(format!(
                "Model {} is not registered with this store",
                meta.label()
            )))
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn models(&self) -> Vec<&'static ModelMeta> {
        self.models.clone()
    }

    async fn get(&self, meta: &'static ModelMeta, pk: i64) -> HelpfulResult<Instance> {
        self.ensure_registered(meta)?;
        self.tables
            .read()
            .await
            .get(&meta.label())
            .and_then(|table| table.rows.get(&pk))
            .cloned()
            .ok_or_else(|| {
                HelpfulError::DoesNotExist(format!(
                    "{} matching query does not exist.",
                    meta.verbose_name
                ))
            })
    }

    async fn all(&self, meta: &'static ModelMeta) -> HelpfulResult<Vec<Instance>> {
        self.ensure_registered(meta)?;
        Ok(self
            .tables
            .read()
            .await
            .get(&meta.label())
            .map(|table| table.rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn filter_eq(
        &self,
        meta: &'static ModelMeta,
        field: &str,
        value: &Value,
    ) -> HelpfulResult<Vec<Instance>> {
        Ok(self
            .all(meta)
            .await?
            .into_iter()
            .filter(|instance| instance.get(field) == value)
            .collect())
    }

    async fn save(&self, instance: &mut Instance) -> HelpfulResult<()> {
        let meta = instance.meta();
        self.ensure_registered(meta)?;
        let mut tables = self.tables.write().await;
        let table = tables.entry(meta.label()).or_default();
        let pk = if let Some(pk) = instance.pk() {
            table.next_id = table.next_id.max(pk);
            pk
        } else {
            table.next_id += 1;
            table.next_id
        };
        instance.set_pk(pk);
        table.rows.insert(pk, instance.clone());
        tracing::debug!(model = %meta.label(), pk, "saved instance");
        Ok(())
    }

    async fn delete(&self, meta: &'static ModelMeta, pk: i64) -> HelpfulResult<()> {
        self.ensure_registered(meta)?;
        let mut tables = self.tables.write().await;
        let removed = tables
            .get_mut(&meta.label())
            .and_then(|table| table.rows.remove(&pk));
        if removed.is_none() {
            return Err(HelpfulError::DoesNotExist(format!(
                "{} matching query does not exist.",
                meta.verbose_name
            )));
        }
        tracing::debug!(model = %meta.label(), pk, "deleted instance");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, FieldType, OnDelete};
    use std::sync::LazyLock;

    static AUTHOR: LazyLock<ModelMeta> = LazyLock::new(|| {
        ModelMeta::new("library", "author")
            .field(FieldDef::new("name", FieldType::CharField { max_length: 50 }))
    });

    static BOOK: LazyLock<ModelMeta> = LazyLock::new(|| {
        ModelMeta::new("library", "book").field(FieldDef::new(
            "author",
            FieldType::ForeignKey {
                to: "library.author",
                on_delete: OnDelete::Cascade,
            },
        ))
    });

    static STRAY: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta::new("other", "stray"));

    fn store() -> MemoryStore {
        MemoryStore::new(vec![&*AUTHOR, &*BOOK])
    }

    #[tokio::test]
    async fn test_save_assigns_incrementing_pks() {
        let store = store();
        let mut a = Instance::new(&AUTHOR);
        let mut b = Instance::new(&AUTHOR);
        store.save(&mut a).await.unwrap();
        store.save(&mut b).await.unwrap();
        assert_eq!(a.pk(), Some(1));
        assert_eq!(b.pk(), Some(2));
        assert_eq!(store.count(&AUTHOR).await, 2);
    }

    #[tokio::test]
    async fn test_save_updates_existing() {
        let store = store();
        let mut a = Instance::new(&AUTHOR);
        a.set("name", "Old");
        store.save(&mut a).await.unwrap();
        a.set("name", "New");
        store.save(&mut a).await.unwrap();
        assert_eq!(store.count(&AUTHOR).await, 1);
        let fetched = store.get(&AUTHOR, 1).await.unwrap();
        assert_eq!(fetched.get("name"), &Value::from("New"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let err = store().get(&AUTHOR, 9).await.unwrap_err();
        assert!(matches!(err, HelpfulError::DoesNotExist(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_unregistered_model() {
        let err = store().all(&STRAY).await.unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn test_filter_eq_and_delete() {
        let store = store();
        let mut author = Instance::new(&AUTHOR);
        store.save(&mut author).await.unwrap();
        let mut book = Instance::new(&BOOK);
        book.set("author", 1_i64);
        store.save(&mut book).await.unwrap();

        let books = store.filter_eq(&BOOK, "author", &Value::Int(1)).await.unwrap();
        assert_eq!(books.len(), 1);

        store.delete(&BOOK, 1).await.unwrap();
        assert!(!store.exists(&BOOK, 1).await);
        assert!(store.delete(&BOOK, 1).await.is_err());
    }

    #[test]
    fn test_related_fields() {
        let store = store();
        let related = store.related_fields(&AUTHOR);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].0.model_name, "book");
        assert_eq!(related[0].1.name, "author");
        assert!(store.related_fields(&BOOK).is_empty());
    }
}
