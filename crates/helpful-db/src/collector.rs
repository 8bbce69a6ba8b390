//! Dependent-object collection for deletes.
//!
//! [`NestedObjects`] walks the reverse foreign keys reachable from a set of
//! root instances and sorts every referencing row by its `on_delete` rule:
//! cascaded rows are nested under their parent, protected rows block the
//! delete, set-null rows get their key cleared. The nested tree is what a
//! delete confirmation page shows; [`NestedObjects::delete`] applies it.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use helpful_core::{HelpfulError, HelpfulResult};

use crate::model::{Instance, OnDelete};
use crate::store::ObjectStore;
use crate::value::Value;

type Key = (String, i64);

fn key_of(instance: &Instance) -> Option<Key> {
    instance.pk().map(|pk| (instance.meta().label(), pk))
}

/// One node of the nested dependent-object tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedObject {
    /// The formatted object.
    pub label: String,
    /// Objects deleted along with this one.
    pub children: Vec<NestedObject>,
}

/// Collects the objects affected by deleting a set of root instances.
///
/// # Examples
///
/// ```
/// use helpful_db::{FieldDef, FieldType, Instance, MemoryStore, ModelMeta, NestedObjects, ObjectStore, OnDelete};
/// use std::sync::LazyLock;
///
/// static SHELF: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta::new("library", "shelf"));
/// static BOOK: LazyLock<ModelMeta> = LazyLock::new(|| {
///     ModelMeta::new("library", "book").field(FieldDef::new(
///         "shelf",
///         FieldType::ForeignKey { to: "library.shelf", on_delete: OnDelete::Cascade },
///     ))
/// });
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new(vec![&*SHELF, &*BOOK]);
/// let mut shelf = Instance::new(&SHELF);
/// store.save(&mut shelf).await.unwrap();
/// let mut book = Instance::new(&BOOK);
/// book.set("shelf", 1_i64);
/// store.save(&mut book).await.unwrap();
///
/// let mut collector = NestedObjects::new(&store);
/// collector.collect(vec![shelf]).await.unwrap();
/// let nested = collector.nested(ToString::to_string);
/// assert_eq!(nested[0].children.len(), 1);
/// assert!(collector.protected().is_empty());
/// # }
/// ```
pub struct NestedObjects<'a> {
    store: &'a dyn ObjectStore,
    roots: Vec<Key>,
    instances: HashMap<Key, Instance>,
    edges: HashMap<Key, Vec<Key>>,
    protected: Vec<Instance>,
    protected_keys: HashSet<Key>,
    field_updates: Vec<(Instance, &'static str)>,
}

impl std::fmt::Debug for NestedObjects<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedObjects")
            .field("roots", &self.roots)
            .field("collected", &self.instances.len())
            .field("protected", &self.protected.len())
            .finish_non_exhaustive()
    }
}

impl<'a> NestedObjects<'a> {
    /// Creates an empty collector over a store.
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            roots: Vec::new(),
            instances: HashMap::new(),
            edges: HashMap::new(),
            protected: Vec::new(),
            protected_keys: HashSet::new(),
            field_updates: Vec::new(),
        }
    }

    /// Walks the dependent graph of `objs`.
    ///
    /// Unsaved instances are ignored. Each row is visited at most once, so
    /// reference cycles terminate.
    pub async fn collect(&mut self, objs: Vec<Instance>) -> HelpfulResult<()> {
        let mut queue = VecDeque::new();
        for obj in objs {
            let Some(key) = key_of(&obj) else {
                continue;
            };
            if self.instances.contains_key(&key) {
                continue;
            }
            self.roots.push(key.clone());
            self.instances.insert(key.clone(), obj);
            queue.push_back(key);
        }

        while let Some(parent_key) = queue.pop_front() {
            let Some(parent) = self.instances.get(&parent_key) else {
                continue;
            };
            let parent_meta = parent.meta();
            let parent_pk = Value::Int(parent_key.1);

            for (child_meta, fk) in self.store.related_fields(parent_meta) {
                let Some((_, on_delete)) = fk.foreign_key() else {
                    continue;
                };
                if on_delete == OnDelete::DoNothing {
                    continue;
                }
                let rows = self.store.filter_eq(child_meta, fk.name, &parent_pk).await?;
                for row in rows {
                    let Some(child_key) = key_of(&row) else {
                        continue;
                    };
                    match on_delete {
                        OnDelete::Cascade => {
                            if self.instances.contains_key(&child_key) {
                                continue;
                            }
                            self.edges
                                .entry(parent_key.clone())
                                .or_default()
                                .push(child_key.clone());
                            self.instances.insert(child_key.clone(), row);
                            queue.push_back(child_key);
                        }
                        OnDelete::Protect => {
                            if self.protected_keys.insert(child_key) {
                                self.protected.push(row);
                            }
                        }
                        OnDelete::SetNull => self.field_updates.push((row, fk.name)),
                        OnDelete::DoNothing => {}
                    }
                }
            }
        }

        tracing::debug!(
            roots = self.roots.len(),
            collected = self.instances.len(),
            protected = self.protected.len(),
            "collected dependent objects"
        );
        Ok(())
    }

    /// Returns the collected objects as a tree rooted at the collected roots,
    /// each node labelled by `format`.
    pub fn nested<F>(&self, format: F) -> Vec<NestedObject>
    where
        F: Fn(&Instance) -> String,
    {
        self.roots
            .iter()
            .filter_map(|key| self.nested_node(key, &format))
            .collect()
    }

    fn nested_node<F>(&self, key: &Key, format: &F) -> Option<NestedObject>
    where
        F: Fn(&Instance) -> String,
    {
        let instance = self.instances.get(key)?;
        let children = self
            .edges
            .get(key)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|child| self.nested_node(child, format))
                    .collect()
            })
            .unwrap_or_default();
        Some(NestedObject {
            label: format(instance),
            children,
        })
    }

    /// Returns the rows whose `PROTECT` foreign key blocks the delete.
    pub fn protected(&self) -> &[Instance] {
        &self.protected
    }

    /// Returns `true` if nothing blocks the delete.
    pub fn can_delete(&self) -> bool {
        self.protected.is_empty()
    }

    /// Returns the collected instances with dependents before the rows they
    /// reference.
    pub fn deletion_order(&self) -> Vec<&Instance> {
        let mut order = Vec::with_capacity(self.instances.len());
        for root in &self.roots {
            self.push_post_order(root, &mut order);
        }
        order
    }

    fn push_post_order<'s>(&'s self, key: &Key, order: &mut Vec<&'s Instance>) {
        if let Some(children) = self.edges.get(key) {
            for child in children {
                self.push_post_order(child, order);
            }
        }
        if let Some(instance) = self.instances.get(key) {
            order.push(instance);
        }
    }

    /// Clears set-null foreign keys and deletes every collected row.
    ///
    /// Refuses with [`HelpfulError::PermissionDenied`] before touching the
    /// store when any protected row was found. Returns the number of deleted
    /// rows.
    pub async fn delete(&self) -> HelpfulResult<usize> {
        if !self.can_delete() {
            let names: Vec<String> = self
                .protected
                .iter()
                .map(|obj| format!("{} \"{obj}\"", obj.meta().verbose_name))
                .collect();
            return Err(HelpfulError::PermissionDenied(format!(
                "Cannot delete because of protected related objects: {}",
                names.join(", ")
            )));
        }

        for (row, field) in &self.field_updates {
            let Some(key) = key_of(row) else {
                continue;
            };
            if self.instances.contains_key(&key) {
                continue;
            }
            let mut row = self.store.get(row.meta(), key.1).await?;
            row.set(field, Value::Null);
            self.store.save(&mut row).await?;
        }

        let order = self.deletion_order();
        for instance in &order {
            if let Some(pk) = instance.pk() {
                self.store.delete(instance.meta(), pk).await?;
            }
        }
        tracing::info!(deleted = order.len(), "deleted collected objects");
        Ok(order.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::{FieldDef, FieldType, ModelMeta};
    use std::sync::LazyLock;

    static NODE: LazyLock<ModelMeta> = LazyLock::new(|| {
        ModelMeta::new("graph", "node").field(
            FieldDef::new(
                "parent",
                FieldType::ForeignKey {
                    to: "graph.node",
                    on_delete: OnDelete::Cascade,
                },
            )
            .nullable(),
        )
    });

    async fn node(store: &MemoryStore, parent: Option<i64>) -> Instance {
        let mut n = Instance::new(&NODE);
        n.set("parent", parent);
        store.save(&mut n).await.unwrap();
        n
    }

    #[tokio::test]
    async fn test_self_referential_cascade() {
        let store = MemoryStore::new(vec![&*NODE]);
        let root = node(&store, None).await;
        node(&store, Some(1)).await;
        node(&store, Some(2)).await;

        let mut collector = NestedObjects::new(&store);
        collector.collect(vec![root]).await.unwrap();
        let nested = collector.nested(|obj| obj.pk().unwrap_or_default().to_string());
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].label, "1");
        assert_eq!(nested[0].children[0].label, "2");
        assert_eq!(nested[0].children[0].children[0].label, "3");

        let order: Vec<_> = collector
            .deletion_order()
            .iter()
            .filter_map(|obj| obj.pk())
            .collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let store = MemoryStore::new(vec![&*NODE]);
        let mut a = node(&store, None).await;
        node(&store, Some(1)).await;
        a.set("parent", 2_i64);
        store.save(&mut a).await.unwrap();

        let mut collector = NestedObjects::new(&store);
        collector.collect(vec![a]).await.unwrap();
        assert_eq!(collector.deletion_order().len(), 2);
        assert_eq!(collector.delete().await.unwrap(), 2);
        assert_eq!(store.count(&NODE).await, 0);
    }

    #[tokio::test]
    async fn test_unsaved_root_is_ignored() {
        let store = MemoryStore::new(vec![&*NODE]);
        let mut collector = NestedObjects::new(&store);
        collector.collect(vec![Instance::new(&NODE)]).await.unwrap();
        assert!(collector.nested(ToString::to_string).is_empty());
        assert_eq!(collector.delete().await.unwrap(), 0);
    }
}
