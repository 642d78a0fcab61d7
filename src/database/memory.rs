use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{generate_push_key, is_valid_key, segments, DocumentStore, StoreError};

/// In-process DocumentStore over a single JSON tree.
///
/// Follows Realtime Database write semantics: writing `null` removes the node,
/// removing the last child of a node removes the node as well, and an update
/// with any invalid key writes nothing.
///
/// One gap: empty objects written inside a record (`"avaliacoes": {}`) are kept
/// and read back as part of the record, while the Realtime Database drops them.
/// Reading the empty node directly still returns `None`.
pub struct MemoryStore {
    root: RwLock<Value>,
    operations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_data(Value::Null)
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            root: RwLock::new(strip_nulls(data)),
            operations: AtomicUsize::new(0),
        }
    }

    /// Copy of the whole tree
    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }

    /// Number of store calls served so far
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.record_operation();
        let parts: Vec<&str> = segments(path).collect();
        let root = self.root.read().await;

        Ok(lookup(&root, &parts)
            .filter(|v| !is_empty(v))
            .cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.record_operation();
        let parts: Vec<&str> = segments(path).collect();
        let value = strip_nulls(value);
        let mut root = self.root.write().await;

        if value.is_null() {
            remove(&mut root, &parts);
        } else {
            insert(&mut root, &parts, value);
        }
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.record_operation();
        let parts: Vec<&str> = segments(path).collect();

        // Every key is checked before anything is written
        let mut writes = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let child: Vec<String> = segments(&key).map(str::to_string).collect();
            if child.is_empty() || !child.iter().all(|s| is_valid_key(s)) {
                return Err(StoreError::InvalidKey(key));
            }
            writes.push((child, strip_nulls(value)));
        }

        let mut root = self.root.write().await;
        for (child, value) in writes {
            let mut child_path = parts.clone();
            child_path.extend(child.iter().map(String::as_str));

            if value.is_null() {
                remove(&mut root, &child_path);
            } else {
                insert(&mut root, &child_path, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.record_operation();
        let parts: Vec<&str> = segments(path).collect();
        let mut root = self.root.write().await;
        remove(&mut root, &parts);
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        self.record_operation();
        let key = generate_push_key();
        let mut parts: Vec<&str> = segments(path).collect();
        parts.push(&key);

        let value = strip_nulls(value);
        let mut root = self.root.write().await;
        if !value.is_null() {
            insert(&mut root, &parts, value);
        }
        Ok(key)
    }
}

fn lookup<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
    match path.split_first() {
        None => Some(node),
        Some((first, rest)) => node.get(*first).and_then(|child| lookup(child, rest)),
    }
}

fn insert(node: &mut Value, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(first.to_string()).or_insert(Value::Null);
        insert(child, rest, value);
    }
}

fn remove(node: &mut Value, path: &[&str]) {
    let Some((first, rest)) = path.split_first() else {
        *node = Value::Null;
        return;
    };

    if let Value::Object(map) = node {
        if rest.is_empty() {
            map.remove(*first);
        } else if let Some(child) = map.get_mut(*first) {
            remove(child, rest);
            if is_empty(child) {
                map.remove(*first);
            }
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Null children are never stored
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}
