use std::collections::BTreeMap;

use serde::Serialize;

use crate::filter::{filter, Predicate};
use crate::table::{Error, Table};

/// Ordered grouping columns; the last one supplies the leaf values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    columns: Vec<String>,
}

impl KeyPath {
    pub fn new<I, S>(columns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(Error::EmptyKeyPath);
        }

        return Ok(Self { columns });
    }

    fn resolve(&self, table: &Table) -> Result<Vec<usize>, Error> {
        self.columns
            .iter()
            .map(|column| table.require_column(column))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NestedMap {
    Value(String),
    List(Vec<String>),
    Map(BTreeMap<String, NestedMap>),
}

impl Default for NestedMap {
    fn default() -> Self {
        NestedMap::Map(BTreeMap::new())
    }
}

impl NestedMap {
    pub fn is_empty(&self) -> bool {
        matches!(self, NestedMap::Map(children) if children.is_empty())
    }

    /// Number of map levels above the leaves. A bare leaf has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            NestedMap::Map(children) => {
                1 + children.values().map(NestedMap::depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            NestedMap::Value(_) => 1,
            NestedMap::List(values) => values.len(),
            NestedMap::Map(children) => children.values().map(NestedMap::leaf_count).sum(),
        }
    }

    pub fn get(&self, path: &[&str]) -> Option<&NestedMap> {
        let mut node = self;
        for key in path {
            node = match node {
                NestedMap::Map(children) => children.get(*key)?,
                _ => return None,
            };
        }

        Some(node)
    }
}

/// What happens when two rows share a full key sequence in single-value mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Later rows replace earlier ones.
    #[default]
    Overwrite,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafMode {
    Single(CollisionPolicy),
    Multi,
}

impl Default for LeafMode {
    fn default() -> Self {
        LeafMode::Single(CollisionPolicy::default())
    }
}

/// Single-value leaves, last write wins.
pub fn build_map(table: &Table, key_path: &KeyPath) -> Result<NestedMap, Error> {
    build(table, key_path, LeafMode::Single(CollisionPolicy::Overwrite))
}

/// List leaves holding every matching value in row order.
pub fn build_multimap(table: &Table, key_path: &KeyPath) -> Result<NestedMap, Error> {
    build(table, key_path, LeafMode::Multi)
}

pub fn build(table: &Table, key_path: &KeyPath, mode: LeafMode) -> Result<NestedMap, Error> {
    let indexes = key_path.resolve(table)?;
    return group(table, &indexes, mode);
}

/// Filters `table` and groups what is left along `key_path`.
///
/// Key path columns are checked before the predicate runs.
pub fn lookup(
    table: &Table,
    predicate: &Predicate,
    key_path: &KeyPath,
    mode: LeafMode,
) -> Result<NestedMap, Error> {
    let indexes = key_path.resolve(table)?;
    let rows = filter(table, predicate)?;
    return group(&rows, &indexes, mode);
}

fn group(table: &Table, indexes: &[usize], mode: LeafMode) -> Result<NestedMap, Error> {
    let (leaf_idx, level_idxs) = match indexes.split_last() {
        Some(split) => split,
        None => return Err(Error::EmptyKeyPath),
    };

    let mut root = NestedMap::default();
    for row in table.rows() {
        let keys: Vec<&str> = level_idxs.iter().map(|idx| row[*idx].as_str()).collect();
        insert(&mut root, &keys, &row[*leaf_idx], mode)?;
    }

    return Ok(root);
}

fn insert(root: &mut NestedMap, keys: &[&str], leaf: &str, mode: LeafMode) -> Result<(), Error> {
    let mut node = root;
    for key in keys {
        node = match node {
            NestedMap::Map(children) => children.entry(key.to_string()).or_default(),
            _ => {
                return Err(Error::Unknown(format!(
                    "leaf found above key `{}` in {}",
                    key,
                    keys.join(" / ")
                )))
            }
        };
    }

    match (mode, &mut *node) {
        (LeafMode::Multi, NestedMap::List(values)) => values.push(leaf.to_string()),
        (LeafMode::Single(policy), NestedMap::Value(previous)) => {
            let path = keys.join(" / ");
            if policy == CollisionPolicy::Reject {
                return Err(Error::KeyCollision(format!("[{}]", path)));
            }
            log::warn!(
                "key sequence [{}] repeated, replacing `{}` with `{}`",
                path,
                previous,
                leaf
            );
            *previous = leaf.to_string();
        }
        (LeafMode::Multi, fresh) if fresh.is_empty() => {
            *fresh = NestedMap::List(vec![leaf.to_string()]);
        }
        (LeafMode::Single(_), fresh) if fresh.is_empty() => {
            *fresh = NestedMap::Value(leaf.to_string());
        }
        _ => {
            return Err(Error::Unknown(format!(
                "mixed leaf kinds at [{}]",
                keys.join(" / ")
            )))
        }
    }

    return Ok(());
}
