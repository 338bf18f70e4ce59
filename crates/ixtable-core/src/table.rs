//! The table engine: row storage plus the per-column index registry,
//! validation, filter pipeline, and backup/restore.

use std::collections::{BTreeMap, BTreeSet};

use crate::btree::BTree;
use crate::error::{bug, Error, Result};
use crate::prefix::PrefixIndex;
use crate::query::{Criterion, Dir, Limit, Op, SortBy};
use crate::schema::Schema;
use crate::suffix::SuffixTree;
use crate::variant::Variant;

/// Builder-style construction knobs. The only configuration surface,
/// since the engine holds no on-disk state: a tree order for testing
/// small-tree edge cases, and a name used purely for tracing output.
#[derive(Debug, Clone)]
pub struct TableConfig {
    order: usize,
    name: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { order: 5, name: None }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The four index structures a column may register, plus its null
/// buckets, allocated once at construction.
#[derive(Default)]
struct ColumnIndexes {
    unique: Option<BTree<u32>>,
    unique_null: Option<u32>,
    sortable: Option<BTree<BTreeSet<u32>>>,
    sortable_null: BTreeSet<u32>,
    partial: Option<SuffixTree>,
    prefixed: Option<PrefixIndex>,
}

type SerializeFn<R> = Box<dyn Fn(&R, bool) -> BTreeMap<String, Variant>>;
type DeserializeFn<R> = Box<dyn Fn(&BTreeMap<String, Variant>) -> R>;

/// Schema-described row storage with secondary indexes. `R` is the
/// caller's row type; the table never inspects it directly, only through
/// `serialize`/`deserialize`.
pub struct Table<R> {
    config: TableConfig,
    schema: Schema,
    rows: Vec<Option<R>>,
    indexes: BTreeMap<String, ColumnIndexes>,
    serialize: SerializeFn<R>,
    deserialize: DeserializeFn<R>,
}

fn fmt_bound(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn apply_limit(mut ids: Vec<u32>, limit: Option<Limit>) -> Vec<u32> {
    match limit {
        None => ids,
        Some(l) => {
            if l.offset >= ids.len() {
                Vec::new()
            } else {
                let end = (l.offset + l.size).min(ids.len());
                ids.drain(l.offset..end).collect()
            }
        }
    }
}

impl<R> Table<R> {
    pub fn new(
        config: TableConfig,
        schema: Schema,
        serialize: impl Fn(&R, bool) -> BTreeMap<String, Variant> + 'static,
        deserialize: impl Fn(&BTreeMap<String, Variant>) -> R + 'static,
    ) -> Self {
        let mut indexes = BTreeMap::new();
        for col in schema.indexed_columns() {
            let mut ci = ColumnIndexes::default();
            if col.unique {
                ci.unique = Some(BTree::new(config.order));
            }
            // `multiple` columns always get a non-unique index even when
            // `sortable` wasn't requested: array elements need an eq
            // lookup path, and the non-unique B+tree is the only index
            // shape (value -> set of ids) that supports it.
            if (col.sortable || col.multiple) && !col.unique {
                ci.sortable = Some(BTree::new(config.order));
            }
            if col.partial {
                ci.partial = Some(SuffixTree::new());
            }
            if col.prefixed {
                ci.prefixed = Some(PrefixIndex::new());
            }
            indexes.insert(col.name.clone(), ci);
        }
        Self {
            config,
            schema,
            rows: Vec::new(),
            indexes,
            serialize: Box::new(serialize),
            deserialize: Box::new(deserialize),
        }
    }

    fn table_name(&self) -> &str {
        self.config.name.as_deref().unwrap_or(self.schema.name.as_str())
    }

    /// The id the next `insert` must use: row-vector length + 1, derived
    /// rather than tracked separately so restored/tombstoned state can
    /// never cause an id to be reissued.
    pub fn next_id(&self) -> u32 {
        self.rows.len() as u32 + 1
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn value_of<'m>(map: &'m BTreeMap<String, Variant>, name: &str) -> &'m Variant {
        static NIL: Variant = Variant::Nil;
        map.get(name).unwrap_or(&NIL)
    }

    fn validate(&self, map: &BTreeMap<String, Variant>) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();
        for col in self.schema.indexed_columns() {
            match map.get(&col.name) {
                None => {
                    if !col.nullable {
                        errors.push(Error::ColumnCantBeNull(col.name.clone()).to_string());
                    }
                }
                Some(Variant::Nil) => {}
                Some(Variant::Array(items)) if col.multiple => {
                    if let Some(min) = col.min {
                        if (items.len() as f64) < min {
                            errors.push(Error::MustHaveAtLeastElements(col.name.clone(), min as usize).to_string());
                        }
                    }
                    if let Some(max) = col.max {
                        if (items.len() as f64) > max {
                            errors.push(Error::MustHaveAtMostElements(col.name.clone(), max as usize).to_string());
                        }
                    }
                }
                Some(v) => {
                    if let Some(len) = v.size() {
                        if let Some(min) = col.min {
                            if (len as f64) < min {
                                errors.push(Error::MustBeAtLeastLong(col.name.clone(), min as usize).to_string());
                            }
                        }
                        if let Some(max) = col.max {
                            if (len as f64) > max {
                                errors.push(Error::MustBeAtMostLong(col.name.clone(), max as usize).to_string());
                            }
                        }
                    } else if let Some(n) = v.as_f64() {
                        if let Some(min) = col.min {
                            if n < min {
                                errors.push(Error::MustBeAtLeast(col.name.clone(), fmt_bound(min)).to_string());
                            }
                        }
                        if let Some(max) = col.max {
                            if n > max {
                                errors.push(Error::MustBeAtMost(col.name.clone(), fmt_bound(max)).to_string());
                            }
                        }
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join(",")))
        }
    }

    fn unique_contains(&self, name: &str, value: &Variant) -> bool {
        self.indexes
            .get(name)
            .and_then(|ci| ci.unique.as_ref())
            .map(|t| t.contains_key(value))
            .unwrap_or(false)
    }

    fn can_insert(&self, map: &BTreeMap<String, Variant>) -> Result<()> {
        for col in self.schema.indexed_columns() {
            let value = Self::value_of(map, &col.name);
            if value.is_nil() {
                if !col.nullable {
                    return Err(Error::ValueCanNotBeNullAt(col.name.clone()));
                }
                if col.unique {
                    let occupied = self.indexes.get(&col.name).map(|ci| ci.unique_null.is_some()).unwrap_or(false);
                    if occupied {
                        return Err(Error::DuplicatedUniqueKey(col.name.clone()));
                    }
                }
            } else if col.multiple {
                if col.unique {
                    if let Some(items) = value.as_array() {
                        for item in items {
                            if self.unique_contains(&col.name, item) {
                                return Err(Error::DuplicatedUniqueKey(col.name.clone()));
                            }
                        }
                    }
                }
            } else if col.unique && self.unique_contains(&col.name, value) {
                return Err(Error::DuplicatedUniqueKey(col.name.clone()));
            }
        }
        Ok(())
    }

    /// Index one scalar key under whichever of `ci`'s four structures are
    /// present. Driven by index presence rather than the column's raw
    /// attribute flags, since `multiple` columns get a non-unique index
    /// for eq lookups even when `sortable` itself wasn't requested.
    fn index_scalar(ci: &mut ColumnIndexes, value: &Variant, id: u32) {
        if let Some(t) = ci.unique.as_mut() {
            t.put(value.clone(), id);
        }
        if let Some(t) = ci.sortable.as_mut() {
            match t.get_mut(value) {
                Some(set) => {
                    set.insert(id);
                }
                None => {
                    t.put(value.clone(), BTreeSet::from([id]));
                }
            }
        }
        if let (Some(tree), Some(text)) = (ci.partial.as_mut(), value.as_text()) {
            tree.put(text, id);
        }
        if let (Some(tree), Some(text)) = (ci.prefixed.as_mut(), value.as_text()) {
            tree.put(text, id);
        }
    }

    fn unindex_scalar(ci: &mut ColumnIndexes, value: &Variant, id: u32) {
        if let Some(t) = ci.unique.as_mut() {
            t.delete(value);
        }
        if let Some(t) = ci.sortable.as_mut() {
            let drop_key = t.get_mut(value).map(|set| {
                set.remove(&id);
                set.is_empty()
            });
            if drop_key == Some(true) {
                t.delete(value);
            }
        }
        if let (Some(tree), Some(text)) = (ci.partial.as_mut(), value.as_text()) {
            tree.delete(text, id);
        }
        if let (Some(tree), Some(text)) = (ci.prefixed.as_mut(), value.as_text()) {
            tree.delete(text, id);
        }
    }

    fn insert_into_indexes(&mut self, id: u32, map: &BTreeMap<String, Variant>) {
        let columns: Vec<_> = self.schema.indexed_columns().cloned().collect();
        for col in &columns {
            let value = Self::value_of(map, &col.name).clone();
            let ci = self.indexes.get_mut(&col.name).expect("every indexed column has a registry entry");
            if value.is_nil() {
                if ci.unique.is_some() {
                    ci.unique_null = Some(id);
                }
                if ci.sortable.is_some() {
                    ci.sortable_null.insert(id);
                }
                continue;
            }
            if col.multiple {
                if let Some(items) = value.as_array() {
                    for item in items {
                        Self::index_scalar(ci, item, id);
                    }
                }
            } else {
                Self::index_scalar(ci, &value, id);
            }
        }
    }

    fn remove_from_indexes(&mut self, id: u32, map: &BTreeMap<String, Variant>) {
        let columns: Vec<_> = self.schema.indexed_columns().cloned().collect();
        for col in &columns {
            let value = Self::value_of(map, &col.name).clone();
            let ci = self.indexes.get_mut(&col.name).expect("every indexed column has a registry entry");
            if value.is_nil() {
                if ci.unique_null == Some(id) {
                    ci.unique_null = None;
                }
                ci.sortable_null.remove(&id);
                continue;
            }
            if col.multiple {
                if let Some(items) = value.as_array() {
                    for item in items {
                        Self::unindex_scalar(ci, item, id);
                    }
                }
            } else {
                Self::unindex_scalar(ci, &value, id);
            }
        }
    }

    /// Insert `row` at `id`, which must equal [`Self::next_id`].
    pub fn insert(&mut self, id: u32, row: R) -> Result<u32> {
        let _span = tracing::debug_span!("table.insert", table = self.table_name(), id).entered();
        if id == 0 {
            tracing::warn!(table = self.table_name(), id, "rejected insert with invalid id");
            return Err(Error::InvalidId);
        }
        let map = (self.serialize)(&row, true);
        if let Err(e) = self.validate(&map) {
            tracing::warn!(table = self.table_name(), id, error = %e, "insert failed validation");
            return Err(e);
        }
        if let Err(e) = self.can_insert(&map) {
            tracing::warn!(table = self.table_name(), id, error = %e, "insert failed uniqueness check");
            return Err(e);
        }
        if id != self.next_id() {
            tracing::warn!(table = self.table_name(), id, "rejected insert with out-of-sequence id");
            return Err(Error::InvalidId);
        }
        self.insert_into_indexes(id, &map);
        self.rows.push(Some(row));
        Ok(id)
    }

    /// Delete-then-insert at the same id, atomic on validation failure:
    /// the prior row and its index entries are fully restored.
    pub fn replace(&mut self, id: u32, row: R) -> Result<()> {
        let _span = tracing::debug_span!("table.replace", table = self.table_name(), id).entered();
        if id == 0 {
            return Err(Error::InvalidId);
        }
        let idx = (id - 1) as usize;
        let old_row = match self.rows.get_mut(idx) {
            Some(slot @ Some(_)) => slot.take().expect("checked Some above"),
            _ => return Err(Error::PrimaryKeyNotFound(id)),
        };
        let old_map = (self.serialize)(&old_row, true);
        self.remove_from_indexes(id, &old_map);

        let new_map = (self.serialize)(&row, true);
        let validation = self.validate(&new_map).and_then(|_| self.can_insert(&new_map));
        match validation {
            Ok(()) => {
                self.insert_into_indexes(id, &new_map);
                self.rows[idx] = Some(row);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(table = self.table_name(), id, error = %e, "replace failed, restoring prior row");
                self.insert_into_indexes(id, &old_map);
                self.rows[idx] = Some(old_row);
                Err(e)
            }
        }
    }

    pub fn delete(&mut self, id: u32) -> Result<()> {
        let _span = tracing::debug_span!("table.delete", table = self.table_name(), id).entered();
        if id == 0 {
            return Err(Error::InvalidId);
        }
        let idx = (id - 1) as usize;
        let row = match self.rows.get_mut(idx) {
            Some(slot @ Some(_)) => slot.take().expect("checked Some above"),
            _ => return Err(Error::PrimaryKeyNotFound(id)),
        };
        let map = (self.serialize)(&row, true);
        self.remove_from_indexes(id, &map);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Result<Option<&R>> {
        if id == 0 {
            return Err(Error::InvalidId);
        }
        Ok(self.rows.get((id - 1) as usize).and_then(|slot| slot.as_ref()))
    }

    fn evaluate_one(&self, crit: &Criterion) -> Result<BTreeSet<u32>> {
        if crit.key == "_id" {
            return match crit.op {
                Op::Eq => match &crit.value {
                    Variant::Nat32(v) => {
                        let mut set = BTreeSet::new();
                        if *v != 0 {
                            if let Some(Some(_)) = self.rows.get((*v - 1) as usize) {
                                set.insert(*v);
                            }
                        }
                        Ok(set)
                    }
                    _ => Err(Error::IdMustBeNat32),
                },
                _ => Err(Error::UnsupportedOperatorForId),
            };
        }

        let col = self.schema.column(&crit.key).ok_or_else(|| Error::UnknownColumn(crit.key.clone()))?;
        let ci = self.indexes.get(&crit.key).ok_or_else(|| Error::NoIndexForColumn(crit.key.clone()))?;

        match crit.op {
            Op::Eq => {
                if crit.value.is_nil() {
                    if !col.nullable {
                        Err(Error::ValueCantBeNull(col.name.clone()))
                    } else if ci.unique.is_some() {
                        Err(Error::IsNullNotImplementedForUniqueIndexes)
                    } else if ci.sortable.is_some() {
                        Ok(ci.sortable_null.clone())
                    } else {
                        Err(Error::NoIndexForColumn(crit.key.clone()))
                    }
                } else if let Some(tree) = ci.unique.as_ref() {
                    Ok(tree.get(&crit.value).map(|id| BTreeSet::from([*id])).unwrap_or_default())
                } else if let Some(tree) = ci.sortable.as_ref() {
                    Ok(tree.get(&crit.value).cloned().unwrap_or_default())
                } else {
                    Err(Error::NoIndexForColumn(crit.key.clone()))
                }
            }
            Op::Contains => {
                let tree = ci.partial.as_ref().ok_or_else(|| Error::NoIndexForColumn(crit.key.clone()))?;
                let text = crit.value.as_text().ok_or_else(|| Error::InvalidTypeForColumn(crit.key.clone()))?;
                Ok(tree.find(text).unwrap_or_default())
            }
            Op::StartsWith => {
                let idx = ci.prefixed.as_ref().ok_or_else(|| Error::NoIndexForColumn(crit.key.clone()))?;
                let text = crit.value.as_text().ok_or_else(|| Error::InvalidTypeForColumn(crit.key.clone()))?;
                Ok(idx.starts_with(text).cloned().unwrap_or_default())
            }
            Op::Neq | Op::Lt | Op::Lte | Op::Gt | Op::Gte => {
                if let Some(tree) = ci.unique.as_ref() {
                    let ids: Vec<&u32> = match crit.op {
                        Op::Neq => tree.find_neq(&crit.value),
                        Op::Lt => tree.find_lt(&crit.value),
                        Op::Lte => tree.find_lte(&crit.value),
                        Op::Gt => tree.find_gt(&crit.value),
                        Op::Gte => tree.find_gte(&crit.value),
                        _ => unreachable!(),
                    };
                    Ok(ids.into_iter().copied().collect())
                } else if let Some(tree) = ci.sortable.as_ref() {
                    let buckets: Vec<&BTreeSet<u32>> = match crit.op {
                        Op::Neq => tree.find_neq(&crit.value),
                        Op::Lt => tree.find_lt(&crit.value),
                        Op::Lte => tree.find_lte(&crit.value),
                        Op::Gt => tree.find_gt(&crit.value),
                        Op::Gte => tree.find_gte(&crit.value),
                        _ => unreachable!(),
                    };
                    Ok(buckets.into_iter().flat_map(|s| s.iter().copied()).collect())
                } else {
                    Err(Error::NoIndexForColumn(crit.key.clone()))
                }
            }
            Op::Between => {
                let (lo, hi) = crit.value.as_tuple().ok_or_else(|| Error::ValueShouldBeTuple(crit.key.clone()))?;
                if let Some(tree) = ci.unique.as_ref() {
                    Ok(tree.find_between(lo, hi).into_iter().copied().collect())
                } else if let Some(tree) = ci.sortable.as_ref() {
                    Ok(tree.find_between(lo, hi).into_iter().flat_map(|s| s.iter().copied()).collect())
                } else {
                    Err(Error::NoIndexForColumn(crit.key.clone()))
                }
            }
        }
    }

    fn evaluate_criteria(&self, criterias: &[Criterion]) -> Result<BTreeSet<u32>> {
        let mut running: Option<BTreeSet<u32>> = None;
        for crit in criterias {
            let ids = self.evaluate_one(crit)?;
            running = Some(match running {
                None => ids,
                Some(r) => r.intersection(&ids).copied().collect(),
            });
            if running.as_ref().is_some_and(|s| s.is_empty()) {
                break;
            }
        }
        Ok(running.unwrap_or_default())
    }

    fn enumerate_default(&self, sort_by: &[SortBy<R>], limit: Option<Limit>) -> Result<Vec<&R>> {
        let (key, dir) = sort_by.first().map(|s| (s.key.as_str(), s.dir)).unwrap_or(("_id", Dir::Asc));

        let mut ids: Vec<u32> = Vec::new();
        if key == "_id" {
            let indices = 0..self.rows.len();
            if dir == Dir::Asc {
                for i in indices {
                    if self.rows[i].is_some() {
                        ids.push((i + 1) as u32);
                    }
                }
            } else {
                for i in indices.rev() {
                    if self.rows[i].is_some() {
                        ids.push((i + 1) as u32);
                    }
                }
            }
        } else {
            self.schema.column(key).ok_or_else(|| Error::UnknownColumn(key.to_string()))?;
            let ci = self.indexes.get(key).ok_or_else(|| Error::NoIndexForColumn(key.to_string()))?;
            if let Some(tree) = ci.unique.as_ref() {
                match dir {
                    Dir::Asc => {
                        let mut c = tree.cursor_forward();
                        while let Some((_, id)) = c.next() {
                            ids.push(*id);
                        }
                    }
                    Dir::Desc => {
                        let mut c = tree.cursor_backward();
                        while let Some((_, id)) = c.prev() {
                            ids.push(*id);
                        }
                    }
                }
            } else if let Some(tree) = ci.sortable.as_ref() {
                match dir {
                    Dir::Asc => {
                        let mut c = tree.cursor_forward();
                        while let Some((_, set)) = c.next() {
                            let mut v: Vec<u32> = set.iter().copied().collect();
                            v.sort_unstable();
                            ids.extend(v);
                        }
                    }
                    Dir::Desc => {
                        let mut c = tree.cursor_backward();
                        while let Some((_, set)) = c.prev() {
                            let mut v: Vec<u32> = set.iter().copied().collect();
                            v.sort_unstable_by(|a, b| b.cmp(a));
                            ids.extend(v);
                        }
                    }
                }
            } else {
                return Err(Error::NoIndexForColumn(key.to_string()));
            }
        }

        let sliced = apply_limit(ids, limit);
        sliced
            .into_iter()
            .map(|id| {
                self.rows[(id - 1) as usize]
                    .as_ref()
                    .ok_or_else(|| bug(format!("indexed id {id} has no live row")))
            })
            .collect()
    }

    /// Evaluate `criterias` (or, if empty, enumerate in `sortBy[0]`
    /// order), sort the surviving rows by `sortBy` (leftmost key
    /// dominant), then slice by `limit`.
    pub fn find(&self, criterias: &[Criterion], sort_by: &[SortBy<R>], limit: Option<Limit>) -> Result<Vec<&R>> {
        let _span = tracing::debug_span!("table.find", table = self.table_name()).entered();
        if criterias.is_empty() {
            return self.enumerate_default(sort_by, limit);
        }
        let mut ids: Vec<u32> = self.evaluate_criteria(criterias)?.into_iter().collect();
        if !sort_by.is_empty() {
            crate::sort::merge_sort_by_keys(&mut ids, sort_by, |sb, a, b| {
                let ra = self.rows[(*a - 1) as usize].as_ref().expect("candidate id set only holds live ids");
                let rb = self.rows[(*b - 1) as usize].as_ref().expect("candidate id set only holds live ids");
                let ord = (sb.cmp)(ra, rb);
                if sb.dir == Dir::Desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        let sliced = apply_limit(ids, limit);
        Ok(sliced.into_iter().map(|id| self.rows[(id - 1) as usize].as_ref().unwrap()).collect())
    }

    pub fn find_one(&self, criterias: &[Criterion]) -> Result<Option<&R>> {
        let ids = self.evaluate_criteria(criterias)?;
        Ok(ids.into_iter().next().map(|id| self.rows[(id - 1) as usize].as_ref().unwrap()))
    }

    pub fn count(&self, criterias: &[Criterion]) -> Result<usize> {
        if criterias.is_empty() {
            Ok(self.rows.iter().filter(|r| r.is_some()).count())
        } else {
            Ok(self.evaluate_criteria(criterias)?.len())
        }
    }

    /// One entry per live row, `serialize(row, false)` plus an injected
    /// `_id` so `restore` can realign gaps regardless of what the
    /// caller's own projection carries.
    pub fn backup(&self) -> Vec<Vec<(String, Variant)>> {
        let _span = tracing::debug_span!("table.backup", table = self.table_name()).entered();
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref().map(|row| {
                    let id = (i + 1) as u32;
                    let mut map = (self.serialize)(row, false);
                    map.insert("_id".to_string(), Variant::Nat32(id));
                    map.into_iter().collect()
                })
            })
            .collect()
    }

    /// Reconstruct state from [`Self::backup`] output, padding tombstones
    /// to preserve id alignment and re-indexing with the indexing
    /// projection. Never validates uniqueness: it trusts the backup.
    pub fn restore(&mut self, entries: Vec<Vec<(String, Variant)>>) {
        let _span = tracing::debug_span!("table.restore", table = self.table_name()).entered();
        for entry in entries {
            let map: BTreeMap<String, Variant> = entry.into_iter().collect();
            let id = match map.get("_id") {
                Some(Variant::Nat32(n)) => *n,
                _ => continue,
            };
            while self.next_id() < id {
                self.rows.push(None);
            }
            let row = (self.deserialize)(&map);
            let index_map = (self.serialize)(&row, true);
            self.insert_into_indexes(id, &index_map);
            self.rows.push(Some(row));
        }
    }
}
