//! End-to-end scenario and invariant tests over the table engine.

use std::collections::BTreeMap;

use ixtable_core::error::Error;
use ixtable_core::query::{Criterion, Dir, Limit, Op, SortBy};
use ixtable_core::schema::{Column, Schema};
use ixtable_core::table::{Table, TableConfig};
use ixtable_core::variant::Variant;

#[derive(Debug, Clone, PartialEq)]
struct Person {
    name: String,
    age: u32,
    tags: Vec<String>,
}

fn person(name: &str, age: u32, tags: &[&str]) -> Person {
    Person {
        name: name.to_string(),
        age,
        tags: tags.iter().map(|s| s.to_string()).collect(),
    }
}

fn serialize(row: &Person, _for_index: bool) -> BTreeMap<String, Variant> {
    let mut map = BTreeMap::new();
    map.insert("name".to_string(), Variant::from(row.name.as_str()));
    map.insert("age".to_string(), Variant::Nat32(row.age));
    map.insert(
        "tags".to_string(),
        Variant::Array(row.tags.iter().map(|t| Variant::from(t.as_str())).collect()),
    );
    map
}

fn deserialize(map: &BTreeMap<String, Variant>) -> Person {
    Person {
        name: map.get("name").and_then(Variant::as_text).unwrap_or_default().to_string(),
        age: map.get("age").and_then(Variant::as_f64).map(|f| f as u32).unwrap_or(0),
        tags: map
            .get("tags")
            .and_then(Variant::as_array)
            .map(|items| items.iter().filter_map(Variant::as_text).map(str::to_string).collect())
            .unwrap_or_default(),
    }
}

fn new_people_table() -> Table<Person> {
    let schema = Schema::new(
        "people",
        1,
        vec![
            Column::primary("_id"),
            Column::new("name").with_unique().with_sortable().with_partial().with_prefixed(),
            Column::new("age").with_sortable(),
            Column::new("tags").with_multiple().with_partial(),
        ],
    );
    Table::new(TableConfig::new(), schema, serialize, deserialize)
}

fn ids(names: Vec<&Person>) -> Vec<String> {
    names.into_iter().map(|p| p.name.clone()).collect()
}

/// Scenario 1: mixed-index lookups over a freshly populated table.
#[test]
fn scenario_mixed_index_lookups() {
    let mut t = new_people_table();
    t.insert(1, person("alice", 30, &["a", "b"])).unwrap();
    t.insert(2, person("alicia", 25, &["a", "c"])).unwrap();
    t.insert(3, person("bob", 30, &["b"])).unwrap();

    let by_contains = t.find(&[Criterion::new("name", Op::Contains, Variant::from("lic"))], &[], None).unwrap();
    assert_eq!(ids(by_contains), vec!["alice", "alicia"]);

    let sort_by_name = [SortBy::new("name", Dir::Asc, |a: &Person, b: &Person| a.name.cmp(&b.name))];
    let by_prefix = t
        .find(
            &[Criterion::new("name", Op::StartsWith, Variant::from("al"))],
            &sort_by_name,
            Some(Limit::new(0, 10)),
        )
        .unwrap();
    assert_eq!(ids(by_prefix), vec!["alice", "alicia"]);

    let by_age_eq = t.find(&[Criterion::new("age", Op::Eq, Variant::Nat32(30))], &[], None).unwrap();
    assert_eq!(ids(by_age_eq), vec!["alice", "bob"]);

    let between = Variant::Tuple(Box::new(Variant::Nat32(26)), Box::new(Variant::Nat32(31)));
    let by_age_between = t.find(&[Criterion::new("age", Op::Between, between)], &[], None).unwrap();
    assert_eq!(ids(by_age_between), vec!["alice", "bob"]);

    let by_tag = t.find(&[Criterion::new("tags", Op::Eq, Variant::from("a"))], &[], None).unwrap();
    assert_eq!(ids(by_tag), vec!["alice", "alicia"]);
}

/// Scenario 2: `replace` updates every index, including `prefixed`.
#[test]
fn scenario_replace_updates_prefix_index() {
    let mut t = new_people_table();
    t.insert(1, person("alice", 30, &["a"])).unwrap();
    t.insert(2, person("alicia", 25, &["a"])).unwrap();

    t.replace(2, person("alex", 25, &["a"])).unwrap();

    let by_prefix = t.find(&[Criterion::new("name", Op::StartsWith, Variant::from("ali"))], &[], None).unwrap();
    assert_eq!(ids(by_prefix), vec!["alice"]);
}

/// Scenario 3: deleted ids stay tombstoned and are never reissued.
#[test]
fn scenario_delete_tombstones_and_never_reuses_ids() {
    let mut t = new_people_table();
    t.insert(1, person("alice", 30, &[])).unwrap();
    t.insert(2, person("alicia", 25, &[])).unwrap();
    t.insert(3, person("bob", 30, &[])).unwrap();

    t.delete(1).unwrap();
    assert_eq!(t.get(1).unwrap(), None);
    assert_eq!(t.count(&[]).unwrap(), 2);

    let next = t.next_id();
    assert_eq!(next, 4);
    t.insert(next, person("carol", 40, &[])).unwrap();
    assert_eq!(t.get(1).unwrap(), None);
    assert!(t.get(4).unwrap().is_some());
}

/// Scenario 4: a duplicate unique key is rejected and leaves state unchanged.
#[test]
fn scenario_duplicate_unique_key_leaves_state_unchanged() {
    let mut t = new_people_table();
    t.insert(1, person("alice", 30, &[])).unwrap();
    t.insert(2, person("alicia", 25, &[])).unwrap();
    t.insert(3, person("bob", 30, &[])).unwrap();

    let err = t.insert(5, person("bob", 99, &[])).unwrap_err();
    assert_eq!(err, Error::DuplicatedUniqueKey("name".to_string()));
    assert_eq!(t.count(&[]).unwrap(), 3);
    assert_eq!(t.get(4).unwrap(), None);
}

/// Scenario 5: text length bounds on a column produce the exact source
/// error strings.
#[test]
fn scenario_text_length_bounds() {
    let schema = Schema::new(
        "people",
        1,
        vec![Column::primary("_id"), Column::new("name").with_min(3.0).with_max(5.0)],
    );
    let mut t: Table<Person> = Table::new(TableConfig::new(), schema, serialize, deserialize);

    let err = t.insert(1, person("ab", 1, &[])).unwrap_err();
    assert_eq!(err.to_string(), "name must be at least 3 long");

    let err = t.insert(1, person("abcdef", 1, &[])).unwrap_err();
    assert_eq!(err.to_string(), "name must be at most 5 long");
}

/// Scenario 6: backup/restore round-trips to an observably identical table.
#[test]
fn scenario_backup_restore_round_trip() {
    let mut t = new_people_table();
    t.insert(1, person("alice", 30, &["a", "b"])).unwrap();
    t.insert(2, person("alicia", 25, &["a", "c"])).unwrap();
    t.insert(3, person("bob", 30, &["b"])).unwrap();
    t.delete(1).unwrap();

    let dump = t.backup();

    let mut restored = new_people_table();
    restored.restore(dump);

    assert_eq!(restored.get(1).unwrap(), None);
    assert_eq!(restored.get(2).unwrap().map(|p| p.name.clone()), Some("alicia".to_string()));
    assert_eq!(restored.count(&[]).unwrap(), t.count(&[]).unwrap());

    let original = t.find(&[Criterion::new("name", Op::Contains, Variant::from("lic"))], &[], None).unwrap();
    let after = restored.find(&[Criterion::new("name", Op::Contains, Variant::from("lic"))], &[], None).unwrap();
    assert_eq!(ids(original), ids(after));
}

/// Invariant 1: `find({_id eq i})` agrees with `get(i)` for every valid id.
#[test]
fn invariant_id_eq_matches_get() {
    let mut t = new_people_table();
    t.insert(1, person("alice", 30, &[])).unwrap();
    t.insert(2, person("alicia", 25, &[])).unwrap();
    t.delete(1).unwrap();

    for i in 1..=2u32 {
        let via_find = t.find(&[Criterion::new("_id", Op::Eq, Variant::Nat32(i))], &[], None).unwrap();
        let via_get = t.get(i).unwrap();
        assert_eq!(via_find.first().copied(), via_get);
    }
}

/// Boundary: every operation on id 0 is rejected uniformly.
#[test]
fn boundary_id_zero_is_always_invalid() {
    let mut t = new_people_table();
    assert_eq!(t.insert(0, person("x", 1, &[])).unwrap_err(), Error::InvalidId);
    assert_eq!(t.delete(0).unwrap_err(), Error::InvalidId);
    assert_eq!(t.get(0).unwrap_err(), Error::InvalidId);
}

/// Boundary: `replace` restores the prior row and its indexes on failure.
#[test]
fn replace_rolls_back_fully_on_validation_failure() {
    let mut t = new_people_table();
    t.insert(1, person("alice", 30, &[])).unwrap();
    t.insert(2, person("alicia", 25, &[])).unwrap();

    let err = t.replace(2, person("alice", 99, &[])).unwrap_err();
    assert_eq!(err, Error::DuplicatedUniqueKey("name".to_string()));

    // The old row is still present and both indexes (unique name, sortable
    // age) still resolve it correctly. Nothing was left half-removed.
    assert_eq!(t.get(2).unwrap().map(|p| p.name.clone()), Some("alicia".to_string()));
    let by_name = t.find(&[Criterion::new("name", Op::Eq, Variant::from("alicia"))], &[], None).unwrap();
    assert_eq!(ids(by_name), vec!["alicia"]);
}

/// Boundary: `limit.offset` past the end yields an empty result, not an
/// error.
#[test]
fn limit_offset_past_end_is_empty() {
    let mut t = new_people_table();
    t.insert(1, person("alice", 30, &[])).unwrap();
    let out = t.find(&[], &[], Some(Limit::new(10, 5))).unwrap();
    assert!(out.is_empty());
}

/// Boundary: `between` against a non-tuple value errors rather than
/// panicking.
#[test]
fn between_with_non_tuple_value_errors() {
    let t = new_people_table();
    let err = t.find(&[Criterion::new("age", Op::Between, Variant::Nat32(1))], &[], None).unwrap_err();
    assert_eq!(err, Error::ValueShouldBeTuple("age".to_string()));
}

/// A nullable unique column accepts exactly one `nil`; a second collides
/// with the occupied null bucket.
#[test]
fn nullable_unique_column_allows_one_null() {
    let schema = Schema::new(
        "people",
        1,
        vec![Column::primary("_id"), Column::new("name").with_unique().with_nullable()],
    );
    let mut t: Table<Person> = Table::new(
        TableConfig::new(),
        schema,
        |row: &Person, _for_index: bool| {
            let mut map = BTreeMap::new();
            if !row.name.is_empty() {
                map.insert("name".to_string(), Variant::from(row.name.as_str()));
            }
            map
        },
        deserialize,
    );

    t.insert(1, person("", 1, &[])).unwrap();
    let err = t.insert(2, person("", 1, &[])).unwrap_err();
    assert_eq!(err, Error::DuplicatedUniqueKey("name".to_string()));
}
