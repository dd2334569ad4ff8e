//! Scope themes, types and the variant superset rule.

mod common;

use common::{map, MODES};
use tm_engine::error::ModelError;
use tm_engine::TopicMapError;

#[test]
fn scope_set_semantics() {
    let tm = map(MODES[0]);
    let t = tm.create_topic().unwrap();
    let ty = tm.create_topic().unwrap();
    let theme = tm.create_topic().unwrap();
    let absent = tm.create_topic().unwrap();
    let occ = tm.create_occurrence(t, ty, "x", &[]).unwrap();

    tm.add_theme(occ, theme).unwrap();
    tm.add_theme(occ, theme).unwrap();
    assert_eq!(tm.scope(occ).unwrap().len(), 1);
    tm.remove_theme(occ, absent).unwrap();
    assert_eq!(tm.scope(occ).unwrap().len(), 1);
    tm.remove_theme(occ, theme).unwrap();
    assert!(tm.scope(occ).unwrap().is_empty());
}

#[test]
fn foreign_theme_leaves_scope_unchanged() {
    let tm = map(MODES[0]);
    let other = map(MODES[0]);
    let ty = tm.create_topic().unwrap();
    let theme = tm.create_topic().unwrap();
    let assoc = tm.create_association(ty, &[theme]).unwrap();
    let foreign = other.create_topic().unwrap();

    let err = tm.add_theme(assoc, foreign).unwrap_err();
    assert!(matches!(err, TopicMapError::Model(ModelError::Constraint { .. })));
    assert_eq!(err.reporter(), Some(assoc.into()));
    assert_eq!(tm.scope(assoc).unwrap().len(), 1);
}

#[test]
fn variant_scope_is_name_scope_plus_local_themes() {
    let tm = map(MODES[0]);
    let t = tm.create_topic().unwrap();
    let s1 = tm.create_topic().unwrap();
    let s2 = tm.create_topic().unwrap();
    let l1 = tm.create_topic().unwrap();
    let name = tm.create_typed_name(t, t, "n", &[s1, s2]).unwrap();

    let variant = tm.create_variant(name, "v", &[l1]).unwrap();
    let scope = tm.scope(variant).unwrap();
    assert_eq!(scope.len(), 3);
    assert!(scope.len() > tm.scope(name).unwrap().len());

    let overlapping = tm.create_variant(name, "w", &[s1, l1]).unwrap();
    assert_eq!(tm.scope(overlapping).unwrap().len(), 3);
}

#[test]
fn variant_needs_a_theme_beyond_the_name() {
    let tm = map(MODES[0]);
    let t = tm.create_topic().unwrap();
    let s1 = tm.create_topic().unwrap();
    let name = tm.create_typed_name(t, t, "n", &[s1]).unwrap();

    let err = tm.create_variant(name, "v", &[]).unwrap_err();
    assert_eq!(err.reporter(), Some(name.into()));
    let err = tm.create_variant(name, "v", &[s1]).unwrap_err();
    assert!(matches!(err, TopicMapError::Model(ModelError::Constraint { .. })));
    assert!(tm.variants(name).unwrap().is_empty());
}

#[test]
fn name_scope_changes_reach_variants() {
    let tm = map(MODES[0]);
    let t = tm.create_topic().unwrap();
    let local = tm.create_topic().unwrap();
    let later = tm.create_topic().unwrap();
    let name = tm.create_name(t, "n").unwrap();
    let variant = tm.create_variant(name, "v", &[local]).unwrap();

    tm.add_theme(name, later).unwrap();
    assert!(tm.scope(variant).unwrap().contains(&later));
    assert!(!tm.local_scope(variant).unwrap().contains(&later));
    tm.remove_theme(name, later).unwrap();
    assert!(!tm.scope(variant).unwrap().contains(&later));
}

#[test]
fn every_typed_construct_has_a_type() {
    let tm = map(MODES[0]);
    let t = tm.create_topic().unwrap();
    let name = tm.create_name(t, "default typed").unwrap();
    let ty = tm.type_of(name).unwrap();
    assert!(tm.contains(ty));

    let replacement = tm.create_topic().unwrap();
    tm.set_type(name, replacement).unwrap();
    assert_eq!(tm.type_of(name).unwrap(), replacement);
}
