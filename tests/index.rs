//! Literal, scoped and type-instance indices in both index modes.

mod common;

use common::{loc, map, reindex_if_manual, sorted, MODES};
use tm_engine::error::IndexError;
use tm_engine::index::{Index, IndexMode};

#[test]
fn literal_round_trip() {
    for mode in MODES {
        let tm = map(mode);
        let mut index = tm.literal_index();
        index.open();

        let t = tm.create_topic().unwrap();
        let name = tm.create_name(t, "Value1").unwrap();
        reindex_if_manual(&mut index);
        assert_eq!(index.names("Value1").unwrap(), vec![name]);

        tm.set_name_value(name, "Value2").unwrap();
        reindex_if_manual(&mut index);
        assert!(index.names("Value1").unwrap().is_empty());
        assert_eq!(index.names("Value2").unwrap(), vec![name]);

        tm.remove(name).unwrap();
        reindex_if_manual(&mut index);
        assert!(index.names("Value1").unwrap().is_empty());
        assert!(index.names("Value2").unwrap().is_empty());
    }
}

#[test]
fn literal_index_tracks_occurrence_and_variant_values() {
    for mode in MODES {
        let tm = map(mode);
        let mut index = tm.literal_index();
        index.open();

        let t = tm.create_topic().unwrap();
        let ty = tm.create_topic().unwrap();
        let theme = tm.create_topic().unwrap();
        let homepage = loc("http://example.org/home");
        let occ = tm.create_occurrence(t, ty, &homepage, &[]).unwrap();
        let name = tm.create_name(t, "n").unwrap();
        let variant = tm.create_variant(name, "short", &[theme]).unwrap();
        reindex_if_manual(&mut index);

        assert_eq!(index.occurrences_by_locator(&homepage).unwrap(), vec![occ]);
        assert!(index.occurrences(homepage.reference()).unwrap().is_empty());
        assert_eq!(index.variants("short").unwrap(), vec![variant]);

        tm.set_literal(variant, "shorter").unwrap();
        reindex_if_manual(&mut index);
        assert!(index.variants("short").unwrap().is_empty());
        assert_eq!(index.variants("shorter").unwrap(), vec![variant]);
    }
}

#[test]
fn type_instance_accumulation() {
    for mode in MODES {
        let tm = map(mode);
        let mut index = tm.type_instance_index();
        index.open();

        let t = tm.create_topic().unwrap();
        let type1 = tm.create_topic().unwrap();
        let type2 = tm.create_topic().unwrap();
        reindex_if_manual(&mut index);
        assert!(!index.topics(Some(type1)).unwrap().contains(&t));

        tm.add_type(t, type1).unwrap();
        reindex_if_manual(&mut index);
        assert!(index.topics(Some(type1)).unwrap().contains(&t));
        assert!(index.topic_types().unwrap().contains(&type1));

        tm.add_type(t, type2).unwrap();
        reindex_if_manual(&mut index);
        assert!(index.topics_matching(&[type1, type2], true).unwrap().contains(&t));
        assert!(index.topics_matching(&[type1, type2], false).unwrap().contains(&t));

        tm.remove_type(t, type1).unwrap();
        reindex_if_manual(&mut index);
        assert!(!index.topics_matching(&[type1, type2], true).unwrap().contains(&t));
        assert!(!index.topic_types().unwrap().contains(&type1));
    }
}

#[test]
fn type_instance_covers_every_typed_kind() {
    for mode in MODES {
        let tm = map(mode);
        let mut index = tm.type_instance_index();
        index.open();

        let t = tm.create_topic().unwrap();
        let assoc_ty = tm.create_topic().unwrap();
        let role_ty = tm.create_topic().unwrap();
        let occ_ty = tm.create_topic().unwrap();
        let name_ty = tm.create_topic().unwrap();
        let assoc = tm.create_association(assoc_ty, &[]).unwrap();
        let role = tm.create_role(assoc, role_ty, t).unwrap();
        let occ = tm.create_occurrence(t, occ_ty, "o", &[]).unwrap();
        let name = tm.create_typed_name(t, name_ty, "n", &[]).unwrap();
        reindex_if_manual(&mut index);

        assert_eq!(index.associations(assoc_ty).unwrap(), vec![assoc]);
        assert_eq!(index.roles(role_ty).unwrap(), vec![role]);
        assert_eq!(index.occurrences(occ_ty).unwrap(), vec![occ]);
        assert_eq!(index.names(name_ty).unwrap(), vec![name]);
        assert_eq!(index.role_types().unwrap(), vec![role_ty]);
        assert_eq!(index.name_types().unwrap(), vec![name_ty]);
        assert_eq!(index.occurrence_types().unwrap(), vec![occ_ty]);
    }
}

#[test]
fn scoped_index_follows_theme_changes() {
    for mode in MODES {
        let tm = map(mode);
        let mut index = tm.scoped_index();
        index.open();

        let t = tm.create_topic().unwrap();
        let ty = tm.create_topic().unwrap();
        let theme = tm.create_topic().unwrap();
        let local = tm.create_topic().unwrap();
        let name = tm.create_name(t, "n").unwrap();
        let variant = tm.create_variant(name, "v", &[local]).unwrap();
        let assoc = tm.create_association(ty, &[]).unwrap();
        reindex_if_manual(&mut index);

        assert!(index.names(None).unwrap().contains(&name));
        assert_eq!(index.associations(None).unwrap(), vec![assoc]);
        assert_eq!(index.variants(local).unwrap(), vec![variant]);

        tm.add_theme(name, theme).unwrap();
        tm.add_theme(assoc, theme).unwrap();
        reindex_if_manual(&mut index);
        assert_eq!(index.names(Some(theme)).unwrap(), vec![name]);
        assert!(!index.names(None).unwrap().contains(&name));
        assert_eq!(index.associations(Some(theme)).unwrap(), vec![assoc]);
        assert!(index.associations(None).unwrap().is_empty());
        assert_eq!(index.variants(theme).unwrap(), vec![variant]);
        assert_eq!(sorted(index.variant_themes().unwrap()), sorted(vec![theme, local]));
        assert_eq!(index.name_themes().unwrap(), vec![theme]);

        tm.remove_theme(name, theme).unwrap();
        reindex_if_manual(&mut index);
        assert!(index.variants(theme).unwrap().is_empty());
        assert_eq!(index.variants_matching(&[local, theme], false).unwrap(), vec![variant]);
        assert!(index.variants_matching(&[local, theme], true).unwrap().is_empty());
    }
}

#[test]
fn merges_are_visible_to_indices() {
    for mode in MODES {
        let tm = map(mode);
        let mut types = tm.type_instance_index();
        let mut scoped = tm.scoped_index();
        types.open();
        scoped.open();

        let a = tm.create_topic().unwrap();
        let b = tm.create_topic().unwrap();
        let instance = tm.create_topic().unwrap();
        let ty = tm.create_topic().unwrap();
        tm.add_type(instance, b).unwrap();
        let occ = tm.create_occurrence(instance, ty, "x", &[b]).unwrap();

        tm.merge_topics(a, b).unwrap();
        reindex_if_manual(&mut types);
        reindex_if_manual(&mut scoped);
        assert_eq!(types.topics(Some(a)).unwrap(), vec![instance]);
        assert!(types.topics(Some(b)).unwrap().is_empty());
        assert_eq!(scoped.occurrences(Some(a)).unwrap(), vec![occ]);
    }
}

#[test]
fn lifecycle_and_argument_errors() {
    for mode in MODES {
        let tm = map(mode);
        let mut index = tm.scoped_index();
        assert!(!index.is_open());
        assert_eq!(index.is_auto_updated(), mode == IndexMode::Auto);
        assert!(matches!(
            index.associations(None),
            Err(IndexError::Closed { .. })
        ));

        index.open();
        index.open();
        assert!(index.is_open());
        assert!(matches!(
            index.associations_matching(&[], false),
            Err(IndexError::MissingArgument { .. })
        ));

        index.close();
        index.close();
        assert!(!index.is_open());
        assert!(index.names(None).is_err());

        let mut types = tm.type_instance_index();
        types.open();
        assert!(matches!(
            types.topics_matching(&[], true),
            Err(IndexError::MissingArgument { .. })
        ));
    }
}
