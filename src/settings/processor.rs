//! The field processor: the engine behind every `Configurable`
//! operation.
//!
//! Each operation enumerates a schema's fields and works over the
//! per-instance cells, recursing into nested children where they are
//! reachable. Skips (non-copiable fields, names absent on a target,
//! unreachable values) are silent; only validation aggregates failures.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, trace};

use super::error::SettingsError;
use super::instance::Configurable;
use super::proxy::ProxyValue;
use super::value::Value;

/// Resets every field to a fresh `Unset` cell and eagerly constructs
/// nested children (recursively defaulted), so nested navigation never
/// hits a missing instance. Scalar defaults stay in the metadata and
/// materialize on read, keeping "defaulted" distinguishable from
/// "assigned".
pub(crate) fn setup_defaults(cfg: &Configurable) {
    let schema = cfg.schema();
    let mut values = BTreeMap::new();
    for meta in schema.metas() {
        let mut cell = ProxyValue::new(Rc::clone(meta));
        if let Some(child_schema) = meta.nested_schema() {
            cell.set(Value::Nested(child_schema.instantiate()));
        }
        values.insert(meta.name().to_string(), cell);
    }
    cfg.inner.borrow_mut().values = values;
}

/// Collects every required field with no reachable value, recursing
/// into nested children, and fails with one aggregate error naming all
/// of them by qualified path.
pub(crate) fn check_required(cfg: &Configurable) -> Result<(), SettingsError> {
    let mut fields = Vec::new();
    collect_unset_required(cfg, "", &mut fields);
    if fields.is_empty() {
        Ok(())
    } else {
        debug!(schema = cfg.schema().name(), unset = ?fields, "required fields unset");
        Err(SettingsError::RequiredFieldsUnset { fields })
    }
}

fn collect_unset_required(cfg: &Configurable, prefix: &str, out: &mut Vec<String>) {
    let schema = cfg.schema();
    for meta in schema.fields() {
        let qualified = if prefix.is_empty() {
            meta.name().to_string()
        } else {
            format!("{prefix}.{}", meta.name())
        };
        match cfg.get(meta.name()) {
            // nested children are validated regardless of their own flags
            Ok(Value::Nested(child)) => collect_unset_required(&child, &qualified, out),
            Ok(_) => {}
            Err(_) => {
                if meta.required() {
                    out.push(qualified);
                }
            }
        }
    }
}

/// Serializes reachable fields in declaration order. Unreachable fields
/// and `Nil` are omitted rather than written as null; TOML has no null.
pub(crate) fn to_table(cfg: &Configurable) -> toml::Table {
    let schema = cfg.schema();
    let mut table = toml::Table::new();
    for meta in schema.fields() {
        if let Ok(value) = cfg.get(meta.name()) {
            if let Some(toml_value) = value.to_toml() {
                table.insert(meta.name().to_string(), toml_value);
            }
        }
    }
    table
}

/// Assigns fields named in `table`. Unknown keys are ignored (tables
/// may carry extra data). A table value merges into the existing nested
/// child rather than replacing it.
pub(crate) fn from_table(cfg: &Configurable, table: &toml::Table) {
    let schema = cfg.schema();
    for (key, incoming) in table {
        if schema.meta(key).is_none() {
            trace!(schema = schema.name(), key = %key, "ignoring unknown key");
            continue;
        }
        match incoming {
            toml::Value::Table(nested_table) => {
                if let Ok(child) = cfg.nested(key) {
                    from_table(&child, nested_table);
                }
            }
            scalar => {
                if let Some(value) = Value::from_toml(scalar.clone()) {
                    let _ = cfg.set_value(key, value);
                }
            }
        }
    }
}

/// Copies reachable, copiable source fields onto same-named target
/// fields. Values are deep copies; nested children on the target are
/// fresh instances, never shared references.
pub(crate) fn copy_settings(source: &Configurable, target: &Configurable) {
    let source_schema = source.schema();
    let target_schema = target.schema();
    for meta in source_schema.fields() {
        if !meta.copiable() || target_schema.meta(meta.name()).is_none() {
            continue;
        }
        if let Ok(value) = source.get(meta.name()) {
            let _ = target.set_value(meta.name(), value.deep_clone());
        }
    }
}

/// Installs read-through links on `target` for every proxiable source
/// field present on both schemas. Links hold a non-owning reference;
/// reads are live, not snapshots.
pub(crate) fn proxy_settings(source: &Configurable, target: &Configurable) {
    let source_schema = source.schema();
    trace!(
        source = source_schema.name(),
        target = target.schema().name(),
        "installing proxy links"
    );
    let inner = &mut *target.inner.borrow_mut();
    for meta in source_schema.metas() {
        if !meta.proxiable() {
            continue;
        }
        let Some(target_meta) = inner.schema.meta(meta.name()) else {
            continue;
        };
        let target_meta = Rc::clone(target_meta);
        inner
            .values
            .entry(meta.name().to_string())
            .or_insert_with(|| ProxyValue::new(target_meta))
            .proxy_to(Rc::downgrade(&source.inner), meta.name());
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::settings::{FieldFlag, Schema, SettingsError, Value};

    fn super_schema() -> Rc<Schema> {
        Schema::builder("TestSuperStruct")
            .setting("three", 3)
            .required_field("four")
            .build()
    }

    fn test_schema() -> Rc<Schema> {
        super_schema()
            .extend("TestStruct")
            .setting("one", 1)
            .nested("two", |two| two.setting("a", "a").required_field("b"))
            .nil_field("five")
            .build()
    }

    #[test]
    fn test_setup_defaults_materializes_declared_defaults() {
        let subject = test_schema().instantiate();
        assert_eq!(subject.get("one").unwrap(), Value::Int(1));
        assert_eq!(subject.nested("two").unwrap().get("a").unwrap(), Value::from("a"));
        assert_eq!(subject.get("three").unwrap(), Value::Int(3));
        assert_eq!(subject.get("five").unwrap(), Value::Nil);
        assert_eq!(subject.field_unset("one").unwrap(), false);
        assert_eq!(subject.field_unset("four").unwrap(), true);
    }

    #[test]
    fn test_to_table() {
        let table = test_schema().instantiate().to_table();
        assert_eq!(table["one"], toml::Value::Integer(1));
        assert_eq!(table["two"]["a"], toml::Value::String("a".into()));
        // no reachable value and no TOML form for nil: both omitted
        assert!(!table.contains_key("four"));
        assert!(!table.contains_key("five"));
    }

    #[test]
    fn test_from_table_merges_into_existing_nested_child() {
        let subject = test_schema().instantiate();
        let child_before = subject.nested("two").unwrap();

        let incoming: toml::Table = toml::from_str("one = 111\n[two]\na = \"aaa\"").unwrap();
        subject.from_table(&incoming);

        assert_eq!(subject.get("one").unwrap(), Value::Int(111));
        assert_eq!(subject.nested("two").unwrap().get("a").unwrap(), Value::from("aaa"));
        assert!(child_before.ptr_eq(&subject.nested("two").unwrap()));
    }

    #[test]
    fn test_from_table_ignores_unknown_keys() {
        let subject = test_schema().instantiate();
        let incoming: toml::Table = toml::from_str("bogus = 9\none = 2").unwrap();
        subject.from_table(&incoming);
        assert_eq!(subject.get("one").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_round_trip_through_table() {
        let original = test_schema().instantiate();
        original.set("four", 4).unwrap();
        original.nested("two").unwrap().set("b", "b").unwrap();

        let copy = test_schema().instantiate();
        copy.from_table(&original.to_table());

        assert_eq!(copy, original);
        assert!(!copy.nested("two").unwrap().ptr_eq(&original.nested("two").unwrap()));
    }

    #[test]
    fn test_check_required_names_every_violation() {
        let subject = test_schema().instantiate();
        match subject.check_required().unwrap_err() {
            SettingsError::RequiredFieldsUnset { fields } => {
                assert_eq!(fields, ["four", "two.b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_required_message_names_required_fields() {
        let err = test_schema().instantiate().check_required().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Required field"), "message: {message}");
        assert!(message.contains("two.b"), "message: {message}");
    }

    #[test]
    fn test_check_required_recurses_into_nested_children() {
        let subject = test_schema().instantiate();
        subject.set("four", 4).unwrap();
        match subject.check_required().unwrap_err() {
            SettingsError::RequiredFieldsUnset { fields } => assert_eq!(fields, ["two.b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_required_passes_once_fields_are_set() {
        let subject = test_schema().instantiate();
        subject.set("four", 4).unwrap();
        subject.nested("two").unwrap().set("b", "b").unwrap();
        subject.check_required().unwrap();
    }

    #[test]
    fn test_instances_do_not_share_nested_children() {
        let schema = Schema::builder("MultiSource")
            .setting("one", 1)
            .nested("nest", |nest| nest.setting("two", 2))
            .build();

        let first = schema.instantiate();
        let second = schema.instantiate();
        first.set("one", "one").unwrap();
        first.nested("nest").unwrap().set("two", "two").unwrap();

        first.check_required().unwrap();
        second.check_required().unwrap();

        assert_eq!(first.get("one").unwrap(), Value::from("one"));
        assert_eq!(second.get("one").unwrap(), Value::Int(1));
        assert_eq!(first.nested("nest").unwrap().get("two").unwrap(), Value::from("two"));
        assert_eq!(second.nested("nest").unwrap().get("two").unwrap(), Value::Int(2));
        assert!(!first.nested("nest").unwrap().ptr_eq(&second.nested("nest").unwrap()));
    }

    fn left_schema() -> Rc<Schema> {
        Schema::builder("LeftStruct")
            .setting("normal", "1")
            .nested("nested", |nested| nested.setting("value", "2"))
            .setting("no_copy", 2)
            .isnt(FieldFlag::Copiable)
            .setting("no_proxy", 3)
            .isnt(FieldFlag::Proxiable)
            .setting("no_nothing", 4)
            .isnt(FieldFlag::Copiable)
            .isnt(FieldFlag::Proxiable)
            .setting("not_on_target", 5)
            .build()
    }

    fn right_schema() -> Rc<Schema> {
        Schema::builder("RightStruct")
            .required_fields(["normal", "nested", "no_copy", "no_proxy", "no_nothing"])
            .build()
    }

    #[test]
    fn test_copy_makes_copies_not_references() {
        let left = left_schema().instantiate();
        let right = right_schema().instantiate();

        left.copy_settings_to(&right);

        assert_eq!(right.get("normal").unwrap(), left.get("normal").unwrap());
        let left_nested = left.nested("nested").unwrap();
        let right_nested = right.nested("nested").unwrap();
        assert_eq!(right_nested.get("value").unwrap(), left_nested.get("value").unwrap());
        assert!(!right_nested.ptr_eq(&left_nested));

        // later source mutations must not leak into the copy
        left_nested.set("value", "changed").unwrap();
        assert_eq!(right_nested.get("value").unwrap(), Value::from("2"));
    }

    #[test]
    fn test_copy_skips_non_copiable_fields() {
        let left = left_schema().instantiate();
        let right = right_schema().instantiate();

        left.copy_settings_to(&right);

        assert_eq!(right.field_unset("normal").unwrap(), false);
        assert_eq!(right.get("normal").unwrap(), Value::from("1"));
        assert_eq!(right.field_unset("no_copy").unwrap(), true);
        assert_eq!(right.field_unset("no_proxy").unwrap(), false);
        assert_eq!(right.get("no_proxy").unwrap(), Value::Int(3));
        assert_eq!(right.field_unset("no_nothing").unwrap(), true);
    }

    #[test]
    fn test_proxy_skips_non_proxiable_fields() {
        let left = left_schema().instantiate();
        let right = right_schema().instantiate();

        left.proxy_settings().to(&right);

        assert_eq!(right.field_unset("normal").unwrap(), false);
        assert_eq!(right.get("normal").unwrap(), Value::from("1"));
        assert_eq!(right.field_unset("no_copy").unwrap(), false);
        assert_eq!(right.get("no_copy").unwrap(), Value::Int(2));
        assert_eq!(right.field_unset("no_proxy").unwrap(), true);
        assert_eq!(right.field_unset("no_nothing").unwrap(), true);
    }

    #[test]
    fn test_proxied_reads_are_live_until_overwritten() {
        let left = left_schema().instantiate();
        let right = right_schema().instantiate();

        left.proxy_settings().to(&right);
        left.set("normal", "updated").unwrap();
        assert_eq!(right.get("normal").unwrap(), Value::from("updated"));

        // direct assignment severs the link
        right.set("normal", "own").unwrap();
        left.set("normal", "ignored").unwrap();
        assert_eq!(right.get("normal").unwrap(), Value::from("own"));
    }

    #[test]
    fn test_dropped_proxy_target_reads_as_unset() {
        let left = left_schema().instantiate();
        let right = right_schema().instantiate();

        left.proxy_settings().to(&right);
        drop(left);

        assert_eq!(right.field_unset("normal").unwrap(), true);
    }

    #[test]
    fn test_mutual_proxies_are_reported_as_circular() {
        let schema = Schema::builder("Loop").required_field("x").build();
        let a = schema.instantiate();
        let b = schema.instantiate();

        a.proxy_settings().to(&b);
        b.proxy_settings().to(&a);

        assert!(matches!(
            a.get("x").unwrap_err(),
            SettingsError::CircularProxy { .. }
        ));
    }
}
