//! The instance side of the settings engine.
//!
//! A [`Configurable`] is a cheap-to-clone handle to one instance of a
//! [`Schema`]: one [`ProxyValue`](super::proxy::ProxyValue) cell per
//! declared field. All of its operations are thin delegations to the
//! field processor. The engine is single-threaded by design; proxy
//! links hold non-owning references and the caller keeps targets alive
//! for as long as reads may go through them.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;

use super::error::SettingsError;
use super::metadata::Schema;
use super::processor;
use super::proxy::{ProxyValue, Resolution};
use super::value::Value;

// Bound on proxy read-through hops. Links between instances are
// installed field-by-field, so any chain longer than this is a cycle.
const MAX_PROXY_HOPS: usize = 100;

pub(crate) struct Inner {
    pub(crate) schema: Rc<Schema>,
    pub(crate) values: BTreeMap<String, ProxyValue>,
}

/// One configured instance of a [`Schema`].
///
/// Clones share the instance; use [`Configurable::deep_clone`] for a
/// value copy and [`Configurable::ptr_eq`] for identity. `PartialEq`
/// compares reachable values, not identity.
#[derive(Clone)]
pub struct Configurable {
    pub(crate) inner: Rc<RefCell<Inner>>,
}

impl Configurable {
    /// Constructs an instance with no fields materialized.
    ///
    /// Call [`setup_defaults`](Self::setup_defaults) (or use
    /// [`Schema::instantiate`]) before relying on nested children being
    /// present.
    pub fn new(schema: Rc<Schema>) -> Configurable {
        Configurable {
            inner: Rc::new(RefCell::new(Inner {
                schema,
                values: BTreeMap::new(),
            })),
        }
    }

    pub fn schema(&self) -> Rc<Schema> {
        Rc::clone(&self.inner.borrow().schema)
    }

    /// Resets every field to a fresh cell and eagerly constructs nested
    /// children, so `child.field` navigation never needs a null check.
    pub fn setup_defaults(&self) -> &Self {
        processor::setup_defaults(self);
        self
    }

    /// Reads a field, following proxy links and materializing declared
    /// defaults.
    pub fn get(&self, field: &str) -> Result<Value, SettingsError> {
        let mut inner = Rc::clone(&self.inner);
        let mut name = field.to_string();

        for _ in 0..MAX_PROXY_HOPS {
            let step = {
                let borrowed = inner.borrow();
                let meta = match borrowed.schema.meta(&name) {
                    Some(meta) => Rc::clone(meta),
                    None => {
                        return Err(SettingsError::UnknownField {
                            schema: borrowed.schema.name().to_string(),
                            field: name,
                        })
                    }
                };
                match borrowed.values.get(&name) {
                    Some(cell) => cell.resolve(),
                    None => match meta.materialize_default() {
                        Some(value) => Resolution::Found(value),
                        None => Resolution::Unset,
                    },
                }
            };

            match step {
                Resolution::Found(value) => return Ok(value),
                Resolution::Unset => {
                    return Err(SettingsError::FieldUnset {
                        field: field.to_string(),
                    })
                }
                Resolution::Forward(target, next) => match target.upgrade() {
                    // a dropped proxy target reads as unset
                    None => {
                        return Err(SettingsError::FieldUnset {
                            field: field.to_string(),
                        })
                    }
                    Some(target) => {
                        inner = target;
                        name = next;
                    }
                },
            }
        }

        Err(SettingsError::CircularProxy {
            field: field.to_string(),
        })
    }

    /// Assigns a field, overwriting any proxy link on it.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<&Self, SettingsError> {
        self.set_value(field, value.into())?;
        Ok(self)
    }

    /// Returns the nested instance held by `field`.
    pub fn nested(&self, field: &str) -> Result<Configurable, SettingsError> {
        match self.get(field)? {
            Value::Nested(child) => Ok(child),
            _ => Err(SettingsError::NotNested {
                field: field.to_string(),
            }),
        }
    }

    /// True when no value is reachable for `field`: not assigned, no
    /// usable default, and no proxy link leading to one.
    pub fn field_unset(&self, field: &str) -> Result<bool, SettingsError> {
        match self.get(field) {
            Ok(_) => Ok(false),
            Err(SettingsError::FieldUnset { .. }) => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// Validates that every required field, recursively through nested
    /// children, has a reachable value. Collects all violations into one
    /// aggregate error.
    pub fn check_required(&self) -> Result<(), SettingsError> {
        processor::check_required(self)
    }

    /// Serializes reachable fields to a TOML table. Unreachable fields
    /// and `Nil` values are omitted.
    pub fn to_table(&self) -> toml::Table {
        processor::to_table(self)
    }

    /// Assigns fields from a TOML table. Unknown keys are ignored;
    /// table values for nested fields merge into the existing child
    /// instead of replacing it.
    pub fn from_table(&self, table: &toml::Table) -> &Self {
        processor::from_table(self, table);
        self
    }

    /// Copies every copiable field present on both schemas onto
    /// `target`, deep-copying so the two instances share nothing.
    pub fn copy_settings_to(&self, target: &Configurable) {
        processor::copy_settings(self, target);
    }

    /// Returns a binder that installs live read-through links on a
    /// target: after `a.proxy_settings().to(&b)`, reads on `b` reflect
    /// `a`'s current values.
    pub fn proxy_settings(&self) -> ProxySettings<'_> {
        ProxySettings { source: self }
    }

    /// Deserializes the reachable fields into a typed value.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, SettingsError> {
        toml::Value::Table(self.to_table())
            .try_into()
            .map_err(SettingsError::Deserialize)
    }

    /// A value copy: equal field values, nothing shared with `self`.
    pub fn deep_clone(&self) -> Configurable {
        let inner = self.inner.borrow();
        let values = inner
            .values
            .iter()
            .map(|(name, cell)| (name.clone(), cell.deep_clone()))
            .collect();
        Configurable {
            inner: Rc::new(RefCell::new(Inner {
                schema: Rc::clone(&inner.schema),
                values,
            })),
        }
    }

    /// Object identity, as opposed to the value equality of `==`.
    pub fn ptr_eq(&self, other: &Configurable) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn set_value(&self, field: &str, value: Value) -> Result<(), SettingsError> {
        let inner = &mut *self.inner.borrow_mut();
        let meta = match inner.schema.meta(field) {
            Some(meta) => Rc::clone(meta),
            None => {
                return Err(SettingsError::UnknownField {
                    schema: inner.schema.name().to_string(),
                    field: field.to_string(),
                })
            }
        };
        inner
            .values
            .entry(field.to_string())
            .or_insert_with(|| ProxyValue::new(meta))
            .set(value);
        Ok(())
    }

    // Whether the cell itself holds an assigned value, without
    // following links or defaults. Used by path resolution to avoid
    // clobbering explicit assignments.
    pub(crate) fn is_explicitly_set(&self, field: &str) -> bool {
        self.inner
            .borrow()
            .values
            .get(field)
            .is_some_and(ProxyValue::is_explicit)
    }
}

impl Schema {
    /// Constructs a fresh instance with defaults materialized.
    pub fn instantiate(&self) -> Configurable {
        let cfg = Configurable::new(Rc::new(self.clone()));
        cfg.setup_defaults();
        cfg
    }
}

impl PartialEq for Configurable {
    fn eq(&self, other: &Configurable) -> bool {
        self.to_table() == other.to_table()
    }
}

impl fmt::Debug for Configurable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let mut dbg = f.debug_struct(inner.schema.name());
        for meta in inner.schema.fields() {
            match inner.values.get(meta.name()) {
                Some(cell) => dbg.field(meta.name(), cell),
                None => match meta.materialize_default() {
                    Some(value) => dbg.field(meta.name(), &format_args!("{value} (default)")),
                    None => dbg.field(meta.name(), &format_args!("<unset>")),
                },
            };
        }
        dbg.finish()
    }
}

/// Binder returned by [`Configurable::proxy_settings`].
#[must_use = "a proxy binder does nothing until .to() is called"]
pub struct ProxySettings<'a> {
    source: &'a Configurable,
}

impl ProxySettings<'_> {
    /// Installs read-through links on `target` for every proxiable
    /// source field that exists on `target`'s schema.
    pub fn to(self, target: &Configurable) {
        processor::proxy_settings(self.source, target);
    }
}
