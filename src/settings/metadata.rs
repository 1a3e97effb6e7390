//! Field metadata and the per-schema registry.
//!
//! A [`Schema`] is the registry of every field a configurable declares:
//! its default provider, whether it is required, whether it participates
//! in copying and proxying, and (for nested sub-configurations) the
//! child schema. Schemas are built once, immutable afterwards, and
//! shared by reference. "Subclassing" is [`Schema::extend`]: the child
//! registry starts as a copy of the parent's and re-declarations
//! override by name without touching the parent.

use std::fmt;
use std::rc::Rc;

use super::error::SettingsError;
use super::value::Value;

type DefaultProvider = Rc<dyn Fn() -> Value>;

/// Flags a field can opt out of with [`SchemaBuilder::isnt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFlag {
    Copiable,
    Proxiable,
}

/// Metadata for a single declared field.
///
/// Immutable once the owning schema is built. The default is a factory
/// invoked per materialization, never a stored value, so defaults are
/// never shared between instances.
#[derive(Clone)]
pub struct FieldMetadata {
    name: String,
    default: Option<DefaultProvider>,
    required: bool,
    copiable: bool,
    proxiable: bool,
    nested: Option<Rc<Schema>>,
}

impl FieldMetadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn copiable(&self) -> bool {
        self.copiable
    }

    pub fn proxiable(&self) -> bool {
        self.proxiable
    }

    pub fn nested_schema(&self) -> Option<&Rc<Schema>> {
        self.nested.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Materializes a fresh default value.
    pub fn default_value(&self, schema: &Schema) -> Result<Value, SettingsError> {
        match &self.default {
            Some(provider) => Ok(provider()),
            None => Err(SettingsError::NoDefaultValue {
                schema: schema.name().to_string(),
                field: self.name.clone(),
            }),
        }
    }

    pub(crate) fn materialize_default(&self) -> Option<Value> {
        self.default.as_ref().map(|provider| provider())
    }
}

impl fmt::Debug for FieldMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMetadata")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("copiable", &self.copiable)
            .field("proxiable", &self.proxiable)
            .field("has_default", &self.default.is_some())
            .field("nested", &self.nested.as_ref().map(|s| s.name()))
            .finish()
    }
}

/// The field registry for one configurable "class".
///
/// Fields are kept in declaration order, ancestors first, deduplicated
/// by name.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Rc<FieldMetadata>>,
}

impl Schema {
    /// Starts a builder for a fresh schema.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            last_declared: None,
        }
    }

    /// Starts a builder seeded with this schema's fields.
    ///
    /// Re-declaring an inherited name overrides it in place for the new
    /// schema; the parent is never mutated.
    pub fn extend(&self, name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: self.fields.iter().map(|meta| (**meta).clone()).collect(),
            last_declared: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a field's metadata by name.
    pub fn resolve(&self, field: &str) -> Result<&FieldMetadata, SettingsError> {
        self.meta(field)
            .map(|meta| &**meta)
            .ok_or_else(|| SettingsError::UnknownField {
                schema: self.name.clone(),
                field: field.to_string(),
            })
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().map(|meta| &**meta)
    }

    pub(crate) fn meta(&self, field: &str) -> Option<&Rc<FieldMetadata>> {
        self.fields.iter().find(|meta| meta.name == field)
    }

    pub(crate) fn metas(&self) -> impl Iterator<Item = &Rc<FieldMetadata>> {
        self.fields.iter()
    }
}

/// Declaration API for building a [`Schema`].
///
/// Mirrors the instance it will govern: `setting` declares a defaulted
/// field, `required_field` an unset-until-assigned one, `nil_field` one
/// defaulting to `Nil`, and `nested` a sub-configuration that is always
/// materialized. `isnt` opts the most recent declaration out of copying
/// or proxying.
///
/// ## Example
///
/// ```
/// use rigging::{Schema, Value};
///
/// let schema = Schema::builder("Job")
///     .setting("retries", 3)
///     .required_field("queue")
///     .nested("limits", |limits| limits.setting("cpus", 2))
///     .build();
///
/// let job = schema.instantiate();
/// assert_eq!(job.get("retries")?, Value::Int(3));
/// assert!(job.check_required().is_err()); // `queue` is unset
///
/// job.set("queue", "default")?;
/// job.check_required()?;
/// # Ok::<(), rigging::SettingsError>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldMetadata>,
    last_declared: Option<usize>,
}

impl SchemaBuilder {
    /// Declares a field with a default value.
    ///
    /// A `Nested` default registers a nested field over the instance's
    /// schema instead of storing the handle (nested children are always
    /// constructed fresh per instance).
    pub fn setting(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        let name = name.into();
        match default.into() {
            Value::Nested(proto) => {
                let schema = proto.schema();
                self.nested_schema(name, schema)
            }
            value => self.setting_with(name, move || value.clone()),
        }
    }

    /// Declares a field whose default is produced by a factory, invoked
    /// fresh on every materialization.
    pub fn setting_with(
        mut self,
        name: impl Into<String>,
        provider: impl Fn() -> Value + 'static,
    ) -> Self {
        self.declare(FieldMetadata {
            name: name.into(),
            default: Some(Rc::new(provider)),
            required: false,
            copiable: true,
            proxiable: true,
            nested: None,
        });
        self
    }

    /// Declares several defaulted fields at once.
    pub fn settings<N, V>(mut self, pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        for (name, default) in pairs {
            self = self.setting(name, default);
        }
        self
    }

    /// Declares a field with no default that must be assigned before
    /// `check_required` passes.
    pub fn required_field(mut self, name: impl Into<String>) -> Self {
        self.declare(FieldMetadata {
            name: name.into(),
            default: None,
            required: true,
            copiable: true,
            proxiable: true,
            nested: None,
        });
        self
    }

    pub fn required_fields<N: Into<String>>(mut self, names: impl IntoIterator<Item = N>) -> Self {
        for name in names {
            self = self.required_field(name);
        }
        self
    }

    /// Declares a field defaulting to `Nil`.
    pub fn nil_field(self, name: impl Into<String>) -> Self {
        self.setting(name, Value::Nil)
    }

    pub fn nil_fields<N: Into<String>>(mut self, names: impl IntoIterator<Item = N>) -> Self {
        for name in names {
            self = self.nil_field(name);
        }
        self
    }

    /// Declares a nested sub-configuration, its schema built by the
    /// given declarations.
    pub fn nested(self, name: impl Into<String>, decls: impl FnOnce(SchemaBuilder) -> SchemaBuilder) -> Self {
        let name = name.into();
        let child = decls(Schema::builder(format!("{}.{}", self.name, name))).build();
        self.nested_schema(name, child)
    }

    /// Declares a nested sub-configuration over an existing schema.
    pub fn nested_schema(mut self, name: impl Into<String>, schema: Rc<Schema>) -> Self {
        self.declare(FieldMetadata {
            name: name.into(),
            default: None,
            required: false,
            copiable: true,
            proxiable: true,
            nested: Some(schema),
        });
        self
    }

    /// Opts the most recently declared field out of copying or proxying.
    ///
    /// Panics when no field has been declared yet; that is a bug in the
    /// declaring code, not a runtime condition.
    pub fn isnt(mut self, flag: FieldFlag) -> Self {
        let index = self
            .last_declared
            .expect("isnt() must follow a field declaration");
        let meta = &mut self.fields[index];
        match flag {
            FieldFlag::Copiable => meta.copiable = false,
            FieldFlag::Proxiable => meta.proxiable = false,
        }
        self
    }

    pub fn build(self) -> Rc<Schema> {
        Rc::new(Schema {
            name: self.name,
            fields: self.fields.into_iter().map(Rc::new).collect(),
        })
    }

    // Re-declaring a name overrides the earlier entry in place, keeping
    // its position in declaration order.
    fn declare(&mut self, meta: FieldMetadata) {
        match self.fields.iter().position(|f| f.name == meta.name) {
            Some(index) => {
                self.fields[index] = meta;
                self.last_declared = Some(index);
            }
            None => {
                self.fields.push(meta);
                self.last_declared = Some(self.fields.len() - 1);
            }
        }
    }
}
