//! The settings engine: schemas, per-instance cells, and the field
//! processor that defaults, validates, serializes, copies, and proxies
//! them.

mod error;
mod instance;
mod metadata;
mod processor;
mod proxy;
mod value;

pub use error::SettingsError;
pub use instance::{Configurable, ProxySettings};
pub use metadata::{FieldFlag, FieldMetadata, Schema, SchemaBuilder};
pub use value::Value;
