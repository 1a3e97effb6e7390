pub mod dirs;
pub mod load;
pub mod settings;

mod error;

pub use dirs::{DirectoryPlan, DirectoryStructure, Node};
pub use error::Error;
pub use load::{LoadError, Loader};
pub use settings::{Configurable, FieldFlag, Schema, SchemaBuilder, SettingsError, Value};
