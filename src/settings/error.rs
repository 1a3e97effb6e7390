use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("unknown field `{field}` on `{schema}`")]
    UnknownField { schema: String, field: String },

    #[error("no default value for field `{field}` on `{schema}`")]
    NoDefaultValue { schema: String, field: String },

    #[error("field `{field}` has no value")]
    FieldUnset { field: String },

    #[error("Required fields unset: {}", .fields.join(", "))]
    RequiredFieldsUnset { fields: Vec<String> },

    #[error("proxy chain for field `{field}` did not terminate")]
    CircularProxy { field: String },

    #[error("field `{field}` does not hold a nested configurable")]
    NotNested { field: String },

    #[error("failed to deserialize settings: {0}")]
    Deserialize(#[from] toml::de::Error),
}
