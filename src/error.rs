//! Error types for schema authoring and generation.
use std::path::PathBuf;
use thiserror::Error;

/// Authoring defects in a family schema. Always raised before anything is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("family has an empty base name")]
    EmptyBaseName,

    #[error("family `{family}` declares no variants")]
    NoVariants { family: String },

    #[error("family `{family}` declares variant `{variant}` more than once")]
    DuplicateVariant { family: String, variant: String },

    #[error("variant `{family}.{variant}` declares field `{field}` more than once")]
    DuplicateField { family: String, variant: String, field: String },

    #[error("variant `{family}.{variant}` shares its name with the base type")]
    VariantShadowsBase { family: String, variant: String },

    #[error("`{name}` collides with a name the generated source already uses (in {location})")]
    ClashesWithGenerated { location: String, name: String },

    #[error("`{name}` is not a usable identifier (in {location})")]
    InvalidIdentifier { location: String, name: String },

    #[error("malformed type `{text}` (in {location}): {reason}")]
    MalformedType { location: String, text: String, reason: String },

    #[error("`{reference}` does not name a registered family or variant (in {location})")]
    UnknownReference { location: String, reference: String },

    #[error("family `{0}` is registered more than once")]
    DuplicateFamily(String),

    #[error("no family named `{0}` in the registry")]
    UnknownFamily(String),
}

/// Failure of a single generation job.
#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("i/o failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type GenResult<T> = Result<T, GenError>;
