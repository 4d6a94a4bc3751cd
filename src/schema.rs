//! Declarative description of an AST node family.
//!
//! A family is one base type plus an ordered set of variants; each variant is
//! an ordered list of fields. Order is significant everywhere: it becomes the
//! order of generated field declarations and constructor parameters.
//!
//! Field types are written in a small authoring notation (`Expr`, `boolean`,
//! `List<Stmt.Function>`) and parsed into [`TypeTag`]s. Tags are structural;
//! whether a bare name refers to another family is settled by the registry.
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::SchemaError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Boolean,
    Int,
    Long,
    Double,
    Char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Primitive(Primitive),
    /// Opaque external type, emitted verbatim (`Token`, `Object`).
    Named(String),
    /// Base type of a registered family (self or cross-family).
    Family(String),
    /// One concrete variant of a registered family (`Stmt.Function`).
    Variant { family: String, variant: String },
    Sequence(Box<TypeTag>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub ty: TypeTag,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilySpec {
    pub base_name: String,
    pub variants: IndexMap<String, VariantSpec>,
    /// Authoring mistakes caught while building; surfaced by `validate`.
    #[serde(skip)]
    pending: Vec<SchemaError>,
}

// ————————————————————————————————————————————————————————————————————————————
// IDENTIFIERS
// ————————————————————————————————————————————————————————————————————————————

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern compiles")
});

const RESERVED: &[&str] = &[
    "_", "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Type names every generated file refers to unqualified: the nested visitor
/// interface, its type parameter, the `@Override` annotation and `List`.
const GENERATED: &[&str] = &["Visitor", "R", "Override", "List"];

fn check_type_name(name: &str, location: impl Into<String>) -> Result<(), SchemaError> {
    if GENERATED.contains(&name) {
        return Err(SchemaError::ClashesWithGenerated { location: location.into(), name: name.to_string() });
    }
    Ok(())
}

/// A name the target language accepts as a declared identifier.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !RESERVED.contains(&name)
}

fn check_identifier(name: &str, location: impl Into<String>) -> Result<(), SchemaError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier { location: location.into(), name: name.to_string() })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE TAGS
// ————————————————————————————————————————————————————————————————————————————

impl Primitive {
    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Double => "double",
            Primitive::Char => "char",
        }
    }

    /// Reference type used where generics require one.
    pub fn boxed(self) -> &'static str {
        match self {
            Primitive::Boolean => "Boolean",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Double => "Double",
            Primitive::Char => "Character",
        }
    }

    fn from_keyword(text: &str) -> Option<Self> {
        match text {
            "boolean" => Some(Primitive::Boolean),
            "int" => Some(Primitive::Int),
            "long" => Some(Primitive::Long),
            "double" => Some(Primitive::Double),
            "char" => Some(Primitive::Char),
            _ => None,
        }
    }
}

impl TypeTag {
    pub fn named(name: impl Into<String>) -> Self {
        TypeTag::Named(name.into())
    }

    pub fn sequence(item: TypeTag) -> Self {
        TypeTag::Sequence(Box::new(item))
    }

    /// Parse the authoring notation, naming `location` in any error.
    pub fn parse_in(text: &str, location: &str) -> Result<Self, SchemaError> {
        parse_tag(text.trim()).map_err(|reason| SchemaError::MalformedType {
            location: location.to_string(),
            text: text.to_string(),
            reason: reason.to_string(),
        })
    }

    fn validate(&self, location: &str) -> Result<(), SchemaError> {
        match self {
            TypeTag::Primitive(_) => Ok(()),
            TypeTag::Named(name) | TypeTag::Family(name) => check_identifier(name, location),
            TypeTag::Variant { family, variant } => {
                check_identifier(family, location)?;
                check_identifier(variant, location)
            }
            TypeTag::Sequence(item) => item.validate(location),
        }
    }

    /// The opaque external type this tag (or its element) is written as.
    fn external_name(&self) -> Option<&str> {
        match self {
            TypeTag::Named(name) => Some(name.as_str()),
            TypeTag::Sequence(item) => item.external_name(),
            _ => None,
        }
    }

    /// Visit every name this tag could refer to in the registry.
    pub(crate) fn for_each_tag_mut(&mut self, f: &mut impl FnMut(&mut TypeTag)) {
        if let TypeTag::Sequence(item) = self {
            item.for_each_tag_mut(f);
        }
        f(self);
    }
}

fn parse_tag(text: &str) -> Result<TypeTag, &'static str> {
    if text.is_empty() {
        return Err("empty type");
    }
    if let Some(open) = text.find('<') {
        if !text.ends_with('>') {
            return Err("unbalanced angle brackets");
        }
        let head = text[..open].trim();
        let inner = &text[open + 1..text.len() - 1];
        if head != "List" {
            return Err("only List<...> sequences are supported");
        }
        return Ok(TypeTag::sequence(parse_tag(inner.trim())?));
    }
    if text.contains('>') {
        return Err("unbalanced angle brackets");
    }
    if let Some((family, variant)) = text.split_once('.') {
        if !IDENTIFIER.is_match(family) || !IDENTIFIER.is_match(variant) {
            return Err("variant references take the form Family.Variant");
        }
        return Ok(TypeTag::Variant { family: family.to_string(), variant: variant.to_string() });
    }
    if let Some(primitive) = Primitive::from_keyword(text) {
        return Ok(TypeTag::Primitive(primitive));
    }
    if !IDENTIFIER.is_match(text) {
        return Err("not an identifier");
    }
    Ok(TypeTag::named(text))
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Primitive(p) => f.write_str(p.keyword()),
            TypeTag::Named(name) | TypeTag::Family(name) => f.write_str(name),
            TypeTag::Variant { family, variant } => write!(f, "{family}.{variant}"),
            TypeTag::Sequence(item) => write!(f, "List<{item}>"),
        }
    }
}

impl FromStr for TypeTag {
    type Err = SchemaError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse_in(text, "type tag")
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FAMILIES
// ————————————————————————————————————————————————————————————————————————————

impl FieldSpec {
    pub fn new(ty: TypeTag, name: impl Into<String>) -> Self {
        Self { ty, name: name.into() }
    }
}

impl VariantSpec {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self { name: name.into(), fields }
    }
}

impl FamilySpec {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self { base_name: base_name.into(), variants: IndexMap::new(), pending: Vec::new() }
    }

    /// Append a variant whose fields are `(type, name)` pairs in authoring notation.
    pub fn variant(mut self, name: &str, fields: &[(&str, &str)]) -> Self {
        let mut specs = Vec::with_capacity(fields.len());
        for (ty, field) in fields {
            let location = format!("{}.{name}.{field}", self.base_name);
            match TypeTag::parse_in(ty, &location) {
                Ok(tag) => specs.push(FieldSpec::new(tag, *field)),
                Err(error) => self.pending.push(error),
            }
        }
        self.with_variant(VariantSpec::new(name, specs))
    }

    pub fn with_variant(mut self, variant: VariantSpec) -> Self {
        if self.variants.contains_key(&variant.name) {
            self.pending.push(SchemaError::DuplicateVariant {
                family: self.base_name.clone(),
                variant: variant.name.clone(),
            });
            return self;
        }
        self.variants.insert(variant.name.clone(), variant);
        self
    }

    /// Parameter name used in visitor methods (`Expr` → `expr`).
    pub fn visitor_param(&self) -> String {
        self.base_name.to_lowercase()
    }

    /// Reject anything that would make generated output ill-formed.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let family = &self.base_name;
        if family.is_empty() {
            return Err(SchemaError::EmptyBaseName);
        }
        check_identifier(family, "family base name")?;
        check_type_name(family, "family base name")?;
        check_identifier(&self.visitor_param(), format!("visitor parameter of `{family}`"))?;
        if let Some(error) = self.pending.first() {
            return Err(error.clone());
        }
        if self.variants.is_empty() {
            return Err(SchemaError::NoVariants { family: family.clone() });
        }
        // a nested variant class hides any outside type of the same name
        let external: HashSet<&str> = self
            .variants
            .values()
            .flat_map(|v| &v.fields)
            .filter_map(|f| f.ty.external_name())
            .collect();
        for (key, variant) in &self.variants {
            check_identifier(key, format!("family `{family}`"))?;
            if key != &variant.name {
                return Err(SchemaError::InvalidIdentifier {
                    location: format!("family `{family}` (registered as `{key}`)"),
                    name: variant.name.clone(),
                });
            }
            if key == family {
                return Err(SchemaError::VariantShadowsBase {
                    family: family.clone(),
                    variant: key.clone(),
                });
            }
            check_type_name(key, format!("family `{family}`"))?;
            if external.contains(key.as_str()) {
                return Err(SchemaError::ClashesWithGenerated {
                    location: format!("family `{family}`, field type"),
                    name: key.clone(),
                });
            }
            let mut seen = HashSet::new();
            for field in &variant.fields {
                let location = format!("{family}.{key}.{}", field.name);
                check_identifier(&field.name, location.as_str())?;
                field.ty.validate(&location)?;
                if !seen.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        family: family.clone(),
                        variant: key.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
