//! The schema registry: every node family the interpreter ships with.
//!
//! One namespace across families, so a field in `Stmt` can name `Expr` or
//! `Stmt.Function` and be resolved by lookup. The content here is the
//! grammar's single source of truth; generated sources are derived from it.
use indexmap::IndexMap;

use crate::error::SchemaError;
use crate::schema::{FamilySpec, TypeTag};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    families: IndexMap<String, FamilySpec>,
    pending: Vec<SchemaError>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical expression and statement families.
    pub fn builtin() -> Self {
        Self::new().with_family(expr_family()).with_family(stmt_family())
    }

    pub fn with_family(mut self, family: FamilySpec) -> Self {
        if self.families.contains_key(&family.base_name) {
            self.pending.push(SchemaError::DuplicateFamily(family.base_name.clone()));
            return self;
        }
        self.families.insert(family.base_name.clone(), family);
        self
    }

    pub fn families(&self) -> impl Iterator<Item = &FamilySpec> {
        self.families.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    pub fn family(&self, name: &str) -> Option<&FamilySpec> {
        self.families.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&FamilySpec, SchemaError> {
        self.family(name).ok_or_else(|| SchemaError::UnknownFamily(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Validate every family, then check that cross references resolve.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if let Some(error) = self.pending.first() {
            return Err(error.clone());
        }
        for family in self.families.values() {
            family.validate()?;
        }
        self.resolve().map(|_| ())
    }

    /// Copy of the registry with bare names promoted to family references.
    ///
    /// A bare name that matches a registered base name becomes
    /// [`TypeTag::Family`]; anything else stays an opaque external type.
    /// `Family.Variant` references must name an existing variant.
    pub fn resolve(&self) -> Result<Registry, SchemaError> {
        let mut resolved = self.clone();
        for family in resolved.families.values_mut() {
            let base = family.base_name.clone();
            for variant in family.variants.values_mut() {
                for field in variant.fields.iter_mut() {
                    let location = format!("{base}.{}.{}", variant.name, field.name);
                    let mut failure = None;
                    field.ty.for_each_tag_mut(&mut |tag| {
                        if let Some(error) = self.resolve_tag(tag, &location) {
                            failure.get_or_insert(error);
                        }
                    });
                    if let Some(error) = failure {
                        return Err(error);
                    }
                }
            }
        }
        Ok(resolved)
    }

    fn resolve_tag(&self, tag: &mut TypeTag, location: &str) -> Option<SchemaError> {
        let promote = match tag {
            TypeTag::Named(name) if self.families.contains_key(name.as_str()) => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = promote {
            *tag = TypeTag::Family(name);
        }
        let known = match tag {
            TypeTag::Family(name) => self.families.contains_key(name.as_str()),
            TypeTag::Variant { family, variant } => self
                .families
                .get(family.as_str())
                .is_some_and(|f| f.variants.contains_key(variant.as_str())),
            _ => true,
        };
        if known {
            None
        } else {
            Some(SchemaError::UnknownReference {
                location: location.to_string(),
                reference: tag.to_string(),
            })
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GRAMMAR
// ————————————————————————————————————————————————————————————————————————————

fn expr_family() -> FamilySpec {
    FamilySpec::new("Expr")
        .variant("Assign", &[("Token", "name"), ("Expr", "value")])
        .variant("Binary", &[("Expr", "left"), ("Token", "operator"), ("Expr", "right")])
        .variant("Call", &[("Expr", "callee"), ("Token", "paren"), ("List<Expr>", "arguments")])
        .variant("Get", &[("Expr", "object"), ("Token", "name")])
        .variant("Grouping", &[("Expr", "expression")])
        .variant("Literal", &[("Object", "value")])
        .variant("Logical", &[("Expr", "left"), ("Token", "operator"), ("Expr", "right")])
        .variant("Set", &[("Expr", "object"), ("Token", "name"), ("Expr", "value")])
        .variant("This", &[("Token", "keyword")])
        .variant("Unary", &[("Token", "operator"), ("Expr", "right")])
        .variant("Variable", &[("Token", "name")])
}

fn stmt_family() -> FamilySpec {
    FamilySpec::new("Stmt")
        .variant("Block", &[("List<Stmt>", "statements")])
        .variant("Break", &[("Token", "token")])
        .variant("Class", &[("Token", "name"), ("List<Stmt.Function>", "methods")])
        .variant("Continue", &[("Token", "token")])
        .variant("Expression", &[("Expr", "expression")])
        .variant("Function", &[("Token", "name"), ("List<Token>", "params"), ("List<Stmt>", "body")])
        .variant("Return", &[("Token", "keyword"), ("Expr", "expression")])
        .variant("If", &[("Expr", "condition"), ("Stmt", "thenBranch"), ("Stmt", "elseBranch")])
        .variant("Var", &[("Token", "name"), ("Expr", "initializer"), ("boolean", "editable")])
        .variant("While", &[("Expr", "condition"), ("Stmt", "body")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Primitive;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_grammar_is_valid() {
        let registry = Registry::builtin();
        registry.validate().unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["Expr", "Stmt"]);
    }

    #[test]
    fn builtin_variant_order_is_declaration_order() {
        let registry = Registry::builtin();
        let stmt: Vec<_> = registry.family("Stmt").unwrap().variants.keys().cloned().collect();
        assert_eq!(
            stmt,
            ["Block", "Break", "Class", "Continue", "Expression", "Function", "Return", "If", "Var", "While"]
        );
        assert_eq!(registry.family("Expr").unwrap().variants.len(), 11);
    }

    #[test]
    fn resolution_promotes_family_names() {
        let resolved = Registry::builtin().resolve().unwrap();
        let var = &resolved.family("Stmt").unwrap().variants["Var"];
        assert_eq!(var.fields[0].ty, TypeTag::named("Token"));
        assert_eq!(var.fields[1].ty, TypeTag::Family("Expr".into()));
        assert_eq!(var.fields[2].ty, TypeTag::Primitive(Primitive::Boolean));

        let class = &resolved.family("Stmt").unwrap().variants["Class"];
        assert_eq!(
            class.fields[1].ty,
            TypeTag::sequence(TypeTag::Variant { family: "Stmt".into(), variant: "Function".into() })
        );
    }

    #[test]
    fn constructor_arity_matches_parser_call_sites() {
        let registry = Registry::builtin();
        let arity = |family: &str, variant: &str| registry.family(family).unwrap().variants[variant].fields.len();
        // `new Stmt.Function(name, parameters, body)` and friends
        assert_eq!(arity("Stmt", "Function"), 3);
        assert_eq!(arity("Stmt", "Class"), 2);
        assert_eq!(arity("Stmt", "Var"), 3);
        assert_eq!(arity("Stmt", "If"), 3);
        assert_eq!(arity("Expr", "Set"), 3);
        assert_eq!(arity("Expr", "Call"), 3);
        assert_eq!(arity("Expr", "Literal"), 1);
    }

    #[test]
    fn unknown_variant_reference_is_reported() {
        let registry = Registry::new()
            .with_family(FamilySpec::new("Stmt").variant("Class", &[("List<Stmt.Method>", "methods")]));
        assert_eq!(
            registry.validate().unwrap_err(),
            SchemaError::UnknownReference {
                location: "Stmt.Class.methods".into(),
                reference: "Stmt.Method".into(),
            }
        );
    }

    #[test]
    fn duplicate_family_is_reported() {
        let registry = Registry::builtin().with_family(FamilySpec::new("Expr").variant("Nil", &[]));
        assert_eq!(registry.validate().unwrap_err(), SchemaError::DuplicateFamily("Expr".into()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn require_names_missing_family() {
        let registry = Registry::builtin();
        assert!(registry.require("Expr").is_ok());
        assert_eq!(registry.require("Decl").unwrap_err(), SchemaError::UnknownFamily("Decl".into()));
    }
}
