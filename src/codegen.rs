//! Java class-hierarchy emitter.
//!
//! For one family this renders a single compilation unit: an abstract base
//! class with an abstract `accept`, one `static class` per variant (final
//! fields, positional constructor, `accept` override) and a nested
//! `Visitor<R>` interface with one `visit<Variant><Base>` method per variant.
//!
//! Rendering is pure and deterministic: iteration follows schema order and
//! nothing environment-dependent reaches the output.
use tracing::debug;

use crate::error::SchemaError;
use crate::schema::{FamilySpec, TypeTag, VariantSpec, is_identifier};

const INDENT: &str = "    ";

/// Render `family` into Java source for package `package`.
///
/// An empty `package` places the unit in the default package.
pub fn emit(family: &FamilySpec, package: &str) -> Result<String, SchemaError> {
    let mut cg = Codegen::new();
    cg.emit(family, package)?;
    Ok(cg.into_string())
}

/// Java spelling of a field type.
pub fn java_type(ty: &TypeTag) -> String {
    match ty {
        TypeTag::Primitive(p) => p.keyword().to_string(),
        // a self reference is spelled as the base name, never a variant
        TypeTag::Named(name) | TypeTag::Family(name) => name.clone(),
        TypeTag::Variant { family, variant } => format!("{family}.{variant}"),
        TypeTag::Sequence(item) => format!("List<{}>", element_type(item)),
    }
}

fn element_type(ty: &TypeTag) -> String {
    match ty {
        TypeTag::Primitive(p) => p.boxed().to_string(),
        other => java_type(other),
    }
}

fn uses_sequence(ty: &TypeTag) -> bool {
    matches!(ty, TypeTag::Sequence(_))
}

/// Name of the visitor method dispatched to by `variant` (`visitBinaryExpr`).
pub fn visit_method(variant: &str, base: &str) -> String {
    format!("visit{variant}{base}")
}

pub fn validate_package(package: &str) -> Result<(), SchemaError> {
    if package.is_empty() {
        return Ok(());
    }
    match package.split('.').find(|segment| !is_identifier(segment)) {
        None => Ok(()),
        Some(segment) => Err(SchemaError::InvalidIdentifier {
            location: format!("package `{package}`"),
            name: segment.to_string(),
        }),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// WRITER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Default)]
pub struct Codegen {
    out: String,
    depth: usize,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, header: &str) {
        self.line(&format!("{header} {{"));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Append the compilation unit for `family`. Nothing is written on error.
    pub fn emit(&mut self, family: &FamilySpec, package: &str) -> Result<(), SchemaError> {
        family.validate()?;
        validate_package(package)?;

        let base = family.base_name.as_str();
        if !package.is_empty() {
            self.line(&format!("package {package};"));
            self.blank();
        }
        let needs_list = family
            .variants
            .values()
            .flat_map(|v| v.fields.iter())
            .any(|f| uses_sequence(&f.ty));
        if needs_list {
            self.line("import java.util.List;");
            self.blank();
        }

        self.open(&format!("abstract class {base}"));
        self.blank();
        self.line("abstract <R> R accept(Visitor<R> visitor);");
        for variant in family.variants.values() {
            self.blank();
            self.emit_variant(variant, base);
        }
        self.blank();
        self.emit_visitor(family);
        self.close();

        debug!(family = base, variants = family.variants.len(), "rendered family");
        Ok(())
    }

    fn emit_variant(&mut self, variant: &VariantSpec, base: &str) {
        let name = variant.name.as_str();
        self.open(&format!("static class {name} extends {base}"));

        for field in &variant.fields {
            self.line(&format!("final {} {};", java_type(&field.ty), field.name));
        }
        if !variant.fields.is_empty() {
            self.blank();
        }

        let params = variant
            .fields
            .iter()
            .map(|f| format!("{} {}", java_type(&f.ty), f.name))
            .collect::<Vec<_>>()
            .join(", ");
        self.open(&format!("{name}({params})"));
        for field in &variant.fields {
            self.line(&format!("this.{0} = {0};", field.name));
        }
        self.close();
        self.blank();

        self.line("@Override");
        self.open("<R> R accept(Visitor<R> visitor)");
        self.line(&format!("return visitor.{}(this);", visit_method(name, base)));
        self.close();

        self.close();
    }

    fn emit_visitor(&mut self, family: &FamilySpec) {
        let base = family.base_name.as_str();
        let param = family.visitor_param();
        self.open("interface Visitor<R>");
        for (i, name) in family.variants.keys().enumerate() {
            if i > 0 {
                self.blank();
            }
            self.line(&format!("R {}({name} {param});", visit_method(name, base)));
        }
        self.close();
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
