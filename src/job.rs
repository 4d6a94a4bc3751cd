//! Generation jobs: one family rendered into one destination file.
//!
//! Output is assembled fully in memory before the destination is touched, and
//! the write truncates, so a regenerated file never keeps stale content and a
//! job that fails on its schema leaves no file behind.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::codegen;
use crate::error::{GenError, GenResult};
use crate::registry::Registry;
use crate::schema::FamilySpec;

#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub family: FamilySpec,
    pub destination: PathBuf,
    pub package: String,
}

/// How a destination compares with what would be generated now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    Missing,
}

impl GenerationJob {
    pub fn new(family: FamilySpec, destination: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self { family, destination: destination.into(), package: package.into() }
    }

    /// One job per selected family, writing `<out_dir>/<Base>.java`.
    ///
    /// An empty `only` selects every family in registry order.
    pub fn plan(registry: &Registry, out_dir: &Path, package: &str, only: &[String]) -> GenResult<Vec<Self>> {
        registry.validate()?;
        let registry = registry.resolve()?;
        let selected = if only.is_empty() {
            registry.families().collect::<Vec<_>>()
        } else {
            only.iter()
                .map(|name| registry.require(name))
                .collect::<Result<Vec<_>, _>>()?
        };
        let jobs = selected
            .into_iter()
            .map(|family| {
                let destination = out_dir.join(format!("{}.java", family.base_name));
                Self::new(family.clone(), destination, package)
            })
            .collect();
        Ok(jobs)
    }

    pub fn render(&self) -> GenResult<String> {
        Ok(codegen::emit(&self.family, &self.package)?)
    }

    /// Render, then replace the destination. Returns the bytes written.
    pub fn write(&self, create_dirs: bool) -> GenResult<usize> {
        let source = self.render()?;
        if create_dirs {
            if let Some(parent) = self.destination.parent() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        fs::write(&self.destination, &source).map_err(|e| self.io_error(e))?;
        info!(
            family = %self.family.base_name,
            destination = %self.destination.display(),
            bytes = source.len(),
            "wrote generated source"
        );
        Ok(source.len())
    }

    pub fn check(&self) -> GenResult<Freshness> {
        let source = self.render()?;
        match fs::read_to_string(&self.destination) {
            Ok(existing) if existing == source => Ok(Freshness::Fresh),
            Ok(_) => {
                warn!(destination = %self.destination.display(), "generated source is stale");
                Ok(Freshness::Stale)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Freshness::Missing),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: io::Error) -> GenError {
        GenError::Io { path: self.destination.clone(), source }
    }
}

/// Write every job in order, stopping at the first failure.
///
/// Files written before the failure are left as they are; later jobs are not
/// attempted.
pub fn run_jobs(jobs: &[GenerationJob], create_dirs: bool) -> GenResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(jobs.len());
    for job in jobs {
        job.write(create_dirs)?;
        written.push(job.destination.clone());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn all(registry: &Registry, dir: &Path) -> Vec<GenerationJob> {
        GenerationJob::plan(registry, dir, "hvu.jfox", &[]).expect("plan")
    }

    #[test]
    fn plan_targets_one_file_per_family() {
        let dir = tempdir().unwrap();
        let jobs = all(&Registry::builtin(), dir.path());
        let destinations: Vec<_> = jobs.iter().map(|j| j.destination.clone()).collect();
        assert_eq!(destinations, [dir.path().join("Expr.java"), dir.path().join("Stmt.java")]);

        let only = GenerationJob::plan(&Registry::builtin(), dir.path(), "lox", &["Stmt".into()]).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].family.base_name, "Stmt");
        assert_eq!(only[0].package, "lox");
    }

    #[test]
    fn plan_rejects_unknown_family() {
        let err = GenerationJob::plan(&Registry::builtin(), Path::new("out"), "lox", &["Decl".into()]).unwrap_err();
        assert!(matches!(err, GenError::Schema(SchemaError::UnknownFamily(name)) if name == "Decl"));
    }

    #[test]
    fn run_writes_rendered_sources() {
        let dir = tempdir().unwrap();
        let jobs = all(&Registry::builtin(), dir.path());
        let written = run_jobs(&jobs, false).unwrap();
        assert_eq!(written.len(), 2);
        for job in &jobs {
            let on_disk = fs::read_to_string(&job.destination).unwrap();
            assert_eq!(on_disk, job.render().unwrap());
        }
        let expr = fs::read_to_string(dir.path().join("Expr.java")).unwrap();
        assert!(expr.contains("R visitBinaryExpr(Binary expr);"));
    }

    #[test]
    fn regeneration_replaces_removed_variants() {
        let dir = tempdir().unwrap();
        let registry = Registry::builtin();
        let mut job = GenerationJob::plan(&registry, dir.path(), "hvu.jfox", &["Expr".into()]).unwrap().remove(0);
        job.write(false).unwrap();
        let first = fs::read_to_string(&job.destination).unwrap();
        assert!(first.contains("static class Logical extends Expr"));

        job.family.variants.shift_remove("Logical");
        job.family.variants.shift_remove("Set");
        let bytes = job.write(false).unwrap();
        let second = fs::read_to_string(&job.destination).unwrap();
        assert_eq!(second.len(), bytes);
        assert!(second.len() < first.len());
        assert!(!second.contains("Logical"));
        assert!(!second.contains("visitSetExpr"));
        assert_eq!(second, job.render().unwrap());
    }

    #[test]
    fn missing_directory_is_an_io_error_unless_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("src/main/java");
        let job = GenerationJob::plan(&Registry::builtin(), &nested, "lox", &["Expr".into()]).unwrap().remove(0);

        match job.write(false) {
            Err(GenError::Io { path, source }) => {
                assert_eq!(path, nested.join("Expr.java"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected: {other:?}"),
        }
        job.write(true).unwrap();
        assert!(nested.join("Expr.java").is_file());
    }

    #[test]
    fn schema_error_leaves_no_file() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("Expr.java");
        let job = GenerationJob::new(FamilySpec::new("Expr"), destination.clone(), "lox");
        let err = job.write(false).unwrap_err();
        assert!(matches!(err, GenError::Schema(SchemaError::NoVariants { .. })));
        assert!(!destination.exists());
    }

    #[test]
    fn run_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        let broken = GenerationJob::new(
            Registry::builtin().family("Expr").unwrap().clone(),
            dir.path().join("missing/Expr.java"),
            "lox",
        );
        let fine = GenerationJob::new(
            Registry::builtin().family("Stmt").unwrap().clone(),
            dir.path().join("Stmt.java"),
            "lox",
        );
        assert!(run_jobs(&[broken, fine], false).is_err());
        assert!(!dir.path().join("Stmt.java").exists());
    }

    #[test]
    fn check_reports_freshness() {
        let dir = tempdir().unwrap();
        let job = GenerationJob::plan(&Registry::builtin(), dir.path(), "lox", &["Stmt".into()]).unwrap().remove(0);
        assert_eq!(job.check().unwrap(), Freshness::Missing);
        job.write(false).unwrap();
        assert_eq!(job.check().unwrap(), Freshness::Fresh);
        fs::write(&job.destination, "package lox;\n").unwrap();
        assert_eq!(job.check().unwrap(), Freshness::Stale);
    }
}
