//! Keeps `generate --output` from clobbering the plan it reads.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Fail when `output` names the same file as `plan`.
///
/// Both sides are resolved through the filesystem first, so `..` segments
/// and symlinks cannot hide a match even when `output` does not exist yet.
pub fn refuse_plan_overwrite(output: &Path, plan: &Path) -> Result<()> {
    let target = resolve_path(output)
        .with_context(|| format!("failed to resolve output path {}", output.display()))?;
    let source = resolve_path(plan)
        .with_context(|| format!("failed to resolve plan path {}", plan.display()))?;
    if target == source {
        bail!(
            "refusing to overwrite plan file {} with output {}",
            plan.display(),
            output.display()
        );
    }
    Ok(())
}

/// Canonical form of `path`. A file that is not there yet resolves through
/// its parent directory, which must exist for the write to succeed anyway.
fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.canonicalize()?);
    }
    let Some(name) = path.file_name() else {
        bail!("{} does not name a file", path.display());
    };
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let dir = parent
        .canonicalize()
        .with_context(|| format!("directory {} is not accessible", parent.display()))?;
    Ok(dir.join(name))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{refuse_plan_overwrite, resolve_path};

    #[test]
    fn missing_file_resolves_through_parent() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("sub")).expect("sub");
        let root = dir.path().canonicalize().expect("canonical root");

        let resolved = resolve_path(&dir.path().join("sub/../out.sh")).expect("resolve");
        assert_eq!(resolved, root.join("out.sh"));
    }

    #[test]
    fn dotdot_alias_of_plan_is_refused() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("sub")).expect("sub");
        let plan = dir.path().join("gateway.toml");
        fs::write(&plan, "[gateway]\n").expect("plan");

        let err = refuse_plan_overwrite(&dir.path().join("sub/../gateway.toml"), &plan)
            .expect_err("same file");
        assert!(err.to_string().contains("refusing to overwrite plan file"));
        refuse_plan_overwrite(&dir.path().join("sub/gateway.toml"), &plan)
            .expect("different file");
    }
}
