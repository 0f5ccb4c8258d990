//! Module tree emission
//!
//! Writes resolved modules to disk: one subdirectory per provider holding
//! the workspace module bodies plus the optional provider files, and a
//! single aggregate `main.tf` at the root instantiating every provider
//! directory as a module. The root file is written last so a failed run
//! never leaves a tree that looks complete.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::resolve::ResolvedModule;
use crate::{Error, Result};

/// File name of the aggregate root module file
pub const ROOT_FILE: &str = "main.tf";
/// File name for inline provider configuration text
pub const CONFIG_FILE: &str = "config.tf";
/// File name for backend configuration text
pub const BACKEND_FILE: &str = "backend.tf";
/// File name for the resolved variables file
pub const TFVARS_FILE: &str = "terraform.tfvars.json";

/// Create the output root directory
///
/// A pre-existing output directory is fatal before any work starts; this is
/// checked here rather than tolerated so a run never mixes its tree with
/// leftovers of a previous one.
pub fn prepare_output_dir(out: &Path) -> Result<()> {
    if out.exists() {
        return Err(Error::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("output directory {} already exists", out.display()),
        )));
    }
    fs::create_dir_all(out)?;
    set_mode(out, 0o740)?;
    Ok(())
}

/// Write the full module tree for the given resolved modules
pub fn write_tree(out: &Path, modules: &[ResolvedModule]) -> Result<()> {
    let mut blocks = Vec::with_capacity(modules.len());

    for module in modules {
        let dir = out.join(&module.provider);
        create_dir_tolerant(&dir)?;

        for workspace in &module.workspaces {
            write_file(
                &dir.join(format!("{}.tf", workspace.name)),
                workspace.module.as_bytes(),
                0o600,
            )?;

            let effective = effective_dir(&dir, workspace.entrypoint.as_deref())?;
            if let Some(configuration) = &module.configuration {
                write_file(&effective.join(CONFIG_FILE), configuration.as_bytes(), 0o600)?;
            }
            if let Some(backend) = &module.backend_file {
                write_file(&effective.join(BACKEND_FILE), backend.as_bytes(), 0o600)?;
            }
            if !module.vars.is_empty() {
                let body = serde_json::to_vec_pretty(&module.vars)?;
                write_file(&effective.join(TFVARS_FILE), &body, 0o600)?;
            }

            tracing::debug!(
                provider = %module.provider,
                workspace = %workspace.name,
                "workspace emitted"
            );
        }

        blocks.push(module_block(&module.provider, &module.vars));
    }

    // the aggregate root file is written last, only once every module landed
    let mut root = blocks.join("\n");
    root.push('\n');
    write_file(&out.join(ROOT_FILE), root.as_bytes(), 0o640)?;

    tracing::info!(modules = modules.len(), out = %out.display(), "module tree written");
    Ok(())
}

/// Resolve the directory the provider-level files land in
///
/// Descends into the sanitized entrypoint sub-path when one is set, creating
/// it as needed.
fn effective_dir(dir: &Path, entrypoint: Option<&str>) -> Result<PathBuf> {
    let Some(raw) = entrypoint else {
        return Ok(dir.to_path_buf());
    };

    let clean = sanitize_entrypoint(raw);
    if clean.is_empty() {
        return Ok(dir.to_path_buf());
    }

    let sub = dir.join(clean);
    fs::create_dir_all(&sub)?;
    set_mode(&sub, 0o700)?;
    Ok(sub)
}

/// Sanitize an entrypoint sub-path against directory traversal
///
/// Drops `..`, `.`, and empty segments, so the result can never escape the
/// directory it is joined to. Idempotent.
pub fn sanitize_entrypoint(raw: &str) -> String {
    raw.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Render one root-level module block
fn module_block(name: &str, vars: &BTreeMap<String, String>) -> String {
    let mut block = format!("module \"{name}\" {{\n  source = \"./{name}\"\n");
    for (key, value) in vars {
        block.push_str(&format!("  {key} = \"{}\"\n", escape(value)));
    }
    block.push('}');
    block
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Create a directory, tolerating a pre-existing one
fn create_dir_tolerant(dir: &Path) -> Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => set_mode(dir, 0o700),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    fs::write(path, contents)?;
    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
