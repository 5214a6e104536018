//! Filesystem sandboxing.
//!
//! Confines every client-supplied path to a root directory. Validation is
//! canonicalize-then-segment-compare: the candidate path (or its deepest
//! existing ancestor, for write targets) is canonicalized through symlinks
//! and must remain a path-segment descendant of the canonical root. A
//! textual prefix check would accept siblings like `root-evil` and
//! symlink escapes; `Path::starts_with` compares whole segments.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("path not found")]
    NotFound,

    #[error("path escapes the sandbox root")]
    Escape,
}

/// A validated root directory plus the resolution rules above.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Creates the root directory if missing and canonicalizes it once.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a client path that must already exist (reads, deletes).
    ///
    /// A leading `/` is root-relative. Interior `..` segments are folded
    /// lexically first; folding past the root is an escape. The existing
    /// target is then canonicalized, so a symlink pointing outside the
    /// root is also an escape. Canonicalization failures other than
    /// not-found (for example permission errors) are treated as escapes,
    /// never surfaced as a crash.
    pub fn resolve_existing(&self, requested: &str) -> Result<PathBuf, SandboxError> {
        let candidate = self.root.join(clean_relative(requested)?);

        let canonical = candidate.canonicalize().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SandboxError::NotFound,
            _ => SandboxError::Escape,
        })?;

        if canonical.starts_with(&self.root) {
            Ok(canonical)
        } else {
            Err(SandboxError::Escape)
        }
    }

    /// Resolves a client path that may not exist yet (uploads, mirrors).
    ///
    /// Same lexical folding, then the deepest existing path component is
    /// canonicalized and checked for containment — a symlinked
    /// intermediate directory pointing outside the root is an escape,
    /// and so is a pre-existing symlink at the target itself, dangling
    /// included (a write would otherwise create the file at the link's
    /// destination). Returns the absolute target for the caller to
    /// create.
    pub fn resolve_for_write(&self, requested: &str) -> Result<PathBuf, SandboxError> {
        let candidate = self.root.join(clean_relative(requested)?);

        // Deepest existing component, located without following a final
        // symlink so a dangling one cannot masquerade as "nonexistent".
        let mut existing = candidate.as_path();
        loop {
            match std::fs::symlink_metadata(existing) {
                Ok(meta) => {
                    if meta.is_symlink() {
                        let resolved =
                            existing.canonicalize().map_err(|_| SandboxError::Escape)?;
                        if !resolved.starts_with(&self.root) {
                            return Err(SandboxError::Escape);
                        }
                    }
                    break;
                }
                Err(_) => {
                    existing = existing.parent().ok_or(SandboxError::Escape)?;
                }
            }
        }

        let canonical = existing.canonicalize().map_err(|_| SandboxError::Escape)?;
        if canonical.starts_with(&self.root) {
            Ok(candidate)
        } else {
            Err(SandboxError::Escape)
        }
    }
}

/// Lexically normalizes a client path into a relative path with no `..`
/// or root components. Folding `..` past the start is an escape.
fn clean_relative(requested: &str) -> Result<PathBuf, SandboxError> {
    let mut clean = PathBuf::new();

    for component in Path::new(requested).components() {
        match component {
            Component::Normal(segment) => clean.push(segment),
            Component::ParentDir => {
                if !clean.pop() {
                    return Err(SandboxError::Escape);
                }
            }
            Component::RootDir | Component::CurDir => {}
            Component::Prefix(_) => return Err(SandboxError::Escape),
        }
    }

    Ok(clean)
}
