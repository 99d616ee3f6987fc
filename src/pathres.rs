//! Path Resolver — canonicalizes user-supplied paths against a working
//! root; expands home and well-known-directory tokens; detects
//! out-of-root writes.
//!
//! Generalizes the `full_path.starts_with(&self.allowed_dir)` containment
//! check every file tool used to do on its own (see `tools::read_file`,
//! `tools::write_file` and `tools::read_file`) into one shared component.

use std::path::{Component, Path, PathBuf};

const WELL_KNOWN_DIRS: &[&str] = &[
    "desktop",
    "downloads",
    "documents",
    "pictures",
    "music",
    "videos",
];

/// Resolves relative/home/well-known-dir paths against a fixed working
/// root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    home: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            home: dirs::home_dir(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` into an absolute, lexically normalized path.
    ///
    /// Rules (in order): expand `$VAR`/`${VAR}` environment references;
    /// substitute the home directory for `~` or a `~/...` prefix;
    /// prepend the home directory when the first segment case-
    /// insensitively names a well-known user directory and the path is
    /// not already rooted or explicitly relative (`./`, `../`);
    /// otherwise, if relative, join against the working root; finally
    /// normalize lexically (no filesystem access, so this works for
    /// paths that don't exist yet).
    pub fn resolve(&self, path: &str) -> PathBuf {
        let expanded = expand_env(path);

        if expanded == "~" || expanded.starts_with("~/") {
            let rest = expanded.strip_prefix('~').unwrap_or("");
            let rest = rest.strip_prefix('/').unwrap_or(rest);
            let home = self.home.clone().unwrap_or_else(|| PathBuf::from("/"));
            return normalize(&home.join(rest));
        }

        let candidate = PathBuf::from(&expanded);

        if !candidate.is_absolute() && !is_explicitly_relative(&expanded) {
            if let Some(first) = candidate.components().next() {
                if let Component::Normal(seg) = first {
                    if let Some(seg_str) = seg.to_str() {
                        if WELL_KNOWN_DIRS.contains(&seg_str.to_lowercase().as_str()) {
                            let home = self.home.clone().unwrap_or_else(|| PathBuf::from("/"));
                            return normalize(&home.join(&candidate));
                        }
                    }
                }
            }
        }

        if candidate.is_absolute() {
            normalize(&candidate)
        } else {
            normalize(&self.root.join(&candidate))
        }
    }

    /// True unless the normalized path, made relative to `root`, is `.`
    /// or strictly below it (i.e. never `..` or a sibling subtree).
    pub fn is_outside_root(&self, abs: &Path) -> bool {
        is_outside_root(&self.root, abs)
    }
}

/// Free function form used by tools that only need the containment
/// check against an already-known root.
pub fn is_outside_root(root: &Path, abs: &Path) -> bool {
    let root = normalize(root);
    let abs = normalize(abs);
    match abs.strip_prefix(&root) {
        Ok(rel) => rel
            .components()
            .any(|c| matches!(c, Component::ParentDir)),
        Err(_) => true,
    }
}

fn is_explicitly_relative(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../") || path == "." || path == ".."
}

/// Expand `$VAR` and `${VAR}` references using the current process
/// environment. Unknown variables are left untouched.
fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() {
            if bytes[i + 1] == b'{' {
                if let Some(end) = input[i + 2..].find('}') {
                    let name = &input[i + 2..i + 2 + end];
                    if let Ok(val) = std::env::var(name) {
                        out.push_str(&val);
                        i += 2 + end + 1;
                        continue;
                    }
                }
            } else if bytes[i + 1].is_ascii_alphabetic() || bytes[i + 1] == b'_' {
                let rest = &input[i + 1..];
                let end = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len());
                let name = &rest[..end];
                if let Ok(val) = std::env::var(name) {
                    out.push_str(&val);
                    i += 1 + end;
                    continue;
                }
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

/// Lexically normalize a path: collapse `.` and resolve `..` against
/// prior components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_joins_root() {
        let resolver = PathResolver::new("/work");
        assert_eq!(resolver.resolve("a/b.txt"), PathBuf::from("/work/a/b.txt"));
    }

    #[test]
    fn absolute_path_is_normalized_unchanged() {
        let resolver = PathResolver::new("/work");
        assert_eq!(resolver.resolve("/etc/passwd"), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn dotdot_joined_under_root_escapes_root() {
        let resolver = PathResolver::new("/work");
        let resolved = resolver.resolve("../outside");
        assert!(resolver.is_outside_root(&resolved));
    }

    #[test]
    fn root_itself_is_not_outside() {
        let resolver = PathResolver::new("/work");
        let resolved = resolver.resolve(".");
        assert!(!resolver.is_outside_root(&resolved));
    }

    #[test]
    fn resolve_is_idempotent_on_absolute_paths() {
        let resolver = PathResolver::new("/work");
        let once = resolver.resolve("/a/./b/../c");
        let twice = resolver.resolve(once.to_str().unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn explicit_relative_well_known_name_is_not_home_prefixed() {
        let resolver = PathResolver::new("/work");
        let resolved = resolver.resolve("./Desktop/file.txt");
        assert_eq!(resolved, PathBuf::from("/work/Desktop/file.txt"));
    }
}
