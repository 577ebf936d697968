//! Lexical path helpers.
//!
//! Everything here works on the textual form of a path; nothing touches the
//! filesystem or resolves symlinks.

use std::path::{Component, Path, PathBuf};

/// Clean a directory argument as given on the command line: trailing
/// slashes and a leading `./` are dropped, `.` and `/` survive as-is.
pub fn clean_arg(arg: &str) -> String {
    let trimmed = arg.trim_end_matches('/');
    if trimmed.is_empty() {
        // The argument was "/" or all slashes.
        return if arg.is_empty() { ".".into() } else { "/".into() };
    }
    if trimmed == "." {
        return ".".into();
    }
    trimmed.strip_prefix("./").unwrap_or(trimmed).to_string()
}

/// Join a relative path and a child name, where `.` is the identity on
/// both sides.
pub fn join_rel(base: &str, name: &str) -> String {
    if name == "." {
        return base.to_string();
    }
    if base == "." || base.is_empty() {
        return name.to_string();
    }
    if base.ends_with('/') {
        return format!("{base}{name}");
    }
    format!("{base}/{name}")
}

/// Resolve a path to absolute form against the current directory, then
/// normalize it lexically.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    normalize(&joined)
}

/// Remove `.` components and apply `..` components lexically.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = path.is_absolute();
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                // Above the root of an absolute path, ".." is a no-op.
                if !out.pop() && !absolute {
                    out.push("..");
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

/// Rewrite a path that starts with the home directory into `~`-relative
/// form. Paths outside home pass through unchanged.
pub fn homify(home: Option<&str>, path: &str) -> String {
    if let Some(home) = home {
        if !home.is_empty() {
            if path == home {
                return "~".to_string();
            }
            if let Some(rest) = path.strip_prefix(home) {
                if rest.starts_with('/') {
                    return format!("~{rest}");
                }
            }
        }
    }
    path.to_string()
}

/// Split a filename into its stem and extension.
///
/// Follows `Path::file_stem`/`Path::extension` semantics: dotless names and
/// dotfiles like `.bashrc` have no extension.
pub fn split_name(name: &str) -> (String, Option<String>) {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());
    (stem, ext)
}
