use serde::Serialize;

use super::errors::{Error, ErrorKind, Result};

/// Path-key convention of a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PathStyle {
    /// OS path separator, paths as given (relative bases stay relative).
    Filesystem,
    /// Forward-slash keys with no leading separator.
    ObjectKey,
}

impl PathStyle {
    #[must_use]
    pub const fn separator(self) -> char {
        match self {
            PathStyle::Filesystem => std::path::MAIN_SEPARATOR,
            PathStyle::ObjectKey => '/',
        }
    }

    fn is_sep(self, c: char) -> bool {
        match self {
            PathStyle::Filesystem => c == '/' || c == std::path::MAIN_SEPARATOR,
            PathStyle::ObjectKey => c == '/',
        }
    }

    /// Join a validated segment onto a normalized base.
    #[must_use]
    pub fn join(self, base: &str, segment: &str) -> String {
        if base.is_empty() {
            return segment.to_string();
        }
        let sep = self.separator();
        if base.ends_with(sep) {
            format!("{base}{segment}")
        } else {
            format!("{base}{sep}{segment}")
        }
    }

    /// Normalize a caller-supplied base path to this style.
    ///
    /// Filesystem bases keep their leading `/` or `./`, lose trailing separators and
    /// use the OS separator. Object-key bases lose leading and trailing `/`, empty and `.`
    /// segments, and may not contain `..`.
    pub fn normalize_base(self, raw: &str) -> Result<String> {
        match self {
            PathStyle::Filesystem => {
                if raw.is_empty() {
                    return Err(Error::new(ErrorKind::InvalidSegment, "empty base path"));
                }
                let sep = self.separator();
                let mut s: String = raw.chars().map(|c| if self.is_sep(c) { sep } else { c }).collect();
                while s.len() > 1 && s.ends_with(sep) {
                    s.pop();
                }
                Ok(s)
            }
            PathStyle::ObjectKey => {
                let mut parts: Vec<&str> = Vec::new();
                for seg in raw.split(['/', '\\']) {
                    match seg {
                        "" | "." => {}
                        ".." => {
                            return Err(Error::new(
                                ErrorKind::PathTraversal,
                                format!("object key base `{raw}` contains `..`"),
                            ))
                        }
                        s => parts.push(s),
                    }
                }
                Ok(parts.join("/"))
            }
        }
    }

    /// Split `path` below `root` into segments. `None` when `path` is not strictly below `root`.
    #[must_use]
    pub fn relative_segments(self, root: &str, path: &str) -> Option<Vec<String>> {
        let rest = if root.is_empty() {
            match self {
                PathStyle::ObjectKey => path,
                PathStyle::Filesystem => return None,
            }
        } else {
            let rest = path.strip_prefix(root)?;
            if root.ends_with(self.separator()) {
                rest
            } else {
                let mut chars = rest.chars();
                match chars.next() {
                    Some(c) if self.is_sep(c) => chars.as_str(),
                    _ => return None,
                }
            }
        };
        if rest.is_empty() {
            return None;
        }
        let mut out = Vec::new();
        for seg in rest.split(|c| self.is_sep(c)) {
            match seg {
                "" | "." | ".." => return None,
                s => out.push(s.to_string()),
            }
        }
        Some(out)
    }

    #[must_use]
    pub fn is_strict_descendant(self, root: &str, path: &str) -> bool {
        self.relative_segments(root, path).is_some()
    }

    /// Segments of `base` with `.` dropped and `..` folded away. Relative filesystem
    /// bases are anchored at the current directory first. Purely lexical: symlinks are
    /// not followed.
    #[must_use]
    pub fn anchored_segments(self, base: &str) -> Vec<String> {
        let anchored;
        let base = match self {
            PathStyle::Filesystem if !std::path::Path::new(base).is_absolute() => {
                anchored = std::env::current_dir()
                    .map(|d| d.join(base).to_string_lossy().into_owned())
                    .unwrap_or_else(|_| base.to_string());
                anchored.as_str()
            }
            _ => base,
        };
        let mut out: Vec<String> = Vec::new();
        for seg in base.split(|c| self.is_sep(c)) {
            match seg {
                "" | "." => {}
                ".." => {
                    out.pop();
                }
                s => out.push(s.to_string()),
            }
        }
        out
    }

    /// `path` is `root` itself or lies below it, however either is spelled.
    #[must_use]
    pub fn same_or_inside(self, root: &str, path: &str) -> bool {
        self.anchored_segments(path).starts_with(&self.anchored_segments(root))
    }
}

/// A path proven to lie strictly below a root.
///
/// Every path the engine hands to a mutating adapter call is built through this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafePath {
    root: String,
    rel: Vec<String>,
    style: PathStyle,
}

impl SafePath {
    /// Creates a SafePath from a root and a candidate path.
    ///
    /// # Errors
    ///
    /// `PathTraversal` when the candidate is equal to, above, or outside the root, or
    /// contains `.`/`..` segments.
    pub fn from_rooted(root: &str, candidate: &str, style: PathStyle) -> Result<Self> {
        match style.relative_segments(root, candidate) {
            Some(rel) => Ok(SafePath {
                root: root.to_string(),
                rel,
                style,
            }),
            None => Err(Error::new(
                ErrorKind::PathTraversal,
                format!("`{candidate}` is not strictly below `{root}`"),
            )
            .at(candidate)),
        }
    }

    /// Extend this path by one already-validated segment.
    #[must_use]
    pub fn child(&self, segment: &str) -> SafePath {
        let mut rel = self.rel.clone();
        rel.push(segment.to_string());
        SafePath {
            root: self.root.clone(),
            rel,
            style: self.style,
        }
    }

    #[must_use]
    pub fn as_path(&self) -> String {
        self.rel
            .iter()
            .fold(self.root.clone(), |acc, seg| self.style.join(&acc, seg))
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[must_use]
    pub fn rel(&self) -> &[String] {
        &self.rel
    }

    /// Relative part joined with `/`, independent of root and style.
    #[must_use]
    pub fn rel_key(&self) -> String {
        self.rel.join("/")
    }
}
