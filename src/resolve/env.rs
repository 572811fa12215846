use std::collections::BTreeMap;

use crate::types::errors::{Error, ErrorKind, Result};

/// Expansion source for `$NAME` and `${NAME}` references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Env {
    vars: BTreeMap<String, String>,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Env {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment (non-UTF-8 entries skipped).
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    fn lookup(&self, name: &str, raw: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| {
            Error::new(
                ErrorKind::UnresolvedVariable,
                format!("`{raw}` references unset variable `{name}`"),
            )
        })
    }

    /// Expand every `$NAME` / `${NAME}` in `raw`.
    ///
    /// A `$` not followed by a name or `{` is kept literally. Unset names and
    /// unterminated `${` are errors; nothing is ever left half-expanded.
    pub fn expand(&self, raw: &str) -> Result<String> {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.char_indices().peekable();
        while let Some((_, c)) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some((_, '{')) => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(Error::new(
                            ErrorKind::InvalidSegment,
                            format!("unterminated `${{` in `{raw}`"),
                        ));
                    }
                    let valid = name.chars().next().is_some_and(is_name_start)
                        && name.chars().all(is_name_char);
                    if !valid {
                        return Err(Error::new(
                            ErrorKind::InvalidSegment,
                            format!("invalid variable name `{name}` in `{raw}`"),
                        ));
                    }
                    out.push_str(self.lookup(&name, raw)?);
                }
                Some((_, n)) if is_name_start(n) => {
                    let mut name = String::new();
                    while let Some((_, n)) = chars.peek().copied() {
                        if !is_name_char(n) {
                            break;
                        }
                        name.push(n);
                        chars.next();
                    }
                    out.push_str(self.lookup(&name, raw)?);
                }
                _ => out.push('$'),
            }
        }
        Ok(out)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Env {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
