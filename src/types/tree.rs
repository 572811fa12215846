//! Declarative tree description: an ordered mapping of names to directories or files.
//!
//! Keys beginning with `_` are metadata, never nodes. `_perms` on a directory carries a
//! permission mode applied after the directory is created.
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::constants::{EMPTY_FILE_MARKER, METADATA_PREFIX, PERMS_KEY};

/// Content of a file node.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum FileContent {
    #[default]
    Empty,
    Bytes(Vec<u8>),
}

impl FileContent {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() || s == EMPTY_FILE_MARKER {
            FileContent::Empty
        } else {
            FileContent::Bytes(s.into_bytes())
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Empty => &[],
            FileContent::Bytes(b) => b,
        }
    }
}

/// A single value in a [`TreeSpec`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    Dir(TreeSpec),
    File(FileContent),
}

/// Ordered mapping from name to entry. Insertion order is significant.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TreeSpec {
    entries: Vec<(String, Entry)>,
    perms: Option<u32>,
}

impl TreeSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`. A replaced key keeps its original position.
    ///
    /// A name starting with `_` is metadata: it is stored but [`iter`](Self::iter) and
    /// every walk built on it skip it, the same as for loaded documents.
    pub fn insert(&mut self, name: impl Into<String>, entry: Entry) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = entry;
        } else {
            self.entries.push((name, entry));
        }
    }

    #[must_use]
    pub fn dir(mut self, name: impl Into<String>, sub: TreeSpec) -> Self {
        self.insert(name, Entry::Dir(sub));
        self
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(name, Entry::File(FileContent::text(content)));
        self
    }

    #[must_use]
    pub fn bytes(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, Entry::File(FileContent::Bytes(content.into())));
        self
    }

    #[must_use]
    pub fn empty_file(mut self, name: impl Into<String>) -> Self {
        self.insert(name, Entry::File(FileContent::Empty));
        self
    }

    #[must_use]
    pub fn with_perms(mut self, mode: u32) -> Self {
        self.perms = Some(mode);
        self
    }

    #[must_use]
    pub fn perms(&self) -> Option<u32> {
        self.perms
    }

    /// Node entries in insertion order. Metadata names are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries
            .iter()
            .filter(|(k, _)| !k.starts_with(METADATA_PREFIX))
            .map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Total number of nodes at every depth.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.iter()
            .map(|(_, e)| match e {
                Entry::Dir(sub) => 1 + sub.node_count(),
                Entry::File(_) => 1,
            })
            .sum()
    }

    pub fn from_json_str(s: &str) -> crate::types::errors::Result<Self> {
        serde_json::from_str(s).map_err(|e| {
            crate::types::errors::Error::new(
                crate::types::errors::ErrorKind::InvalidSpec,
                format!("invalid JSON tree: {e}"),
            )
        })
    }

    pub fn from_yaml_str(s: &str) -> crate::types::errors::Result<Self> {
        serde_yaml::from_str(s).map_err(|e| {
            crate::types::errors::Error::new(
                crate::types::errors::ErrorKind::InvalidSpec,
                format!("invalid YAML tree: {e}"),
            )
        })
    }
}

fn visit_tree<'de, M: MapAccess<'de>>(mut map: M) -> Result<TreeSpec, M::Error> {
    let mut spec = TreeSpec::new();
    while let Some(key) = map.next_key::<String>()? {
        if key.starts_with(METADATA_PREFIX) {
            let value: serde_json::Value = map.next_value()?;
            if key == PERMS_KEY {
                let mode = value
                    .as_u64()
                    .and_then(|m| u32::try_from(m).ok())
                    .ok_or_else(|| de::Error::custom(format!("{PERMS_KEY} must be an integer mode")))?;
                spec.perms = Some(mode);
            }
            continue;
        }
        if spec.entries.iter().any(|(k, _)| *k == key) {
            return Err(de::Error::custom(format!("duplicate name `{key}`")));
        }
        let entry: Entry = map.next_value()?;
        spec.entries.push((key, entry));
    }
    Ok(spec)
}

struct TreeVisitor;

impl<'de> Visitor<'de> for TreeVisitor {
    type Value = TreeSpec;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping of names to directories or file contents")
    }

    fn visit_map<M: MapAccess<'de>>(self, map: M) -> Result<TreeSpec, M::Error> {
        visit_tree(map)
    }
}

impl<'de> Deserialize<'de> for TreeSpec {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_map(TreeVisitor)
    }
}

struct EntryVisitor;

impl<'de> Visitor<'de> for EntryVisitor {
    type Value = Entry;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping (directory), text or bytes (file), or null (empty file)")
    }

    fn visit_map<M: MapAccess<'de>>(self, map: M) -> Result<Entry, M::Error> {
        visit_tree(map).map(Entry::Dir)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::text(v)))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::text(v)))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::Bytes(v.to_vec())))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::Empty))
    }

    fn visit_none<E: de::Error>(self) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::Empty))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::text(v.to_string())))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::text(v.to_string())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::text(v.to_string())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Entry, E> {
        Ok(Entry::File(FileContent::text(v.to_string())))
    }

    fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Entry, S::Error> {
        let mut out = Vec::new();
        while let Some(b) = seq.next_element::<u8>()? {
            out.push(b);
        }
        Ok(Entry::File(FileContent::Bytes(out)))
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(EntryVisitor)
    }
}

impl Serialize for TreeSpec {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.perms.is_some());
        let mut m = s.serialize_map(Some(self.len() + extra))?;
        if let Some(p) = self.perms {
            m.serialize_entry(PERMS_KEY, &p)?;
        }
        for (k, v) in self.iter() {
            m.serialize_entry(k, v)?;
        }
        m.end()
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Dir(sub) => sub.serialize(s),
            Entry::File(FileContent::Empty) => s.serialize_str(""),
            Entry::File(FileContent::Bytes(b)) => match std::str::from_utf8(b) {
                Ok(text) => s.serialize_str(text),
                Err(_) => b.serialize(s),
            },
        }
    }
}
