//! Git references (HEAD, branches, tags, remote branches)
//!
//! References are read-only here. A reference lives either as a loose file
//! under `.git` holding an object id or `ref: <path>`, or as a line of
//! `.git/packed-refs`. Loose files shadow packed entries of the same name.
//!
//! ## Name resolution
//!
//! A user supplied name `r` is tried as `r`, `refs/remotes/r`,
//! `refs/heads/r` and `refs/tags/r`, in that order.

use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

static SYMREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SYMREF_REGEX).expect("Invalid symref regex"));

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

const PACKED_REFS_FILE: &str = "packed-refs";

/// Symbolic references longer than this are treated as a loop
const MAX_SYMREF_DEPTH: usize = 10;

/// Prefixes tried, in order, after the bare name
const REF_SEARCH_PREFIXES: [&str; 3] = ["refs/remotes/", "refs/heads/", "refs/tags/"];

pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};

#[derive(Debug, Clone)]
enum SymRefOrOid {
    SymRef { sym_ref_name: String },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {:?}", path))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = SYMREF.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: symref_match[1].to_string(),
            }))
        } else {
            let oid = ObjectId::try_parse(content.to_string())
                .with_context(|| format!("invalid ref file at {:?}", path))?;
            Ok(Some(SymRefOrOid::Oid(oid)))
        }
    }
}

/// Read-only reference store rooted at a `.git` directory
#[derive(Debug, new)]
pub struct Refs {
    path: Box<Path>,
}

impl Refs {
    /// Object id `HEAD` points to, `None` on an unborn branch
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_ref(HEAD_REF_NAME)
    }

    /// Read one fully spelled reference, following symbolic references
    pub fn read_ref(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        let packed_refs = self.packed_refs()?;
        self.read_ref_with(name, &packed_refs, 0)
    }

    /// Resolve a user supplied name through the search prefixes
    ///
    /// A candidate that cannot be read as a reference (such as `.git/config`
    /// for the name `config`) counts as a miss. Returns `None` when no
    /// candidate resolves.
    pub fn resolve(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        let name = REF_ALIASES.get(name).copied().unwrap_or(name);
        if !Self::is_safe_ref_name(name) {
            return Ok(None);
        }

        let packed_refs = self.packed_refs()?;
        let candidates = std::iter::once(name.to_string()).chain(
            REF_SEARCH_PREFIXES
                .iter()
                .map(|prefix| format!("{prefix}{name}")),
        );

        for candidate in candidates {
            match self.read_ref_with(&candidate, &packed_refs, 0) {
                Ok(Some(oid)) => return Ok(Some(oid)),
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(candidate = %candidate, error = %err, "skipping unreadable reference");
                }
            }
        }

        Ok(None)
    }

    /// Every reference with a target, including `HEAD`
    ///
    /// Keyed by full reference name. Symbolic references that lead nowhere
    /// are left out.
    pub fn list_all_refs(&self) -> anyhow::Result<BTreeMap<String, ObjectId>> {
        let packed_refs = self.packed_refs()?;

        let mut names = self.list_loose_refs()?;
        names.extend(packed_refs.keys().cloned());
        names.push(HEAD_REF_NAME.to_string());
        names.sort();
        names.dedup();

        let mut refs = BTreeMap::new();
        for name in names {
            if let Some(oid) = self.read_ref_with(&name, &packed_refs, 0)? {
                refs.insert(name, oid);
            }
        }

        Ok(refs)
    }

    fn read_ref_with(
        &self,
        name: &str,
        packed_refs: &BTreeMap<String, ObjectId>,
        depth: usize,
    ) -> anyhow::Result<Option<ObjectId>> {
        if depth > MAX_SYMREF_DEPTH {
            anyhow::bail!("symbolic reference {name} is nested too deeply");
        }

        match SymRefOrOid::read_symref_or_oid(&self.path.join(name))? {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                self.read_ref_with(&sym_ref_name, packed_refs, depth + 1)
            }
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            None => Ok(packed_refs.get(name).cloned()),
        }
    }

    fn list_loose_refs(&self) -> anyhow::Result<Vec<String>> {
        let refs_path = self.refs_path();
        if !refs_path.is_dir() {
            return Ok(Vec::new());
        }

        Ok(WalkDir::new(&refs_path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative_path = entry.path().strip_prefix(self.path.as_ref()).ok()?;
                let name = relative_path
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                Some(name)
            })
            .collect())
    }

    /// Parse `.git/packed-refs`, ignoring comments and peeled `^` lines
    fn packed_refs(&self) -> anyhow::Result<BTreeMap<String, ObjectId>> {
        let packed_refs_path = self.path.join(PACKED_REFS_FILE);
        if !packed_refs_path.is_file() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&packed_refs_path)
            .with_context(|| format!("failed to read {:?}", packed_refs_path))?;

        let mut refs = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('^') {
                continue;
            }

            let (oid, name) = line
                .split_once(' ')
                .with_context(|| format!("malformed packed-refs line {line:?}"))?;
            refs.insert(name.to_string(), ObjectId::try_parse(oid.to_string())?);
        }

        Ok(refs)
    }

    /// Names must stay inside the `.git` directory
    fn is_safe_ref_name(name: &str) -> bool {
        !name.is_empty()
            && Path::new(name)
                .components()
                .all(|component| matches!(component, Component::Normal(_)))
    }

    fn refs_path(&self) -> Box<Path> {
        self.path.join("refs").into_boxed_path()
    }
}
