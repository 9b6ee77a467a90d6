//! Per-module build descriptor records.
//!
//! A module is one immediate subdirectory of the bnd workspace. A *real*
//! module carries a `bnd.bnd` property file, optionally layered with a
//! `bnd.overrides` sibling; a name that does not resolve to one becomes a
//! placeholder record with no properties and no dependency references.

use crate::core::props;
use std::path::{Path, PathBuf};

/// Index of a module record within the catalog arena.
pub type ModuleId = usize;

/// Descriptor file name that marks a directory as a module.
pub const BND_FILE: &str = "bnd.bnd";

/// Optional sibling file whose keys overwrite the descriptor's.
pub const OVERRIDES_FILE: &str = "bnd.overrides";

const SYMBOLIC_NAME_KEY: &str = "Bundle-SymbolicName";
const BUILD_PATH_KEY: &str = "-buildpath";
const TEST_PATH_KEY: &str = "-testpath";

/// Dependency-resolution state of a module record.
///
/// Transitions exactly once, `Raw` → `Cooking` → `Cooked`; `Cooking` is
/// observable only from inside a recursive cook, which is what terminates
/// reference cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookState {
    Raw,
    Cooking,
    Cooked(Vec<ModuleId>),
}

/// One module of the workspace, real or placeholder.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Directory name — the primary identity key.
    pub name: String,
    /// Resolved directory path; `None` when the name is not a plain path
    /// segment.
    pub root: Option<PathBuf>,
    /// Whether a descriptor file exists at `root`.
    pub is_real: bool,
    /// Published identity from `Bundle-SymbolicName`; empty when the
    /// descriptor omits it, equal to `name` for placeholders.
    pub symbolic_name: String,
    /// Attribute-stripped `-buildpath` reference tokens, in file order.
    pub build_refs: Vec<String>,
    /// Attribute-stripped `-testpath` reference tokens, in file order.
    pub test_refs: Vec<String>,
    /// Cooking state, driven by the catalog.
    pub cook: CookState,
}

impl ModuleRecord {
    /// Resolve `name` under `workspace` and parse its descriptor if present.
    ///
    /// Any failure to resolve short of an I/O error yields a placeholder;
    /// an unreadable descriptor or overrides file is an error.
    pub fn load(workspace: &Path, name: &str) -> Result<Self, String> {
        match resolve_segment(workspace, name) {
            Some(root) => {
                let bnd = root.join(BND_FILE);
                if bnd.is_file() {
                    Self::parse(name, root, &bnd)
                } else {
                    Ok(Self::placeholder(name, Some(root)))
                }
            }
            None => Ok(Self::placeholder(name, None)),
        }
    }

    /// A record for a referenced name with no real descriptor behind it.
    /// Placeholders are pre-cooked: they contribute no dependency edges.
    fn placeholder(name: &str, root: Option<PathBuf>) -> Self {
        ModuleRecord {
            name: name.to_string(),
            root,
            is_real: false,
            symbolic_name: name.to_string(),
            build_refs: Vec::new(),
            test_refs: Vec::new(),
            cook: CookState::Cooked(Vec::new()),
        }
    }

    fn parse(name: &str, root: PathBuf, bnd: &Path) -> Result<Self, String> {
        let mut properties = props::Properties::new();
        props::load_file(bnd, &mut properties)?;
        let overrides = root.join(OVERRIDES_FILE);
        if overrides.is_file() {
            props::load_file(&overrides, &mut properties)?;
        }
        Ok(ModuleRecord {
            name: name.to_string(),
            root: Some(root),
            is_real: true,
            symbolic_name: properties
                .get(SYMBOLIC_NAME_KEY)
                .cloned()
                .unwrap_or_default(),
            build_refs: path_refs(properties.get(BUILD_PATH_KEY)),
            test_refs: path_refs(properties.get(TEST_PATH_KEY)),
            cook: CookState::Raw,
        })
    }

    /// True iff the published id is declared and differs from the
    /// directory name, i.e. the module deserves a second index entry.
    pub fn symbolic_name_differs_from_name(&self) -> bool {
        !self.symbolic_name.is_empty() && self.symbolic_name != self.name
    }
}

/// Resolve `name` as a single normal path segment under `workspace`.
/// Names that would nest or escape (separators, `.`, `..`, empty) do not
/// resolve; the caller treats them as "module not found".
fn resolve_segment(workspace: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return None;
    }
    Some(workspace.join(name))
}

/// Split a comma-separated path property into bare reference names.
/// Whitespace around commas is ignored and empty tokens are dropped.
fn path_refs(prop: Option<&String>) -> Vec<String> {
    let Some(prop) = prop else {
        return Vec::new();
    };
    prop.split(',')
        .map(|token| strip_attributes(token.trim()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drop the `;attribute=value;...` suffix from a reference token, keeping
/// only the bare module name.
pub fn strip_attributes(token: &str) -> &str {
    match token.find(';') {
        Some(split) => token[..split].trim_end(),
        None => token,
    }
}
