//! Workspace catalog — module index, memoized dependency cooking, and
//! graph queries.
//!
//! The catalog owns every module record in an arena; all maps resolve
//! name strings to arena indices, so a directory name and a published id
//! can alias the same record without duplicating it. Cooking resolves a
//! record's raw references into dependency ids at most once, tolerating
//! reference cycles, and the traversal queries emit dependency-respecting
//! orderings that are deterministic for a fixed descriptor set.

use crate::core::descriptor::{CookState, ModuleId, ModuleRecord, BND_FILE};
use glob::Pattern;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Catalog {
    workspace: PathBuf,
    /// Arena of module records; sole owner of every record.
    records: Vec<ModuleRecord>,
    /// Every identity string (directory name, published id) → record.
    index: HashMap<String, ModuleId>,
    /// Fully cooked record per distinct query string.
    canon: HashMap<String, ModuleId>,
    /// Module names already present in the companion workspace.
    known: HashSet<String>,
    show_all: bool,
}

impl Catalog {
    /// Scan the immediate subdirectories of `workspace` for modules
    /// carrying a descriptor file and index them eagerly.
    pub fn new(workspace: &Path, known: HashSet<String>) -> Result<Self, String> {
        if !workspace.is_dir() {
            return Err(format!(
                "could not locate bnd workspace: {}",
                workspace.display()
            ));
        }
        let mut catalog = Catalog {
            workspace: workspace.to_path_buf(),
            records: Vec::new(),
            index: HashMap::new(),
            canon: HashMap::new(),
            known,
            show_all: false,
        };
        let entries = std::fs::read_dir(workspace).map_err(|e| {
            format!(
                "could not inspect bnd workspace {}: {}",
                workspace.display(),
                e
            )
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                format!(
                    "could not inspect bnd workspace {}: {}",
                    workspace.display(),
                    e
                )
            })?;
            let path = entry.path();
            if path.is_dir() && path.join(BND_FILE).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        // Sorted scan order keeps every downstream enumeration
        // deterministic across platforms.
        names.sort();
        for name in &names {
            catalog.insert_record(name)?;
        }
        Ok(catalog)
    }

    /// Load and index a record under its directory name and, when the
    /// published id differs, under that id as well — two keys, one record.
    fn insert_record(&mut self, name: &str) -> Result<ModuleId, String> {
        let record = ModuleRecord::load(&self.workspace, name)?;
        let id = self.records.len();
        self.index.insert(record.name.clone(), id);
        if record.symbolic_name_differs_from_name() {
            self.index.insert(record.symbolic_name.clone(), id);
        }
        self.records.push(record);
        Ok(id)
    }

    /// Raw lookup: the indexed record for `name`, or a lazily constructed
    /// one (a placeholder, unless a real module escaped the eager scan).
    fn raw(&mut self, name: &str) -> Result<ModuleId, String> {
        if let Some(&id) = self.index.get(name) {
            return Ok(id);
        }
        self.insert_record(name)
    }

    /// Memoized fetch-and-cook for a query string. Distinct strings that
    /// alias the same record resolve to the same id.
    pub fn canonical(&mut self, name: &str) -> Result<ModuleId, String> {
        if let Some(&id) = self.canon.get(name) {
            return Ok(id);
        }
        let id = self.raw(name)?;
        self.cook(id)?;
        self.canon.insert(name.to_string(), id);
        Ok(id)
    }

    /// Resolve a record's references into cooked dependency ids, in
    /// reference order, skipping placeholders and duplicates.
    ///
    /// The `Cooking` marker is set before any recursion, so a reference
    /// cycle finds a non-`Raw` state on re-entry and returns immediately.
    /// The second module of a cycle may therefore record its partner while
    /// the partner's own list is still being built; the partner's list is
    /// complete by the time the outermost cook returns.
    fn cook(&mut self, id: ModuleId) -> Result<(), String> {
        if self.records[id].cook != CookState::Raw {
            return Ok(());
        }
        self.records[id].cook = CookState::Cooking;
        let refs: Vec<String> = self.records[id]
            .build_refs
            .iter()
            .chain(self.records[id].test_refs.iter())
            .cloned()
            .collect();
        let mut deps = Vec::new();
        for reference in &refs {
            let dep = self.raw(reference)?;
            if !self.records[dep].is_real {
                // Reference with no descriptor behind it: no edge.
                continue;
            }
            self.cook(dep)?;
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        self.records[id].cook = CookState::Cooked(deps);
        Ok(())
    }

    fn cook_all(&mut self) -> Result<(), String> {
        let real: Vec<ModuleId> = self.all_modules();
        for id in real {
            self.cook(id)?;
        }
        Ok(())
    }

    pub fn record(&self, id: ModuleId) -> &ModuleRecord {
        &self.records[id]
    }

    pub fn name(&self, id: ModuleId) -> &str {
        &self.records[id].name
    }

    /// Canonicalized module directory path, falling back to the joined
    /// path (or the bare name) when canonicalization is impossible.
    pub fn display_path(&self, id: ModuleId) -> PathBuf {
        match &self.records[id].root {
            Some(root) => root.canonicalize().unwrap_or_else(|_| root.clone()),
            None => PathBuf::from(&self.records[id].name),
        }
    }

    fn dependencies(&self, id: ModuleId) -> &[ModuleId] {
        match &self.records[id].cook {
            CookState::Cooked(deps) => deps,
            _ => &[],
        }
    }

    /// Ordered transitive closure over one or more query names: every
    /// dependency strictly precedes its dependents, first occurrence wins.
    /// A query name with no real module behind it is an error.
    pub fn required(&mut self, names: &[String]) -> Result<Vec<ModuleId>, String> {
        self.closure(names, false)
    }

    /// Closure that silently skips query names with no real module behind
    /// them — for callers whose name sets come from outside the workspace.
    pub fn required_lenient(&mut self, names: &[String]) -> Result<Vec<ModuleId>, String> {
        self.closure(names, true)
    }

    fn closure(&mut self, names: &[String], lenient: bool) -> Result<Vec<ModuleId>, String> {
        let mut queried = Vec::new();
        for name in names {
            let id = self.canonical(name)?;
            if !self.records[id].is_real {
                if lenient {
                    continue;
                }
                return Err(self.missing_module_error(id));
            }
            queried.push(id);
        }
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for id in queried {
            self.dfs(id, &mut seen, &mut order);
        }
        Ok(order)
    }

    /// Post-order depth-first walk; `seen` membership doubles as the
    /// cycle guard, so re-encounters are no-ops rather than reorderings.
    fn dfs(&self, id: ModuleId, seen: &mut HashSet<ModuleId>, order: &mut Vec<ModuleId>) {
        if !seen.insert(id) {
            return;
        }
        for &dep in self.dependencies(id) {
            self.dfs(dep, seen, order);
        }
        order.push(id);
    }

    fn missing_module_error(&self, id: ModuleId) -> String {
        let record = &self.records[id];
        match &record.root {
            Some(root) => format!("project directory does not exist: {}", root.display()),
            None => format!("project directory does not exist: {}", record.name),
        }
    }

    /// Modules whose direct dependencies include any of the named modules,
    /// in scan order.
    pub fn dependents_of(&mut self, names: &[String]) -> Result<Vec<ModuleId>, String> {
        let mut targets = HashSet::new();
        for name in names {
            let id = self.canonical(name)?;
            if !self.records[id].is_real {
                return Err(self.missing_module_error(id));
            }
            targets.insert(id);
        }
        self.cook_all()?;
        Ok(self
            .all_modules()
            .into_iter()
            .filter(|&id| self.dependencies(id).iter().any(|dep| targets.contains(dep)))
            .collect())
    }

    /// Every real module, in scan order.
    pub fn all_modules(&self) -> Vec<ModuleId> {
        (0..self.records.len())
            .filter(|&id| self.records[id].is_real)
            .collect()
    }

    /// Real modules whose directory name matches any of the glob patterns.
    pub fn matching(&self, patterns: &[String]) -> Result<Vec<ModuleId>, String> {
        let mut compiled = Vec::new();
        for pattern in patterns {
            compiled
                .push(Pattern::new(pattern).map_err(|e| format!("bad pattern {pattern}: {e}"))?);
        }
        Ok(self
            .all_modules()
            .into_iter()
            .filter(|&id| {
                compiled
                    .iter()
                    .any(|pattern| pattern.matches(&self.records[id].name))
            })
            .collect())
    }

    /// In-degree (number of dependents within the subgraph) for every
    /// module of the induced subgraph over `names` plus their
    /// dependencies. Roots of the subgraph are the zero entries.
    pub fn subgraph_in_degrees(
        &mut self,
        names: &[String],
    ) -> Result<Vec<(ModuleId, usize)>, String> {
        let members = self.required_lenient(names)?;
        let member_set: HashSet<ModuleId> = members.iter().copied().collect();
        let mut in_degree: HashMap<ModuleId, usize> =
            members.iter().map(|&id| (id, 0)).collect();
        for &id in &members {
            for dep in self.dependencies(id) {
                if member_set.contains(dep) {
                    if let Some(count) = in_degree.get_mut(dep) {
                        *count += 1;
                    }
                }
            }
        }
        Ok(members
            .iter()
            .map(|&id| (id, in_degree.get(&id).copied().unwrap_or(0)))
            .collect())
    }

    /// Include modules already known to the companion workspace in output.
    pub fn show_all(&mut self, show_all: bool) {
        self.show_all = show_all;
    }

    /// True iff the companion workspace does not already have this module.
    pub fn is_unknown(&self, id: ModuleId) -> bool {
        !self.known.contains(&self.records[id].name)
    }

    /// Pure output classification; never affects graph structure.
    pub fn is_visible(&self, id: ModuleId) -> bool {
        self.show_all || self.is_unknown(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_module(workspace: &Path, name: &str, bnd: &str) {
        let dir = workspace.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(BND_FILE), bnd).unwrap();
    }

    /// core ← util ← api, with api also building against core directly.
    fn layered_workspace() -> tempfile::TempDir {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "core", "Bundle-SymbolicName: com.example.core\n");
        write_module(ws.path(), "util", "-buildpath: core\n");
        write_module(ws.path(), "api", "-buildpath: core, util\n");
        ws
    }

    fn catalog(ws: &Path) -> Catalog {
        Catalog::new(ws, HashSet::new()).unwrap()
    }

    fn names(catalog: &Catalog, ids: &[ModuleId]) -> Vec<String> {
        ids.iter().map(|&id| catalog.name(id).to_string()).collect()
    }

    #[test]
    fn test_scan_indexes_real_modules_only() {
        let ws = layered_workspace();
        std::fs::create_dir_all(ws.path().join("no-descriptor")).unwrap();
        std::fs::write(ws.path().join("stray-file"), "not a module").unwrap();
        let catalog = catalog(ws.path());
        assert_eq!(names(&catalog, &catalog.all_modules()), vec!["api", "core", "util"]);
    }

    #[test]
    fn test_workspace_root_missing_is_an_error() {
        let ws = tempfile::tempdir().unwrap();
        let result = Catalog::new(&ws.path().join("absent"), HashSet::new());
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("could not locate bnd workspace"));
    }

    #[test]
    fn test_topological_closure_order() {
        let ws = layered_workspace();
        let mut catalog = catalog(ws.path());
        let order = catalog.required(&["api".to_string()]).unwrap();
        assert_eq!(names(&catalog, &order), vec!["core", "util", "api"]);
    }

    #[test]
    fn test_cooking_is_idempotent() {
        let ws = layered_workspace();
        let mut catalog = catalog(ws.path());
        let first = catalog.canonical("api").unwrap();
        let first_deps = catalog.dependencies(first).to_vec();
        let second = catalog.canonical("api").unwrap();
        assert_eq!(first, second);
        assert_eq!(catalog.dependencies(second), first_deps.as_slice());
        // Repeat queries never grow the arena.
        let record_count = catalog.records.len();
        catalog.canonical("api").unwrap();
        assert_eq!(catalog.records.len(), record_count);
    }

    #[test]
    fn test_placeholder_reference_is_absorbed() {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "app", "-buildpath: core, not-a-module\n");
        write_module(ws.path(), "core", "\n");
        std::fs::create_dir_all(ws.path().join("not-a-module")).unwrap();
        let mut catalog = catalog(ws.path());
        let order = catalog.required(&["app".to_string()]).unwrap();
        assert_eq!(names(&catalog, &order), vec!["core", "app"]);
    }

    #[test]
    fn test_attribute_suffixes_are_stripped() {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "core", "\n");
        write_module(ws.path(), "plain", "-buildpath: core\n");
        write_module(ws.path(), "versioned", "-buildpath: core;version=1.2.3\n");
        let mut catalog = catalog(ws.path());
        let plain = catalog.required(&["plain".to_string()]).unwrap();
        let versioned = catalog.required(&["versioned".to_string()]).unwrap();
        assert_eq!(names(&catalog, &plain)[0], "core");
        assert_eq!(names(&catalog, &versioned)[0], "core");
    }

    #[test]
    fn test_alias_queries_reach_the_same_record() {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "core", "\n");
        write_module(
            ws.path(),
            "api",
            "Bundle-SymbolicName: com.example.api\n-buildpath: core\n",
        );
        let mut catalog = catalog(ws.path());
        let by_name = catalog.canonical("api").unwrap();
        let by_symbolic = catalog.canonical("com.example.api").unwrap();
        assert_eq!(by_name, by_symbolic);
        let closure_by_name = catalog.required(&["api".to_string()]).unwrap();
        let closure_by_symbolic = catalog
            .required(&["com.example.api".to_string()])
            .unwrap();
        assert_eq!(closure_by_name, closure_by_symbolic);
    }

    #[test]
    fn test_reference_by_symbolic_name_builds_an_edge() {
        let ws = tempfile::tempdir().unwrap();
        write_module(
            ws.path(),
            "core",
            "Bundle-SymbolicName: com.example.core\n",
        );
        write_module(ws.path(), "app", "-buildpath: com.example.core\n");
        let mut catalog = catalog(ws.path());
        let order = catalog.required(&["app".to_string()]).unwrap();
        assert_eq!(names(&catalog, &order), vec!["core", "app"]);
    }

    #[test]
    fn test_cycle_terminates_with_each_module_once() {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "a", "-buildpath: b\n");
        write_module(ws.path(), "b", "-buildpath: a\n");
        let mut catalog = catalog(ws.path());
        let order = catalog.required(&["a".to_string()]).unwrap();
        let mut sorted = names(&catalog, &order);
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b"]);
    }

    #[test]
    fn test_shared_dependency_appears_once_at_first_encounter() {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "c", "\n");
        write_module(ws.path(), "left", "-buildpath: c\n");
        write_module(ws.path(), "right", "-buildpath: c\n");
        write_module(ws.path(), "top", "-buildpath: left, right\n");
        let mut catalog = catalog(ws.path());
        let order = catalog.required(&["top".to_string()]).unwrap();
        assert_eq!(names(&catalog, &order), vec!["c", "left", "right", "top"]);
    }

    #[test]
    fn test_build_refs_resolve_before_test_refs() {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "main-dep", "\n");
        write_module(ws.path(), "test-dep", "\n");
        write_module(
            ws.path(),
            "app",
            "-buildpath: main-dep\n-testpath: test-dep\n",
        );
        let mut catalog = catalog(ws.path());
        let order = catalog.required(&["app".to_string()]).unwrap();
        assert_eq!(
            names(&catalog, &order),
            vec!["main-dep", "test-dep", "app"]
        );
    }

    #[test]
    fn test_duplicate_reference_recorded_once() {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "core", "\n");
        write_module(ws.path(), "app", "-buildpath: core\n-testpath: core\n");
        let mut catalog = catalog(ws.path());
        let id = catalog.canonical("app").unwrap();
        assert_eq!(catalog.dependencies(id).len(), 1);
    }

    #[test]
    fn test_querying_a_missing_module_is_an_error() {
        let ws = layered_workspace();
        let mut catalog = catalog(ws.path());
        let result = catalog.required(&["ghost".to_string()]);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("project directory does not exist"));
    }

    #[test]
    fn test_lenient_closure_skips_missing_modules() {
        let ws = layered_workspace();
        let mut catalog = catalog(ws.path());
        let order = catalog
            .required_lenient(&["ghost".to_string(), "util".to_string()])
            .unwrap();
        assert_eq!(names(&catalog, &order), vec!["core", "util"]);
    }

    #[test]
    fn test_closure_union_preserves_first_occurrence() {
        let ws = layered_workspace();
        let mut catalog = catalog(ws.path());
        let order = catalog
            .required(&["util".to_string(), "api".to_string()])
            .unwrap();
        assert_eq!(names(&catalog, &order), vec!["core", "util", "api"]);
    }

    #[test]
    fn test_visibility_suppresses_known_modules() {
        let ws = layered_workspace();
        let known: HashSet<String> = ["core".to_string()].into();
        let mut catalog = Catalog::new(ws.path(), known).unwrap();
        let order = catalog.required(&["api".to_string()]).unwrap();
        let visible: Vec<String> = order
            .iter()
            .copied()
            .filter(|&id| catalog.is_visible(id))
            .map(|id| catalog.name(id).to_string())
            .collect();
        assert_eq!(visible, vec!["util", "api"]);

        catalog.show_all(true);
        let all: Vec<ModuleId> = order
            .iter()
            .copied()
            .filter(|&id| catalog.is_visible(id))
            .collect();
        assert_eq!(names(&catalog, &all), vec!["core", "util", "api"]);
    }

    #[test]
    fn test_dependents_of() {
        let ws = layered_workspace();
        let mut catalog = catalog(ws.path());
        let dependents = catalog.dependents_of(&["core".to_string()]).unwrap();
        assert_eq!(names(&catalog, &dependents), vec!["api", "util"]);
        let none = catalog.dependents_of(&["api".to_string()]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_dependents_of_resolves_aliases() {
        let ws = tempfile::tempdir().unwrap();
        write_module(
            ws.path(),
            "core",
            "Bundle-SymbolicName: com.example.core\n",
        );
        write_module(ws.path(), "app", "-buildpath: core\n");
        let mut catalog = catalog(ws.path());
        let dependents = catalog
            .dependents_of(&["com.example.core".to_string()])
            .unwrap();
        assert_eq!(names(&catalog, &dependents), vec!["app"]);
    }

    #[test]
    fn test_matching_globs() {
        let ws = tempfile::tempdir().unwrap();
        write_module(ws.path(), "com.example.api", "\n");
        write_module(ws.path(), "com.example.impl", "\n");
        write_module(ws.path(), "other", "\n");
        let catalog = catalog(ws.path());
        let matched = catalog.matching(&["com.example.*".to_string()]).unwrap();
        assert_eq!(
            names(&catalog, &matched),
            vec!["com.example.api", "com.example.impl"]
        );
        assert!(catalog.matching(&["zzz*".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_matching_rejects_bad_pattern() {
        let ws = layered_workspace();
        let catalog = catalog(ws.path());
        let result = catalog.matching(&["[".to_string()]);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("bad pattern"));
    }

    #[test]
    fn test_subgraph_roots_have_zero_in_degree() {
        let ws = layered_workspace();
        let mut catalog = catalog(ws.path());
        let degrees = catalog
            .subgraph_in_degrees(&["api".to_string(), "util".to_string(), "core".to_string()])
            .unwrap();
        let roots: Vec<String> = degrees
            .iter()
            .filter(|(_, in_degree)| *in_degree == 0)
            .map(|&(id, _)| catalog.name(id).to_string())
            .collect();
        assert_eq!(roots, vec!["api"]);
        // core is required by both util and api.
        let core = degrees
            .iter()
            .find(|&&(id, _)| catalog.name(id) == "core")
            .copied()
            .unwrap();
        assert_eq!(core.1, 2);
    }

    #[test]
    fn test_display_path_falls_back_without_canonical_root() {
        let ws = layered_workspace();
        let mut catalog = catalog(ws.path());
        let id = catalog.canonical("api").unwrap();
        let path = catalog.display_path(id);
        assert!(path.ends_with("api"));
    }
}
