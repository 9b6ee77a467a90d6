//! CLI subcommands — deps, gaps, known, list, roots, uses.
//!
//! Thin glue over the catalog: discovers which projects the Eclipse
//! workspace already has, runs the requested query, and renders names or
//! paths to stdout. All errors flow back to `main` as strings.

use crate::core::catalog::Catalog;
use clap::Subcommand;
use std::collections::HashSet;
use std::path::Path;

/// Where Eclipse keeps one subdirectory per imported project.
const DOT_PROJECTS_DIR: &str = ".metadata/.plugins/org.eclipse.core.resources/.projects";

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List project(s) and their transitive dependencies in dependency
    /// order, as paths ready for Eclipse's Import Projects dialog
    Deps {
        /// Include projects already in the Eclipse workspace
        #[arg(short = 'a', long)]
        show_all: bool,

        /// Print names of projects rather than paths
        #[arg(short = 'n', long)]
        print_names: bool,

        /// Use the unusual ordering of Eclipse's import-existing-projects
        /// dialog box
        #[arg(short = 'e', long)]
        eclipse_ordering: bool,

        /// The project(s) whose dependencies are to be displayed
        #[arg(required = true, value_name = "project")]
        projects: Vec<String>,
    },

    /// List projects needed by but missing from the Eclipse workspace
    Gaps,

    /// Show projects already known to Eclipse
    Known,

    /// List projects matching the specified patterns
    #[command(alias = "ls")]
    List {
        /// The patterns to match using filesystem globbing (all projects
        /// when omitted)
        #[arg(value_name = "pattern")]
        patterns: Vec<String>,
    },

    /// Show known projects that are not required by any other project
    Roots,

    /// List projects that depend directly on the specified project(s)
    Uses {
        /// The project(s) whose dependents are to be displayed
        #[arg(required = true, value_name = "project")]
        projects: Vec<String>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(
    bnd_workspace: &Path,
    eclipse_workspace: &Path,
    cmd: Commands,
) -> Result<(), String> {
    match cmd {
        Commands::Deps {
            show_all,
            print_names,
            eclipse_ordering,
            projects,
        } => cmd_deps(
            bnd_workspace,
            eclipse_workspace,
            show_all,
            print_names,
            eclipse_ordering,
            &projects,
        ),
        Commands::Gaps => cmd_gaps(bnd_workspace, eclipse_workspace),
        Commands::Known => cmd_known(eclipse_workspace),
        Commands::List { patterns } => cmd_list(bnd_workspace, &patterns),
        Commands::Roots => cmd_roots(bnd_workspace, eclipse_workspace),
        Commands::Uses { projects } => cmd_uses(bnd_workspace, &projects),
    }
}

fn cmd_deps(
    bnd_workspace: &Path,
    eclipse_workspace: &Path,
    show_all: bool,
    print_names: bool,
    eclipse_ordering: bool,
    projects: &[String],
) -> Result<(), String> {
    let known = known_projects(eclipse_workspace)?;
    let mut catalog = Catalog::new(bnd_workspace, known)?;
    catalog.show_all(show_all);

    let closure = catalog.required(projects)?;
    let mut lines: Vec<String> = closure
        .into_iter()
        .filter(|&id| catalog.is_visible(id))
        .map(|id| {
            if print_names {
                catalog.name(id).to_string()
            } else {
                catalog.display_path(id).display().to_string()
            }
        })
        .collect();
    if eclipse_ordering {
        lines.sort_by_key(|line| eclipse_order_key(line));
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_gaps(bnd_workspace: &Path, eclipse_workspace: &Path) -> Result<(), String> {
    let known = known_projects(eclipse_workspace)?;
    let mut catalog = Catalog::new(bnd_workspace, known.clone())?;

    let mut names: Vec<String> = known.into_iter().collect();
    names.sort();
    for id in catalog.required_lenient(&names)? {
        // show_all stays off: only the projects Eclipse is missing.
        if catalog.is_visible(id) {
            println!("{}", catalog.display_path(id).display());
        }
    }
    Ok(())
}

fn cmd_known(eclipse_workspace: &Path) -> Result<(), String> {
    let mut names: Vec<String> = known_projects(eclipse_workspace)?.into_iter().collect();
    names.sort();
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_list(bnd_workspace: &Path, patterns: &[String]) -> Result<(), String> {
    let catalog = Catalog::new(bnd_workspace, HashSet::new())?;
    let ids = if patterns.is_empty() {
        catalog.all_modules()
    } else {
        catalog.matching(patterns)?
    };
    for id in ids {
        println!("{}", catalog.name(id));
    }
    Ok(())
}

fn cmd_roots(bnd_workspace: &Path, eclipse_workspace: &Path) -> Result<(), String> {
    let known = known_projects(eclipse_workspace)?;
    let mut catalog = Catalog::new(bnd_workspace, known.clone())?;

    let mut names: Vec<String> = known.into_iter().collect();
    names.sort();
    for (id, in_degree) in catalog.subgraph_in_degrees(&names)? {
        if in_degree == 0 {
            println!("{}", catalog.name(id));
        }
    }
    Ok(())
}

fn cmd_uses(bnd_workspace: &Path, projects: &[String]) -> Result<(), String> {
    let mut catalog = Catalog::new(bnd_workspace, HashSet::new())?;
    for id in catalog.dependents_of(projects)? {
        println!("{}", catalog.name(id));
    }
    Ok(())
}

/// Enumerate the projects already imported into the Eclipse workspace:
/// the subdirectories of its `.projects` metadata directory.
fn known_projects(eclipse_workspace: &Path) -> Result<HashSet<String>, String> {
    if !eclipse_workspace.is_dir() {
        return Err(format!(
            "could not locate eclipse workspace: {}",
            eclipse_workspace.display()
        ));
    }
    let dot_projects = eclipse_workspace.join(DOT_PROJECTS_DIR);
    if !dot_projects.is_dir() {
        return Err(format!(
            "could not locate .projects dir: {}",
            dot_projects.display()
        ));
    }
    let entries = std::fs::read_dir(&dot_projects).map_err(|e| {
        format!(
            "could not enumerate eclipse projects in {}: {}",
            dot_projects.display(),
            e
        )
    })?;
    let mut known = HashSet::new();
    for entry in entries.flatten() {
        if entry.path().is_dir() {
            known.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(known)
}

/// Sort key matching Eclipse's import-existing-projects dialog: `.` sorts
/// before every other character, so a dotted prefix precedes the bare
/// name.
fn eclipse_order_key(line: &str) -> String {
    let mut key: String = line
        .chars()
        .map(|c| if c == '.' { '\u{0}' } else { c })
        .collect();
    key.push('\u{1}');
    key
}
