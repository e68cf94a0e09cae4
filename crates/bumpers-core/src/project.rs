//! Project identity and state paths
//!
//! All persisted state is scoped to a project: the store database and the
//! log file both live under the XDG state directory, named by a project id
//! that stays stable for a given working tree across invocations.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_CONFIG_FILE;

/// Marker files that identify a project root during the upward search.
const ROOT_MARKERS: &[&str] = &[".git", "go.mod", "package.json", "Cargo.toml"];

/// Environment variable overriding project-root detection.
pub const PROJECT_DIR_ENV: &str = "CLAUDE_PROJECT_DIR";

/// Resolved project identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    /// Absolute project root
    pub root: PathBuf,
    /// Directory name of the root
    pub name: String,
    /// `sanitize(name)-shorthash(root)`; scopes all persisted state
    pub id: String,
}

impl ProjectContext {
    /// Locate the project for `cwd`: an existing `CLAUDE_PROJECT_DIR` wins,
    /// otherwise walk upward looking for a root marker, otherwise use `cwd`
    /// itself.
    pub fn discover(cwd: &Path) -> Self {
        let env_override = std::env::var_os(PROJECT_DIR_ENV).map(PathBuf::from);
        Self::discover_with(cwd, env_override.as_deref())
    }

    /// Detection body, with the environment override injected for tests.
    pub fn discover_with(cwd: &Path, env_project_dir: Option<&Path>) -> Self {
        if let Some(dir) = env_project_dir
            && dir.is_dir()
        {
            return Self::from_root(dir.to_path_buf());
        }

        let mut current = Some(cwd);
        while let Some(dir) = current {
            if ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()) {
                return Self::from_root(dir.to_path_buf());
            }
            current = dir.parent();
        }

        Self::from_root(cwd.to_path_buf())
    }

    /// Build the identity for a known root.
    pub fn from_root(root: PathBuf) -> Self {
        let root = dunce::canonicalize(&root).unwrap_or(root);
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        let id = format!("{}-{}", sanitize(&name), short_hash(&root));
        Self { root, name, id }
    }

    /// Path of the config file at the project root.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(DEFAULT_CONFIG_FILE)
    }

    /// State directory shared by all Bumpers projects.
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("bumpers")
    }

    /// Per-project store database path.
    pub fn db_path(&self) -> PathBuf {
        Self::state_dir().join(format!("{}.db", self.id))
    }

    /// Per-project rotating log path.
    pub fn log_path(&self) -> PathBuf {
        Self::state_dir().join(format!("{}.log", self.id))
    }
}

/// Lowercase the name and collapse anything outside `[a-z0-9-]`.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("project");
    }
    out
}

/// First 8 hex chars of the root path's SHA-256.
fn short_hash(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let hex = format!("{digest:x}");
    hex[..8].to_string()
}

fn xdg_state_home() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_STATE_HOME") {
        let dir = PathBuf::from(dir);
        if dir.is_absolute() {
            return dir;
        }
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
        .unwrap_or_else(|| PathBuf::from(".local/state"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_env_override_wins_when_directory_exists() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("override");
        fs::create_dir_all(&project).unwrap();

        let ctx = ProjectContext::discover_with(Path::new("/elsewhere"), Some(&project));
        assert_eq!(ctx.root, dunce::canonicalize(&project).unwrap());
    }

    #[test]
    fn test_env_override_ignored_when_missing() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("real");
        fs::create_dir_all(project.join(".git")).unwrap();
        let nested = project.join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let ctx =
            ProjectContext::discover_with(&nested, Some(Path::new("/does/not/exist")));
        assert_eq!(ctx.root, dunce::canonicalize(&project).unwrap());
    }

    #[test]
    fn test_upward_search_finds_marker() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("repo");
        fs::create_dir_all(project.join(".git")).unwrap();
        let nested = project.join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let ctx = ProjectContext::discover_with(&nested, None);
        assert_eq!(ctx.root, dunce::canonicalize(&project).unwrap());
        assert_eq!(ctx.name, "repo");
    }

    #[test]
    fn test_no_marker_falls_back_to_cwd() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain");
        fs::create_dir_all(&plain).unwrap();

        let ctx = ProjectContext::discover_with(&plain, None);
        assert_eq!(ctx.root, dunce::canonicalize(&plain).unwrap());
    }

    #[test]
    fn test_id_is_stable_and_sanitized() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("My Project_v2");
        fs::create_dir_all(&project).unwrap();

        let a = ProjectContext::from_root(project.clone());
        let b = ProjectContext::from_root(project);
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("my-project-v2-"));
        let hash = a.id.rsplit('-').next().unwrap();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_different_paths_get_different_ids() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("x/app");
        let b = dir.path().join("y/app");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();

        let ctx_a = ProjectContext::from_root(a);
        let ctx_b = ProjectContext::from_root(b);
        assert_ne!(ctx_a.id, ctx_b.id);
        // same sanitized prefix, different hash
        assert!(ctx_a.id.starts_with("app-"));
        assert!(ctx_b.id.starts_with("app-"));
    }

    #[test]
    fn test_state_paths_use_project_id() {
        let dir = TempDir::new().unwrap();
        let ctx = ProjectContext::from_root(dir.path().to_path_buf());
        assert!(ctx.db_path().ends_with(format!("bumpers/{}.db", ctx.id)));
        assert!(ctx.log_path().ends_with(format!("bumpers/{}.log", ctx.id)));
        assert!(ctx.config_path().ends_with("bumpers.yml"));
    }

    #[test]
    fn test_sanitize_edge_cases() {
        assert_eq!(sanitize("bumpers"), "bumpers");
        assert_eq!(sanitize("My Repo!!"), "my-repo");
        assert_eq!(sanitize("--__--"), "project");
        assert_eq!(sanitize("a..b"), "a-b");
    }
}
