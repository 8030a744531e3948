use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};
use scmver::scm::{git, resolve, ProbeOptions, Registry};
use scmver::RepositoryState;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn init(dir: &TempDir) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("master");
    Repository::init_opts(dir.path(), &opts).unwrap()
}

fn stage(repo: &Repository, file: &str, content: &str) {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join(file), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
}

fn commit(repo: &Repository, file: &str, content: &str) -> Oid {
    stage(repo, file, content);
    let mut index = repo.index().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("scmver", "scmver@example.com").unwrap();
    let parents: Vec<Commit> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => Vec::new(),
    };
    let parents: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, file, &tree, &parents)
        .unwrap()
}

fn tag(repo: &Repository, name: &str, oid: Oid) {
    let object = repo.find_object(oid, None).unwrap();
    repo.tag_lightweight(name, &object, false).unwrap();
}

fn stat(path: &Path, options: &ProbeOptions) -> Option<RepositoryState> {
    resolve(path, options, &Registry::builtin()).unwrap()
}

// ============================================================================
// Git working copies
// ============================================================================

#[test]
fn test_unborn_repository() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let repo = init(&dir);

    let state = stat(dir.path(), &ProbeOptions::new()).unwrap();
    assert_eq!(state, RepositoryState::unborn(false, Some("master".to_string())));

    stage(&repo, "README", "spam\n");
    let state = stat(dir.path(), &ProbeOptions::new()).unwrap();
    assert_eq!(state, RepositoryState::unborn(true, Some("master".to_string())));
}

#[test]
fn test_at_tag() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let repo = init(&dir);
    let oid = commit(&repo, "README", "spam\n");
    tag(&repo, "v1.0", oid);

    let state = stat(dir.path(), &ProbeOptions::new()).unwrap();
    assert_eq!(state.tag, "v1.0");
    assert_eq!(state.distance, 0);
    assert!(!state.dirty);
    assert_eq!(state.branch.as_deref(), Some("master"));
    let revision = state.revision.unwrap();
    assert!(oid.to_string().starts_with(&revision));
}

#[test]
fn test_distance_and_dirty() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let repo = init(&dir);
    let oid = commit(&repo, "README", "spam\n");
    tag(&repo, "v1.0", oid);
    commit(&repo, "README", "eggs\n");
    commit(&repo, "README", "ham\n");

    fs::write(dir.path().join("untracked"), "toast\n").unwrap();
    let state = stat(dir.path(), &ProbeOptions::new()).unwrap();
    assert_eq!(state.tag, "v1.0");
    assert_eq!(state.distance, 2);
    assert!(!state.dirty);

    fs::write(dir.path().join("README"), "bacon\n").unwrap();
    let state = stat(dir.path(), &ProbeOptions::new()).unwrap();
    assert!(state.dirty);
}

#[test]
fn test_added_file_is_dirty() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let repo = init(&dir);
    let oid = commit(&repo, "README", "spam\n");
    tag(&repo, "v1.0", oid);

    fs::write(dir.path().join("new"), "eggs\n").unwrap();
    let state = stat(dir.path(), &ProbeOptions::new()).unwrap();
    assert!(!state.dirty);

    stage(&repo, "new", "eggs\n");
    let state = stat(dir.path(), &ProbeOptions::new()).unwrap();
    assert_eq!(state.tag, "v1.0");
    assert_eq!(state.distance, 0);
    assert!(state.dirty);
}

#[test]
fn test_untagged_counts_commits() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let repo = init(&dir);
    let oid = commit(&repo, "README", "spam\n");
    tag(&repo, "v1.0", oid);
    commit(&repo, "README", "eggs\n");
    commit(&repo, "README", "ham\n");

    let options = ProbeOptions::new().with(git::TAG_OPTION, "release-*");
    let state = stat(dir.path(), &options).unwrap();
    assert_eq!(state.tag, "0.0");
    assert_eq!(state.distance, 3);
}

#[test]
fn test_resolve_from_subdirectory() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let repo = init(&dir);
    let oid = commit(&repo, "README", "spam\n");
    tag(&repo, "v1.0", oid);
    fs::create_dir_all(dir.path().join("src").join("spam")).unwrap();

    let state = stat(&dir.path().join("src").join("spam"), &ProbeOptions::new()).unwrap();
    assert_eq!(state.tag, "v1.0");
    assert_eq!(state.distance, 0);
}

#[test]
fn test_disabled_marker_is_skipped() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let repo = init(&dir);
    commit(&repo, "README", "spam\n");

    let options = ProbeOptions::new().disable(git::MARKER);
    assert!(stat(dir.path(), &options).is_none());
}

#[test]
fn test_tool_version() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let registry = Registry::builtin();
    let version = registry.get(git::MARKER).unwrap().tool_version().unwrap();
    assert!(!version.is_unknown());
}
