//! Local grafonnet-lib checkout used as the jsonnet library path

use anyhow::{anyhow, Context, Result};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::Repository;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Cloned,
    Updated,
    UpToDate,
}

/// Clone `url` into `path`, or fast-forward `branch` when `path` exists.
pub fn install(url: &str, branch: &str, path: &Path) -> Result<InstallOutcome> {
    if path.exists() {
        return update(branch, path).context("Not a valid git repo/unable to pull master");
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    info!(%url, branch, path = %path.display(), "Cloning grafonnet");
    RepoBuilder::new()
        .branch(branch)
        .clone(url, path)
        .context("Error cloning grafonnet-lib folder from GitHub")?;
    Ok(InstallOutcome::Cloned)
}

fn update(branch: &str, path: &Path) -> Result<InstallOutcome> {
    let repo = Repository::open(path)?;
    let mut remote = repo.find_remote("origin")?;
    debug!(branch, path = %path.display(), "Fetching grafonnet");
    remote.fetch(&[branch], None, None)?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let incoming = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&incoming])?;

    let refname = format!("refs/heads/{}", branch);
    if analysis.is_up_to_date() {
        repo.set_head(&refname)?;
        return Ok(InstallOutcome::UpToDate);
    }
    if !analysis.is_fast_forward() {
        return Err(anyhow!("local branch {} has diverged from origin", branch));
    }

    match repo.find_reference(&refname) {
        Ok(mut reference) => {
            reference.set_target(incoming.id(), "legend: fast-forward")?;
        }
        Err(_) => {
            repo.reference(&refname, incoming.id(), true, "legend: create branch")?;
        }
    }
    repo.set_head(&refname)?;
    repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
    info!(branch, commit = %incoming.id(), "Updated grafonnet");
    Ok(InstallOutcome::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Oid, RepositoryInitOptions, Signature};
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, name: &str, content: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(name), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("legend", "legend@localhost").unwrap();

        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, name, &tree, &parents)
            .unwrap()
    }

    fn origin(dir: &Path) -> Repository {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("master");
        let repo = Repository::init_opts(dir, &opts).unwrap();
        commit_file(&repo, "grafonnet.libsonnet", "{}\n");
        repo
    }

    #[test]
    fn test_clone_then_fast_forward() {
        let temp = TempDir::new().unwrap();
        let origin_dir = temp.path().join("origin");
        let repo = origin(&origin_dir);
        let url = origin_dir.to_str().unwrap();
        let checkout = temp.path().join("home").join("grafonnet-lib");

        assert_eq!(install(url, "master", &checkout).unwrap(), InstallOutcome::Cloned);
        assert!(checkout.join("grafonnet.libsonnet").is_file());

        assert_eq!(install(url, "master", &checkout).unwrap(), InstallOutcome::UpToDate);

        let head = commit_file(&repo, "dashboard.libsonnet", "{ new():: {} }\n");
        assert_eq!(install(url, "master", &checkout).unwrap(), InstallOutcome::Updated);

        let local = Repository::open(&checkout).unwrap();
        assert_eq!(local.head().unwrap().target(), Some(head));
        assert!(checkout.join("dashboard.libsonnet").is_file());
    }

    #[test]
    fn test_existing_directory_that_is_not_a_repo() {
        let temp = TempDir::new().unwrap();
        let checkout = temp.path().join("grafonnet-lib");
        std::fs::create_dir_all(&checkout).unwrap();

        let err = install("https://invalid.localhost/grafonnet.git", "master", &checkout).unwrap_err();
        assert_eq!(err.to_string(), "Not a valid git repo/unable to pull master");
    }

    #[test]
    fn test_clone_failure() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("no-such-origin");
        let checkout = temp.path().join("grafonnet-lib");

        let err = install(missing.to_str().unwrap(), "master", &checkout).unwrap_err();
        assert_eq!(err.to_string(), "Error cloning grafonnet-lib folder from GitHub");
    }
}
