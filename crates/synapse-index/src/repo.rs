//! Repository acquisition: URL allow-list, project naming, cloning, listing.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IndexError, Result};

static ALLOWED_URLS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https?://github\.com/[\w\-.]+/[\w\-.]+/?$",
        r"^https?://gitlab\.com/[\w\-.]+/[\w\-.]+/?$",
        r"^https?://gitee\.com/[\w\-.]+/[\w\-.]+/?$",
        r"^https?://bitbucket\.org/[\w\-.]+/[\w\-.]+/?$",
        r"^git@github\.com:[\w\-.]+/[\w\-.]+\.git$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Whether `url` points at a supported public git host. Guards the `git clone`
/// argument against anything that is not a plain owner/repo URL.
#[must_use]
pub fn is_valid_git_url(url: &str) -> bool {
    let url = url.trim();
    ALLOWED_URLS.iter().any(|re| re.is_match(url))
}

/// Derive the project name from a repository URL: last path segment, `.git` stripped.
///
/// # Errors
///
/// Returns `IndexError::InvalidUrl` if the URL yields an empty name.
pub fn project_name(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return Err(IndexError::InvalidUrl(url.to_owned()));
    }
    Ok(name.to_owned())
}

/// Clone `url` into `target`, replacing any previous checkout.
///
/// # Errors
///
/// Returns `IndexError::InvalidUrl` for URLs outside the allow-list and
/// `IndexError::CloneFailed` if git cannot be spawned or exits non-zero.
pub async fn clone_repo(url: &str, target: &Path) -> Result<()> {
    if !is_valid_git_url(url) {
        return Err(IndexError::InvalidUrl(url.to_owned()));
    }

    if tokio::fs::try_exists(target).await? {
        tracing::warn!(path = %target.display(), "removing previous checkout before clone");
        tokio::fs::remove_dir_all(target).await?;
    }
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!(url, path = %target.display(), "cloning repository");
    let output = tokio::process::Command::new("git")
        .arg("clone")
        .arg("--")
        .arg(url.trim())
        .arg(target)
        .output()
        .await
        .map_err(|e| IndexError::CloneFailed(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(IndexError::CloneFailed(stderr.trim().to_owned()));
    }
    Ok(())
}

/// List ingested projects: one directory per project under `data_root`, sorted by name.
///
/// A missing `data_root` is created and yields an empty list.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or read.
pub fn list_projects(data_root: &Path) -> Result<Vec<String>> {
    if !data_root.exists() {
        std::fs::create_dir_all(data_root)?;
        return Ok(Vec::new());
    }

    let mut projects = Vec::new();
    for entry in std::fs::read_dir(data_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            projects.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    projects.sort();
    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_hosts() {
        for url in [
            "https://github.com/langchain-ai/langgraph",
            "https://github.com/user/repo.name/",
            "http://gitlab.com/group/project",
            "https://gitee.com/mirrors/redis",
            "https://bitbucket.org/team/repo",
            "git@github.com:user/repo.git",
            "  https://github.com/user/repo  ",
        ] {
            assert!(is_valid_git_url(url), "{url}");
        }
    }

    #[test]
    fn rejects_injection_and_unknown_hosts() {
        for url in [
            "https://github.com/user/repo; rm -rf /",
            "https://github.com/user",
            "https://example.com/user/repo",
            "file:///etc/passwd",
            "--upload-pack=evil",
            "https://github.com/user/repo/tree/main",
            "",
        ] {
            assert!(!is_valid_git_url(url), "{url}");
        }
    }

    #[test]
    fn project_name_strips_git_suffix_and_slash() {
        assert_eq!(
            project_name("https://github.com/user/awesome.git").unwrap(),
            "awesome"
        );
        assert_eq!(project_name("https://github.com/user/tool/").unwrap(), "tool");
        assert_eq!(project_name("git@github.com:user/repo.git").unwrap(), "repo");
    }

    #[test]
    fn project_name_rejects_empty() {
        assert!(matches!(project_name(""), Err(IndexError::InvalidUrl(_))));
        assert!(matches!(
            project_name("https://github.com/user/.git"),
            Err(IndexError::InvalidUrl(_))
        ));
    }

    #[test]
    fn list_projects_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        assert!(list_projects(&root).unwrap().is_empty());
        assert!(root.is_dir());
    }

    #[test]
    fn list_projects_returns_sorted_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(list_projects(dir.path()).unwrap(), ["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn clone_rejects_invalid_url_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("repo");
        let result = clone_repo("https://evil.example/x/y", &target).await;
        assert!(matches!(result, Err(IndexError::InvalidUrl(_))));
        assert!(!target.exists());
    }
}
