//! Git-backed script repository

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, warn};
use sb_core::{ChangesetId, Config, RevisionId, ScriptChange, ScriptFile};
use sb_process::{ExternalProcess, ProcessOutput};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{RepoError, RepoResult};
use crate::traits::ScriptRepository;

/// Number of script contents read at the same time
const DEFAULT_CONCURRENCY: usize = 8;

/// A commit hash, or the working tree
#[derive(Debug, Clone)]
enum Snapshot {
    Commit(String),
    WorkingTree,
}

/// Script repository that reads history through the git executable.
#[derive(Debug, Clone)]
pub struct GitScriptRepository {
    root: PathBuf,
    git: ExternalProcess,
    scripts_path: String,
    extensions: Vec<String>,
    concurrency: usize,
}

impl GitScriptRepository {
    /// Open the repository containing `path`.
    ///
    /// The repository root is resolved with `git rev-parse --show-toplevel`;
    /// all script paths are relative to it.
    pub async fn open(path: &Path, git: ExternalProcess) -> RepoResult<Self> {
        if !path.is_dir() {
            return Err(RepoError::Configuration {
                message: format!("repository root '{}' is not a directory", path.display()),
            });
        }

        let version = git.preflight().await?;
        debug!("Using {}", version);

        let output = git
            .run_allow_failure([
                OsStr::new("-C"),
                path.as_os_str(),
                OsStr::new("rev-parse"),
                OsStr::new("--show-toplevel"),
            ])
            .await?;
        if !output.success() {
            return Err(RepoError::Configuration {
                message: format!(
                    "'{}' is not inside a git repository: {}",
                    path.display(),
                    output.stderr.trim()
                ),
            });
        }
        let root = PathBuf::from(output.stdout_text().trim());

        Ok(Self {
            git: git.with_working_dir(&root),
            root,
            scripts_path: ".".to_string(),
            extensions: vec!["sql".to_string()],
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    /// Open the repository for a project, applying its configured script
    /// location, extensions, and git settings.
    pub async fn from_config(project_dir: &Path, config: &Config) -> RepoResult<Self> {
        let git = ExternalProcess::new(&config.git.executable).with_timeout(config.git.timeout());
        Ok(Self::open(project_dir, git)
            .await?
            .with_scripts_path(&config.scripts_path)
            .with_extensions(config.extensions.clone()))
    }

    /// Only consider scripts below this repository-relative directory
    pub fn with_scripts_path(mut self, scripts_path: impl Into<String>) -> Self {
        let path = scripts_path.into();
        let trimmed = path.trim_matches('/');
        self.scripts_path = if trimmed.is_empty() {
            ".".to_string()
        } else {
            trimmed.to_string()
        };
        self
    }

    /// Only consider files with these extensions
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Maximum number of concurrent content reads
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Repository root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_script(&self, path: &str) -> bool {
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    async fn git(&self, args: &[&str]) -> RepoResult<ProcessOutput> {
        Ok(self.git.run(args).await?)
    }

    /// Commit hash of a revision, or the working tree
    async fn snapshot(&self, revision: &RevisionId) -> RepoResult<Snapshot> {
        let spec = match revision {
            RevisionId::WorkingCopy => return Ok(Snapshot::WorkingTree),
            RevisionId::Changeset(id) => id.to_string(),
            RevisionId::Tag(name) => format!("refs/tags/{}", name),
        };
        let commit = self.rev_parse(&spec).await?.ok_or_else(|| {
            RepoError::RevisionNotFound {
                revision: revision.to_string(),
            }
        })?;
        Ok(Snapshot::Commit(commit))
    }

    async fn rev_parse(&self, spec: &str) -> RepoResult<Option<String>> {
        let verify = format!("{}^{{commit}}", spec);
        let output = self
            .git
            .run_allow_failure(["rev-parse", "--verify", "--quiet", verify.as_str()])
            .await?;
        if !output.success() {
            return Ok(None);
        }
        let hash = output.stdout_text().trim().to_string();
        Ok((!hash.is_empty()).then_some(hash))
    }

    /// Script paths present in a snapshot
    async fn list(&self, snapshot: &Snapshot) -> RepoResult<Vec<String>> {
        let output = match snapshot {
            Snapshot::Commit(commit) => {
                self.git(&[
                    "ls-tree",
                    "-r",
                    "-z",
                    "--name-only",
                    commit.as_str(),
                    "--",
                    self.scripts_path.as_str(),
                ])
                .await?
            }
            Snapshot::WorkingTree => {
                self.git(&[
                    "ls-files",
                    "-z",
                    "--cached",
                    "--others",
                    "--exclude-standard",
                    "--",
                    self.scripts_path.as_str(),
                ])
                .await?
            }
        };

        let mut paths: Vec<String> = split_nul(&output.stdout)
            .into_iter()
            .filter(|p| self.is_script(p))
            .filter(|p| match snapshot {
                // deleted but not yet staged
                Snapshot::WorkingTree => self.root.join(p).is_file(),
                Snapshot::Commit(_) => true,
            })
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Changed paths with their status letter, between a commit and another
    /// commit or the working tree
    async fn changed_paths(
        &self,
        from: &str,
        to: &Snapshot,
    ) -> RepoResult<BTreeMap<String, char>> {
        let mut args = vec!["diff", "--name-status", "--no-renames", "-z", from];
        if let Snapshot::Commit(to) = to {
            args.push(to.as_str());
        }
        args.extend(["--", self.scripts_path.as_str()]);
        let output = self.git(&args).await?;

        let mut changed = BTreeMap::new();
        let fields = split_nul(&output.stdout);
        for pair in fields.chunks(2) {
            let [status, path] = pair else {
                continue;
            };
            if !self.is_script(path) {
                continue;
            }
            let status = status.chars().next().unwrap_or('M');
            changed.insert(path.clone(), status);
        }

        if let Snapshot::WorkingTree = to {
            let untracked = self
                .git(&[
                    "ls-files",
                    "-z",
                    "--others",
                    "--exclude-standard",
                    "--",
                    self.scripts_path.as_str(),
                ])
                .await?;
            for path in split_nul(&untracked.stdout) {
                if !self.is_script(&path) {
                    continue;
                }
                // removed from the index but still on disk
                let status = if changed.get(&path) == Some(&'D') {
                    'M'
                } else {
                    'A'
                };
                changed.insert(path, status);
            }
        }

        Ok(changed)
    }

    /// Read a script; `None` when it is binary or not valid UTF-8
    async fn read(&self, snapshot: &Snapshot, path: &str) -> RepoResult<Option<ScriptFile>> {
        let bytes = match snapshot {
            Snapshot::Commit(commit) => {
                let object = format!("{}:{}", commit, path);
                self.git(&["show", object.as_str()]).await?.stdout
            }
            Snapshot::WorkingTree => {
                let full = self.root.join(path);
                tokio::fs::read(&full).await.map_err(|e| RepoError::Io {
                    path: full.display().to_string(),
                    source: e,
                })?
            }
        };
        Ok(decode_script(path, bytes))
    }

    async fn read_all(&self, snapshot: &Snapshot, paths: Vec<String>) -> RepoResult<Vec<ScriptFile>> {
        let reads: Vec<_> = paths.iter().map(|path| self.read(snapshot, path)).collect();
        let results: Vec<RepoResult<Option<ScriptFile>>> =
            stream::iter(reads).buffered(self.concurrency).collect().await;

        let mut scripts = Vec::with_capacity(results.len());
        for result in results {
            if let Some(script) = result? {
                scripts.push(script);
            }
        }
        Ok(scripts)
    }

    /// The change for one path reported by `git diff`
    async fn change_for(
        &self,
        path: &str,
        status: char,
        from: &Snapshot,
        to: &Snapshot,
    ) -> RepoResult<Option<ScriptChange>> {
        let change = match status {
            'A' => self
                .read(to, path)
                .await?
                .map(|script| ScriptChange::Added { script }),
            'D' => self
                .read(from, path)
                .await?
                .map(|script| ScriptChange::Deleted { script }),
            _ => {
                let previous = self.read(from, path).await?;
                let current = self.read(to, path).await?;
                match (previous, current) {
                    (Some(previous), Some(current)) if previous.checksum != current.checksum => {
                        Some(ScriptChange::Modified { previous, current })
                    }
                    (Some(_), Some(_)) => None,
                    (None, Some(script)) => Some(ScriptChange::Added { script }),
                    (Some(script), None) => Some(ScriptChange::Deleted { script }),
                    (None, None) => None,
                }
            }
        };
        Ok(change)
    }

    async fn diff_from_commit(&self, from: &str, to: &Snapshot) -> RepoResult<Vec<ScriptChange>> {
        let from_snapshot = Snapshot::Commit(from.to_string());
        let changed = self.changed_paths(from, to).await?;
        debug!("{} changed script path(s) since {}", changed.len(), from);

        let reads: Vec<_> = changed
            .iter()
            .map(|(path, status)| self.change_for(path, *status, &from_snapshot, to))
            .collect();
        let results: Vec<RepoResult<Option<ScriptChange>>> =
            stream::iter(reads).buffered(self.concurrency).collect().await;

        let mut changes = Vec::with_capacity(results.len());
        for result in results {
            if let Some(change) = result? {
                changes.push(change);
            }
        }
        Ok(changes)
    }
}

#[async_trait]
impl ScriptRepository for GitScriptRepository {
    async fn diff(
        &self,
        from: Option<&RevisionId>,
        to: &RevisionId,
    ) -> RepoResult<Vec<ScriptChange>> {
        let mut changes = match from {
            None => self
                .materialize(to)
                .await?
                .into_iter()
                .map(|script| ScriptChange::Added { script })
                .collect(),
            Some(RevisionId::WorkingCopy) if to.is_working_copy() => Vec::new(),
            Some(RevisionId::WorkingCopy) => self
                .diff(Some(to), &RevisionId::WorkingCopy)
                .await?
                .into_iter()
                .map(ScriptChange::inverse)
                .collect(),
            Some(from) => {
                let Snapshot::Commit(from_commit) = self.snapshot(from).await? else {
                    return Ok(Vec::new());
                };
                let to_snapshot = self.snapshot(to).await?;
                self.diff_from_commit(&from_commit, &to_snapshot).await?
            }
        };
        changes.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(changes)
    }

    async fn materialize(&self, revision: &RevisionId) -> RepoResult<Vec<ScriptFile>> {
        let snapshot = self.snapshot(revision).await?;
        let paths = self.list(&snapshot).await?;
        let mut scripts = self.read_all(&snapshot, paths).await?;
        scripts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(scripts)
    }

    async fn resolve(&self, revision: &RevisionId) -> RepoResult<RevisionId> {
        self.snapshot(revision).await?;
        Ok(revision.clone())
    }

    async fn head(&self) -> RepoResult<ChangesetId> {
        let hash = self
            .rev_parse("HEAD")
            .await?
            .ok_or_else(|| RepoError::RevisionNotFound {
                revision: "HEAD".to_string(),
            })?;
        ChangesetId::try_from(hash).map_err(|_| RepoError::RevisionNotFound {
            revision: "HEAD".to_string(),
        })
    }
}

/// Split NUL-terminated git output into strings
fn split_nul(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|b| *b == 0)
        .filter(|field| !field.is_empty())
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

/// Decode script bytes, skipping binary and non-UTF-8 content
fn decode_script(path: &str, bytes: Vec<u8>) -> Option<ScriptFile> {
    if bytes.contains(&0) {
        warn!("Skipping binary file {}", path);
        return None;
    }
    match String::from_utf8(bytes) {
        Ok(content) => Some(ScriptFile::new(path, content)),
        Err(_) => {
            warn!("Skipping {}: content is not valid UTF-8", path);
            None
        }
    }
}
