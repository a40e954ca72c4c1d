//! In-memory script repository for tests and embedding

use async_trait::async_trait;
use sb_core::{ChangesetId, RevisionId, ScriptChange, ScriptFile, TagName};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::{RepoError, RepoResult};
use crate::traits::ScriptRepository;

type Snapshot = BTreeMap<String, String>;

#[derive(Debug, Default)]
struct State {
    changesets: HashMap<String, Snapshot>,
    tags: HashMap<String, String>,
    head: Option<String>,
    working_copy: Option<Snapshot>,
}

/// Script repository holding snapshots of path → content in memory.
///
/// Each [`commit`](Self::commit) stores a full snapshot and moves the head.
/// The working copy mirrors the head until [`set_working_copy`](Self::set_working_copy)
/// is called.
#[derive(Debug)]
pub struct InMemoryScriptRepository {
    state: Mutex<State>,
    extensions: Vec<String>,
}

impl Default for InMemoryScriptRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryScriptRepository {
    /// Create an empty repository that tracks `.sql` files
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            extensions: vec!["sql".to_string()],
        }
    }

    /// Only consider files with these extensions
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a changeset with the given full file set and make it the head.
    ///
    /// # Panics
    /// When `id` is empty.
    pub fn commit<I, P, C>(&self, id: &str, files: I) -> RevisionId
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let snapshot = files
            .into_iter()
            .map(|(p, c)| (p.into().replace('\\', "/"), c.into()))
            .collect();
        let revision = RevisionId::changeset(id);
        let mut state = self.lock();
        state.changesets.insert(id.to_string(), snapshot);
        state.head = Some(id.to_string());
        revision
    }

    /// Point a tag at an existing changeset
    pub fn tag(&self, name: &str, target: &str) -> RepoResult<RevisionId> {
        let tag = TagName::try_from(name.to_string())
            .map_err(|message| RepoError::Configuration { message })?;
        let mut state = self.lock();
        if !state.changesets.contains_key(target) {
            return Err(RepoError::RevisionNotFound {
                revision: format!("changeset:{}", target),
            });
        }
        state.tags.insert(name.to_string(), target.to_string());
        Ok(RevisionId::Tag(tag))
    }

    /// Replace the working copy contents
    pub fn set_working_copy<I, P, C>(&self, files: I)
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let snapshot = files
            .into_iter()
            .map(|(p, c)| (p.into().replace('\\', "/"), c.into()))
            .collect();
        self.lock().working_copy = Some(snapshot);
    }

    fn is_script(&self, path: &str) -> bool {
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    fn snapshot(&self, revision: &RevisionId) -> RepoResult<Snapshot> {
        let state = self.lock();
        let not_found = || RepoError::RevisionNotFound {
            revision: revision.to_string(),
        };
        let snapshot = match revision {
            RevisionId::WorkingCopy => match &state.working_copy {
                Some(files) => files.clone(),
                None => state
                    .head
                    .as_ref()
                    .and_then(|head| state.changesets.get(head))
                    .cloned()
                    .unwrap_or_default(),
            },
            RevisionId::Changeset(id) => state
                .changesets
                .get(id.as_str())
                .cloned()
                .ok_or_else(not_found)?,
            RevisionId::Tag(name) => state
                .tags
                .get(name.as_str())
                .and_then(|target| state.changesets.get(target))
                .cloned()
                .ok_or_else(not_found)?,
        };
        Ok(snapshot
            .into_iter()
            .filter(|(path, _)| self.is_script(path))
            .collect())
    }
}

#[async_trait]
impl ScriptRepository for InMemoryScriptRepository {
    async fn diff(
        &self,
        from: Option<&RevisionId>,
        to: &RevisionId,
    ) -> RepoResult<Vec<ScriptChange>> {
        let before = match from {
            Some(from) => self.snapshot(from)?,
            None => Snapshot::new(),
        };
        let after = self.snapshot(to)?;

        let mut changes = Vec::new();
        for (path, content) in &after {
            match before.get(path) {
                None => changes.push(ScriptChange::Added {
                    script: ScriptFile::new(path, content),
                }),
                Some(previous) if previous != content => changes.push(ScriptChange::Modified {
                    previous: ScriptFile::new(path, previous),
                    current: ScriptFile::new(path, content),
                }),
                Some(_) => {}
            }
        }
        for (path, content) in &before {
            if !after.contains_key(path) {
                changes.push(ScriptChange::Deleted {
                    script: ScriptFile::new(path, content),
                });
            }
        }
        changes.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(changes)
    }

    async fn materialize(&self, revision: &RevisionId) -> RepoResult<Vec<ScriptFile>> {
        Ok(self
            .snapshot(revision)?
            .into_iter()
            .map(|(path, content)| ScriptFile::new(path, content))
            .collect())
    }

    async fn resolve(&self, revision: &RevisionId) -> RepoResult<RevisionId> {
        self.snapshot(revision)?;
        Ok(revision.clone())
    }

    async fn head(&self) -> RepoResult<ChangesetId> {
        self.lock()
            .head
            .clone()
            .map(ChangesetId::new)
            .ok_or_else(|| RepoError::RevisionNotFound {
                revision: "HEAD".to_string(),
            })
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
