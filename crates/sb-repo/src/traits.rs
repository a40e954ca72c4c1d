//! Script repository trait

use async_trait::async_trait;
use sb_core::{ChangesetId, RevisionId, ScriptChange, ScriptFile};

use crate::error::RepoResult;

/// Versioned storage of SQL scripts.
///
/// Results are always sorted by script path.
#[async_trait]
pub trait ScriptRepository: Send + Sync {
    /// Scripts that differ between `from` and `to`.
    ///
    /// `from = None` stands for an empty history: every script at `to` is
    /// reported as added. Modified entries carry both versions; deleted
    /// entries carry the content as of `from`.
    async fn diff(
        &self,
        from: Option<&RevisionId>,
        to: &RevisionId,
    ) -> RepoResult<Vec<ScriptChange>>;

    /// Every tracked script as of `revision`
    async fn materialize(&self, revision: &RevisionId) -> RepoResult<Vec<ScriptFile>>;

    /// Check that `revision` exists
    async fn resolve(&self, revision: &RevisionId) -> RepoResult<RevisionId>;

    /// The most recent committed changeset
    async fn head(&self) -> RepoResult<ChangesetId>;
}
