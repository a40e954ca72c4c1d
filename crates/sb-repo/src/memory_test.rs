use super::*;
use sb_core::ChangeKind;

fn kinds(changes: &[ScriptChange]) -> Vec<(String, ChangeKind)> {
    changes
        .iter()
        .map(|c| (c.path().to_string(), c.kind()))
        .collect()
}

fn three_revisions() -> (InMemoryScriptRepository, RevisionId, RevisionId, RevisionId) {
    let repo = InMemoryScriptRepository::new();
    let r0 = repo.commit("r0", [("t.sql", "CREATE TABLE t (x INT)")]);
    let r1 = repo.commit(
        "r1",
        [
            ("t.sql", "CREATE TABLE t (x INT, y INT)"),
            ("v.sql", "CREATE VIEW v AS SELECT * FROM t"),
        ],
    );
    let r2 = repo.commit("r2", [("v.sql", "CREATE VIEW v AS SELECT * FROM t")]);
    (repo, r0, r1, r2)
}

#[tokio::test]
async fn test_diff_between_changesets() {
    let (repo, r0, r1, r2) = three_revisions();

    let changes = repo.diff(Some(&r0), &r1).await.unwrap();
    assert_eq!(
        kinds(&changes),
        vec![
            ("t.sql".to_string(), ChangeKind::Modified),
            ("v.sql".to_string(), ChangeKind::Added),
        ]
    );
    assert_eq!(
        changes[0].previous().unwrap().content,
        "CREATE TABLE t (x INT)"
    );

    let changes = repo.diff(Some(&r1), &r2).await.unwrap();
    assert_eq!(kinds(&changes), vec![("t.sql".to_string(), ChangeKind::Deleted)]);
    assert_eq!(changes[0].script().content, "CREATE TABLE t (x INT, y INT)");
}

#[tokio::test]
async fn test_diff_is_complementary() {
    let (repo, r0, _, r2) = three_revisions();
    let forward = repo.diff(Some(&r0), &r2).await.unwrap();
    let backward = repo.diff(Some(&r2), &r0).await.unwrap();
    let inverted: Vec<_> = backward.into_iter().map(ScriptChange::inverse).collect();
    assert_eq!(forward, inverted);
}

#[tokio::test]
async fn test_diff_from_nothing_adds_everything() {
    let (repo, _, r1, _) = three_revisions();
    let changes = repo.diff(None, &r1).await.unwrap();
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.kind() == ChangeKind::Added));
}

#[tokio::test]
async fn test_same_revision_has_no_changes() {
    let (repo, _, r1, _) = three_revisions();
    assert!(repo.diff(Some(&r1), &r1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_working_copy_follows_head_until_set() {
    let (repo, _, _, r2) = three_revisions();
    assert!(repo
        .diff(Some(&r2), &RevisionId::WorkingCopy)
        .await
        .unwrap()
        .is_empty());

    repo.set_working_copy([
        ("v.sql", "CREATE VIEW v AS SELECT 1"),
        ("notes.txt", "not a script"),
    ]);
    let changes = repo.diff(Some(&r2), &RevisionId::WorkingCopy).await.unwrap();
    assert_eq!(kinds(&changes), vec![("v.sql".to_string(), ChangeKind::Modified)]);
}

#[tokio::test]
async fn test_tags_resolve_to_their_changeset() {
    let (repo, r0, _, _) = three_revisions();
    let v1 = repo.tag("v1", "r0").unwrap();
    assert_eq!(
        repo.materialize(&v1).await.unwrap(),
        repo.materialize(&r0).await.unwrap()
    );
    assert!(matches!(
        repo.tag("v2", "missing"),
        Err(RepoError::RevisionNotFound { .. })
    ));
}

#[tokio::test]
async fn test_unknown_revision() {
    let repo = InMemoryScriptRepository::new();
    let err = repo
        .diff(Some(&RevisionId::changeset("nope")), &RevisionId::WorkingCopy)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::RevisionNotFound { .. }));
    assert!(repo.head().await.is_err());
}

#[tokio::test]
async fn test_materialize_filters_extensions() {
    let repo = InMemoryScriptRepository::new().with_extensions(vec!["ddl".to_string()]);
    let rev = repo.commit("c", [("a.ddl", "CREATE TABLE a (x INT)"), ("b.sql", "")]);
    let scripts = repo.materialize(&rev).await.unwrap();
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].path, "a.ddl");
    assert_eq!(repo.head().await.unwrap(), ChangesetId::new("c"));
}

#[test]
fn test_empty_tag_name_is_an_error() {
    let repo = InMemoryScriptRepository::new();
    repo.commit("a", [("t.sql", "CREATE TABLE t (id INT);")]);

    let err = repo.tag("", "a").unwrap_err();
    assert!(matches!(err, RepoError::Configuration { .. }));
}

#[test]
#[should_panic(expected = "ChangesetId must not be empty")]
fn test_commit_with_empty_id_panics() {
    InMemoryScriptRepository::new().commit("", [("t.sql", "CREATE TABLE t (id INT);")]);
}
