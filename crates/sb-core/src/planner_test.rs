use super::*;
use crate::object::ObjectKind;

/// Line-oriented stand-in for the SQL parser: each line reads
/// `<action> <kind> <name> [dependency ...]`.
struct LineParser;

impl ScriptParser for LineParser {
    fn parse(&self, script: &ScriptFile) -> CoreResult<Vec<ObjectDescriptor>> {
        let mut objects = Vec::new();
        for line in script.content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let words: Vec<&str> = line.split_whitespace().collect();
            let error = || CoreError::ParseError {
                path: script.path.to_string(),
                message: format!("cannot parse '{}'", line),
            };
            if words.len() < 3 {
                return Err(error());
            }
            let action = match words[0] {
                "create" => BuildActionType::Create,
                "alter" => BuildActionType::Alter,
                "drop" => BuildActionType::Drop,
                "rename" => BuildActionType::Rename,
                _ => return Err(error()),
            };
            let kind = match words[1] {
                "table" => ObjectKind::Table,
                "view" => ObjectKind::View,
                "function" => ObjectKind::Function,
                _ => return Err(error()),
            };
            let deps = words[3..]
                .iter()
                .map(|d| ObjectName::parse(d, "main"))
                .collect::<CoreResult<Vec<_>>>()?;
            objects.push(
                ObjectDescriptor::new(ObjectName::parse(words[2], "main")?, kind, action, line)
                    .with_dependencies(deps),
            );
        }
        Ok(objects)
    }
}

fn name(n: &str) -> ObjectName {
    ObjectName::parse(n, "main").unwrap()
}

fn script(path: &str, content: &str) -> ScriptFile {
    ScriptFile::new(path, content)
}

fn added(path: &str, content: &str) -> ScriptChange {
    ScriptChange::Added {
        script: script(path, content),
    }
}

fn modified(path: &str, before: &str, after: &str) -> ScriptChange {
    ScriptChange::Modified {
        previous: script(path, before),
        current: script(path, after),
    }
}

fn deleted(path: &str, content: &str) -> ScriptChange {
    ScriptChange::Deleted {
        script: script(path, content),
    }
}

fn plan_with(
    policy: ExpansionPolicy,
    baseline: Option<RevisionId>,
    changes: &[ScriptChange],
    scripts: &[ScriptFile],
) -> CoreResult<BuildPlan> {
    let parser = LineParser;
    Planner::new(&parser).with_policy(policy).plan(&PlanInput {
        target: RevisionId::changeset("r1"),
        baseline,
        changes,
        scripts,
    })
}

fn plan(changes: &[ScriptChange], scripts: &[ScriptFile]) -> CoreResult<BuildPlan> {
    plan_with(
        ExpansionPolicy::Transitive,
        Some(RevisionId::changeset("r0")),
        changes,
        scripts,
    )
}

fn order(plan: &BuildPlan) -> Vec<String> {
    plan.items.iter().map(|i| i.name().to_string()).collect()
}

#[test]
fn test_new_scripts_ordered_by_dependency() {
    let changes = vec![
        added("A.sql", "create view v t"),
        added("T.sql", "create table t"),
    ];
    let scripts = vec![script("A.sql", "create view v t"), script("T.sql", "create table t")];

    let plan = plan_with(ExpansionPolicy::Transitive, None, &changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.t", "main.v"]);
    assert!(plan
        .items
        .iter()
        .all(|i| i.action == BuildActionType::Create && i.reason == BuildReason::Added));
    assert_eq!(plan.baseline, None);
}

#[test]
fn test_modified_table_pulls_in_dependent_view() {
    let changes = vec![modified(
        "T.sql",
        "create table t",
        "create table t name",
    )];
    let scripts = vec![
        script("T.sql", "create table t name"),
        script("V.sql", "create view v t"),
    ];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.t", "main.v"]);
    assert_eq!(plan.items[0].reason, BuildReason::Modified);
    assert_eq!(plan.items[0].action, BuildActionType::Alter);
    assert_eq!(plan.items[1].reason, BuildReason::DependencyChanged);
    assert_eq!(plan.items[1].action, BuildActionType::Alter);
}

#[test]
fn test_expansion_reaches_fixed_point() {
    let changes = vec![modified("a.sql", "create table a", "create table a x")];
    let scripts = vec![
        script("a.sql", "create table a x"),
        script("b.sql", "create view b a"),
        script("c.sql", "create view c b"),
        script("d.sql", "create view d c"),
        script("e.sql", "create table e"),
    ];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.a", "main.b", "main.c", "main.d"]);
}

#[test]
fn test_plan_respects_every_edge() {
    let scripts = vec![
        script("1.sql", "create table customers"),
        script("2.sql", "create table orders customers"),
        script("3.sql", "create view order_totals orders"),
        script("4.sql", "create view customer_summary customers order_totals"),
        script("5.sql", "create function score customer_summary orders"),
    ];
    let changes: Vec<ScriptChange> = scripts
        .iter()
        .map(|s| ScriptChange::Added { script: s.clone() })
        .collect();

    let plan = plan_with(ExpansionPolicy::Transitive, None, &changes, &scripts).unwrap();

    assert_eq!(plan.len(), 5);
    for item in &plan.items {
        let pos = plan.position(item.name()).unwrap();
        for dep in &item.object.dependencies {
            let dep_pos = plan.position(dep).unwrap();
            assert!(dep_pos < pos, "{} must precede {}", dep, item.name());
        }
    }
}

#[test]
fn test_ties_broken_by_schema_then_name() {
    let scripts = vec![
        script("z.sql", "create table sales.b"),
        script("y.sql", "create table sales.a"),
        script("x.sql", "create table archive.z"),
    ];
    let changes: Vec<ScriptChange> = scripts
        .iter()
        .map(|s| ScriptChange::Added { script: s.clone() })
        .collect();

    let plan = plan_with(ExpansionPolicy::Transitive, None, &changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["archive.z", "sales.a", "sales.b"]);
}

#[test]
fn test_planning_is_deterministic() {
    let scripts = vec![
        script("a.sql", "create table a"),
        script("b.sql", "create table b"),
        script("c.sql", "create view c a b"),
        script("d.sql", "create view d a"),
        script("e.sql", "create view e d c"),
    ];
    let changes: Vec<ScriptChange> = scripts
        .iter()
        .rev()
        .map(|s| ScriptChange::Added { script: s.clone() })
        .collect();

    let first = plan_with(ExpansionPolicy::Transitive, None, &changes, &scripts).unwrap();
    let second = plan_with(ExpansionPolicy::Transitive, None, &changes, &scripts).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_cycle_is_reported_with_all_members() {
    let scripts = vec![
        script("x.sql", "create view x y"),
        script("y.sql", "create view y z"),
        script("z.sql", "create view z x"),
        script("ok.sql", "create table ok"),
    ];
    let changes: Vec<ScriptChange> = scripts
        .iter()
        .map(|s| ScriptChange::Added { script: s.clone() })
        .collect();

    let err = plan_with(ExpansionPolicy::Transitive, None, &changes, &scripts).unwrap_err();

    match err {
        CoreError::CyclicDependency { members, cycle } => {
            assert_eq!(members, vec![name("x"), name("y"), name("z")]);
            assert_eq!(cycle, "main.x -> main.y -> main.z -> main.x");
        }
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[test]
fn test_cycle_outside_rebuild_set_is_ignored() {
    let changes = vec![added("n.sql", "create table n")];
    let scripts = vec![
        script("n.sql", "create table n"),
        script("x.sql", "create view x y"),
        script("y.sql", "create view y x"),
    ];

    let plan = plan(&changes, &scripts).unwrap();
    assert_eq!(order(&plan), vec!["main.n"]);
}

#[test]
fn test_parse_failure_fails_whole_plan() {
    let changes = vec![added("bad.sql", "select nonsense")];
    let scripts = vec![script("bad.sql", "select nonsense"), script("ok.sql", "create table ok")];

    let err = plan(&changes, &scripts).unwrap_err();
    assert!(matches!(err, CoreError::ParseError { ref path, .. } if path == "bad.sql"));
}

#[test]
fn test_duplicate_declaration_is_rejected() {
    let changes = vec![added("b.sql", "create table t")];
    let scripts = vec![script("a.sql", "create table t"), script("b.sql", "create table t")];

    let err = plan(&changes, &scripts).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateObject { .. }));
}

#[test]
fn test_deleted_object_dropped_after_dependents() {
    // t is removed and v no longer references it
    let changes = vec![
        deleted("T.sql", "create table t"),
        modified("V.sql", "create view v t", "create view v"),
    ];
    let scripts = vec![script("V.sql", "create view v")];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.v", "main.t"]);
    let drop = &plan.items[1];
    assert_eq!(drop.action, BuildActionType::Drop);
    assert_eq!(drop.reason, BuildReason::Deleted);
    assert_eq!(drop.object.action, BuildActionType::Drop);
    assert_eq!(drop.script.content, "create table t");
}

#[test]
fn test_dropped_dependency_never_precedes_its_dependents() {
    // both a and b go away; b depended on a
    let changes = vec![
        deleted("a.sql", "create table a"),
        deleted("b.sql", "create view b a"),
    ];

    let plan = plan(&changes, &[]).unwrap();

    assert_eq!(order(&plan), vec!["main.b", "main.a"]);
    assert!(plan.items.iter().all(|i| i.action == BuildActionType::Drop));
}

#[test]
fn test_dependents_of_dropped_object_are_rebuilt_first() {
    let changes = vec![deleted("a.sql", "create table a")];
    let scripts = vec![script("b.sql", "create view b a")];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.b", "main.a"]);
    assert_eq!(plan.items[0].reason, BuildReason::DependencyChanged);
}

#[test]
fn test_removed_declaration_in_modified_script_is_dropped() {
    let changes = vec![modified(
        "objs.sql",
        "create table a\ncreate table b",
        "create table a",
    )];
    let scripts = vec![script("objs.sql", "create table a")];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.b"]);
    assert_eq!(plan.items[0].action, BuildActionType::Drop);
}

#[test]
fn test_unchanged_statement_in_modified_script_is_skipped() {
    let changes = vec![modified(
        "objs.sql",
        "create table a\ncreate table b",
        "create table a\ncreate table b x",
    )];
    let scripts = vec![script("objs.sql", "create table a\ncreate table b x")];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.b"]);
}

#[test]
fn test_moved_object_is_not_recreated() {
    let changes = vec![
        deleted("old/t.sql", "create table t"),
        added("new/t.sql", "create table t"),
    ];
    let scripts = vec![script("new/t.sql", "create table t")];

    let plan = plan(&changes, &scripts).unwrap();

    assert!(plan.is_empty());
}

#[test]
fn test_no_changes_yields_empty_plan() {
    let scripts = vec![script("t.sql", "create table t"), script("v.sql", "create view v t")];
    let plan = plan(&[], &scripts).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn test_in_place_alter_script_not_rerun_by_expansion() {
    let changes = vec![modified("t.sql", "create table t", "create table t x")];
    let scripts = vec![
        script("t.sql", "create table t x"),
        script("fk.sql", "alter table orders t"),
    ];

    let plan = plan(&changes, &scripts).unwrap();
    assert_eq!(order(&plan), vec!["main.t"]);
}

#[test]
fn test_breaking_policy_ignores_in_place_alter() {
    let changes = vec![modified(
        "t_alter.sql",
        "alter table t",
        "alter table t extra",
    )];
    let scripts = vec![
        script("t_alter.sql", "alter table t extra"),
        script("v.sql", "create view v t"),
    ];

    let transitive = plan_with(
        ExpansionPolicy::Transitive,
        Some(RevisionId::changeset("r0")),
        &changes,
        &scripts,
    )
    .unwrap();
    let breaking = plan_with(
        ExpansionPolicy::Breaking,
        Some(RevisionId::changeset("r0")),
        &changes,
        &scripts,
    )
    .unwrap();

    assert_eq!(order(&transitive), vec!["main.t", "main.v"]);
    assert_eq!(order(&breaking), vec!["main.t"]);
}

#[test]
fn test_breaking_policy_expands_redefinitions() {
    let changes = vec![modified("t.sql", "create table t", "create table t x")];
    let scripts = vec![script("t.sql", "create table t x"), script("v.sql", "create view v t")];

    let plan = plan_with(
        ExpansionPolicy::Breaking,
        Some(RevisionId::changeset("r0")),
        &changes,
        &scripts,
    )
    .unwrap();

    assert_eq!(order(&plan), vec!["main.t", "main.v"]);
}

#[test]
fn test_none_policy_only_plans_changed_objects() {
    let changes = vec![modified("t.sql", "create table t", "create table t x")];
    let scripts = vec![script("t.sql", "create table t x"), script("v.sql", "create view v t")];

    let plan = plan_with(
        ExpansionPolicy::None,
        Some(RevisionId::changeset("r0")),
        &changes,
        &scripts,
    )
    .unwrap();

    assert_eq!(order(&plan), vec!["main.t"]);
}

#[test]
fn test_external_dependencies_are_assumed_present() {
    let changes = vec![added("v.sql", "create view v information_schema.tables")];
    let scripts = vec![script("v.sql", "create view v information_schema.tables")];

    let plan = plan(&changes, &scripts).unwrap();
    assert_eq!(order(&plan), vec!["main.v"]);
}

#[test]
fn test_expansion_policy_serde() {
    let policy: ExpansionPolicy = serde_yaml::from_str("breaking").unwrap();
    assert_eq!(policy, ExpansionPolicy::Breaking);
    assert_eq!(ExpansionPolicy::default(), ExpansionPolicy::Transitive);
    assert_eq!(ExpansionPolicy::None.to_string(), "none");
}

#[test]
fn test_expansion_walks_through_in_place_alter_scripts() {
    // t <- x (altered in place) <- w
    let changes = vec![modified("t.sql", "create table t", "create table t extra")];
    let scripts = vec![
        script("t.sql", "create table t extra"),
        script("x.sql", "alter table x t"),
        script("w.sql", "create view w x"),
    ];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.t", "main.w"]);
    assert_eq!(plan.items[1].reason, BuildReason::DependencyChanged);
    assert_eq!(plan.position(&name("x")), None);
}

#[test]
fn test_redefinitions_come_down_dependents_first() {
    let changes = vec![modified(
        "orders.sql",
        "create table orders",
        "create table orders extra",
    )];
    let scripts = vec![
        script("orders.sql", "create table orders extra"),
        script("lines.sql", "create table order_lines orders"),
    ];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(order(&plan), vec!["main.orders", "main.order_lines"]);
    assert_eq!(plan.teardown, vec![name("order_lines"), name("orders")]);
    assert!(plan.items.iter().all(BuildItem::is_redefinition));
}

#[test]
fn test_teardown_follows_deployed_dependencies() {
    // v used to read t; t is deleted and v no longer references it
    let changes = vec![
        deleted("T.sql", "create table t"),
        modified("V.sql", "create view v t", "create view v"),
    ];
    let scripts = vec![script("V.sql", "create view v")];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(plan.teardown, vec![name("v"), name("t")]);
    let removed: Vec<usize> = plan.teardown_items().map(|(index, _)| index).collect();
    assert_eq!(removed, vec![0, 1]);
}

#[test]
fn test_new_objects_and_in_place_alters_are_not_torn_down() {
    let changes = vec![
        added("n.sql", "create table n"),
        modified("a.sql", "alter table a", "alter table a extra"),
    ];
    let scripts = vec![script("n.sql", "create table n"), script("a.sql", "alter table a extra")];

    let plan = plan(&changes, &scripts).unwrap();

    assert_eq!(plan.len(), 2);
    assert!(plan.teardown.is_empty());
}
