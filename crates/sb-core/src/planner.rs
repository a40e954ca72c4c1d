//! Build planning: combines changed-script detection with the object
//! dependency graph to produce a deterministic, dependency-correct plan.

use log::{debug, info};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::object::{BuildActionType, ObjectDescriptor, ObjectName};
use crate::plan::{BuildItem, BuildPlan, BuildReason};
use crate::revision::RevisionId;
use crate::script::{ScriptChange, ScriptFile, ScriptParser, ScriptPath};

/// Which rebuilt objects force the objects depending on them to rebuild too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionPolicy {
    /// Every rebuilt object forces its dependents (default)
    #[default]
    Transitive,
    /// Only drops, renames, and redefinitions force dependents; in-place
    /// `ALTER` statements do not
    Breaking,
    /// Never pull in unchanged objects
    None,
}

impl fmt::Display for ExpansionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionPolicy::Transitive => write!(f, "transitive"),
            ExpansionPolicy::Breaking => write!(f, "breaking"),
            ExpansionPolicy::None => write!(f, "none"),
        }
    }
}

/// Everything the planner needs for one build request.
#[derive(Debug, Clone)]
pub struct PlanInput<'a> {
    /// Revision being built
    pub target: RevisionId,

    /// Revision the database was last built from, `None` for a fresh database
    pub baseline: Option<RevisionId>,

    /// Scripts changed between baseline and target
    pub changes: &'a [ScriptChange],

    /// Every tracked script at the target revision
    pub scripts: &'a [ScriptFile],
}

/// An object together with the script that declares it.
#[derive(Debug)]
struct Declared<'s> {
    object: ObjectDescriptor,
    script: &'s ScriptFile,
}

/// A rebuild-set member.
#[derive(Debug, Clone, Copy)]
struct Member<'d, 's> {
    decl: &'d Declared<'s>,
    action: BuildActionType,
    reason: BuildReason,
}

/// Computes build plans.
pub struct Planner<'p> {
    parser: &'p dyn ScriptParser,
    policy: ExpansionPolicy,
}

impl<'p> Planner<'p> {
    /// Create a planner with the default expansion policy
    pub fn new(parser: &'p dyn ScriptParser) -> Self {
        Self {
            parser,
            policy: ExpansionPolicy::default(),
        }
    }

    /// Override the expansion policy
    pub fn with_policy(mut self, policy: ExpansionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Compute the ordered plan for `input`.
    ///
    /// Fails without producing a partial plan when any script fails to parse,
    /// two scripts declare the same object, or the objects to rebuild form a
    /// dependency cycle.
    pub fn plan(&self, input: &PlanInput<'_>) -> CoreResult<BuildPlan> {
        let mut scripts: BTreeMap<&ScriptPath, &ScriptFile> =
            input.scripts.iter().map(|s| (&s.path, s)).collect();
        let mut changed_paths: BTreeSet<&ScriptPath> = BTreeSet::new();

        for change in input.changes {
            match change {
                ScriptChange::Added { script }
                | ScriptChange::Modified {
                    current: script, ..
                } => {
                    scripts.insert(&script.path, script);
                    changed_paths.insert(&script.path);
                }
                ScriptChange::Deleted { script } => {
                    scripts.remove(&script.path);
                }
            }
        }

        let current = self.declare(scripts.values().copied(), true)?;
        let previous = self.declare(input.changes.iter().filter_map(ScriptChange::previous), false)?;

        let dropped: BTreeMap<&ObjectName, &Declared<'_>> = previous
            .iter()
            .filter(|(name, decl)| {
                !current.contains_key(*name) && decl.object.action != BuildActionType::Drop
            })
            .collect();

        let graph = DependencyGraph::build(current.values().chain(dropped.values().copied()));

        let mut members: BTreeMap<ObjectName, Member<'_, '_>> = BTreeMap::new();

        for (name, decl) in &current {
            if !changed_paths.contains(&decl.script.path) {
                continue;
            }
            let before = previous.get(name);
            if before.is_some_and(|b| b.object.checksum() == decl.object.checksum()) {
                debug!("{} is unchanged in {}", name, decl.script.path);
                continue;
            }
            let existed = before.is_some();
            members.insert(
                name.clone(),
                Member {
                    decl,
                    action: resolve_action(&decl.object, existed),
                    reason: if existed {
                        BuildReason::Modified
                    } else {
                        BuildReason::Added
                    },
                },
            );
        }

        for (name, decl) in &dropped {
            members.insert(
                (*name).clone(),
                Member {
                    decl: *decl,
                    action: BuildActionType::Drop,
                    reason: BuildReason::Deleted,
                },
            );
        }

        let seeded = members.len();
        self.expand(&graph, &current, &mut members, input.baseline.is_some());

        let order = order_members(&members, &previous)?;
        let teardown = teardown_order(&members, &previous)?;
        let items: Vec<BuildItem> = order
            .iter()
            .filter_map(|name| members.get(name))
            .map(|member| {
                let mut object = member.decl.object.clone();
                if member.action == BuildActionType::Drop {
                    object.action = BuildActionType::Drop;
                }
                BuildItem {
                    object,
                    script: member.decl.script.clone(),
                    action: member.action,
                    reason: member.reason,
                }
            })
            .collect();

        info!(
            "Planned {} build items ({} changed, {} pulled in by dependencies) for {}",
            items.len(),
            seeded,
            items.len() - seeded,
            input.target
        );

        Ok(BuildPlan {
            target: input.target.clone(),
            baseline: input.baseline.clone(),
            items,
            teardown,
        })
    }

    /// Parse scripts into a name → declaration map.
    ///
    /// With `strict`, a second declaration of the same object is an error;
    /// otherwise the first declaration wins.
    fn declare<'s>(
        &self,
        scripts: impl Iterator<Item = &'s ScriptFile>,
        strict: bool,
    ) -> CoreResult<BTreeMap<ObjectName, Declared<'s>>> {
        let mut declared: BTreeMap<ObjectName, Declared<'s>> = BTreeMap::new();

        for script in scripts {
            for object in self.parser.parse(script)? {
                if let Some(existing) = declared.get(&object.name) {
                    if strict {
                        return Err(CoreError::DuplicateObject {
                            name: object.name.clone(),
                            path1: existing.script.path.to_string(),
                            path2: script.path.to_string(),
                        });
                    }
                    debug!(
                        "Ignoring earlier declaration of {} in {}",
                        object.name, script.path
                    );
                    continue;
                }
                declared.insert(object.name.clone(), Declared { object, script });
            }
        }

        Ok(declared)
    }

    /// Grow the rebuild set to a fixed point according to the policy.
    ///
    /// A dependent whose script alters in place is not re-run, but the walk
    /// continues through it so whatever depends on it is still reached.
    fn expand<'d, 's>(
        &self,
        graph: &DependencyGraph,
        current: &'d BTreeMap<ObjectName, Declared<'s>>,
        members: &mut BTreeMap<ObjectName, Member<'d, 's>>,
        has_baseline: bool,
    ) {
        let mut pending: Vec<ObjectName> = members.keys().rev().cloned().collect();
        let mut passed_through: BTreeSet<ObjectName> = BTreeSet::new();

        while let Some(name) = pending.pop() {
            let forces = match members.get(&name) {
                Some(member) => self.forces_dependents(member),
                None => passed_through.contains(&name),
            };
            if !forces {
                continue;
            }

            for dependent in graph.dependents(&name) {
                if members.contains_key(dependent) || passed_through.contains(dependent) {
                    continue;
                }
                let Some(decl) = current.get(dependent) else {
                    continue;
                };
                if !decl.object.is_definition() {
                    debug!(
                        "{} depends on {} but its script alters in place; not re-running it",
                        dependent, name
                    );
                    passed_through.insert(dependent.clone());
                    pending.push(dependent.clone());
                    continue;
                }
                debug!("{} is rebuilt because it depends on {}", dependent, name);
                members.insert(
                    dependent.clone(),
                    Member {
                        decl,
                        action: resolve_action(&decl.object, has_baseline),
                        reason: BuildReason::DependencyChanged,
                    },
                );
                pending.push(dependent.clone());
            }
        }
    }

    fn forces_dependents(&self, member: &Member<'_, '_>) -> bool {
        match self.policy {
            ExpansionPolicy::Transitive => true,
            ExpansionPolicy::None => false,
            ExpansionPolicy::Breaking => match member.action {
                BuildActionType::Drop | BuildActionType::Rename => true,
                BuildActionType::Alter => member.decl.object.is_definition(),
                BuildActionType::Create | BuildActionType::NoOp => false,
            },
        }
    }
}

/// A `CREATE` for an object that already exists becomes a redefinition.
fn resolve_action(object: &ObjectDescriptor, existed: bool) -> BuildActionType {
    match object.action {
        BuildActionType::Create if existed => BuildActionType::Alter,
        other => other,
    }
}

/// Full object dependency graph.
///
/// Edges point from a dependency to its dependent, so following outgoing
/// edges walks towards everything that must be rebuilt after a change.
#[derive(Debug, Default)]
struct DependencyGraph {
    graph: DiGraph<ObjectName, ()>,
    node_map: HashMap<ObjectName, NodeIndex>,
}

impl DependencyGraph {
    fn build<'d, 's: 'd>(decls: impl Iterator<Item = &'d Declared<'s>>) -> Self {
        let decls: Vec<&Declared<'_>> = decls.collect();
        let mut dag = Self::default();

        for decl in &decls {
            let idx = dag.graph.add_node(decl.object.name.clone());
            dag.node_map.insert(decl.object.name.clone(), idx);
        }

        for decl in &decls {
            let to = dag.node_map[&decl.object.name];
            for dep in &decl.object.dependencies {
                match dag.node_map.get(dep) {
                    Some(&from) => {
                        dag.graph.update_edge(from, to, ());
                    }
                    None => debug!(
                        "{} depends on {}, which no script declares; assuming it exists",
                        decl.object.name, dep
                    ),
                }
            }
        }

        dag
    }

    /// Direct dependents of an object, in name order
    fn dependents(&self, name: &ObjectName) -> BTreeSet<&ObjectName> {
        match self.node_map.get(name) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .map(|n| &self.graph[n])
                .collect(),
            None => BTreeSet::new(),
        }
    }
}

/// Order the rebuild set over the precedence graph induced on the members.
///
/// A member whose previous declaration referenced a dropped object is also
/// ordered before that drop, even if it no longer references it.
fn order_members(
    members: &BTreeMap<ObjectName, Member<'_, '_>>,
    previous: &BTreeMap<ObjectName, Declared<'_>>,
) -> CoreResult<Vec<ObjectName>> {
    let mut graph: DiGraph<&ObjectName, ()> = DiGraph::new();
    let mut index: HashMap<&ObjectName, NodeIndex> = HashMap::new();
    for name in members.keys() {
        index.insert(name, graph.add_node(name));
    }

    for (name, member) in members {
        for dep in &member.decl.object.dependencies {
            let Some(dep_member) = members.get(dep) else {
                continue;
            };
            // Dependents are dropped or rebuilt before a dropped dependency goes away.
            let (first, then) = if member.action == BuildActionType::Drop
                || dep_member.action == BuildActionType::Drop
            {
                (name, dep)
            } else {
                (dep, name)
            };
            if let (Some(&a), Some(&b)) = (index.get(first), index.get(then)) {
                graph.update_edge(a, b, ());
            }
        }

        let Some(before) = previous.get(name) else {
            continue;
        };
        for dep in &before.object.dependencies {
            let is_dropped = members
                .get(dep)
                .is_some_and(|m| m.action == BuildActionType::Drop);
            if !is_dropped || member.decl.object.dependencies.contains(dep) {
                continue;
            }
            if let (Some(&a), Some(&b)) = (index.get(name), index.get(dep)) {
                graph.update_edge(a, b, ());
            }
        }
    }

    topological_order(&graph)
}

/// Order in which drops and redefinitions take objects out of the database.
///
/// An object comes out before anything it depends on, judged by the
/// declaration currently deployed: the previous one for modified scripts.
fn teardown_order(
    members: &BTreeMap<ObjectName, Member<'_, '_>>,
    previous: &BTreeMap<ObjectName, Declared<'_>>,
) -> CoreResult<Vec<ObjectName>> {
    let removals: BTreeMap<&ObjectName, &Member<'_, '_>> = members
        .iter()
        .filter(|(_, m)| {
            m.action == BuildActionType::Drop
                || (m.action == BuildActionType::Alter && m.decl.object.is_definition())
        })
        .collect();

    let mut graph: DiGraph<&ObjectName, ()> = DiGraph::new();
    let mut index: HashMap<&ObjectName, NodeIndex> = HashMap::new();
    for name in removals.keys() {
        index.insert(*name, graph.add_node(*name));
    }

    for (name, member) in &removals {
        let deployed = previous
            .get(*name)
            .map_or(&member.decl.object, |before| &before.object);
        for dep in &deployed.dependencies {
            if let (Some(&a), Some(&b)) = (index.get(*name), index.get(dep)) {
                graph.update_edge(a, b, ());
            }
        }
    }

    topological_order(&graph)
}

/// Reject cycles, then run Kahn's algorithm always picking the smallest
/// ready name. Edges point from what goes first to what follows.
fn topological_order(graph: &DiGraph<&ObjectName, ()>) -> CoreResult<Vec<ObjectName>> {
    let cyclic: Vec<Vec<NodeIndex>> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .collect();
    if !cyclic.is_empty() {
        let mut names: Vec<ObjectName> = cyclic
            .iter()
            .flatten()
            .map(|&idx| graph[idx].clone())
            .collect();
        names.sort();
        let mut paths: Vec<String> = cyclic
            .iter()
            .map(|component| find_cycle_path(graph, component))
            .collect();
        paths.sort();
        return Err(CoreError::CyclicDependency {
            members: names,
            cycle: paths.join("; "),
        });
    }

    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|idx| {
            (
                idx,
                graph.neighbors_directed(idx, Direction::Incoming).count(),
            )
        })
        .collect();
    let mut ready: BinaryHeap<Reverse<(&ObjectName, NodeIndex)>> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&idx, _)| Reverse((graph[idx], idx)))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse((name, idx))) = ready.pop() {
        order.push(name.clone());
        for next in graph.neighbors_directed(idx, Direction::Outgoing) {
            if let Some(degree) = in_degree.get_mut(&next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse((graph[next], next)));
                }
            }
        }
    }

    Ok(order)
}

/// Walk "depends on" edges inside a strongly connected component starting at
/// its smallest member until a node repeats, e.g. `x -> y -> z -> x`.
fn find_cycle_path(graph: &DiGraph<&ObjectName, ()>, component: &[NodeIndex]) -> String {
    let in_component: BTreeSet<NodeIndex> = component.iter().copied().collect();
    let Some(&start) = component.iter().min_by_key(|&&idx| graph[idx]) else {
        return String::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = graph
            .neighbors_directed(current, Direction::Incoming)
            .filter(|n| in_component.contains(n))
            .min_by_key(|&n| graph[n]);
        let Some(next) = next else {
            break;
        };
        if let Some(pos) = path.iter().position(|&p| p == next) {
            path.drain(..pos);
            path.push(next);
            break;
        }
        path.push(next);
        current = next;
    }

    path.iter()
        .map(|&idx| graph[idx].to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
