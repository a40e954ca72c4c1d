//! Dependency extraction from SQL AST

use sqlparser::ast::{Expr, ObjectName as SqlObjectName, Query, Statement, Visit, Visitor};
use sqlparser::tokenizer::Token;
use std::collections::{BTreeSet, HashSet};
use std::ops::ControlFlow;

/// Collect every object a statement references, as identifier parts.
///
/// Includes relations in `FROM`/`JOIN`/subqueries, called functions and
/// macros, and `REFERENCES` targets of foreign keys. Names of CTEs defined
/// inside the statement are excluded. The declared object itself may be in
/// the result; callers drop it.
pub fn extract_dependencies(statement: &Statement, tokens: &[Token]) -> BTreeSet<Vec<String>> {
    let mut collector = ReferenceCollector::default();
    let _ = statement.visit(&mut collector);

    let ReferenceCollector {
        mut references,
        ctes,
    } = collector;
    references.retain(|parts| !(parts.len() == 1 && ctes.contains(&parts[0].to_lowercase())));
    references.extend(foreign_key_targets(tokens));
    references
}

#[derive(Default)]
struct ReferenceCollector {
    references: BTreeSet<Vec<String>>,
    ctes: HashSet<String>,
}

impl ReferenceCollector {
    fn add(&mut self, name: &SqlObjectName) {
        let parts: Vec<String> = name
            .0
            .iter()
            .filter_map(|part| part.as_ident())
            .map(|ident| ident.value.clone())
            .collect();
        if !parts.is_empty() {
            self.references.insert(parts);
        }
    }
}

impl Visitor for ReferenceCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.ctes.insert(cte.alias.name.value.to_lowercase());
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &SqlObjectName) -> ControlFlow<()> {
        self.add(relation);
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        if let Expr::Function(function) = expr {
            self.add(&function.name);
        }
        ControlFlow::Continue(())
    }
}

/// Names following `REFERENCES` in column and table constraints
fn foreign_key_targets(tokens: &[Token]) -> Vec<Vec<String>> {
    let mut targets = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Token::Word(word) = token else {
            continue;
        };
        if word.quote_style.is_some() || !word.value.eq_ignore_ascii_case("references") {
            continue;
        }
        let mut parts = Vec::new();
        let mut pos = i + 1;
        while let Some(Token::Word(part)) = tokens.get(pos) {
            parts.push(part.value.clone());
            if !matches!(tokens.get(pos + 1), Some(Token::Period)) {
                break;
            }
            pos += 2;
        }
        if !parts.is_empty() {
            targets.push(parts);
        }
    }

    targets
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
