use std::collections::HashMap;

use crate::{CompileError, Rule};

/// Rules that no other rule references, in authoring order.
///
/// A rule that only references itself is still a top rule.
pub(crate) fn top_rules(rules: &[Rule]) -> Vec<&Rule> {
    rules
        .iter()
        .filter(|rule| {
            !rules
                .iter()
                .any(|other| other.name != rule.name && other.references_rule(&rule.name))
        })
        .collect()
}

pub(crate) fn check_references(
    rules: &[Rule],
    rule_map: &HashMap<&str, &Rule>,
) -> Result<(), CompileError> {
    for rule in rules {
        for reference in rule.references() {
            if !rule_map.contains_key(reference) {
                return Err(CompileError::UnresolvedReference {
                    rule: rule.name.clone(),
                    reference: reference.to_owned(),
                });
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DfsState {
    Unvisited,
    InStack,
    Done,
}

/// DFS-based cycle finder over references between distinct rules, used to
/// explain a grammar without entry points.
pub(crate) fn find_cycle(rules: &[Rule]) -> Vec<String> {
    let adj: HashMap<&str, Vec<&str>> = rules
        .iter()
        .map(|rule| {
            let deps = rule
                .references()
                .into_iter()
                .filter(|&dep| dep != rule.name)
                .collect();
            (rule.name.as_str(), deps)
        })
        .collect();

    let mut state: HashMap<&str, DfsState> = rules
        .iter()
        .map(|r| (r.name.as_str(), DfsState::Unvisited))
        .collect();
    let mut stack: Vec<&str> = Vec::new();

    for rule in rules {
        let name = rule.name.as_str();
        if state.get(name) == Some(&DfsState::Unvisited) {
            if let Some(cycle) = dfs(name, &adj, &mut state, &mut stack) {
                return cycle;
            }
        }
    }

    vec![]
}

fn dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    state: &mut HashMap<&'a str, DfsState>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    state.insert(node, DfsState::InStack);
    stack.push(node);

    if let Some(neighbors) = adj.get(node) {
        for &neighbor in neighbors {
            match state.get(neighbor) {
                Some(DfsState::InStack) => {
                    let pos = stack.iter().position(|&n| n == neighbor)?;
                    let mut cycle: Vec<String> =
                        stack[pos..].iter().map(|&s| s.to_owned()).collect();
                    cycle.push(neighbor.to_owned());
                    return Some(cycle);
                }
                Some(DfsState::Unvisited) => {
                    if let Some(cycle) = dfs(neighbor, adj, state, stack) {
                        return Some(cycle);
                    }
                }
                Some(DfsState::Done) | None => {}
            }
        }
    }

    stack.pop();
    state.insert(node, DfsState::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Grammar;

    fn rules_of(build: impl FnOnce(&Grammar)) -> Vec<Rule> {
        let grammar = Grammar::new();
        build(&grammar);
        grammar.rules()
    }

    #[test]
    fn referenced_rule_is_not_top() {
        let rules = rules_of(|g| {
            g.rule("a")
                .unwrap()
                .sym("x")
                .unwrap()
                .reference("b")
                .unwrap()
                .rule("b")
                .unwrap()
                .sym("y")
                .unwrap()
                .end()
                .unwrap();
        });
        let names: Vec<&str> = top_rules(&rules).iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn self_reference_keeps_rule_top() {
        let rules = rules_of(|g| {
            g.rule("list")
                .unwrap()
                .sym("item")
                .unwrap()
                .reference("list")
                .unwrap()
                .optional()
                .unwrap()
                .end()
                .unwrap();
        });
        assert_eq!(top_rules(&rules).len(), 1);
    }

    #[test]
    fn mutual_cycle_has_no_top_rule() {
        let rules = rules_of(|g| {
            g.rule("a")
                .unwrap()
                .reference("b")
                .unwrap()
                .rule("b")
                .unwrap()
                .reference("a")
                .unwrap()
                .end()
                .unwrap();
        });
        assert!(top_rules(&rules).is_empty());
        assert_eq!(find_cycle(&rules), vec!["a", "b", "a"]);
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let rules = rules_of(|g| {
            g.rule("r").unwrap().reference("missing").unwrap().end().unwrap();
        });
        let map: HashMap<&str, &Rule> = rules.iter().map(|r| (r.name(), r)).collect();
        assert_eq!(
            check_references(&rules, &map),
            Err(CompileError::UnresolvedReference {
                rule: "r".into(),
                reference: "missing".into(),
            })
        );
    }
}
