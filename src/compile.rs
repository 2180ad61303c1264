use std::collections::{HashMap, HashSet};

use crate::resolve::{check_references, find_cycle, top_rules};
use crate::types::{BuilderNode, BuilderTree, NodeId, NodeKind, Param, Repeat};
use crate::{CompileError, CompileOptions, Rule, Segment};

#[tracing::instrument(skip_all, fields(rules = rules.len()))]
pub(crate) fn compile(rules: &[Rule], options: &CompileOptions) -> Result<BuilderTree, CompileError> {
    if rules.is_empty() {
        return Err(CompileError::NoRuleDefined);
    }
    check_definitions(rules)?;

    let rule_map: HashMap<&str, &Rule> = rules.iter().map(|r| (r.name.as_str(), r)).collect();
    check_references(rules, &rule_map)?;

    let roots = entry_rules(rules, &rule_map, options)?;
    tracing::debug!(
        roots = ?roots.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        "entry rules selected"
    );

    let mut compiler = Compiler {
        rule_map,
        tree: BuilderTree::new(options.max_depth),
        on_path: HashSet::new(),
    };
    let root = compiler.tree.root();
    for rule in roots {
        let node = compiler.attach(rule, false, Repeat::Once)?;
        compiler.tree.push_child(root, node);
    }

    tracing::debug!(nodes = compiler.tree.len(), "builder tree compiled");
    Ok(compiler.tree)
}

fn check_definitions(rules: &[Rule]) -> Result<(), CompileError> {
    for rule in rules {
        if let Some(index) = rule.definitions.iter().position(Vec::is_empty) {
            return Err(CompileError::EmptyDefinition {
                rule: rule.name.clone(),
                index,
            });
        }
    }
    Ok(())
}

/// Top rules in authoring order, with the configured main rule moved first.
fn entry_rules<'r>(
    rules: &'r [Rule],
    rule_map: &HashMap<&str, &'r Rule>,
    options: &CompileOptions,
) -> Result<Vec<&'r Rule>, CompileError> {
    let mut roots = top_rules(rules);
    if roots.is_empty() {
        return Err(CompileError::NoEntryPoint {
            cycle: find_cycle(rules),
        });
    }
    if let Some(main) = options.main_rule.as_deref() {
        let rule = *rule_map
            .get(main)
            .ok_or_else(|| CompileError::UnknownMainRule {
                name: main.to_owned(),
            })?;
        roots.retain(|r| r.name != main);
        roots.insert(0, rule);
    }
    Ok(roots)
}

struct Compiler<'r> {
    rule_map: HashMap<&'r str, &'r Rule>,
    tree: BuilderTree,
    // rules being attached on the current recursion path
    on_path: HashSet<&'r str>,
}

impl<'r> Compiler<'r> {
    /// Attach a fresh instance of `rule`; the caller links the returned node.
    fn attach(
        &mut self,
        rule: &'r Rule,
        optional: bool,
        repeat: Repeat,
    ) -> Result<NodeId, CompileError> {
        let mut node = BuilderNode::new(NodeKind::Rule, &rule.name, &rule.name);
        node.optional = optional;
        node.repeat = repeat;
        let id = self.tree.add(node);

        self.on_path.insert(rule.name.as_str());
        for definition in &rule.definitions {
            self.attach_definition(rule, definition, id)?;
        }
        self.on_path.remove(rule.name.as_str());

        tracing::trace!(rule = %rule.name, "rule attached");
        Ok(id)
    }

    fn attach_definition(
        &mut self,
        rule: &'r Rule,
        definition: &'r [Segment],
        owner: NodeId,
    ) -> Result<(), CompileError> {
        let mut current: Option<NodeId> = None;
        let mut last_method: Option<NodeId> = None;

        for segment in definition {
            let node = match segment {
                Segment::Symbol {
                    name,
                    params,
                    optional,
                } => {
                    let mut node = BuilderNode::new(NodeKind::Method, name, &rule.name);
                    node.params = params.iter().cloned().map(Param::Named).collect();
                    node.optional = *optional;
                    let id = self.tree.add(node);
                    last_method = Some(id);
                    id
                }
                Segment::Reference {
                    rule: target,
                    optional,
                    repeat,
                } => self.attach_reference(rule, target, *optional, *repeat)?,
                Segment::Parameter { name } => {
                    if let Some(method) = last_method {
                        self.tree.node_mut(method).params.push(Param::Named(name.clone()));
                    }
                    continue;
                }
                Segment::Value => {
                    if let Some(method) = last_method {
                        self.tree.node_mut(method).params.push(Param::Value);
                    }
                    continue;
                }
                // definitions are already split at alternations
                Segment::Alternation => continue,
            };

            match current {
                Some(prev) => self.tree.push_child(prev, node),
                None => self.tree.push_body(owner, node),
            }
            current = Some(node);
        }
        Ok(())
    }

    fn attach_reference(
        &mut self,
        from: &'r Rule,
        target: &str,
        optional: bool,
        repeat: Repeat,
    ) -> Result<NodeId, CompileError> {
        let rule = *self
            .rule_map
            .get(target)
            .ok_or_else(|| CompileError::UnresolvedReference {
                rule: from.name.clone(),
                reference: target.to_owned(),
            })?;

        if self.on_path.contains(rule.name.as_str()) {
            tracing::trace!(from = %from.name, to = %rule.name, "back-edge recorded");
            let mut node = BuilderNode::new(NodeKind::BackEdge, &rule.name, &from.name);
            node.optional = optional;
            node.repeat = repeat;
            return Ok(self.tree.add(node));
        }

        self.attach(rule, optional, repeat)
    }
}
