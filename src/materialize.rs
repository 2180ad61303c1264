use std::collections::{HashMap, HashSet};

use crate::types::{BuilderTree, NodeId, NodeKind, Repeat};

/// Index of a stack node inside one [`Expansion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StackId(usize);

/// The rule nesting a chain position runs in; `None` is the top level.
type Stack = Option<StackId>;

/// One level of rule expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Frame {
    /// Rule node whose body is being walked.
    body: NodeId,
    /// Node that opened the expansion: the rule node itself, or the back-edge
    /// that re-entered it. Its repeat and continuation apply on exit.
    origin: NodeId,
    iteration: u32,
}

/// A frame shared by every nesting that opened it at the same position.
///
/// The stacks below it are the union of its parents' stacks, so positions
/// reached through different back-edges collapse onto one node.
#[derive(Debug, Clone)]
struct StackNode {
    frame: Frame,
    /// Back-edge frames on the stack, this one included.
    depth: usize,
    parents: Vec<Stack>,
}

/// A method callable at some chain position, with the nesting it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) method: NodeId,
    stack: Stack,
}

/// Everything callable at one chain position.
#[derive(Debug, Clone, Default)]
pub(crate) struct Expansion {
    pub(crate) entries: Vec<Entry>,
    pub(crate) complete: bool,
    stacks: Vec<StackNode>,
}

impl Expansion {
    /// Every entry for the method `name`, in alternative order.
    pub(crate) fn matching(&self, tree: &BuilderTree, name: &str) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| tree[e.method].name == name)
            .collect()
    }

    /// Method names without duplicates; the earliest alternative wins.
    pub(crate) fn names<'t>(&self, tree: &'t BuilderTree) -> Vec<&'t str> {
        let mut out: Vec<&str> = Vec::new();
        for entry in &self.entries {
            let name = tree[entry.method].name.as_str();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}

/// Back-edge nodes resolved to the rule node they re-enter.
pub(crate) fn resolve_back_edges(tree: &BuilderTree) -> HashMap<NodeId, NodeId> {
    let mut out = HashMap::new();
    for index in 0..tree.len() {
        let id = NodeId(index);
        let node = &tree[id];
        if node.kind != NodeKind::BackEdge {
            continue;
        }
        match tree.enclosing_rule(id, &node.name) {
            Some(target) => {
                out.insert(id, target);
            }
            None => tracing::warn!(rule = %node.name, "back-edge without enclosing rule"),
        }
    }
    out
}

/// Computes the methods reachable from a chain position.
///
/// Walking stops at methods; optional nodes also continue past themselves,
/// and finishing a rule's definition either repeats the rule or resumes after
/// the node that opened it. Only frames opened by back-edges count towards
/// the tree's `max_depth`.
pub(crate) struct Materializer<'t> {
    tree: &'t BuilderTree,
    back_edges: &'t HashMap<NodeId, NodeId>,
}

impl<'t> Materializer<'t> {
    pub(crate) fn new(tree: &'t BuilderTree, back_edges: &'t HashMap<NodeId, NodeId>) -> Self {
        Self { tree, back_edges }
    }

    /// Entries at the beginning of an attached top rule.
    pub(crate) fn start(&self, rule: NodeId) -> Expansion {
        let mut walk = Walk::new(self.tree, self.back_edges);
        walk.enter(rule, None);
        walk.out
    }

    /// Entries after a call matched by `entries` of `prev` has been invoked.
    pub(crate) fn after(&self, prev: &Expansion, entries: &[&Entry]) -> Expansion {
        let mut walk = Walk::new(self.tree, self.back_edges);
        for entry in entries {
            let stack = walk.import(prev, entry.stack);
            walk.advance(entry.method, stack);
        }
        walk.out
    }
}

/// State of one expansion in progress.
struct Walk<'t> {
    tree: &'t BuilderTree,
    back_edges: &'t HashMap<NodeId, NodeId>,
    out: Expansion,
    /// Frames opened during this walk, keyed by frame and depth.
    opened: HashMap<(Frame, usize), StackId>,
    /// Stack nodes of the previous position, by their id there.
    imported: HashMap<StackId, StackId>,
    seen: HashSet<(NodeId, Stack)>,
    /// Stack nodes whose frame already finished during this walk.
    popped: HashSet<StackId>,
}

impl<'t> Walk<'t> {
    fn new(tree: &'t BuilderTree, back_edges: &'t HashMap<NodeId, NodeId>) -> Self {
        Self {
            tree,
            back_edges,
            out: Expansion::default(),
            opened: HashMap::new(),
            imported: HashMap::new(),
            seen: HashSet::new(),
            popped: HashSet::new(),
        }
    }

    /// Copy `stack` and everything below it out of `prev`.
    ///
    /// Imported nodes are never merged with frames opened in this walk: they
    /// sit at an earlier position of their rule's body.
    fn import(&mut self, prev: &Expansion, stack: Stack) -> Stack {
        let old = stack?;
        if let Some(&id) = self.imported.get(&old) {
            return Some(id);
        }
        let node = &prev.stacks[old.0];
        let id = StackId(self.out.stacks.len());
        self.out.stacks.push(StackNode {
            frame: node.frame,
            depth: node.depth,
            parents: Vec::new(),
        });
        self.imported.insert(old, id);
        let parents: Vec<Stack> = node.parents.iter().map(|&p| self.import(prev, p)).collect();
        self.out.stacks[id.0].parents = parents;
        Some(id)
    }

    fn enter(&mut self, id: NodeId, stack: Stack) {
        if !self.seen.insert((id, stack)) {
            return;
        }
        let tree = self.tree;
        let node = &tree[id];
        match node.kind {
            NodeKind::Method => self.out.entries.push(Entry { method: id, stack }),
            NodeKind::Rule => self.open(id, id, 1, stack),
            NodeKind::BackEdge => {
                if let Some(&target) = self.back_edges.get(&id) {
                    self.open(target, id, 1, stack);
                }
            }
            NodeKind::Root => {}
        }
        if node.optional {
            self.advance(id, stack);
        }
    }

    /// Push a frame for `body` onto `parent` and enter its alternatives.
    fn open(&mut self, body: NodeId, origin: NodeId, iteration: u32, parent: Stack) {
        let tree = self.tree;
        let below = parent.map_or(0, |p| self.out.stacks[p.0].depth);
        let depth = if tree[origin].kind == NodeKind::BackEdge {
            below + 1
        } else {
            below
        };
        if depth > tree.max_depth {
            tracing::debug!(
                rule = %tree[body].name,
                depth,
                "expansion truncated at depth limit"
            );
            return;
        }
        let frame = Frame {
            body,
            origin,
            iteration,
        };
        let id = match self.opened.get(&(frame, depth)) {
            Some(&id) => {
                if !self.out.stacks[id.0].parents.contains(&parent) {
                    self.out.stacks[id.0].parents.push(parent);
                    if self.popped.contains(&id) {
                        self.resume(id, parent);
                    }
                }
                id
            }
            None => {
                let id = StackId(self.out.stacks.len());
                self.out.stacks.push(StackNode {
                    frame,
                    depth,
                    parents: vec![parent],
                });
                self.opened.insert((frame, depth), id);
                id
            }
        };
        for &alt in &tree[body].body {
            self.enter(alt, Some(id));
        }
    }

    /// Continue after `id` has been completed.
    fn advance(&mut self, id: NodeId, stack: Stack) {
        match self.tree[id].children.first() {
            Some(&next) => self.enter(next, stack),
            None => self.finish(stack),
        }
    }

    fn finish(&mut self, stack: Stack) {
        let Some(id) = stack else {
            self.out.complete = true;
            return;
        };
        if !self.popped.insert(id) {
            return;
        }
        let parents = self.out.stacks[id.0].parents.clone();
        for parent in parents {
            self.resume(id, parent);
        }
    }

    /// Leave the finished frame `id` into one of the stacks below it.
    fn resume(&mut self, id: StackId, parent: Stack) {
        let frame = self.out.stacks[id.0].frame;
        let repeat = self.tree[frame.origin].repeat;
        if repeat.allows_another(frame.iteration) {
            // unbounded repeats do not count, so re-entry converges in `opened`
            let iteration = match repeat {
                Repeat::Unbounded => frame.iteration,
                _ => frame.iteration + 1,
            };
            self.open(frame.body, frame.origin, iteration, parent);
        }
        self.advance(frame.origin, parent);
    }
}
