use std::fmt;
use std::ops::Index;

use super::segment::Repeat;

/// Index of a node inside a [`BuilderTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// A declared argument of a generated method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Declared with `par(name)` or `sym_with(name, params)`.
    Named(String),
    /// Declared with `val()`.
    Value,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Named(name) => f.write_str(name),
            Param::Value => f.write_str("value"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The tree root; its children are the attached top rules, primary first.
    Root,
    /// A generated method, produced by a symbol.
    Method,
    /// An attached rule; its body holds the first node of each definition.
    Rule,
    /// A reference to a rule already being attached on the current path.
    /// Resolved by name against the enclosing rule nodes when materialized.
    BackEdge,
}

/// One chain position produced by the compiler.
///
/// `children` holds what follows this node within its definition; `body`
/// holds the alternatives of an attached rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderNode {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) rule: String,
    pub(crate) params: Vec<Param>,
    pub(crate) optional: bool,
    pub(crate) repeat: Repeat,
    pub(crate) body: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl BuilderNode {
    pub(crate) fn new(kind: NodeKind, name: &str, rule: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            rule: rule.to_owned(),
            params: Vec::new(),
            optional: false,
            repeat: Repeat::Once,
            body: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    /// Method name, or the rule name for rule and back-edge nodes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The rule whose definition produced this node.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    #[must_use]
    pub fn body(&self) -> &[NodeId] {
        &self.body
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// The compiler's output: an arena of [`BuilderNode`]s rooted at [`NodeKind::Root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderTree {
    nodes: Vec<BuilderNode>,
    pub(crate) max_depth: usize,
}

impl BuilderTree {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            nodes: vec![BuilderNode::new(NodeKind::Root, "", "")],
            max_depth,
        }
    }

    pub(crate) fn add(&mut self, node: BuilderNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut BuilderNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub(crate) fn push_body(&mut self, rule: NodeId, child: NodeId) {
        self.nodes[rule.0].body.push(child);
        self.nodes[child.0].parent = Some(rule);
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&BuilderNode> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// The attached top rules, primary root first.
    #[must_use]
    pub fn entry_points(&self) -> &[NodeId] {
        &self.nodes[0].children
    }

    /// The attached top rule called `name`.
    #[must_use]
    pub fn entry_point(&self, name: &str) -> Option<NodeId> {
        self.entry_points()
            .iter()
            .copied()
            .find(|&id| self[id].name == name)
    }

    /// The nearest enclosing rule node named `rule`, starting above `from`.
    #[must_use]
    pub fn enclosing_rule(&self, from: NodeId, rule: &str) -> Option<NodeId> {
        let mut cursor = self[from].parent;
        while let Some(id) = cursor {
            let node = &self[id];
            if node.kind == NodeKind::Rule && node.name == rule {
                return Some(id);
            }
            cursor = node.parent;
        }
        None
    }

    /// Method names in depth-first order.
    #[must_use]
    pub fn method_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_methods(self.root(), &mut out);
        out
    }

    fn collect_methods<'a>(&'a self, id: NodeId, out: &mut Vec<&'a str>) {
        let node = &self[id];
        if node.kind == NodeKind::Method {
            out.push(node.name.as_str());
        }
        for &next in node.body.iter().chain(node.children.iter()) {
            self.collect_methods(next, out);
        }
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize, alt: bool) -> fmt::Result {
        let node = &self[id];
        let indent = "  ".repeat(depth);
        let bar = if alt { "| " } else { "" };
        match node.kind {
            NodeKind::Root => {}
            NodeKind::Method => {
                write!(f, "{indent}{bar}{}", node.name)?;
                if !node.params.is_empty() {
                    let params: Vec<String> = node.params.iter().map(ToString::to_string).collect();
                    write!(f, "({})", params.join(", "))?;
                }
                if node.optional {
                    f.write_str("?")?;
                }
                writeln!(f)?;
            }
            NodeKind::Rule | NodeKind::BackEdge => {
                let caret = if node.kind == NodeKind::BackEdge { "^" } else { "" };
                write!(f, "{indent}{bar}{caret}<{}>", node.name)?;
                match node.repeat {
                    Repeat::Once => {}
                    Repeat::Times(n) => write!(f, "{{..{n}}}")?,
                    Repeat::Unbounded => f.write_str("*")?,
                }
                if node.optional {
                    f.write_str("?")?;
                }
                writeln!(f)?;
            }
        }
        let inner = if node.kind == NodeKind::Root { depth } else { depth + 1 };
        for &alt_id in &node.body {
            self.write_node(f, alt_id, inner, true)?;
        }
        for &child in &node.children {
            self.write_node(f, child, inner, false)?;
        }
        Ok(())
    }
}

impl Index<NodeId> for BuilderTree {
    type Output = BuilderNode;

    fn index(&self, id: NodeId) -> &BuilderNode {
        &self.nodes[id.0]
    }
}

impl fmt::Display for BuilderTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root(), 0, false)
    }
}
