use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::builder_node::{BuilderTree, NodeId};
use super::error::InvokeError;
use super::hooks::{Hooks, Invocation};
use super::value::Value;
use crate::materialize::{resolve_back_edges, Entry, Expansion, Materializer};
use crate::FluentError;

#[derive(Debug)]
struct Compiled {
    tree: BuilderTree,
    back_edges: HashMap<NodeId, NodeId>,
}

impl Compiled {
    fn materializer(&self) -> Materializer<'_> {
        Materializer::new(&self.tree, &self.back_edges)
    }
}

/// A compiled, immutable fluent API. Thread-safe and designed to live behind `Arc`.
///
/// Every [`start()`](Self::start) produces an independent [`Chain`] carrying a
/// fresh object from the hooks' `on_create`.
pub struct Fluent<T> {
    compiled: Arc<Compiled>,
    hooks: Hooks<T>,
}

impl<T> Clone for Fluent<T> {
    fn clone(&self) -> Self {
        Self {
            compiled: Arc::clone(&self.compiled),
            hooks: self.hooks.clone(),
        }
    }
}

impl<T> Fluent<T> {
    pub(crate) fn new(tree: BuilderTree, hooks: Hooks<T>) -> Self {
        let back_edges = resolve_back_edges(&tree);
        Self {
            compiled: Arc::new(Compiled { tree, back_edges }),
            hooks,
        }
    }

    /// A chain at the beginning of the primary root rule.
    #[must_use]
    pub fn start(&self) -> Chain<T> {
        let primary = self.compiled.tree.entry_points()[0];
        self.chain_at(primary)
    }

    /// A chain at the beginning of the top rule `rule`, if it is an entry point.
    #[must_use]
    pub fn start_at(&self, rule: &str) -> Option<Chain<T>> {
        let id = self.compiled.tree.entry_point(rule)?;
        Some(self.chain_at(id))
    }

    /// Names of the entry-point rules, primary first.
    #[must_use]
    pub fn entry_points(&self) -> Vec<&str> {
        let tree = &self.compiled.tree;
        tree.entry_points().iter().map(|&id| tree[id].name()).collect()
    }

    #[must_use]
    pub fn tree(&self) -> &BuilderTree {
        &self.compiled.tree
    }

    fn chain_at(&self, rule: NodeId) -> Chain<T> {
        let expansion = self.compiled.materializer().start(rule);
        Chain {
            compiled: Arc::clone(&self.compiled),
            hooks: self.hooks.clone(),
            target: self.hooks.create(),
            expansion,
        }
    }
}

impl<T> fmt::Debug for Fluent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fluent")
            .field("entry_points", &self.entry_points())
            .field("nodes", &self.compiled.tree.len())
            .finish()
    }
}

impl<T> fmt::Display for Fluent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compiled.tree)
    }
}

/// One position in a fluent chain.
///
/// Calling a method consumes the chain and returns the next position; the
/// object produced by the hooks travels along and is returned by
/// [`finish()`](Self::finish).
#[must_use]
pub struct Chain<T> {
    compiled: Arc<Compiled>,
    hooks: Hooks<T>,
    target: T,
    expansion: Expansion,
}

impl<T> Chain<T> {
    /// Method names callable here, in alternative order.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        self.expansion.names(&self.compiled.tree)
    }

    #[must_use]
    pub fn has(&self, method: &str) -> bool {
        !self.expansion.matching(&self.compiled.tree, method).is_empty()
    }

    /// Whether the chain may end at this position.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.expansion.complete
    }

    /// The object carried by this chain.
    #[must_use]
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Invoke `method` with `args` and move to the next position.
    ///
    /// When several alternatives offer the same method, all of them that
    /// accept `args` stay live until later calls tell them apart; the hook
    /// sees the first one.
    ///
    /// # Errors
    ///
    /// [`InvokeError::UnknownMethod`] if `method` is not callable here,
    /// [`InvokeError::Arity`] on an argument count mismatch, and
    /// [`InvokeError::Hook`] if the `on_call` hook fails.
    pub fn call(mut self, method: &str, args: &[Value]) -> Result<Chain<T>, InvokeError> {
        let tree = &self.compiled.tree;
        let matching = self.expansion.matching(tree, method);
        let Some(&candidate) = matching.first() else {
            return Err(InvokeError::UnknownMethod {
                method: method.to_owned(),
                available: self.methods().into_iter().map(str::to_owned).collect(),
            });
        };
        let callable: Vec<&Entry> = matching
            .into_iter()
            .filter(|e| tree[e.method].params.len() == args.len())
            .collect();
        let Some(&entry) = callable.first() else {
            return Err(InvokeError::Arity {
                method: method.to_owned(),
                expected: tree[candidate.method].params.len(),
                got: args.len(),
            });
        };
        let node = &tree[entry.method];

        let invocation = Invocation {
            method: &node.name,
            rule: &node.rule,
            params: &node.params,
            args,
        };
        self.hooks
            .call(&mut self.target, &invocation)
            .map_err(|source| InvokeError::Hook {
                method: method.to_owned(),
                source,
            })?;
        tracing::trace!(method, rule = %node.rule, args = args.len(), "method invoked");

        let expansion = self.compiled.materializer().after(&self.expansion, &callable);
        self.expansion = expansion;
        Ok(self)
    }

    /// Parse a method-chain expression such as `where("address").is(1234)`
    /// and apply each call in order.
    ///
    /// # Errors
    ///
    /// [`FluentError::Parse`] for malformed input, otherwise any error of
    /// [`call()`](Self::call).
    pub fn run(self, input: &str) -> Result<Chain<T>, FluentError> {
        let parsed = crate::parse::parse(input)?;
        let mut chain = self;
        for call in &parsed.calls {
            chain = chain.call(&call.method, &call.args)?;
        }
        Ok(chain)
    }

    /// Return the carried object if the chain may end here.
    ///
    /// # Errors
    ///
    /// [`InvokeError::Incomplete`] when a mandatory method is still expected.
    pub fn finish(self) -> Result<T, InvokeError> {
        if self.expansion.complete {
            Ok(self.target)
        } else {
            Err(InvokeError::Incomplete {
                expected: self.methods().into_iter().map(str::to_owned).collect(),
            })
        }
    }

    /// Return the carried object regardless of position.
    pub fn into_inner(self) -> T {
        self.target
    }
}

impl<T> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("methods", &self.methods())
            .field("complete", &self.expansion.complete)
            .finish_non_exhaustive()
    }
}
