use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::builder_node::BuilderTree;
use super::chain::Fluent;
use super::error::AuthoringError;
use super::hooks::{Hooks, Transcript};
use super::options::CompileOptions;
use super::rule::Rule;
use super::segment::{Repeat, Segment};
use crate::FluentError;

const DEFAULT_DESCRIPTION: &str = "Fluent Builder";

/// The registry of rules that is compiled into a fluent API.
///
/// A `Grammar` is a cheap, cloneable handle. Authoring happens through the
/// [`Cursor`] returned by [`rule()`](Self::rule); only one authoring chain may
/// be open at a time, and [`compile()`](Self::compile) freezes the grammar.
///
/// # Example
///
/// ```
/// use fluent_grammar::Grammar;
///
/// # fn main() -> Result<(), fluent_grammar::FluentError> {
/// let grammar = Grammar::new();
/// grammar
///     .rule("select")?
///     .sym("select")?
///     .reference("where")?
///     .rule("where")?
///     .sym("where")?
///     .sym("is")?
///     .end()?;
///
/// let fluent = grammar.compile()?;
/// let chain = fluent.start().call("select", &[])?.call("where", &[])?;
/// assert_eq!(chain.methods(), vec!["is"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Grammar {
    state: Arc<Mutex<GrammarState>>,
}

#[derive(Debug)]
pub(crate) struct GrammarState {
    description: String,
    rules: Vec<Rule>,
    options: CompileOptions,
    frozen: bool,
    lock: Option<u64>,
    next_ticket: u64,
}

impl GrammarState {
    fn check_writable(&self, ticket: Option<u64>) -> Result<(), AuthoringError> {
        if self.frozen {
            return Err(AuthoringError::Frozen);
        }
        if self.lock != ticket {
            return Err(AuthoringError::ConcurrentAuthoring);
        }
        Ok(())
    }

    fn open_rule(&mut self, name: &str) -> Result<usize, AuthoringError> {
        if self.rules.iter().any(|r| r.name == name) {
            return Err(AuthoringError::DuplicateRule {
                name: name.to_owned(),
            });
        }
        self.rules.push(Rule::new(name));
        Ok(self.rules.len() - 1)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::with_description(DEFAULT_DESCRIPTION)
    }
}

impl Grammar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_description(description: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(GrammarState {
                description: description.to_owned(),
                rules: Vec::new(),
                options: CompileOptions::default(),
                frozen: false,
                lock: None,
                next_ticket: 0,
            })),
        }
    }

    /// Replace the compile options.
    ///
    /// # Errors
    ///
    /// Fails like any authoring call if the grammar is frozen or a chain is open.
    pub fn set_options(&self, options: CompileOptions) -> Result<(), AuthoringError> {
        let mut state = self.lock_state();
        state.check_writable(None)?;
        state.options = options;
        Ok(())
    }

    /// Name the rule that becomes the primary root of the compiled API.
    ///
    /// # Errors
    ///
    /// Fails like any authoring call if the grammar is frozen or a chain is open.
    pub fn main_rule(&self, name: &str) -> Result<(), AuthoringError> {
        let mut state = self.lock_state();
        state.check_writable(None)?;
        state.options.main_rule = Some(name.to_owned());
        Ok(())
    }

    /// Open a new rule and return a cursor positioned on it.
    ///
    /// The returned cursor holds the grammar's authoring lock until it is
    /// ended or dropped.
    ///
    /// # Errors
    ///
    /// [`AuthoringError::DuplicateRule`] if `name` exists,
    /// [`AuthoringError::ConcurrentAuthoring`] if another chain is open,
    /// [`AuthoringError::Frozen`] after compilation.
    pub fn rule(&self, name: &str) -> Result<Cursor, AuthoringError> {
        let mut state = self.lock_state();
        state.check_writable(None)?;
        let rule = state.open_rule(name)?;
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.lock = Some(ticket);
        drop(state);
        Ok(Cursor {
            grammar: self.clone(),
            ticket: Some(ticket),
            rule,
            kind: CursorKind::Rule,
            anchor: None,
        })
    }

    /// Compile into a fluent API whose chains record a [`Transcript`].
    ///
    /// # Errors
    ///
    /// Returns [`FluentError::Compile`] when the grammar is malformed and
    /// [`FluentError::Authoring`] while an authoring chain is still open.
    pub fn compile(&self) -> Result<Fluent<Transcript>, FluentError> {
        self.compile_with(Hooks::transcript())
    }

    /// Compile into a fluent API driven by caller-supplied hooks.
    ///
    /// # Errors
    ///
    /// Same as [`compile()`](Self::compile).
    pub fn compile_with<T>(&self, hooks: Hooks<T>) -> Result<Fluent<T>, FluentError> {
        let tree = self.compile_tree()?;
        Ok(Fluent::new(tree, hooks))
    }

    /// Run the resolver and compiler without materializing.
    ///
    /// # Errors
    ///
    /// Same as [`compile()`](Self::compile).
    pub fn compile_tree(&self) -> Result<BuilderTree, FluentError> {
        let mut state = self.lock_state();
        if state.lock.is_some() {
            return Err(AuthoringError::ConcurrentAuthoring.into());
        }
        state.frozen = true;
        let tree = crate::compile::compile(&state.rules, &state.options)?;
        Ok(tree)
    }

    #[must_use]
    pub fn find_rule(&self, name: &str) -> Option<Rule> {
        self.lock_state()
            .rules
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }

    /// Snapshot of all rules in authoring order.
    #[must_use]
    pub fn rules(&self) -> Vec<Rule> {
        self.lock_state().rules.clone()
    }

    /// Names of the rules no other rule references, in authoring order.
    #[must_use]
    pub fn top_rules(&self) -> Vec<String> {
        let state = self.lock_state();
        crate::resolve::top_rules(&state.rules)
            .into_iter()
            .map(|r| r.name.clone())
            .collect()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.lock_state().frozen
    }

    #[must_use]
    pub fn description(&self) -> String {
        self.lock_state().description.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, GrammarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Grammar")
            .field("description", &state.description)
            .field("rules", &state.rules)
            .field("frozen", &state.frozen)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        write!(f, "{}", state.description)?;
        for rule in &state.rules {
            write!(f, "\n  {rule}")?;
        }
        Ok(())
    }
}

/// What the last authoring call produced; decides which calls may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// A freshly opened rule with no segments yet.
    Rule,
    Symbol,
    Reference,
    Parameter,
    Value,
    /// A freshly opened alternative definition.
    Alternation,
}

impl CursorKind {
    fn after_segment(self) -> bool {
        matches!(
            self,
            CursorKind::Symbol | CursorKind::Reference | CursorKind::Parameter | CursorKind::Value
        )
    }

    fn after_symbol(self) -> bool {
        matches!(
            self,
            CursorKind::Symbol | CursorKind::Parameter | CursorKind::Value
        )
    }
}

impl fmt::Display for CursorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CursorKind::Rule => "a rule head",
            CursorKind::Symbol => "a symbol",
            CursorKind::Reference => "a reference",
            CursorKind::Parameter => "a parameter",
            CursorKind::Value => "a value",
            CursorKind::Alternation => "an alternation",
        };
        f.write_str(s)
    }
}

/// Position in an open authoring chain.
///
/// Each call consumes the cursor and returns the next one, so the chain reads
/// like the grammar it describes. Calls that make no sense at the current
/// position fail with [`AuthoringError::InvalidSequence`]:
///
/// | after        | allowed next                                              |
/// |--------------|-----------------------------------------------------------|
/// | rule, or     | `sym`, `reference`                                        |
/// | symbol       | `sym`, `reference`, `par`, `val`, `or`, `rule`, `optional`, `end` |
/// | par, val     | same as symbol                                            |
/// | reference    | `sym`, `reference`, `or`, `rule`, `optional`, `repeat`, `end` |
///
/// Dropping a cursor releases the authoring lock.
#[derive(Debug)]
#[must_use = "a cursor holds the authoring lock until it is ended or dropped"]
pub struct Cursor {
    grammar: Grammar,
    ticket: Option<u64>,
    rule: usize,
    kind: CursorKind,
    // index of the last symbol or reference in the open definition
    anchor: Option<usize>,
}

impl Cursor {
    #[must_use]
    pub fn kind(&self) -> CursorKind {
        self.kind
    }

    /// Append a symbol, which becomes one generated method.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn sym(self, name: &str) -> Result<Cursor, AuthoringError> {
        self.sym_with(name, &[])
    }

    /// Append a symbol that takes the given named parameters.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn sym_with(self, name: &str, params: &[&str]) -> Result<Cursor, AuthoringError> {
        let params: Vec<String> = params.iter().map(|p| (*p).to_owned()).collect();
        self.push("sym", |_| true, CursorKind::Symbol, Segment::symbol(name, params))
    }

    /// Append a reference to another rule.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn reference(self, rule: &str) -> Result<Cursor, AuthoringError> {
        self.push("reference", |_| true, CursorKind::Reference, Segment::reference(rule))
    }

    /// Declare a named argument of the preceding symbol.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn par(self, name: &str) -> Result<Cursor, AuthoringError> {
        let segment = Segment::Parameter {
            name: name.to_owned(),
        };
        self.push("par", CursorKind::after_symbol, CursorKind::Parameter, segment)
    }

    /// Declare a positional literal argument of the preceding symbol.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn val(self) -> Result<Cursor, AuthoringError> {
        self.push("val", CursorKind::after_symbol, CursorKind::Value, Segment::Value)
    }

    /// Mark the preceding symbol or reference as omittable.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn optional(self) -> Result<Cursor, AuthoringError> {
        self.mark("optional", CursorKind::after_segment, |seg| match seg {
            Segment::Symbol { optional, .. } | Segment::Reference { optional, .. } => {
                *optional = true;
            }
            _ => {}
        })
    }

    /// Let the preceding reference occur any number of times.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn repeat(self) -> Result<Cursor, AuthoringError> {
        self.repeat_times(-1)
    }

    /// Let the preceding reference occur up to `times` times; a negative
    /// count means unbounded.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn repeat_times(self, times: i64) -> Result<Cursor, AuthoringError> {
        let count = Repeat::from_times(times);
        self.mark(
            "repeat",
            |kind| kind == CursorKind::Reference,
            |seg| {
                if let Segment::Reference { repeat, .. } = seg {
                    *repeat = count;
                }
            },
        )
    }

    /// Close the current definition and open an alternative one.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn or(mut self) -> Result<Cursor, AuthoringError> {
        let ticket = self.ticket;
        {
            let mut state = self.grammar.lock_state();
            state.check_writable(ticket)?;
            check_sequence("or", self.kind, CursorKind::after_segment)?;
            state.rules[self.rule].definitions.push(Vec::new());
        }
        Ok(Cursor {
            grammar: self.grammar.clone(),
            ticket: self.ticket.take(),
            rule: self.rule,
            kind: CursorKind::Alternation,
            anchor: None,
        })
    }

    /// Open the next rule in the same chain.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`]; also [`AuthoringError::DuplicateRule`].
    pub fn rule(mut self, name: &str) -> Result<Cursor, AuthoringError> {
        let ticket = self.ticket;
        let rule = {
            let mut state = self.grammar.lock_state();
            state.check_writable(ticket)?;
            check_sequence("rule", self.kind, CursorKind::after_segment)?;
            state.open_rule(name)?
        };
        Ok(Cursor {
            grammar: self.grammar.clone(),
            ticket: self.ticket.take(),
            rule,
            kind: CursorKind::Rule,
            anchor: None,
        })
    }

    /// Finish the authoring chain and release the lock.
    ///
    /// # Errors
    ///
    /// See the table on [`Cursor`].
    pub fn end(mut self) -> Result<Grammar, AuthoringError> {
        let ticket = self.ticket;
        {
            let mut state = self.grammar.lock_state();
            state.check_writable(ticket)?;
            check_sequence("end", self.kind, CursorKind::after_segment)?;
            state.lock = None;
        }
        self.ticket = None;
        Ok(self.grammar.clone())
    }

    /// Finish the chain and compile the grammar with default hooks.
    ///
    /// # Errors
    ///
    /// Any error of [`end()`](Self::end) or [`Grammar::compile()`].
    pub fn build(self) -> Result<Fluent<Transcript>, FluentError> {
        self.end()?.compile()
    }

    fn push(
        mut self,
        op: &'static str,
        allowed: impl Fn(CursorKind) -> bool,
        kind: CursorKind,
        segment: Segment,
    ) -> Result<Cursor, AuthoringError> {
        let ticket = self.ticket;
        let (index, anchor) = {
            let mut state = self.grammar.lock_state();
            state.check_writable(ticket)?;
            check_sequence(op, self.kind, allowed)?;
            let def = state.rules[self.rule].current_definition_mut();
            def.push(segment);
            let index = def.len() - 1;
            let anchor = match kind {
                CursorKind::Symbol | CursorKind::Reference => Some(index),
                _ => self.anchor,
            };
            (index, anchor)
        };
        tracing::trace!(op, index, "segment appended");
        Ok(Cursor {
            grammar: self.grammar.clone(),
            ticket: self.ticket.take(),
            rule: self.rule,
            kind,
            anchor,
        })
    }

    fn mark(
        mut self,
        op: &'static str,
        allowed: impl Fn(CursorKind) -> bool,
        apply: impl FnOnce(&mut Segment),
    ) -> Result<Cursor, AuthoringError> {
        let ticket = self.ticket;
        {
            let mut state = self.grammar.lock_state();
            state.check_writable(ticket)?;
            check_sequence(op, self.kind, allowed)?;
            let anchor = self.anchor.ok_or(AuthoringError::InvalidSequence {
                op,
                cursor: self.kind,
            })?;
            let def = state.rules[self.rule].current_definition_mut();
            if let Some(seg) = def.get_mut(anchor) {
                apply(seg);
            }
        }
        Ok(Cursor {
            grammar: self.grammar.clone(),
            ticket: self.ticket.take(),
            rule: self.rule,
            kind: self.kind,
            anchor: self.anchor,
        })
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            let mut state = self.grammar.lock_state();
            if state.lock == Some(ticket) {
                state.lock = None;
            }
        }
    }
}

fn check_sequence(
    op: &'static str,
    cursor: CursorKind,
    allowed: impl Fn(CursorKind) -> bool,
) -> Result<(), AuthoringError> {
    if allowed(cursor) {
        Ok(())
    } else {
        Err(AuthoringError::InvalidSequence { op, cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_opens_and_end_releases_lock() {
        let grammar = Grammar::new();
        let cursor = grammar.rule("x").unwrap().sym("a").unwrap();
        assert!(matches!(
            grammar.rule("y"),
            Err(AuthoringError::ConcurrentAuthoring)
        ));
        cursor.end().unwrap();
        assert!(grammar.rule("y").is_ok());
    }

    #[test]
    fn dropping_cursor_releases_lock() {
        let grammar = Grammar::new();
        {
            let _cursor = grammar.rule("x").unwrap().sym("a").unwrap();
        }
        assert!(grammar.rule("y").is_ok());
    }

    #[test]
    fn failed_call_releases_lock_and_keeps_state() {
        let grammar = Grammar::new();
        let result = grammar.rule("x").unwrap().sym("a").unwrap().repeat();
        assert!(matches!(
            result,
            Err(AuthoringError::InvalidSequence {
                op: "repeat",
                cursor: CursorKind::Symbol
            })
        ));
        let rule = grammar.find_rule("x").unwrap();
        assert_eq!(rule.definitions(), &[vec![Segment::symbol("a", vec![])]]);
        assert!(grammar.rule("y").is_ok());
    }

    #[test]
    fn duplicate_rule_in_chain() {
        let grammar = Grammar::new();
        let result = grammar.rule("x").unwrap().sym("a").unwrap().rule("x");
        assert_eq!(
            result.unwrap_err(),
            AuthoringError::DuplicateRule { name: "x".into() }
        );
        assert_eq!(grammar.rules().len(), 1);
    }

    #[test]
    fn optional_marks_anchor_after_parameter() {
        let grammar = Grammar::new();
        grammar
            .rule("q")
            .unwrap()
            .sym("select")
            .unwrap()
            .par("what")
            .unwrap()
            .optional()
            .unwrap()
            .end()
            .unwrap();
        let rule = grammar.find_rule("q").unwrap();
        assert!(rule.definitions()[0][0].is_optional());
        assert_eq!(
            rule.definitions()[0][1],
            Segment::Parameter {
                name: "what".into()
            }
        );
    }

    #[test]
    fn cursor_kind_display() {
        assert_eq!(CursorKind::Rule.to_string(), "a rule head");
        assert_eq!(CursorKind::Alternation.to_string(), "an alternation");
    }

    #[test]
    fn display_lists_rules() {
        let grammar = Grammar::with_description("Query builder");
        grammar
            .rule("build")
            .unwrap()
            .sym("observe")
            .unwrap()
            .or()
            .unwrap()
            .sym("then")
            .unwrap()
            .end()
            .unwrap();
        assert_eq!(
            grammar.to_string(),
            "Query builder\n  build := observe | then"
        );
    }
}
