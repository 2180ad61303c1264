/// Default limit on nested recursive expansions in a materialized chain.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings that shape how a grammar is compiled and materialized.
///
/// # Example
///
/// ```
/// use fluent_grammar::CompileOptions;
///
/// let options = CompileOptions::new().max_depth(16).main_rule("query");
/// assert_eq!(options.max_depth_limit(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub(crate) max_depth: usize,
    pub(crate) main_rule: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            main_rule: None,
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how many rule expansions may be nested while following
    /// recursive references. Alternatives deeper than this are not offered.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// Use `name` as the primary root instead of the first top rule.
    #[must_use]
    pub fn main_rule(mut self, name: &str) -> Self {
        self.main_rule = Some(name.to_owned());
        self
    }

    #[must_use]
    pub fn max_depth_limit(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn main_rule_name(&self) -> Option<&str> {
        self.main_rule.as_deref()
    }
}
