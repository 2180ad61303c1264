use std::fmt;

use super::segment::Segment;

/// One ordered sequence of segments satisfying a [`Rule`].
pub type Definition = Vec<Segment>;

/// A named set of alternative definitions.
///
/// Rules are created through [`Grammar::rule()`](crate::Grammar::rule) and
/// the cursor it returns; a rule with N definitions reads as
/// "definition 1 OR ... OR definition N".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub(crate) name: String,
    pub(crate) definitions: Vec<Definition>,
}

impl Rule {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            definitions: vec![Vec::new()],
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Names of the rules this rule references, in order of appearance.
    /// A name referenced more than once is listed once.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for target in self.definitions.iter().flatten().filter_map(Segment::target) {
            if !out.contains(&target) {
                out.push(target);
            }
        }
        out
    }

    /// Whether any definition of this rule references `name`.
    #[must_use]
    pub fn references_rule(&self, name: &str) -> bool {
        self.definitions
            .iter()
            .flatten()
            .any(|seg| seg.target() == Some(name))
    }

    /// All segments with an [`Segment::Alternation`] marker between definitions.
    #[must_use]
    pub fn segments(&self) -> Vec<Segment> {
        let mut out = Vec::new();
        for (i, def) in self.definitions.iter().enumerate() {
            if i > 0 {
                out.push(Segment::Alternation);
            }
            out.extend(def.iter().cloned());
        }
        out
    }

    pub(crate) fn current_definition_mut(&mut self) -> &mut Definition {
        if self.definitions.is_empty() {
            self.definitions.push(Vec::new());
        }
        let last = self.definitions.len() - 1;
        &mut self.definitions[last]
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :=", self.name)?;
        for seg in self.segments() {
            write!(f, " {seg}")?;
        }
        Ok(())
    }
}
