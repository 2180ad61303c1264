use std::fmt;

/// How often a referenced rule may occur at its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Repeat {
    /// Exactly one occurrence (zero or one when optional).
    #[default]
    Once,
    /// At most `n` consecutive occurrences.
    Times(u32),
    /// Any number of consecutive occurrences.
    Unbounded,
}

impl Repeat {
    /// Negative counts mean unbounded; `0` and `1` mean a single occurrence.
    #[must_use]
    pub fn from_times(times: i64) -> Self {
        match times {
            t if t < 0 => Repeat::Unbounded,
            0 | 1 => Repeat::Once,
            t => Repeat::Times(u32::try_from(t).unwrap_or(u32::MAX)),
        }
    }

    /// Whether another occurrence is allowed after `done` completed ones.
    #[must_use]
    pub fn allows_another(self, done: u32) -> bool {
        match self {
            Repeat::Once => false,
            Repeat::Times(n) => done < n,
            Repeat::Unbounded => true,
        }
    }
}

/// One element of a rule definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A terminal; becomes one generated method.
    Symbol {
        name: String,
        params: Vec<String>,
        optional: bool,
    },
    /// A non-terminal, replaced by the target rule's sub-tree at compile time.
    Reference {
        rule: String,
        optional: bool,
        repeat: Repeat,
    },
    /// A named argument of the nearest preceding symbol.
    Parameter { name: String },
    /// A positional literal argument of the nearest preceding symbol.
    Value,
    /// Marker that starts a new definition in the same rule.
    Alternation,
}

impl Segment {
    pub(crate) fn symbol(name: &str, params: Vec<String>) -> Self {
        Segment::Symbol {
            name: name.to_owned(),
            params,
            optional: false,
        }
    }

    pub(crate) fn reference(rule: &str) -> Self {
        Segment::Reference {
            rule: rule.to_owned(),
            optional: false,
            repeat: Repeat::Once,
        }
    }

    /// The referenced rule name, if this is a reference.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Segment::Reference { rule, .. } => Some(rule),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Segment::Symbol { optional: true, .. } | Segment::Reference { optional: true, .. }
        )
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Symbol {
                name,
                params,
                optional,
            } => {
                write!(f, "{name}")?;
                if !params.is_empty() {
                    write!(f, "({})", params.join(", "))?;
                }
                if *optional {
                    write!(f, "?")?;
                }
                Ok(())
            }
            Segment::Reference {
                rule,
                optional,
                repeat,
            } => {
                write!(f, "<{rule}>")?;
                match repeat {
                    Repeat::Once => {}
                    Repeat::Times(n) => write!(f, "{{..{n}}}")?,
                    Repeat::Unbounded => write!(f, "*")?,
                }
                if *optional {
                    write!(f, "?")?;
                }
                Ok(())
            }
            Segment::Parameter { name } => write!(f, ":{name}"),
            Segment::Value => write!(f, ":value"),
            Segment::Alternation => write!(f, "|"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_from_times() {
        assert_eq!(Repeat::from_times(-1), Repeat::Unbounded);
        assert_eq!(Repeat::from_times(0), Repeat::Once);
        assert_eq!(Repeat::from_times(1), Repeat::Once);
        assert_eq!(Repeat::from_times(3), Repeat::Times(3));
    }

    #[test]
    fn repeat_allows_another() {
        assert!(!Repeat::Once.allows_another(1));
        assert!(Repeat::Times(3).allows_another(2));
        assert!(!Repeat::Times(3).allows_another(3));
        assert!(Repeat::Unbounded.allows_another(1000));
    }

    #[test]
    fn display_segments() {
        let mut sym = Segment::symbol("select", vec!["what".into()]);
        assert_eq!(sym.to_string(), "select(what)");
        if let Segment::Symbol { optional, .. } = &mut sym {
            *optional = true;
        }
        assert_eq!(sym.to_string(), "select(what)?");

        let reference = Segment::Reference {
            rule: "where".into(),
            optional: true,
            repeat: Repeat::Unbounded,
        };
        assert_eq!(reference.to_string(), "<where>*?");
        assert_eq!(Segment::Value.to_string(), ":value");
    }

    #[test]
    fn target_only_for_references() {
        assert_eq!(Segment::reference("x").target(), Some("x"));
        assert_eq!(Segment::symbol("x", vec![]).target(), None);
    }
}
