use std::fmt;
use std::sync::Arc;

use super::builder_node::Param;
use super::error::HookError;
use super::value::Value;

type CreateFn<T> = dyn Fn() -> T + Send + Sync;
type CallFn<T> = dyn Fn(&mut T, &Invocation<'_>) -> Result<(), HookError> + Send + Sync;

/// Caller-supplied behavior attached to a compiled grammar.
///
/// `on_create` produces the object each chain carries; `on_call` runs for
/// every generated-method invocation and may mutate that object.
///
/// # Example
///
/// ```
/// use fluent_grammar::{Grammar, Hooks};
///
/// # fn main() -> Result<(), fluent_grammar::FluentError> {
/// let grammar = Grammar::new();
/// grammar.rule("q")?.sym_with("select", &["what"])?.end()?;
///
/// let hooks = Hooks::new(String::new).on_call(|sql: &mut String, call| {
///     sql.push_str(&format!("{} {}", call.method(), call.args()[0]));
///     Ok(())
/// });
/// let fluent = grammar.compile_with(hooks)?;
/// let sql = fluent.start().call("select", &["name".into()])?.finish()?;
/// assert_eq!(sql, "select \"name\"");
/// # Ok(())
/// # }
/// ```
pub struct Hooks<T> {
    pub(crate) on_create: Arc<CreateFn<T>>,
    pub(crate) on_call: Arc<CallFn<T>>,
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        Self {
            on_create: Arc::clone(&self.on_create),
            on_call: Arc::clone(&self.on_call),
        }
    }
}

impl<T> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

impl<T: 'static> Hooks<T> {
    /// Hooks whose chains carry the object built by `on_create`; calls are
    /// accepted without side effects until [`on_call`](Self::on_call) is set.
    pub fn new(on_create: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            on_create: Arc::new(on_create),
            on_call: Arc::new(|_: &mut T, _: &Invocation<'_>| -> Result<(), HookError> {
                Ok(())
            }),
        }
    }

    #[must_use]
    pub fn on_call(
        mut self,
        f: impl Fn(&mut T, &Invocation<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        self.on_call = Arc::new(f);
        self
    }
}

impl<T> Hooks<T> {
    pub(crate) fn create(&self) -> T {
        (self.on_create)()
    }

    pub(crate) fn call(&self, target: &mut T, invocation: &Invocation<'_>) -> Result<(), HookError> {
        (self.on_call)(target, invocation)
    }
}

impl Hooks<Transcript> {
    /// The default hooks: every call is appended to a [`Transcript`].
    #[must_use]
    pub fn transcript() -> Self {
        Hooks::new(Transcript::default).on_call(|transcript, call| {
            transcript.record(call);
            Ok(())
        })
    }
}

/// One generated-method call, as seen by [`Hooks::on_call`].
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub(crate) method: &'a str,
    pub(crate) rule: &'a str,
    pub(crate) params: &'a [Param],
    pub(crate) args: &'a [Value],
}

impl<'a> Invocation<'a> {
    #[must_use]
    pub fn method(&self) -> &'a str {
        self.method
    }

    /// The rule whose definition declares this method.
    #[must_use]
    pub fn rule(&self) -> &'a str {
        self.rule
    }

    #[must_use]
    pub fn params(&self) -> &'a [Param] {
        self.params
    }

    #[must_use]
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// The argument bound to the named parameter `name`.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&'a Value> {
        self.params
            .iter()
            .position(|p| matches!(p, Param::Named(n) if n == name))
            .and_then(|i| self.args.get(i))
    }
}

/// A recorded method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.method, args.join(", "))
    }
}

/// Ordered record of the calls made along a chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    calls: Vec<Call>,
}

impl Transcript {
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Method names in call order.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.method.as_str()).collect()
    }

    fn record(&mut self, invocation: &Invocation<'_>) {
        self.calls.push(Call {
            method: invocation.method.to_owned(),
            args: invocation.args.to_vec(),
        });
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let calls: Vec<String> = self.calls.iter().map(ToString::to_string).collect();
        f.write_str(&calls.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_arg_by_name() {
        let params = [Param::Named("qualifier".into()), Param::Value];
        let args = [Value::from("address"), Value::from(1234_i64)];
        let call = Invocation {
            method: "is",
            rule: "expression",
            params: &params,
            args: &args,
        };
        assert_eq!(call.arg("qualifier"), Some(&Value::from("address")));
        assert_eq!(call.arg("missing"), None);
    }

    #[test]
    fn transcript_records_calls() {
        let hooks = Hooks::transcript();
        let mut transcript = hooks.create();
        let args = [Value::from("order")];
        let call = Invocation {
            method: "select",
            rule: "query",
            params: &[],
            args: &args,
        };
        hooks.call(&mut transcript, &call).unwrap();
        assert_eq!(transcript.methods(), vec!["select"]);
        assert_eq!(transcript.to_string(), r#"select("order")"#);
    }
}
