use crate::error::GraphMiddlewareError;
use crate::types::{Params, Value};

/// A query and its parameters bundled together, plus an optional caller tag.
///
/// Statements are immutable once built; the tag travels with the statement so
/// callers can correlate results in a batch:
/// ```rust
/// use graph_middleware::prelude::*;
///
/// let stmt = Statement::new("MATCH (n:Person {name: $name}) RETURN n")
///     .with_param("name", "alice")
///     .with_tag("find-alice");
/// assert_eq!(stmt.tag(), Some("find-alice"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    text: String,
    params: Params,
    tag: Option<String>,
}

impl Statement {
    /// Create a statement with no parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Params::new(),
            tag: None,
        }
    }

    /// Create a statement with the given parameters.
    pub fn with_params(text: impl Into<String>, params: Params) -> Self {
        Self {
            text: text.into(),
            params,
            tag: None,
        }
    }

    /// Return a copy of this statement with one more parameter bound.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Check the statement can be sent.
    ///
    /// # Errors
    /// Returns `GraphMiddlewareError::InvalidStatement` if the text is empty or whitespace.
    pub fn validate(&self) -> Result<(), GraphMiddlewareError> {
        if self.text.trim().is_empty() {
            return Err(GraphMiddlewareError::InvalidStatement(format!(
                "expected a non-empty statement, got \"{}\"",
                self.text
            )));
        }
        Ok(())
    }
}

impl From<&str> for Statement {
    fn from(text: &str) -> Self {
        Statement::new(text)
    }
}

impl From<String> for Statement {
    fn from(text: String) -> Self {
        Statement::new(text)
    }
}

impl<S: Into<String>> From<(S, Params)> for Statement {
    fn from((text, params): (S, Params)) -> Self {
        Statement::with_params(text, params)
    }
}

/// One element of a mixed batch: a loose statement or a whole stack.
#[derive(Debug, Clone)]
pub enum Batched {
    Statement(Statement),
    Stack(crate::stack::Stack),
}

impl From<Statement> for Batched {
    fn from(statement: Statement) -> Self {
        Batched::Statement(statement)
    }
}

impl From<crate::stack::Stack> for Batched {
    fn from(stack: crate::stack::Stack) -> Self {
        Batched::Stack(stack)
    }
}

/// Flatten a mixed batch into one statement list, keeping insertion order.
#[must_use]
pub fn flatten(items: Vec<Batched>) -> Vec<Statement> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Batched::Statement(statement) => out.push(statement),
            Batched::Stack(stack) => out.extend(stack.into_statements()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Stack;

    #[test]
    fn empty_text_is_rejected() {
        assert!(Statement::new("   ").validate().is_err());
        assert!(Statement::new("RETURN 1").validate().is_ok());
    }

    #[test]
    fn flatten_keeps_relative_order() {
        let mut stack = Stack::new(None, None);
        stack.push("B");
        stack.push_write("C");
        let flat = flatten(vec![
            Statement::new("A").into(),
            stack.into(),
            Statement::new("D").into(),
        ]);
        let texts: Vec<_> = flat.iter().map(Statement::text).collect();
        assert_eq!(texts, ["A", "B", "C", "D"]);
    }
}
