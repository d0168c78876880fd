use crate::statement::Statement;

/// Caller-assembled, transport-agnostic batch of statements.
///
/// A stack is built without touching any connection and handed to
/// [`Client::run_stack`](crate::Client::run_stack) (or queued on a
/// [`Transaction`](crate::Transaction)) once it is complete.
/// ```rust
/// use graph_middleware::prelude::*;
///
/// let mut stack = Stack::new(Some("import".into()), None);
/// stack.push("RETURN 1");
/// stack.push_write("CREATE (n) RETURN n");
/// assert!(stack.has_writes());
/// assert_eq!(stack.size(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Stack {
    tag: Option<String>,
    connection_alias: Option<String>,
    statements: Vec<Statement>,
    preflights: Vec<Statement>,
    has_writes: bool,
}

impl Stack {
    #[must_use]
    pub fn new(tag: Option<String>, connection_alias: Option<String>) -> Self {
        Self {
            tag,
            connection_alias,
            ..Self::default()
        }
    }

    /// Append a read (or neutral) statement.
    pub fn push(&mut self, statement: impl Into<Statement>) {
        self.statements.push(statement.into());
    }

    /// Append a statement and mark the stack as writing.
    pub fn push_write(&mut self, statement: impl Into<Statement>) {
        self.statements.push(statement.into());
        self.has_writes = true;
    }

    /// Append a statement meant to run (and be checked) before the main batch.
    pub fn add_preflight(&mut self, statement: impl Into<Statement>) {
        self.preflights.push(statement.into());
    }

    #[must_use]
    pub fn has_preflights(&self) -> bool {
        !self.preflights.is_empty()
    }

    #[must_use]
    pub fn preflights(&self) -> &[Statement] {
        &self.preflights
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Consume the stack, keeping only the main statements.
    #[must_use]
    pub fn into_statements(self) -> Vec<Statement> {
        self.statements
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    #[must_use]
    pub fn connection_alias(&self) -> Option<&str> {
        self.connection_alias.as_deref()
    }

    #[must_use]
    pub fn has_writes(&self) -> bool {
        self.has_writes
    }
}
