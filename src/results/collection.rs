use super::statement_result::StatementResult;

/// Ordered per-statement results of one batch, plus the batch tag.
#[derive(Debug, Clone, Default)]
pub struct ResultCollection {
    results: Vec<StatementResult>,
    tag: Option<String>,
}

impl ResultCollection {
    #[must_use]
    pub fn new(results: Vec<StatementResult>) -> Self {
        Self { results, tag: None }
    }

    /// Wrap a single statement result.
    #[must_use]
    pub fn with_result(result: StatementResult) -> Self {
        Self::new(vec![result])
    }

    pub fn add(&mut self, result: StatementResult) {
        self.results.push(result);
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = Some(tag.into());
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    #[must_use]
    pub fn results(&self) -> &[StatementResult] {
        &self.results
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StatementResult> {
        self.results.get(index)
    }

    /// First result carrying `tag`.
    #[must_use]
    pub fn by_tag(&self, tag: &str) -> Option<&StatementResult> {
        self.results.iter().find(|r| r.tag() == Some(tag))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StatementResult> {
        self.results.iter()
    }
}

impl IntoIterator for ResultCollection {
    type Item = StatementResult;
    type IntoIter = std::vec::IntoIter<StatementResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = &'a StatementResult;
    type IntoIter = std::slice::Iter<'a, StatementResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
