mod collection;
mod record;
mod statement_result;

pub use collection::ResultCollection;
pub use record::Record;
pub use statement_result::{StatementResult, UpdateStatistics};
