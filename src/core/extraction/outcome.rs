use std::sync::Arc;

use super::category::Category;
use super::resource::Payload;

/// Tagged result of one category's extraction within a single call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Success(Payload),
    Failure(String),
    Cancelled,
    TimedOut,
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }

    /// Short label used in logs and missing-category reports.
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionOutcome::Success(_) => "success",
            ExtractionOutcome::Failure(_) => "failure",
            ExtractionOutcome::Cancelled => "cancelled",
            ExtractionOutcome::TimedOut => "timed_out",
        }
    }
}

/// One unit of work: which category to read, and from what.
#[derive(Debug)]
pub struct ExtractionRequest<S> {
    category: Category,
    target: Arc<S>,
}

impl<S> ExtractionRequest<S> {
    pub fn new(category: Category, target: Arc<S>) -> Self {
        Self { category, target }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn target(&self) -> &S {
        &self.target
    }
}
