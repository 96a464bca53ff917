use std::collections::HashMap;
use std::sync::Arc;

use super::cancel::CancellationToken;
use super::category::Category;
use super::error::ExtractionError;
use super::resource::CategoryData;

/// Reads one category off a data source. Implementations may block.
///
/// Long-running extractors should poll `cancel` and return
/// `ExtractionError::Cancelled` once it fires.
pub trait Extractor<S>: Send + Sync {
    fn extract(&self, source: &S, cancel: &CancellationToken)
        -> Result<CategoryData, ExtractionError>;
}

impl<S, F> Extractor<S> for F
where
    F: Fn(&S, &CancellationToken) -> Result<CategoryData, ExtractionError> + Send + Sync,
{
    fn extract(
        &self,
        source: &S,
        cancel: &CancellationToken,
    ) -> Result<CategoryData, ExtractionError> {
        self(source, cancel)
    }
}

/// Category name -> extractor for one kind of data source.
pub struct ExtractorRegistry<S> {
    extractors: HashMap<Category, Arc<dyn Extractor<S>>>,
}

impl<S> ExtractorRegistry<S> {
    pub fn new() -> Self {
        Self {
            extractors: HashMap::with_capacity(10),
        }
    }

    /// Replaces any extractor already registered for `category`.
    pub fn register_extractor<E>(&mut self, category: impl Into<Category>, extractor: E)
    where
        E: Extractor<S> + 'static,
    {
        self.extractors
            .insert(category.into(), Arc::new(extractor));
    }

    pub fn register<F>(&mut self, category: impl Into<Category>, f: F)
    where
        F: Fn(&S, &CancellationToken) -> Result<CategoryData, ExtractionError>
            + Send
            + Sync
            + 'static,
    {
        self.register_extractor(category, f);
    }

    pub fn with<F>(mut self, category: impl Into<Category>, f: F) -> Self
    where
        F: Fn(&S, &CancellationToken) -> Result<CategoryData, ExtractionError>
            + Send
            + Sync
            + 'static,
    {
        self.register(category, f);
        self
    }

    pub fn get(&self, category: &Category) -> Option<Arc<dyn Extractor<S>>> {
        self.extractors.get(category).cloned()
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.extractors.contains_key(category)
    }

    pub fn categories(&self) -> Vec<Category> {
        let mut names: Vec<_> = self.extractors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl<S> Default for ExtractorRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
