use async_trait::async_trait;

use crate::domain::quote::QuoteData;
use crate::errors::QuoteServiceError;

/// Produces quotes for non-empty, trimmed keywords.
///
/// Implementations need not guard against concurrent calls for one session;
/// the generation controller never issues a second call while one is outstanding.
#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn generate(&self, keywords: &str) -> Result<QuoteData, QuoteServiceError>;
}
