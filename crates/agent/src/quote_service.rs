use async_trait::async_trait;
use quotecraft_core::{QuoteData, QuoteEntry, QuoteService, QuoteServiceError};
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::{build_prompt, parse_quotes, SYSTEM_INSTRUCTION};

/// Generates quotes by prompting a language model.
pub struct LlmQuoteService<C> {
    client: C,
    quote_count: u32,
    temperature: f32,
}

impl<C> LlmQuoteService<C>
where
    C: LlmClient,
{
    pub fn new(client: C, quote_count: u32, temperature: f32) -> Self {
        Self { client, quote_count: quote_count.max(1), temperature }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C> QuoteService for LlmQuoteService<C>
where
    C: LlmClient,
{
    async fn generate(&self, keywords: &str) -> Result<QuoteData, QuoteServiceError> {
        let request = CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt: build_prompt(keywords, self.quote_count),
            temperature: self.temperature,
        };

        let raw = self.client.complete(&request).await.map_err(|error| {
            warn!(
                event_name = "agent.quotes.llm_failed",
                provider = self.client.provider(),
                model = self.client.model(),
                error = %error,
                "language model call failed"
            );
            QuoteServiceError::from(error)
        })?;

        let quotes = parse_quotes(&raw).map_err(|error| {
            warn!(
                event_name = "agent.quotes.unparseable",
                provider = self.client.provider(),
                response_bytes = raw.len(),
                error = %error,
                "language model reply could not be parsed"
            );
            QuoteServiceError::from(error)
        })?;

        let quotes: QuoteData =
            quotes.entries().iter().take(self.quote_count as usize).cloned().collect();
        debug!(
            event_name = "agent.quotes.generated",
            provider = self.client.provider(),
            quote_count = quotes.len(),
            "quotes generated"
        );
        Ok(quotes)
    }
}

/// Serves a fixed set of quotes without any network access.
#[derive(Clone, Debug)]
pub struct StaticQuoteService {
    quotes: QuoteData,
}

impl StaticQuoteService {
    pub fn new(quotes: QuoteData) -> Self {
        Self { quotes }
    }
}

impl Default for StaticQuoteService {
    fn default() -> Self {
        Self::new(QuoteData::new(vec![
            QuoteEntry::new("Small steps, taken daily, outwalk the grandest plans.")
                .with_author("Quotecraft"),
            QuoteEntry::new("Courage is a quiet voice that says: try again tomorrow.")
                .with_author("Mary Anne Radmacher"),
            QuoteEntry::new("What stands in the way becomes the way.").with_author("Marcus Aurelius"),
        ]))
    }
}

#[async_trait]
impl QuoteService for StaticQuoteService {
    async fn generate(&self, keywords: &str) -> Result<QuoteData, QuoteServiceError> {
        debug!(event_name = "agent.quotes.static", keywords, "serving static quotes");
        Ok(self.quotes.clone())
    }
}
