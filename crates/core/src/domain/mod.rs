pub mod quote;

pub use quote::{Keywords, QuoteData, QuoteEntry};
