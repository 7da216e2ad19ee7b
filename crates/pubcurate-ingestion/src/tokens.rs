//! Token counting for the inclusion gate.

use tiktoken_rs::CoreBPE;

/// Model whose tokenizer bounds the request size.
pub const TOKENIZER_MODEL: &str = "gpt-4";

pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// The GPT-4 (`cl100k_base`) encoding. Building it parses the full
/// vocabulary, so construct it once per run.
pub struct Cl100kCounter {
    bpe: CoreBPE,
}

impl Cl100kCounter {
    pub fn new() -> anyhow::Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(TOKENIZER_MODEL)?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for Cl100kCounter {
    /// Special-token markers in article text are counted as ordinary text.
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}
