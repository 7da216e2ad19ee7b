//! pubcurate-llm: OpenAI batch job submission.

pub mod batch;
