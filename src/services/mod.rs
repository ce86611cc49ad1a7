pub mod archive;
pub mod generator;
pub mod ledger;
pub mod metrics;
pub mod renderer;
pub mod summarizer;
