//! CLI subcommand implementations for the crest-harvest binary.

pub mod crawl_cmd;
pub mod download_cmd;
pub mod output;
pub mod run_cmd;
