//! Generates a labeled dataset of behavior change messages.
//!
//! For every technique in the BCT Taxonomy v1 a chat model is asked for a
//! numbered list of messages. Each list is validated, stored as
//! `data/<template>/<bct>.csv` and finally merged into `data/<template>.csv`.

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod merge;
pub mod openai;
pub mod pipeline;
pub mod prompts;
pub mod storage;
pub mod taxonomy;

pub mod test_utils;

pub use error::{DatasetError, Result};
