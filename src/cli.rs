use clap::Parser;

/// Generate a dataset of behavior change messages for every BCT
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Name of the prompt file in "./prompts/"
    #[arg(short = 'p', long = "prompt", default_value = "baseline")]
    pub prompt: String,

    /// Number of messages to generate for each BCT
    #[arg(short = 'n', long = "num", default_value_t = 10)]
    pub num: usize,
}
