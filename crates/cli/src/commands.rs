use clap::{Args, Subcommand};
use engine_config::{ExecutionMode, ReconSettings};
use engine_runtime::KeySelection;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile two datasets and print the partition as JSON
    Reconcile(ReconcileArgs),

    /// Rank the column pairs most likely to join two datasets
    SuggestKeys {
        #[arg(long, help = "Left (back-office) dataset, CSV or JSON")]
        left: PathBuf,

        #[arg(long, help = "Right (partner) dataset, CSV or JSON")]
        right: PathBuf,

        #[arg(long, help = "Settings file (JSON)")]
        config: Option<PathBuf>,

        #[arg(long, help = "Print the candidates as JSON instead of a table")]
        json: bool,
    },

    /// Write a canonical date|amount|counterparty|direction key into every row
    Keys {
        #[arg(long, help = "Dataset to annotate, CSV or JSON")]
        input: PathBuf,

        #[arg(long)]
        date_column: String,

        #[arg(long)]
        amount_column: String,

        #[arg(long)]
        counterparty_column: String,

        /// Operation type column consulted for debit/credit direction
        #[arg(long)]
        type_column: Option<String>,

        #[arg(long, default_value = "key", help = "Name of the column receiving the key")]
        key_column: String,

        #[arg(
            long,
            help = "If specified, writes the annotated rows to this file instead of stdout"
        )]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ReconcileArgs {
    #[arg(long, help = "Left (back-office) dataset, CSV or JSON")]
    pub left: PathBuf,

    #[arg(long, help = "Right (partner) dataset, CSV or JSON")]
    pub right: PathBuf,

    /// Key column of the left dataset. Without keys, the columns are
    /// discovered automatically.
    #[arg(long, requires = "right_key")]
    pub left_key: Option<String>,

    #[arg(long, requires = "left_key")]
    pub right_key: Option<String>,

    #[arg(long, help = "Settings file (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        help = "If specified, writes the JSON result to this file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, conflicts_with = "max_in_flight", help = "Process one chunk at a time")]
    pub sequential: bool,

    #[arg(long, help = "Maximum number of chunk calls in flight")]
    pub max_in_flight: Option<usize>,

    /// Column compared on every matched pair; repeat for several
    #[arg(long = "compare")]
    pub compare: Vec<String>,

    #[arg(long, help = "Remote match service URL; matches in-process when omitted")]
    pub endpoint: Option<String>,

    #[arg(long, env = "TALLY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl ReconcileArgs {
    /// Command-line flags take precedence over the settings file.
    pub fn apply_to(&self, settings: &mut ReconSettings) {
        if self.sequential {
            if !matches!(settings.execution, ExecutionMode::Sequential { .. }) {
                settings.execution = ExecutionMode::sequential();
            }
        } else if let Some(max_in_flight) = self.max_in_flight {
            settings.execution = ExecutionMode::Parallel { max_in_flight };
        }

        if !self.compare.is_empty() {
            settings.comparison_columns = self.compare.clone();
        }
    }

    pub fn key_selection(&self) -> KeySelection {
        match (&self.left_key, &self.right_key) {
            (Some(left), Some(right)) => KeySelection::Explicit {
                left: left.clone(),
                right: right.clone(),
            },
            _ => KeySelection::Automatic,
        }
    }
}
