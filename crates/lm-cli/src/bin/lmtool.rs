use clap::{Parser, Subcommand};

use lm_cli::commands::{config_ops, eval_ops, model_ops, score_ops};

#[derive(Parser)]
#[command(name = "lmtool", about = "N-gram language model scoring tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score segmented sentences (phrases separated by '|'), one per line
    Score {
        /// Model file (ARPA or compiled) or engine config (.toml)
        model: String,
        /// Input file (default: stdin)
        input: Option<String>,
        /// Fixed target prefix shared by every input line
        #[arg(long)]
        prefix: Option<String>,
        /// Output JSON lines instead of text
        #[arg(long)]
        json: bool,
        /// Initialize tracing, writing JSON logs to this directory
        #[arg(long)]
        trace_dir: Option<String>,
    },
    /// Score one phrase without context
    Isolated {
        /// Model file (ARPA or compiled) or engine config (.toml)
        model: String,
        /// Phrase text
        phrase: String,
    },
    /// Compile an ARPA model into a binary image
    Compile {
        /// ARPA input file
        arpa_file: String,
        /// Output file
        output_file: String,
    },
    /// Show model info (format auto-detected by magic bytes)
    Info {
        /// ARPA or compiled model file
        file: String,
    },
    /// Evaluate hypotheses with a corpus metric
    Eval {
        /// Metric name (wer, bleu, bleu:N, smoothbleu, bleu-wer, ...)
        metric: String,
        /// Reference files, one reference per line, parallel to the hypotheses
        #[arg(long = "ref", required = true)]
        refs: Vec<String>,
        /// Hypothesis file (default: stdin)
        hyp_file: Option<String>,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
    /// Validate an engine config and list its featurizers
    EngineValidate {
        /// Path to the engine TOML file
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Score {
            model,
            input,
            prefix,
            json,
            trace_dir,
        } => {
            if let Some(dir) = trace_dir {
                lm_engine::init_tracing(std::path::Path::new(&dir));
            }
            score_ops::score(&model, input.as_deref(), prefix.as_deref(), json)
        }
        Command::Isolated { model, phrase } => score_ops::isolated(&model, &phrase),
        Command::Compile {
            arpa_file,
            output_file,
        } => model_ops::compile(&arpa_file, &output_file),
        Command::Info { file } => model_ops::info(&file),
        Command::Eval {
            metric,
            refs,
            hyp_file,
            json,
        } => eval_ops::eval(&metric, &refs, hyp_file.as_deref(), json),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
        Command::EngineValidate { file } => config_ops::engine_validate(&file),
    }
}
