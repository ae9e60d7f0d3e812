use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueHint};

use distractors::commands::generate::{self, GenerateOptions};
use distractors::llm;

#[derive(Parser, Debug)]
#[command(
    name = "generate_distractors",
    version,
    about = "Multiple-choice distractors for language tests, straight from your word list.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// CSV file with word,translation,source_language,target_language rows
    #[arg(
        short,
        long,
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        required = true
    )]
    input: Option<PathBuf>,

    /// Number of distractors to generate for each word
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 10)]
    count: usize,

    /// Maximum number of trials to replace near-duplicate distractors
    #[arg(
        short = 'd',
        long = "deduplicate-trials",
        value_name = "COUNT",
        default_value_t = 1
    )]
    deduplicate_trials: usize,

    /// Where to write the generated distractors
    #[arg(
        short,
        long,
        value_name = "PATH",
        default_value = "distractors.json",
        value_hint = ValueHint::FilePath
    )]
    output: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the stored OpenAI API key
    Key {
        /// Store a new API key in the local auth file
        #[arg(long, value_name = "KEY", conflicts_with = "clear")]
        set: Option<String>,
        /// Remove the stored API key from the local auth file
        #[arg(long, conflicts_with = "test")]
        clear: bool,
        /// Verify the configured API key by calling the OpenAI API
        #[arg(long, conflicts_with = "clear")]
        test: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Key { set, clear, test }) => handle_key_command(set, clear, test).await?,
        None => {
            let input = cli
                .input
                .context("No input file provided. Use -i <input.csv>.")?;
            let options = GenerateOptions {
                count: cli.count,
                deduplicate_trials: cli.deduplicate_trials,
            };
            generate::run(&input, &cli.output, &options).await?;
        }
    }

    Ok(())
}

async fn handle_key_command(set: Option<String>, clear: bool, test: bool) -> Result<()> {
    let mut action_taken = false;

    if let Some(key) = set {
        llm::store_api_key(&key)?;
        println!("Stored OpenAI API key in the local auth file.");
        action_taken = true;
    }

    if clear {
        let removed = llm::clear_api_key()?;
        if removed {
            println!("Removed the stored OpenAI API key.");
        } else {
            println!("No OpenAI API key found in the auth file.");
        }
        action_taken = true;
    }

    if test {
        let source = llm::test_configured_api_key().await?;
        println!("OpenAI API key from the {} is valid.", source.description());
        action_taken = true;
    }

    if !action_taken {
        bail!("No action provided. Use --set, --clear, or --test.");
    }
    Ok(())
}
