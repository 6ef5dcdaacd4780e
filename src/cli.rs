use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::client::QueryClient;
use crate::config::{Config, Endpoint};
use crate::error::other_err;
use crate::screen::{answer_text, plain_lines};
use crate::tui::App;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Base address of the query service, overriding every other source
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write diagnostics here instead of the configured log file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a single question and print the answer
    Ask { question: String },
}

/// Print an answer the same way the screen shows it
fn print_answer(out: &mut impl Write, answer: &crate::Answer) -> io::Result<()> {
    for line in plain_lines(&answer_text(&answer.answer, &answer.citations)) {
        writeln!(out, "{line}")?;
    }

    out.flush()
}

async fn ask_once(client: &QueryClient, question: &str) -> crate::Result<()> {
    if question.trim().is_empty() {
        return Err(other_err!("The question must not be empty"));
    }

    let answer = client.submit_query(question).await?;
    print_answer(&mut io::stdout().lock(), &answer)?;

    Ok(())
}

pub fn run_cli() -> crate::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let log_file = match cli.log_file {
        Some(path) => path,
        None => config.log_file()?,
    };
    crate::logging::init(&log_file)?;

    let endpoint = Endpoint::resolve(&config, cli.api_base.as_deref());
    let client = QueryClient::new(endpoint)?;

    match &cli.command {
        None => App::new(client).run()?,

        Some(Commands::Ask { question }) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;

            rt.block_on(ask_once(&client, question))?;
        }
    }

    Ok(())
}
