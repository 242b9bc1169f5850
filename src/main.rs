use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, LevelFilter};

use chatdesk::chat::ChatInput;
use chatdesk::config::AppConfig;
use chatdesk::csv_viewer::{self, FileOutcome};
use chatdesk::offer::{self, OfferInput};
use chatdesk::{CompletionRequester, CompletionResult, GroqClient, RequestOptions, RetryPolicy};

/// Chat, offer evaluation and CSV viewing over the Groq API
#[derive(Parser)]
#[command(name = "chatdesk", version)]
struct Cli
{   /// JSON config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>
  , /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8
  , #[command(subcommand)]
    command: Command
}

#[derive(Subcommand)]
enum Command
{   /// Ask the model a question, optionally with a file as context
    Chat
    {   /// Prompt text
        #[arg(short, long, default_value = "")]
        prompt: String
      , /// Optional system prompt
        #[arg(short, long, default_value = "")]
        system: String
      , /// .txt or .pdf file whose text precedes the prompt
        #[arg(short, long)]
        file: Option<PathBuf>
      , /// Model id (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>
      , /// Sampling temperature in [0.0, 1.0]; omitted if not given
        #[arg(short, long)]
        temperature: Option<f32>
    }
  , /// Score a business offer on the fixed rubric and ask for an assessment
    Evaluate
    {   /// Offer description
        #[arg(short, long)]
        offer: String
      , /// Criterion score as key=value (1-10), repeatable
        #[arg(short, long = "score")]
        scores: Vec<String>
      , /// Extra context for the evaluator
        #[arg(short, long)]
        notes: Option<String>
      , /// Sampling temperature, clamped to [0.0, 1.0]
        #[arg(short, long, default_value_t = chatdesk::offer::DEFAULT_TEMPERATURE)]
        temperature: f32
      , /// Model id (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>
    }
  , /// Show the fixed list of CSV files as tables
    Csv
    {   /// Directory holding the files (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>
      , /// Show at most this many rows per file
        #[arg(long)]
        max_rows: Option<usize>
    }
  , /// List the models available to the API key
    Models
}

fn init_logging(verbose: u8)
{   let mut builder = env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("warn")
    );
    match verbose
    {   0 => {}
      , 1 => { builder.filter_level(LevelFilter::Debug); }
      , _ => { builder.filter_level(LevelFilter::Trace); }
    }
    builder.init();
}

fn fail(message: impl std::fmt::Display) -> ExitCode
{   eprintln!("{}", message.to_string().red());
    ExitCode::FAILURE
}

/// Credential check happens before any request is built
fn connect(config: &AppConfig) -> Result<CompletionRequester<GroqClient>, ExitCode>
{   let api_key = chatdesk::config::api_key_from_env().map_err(fail)?;
    let client = GroqClient::from_config(api_key, config).map_err(fail)?;
    Ok(CompletionRequester::with_policy(
      client
    , RetryPolicy::from(&config.retry)
    ))
}

/// Retries follow the requester's policy built in `connect`
fn options_for(config: &AppConfig, model: Option<String>) -> RequestOptions
{   RequestOptions::new(model.unwrap_or_else(|| config.model.clone()))
}

fn report(result: &CompletionResult) -> ExitCode
{   match result.reply()
    {   Some(reply) => {
          println!("{}", "Query completed!".green());
          println!("{}", reply);
          ExitCode::SUCCESS
        }
      , None => {
          eprintln!("{}", "No response found.".red());
          if let Some(message) = result.failure_message()
          {   eprintln!("{}", message.red());
          }
          ExitCode::FAILURE
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode
{   let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match AppConfig::load(cli.config.as_deref())
    {   Ok(config) => config
      , Err(e) => return fail(e)
    };
    debug!("Using config: {:?}", config);

    match cli.command
    {   Command::Chat { prompt, system, file, model, temperature } => {
          let requester = match connect(&config)
          {   Ok(r) => r
            , Err(code) => return code
          };
          let file_content = match file
          {   Some(path) => match chatdesk::documents::read_document(&path)
              {   Ok(text) => text
                , Err(e) => return fail(e)
              }
            , None => String::new()
          };
          let input = ChatInput
          {   system_prompt: system
            , prompt
            , file_content
          };
          if input.is_empty()
          {   eprintln!("{}", chatdesk::chat::EMPTY_INPUT_WARNING.yellow());
              return ExitCode::FAILURE;
          }
          let options = options_for(&config, model)
            .with_temperature(temperature);
          println!("Querying the chatbot...");
          match chatdesk::chat::run_chat(&requester, &input, &options).await
          {   Ok(result) => report(&result)
            , Err(e) => fail(e)
          }
        }
      , Command::Evaluate { offer: description, scores, notes, temperature, model } => {
          let requester = match connect(&config)
          {   Ok(r) => r
            , Err(code) => return code
          };
          let mut input = OfferInput::new(description);
          for arg in &scores
          {   if let Err(e) = input.apply_score_arg(arg)
              {   return fail(e);
              }
          }
          input.notes = notes;
          input.set_temperature(temperature);
          let options = options_for(&config, model);
          println!("Evaluating offer...");
          match offer::evaluate(&requester, &input, &options).await
          {   Ok(evaluation) => {
                println!(
                  "Weighted score: {:.1}/{}",
                  evaluation.weighted_score, offer::MAX_SCORE
                );
                report(&evaluation.result)
              }
            , Err(e) => fail(e)
          }
        }
      , Command::Csv { dir, max_rows } => {
          let dir = dir.unwrap_or_else(|| config.csv_dir.clone());
          for file in csv_viewer::load_all(&dir)
          {   println!("{}", file.name.bold());
              match file.outcome
              {   FileOutcome::Loaded(table) => {
                    print!("{}", table.render(max_rows));
                  }
                , FileOutcome::Failed(e) => {
                    eprintln!(
                      "{}",
                      format!("Error loading {}: {}", file.name, e).red()
                    );
                  }
              }
              println!();
          }
          ExitCode::SUCCESS
        }
      , Command::Models => {
          let requester = match connect(&config)
          {   Ok(r) => r
            , Err(code) => return code
          };
          match requester.transport().list_models().await
          {   Ok(models) => {
                for model in models
                {   println!("{}", model);
                }
                ExitCode::SUCCESS
              }
            , Err(e) => fail(e)
          }
        }
    }
}
