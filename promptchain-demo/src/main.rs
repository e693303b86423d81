use std::env;
use std::io::{self, stderr, stdout};
use std::process::{exit, ExitCode};
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use promptchain::chain::LLMChain;
use promptchain::utils::llm::openai::OpenAIBackend;
use promptchain::utils::llm::GenerationConfig;

mod config;
mod console;
mod demos;
mod interactive;

use config::{Cli, Settings, API_KEY_VAR};
use console::{Console, ResponseStyle};

const INTERACTIVE_TEMPERATURE: f32 = 0.7;

fn setup_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

fn build_backend(settings: &Settings) -> OpenAIBackend {
    let mut builder = OpenAIBackend::builder().with_api_key(settings.api_key.as_str());
    if let Some(api_base) = settings.api_base_str() {
        builder = builder.with_api_base(api_base);
    }
    if let Some(deadline) = settings.deadline {
        builder = builder.with_deadline(deadline);
    }
    builder.build()
}

async fn run_application(cli: Cli) -> Result<ExitCode> {
    let mut console = Console::new(stdout(), stderr(), ResponseStyle::pick(cli.plain));
    console.rule()?;
    console.line("🔗 Prompt Chain Basics")?;
    console.rule()?;

    let settings = Settings::resolve(&cli, env::var(API_KEY_VAR).ok())?;
    let demonstrations = match &cli.demos {
        Some(path) => demos::load(path)?,
        None => demos::builtin(),
    };
    console.line("✅ Environment loaded successfully!")?;
    info!("running {} demonstration(s)", demonstrations.len());

    let backend = Arc::new(build_backend(&settings));
    let outcome = demos::run_all(&demonstrations, backend.as_ref(), cli.model.as_deref(), &mut console).await?;

    console.line("")?;
    console.rule()?;
    let mut input = io::stdin().lock();
    let enter_interactive = match cli.interactive_choice() {
        Some(choice) => choice,
        None => interactive::ask_to_continue(&mut input, &mut console)?,
    };

    if enter_interactive {
        let chain = LLMChain::new(interactive::question_template()?, backend.clone());
        let mut config = GenerationConfig::default().with_temperature(INTERACTIVE_TEMPERATURE);
        if let Some(model) = &cli.model {
            config = config.with_model(model.as_str());
        }
        let session = interactive::run(&chain, &config, &mut input, &mut console).await?;
        info!("interactive session answered {} question(s), {} failed", session.questions, session.failures);
    }

    if outcome.failures == 0 {
        if !enter_interactive {
            console.line("\n✅ All demonstrations completed successfully!")?;
            console.rule()?;
        }
        Ok(ExitCode::SUCCESS)
    } else {
        console.line(&format!("\n⚠️ {} of {} demonstration run(s) failed.", outcome.failures, outcome.runs))?;
        console.rule()?;
        Ok(ExitCode::FAILURE)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    setup_logging();

    if let Err(err) = ctrlc::set_handler(|| {
        println!("\nGoodbye! 👋");
        exit(130);
    }).context("Error setting Ctrl-C handler") {
        log::warn!("{:#}", err);
    }

    match run_application(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("❌ {:#}", err);
            ExitCode::from(2)
        }
    }
}
