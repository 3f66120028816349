use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use onboarding::config::Config;
use onboarding::logging;
use onboarding::steps;
use onboarding::{
    FileSession, FormData, FormField, OnboardingContext, OnboardingError, OnboardingProvider,
    OnboardingStep, OnboardingWizard, ProviderTable, Sequencer, SessionStorage, StepRegistry,
    WizardAction, WizardOutcome,
};

#[derive(Parser)]
#[command(name = "onboard")]
#[command(about = "Walk through the admin onboarding wizard")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Session file (default: <state>/session.json)
    #[arg(short, long)]
    session: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the steps of a process and which one is current
    Status {
        /// Process id (default: onboarding.default_process)
        process: Option<String>,
    },

    /// Work through the pending steps interactively
    Run {
        /// Process id (default: onboarding.default_process)
        process: Option<String>,
    },

    /// Forget all progress for a process
    Reset {
        /// Process id (default: onboarding.default_process)
        process: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write it to .onboarding/config.toml
        #[arg(long)]
        save: bool,
    },
}

impl Commands {
    fn process(&self) -> Option<&str> {
        match self {
            Commands::Status { process }
            | Commands::Run { process }
            | Commands::Reset { process } => process.as_deref(),
            Commands::Config { .. } => None,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let is_interactive = matches!(cli.command, Commands::Run { .. });
    let logging_handle = logging::init_logging(&config, is_interactive, cli.debug)?;

    if let Commands::Config { save } = cli.command {
        return cmd_config(&config, save);
    }

    let process_id = cli
        .command
        .process()
        .unwrap_or(config.onboarding.default_process.as_str())
        .to_string();
    let session_path = cli.session.clone().unwrap_or_else(|| config.session_path());

    let onboarding = load_onboarding(&config, &process_id, &session_path)?;

    match cli.command {
        Commands::Status { .. } => cmd_status(onboarding.as_ref())?,
        Commands::Run { .. } => {
            cmd_run(OnboardingWizard::new(onboarding))?;
            print_log_path(logging_handle.log_file_path);
        }
        Commands::Reset { .. } => cmd_reset(onboarding.as_ref())?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Build the sequencer for `process_id` on top of the session file
fn load_onboarding(
    config: &Config,
    process_id: &str,
    session_path: &Path,
) -> Result<Box<dyn Sequencer>> {
    let mut registry = StepRegistry::new();
    steps::register_defaults(&mut registry);

    let providers = ProviderTable::with_defaults(Arc::new(registry), &config.onboarding);
    let provider: Arc<dyn OnboardingProvider> = providers.from_settings(&config.onboarding)?;

    let session = FileSession::open(session_path)
        .with_context(|| format!("Failed to open session {}", session_path.display()))?;
    let storage = SessionStorage::new(process_id, Arc::new(session))?;
    let context = Arc::new(OnboardingContext::new(Arc::new(storage)));

    tracing::debug!(
        process_id,
        provider = %config.onboarding.provider,
        session = %session_path.display(),
        "loading onboarding"
    );

    Ok(provider.get_onboarding(process_id, context)?)
}

fn print_log_path(log_file_path: Option<PathBuf>) {
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }
}

fn cmd_status(onboarding: &dyn Sequencer) -> Result<()> {
    let steps = onboarding.steps();
    if steps.is_empty() {
        println!("No steps registered for '{}'", onboarding.process_id());
        return Ok(());
    }

    let current = onboarding
        .current_step()?
        .map(|step| step.identifier().to_string());

    println!("Onboarding '{}'", onboarding.process_id());
    println!("{}", "─".repeat(60));

    for step in steps {
        let marker = if !step.is_visible()? {
            "-"
        } else if current.as_deref() == Some(step.identifier()) {
            "▶"
        } else if step.is_done()? {
            "✓"
        } else if step.was_skipped()? {
            "↷"
        } else {
            " "
        };
        println!("{} {:<16} {}", marker, step.identifier(), step.title());
    }

    println!();
    match current {
        Some(identifier) => println!("Current step: {}", identifier),
        None => println!("Complete, continue at {}", onboarding.success_url()),
    }

    Ok(())
}

fn cmd_config(config: &Config, save: bool) -> Result<()> {
    if save {
        let path = config.save()?;
        println!("Configuration written to {}", path.display());
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}

fn cmd_reset(onboarding: &dyn Sequencer) -> Result<()> {
    onboarding.finish()?;
    println!("Onboarding '{}' reset", onboarding.process_id());
    Ok(())
}

/// What the user typed at a field prompt
enum Input {
    Value(String),
    Command(WizardAction),
    Quit,
}

fn read_input(lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<Input> {
    let Some(line) = lines.next() else {
        return Ok(Input::Quit);
    };
    let line = line.context("Failed to read from stdin")?;
    let trimmed = line.trim();

    Ok(match trimmed {
        "quit" | "q" => Input::Quit,
        "skip" => Input::Command(WizardAction::Skip),
        "back" => Input::Command(WizardAction::Previous),
        _ => Input::Value(trimmed.to_string()),
    })
}

/// Initial value as the user would type it
fn initial_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("yes".to_string()),
        Value::Bool(false) => Some("no".to_string()),
        other => Some(other.to_string()),
    }
}

fn print_step(step: &dyn OnboardingStep, can_skip: bool) {
    println!();
    println!("== {} ==", step.title());
    if let Some(description) = step.description() {
        println!("{}", description);
    }
    let context = step.render_context();
    if !context.is_empty() {
        let details: Vec<String> = context
            .iter()
            .map(|(key, value)| format!("{}: {}", key, initial_text(value).unwrap_or_default()))
            .collect();
        println!("({})", details.join(", "));
    }
    if can_skip {
        println!("Type 'skip' to skip this step, 'back' to go back, 'quit' to stop.");
    } else {
        println!("Type 'back' to go back, 'quit' to stop.");
    }
}

/// Prompt for each field; stops early when the user types a command.
/// `None` means the user quit.
fn collect_form(
    fields: &[FormField],
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<WizardAction>> {
    let mut data = FormData::new();
    for field in fields {
        let initial = field.initial.as_ref().and_then(initial_text);
        match &initial {
            Some(initial) => print!("{} [{}]: ", field.label, initial),
            None => print!("{}: ", field.label),
        }
        io::stdout().flush()?;

        match read_input(lines)? {
            Input::Value(value) if value.is_empty() => {
                if let Some(initial) = initial {
                    data.insert(field.name.clone(), initial);
                }
            }
            Input::Value(value) => data.insert(field.name.clone(), value),
            Input::Command(action) => return Ok(Some(action)),
            Input::Quit => return Ok(None),
        }
    }
    Ok(Some(WizardAction::Submit(data)))
}

fn cmd_run(wizard: OnboardingWizard) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let onboarding = wizard.sequencer();
        let Some(step) = onboarding.current_step()? else {
            break;
        };
        let can_skip = step.can_skip()?;
        print_step(step, can_skip);

        let Some(action) = collect_form(&step.form_fields(), &mut lines)? else {
            println!("Progress saved. Run 'onboard run' to continue.");
            return Ok(());
        };

        match wizard.handle(action) {
            Ok(WizardOutcome::Invalid { errors, .. }) => {
                for (field, messages) in &errors.fields {
                    for message in messages {
                        println!("  {}: {}", field, message);
                    }
                }
                for message in &errors.non_field {
                    println!("  {}", message);
                }
            }
            Ok(_) => {}
            Err(OnboardingError::SkipNotAllowed { step }) => {
                println!("  '{}' cannot be skipped.", step);
            }
            Err(err) => return Err(err.into()),
        }
    }

    let onboarding = wizard.sequencer();
    println!();
    println!("All done! Continue at {}", onboarding.success_url());
    onboarding.finish()?;
    Ok(())
}
