use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use weft_config::{Settings, WorkflowDef, WorkflowStatus};
use weft_handler::Params;
use weft_handler_registry::HandlerRegistry;
use weft_handlers::builtin_registry;
use weft_runtime::{
  ChannelNotifier, Engine, ExecutionEvent, RunReport, RunStatus, RuntimeConfig,
};
use weft_store::{ExecutionRecord, ExecutionStatus, Json, SqliteStore, Store};

/// Weft - a workflow engine over a registry of schema-described handlers
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.weft)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow definition file
  Run {
    /// Path to the workflow file (JSON or YAML)
    workflow_file: PathBuf,

    /// Initial context as a JSON object (default: read from stdin)
    #[arg(long)]
    context: Option<String>,

    /// Maximum number of steps running at once
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Store the definition and the execution record
    #[arg(long)]
    save: bool,
  },

  /// Run a single step from a workflow file, ignoring its dependencies
  RunStep {
    /// Path to the workflow file (JSON or YAML)
    workflow_file: PathBuf,

    /// The step number to execute
    #[arg(long)]
    step: u32,

    /// Context as a JSON object (default: read from stdin)
    #[arg(long)]
    context: Option<String>,
  },

  /// Manage stored workflows
  Workflow {
    #[command(subcommand)]
    command: WorkflowCommand,
  },

  /// List recorded executions of a stored workflow
  Executions {
    workflow_id: String,
  },

  /// Inspect the handler registry
  Handlers {
    #[command(subcommand)]
    command: HandlersCommand,
  },
}

#[derive(Subcommand)]
enum WorkflowCommand {
  /// Store a workflow definition file
  Import { workflow_file: PathBuf },

  /// List stored workflows
  List,

  /// Run a stored workflow and record the execution
  Run {
    workflow_id: String,

    /// Initial context as a JSON object (default: read from stdin)
    #[arg(long)]
    context: Option<String>,
  },
}

#[derive(Subcommand)]
enum HandlersCommand {
  /// List handlers, optionally in one category
  List {
    #[arg(long)]
    category: Option<String>,
  },

  /// List handler categories
  Categories,

  /// Print a handler's schema
  Show { name: String },

  /// Check parameters against a handler's input schema
  Validate {
    name: String,
    /// Parameters as a JSON object
    params: String,
  },

  /// Find the handler for a file by its extension
  ForFile { path: PathBuf },
}

fn main() -> Result<()> {
  init_tracing();
  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".weft"),
  };

  let succeeded = match cli.command {
    Some(Commands::Run {
      workflow_file,
      context,
      max_concurrency,
      save,
    }) => block_on(run_file(
      workflow_file,
      context,
      max_concurrency,
      save,
      data_dir,
    ))?,
    Some(Commands::RunStep {
      workflow_file,
      step,
      context,
    }) => block_on(run_step(workflow_file, step, context, data_dir))?,
    Some(Commands::Workflow { command }) => match command {
      WorkflowCommand::Import { workflow_file } => {
        block_on(import_workflow(workflow_file, data_dir))?
      }
      WorkflowCommand::List => block_on(list_workflows(data_dir))?,
      WorkflowCommand::Run {
        workflow_id,
        context,
      } => block_on(run_stored(workflow_id, context, data_dir))?,
    },
    Some(Commands::Executions { workflow_id }) => {
      block_on(list_executions(workflow_id, data_dir))?
    }
    Some(Commands::Handlers { command }) => handlers(command)?,
    None => {
      println!("weft - use --help to see available commands");
      true
    }
  };

  if !succeeded {
    std::process::exit(1);
  }
  Ok(())
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .try_init();
}

fn block_on<F: std::future::Future<Output = Result<bool>>>(future: F) -> Result<bool> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(future)
}

fn load_settings(data_dir: &Path) -> Result<Settings> {
  let path = data_dir.join("settings.json");
  Settings::load(&path).with_context(|| format!("failed to load settings: {}", path.display()))
}

fn load_registry() -> Arc<HandlerRegistry> {
  let (registry, report) = builtin_registry();
  for failure in &report.failed {
    warn!(source = %failure.source, error = %failure.error, "handler source skipped");
  }
  Arc::new(registry)
}

fn load_definition(workflow_file: &Path) -> Result<WorkflowDef> {
  WorkflowDef::from_path(workflow_file)
    .with_context(|| format!("failed to load workflow file: {}", workflow_file.display()))
}

async fn open_store(data_dir: &Path, settings: &Settings) -> Result<SqliteStore> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let url = settings
    .database_url
    .clone()
    .unwrap_or_else(|| format!("sqlite://{}?mode=rwc", data_dir.join("weft.db").display()));

  let store = SqliteStore::connect(&url)
    .await
    .with_context(|| format!("failed to open database: {}", url))?;
  store.migrate().await.context("failed to run migrations")?;
  Ok(store)
}

/// Run a definition, printing progress to stderr and the report to stdout.
async fn execute(
  def: WorkflowDef,
  context: Params,
  config: RuntimeConfig,
) -> Result<RunReport> {
  let (sender, receiver) = mpsc::unbounded_channel();
  let engine = Engine::new(load_registry(), config)
    .with_notifier(Arc::new(ChannelNotifier::new(sender)));
  let printer = tokio::spawn(print_progress(receiver));

  // Ctrl-C stops scheduling; running steps finish.
  let cancel = CancellationToken::new();
  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("Interrupted, waiting for running steps");
        cancel.cancel();
      }
    });
  }

  let result = engine.run_with_cancel(def, context, cancel).await;
  drop(engine);
  let _ = printer.await;

  let report = result.context("workflow could not be run")?;
  eprintln!(
    "Execution {} in {} ms ({}/{} steps succeeded)",
    report.status.as_str(),
    report.duration_ms(),
    report.completed_steps,
    report.total_steps
  );
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(report)
}

async fn print_progress(mut receiver: mpsc::UnboundedReceiver<ExecutionEvent>) {
  while let Some(event) = receiver.recv().await {
    match event {
      ExecutionEvent::RunStarted { execution_id, .. } => {
        eprintln!("Execution started: {}", execution_id);
      }
      ExecutionEvent::StepStarted {
        step_number,
        handler_name,
        ..
      } => eprintln!("  step {} ({}) started", step_number, handler_name),
      ExecutionEvent::AttemptFailed {
        step_number,
        attempt,
        error,
        ..
      } => eprintln!("  step {} attempt {} failed: {}", step_number, attempt, error),
      ExecutionEvent::StepCompleted { step_number, .. } => {
        eprintln!("  step {} completed", step_number);
      }
      ExecutionEvent::StepSkipped {
        step_number,
        reason,
        ..
      } => eprintln!("  step {} skipped ({:?})", step_number, reason),
      ExecutionEvent::StepFailed {
        step_number,
        error,
        ..
      } => eprintln!("  step {} failed: {}", step_number, error),
      ExecutionEvent::RunCompleted { .. } => {}
    }
  }
}

async fn run_file(
  workflow_file: PathBuf,
  context: Option<String>,
  max_concurrency: Option<usize>,
  save: bool,
  data_dir: PathBuf,
) -> Result<bool> {
  let def = load_definition(&workflow_file)?;
  eprintln!("Loaded workflow: {} ({} steps)", def.name, def.steps.len());

  let initial = read_context(context)?;
  let settings = load_settings(&data_dir)?;
  let mut config = RuntimeConfig::from(&settings);
  if let Some(max) = max_concurrency {
    config.max_concurrent_steps = max;
  }

  let store = if save {
    let store = open_store(&data_dir, &settings).await?;
    store
      .save_workflow(&def)
      .await
      .context("failed to save workflow")?;
    Some(store)
  } else {
    None
  };

  let report = execute(def, initial.clone(), config).await?;

  if let Some(store) = store {
    let record = execution_record(&report, &initial, "cli")?;
    store
      .save_execution(&record)
      .await
      .context("failed to save execution")?;
    eprintln!("Saved execution: {}", record.execution_id);
  }

  Ok(report.success)
}

async fn run_step(
  workflow_file: PathBuf,
  step_number: u32,
  context: Option<String>,
  data_dir: PathBuf,
) -> Result<bool> {
  let def = load_definition(&workflow_file)?;
  let step = def
    .step(step_number)
    .with_context(|| format!("step {} not found in workflow", step_number))?;
  eprintln!("Running step {}: {}", step_number, step.display_name());

  let initial = read_context(context)?;
  let settings = load_settings(&data_dir)?;
  let engine = Engine::new(load_registry(), RuntimeConfig::from(&settings));

  let runtime = engine
    .prepare(def)
    .await
    .context("failed to resolve workflow")?;
  let report = runtime
    .invoke_step(step_number, initial, CancellationToken::new())
    .await
    .context("step execution failed")?;

  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(report.success)
}

async fn import_workflow(workflow_file: PathBuf, data_dir: PathBuf) -> Result<bool> {
  let def = load_definition(&workflow_file)?;
  let settings = load_settings(&data_dir)?;

  // Fail the import early if the definition could never run.
  Engine::new(load_registry(), RuntimeConfig::from(&settings))
    .prepare(def.clone())
    .await
    .context("workflow is not valid")?;

  let store = open_store(&data_dir, &settings).await?;
  store
    .save_workflow(&def)
    .await
    .context("failed to save workflow")?;

  eprintln!("Imported workflow: {} ({})", def.workflow_id, def.status.as_str());
  Ok(true)
}

async fn list_workflows(data_dir: PathBuf) -> Result<bool> {
  let settings = load_settings(&data_dir)?;
  let store = open_store(&data_dir, &settings).await?;

  for workflow in store.list_workflows().await? {
    println!(
      "{}\t{}\t{}\t{}\t{} steps",
      workflow.workflow_id, workflow.name, workflow.version, workflow.status, workflow.step_count
    );
  }
  Ok(true)
}

async fn run_stored(
  workflow_id: String,
  context: Option<String>,
  data_dir: PathBuf,
) -> Result<bool> {
  let settings = load_settings(&data_dir)?;
  let store = open_store(&data_dir, &settings).await?;

  let def = store
    .load_workflow(&workflow_id)
    .await
    .with_context(|| format!("failed to load workflow '{}'", workflow_id))?;
  if def.status != WorkflowStatus::Active {
    bail!(
      "workflow '{}' is {} and cannot be run",
      workflow_id,
      def.status.as_str()
    );
  }

  let initial = read_context(context)?;
  let report = execute(def, initial.clone(), RuntimeConfig::from(&settings)).await?;

  let record = execution_record(&report, &initial, "cli")?;
  store
    .save_execution(&record)
    .await
    .context("failed to save execution")?;
  eprintln!("Saved execution: {}", record.execution_id);

  Ok(report.success)
}

async fn list_executions(workflow_id: String, data_dir: PathBuf) -> Result<bool> {
  let settings = load_settings(&data_dir)?;
  let store = open_store(&data_dir, &settings).await?;

  let executions = store.list_executions(&workflow_id).await?;
  let summary: Vec<serde_json::Value> = executions
    .iter()
    .map(|e| {
      serde_json::json!({
        "execution_id": e.execution_id,
        "status": e.status,
        "error_message": e.error_message,
        "started_at": e.started_at,
        "completed_at": e.completed_at,
      })
    })
    .collect();

  println!("{}", serde_json::to_string_pretty(&summary)?);
  Ok(true)
}

fn handlers(command: HandlersCommand) -> Result<bool> {
  let registry = load_registry();

  match command {
    HandlersCommand::List { category } => {
      for schema in registry.list(category.as_deref()) {
        println!(
          "{}\t{}\t{}\t{}",
          schema.name, schema.category, schema.display_name, schema.description
        );
      }
    }
    HandlersCommand::Categories => {
      for category in registry.categories() {
        println!("{}", category);
      }
    }
    HandlersCommand::Show { name } => {
      let schema = registry
        .schema(&name)
        .with_context(|| format!("unknown handler '{}'", name))?;
      println!("{}", serde_json::to_string_pretty(schema)?);
    }
    HandlersCommand::Validate { name, params } => {
      let schema = registry
        .schema(&name)
        .with_context(|| format!("unknown handler '{}'", name))?;
      let params = parse_object(&params).context("failed to parse params")?;

      let missing = schema.missing_parameters(&params);
      let violations = schema.violations(&params);
      println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
          "valid": missing.is_empty(),
          "missing": missing,
          "violations": violations,
        }))?
      );
      return Ok(missing.is_empty() && violations.is_empty());
    }
    HandlersCommand::ForFile { path } => {
      let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("'{}' has no file extension", path.display()))?;

      match registry.lookup_by_file_extension(extension) {
        Some(handler) => println!("{}", handler.name()),
        None => {
          eprintln!("no handler for .{} files", extension);
          return Ok(false);
        }
      }
    }
  }

  Ok(true)
}

fn execution_record(
  report: &RunReport,
  initial: &Params,
  triggered_by: &str,
) -> Result<ExecutionRecord> {
  let status = match report.status {
    RunStatus::Completed => ExecutionStatus::Completed,
    RunStatus::Failed => ExecutionStatus::Failed,
    RunStatus::Cancelled => ExecutionStatus::Cancelled,
  };

  Ok(ExecutionRecord {
    execution_id: report.execution_id.clone(),
    workflow_id: report.workflow_id.clone(),
    status,
    context: Json(serde_json::Value::Object(initial.clone())),
    final_context: Json(serde_json::Value::Object(report.context.clone())),
    results: Json(serde_json::to_value(report).context("failed to serialize run report")?),
    error_message: report.error.clone(),
    triggered_by: Some(triggered_by.to_string()),
    started_at: report.started_at,
    completed_at: Some(report.finished_at),
  })
}

fn parse_object(input: &str) -> Result<Params> {
  match serde_json::from_str(input)? {
    serde_json::Value::Object(map) => Ok(map),
    other => bail!("expected a JSON object, got {}", other),
  }
}

/// Context from `--context`, or from stdin when piped.
fn read_context(arg: Option<String>) -> Result<Params> {
  match arg {
    Some(json) => parse_object(&json).context("failed to parse --context JSON"),
    None => read_payload_from_stdin(),
  }
}

fn read_payload_from_stdin() -> Result<Params> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(Params::new())
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read context from stdin")?;

    if input.trim().is_empty() {
      Ok(Params::new())
    } else {
      parse_object(&input).context("failed to parse context JSON from stdin")
    }
  }
}
