use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use netstack_core::config::{NetworkStackProps, load_props};
use netstack_core::context::StackContext;
use netstack_core::differ::{create_plan, destroy_plan};
use netstack_core::effect::Effect;
use netstack_core::endpoint::normalize_endpoint;
use netstack_core::graph::StateMap;
use netstack_core::interpreter::{EffectOutcome, Interpreter};
use netstack_core::plan::Plan;
use netstack_core::refresh::refresh_states;
use netstack_core::resource::{State, Value};
use netstack_core::stack::NetworkStack;
use netstack_provider_aws::AwsProvider;
use netstack_state::{BackendConfig, StateBackend, StateFile, create_backend};

#[derive(Parser)]
#[command(name = "netstack")]
#[command(about = "Networking stack for migration deployments", long_about = None)]
struct Cli {
    /// Deployment configuration (JSON)
    #[arg(long, global = true, default_value = "netstack.json")]
    config: PathBuf,

    /// State file (default: netstack.<stage>.state.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Override the configured stage
    #[arg(long, global = true)]
    stage: Option<String>,

    /// Override the configured region
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration against the target account
    Validate,
    /// Print the declared resources as JSON
    Synth,
    /// Show execution plan without applying changes
    Plan,
    /// Apply changes to reach the desired state
    Apply {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Destroy all recorded resources
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Print the normalized form of a cluster endpoint
    Endpoint {
        url: String,
    },
    /// Remove a stale state lock
    ForceUnlock {
        lock_id: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Validate => run_validate(&cli).await,
        Commands::Synth => run_synth(&cli).await,
        Commands::Plan => run_plan(&cli).await,
        Commands::Apply { auto_approve } => run_apply(&cli, *auto_approve).await,
        Commands::Destroy { auto_approve } => run_destroy(&cli, *auto_approve).await,
        Commands::Endpoint { url } => run_endpoint(url),
        Commands::ForceUnlock { lock_id } => run_force_unlock(&cli, lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn run_validate(cli: &Cli) -> Result<(), String> {
    let (_, _, stack) = declare(cli).await?;

    println!("{}", "Topology:".cyan().bold());
    for subnet in &stack.topology.subnets {
        println!(
            "  {:<8} {} ({})",
            subnet.kind.to_string(),
            subnet.subnet_id,
            subnet.availability_zone
        );
    }
    println!(
        "  Private subnets span {} availability zones",
        stack.private_az_count
    );
    println!();

    println!("{}", "Parameters:".cyan().bold());
    for parameter in &stack.parameters {
        println!("  {} = {}", parameter.name, format_value(&parameter.value));
    }
    println!();

    println!(
        "{}",
        format!(
            "Configuration is valid. {} resources declared.",
            stack.resources.len()
        )
        .green()
        .bold()
    );
    Ok(())
}

async fn run_synth(cli: &Cli) -> Result<(), String> {
    let (_, _, stack) = declare(cli).await?;
    let output = serde_json::to_string_pretty(&synth_json(&stack))
        .map_err(|e| format!("Failed to serialize stack: {}", e))?;
    println!("{}", output);
    Ok(())
}

async fn run_plan(cli: &Cli) -> Result<(), String> {
    let (props, provider, stack) = declare(cli).await?;
    let backend = open_backend(cli, &props.stage).await?;
    let mut state = load_state(backend.as_ref(), &props.stage).await?;

    let current = refresh(&provider, &mut state).await?;
    let plan = create_plan(&stack.resources, &current);
    print_plan(&plan);
    Ok(())
}

async fn run_apply(cli: &Cli, auto_approve: bool) -> Result<(), String> {
    let (props, provider, stack) = declare(cli).await?;
    let backend = open_backend(cli, &props.stage).await?;

    let lock = backend
        .acquire_lock("apply")
        .await
        .map_err(|e| e.to_string())?;
    let result = apply_locked(backend.as_ref(), provider, &stack, &props.stage, auto_approve).await;
    release(backend.as_ref(), &lock).await;
    result
}

async fn apply_locked(
    backend: &dyn StateBackend,
    provider: AwsProvider,
    stack: &NetworkStack,
    stage: &str,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = load_state(backend, stage).await?;
    let current = refresh(&provider, &mut state).await?;
    let plan = create_plan(&stack.resources, &current);

    if plan.is_empty() {
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan);
    println!();

    if !auto_approve && !confirm("Do you want to apply these changes?")? {
        println!("{}", "Apply cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Applying changes...".cyan().bold());
    println!();
    execute(provider, backend, state, &plan, "Apply").await
}

async fn run_destroy(cli: &Cli, auto_approve: bool) -> Result<(), String> {
    let props = props_from(cli)?;
    let backend = open_backend(cli, &props.stage).await?;

    let lock = backend
        .acquire_lock("destroy")
        .await
        .map_err(|e| e.to_string())?;
    let result = destroy_locked(backend.as_ref(), &props, auto_approve).await;
    release(backend.as_ref(), &lock).await;
    result
}

async fn destroy_locked(
    backend: &dyn StateBackend,
    props: &NetworkStackProps,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = load_state(backend, &props.stage).await?;
    let provider = aws_provider(props).await?;
    let current = refresh(&provider, &mut state).await?;
    if current.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    let plan = destroy_plan(&current);

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.len().to_string().red());
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();
    execute(provider, backend, state, &plan, "Destroy").await
}

fn run_endpoint(url: &str) -> Result<(), String> {
    let endpoint = normalize_endpoint(url).map_err(|e| e.to_string())?;
    println!("{}", endpoint);
    Ok(())
}

async fn run_force_unlock(cli: &Cli, lock_id: &str) -> Result<(), String> {
    let path = match (&cli.state, &cli.stage) {
        (Some(path), _) => path.clone(),
        (None, Some(stage)) => default_state_path(stage),
        (None, None) => default_state_path(&props_from(cli)?.stage),
    };
    let backend = create_backend(&BackendConfig::local(path.to_string_lossy()))
        .await
        .map_err(|e| e.to_string())?;

    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", format!("Lock {} removed.", lock_id).green());
    Ok(())
}

// =============================================================================
// Setup
// =============================================================================

/// Load props from the config file and apply flag overrides
fn props_from(cli: &Cli) -> Result<NetworkStackProps, String> {
    let mut props = load_props(&cli.config).map_err(|e| e.to_string())?;
    if let Some(stage) = &cli.stage {
        props.stage = stage.clone();
    }
    if let Some(region) = &cli.region {
        props.region = Some(region.clone());
    }
    props.validate().map_err(|e| e.to_string())?;
    Ok(props)
}

async fn aws_provider(props: &NetworkStackProps) -> Result<AwsProvider, String> {
    AwsProvider::new(props.region.as_deref())
        .await
        .map_err(|e| format!("Failed to configure AWS: {}", e))
}

/// Resolve lookups and declare the stack
async fn declare(cli: &Cli) -> Result<(NetworkStackProps, AwsProvider, NetworkStack), String> {
    let props = props_from(cli)?;
    let provider = aws_provider(&props).await?;
    log::info!("Declaring stage {} in {}", props.stage, provider.region());

    let context = StackContext::resolve(&props, provider.region(), &provider)
        .await
        .map_err(|e| e.to_string())?;
    let stack = NetworkStack::declare(&props, &context).map_err(|e| e.to_string())?;
    Ok((props, provider, stack))
}

fn default_state_path(stage: &str) -> PathBuf {
    PathBuf::from(format!("netstack.{}.state.json", stage))
}

async fn open_backend(cli: &Cli, stage: &str) -> Result<Box<dyn StateBackend>, String> {
    let path = cli
        .state
        .clone()
        .unwrap_or_else(|| default_state_path(stage));
    create_backend(&BackendConfig::local(path.to_string_lossy()))
        .await
        .map_err(|e| e.to_string())
}

async fn load_state(backend: &dyn StateBackend, stage: &str) -> Result<StateFile, String> {
    match backend.read_state().await.map_err(|e| e.to_string())? {
        Some(state) => {
            state.ensure_stage(stage).map_err(|e| e.to_string())?;
            Ok(state)
        }
        None => Ok(StateFile::new(stage)),
    }
}

/// Re-read recorded resources and forget the ones deleted outside the stack
async fn refresh(provider: &AwsProvider, state: &mut StateFile) -> Result<Vec<State>, String> {
    let current = refresh_states(provider, &state.to_states())
        .await
        .map_err(|e| format!("Failed to refresh state: {}", e))?;
    state.retain_states(&current);
    Ok(current)
}

async fn release(backend: &dyn StateBackend, lock: &netstack_state::LockInfo) {
    if let Err(e) = backend.release_lock(lock).await {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!("  {}", "Type 'yes' to confirm.".yellow());
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    println!();
    Ok(input.trim() == "yes")
}

// =============================================================================
// Execution
// =============================================================================

/// Run a plan, record the outcome, and persist the state even on failure
async fn execute(
    provider: AwsProvider,
    backend: &dyn StateBackend,
    mut state: StateFile,
    plan: &Plan,
    action: &str,
) -> Result<(), String> {
    let mut known: StateMap = state
        .to_states()
        .into_iter()
        .map(|s| (s.id.name.clone(), s))
        .collect();

    let interpreter = Interpreter::new(provider);
    let result = interpreter.apply(plan, &mut known).await;

    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(EffectOutcome::Skipped { reason }) => {
                println!("  {} {} ({})", "-".dimmed(), effect, reason)
            }
            Ok(_) => println!("  {} {}", "✓".green(), effect),
            Err(e) => println!("  {} {} - {}", "✗".red(), effect, e),
        }
    }
    let not_run = plan.len() - result.outcomes.len();

    state.record_apply(plan, &result);
    state.increment_serial();
    backend
        .write_state(&state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!(
                "{} complete! {} changes applied.",
                action, result.success_count
            )
            .green()
            .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "{} failed. {} succeeded, {} failed, {} not attempted.",
            action, result.success_count, result.failure_count, not_run
        ))
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        match effect {
            Effect::Create(resource) => {
                println!(
                    "  {} {}",
                    "+".green().bold(),
                    resource.id.to_string().cyan().bold()
                );
                let attributes: BTreeMap<_, _> = resource
                    .attributes
                    .iter()
                    .filter(|(k, _)| !k.starts_with('_'))
                    .collect();
                for (key, value) in attributes {
                    println!("      {}: {}", key, format_value(value).green());
                }
            }
            Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            } => {
                println!("  {} {}", "~".yellow().bold(), id.to_string().cyan().bold());
                for key in changed_attributes {
                    let old = from
                        .attributes
                        .get(key)
                        .map(format_value)
                        .unwrap_or_else(|| "(none)".to_string());
                    let new = to
                        .attributes
                        .get(key)
                        .map(format_value)
                        .unwrap_or_else(|| "(none)".to_string());
                    println!("      {}: {} → {}", key, old.red(), new.green());
                }
            }
            Effect::Delete { id, identifier } => {
                println!(
                    "  {} {} {}",
                    "-".red().bold(),
                    id.to_string().cyan().bold(),
                    format!("({})", identifier).dimmed()
                );
            }
        }
    }

    println!();
    println!("{}", plan.summary());
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let sorted: BTreeMap<_, _> = map.iter().collect();
            let strs: Vec<_> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
        Value::ResourceRef(name, attr) => format!("{}.{}", name, attr),
    }
}

/// JSON document describing the declared stack
fn synth_json(stack: &NetworkStack) -> serde_json::Value {
    let resources: Vec<_> = stack
        .resources
        .iter()
        .map(|r| {
            serde_json::json!({
                "type": r.id.resource_type,
                "name": r.id.name,
                "dependsOn": r.dependencies(),
                "attributes": r
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<serde_json::Map<_, _>>(),
            })
        })
        .collect();
    let parameters: Vec<_> = stack
        .parameters
        .iter()
        .map(|p| serde_json::json!({"name": p.name, "value": p.value.to_json()}))
        .collect();

    serde_json::json!({
        "stage": stack.stage,
        "resources": resources,
        "parameters": parameters,
    })
}
