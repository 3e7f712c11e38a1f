use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use postcraft::app::{self, AppConfig};
use postcraft::config::{default_session_dir, PipelineConfig};
use postcraft::pipeline::{BrandMemory, ContentType, GenerationEvent, GenerationRequest, Product};
use postcraft::session::{FileSessionCache, SessionCache, SessionId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Draft social media posts with a multi-pass LLM pipeline
#[derive(Parser)]
#[command(name = "postcraft")]
#[command(about = "Research, outline, draft, polish and score social media posts", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and print every event as a JSON line
    Generate(GenerateArgs),
    /// Inspect stored sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Topic or seed idea for the post
    #[arg(long)]
    idea: String,

    /// Continue an existing session instead of starting a new one
    #[arg(long)]
    session_id: Option<String>,

    /// post, story, reel, ad, product, faq, support or landing
    #[arg(long, default_value = "post")]
    content_type: String,

    #[arg(long)]
    product_name: Option<String>,

    /// Restricts knowledge retrieval to this product
    #[arg(long)]
    product_id: Option<String>,

    #[arg(long)]
    product_description: Option<String>,

    /// YAML file describing brand voice, tone, key points and CTAs
    #[arg(long)]
    brand_file: Option<PathBuf>,

    /// Free-text instruction, highest priority when polishing
    #[arg(long)]
    instruction: Option<String>,

    /// Existing post body to build on
    #[arg(long)]
    body: Option<String>,

    /// Inputs changed since the last run; recompute every pass
    #[arg(long)]
    has_change: bool,

    /// Directory of `.tera` files overriding built-in prompts
    #[arg(long)]
    prompts_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Print a stored session as JSON
    Show {
        /// Session id printed by `generate`
        id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match AppConfig::new(cli.verbose) {
        Ok(app_config) => {
            let app_config = app_config.with_config_path(cli.config.clone());
            run(cli, app_config).await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether the command succeeded
async fn run(cli: Cli, app_config: AppConfig) -> anyhow::Result<bool> {
    let config = app::initialize_app(app_config)?;

    match cli.command {
        Commands::Generate(args) => run_generate(&config, args).await,
        Commands::Session {
            command: SessionCommands::Show { id },
        } => run_session_show(&config, &id).await.map(|()| true),
    }
}

async fn run_generate(config: &PipelineConfig, args: GenerateArgs) -> anyhow::Result<bool> {
    let request = build_request(&args)?;
    let cache = app::open_session_cache(&config.session);
    let orchestrator = app::build_orchestrator(config, cache, args.prompts_dir.as_deref())?;

    let (session_id, mut events) = Arc::new(orchestrator).stream(request);
    info!("Generating into session {}", session_id);

    let mut succeeded = false;
    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event)?);
        if let GenerationEvent::Final { .. } = event {
            succeeded = true;
        }
    }
    Ok(succeeded)
}

fn build_request(args: &GenerateArgs) -> anyhow::Result<GenerationRequest> {
    let brand = match &args.brand_file {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read brand file {}", path.display()))?;
            let brand: BrandMemory = serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid brand file {}", path.display()))?;
            Some(brand)
        }
        None => None,
    };

    let product = args.product_name.as_ref().map(|name| Product {
        id: args.product_id.clone(),
        name: name.clone(),
        description: args.product_description.clone(),
        category: None,
    });

    let content_type: ContentType = args.content_type.parse()?;

    Ok(GenerationRequest {
        session_id: args.session_id.clone().map(SessionId::from_string),
        idea: Some(args.idea.clone()),
        body: args.body.clone(),
        content_type: Some(content_type),
        product,
        brand,
        content_instruction: args.instruction.clone(),
        has_change: args.has_change,
        ..GenerationRequest::default()
    })
}

async fn run_session_show(config: &PipelineConfig, id: &str) -> anyhow::Result<()> {
    let dir = config
        .session
        .storage_dir
        .clone()
        .or_else(default_session_dir)
        .ok_or_else(|| anyhow!("No session directory configured"))?;

    let cache = FileSessionCache::new(dir);
    let id = SessionId::from(id);
    let session = cache
        .get(&id)
        .await?
        .ok_or_else(|| anyhow!("Session {} not found", id))?;

    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}
