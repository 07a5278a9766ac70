use clap::{Args, Parser, Subcommand};
use flowstudio::api::{
    AgentCreate, AiResourceCreate, KnowledgeBaseCreate, ResourceKind, parse_test_payload,
    test_template,
};
use flowstudio::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Author, check and manage agent workflows
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the configuration
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a new workflow containing only the start and end nodes
    New {
        /// Output file; prints to stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List the variables a node can bind its inputs to
    Vars {
        flow: PathBuf,
        node: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a workflow for structural and binding problems
    Validate { flow: PathBuf },
    /// Manage saved agents
    #[command(subcommand)]
    Agents(AgentCommand),
    /// Manage AI model resources
    #[command(subcommand)]
    Resources(ResourceCommand),
    /// Manage knowledge bases and their documents
    #[command(subcommand)]
    Kb(KbCommand),
}

#[derive(Subcommand, Debug)]
enum AgentCommand {
    List,
    Get { id: String },
    /// Download the latest flow of an agent
    Flow {
        id: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Export an agent as YAML
    Export {
        id: String,
        /// Directory to write the exported file into
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Run an agent with a chat message
    Run { id: String, message: String },
    /// Create an agent from a flow file
    Create {
        name: String,
        flow: PathBuf,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Draft a flow from a description
    Generate {
        description: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ResourceCommand {
    List,
    /// Enabled resources, optionally of one type
    Available {
        #[arg(short = 't', long = "type")]
        kind: Option<ResourceKind>,
    },
    Create(CreateResourceArgs),
    TestConnection { id: String },
    SetDefault { id: String },
    /// Send a request body to a resource; defaults to the template for its type
    Test {
        id: String,
        #[arg(short, long)]
        payload: Option<PathBuf>,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct CreateResourceArgs {
    name: String,
    #[arg(short = 't', long = "type")]
    kind: ResourceKind,
    endpoint: String,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    default: bool,
}

#[derive(Subcommand, Debug)]
enum KbCommand {
    List,
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    Get { id: String },
    Delete { id: String },
    /// Upload a document, optionally processing it and waiting for completion
    Upload {
        kb: String,
        file: PathBuf,
        #[arg(long)]
        process: bool,
        #[arg(long, requires = "process")]
        wait: bool,
    },
    Process { kb: String, doc: String },
    Preview { kb: String, doc: String },
    Chunks { kb: String, doc: String },
    Search {
        kb: String,
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    Publish { id: String },
    Unpublish { id: String },
}

const POLL_INTERVAL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = StudioConfig::load(cli.config.as_deref())
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli.command, &config).await {
        exit_with_error(&e.to_string());
    }
}

async fn run(command: Command, config: &StudioConfig) -> Result<()> {
    match command {
        Command::New { out } => {
            let graph = Graph::starter();
            write_output(&FlowDocument::to_string_pretty(&graph)?, out)
        }
        Command::Vars { flow, node, json } => {
            let graph = FlowDocument::load(&flow)?;
            if !graph.contains(&node) {
                return Err(GraphError::NodeNotFound(node).into());
            }
            let vars = upstream_variables(&graph, &node);
            if json {
                return print_json(&vars);
            }
            if vars.is_empty() {
                println!("No upstream variables for '{}'.", node);
            }
            for var in vars {
                println!("{:<32} {:<40} {}", var.label, var.value, var.param_type);
            }
            Ok(())
        }
        Command::Validate { flow } => {
            let graph = FlowDocument::load(&flow)?;
            let report = validate(&graph);
            for issue in &report.issues {
                println!("{}", issue);
            }
            if !report.is_ok() {
                return Err(format!("{} error(s) in '{}'", report.errors().count(), flow.display()).into());
            }
            println!(
                "'{}' is valid ({} nodes, {} edges, {} warning(s)).",
                flow.display(),
                graph.len(),
                graph.edges().len(),
                report.warnings().count()
            );
            Ok(())
        }
        Command::Agents(cmd) => run_agents(cmd, &ApiClient::new(&config.api)?).await,
        Command::Resources(cmd) => run_resources(cmd, &ApiClient::new(&config.api)?).await,
        Command::Kb(cmd) => run_kb(cmd, &ApiClient::new(&config.api)?, config).await,
    }
}

async fn run_agents(command: AgentCommand, client: &ApiClient) -> Result<()> {
    let agents = client.agents();
    match command {
        AgentCommand::List => {
            for agent in agents.list().await? {
                let version = agent
                    .latest_version
                    .map(|v| format!("v{}", v))
                    .unwrap_or_else(|| "-".to_string());
                println!("{}  {:<6} {}", agent.id, version, agent.name);
            }
            Ok(())
        }
        AgentCommand::Get { id } => print_json(&agents.get(&id).await?),
        AgentCommand::Flow { id, out } => {
            let flow = agents.flow(&id).await?;
            // Decode once so a corrupt stored flow is reported here.
            let graph = flow.into_graph()?;
            write_output(&FlowDocument::to_string_pretty(&graph)?, out)
        }
        AgentCommand::Export { id, dir } => {
            let exported = agents.export_yaml(&id).await?;
            match dir {
                Some(dir) => {
                    let path = dir.join(&exported.filename);
                    fs::write(&path, exported.yaml)?;
                    println!("Exported to {}", path.display());
                }
                None => print!("{}", exported.yaml),
            }
            Ok(())
        }
        AgentCommand::Run { id, message } => {
            let response = agents.chat(&id, &message).await?;
            info!(status = %response.status, "agent finished");
            println!("{}", response.output_text());
            Ok(())
        }
        AgentCommand::Create {
            name,
            flow,
            description,
        } => {
            let graph = FlowDocument::load(&flow)?;
            let report = validate(&graph);
            if !report.is_ok() {
                for issue in report.errors() {
                    eprintln!("{}", issue);
                }
                return Err("refusing to upload a flow with errors".into());
            }
            let mut create = AgentCreate::new(&name, graph.to_flow_json());
            create.description = description;
            let agent = agents.create(&create).await?;
            println!("Created agent {}", agent.id);
            Ok(())
        }
        AgentCommand::Generate { description, out } => {
            let graph = agents.generate(&description).await?.into_graph()?;
            write_output(&FlowDocument::to_string_pretty(&graph)?, out)
        }
        AgentCommand::Delete { id } => {
            agents.delete(&id).await?;
            println!("Deleted agent {}", id);
            Ok(())
        }
    }
}

async fn run_resources(command: ResourceCommand, client: &ApiClient) -> Result<()> {
    let resources = client.resources();
    match command {
        ResourceCommand::List => {
            for r in resources.list().await? {
                let default = if r.is_default { "*" } else { " " };
                let enabled = if r.is_enabled { "" } else { " (disabled)" };
                println!(
                    "{} {}  {:<16} {:<24} {:?}{}",
                    default,
                    r.id,
                    r.kind.label(),
                    r.name,
                    r.health_status,
                    enabled
                );
            }
            Ok(())
        }
        ResourceCommand::Available { kind } => print_json(&resources.available(kind).await?),
        ResourceCommand::Create(args) => {
            let mut create = AiResourceCreate::new(&args.name, args.kind, &args.endpoint);
            create.api_key = args.api_key;
            create.is_default = args.default;
            let resource = resources.create(&create).await?;
            println!("Created resource {}", resource.id);
            Ok(())
        }
        ResourceCommand::TestConnection { id } => {
            let result = resources.test_connection(&id).await?;
            let latency = result
                .latency_ms
                .map(|ms| format!(" ({:.0} ms)", ms))
                .unwrap_or_default();
            println!(
                "{}: {}{}",
                if result.success { "ok" } else { "failed" },
                result.message,
                latency
            );
            Ok(())
        }
        ResourceCommand::SetDefault { id } => {
            resources.set_default(&id).await?;
            println!("{} is now the default for its type", id);
            Ok(())
        }
        ResourceCommand::Test { id, payload } => {
            let payload = match payload {
                Some(path) => parse_test_payload(&fs::read_to_string(&path)?)?,
                None => {
                    let resource = resources
                        .list()
                        .await?
                        .into_iter()
                        .find(|r| r.id == id)
                        .ok_or_else(|| format!("resource '{}' not found", id))?;
                    test_template(resource.kind, Some(&resource.name))
                }
            };
            print_json(&resources.run_test(&id, &payload).await?)
        }
        ResourceCommand::Delete { id } => {
            resources.delete(&id).await?;
            println!("Deleted resource {}", id);
            Ok(())
        }
    }
}

async fn run_kb(command: KbCommand, client: &ApiClient, config: &StudioConfig) -> Result<()> {
    let kbs = client.knowledge();
    match command {
        KbCommand::List => {
            for kb in kbs.list().await? {
                let published = if kb.is_published { "published" } else { "draft" };
                println!(
                    "{}  {:<9} {:>4} docs  {}",
                    kb.id,
                    published,
                    kb.document_count.unwrap_or(kb.documents.len() as u32),
                    kb.name
                );
            }
            Ok(())
        }
        KbCommand::Create { name, description } => {
            let kb = kbs.create(&KnowledgeBaseCreate { name, description }).await?;
            println!("Created knowledge base {}", kb.id);
            Ok(())
        }
        KbCommand::Get { id } => print_json(&kbs.get(&id).await?),
        KbCommand::Delete { id } => {
            kbs.delete(&id).await?;
            println!("Deleted knowledge base {}", id);
            Ok(())
        }
        KbCommand::Upload {
            kb,
            file,
            process,
            wait,
        } => {
            let document = kbs.upload_document(&kb, &file).await?;
            println!("Uploaded {} as {}", document.filename, document.id);
            if process {
                kbs.process_document(&kb, &document.id).await?;
                println!("Processing started");
            }
            if wait {
                let doc = kbs
                    .wait_for_document(&kb, &document.id, POLL_INTERVAL)
                    .await?;
                println!("{:?}: {} chunks", doc.status, doc.chunk_count);
                if let Some(message) = &doc.error_message {
                    println!("{}", message);
                }
            }
            Ok(())
        }
        KbCommand::Process { kb, doc } => {
            kbs.process_document(&kb, &doc).await?;
            println!("Processing started");
            Ok(())
        }
        KbCommand::Preview { kb, doc } => {
            println!("{}", kbs.document_preview(&kb, &doc).await?);
            Ok(())
        }
        KbCommand::Chunks { kb, doc } => {
            for chunk in kbs.document_chunks(&kb, &doc).await? {
                println!("--- {} ---\n{}", chunk.id, chunk.content);
            }
            Ok(())
        }
        KbCommand::Search {
            kb,
            query,
            top_k,
            threshold,
        } => {
            let mut request = SearchQuery::new(&query).top_k(top_k.unwrap_or(config.search.top_k));
            // The backend compares thresholds as similarities.
            if let (Some(threshold), ScoreOrder::HigherIsBetter) =
                (threshold, config.search.score_order)
            {
                request = request.score_threshold(threshold);
            }
            let results = rank_within(
                kbs.search(&kb, &request).await?,
                config.search.score_order,
                threshold,
            );
            if results.is_empty() {
                println!("No matches.");
            }
            for (i, hit) in results.iter().enumerate() {
                println!("{}. [{:.4}] {}", i + 1, hit.score, hit.content);
            }
            Ok(())
        }
        KbCommand::Publish { id } => {
            let kb = kbs.publish(&id).await?;
            println!("{} published", kb.name);
            Ok(())
        }
        KbCommand::Unpublish { id } => {
            let kb = kbs.unpublish(&id).await?;
            println!("{} unpublished", kb.name);
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_output(content: &str, out: Option<PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(&path, content)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
