use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hcso_provider::cloud::CloudClient;
use hcso_provider::config::Config;
use hcso_provider::error::format_api_error;
use hcso_provider::resource::workspace_service::{self, ServiceConfig, WaitSettings};
use hcso_provider::resource::{read_vpc_routes, read_vpc_subnets, RoutesQuery, SubnetsQuery};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Provider core for a sovereign-cloud tenant
#[derive(Parser, Debug)]
#[command(name = "hcso", version = hcso_provider::VERSION, about, long_about = None)]
struct Args {
    /// Region to use
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Project ID to use
    #[arg(short, long, global = true)]
    project_id: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the VPC routes data source
    Routes {
        #[arg(long = "type")]
        route_type: Option<String>,
        #[arg(long)]
        vpc_id: Option<String>,
        #[arg(long)]
        destination: Option<String>,
    },
    /// Read the VPC subnets data source
    Subnets {
        #[arg(long)]
        vpc_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        cidr: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Manage the Workspace service
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// Show or change the saved configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum WorkspaceCommand {
    /// Show the service; fails when it is closed
    Show,
    /// Open the service, or update it to match the file
    Apply {
        /// YAML or JSON service configuration
        file: PathBuf,
    },
    /// Close the service
    Close,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    SetRegion { region: String },
    SetProject { project_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("hcso started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("hcso").join("hcso.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".hcso").join("hcso.log");
    }
    PathBuf::from("hcso.log")
}

fn print<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn read_service_config(file: &Path) -> Result<ServiceConfig> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    serde_yaml::from_str(&content).with_context(|| format!("Invalid service configuration in {:?}", file))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut config = Config::load();

    if let Command::Config(command) = &args.command {
        return run_config(command, &mut config, args.output);
    }

    if args.region.is_some() {
        config.region = args.region.clone();
    }
    if args.project_id.is_some() {
        config.project_id = args.project_id.clone();
    }

    let client = CloudClient::new(&config).map_err(|e| anyhow::anyhow!(format_api_error(&e)))?;
    tracing::info!("Using region: {}, project: {}", client.region, client.project_id);

    if let Err(e) = run(&client, args.command, args.output).await {
        tracing::error!("Command failed: {}", e);
        eprintln!("Error: {}", format_api_error(&e));
        std::process::exit(1);
    }

    Ok(())
}

fn run_config(command: &ConfigCommand, config: &mut Config, output: OutputFormat) -> Result<()> {
    match command {
        ConfigCommand::Show => print(output, &config.redacted()),
        ConfigCommand::SetRegion { region } => config.set_region(region),
        ConfigCommand::SetProject { project_id } => config.set_project(project_id),
    }
}

async fn run(client: &CloudClient, command: Command, output: OutputFormat) -> hcso_provider::Result<()> {
    match command {
        Command::Routes {
            route_type,
            vpc_id,
            destination,
        } => {
            let query = RoutesQuery {
                region: None,
                route_type,
                vpc_id,
                destination,
            };
            let data = read_vpc_routes(client, &query).await?;
            emit(output, &data)
        }
        Command::Subnets {
            vpc_id,
            name,
            cidr,
            status,
        } => {
            let query = SubnetsQuery {
                region: None,
                vpc_id,
                name,
                cidr,
                status,
            };
            let data = read_vpc_subnets(client, &query).await?;
            emit(output, &data)
        }
        Command::Workspace(command) => run_workspace(client, command, output).await,
        Command::Config(_) => Ok(()),
    }
}

async fn run_workspace(
    client: &CloudClient,
    command: WorkspaceCommand,
    output: OutputFormat,
) -> hcso_provider::Result<()> {
    let wait = WaitSettings::default();
    match command {
        WorkspaceCommand::Show => {
            let record = workspace_service::read_service(client).await?;
            emit(output, &workspace_service::service_row(&record)?)
        }
        WorkspaceCommand::Apply { file } => {
            let config = read_service_config(&file)
                .map_err(|e| hcso_provider::Error::Config(format!("{:#}", e)))?;
            let record = workspace_service::apply_service(client, &config, wait).await?;
            emit(output, &workspace_service::service_row(&record)?)
        }
        WorkspaceCommand::Close => {
            workspace_service::destroy_service(client, wait).await?;
            Ok(())
        }
    }
}

fn emit<T: Serialize>(output: OutputFormat, value: &T) -> hcso_provider::Result<()> {
    print(output, value).map_err(|e| hcso_provider::Error::parse("output", e))
}
