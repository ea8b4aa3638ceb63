use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use graphpersist::persist::escape_string;
use graphpersist::{EdgeEntity, MapperConfig, RawRecord, RenderMode, Value, VertexRef};
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "graph-tool")]
#[command(about = "Developer tooling for graphpersist statement synthesis")]
struct Cli {
    /// Log filter, e.g. `debug` or `graphpersist=trace`
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the statement for an edge described as JSON
    Render {
        /// Edge description file; `-` reads stdin
        #[arg(long)]
        input: PathBuf,
        /// Embed values as literals instead of binding parameters
        #[arg(long)]
        literal: bool,
        /// Mapper config file applied before rendering
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show how a string is escaped for a literal statement
    Escape { text: String },
}

/// Edge as described on the command line.
#[derive(Debug, Deserialize)]
struct EdgeDescription {
    label: String,
    key: Option<String>,
    #[serde(rename = "inV")]
    in_v: Option<String>,
    #[serde(rename = "outV")]
    out_v: Option<String>,
    /// Treat the edge as already stored
    #[serde(default)]
    stored: bool,
    #[serde(default)]
    properties: Map<String, Json>,
    #[serde(default)]
    delete: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Render {
            input,
            literal,
            config,
        } => render(&input, literal, config.as_deref()),
        Command::Escape { text } => {
            println!("{}", escape_string(&text));
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_new(level).context("Invalid log level")?)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read edge description from stdin")?;
        return Ok(raw);
    }
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read edge description '{}'", path.display()))
}

fn render(input: &Path, literal: bool, config: Option<&Path>) -> Result<()> {
    let description: EdgeDescription =
        serde_json::from_str(&read_input(input)?).context("Malformed edge description")?;

    let config = match config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config '{}'", path.display()))?;
            MapperConfig::from_json(&raw)?
        }
        None => MapperConfig::new(),
    };

    let edge = build_edge(description, &config)?;
    let mode = if literal {
        RenderMode::Literal
    } else {
        config.render_mode()
    };
    let statement = edge.synthesize(mode)?;

    println!("{}", statement.text());
    if !statement.parameters().is_empty() {
        println!("{}", serde_json::to_string_pretty(&statement.parameters_json())?);
    }
    Ok(())
}

fn build_edge(
    description: EdgeDescription,
    config: &MapperConfig,
) -> Result<EdgeEntity<VertexRef, VertexRef>> {
    let mut edge = EdgeEntity::unkeyed(description.label.as_str());
    edge.attach(config);

    if description.stored {
        let (Some(key), Some(in_v), Some(out_v)) = (
            description.key.as_deref(),
            description.in_v.as_deref(),
            description.out_v.as_deref(),
        ) else {
            return Err(anyhow!("A stored edge needs key, inV and outV"));
        };
        edge.load(&RawRecord::edge(key, &description.label, out_v, in_v))?;
    } else {
        match description.key {
            Some(key) => edge.assign_key(key)?,
            None => edge.assign_key(graphpersist::persist::new_entity_key())?,
        }
        if let Some(in_v) = description.in_v {
            edge.set_in_vertex_id(in_v)?;
        }
        if let Some(out_v) = description.out_v {
            edge.set_out_vertex_id(out_v)?;
        }
    }

    for (name, raw) in description.properties {
        edge.set_property(&name, Value::from_stored(&raw))
            .with_context(|| format!("Property '{name}' rejected"))?;
    }
    if description.delete {
        edge.delete();
    }
    Ok(edge)
}

