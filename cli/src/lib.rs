use anyhow::{anyhow, Error, Result};
use clap::{Parser, Subcommand};
use log::info;
use oxigraph::io::RdfFormat;
use oxigraph::model::{GraphName, NamedNode, Term};
use rdfdriver::util::write_quads;
use rdfdriver::{
    CacheMode, Config, ExecutableQuery, HttpGateway, HttpGatewayConfig, PreparedQuery,
    QueryLanguage, Session,
};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "rdfdriver")]
#[command(about = "Query and modify a remote RDF triple store")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Base URL of the store's REST endpoint
    #[clap(long, short, default_value = "http://localhost:8000", global = true)]
    endpoint: String,
    /// User name for basic authentication
    #[clap(long, short, global = true)]
    user: Option<String>,
    /// Password for basic authentication
    #[clap(long, short, global = true)]
    password: Option<String>,
    /// Session configuration file (JSON); defaults apply when omitted
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
    /// Send every write immediately instead of batching
    #[clap(long, action, default_value = "false", global = true)]
    no_cache: bool,
    /// Request timeout in seconds
    #[clap(long, global = true)]
    timeout: Option<u64>,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a SPARQL query and print its results
    Query {
        /// The query text
        query: String,
        /// Base IRI for relative IRIs in the query
        #[clap(long, short)]
        base: Option<String>,
        /// Query language, only SPARQL is supported
        #[clap(long, default_value = "sparql")]
        language: String,
        /// Exclude inferred statements
        #[clap(long, action, default_value = "false")]
        no_inference: bool,
        /// Inference rulesets to apply
        #[clap(long = "ruleset")]
        rulesets: Vec<String>,
    },
    /// Run a SPARQL update
    Update {
        /// The update text
        update: String,
        #[clap(long, short)]
        base: Option<String>,
    },
    /// Load an RDF file or URL into the store
    Load {
        /// Local path, or an http(s) or file URL
        source: String,
        /// Target graph; `default` for the default graph. Defaults to the graphs in the file.
        #[clap(long, short)]
        graph: Vec<String>,
        /// Base IRI, defaults to the file URI or the URL
        #[clap(long, short)]
        base: Option<String>,
        /// Serialization (file extension or media type), defaults to the extension or the
        /// media type the server reports
        #[clap(long, short)]
        format: Option<String>,
    },
    /// Count statements in the given graphs, or in the whole store
    Size {
        #[clap(long, short)]
        graph: Vec<String>,
    },
    /// Delete graphs
    Clear {
        #[clap(long, short)]
        graph: Vec<String>,
        /// Delete every graph in the store
        #[clap(long, action, default_value = "false")]
        all: bool,
    },
    /// Write statements to stdout or a file
    Export {
        #[clap(long, short)]
        graph: Vec<String>,
        /// Serialization (file extension or media type)
        #[clap(long, short, default_value = "nq")]
        format: String,
        /// Output file, defaults to stdout
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
}

/// Parses graph arguments. `default` names the default graph.
pub fn parse_graphs(graphs: &[String]) -> Result<Vec<GraphName>> {
    graphs
        .iter()
        .map(|graph| {
            if graph == "default" {
                Ok(GraphName::DefaultGraph)
            } else {
                NamedNode::new(graph.as_str())
                    .map(GraphName::from)
                    .map_err(|e| anyhow!("invalid graph IRI {graph}: {e}"))
            }
        })
        .collect()
}

/// Accepts a file extension (`ttl`) or a media type (`text/turtle`).
pub fn parse_format(format: &str) -> Result<RdfFormat> {
    RdfFormat::from_extension(format)
        .or_else(|| RdfFormat::from_media_type(format))
        .ok_or_else(|| anyhow!("unknown RDF format {format}"))
}

fn open_session(cmd: &Cli) -> Result<Session> {
    let mut config = match &cmd.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if cmd.no_cache {
        config.write_cache = CacheMode::Disabled;
    }
    let mut builder = HttpGatewayConfig::builder();
    builder.endpoint(cmd.endpoint.clone());
    if let Some(user) = &cmd.user {
        builder.user(user.clone());
    }
    if let Some(password) = &cmd.password {
        builder.password(password.clone());
    }
    if let Some(timeout) = cmd.timeout {
        builder.timeout_secs(timeout);
    }
    let gateway = HttpGateway::new(builder.build()?)?;
    info!("Connecting to {}", cmd.endpoint);
    Ok(Session::new(Arc::new(gateway), config)?)
}

fn term_to_cell(term: Option<&Term>) -> String {
    term.map(ToString::to_string).unwrap_or_default()
}

fn print_query(query: PreparedQuery) -> Result<()> {
    let stdout = std::io::stdout();
    match query {
        PreparedQuery::Tuple(query) => {
            let mut cursor = query.evaluate()?;
            let variables: Vec<String> = cursor
                .variables()?
                .iter()
                .map(|v| v.as_str().to_string())
                .collect();
            let mut out = stdout.lock();
            writeln!(out, "{}", variables.join("\t"))?;
            for row in cursor {
                let row = row?;
                let cells: Vec<String> = variables
                    .iter()
                    .map(|v| term_to_cell(row.get(v.as_str())))
                    .collect();
                writeln!(out, "{}", cells.join("\t"))?;
            }
        }
        PreparedQuery::Graph(query) => {
            let cursor = query.evaluate()?;
            let quads = cursor.map(|triple| triple.map(|t| t.in_graph(GraphName::DefaultGraph)));
            write_quads(stdout.lock(), RdfFormat::NTriples, quads)?;
        }
        PreparedQuery::Boolean(query) => {
            println!("{}", query.evaluate()?);
        }
        PreparedQuery::Update(query) => {
            query.execute()?;
        }
    }
    Ok(())
}

pub fn run() -> Result<()> {
    rdfdriver::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    rdfdriver::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // The RUST_LOG env var is set by `init_logging` if RDFDRIVER_LOG is present.
    // CLI flags for verbosity take precedence. If nothing is set, we default to "warn".
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    let session = open_session(&cmd)?;

    match cmd.command {
        Commands::Query {
            query,
            base,
            language,
            no_inference,
            rulesets,
        } => {
            let language: QueryLanguage = language.parse()?;
            let mut prepared = session.prepare_query(language, &query, base.as_deref())?;
            prepared.set_include_inferred(!no_inference);
            if !rulesets.is_empty() {
                prepared.set_rulesets(rulesets);
            }
            print_query(prepared)?;
        }
        Commands::Update { update, base } => {
            session.prepare_update(&update, base.as_deref())?.execute()?;
        }
        Commands::Load {
            source,
            graph,
            base,
            format,
        } => {
            let contexts = parse_graphs(&graph)?;
            let format = format.as_deref().map(parse_format).transpose()?;
            load(&session, &source, base.as_deref(), format, &contexts)?;
        }
        Commands::Size { graph } => {
            let contexts = parse_graphs(&graph)?;
            println!("{}", session.size(&contexts)?);
        }
        Commands::Clear { graph, all } => {
            if graph.is_empty() && !all {
                return Err(anyhow!("Specify --graph or --all"));
            }
            let contexts = parse_graphs(&graph)?;
            session.clear(&contexts)?;
        }
        Commands::Export {
            graph,
            format,
            output,
        } => {
            let contexts = parse_graphs(&graph)?;
            let format = parse_format(&format)?;
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    session.export_to_writer(std::io::BufWriter::new(file), format, &contexts)?;
                    info!("Wrote {}", path.display());
                }
                None => {
                    session.export_to_writer(std::io::stdout().lock(), format, &contexts)?;
                }
            }
        }
    }

    session.close();
    Ok(())
}

fn load(
    session: &Session,
    source: &str,
    base: Option<&str>,
    format: Option<RdfFormat>,
    contexts: &[GraphName],
) -> Result<()> {
    if is_url(source) {
        session.add_url(source, base, format, contexts)?;
    } else {
        session.add_file(Path::new(source), base, format, contexts)?;
    }
    info!("Loaded {source}");
    Ok(())
}

/// Whether a `load` source names a URL rather than a local path.
pub fn is_url(source: &str) -> bool {
    ["http://", "https://", "file:"]
        .iter()
        .any(|scheme| source.starts_with(scheme))
}
