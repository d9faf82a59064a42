//! courier: command-line front end for the pooled HTTP client.
//!
//! ```text
//!   courier.toml ──▶ config ──▶ init_shared_transports
//!                                     │
//!   argv ──▶ clap ──▶ RequestBuilder ─┴─▶ standard | pooled transport ──▶ stdout / file
//! ```

use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

use courier::client::{ContentType, Cookie, FormFields, FormFiles, HttpMethod, RequestBuilder};
use courier::config::{load_config, ApiCatalog, CourierConfig};
use courier::observability::logging::init_logging;
use courier::support::{close_quietly, expand};
use courier::transport::{init_shared_transports, TransportKind};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "HTTP client over shared, pooled transports", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transport strategy: standard or pooled
    #[arg(short, long, default_value = "standard")]
    transport: TransportKind,

    #[command(flatten)]
    request: RequestArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RequestArgs {
    /// Extra header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", global = true)]
    headers: Vec<String>,

    /// Cookie, `name=value` (repeatable)
    #[arg(short = 'b', long = "cookie", global = true)]
    cookies: Vec<String>,

    /// User-Agent header, overrides the configured default
    #[arg(long, global = true)]
    user_agent: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL
    Get { url: String },
    /// Send a form or raw body
    Post {
        url: String,
        /// Form field, `name=value` (repeatable)
        #[arg(short, long = "field")]
        fields: Vec<String>,
        /// Raw body; takes precedence over fields
        #[arg(long, conflicts_with = "fields")]
        body: Option<String>,
        /// Content type for the raw body
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Upload files as multipart/form-data
    Upload {
        url: String,
        /// Form field, `name=value` (repeatable)
        #[arg(short, long = "field")]
        fields: Vec<String>,
        /// File part, `name=path` (repeatable)
        #[arg(long = "file", required = true)]
        files: Vec<String>,
    },
    /// Stream a response body into a file
    Stream {
        url: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Call a configured API endpoint by id
    Api {
        id: String,
        /// Placeholder value, `name=value` (repeatable)
        #[arg(long = "var")]
        vars: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CourierConfig::default(),
    };
    init_logging(&config.logging.level);
    init_shared_transports(config.transport.clone());

    tracing::debug!(transport = %cli.transport, "courier starting");

    let mut builder = RequestBuilder::for_transport(cli.transport)?;
    apply_request_args(&mut builder, &cli.request, &config)?;

    match cli.command {
        Commands::Get { url } => {
            builder.set_method(HttpMethod::Get);
            let body = builder.dispatch(&url).await?;
            print_body(&builder, &body)?;
        }
        Commands::Post {
            url,
            fields,
            body,
            content_type,
        } => {
            builder.set_method(HttpMethod::Post);
            match body {
                Some(raw) => {
                    builder.set_body(raw);
                }
                None => {
                    builder.set_body_map(&parse_fields(&fields)?);
                }
            }
            if let Some(content_type) = content_type {
                builder.set_content_type(ContentType::from(content_type));
            }
            let body = builder.dispatch(&url).await?;
            print_body(&builder, &body)?;
        }
        Commands::Upload { url, fields, files } => {
            let fields = parse_fields(&fields)?;
            let files: FormFiles = parse_pairs(&files, '=')?
                .into_iter()
                .map(|(name, path)| (name, PathBuf::from(path)))
                .collect();
            builder
                .set_method(HttpMethod::Post)
                .build_multipart(&fields, &files)
                .await;
            let body = builder.dispatch(&url).await?;
            print_body(&builder, &body)?;
        }
        Commands::Stream { url, output } => {
            builder.set_method(HttpMethod::Get);
            let stream = builder.dispatch_stream(&url).await?;
            let status = stream.status();
            let mut file = tokio::fs::File::create(&output).await?;
            let written = stream.write_to(&mut file).await;
            close_quietly(&mut file, "output file").await;
            eprintln!("{status}: wrote {} bytes to {}", written?, output.display());
        }
        Commands::Api { id, vars } => {
            let catalog = ApiCatalog::new(&config.api);
            let Some(template) = catalog.resolve(&id) else {
                return Err(format!("unknown api id {id:?}").into());
            };
            let args: HashMap<String, String> = parse_pairs(&vars, '=')?.into_iter().collect();
            let url = expand(template, &args);
            builder.set_method(HttpMethod::Get);
            let body = builder.dispatch(&url).await?;
            print_body(&builder, &body)?;
        }
    }

    Ok(())
}

fn apply_request_args(
    builder: &mut RequestBuilder,
    args: &RequestArgs,
    config: &CourierConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(user_agent) = args.user_agent.as_ref().or(config.defaults.user_agent.as_ref()) {
        builder.set_user_agent(user_agent.clone());
    }
    for (name, value) in parse_pairs(&args.headers, ':')? {
        builder.add_header(name, value);
    }
    for (name, value) in parse_pairs(&args.cookies, '=')? {
        builder.add_cookie(Cookie::new(name, value));
    }
    Ok(())
}

fn parse_pairs(raw: &[String], separator: char) -> Result<Vec<(String, String)>, String> {
    raw.iter()
        .map(|item| {
            item.split_once(separator)
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| format!("expected `name{separator}value`, got {item:?}"))
        })
        .collect()
}

fn parse_fields(raw: &[String]) -> Result<FormFields, String> {
    let mut fields = FormFields::new();
    for (name, value) in parse_pairs(raw, '=')? {
        fields.entry(name).or_default().push(value);
    }
    Ok(fields)
}

fn print_body(builder: &RequestBuilder, body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(status) = builder.response_status() {
        if !status.is_success() {
            eprintln!("Error: server returned status {status}");
        }
    }

    let is_json = builder
        .response_headers()
        .get("content-type")
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
            println!("{}", serde_json::to_string_pretty(&json)?);
            return Ok(());
        }
    }
    println!("{}", String::from_utf8_lossy(body));
    Ok(())
}
