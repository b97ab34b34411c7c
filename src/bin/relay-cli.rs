use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use url::Url;

use bare_relay::config::RelayConfig;
use bare_relay::transport::url::bare_path;
use bare_relay::transport::{BareClient, Forwarder, HttpForwarder, OutboundRequest};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Fetch URLs through a running bare relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    relay: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL through the relay and print the body
    Fetch {
        target: String,

        /// Request method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra request header, as 'name: value'
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body
        #[arg(short, long)]
        data: Option<String>,

        /// Print status line and headers before the body
        #[arg(short, long)]
        include: bool,

        /// Print status and headers as JSON instead of the body
        #[arg(long)]
        json: bool,
    },
    /// Print the relay path that carries a URL
    Encode { target: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { target } => {
            let target = Url::parse(&target)?;
            println!("{}", bare_path(&target));
        }
        Commands::Fetch {
            target,
            method,
            headers,
            data,
            include,
            json,
        } => {
            let http = HttpForwarder::new(&RelayConfig::default())?;
            let client = BareClient::new(&cli.relay, http)?;

            let method: Method = method.to_uppercase().parse()?;
            let mut request = OutboundRequest::new(method, Url::parse(&target)?)
                .with_headers(parse_headers(&headers)?);
            if let Some(data) = data {
                request = request.with_body(Body::from(data));
            }

            let result = client.forward(request).await?;

            if json {
                let doc = summary_json(result.status, &result.headers);
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(());
            }

            let mut stdout = tokio::io::stdout();
            if include {
                stdout.write_all(format_head(result.status, &result.headers).as_bytes()).await?;
            }

            let mut stream = result.body.into_data_stream();
            while let Some(chunk) = stream.next().await {
                stdout.write_all(&chunk?).await?;
            }
            stdout.flush().await?;

            if !result.status.is_success() {
                eprintln!("Error: relay returned status {}", result.status);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<HeaderMap, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    for line in raw {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| format!("header '{}' is not 'name: value'", line))?;
        headers.append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    Ok(headers)
}

/// Status and headers as a JSON document.
fn summary_json(status: StatusCode, headers: &HeaderMap) -> Value {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();
    json!({
        "status": status.as_u16(),
        "headers": headers,
    })
}

/// Status line and headers as printed by `--include`.
fn format_head(status: StatusCode, headers: &HeaderMap) -> String {
    let mut head = format!("{}\n", status);
    for (name, value) in headers.iter() {
        head.push_str(&format!("{}: {}\n", name, String::from_utf8_lossy(value.as_bytes())));
    }
    head.push('\n');
    head
}
