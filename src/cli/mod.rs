//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `publish` -- publish a batch of media items
//! - `resources` -- list supported resources and their input fields
//! - `config show|get|path` -- inspect configuration
//! - `credentials store|clear` -- manage the keychain access token
//! - `version` -- print build/version info

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::config::{self, Config};
use crate::credentials;
use crate::graph::HttpGraphClient;
use crate::publish::{
    FailureMode, ItemOutput, PublishError, PublishItem, PublishPipeline, ResourceRegistry,
};

/// Publish media through the Graph API container workflow.
#[derive(Parser, Debug)]
#[command(
    name = "graphpost",
    version = env!("CARGO_PKG_VERSION"),
    about = "graphpost: publish images, reels and stories through the Graph API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish every item in a JSON array and print one result per item.
    Publish {
        /// JSON file with the items, or `-` for stdin.
        #[arg(short, long)]
        items: String,

        /// Record failures as results instead of aborting the batch.
        #[arg(long)]
        continue_on_fail: bool,

        /// API version for items that do not set `graphApiVersion`.
        #[arg(long)]
        api_version: Option<String>,
    },

    /// List supported resources and their input fields.
    Resources,

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage the access token stored in the OS keychain.
    #[command(subcommand)]
    Credentials(CredentialsCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print a specific configuration value by dot-notation path.
    Get {
        /// Dot-notation key (e.g. "graph.apiVersion").
        key: String,
    },

    /// Print the resolved configuration file path.
    Path,
}

#[derive(Subcommand, Debug)]
pub enum CredentialsCommand {
    /// Store an access token for the configured account.
    Store {
        /// The access token.
        token: String,
    },

    /// Delete the stored access token.
    Clear,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["token", "secret", "password", "appsecret"];

/// Run the `publish` subcommand. Returns `false` when the batch aborted.
pub async fn handle_publish(
    cfg: &Config,
    items_source: &str,
    continue_on_fail: bool,
    api_version: Option<String>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let raw = read_items_source(items_source).await?;
    let items = parse_items(&raw)?;

    let token = credentials::resolve_access_token(&cfg.credentials.account)?;
    let client = HttpGraphClient::new(token, &cfg.http_client_config())?;

    let mut settings = cfg.pipeline_settings();
    if continue_on_fail {
        settings.failure_mode = FailureMode::ContinueOnFail;
    }
    if let Some(version) = api_version.filter(|v| !v.trim().is_empty()) {
        settings.default_api_version = version;
    }
    let pipeline = PublishPipeline::new(
        Arc::new(client),
        Arc::new(cfg.resource_registry()),
        settings,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling publish run");
            on_signal.cancel();
        }
    });

    match pipeline.run_inputs(items, &cancel).await {
        Ok(outputs) => {
            println!("{}", render_outputs(&outputs)?);
            Ok(true)
        }
        Err(err) => {
            tracing::error!(
                item_index = err.item_index,
                kind = ?err.source.kind(),
                "publish batch aborted"
            );
            eprintln!("Error: {}", crate::logging::redact::redact_string(&err.to_string()));
            Ok(false)
        }
    }
}

/// Run the `resources` subcommand.
pub fn handle_resources(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry: ResourceRegistry = cfg.resource_registry();
    let timing: Vec<Value> = registry
        .descriptors()
        .iter()
        .map(|d| json!({"resource": d.key(), "timing": d.timing}))
        .collect();
    let out = json!({
        "resources": registry.resource_options(),
        "fields": registry.input_fields(),
        "timing": timing,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Run the `config show` subcommand.
pub fn handle_config_show(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let redacted = redact_secrets(serde_json::to_value(cfg)?);
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

/// Run the `config get <key>` subcommand. Returns `false` if the key is absent.
pub fn handle_config_get(cfg: &Config, key: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let value = redact_secrets(serde_json::to_value(cfg)?);
    match get_value_at_path(&value, key) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(true)
        }
        None => {
            eprintln!("Key not found: {}", key);
            Ok(false)
        }
    }
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `credentials store` subcommand.
pub fn handle_credentials_store(
    cfg: &Config,
    token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    credentials::store_access_token(&cfg.credentials.account, token)?;
    println!("Stored access token for account '{}'", cfg.credentials.account);
    Ok(())
}

/// Run the `credentials clear` subcommand.
pub fn handle_credentials_clear(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    credentials::clear_access_token(&cfg.credentials.account)?;
    println!("Cleared access token for account '{}'", cfg.credentials.account);
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("graphpost {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("GRAPHPOST_BUILD_DATE"));
    println!("  Git commit: {}", env!("GRAPHPOST_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn read_items_source(source: &str) -> std::io::Result<String> {
    if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin().read_to_string(&mut raw).await?;
        Ok(raw)
    } else {
        tokio::fs::read_to_string(Path::new(source)).await
    }
}

/// Parse a JSON array of items. A single object is treated as a batch of one.
///
/// Only invalid JSON fails the whole batch. Each element is converted on its
/// own so a malformed item is reported at its index by the pipeline.
pub fn parse_items(
    raw: &str,
) -> Result<Vec<Result<PublishItem, PublishError>>, serde_json::Error> {
    let items = match serde_json::from_str::<Value>(raw)? {
        Value::Array(values) => values.into_iter().map(PublishItem::from_value).collect(),
        single => vec![PublishItem::from_value(single)],
    };
    Ok(items)
}

/// Render pipeline outputs as the JSON result array.
pub fn render_outputs(outputs: &[ItemOutput]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outputs)
}

/// Navigate a JSON value by dot-notation path and return the leaf value.
fn get_value_at_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current.clone())
}

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    *child = Value::String("[REDACTED]".to_string());
                } else {
                    *child = redact_secrets(child.take());
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
