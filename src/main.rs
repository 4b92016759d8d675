// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use ipnet::IpNet;
use serde_json::json;
use tracing::{debug, info, warn};
use zonereg::{
    audit::TracingAuditSink,
    config::RegistryConfig,
    constants::{CONFIG_PATH_ENV, DEFAULT_STATE_PATH, LOG_FORMAT_ENV, STATE_PATH_ENV},
    metrics,
    model::{NewNetwork, NewZone, RegistryState},
    network::parse_network,
    registry::Registry,
    serial::next_serial,
    service::RegistryService,
};

#[cfg(test)]
mod main_tests;

/// DNS zone registry maintenance tool.
///
/// Commands operate on a JSON state snapshot. Mutating commands write the snapshot
/// back only when they succeed.
#[derive(Debug, Parser)]
#[command(name = "zonereg", version, about)]
struct Cli {
    /// Registry configuration file (YAML, or JSON by extension)
    #[arg(long, env = CONFIG_PATH_ENV, global = true)]
    config: Option<PathBuf>,

    /// JSON state snapshot
    #[arg(long, env = STATE_PATH_ENV, default_value = DEFAULT_STATE_PATH, global = true)]
    state: PathBuf,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the next SOA serial for a date
    Serial {
        /// Date of the serial, defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Serial currently published
        #[arg(long)]
        previous: Option<u32>,
    },

    /// Resolve the most specific zone for a name or an address
    Resolve { target: String },

    /// Network administration and usage reports
    Network {
        #[command(subcommand)]
        command: NetworkCommand,
    },

    /// Verify registry invariants; exits non-zero on violations
    Check,

    /// Publish dirty zones, or a single zone
    Publish { zone: Option<String> },

    /// Zone administration
    Zone {
        #[command(subcommand)]
        command: ZoneCommand,
    },
}

#[derive(Debug, Subcommand)]
enum NetworkCommand {
    /// Create a network
    Create {
        #[arg(value_parser = parse_network)]
        network: IpNet,
        #[arg(long)]
        vlan: Option<u16>,
        /// Number of low addresses to reserve, defaults to the configured count
        #[arg(long)]
        reserved: Option<u32>,
        #[arg(long)]
        frozen: bool,
        #[arg(long)]
        description: Option<String>,
    },

    /// Print the usage report of a network
    Report {
        #[arg(value_parser = parse_network)]
        network: IpNet,
    },

    /// Delete an unused network
    Delete {
        #[arg(value_parser = parse_network)]
        network: IpNet,
    },

    /// List networks
    List,
}

#[derive(Debug, Subcommand)]
enum ZoneCommand {
    /// Create a forward or reverse zone
    Create {
        name: String,
        #[arg(long)]
        email: String,
        /// Nameservers, the first one is primary unless --primary is given
        #[arg(long = "ns", required = true, num_args = 1..)]
        nameservers: Vec<String>,
        #[arg(long)]
        primary: Option<String>,
    },

    /// Delete a zone without hosts
    Delete { name: String },

    /// Print the rendered contents of a zone
    Show { name: String },

    /// List zones with their serial and dirty flag
    List,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("zonereg-runtime")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging();
    debug!(state = %cli.state.display(), "Logging initialized");

    let result = run(&cli).await;
    if cli.print_metrics {
        eprintln!("{}", metrics::gather_metrics()?);
    }
    result
}

fn initialize_logging() {
    // RUST_LOG selects the filter (default info), RUST_LOG_FORMAT=json switches to
    // structured output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact()
                .init();
        }
    }
}

// ============================================================================
// Configuration and state files
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<RegistryConfig> {
    let config = match path {
        Some(path) => RegistryConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => RegistryConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_state(path: &Path) -> Result<RegistryState> {
    if !path.exists() {
        info!(state = %path.display(), "State file not found, starting empty");
        return Ok(RegistryState::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state from {}", path.display()))
}

/// Writes the snapshot next to its destination, then renames it into place.
fn save_state(path: &Path, state: &RegistryState) -> Result<()> {
    let content = serde_json::to_string_pretty(state)?;
    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, content)
        .with_context(|| format!("Failed to write state to {}", staging.display()))?;
    std::fs::rename(&staging, path)
        .with_context(|| format!("Failed to replace state at {}", path.display()))?;
    debug!(state = %path.display(), "State saved");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

async fn run(cli: &Cli) -> Result<()> {
    if let Command::Serial { date, previous } = &cli.command {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        println!("{}", next_serial(date, *previous)?);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let state = load_state(&cli.state)?;
    let registry = Registry::from_state(state, config).with_audit_sink(Arc::new(TracingAuditSink));
    let service = RegistryService::new(registry);

    let changed = match &cli.command {
        Command::Serial { .. } => false,
        Command::Resolve { target } => {
            resolve(&service, target).await?;
            false
        }
        Command::Network { command } => network(&service, command).await?,
        Command::Check => {
            check(&service).await?;
            false
        }
        Command::Publish { zone } => {
            let outcome = publish(&service, zone.as_deref()).await?;
            // Serials that did advance are persisted before failures are reported.
            if outcome.published > 0 {
                save_state(&cli.state, &service.snapshot().await)?;
            }
            if outcome.failed > 0 {
                bail!("{} zone(s) could not be published", outcome.failed);
            }
            false
        }
        Command::Zone { command } => zone(&service, command).await?,
    };

    if changed {
        save_state(&cli.state, &service.snapshot().await)?;
    }
    Ok(())
}

async fn resolve(service: &RegistryService, target: &str) -> Result<()> {
    let answer = service
        .query(|registry| match target.parse::<IpAddr>() {
            Ok(ip) => json!({
                "target": ip,
                "zone": registry.resolve_reverse_zone(ip).map(|z| z.name.clone()),
                "network": registry.find_network(ip).map(|n| n.network),
                "owners": registry
                    .address_owners(ip)
                    .into_iter()
                    .filter_map(|id| registry.host(id).map(|h| h.name.clone()))
                    .collect::<Vec<_>>(),
                "ptrOverride": registry
                    .ptr_override_for(ip)
                    .and_then(|p| registry.host(p.host).map(|h| h.name.clone())),
            }),
            Err(_) => json!({
                "target": target,
                "zone": registry.resolve_zone(target).map(|z| z.name.clone()),
            }),
        })
        .await;
    print_json(&answer)
}

async fn network(service: &RegistryService, command: &NetworkCommand) -> Result<bool> {
    match command {
        NetworkCommand::Create {
            network,
            vlan,
            reserved,
            frozen,
            description,
        } => {
            let request = NewNetwork {
                vlan: *vlan,
                reserved: *reserved,
                frozen: *frozen,
                description: description.clone(),
                ..NewNetwork::new(*network)
            };
            let created = service
                .mutate("create_network", |registry| registry.create_network(request))
                .await?;
            print_json(&created)?;
            Ok(true)
        }
        NetworkCommand::Report { network } => {
            let report = service
                .query(|registry| {
                    let id = registry
                        .network_by_range(*network)
                        .map(|n| n.id)
                        .with_context(|| format!("Network {network} not found"))?;
                    Ok::<_, anyhow::Error>(registry.network_report(id)?)
                })
                .await?;
            print_json(&report)?;
            Ok(false)
        }
        NetworkCommand::Delete { network } => {
            let id = service
                .query(|registry| registry.network_by_range(*network).map(|n| n.id))
                .await
                .with_context(|| format!("Network {network} not found"))?;
            service
                .mutate("delete_network", |registry| registry.delete_network(id))
                .await?;
            info!(%network, "Network deleted");
            Ok(true)
        }
        NetworkCommand::List => {
            let networks = service
                .query(|registry| registry.networks().cloned().collect::<Vec<_>>())
                .await;
            print_json(&networks)?;
            Ok(false)
        }
    }
}

async fn check(service: &RegistryService) -> Result<()> {
    let violations = service.query(Registry::verify).await;
    if violations.is_empty() {
        info!("Registry is consistent");
        return Ok(());
    }
    for violation in &violations {
        warn!(%violation, "Invariant violated");
        println!("{violation}");
    }
    bail!("{} invariant violation(s) found", violations.len())
}

/// Outcome of a publish run; failed zones stay dirty.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PublishOutcome {
    published: usize,
    failed: usize,
}

async fn publish(service: &RegistryService, zone: Option<&str>) -> Result<PublishOutcome> {
    let results = match zone {
        Some(name) => {
            let result = service
                .mutate("publish_zone", |registry| registry.publish_zone(name))
                .await;
            vec![(name.to_string(), result)]
        }
        None => service.publish_dirty().await,
    };

    let mut outcome = PublishOutcome::default();
    let mut summary = Vec::with_capacity(results.len());
    for (name, result) in &results {
        match result {
            Ok(contents) => {
                outcome.published += 1;
                summary.push(json!({
                    "zone": name,
                    "serial": contents.zone.serialno,
                }));
            }
            Err(err) => {
                outcome.failed += 1;
                summary.push(json!({
                    "zone": name,
                    "error": err.to_string(),
                    "reason": err.status_reason(),
                    "retryable": err.is_retryable(),
                }));
            }
        }
    }
    print_json(&summary)?;
    Ok(outcome)
}

async fn zone(service: &RegistryService, command: &ZoneCommand) -> Result<bool> {
    match command {
        ZoneCommand::Create {
            name,
            email,
            nameservers,
            primary,
        } => {
            let request = NewZone {
                name: name.clone(),
                email: email.clone(),
                nameservers: nameservers.clone(),
                primary_ns: primary.clone(),
                ..Default::default()
            };
            let created = service
                .mutate("create_zone", |registry| registry.create_zone(request))
                .await?;
            print_json(&created)?;
            Ok(true)
        }
        ZoneCommand::Delete { name } => {
            service
                .mutate("delete_zone", |registry| registry.delete_zone(name))
                .await?;
            info!(zone = %name, "Zone deleted");
            Ok(true)
        }
        ZoneCommand::Show { name } => {
            let contents = service
                .query(|registry| registry.zone_contents(name))
                .await?;
            print_json(&contents)?;
            Ok(false)
        }
        ZoneCommand::List => {
            let zones = service
                .query(|registry| {
                    registry
                        .zones()
                        .map(|z| {
                            json!({
                                "name": z.name,
                                "serial": z.serialno,
                                "dirty": z.updated,
                                "reverse": z.kind.is_reverse(),
                            })
                        })
                        .collect::<Vec<_>>()
                })
                .await;
            print_json(&zones)?;
            Ok(false)
        }
    }
}
