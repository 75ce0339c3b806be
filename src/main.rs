//! Warden
//!
//! Command line entry point: validate policy, inspect role mapping, check a
//! single decision, or serve decisions over stdio.

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use warden::{
    AppConfig, ClusterTopology, PolicySnapshot, PolicyStore, PrivilegesEvaluator, StaticTopology,
    TracingAuditLog,
    config::{LogFormat, load_config},
    evaluator::{ActionRequest, Request, TransportAddress, User},
    load_policy_dir,
    transport::{run_stdio, spawn_policy_reloader},
};

/// Warden - role-based privilege evaluation
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "WARDEN_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the settings file
    #[arg(long, env = "WARDEN_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and compile the policy, then report what was found
    Validate,

    /// Print the roles a user is mapped to
    Roles(Caller),

    /// Evaluate one request and print the decision as JSON
    Check {
        #[command(flatten)]
        caller: Caller,

        /// Action name, e.g. indices:data/read/search
        #[arg(long)]
        action: String,

        /// Request body as JSON, e.g. '{"type":"search","indices":["starfleet"]}'
        #[arg(long)]
        request: String,
    },

    /// Serve JSON-lines decisions on stdin/stdout
    Serve,
}

#[derive(ClapArgs, Debug)]
struct Caller {
    /// User name
    #[arg(long)]
    user: String,

    /// Backend role of the user (repeatable)
    #[arg(long = "backend-role")]
    backend_roles: Vec<String>,

    /// Caller address
    #[arg(long, default_value = "127.0.0.1")]
    address: IpAddr,

    /// Caller hostname
    #[arg(long)]
    host: Option<String>,
}

impl Caller {
    fn user(&self) -> User {
        User::new(&self.user).with_backend_roles(self.backend_roles.iter().cloned())
    }

    fn address(&self) -> TransportAddress {
        let address = TransportAddress::new(self.address);
        match &self.host {
            Some(host) => address.with_host(host),
            None => address,
        }
    }
}

fn init_logging(config: &AppConfig, level: Option<&str>) {
    let level = level.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for decisions
    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn load_topology(config: &AppConfig) -> anyhow::Result<StaticTopology> {
    match config.cluster.topology_path() {
        Some(path) => StaticTopology::load(&path)
            .with_context(|| format!("loading topology from {}", path.display())),
        None => {
            info!("No topology file configured, the cluster has no indices");
            Ok(StaticTopology::default())
        }
    }
}

fn load_store(config: &AppConfig) -> anyhow::Result<Arc<PolicyStore>> {
    let dir = config.policy.dir_path();
    let documents = load_policy_dir(&dir)
        .inspect_err(|e| error!(dir = %dir.display(), error = %e, "Failed to load policy"))?;
    let snapshot = PolicySnapshot::compile(documents)
        .inspect_err(|e| error!(error = %e, "Failed to compile policy"))?;
    Ok(Arc::new(PolicyStore::with_snapshot(snapshot)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("loading configuration")?;
    init_logging(&config, args.log_level.as_deref());

    info!(version = env!("CARGO_PKG_VERSION"), "Starting warden");

    let store = load_store(&config)?;
    let evaluator = PrivilegesEvaluator::new(
        store.clone(),
        Arc::new(TracingAuditLog),
        &config.engine.config_index,
    )?;

    match args.command {
        Command::Validate => {
            let topology = load_topology(&config)?;
            let snapshot = store.snapshot();
            println!(
                "policy ok: {} roles, {} role mappings, {} action groups, {} indices",
                snapshot.role_count(),
                snapshot.role_mapper().len(),
                snapshot.documents().action_groups.len(),
                topology.all_concrete_indices().len(),
            );
        }
        Command::Roles(caller) => {
            let user = caller.user();
            let address = caller.address();
            for role in evaluator.map_roles(Some(&user), Some(&address))? {
                println!("{}", role);
            }
        }
        Command::Check {
            caller,
            action,
            request,
        } => {
            let topology = load_topology(&config)?;
            let body: ActionRequest =
                serde_json::from_str(&request).context("parsing --request")?;
            let mut request = Request::new(body).with_remote_address(caller.address());

            let decision = evaluator.evaluate(&caller.user(), &action, &mut request, &topology)?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Command::Serve => {
            let topology = load_topology(&config)?;

            let reloader = config.policy.reload_interval().map(|period| {
                spawn_policy_reloader(store.clone(), config.policy.dir_path(), period)
            });

            tokio::select! {
                result = run_stdio(&evaluator, &topology) => result?,
                _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
            }

            if let Some(handle) = reloader {
                handle.abort();
            }
        }
    }

    Ok(())
}
