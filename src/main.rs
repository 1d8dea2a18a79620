//! crossns - list custom resources across every namespace a user may read

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use kube::api::DynamicObject;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crossns_common::kube_utils;
use crossns_common::telemetry::{init_telemetry, TelemetryConfig};
use crossns_common::{ResourceRegistry, UserPrincipal};
use crossns_fetcher::{
    CrossNamespaceFetcher, DynamicObjectClient, FetcherConfig, NamespacedResult,
    ReflectorNamespaceLister, RequestContext,
};
use crossns_rbac::ImpersonatingAuthProvider;

/// crossns - RBAC-scoped cross-namespace resource listing
#[derive(Parser, Debug)]
#[command(name = "crossns", version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "CROSSNS_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a registered kind in every namespace the user may read it in
    ///
    /// Authorization is evaluated by impersonating the user; objects are
    /// then listed with this process's own credentials. Prints one JSON
    /// line per permitted namespace.
    Fetch(FetchArgs),
    /// Print the registered kinds
    Kinds,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Kind label to list (see `crossns kinds`)
    #[arg(long)]
    kind: String,

    /// User to evaluate access for
    #[arg(long, env = "CROSSNS_USER")]
    user: String,

    /// Groups the user belongs to (repeatable)
    #[arg(long = "group")]
    groups: Vec<String>,

    /// Bearer token identifying the user's session
    #[arg(long, env = "CROSSNS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path to kubeconfig (defaults to in-cluster or ~/.kube/config)
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Deadline for each authorization rules query, in seconds
    #[arg(long, env = "CROSSNS_RULES_TIMEOUT_SECS")]
    rules_timeout_secs: Option<u64>,

    /// Deadline for each per-namespace list, in seconds
    #[arg(long, env = "CROSSNS_LIST_TIMEOUT_SECS")]
    list_timeout_secs: Option<u64>,

    /// Maximum concurrent authorization rules queries
    #[arg(long, env = "CROSSNS_MAX_CONCURRENT_RULE_QUERIES")]
    max_concurrent_rule_queries: Option<usize>,
}

impl FetchArgs {
    fn fetcher_config(&self) -> FetcherConfig {
        let defaults = FetcherConfig::default();
        FetcherConfig {
            rules_query_timeout: self.rules_timeout_secs.map(Duration::from_secs),
            list_timeout: self.list_timeout_secs.map(Duration::from_secs),
            max_concurrent_rule_queries: self
                .max_concurrent_rule_queries
                .unwrap_or(defaults.max_concurrent_rule_queries),
            ..defaults
        }
    }

    fn principal(&self) -> UserPrincipal {
        let principal = UserPrincipal::new(self.user.clone(), self.groups.clone());
        match &self.token {
            Some(token) => principal.with_token(token.clone()),
            None => principal,
        }
    }
}

/// One output line per namespace
#[derive(Serialize)]
struct NamespaceLine<'a> {
    namespace: &'a str,
    count: usize,
    names: Vec<&'a str>,
    error: Option<String>,
}

impl<'a> From<&'a NamespacedResult<Vec<DynamicObject>>> for NamespaceLine<'a> {
    fn from(result: &'a NamespacedResult<Vec<DynamicObject>>) -> Self {
        Self {
            namespace: &result.namespace,
            count: result.list.len(),
            names: result
                .list
                .iter()
                .filter_map(|o| o.metadata.name.as_deref())
                .collect(),
            error: result.error.as_ref().map(ToString::to_string),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        json: cli.json_logs,
        ..Default::default()
    })?;

    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        anyhow::bail!("failed to install crypto provider: {e:?}");
    }

    match cli.command {
        Commands::Fetch(args) => run_fetch(args).await,
        Commands::Kinds => print_kinds(),
    }
}

fn print_kinds() -> anyhow::Result<()> {
    for kind in ResourceRegistry::default().iter() {
        println!("{}", serde_json::to_string(kind)?);
    }
    Ok(())
}

async fn run_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let registry = Arc::new(ResourceRegistry::default());
    let config = kube_utils::load_config(args.kubeconfig.as_deref()).await?;
    let client = kube_utils::client_from_config(config.clone())?;

    let cancel = CancellationToken::new();
    let (lister, watch) = ReflectorNamespaceLister::new(client.clone(), cancel.child_token());
    tokio::spawn(watch);

    let fetcher = CrossNamespaceFetcher::new(
        args.fetcher_config(),
        registry,
        Arc::new(lister),
        Arc::new(ImpersonatingAuthProvider::new(config)),
        Arc::new(DynamicObjectClient::new(client)),
    )?;

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling fetch");
            interrupt.cancel();
        }
    });

    let ctx = RequestContext::with_cancellation(args.principal(), cancel.child_token());
    let result = fetcher.fetch(&ctx, &args.kind, Vec::<DynamicObject>::new).await;
    cancel.cancel();
    let results = result?;

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    for result in &results {
        println!("{}", serde_json::to_string(&NamespaceLine::from(result))?);
    }
    info!(
        kind = %args.kind,
        namespaces = results.len(),
        failed,
        "Fetch finished"
    );
    Ok(())
}
