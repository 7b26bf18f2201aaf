// # dnsync - declarative DNS reconciliation
//
// Thin command line layer over `dnsync-core`:
//
// - `validate`: check the desired-state document against the record grammar
// - `plan`: show what `sync` would change, without changing it
// - `sync`: bring the provider zone in line with the document
// - `verify`: ask public resolvers whether the declared records are visible
//
// All DNS logic lives in `dnsync-core`; this crate only reads configuration,
// wires the provider and resolvers together and maps outcomes to exit codes.
// Reports go to stdout, logs to stderr.
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// export CLOUDFLARE_ZONE_ID=your_zone_id
//
// dnsync -f dns/records.yaml validate
// dnsync plan
// dnsync sync --dry-run
// dnsync sync
// dnsync verify
// ```

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dnsync_core::config::DEFAULT_RECORDS_FILE;
use dnsync_core::reconcile::{self, ApplyReport};
use dnsync_core::verify::VerificationStatus;
use dnsync_core::{
    DesiredState, DesiredStateDocument, PropagationVerifier, ProviderRegistry, ReconciliationPlan,
    SyncConfig, VerificationReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes
///
/// - 0: everything succeeded
/// - 1: invalid document, failed operation or records not yet propagated
/// - 2: fatal error (configuration, unreadable live state, runtime)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsyncExitCode {
    Success = 0,
    Failure = 1,
    Fatal = 2,
}

impl From<DnsyncExitCode> for ExitCode {
    fn from(code: DnsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "dnsync")]
#[command(version, about = "Declarative DNS reconciliation for Cloudflare", long_about = None)]
struct Cli {
    /// Desired-state document
    #[arg(
        short = 'f',
        long = "file",
        env = "DNSYNC_RECORDS_FILE",
        default_value = DEFAULT_RECORDS_FILE,
        global = true
    )]
    file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DNSYNC_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Validate the desired-state document
    Validate,
    /// Show the changes a sync would make
    Plan,
    /// Apply the desired state to the provider
    Sync {
        /// Log the changes instead of applying them
        #[arg(long)]
        dry_run: bool,
    },
    /// Check that the declared records are visible on public resolvers
    Verify,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match settings::parse_log_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DnsyncExitCode::Fatal.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsyncExitCode::Fatal.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsyncExitCode::Fatal.into();
        }
    };

    let code = rt.block_on(async {
        match run(&cli).await {
            Ok(code) => code,
            Err(e) => {
                error!("{:#}", e);
                println!("Error: {:#}", e);
                DnsyncExitCode::Fatal
            }
        }
    });

    code.into()
}

async fn run(cli: &Cli) -> Result<DnsyncExitCode> {
    let document = match DesiredStateDocument::from_path(&cli.file) {
        Ok(document) => document,
        // An unreadable document is simply invalid for `validate`
        Err(e) if cli.command == Command::Validate => {
            println!("{}: {}", cli.file.display(), e);
            return Ok(DnsyncExitCode::Failure);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("cannot load {}", cli.file.display()));
        }
    };

    let desired = match document.load() {
        Ok(desired) => desired,
        Err(report) => {
            print!("{}", report.render());
            return Ok(DnsyncExitCode::Failure);
        }
    };

    match cli.command {
        Command::Validate => {
            print!("{}", document.validate().render());
            Ok(DnsyncExitCode::Success)
        }
        Command::Plan => run_plan(cli, &desired).await,
        Command::Sync { dry_run } => run_sync(cli, &desired, dry_run).await,
        Command::Verify => run_verify(&desired).await,
    }
}

fn provider_registry(config: &SyncConfig) -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        if config.dry_run {
            dnsync_provider_cloudflare::register_dry_run(&registry);
        } else {
            dnsync_provider_cloudflare::register(&registry);
        }
    }
    #[cfg(not(feature = "cloudflare"))]
    let _ = config;

    registry
}

fn load_config(cli: &Cli, desired: &DesiredState, dry_run: bool) -> Result<SyncConfig> {
    settings::sync_config(
        &settings::from_process_env,
        cli.file.clone(),
        desired.domain(),
        dry_run,
    )
}

async fn run_plan(cli: &Cli, desired: &DesiredState) -> Result<DnsyncExitCode> {
    let config = load_config(cli, desired, false)?;
    let provider = provider_registry(&config).create_provider(&config.provider)?;

    let plan = reconcile::plan(desired, provider.as_ref())
        .await
        .context("failed to read live records")?;
    print_plan(&plan);
    Ok(DnsyncExitCode::Success)
}

async fn run_sync(cli: &Cli, desired: &DesiredState, dry_run: bool) -> Result<DnsyncExitCode> {
    let config = load_config(cli, desired, dry_run)?;
    info!(
        "Syncing {} records for {} (dry-run: {})",
        desired.len(),
        desired.domain(),
        config.dry_run
    );
    let provider = provider_registry(&config).create_provider(&config.provider)?;

    let (plan, report) = reconcile::sync(desired, provider.as_ref())
        .await
        .context("failed to read live records")?;
    print_plan(&plan);
    print_apply_report(&report, config.dry_run);

    if report.is_success() {
        Ok(DnsyncExitCode::Success)
    } else {
        Ok(DnsyncExitCode::Failure)
    }
}

async fn run_verify(desired: &DesiredState) -> Result<DnsyncExitCode> {
    let verifier_config = settings::verifier_config(&settings::from_process_env)?;
    let verifier = PropagationVerifier::new(
        dnsync_resolver_hickory::resolvers_from_config(&verifier_config),
        verifier_config.lookup_delay(),
    )?;

    let report = verifier.verify(desired).await;
    print_verification_report(&report);

    if report.is_fully_propagated() {
        Ok(DnsyncExitCode::Success)
    } else {
        Ok(DnsyncExitCode::Failure)
    }
}

fn print_plan(plan: &ReconciliationPlan) {
    println!("Plan for {}:", plan.domain());
    for change in plan.mutations() {
        println!("  {}", change);
    }
    if plan.is_converged() {
        println!("  no changes, zone is in sync");
    }
    println!("{}", plan.summary());
}

fn print_apply_report(report: &ApplyReport, dry_run: bool) {
    println!();
    if dry_run {
        println!("Summary (dry-run, nothing was changed):");
    } else {
        println!("Summary:");
    }
    println!("  Created: {}", report.stats.created);
    println!("  Updated: {}", report.stats.updated);
    println!("  Deleted: {}", report.stats.deleted);
    println!("  Unchanged: {}", report.stats.unchanged);
    println!("  Failed: {}", report.stats.failed);

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("Failed operations:");
        for outcome in failures {
            println!("  - {}", outcome);
        }
    }
}

fn print_verification_report(report: &VerificationReport) {
    for result in &report.results {
        match result.status {
            VerificationStatus::Propagated => println!("ok   {}", result.key),
            VerificationStatus::Skipped => println!("skip {} (not verified)", result.key),
            VerificationStatus::NotPropagated => {
                println!("miss {}", result.key);
                for observation in &result.observations {
                    println!("       {}", observation);
                }
            }
        }
    }

    println!();
    println!("Summary:");
    println!("  Checked: {}", report.checked());
    println!("  Propagated: {}", report.propagated());
    println!("  Not propagated: {}", report.not_propagated());
    println!("  Skipped: {}", report.skipped());

    if report.is_fully_propagated() {
        println!();
        println!("All checked records have propagated");
        return;
    }

    println!();
    println!("The following records have not propagated yet:");
    for result in report.unpropagated() {
        println!(
            "  - {} ({}) -> {}",
            result.fqdn,
            result.record_type,
            result.expected.as_deref().unwrap_or("-")
        );
    }
    println!("DNS propagation may take up to 48 hours. Try again later.");
}
