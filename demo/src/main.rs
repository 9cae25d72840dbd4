//! toolgate Assistant Reference Deployment: Demo CLI
//!
//! Runs one or all of the three assistant scenarios, then optionally lists
//! what the audit log recorded. Each scenario uses the real guard (TOML
//! policy, grant store, hash-chained audit log, schema validator, masker)
//! wired to mock tool bodies.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- confirmation-flow
//!   cargo run -p demo -- --audit-db audit.db route-gating
//!   cargo run -p demo -- --audit-db audit.db audit --tool email.send

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use toolgate_contracts::{
    audit::AuditFilter,
    error::{GateError, GateResult},
    principal::PrincipalId,
    verdict::Outcome,
};
use toolgate_ref_assistant::{
    scenarios::{self, confirmation_flow, grant_lifecycle, route_gating},
    AuditBackend,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// toolgate: authorization guard for agent tool calls.
///
/// Each subcommand runs one or all of the assistant scenarios, demonstrating
/// route gating, capability grants, confirmation tokens, and the audit chain.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "toolgate assistant reference demo",
    long_about = "Runs toolgate assistant scenarios showing route gating, capability grants,\n\
                  single-use confirmation tokens, and audit chain integrity."
)]
struct Cli {
    /// Persist the audit log to this SQLite file instead of keeping it in memory.
    #[arg(long, global = true, value_name = "PATH")]
    audit_db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three assistant scenarios in sequence.
    RunAll,
    /// Scenario 1: Confirmation Flow (irreversible email.send round trip).
    ConfirmationFlow,
    /// Scenario 2: Route Gating (safe tools, routes, lists, schemas, masking).
    RouteGating,
    /// Scenario 3: Grant Lifecycle (scope, expiry, purge, revoke).
    GrantLifecycle,
    /// List recorded decisions and check the hash chain. Needs --audit-db.
    Audit {
        /// Only decisions about this tool.
        #[arg(long)]
        tool: Option<String>,
        /// Only decisions for this principal.
        #[arg(long)]
        principal: Option<String>,
        /// Only decisions with this outcome: allow, deny, or needs-confirmation.
        #[arg(long, value_parser = parse_outcome)]
        outcome: Option<Outcome>,
        /// Only entries after this sequence number.
        #[arg(long)]
        after: Option<u64>,
    },
}

fn parse_outcome(s: &str) -> Result<Outcome, String> {
    match s {
        "allow" => Ok(Outcome::Allow),
        "deny" => Ok(Outcome::Deny),
        "needs-confirmation" | "needs_confirmation" => Ok(Outcome::NeedsConfirmation),
        other => Err(format!("unknown outcome '{other}'")),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=info to see each decision as it is made.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let persisted = cli.audit_db.is_some();
    let result = open_audit(cli.audit_db.as_ref()).and_then(|audit| match cli.command {
        Command::RunAll => {
            print_banner();
            scenarios::run_all(&audit).map(|_| ())
        }
        Command::ConfirmationFlow => {
            print_banner();
            confirmation_flow::run_scenario(&audit).map(|_| ())
        }
        Command::RouteGating => {
            print_banner();
            route_gating::run_scenario(&audit).map(|_| ())
        }
        Command::GrantLifecycle => {
            print_banner();
            grant_lifecycle::run_scenario(&audit).map(|_| ())
        }
        Command::Audit {
            tool,
            principal,
            outcome,
            after,
        } => {
            if !persisted {
                Err(GateError::ConfigError {
                    reason: "the audit command reads a persisted log; pass --audit-db <PATH>"
                        .to_string(),
                })
            } else {
                let mut filter = AuditFilter::default();
                filter.tool_name = tool;
                filter.principal = principal.map(PrincipalId::new);
                filter.outcome = outcome;
                filter.after_sequence = after;
                list_audit(&audit, filter)
            }
        }
    });

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn open_audit(path: Option<&PathBuf>) -> GateResult<AuditBackend> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "opening sqlite audit log");
            AuditBackend::sqlite(path)
        }
        None => Ok(AuditBackend::in_memory()),
    }
}

// ── Audit listing ─────────────────────────────────────────────────────────────

fn list_audit(audit: &AuditBackend, filter: AuditFilter) -> GateResult<()> {
    let mut shown = 0usize;
    for entry in audit.query(filter) {
        let entry = entry?;
        let record = &entry.record;
        println!(
            "[{:>5}] {}  {:<18} {:<24} {:<12} {}",
            entry.sequence,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.principal.as_str(),
            record.tool_name,
            record.route.as_str(),
            record.verdict.outcome(),
        );
        if record.verdict.outcome() != Outcome::Allow {
            println!("        reason: {}", record.verdict.reason());
        }
        shown += 1;
    }

    let verified = audit.verify_integrity()?;
    println!();
    println!("{shown} matching entr{}", if shown == 1 { "y" } else { "ies" });
    println!(
        "Audit chain integrity: {}",
        if verified { "VERIFIED" } else { "FAILED" }
    );
    if !verified {
        std::process::exit(2);
    }
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("toolgate: Tool-call Authorization Guard");
    println!("Personal Assistant Reference Demo");
    println!("========================================");
    println!();
    println!("Guard pipeline per call:");
    println!("  [1] Shape: tool must be declared and its arguments must match the schema");
    println!("  [2] Deny list: a denied tool never runs, whatever the grants");
    println!("  [3] Route: the call must come from a route the tool expects");
    println!("  [4] Capability gate: live, in-scope grants must cover every capability");
    println!("  [5] Confirmation: irreversible tools need a fresh single-use token");
    println!("  [6] Audit: one hash-chained record per decision, before the verdict returns");
    println!();
}
