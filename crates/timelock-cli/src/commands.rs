//! # Subcommands
//!
//! Every handler returns an exit code and writes its result to `out`.
//! Mutating handlers print each committed event as one JSON line and save
//! the snapshot only when the operation succeeded.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use timelock_controller::{Principal, Ruling, SelfCall, TimelockConfig};
use timelock_core::{bytes_to_hex, OperationId};

use crate::operation::OperationArgs;
use crate::state::{Session, StateFile};
use crate::Context;

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a state snapshot from a YAML configuration.
    Init {
        /// Gate configuration (identity, min_delay, delay_bounds, roles).
        #[arg(long)]
        config: PathBuf,
        /// Overwrite an existing snapshot.
        #[arg(long)]
        force: bool,
    },

    /// Print the id an operation is scheduled under.
    Hash(OperationArgs),

    /// Schedule an operation.
    Schedule {
        #[command(flatten)]
        operation: OperationArgs,
        /// Acting principal.
        #[arg(long = "as")]
        caller: Principal,
        /// Waiting period in seconds. Defaults to the current minimum delay.
        #[arg(long)]
        delay: Option<u64>,
        /// Free-text description, recorded in the scheduled events.
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Cancel a pending operation.
    Cancel {
        #[arg(long = "as")]
        caller: Principal,
        #[arg(long)]
        id: OperationId,
        #[arg(long, default_value = "")]
        reasoning: String,
    },

    /// Veto a pending operation, sending it to the arbiter.
    Dispute {
        #[arg(long = "as")]
        caller: Principal,
        #[arg(long)]
        id: OperationId,
    },

    /// Rule on a disputed operation.
    Resolve {
        #[arg(long = "as")]
        caller: Principal,
        #[arg(long)]
        id: OperationId,
        /// `accept` (cancel the operation) or `reject` (let it proceed).
        #[arg(long)]
        ruling: Ruling,
        #[arg(long, default_value = "")]
        reasoning: String,
    },

    /// Execute a ready operation.
    Execute {
        #[command(flatten)]
        operation: OperationArgs,
        #[arg(long = "as")]
        caller: Principal,
    },

    /// Show one operation, or the gate when no id is given.
    Status {
        #[arg(long)]
        id: Option<OperationId>,
    },

    /// Encode calls the gate applies to itself.
    #[command(subcommand)]
    SelfCall(SelfCallCommand),
}

/// Self-call encoders.
#[derive(Subcommand, Debug)]
pub enum SelfCallCommand {
    /// Payload that changes the minimum delay when executed.
    UpdateDelay(UpdateDelayArgs),
}

#[derive(Args, Debug)]
pub struct UpdateDelayArgs {
    /// New minimum delay in seconds.
    #[arg(long)]
    pub new_delay: u64,
}

/// Dispatch a parsed command.
pub fn run(ctx: &Context, command: &Command, out: &mut dyn Write) -> Result<u8> {
    match command {
        Command::Init { config, force } => cmd_init(&ctx.state, config, *force, out),
        Command::Hash(operation) => cmd_hash(operation, out),
        Command::Schedule {
            operation,
            caller,
            delay,
            description,
        } => mutate(ctx, out, |session| {
            let op = operation.to_operation()?;
            let delay = delay.unwrap_or_else(|| session.gate.min_delay());
            session
                .gate
                .schedule_operation(caller, &op, delay, description)?;
            Ok(())
        }),
        Command::Cancel {
            caller,
            id,
            reasoning,
        } => mutate(ctx, out, |session| {
            session.gate.cancel(caller, id, reasoning)?;
            Ok(())
        }),
        Command::Dispute { caller, id } => mutate(ctx, out, |session| {
            session.gate.dispute(caller, id)?;
            Ok(())
        }),
        Command::Resolve {
            caller,
            id,
            ruling,
            reasoning,
        } => mutate(ctx, out, |session| {
            session
                .gate
                .resolve_dispute(caller, id, *ruling, reasoning)?;
            Ok(())
        }),
        Command::Execute { operation, caller } => mutate(ctx, out, |session| {
            let op = operation.to_operation()?;
            session.gate.execute_operation(caller, &op)?;
            Ok(())
        }),
        Command::Status { id } => cmd_status(ctx, id.as_ref(), out),
        Command::SelfCall(SelfCallCommand::UpdateDelay(args)) => {
            let payload = SelfCall::UpdateDelay {
                new_delay: args.new_delay,
            }
            .encode()?;
            writeln!(out, "0x{}", bytes_to_hex(&payload))?;
            Ok(0)
        }
    }
}

fn cmd_init(state: &Path, config: &Path, force: bool, out: &mut dyn Write) -> Result<u8> {
    if state.exists() && !force {
        bail!(
            "state already exists at {} (use --force to overwrite)",
            state.display()
        );
    }
    let config = TimelockConfig::from_path(config)
        .with_context(|| format!("failed to load {}", config.display()))?;
    let snapshot = StateFile::create(config)?;
    snapshot.save(state)?;
    writeln!(
        out,
        "{}",
        json!({
            "identity": snapshot.config.identity,
            "min_delay": snapshot.ledger.min_delay,
            "state": state.display().to_string(),
        })
    )?;
    Ok(0)
}

fn cmd_hash(operation: &OperationArgs, out: &mut dyn Write) -> Result<u8> {
    let id = operation.to_operation()?.id()?;
    writeln!(out, "{id}")?;
    Ok(0)
}

fn cmd_status(ctx: &Context, id: Option<&OperationId>, out: &mut dyn Write) -> Result<u8> {
    let snapshot = StateFile::load(&ctx.state)?;
    let session = snapshot.open(ctx.now)?;
    let gate = &session.gate;
    let report = match id {
        Some(id) => json!({
            "id": id,
            "status": gate.status(id),
            "ready_at": gate.ready_at(id).raw(),
            "ready_at_utc": gate.ready_at(id).timestamp().map(|t| t.to_iso8601()),
            "dispute": gate.dispute_status_of(id),
            "dispute_code": gate.dispute_status_of(id).code(),
        }),
        None => json!({
            "identity": gate.identity(),
            "now": gate.now().secs(),
            "now_utc": gate.now().to_iso8601(),
            "min_delay": gate.min_delay(),
            "delay_bounds": gate.delay_bounds(),
            "roles": session.roles.grants(),
            "pending": gate.pending_operations(),
        }),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(0)
}

/// Load, apply `action`, print events, save.
fn mutate(
    ctx: &Context,
    out: &mut dyn Write,
    action: impl FnOnce(&Session) -> Result<()>,
) -> Result<u8> {
    let mut snapshot = StateFile::load(&ctx.state)?;
    let session = snapshot.open(ctx.now)?;
    action(&session)?;
    snapshot.absorb(&session);
    snapshot.save(&ctx.state)?;
    for event in session.trail.events() {
        writeln!(out, "{}", serde_json::to_string(&event)?)?;
    }
    Ok(0)
}
