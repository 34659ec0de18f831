use std::io::Write;

use anyhow::{anyhow, bail, Result};
use beacon_core::{find_value, NewValue, Revision, Value, ValueUpdate};
use beacon_intent::AssistantBackend;
use beacon_store::StorePaths;
use clap::Subcommand;
use tracing::{debug, info};

// ── CLI Schema ──

#[derive(Subcommand, Debug)]
pub enum ValuesCmd {
    /// Declare a new value
    Add {
        /// What matters to you, in your own words
        statement: String,
    },
    /// Restate an existing value
    Edit {
        /// Value ID
        id: String,
        /// New statement
        statement: String,
    },
    /// Delete a value
    Rm {
        /// Value ID
        id: String,
    },
    /// Show every revision of a value, oldest first
    History {
        /// Value ID
        id: String,
    },
    /// Keep a value despite its similarity insight
    Keep {
        /// Value ID
        id: String,
    },
}

// ── Dispatch ──

/// `beacon values [<subcommand>] [--json]`
pub fn execute(cmd: Option<ValuesCmd>, json: bool) -> Result<()> {
    let paths = StorePaths::discover();
    let (client, config) = crate::api_client(&paths)?;
    client.require_login()?;
    debug!(api_url = %config.api_url, ?cmd, "values command");

    let rt = tokio::runtime::Runtime::new()?;
    let mut out = std::io::stdout().lock();
    rt.block_on(run(&client, cmd, json, &mut out))
}

async fn run(
    backend: &dyn AssistantBackend,
    cmd: Option<ValuesCmd>,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        None => {
            let values = backend.fetch_values().await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&values)?)?;
            } else {
                print_values(out, &values)?;
            }
        }
        Some(ValuesCmd::Add { statement }) => {
            if statement.trim().is_empty() {
                bail!("A value needs a statement.");
            }
            let value = backend.create_value(&NewValue::declared(&statement)).await?;
            info!(value_id = %value.id, "value created");
            writeln!(out, "Added {}  {}", value.id, value.display_statement())?;
            print_insights(out, &value)?;
        }
        Some(ValuesCmd::Edit { id, statement }) => {
            let statement = statement.trim();
            if statement.is_empty() {
                bail!("A value needs a statement.");
            }
            let values = backend.fetch_values().await?;
            let value = find_value(&values, &id).ok_or_else(|| anyhow!("No value with id {id}"))?;
            let rev = value
                .active_revision()
                .ok_or_else(|| anyhow!("Value {id} has no active revision"))?;
            let updated = backend
                .update_value(&id, &ValueUpdate::restate(rev, statement))
                .await?;
            info!(value_id = %id, "value restated");
            writeln!(out, "Updated {}  {}", updated.id, updated.display_statement())?;
            print_insights(out, &updated)?;
        }
        Some(ValuesCmd::Rm { id }) => {
            backend.delete_value(&id).await?;
            info!(value_id = %id, "value deleted");
            writeln!(out, "Deleted {id}.")?;
        }
        Some(ValuesCmd::History { id }) => {
            let revisions = backend.value_history(&id).await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&revisions)?)?;
            } else {
                print_history(out, &id, &revisions)?;
            }
        }
        Some(ValuesCmd::Keep { id }) => {
            backend.acknowledge_insight(&id, None).await?;
            writeln!(out, "Keeping {id}; its insight is dismissed.")?;
        }
    }
    Ok(())
}

// ── Rendering ──

fn print_values(out: &mut impl Write, values: &[Value]) -> std::io::Result<()> {
    if values.is_empty() {
        return writeln!(out, "No values yet. Start with `beacon chat`.");
    }
    for value in values {
        let weight = value
            .active_revision()
            .and_then(|rev| rev.weight_raw)
            .map(|w| format!(" [{w}]"))
            .unwrap_or_default();
        writeln!(out, "{}  {}{}", value.id, value.display_statement(), weight)?;
        print_insights(out, value)?;
    }
    Ok(())
}

fn print_insights(out: &mut impl Write, value: &Value) -> std::io::Result<()> {
    for insight in &value.insights {
        match &insight.similar_value_id {
            Some(other) => writeln!(
                out,
                "    ! {} (similar to {other}; `beacon values keep {}` to keep both)",
                insight.message, value.id
            )?,
            None => writeln!(out, "    ! {}", insight.message)?,
        }
    }
    Ok(())
}

fn print_history(out: &mut impl Write, id: &str, revisions: &[Revision]) -> std::io::Result<()> {
    if revisions.is_empty() {
        return writeln!(out, "No history for {id}.");
    }
    for rev in revisions {
        let when = rev.created_at.as_deref().unwrap_or("-");
        writeln!(out, "{}  {when}  {}", rev.id, rev.statement)?;
    }
    Ok(())
}
