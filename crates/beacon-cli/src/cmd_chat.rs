use std::io::{BufRead, Write};

use anyhow::Result;
use beacon_core::{ContextMode, Message};
use beacon_intent::{AssistantBackend, ChatSession, Effect, ResolveError, Turn};
use beacon_store::StorePaths;
use tracing::info;

/// One line of chat input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Say(&'a str),
    Accept(&'a str),
    Reject(&'a str),
    Keep(&'a str),
    Recs,
    Quit,
    Unknown(&'a str),
    Blank,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Say(line);
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("quit" | "exit", _) => Input::Quit,
        ("recs", _) => Input::Recs,
        ("accept", id) if !id.is_empty() => Input::Accept(id),
        ("reject", id) if !id.is_empty() => Input::Reject(id),
        ("keep", id) if !id.is_empty() => Input::Keep(id),
        _ => Input::Unknown(line),
    }
}

/// `beacon chat [--mode <mode>]`
pub fn execute(mode: Option<ContextMode>) -> Result<()> {
    let paths = StorePaths::discover();
    let (client, config) = crate::api_client(&paths)?;
    client.require_login()?;
    let mode = match mode {
        Some(mode) => mode,
        None => config
            .context_mode
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default(),
    };
    info!(api_url = %config.api_url, mode = mode.as_str(), "starting chat");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let stdin = std::io::stdin();
        run(
            &client,
            mode,
            stdin.lock(),
            &mut std::io::stdout(),
            &mut std::io::stderr(),
        )
        .await
    })
}

/// Drive one session from `input` until EOF or `/quit`. Assistant output
/// goes to `out`; alerts go to `err`.
async fn run(
    backend: &dyn AssistantBackend,
    mode: ContextMode,
    input: impl BufRead,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<()> {
    let mut session = ChatSession::start(backend, mode).await?;
    if let Some(welcome) = session.transcript().last() {
        print_message(out, welcome)?;
    }
    writeln!(out, "(type /quit to leave, /recs for suggested values, /keep <id> to keep a flagged value)")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let turn = match parse_input(&line) {
            Input::Blank => continue,
            Input::Quit => break,
            Input::Say(text) => match session.handle_utterance(backend, text).await {
                Ok(turn) => turn,
                Err(ResolveError::EmptyUtterance) => continue,
            },
            Input::Accept(id) => session.accept_recommendation(backend, id).await,
            Input::Reject(id) => {
                let turn = session.reject_recommendation(backend, id).await;
                if turn.alerts().next().is_none() {
                    writeln!(out, "Dismissed {id}.")?;
                }
                turn
            }
            Input::Keep(id) => session.keep_both(backend, id).await,
            Input::Recs => {
                let mut turn = Turn::default();
                session.load_recommendations(backend, &mut turn).await;
                print_recommendations(out, &session)?;
                turn
            }
            Input::Unknown(cmd) => {
                writeln!(err, "Unknown command: {cmd}")?;
                continue;
            }
        };
        render(out, err, &turn)?;
        out.flush()?;
    }
    Ok(())
}

fn print_message(out: &mut impl Write, message: &Message) -> std::io::Result<()> {
    writeln!(out, "\n{}\n", message.content)
}

fn render(out: &mut impl Write, err: &mut impl Write, turn: &Turn) -> std::io::Result<()> {
    for message in &turn.messages {
        print_message(out, message)?;
        if let Some(rec_id) = &message.recommendation_id {
            writeln!(out, "  suggested value {rec_id}: /accept {rec_id} or /reject {rec_id}")?;
        }
    }
    for alert in turn.alerts() {
        writeln!(err, "{}: {}", alert.title, alert.message)?;
    }
    for effect in &turn.effects {
        match effect {
            Effect::RecommendationAccepted(id) if turn.messages.is_empty() => {
                writeln!(out, "Accepted {id}.")?;
            }
            Effect::InsightAcknowledged(id) => writeln!(out, "Keeping {id} as it is.")?,
            _ => {}
        }
    }
    Ok(())
}

fn print_recommendations(out: &mut impl Write, session: &ChatSession) -> std::io::Result<()> {
    let recs = session.recommendations();
    if recs.is_empty() {
        return writeln!(out, "No suggested values right now.");
    }
    for rec in recs {
        let statement = rec.payload.statement.as_deref().unwrap_or("(no statement)");
        writeln!(out, "  {}  {}", rec.id, statement)?;
    }
    Ok(())
}
