//! Headless commands: the scriptable front end over the same client library
//! the dashboard uses.

use anyhow::Result;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::types::DocumentStatus;
use crate::api::types::{short_timestamp, Document};
use crate::api::KnowledgeBase;
use crate::ask::{ascii_bar, max_step_ms, submit, AskForm};
use crate::config::SatchelConfig;
use crate::poll::{watch_document, PollPolicy, WatchOutcome};
use crate::session::SessionStore;

/// Sign in and persist the token + username locally
pub async fn login_command(
    backend: &dyn KnowledgeBase,
    store: &mut SessionStore,
    username: &str,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let token = backend.login(username, &password).await?;
    store.login(&token, username)?;
    info!("signed in as {}", username);
    println!("🎒 Signed in as {}. Token stored.", username);
    Ok(())
}

/// Clear the stored session. Local-only; no server round-trip.
pub fn logout_command(store: &mut SessionStore) -> Result<()> {
    store.logout()?;
    println!("🎒 Signed out. Local token cleared.");
    Ok(())
}

pub fn whoami_command(store: &SessionStore) -> Result<()> {
    let session = store.current();
    if session.is_authenticated() {
        println!("Signed in as {}", session.username);
    } else {
        println!("Not signed in. Run `satchel login` first.");
    }
    Ok(())
}

/// List documents with status and chunk counts
pub async fn list_command(backend: &dyn KnowledgeBase) -> Result<()> {
    let docs = backend.list_documents().await?;
    if docs.is_empty() {
        println!("No documents yet. Upload one with `satchel upload`.");
        return Ok(());
    }

    println!(
        "{:>5}  {:<34}  {:<9}  {:>6}  {}",
        "ID", "Title", "Status", "Chunks", "Last indexed"
    );
    for doc in &docs {
        println!(
            "{:>5}  {:<34}  {:<9}  {:>6}  {}",
            doc.id,
            truncated(&doc.title, 34),
            doc.status.label(),
            doc.chunks_count,
            doc.last_indexed_at
                .as_deref()
                .map(short_timestamp)
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    let indexed = docs
        .iter()
        .filter(|d| d.status == DocumentStatus::Indexed)
        .count();
    let indexing = docs
        .iter()
        .filter(|d| d.status == DocumentStatus::Indexing)
        .count();
    let failed = docs
        .iter()
        .filter(|d| d.status == DocumentStatus::Failed)
        .count();
    println!(
        "\n{} total · {} indexed · {} indexing · {} failed",
        docs.len(),
        indexed,
        indexing,
        failed
    );
    Ok(())
}

/// Show one document's full detail
pub async fn show_command(backend: &dyn KnowledgeBase, id: i64) -> Result<()> {
    let doc = backend.get_document(id).await?;
    print_document(&doc);
    Ok(())
}

/// Upload a file as a new document
pub async fn upload_command(
    backend: &dyn KnowledgeBase,
    title: &str,
    file: PathBuf,
) -> Result<()> {
    if !file.exists() {
        return Err(anyhow::anyhow!("File not found: {:?}", file));
    }

    let bytes = tokio::fs::read(&file).await?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string_lossy().to_string());

    info!("uploading {:?} ({} bytes)", file, bytes.len());
    let doc = backend.upload_document(title, &file_name, bytes).await?;

    println!("📄 Uploaded \"{}\" as document {}", doc.title, doc.id);
    println!("   Status: {}", doc.status);
    println!("   Run `satchel index {}` to make it searchable.", doc.id);
    Ok(())
}

/// Start an indexing job, optionally watching it to a terminal state
pub async fn index_command(
    backend: &dyn KnowledgeBase,
    config: &SatchelConfig,
    id: i64,
    watch: bool,
) -> Result<()> {
    let accepted = backend.start_indexing(id).await?;
    info!("indexing job {} accepted for doc {}", accepted.job_id, id);
    println!(
        "⚡ Indexing started for document {} (job {}, status {})",
        id, accepted.job_id, accepted.status
    );

    if !watch {
        println!("   Check progress with `satchel show {}`.", id);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let policy = PollPolicy::from_config(&config.polling);
    let mut last_status: Option<DocumentStatus> = None;
    let outcome = watch_document(backend, id, policy, &cancel, |doc| {
        if last_status != Some(doc.status) {
            println!("   status: {}", doc.status);
            last_status = Some(doc.status);
        }
    })
    .await?;

    match &outcome {
        WatchOutcome::Indexed(doc) => {
            println!("✅ {} ({} chunks)", outcome.describe().unwrap_or_default(), doc.chunks_count);
        }
        WatchOutcome::Failed { .. } => {
            println!("❌ {}", outcome.describe().unwrap_or_default());
        }
        WatchOutcome::StillIndexing(_) => {
            println!("⏳ {}", outcome.describe().unwrap_or_default());
        }
        WatchOutcome::Cancelled => {}
    }
    Ok(())
}

/// Delete a document after confirmation
pub async fn rm_command(backend: &dyn KnowledgeBase, id: i64, yes: bool) -> Result<()> {
    if !yes {
        let answer = prompt(&format!(
            "Delete document {} and its indexed chunks? [y/N] ",
            id
        ))?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    backend.delete_document(id).await?;
    println!("🗑  Document {} removed from the knowledge base.", id);
    Ok(())
}

/// One-shot question against the knowledge base
pub async fn ask_command(
    backend: &dyn KnowledgeBase,
    question: String,
    top_k: Option<u32>,
    docs: Option<Vec<i64>>,
    explain: bool,
) -> Result<()> {
    let form = AskForm {
        question,
        top_k,
        search_all: docs.is_none(),
        selected_docs: docs.unwrap_or_default(),
        explain,
    };

    let response = submit(&form, backend).await?;

    println!("🎒 Answer");
    for line in textwrap::wrap(&response.answer, 78) {
        println!("   {}", line);
    }

    if !response.sources.is_empty() {
        println!("\n   Sources");
        for source in &response.sources {
            println!(
                "   [{}] {} · chunk {} · score {:.2}",
                source.citation,
                source.doc_title.as_deref().unwrap_or("Untitled"),
                source.chunk_index,
                source.score
            );
            if let Some(text) = &source.text {
                for line in textwrap::wrap(text, 72) {
                    println!("       {}", line);
                }
            }
        }
    }

    if let Some(trace) = &response.trace {
        println!(
            "\n   Answer Trace · total {} ms · hits {} · top_k {}",
            trace.total_ms, trace.hits, trace.top_k
        );
        let max_ms = max_step_ms(trace);
        for step in &trace.steps {
            println!(
                "   {:<16} {} {:>6} ms  {}",
                step.name,
                ascii_bar(step.ms, max_ms, 24),
                step.ms,
                step.detail.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

/// Inspect a server-side indexing job
pub async fn jobs_command(backend: &dyn KnowledgeBase, job_id: &str) -> Result<()> {
    let job = backend.fetch_job(job_id).await?;
    println!("Job {} · document {}", job.id, job.document);
    println!("   Status:   {}", job.status);
    println!(
        "   Started:  {}",
        job.started_at
            .as_deref()
            .map(short_timestamp)
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "   Finished: {}",
        job.finished_at
            .as_deref()
            .map(short_timestamp)
            .unwrap_or_else(|| "-".to_string())
    );
    if let Some(message) = &job.error_message {
        println!("   Error:    {}", message);
    }
    Ok(())
}

fn print_document(doc: &Document) {
    println!("📄 {} (#{})", doc.title, doc.id);
    println!("   Status:       {}", doc.status);
    println!("   Chunks:       {}", doc.chunks_count);
    println!(
        "   Uploaded:     {}",
        doc.created_at
            .as_deref()
            .map(short_timestamp)
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "   Last indexed: {}",
        doc.last_indexed_at
            .as_deref()
            .map(short_timestamp)
            .unwrap_or_else(|| "-".to_string())
    );
    println!("   File:         {}", doc.file_label());
    if let Some(message) = &doc.error_message {
        println!("   Error:        {}", message);
    }
}

fn truncated(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut buffer = String::new();
    io::stdin().read_line(&mut buffer)?;
    Ok(buffer.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_keeps_short_titles() {
        assert_eq!(truncated("Q1 Report", 34), "Q1 Report");
    }

    #[test]
    fn test_truncated_ellipsizes_long_titles() {
        let long = "An extremely long document title that will not fit";
        let cut = truncated(long, 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with('…'));
    }
}
