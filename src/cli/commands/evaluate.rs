//! Implementation of the `glassscore evaluate` command.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::judges::RotatingJudge;
use crate::adapters::memory::InMemorySessionStore;
use crate::adapters::scorers::LogisticScorer;
use crate::adapters::search::TavilySearch;
use crate::application::EvaluationService;
use crate::cli::output::write_json_line;
use crate::domain::models::{ApplicantProfile, Config, EventType, LoanApplication, Snippet};

const USER_UPLOAD_SOURCE: &str = "user_upload";

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Case file (YAML) with profile, application and snippets
    #[arg(long)]
    pub case: PathBuf,

    /// Invalidate an evidence item after the run, as ID=REASON (repeatable)
    #[arg(long, value_name = "ID=REASON", value_parser = parse_invalidation)]
    pub invalidate: Vec<(u64, String)>,
}

fn parse_invalidation(raw: &str) -> Result<(u64, String), String> {
    let (id, reason) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=REASON, got '{raw}'"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|e| format!("invalid evidence id '{id}': {e}"))?;
    Ok((id, reason.trim().to_string()))
}

/// Everything a single evaluation needs.
#[derive(Debug, Default, Deserialize)]
pub struct CaseFile {
    #[serde(default)]
    pub profile: Option<ApplicantProfile>,
    #[serde(default)]
    pub application: Option<LoanApplication>,
    #[serde(default)]
    pub snippets: Vec<CaseSnippet>,
}

/// Inline text or a path relative to the case file.
#[derive(Debug, Deserialize)]
pub struct CaseSnippet {
    pub key: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    USER_UPLOAD_SOURCE.to_string()
}

impl CaseFile {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read case file {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("Failed to parse case file {}", path.display()))
    }

    /// Reads file-backed snippets; `base` is the case file's directory.
    pub async fn snippets(&self, base: &Path) -> Result<Vec<Snippet>> {
        let mut snippets = Vec::with_capacity(self.snippets.len());
        for entry in &self.snippets {
            let text = match (&entry.text, &entry.path) {
                (Some(text), _) => text.clone(),
                (None, Some(path)) => {
                    let full = base.join(path);
                    tokio::fs::read_to_string(&full)
                        .await
                        .with_context(|| format!("Failed to read snippet {}", full.display()))?
                }
                (None, None) => bail!("snippet '{}' has neither text nor path", entry.key),
            };
            snippets.push(Snippet::new(&entry.key, text, &entry.source));
        }
        Ok(snippets)
    }
}

/// Wires the configured provider adapters around an in-memory store.
pub fn build_service(config: &Config) -> Result<EvaluationService> {
    let judge = RotatingJudge::new(config.judge.clone()).context("Failed to build language judge")?;
    let search = TavilySearch::new(&config.search).context("Failed to build web search")?;
    info!(judge_pool = judge.pool_size(), "providers configured");

    Ok(EvaluationService::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(judge),
        Arc::new(search),
        Arc::new(LogisticScorer::new(config.scorer.clone())),
        config.evaluation.clone(),
    ))
}

/// Runs one case and writes every stream record as a JSON line.
///
/// Invalidations are applied after the completion marker; each prints the
/// updated ledger entry followed by whatever its re-evaluation published.
pub async fn run_case<W: Write>(
    service: &EvaluationService,
    profile: Option<ApplicantProfile>,
    application: Option<LoanApplication>,
    snippets: Vec<Snippet>,
    invalidations: &[(u64, String)],
    writer: &mut W,
) -> Result<()> {
    let session = service.create_session(profile, application).await?;
    for snippet in snippets {
        service.attach_snippet(session.id, snippet).await?;
    }

    let mut events = service.subscribe(session.id).await?;
    let run = service.start_evaluation(session.id).await?;
    while let Some(record) = events.recv().await {
        write_json_line(writer, &record)?;
        if record.event_type == EventType::EvaluationComplete {
            break;
        }
    }
    let summary = run.wait().await?;
    info!(
        session_id = %session.id,
        jobs = summary.jobs,
        published = summary.published,
        failed_jobs = summary.failed_jobs,
        "evaluation finished"
    );

    for (evidence_id, reason) in invalidations {
        let invalidation = match service.invalidate(session.id, *evidence_id, reason).await {
            Ok(invalidation) => invalidation,
            Err(err) if err.is_not_found() => {
                warn!(evidence_id, "no such evidence, skipping invalidation");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        write_json_line(writer, &invalidation.evidence)?;

        if let Some(handle) = invalidation.reevaluation {
            let outcome = handle.await.context("Re-evaluation task failed")?;
            debug!(evidence_id, ?outcome, "re-evaluation finished");
        }
        while let Ok(record) = events.try_recv() {
            write_json_line(writer, &record)?;
        }
    }
    Ok(())
}

pub async fn execute(args: EvaluateArgs, config: &Config) -> Result<()> {
    let case = CaseFile::load(&args.case).await?;
    let base = args.case.parent().unwrap_or_else(|| Path::new("."));
    let snippets = case.snippets(base).await?;
    let service = build_service(config)?;

    let mut stdout = std::io::stdout();
    run_case(
        &service,
        case.profile,
        case.application,
        snippets,
        &args.invalidate,
        &mut stdout,
    )
    .await
}
