//! selfedit - self-edit lifecycle CLI
//!
//! Generates self-edit candidates for a task, trains each one with the
//! configured training command, scores the result against a validation set
//! and records the decision.
//!
//! ## Commands
//!
//! - `generate`: Propose and persist candidates for a task
//! - `train`: Run sandboxed training for one candidate
//! - `evaluate`: Score a trained candidate and record the decision
//! - `run`: All of the above for every new candidate
//! - `list` / `show`: Inspect persisted candidates
//! - `ingest` / `query`: Maintain and use the retrieval index

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

use selfedit_core::{
    cancellation, render_pipeline_summary_md, write_pipeline_report, CancelSignal,
    CandidateGenerator, CandidateId, CandidateStatus, CandidateSummary, CommandTrainingProcess,
    DefaultPrompts, Embedder, Evaluator, GenerationService, Ingestor, LifecycleManager,
    PromptBuilder, QueryAgent, ResponseService, SandboxTrainer, SelfEditConfig, SelfEditPipeline,
    TextExtractor,
};
use selfedit_llm::{LlmConfig, OpenAiClient};
use selfedit_state::{
    CandidateStore, EmbeddingStore, FsCandidateStore, FsEmbeddingStore, SurrealCandidateStore,
};

#[derive(Parser)]
#[command(name = "selfedit")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Self-edit candidate lifecycle", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "SELFEDIT_CONFIG", default_value = "selfedit.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate self-edit candidates for a task
    Generate {
        /// Task description
        task: String,

        /// Number of candidates (default: generator.candidates_per_task)
        #[arg(short, long)]
        n: Option<usize>,
    },

    /// Train one generated candidate
    Train {
        /// Candidate ID
        candidate: String,

        /// Training deadline in seconds, 0 for none (default: trainer.timeout_secs)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Evaluate a trained candidate and record the decision
    Evaluate {
        /// Candidate ID
        candidate: String,

        /// Validation set (JSONL, default: evaluator.validation_path)
        #[arg(long)]
        validation: Option<PathBuf>,
    },

    /// Generate, train, evaluate and decide in one go
    Run {
        /// Task description
        task: String,

        /// Number of candidates (default: generator.candidates_per_task)
        #[arg(short, long)]
        n: Option<usize>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List candidates
    List {
        /// Only candidates in this status
        #[arg(long, value_parser = parse_status)]
        status: Option<CandidateStatus>,
    },

    /// Show one candidate as JSON
    Show {
        /// Candidate ID
        candidate: String,
    },

    /// Add extracted document text to the retrieval index
    Ingest {
        /// UTF-8 text files, one per document
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Tags stored with every chunk
        #[arg(short, long)]
        tag: Vec<String>,

        /// Document index of the first path
        #[arg(long, default_value = "1")]
        start_index: usize,
    },

    /// Answer a question from the retrieval index
    Query {
        /// Question
        question: String,

        /// Number of context snippets (default: retrieval.max_context)
        #[arg(short = 'k', long)]
        max_context: Option<usize>,
    },
}

fn parse_status(s: &str) -> std::result::Result<CandidateStatus, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
        format!("unknown status '{s}' (generated, evaluating, accepted, rejected, human_review)")
    })
}

/// Configuration plus the candidate store it selects.
struct Workspace {
    config: SelfEditConfig,
    llm: LlmConfig,
    candidates: Arc<dyn CandidateStore>,
}

impl Workspace {
    async fn open(config_path: &Path) -> Result<Self> {
        let config = SelfEditConfig::load(config_path)
            .with_context(|| format!("Failed to load config {:?}", config_path))?;
        let llm = LlmConfig::load(config_path)
            .with_context(|| format!("Failed to load [llm] from {:?}", config_path))?;
        Self::with_config(config, llm).await
    }

    async fn with_config(config: SelfEditConfig, llm: LlmConfig) -> Result<Self> {
        let candidates: Arc<dyn CandidateStore> = match &config.store.surreal_url {
            Some(url) => Arc::new(
                SurrealCandidateStore::connect(url)
                    .await
                    .with_context(|| format!("Failed to connect to {url}"))?,
            ),
            None => Arc::new(
                FsCandidateStore::new(&config.store.candidates_dir, &config.store.artifacts_dir)
                    .context("Failed to open candidate directories")?,
            ),
        };
        Ok(Self {
            config,
            llm,
            candidates,
        })
    }

    fn client(&self) -> Result<Arc<OpenAiClient>> {
        let client = OpenAiClient::from_env(self.llm.clone())
            .context("Failed to create LLM client")?;
        Ok(Arc::new(client))
    }

    fn prompts(&self) -> Arc<dyn PromptBuilder> {
        Arc::new(DefaultPrompts)
    }

    fn lifecycle(&self) -> LifecycleManager {
        LifecycleManager::new(self.candidates.clone())
    }

    fn generator(&self, service: Arc<dyn GenerationService>) -> CandidateGenerator {
        CandidateGenerator::new(service, self.prompts(), self.candidates.clone())
    }

    fn trainer(&self) -> Result<SandboxTrainer> {
        let process = CommandTrainingProcess::from_config(&self.config.trainer)
            .context("Invalid trainer command")?;
        Ok(SandboxTrainer::from_config(
            self.candidates.clone(),
            Arc::new(process),
            &self.config.store.artifacts_dir,
            &self.config.trainer,
        ))
    }

    fn evaluator(&self, responder: Arc<dyn ResponseService>) -> Evaluator {
        Evaluator::from_config(responder, self.prompts(), &self.config.evaluator)
    }

    fn embeddings(&self) -> Result<Arc<dyn EmbeddingStore>> {
        let store = FsEmbeddingStore::new(&self.config.store.embeddings_dir)
            .context("Failed to open embedding store")?;
        Ok(Arc::new(store))
    }
}

/// Reads documents that are already plain text.
struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, path: &Path) -> selfedit_core::Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

/// Cancellation fired by Ctrl-C.
fn interrupt_signal() -> CancelSignal {
    let (handle, signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping training");
            handle.cancel();
        }
    });
    signal
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    selfedit_core::init_tracing(cli.json, level);

    let ws = Workspace::open(&cli.config).await?;

    match cli.command {
        Commands::Generate { task, n } => {
            let client = ws.client()?;
            cmd_generate(&ws, client, &task, n).await
        }
        Commands::Train {
            candidate,
            timeout_secs,
        } => cmd_train(&ws, &candidate, timeout_secs, interrupt_signal()).await,
        Commands::Evaluate {
            candidate,
            validation,
        } => {
            let client = ws.client()?;
            cmd_evaluate(&ws, client, &candidate, validation).await
        }
        Commands::Run { task, n, report } => {
            let client = ws.client()?;
            cmd_run(
                &ws,
                client.clone(),
                client,
                &task,
                n,
                report.as_deref(),
                interrupt_signal(),
            )
            .await
        }
        Commands::List { status } => cmd_list(&ws, status).await,
        Commands::Show { candidate } => cmd_show(&ws, &candidate).await,
        Commands::Ingest {
            paths,
            tag,
            start_index,
        } => {
            let client = ws.client()?;
            cmd_ingest(&ws, client, &PlainTextExtractor, &paths, &tag, start_index).await
        }
        Commands::Query {
            question,
            max_context,
        } => {
            let client = ws.client()?;
            cmd_query(&ws, client.clone(), client, &question, max_context).await
        }
    }
}

/// Generate and persist candidates
async fn cmd_generate(
    ws: &Workspace,
    service: Arc<dyn GenerationService>,
    task: &str,
    n: Option<usize>,
) -> Result<()> {
    let n = n.unwrap_or(ws.config.generator.candidates_per_task);
    let created = ws
        .generator(service)
        .generate_candidates(task, n)
        .await
        .context("Candidate generation failed")?;

    info!(count = created.len(), "candidates generated");
    for candidate in &created {
        println!("{}", CandidateSummary::from(candidate));
    }
    Ok(())
}

/// Train one candidate
async fn cmd_train(
    ws: &Workspace,
    candidate: &str,
    timeout_secs: Option<u64>,
    cancel: CancelSignal,
) -> Result<()> {
    let id = CandidateId::from(candidate);
    let mut trainer = ws.trainer()?;
    if let Some(secs) = timeout_secs {
        trainer = trainer.with_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }

    let artifact = trainer
        .run_sandbox_train_with_cancel(&id, cancel)
        .await
        .with_context(|| format!("Training failed for {id}"))?;

    println!("Trained {}", artifact.candidate_id);
    println!(
        "  data:    {:?} ({} examples, sha256 {})",
        artifact.train_file,
        artifact.examples,
        artifact.data_digest.short()
    );
    println!("  adapter: {:?}", artifact.output_dir);
    println!("  took:    {} ms", artifact.duration_ms);
    Ok(())
}

/// Evaluate a trained candidate and attach the result
async fn cmd_evaluate(
    ws: &Workspace,
    responder: Arc<dyn ResponseService>,
    candidate: &str,
    validation: Option<PathBuf>,
) -> Result<()> {
    let id = CandidateId::from(candidate);
    let lifecycle = ws.lifecycle();
    let current = lifecycle
        .get_candidate(&id)
        .await
        .with_context(|| format!("Candidate not found: {id}"))?;
    if current.status != CandidateStatus::Evaluating {
        bail!("{id} is {} and cannot be evaluated", current.status);
    }

    let mut evaluator = ws.evaluator(responder);
    if let Some(path) = validation {
        evaluator = evaluator.with_validation_path(path);
    }
    let artifact = ws.trainer()?.output_dir(&id);
    let eval = evaluator
        .evaluate(&artifact, &id)
        .await
        .with_context(|| format!("Evaluation failed for {id}"))?;
    let decided = lifecycle.attach_evaluation(&id, eval).await?;

    println!(
        "{} avg={:.3} -> {}",
        decided.id,
        decided.eval.as_ref().map(|e| e.avg).unwrap_or_default(),
        decided.status
    );
    Ok(())
}

/// Full pipeline for one task
async fn cmd_run(
    ws: &Workspace,
    service: Arc<dyn GenerationService>,
    responder: Arc<dyn ResponseService>,
    task: &str,
    n: Option<usize>,
    report_path: Option<&Path>,
    cancel: CancelSignal,
) -> Result<()> {
    let n = n.unwrap_or(ws.config.generator.candidates_per_task);
    let pipeline = SelfEditPipeline::new(
        ws.generator(service),
        ws.trainer()?,
        ws.evaluator(responder),
        ws.lifecycle(),
    );

    let report = pipeline.run_with_cancel(task, n, cancel).await?;
    if let Some(path) = report_path {
        write_pipeline_report(path, &report)?;
        info!(path = %path.display(), "run report written");
    }
    print!("{}", render_pipeline_summary_md(&report));
    Ok(())
}

/// List candidates, oldest first
async fn cmd_list(ws: &Workspace, status: Option<CandidateStatus>) -> Result<()> {
    let summaries = ws.lifecycle().summaries().await?;
    let shown: Vec<_> = summaries
        .iter()
        .filter(|s| status.map_or(true, |st| s.status == st))
        .collect();

    if shown.is_empty() {
        println!("No candidates found");
        return Ok(());
    }
    for summary in shown {
        println!("{summary}");
    }
    Ok(())
}

/// Print one candidate record
async fn cmd_show(ws: &Workspace, candidate: &str) -> Result<()> {
    let id = CandidateId::from(candidate);
    let record = ws
        .lifecycle()
        .get_candidate(&id)
        .await
        .with_context(|| format!("Candidate not found: {id}"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Ingest documents into the retrieval index
async fn cmd_ingest(
    ws: &Workspace,
    embedder: Arc<dyn Embedder>,
    extractor: &dyn TextExtractor,
    paths: &[PathBuf],
    tags: &[String],
    start_index: usize,
) -> Result<()> {
    let ingestor = Ingestor::from_config(embedder, ws.embeddings()?, &ws.config.retrieval);
    for (offset, path) in paths.iter().enumerate() {
        let report = ingestor
            .ingest_image(extractor, path, start_index + offset, tags)
            .await
            .with_context(|| format!("Failed to ingest {:?}", path))?;
        println!(
            "{} -> {} chunks ({})",
            report.source,
            report.chunk_ids.len(),
            report.chunk_ids.join(", ")
        );
    }
    Ok(())
}

/// Answer a question from the index
async fn cmd_query(
    ws: &Workspace,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn GenerationService>,
    question: &str,
    max_context: Option<usize>,
) -> Result<()> {
    let k = max_context.unwrap_or(ws.config.retrieval.max_context);
    let agent = QueryAgent::new(embedder, ws.embeddings()?, generator, ws.prompts());
    let answer = agent.answer(question, k).await?;

    println!("{}", answer.answer);
    if let Some(self_edit) = &answer.self_edit {
        println!();
        println!("Suggested self-edit:");
        println!("{}", serde_json::to_string_pretty(self_edit)?);
    }
    for snippet in &answer.contexts {
        info!(source = %snippet.meta.source, score = snippet.score, "context");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::Mutex;

    struct CannedGeneration(&'static str);

    #[async_trait]
    impl GenerationService for CannedGeneration {
        async fn complete(&self, _system: &str, _user: &str) -> selfedit_core::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct EchoResponder(Mutex<usize>);

    #[async_trait]
    impl ResponseService for EchoResponder {
        async fn respond(&self, _artifact: &Path, prompt: &str) -> selfedit_core::Result<String> {
            *self.0.lock().unwrap() += 1;
            Ok(prompt.to_string())
        }
    }

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> selfedit_core::Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    async fn workspace(root: &Path) -> Workspace {
        let mut config = SelfEditConfig::default();
        config.store.candidates_dir = root.join("candidates");
        config.store.artifacts_dir = root.join("artifacts");
        config.store.embeddings_dir = root.join("store");
        config.evaluator.validation_path = root.join("validation.jsonl");
        config.trainer.command = vec!["true".to_string()];
        Workspace::with_config(config, LlmConfig::default())
            .await
            .unwrap()
    }

    const RESPONSE: &str =
        r#"{"plan": "p", "examples": [{"input": "q", "output": "a"}], "metadata": {"confidence": 0.9}}"#;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "selfedit", "list", "--status", "human_review", "--json", "-c", "x.toml",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        match cli.command {
            Commands::List { status } => assert_eq!(status, Some(CandidateStatus::HumanReview)),
            _ => panic!("expected list"),
        }
        assert!(Cli::try_parse_from(["selfedit", "list", "--status", "done"]).is_err());
    }

    #[tokio::test]
    async fn generate_train_evaluate_flow() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path()).await;
        std::fs::write(
            dir.path().join("validation.jsonl"),
            "{\"prompt\": \"What is SEAL?\", \"completion\": \"What is SEAL?\"}\n",
        )
        .unwrap();

        cmd_generate(&ws, Arc::new(CannedGeneration(RESPONSE)), "task", Some(1))
            .await
            .unwrap();
        let candidates = ws.candidates.list_candidates().await.unwrap();
        assert_eq!(candidates.len(), 1);
        let id = candidates[0].id.to_string();

        cmd_train(&ws, &id, Some(30), CancelSignal::never())
            .await
            .unwrap();

        let responder = Arc::new(EchoResponder(Mutex::new(0)));
        cmd_evaluate(&ws, responder.clone(), &id, None).await.unwrap();
        assert_eq!(*responder.0.lock().unwrap(), 1);

        let stored = ws
            .candidates
            .get_candidate(&CandidateId::from(id.as_str()))
            .await
            .unwrap();
        assert!(stored.eval.is_some());
        assert!(dir
            .path()
            .join("artifacts")
            .join(format!("{id}_eval.json"))
            .is_file());

        cmd_list(&ws, Some(stored.status)).await.unwrap();
        cmd_show(&ws, &id).await.unwrap();
    }

    #[tokio::test]
    async fn evaluate_requires_training_first() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path()).await;
        cmd_generate(&ws, Arc::new(CannedGeneration(RESPONSE)), "task", Some(1))
            .await
            .unwrap();
        let id = ws.candidates.list_candidates().await.unwrap()[0]
            .id
            .to_string();

        let responder = Arc::new(EchoResponder(Mutex::new(0)));
        assert!(cmd_evaluate(&ws, responder.clone(), &id, None).await.is_err());
        assert_eq!(*responder.0.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path()).await;
        std::fs::write(
            dir.path().join("validation.jsonl"),
            "{\"prompt\": \"q\", \"completion\": \"unrelated words\"}\n",
        )
        .unwrap();
        let report_path = dir.path().join("reports").join("run.json");

        cmd_run(
            &ws,
            Arc::new(CannedGeneration(RESPONSE)),
            Arc::new(EchoResponder(Mutex::new(0))),
            "task",
            Some(2),
            Some(&report_path),
            CancelSignal::never(),
        )
        .await
        .unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
        assert_eq!(report["outcomes"].as_array().unwrap().len(), 2);
        assert_eq!(report["outcomes"][0]["status"], "rejected");
    }

    #[tokio::test]
    async fn show_unknown_candidate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path()).await;
        assert!(cmd_show(&ws, "cand-missing").await.is_err());
        cmd_list(&ws, None).await.unwrap();
    }

    #[tokio::test]
    async fn ingest_then_query() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path()).await;
        let doc = dir.path().join("page1.txt");
        std::fs::write(&doc, "SEAL generates its own finetuning data").unwrap();

        cmd_ingest(
            &ws,
            Arc::new(LengthEmbedder),
            &PlainTextExtractor,
            &[doc],
            &["SEAL".to_string()],
            1,
        )
        .await
        .unwrap();
        assert!(dir.path().join("store").join("img1_chunk0.json").is_file());
        assert!(dir.path().join("store").join("img1_raw.txt").is_file());

        cmd_query(
            &ws,
            Arc::new(LengthEmbedder),
            Arc::new(CannedGeneration("It adapts itself.")),
            "What is SEAL?",
            Some(3),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn surreal_backend_is_selected_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SelfEditConfig::default();
        config.store.surreal_url = Some("mem://".to_string());
        config.store.artifacts_dir = dir.path().join("artifacts");
        let ws = Workspace::with_config(config, LlmConfig::default())
            .await
            .unwrap();

        cmd_generate(&ws, Arc::new(CannedGeneration(RESPONSE)), "task", Some(2))
            .await
            .unwrap();
        assert_eq!(ws.candidates.list_candidates().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SelfEditConfig::load(dir.path().join("selfedit.toml")).unwrap();
        assert_eq!(config, SelfEditConfig::default());
        let llm = LlmConfig::load(dir.path().join("selfedit.toml")).unwrap();
        assert_eq!(llm, LlmConfig::default());
    }
}
