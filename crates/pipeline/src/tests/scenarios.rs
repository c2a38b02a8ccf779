use super::stubs::{
    CountingEmbedder, ExhaustedEmbedder, RaggedEmbedder, ScriptedLlm, UnavailableEmbedder,
};
use crate::{ErrorKind, OutputTarget, Pipeline, PipelineConfig, PipelineResult};
use docsmith_core::ProviderFailure;
use docsmith_knowledge::embeddings::providers::TrigramProvider;
use docsmith_knowledge::{ContextMode, Phase, ProgressEvent, ProgressReporter};
use docsmith_prompt::PromptLibrary;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const STAGE_NAMES: [&str; 4] = ["generator", "grammar_editor", "technical_editor", "final_polish"];

fn source_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    dir
}

fn small_project() -> TempDir {
    source_tree(&[
        (
            "app/collector.py",
            "import os\n\ndef collect(root):\n    return sorted(os.listdir(root))\n",
        ),
        (
            "app/main.py",
            "from app.collector import collect\n\nif __name__ == '__main__':\n    print(collect('.'))\n",
        ),
    ])
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.chunking.target_length = 100;
    config.chunking.overlap_length = 20;
    config
}

fn trigram() -> Arc<TrigramProvider> {
    Arc::new(TrigramProvider::new(64))
}

async fn run(pipeline: &Pipeline, root: &Path, config: &PipelineConfig) -> PipelineResult {
    pipeline.generate(root, &OutputTarget::Memory, config).await
}

#[tokio::test]
async fn single_small_file_generates_document() {
    let content: String = "print('hi')\n".chars().cycle().take(50).collect();
    let dir = source_tree(&[("hello.py", content.as_str())]);
    let llm = Arc::new(ScriptedLlm::echo());
    let pipeline = Pipeline::new(llm.clone(), trigram());

    let result = run(&pipeline, dir.path(), &config()).await;

    assert!(result.success, "{:?}", result.error);
    assert!(result.error.is_none());
    assert!(!result.content.as_deref().unwrap_or("").is_empty());
    assert_eq!(result.stats.files_collected, 1);
    assert_eq!(result.stats.chunks_indexed, 1);
    assert_eq!(llm.calls(), 4);

    let names: Vec<&str> = result.stage_trace.iter().map(|s| s.stage_name.as_str()).collect();
    assert_eq!(names, STAGE_NAMES);
    assert!(result.stage_trace.iter().all(|s| s.succeeded));
    assert!(result
        .stage_trace
        .iter()
        .all(|s| s.grounding_chunks == vec!["hello.py#0".to_string()]));
    assert_eq!(result.last_draft(), result.content.as_deref());
}

#[tokio::test]
async fn empty_directory_fails_at_collection() {
    let dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::echo());
    let pipeline = Pipeline::new(llm.clone(), trigram());

    let result = run(&pipeline, dir.path(), &config()).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.stage, "collection");
    assert_eq!(error.kind, ErrorKind::NoEligibleFiles);
    assert!(!error.message.is_empty());
    assert!(result.stage_trace.is_empty());
    assert!(result.content.is_none());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn unavailable_embeddings_stop_before_generation() {
    let dir = small_project();
    let llm = Arc::new(ScriptedLlm::echo());
    let embedder = Arc::new(UnavailableEmbedder::default());
    let pipeline = Pipeline::new(llm.clone(), embedder.clone());

    let result = run(&pipeline, dir.path(), &config()).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.stage, "context");
    assert_eq!(error.kind, ErrorKind::EmbeddingUnavailable);
    assert!(embedder.calls.load(Ordering::SeqCst) > 0);
    assert_eq!(llm.calls(), 0);
    assert!(result.stage_trace.is_empty());
}

#[tokio::test]
async fn retrieval_failure_after_indexing_stops_at_context() {
    let content: String = "print('hi')\n".chars().cycle().take(50).collect();
    let dir = source_tree(&[("hello.py", content.as_str())]);
    let llm = Arc::new(ScriptedLlm::echo());
    // One chunk plus the first stage's query.
    let pipeline = Pipeline::new(llm.clone(), Arc::new(ExhaustedEmbedder::after(2)));

    let result = run(&pipeline, dir.path(), &config()).await;

    assert!(!result.success);
    assert!(result.content.is_none());
    let error = result.error.unwrap();
    assert_eq!(error.stage, "context");
    assert_eq!(error.kind, ErrorKind::EmbeddingUnavailable);
    assert_eq!(result.stats.chunks_indexed, 1);
    assert_eq!(result.stage_trace.len(), 1);
    assert!(result.stage_trace[0].succeeded);
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn inconsistent_embeddings_are_a_retrieval_error() {
    let dir = small_project();
    let llm = Arc::new(ScriptedLlm::echo());
    let pipeline = Pipeline::new(llm.clone(), Arc::new(RaggedEmbedder::default()));

    let result = run(&pipeline, dir.path(), &config()).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.stage, "context");
    assert_eq!(error.kind, ErrorKind::Retrieval);
    assert!(error.message.contains("dimension mismatch"));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn failing_third_stage_keeps_partial_trace() {
    let dir = small_project();
    let llm = Arc::new(ScriptedLlm::echo().failing_on(3, ProviderFailure::Unavailable));
    let pipeline = Pipeline::new(llm.clone(), trigram());

    let result = run(&pipeline, dir.path(), &config()).await;

    assert!(!result.success);
    assert!(result.content.is_none());
    let error = result.error.as_ref().unwrap();
    assert_eq!(error.stage, "technical_editor");
    assert_eq!(error.kind, ErrorKind::Generation);

    assert_eq!(result.stage_trace.len(), 3);
    assert!(result.stage_trace[0].succeeded);
    assert!(result.stage_trace[1].succeeded);
    assert!(!result.stage_trace[2].succeeded);
    assert!(result.stage_trace[2].error.is_some());
    assert_eq!(result.last_draft(), Some(result.stage_trace[1].draft_text.as_str()));
    // Fail-fast: the final stage never runs.
    assert_eq!(llm.calls(), 3);
}

#[tokio::test]
async fn stage_drafts_feed_the_next_stage() {
    let dir = small_project();
    let llm = Arc::new(ScriptedLlm::replies([
        "First draft about collect()",
        "Second draft about collect()",
        "Reviewed draft\n[FLAG] listdir order is platform dependent",
        "Final article",
    ]));
    let pipeline = Pipeline::new(llm.clone(), trigram());

    let result = run(&pipeline, dir.path(), &config()).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.content.as_deref(), Some("Final article"));

    let requests = llm.requests();
    assert!(requests[1].prompt.contains("First draft about collect()"));
    assert!(requests[2].prompt.contains("Second draft about collect()"));
    assert!(requests[3].prompt.contains("Reviewed draft"));
    assert!(!requests[3].prompt.contains("[FLAG]"));

    assert_eq!(
        result.stage_trace[2].flags,
        vec!["listdir order is platform dependent"]
    );
    let temperatures: Vec<Option<f32>> = requests.iter().map(|r| r.temperature).collect();
    assert_eq!(temperatures, vec![Some(0.7), Some(0.3), Some(0.2), Some(0.4)]);
}

#[tokio::test]
async fn repeated_runs_are_structurally_identical() {
    let dir = small_project();
    let pipeline = Pipeline::new(Arc::new(ScriptedLlm::echo()), trigram());

    let first = run(&pipeline, dir.path(), &config()).await;
    let second = run(&pipeline, dir.path(), &config()).await;

    assert!(first.success && second.success);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.stats.chunks_indexed, second.stats.chunks_indexed);

    let shape = |r: &PipelineResult| -> Vec<(String, Vec<String>)> {
        r.stage_trace
            .iter()
            .map(|s| (s.stage_name.clone(), s.grounding_chunks.clone()))
            .collect()
    };
    assert_eq!(shape(&first), shape(&second));
}

#[tokio::test]
async fn context_once_embeds_a_single_query() {
    let dir = source_tree(&[("tiny.py", "x = 1\n")]);

    let per_stage = Arc::new(CountingEmbedder::new());
    let pipeline = Pipeline::new(Arc::new(ScriptedLlm::echo()), per_stage.clone());
    assert!(run(&pipeline, dir.path(), &config()).await.success);
    // One chunk plus one query per stage.
    assert_eq!(per_stage.embedded(), 5);

    let once = Arc::new(CountingEmbedder::new());
    let pipeline = Pipeline::new(Arc::new(ScriptedLlm::echo()), once.clone());
    let mut config = config();
    config.retrieval.context_mode = ContextMode::Once;
    assert!(run(&pipeline, dir.path(), &config).await.success);
    assert_eq!(once.embedded(), 2);
}

#[tokio::test]
async fn cancelled_token_stops_before_first_stage() {
    let dir = small_project();
    let llm = Arc::new(ScriptedLlm::echo());
    let token = CancellationToken::new();
    token.cancel();
    let pipeline = Pipeline::new(llm.clone(), trigram()).with_cancellation(token);

    let result = run(&pipeline, dir.path(), &config()).await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Cancelled);
    assert_eq!(error.stage, "generator");
    assert!(result.stage_trace.is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn cancellation_mid_run_lets_current_stage_finish() {
    let dir = small_project();
    let llm = Arc::new(ScriptedLlm::echo());
    let token = CancellationToken::new();

    let trigger = token.clone();
    let progress = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
        if event.phase == Phase::Stage {
            trigger.cancel();
        }
    }));
    let pipeline = Pipeline::new(llm.clone(), trigram())
        .with_cancellation(token)
        .with_progress(progress);

    let result = run(&pipeline, dir.path(), &config()).await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Cancelled);
    assert_eq!(error.stage, "grammar_editor");
    assert_eq!(result.stage_trace.len(), 1);
    assert!(result.stage_trace[0].succeeded);
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn stage_timeout_is_a_generation_failure() {
    let dir = small_project();
    let llm = Arc::new(ScriptedLlm::echo().with_delay(std::time::Duration::from_secs(3)));
    let pipeline = Pipeline::new(llm, trigram());
    let mut config = config();
    config.generation.timeout_secs = 1;

    let result = run(&pipeline, dir.path(), &config).await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Generation);
    assert_eq!(error.stage, "generator");
    assert!(error.message.contains("timeout"));
    assert_eq!(result.stage_trace.len(), 1);
}

#[tokio::test]
async fn file_output_is_written() {
    let dir = small_project();
    let out_dir = TempDir::new().unwrap();
    let out_path = out_dir.path().join("docs").join("generated_article.md");
    let pipeline = Pipeline::new(Arc::new(ScriptedLlm::echo()), trigram());

    let result = pipeline
        .generate(dir.path(), &OutputTarget::File(out_path.clone()), &config())
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.output_path.as_deref(), Some(out_path.as_path()));
    assert_eq!(
        std::fs::read_to_string(&out_path).unwrap(),
        result.content.unwrap()
    );
}

#[tokio::test]
async fn output_failure_keeps_content_and_trace() {
    let dir = small_project();
    let out_dir = TempDir::new().unwrap();
    let blocker = out_dir.path().join("not_a_dir");
    std::fs::write(&blocker, "occupied").unwrap();
    let pipeline = Pipeline::new(Arc::new(ScriptedLlm::echo()), trigram());

    let result = pipeline
        .generate(
            dir.path(),
            &OutputTarget::File(blocker.join("article.md")),
            &config(),
        )
        .await;

    assert!(!result.success);
    let error = result.error.as_ref().unwrap();
    assert_eq!(error.stage, "output");
    assert_eq!(error.kind, ErrorKind::OutputWrite);
    assert!(result.content.is_some());
    assert_eq!(result.stage_trace.len(), 4);
    assert!(result.output_path.is_none());
}

#[tokio::test]
async fn invalid_config_fails_before_collection() {
    let dir = small_project();
    let llm = Arc::new(ScriptedLlm::echo());
    let pipeline = Pipeline::new(llm.clone(), trigram());
    let mut config = config();
    config.chunking.overlap_length = 100;

    let result = run(&pipeline, dir.path(), &config).await;

    let error = result.error.unwrap();
    assert_eq!(error.stage, "configuration");
    assert_eq!(error.kind, ErrorKind::Configuration);
    assert_eq!(result.stats.files_collected, 0);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn workspace_prompt_override_is_used() {
    let dir = small_project();
    let workspace = TempDir::new().unwrap();
    let prompts = workspace.path().join(".docsmith").join("prompts");
    std::fs::create_dir_all(&prompts).unwrap();
    std::fs::write(
        prompts.join("stage.generator.yml"),
        r#"id: stage.generator
title: House style draft
apiVersion: "1.0"
createdBy: tests
behavior:
  tone: casual
  style: short
  temperature: 0.9
template: "HOUSE STYLE for {{stageName}}\n{{sourceSummary}}"
output:
  format: markdown
"#,
    )
    .unwrap();

    let llm = Arc::new(ScriptedLlm::echo());
    let pipeline = Pipeline::new(llm.clone(), trigram())
        .with_prompts(PromptLibrary::with_workspace(workspace.path()));

    let result = run(&pipeline, dir.path(), &config()).await;

    assert!(result.success, "{:?}", result.error);
    let requests = llm.requests();
    assert!(requests[0].prompt.starts_with("HOUSE STYLE for generator"));
    assert!(requests[0].prompt.contains("app/collector.py"));
    assert_eq!(requests[0].temperature, Some(0.9));
    assert!(requests[0].system.is_none());
}

#[tokio::test]
async fn progress_reports_every_phase() {
    let dir = small_project();
    let phases: Arc<Mutex<Vec<Phase>>> = Arc::default();
    let sink = phases.clone();
    let progress = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
        sink.lock().unwrap().push(event.phase);
    }));
    let pipeline = Pipeline::new(Arc::new(ScriptedLlm::echo()), trigram()).with_progress(progress);

    assert!(run(&pipeline, dir.path(), &config()).await.success);

    let phases = phases.lock().unwrap();
    assert_eq!(phases.first(), Some(&Phase::Collect));
    assert_eq!(phases.last(), Some(&Phase::Write));
    for phase in [Phase::Chunk, Phase::Embed, Phase::Context, Phase::Stage] {
        assert!(phases.contains(&phase), "missing {:?}", phase);
    }
    assert_eq!(phases.iter().filter(|p| **p == Phase::Stage).count(), 4);
}
