// src/batch/pipeline.rs
// =============================================================================
// Runs one repository from identifier to final archive.
//
// Stages (strictly in order):
//   1. resolve   - ask the API for the default branch
//   2. fetch     - stream the zipball to <slug>-temp.zip, unpack to <slug>-temp/
//   3. normalize - write <slug>.zip without the wrapper folder
//
// This is the failure boundary for a repository: whatever goes wrong is
// logged here with the repo name and handed back as a RepoOutcome. Nothing
// propagates further, so one bad repo never takes down its siblings.
//
// Temporary artifacts are removed on every exit path, success or failure.
// =============================================================================

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::archive::{self, TempArtifacts};
use crate::error::PipelineError;
use crate::github::{self, ApiConfig};
use crate::repo::RepoId;

// Everything a repository task needs, shared read-only across a run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub client: Client,
    pub api: ApiConfig,
    pub out_dir: PathBuf,
}

// What happened to one repository
#[derive(Debug)]
pub struct RepoOutcome {
    pub repo: RepoId,
    pub elapsed: Duration,
    /// Path of the final archive, or the stage that failed
    pub result: Result<PathBuf, PipelineError>,
}

impl RepoOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

// JSON shape of a RepoOutcome
#[derive(Serialize)]
struct OutcomeRecord<'a> {
    repo: &'a RepoId,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<&'a PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    elapsed_ms: u64,
}

impl Serialize for RepoOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let (status, archive, stage, error) = match &self.result {
            Ok(path) => ("ok", Some(path), None, None),
            Err(e) => ("failed", None, Some(e.stage()), Some(e.to_string())),
        };

        OutcomeRecord {
            repo: &self.repo,
            status,
            archive,
            stage,
            error,
            elapsed_ms: u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
        .serialize(serializer)
    }
}

// Processes a single repository and never fails: errors end up in the outcome
pub async fn process_repo(ctx: &RunContext, repo: RepoId) -> RepoOutcome {
    let started = Instant::now();
    let temp = TempArtifacts::for_repo(&repo, &ctx.out_dir);

    // Leftovers from an interrupted run would otherwise end up in the archive
    temp.remove().await;

    let result = run_stages(ctx, &repo, &temp).await;
    temp.remove().await;

    match &result {
        Ok(path) => info!(%repo, archive = %path.display(), "repository archived"),
        Err(e) => error!(%repo, stage = e.stage(), error = %e, "repository failed"),
    }

    RepoOutcome {
        repo,
        elapsed: started.elapsed(),
        result,
    }
}

async fn run_stages(ctx: &RunContext, repo: &RepoId, temp: &TempArtifacts) -> Result<PathBuf, PipelineError> {
    let branch = github::resolve_default_branch(&ctx.client, &ctx.api, repo)
        .await
        .map_err(PipelineError::Resolve)?;
    info!(%repo, %branch, "resolved default branch");

    fetch(ctx, repo, &branch, temp)
        .await
        .map_err(PipelineError::Fetch)?;

    let final_path = repo.final_archive_path(&ctx.out_dir);
    let (dir, path) = (temp.dir_path.clone(), final_path.clone());
    let files = run_blocking(move || archive::normalize(&dir, &path))
        .await
        .map_err(PipelineError::Normalize)?;
    info!(%repo, files, "final archive written");

    Ok(final_path)
}

// Download, then extract. Extraction only starts once the file is complete.
async fn fetch(ctx: &RunContext, repo: &RepoId, branch: &str, temp: &TempArtifacts) -> Result<()> {
    let bytes = github::download_zipball(&ctx.client, &ctx.api, repo, branch, &temp.zip_path).await?;
    info!(%repo, bytes, "zipball downloaded");

    let (zip, dir) = (temp.zip_path.clone(), temp.dir_path.clone());
    run_blocking(move || archive::extract_zip(&zip, &dir)).await?;
    Ok(())
}

// zip and walkdir are blocking; keep them off the async worker threads
async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .context("Blocking archive task did not complete")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::zip_entries;
    use crate::batch::test_support::{context_for, mount_repo, zipball_bytes};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_success_produces_archive_and_cleans_up() {
        let server = MockServer::start().await;
        let repo = RepoId::parse("neherlab/covid19_scenarios").unwrap();
        mount_repo(
            &server,
            &repo,
            "master",
            zipball_bytes(&[
                ("neherlab-covid19_scenarios-abc/", None),
                ("neherlab-covid19_scenarios-abc/LICENSE", Some(b"MIT".as_slice())),
                ("neherlab-covid19_scenarios-abc/src/", None),
                ("neherlab-covid19_scenarios-abc/src/index.ts", Some(b"export {}".as_slice())),
            ]),
        )
        .await;

        let out = tempfile::tempdir().unwrap();
        let ctx = context_for(&server, out.path());

        let outcome = process_repo(&ctx, repo.clone()).await;

        let archive = outcome.result.unwrap();
        assert_eq!(archive, out.path().join("neherlab_covid19_scenarios.zip"));
        assert_eq!(
            zip_entries(&archive),
            vec!["LICENSE".to_string(), "src/".to_string(), "src/index.ts".to_string()]
        );
        assert!(!repo.temp_zip_path(out.path()).exists());
        assert!(!repo.temp_dir_path(out.path()).exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_still_cleans_up() {
        let server = MockServer::start().await;
        let repo = RepoId::parse("owner/broken").unwrap();
        mount_repo(&server, &repo, "main", b"this is not a zip file".to_vec()).await;

        let out = tempfile::tempdir().unwrap();
        let ctx = context_for(&server, out.path());

        let outcome = process_repo(&ctx, repo.clone()).await;

        let err = outcome.result.unwrap_err();
        assert_eq!(err.stage(), "fetch");
        assert!(!repo.temp_zip_path(out.path()).exists());
        assert!(!repo.temp_dir_path(out.path()).exists());
        assert!(!repo.final_archive_path(out.path()).exists());
    }

    #[tokio::test]
    async fn test_resolve_failure_is_tagged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/private"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let out = tempfile::tempdir().unwrap();
        let ctx = context_for(&server, out.path());

        let outcome = process_repo(&ctx, RepoId::parse("owner/private").unwrap()).await;

        assert!(!outcome.is_ok());
        assert_eq!(outcome.result.unwrap_err().stage(), "resolve");
    }

    #[tokio::test]
    async fn test_stale_temp_files_do_not_leak_into_archive() {
        let server = MockServer::start().await;
        let repo = RepoId::parse("owner/name").unwrap();
        mount_repo(
            &server,
            &repo,
            "main",
            zipball_bytes(&[("owner-name-1/", None), ("owner-name-1/a.txt", Some(b"a".as_slice()))]),
        )
        .await;

        let out = tempfile::tempdir().unwrap();
        let stale = repo.temp_dir_path(out.path()).join("leftover");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("old.txt"), b"old").unwrap();

        let ctx = context_for(&server, out.path());
        let archive = process_repo(&ctx, repo).await.result.unwrap();

        assert_eq!(zip_entries(&archive), vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_outcome_json_shape() {
        let ok = RepoOutcome {
            repo: RepoId::parse("a/b").unwrap(),
            elapsed: Duration::from_millis(12),
            result: Ok(PathBuf::from("./a_b.zip")),
        };
        let failed = RepoOutcome {
            repo: RepoId::parse("c/d").unwrap(),
            elapsed: Duration::from_millis(3),
            result: Err(PipelineError::Fetch(anyhow::anyhow!("boom"))),
        };

        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({ "repo": "a/b", "status": "ok", "archive": "./a_b.zip", "elapsed_ms": 12 })
        );
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({
                "repo": "c/d",
                "status": "failed",
                "stage": "fetch",
                "error": "fetch failed: boom",
                "elapsed_ms": 3
            })
        );
    }
}
