// src/batch/driver.rs
// =============================================================================
// Runs a list of repositories in fixed-size chunks.
//
// How it works:
// 1. Split the list into contiguous chunks of `chunk_size`
// 2. Start every repository of a chunk at once and wait for all of them
// 3. Only then move on to the next chunk
//
// Identifiers that derive the same output path (`a/b_c` and `a_b/c`) share
// temporary files, so inside a chunk they are split into separate waves
// that run one after another.
//
// A failing repository is just an outcome with an Err in it. It doesn't
// cancel its siblings and it doesn't stop later chunks.
//
// Rust concepts:
// - join_all: like Promise.all(). Polls every future of the chunk
//   concurrently and returns their outputs in input order
// - slice::chunks: splits a slice into consecutive sub-slices
// =============================================================================

use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::pipeline::{process_repo, RepoOutcome, RunContext};
use crate::repo::RepoId;

// Everything that happened during a run, in input order
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<RepoOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

// Splits `items` into consecutive groups of `size` (the last may be shorter)
//
// A size of zero is treated as one. The CLI already rejects it.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

// Splits one chunk into waves in which every slug appears at most once
//
// Order is kept: each repo goes into the first wave that doesn't already
// hold its slug. A chunk without collisions is a single wave.
pub fn waves(group: Vec<RepoId>) -> Vec<Vec<RepoId>> {
    let mut waves: Vec<(HashSet<String>, Vec<RepoId>)> = Vec::new();

    for repo in group {
        let slug = repo.slug();
        match waves.iter_mut().find(|(slugs, _)| !slugs.contains(&slug)) {
            Some((slugs, members)) => {
                slugs.insert(slug);
                members.push(repo);
            }
            None => waves.push((HashSet::from([slug]), vec![repo])),
        }
    }

    waves.into_iter().map(|(_, members)| members).collect()
}

// Processes `repos` chunk by chunk
//
// Parameters:
//   ctx: shared client, API config and output directory
//   repos: identifiers to process (already deduplicated by the caller)
//   chunk_size: how many repositories run at the same time
pub async fn run_batch(ctx: &RunContext, repos: &[RepoId], chunk_size: usize) -> BatchReport {
    let chunks = chunk(repos, chunk_size);
    let total = chunks.len();
    let mut outcomes = Vec::with_capacity(repos.len());
    let position: HashMap<&RepoId, usize> =
        repos.iter().enumerate().map(|(i, r)| (r, i)).collect();

    for (index, group) in chunks.into_iter().enumerate() {
        info!(chunk = index + 1, of = total, repos = group.len(), "starting chunk");

        let mut chunk_outcomes = Vec::with_capacity(group.len());
        for wave in waves(group) {
            let tasks = wave.into_iter().map(|repo| process_repo(ctx, repo));
            chunk_outcomes.extend(join_all(tasks).await);
        }

        // Waves may reorder a chunk; put outcomes back in input order
        chunk_outcomes.sort_by_key(|o: &RepoOutcome| position[&o.repo]);
        outcomes.extend(chunk_outcomes);
    }

    BatchReport { outcomes }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why join_all and not tokio::spawn?
//    - join_all polls the futures of one chunk together on the current task
//    - No 'static bounds needed, so tasks can borrow ctx directly
//    - The chunk is "done" exactly when join_all returns
//
// 2. Why does join_all keep the order?
//    - It returns outputs positionally, even if repo #2 finishes first
//    - That is why BatchReport lists outcomes in input order
//
// 3. What is <[T]>::to_vec?
//    - A path to the to_vec method of slices
//    - chunks() yields &[T]; to_vec() clones each chunk into an owned Vec<T>
// -----------------------------------------------------------------------------
