//! Branch wait times
//!
//! There is no live queueing feed; waits are simulated per lookup. Branch
//! existence is checked against the graph.

use crate::neo4j::GraphStore;
use anyhow::Result;
use indexmap::IndexMap;
use std::sync::Arc;

/// Upper bound (exclusive) of a simulated wait, in minutes
const MAX_SIMULATED_WAIT: u32 = 600;

fn simulated_wait(_branch: &str) -> u32 {
    rand::random::<u32>() % MAX_SIMULATED_WAIT
}

#[derive(Clone)]
pub struct WaitTimes {
    graph: Arc<dyn GraphStore>,
    sample: fn(&str) -> u32,
}

impl WaitTimes {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self {
            graph,
            sample: simulated_wait,
        }
    }

    /// Replace the wait source (deterministic tests)
    pub fn with_sampler(mut self, sample: fn(&str) -> u32) -> Self {
        self.sample = sample;
        self
    }

    /// Wait at a branch, matched case-insensitively. Unknown branches get a
    /// message rather than an error.
    pub async fn current_wait(&self, branch: &str) -> Result<String> {
        let wanted = branch.trim().to_lowercase();
        let names = self.graph.list_branch_names().await?;
        match names.iter().find(|n| n.to_lowercase() == wanted) {
            Some(name) => {
                let minutes = (self.sample)(name);
                Ok(if minutes > 60 {
                    format!("{} hours {} minutes", minutes / 60, minutes % 60)
                } else {
                    format!("{} minutes", minutes)
                })
            }
            None => Ok(format!("Branch '{}' does not exist.", branch)),
        }
    }

    /// The branch with the lowest current wait, as `{branch: minutes}`
    pub async fn most_available(&self) -> Result<IndexMap<String, u32>> {
        let names = self.graph.list_branch_names().await?;
        let waits: Vec<(String, u32)> = names
            .into_iter()
            .map(|name| {
                let minutes = (self.sample)(&name);
                (name, minutes)
            })
            .collect();
        Ok(pick_most_available(&waits).into_iter().collect())
    }
}

/// Lowest wait wins; the first listed branch wins a tie
pub fn pick_most_available(waits: &[(String, u32)]) -> Option<(String, u32)> {
    waits
        .iter()
        .fold(None::<&(String, u32)>, |best, candidate| match best {
            Some(b) if b.1 <= candidate.1 => Some(b),
            _ => Some(candidate),
        })
        .cloned()
}
