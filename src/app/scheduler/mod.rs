// Job scheduler - First pass over every job, then one shuffled retry pass

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::domain::model::*;
use crate::domain::settings::SchedulerSettings;
use crate::engine::JobRunner;

/// Outcomes of a scheduled batch, in job order
#[derive(Debug, Clone, Default)]
pub struct ScheduledBatch {
    pub outcomes: Vec<JobOutcome>,
    pub retry_successes: usize,
    pub retry_failures: usize,
}

impl ScheduledBatch {
    pub fn count(&self, status: JobStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Runs jobs sequentially and re-drives retryable failures exactly once
pub struct JobScheduler {
    runner: Arc<dyn JobRunner>,
    retry_failed: bool,
    rng: StdRng,
}

impl JobScheduler {
    pub fn new(runner: Arc<dyn JobRunner>, settings: &SchedulerSettings) -> Self {
        let rng = match settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            runner,
            retry_failed: settings.retry_failed,
            rng,
        }
    }

    /// Every job in order. Returns the outcomes and the indices of retryable failures.
    pub async fn first_pass(&self, jobs: &[EncodeJob]) -> (Vec<JobOutcome>, Vec<usize>) {
        let mut outcomes = Vec::with_capacity(jobs.len());
        let mut retry_batch = Vec::new();

        for (index, job) in jobs.iter().enumerate() {
            info!(job = %job.label, "Job {}/{}", index + 1, jobs.len());
            let outcome = self.runner.run_job(job).await;
            if outcome.is_failed() {
                warn!(
                    job = %job.label,
                    "Failed: {}",
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                if outcome.retryable {
                    retry_batch.push(index);
                }
            }
            outcomes.push(outcome);
        }
        (outcomes, retry_batch)
    }

    /// Shuffle the batch and run each job once more; results are terminal
    pub async fn retry_pass(
        &mut self,
        jobs: &[EncodeJob],
        mut batch: Vec<usize>,
    ) -> Vec<(usize, JobOutcome)> {
        batch.shuffle(&mut self.rng);
        info!("Retrying {} failed jobs", batch.len());

        let mut results = Vec::with_capacity(batch.len());
        for index in batch {
            let Some(job) = jobs.get(index) else {
                continue;
            };
            info!(job = %job.label, "Retry");
            let mut outcome = self.runner.run_job(job).await;
            outcome.retried = true;
            results.push((index, outcome));
        }
        results
    }

    /// First pass, then (when enabled) the retry pass over its failures
    pub async fn run(&mut self, jobs: &[EncodeJob]) -> ScheduledBatch {
        let (mut outcomes, retry_batch) = self.first_pass(jobs).await;
        let mut batch = ScheduledBatch::default();

        if self.retry_failed && !retry_batch.is_empty() {
            for (index, outcome) in self.retry_pass(jobs, retry_batch).await {
                if outcome.is_failed() {
                    batch.retry_failures += 1;
                } else {
                    batch.retry_successes += 1;
                }
                outcomes[index] = outcome;
            }
        }

        batch.outcomes = outcomes;
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Fails each job id a scripted number of times before succeeding
    struct ScriptedRunner {
        failures: Mutex<HashMap<u32, u32>>,
        calls: Mutex<Vec<u32>>,
        retryable: bool,
    }

    impl ScriptedRunner {
        fn new(failures: &[(u32, u32)], retryable: bool) -> Arc<Self> {
            Arc::new(Self {
                failures: Mutex::new(failures.iter().copied().collect()),
                calls: Mutex::new(Vec::new()),
                retryable,
            })
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobRunner for ScriptedRunner {
        async fn run_job(&self, job: &EncodeJob) -> JobOutcome {
            self.calls.lock().unwrap().push(job.id);
            let mut failures = self.failures.lock().unwrap();
            let remaining = failures.entry(job.id).or_insert(0);
            if *remaining > 0 {
                *remaining -= 1;
                let mut outcome = JobOutcome::new(job, JobStatus::Failed);
                outcome.error = Some("exit code 1".to_string());
                outcome.retryable = self.retryable;
                outcome
            } else {
                JobOutcome::new(job, JobStatus::Success)
            }
        }
    }

    fn jobs(count: u32) -> Vec<EncodeJob> {
        (1..=count)
            .map(|id| EncodeJob {
                id,
                label: format!("clip {}", id),
                inputs: Vec::new(),
                output_path: PathBuf::from(format!("out/{}.mp4", id)),
                profiles: Vec::new(),
                framerate: 30.0,
                audio_bitrate: "128k".to_string(),
                transition_seconds: 0.0,
                pixel_format: None,
            })
            .collect()
    }

    fn settings(seed: u64) -> SchedulerSettings {
        SchedulerSettings {
            retry_failed: true,
            shuffle_seed: Some(seed),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_transient_failure() {
        let runner = ScriptedRunner::new(&[(3, 1)], true);
        let mut scheduler = JobScheduler::new(runner.clone(), &settings(1));

        let batch = scheduler.run(&jobs(5)).await;

        assert_eq!(runner.calls(), vec![1, 2, 3, 4, 5, 3]);
        assert_eq!(batch.count(JobStatus::Success), 5);
        assert_eq!(batch.retry_successes, 1);
        assert_eq!(batch.retry_failures, 0);
        assert!(batch.outcomes[2].retried);
        assert_eq!(batch.outcomes[2].job_id, 3);
    }

    #[tokio::test]
    async fn test_retry_failures_are_terminal() {
        let runner = ScriptedRunner::new(&[(2, 5), (4, 5)], true);
        let mut scheduler = JobScheduler::new(runner.clone(), &settings(7));

        let batch = scheduler.run(&jobs(4)).await;

        let calls = runner.calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(&calls[..4], &[1, 2, 3, 4]);
        let mut retried = calls[4..].to_vec();
        retried.sort();
        assert_eq!(retried, vec![2, 4]);
        assert_eq!(batch.count(JobStatus::Failed), 2);
        assert_eq!(batch.retry_failures, 2);
    }

    #[tokio::test]
    async fn test_non_retryable_and_disabled_retry() {
        let runner = ScriptedRunner::new(&[(1, 1)], false);
        let mut scheduler = JobScheduler::new(runner.clone(), &settings(3));
        let batch = scheduler.run(&jobs(2)).await;
        assert_eq!(runner.calls(), vec![1, 2]);
        assert!(batch.outcomes[0].is_failed());

        let runner = ScriptedRunner::new(&[(1, 1)], true);
        let disabled = SchedulerSettings {
            retry_failed: false,
            shuffle_seed: None,
        };
        let mut scheduler = JobScheduler::new(runner.clone(), &disabled);
        scheduler.run(&jobs(2)).await;
        assert_eq!(runner.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_seeded_shuffle_is_reproducible() {
        let order = |seed| async move {
            let failing: Vec<(u32, u32)> = (1..=8).map(|id| (id, 1)).collect();
            let runner = ScriptedRunner::new(&failing, true);
            let mut scheduler = JobScheduler::new(runner.clone(), &settings(seed));
            scheduler.run(&jobs(8)).await;
            runner.calls()[8..].to_vec()
        };

        let first = order(42).await;
        assert_eq!(first, order(42).await);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, (1..=8).collect::<Vec<_>>());
    }
}
