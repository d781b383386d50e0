//! Runs one [`Pipeline`] over many logs at once. A fixed set of worker
//! threads pulls paths from a shared job channel, so only as many logs as
//! there are workers are held in memory at a time.

use crate::pipeline::{Pipeline, PipelineError, PipelineOutput};

use log::{debug, info, warn};
use std::{
    num::NonZeroUsize,
    path::PathBuf,
    sync::{mpsc::channel, Mutex},
    thread,
};

/// What happened to one file of a batch.
#[derive(Debug)]
pub struct FileOutcome {
    /// The file, as given.
    pub path: PathBuf,
    /// Its output, or why there is none.
    pub result: Result<PipelineOutput, PipelineError>,
}

/// One worker per available core.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// [`run_batch_with_workers`] with [`default_workers`] threads.
pub fn run_batch<P: Into<PathBuf>>(
    pipeline: &Pipeline,
    paths: impl IntoIterator<Item = P>,
) -> Vec<FileOutcome> {
    run_batch_with_workers(pipeline, paths, default_workers())
}

/// Run `pipeline` over every path on at most `workers` threads. Outcomes
/// come back in the order the paths were given, and a file that cannot be
/// read only fails itself.
pub fn run_batch_with_workers<P: Into<PathBuf>>(
    pipeline: &Pipeline,
    paths: impl IntoIterator<Item = P>,
    workers: usize,
) -> Vec<FileOutcome> {
    let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
    let workers = workers.clamp(1, paths.len().max(1));

    let (job_tx, job_rx) = channel::<(usize, &PathBuf)>();
    for job in paths.iter().enumerate() {
        if job_tx.send(job).is_err() {
            break;
        }
    }
    drop(job_tx);
    let jobs = Mutex::new(job_rx);

    let (tx, rx) = channel::<(usize, FileOutcome)>();

    thread::scope(|scope| {
        for worker in 0..workers {
            let tx = tx.clone();
            let jobs = &jobs;
            scope.spawn(move || {
                loop {
                    let job = match jobs.lock() {
                        Ok(queue) => queue.recv(),
                        Err(_) => break,
                    };
                    let Ok((i, path)) = job else {
                        break;
                    };

                    let result = pipeline.run_path(path);
                    if let Err(error) = &result {
                        warn!("{} : {}.", path.display(), error);
                    }
                    let outcome = FileOutcome {
                        path: path.clone(),
                        result,
                    };
                    if let Err(error) = tx.send((i, outcome)) {
                        warn!("{} : received error {}.", path.display(), error);
                    }
                }
                debug!("batch worker {} : terminated.", worker);
            });
        }
    });
    drop(tx);

    let mut outcomes: Vec<(usize, FileOutcome)> = rx.into_iter().collect();
    outcomes.sort_by_key(|(i, _)| *i);

    let failed = outcomes.iter().filter(|(_, o)| o.result.is_err()).count();
    info!(
        "Batch finished: {} files on {} workers, {} failed.",
        outcomes.len(),
        workers,
        failed
    );

    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterCriteria, PipelineConfig};
    use crate::synthetic::SyntheticLog;

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig {
            criteria: FilterCriteria {
                start_seconds: 0.0,
                end_seconds: 1e6,
                quality_threshold: 0.0,
            },
            outliers: None,
        })
        .unwrap()
    }

    #[test]
    fn results_come_back_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (1..=6)
            .map(|i| {
                let path = dir.path().join(format!("log{}.txt", i));
                SyntheticLog::builder()
                    .samples(i * 50)
                    .seed(i as u64)
                    .build()
                    .to_path(&path)
                    .unwrap();
                path
            })
            .collect();

        let outcomes = run_batch(&pipeline(), &paths);

        assert_eq!(outcomes.len(), 6);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.path, paths[i]);
            let output = outcome.result.as_ref().unwrap();
            assert_eq!(output.stats.total_seen, (i + 1) * 50);
        }
    }

    #[test]
    fn one_missing_file_does_not_spoil_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        SyntheticLog::builder().samples(20).build().to_path(&good).unwrap();
        let missing = dir.path().join("missing.txt");

        let outcomes = run_batch(&pipeline(), [missing.clone(), good.clone()]);

        assert!(matches!(
            outcomes[0].result,
            Err(PipelineError::IoError(_))
        ));
        assert_eq!(outcomes[1].result.as_ref().unwrap().stats.retained, 20);
    }

    #[test]
    fn fewer_workers_than_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (1..=5)
            .map(|i| {
                let path = dir.path().join(format!("log{}.txt", i));
                SyntheticLog::builder()
                    .samples(i * 10)
                    .build()
                    .to_path(&path)
                    .unwrap();
                path
            })
            .collect();

        for workers in [0, 1, 2, 16] {
            let outcomes = run_batch_with_workers(&pipeline(), &paths, workers);

            let seen: Vec<usize> = outcomes
                .iter()
                .map(|o| o.result.as_ref().unwrap().stats.total_seen)
                .collect();
            assert_eq!(seen, vec![10, 20, 30, 40, 50]);
        }
    }

    #[test]
    fn empty_batch() {
        let outcomes = run_batch(&pipeline(), Vec::<PathBuf>::new());
        assert!(outcomes.is_empty());
    }
}
