use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

use crate::landmark::TaskInput;
use crate::reporter::TaskReporter;
use crate::tasks::{run_task, TaskContext, TaskKind};

/// One unit of work read from the task source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub kind: TaskKind,
    pub input: TaskInput,
    /// Opaque handle echoed back to the reporter.
    pub token: String,
}

/// Runs task flows on blocking threads, at most the configured number of
/// slots per task kind at once. Every request is reported exactly once.
pub struct WorkerPool {
    context: Arc<TaskContext>,
    reporter: Arc<dyn TaskReporter>,
    slots: HashMap<TaskKind, Arc<Semaphore>>,
    tasks: JoinSet<()>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("running", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    pub fn new(context: Arc<TaskContext>, reporter: Arc<dyn TaskReporter>) -> Self {
        let workers = &context.config().workers;
        let slots = TaskKind::iter()
            .map(|kind| {
                let count = match kind {
                    TaskKind::Mask => workers.mask,
                    TaskKind::Score => workers.score,
                    TaskKind::Crop => workers.crop,
                    TaskKind::CropFromSaliency => workers.crop_from_saliency,
                };
                (kind, Arc::new(Semaphore::new(count.max(1))))
            })
            .collect();

        Self {
            context,
            reporter,
            slots,
            tasks: JoinSet::new(),
        }
    }

    /// Queue `request`. Must be called from within a tokio runtime.
    pub fn submit(&mut self, request: TaskRequest) {
        while let Some(finished) = self.tasks.try_join_next() {
            if let Err(e) = finished {
                error!("Worker task panicked: {e}");
            }
        }

        let context = Arc::clone(&self.context);
        let reporter = Arc::clone(&self.reporter);
        let slots = self.slots.get(&request.kind).cloned();

        self.tasks.spawn(async move {
            let TaskRequest { kind, input, token } = request;
            let _permit = match slots {
                Some(slots) => slots.acquire_owned().await.ok(),
                None => None,
            };

            let outcome = tokio::task::spawn_blocking(move || run_task(&context, kind, &input))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|result| result);

            match outcome {
                Ok(()) => reporter.send_success(&token),
                Err(e) => {
                    let message = format!("{e:#}");
                    error!(%kind, token = %token, "{message}");
                    reporter.send_failure(&token, kind.failure_code(), &message);
                }
            }
        });
    }

    /// Wait for every submitted task to finish.
    pub async fn shutdown(mut self) {
        while let Some(finished) = self.tasks.join_next().await {
            if let Err(e) = finished {
                error!("Worker task panicked: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use landmarks::BoundingBox;

    use super::*;
    use crate::config::Config;
    use crate::landmark::Landmark;
    use crate::reporter::FailureCode;
    use crate::store::{MemoryLandmarkStore, MemoryObjectStore, ObjectStore};
    use crate::test_utils::{saliency_json, Outcome, RecordingReporter};

    fn pool(objects: Arc<MemoryObjectStore>, reporter: Arc<RecordingReporter>) -> WorkerPool {
        let config = Config {
            landmark_db: None,
            positions: vec!["north".to_string()],
            ..Config::default()
        };
        let cropped = Landmark::new("3", "north").with_rect(BoundingBox::new(0, 0, 5, 5).unwrap());
        let landmarks = Arc::new(MemoryLandmarkStore::with_landmarks(vec![cropped]));
        let context = TaskContext::new(config, objects, landmarks).unwrap();
        WorkerPool::new(Arc::new(context), reporter)
    }

    #[tokio::test]
    async fn test_every_request_is_reported_once() {
        let objects = Arc::new(MemoryObjectStore::new());
        objects
            .put(
                "saliency-maps",
                "1_north.json",
                saliency_json(40, 40, &[(10, 10, 30, 30, 200)]).into_bytes(),
                "application/json",
            )
            .unwrap();
        objects
            .put(
                "streetview-images",
                "8_north.jpg",
                b"not an image".to_vec(),
                "image/jpeg",
            )
            .unwrap();
        let reporter = Arc::new(RecordingReporter::default());
        let mut pool = pool(objects, Arc::clone(&reporter));

        for (token, hit_id) in [("a", "1"), ("b", "1"), ("c", "2")] {
            pool.submit(TaskRequest {
                kind: TaskKind::Mask,
                input: TaskInput::new("9", hit_id),
                token: token.to_string(),
            });
        }
        // Hit 3 has a landmark with a rect. Episode 9 has no image for it,
        // episode 8 has one that cannot be decoded.
        pool.submit(TaskRequest {
            kind: TaskKind::Crop,
            input: TaskInput::new("9", "3"),
            token: "d".to_string(),
        });
        pool.submit(TaskRequest {
            kind: TaskKind::Crop,
            input: TaskInput::new("8", "3"),
            token: "e".to_string(),
        });
        pool.shutdown().await;

        let mut outcomes = reporter.outcomes();
        outcomes.sort_by(|a, b| a.token().cmp(b.token()));
        assert_eq!(
            outcomes,
            vec![
                Outcome::Success("a".to_string()),
                Outcome::Success("b".to_string()),
                Outcome::Success("c".to_string()),
                Outcome::Success("d".to_string()),
                Outcome::Failure("e".to_string(), FailureCode::CropError),
            ]
        );
    }

    #[test]
    fn test_task_requests_parse_from_json_lines() {
        let request: TaskRequest = serde_json::from_str(
            r#"{"kind": "CROP_FROM_SALIENCY", "input": {"epId": 4, "hitId": 5}, "token": "t"}"#,
        )
        .unwrap();
        assert_eq!(request.kind, TaskKind::CropFromSaliency);
        assert_eq!(request.input, TaskInput::new("4", "5"));
    }
}
