//! Serialized access to a [`ListRepository`].
//!
//! The repository itself gives no ordering guarantee between concurrent calls. A
//! [`ListService`] owns the repository in a worker task and feeds it one request at a time,
//! so callers that go through the same service see requests applied in the order they were
//! made.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::repository::{ListRepository, Lists, StoreError, UserId};

/// Requests waiting for the worker. One queued request at a time; further senders wait.
const REQUEST_BUFFER: usize = 1;

#[derive(Debug)]
enum Request {
    FindByAuthor {
        author: UserId,
        reply: oneshot::Sender<Result<Lists, StoreError>>,
    },
    DeleteByAuthor {
        author: UserId,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a list worker. Clones talk to the same worker.
#[derive(Debug, Clone)]
pub struct ListService {
    request_tx: mpsc::Sender<Request>,
}

impl ListService {
    /// Spawn a worker for `repo` on the current runtime.
    pub fn spawn(repo: Arc<dyn ListRepository>) -> (Self, JoinHandle<()>) {
        let (request_tx, mut request_rx) = mpsc::channel::<Request>(REQUEST_BUFFER);

        let worker = tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                match request {
                    Request::FindByAuthor { author, reply } => {
                        debug!("Finding lists of {author}");
                        let result = repo.find_by_author(&author).await;
                        if reply.send(result).is_err() {
                            debug!("Caller went away before lists of {author} were returned");
                        }
                    }
                    Request::DeleteByAuthor { author, reply } => {
                        debug!("Deleting lists of {author}");
                        let result = repo.delete_by_author(&author).await;
                        if let Err(err) = &result {
                            warn!("Deleting lists of {author} failed: {err}");
                        }
                        // The deletion has run either way; a dropped caller only loses the outcome
                        let _ = reply.send(result);
                    }
                    Request::Shutdown(done) => {
                        let _ = done.send(());
                        break;
                    }
                }
            }

            info!("List worker stopped");
        });

        (Self { request_tx }, worker)
    }

    pub async fn find_by_author(&self, author: &UserId) -> Result<Lists, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::FindByAuthor {
            author: author.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    pub async fn delete_by_author(&self, author: &UserId) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::DeleteByAuthor {
            author: author.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Stop the worker once the requests queued before this one have been answered.
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.request_tx.send(Request::Shutdown(done)).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn send(&self, request: Request) -> Result<(), StoreError> {
        self.request_tx.send(request).await.map_err(|_| stopped())
    }
}

fn stopped() -> StoreError {
    StoreError::unavailable("list worker has stopped")
}
