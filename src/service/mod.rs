//! The remote route-optimization service.
//!
//! `RouteService` is the only seam between the workflow and the network. The
//! workflow never sees HTTP types: a call resolves either to the decoded JSON
//! body of a 2xx response or to a `WorkflowError`.

mod http;
pub(crate) mod schema;

pub use http::HttpRouteService;

use crate::error::Result;
use crate::model::Stage;
use bytes::Bytes;
use serde_json::Value;
use std::future::Future;

/// A selected file, read into memory and ready to be sent.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub name: String,
    pub contents: Bytes,
}

pub const SOLVE_ENDPOINT: &str = "/api/solve_tsp";

pub trait RouteService: Send + Sync + 'static {
    /// POST `file` as multipart field `file` to the stage's endpoint.
    fn upload(&self, stage: Stage, file: FilePayload)
        -> impl Future<Output = Result<Value>> + Send;

    /// POST `body` as JSON to the solve endpoint.
    fn solve(&self, body: Value) -> impl Future<Output = Result<Value>> + Send;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::{FilePayload, RouteService};
    use crate::error::{Result, WorkflowError};
    use crate::model::Stage;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::{Mutex, PoisonError};
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Upload { stage: Stage, file_name: String, bytes: usize },
        Solve { body: Value },
    }

    enum Reply {
        Ready(Result<Value>),
        Held(oneshot::Receiver<Result<Value>>),
    }

    /// Scripted service: replies are handed out in FIFO order across both
    /// endpoints and every call is recorded when it is issued.
    #[derive(Default)]
    pub struct FakeService {
        calls: Mutex<Vec<Call>>,
        replies: Mutex<VecDeque<Reply>>,
    }

    impl FakeService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, r: Result<Value>) -> Self {
            self.push(r);
            self
        }

        pub fn push(&self, r: Result<Value>) {
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Reply::Ready(r));
        }

        /// Queue a reply that stays pending until the returned sender fires.
        pub fn hold(&self) -> oneshot::Sender<Result<Value>> {
            let (tx, rx) = oneshot::channel();
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Reply::Held(rx));
            tx
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn record(&self, call: Call) -> impl Future<Output = Result<Value>> + Send {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(call);
            let next = self
                .replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            async move {
                match next {
                    Some(Reply::Ready(r)) => r,
                    Some(Reply::Held(rx)) => rx
                        .await
                        .unwrap_or_else(|_| Err(WorkflowError::Transport("dropped".into()))),
                    None => Err(WorkflowError::Transport("no scripted reply".into())),
                }
            }
        }
    }

    impl RouteService for FakeService {
        fn upload(
            &self,
            stage: Stage,
            file: FilePayload,
        ) -> impl Future<Output = Result<Value>> + Send {
            self.record(Call::Upload {
                stage,
                file_name: file.name,
                bytes: file.contents.len(),
            })
        }

        fn solve(&self, body: Value) -> impl Future<Output = Result<Value>> + Send {
            self.record(Call::Solve { body })
        }
    }
}
