// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sidecar engine client: the processing engine runs as a child process and
// speaks newline-delimited JSON over stdio.
//
// Outbound:  {"id": 7, "command": "merge_pdfs", "args": {...}}
// Inbound:   {"type": "accepted", "id": 7, "task_id": "..."}
//            {"type": "response", "id": 7, "ok": true,  "result": ...}
//            {"type": "response", "id": 7, "ok": false, "error": "..."}
//            {"type": "event", "channel": "conversion-progress", "payload": {...}}
//
// Submissions get an `accepted` line followed later by the `response` that
// carries the output path. Plain commands get a single `response`.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, instrument, warn};

use folio_core::error::{FolioError, Result};
use folio_core::types::{ConvertRequest, DocumentInfo, MergeRequest, ProgressEvent, TaskId};

use crate::traits::{PROGRESS_CHANNEL, PendingTask, ProcessingEngine};

/// Progress events buffered per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

type Reply = std::result::Result<Value, String>;

/// Someone waiting on a request id.
enum Waiter {
    /// Plain command: one response.
    Reply(oneshot::Sender<Reply>),
    /// Submission: acceptance first, completion later.
    Task {
        accepted: Option<oneshot::Sender<std::result::Result<TaskId, String>>>,
        done: oneshot::Sender<std::result::Result<String, String>>,
    },
}

#[derive(Serialize)]
struct Outbound<'a> {
    id: u64,
    command: &'a str,
    args: Value,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Inbound {
    Accepted {
        id: u64,
        task_id: TaskId,
    },
    Response {
        id: u64,
        ok: bool,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        error: Option<String>,
    },
    Event {
        channel: String,
        payload: ProgressEvent,
    },
}

/// Routes inbound lines to waiters and subscribers.
struct Router {
    waiters: Mutex<HashMap<u64, Waiter>>,
    /// Set once the engine's stdout has ended. Only changed under the
    /// waiters lock.
    closed: AtomicBool,
    events: broadcast::Sender<ProgressEvent>,
}

impl Router {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            waiters: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            events,
        }
    }

    /// Refused once the engine has gone away; nothing would answer.
    fn register(&self, id: u64, waiter: Waiter) -> Result<()> {
        let mut waiters = self.waiters.lock().expect("waiters lock poisoned");
        if self.closed.load(Ordering::Acquire) {
            return Err(FolioError::Transport("engine has exited".into()));
        }
        waiters.insert(id, waiter);
        Ok(())
    }

    fn forget(&self, id: u64) {
        self.waiters.lock().expect("waiters lock poisoned").remove(&id);
    }

    /// Drop every waiter; their receivers observe a closed channel.
    fn close(&self) {
        let mut waiters = self.waiters.lock().expect("waiters lock poisoned");
        self.closed.store(true, Ordering::Release);
        if !waiters.is_empty() {
            warn!(pending = waiters.len(), "engine gone with requests outstanding");
        }
        waiters.clear();
    }

    fn route(&self, line: &str) -> Result<()> {
        let message: Inbound =
            serde_json::from_str(line).map_err(|e| FolioError::Protocol(e.to_string()))?;

        match message {
            Inbound::Event { channel, payload } => {
                if channel == PROGRESS_CHANNEL {
                    // No subscribers is fine.
                    let _ = self.events.send(payload);
                } else {
                    debug!(channel, "event on unknown channel ignored");
                }
            }

            Inbound::Accepted { id, task_id } => {
                let mut waiters = self.waiters.lock().expect("waiters lock poisoned");
                match waiters.get_mut(&id) {
                    Some(Waiter::Task { accepted, .. }) => {
                        if let Some(tx) = accepted.take() {
                            let _ = tx.send(Ok(task_id));
                        }
                    }
                    _ => debug!(id, "acceptance for unknown submission ignored"),
                }
            }

            Inbound::Response { id, ok, result, error } => {
                let Some(waiter) = self.waiters.lock().expect("waiters lock poisoned").remove(&id)
                else {
                    debug!(id, "response for unknown request ignored");
                    return Ok(());
                };
                let reply = if ok {
                    Ok(result)
                } else {
                    Err(error.unwrap_or_else(|| "engine gave no reason".into()))
                };
                match waiter {
                    Waiter::Reply(tx) => {
                        let _ = tx.send(reply);
                    }
                    Waiter::Task { accepted, done } => {
                        let outcome = reply.and_then(output_path);
                        if let Some(tx) = accepted {
                            // Answered without a separate acceptance.
                            match &outcome {
                                Err(reason) => {
                                    let _ = tx.send(Err(reason.clone()));
                                    return Ok(());
                                }
                                Ok(_) => {
                                    let _ = tx.send(Ok(TaskId::new(format!("request-{id}"))));
                                }
                            }
                        }
                        let _ = done.send(outcome);
                    }
                }
            }
        }
        Ok(())
    }
}

fn output_path(result: Value) -> std::result::Result<String, String> {
    match result {
        Value::String(path) => Ok(path),
        other => Err(format!("engine returned no output path: {other}")),
    }
}

/// Processing engine running as a child process.
pub struct SidecarEngine {
    stdin: tokio::sync::Mutex<ChildStdin>,
    router: Arc<Router>,
    next_id: AtomicU64,
    /// Killed when the engine handle is dropped.
    _child: Mutex<Child>,
}

impl SidecarEngine {
    /// Launch the engine executable and start reading its output.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip_all, fields(program = %program.as_ref().display()))]
    pub fn spawn(program: impl AsRef<Path>) -> Result<Self> {
        let mut child = Command::new(program.as_ref())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FolioError::Transport("engine stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FolioError::Transport("engine stdout not captured".into()))?;

        let router = Arc::new(Router::new());
        tokio::spawn(read_loop(stdout, Arc::clone(&router)));
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        info!(pid = child.id(), "processing engine started");
        Ok(Self {
            stdin: tokio::sync::Mutex::new(stdin),
            router,
            next_id: AtomicU64::new(1),
            _child: Mutex::new(child),
        })
    }

    async fn send(&self, id: u64, command: &str, args: Value) -> Result<()> {
        let mut line = serde_json::to_string(&Outbound { id, command, args })?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        }
        .await;

        written.map_err(|e| {
            self.router.forget(id);
            FolioError::Transport(format!("sending {command}: {e}"))
        })
    }

    /// Send a command and wait for its single response.
    async fn call(&self, command: &str, args: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.router.register(id, Waiter::Reply(tx))?;
        self.send(id, command, args).await?;

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(reason)) => Err(FolioError::EngineReported(reason)),
            Err(_) => Err(FolioError::Transport(format!("engine exited before answering {command}"))),
        }
    }

    /// Send a submission and wait only for its acceptance.
    async fn submit(&self, command: &str, args: Value) -> Result<PendingTask> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        self.router.register(
            id,
            Waiter::Task {
                accepted: Some(accepted_tx),
                done: done_tx,
            },
        )?;
        self.send(id, command, args).await?;

        match accepted_rx.await {
            Ok(Ok(task_id)) => {
                debug!(task_id = %task_id, command, "engine accepted job");
                Ok(PendingTask::new(task_id, done_rx))
            }
            Ok(Err(reason)) => Err(FolioError::EngineReported(reason)),
            Err(_) => Err(FolioError::Transport(format!("engine exited before accepting {command}"))),
        }
    }
}

#[async_trait]
impl ProcessingEngine for SidecarEngine {
    async fn probe_capability(&self) -> Result<bool> {
        let value = self.call("check_calibre_installed", json!({})).await?;
        value
            .as_bool()
            .ok_or_else(|| FolioError::Protocol(format!("expected a boolean, got {value}")))
    }

    async fn document_info(&self, path: &str) -> Result<DocumentInfo> {
        let value = self.call("get_pdf_info", json!({ "path": path })).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn submit_merge(&self, request: MergeRequest) -> Result<PendingTask> {
        self.submit("merge_pdfs", json!({ "config": request })).await
    }

    async fn submit_convert(&self, request: ConvertRequest) -> Result<PendingTask> {
        self.submit("convert_pdf_to_ebook", json!({ "config": request })).await
    }

    async fn cancel(&self, task_id: &TaskId) -> Result<()> {
        self.call("cancel_conversion", json!({ "task_id": task_id }))
            .await
            .map(|_| ())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.router.events.subscribe()
    }
}

async fn read_loop(stdout: ChildStdout, router: Arc<Router>) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => {
                if let Err(e) = router.route(&line) {
                    warn!(error = %e, "ignoring malformed engine message");
                }
            }
            Ok(None) => {
                info!("processing engine closed its output");
                break;
            }
            Err(e) => {
                warn!(error = %e, "reading engine output failed");
                break;
            }
        }
    }
    router.close();
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "folio::engine", "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_waiter(router: &Router, id: u64) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        router.register(id, Waiter::Reply(tx)).expect("register");
        rx
    }

    #[test]
    fn response_resolves_plain_call() {
        let router = Router::new();
        let mut rx = reply_waiter(&router, 1);

        router
            .route(r#"{"type":"response","id":1,"ok":true,"result":true}"#)
            .expect("route");
        assert_eq!(rx.try_recv().expect("answered"), Ok(Value::Bool(true)));
    }

    #[test]
    fn error_response_carries_reason() {
        let router = Router::new();
        let mut rx = reply_waiter(&router, 2);

        router
            .route(r#"{"type":"response","id":2,"ok":false,"error":"File not found: /x.pdf"}"#)
            .expect("route");
        assert_eq!(
            rx.try_recv().expect("answered"),
            Err("File not found: /x.pdf".to_string())
        );
    }

    #[test]
    fn submission_is_accepted_then_completed() {
        let router = Router::new();
        let (acc_tx, mut acc_rx) = oneshot::channel();
        let (done_tx, mut done_rx) = oneshot::channel();
        router.register(
            3,
            Waiter::Task {
                accepted: Some(acc_tx),
                done: done_tx,
            },
        ).expect("register");

        router
            .route(r#"{"type":"accepted","id":3,"task_id":"task-abc"}"#)
            .expect("route");
        assert_eq!(acc_rx.try_recv().expect("accepted"), Ok(TaskId::from("task-abc")));
        assert!(done_rx.try_recv().is_err());

        router
            .route(r#"{"type":"response","id":3,"ok":true,"result":"/out/book.epub"}"#)
            .expect("route");
        assert_eq!(done_rx.try_recv().expect("done"), Ok("/out/book.epub".to_string()));
    }

    #[test]
    fn rejection_before_acceptance_fails_submission() {
        let router = Router::new();
        let (acc_tx, mut acc_rx) = oneshot::channel();
        let (done_tx, _done_rx) = oneshot::channel();
        router.register(
            4,
            Waiter::Task {
                accepted: Some(acc_tx),
                done: done_tx,
            },
        ).expect("register");

        router
            .route(r#"{"type":"response","id":4,"ok":false,"error":"No files to merge"}"#)
            .expect("route");
        assert_eq!(
            acc_rx.try_recv().expect("answered"),
            Err("No files to merge".to_string())
        );
    }

    #[test]
    fn direct_completion_mints_task_id() {
        let router = Router::new();
        let (acc_tx, mut acc_rx) = oneshot::channel();
        let (done_tx, mut done_rx) = oneshot::channel();
        router.register(
            5,
            Waiter::Task {
                accepted: Some(acc_tx),
                done: done_tx,
            },
        ).expect("register");

        router
            .route(r#"{"type":"response","id":5,"ok":true,"result":"merged.pdf"}"#)
            .expect("route");
        assert_eq!(acc_rx.try_recv().expect("accepted"), Ok(TaskId::from("request-5")));
        assert_eq!(done_rx.try_recv().expect("done"), Ok("merged.pdf".to_string()));
    }

    #[test]
    fn progress_events_reach_subscribers() {
        let router = Router::new();
        let mut events = router.events.subscribe();

        router
            .route(
                r#"{"type":"event","channel":"conversion-progress","payload":{"task_id":"t1","percent":50,"stage":"building_structure","message":"Building document structure..."}}"#,
            )
            .expect("route");
        router
            .route(r#"{"type":"event","channel":"other","payload":{"task_id":"t1","percent":60,"stage":"x","message":""}}"#)
            .expect("route");

        let event = events.try_recv().expect("event");
        assert_eq!(event.percent, 50);
        assert_eq!(event.stage, "building_structure");
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn close_drops_pending_waiters() {
        let router = Router::new();
        let mut rx = reply_waiter(&router, 6);
        router.close();
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn malformed_line_is_protocol_error() {
        let router = Router::new();
        assert!(matches!(
            router.route("not json"),
            Err(FolioError::Protocol(_))
        ));
    }

    #[test]
    fn register_after_close_is_refused() {
        let router = Router::new();
        router.close();
        let (tx, _rx) = oneshot::channel();
        assert!(matches!(
            router.register(9, Waiter::Reply(tx)),
            Err(FolioError::Transport(_))
        ));
        assert!(router.waiters.lock().expect("waiters lock").is_empty());
    }
}
