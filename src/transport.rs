//! JSON-lines request loop connecting a UI process to the [`Dispatcher`].
//!
//! Requests are read one per line. A conversion is registered with the
//! dispatcher before the next line is read, then awaited on a spawned task so
//! the loop keeps accepting cancels while it is in flight. All output goes
//! through a single writer task, one JSON document per line.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use mc_av::ToolRegistry;
use mc_convert::{ConversionFuture, ConversionJob, Dispatcher, ProgressSink};
use mc_core::{Error, JobId, Notification};

use crate::protocol::{Call, Outbound, Request, Response};

/// Shared state of one transport session.
#[derive(Clone)]
struct Session {
    dispatcher: Arc<Dispatcher>,
    tools: Arc<ToolRegistry>,
    out: mpsc::UnboundedSender<Outbound>,
}

impl Session {
    fn send(&self, message: impl Into<Outbound>) {
        // The writer only goes away once the session is over.
        let _ = self.out.send(message.into());
    }

    fn notify_cancelled(&self, ids: impl IntoIterator<Item = JobId>) {
        for id in ids {
            self.send(Notification::Cancelled { id });
        }
    }

    fn progress_sink(&self) -> ProgressSink {
        let out = self.out.clone();
        ProgressSink::new(move |id, progress| {
            let _ = out.send(Outbound::Notification(Notification::Progress {
                id: id.clone(),
                progress,
            }));
        })
    }

    /// Register `job` with the dispatcher, returning the running conversion.
    fn start(&self, job: ConversionJob) -> ConversionFuture {
        self.dispatcher.start(job, self.progress_sink())
    }

    async fn respond(self, seq: Option<u64>, conversion: ConversionFuture) {
        let result = conversion.await;
        self.send(Response::from_result(seq, &result));
    }

    fn cancel_item(&self, seq: Option<u64>, id: JobId) {
        let cancelled = self.dispatcher.cancel(&id);
        self.send(Response::ok(seq, cancelled));
        if cancelled {
            self.notify_cancelled([id]);
        }
    }

    fn cancel_all(&self, seq: Option<u64>) {
        let ids = self.dispatcher.cancel_all();
        self.send(Response::ok(seq, true));
        self.notify_cancelled(ids);
    }

    async fn tools(self, seq: Option<u64>) {
        let info = self.tools.check_all().await;
        self.send(Response::ok(seq, info));
    }
}

/// Serve requests from `reader` until EOF, writing replies to `writer`.
///
/// On EOF every running job is cancelled and the function returns once all
/// outstanding responses have been written.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    dispatcher: Arc<Dispatcher>,
    tools: Arc<ToolRegistry>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out, rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_lines(writer, rx));

    let session = Session { dispatcher, tools, out };
    let mut tasks = JoinSet::new();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut read_error = None;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Failed to read request: {e}");
                read_error = Some(e);
                break;
            }
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim_end_matches(['\n', '\r']),
            Err(e) => {
                tracing::warn!("Rejected request line: {e}");
                session.send(Response::error(
                    None,
                    &Error::Validation(format!("request is not valid UTF-8: {e}")),
                ));
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        // Reap finished tasks so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}

        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Rejected request line: {e}");
                session.send(Response::error(Request::recover_seq(line), &e));
                continue;
            }
        };
        let seq = request.seq;
        let method = request.method.clone();

        let call = match request.into_call() {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(method = %method, "Rejected request: {e}");
                session.send(Response::error(seq, &e));
                continue;
            }
        };
        tracing::debug!(method = %method, seq = ?seq, "Request");

        match call {
            Call::Convert(job) => {
                let conversion = session.start(job);
                tasks.spawn(session.clone().respond(seq, conversion));
            }
            Call::CancelItem(id) => session.cancel_item(seq, id),
            Call::CancelAll => session.cancel_all(seq),
            Call::Formats(kind) => session.send(Response::ok(seq, kind.formats())),
            Call::Tools => {
                tasks.spawn(session.clone().tools(seq));
            }
        }
    }

    tracing::info!("Input closed; cancelling running jobs");
    session.notify_cancelled(session.dispatcher.cancel_all());
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Request task failed: {e}");
        }
    }
    drop(session);

    let written = match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::other(e)),
    };
    match read_error {
        Some(e) => Err(e),
        None => written,
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Outbound>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        if let Outbound::Notification(notification) = &message {
            tracing::trace!(job_id = %notification.job_id(), "Notification: {notification:?}");
        }
        let mut line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to encode outbound message: {e}");
                continue;
            }
        };
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
