use crate::actors::coordinator::messages::CoordinatorMessage;
use crate::events::{JobOutcome, Output};
use crate::types::JobId;

use bytes::BytesMut;
use std::os::unix::process::ExitStatusExt;
use tokio::{io::AsyncReadExt, process::Child, sync::mpsc, task::JoinHandle};

pub struct Actor;

impl Actor {
    /// Watch one subprocess: pipe its output to the job log, wait for it to
    /// exit, then report the outcome to the coordinator exactly once.
    pub fn spawn(
        job_id: JobId,
        mut child: Child,
        output_tx: mpsc::UnboundedSender<Output>,
        log_writer: JoinHandle<()>,
        completion_tx: mpsc::Sender<CoordinatorMessage>,
    ) {
        tokio::spawn(async move {
            let maybe_stdout = child.stdout.take();
            let maybe_stderr = child.stderr.take();

            // pipe stdout to the log writer
            let stdout_task = maybe_stdout.map(|mut stdout| {
                let stdout_tx = output_tx.clone();
                tokio::spawn(async move {
                    let mut buf = BytesMut::with_capacity(4096);
                    loop {
                        match stdout.read_buf(&mut buf).await {
                            Ok(n) if n > 0 => {
                                // move the bytes out of buf and into a message
                                let msg = Output::Stdout(buf.split().freeze());
                                let _ = stdout_tx.send(msg);
                            }
                            _ => break,
                        }
                    }
                })
            });

            // pipe stderr to the log writer
            let stderr_task = maybe_stderr.map(|mut stderr| {
                let stderr_tx = output_tx.clone();
                tokio::spawn(async move {
                    let mut buf = BytesMut::with_capacity(4096);
                    loop {
                        match stderr.read_buf(&mut buf).await {
                            Ok(n) if n > 0 => {
                                let msg = Output::Stderr(buf.split().freeze());
                                let _ = stderr_tx.send(msg);
                            }
                            _ => break,
                        }
                    }
                })
            });
            drop(output_tx);

            let outcome = match child.wait().await {
                Ok(exit_status) => {
                    if let Some(code) = exit_status.code() {
                        JobOutcome::Exited { code }
                    } else if let Some(signal) = exit_status.signal() {
                        JobOutcome::Killed { signal }
                    } else {
                        unreachable!()
                    }
                }
                Err(e) => JobOutcome::SpawnFailed {
                    reason: e.to_string(),
                },
            };

            // let the pipes drain and the log land before reporting
            // completion, so finalize appends after the last output chunk
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }
            let _ = log_writer.await;

            let _ = completion_tx
                .send(CoordinatorMessage::Finished { job_id, outcome })
                .await;
        });
    }
}
