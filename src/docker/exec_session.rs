// ABOUTME: Interactive exec sessions inside running containers via Docker's exec API
// Creates a TTY exec, hijacks its stream, and exposes resize through the exec id

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, ResizeExecOptions, StartExecOptions, StartExecResults};
use bollard::Docker;
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::{debug, info};

use crate::runtime::{ContainerError, ShellRequest, ShellStream, TerminalResizer};
use crate::terminal::protocol::TerminalSize;

pub async fn start_shell(
    docker: &Docker,
    container_id: &str,
    request: &ShellRequest,
) -> Result<ShellStream, ContainerError> {
    let exec = docker
        .create_exec(
            container_id,
            CreateExecOptions {
                attach_stdin: Some(true),
                attach_stdout: Some(true),
                attach_stderr: Some(true),
                tty: Some(request.tty),
                env: Some(request.env.clone()),
                cmd: Some(request.command.clone()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| exec_error(container_id, e))?;

    info!("Created exec {} in container {}", exec.id, container_id);

    let started = docker
        .start_exec(
            &exec.id,
            Some(StartExecOptions {
                detach: false,
                tty: request.tty,
                ..Default::default()
            }),
        )
        .await?;

    let StartExecResults::Attached { output, input } = started else {
        return Err(ContainerError::OperationFailed(format!(
            "exec {} started detached",
            exec.id
        )));
    };

    let exec_id = exec.id.clone();
    let output = async_stream::stream! {
        let mut output = output;
        while let Some(item) = output.next().await {
            match item {
                Ok(log) => yield Ok(log_bytes(log)),
                Err(e) => {
                    yield Err(ContainerError::Connection(e));
                    break;
                }
            }
        }
        debug!("Exec {} output ended", exec_id);
    };

    Ok(ShellStream {
        output: Box::pin(output),
        input,
        resizer: Box::new(ExecResizer {
            docker: docker.clone(),
            exec_id: exec.id,
        }),
    })
}

/// A 404 from the exec endpoint means the container is gone.
fn exec_error(container_id: &str, err: bollard::errors::Error) -> ContainerError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => ContainerError::NotFound(container_id.to_string()),
        other => ContainerError::Connection(other),
    }
}

fn log_bytes(log: LogOutput) -> Bytes {
    match log {
        LogOutput::StdOut { message }
        | LogOutput::StdErr { message }
        | LogOutput::StdIn { message }
        | LogOutput::Console { message } => message,
    }
}

pub struct ExecResizer {
    docker: Docker,
    exec_id: String,
}

#[async_trait]
impl TerminalResizer for ExecResizer {
    async fn resize(&self, size: TerminalSize) -> Result<(), ContainerError> {
        self.docker
            .resize_exec(
                &self.exec_id,
                ResizeExecOptions {
                    height: size.rows,
                    width: size.cols,
                },
            )
            .await?;
        debug!("Resized exec {} to {}", self.exec_id, size);
        Ok(())
    }
}
