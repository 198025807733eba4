use crate::ipc::{IpcCommand, IpcResponse, get_socket_path};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// Send a command to the daemon and get the response
pub fn send_command(command: IpcCommand) -> Result<IpcResponse> {
    send_command_to(&get_socket_path()?, command)
}

fn send_command_to(socket_path: &Path, command: IpcCommand) -> Result<IpcResponse> {
    let mut stream = UnixStream::connect(socket_path).with_context(|| {
        format!(
            "Failed to connect to daemon at {}. Is the daemon running?",
            socket_path.display()
        )
    })?;

    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.set_write_timeout(Some(Duration::from_secs(5)))?;

    writeln!(stream, "{}", command)?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    serde_json::from_str(&response_line).context("Failed to parse daemon response")
}

/// Human-readable report of a response, `Err` when the daemon refused.
fn report(response: IpcResponse) -> std::result::Result<Option<String>, String> {
    match response {
        IpcResponse::Ok => Ok(None),
        IpcResponse::Status {
            enabled,
            switching,
            scope,
            window_count,
            current_index,
        } => {
            let mut lines = vec![
                "Daemon Status:".to_string(),
                format!("  Enabled: {}", enabled),
                format!("  Switching: {}", switching),
            ];
            if switching {
                if let Some(scope) = scope {
                    lines.push(format!("  Scope: {:?}", scope));
                }
                lines.push(format!("  Window count: {}", window_count));
                if let Some(idx) = current_index {
                    lines.push(format!("  Current index: {}", idx));
                }
            }
            Ok(Some(lines.join("\n")))
        }
        IpcResponse::Error(e) => Err(e),
    }
}

/// Send command and print result, exit with appropriate code
pub fn send_command_and_exit(command: IpcCommand) -> ! {
    let outcome = send_command(command)
        .map_err(|e| e.to_string())
        .and_then(report);

    match outcome {
        Ok(Some(text)) => {
            println!("{}", text);
            std::process::exit(0);
        }
        Ok(None) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
