//! External tool resolution and subprocess execution (§5, §6). `ffmpeg`,
//! `ffprobe`, `yt-dlp`, and `tesseract` are invoked as subprocesses with a
//! bounded timeout; on cancellation or timeout the child is killed rather
//! than left to run to completion.

use std::process::Stdio;
use std::time::Duration;
use summarize_core::{Error, Result, RuntimeContext};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub yt_dlp: String,
    pub tesseract: String,
}

impl ToolPaths {
    pub fn from_runtime(rt: &RuntimeContext) -> Self {
        Self {
            ffmpeg: rt.get_owned("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe: rt.get_owned("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            yt_dlp: rt.get_owned("YT_DLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
            tesseract: rt.get_owned("TESSERACT_PATH").unwrap_or_else(|| "tesseract".to_string()),
        }
    }
}

pub struct CommandOutput {
    pub status_ok: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Run `program args...` to completion, killing it if it outruns
/// `timeout`. Stdout is captured as raw bytes (frame-hash and frame-pipe
/// callers need this); stderr is captured as text (ffmpeg's `-stats`
/// output and `showinfo`/`signalstats` filters log there).
pub async fn run(program: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| Error::SlideExtraction(format!("failed to spawn {program}: {e}")))?;

    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");

    let read_all = async {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut stdout).await;
        let _ = stderr_pipe.read_to_end(&mut stderr).await;
        (stdout, stderr)
    };

    let result = tokio::time::timeout(timeout, async {
        let (stdout, stderr) = read_all.await;
        let status = child.wait().await;
        (status, stdout, stderr)
    })
    .await;

    match result {
        Ok((status, stdout, stderr)) => {
            let status_ok = status.map(|s| s.success()).unwrap_or(false);
            Ok(CommandOutput { status_ok, stdout, stderr: String::from_utf8_lossy(&stderr).to_string() })
        }
        Err(_) => {
            let _ = child.kill().await;
            Err(Error::Timeout(timeout))
        }
    }
}
