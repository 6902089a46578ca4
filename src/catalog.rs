use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::domain::{FileId, NamePattern};
use crate::error::InputsError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub dx: Option<String>,
    pub dx_version: Option<String>,
}

/// One `dx find data` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub label: String,
    pub name: NamePattern,
    pub path: String,
}

impl CatalogQuery {
    pub fn new(label: impl Into<String>, name: NamePattern, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name,
            path: path.into(),
        }
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "find".to_string(),
            "data".to_string(),
            "--name".to_string(),
            self.name.as_str().to_string(),
            "--path".to_string(),
            self.path.clone(),
            "--brief".to_string(),
        ]
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} in {})", self.label, self.name, self.path)
    }
}

pub trait CatalogClient {
    /// Identifiers in the order the catalog printed them.
    fn find(&self, query: &CatalogQuery) -> Result<Vec<FileId>, InputsError>;
    fn tool_info(&self) -> ToolInfo;
}

#[derive(Debug, Clone)]
pub enum DxToolStatus {
    Ready,
    Missing { message: String },
}

#[derive(Debug, Clone)]
pub struct DxCatalogClient {
    dx: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl DxCatalogClient {
    pub fn new() -> Self {
        Self {
            dx: find_in_path("dx"),
            timeout: None,
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            dx: Some(program.into()),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tool_status(&self) -> DxToolStatus {
        match self.dx {
            Some(_) => DxToolStatus::Ready,
            None => DxToolStatus::Missing {
                message: "missing dx (DNAnexus dx-toolkit)".to_string(),
            },
        }
    }

    /// Name of the logged-in platform user.
    pub fn whoami(&self) -> Result<String, InputsError> {
        let dx = self.require_dx()?;
        let args = vec!["whoami".to_string()];
        match self.run_cmd(dx, &args, "dx whoami") {
            Ok(stdout) => Ok(stdout.trim().to_string()),
            Err(InputsError::QueryFailed { message, .. }) => {
                Err(InputsError::NotLoggedIn(message))
            }
            Err(err) => Err(err),
        }
    }

    fn require_dx(&self) -> Result<&Path, InputsError> {
        self.dx
            .as_deref()
            .ok_or_else(|| InputsError::MissingTool("dx".to_string()))
    }

    fn run_cmd(&self, program: &Path, args: &[String], query: &str) -> Result<String, InputsError> {
        debug!(program = %program.display(), args = ?args, "running catalog command");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| InputsError::QueryLaunch {
                query: query.to_string(),
                message: err.to_string(),
            })?;

        let started = Instant::now();
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => wait_with_deadline(&mut child, started, limit, query)?,
            None => child.wait().map_err(|err| InputsError::QueryLaunch {
                query: query.to_string(),
                message: err.to_string(),
            })?,
        };

        // A grandchild of dx can keep the pipes open after dx exits; the
        // timeout covers draining them too. Readers left behind on timeout
        // finish once the last writer closes the pipe.
        let stdout = collect_pipe(&stdout, started, self.timeout, query)?;
        let stderr = collect_pipe(&stderr, started, self.timeout, query)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("command failed: {}", program.display())
            } else {
                stderr
            };
            return Err(InputsError::QueryFailed {
                query: query.to_string(),
                status: status.to_string(),
                message,
            });
        }

        String::from_utf8(stdout).map_err(|_| InputsError::MalformedOutput {
            query: query.to_string(),
            message: "output is not valid UTF-8".to_string(),
        })
    }
}

impl Default for DxCatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient for DxCatalogClient {
    fn find(&self, query: &CatalogQuery) -> Result<Vec<FileId>, InputsError> {
        let dx = self.require_dx()?;
        let label = query.to_string();
        let stdout = self.run_cmd(dx, &query.args(), &label)?;
        parse_brief_output(&stdout).map_err(|message| InputsError::MalformedOutput {
            query: label,
            message,
        })
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            dx: self.dx.as_ref().map(|path| path.display().to_string()),
            dx_version: self
                .dx
                .as_ref()
                .and_then(|path| tool_version(path, &["--version"])),
        }
    }
}

/// One identifier per non-blank line.
pub fn parse_brief_output(stdout: &str) -> Result<Vec<FileId>, String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<FileId>()
                .map_err(|_| format!("unexpected line: {line:?}"))
        })
        .collect()
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

fn collect_pipe(
    rx: &Receiver<Vec<u8>>,
    started: Instant,
    limit: Option<Duration>,
    query: &str,
) -> Result<Vec<u8>, InputsError> {
    let Some(limit) = limit else {
        return Ok(rx.recv().unwrap_or_default());
    };
    match rx.recv_timeout(limit.saturating_sub(started.elapsed())) {
        Ok(buf) => Ok(buf),
        Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
        Err(RecvTimeoutError::Timeout) => Err(InputsError::QueryTimeout {
            query: query.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}

fn wait_with_deadline(
    child: &mut Child,
    started: Instant,
    limit: Duration,
    query: &str,
) -> Result<ExitStatus, InputsError> {
    loop {
        let polled = child.try_wait().map_err(|err| InputsError::QueryLaunch {
            query: query.to_string(),
            message: err.to_string(),
        })?;
        if let Some(status) = polled {
            return Ok(status);
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Err(InputsError::QueryTimeout {
                query: query.to_string(),
                seconds: limit.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() { None } else { Some(stdout) }
}
