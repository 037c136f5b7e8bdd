//! Launches the CH+ interpreter on a saved script and reports back as console text.
//! （以外部直譯器執行已儲存的腳本，並將結果轉為輸出區文字。）
//!
//! The command line is `[interpreter, "-p"?, script]`. Output is captured on
//! reader threads while the child is polled, so a chatty script cannot stall on
//! a full pipe. [`spawn`] moves the whole run onto a worker thread and hands back
//! a [`RunHandle`] the caller can poll without blocking.
//! 命令列為 `[直譯器, "-p"?, 腳本]`；[`spawn`] 在背景執行緒中執行，呼叫端可非阻塞輪詢。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 預設直譯器名稱。 / Default interpreter executable name.
pub const DEFAULT_INTERPRETER: &str = "chplus";

/// 執行結束後暫停的旗標。 / Flag asking the interpreter to pause before exiting.
pub const PAUSE_FLAG: &str = "-p";

const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Errors that may surface while preparing or executing a run.
/// （準備或執行腳本時可能發生的錯誤。）
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no script is open")]
    NoScript,
    #[error("script {0} does not exist")]
    MissingScript(PathBuf),
    #[error("failed to spawn process: {0}")]
    Spawn(io::Error),
    #[error("failed to read process output: {0}")]
    Output(io::Error),
    #[error("failed to poll process status: {0}")]
    Poll(io::Error),
    #[error("process timed out after {0:?}")]
    TimedOut(Duration),
    #[error("failed to terminate process: {0}")]
    Kill(io::Error),
    #[error("run worker stopped before reporting")]
    WorkerLost,
}

impl RunError {
    /// 顯示在輸出區的訊息。 / Message shown in the output console.
    pub fn console_message(&self) -> String {
        match self {
            RunError::NoScript => "错误：没有打开的文件".to_string(),
            other => format!("运行错误: {other}"),
        }
    }
}

/// Serializable description of one interpreter run.
/// （一次直譯器執行的可序列化設定。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub interpreter: String,
    #[serde(default)]
    pub script: Option<PathBuf>,
    #[serde(default = "default_pause_on_exit")]
    pub pause_on_exit: bool,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_pause_on_exit() -> bool {
    true
}

impl Default for RunRequest {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER)
    }
}

impl RunRequest {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: None,
            pause_on_exit: true,
            working_dir: None,
            env: BTreeMap::new(),
            timeout_ms: None,
        }
    }

    /// 設定要執行的腳本。 / Sets the script to run.
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_pause_on_exit(mut self, pause: bool) -> Self {
        self.pause_on_exit = pause;
        self
    }

    /// 設定工作目錄；未設定時使用腳本所在目錄。 / Working directory; defaults to the script's directory.
    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_millis().clamp(1, u128::from(u64::MAX)) as u64;
        self.timeout_ms = Some(millis);
        self
    }

    /// 組出完整命令列。 / Full argv, interpreter first.
    pub fn command_line(&self) -> Result<Vec<String>, RunError> {
        let script = self.script.as_ref().ok_or(RunError::NoScript)?;
        let mut argv = vec![self.interpreter.clone()];
        if self.pause_on_exit {
            argv.push(PAUSE_FLAG.to_string());
        }
        argv.push(script.display().to_string());
        Ok(argv)
    }

    fn resolved_working_dir(&self, script: &Path) -> Option<PathBuf> {
        self.working_dir.clone().or_else(|| {
            script
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
    }
}

/// Captured result of a finished run.
/// （執行完成後擷取的結果。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u128,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// 依序產生輸出區文字。 / Console lines: stdout, then stderr, then the exit code.
    pub fn console_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.stdout.is_empty() {
            lines.push(self.stdout.clone());
        }
        if !self.stderr.is_empty() {
            lines.push(format!("错误: {}", self.stderr));
        }
        let code = self
            .exit_code
            .map_or_else(|| "未知".to_string(), |code| code.to_string());
        lines.push(format!("进程退出码: {code}"));
        lines
    }
}

/// 將執行結果（含失敗）轉為輸出區文字。 / Turns any run result, failures included, into console lines.
pub fn console_report(result: &Result<RunOutcome, RunError>) -> Vec<String> {
    match result {
        Ok(outcome) => outcome.console_lines(),
        Err(err) => vec![err.console_message()],
    }
}

/// 同步執行並擷取輸出。 / Runs the request to completion on the calling thread.
pub fn run_blocking(request: &RunRequest) -> Result<RunOutcome, RunError> {
    let argv = request.command_line()?;
    let script = request.script.as_deref().ok_or(RunError::NoScript)?;
    if !script.exists() {
        return Err(RunError::MissingScript(script.to_path_buf()));
    }

    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in &request.env {
        command.env(key, value);
    }
    if let Some(dir) = request.resolved_working_dir(script) {
        command.current_dir(dir);
    }

    info!(interpreter = %request.interpreter, script = %script.display(), "launching interpreter");
    let start = Instant::now();
    let mut child = command.spawn().map_err(RunError::Spawn)?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_timeout(&mut child, request.timeout_ms.map(Duration::from_millis), start)?;
    let stdout = collect(stdout)?;
    let stderr = collect(stderr)?;
    let duration = start.elapsed();
    debug!(code = ?status.code(), elapsed_ms = duration.as_millis(), "interpreter exited");

    Ok(RunOutcome {
        exit_code: status.code(),
        stdout,
        stderr,
        duration_ms: duration.as_millis(),
    })
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
    start: Instant,
) -> Result<std::process::ExitStatus, RunError> {
    let Some(timeout) = timeout else {
        return child.wait().map_err(RunError::Poll);
    };
    loop {
        if let Some(status) = child.try_wait().map_err(RunError::Poll)? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            warn!(?timeout, "interpreter timed out, killing it");
            child.kill().map_err(RunError::Kill)?;
            child.wait().map_err(RunError::Poll)?;
            return Err(RunError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

type Drain = Option<JoinHandle<io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            pipe.read_to_end(&mut buffer)?;
            Ok(buffer)
        })
    })
}

fn collect(handle: Drain) -> Result<String, RunError> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| RunError::Output(io::Error::other("output reader panicked")))?
        .map_err(RunError::Output)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// 背景執行中的工作。 / A run in progress on a worker thread.
#[derive(Debug)]
pub struct RunHandle {
    receiver: Receiver<Result<RunOutcome, RunError>>,
    worker: Option<JoinHandle<()>>,
    finished: Option<Result<RunOutcome, RunError>>,
}

/// 在背景執行緒啟動直譯器。 / Starts the run on a worker thread and returns immediately.
pub fn spawn(request: RunRequest) -> RunHandle {
    let (sender, receiver) = mpsc::channel();
    let worker = thread::spawn(move || {
        let result = run_blocking(&request);
        if sender.send(result).is_err() {
            debug!("run handle dropped before the interpreter finished");
        }
    });
    RunHandle {
        receiver,
        worker: Some(worker),
        finished: None,
    }
}

impl RunHandle {
    /// 非阻塞查詢結果。 / Returns the result once available, never blocking.
    pub fn try_outcome(&mut self) -> Option<&Result<RunOutcome, RunError>> {
        if self.finished.is_none() {
            match self.receiver.try_recv() {
                Ok(result) => self.finish(result),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.finish(Err(RunError::WorkerLost)),
            }
        }
        self.finished.as_ref()
    }

    /// 等待結束。 / Blocks until the run finishes.
    pub fn wait(mut self) -> Result<RunOutcome, RunError> {
        if let Some(result) = self.finished.take() {
            return result;
        }
        let result = self.receiver.recv().unwrap_or(Err(RunError::WorkerLost));
        self.join_worker();
        result
    }

    fn finish(&mut self, result: Result<RunOutcome, RunError>) {
        self.finished = Some(result);
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("run worker panicked");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("script should be written / 腳本應可寫入");
        path
    }

    #[test]
    fn command_line_includes_pause_flag() {
        let request = RunRequest::new("chplus").with_script("demo.ch");
        assert_eq!(request.command_line().unwrap(), ["chplus", "-p", "demo.ch"]);
        let request = request.with_pause_on_exit(false);
        assert_eq!(request.command_line().unwrap(), ["chplus", "demo.ch"]);
        assert!(matches!(
            RunRequest::new("chplus").command_line(),
            Err(RunError::NoScript)
        ));
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        let temp = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let path = script(temp.path(), "hello.sh", "printf '你好\\n'\n");
        let request = RunRequest::new("bash").with_script(&path);

        let outcome = run_blocking(&request).expect("run should succeed / 執行應成功");
        assert!(outcome.success());
        assert_eq!(outcome.console_lines(), ["你好\n", "进程退出码: 0"]);
    }

    #[test]
    fn reports_stderr_and_failure_code() {
        let temp = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let path = script(temp.path(), "fail.sh", "echo oops >&2\nexit 3\n");
        let outcome = run_blocking(&RunRequest::new("bash").with_script(&path)).unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.console_lines(), ["错误: oops\n", "进程退出码: 3"]);
    }

    #[test]
    fn runs_in_script_directory_by_default() {
        let temp = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let path = script(temp.path(), "pwd.sh", "pwd\n");
        let outcome = run_blocking(&RunRequest::new("bash").with_script(&path)).unwrap();
        let expected = temp.path().canonicalize().unwrap();
        let reported = PathBuf::from(outcome.stdout.trim_end()).canonicalize().unwrap();
        assert_eq!(reported, expected);
    }

    #[test]
    fn explicit_working_dir_wins() {
        let temp = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let elsewhere = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let path = script(temp.path(), "pwd.sh", "pwd\n");
        let request = RunRequest::new("bash")
            .with_script(&path)
            .with_working_dir(elsewhere.path());
        let outcome = run_blocking(&request).unwrap();
        let reported = PathBuf::from(outcome.stdout.trim_end()).canonicalize().unwrap();
        assert_eq!(reported, elsewhere.path().canonicalize().unwrap());
    }

    #[test]
    fn failures_become_console_messages() {
        let missing = run_blocking(&RunRequest::new("bash").with_script("/nonexistent/x.ch"));
        assert!(matches!(missing, Err(RunError::MissingScript(_))));

        let no_script = run_blocking(&RunRequest::new("bash"));
        assert_eq!(console_report(&no_script), ["错误：没有打开的文件"]);

        let temp = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let path = script(temp.path(), "a.ch", "");
        let spawn_error = run_blocking(&RunRequest::new("chplus-missing-binary").with_script(&path));
        let lines = console_report(&spawn_error);
        assert!(lines[0].starts_with("运行错误: "), "{lines:?}");
    }

    #[test]
    fn timeout_kills_the_interpreter() {
        let temp = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let path = script(temp.path(), "slow.sh", "exec sleep 5\n");
        let request = RunRequest::new("bash")
            .with_script(&path)
            .with_timeout(Duration::from_millis(100));
        let started = Instant::now();
        assert!(matches!(run_blocking(&request), Err(RunError::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn spawned_run_is_polled_without_blocking() {
        let temp = tempdir().expect("tempdir should work / 臨時目錄應可建立");
        let path = script(temp.path(), "env.sh", "printf '%s' \"$CHPLUS_TEST\"\n");
        let request = RunRequest::new("bash")
            .with_script(&path)
            .with_env("CHPLUS_TEST", "done");

        let mut handle = spawn(request);
        let deadline = Instant::now() + Duration::from_secs(10);
        while handle.try_outcome().is_none() {
            assert!(Instant::now() < deadline, "run should finish / 執行應結束");
            thread::sleep(Duration::from_millis(10));
        }
        let outcome = handle.wait().expect("run should succeed / 執行應成功");
        assert_eq!(outcome.stdout, "done");
    }
}
