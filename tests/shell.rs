//! Drives the real binary through a pipe. Without a terminal on stdin the
//! shell skips raw mode and reads the piped bytes directly.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Output, Stdio};
use std::thread;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

struct Session {
    child: Child,
    stdin: ChildStdin,
}

impl Session {
    fn start(dir: &Path) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_hsh"))
            .current_dir(dir)
            .env("HSH_LOG", "error")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn hsh");
        let stdin = child.stdin.take().unwrap();
        Session { child, stdin }
    }

    fn send(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).unwrap();
        self.stdin.flush().unwrap();
    }

    /// Writes keystrokes without pressing enter.
    fn type_keys(&mut self, keys: &str) {
        self.stdin.write_all(keys.as_bytes()).unwrap();
        self.stdin.flush().unwrap();
    }

    /// Sends `SIGINT` to the shell alone, as Ctrl-C would.
    fn interrupt(&self) {
        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGINT).unwrap();
    }

    fn finish(self) -> Output {
        drop(self.stdin);
        self.child.wait_with_output().unwrap()
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn redirection_writes_file_and_restores_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("echo hi > out.txt");
    shell.send("pwd");
    shell.send("exit");
    let output = shell.finish();

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hi\n");

    let stdout = text(&output.stdout);
    let cwd = dir.path().canonicalize().unwrap();
    assert!(stdout.contains(&format!("{}\n", cwd.display())));
    assert!(stdout.contains("Exiting shell. Goodbye."));
}

#[test]
fn redirect_to_unwritable_path_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("touch made-it > /does/not/exist/out.txt");
    shell.send("exit");
    let output = shell.finish();

    assert!(text(&output.stderr).contains("hsh: /does/not/exist/out.txt: "));
    assert!(!dir.path().join("made-it").exists());
}

#[test]
fn failed_cd_keeps_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("cd /does/not/exist");
    shell.send("pwd");
    shell.send("exit");
    let output = shell.finish();

    assert!(text(&output.stderr).contains("hsh: cd: /does/not/exist: "));
    let cwd = dir.path().canonicalize().unwrap();
    assert!(text(&output.stdout).contains(&format!("{}\n", cwd.display())));
}

#[test]
fn cd_changes_directory_for_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("cd sub");
    shell.send("/bin/pwd > where.txt");
    shell.send("exit");
    let output = shell.finish();

    assert!(output.status.success());
    let sub = dir.path().join("sub").canonicalize().unwrap();
    assert_eq!(
        fs::read_to_string(sub.join("where.txt")).unwrap(),
        format!("{}\n", sub.display())
    );
}

#[test]
fn background_job_is_announced_reaped_and_number_reused() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("sleep 0.2 &");
    thread::sleep(Duration::from_millis(1500));
    shell.send("sleep 1&");
    shell.send("jobs");
    shell.send("exit");
    let output = shell.finish();

    let stdout = text(&output.stdout);
    assert!(stdout.contains("[1]\tdone\tsleep 0.2"), "stdout: {stdout:?}");
    assert_eq!(stdout.matches("[1] ").count(), 2, "stdout: {stdout:?}");
    assert!(stdout.contains("[1]\trunning\tsleep 1\n"));
}

#[test]
fn jobs_are_listed_by_number() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("sleep 1 &");
    shell.send("sleep 0.5 &");
    shell.send("jobs");
    shell.send("exit");
    let output = shell.finish();

    assert!(text(&output.stdout).contains("[1]\trunning\tsleep 1\n[2]\trunning\tsleep 0.5\n"));
}

#[test]
fn failing_background_job_reports_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("hsh-no-such-command &");
    thread::sleep(Duration::from_millis(800));
    shell.send("exit");
    let output = shell.finish();

    assert!(text(&output.stdout).contains("[1]\texit 1\thsh-no-such-command"));
}

#[test]
fn unknown_foreground_command_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("hsh-no-such-command");
    shell.send("exit");
    let output = shell.finish();

    assert!(output.status.success());
    assert!(text(&output.stderr).contains("hsh: hsh-no-such-command: "));
}

#[test]
fn end_of_input_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("pwd");
    let output = shell.finish();

    assert!(output.status.success());
    assert!(text(&output.stdout).contains("Exiting shell. Goodbye."));
}

#[test]
fn history_builtin_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.send("pwd");
    shell.send("");
    shell.send("history");
    shell.send("exit");
    let output = shell.finish();

    let stdout = text(&output.stdout);
    assert!(stdout.contains("    1  pwd\n    2  history\n"), "stdout: {stdout:?}");
}

#[test]
fn ctrl_c_discards_the_partial_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    shell.type_keys("ech");
    thread::sleep(Duration::from_millis(500));
    shell.interrupt();
    thread::sleep(Duration::from_millis(300));
    shell.send("pwd");
    shell.send("exit");
    let output = shell.finish();

    assert!(output.status.success());
    let stderr = text(&output.stderr);
    assert!(!stderr.contains("echpwd"), "stderr: {stderr:?}");
    let cwd = dir.path().canonicalize().unwrap();
    assert!(text(&output.stdout).contains(&format!("{}\n", cwd.display())));
}

#[test]
fn ctrl_c_during_foreground_command_draws_one_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = Session::start(dir.path());
    thread::sleep(Duration::from_millis(300));
    shell.send("sleep 1");
    thread::sleep(Duration::from_millis(300));
    shell.interrupt();
    thread::sleep(Duration::from_millis(1200));
    shell.send("exit");
    let output = shell.finish();

    assert!(output.status.success());
    let stdout = text(&output.stdout);
    // the first prompt, then a single redraw after the interrupted command
    assert_eq!(stdout.matches("hsh>").count(), 2, "stdout: {stdout:?}");
}
