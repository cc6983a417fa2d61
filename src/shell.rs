use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossterm::{
    cursor, queue,
    terminal::{self, ClearType},
};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use tracing::{debug, warn};

use crate::command::{tokenize, Builtin, Flow};
use crate::config::Config;
use crate::editor::{Edit, KeyDecoder, LineEditor};
use crate::error::{Result, ShellError};
use crate::history::History;
use crate::input::{Input, InputReader};
use crate::jobs::{Finished, JobTable};
use crate::launcher::{self, Launched, Mode};
use crate::prompt::Prompt;
use crate::redirects::{Redirection, StdioGuard};
use crate::signal_handler::SignalBridge;

/// All interpreter state, driven by [`Shell::run`] on a single thread.
pub struct Shell {
    prompt: Prompt,
    history: History,
    editor: LineEditor,
    decoder: KeyDecoder,
    reader: InputReader,
    signals: SignalBridge,
    jobs: Mutex<JobTable>,
    prompt_shown: bool,
}

impl Shell {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            prompt: Prompt::new(),
            history: History::new(config.history_size),
            editor: LineEditor::new(),
            decoder: KeyDecoder::new(),
            reader: InputReader::new(),
            signals: SignalBridge::install()?,
            jobs: Mutex::new(JobTable::new()),
            prompt_shown: false,
        })
    }

    fn jobs(&self) -> MutexGuard<'_, JobTable> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs until `exit` or end of input. Errors are input failures only;
    /// command failures are reported and the loop carries on.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if !self.prompt_shown {
                self.show_prompt()?;
            }

            match self.reader.read(self.signals.wake_fd())? {
                Input::Woken => self.service_signals()?,
                Input::Closed => return self.exit(),
                Input::Byte(byte) => {
                    let Some(key) = self.decoder.feed(byte) else {
                        continue;
                    };
                    let mut stdout = io::stdout();
                    match self.editor.handle(key, &mut self.history, &mut stdout)? {
                        Edit::Pending => {}
                        Edit::Submit(line) => {
                            self.prompt_shown = false;
                            if self.execute(&line) == Flow::Exit {
                                return Ok(());
                            }
                            // a Ctrl-C that hit the foreground child redraws
                            // the prompt itself, so handle it before the loop does
                            self.service_signals()?;
                        }
                        Edit::Exit => return self.exit(),
                    }
                }
            }
        }
    }

    fn show_prompt(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{}{}", self.prompt.get_string(), self.editor.buffer())?;
        stdout.flush()?;
        self.prompt_shown = true;
        Ok(())
    }

    fn exit(&mut self) -> Result<()> {
        let jobs = self.jobs();
        Builtin::Exit.execute(&mut io::stdout(), &jobs, &self.history)?;
        Ok(())
    }

    fn execute(&mut self, line: &str) -> Flow {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return Flow::Continue;
        }
        debug!(?tokens, "dispatching");

        let result = match Builtin::parse(&tokens) {
            Some(Ok(builtin)) => {
                let jobs = self.jobs();
                builtin.execute(&mut io::stdout(), &jobs, &self.history)
            }
            Some(Err(e)) => Err(e),
            None => self.run_external(tokens).map(|()| Flow::Continue),
        };

        match result {
            Ok(flow) => flow,
            Err(e) => {
                report(&e);
                Flow::Continue
            }
        }
    }

    fn run_external(&mut self, tokens: Vec<String>) -> Result<()> {
        let redirection = Redirection::extract(tokens)?;

        let launched = {
            let stdio = StdioGuard::redirect(redirection.output.as_deref())?;
            let mode = if redirection.background {
                Mode::Background {
                    keep_stdout: stdio.is_redirected(),
                }
            } else {
                Mode::Foreground
            };
            launcher::launch(&redirection.argv, mode, &self.jobs)?
        };

        match launched {
            Launched::Foreground(status) => debug!(?status, "foreground command returned"),
            Launched::Background { number, pid } => println!("[{}] {}", number, pid),
        }
        Ok(())
    }

    fn service_signals(&mut self) -> Result<()> {
        let pending = self.signals.take();
        if pending.is_empty() {
            return Ok(());
        }
        debug!(?pending, "servicing signals");

        if pending.interrupts > 0 {
            self.editor.discard(&mut self.history);
            self.decoder.reset();
            println!();
            // the interrupt path owns the redraw; the loop must not repeat it
            self.show_prompt()?;
        }

        if pending.child_exits > 0 {
            let finished = self.reap_children();
            self.report_finished(&finished)?;
        }
        Ok(())
    }

    /// Collects every exited child without blocking. Children that are not
    /// background jobs are dropped silently.
    fn reap_children(&mut self) -> Vec<Finished> {
        let mut finished = Vec::new();
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => {
                    if let Some(done) = self.jobs().complete(status) {
                        finished.push(done);
                    } else {
                        debug!(?status, "reaped untracked child");
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    warn!(error = %e, "waitpid failed while reaping");
                    break;
                }
            }
        }
        finished
    }

    fn report_finished(&mut self, finished: &[Finished]) -> Result<()> {
        if finished.is_empty() {
            return Ok(());
        }
        let mut stdout = io::stdout();
        if self.prompt_shown {
            queue!(
                stdout,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine)
            )?;
        }
        for done in finished {
            writeln!(stdout, "{}", done)?;
        }
        if self.prompt_shown {
            self.editor.redraw(&self.prompt.get_string(), &mut stdout)?;
        }
        stdout.flush()?;
        Ok(())
    }
}

fn report(err: &ShellError) {
    let _ = io::stdout().flush();
    eprintln!("hsh: {}", err);
}
