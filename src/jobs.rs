use std::collections::{BTreeSet, HashMap};
use std::fmt;

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use tracing::debug;

/// Hands out the smallest positive job number not currently in use.
///
/// `watermark` is the first number never issued; `released` holds numbers
/// below it that have been given back. Without holes both operations are
/// O(1), reuse is O(log n).
#[derive(Debug)]
pub struct JobNumbers {
    watermark: u32,
    released: BTreeSet<u32>,
}

impl JobNumbers {
    pub fn new() -> Self {
        Self {
            watermark: 1,
            released: BTreeSet::new(),
        }
    }

    pub fn allocate(&mut self) -> u32 {
        if let Some(&lowest) = self.released.first() {
            if lowest < self.watermark {
                self.released.remove(&lowest);
                return lowest;
            }
        }
        let number = self.watermark;
        self.watermark += 1;
        number
    }

    pub fn release(&mut self, number: u32) {
        if number == 0 || number >= self.watermark {
            return;
        }
        if number + 1 == self.watermark {
            self.watermark -= 1;
            // pull the frontier down over holes that are now at the top
            while self.watermark > 1 && self.released.remove(&(self.watermark - 1)) {
                self.watermark -= 1;
            }
        } else {
            self.released.insert(number);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    Failed,
}

impl JobOutcome {
    pub fn from_status(status: &WaitStatus) -> Self {
        match status {
            WaitStatus::Exited(_, 0) => JobOutcome::Done,
            _ => JobOutcome::Failed,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Done => f.write_str("done"),
            JobOutcome::Failed => f.write_str("exit 1"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub command: String,
    pub number: u32,
}

/// A background job that has been reaped and removed from the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub job: Job,
    pub outcome: JobOutcome,
}

impl fmt::Display for Finished {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]\t{}\t{}", self.job.number, self.outcome, self.job.command)
    }
}

/// Live background jobs keyed by process id, together with the job number
/// allocator. Both are only ever touched through the shell's job lock.
#[derive(Debug)]
pub struct JobTable {
    jobs: HashMap<Pid, Job>,
    numbers: JobNumbers,
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            jobs: HashMap::new(),
            numbers: JobNumbers::new(),
        }
    }

    pub fn add_job(&mut self, pid: Pid, command: String) -> u32 {
        let number = self.numbers.allocate();
        debug!(%pid, number, %command, "registered background job");
        self.jobs.insert(pid, Job { pid, command, number });
        number
    }

    /// Removes the job owning `status`'s pid, if any. Statuses for processes
    /// that were never registered (foreground children) yield `None`.
    pub fn complete(&mut self, status: WaitStatus) -> Option<Finished> {
        let job = self.jobs.remove(&status.pid()?)?;
        self.numbers.release(job.number);
        let outcome = JobOutcome::from_status(&status);
        debug!(pid = %job.pid, number = job.number, ?status, "background job finished");
        Some(Finished { job, outcome })
    }

    pub fn list_jobs(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self.jobs.values().collect();
        jobs.sort_by_key(|j| j.number);
        jobs
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}
