use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use nix::unistd::pipe2;
use tracing::debug;

use crate::error::{Result, ShellError};

static WAKE_FD: AtomicI32 = AtomicI32::new(-1);
static INTERRUPTS: AtomicUsize = AtomicUsize::new(0);
static CHILD_EXITS: AtomicUsize = AtomicUsize::new(0);

fn wake() {
    let fd = WAKE_FD.load(Ordering::Relaxed);
    if fd < 0 {
        return;
    }
    let saved = Errno::last_raw();
    let byte = 1u8;
    // SAFETY: write(2) is async-signal-safe; a full pipe just drops the byte
    unsafe { libc::write(fd, (&byte as *const u8).cast(), 1) };
    Errno::set_raw(saved);
}

extern "C" fn on_interrupt(_: libc::c_int) {
    INTERRUPTS.fetch_add(1, Ordering::SeqCst);
    wake();
}

extern "C" fn on_child(_: libc::c_int) {
    CHILD_EXITS.fetch_add(1, Ordering::SeqCst);
    wake();
}

/// Signals that arrived since the last [`SignalBridge::take`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub interrupts: usize,
    pub child_exits: usize,
}

impl Pending {
    pub fn is_empty(&self) -> bool {
        self.interrupts == 0 && self.child_exits == 0
    }
}

/// Connects `SIGINT` and `SIGCHLD` to the main loop.
///
/// The handlers only bump a counter and write a byte into a self-pipe; the
/// main loop polls the read end next to stdin and does the real work.
pub struct SignalBridge {
    reader: File,
    _writer: OwnedFd,
}

impl SignalBridge {
    pub fn install() -> Result<Self> {
        let (read_end, write_end) =
            pipe2(OFlag::O_NONBLOCK | OFlag::O_CLOEXEC).map_err(ShellError::Signal)?;
        WAKE_FD.store(write_end.as_raw_fd(), Ordering::SeqCst);

        let flags = SaFlags::SA_RESTART;
        let interrupt = SigAction::new(SigHandler::Handler(on_interrupt), flags, SigSet::empty());
        let child = SigAction::new(
            SigHandler::Handler(on_child),
            flags | SaFlags::SA_NOCLDSTOP,
            SigSet::empty(),
        );

        // SAFETY: both handlers only touch atomics and call write(2)
        unsafe {
            signal::sigaction(Signal::SIGINT, &interrupt).map_err(ShellError::Signal)?;
            signal::sigaction(Signal::SIGCHLD, &child).map_err(ShellError::Signal)?;
        }
        debug!("signal handlers installed");

        Ok(Self {
            reader: File::from(read_end),
            _writer: write_end,
        })
    }

    pub fn wake_fd(&self) -> BorrowedFd<'_> {
        self.reader.as_fd()
    }

    /// Drains the wake pipe and collects the per-signal counters.
    pub fn take(&mut self) -> Pending {
        let mut scratch = [0u8; 64];
        loop {
            match self.reader.read(&mut scratch) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        Pending {
            interrupts: INTERRUPTS.swap(0, Ordering::SeqCst),
            child_exits: CHILD_EXITS.swap(0, Ordering::SeqCst),
        }
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        WAKE_FD.store(-1, Ordering::SeqCst);
    }
}

/// Holds `SIGCHLD` blocked until dropped, so a background child cannot be
/// reported before it has been registered.
pub struct ChildSignalBlock {
    set: SigSet,
}

impl ChildSignalBlock {
    pub fn new() -> Result<Self> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), None).map_err(ShellError::Signal)?;
        Ok(Self { set })
    }

    /// Lifts the block in a forked child before it execs.
    pub fn unblock_in_child(&self) {
        let _ = signal::sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&self.set), None);
    }
}

impl Drop for ChildSignalBlock {
    fn drop(&mut self) {
        if let Err(e) = signal::sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&self.set), None) {
            tracing::warn!(error = %e, "failed to unblock SIGCHLD");
        }
    }
}
