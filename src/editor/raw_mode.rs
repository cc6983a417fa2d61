use std::io;
use std::os::fd::AsFd;
use std::sync::Once;

use nix::sys::termios::{
    tcgetattr, tcsetattr, LocalFlags, SetArg, SpecialCharacterIndices, Termios,
};

use crate::error::{Result, ShellError};

static SET_PANIC_HOOK: Once = Once::new();

/// Puts stdin into non-canonical, no-echo, one-byte-at-a-time mode and
/// restores the previous settings when dropped. Signal generation stays
/// enabled so Ctrl-C still reaches the shell as `SIGINT`.
pub struct RawModeGuard {
    saved: Termios,
}

impl RawModeGuard {
    pub fn enter() -> Result<Self> {
        let stdin = io::stdin();
        let saved = tcgetattr(stdin.as_fd()).map_err(ShellError::Termios)?;

        // install panic hook once to restore terminal on panic
        SET_PANIC_HOOK.call_once(|| {
            let original: libc::termios = saved.clone().into();
            let prev = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                // SAFETY: `original` is a complete termios captured from stdin
                unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &original) };
                prev(info);
            }));
        });

        let mut raw = saved.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &raw).map_err(ShellError::Termios)?;

        Ok(Self { saved })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = tcsetattr(io::stdin().as_fd(), SetArg::TCSANOW, &self.saved) {
            tracing::warn!(error = %e, "failed to restore terminal settings");
        }
    }
}
