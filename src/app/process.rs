use std::process::{Command as ProcessCommand, ExitStatus};

use anyhow::{Context, Result};

#[cfg(unix)]
use anyhow::anyhow;
#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Restores the previous disposition of a signal when dropped.
#[cfg(unix)]
struct IgnoredSignal {
    signum: libc::c_int,
    previous: libc::sigaction,
}

#[cfg(unix)]
impl IgnoredSignal {
    fn new(signum: libc::c_int) -> Result<Self> {
        // SAFETY: both sigaction structs are zero-initialised plain data and
        // only passed to sigaction(2).
        unsafe {
            let mut ignore: libc::sigaction = std::mem::zeroed();
            ignore.sa_sigaction = libc::SIG_IGN;
            libc::sigemptyset(&mut ignore.sa_mask);

            let mut previous: libc::sigaction = std::mem::zeroed();
            if libc::sigaction(signum, &ignore, &mut previous) != 0 {
                return Err(anyhow!("failed to ignore signal {signum}"));
            }
            Ok(Self { signum, previous })
        }
    }
}

#[cfg(unix)]
impl Drop for IgnoredSignal {
    fn drop(&mut self) {
        // SAFETY: restores the action captured in `new`.
        unsafe {
            let _ = libc::sigaction(self.signum, &self.previous, std::ptr::null_mut());
        }
    }
}

/// Gives the terminal to the player's process group and takes it back on drop.
#[cfg(unix)]
struct TerminalOwner {
    fd: libc::c_int,
    parent_group: libc::pid_t,
    handed_off: bool,
}

#[cfg(unix)]
impl TerminalOwner {
    fn hand_to(&mut self, child_group: libc::pid_t) {
        // SAFETY: tcsetpgrp only reads its integer arguments.
        self.handed_off = unsafe { libc::tcsetpgrp(self.fd, child_group) == 0 };
    }
}

#[cfg(unix)]
impl Drop for TerminalOwner {
    fn drop(&mut self) {
        if self.handed_off {
            // SAFETY: see `hand_to`.
            unsafe {
                let _ = libc::tcsetpgrp(self.fd, self.parent_group);
            }
        }
    }
}

/// Runs `f` with Ctrl-C ignored by podgrid so it only reaches the player.
#[cfg(unix)]
pub(crate) fn with_sigint_ignored<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    let _guard = IgnoredSignal::new(libc::SIGINT)?;
    f()
}

#[cfg(not(unix))]
pub(crate) fn with_sigint_ignored<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    f()
}

/// Spawns `cmd` in its own foreground process group and waits for it.
#[cfg(unix)]
pub(crate) fn run_interactive_cmd(mut cmd: ProcessCommand) -> Result<ExitStatus> {
    let fd = libc::STDIN_FILENO;
    // SAFETY: tcgetpgrp only reads the descriptor.
    let parent_group = unsafe { libc::tcgetpgrp(fd) };
    if parent_group == -1 {
        // Not attached to a terminal: run the player plainly.
        return cmd.status().context("failed to launch player");
    }

    let _sigttou = IgnoredSignal::new(libc::SIGTTOU)?;
    let mut owner = TerminalOwner {
        fd,
        parent_group,
        handed_off: false,
    };

    // SAFETY: the hook only calls async-signal-safe functions.
    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            libc::signal(libc::SIGTSTP, libc::SIG_DFL);
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut child = cmd.spawn().context("failed to spawn player")?;
    owner.hand_to(child.id() as libc::pid_t);
    child.wait().context("failed waiting on player")
}

#[cfg(not(unix))]
pub(crate) fn run_interactive_cmd(mut cmd: ProcessCommand) -> Result<ExitStatus> {
    cmd.status().context("failed to launch player")
}
