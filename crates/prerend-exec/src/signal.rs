//! Termination signal delivery by pid.

use std::io;

/// Send SIGTERM to `pid`.
///
/// A process that no longer exists counts as terminated. Pid 0 and values
/// outside `pid_t` are rejected: `kill` would address a process group.
#[cfg(unix)]
pub fn terminate(pid: u32) -> io::Result<()> {
    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to signal pid {pid}"),
            ));
        }
    };

    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::ESRCH => Ok(()),
        _ => Err(err),
    }
}

/// No signals off unix; callers kill through the child handle instead.
#[cfg(not(unix))]
pub fn terminate(pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot signal pid {pid} on this platform"),
    ))
}
