//! Bounded-wait readiness checks.
//!
//! Wraps `poll(2)` for a single descriptor. A `None` timeout waits
//! indefinitely. Waits interrupted by a signal are resumed against a
//! monotonic deadline, so the total wait never exceeds the timeout the
//! caller asked for.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use std::os::unix::net::UnixStream;
//! use std::time::Duration;
//! use fcgi_wire::{can_read, can_write};
//!
//! let (mut a, b) = UnixStream::pair().unwrap();
//! assert!(!can_read(&b, Some(Duration::ZERO)).unwrap());
//!
//! a.write_all(b"x").unwrap();
//! assert!(can_read(&b, Some(Duration::from_secs(1))).unwrap());
//! assert!(can_write(&a, None).unwrap());
//! ```

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::time::{Duration, Instant};

use crate::error::{FcgiError, Result};

/// Wait until `handle` is readable or `timeout` expires.
///
/// Returns `Ok(false)` on timeout. A hung-up or errored descriptor counts as
/// readable, so the following read observes the EOF or the error.
pub fn can_read<H>(handle: &H, timeout: Option<Duration>) -> Result<bool>
where
    H: AsFd + ?Sized,
{
    wait_for(handle.as_fd(), libc::POLLIN, timeout)
}

/// Wait until `handle` is writable or `timeout` expires.
///
/// Returns `Ok(false)` on timeout. A hung-up or errored descriptor counts as
/// writable, so the following write observes the error.
pub fn can_write<H>(handle: &H, timeout: Option<Duration>) -> Result<bool>
where
    H: AsFd + ?Sized,
{
    wait_for(handle.as_fd(), libc::POLLOUT, timeout)
}

fn wait_for(fd: BorrowedFd<'_>, events: libc::c_short, timeout: Option<Duration>) -> Result<bool> {
    // An unrepresentable deadline is as good as waiting forever.
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let mut wait_ms = poll_timeout_ms(deadline, Instant::now());

    loop {
        let mut pfd = libc::pollfd {
            fd: fd.as_raw_fd(),
            events,
            revents: 0,
        };

        // SAFETY: pfd is a valid, initialized pollfd and we pass a count of 1.
        // The descriptor is borrowed for the duration of the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, wait_ms) };

        if rc > 0 {
            if pfd.revents & libc::POLLNVAL != 0 {
                return Err(FcgiError::from(io::Error::from_raw_os_error(libc::EBADF)));
            }
            let ready = events | libc::POLLERR | libc::POLLHUP;
            return Ok(pfd.revents & ready != 0);
        }

        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(FcgiError::from(err));
            }
        }

        // Timed out or interrupted. A timeout clamped to c_int::MAX can
        // expire before the deadline, so both cases resume with what is left.
        match remaining_wait_ms(deadline, Instant::now()) {
            Some(ms) => {
                tracing::trace!(fd = fd.as_raw_fd(), rc, wait_ms = ms, "poll resumed");
                wait_ms = ms;
            }
            None => {
                tracing::trace!(fd = fd.as_raw_fd(), ?timeout, "poll timed out");
                return Ok(false);
            }
        }
    }
}

/// Timeout for the next `poll(2)` call, or `None` once `deadline` has passed.
fn remaining_wait_ms(deadline: Option<Instant>, now: Instant) -> Option<libc::c_int> {
    match deadline {
        Some(deadline) if now >= deadline => None,
        _ => Some(poll_timeout_ms(deadline, now)),
    }
}

/// Milliseconds left until `deadline`, as a `poll(2)` timeout argument.
///
/// `None` means wait forever (-1). Partial milliseconds round up so poll
/// never returns before the deadline; the result saturates at `c_int::MAX`.
fn poll_timeout_ms(deadline: Option<Instant>, now: Instant) -> libc::c_int {
    let Some(deadline) = deadline else {
        return -1;
    };
    let remaining = deadline.saturating_duration_since(now);
    let mut ms = remaining.as_millis();
    if remaining.subsec_nanos() % 1_000_000 != 0 {
        ms += 1;
    }
    ms.min(libc::c_int::MAX as u128) as libc::c_int
}
