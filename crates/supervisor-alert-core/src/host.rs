//! Host lookups: hostname and system accounts.

use std::io;

/// Return this machine's hostname (`gethostname(2)`).
#[cfg(unix)]
pub fn hostname() -> io::Result<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes; gethostname NUL-terminates on success
    // when the name fits, and we force a terminator at the end regardless.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len() - 1) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let name = std::ffi::CStr::from_bytes_until_nul(&buf)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(name.to_string_lossy().into_owned())
}

/// Non-unix fallback: the COMPUTERNAME environment variable.
#[cfg(not(unix))]
pub fn hostname() -> io::Result<String> {
    std::env::var("COMPUTERNAME").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))
}

/// Whether a local account with this name exists (`getpwnam(3)`).
#[cfg(unix)]
pub fn account_exists(name: &str) -> bool {
    let Ok(c_name) = std::ffi::CString::new(name) else {
        return false;
    };
    // SAFETY: c_name is a valid NUL-terminated string; the returned record is
    // only checked for null and never dereferenced.
    let entry = unsafe { libc::getpwnam(c_name.as_ptr()) };
    !entry.is_null()
}

#[cfg(not(unix))]
pub fn account_exists(_name: &str) -> bool {
    false
}

/// Home directory of the current uid from the passwd database.
///
/// Covers accounts started without `HOME`, such as a `--system` user run by
/// supervisord.
#[cfg(unix)]
pub fn current_user_home() -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut entry = std::mem::MaybeUninit::<libc::passwd>::uninit();
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    // SAFETY: entry and buf outlive the call and buf.len() is its real size;
    // getpwuid_r only sets result to entry on success.
    let rc = unsafe {
        libc::getpwuid_r(
            libc::getuid(),
            entry.as_mut_ptr(),
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };
    if rc != 0 || result.is_null() {
        return None;
    }
    // SAFETY: on success entry is initialised and pw_dir points into buf.
    let dir = unsafe { (*result).pw_dir };
    if dir.is_null() {
        return None;
    }
    let dir = unsafe { std::ffi::CStr::from_ptr(dir) }
        .to_string_lossy()
        .into_owned();
    (!dir.is_empty()).then_some(dir)
}

#[cfg(not(unix))]
pub fn current_user_home() -> Option<String> {
    None
}
