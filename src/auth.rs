//! Credential lookup and verification.
//!
//! The stored hash comes from the system password database, with a fallback
//! to the shadow database when passwd carries a placeholder. Verification
//! is crypt(3)-compatible: the scheme and salt are read back out of the
//! stored hash itself, so whatever scheme produced the entry is the scheme
//! used for the comparison.

use std::ffi::{CStr, CString};
use std::io;
use std::mem::MaybeUninit;
use std::ptr;

use anyhow::{bail, Context, Result};

/// Reading shadow entries as a regular user needs elevated read access.
const SETCAP_HINT: &str = "make sure to setcap cap_dac_read_search+ep on the binary";

struct PasswdEntry {
    name: String,
    hash: String,
}

/// Returns the invoking user's stored password hash.
pub fn password_hash() -> Result<String> {
    // SAFETY: getuid cannot fail and has no memory effects.
    let uid = unsafe { libc::getuid() };

    let entry = passwd_entry(uid)
        .with_context(|| format!("cannot retrieve password entry ({SETCAP_HINT})"))?;

    if entry.hash.is_empty() {
        // No hash and no placeholder: an actually empty password.
        return Ok(entry.hash);
    }

    // Anything else in the passwd field is a placeholder; the real hash
    // lives in the shadow database.
    shadow_hash(&entry.name)
        .with_context(|| format!("cannot retrieve shadow entry ({SETCAP_HINT})"))
}

/// Checks `password` against a crypt(3)-style `hash`.
pub fn verify(password: &str, hash: &str) -> bool {
    pwhash::unix::verify(password, hash)
}

fn lookup_buffer() -> Vec<u8> {
    // SAFETY: sysconf has no memory effects.
    let size = match unsafe { libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX) } {
        -1 => 16 * 1024,
        n => n as usize,
    };
    vec![0; size]
}

fn passwd_entry(uid: libc::uid_t) -> Result<PasswdEntry> {
    let mut pwd = MaybeUninit::<libc::passwd>::uninit();
    let mut buf = lookup_buffer();
    let mut result = ptr::null_mut();

    // SAFETY: pwd and buf stay alive across the call; result ends up null
    // or pointing at pwd, with pwd's string fields pointing into buf.
    let rc = unsafe {
        libc::getpwuid_r(
            uid,
            pwd.as_mut_ptr(),
            buf.as_mut_ptr().cast(),
            buf.len(),
            &mut result,
        )
    };
    if rc != 0 {
        bail!("getpwuid_r failed: {}", io::Error::from_raw_os_error(rc));
    }
    if result.is_null() {
        bail!("no passwd entry for uid {uid}");
    }

    // SAFETY: result is non-null, so pwd was initialized by the call.
    let pwd = unsafe { pwd.assume_init() };
    let name = unsafe { CStr::from_ptr(pwd.pw_name) };
    let hash = unsafe { CStr::from_ptr(pwd.pw_passwd) };
    Ok(PasswdEntry {
        name: name.to_string_lossy().into_owned(),
        hash: hash.to_string_lossy().into_owned(),
    })
}

fn shadow_hash(name: &str) -> Result<String> {
    let cname = CString::new(name).context("user name contains a NUL byte")?;
    let mut spwd = MaybeUninit::<libc::spwd>::uninit();
    let mut buf = lookup_buffer();
    let mut result = ptr::null_mut();

    // SAFETY: same lifetimes as in passwd_entry.
    let rc = unsafe {
        libc::getspnam_r(
            cname.as_ptr(),
            spwd.as_mut_ptr(),
            buf.as_mut_ptr().cast(),
            buf.len(),
            &mut result,
        )
    };
    if rc != 0 {
        bail!("getspnam_r failed: {}", io::Error::from_raw_os_error(rc));
    }
    if result.is_null() {
        bail!("no shadow entry for {name}");
    }

    // SAFETY: result is non-null, so spwd was initialized by the call.
    let spwd = unsafe { spwd.assume_init() };
    let hash = unsafe { CStr::from_ptr(spwd.sp_pwdp) };
    Ok(hash.to_string_lossy().into_owned())
}
