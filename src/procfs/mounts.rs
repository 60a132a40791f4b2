//! Block device to mount point mapping from `/proc/self/mountinfo` and
//! filesystem usage via `statvfs(3)`.
//!
//! A mountinfo line has the form (see `proc_pid_mountinfo(5)`):
//!
//! ```text
//! 36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue
//! ^id ^parent ^dev ^root ^mount point ^options ^optional... ^sep ^fs ^source
//! ```

use std::collections::HashMap;
use std::ffi::CString;
use std::io::{self, BufRead};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// The parts of a mountinfo line needed to locate a device's filesystem.
#[derive(Debug, PartialEq, Eq)]
struct Mount<'a> {
    /// Directory of the filesystem that forms the root of this mount.
    root: &'a str,
    mount_point: String,
    source: &'a str,
}

fn parse_mount_line(line: &str) -> Option<Mount<'_>> {
    let (pre, post) = line.split_once(" - ")?;
    let mut pre_fields = pre.split_whitespace().skip(3);
    let root = pre_fields.next()?;
    let mount_point = unescape(pre_fields.next()?);
    let mut post_fields = post.split_whitespace().skip(1);
    let source = post_fields.next()?;
    Some(Mount {
        root,
        mount_point,
        source,
    })
}

/// Decodes the octal escapes the kernel writes for blanks and backslashes,
/// e.g. `\040` for a space.
fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let digits = rest.get(pos + 1..pos + 4);
        match digits.and_then(|d| u8::from_str_radix(d, 8).ok()) {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &rest[pos + 4..];
            }
            None => {
                out.push('\\');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Maps every device to the first mount point of its whole filesystem.
///
/// Bind mounts of subdirectories (root other than `/`) are ignored.
pub fn parse_device_mounts<R: BufRead>(buf: &mut R) -> io::Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for line in buf.lines() {
        let line = line?;
        let Some(mount) = parse_mount_line(&line) else {
            log::trace!("skipping malformed mountinfo line: {}", line);
            continue;
        };
        if mount.root != "/" {
            continue;
        }
        out.entry(mount.source.to_owned())
            .or_insert(mount.mount_point);
    }
    Ok(out)
}

/// Byte counts of one filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsUsage {
    pub total: u64,
    pub used: u64,
    /// Free space usable without privileges.
    pub available: u64,
}

impl FsUsage {
    /// Used share of the space unprivileged users can reach, as `df` reports it.
    pub fn percent(&self) -> f64 {
        let usable = self.used + self.available;
        if usable == 0 {
            return 0.0;
        }
        self.used as f64 / usable as f64 * 100.0
    }
}

/// Queries the filesystem containing `path`.
pub fn statvfs(path: &Path) -> io::Result<FsUsage> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    // SAFETY: `statvfs` is plain old data, all-zero is a valid value.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: `c_path` is NUL terminated and `stat` is a valid out pointer.
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    let block_size = stat.f_frsize as u64;
    let total = stat.f_blocks as u64 * block_size;
    let free = stat.f_bfree as u64 * block_size;
    Ok(FsUsage {
        total,
        used: total.saturating_sub(free),
        available: stat.f_bavail as u64 * block_size,
    })
}
