use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Reads the path list, one path per line, as raw bytes so that any name the
/// filesystem allows gets through. Line endings (`\n` or `\r\n`) are
/// stripped and blank lines skipped; a last line without a newline is kept.
pub async fn read_paths<R>(mut reader: R) -> std::io::Result<Vec<PathBuf>>
where
    R: AsyncBufRead + Unpin,
{
    let mut paths = Vec::new();
    let mut line = Vec::new();
    let mut number = 0;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        number += 1;

        if line.last() == Some(&b'\n') {
            line.pop();
        } else {
            log::warn!(
                "path list does not end with a newline, keeping last entry {:?}",
                String::from_utf8_lossy(&line)
            );
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            log::debug!("skipping blank line {} of the path list", number);
            continue;
        }
        paths.push(path_from_bytes(std::mem::take(&mut line)));
    }
    Ok(paths)
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;

    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}
