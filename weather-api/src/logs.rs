//! Tail of the application log file.

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use weather_core::error::Result;

/// Bytes read per step when scanning backwards.
const CHUNK_SIZE: u64 = 8 * 1024;

/// Returns the last `count` non-empty lines of `path`, newest first, trimmed.
///
/// Reads backwards from the end of the file and stops once enough lines are
/// found. A missing file yields an empty list.
pub async fn recent_log_lines(path: &Path, count: usize) -> Result<Vec<String>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut file = match fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut pos = file.metadata().await?.len();
    let mut tail: Vec<u8> = Vec::new();
    while pos > 0 {
        let step = CHUNK_SIZE.min(pos);
        pos -= step;

        let mut chunk = vec![0u8; step as usize];
        file.seek(SeekFrom::Start(pos)).await?;
        file.read_exact(&mut chunk).await?;
        chunk.extend_from_slice(&tail);
        tail = chunk;

        if complete_lines(&tail, pos == 0).len() >= count {
            break;
        }
    }

    Ok(complete_lines(&tail, pos == 0)
        .into_iter()
        .rev()
        .take(count)
        .map(String::from)
        .collect())
}

/// Trimmed non-empty lines of `buf`. Unless `at_start`, the first segment
/// may begin mid-line and is skipped.
fn complete_lines(buf: &[u8], at_start: bool) -> Vec<&str> {
    let mut segments = buf.split(|b| *b == b'\n');
    if !at_start {
        segments.next();
    }
    segments
        .filter_map(|line| std::str::from_utf8(line).ok())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}
