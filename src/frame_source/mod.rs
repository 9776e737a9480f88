//! FrameSource - Video Frame Acquisition
//!
//! ## Responsibilities
//!
//! - Decode frames from a looping video file (or live camera URL) via ffmpeg
//! - Report the source's native frame rate
//! - Rewind to the start on stream exhaustion

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

/// One decoded frame (JPEG bytes)
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
}

/// A sequential source of video frames.
///
/// `next_frame` returns `Ok(None)` on exhaustion; the caller decides whether
/// to `rewind` and continue or stop.
#[async_trait]
pub trait FrameSource: Send {
    /// Native frame rate of the source in frames per second
    fn frame_rate(&self) -> f64;

    /// Read the next frame, or `None` when the source is exhausted
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Seek back to the start of the source
    async fn rewind(&mut self) -> Result<()>;
}

/// FrameSource backed by an ffmpeg subprocess decoding a video file to an
/// MJPEG pipe. Rewinding restarts the decoder.
pub struct VideoFileSource {
    path: PathBuf,
    frame_rate: f64,
    decoder: Child,
    stdout: ChildStdout,
    buf: Vec<u8>,
}

impl VideoFileSource {
    /// Open a video file and probe its native frame rate.
    ///
    /// Fails if the file does not exist or ffprobe cannot read it; this is
    /// the one unrecoverable failure that prevents the reconciliation loop
    /// from starting.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(Error::Config(format!(
                "video source not found: {}",
                path.display()
            )));
        }

        let frame_rate = probe_frame_rate(&path).await?;
        let (decoder, stdout) = spawn_decoder(&path)?;

        tracing::info!(
            path = %path.display(),
            frame_rate = frame_rate,
            "Video frame source opened"
        );

        Ok(Self {
            path,
            frame_rate,
            decoder,
            stdout,
            buf: Vec::new(),
        })
    }
}

#[async_trait]
impl FrameSource for VideoFileSource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut chunk = [0u8; 8192];
        loop {
            if let Some(data) = extract_jpeg(&mut self.buf) {
                return Ok(Some(Frame { data }));
            }

            let n = self.stdout.read(&mut chunk).await?;
            if n == 0 {
                // Decoder reached end of file; leftover bytes are a
                // truncated frame and are dropped on rewind.
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    async fn rewind(&mut self) -> Result<()> {
        self.decoder.start_kill().ok();
        self.decoder.wait().await.ok();

        let (decoder, stdout) = spawn_decoder(&self.path)?;
        self.decoder = decoder;
        self.stdout = stdout;
        self.buf.clear();

        tracing::debug!(path = %self.path.display(), "Frame source rewound");
        Ok(())
    }
}

/// Start the ffmpeg decoder emitting MJPEG frames on stdout
fn spawn_decoder(path: &Path) -> Result<(Child, ChildStdout)> {
    let mut child = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(["-f", "image2pipe", "-vcodec", "mjpeg", "-q:v", "5", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Internal("ffmpeg stdout not captured".to_string()))?;

    Ok((child, stdout))
}

/// Probe the native frame rate with ffprobe
async fn probe_frame_rate(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=avg_frame_rate",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(Error::Upstream(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_frame_rate(String::from_utf8_lossy(&output.stdout).trim())
}

/// Parse an ffprobe frame-rate value, either a plain number or a fraction
/// like "30000/1001"
fn parse_frame_rate(raw: &str) -> Result<f64> {
    let rate = if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("bad frame rate: {raw}")))?;
        let den: f64 = den
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("bad frame rate: {raw}")))?;
        if den == 0.0 {
            return Err(Error::Parse(format!("bad frame rate: {raw}")));
        }
        num / den
    } else {
        raw.trim()
            .parse()
            .map_err(|_| Error::Parse(format!("bad frame rate: {raw}")))?
    };

    if rate <= 0.0 || !rate.is_finite() {
        return Err(Error::Parse(format!("bad frame rate: {raw}")));
    }
    Ok(rate)
}

/// Pull the first complete JPEG (SOI..EOI) out of the stream buffer.
///
/// Consumed bytes, including any garbage before the SOI marker, are drained
/// from the buffer.
fn extract_jpeg(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let start = find_marker(buf, [0xFF, 0xD8])?;
    let end = find_marker(&buf[start + 2..], [0xFF, 0xD9])? + start + 2;

    let frame = buf[start..end + 2].to_vec();
    buf.drain(..end + 2);
    Some(frame)
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate_plain_and_fraction() {
        assert_eq!(parse_frame_rate("25").unwrap(), 25.0);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_err());
        assert!(parse_frame_rate("garbage").is_err());
        assert!(parse_frame_rate("-5").is_err());
    }

    #[test]
    fn test_extract_jpeg_returns_complete_frame() {
        let mut buf = vec![0x00, 0x01, 0xFF, 0xD8, 0xAA, 0xBB, 0xFF, 0xD9, 0xFF];
        let frame = extract_jpeg(&mut buf).unwrap();
        assert_eq!(frame, vec![0xFF, 0xD8, 0xAA, 0xBB, 0xFF, 0xD9]);
        // Trailing partial data stays in the buffer
        assert_eq!(buf, vec![0xFF]);
    }

    #[test]
    fn test_extract_jpeg_incomplete_frame_is_kept() {
        let mut buf = vec![0xFF, 0xD8, 0xAA, 0xBB];
        assert!(extract_jpeg(&mut buf).is_none());
        assert_eq!(buf.len(), 4);

        buf.extend_from_slice(&[0xFF, 0xD9]);
        let frame = extract_jpeg(&mut buf).unwrap();
        assert_eq!(frame.len(), 6);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_extract_jpeg_two_frames_in_sequence() {
        let mut buf = vec![
            0xFF, 0xD8, 0x01, 0xFF, 0xD9, // frame 1
            0xFF, 0xD8, 0x02, 0xFF, 0xD9, // frame 2
        ];
        let first = extract_jpeg(&mut buf).unwrap();
        let second = extract_jpeg(&mut buf).unwrap();
        assert_eq!(first[2], 0x01);
        assert_eq!(second[2], 0x02);
        assert!(extract_jpeg(&mut buf).is_none());
    }
}
