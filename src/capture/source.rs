//! Video source abstraction.
//!
//! Sources hand out decoded frames strictly in presentation order. The
//! ffmpeg-backed source streams raw RGB24 frames from a child process;
//! the mock source replays frames from memory for tests.

use std::collections::VecDeque;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use thiserror::Error;

use super::RawFrame;

/// Errors that can occur while reading video.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("ffprobe failed for '{path}': {message}")]
    InfoFailed { path: PathBuf, message: String },
    #[error("no video stream found in '{0}'")]
    NoVideoStream(PathBuf),
    #[error("failed to decode video: {0}")]
    DecodeFailed(String),
    #[error("truncated frame {index}: got {got} of {expected} bytes")]
    TruncatedFrame {
        index: u64,
        got: usize,
        expected: usize,
    },
    #[error("video source not opened")]
    NotOpened,
}

/// Trait for frame sources.
///
/// This abstraction allows swapping the ffmpeg decoder for an
/// in-memory source in tests.
pub trait VideoSource {
    /// Prepares the source for reading from the first frame.
    fn open(&mut self) -> Result<(), SourceError>;

    /// Reads the next frame, or `None` once the video is exhausted.
    fn read_frame(&mut self) -> Result<Option<RawFrame>, SourceError>;

    /// Number of frames in the video, when the container reports it.
    fn frame_count(&self) -> Option<u64>;

    /// Checks if the source is currently open.
    fn is_open(&self) -> bool;

    /// Closes the source and releases resources.
    fn close(&mut self);

    /// Iterates over the remaining frames. Iteration stops after the first error.
    fn frames(&mut self) -> Frames<'_, Self>
    where
        Self: Sized,
    {
        Frames {
            source: self,
            done: false,
        }
    }
}

/// Iterator returned by [`VideoSource::frames`].
pub struct Frames<'a, S> {
    source: &'a mut S,
    done: bool,
}

impl<S: VideoSource> Iterator for Frames<'_, S> {
    type Item = Result<RawFrame, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Stream properties reported by ffprobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<u64>,
}

/// Decodes a video file by piping `ffmpeg` raw RGB24 output.
pub struct FfmpegSource {
    path: PathBuf,
    info: Option<VideoInfo>,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    next_index: u64,
}

impl FfmpegSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            info: None,
            child: None,
            stdout: None,
            next_index: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream properties, available after [`VideoSource::open`].
    pub fn info(&self) -> Option<VideoInfo> {
        self.info
    }

    /// Waits for the decoder to exit and reports a failing exit status.
    fn finish(&mut self) -> Result<(), SourceError> {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let status = child.wait().map_err(|e| SourceError::DecodeFailed(e.to_string()))?;
            if !status.success() {
                return Err(SourceError::DecodeFailed(format!(
                    "ffmpeg exited with {status} while decoding '{}'",
                    self.path.display()
                )));
            }
        }
        Ok(())
    }
}

impl VideoSource for FfmpegSource {
    fn open(&mut self) -> Result<(), SourceError> {
        self.close();
        let info = read_video_info(&self.path)?;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SourceError::Spawn {
                tool: "ffmpeg",
                source,
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::DecodeFailed("ffmpeg stdout unavailable".into()))?;

        tracing::info!(
            path = %self.path.display(),
            width = info.width,
            height = info.height,
            frames = ?info.frame_count,
            "Opened video"
        );
        self.info = Some(info);
        self.child = Some(child);
        self.stdout = Some(BufReader::new(stdout));
        self.next_index = 0;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RawFrame>, SourceError> {
        let info = self.info.ok_or(SourceError::NotOpened)?;
        let Some(stdout) = self.stdout.as_mut() else {
            // Already drained.
            return Ok(None);
        };

        let expected = info.width as usize * info.height as usize * 3;
        let mut pixels = vec![0u8; expected];
        let mut filled = 0;
        while filled < expected {
            match stdout.read(&mut pixels[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SourceError::DecodeFailed(e.to_string())),
            }
        }

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < expected {
            return Err(SourceError::TruncatedFrame {
                index: self.next_index,
                got: filled,
                expected,
            });
        }

        let frame = RawFrame::new(pixels, info.width, info.height, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn frame_count(&self) -> Option<u64> {
        self.info.and_then(|info| info.frame_count)
    }

    fn is_open(&self) -> bool {
        self.info.is_some()
    }

    fn close(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if self.info.take().is_some() {
            tracing::debug!(path = %self.path.display(), "Closed video");
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reads the first video stream's dimensions and frame count with `ffprobe`.
pub fn read_video_info(path: &Path) -> Result<VideoInfo, SourceError> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-print_format",
            "json",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|source| SourceError::Spawn {
            tool: "ffprobe",
            source,
        })?;
    if !out.status.success() {
        return Err(SourceError::InfoFailed {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    parse_stream_info(path, &out.stdout)
}

fn parse_stream_info(path: &Path, json: &[u8]) -> Result<VideoInfo, SourceError> {
    #[derive(serde::Deserialize)]
    struct StreamSideData {
        rotation: Option<f64>,
    }
    #[derive(serde::Deserialize, Default)]
    struct StreamTags {
        rotate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct StreamEntry {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        nb_frames: Option<String>,
        #[serde(default)]
        side_data_list: Vec<StreamSideData>,
        #[serde(default)]
        tags: StreamTags,
    }
    #[derive(serde::Deserialize)]
    struct StreamList {
        #[serde(default)]
        streams: Vec<StreamEntry>,
    }

    let parsed: StreamList = serde_json::from_slice(json).map_err(|e| SourceError::InfoFailed {
        path: path.to_path_buf(),
        message: format!("invalid ffprobe json: {e}"),
    })?;
    let stream = parsed
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| SourceError::NoVideoStream(path.to_path_buf()))?;

    // ffmpeg applies the display rotation while decoding, so quarter turns
    // swap the dimensions of the frames it emits.
    let rotation = stream
        .side_data_list
        .iter()
        .find_map(|side| side.rotation)
        .or_else(|| stream.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
        .unwrap_or(0.0);
    let quarter_turn = (rotation.round() as i64).rem_euclid(180) == 90;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            let (width, height) = if quarter_turn {
                (height, width)
            } else {
                (width, height)
            };
            Ok(VideoInfo {
                width,
                height,
                frame_count: stream.nb_frames.and_then(|n| n.parse().ok()),
            })
        }
        _ => Err(SourceError::InfoFailed {
            path: path.to_path_buf(),
            message: "missing video dimensions".into(),
        }),
    }
}

/// Replays frames from memory. Used for tests and synthetic input.
#[derive(Debug, Default)]
pub struct MockSource {
    frames: Vec<RawFrame>,
    pending: VecDeque<RawFrame>,
    open: bool,
    /// Fails with a decode error when this frame index is reached.
    fail_at: Option<u64>,
}

impl MockSource {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    /// Simulates a decode failure at the given frame index.
    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl VideoSource for MockSource {
    fn open(&mut self) -> Result<(), SourceError> {
        self.pending = self.frames.iter().cloned().collect();
        self.open = true;
        tracing::info!(frames = self.frames.len(), "MockSource opened");
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RawFrame>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpened);
        }
        let next = self.pending.pop_front();
        if let (Some(frame), Some(fail_at)) = (&next, self.fail_at) {
            if frame.index() == fail_at {
                return Err(SourceError::DecodeFailed(format!(
                    "simulated failure at frame {fail_at}"
                )));
            }
        }
        Ok(next)
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.pending.clear();
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: u64) -> Vec<RawFrame> {
        (0..n).map(|i| RawFrame::solid(4, 4, [0, 0, 0], i)).collect()
    }

    #[test]
    fn test_mock_source_lifecycle() {
        let mut source = MockSource::new(frames(2));
        assert!(!source.is_open());

        source.open().unwrap();
        assert!(source.is_open());
        assert_eq!(source.frame_count(), Some(2));

        assert_eq!(source.read_frame().unwrap().unwrap().index(), 0);
        assert_eq!(source.read_frame().unwrap().unwrap().index(), 1);
        assert!(source.read_frame().unwrap().is_none());

        source.close();
        assert!(!source.is_open());
    }

    #[test]
    fn test_read_without_open() {
        let mut source = MockSource::new(frames(1));
        assert!(matches!(source.read_frame(), Err(SourceError::NotOpened)));
    }

    #[test]
    fn test_frames_iterator_stops_after_error() {
        let mut source = MockSource::new(frames(4)).failing_at(2);
        source.open().unwrap();

        let results: Vec<_> = source.frames().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(SourceError::DecodeFailed(_))));
    }

    #[test]
    fn test_parse_stream_info() {
        let json = br#"{"streams":[{"codec_type":"audio"},{"codec_type":"video","width":640,"height":480,"nb_frames":"120"}]}"#;
        let info = parse_stream_info(Path::new("a.mp4"), json).unwrap();
        assert_eq!(
            info,
            VideoInfo {
                width: 640,
                height: 480,
                frame_count: Some(120)
            }
        );
    }

    #[test]
    fn test_parse_stream_info_without_frame_count() {
        let json = br#"{"streams":[{"codec_type":"video","width":8,"height":8,"nb_frames":"N/A"}]}"#;
        let info = parse_stream_info(Path::new("a.webm"), json).unwrap();
        assert_eq!(info.frame_count, None);
    }

    #[test]
    fn test_parse_stream_info_swaps_rotated_dimensions() {
        let json = br#"{"streams":[{"codec_type":"video","width":1920,"height":1080,"side_data_list":[{"side_data_type":"Display Matrix","rotation":-90}]}]}"#;
        let info = parse_stream_info(Path::new("portrait.mp4"), json).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));

        let json = br#"{"streams":[{"codec_type":"video","width":1920,"height":1080,"tags":{"rotate":"270"}}]}"#;
        let info = parse_stream_info(Path::new("legacy.mov"), json).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
    }

    #[test]
    fn test_parse_stream_info_half_turn_keeps_dimensions() {
        let json = br#"{"streams":[{"codec_type":"video","width":640,"height":480,"side_data_list":[{"side_data_type":"Display Matrix","rotation":180}]}]}"#;
        let info = parse_stream_info(Path::new("flipped.mp4"), json).unwrap();
        assert_eq!((info.width, info.height), (640, 480));
    }

    #[test]
    fn test_parse_stream_info_no_video() {
        let json = br#"{"streams":[{"codec_type":"audio"}]}"#;
        assert!(matches!(
            parse_stream_info(Path::new("a.mp3"), json),
            Err(SourceError::NoVideoStream(_))
        ));
    }
}
