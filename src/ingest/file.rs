//! Video opening.
//!
//! `open_video` is the single entry point that turns a location into a
//! `FrameSource`:
//! - `stub://walkaround?...` opens the synthetic walkaround source
//! - local paths open an FFmpeg decoder (feature: ingest-file-ffmpeg)
//! - remote URLs are refused
//!
//! Opening failures are `DecodeFailure` and abort the run before any frame is read.

use std::path::Path;

use crate::error::VerifyError;
use crate::frame::{RawFrame, RGB_CHANNELS};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::FrameSource;

const STUB_PREFIX: &str = "stub://";

/// Configuration for a video source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path or `stub://` location.
    pub path: String,
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }
}

/// Open a video for sequential decoding.
pub fn open_video(config: &FileConfig) -> Result<Box<dyn FrameSource>, VerifyError> {
    if !is_local_file_path(&config.path) {
        return Err(VerifyError::decode(
            "video ingestion only supports local paths (no URL schemes)",
        ));
    }
    if let Some(rest) = config.path.strip_prefix(STUB_PREFIX) {
        let script = WalkaroundScript::parse(rest)?;
        log::info!("video source: {} (synthetic)", config.path);
        return Ok(Box::new(SyntheticWalkaround::new(script)));
    }

    #[cfg(feature = "ingest-file-ffmpeg")]
    {
        let source = FfmpegFileSource::open(&config.path)?;
        log::info!("video source: {} (ffmpeg)", config.path);
        Ok(Box::new(source))
    }
    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    {
        Err(VerifyError::decode(
            "file decoding requires the ingest-file-ffmpeg feature",
        ))
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_PREFIX) {
        return true;
    }
    !path.contains("://")
}

// ----------------------------------------------------------------------------
// Synthetic walkaround source (stub://walkaround) for tests and demos
// ----------------------------------------------------------------------------

const BLOCK_WIDTH: u32 = 80;
const BLOCK_HEIGHT: u32 = 60;
const BLOCK_MARGIN: u32 = 20;
const DRIFT_PER_FRAME: u32 = 2;
const JUMP_OFFSET: u32 = 300;

/// Parameters of a synthetic walkaround.
///
/// `stub://walkaround?frames=100&gap=40-49&jump=70&width=640&height=360`
///
/// A white block drifts horizontally across a dark frame. Frames inside `gap`
/// are empty (subject occluded). From frame `jump` onward the block is shifted
/// right by 300 px.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkaroundScript {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub gap: Option<(u64, u64)>,
    pub jump_at: Option<u64>,
}

impl Default for WalkaroundScript {
    fn default() -> Self {
        Self {
            frames: 100,
            width: 640,
            height: 360,
            gap: None,
            jump_at: None,
        }
    }
}

impl WalkaroundScript {
    fn parse(location: &str) -> Result<Self, VerifyError> {
        let (name, query) = location.split_once('?').unwrap_or((location, ""));
        if name != "walkaround" {
            return Err(VerifyError::DecodeFailure(format!(
                "unknown synthetic source '{}'",
                name
            )));
        }

        let mut script = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| VerifyError::DecodeFailure(format!("malformed parameter '{}'", pair)))?;
            match key {
                "frames" => script.frames = parse_number(key, value)?,
                "width" => script.width = parse_number(key, value)?,
                "height" => script.height = parse_number(key, value)?,
                "jump" => script.jump_at = Some(parse_number(key, value)?),
                "gap" => {
                    let (start, end) = value.split_once('-').ok_or_else(|| {
                        VerifyError::DecodeFailure(format!("gap must be START-END, got '{}'", value))
                    })?;
                    script.gap = Some((parse_number(key, start)?, parse_number(key, end)?));
                }
                other => {
                    return Err(VerifyError::DecodeFailure(format!(
                        "unknown synthetic parameter '{}'",
                        other
                    )))
                }
            }
        }

        let min_width = BLOCK_WIDTH + 2 * BLOCK_MARGIN + JUMP_OFFSET + 1;
        if script.width < min_width || script.height < BLOCK_HEIGHT + 2 * BLOCK_MARGIN {
            return Err(VerifyError::DecodeFailure(format!(
                "synthetic frame must be at least {}x{}",
                min_width,
                BLOCK_HEIGHT + 2 * BLOCK_MARGIN
            )));
        }
        Ok(script)
    }

    /// Top-left corner of the block in frame `index`, or `None` while occluded.
    pub fn block_origin(&self, index: u64) -> Option<(u32, u32)> {
        if let Some((start, end)) = self.gap {
            if (start..=end).contains(&index) {
                return None;
            }
        }
        let span = (self.width - BLOCK_WIDTH - 2 * BLOCK_MARGIN - JUMP_OFFSET) as u64;
        let period = 2 * span;
        let phase = (index * DRIFT_PER_FRAME as u64) % period;
        let drift = if phase < span { phase } else { period - phase };
        let mut x = BLOCK_MARGIN + drift as u32;
        if self.jump_at.is_some_and(|at| index >= at) {
            x += JUMP_OFFSET;
        }
        Some((x, BLOCK_MARGIN))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, VerifyError> {
    value.trim().parse().map_err(|_| {
        VerifyError::DecodeFailure(format!("synthetic parameter '{}' is not a number: '{}'", key, value))
    })
}

struct SyntheticWalkaround {
    script: WalkaroundScript,
    frame_count: u64,
}

impl SyntheticWalkaround {
    fn new(script: WalkaroundScript) -> Self {
        Self {
            script,
            frame_count: 0,
        }
    }

    fn render(&self, index: u64) -> Vec<u8> {
        let (width, height) = (self.script.width, self.script.height);
        let mut pixels = vec![16u8; (width as usize) * (height as usize) * RGB_CHANNELS];
        if let Some((bx, by)) = self.script.block_origin(index) {
            for y in by..by + BLOCK_HEIGHT {
                let row = (y as usize) * (width as usize);
                let start = (row + bx as usize) * RGB_CHANNELS;
                let end = start + (BLOCK_WIDTH as usize) * RGB_CHANNELS;
                pixels[start..end].fill(u8::MAX);
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticWalkaround {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, VerifyError> {
        if self.frame_count >= self.script.frames {
            return Ok(None);
        }
        let pixels = self.render(self.frame_count);
        self.frame_count += 1;
        RawFrame::from_rgb(pixels, self.script.width, self.script.height).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_remote_urls_and_empty_paths() {
        for path in ["rtsp://camera/stream", "https://example.com/v.mp4", "  "] {
            let err = open_video(&FileConfig::new(path)).err().unwrap();
            assert!(matches!(err, VerifyError::DecodeFailure(_)), "{path}");
        }
    }

    #[test]
    fn parses_walkaround_parameters() {
        let script = WalkaroundScript::parse("walkaround?frames=12&gap=3-5&jump=9").unwrap();
        assert_eq!(script.frames, 12);
        assert_eq!(script.gap, Some((3, 5)));
        assert_eq!(script.jump_at, Some(9));
        assert_eq!(script.width, 640);
    }

    #[test]
    fn rejects_bad_walkaround_parameters() {
        assert!(WalkaroundScript::parse("orbit").is_err());
        assert!(WalkaroundScript::parse("walkaround?frames=ten").is_err());
        assert!(WalkaroundScript::parse("walkaround?gap=4").is_err());
        assert!(WalkaroundScript::parse("walkaround?speed=3").is_err());
        assert!(WalkaroundScript::parse("walkaround?width=100").is_err());
    }

    #[test]
    fn block_drifts_slowly_hides_in_gap_and_jumps() {
        let script = WalkaroundScript::parse("walkaround?frames=40&gap=10-12&jump=30").unwrap();
        let (x0, _) = script.block_origin(0).unwrap();
        let (x5, _) = script.block_origin(5).unwrap();
        assert_eq!(x5 - x0, 10);
        assert!(script.block_origin(11).is_none());
        let (x29, _) = script.block_origin(29).unwrap();
        let (x30, _) = script.block_origin(30).unwrap();
        assert!(x30 > x29 + 200);
    }

    #[test]
    fn synthetic_source_yields_exact_frame_count() {
        let mut source = open_video(&FileConfig::new("stub://walkaround?frames=7")).unwrap();
        let mut count = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.width, 640);
            count += 1;
        }
        assert_eq!(count, 7);
    }

    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    #[test]
    fn local_files_need_ffmpeg_feature() {
        let err = open_video(&FileConfig::new("walkaround.mov")).err().unwrap();
        assert!(err.to_string().contains("ingest-file-ffmpeg"));
    }
}
