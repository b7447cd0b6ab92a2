//! Local video decoding using FFmpeg.
//!
//! Frames are decoded in order and converted to RGB24 in memory. The input
//! context and decoder are released when the source is dropped.

use ffmpeg_next as ffmpeg;

use super::FrameSource;
use crate::error::VerifyError;
use crate::frame::RawFrame;

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    eof_sent: bool,
}

// SAFETY: the FFmpeg contexts are owned exclusively by this source and are only
// used by the thread that currently owns it.
unsafe impl Send for FfmpegFileSource {}

impl FfmpegFileSource {
    pub(crate) fn open(path: &str) -> Result<Self, VerifyError> {
        ffmpeg::init().map_err(|e| VerifyError::DecodeFailure(format!("initialize ffmpeg: {}", e)))?;
        let input = ffmpeg::format::input(&path).map_err(|e| {
            VerifyError::DecodeFailure(format!("failed to open video '{}': {}", path, e))
        })?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| VerifyError::decode("file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(|e| VerifyError::DecodeFailure(format!("load video decoder parameters: {}", e)))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| VerifyError::DecodeFailure(format!("open ffmpeg video decoder: {}", e)))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| VerifyError::DecodeFailure(format!("create ffmpeg scaler: {}", e)))?;

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            eof_sent: false,
        })
    }

    /// Pull one frame already buffered inside the decoder, if any.
    fn receive(&mut self) -> Result<Option<RawFrame>, VerifyError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        let received = self.decoder.receive_frame(&mut decoded);
        if !frame_ready(received, &self.path, self.frame_count)? {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| VerifyError::DecodeFailure(format!("scale frame to RGB: {}", e)))?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        self.frame_count += 1;
        RawFrame::from_rgb(pixels, width, height).map(Some)
    }
}

impl FrameSource for FfmpegFileSource {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, VerifyError> {
        loop {
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
            if self.eof_sent {
                log::debug!("{}: decoded {} frames", self.path, self.frame_count);
                return Ok(None);
            }

            let mut fed = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder.send_packet(&packet).map_err(|e| {
                    VerifyError::DecodeFailure(format!("send packet to ffmpeg decoder: {}", e))
                })?;
                fed = true;
                break;
            }

            if !fed {
                self.decoder.send_eof().map_err(|e| {
                    VerifyError::DecodeFailure(format!("flush ffmpeg decoder: {}", e))
                })?;
                self.eof_sent = true;
            }
        }
    }
}

/// `Ok(false)` when the decoder needs more input or is fully drained.
/// Anything else from the decoder ends the run.
fn frame_ready(
    received: Result<(), ffmpeg::Error>,
    path: &str,
    frame_count: u64,
) -> Result<bool, VerifyError> {
    match received {
        Ok(()) => Ok(true),
        Err(ffmpeg::Error::Eof) => Ok(false),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => Ok(false),
        Err(e) => Err(VerifyError::DecodeFailure(format!(
            "decode frame {} of '{}': {}",
            frame_count, path, e
        ))),
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32), VerifyError> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let pixels = data
            .get(..row_bytes * height as usize)
            .ok_or_else(|| VerifyError::decode("ffmpeg frame is shorter than its dimensions"))?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .ok_or_else(|| VerifyError::decode("ffmpeg frame row is out of bounds"))?,
        );
    }

    Ok((pixels, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drained_decoder_is_not_an_error() {
        assert!(frame_ready(Ok(()), "clip.mp4", 0).unwrap());
        assert!(!frame_ready(Err(ffmpeg::Error::Eof), "clip.mp4", 12).unwrap());
        let again = ffmpeg::Error::Other {
            errno: ffmpeg::util::error::EAGAIN,
        };
        assert!(!frame_ready(Err(again), "clip.mp4", 12).unwrap());
    }

    #[test]
    fn corrupt_stream_is_a_decode_failure() {
        for err in [ffmpeg::Error::InvalidData, ffmpeg::Error::Bug] {
            let failure = frame_ready(Err(err), "clip.mp4", 40).unwrap_err();
            assert!(matches!(failure, VerifyError::DecodeFailure(ref m) if m.contains("frame 40")));
        }
    }
}
