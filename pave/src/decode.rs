/*!
    H.264 decoder adapter.
*/

use ffmpeg_next::{
    codec::{self, decoder::Video as VideoDecoderFFmpeg},
    ffi,
    util::frame::video::Video as VideoFrameFFmpeg,
    util::log::{self as ffmpeg_log, Level as LogLevel},
};

use crate::config::DecoderConfig;
use crate::error::{DecodeError, SetupError};
use crate::format::PixelFormat;
use crate::nal;

/**
    Video decoder.

    Owns one H.264 decoding context for the lifetime of a stream. Every
    call to [`decode`](Self::decode) mutates the context's reference-frame
    state, so access units must be submitted in stream order from a single
    thread. Independent streams need independent decoders.
*/
pub struct VideoDecoder {
    decoder: VideoDecoderFFmpeg,
    /// Newest picture received from the codec.
    picture: VideoFrameFFmpeg,
    /// Receive target, swapped into `picture` on success.
    scratch: VideoFrameFFmpeg,
}

impl VideoDecoder {
    /**
        Locate the H.264 decoder and open a context for it.
    */
    pub fn new(config: &DecoderConfig) -> Result<Self, SetupError> {
        ffmpeg_next::init().map_err(|e| SetupError::Init(e.to_string()))?;

        if config.quiet {
            ffmpeg_log::set_level(LogLevel::Error);
        }

        let codec =
            ffmpeg_next::decoder::find(codec::Id::H264).ok_or(SetupError::CodecNotFound)?;

        let mut context = codec::context::Context::new_with_codec(codec);

        unsafe {
            let ptr = context.as_mut_ptr();
            if ptr.is_null() {
                return Err(SetupError::ContextAllocation(
                    "avcodec_alloc_context3 returned null".into(),
                ));
            }
            (*ptr).thread_count = codec_thread_count(config.threads);
            if config.low_delay {
                (*ptr).flags |= ffi::AV_CODEC_FLAG_LOW_DELAY as i32;
            }
        }

        let decoder = context
            .decoder()
            .video()
            .map_err(|e| SetupError::CodecOpen(e.to_string()))?;

        tracing::debug!(threads = config.threads, "opened h.264 decoder");

        Ok(Self {
            decoder,
            picture: VideoFrameFFmpeg::empty(),
            scratch: VideoFrameFFmpeg::empty(),
        })
    }

    /**
        Submit one access unit and return the newest complete picture.

        The payload carries no timestamps. A decoder that is still priming
        (parameter sets only, or reordering delay) reports
        [`DecodeError::NoPictureYet`]; supply the next frame and try again.

        The returned picture borrows the decoder and is invalidated by the
        next call.
    */
    pub fn decode(&mut self, payload: &[u8]) -> Result<DecodedPicture<'_>, DecodeError> {
        if payload.is_empty() {
            // An empty packet would put the codec into draining mode
            return Err(DecodeError::NoPictureYet);
        }

        let mut packet = ffmpeg_next::Packet::copy(payload);
        packet.set_pts(None);
        packet.set_dts(None);

        let mut received = 0;

        match self.decoder.send_packet(&packet) {
            Ok(()) => {}
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                // Codec is full: drain pending pictures, then resend once
                received += self.receive_latest(payload)?;
                tracing::debug!(pending = received, "decoder refused input, drained");

                match self.decoder.send_packet(&packet) {
                    Ok(()) => {}
                    Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                        // Still full; return what was drained
                        tracing::debug!("decoder refused input twice, packet dropped");
                    }
                    Err(e) => return Err(classify_error(e, payload)),
                }
            }
            Err(e) => return Err(classify_error(e, payload)),
        }

        match self.receive_latest(payload) {
            Ok(n) => received += n,
            Err(e) if received == 0 => return Err(e),
            Err(_) => {}
        }

        if received == 0 {
            return Err(DecodeError::NoPictureYet);
        }
        if received > 1 {
            tracing::debug!(dropped = received - 1, "discarded stale pictures");
        }

        DecodedPicture::new(&self.picture)
    }

    /**
        Reset the decoder's reference state.

        Call this before feeding a new, unrelated stream to the same
        decoder.
    */
    pub fn reset(&mut self) {
        self.decoder.flush();
    }

    /**
        Receive every available picture, keeping only the newest.
    */
    fn receive_latest(&mut self, payload: &[u8]) -> Result<usize, DecodeError> {
        let mut received = 0;

        loop {
            match self.decoder.receive_frame(&mut self.scratch) {
                Ok(()) => {
                    std::mem::swap(&mut self.picture, &mut self.scratch);
                    received += 1;
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => break,
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => {
                    // Keep what we already have
                    if received == 0 {
                        return Err(classify_error(e, payload));
                    }
                    break;
                }
            }
        }

        Ok(received)
    }
}

fn codec_thread_count(threads: usize) -> i32 {
    i32::try_from(threads.max(1)).unwrap_or(i32::MAX)
}

/**
    Map a codec failure for `payload` to the decode error taxonomy.

    FFmpeg rejects an access unit holding only parameter sets as invalid
    data after it has stored them, which is priming rather than
    corruption.
*/
fn classify_error(error: ffmpeg_next::Error, payload: &[u8]) -> DecodeError {
    match error {
        ffmpeg_next::Error::InvalidData if !nal::contains_picture(payload) => {
            DecodeError::NoPictureYet
        }
        other => DecodeError::Corrupt(other.to_string()),
    }
}

impl std::fmt::Debug for VideoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("width", &self.decoder.width())
            .field("height", &self.decoder.height())
            .finish_non_exhaustive()
    }
}

/**
    The decoder's planar output for one access unit.

    Owned by the [`VideoDecoder`]; convert it before decoding again.
*/
pub struct DecodedPicture<'a> {
    pub(crate) frame: &'a VideoFrameFFmpeg,
    format: PixelFormat,
}

impl<'a> DecodedPicture<'a> {
    pub(crate) fn new(frame: &'a VideoFrameFFmpeg) -> Result<Self, DecodeError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DecodeError::Corrupt("picture has zero dimensions".into()));
        }

        let format = PixelFormat::from_ffmpeg(frame.format()).ok_or_else(|| {
            DecodeError::Corrupt(format!("unsupported pixel format: {:?}", frame.format()))
        })?;

        Ok(Self { frame, format })
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn is_key_frame(&self) -> bool {
        self.frame.is_key()
    }

    pub fn plane_count(&self) -> usize {
        self.frame.planes()
    }

    /**
        Line size of plane `index` in bytes, including padding.

        Panics if `index >= plane_count()`.
    */
    pub fn stride(&self, index: usize) -> usize {
        self.frame.stride(index)
    }

    /**
        Raw bytes of plane `index`, `stride(index)` bytes per row.

        Panics if `index >= plane_count()`.
    */
    pub fn plane(&self, index: usize) -> &[u8] {
        self.frame.data(index)
    }
}

impl std::fmt::Debug for DecodedPicture<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedPicture")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format)
            .finish()
    }
}
