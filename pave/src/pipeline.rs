/*!
    Frame pipeline: parse, decode, convert.
*/

use crate::config::PipelineConfig;
use crate::convert::{ColorConverter, OutputImage};
use crate::decode::VideoDecoder;
use crate::error::{Result, SetupError};
use crate::header::{self, Frame};

/**
    Stage of a pipeline call, used to report where a failure happened.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Parsing,
    Decoding,
    Converting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Parsing => "parsing",
            Self::Decoding => "decoding",
            Self::Converting => "converting",
        })
    }
}

/**
    Decodes one PaVE frame per call into a packed raster.

    Owns the stream's decoding context and its cached conversion context.
    Not thread-safe by construction: use one pipeline per stream, driven
    from one thread.

    Setup happens in [`new`](Self::new). If it fails, the error is kept
    and every call to [`decode`](Self::decode) reports it.
*/
pub struct FramePipeline {
    decoder: std::result::Result<VideoDecoder, SetupError>,
    converter: ColorConverter,
}

impl FramePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let decoder = VideoDecoder::new(&config.decoder);
        if let Err(e) = &decoder {
            tracing::error!(error = %e, "video decoder setup failed");
        }

        Self {
            decoder,
            converter: ColorConverter::new(config.converter),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.decoder.is_ok()
    }

    pub fn setup_error(&self) -> Option<&SetupError> {
        self.decoder.as_ref().err()
    }

    /**
        Decode a buffer holding exactly one PaVE frame.

        Width and height of the result come from the decoded picture, not
        from the header. A [`DecodeError::NoPictureYet`] failure means the
        next frame should be supplied.

        [`DecodeError::NoPictureYet`]: crate::DecodeError::NoPictureYet
    */
    pub fn decode(&mut self, bytes: &[u8]) -> Result<OutputImage> {
        let decoder = self.decoder.as_mut().map_err(|e| e.clone())?;

        let frame = header::parse(bytes)?;
        tracing::trace!(
            frame_number = frame.header.frame_number,
            payload = frame.payload.len(),
            "parsed frame"
        );

        decode_parsed(decoder, &mut self.converter, &frame)
    }

    /**
        Decode a frame that was already parsed.
    */
    pub fn decode_frame(&mut self, frame: &Frame<'_>) -> Result<OutputImage> {
        let decoder = self.decoder.as_mut().map_err(|e| e.clone())?;
        decode_parsed(decoder, &mut self.converter, frame)
    }

    /**
        Discard the decoder's reference state before starting a new stream.
    */
    pub fn reset(&mut self) {
        if let Ok(decoder) = &mut self.decoder {
            decoder.reset();
        }
    }

    pub fn converter(&self) -> &ColorConverter {
        &self.converter
    }
}

fn decode_parsed(
    decoder: &mut VideoDecoder,
    converter: &mut ColorConverter,
    frame: &Frame<'_>,
) -> Result<OutputImage> {
    let header = &frame.header;

    let picture = decoder.decode(frame.payload).inspect_err(|e| {
        tracing::debug!(
            frame_number = header.frame_number,
            stage = %Stage::Decoding,
            error = %e,
            "no picture"
        );
    })?;

    let (width, height) = (picture.width(), picture.height());
    if header.encoded_width != 0
        && (u32::from(header.encoded_width) != width || u32::from(header.encoded_height) != height)
    {
        tracing::debug!(
            frame_number = header.frame_number,
            encoded_width = header.encoded_width,
            encoded_height = header.encoded_height,
            width,
            height,
            "header geometry differs from decoded picture"
        );
    }

    let image = converter.convert(&picture).inspect_err(|e| {
        tracing::warn!(
            frame_number = header.frame_number,
            stage = %Stage::Converting,
            error = %e,
            "conversion failed"
        );
    })?;

    tracing::trace!(frame_number = header.frame_number, width, height, "frame done");

    Ok(image)
}

impl std::fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("decoder", &self.decoder)
            .field("converter", &self.converter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ParseError};
    use crate::header::FrameHeader;

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Parsing.to_string(), "parsing");
        assert_eq!(Stage::Converting.to_string(), "converting");
    }

    #[test]
    fn setup_failure_is_replayed_on_every_call() {
        let mut pipeline = FramePipeline {
            decoder: Err(SetupError::CodecNotFound),
            converter: ColorConverter::new(Default::default()),
        };

        assert!(!pipeline.is_ready());
        assert_eq!(pipeline.setup_error(), Some(&SetupError::CodecNotFound));

        // Setup is checked before the input is even looked at
        for input in [&b"garbage"[..], &[][..]] {
            assert_eq!(
                pipeline.decode(input),
                Err(Error::Setup(SetupError::CodecNotFound))
            );
        }
    }

    #[test]
    fn parse_failure_stops_before_decoder() {
        let mut pipeline = FramePipeline::new(PipelineConfig::default());
        assert!(pipeline.is_ready());

        let mut bytes = FrameHeader::new(4).to_bytes().to_vec();
        bytes.extend_from_slice(&[0, 0, 0]);

        let err = pipeline.decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::SizeMismatch { buffer_len: 67, .. })
        ));
        assert_eq!(err.stage(), Some(Stage::Parsing));
        assert_eq!(pipeline.converter().configured_size(), None);
    }
}
