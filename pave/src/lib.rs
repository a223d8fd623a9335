/*!
    Decoding of AR.Drone 2.0 video frames.

    The drone's video transmitter prefixes every H.264 access unit with a
    fixed 64-byte "PaVE" header. This crate validates that header, feeds
    the payload to a persistent FFmpeg H.264 decoder and converts the
    resulting planar YUV 4:2:0 picture to a packed 24-bit raster.

    ```ignore
    use pave::{FramePipeline, FrameReader, PipelineConfig};

    let mut pipeline = FramePipeline::new(PipelineConfig::default());

    for frame in FrameReader::new(std::fs::File::open("capture.pave")?) {
        match pipeline.decode(&frame?) {
            Ok(image) => show(image.width, image.height, &image.data),
            Err(e) if e.is_recoverable() => continue, // decoder still priming
            Err(e) => return Err(e.into()),
        }
    }
    ```

    One pipeline per stream: the decoder keeps reference-frame state
    between calls and must see frames in order, from one thread.
*/

pub mod config;
pub mod convert;
pub mod decode;
pub mod error;
pub mod format;
pub mod header;
pub mod nal;
pub mod pipeline;
pub mod stream;

pub use config::{ConverterConfig, DecoderConfig, OutputFormat, PipelineConfig, ScalingAlgorithm};
pub use convert::{ColorConverter, OutputImage};
pub use decode::{DecodedPicture, VideoDecoder};
pub use error::{
    ConvertError, DecodeError, Error, ParseError, Result, SetupError, StreamError,
};
pub use format::PixelFormat;
pub use header::{Frame, FrameHeader, FrameType, HEADER_SIZE, SIGNATURE, VideoCodec, parse};
pub use pipeline::{FramePipeline, Stage};
pub use stream::FrameReader;
