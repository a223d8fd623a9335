/*!
    Planar YUV to packed RGB/BGR conversion.
*/

use ffmpeg_next::{
    software::scaling::context::Context as ScalerContext,
    util::frame::video::Video as VideoFrameFFmpeg,
};

use crate::config::{ConverterConfig, OutputFormat};
use crate::decode::DecodedPicture;
use crate::error::ConvertError;
use crate::format::PixelFormat;

/**
    A packed raster, `width * 3` bytes per row with no padding.

    Freshly allocated per conversion and owned by the caller.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputImage {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub data: Vec<u8>,
}

impl OutputImage {
    /**
        Bytes per row.
    */
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /**
        Split into `(width, height, pixels)`.
    */
    pub fn into_parts(self) -> (u32, u32, Vec<u8>) {
        (self.width, self.height, self.data)
    }
}

/**
    Color-space converter.

    The scaler context is lazily built on first use and rebuilt only when
    the source width, height or pixel format changes, so consecutive
    same-resolution frames reuse its tables. The destination format is
    fixed at construction.
*/
pub struct ColorConverter {
    config: ConverterConfig,
    /// Cached scaler context and the input it was created for.
    scaler_state: Option<ScalerState>,
}

struct ScalerState {
    context: ScalerContext,
    /// Scaler output, reused while the key is unchanged.
    output: VideoFrameFFmpeg,
    src_width: u32,
    src_height: u32,
    src_format: PixelFormat,
}

impl ColorConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            scaler_state: None,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /**
        Source size the cached scaler was built for, if any.
    */
    pub fn configured_size(&self) -> Option<(u32, u32)> {
        self.scaler_state
            .as_ref()
            .map(|state| (state.src_width, state.src_height))
    }

    /**
        Convert a decoded picture to a packed raster of the same size.
    */
    pub fn convert(&mut self, picture: &DecodedPicture<'_>) -> Result<OutputImage, ConvertError> {
        let width = picture.width();
        let height = picture.height();
        let format = picture.format();

        let needs_init = match &self.scaler_state {
            None => true,
            Some(state) => {
                state.src_width != width
                    || state.src_height != height
                    || state.src_format != format
            }
        };

        if needs_init {
            self.init_scaler(width, height, format)?;
        }

        let bytes_per_pixel = self.config.format.bytes_per_pixel();
        let row_bytes = width as usize * bytes_per_pixel;
        let size = row_bytes
            .checked_mul(height as usize)
            .ok_or(ConvertError::OutOfMemory { bytes: usize::MAX })?;

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| ConvertError::OutOfMemory { bytes: size })?;

        let Some(state) = self.scaler_state.as_mut() else {
            return Err(ConvertError::Failed("scaler not initialized".into()));
        };

        state
            .context
            .run(picture.frame, &mut state.output)
            .map_err(|e| ConvertError::Failed(format!("scaling failed: {}", e)))?;

        // Scaler rows are padded to its alignment; pack them tightly
        let stride = state.output.stride(0);
        let plane = state.output.data(0);
        for y in 0..height as usize {
            let row_start = y * stride;
            data.extend_from_slice(&plane[row_start..row_start + row_bytes]);
        }

        Ok(OutputImage {
            width,
            height,
            format: self.config.format,
            data,
        })
    }

    /**
        Initialize or reinitialize the scaler for the given input.
    */
    fn init_scaler(
        &mut self,
        src_width: u32,
        src_height: u32,
        src_format: PixelFormat,
    ) -> Result<(), ConvertError> {
        let dst_format = self.config.format.pixel_format();

        let context = ScalerContext::get(
            src_format.to_ffmpeg(),
            src_width,
            src_height,
            dst_format.to_ffmpeg(),
            src_width,
            src_height,
            self.config.algorithm.to_ffmpeg_flags(),
        )
        .map_err(|e| ConvertError::Failed(format!("failed to create scaler: {}", e)))?;

        let output = VideoFrameFFmpeg::new(dst_format.to_ffmpeg(), src_width, src_height);

        tracing::debug!(
            width = src_width,
            height = src_height,
            src = ?src_format,
            dst = ?dst_format,
            "configured color converter"
        );

        self.scaler_state = Some(ScalerState {
            context,
            output,
            src_width,
            src_height,
            src_format,
        });

        Ok(())
    }
}

impl std::fmt::Debug for ColorConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorConverter")
            .field("config", &self.config)
            .field("configured_size", &self.configured_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::format::Pixel;

    fn solid_yuv(width: u32, height: u32, y: u8, u: u8, v: u8) -> VideoFrameFFmpeg {
        let mut frame = VideoFrameFFmpeg::new(Pixel::YUV420P, width, height);
        frame.data_mut(0).fill(y);
        frame.data_mut(1).fill(u);
        frame.data_mut(2).fill(v);
        frame
    }

    fn converter(format: OutputFormat) -> ColorConverter {
        ffmpeg_next::init().unwrap();
        ColorConverter::new(ConverterConfig::new(format))
    }

    fn near(actual: u8, expected: u8) -> bool {
        (actual as i16 - expected as i16).abs() <= 6
    }

    #[test]
    fn output_is_tightly_packed() {
        let mut converter = converter(OutputFormat::Rgb24);
        let frame = solid_yuv(48, 16, 126, 128, 128);
        let picture = DecodedPicture::new(&frame).unwrap();

        let image = converter.convert(&picture).unwrap();

        assert_eq!((image.width, image.height), (48, 16));
        assert_eq!(image.stride(), 48 * 3);
        assert_eq!(image.data.len(), 48 * 16 * 3);
        assert!(image.data.iter().all(|&c| near(c, 128)));
    }

    #[test]
    fn channel_order_follows_output_format() {
        // BT.601 limited-range red
        let frame = solid_yuv(32, 32, 81, 90, 240);
        let picture = DecodedPicture::new(&frame).unwrap();

        let rgb = converter(OutputFormat::Rgb24).convert(&picture).unwrap();
        let mut bgr_converter = converter(OutputFormat::Bgr24);
        assert_eq!(bgr_converter.config().format, OutputFormat::Bgr24);
        let bgr = bgr_converter.convert(&picture).unwrap();

        assert!(rgb.data[0] > 200 && rgb.data[2] < 60, "rgb: {:?}", &rgb.data[..3]);
        assert!(bgr.data[2] > 200 && bgr.data[0] < 60, "bgr: {:?}", &bgr.data[..3]);
        assert_eq!(bgr.format, OutputFormat::Bgr24);
    }

    #[test]
    fn scaler_is_rebuilt_only_on_resolution_change() {
        let mut converter = converter(OutputFormat::Rgb24);
        assert_eq!(converter.configured_size(), None);

        let small = solid_yuv(32, 16, 126, 128, 128);
        let large = solid_yuv(64, 48, 126, 128, 128);

        converter
            .convert(&DecodedPicture::new(&small).unwrap())
            .unwrap();
        assert_eq!(converter.configured_size(), Some((32, 16)));

        converter
            .convert(&DecodedPicture::new(&small).unwrap())
            .unwrap();
        assert_eq!(converter.configured_size(), Some((32, 16)));

        let image = converter
            .convert(&DecodedPicture::new(&large).unwrap())
            .unwrap();
        assert_eq!(converter.configured_size(), Some((64, 48)));
        assert_eq!(image.data.len(), 64 * 48 * 3);
    }

    #[test]
    fn output_buffer_is_not_shared_between_calls() {
        let mut converter = converter(OutputFormat::Rgb24);
        let frame = solid_yuv(16, 16, 126, 128, 128);
        let picture = DecodedPicture::new(&frame).unwrap();

        let first = converter.convert(&picture).unwrap();
        let second = converter.convert(&picture).unwrap();

        assert_eq!(first, second);
        assert_ne!(first.data.as_ptr(), second.data.as_ptr());
    }
}
