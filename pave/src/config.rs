/*!
    Decoder and converter configuration.
*/

use ffmpeg_next::software::scaling::flag::Flags as ScalerFlags;

use crate::format::PixelFormat;

/**
    Configuration for the H.264 decoder.
*/
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    /// Decoder threads. 1 keeps decoding on the caller's thread with no
    /// added frame delay.
    pub threads: usize,
    /// Set `AV_CODEC_FLAG_LOW_DELAY` on the codec context.
    pub low_delay: bool,
    /// Lower FFmpeg's own log output to errors only.
    pub quiet: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            low_delay: false,
            quiet: true,
        }
    }
}

impl DecoderConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_low_delay(mut self, low_delay: bool) -> Self {
        self.low_delay = low_delay;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/**
    Packed destination layout of the converter.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    #[default]
    Rgb24,
    Bgr24,
}

impl OutputFormat {
    pub const fn pixel_format(self) -> PixelFormat {
        match self {
            Self::Rgb24 => PixelFormat::Rgb24,
            Self::Bgr24 => PixelFormat::Bgr24,
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        3
    }
}

/**
    Scaling algorithm handed to the software scaler.

    Source and destination sizes are always equal, so this only affects
    chroma upsampling.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalingAlgorithm {
    /// Fast bilinear - lowest latency, visually faithful.
    #[default]
    FastBilinear,
    /// Bilinear interpolation.
    Bilinear,
    /// Bicubic interpolation - slower, smoother chroma edges.
    Bicubic,
}

impl ScalingAlgorithm {
    pub(crate) fn to_ffmpeg_flags(self) -> ScalerFlags {
        match self {
            Self::FastBilinear => ScalerFlags::FAST_BILINEAR,
            Self::Bilinear => ScalerFlags::BILINEAR,
            Self::Bicubic => ScalerFlags::BICUBIC,
        }
    }
}

/**
    Configuration for color conversion.
*/
#[derive(Clone, Debug, Default)]
pub struct ConverterConfig {
    /// Destination format, fixed for the converter's lifetime.
    pub format: OutputFormat,
    pub algorithm: ScalingAlgorithm,
}

impl ConverterConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            algorithm: ScalingAlgorithm::default(),
        }
    }

    /**
        Set the scaling algorithm.
    */
    pub fn with_algorithm(mut self, algorithm: ScalingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/**
    Configuration for a whole [`FramePipeline`](crate::FramePipeline).
*/
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub decoder: DecoderConfig,
    pub converter: ConverterConfig,
}

impl PipelineConfig {
    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_converter(mut self, converter: ConverterConfig) -> Self {
        self.converter = converter;
        self
    }

    /**
        Set only the converter's destination format.
    */
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.converter.format = format;
        self
    }
}
