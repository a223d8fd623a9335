/*!
    Pixel format types.
*/

use ffmpeg_next::format::Pixel;

/**
    Pixel formats that cross the decoder/converter boundary.

    Only what an H.264 baseline stream decodes to and what the converter
    produces is represented.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp, limited range
    Yuv420p,
    /// Planar YUV 4:2:0, 12bpp, full range
    Yuvj420p,
    /// Packed RGB, 24bpp
    Rgb24,
    /// Packed BGR, 24bpp
    Bgr24,
}

impl PixelFormat {
    /**
        Returns the number of bits per pixel for this format.

        For planar formats, this is the average bits per pixel.
    */
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Yuv420p | Self::Yuvj420p => 12,
            Self::Rgb24 | Self::Bgr24 => 24,
        }
    }

    /**
        Returns true if this is a planar format.
    */
    pub const fn is_planar(self) -> bool {
        match self {
            Self::Yuv420p | Self::Yuvj420p => true,
            Self::Rgb24 | Self::Bgr24 => false,
        }
    }

    pub(crate) fn from_ffmpeg(format: Pixel) -> Option<Self> {
        match format {
            Pixel::YUV420P => Some(Self::Yuv420p),
            Pixel::YUVJ420P => Some(Self::Yuvj420p),
            Pixel::RGB24 => Some(Self::Rgb24),
            Pixel::BGR24 => Some(Self::Bgr24),
            _ => None,
        }
    }

    pub(crate) fn to_ffmpeg(self) -> Pixel {
        match self {
            Self::Yuv420p => Pixel::YUV420P,
            Self::Yuvj420p => Pixel::YUVJ420P,
            Self::Rgb24 => Pixel::RGB24,
            Self::Bgr24 => Pixel::BGR24,
        }
    }
}
