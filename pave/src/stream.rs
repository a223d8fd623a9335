/*!
    Splitting a contiguous PaVE byte stream into whole frames.
*/

use std::io::{self, Read};

use crate::error::{ParseError, StreamError};
use crate::header::{FrameHeader, HEADER_SIZE};

/**
    Reads back-to-back PaVE frames from a byte source, such as a
    recorded capture of the drone's video port.

    Each item is one complete frame (header and payload) ready for
    [`FramePipeline::decode`](crate::FramePipeline::decode). Frames are
    expected whole; chunked frames are returned as they appear.
*/
pub struct FrameReader<R> {
    reader: R,
    frames_read: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            frames_read: 0,
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /**
        Read the next frame, or `None` at a clean end of stream.

        End of input inside a frame is an `UnexpectedEof` I/O error. A
        header whose sizes add up to less than the fixed layout is a
        `SizeMismatch`.
    */
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        let mut fixed = [0u8; HEADER_SIZE];
        if !read_full_or_eof(&mut self.reader, &mut fixed)? {
            return Ok(None);
        }

        let header = FrameHeader::read(&fixed)?;

        let frame_len = header.frame_len();
        if frame_len < HEADER_SIZE {
            // Such a frame could never pass `parse`
            return Err(ParseError::SizeMismatch {
                header_size: header.header_size,
                payload_size: header.payload_size,
                buffer_len: HEADER_SIZE,
            }
            .into());
        }

        // Grow with the data actually read, not with the declared size
        let mut frame = fixed.to_vec();
        let remaining = (frame_len - HEADER_SIZE) as u64;
        (&mut self.reader).take(remaining).read_to_end(&mut frame)?;
        if frame.len() != frame_len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        self.frames_read += 1;
        tracing::trace!(
            frame_number = header.frame_number,
            len = frame.len(),
            "read frame"
        );

        Ok(Some(frame))
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Vec<u8>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl<R> std::fmt::Debug for FrameReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("frames_read", &self.frames_read)
            .finish_non_exhaustive()
    }
}

/**
    Fill `buf` completely. Returns false if the source was already at EOF.
*/
fn read_full_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
