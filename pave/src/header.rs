/*!
    PaVE frame header parsing and writing.

    Every access unit on the drone's video port is preceded by a fixed
    64-byte little-endian header:

    | offset | size | field |
    |---|---|---|
    | 0 | 4 | signature `"PaVE"` |
    | 4 | 1 | version |
    | 5 | 1 | video codec |
    | 6 | 2 | header size (payload offset) |
    | 8 | 4 | payload size |
    | 12 | 2 × 4 | encoded width/height, display width/height |
    | 20 | 4 | frame number |
    | 24 | 4 | timestamp (ms) |
    | 28 | 1 × 4 | total chunks, chunk index, frame type, control |
    | 32 | 4 × 2 | stream byte position (lower, upper word) |
    | 40 | 2 | stream id |
    | 42 | 1 × 4 | total slices, slice index, SPS size, PPS size |
    | 46 | 2 | reserved |
    | 48 | 4 | advertised size |
    | 52 | 12 | reserved |
*/

use std::io::{Cursor, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::ParseError;

/// Header signature.
pub const SIGNATURE: &[u8; 4] = b"PaVE";

/// Size of the fixed header layout in bytes.
pub const HEADER_SIZE: usize = 64;

const CONTROL_ADVERTISEMENT: u8 = 1 << 0;
const CONTROL_LAST_FRAME: u8 = 1 << 1;

/**
    Codec of the encapsulated frame.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    Unknown,
    Vlib,
    P264,
    Mpeg4Visual,
    Mpeg4Avc,
    Other(u8),
}

impl VideoCodec {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::Vlib,
            2 => Self::P264,
            3 => Self::Mpeg4Visual,
            4 => Self::Mpeg4Avc,
            other => Self::Other(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Vlib => 1,
            Self::P264 => 2,
            Self::Mpeg4Visual => 3,
            Self::Mpeg4Avc => 4,
            Self::Other(other) => other,
        }
    }
}

/**
    Picture type advertised by the transmitter.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameType {
    Unknown,
    Idr,
    I,
    P,
    /// Parameter sets only.
    Headers,
    Other(u8),
}

impl FrameType {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::Idr,
            2 => Self::I,
            3 => Self::P,
            4 => Self::Headers,
            other => Self::Other(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Idr => 1,
            Self::I => 2,
            Self::P => 3,
            Self::Headers => 4,
            Self::Other(other) => other,
        }
    }

    /**
        Returns true for pictures that can be decoded without references.
    */
    pub const fn is_intra(self) -> bool {
        matches!(self, Self::Idr | Self::I)
    }
}

/**
    A decoded PaVE header.

    Geometry fields are hints from the transmitter; the decoded picture
    is authoritative. Most fields are passed through uninterpreted.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub video_codec: VideoCodec,
    /// Byte length of the header, i.e. the payload offset.
    pub header_size: u16,
    /// Byte length of the compressed payload.
    pub payload_size: u32,
    pub encoded_width: u16,
    pub encoded_height: u16,
    pub display_width: u16,
    pub display_height: u16,
    pub frame_number: u32,
    /// Milliseconds.
    pub timestamp: u32,
    /// Unused: frames are assumed whole.
    pub total_chunks: u8,
    /// Unused: frames are assumed whole.
    pub chunk_index: u8,
    pub frame_type: FrameType,
    pub control: u8,
    pub stream_byte_position_lw: u32,
    pub stream_byte_position_uw: u32,
    pub stream_id: u16,
    pub total_slices: u8,
    pub slice_index: u8,
    /// SPS size in bytes (H.264 only).
    pub header1_size: u8,
    /// PPS size in bytes (H.264 only).
    pub header2_size: u8,
    pub advertised_size: u32,
}

impl FrameHeader {
    /**
        Create a header for a single whole frame of `payload_size` bytes.

        Every field other than the signature and the two sizes is zero.
    */
    pub fn new(payload_size: u32) -> Self {
        Self {
            version: 0,
            video_codec: VideoCodec::Unknown,
            header_size: HEADER_SIZE as u16,
            payload_size,
            encoded_width: 0,
            encoded_height: 0,
            display_width: 0,
            display_height: 0,
            frame_number: 0,
            timestamp: 0,
            total_chunks: 0,
            chunk_index: 0,
            frame_type: FrameType::Unknown,
            control: 0,
            stream_byte_position_lw: 0,
            stream_byte_position_uw: 0,
            stream_id: 0,
            total_slices: 0,
            slice_index: 0,
            header1_size: 0,
            header2_size: 0,
            advertised_size: 0,
        }
    }

    /**
        Decode the fixed 64-byte prefix of `bytes`.

        Checks the buffer length and the signature, but not the total
        frame size; use [`parse`] for a complete frame.
    */
    pub fn read(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ParseError::Truncated {
                len: bytes.len(),
                expected: HEADER_SIZE,
            });
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&bytes[..4]);
        if &signature != SIGNATURE {
            return Err(ParseError::BadSignature(signature));
        }

        let mut cursor = Cursor::new(&bytes[4..HEADER_SIZE]);
        let header = read_fields(&mut cursor).map_err(|_| ParseError::Truncated {
            len: bytes.len(),
            expected: HEADER_SIZE,
        })?;

        Ok(header)
    }

    /**
        Total frame length declared by this header.
    */
    pub fn frame_len(&self) -> usize {
        self.header_size as usize + self.payload_size as usize
    }

    pub fn stream_byte_position(&self) -> u64 {
        (u64::from(self.stream_byte_position_uw) << 32) | u64::from(self.stream_byte_position_lw)
    }

    pub fn is_advertisement(&self) -> bool {
        self.control & CONTROL_ADVERTISEMENT != 0
    }

    pub fn is_last_in_stream(&self) -> bool {
        self.control & CONTROL_LAST_FRAME != 0
    }

    /**
        Returns true if the transmitter says the payload starts with SPS/PPS.
    */
    pub fn declares_parameter_sets(&self) -> bool {
        self.header1_size != 0 || self.header2_size != 0
    }

    /**
        Serialize the fixed layout. Reserved regions are zero-filled.

        Only the first 64 bytes are produced, so `header_size` should be
        64 when the result is used to frame a payload.
    */
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(SIGNATURE);
        buf[4] = self.version;
        buf[5] = self.video_codec.as_u8();
        LittleEndian::write_u16(&mut buf[6..8], self.header_size);
        LittleEndian::write_u32(&mut buf[8..12], self.payload_size);
        LittleEndian::write_u16(&mut buf[12..14], self.encoded_width);
        LittleEndian::write_u16(&mut buf[14..16], self.encoded_height);
        LittleEndian::write_u16(&mut buf[16..18], self.display_width);
        LittleEndian::write_u16(&mut buf[18..20], self.display_height);
        LittleEndian::write_u32(&mut buf[20..24], self.frame_number);
        LittleEndian::write_u32(&mut buf[24..28], self.timestamp);
        buf[28] = self.total_chunks;
        buf[29] = self.chunk_index;
        buf[30] = self.frame_type.as_u8();
        buf[31] = self.control;
        LittleEndian::write_u32(&mut buf[32..36], self.stream_byte_position_lw);
        LittleEndian::write_u32(&mut buf[36..40], self.stream_byte_position_uw);
        LittleEndian::write_u16(&mut buf[40..42], self.stream_id);
        buf[42] = self.total_slices;
        buf[43] = self.slice_index;
        buf[44] = self.header1_size;
        buf[45] = self.header2_size;
        // 46..48 reserved
        LittleEndian::write_u32(&mut buf[48..52], self.advertised_size);
        // 52..64 reserved

        buf
    }
}

/**
    Read every field after the signature.
*/
fn read_fields(cursor: &mut Cursor<&[u8]>) -> std::io::Result<FrameHeader> {
    let version = cursor.read_u8()?;
    let video_codec = VideoCodec::from_u8(cursor.read_u8()?);
    let header_size = cursor.read_u16::<LittleEndian>()?;
    let payload_size = cursor.read_u32::<LittleEndian>()?;
    let encoded_width = cursor.read_u16::<LittleEndian>()?;
    let encoded_height = cursor.read_u16::<LittleEndian>()?;
    let display_width = cursor.read_u16::<LittleEndian>()?;
    let display_height = cursor.read_u16::<LittleEndian>()?;
    let frame_number = cursor.read_u32::<LittleEndian>()?;
    let timestamp = cursor.read_u32::<LittleEndian>()?;
    let total_chunks = cursor.read_u8()?;
    let chunk_index = cursor.read_u8()?;
    let frame_type = FrameType::from_u8(cursor.read_u8()?);
    let control = cursor.read_u8()?;
    let stream_byte_position_lw = cursor.read_u32::<LittleEndian>()?;
    let stream_byte_position_uw = cursor.read_u32::<LittleEndian>()?;
    let stream_id = cursor.read_u16::<LittleEndian>()?;
    let total_slices = cursor.read_u8()?;
    let slice_index = cursor.read_u8()?;
    let header1_size = cursor.read_u8()?;
    let header2_size = cursor.read_u8()?;
    cursor.read_exact(&mut [0u8; 2])?;
    let advertised_size = cursor.read_u32::<LittleEndian>()?;
    cursor.read_exact(&mut [0u8; 12])?;

    Ok(FrameHeader {
        version,
        video_codec,
        header_size,
        payload_size,
        encoded_width,
        encoded_height,
        display_width,
        display_height,
        frame_number,
        timestamp,
        total_chunks,
        chunk_index,
        frame_type,
        control,
        stream_byte_position_lw,
        stream_byte_position_uw,
        stream_id,
        total_slices,
        slice_index,
        header1_size,
        header2_size,
        advertised_size,
    })
}

/**
    A validated frame: its header and a borrowed view of the payload.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    pub header: FrameHeader,
    pub payload: &'a [u8],
}

/**
    Parse a buffer holding exactly one PaVE frame.

    The payload is not copied; it borrows
    `buffer[header_size..header_size + payload_size]`. A `header_size`
    below 64 is accepted as long as the sizes add up.
*/
pub fn parse(buffer: &[u8]) -> Result<Frame<'_>, ParseError> {
    let header = FrameHeader::read(buffer)?;

    if header.frame_len() != buffer.len() {
        return Err(ParseError::SizeMismatch {
            header_size: header.header_size,
            payload_size: header.payload_size,
            buffer_len: buffer.len(),
        });
    }

    let payload = &buffer[header.header_size as usize..];

    Ok(Frame { header, payload })
}
