/*!
    Annex-B NAL unit scanning.

    The drone delivers each H.264 access unit as a byte-stream payload with
    start codes. Only enough is parsed here to tell parameter sets from
    picture data.
*/

/**
    H.264 NAL unit type (the low five bits of the first byte).
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    NonIdrSlice,
    PartitionA,
    PartitionB,
    PartitionC,
    IdrSlice,
    Sei,
    Sps,
    Pps,
    AccessUnitDelimiter,
    EndOfSequence,
    EndOfStream,
    Filler,
    Other(u8),
}

impl NalUnitType {
    pub const fn from_header(byte: u8) -> Self {
        match byte & 0x1f {
            1 => Self::NonIdrSlice,
            2 => Self::PartitionA,
            3 => Self::PartitionB,
            4 => Self::PartitionC,
            5 => Self::IdrSlice,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::AccessUnitDelimiter,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::Filler,
            other => Self::Other(other),
        }
    }

    /**
        Returns true for units that carry coded picture data.
    */
    pub const fn is_vcl(self) -> bool {
        matches!(
            self,
            Self::NonIdrSlice
                | Self::PartitionA
                | Self::PartitionB
                | Self::PartitionC
                | Self::IdrSlice
        )
    }
}

/**
    One NAL unit inside a payload, without its start code.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NalUnit<'a> {
    pub kind: NalUnitType,
    /// Header byte followed by the (still escaped) RBSP.
    pub data: &'a [u8],
}

/**
    Iterator over the NAL units of an Annex-B payload.
*/
#[derive(Clone, Debug)]
pub struct NalUnits<'a> {
    payload: &'a [u8],
    pos: usize,
}

/**
    Iterate the NAL units of `payload`. Bytes before the first start code
    are ignored.
*/
pub fn units(payload: &[u8]) -> NalUnits<'_> {
    let pos = find_start_code(payload, 0).map_or(payload.len(), |(_, end)| end);
    NalUnits { payload, pos }
}

/**
    Returns true if `payload` contains at least one slice.
*/
pub fn contains_picture(payload: &[u8]) -> bool {
    units(payload).any(|unit| unit.kind.is_vcl())
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = NalUnit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.payload.len() {
            let start = self.pos;
            let (end, next) = match find_start_code(self.payload, start) {
                Some((code_start, code_end)) => (code_start, code_end),
                None => (self.payload.len(), self.payload.len()),
            };
            self.pos = next;

            // Zero bytes before a start code belong to it (zero_byte / trailing_zero_8bits)
            let mut data = &self.payload[start..end];
            while let [rest @ .., 0] = data {
                data = rest;
            }

            if let Some(&header) = data.first() {
                return Some(NalUnit {
                    kind: NalUnitType::from_header(header),
                    data,
                });
            }
        }
        None
    }
}

/**
    Find the next `00 00 01` at or after `from`, returning the offsets of
    its first byte and of the byte after it.
*/
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    data.get(from..)?
        .windows(3)
        .position(|w| w == [0, 0, 1])
        .map(|i| (from + i, from + i + 3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_three_and_four_byte_start_codes() {
        let payload = [
            0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1e, // SPS
            0, 0, 1, 0x68, 0xce, // PPS
            0, 0, 0, 1, 0x65, 0x88, 0x84, // IDR
        ];

        let kinds: Vec<_> = units(&payload).map(|u| u.kind).collect();
        assert_eq!(
            kinds,
            vec![NalUnitType::Sps, NalUnitType::Pps, NalUnitType::IdrSlice]
        );

        let sps = units(&payload).next().unwrap();
        assert_eq!(sps.data, &[0x67, 0x42, 0x00, 0x1e]);
    }

    #[test]
    fn parameter_sets_alone_are_not_a_picture() {
        let payload = [0, 0, 0, 1, 0x67, 0x42, 0, 0, 1, 0x68, 0xce];
        assert!(!contains_picture(&payload));

        let with_slice = [0, 0, 1, 0x68, 0xce, 0, 0, 1, 0x41, 0x9a];
        assert!(contains_picture(&with_slice));
    }

    #[test]
    fn ignores_leading_garbage_and_empty_units() {
        let payload = [0xff, 0xfe, 0, 0, 1, 0, 0, 1, 0x09, 0xf0];

        let collected: Vec<_> = units(&payload).collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].kind, NalUnitType::AccessUnitDelimiter);
    }

    #[test]
    fn payload_without_start_code_is_empty() {
        assert_eq!(units(&[0x65, 0x88, 0x84]).count(), 0);
        assert!(!contains_picture(&[]));
    }
}
