//! Synthetic H.264 streams for pipeline tests.
//!
//! Pictures are coded as I_PCM macroblocks in a baseline-profile IDR slice,
//! so the decoded samples equal the ones written and no encoder is needed.

#![allow(dead_code)]

use pave::FrameHeader;

const START_CODE: [u8; 4] = [0, 0, 0, 1];

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    used: u8,
}

impl BitWriter {
    fn bit(&mut self, bit: bool) {
        self.current = (self.current << 1) | bit as u8;
        self.used += 1;
        if self.used == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    fn bits(&mut self, value: u32, count: u8) {
        for i in (0..count).rev() {
            self.bit((value >> i) & 1 == 1);
        }
    }

    fn ue(&mut self, value: u32) {
        let code = value + 1;
        let len = 32 - code.leading_zeros() as u8;
        self.bits(0, len - 1);
        self.bits(code, len);
    }

    fn se(&mut self, value: i32) {
        let mapped = if value > 0 {
            (value as u32) * 2 - 1
        } else {
            value.unsigned_abs() * 2
        };
        self.ue(mapped);
    }

    fn align_zero(&mut self) {
        while self.used != 0 {
            self.bit(false);
        }
    }

    fn byte(&mut self, value: u8) {
        debug_assert_eq!(self.used, 0);
        self.bytes.push(value);
    }

    fn trailing_bits(mut self) -> Vec<u8> {
        self.bit(true);
        self.align_zero();
        self.bytes
    }
}

/// Insert emulation prevention bytes into an RBSP.
fn escape(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 64);
    let mut zeros = 0;
    for &b in rbsp {
        if zeros >= 2 && b <= 3 {
            out.push(3);
            zeros = 0;
        }
        out.push(b);
        zeros = if b == 0 { zeros + 1 } else { 0 };
    }
    out
}

fn nal(header: u8, rbsp: &[u8]) -> Vec<u8> {
    let mut out = START_CODE.to_vec();
    out.push(header);
    out.extend(escape(rbsp));
    out
}

/// Baseline SPS for a `width` x `height` picture, both multiples of 16.
pub fn sps(width: u32, height: u32) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.bits(66, 8); // profile_idc
    w.bits(0, 8); // constraint flags
    w.bits(30, 8); // level_idc
    w.ue(0); // seq_parameter_set_id
    w.ue(0); // log2_max_frame_num_minus4
    w.ue(2); // pic_order_cnt_type
    w.ue(1); // max_num_ref_frames
    w.bit(false); // gaps_in_frame_num_value_allowed_flag
    w.ue(width / 16 - 1);
    w.ue(height / 16 - 1);
    w.bit(true); // frame_mbs_only_flag
    w.bit(true); // direct_8x8_inference_flag
    w.bit(false); // frame_cropping_flag
    w.bit(true); // vui_parameters_present_flag

    // VUI: only bitstream_restriction, so the decoder knows there is no reordering
    for _ in 0..8 {
        w.bit(false);
    }
    w.bit(true); // bitstream_restriction_flag
    w.bit(true); // motion_vectors_over_pic_boundaries_flag
    w.ue(0); // max_bytes_per_pic_denom
    w.ue(0); // max_bits_per_mb_denom
    w.ue(10); // log2_max_mv_length_horizontal
    w.ue(10); // log2_max_mv_length_vertical
    w.ue(0); // max_num_reorder_frames
    w.ue(1); // max_dec_frame_buffering

    nal(0x67, &w.trailing_bits())
}

pub fn pps() -> Vec<u8> {
    let mut w = BitWriter::default();
    w.ue(0); // pic_parameter_set_id
    w.ue(0); // seq_parameter_set_id
    w.bit(false); // entropy_coding_mode_flag
    w.bit(false); // bottom_field_pic_order_in_frame_present_flag
    w.ue(0); // num_slice_groups_minus1
    w.ue(0); // num_ref_idx_l0_default_active_minus1
    w.ue(0); // num_ref_idx_l1_default_active_minus1
    w.bit(false); // weighted_pred_flag
    w.bits(0, 2); // weighted_bipred_idc
    w.se(0); // pic_init_qp_minus26
    w.se(0); // pic_init_qs_minus26
    w.se(0); // chroma_qp_index_offset
    w.bit(true); // deblocking_filter_control_present_flag
    w.bit(false); // constrained_intra_pred_flag
    w.bit(false); // redundant_pic_cnt_present_flag

    nal(0x68, &w.trailing_bits())
}

/// IDR slice filling the picture with one YUV color.
pub fn idr_slice(width: u32, height: u32, idr_pic_id: u32, y: u8, u: u8, v: u8) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.ue(0); // first_mb_in_slice
    w.ue(7); // slice_type: I, all slices
    w.ue(0); // pic_parameter_set_id
    w.bits(0, 4); // frame_num
    w.ue(idr_pic_id);
    w.bit(false); // no_output_of_prior_pics_flag
    w.bit(false); // long_term_reference_flag
    w.se(0); // slice_qp_delta
    w.ue(1); // disable_deblocking_filter_idc

    let macroblocks = (width / 16) * (height / 16);
    for _ in 0..macroblocks {
        w.ue(25); // mb_type: I_PCM
        w.align_zero();
        for _ in 0..256 {
            w.byte(y);
        }
        for _ in 0..64 {
            w.byte(u);
        }
        for _ in 0..64 {
            w.byte(v);
        }
    }

    nal(0x65, &w.trailing_bits())
}

/// Parameter sets followed by a solid-color IDR picture.
pub fn keyframe(width: u32, height: u32, idr_pic_id: u32, yuv: (u8, u8, u8)) -> Vec<u8> {
    let mut au = sps(width, height);
    au.extend(pps());
    au.extend(idr_slice(width, height, idr_pic_id, yuv.0, yuv.1, yuv.2));
    au
}

/// Prefix `payload` with a PaVE header.
pub fn wrap_frame(frame_number: u32, width: u16, height: u16, payload: &[u8]) -> Vec<u8> {
    let mut header = FrameHeader::new(payload.len() as u32);
    header.frame_number = frame_number;
    header.encoded_width = width;
    header.encoded_height = height;
    header.display_width = width;
    header.display_height = height;

    let mut frame = header.to_bytes().to_vec();
    frame.extend_from_slice(payload);
    frame
}

pub const GRAY: (u8, u8, u8) = (126, 128, 128);
pub const RED: (u8, u8, u8) = (81, 90, 240);

/// BT.601 limited range to full range 8-bit RGB tolerance.
pub fn near(actual: u8, expected: u8) -> bool {
    (actual as i16 - expected as i16).abs() <= 6
}
