// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Image decoding into RGBA8 [Frame]s.

use std::io::Cursor;

use png::{BitDepth, ColorType, Transformations};

use crate::images::source::{Frame, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("png: {0}")]
    Png(#[from] png::DecodingError),
    #[error("unsupported output format {color_type:?} at {bit_depth:?}")]
    Unsupported {
        color_type: ColorType,
        bit_depth: BitDepth,
    },
    #[error("a {width}x{height} image is too large to decode")]
    TooLarge { width: u32, height: u32 },
    #[error("decoded image does not fit its frame: {0}")]
    Frame(#[from] SourceError),
}

/// Decodes a PNG into an RGBA8 frame.
///
/// Palette, grayscale, low bit depth, `tRNS` transparency and 16-bit images are all expanded to
/// 8 bits per channel with an explicit alpha.
pub fn decode_png(bytes: &[u8]) -> Result<Frame, DecodeError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    let (color_type, bit_depth) = reader.output_color_type();
    if bit_depth != BitDepth::Eight {
        return Err(DecodeError::Unsupported {
            color_type,
            bit_depth,
        });
    }
    logwise::trace_sync!(
        "will decode {width}x{height} {color_type}",
        width = width,
        height = height,
        color_type = logwise::privacy::LogIt(&color_type)
    );

    let size = reader
        .output_buffer_size()
        .ok_or(DecodeError::TooLarge { width, height })?;
    let mut buf = vec![0u8; size];
    let output = reader.next_frame(&mut buf)?;
    buf.truncate(output.buffer_size());

    let rgba = expand_to_rgba(&buf, color_type).ok_or(DecodeError::Unsupported {
        color_type,
        bit_depth,
    })?;
    Ok(Frame::new(width, height, rgba)?)
}

fn expand_to_rgba(buf: &[u8], color_type: ColorType) -> Option<Vec<u8>> {
    let rgba = match color_type {
        ColorType::Rgba => buf.to_vec(),
        ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], u8::MAX])
            .collect(),
        ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, u8::MAX]).collect(),
        //EXPAND turns palettes into rgb(a)
        ColorType::Indexed => return None,
    };
    Some(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes `pixels` (laid out as `color_type`) as an 8-bit PNG.
    fn encode_png(width: u32, height: u32, color_type: ColorType, pixels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color_type);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(pixels).unwrap();
        }
        out
    }

    #[test]
    fn rgba_round_trips() {
        let pixels: Vec<u8> = (0..4 * 4 * 4).map(|i| i as u8).collect();
        let bytes = encode_png(4, 4, ColorType::Rgba, &pixels);
        let frame = decode_png(&bytes).unwrap();
        assert_eq!(frame.dimensions(), (4, 4));
        assert_eq!(frame.pixels(), &pixels[..]);
    }

    #[test]
    fn grayscale_is_expanded() {
        let bytes = encode_png(3, 1, ColorType::Grayscale, &[0, 128, 255]);
        let frame = decode_png(&bytes).unwrap();
        assert_eq!(frame.dimensions(), (3, 1));
        assert_eq!(frame.pixel(1, 0), Some([128, 128, 128, 255]));
    }

    #[test]
    fn rgb_gets_opaque_alpha() {
        let bytes = encode_png(1, 2, ColorType::Rgb, &[1, 2, 3, 4, 5, 6]);
        let frame = decode_png(&bytes).unwrap();
        assert_eq!(frame.pixel(0, 1), Some([4, 5, 6, 255]));
    }

    #[test]
    fn truncated_image_is_an_error() {
        let pixels: Vec<u8> = (0..64 * 64 * 4).map(|i| (i * 7 % 251) as u8).collect();
        let bytes = encode_png(64, 64, ColorType::Rgba, &pixels);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(decode_png(truncated), Err(DecodeError::Png(_))));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(decode_png(b"not a png"), Err(DecodeError::Png(_))));
    }
}
