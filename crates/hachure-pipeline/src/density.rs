//! Pixel density detection from embedded image metadata.
//!
//! Reads the PNG `pHYs` chunk or the JPEG JFIF `APP0` segment straight
//! from the encoded bytes. Anything missing, malformed, zero or in an
//! unknown unit counts as undetected, and callers fall back to
//! [`DEFAULT_PPI`](crate::types::DEFAULT_PPI).

/// Lowest density accepted from metadata.
pub const MIN_PPI: f64 = 50.0;

/// Highest density accepted from metadata.
pub const MAX_PPI: f64 = 1200.0;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const INCHES_PER_METER: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;

/// Pixels per inch declared by the image, clamped to
/// `[MIN_PPI, MAX_PPI]`, or `None` if no usable density is present.
#[must_use]
pub fn detect_ppi(bytes: &[u8]) -> Option<f64> {
    let ppi = if bytes.starts_with(&PNG_SIGNATURE) {
        png_ppi(bytes)
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        jpeg_ppi(bytes)
    } else {
        None
    }?;
    tracing::debug!(ppi, "density detected");
    Some(ppi.clamp(MIN_PPI, MAX_PPI))
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Walk PNG chunks up to `IDAT` looking for `pHYs`.
fn png_ppi(bytes: &[u8]) -> Option<f64> {
    let mut pos = PNG_SIGNATURE.len();
    loop {
        let len = usize::try_from(be_u32(bytes, pos)?).ok()?;
        let kind = bytes.get(pos + 4..pos + 8)?;
        let data = pos + 8;
        match kind {
            b"pHYs" => {
                if len < 9 {
                    tracing::debug!(len, "pHYs chunk too short");
                    return None;
                }
                let x_ppm = be_u32(bytes, data)?;
                let unit = *bytes.get(data + 8)?;
                if unit != 1 || x_ppm == 0 {
                    tracing::debug!(unit, x_ppm, "pHYs density not usable");
                    return None;
                }
                return Some(f64::from(x_ppm) * INCHES_PER_METER);
            }
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }
        // length + type + data + crc
        pos = data.checked_add(len)?.checked_add(4)?;
    }
}

/// Walk JPEG marker segments up to start-of-scan looking for JFIF `APP0`.
fn jpeg_ppi(bytes: &[u8]) -> Option<f64> {
    const APP0: u8 = 0xE0;
    const SOS: u8 = 0xDA;

    let mut pos = 2;
    loop {
        if *bytes.get(pos)? != 0xFF {
            tracing::debug!(pos, "JPEG marker sync lost");
            return None;
        }
        let marker = *bytes.get(pos + 1)?;
        if marker == SOS {
            return None;
        }
        let size = usize::from(be_u16(bytes, pos + 2)?);
        if marker == APP0 && size >= 16 && bytes.get(pos + 4..pos + 9) == Some(&b"JFIF\0"[..]) {
            // version (2), units (1), x density (2), y density (2)
            let units = *bytes.get(pos + 11)?;
            let x = f64::from(be_u16(bytes, pos + 12)?);
            let y = f64::from(be_u16(bytes, pos + 14)?);
            let mean = (x + y) / 2.0;
            return match units {
                _ if mean <= 0.0 => {
                    tracing::debug!("JFIF density is zero");
                    None
                }
                1 => Some(mean),
                2 => Some(mean * CM_PER_INCH),
                _ => {
                    tracing::debug!(units, "JFIF density has no physical unit");
                    None
                }
            };
        }
        pos = pos.checked_add(2 + size)?;
    }
}
