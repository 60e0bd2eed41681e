use anyhow::Result;
use std::io::Read;

use crate::util_3d::Vector3;

pub mod data;
pub mod export;
pub mod scan;

pub use data::{Facet, parse_facets};
pub use scan::{SolidDescriptor, extract_solid, scan_solids};

// Size of the binary header and of each binary facet record
pub const BINARY_HEADER_LEN: usize = 80;
pub const BINARY_FACET_LEN: usize = 50;

fn read_u16(rdr: &mut impl Read) -> Result<u16> {
    let mut x = [0; 2];
    rdr.read_exact(&mut x)?;
    Ok(u16::from_le_bytes(x))
}
fn read_u32(rdr: &mut impl Read) -> Result<u32> {
    let mut x = [0; 4];
    rdr.read_exact(&mut x)?;
    Ok(u32::from_le_bytes(x))
}
fn read_f32(rdr: &mut impl Read) -> Result<f32> {
    let mut x = [0; 4];
    rdr.read_exact(&mut x)?;
    Ok(f32::from_le_bytes(x))
}
fn read_vector3_f32(rdr: &mut impl Read) -> Result<Vector3> {
    let x = read_f32(rdr)?;
    let y = read_f32(rdr)?;
    let z = read_f32(rdr)?;
    Ok(Vector3::new(x, y, z))
}

/// Returns true if the data should go through the text pipeline.
///
/// The marker is the `solid` keyword as the first token. Some binary exporters also write
/// `solid` at the start of the 80 byte header, so a buffer without any `facet` keyword whose
/// length matches the binary layout exactly is still considered binary.
pub fn is_ascii_stl(bytes: &[u8]) -> bool {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let rest = &bytes[start..];
    let marker = rest.starts_with(b"solid")
        && rest.get(5).is_none_or(|b| b.is_ascii_whitespace());
    if !marker {
        return false;
    }
    if let Some(n) = binary_facet_count(bytes) {
        let expected = BINARY_HEADER_LEN + 4 + n as usize * BINARY_FACET_LEN;
        let has_facet = bytes.windows(5).any(|w| w == b"facet");
        if expected == bytes.len() && !has_facet {
            return false;
        }
    }
    true
}

fn binary_facet_count(bytes: &[u8]) -> Option<u32> {
    let count = bytes.get(BINARY_HEADER_LEN..BINARY_HEADER_LEN + 4)?;
    Some(u32::from_le_bytes([count[0], count[1], count[2], count[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_text_marker() {
        assert!(is_ascii_stl(b"solid cube\nendsolid cube\n"));
        assert!(is_ascii_stl(b"  \n solid\nendsolid\n"));
        assert!(!is_ascii_stl(b"solidified\n"));
        assert!(!is_ascii_stl(b"SOLID x\n"));
    }

    #[test]
    fn binary_with_solid_header_is_binary() {
        let mut bytes = vec![b' '; BINARY_HEADER_LEN];
        bytes[..11].copy_from_slice(b"solid model");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&[0; BINARY_FACET_LEN]);
        assert!(!is_ascii_stl(&bytes));
    }
}
