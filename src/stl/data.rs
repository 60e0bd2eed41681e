use std::io::Read;
use anyhow::{Result, bail};
use cgmath::Zero;

use super::{read_u16, read_u32, read_vector3_f32, BINARY_FACET_LEN, BINARY_HEADER_LEN};
use crate::util_3d::Vector3;

#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub normal: Vector3,
    pub vertices: [Vector3; 3],
}

// Parses the three numbers after a keyword, None if any of them is missing or invalid
fn parse_vector3<'a>(mut words: impl Iterator<Item = &'a str>) -> Option<Vector3> {
    let x = words.next()?.parse().ok()?;
    let y = words.next()?.parse().ok()?;
    let z = words.next()?.parse().ok()?;
    Some(Vector3::new(x, y, z))
}

struct OpenFacet {
    normal: Option<Vector3>,
    vertices: Vec<Vector3>,
}

/// Parses the facets of one `solid ... endsolid` block of an ASCII STL.
///
/// Never fails: unparsable normals are left as zero, unparsable vertices are skipped and facets
/// with fewer than 3 vertices are dropped. Lines that are not `facet`, `vertex` or `endfacet`
/// are ignored.
pub fn parse_facets(text: &str) -> Vec<Facet> {
    let mut facets = Vec::new();
    let mut current: Option<OpenFacet> = None;
    let mut dropped = 0;

    for (i_line, line) in text.lines().enumerate() {
        let mut words = line.split_ascii_whitespace();
        match words.next() {
            Some("facet") => {
                if words.next() != Some("normal") {
                    continue;
                }
                if current.is_some() {
                    // missing "endfacet"
                    dropped += 1;
                }
                let normal = parse_vector3(words);
                if normal.is_none() {
                    log::debug!("invalid normal at line {}: {:?}", i_line + 1, line.trim());
                }
                current = Some(OpenFacet {
                    normal,
                    vertices: Vec::with_capacity(3),
                });
            }
            Some("vertex") => {
                let Some(facet) = &mut current else { continue };
                match parse_vector3(words) {
                    Some(v) => facet.vertices.push(v),
                    None => log::debug!("invalid vertex at line {}: {:?}", i_line + 1, line.trim()),
                }
            }
            Some("endfacet") => {
                let Some(facet) = current.take() else { continue };
                if facet.vertices.len() < 3 {
                    dropped += 1;
                    continue;
                }
                facets.push(Facet {
                    normal: facet.normal.unwrap_or_else(Vector3::zero),
                    vertices: [facet.vertices[0], facet.vertices[1], facet.vertices[2]],
                });
            }
            // "outer loop", "endloop", "solid", "endsolid" carry no data
            _ => {}
        }
    }
    if current.is_some() {
        dropped += 1;
    }
    if dropped > 0 {
        log::warn!("{dropped} malformed facets dropped");
    }
    facets
}

fn read_binary_facet(rdr: &mut impl Read) -> Result<Facet> {
    let normal = read_vector3_f32(rdr)?;
    let v0 = read_vector3_f32(rdr)?;
    let v1 = read_vector3_f32(rdr)?;
    let v2 = read_vector3_f32(rdr)?;
    let _attr = read_u16(rdr)?;
    Ok(Facet {
        normal,
        vertices: [v0, v1, v2],
    })
}

/// Decodes a binary STL: 80 byte header, facet count and 50 byte records.
///
/// A file shorter than its facet count says is accepted as long as at least one facet is there.
pub fn decode_binary<R: Read>(mut f: R) -> Result<Vec<Facet>> {
    let mut hdr = [0; BINARY_HEADER_LEN];
    f.read_exact(&mut hdr)?;
    let rdr = &mut f;
    let n_tris = read_u32(rdr)?;
    // do not trust the count for the allocation, a corrupted file could ask for anything
    let mut tris = Vec::with_capacity((n_tris as usize).min(1 << 20));
    for i in 0 .. n_tris {
        match read_binary_facet(rdr) {
            Ok(facet) => tris.push(facet),
            Err(e) if tris.is_empty() => bail!("truncated binary STL, no facet could be read: {e}"),
            Err(_) => {
                log::warn!("binary STL truncated after {i} of {n_tris} facets ({BINARY_FACET_LEN} bytes each)");
                break;
            }
        }
    }
    Ok(tris)
}
