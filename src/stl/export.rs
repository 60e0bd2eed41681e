use std::io::Write;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{BINARY_FACET_LEN, BINARY_HEADER_LEN};
use crate::util_3d::{triangle_normal, Vector3};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StlFormat {
    Ascii,
    #[default]
    Binary,
}

pub fn write_ascii<W: Write>(mut w: W, name: &str, triangles: &[[Vector3; 3]]) -> Result<()> {
    writeln!(w, "solid {name}")?;
    for tri in triangles {
        let n = triangle_normal(tri);
        writeln!(w, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(w, "    outer loop")?;
        for v in tri {
            writeln!(w, "      vertex {:e} {:e} {:e}", v.x, v.y, v.z)?;
        }
        writeln!(w, "    endloop")?;
        writeln!(w, "  endfacet")?;
    }
    writeln!(w, "endsolid {name}")?;
    Ok(())
}

pub fn write_binary<W: Write>(mut w: W, header_name: &str, triangles: &[[Vector3; 3]]) -> Result<()> {
    let mut header = [0u8; BINARY_HEADER_LEN];
    let name_bytes = header_name.as_bytes();
    let copy_n = name_bytes.len().min(header.len());
    header[..copy_n].copy_from_slice(&name_bytes[..copy_n]);
    w.write_all(&header)?;
    w.write_all(&u32::try_from(triangles.len())?.to_le_bytes())?;

    let mut record = Vec::with_capacity(BINARY_FACET_LEN);
    for tri in triangles {
        record.clear();
        let n = triangle_normal(tri);
        for v in std::iter::once(&n).chain(tri) {
            record.extend_from_slice(&v.x.to_le_bytes());
            record.extend_from_slice(&v.y.to_le_bytes());
            record.extend_from_slice(&v.z.to_le_bytes());
        }
        record.extend_from_slice(&0u16.to_le_bytes());
        w.write_all(&record)?;
    }
    Ok(())
}
