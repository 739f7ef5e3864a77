//! Point cloud files: binary PLY per tick, ASCII PCD for the accumulated sweep

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use contracts::LidarPoint;

use crate::error::{ExportError, Result};

/// Write `points` as binary little-endian PLY with x/y/z/intensity
pub fn write_ply(path: &Path, points: &[LidarPoint]) -> Result<()> {
    let io = |e| ExportError::io(path, e);
    let mut out = BufWriter::new(File::create(path).map_err(io)?);

    let header = format!(
        "ply\nformat binary_little_endian 1.0\nelement vertex {}\n\
         property float x\nproperty float y\nproperty float z\nproperty float intensity\n\
         end_header\n",
        points.len()
    );
    out.write_all(header.as_bytes()).map_err(io)?;
    for p in points {
        for v in [p.x, p.y, p.z, p.intensity] {
            out.write_all(&v.to_le_bytes()).map_err(io)?;
        }
    }
    out.flush().map_err(io)
}

/// Write `points` as ASCII PCD (v0.7) with x/y/z
pub fn write_pcd(path: &Path, points: &[LidarPoint]) -> Result<()> {
    let io = |e| ExportError::io(path, e);
    let mut out = BufWriter::new(File::create(path).map_err(io)?);

    write!(
        out,
        "# .PCD v0.7 - Point Cloud Data file format\n\
         VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\n\
         WIDTH {n}\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS {n}\nDATA ascii\n",
        n = points.len()
    )
    .map_err(io)?;
    for p in points {
        writeln!(out, "{} {} {}", p.x, p.y, p.z).map_err(io)?;
    }
    out.flush().map_err(io)
}
