use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tabletop_core::{Colors, PointCloud};

// PCD stores f32; positions are converted on write and widen on read.
// RGB uses the packed-float convention: the color bytes live in the low
// 24 bits of the float's bit pattern.

/// Writes a PCD file in ASCII format. Emits `x y z` fields, plus a packed
/// `rgb` field when the cloud carries colors.
pub fn write_pcd(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let has_rgb = cloud.colors.is_some();
    let mut out = header(cloud.len(), has_rgb, "ascii");

    for i in 0..cloud.len() {
        out.push_str(&format!(
            "{} {} {}",
            cloud.x[i] as f32, cloud.y[i] as f32, cloud.z[i] as f32
        ));
        if let Some(c) = &cloud.colors {
            out.push_str(&format!(" {}", pack_rgb(c.r[i], c.g[i], c.b[i])));
        }
        out.push('\n');
    }

    fs::write(path, out)
}

/// Writes a PCD file in binary format (the persistence sink's default).
pub fn write_pcd_binary(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let has_rgb = cloud.colors.is_some();
    let header = header(cloud.len(), has_rgb, "binary");

    let fields = if has_rgb { 4 } else { 3 };
    let mut buf = Vec::with_capacity(header.len() + cloud.len() * fields * 4);
    buf.extend_from_slice(header.as_bytes());

    for i in 0..cloud.len() {
        buf.extend_from_slice(&(cloud.x[i] as f32).to_le_bytes());
        buf.extend_from_slice(&(cloud.y[i] as f32).to_le_bytes());
        buf.extend_from_slice(&(cloud.z[i] as f32).to_le_bytes());
        if let Some(c) = &cloud.colors {
            buf.extend_from_slice(&pack_rgb(c.r[i], c.g[i], c.b[i]).to_le_bytes());
        }
    }

    fs::write(path, buf)
}

/// Reads a PCD file (ASCII or binary), recovering colors from a packed
/// `rgb` field when present.
pub fn read_pcd(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let raw = fs::read(path)?;

    let header_str = find_header(&raw)?;
    let data_format = parse_data_format(&header_str)?;
    let num_points = parse_points_count(&header_str)?;
    let field_names = parse_fields(&header_str);

    match data_format {
        DataFormat::Ascii => read_pcd_ascii(&raw, &field_names),
        DataFormat::Binary => read_pcd_binary(&raw, num_points, &field_names),
    }
}

fn header(num_points: usize, has_rgb: bool, data: &str) -> String {
    let mut out = String::new();
    out.push_str("# .PCD v0.7 - Point Cloud Data file format\n");
    out.push_str("VERSION 0.7\n");
    if has_rgb {
        out.push_str("FIELDS x y z rgb\n");
        out.push_str("SIZE 4 4 4 4\n");
        out.push_str("TYPE F F F F\n");
        out.push_str("COUNT 1 1 1 1\n");
    } else {
        out.push_str("FIELDS x y z\n");
        out.push_str("SIZE 4 4 4\n");
        out.push_str("TYPE F F F\n");
        out.push_str("COUNT 1 1 1\n");
    }
    out.push_str(&format!("WIDTH {}\n", num_points));
    out.push_str("HEIGHT 1\n");
    out.push_str("VIEWPOINT 0 0 0 1 0 0 0\n");
    out.push_str(&format!("POINTS {}\n", num_points));
    out.push_str(&format!("DATA {}\n", data));
    out
}

#[inline]
fn pack_rgb(r: u8, g: u8, b: u8) -> f32 {
    let bits = ((r as u32) << 16) | ((g as u32) << 8) | (b as u32);
    f32::from_bits(bits)
}

#[inline]
fn unpack_rgb(v: f32) -> (u8, u8, u8) {
    let bits = v.to_bits();
    (
        ((bits >> 16) & 0xff) as u8,
        ((bits >> 8) & 0xff) as u8,
        (bits & 0xff) as u8,
    )
}

// --- Internal helpers ---

#[derive(Debug, PartialEq)]
enum DataFormat {
    Ascii,
    Binary,
}

/// Extracts the header as a UTF-8 string (up to and including the DATA line).
fn find_header(raw: &[u8]) -> io::Result<String> {
    let text = std::str::from_utf8(raw)
        .ok()
        .or_else(|| {
            // Binary files have an ASCII header followed by a binary body.
            find_data_line_end(raw).and_then(|end| std::str::from_utf8(&raw[..end]).ok())
        })
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "PCD header is not valid UTF-8")
        })?;

    for line in text.lines() {
        if line.trim_start().starts_with("DATA") {
            let offset = text
                .find(line)
                .map(|pos| pos + line.len())
                .unwrap_or(text.len());
            return Ok(text[..offset].to_string());
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "PCD file missing DATA line",
    ))
}

/// Byte offset just past the newline ending the DATA line.
fn find_data_line_end(raw: &[u8]) -> Option<usize> {
    let data_marker = b"DATA";
    for i in 0..raw.len().saturating_sub(data_marker.len()) {
        if (i == 0 || raw[i - 1] == b'\n') && raw[i..].starts_with(data_marker) {
            if let Some(offset) = raw[i..].iter().position(|&b| b == b'\n') {
                return Some(i + offset + 1);
            }
            return Some(raw.len());
        }
    }
    None
}

fn parse_data_format(header: &str) -> io::Result<DataFormat> {
    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("DATA") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() >= 2 {
                return match parts[1] {
                    "ascii" => Ok(DataFormat::Ascii),
                    "binary" => Ok(DataFormat::Binary),
                    other => Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("unsupported PCD DATA format: {}", other),
                    )),
                };
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "PCD file missing DATA line",
    ))
}

fn parse_points_count(header: &str) -> io::Result<usize> {
    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("POINTS") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() >= 2 {
                return parts[1].parse::<usize>().map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid POINTS value: {}", e),
                    )
                });
            }
        }
    }

    // Fall back to WIDTH if POINTS is not found
    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("WIDTH") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() >= 2 {
                return parts[1].parse::<usize>().map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid WIDTH value: {}", e),
                    )
                });
            }
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "PCD file missing POINTS/WIDTH header",
    ))
}

fn parse_fields(header: &str) -> Vec<String> {
    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("FIELDS") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            return parts[1..].iter().map(|s| s.to_string()).collect();
        }
    }
    vec!["x".to_string(), "y".to_string(), "z".to_string()]
}

fn read_pcd_ascii(raw: &[u8], field_names: &[String]) -> io::Result<PointCloud> {
    let content = std::str::from_utf8(raw)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid UTF-8: {}", e)))?;

    let idx_rgb = field_names.iter().position(|n| n == "rgb");

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut z = Vec::new();
    let mut colors = idx_rgb.map(|_| Colors {
        r: Vec::new(),
        g: Vec::new(),
        b: Vec::new(),
    });

    let mut in_data = false;
    for line in content.lines() {
        if line.trim_start().starts_with("DATA") {
            in_data = true;
            continue;
        }
        if !in_data || line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        x.push(parts[0].parse::<f32>().unwrap_or(0.0) as f64);
        y.push(parts[1].parse::<f32>().unwrap_or(0.0) as f64);
        z.push(parts[2].parse::<f32>().unwrap_or(0.0) as f64);

        if let (Some(c), Some(idx)) = (&mut colors, idx_rgb) {
            let packed = parts
                .get(idx)
                .and_then(|s| s.parse::<f32>().ok())
                .unwrap_or(0.0);
            let (r, g, b) = unpack_rgb(packed);
            c.r.push(r);
            c.g.push(g);
            c.b.push(b);
        }
    }

    let mut cloud = PointCloud::from_xyz(x, y, z);
    cloud.colors = colors;
    Ok(cloud)
}

fn read_pcd_binary(
    raw: &[u8],
    num_points: usize,
    field_names: &[String],
) -> io::Result<PointCloud> {
    let data_offset = find_data_line_end(raw).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "cannot find DATA line in binary PCD",
        )
    })?;

    let num_fields = field_names.len();
    let point_byte_size = num_fields * 4; // every field is 4 bytes
    let data_slice = &raw[data_offset..];
    let expected_size = num_points * point_byte_size;

    if data_slice.len() < expected_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "binary PCD data too short: have {} bytes, expected {} ({} points x {} fields x 4)",
                data_slice.len(),
                expected_size,
                num_points,
                num_fields
            ),
        ));
    }

    let idx_x = field_names.iter().position(|n| n == "x");
    let idx_y = field_names.iter().position(|n| n == "y");
    let idx_z = field_names.iter().position(|n| n == "z");
    let idx_rgb = field_names.iter().position(|n| n == "rgb");

    let (idx_x, idx_y, idx_z) = match (idx_x, idx_y, idx_z) {
        (Some(ix), Some(iy), Some(iz)) => (ix, iy, iz),
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "binary PCD file missing x, y, z fields",
            ));
        }
    };

    let mut x = Vec::with_capacity(num_points);
    let mut y = Vec::with_capacity(num_points);
    let mut z = Vec::with_capacity(num_points);
    let mut colors = idx_rgb.map(|_| Colors {
        r: Vec::with_capacity(num_points),
        g: Vec::with_capacity(num_points),
        b: Vec::with_capacity(num_points),
    });

    let mut cursor = io::Cursor::new(data_slice);
    let mut point_buf = vec![0u8; point_byte_size];

    for _ in 0..num_points {
        cursor.read_exact(&mut point_buf)?;

        let read_f32_at = |field_idx: usize| -> f32 {
            let byte_offset = field_idx * 4;
            let bytes = [
                point_buf[byte_offset],
                point_buf[byte_offset + 1],
                point_buf[byte_offset + 2],
                point_buf[byte_offset + 3],
            ];
            f32::from_le_bytes(bytes)
        };

        x.push(read_f32_at(idx_x) as f64);
        y.push(read_f32_at(idx_y) as f64);
        z.push(read_f32_at(idx_z) as f64);

        if let (Some(c), Some(idx)) = (&mut colors, idx_rgb) {
            let (r, g, b) = unpack_rgb(read_f32_at(idx));
            c.r.push(r);
            c.g.push(g);
            c.b.push(b);
        }
    }

    let mut cloud = PointCloud::from_xyz(x, y, z);
    cloud.colors = colors;
    Ok(cloud)
}
