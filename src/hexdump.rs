//! Hex dump in the layout the sample programs print

use std::io::{self, Write};

/// Dump `data` under `title`, 16 bytes per line
///
/// Each line starts with the offset `base + i` in four hex digits; an extra
/// space separates the two halves of a line. The dump ends with a newline.
pub fn dump(out: &mut dyn Write, title: &str, base: usize, data: &[u8]) -> io::Result<()> {
    write!(out, "{}", title)?;
    for (i, byte) in data.iter().enumerate() {
        if i % 16 == 0 {
            write!(out, "\n{:04x}:  ", base + i)?;
        }
        write!(out, "{:02x} ", byte)?;
        if (i + 1) % 8 == 0 {
            write!(out, " ")?;
        }
    }
    writeln!(out)
}
