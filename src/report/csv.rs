//! Frame index as CSV
//!
//! One row per frame or junk region, in stream order. Handy for finding
//! where a broken file goes wrong.

use crate::scanner::{FrameDescriptor, FrameIndex};
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, index: &FrameIndex) -> io::Result<()> {
    writeln!(
        writer,
        "kind,number,offset,length,bitrate_kbps,padding,main_data_begin,main_data_len"
    )?;

    let mut rows: Vec<(u64, Row<'_>)> = Vec::with_capacity(index.len() + index.junk_regions().len() + 1);
    if let Some(info) = index.info_frame() {
        rows.push((info.offset, Row::Info(info)));
    }
    rows.extend(
        index
            .frames()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.offset, Row::Frame(i, f))),
    );
    rows.extend(
        index
            .junk_regions()
            .iter()
            .map(|j| (j.start, Row::Junk(j.len()))),
    );
    rows.sort_by_key(|(offset, _)| *offset);

    for (offset, row) in rows {
        match row {
            Row::Info(f) => frame_row(writer, "info", "", f)?,
            Row::Frame(i, f) => frame_row(writer, "frame", &i.to_string(), f)?,
            Row::Junk(len) => writeln!(writer, "junk,,{},{},,,,", offset, len)?,
        }
    }

    Ok(())
}

enum Row<'a> {
    Info(&'a FrameDescriptor),
    Frame(usize, &'a FrameDescriptor),
    Junk(u64),
}

fn frame_row<W: Write>(writer: &mut W, kind: &str, number: &str, f: &FrameDescriptor) -> io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{}",
        kind,
        number,
        f.offset,
        f.len,
        f.header.bitrate,
        u8::from(f.header.padding),
        f.main_data_begin,
        f.main_data_len
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp3::frame::tests::MPEG1_L3_128;
    use crate::scanner::tests::stream;
    use crate::scanner::{scan, DiscardJunk};

    #[test]
    fn test_rows_in_stream_order() {
        let mut data = b"junk".to_vec();
        data.extend(stream(MPEG1_L3_128, 2));
        let index = scan(&data[..], DiscardJunk).expect("scan").index;

        let mut out = Vec::new();
        write(&mut out, &index).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "junk,,0,4,,,,");
        assert_eq!(lines[2], "frame,0,4,417,128,0,0,381");
        assert_eq!(lines[3], "frame,1,421,417,128,0,0,381");
    }
}
