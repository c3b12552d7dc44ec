/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/track_codec.rs

    TrackCodec: the raw-track byte layout READ_TRACK/WRITE_TRACK deal in.
    This doesn't model real MFM bit-cells (spec.md Non-goals) - it fakes
    a plausible gap/mark structure around each logical sector so that
    client software doing its own track-level parsing sees credible bytes.
*/
use crate::chs::IdField;

const GAP_FILL: u8 = 0x4E;
const SYNC_FILL: u8 = 0x00;
const GAP1_LEN: usize = 32;
const ID_GAP_LEN: usize = 22;
const ID_SYNC_LEN: usize = 12;
const DATA_GAP_LEN: usize = 22;
const DATA_SYNC_LEN: usize = 8;
const GAP4_LEN: usize = 16;

const MARK_A1: u8 = 0xA1;
const MARK_F5: u8 = 0xF5;
const ID_ADDRESS_MARK: u8 = 0xFE;
const DATA_ADDRESS_MARK: u8 = 0xFB;
const CRC_MARKER: u8 = 0xF7;

/// One sector to encode onto a track: its identity and data payload.
pub struct EncodeSector<'a> {
    pub id: IdField,
    pub data: &'a [u8],
}

/// Encode a full track's raw byte layout: gap 1, then each sector's
/// ID block, data block, and trailing gap, in rotational order.
pub fn encode_track(sectors: &[EncodeSector<'_>]) -> Vec<u8> {
    let mut out = vec![GAP_FILL; GAP1_LEN];

    for sector in sectors {
        out.extend(std::iter::repeat_n(GAP_FILL, ID_GAP_LEN));
        out.extend(std::iter::repeat_n(SYNC_FILL, ID_SYNC_LEN));
        out.extend(std::iter::repeat_n(MARK_A1, 3));
        out.push(ID_ADDRESS_MARK);
        out.push(sector.id.cylinder);
        out.push(sector.id.head);
        out.push(sector.id.sector);
        out.push(sector.id.size_code());
        out.extend_from_slice(&sector.id.crc);

        out.extend(std::iter::repeat_n(GAP_FILL, DATA_GAP_LEN));
        out.extend(std::iter::repeat_n(SYNC_FILL, DATA_SYNC_LEN));
        out.extend(std::iter::repeat_n(MARK_A1, 3));
        out.push(DATA_ADDRESS_MARK);
        out.extend_from_slice(sector.data);
        out.push(CRC_MARKER);

        out.extend(std::iter::repeat_n(GAP_FILL, GAP4_LEN));
    }

    out
}

/// Consume a run of `byte`, requiring at least `min` repetitions. Returns
/// the new cursor position past the run, or `None` if the run is too short.
fn consume_min(buf: &[u8], pos: usize, byte: u8, min: usize) -> Option<usize> {
    let mut i = pos;
    while i < buf.len() && buf[i] == byte {
        i += 1;
    }
    if i - pos >= min {
        Some(i)
    } else {
        None
    }
}

fn consume_exact(buf: &[u8], pos: usize, byte: u8, count: usize) -> Option<usize> {
    if pos + count <= buf.len() && buf[pos..pos + count].iter().all(|&b| b == byte) {
        Some(pos + count)
    } else {
        None
    }
}

fn consume_byte(buf: &[u8], pos: usize, byte: u8) -> Option<usize> {
    if buf.get(pos) == Some(&byte) {
        Some(pos + 1)
    } else {
        None
    }
}

/// Attempt to parse one sector block (ID mark through trailing gap 4)
/// starting at `pos`. Returns the parsed ID and the cursor position past
/// the block, or `None` if the block doesn't parse.
fn parse_sector(buf: &[u8], pos: usize) -> Option<(IdField, usize)> {
    let mut p = pos;
    p = consume_exact(buf, p, SYNC_FILL, ID_SYNC_LEN)?;
    p = consume_exact(buf, p, MARK_F5, 3)?;
    p = consume_byte(buf, p, ID_ADDRESS_MARK)?;

    if p + 6 > buf.len() {
        return None;
    }
    let cylinder = buf[p];
    let head = buf[p + 1];
    let sector = buf[p + 2];
    let size_code = buf[p + 3];
    p += 6; // skip cylinder, head, sector, size, crc1, crc2

    let id = IdField::new(cylinder, head, sector, size_code, [0, 0])?;

    p = consume_byte(buf, p, CRC_MARKER)?;
    p = consume_min(buf, p, GAP_FILL, DATA_GAP_LEN)?;
    p = consume_min(buf, p, SYNC_FILL, DATA_SYNC_LEN)?;
    p = consume_exact(buf, p, MARK_F5, 3)?;
    p = consume_byte(buf, p, DATA_ADDRESS_MARK)?;

    let data_len = id.data_len();
    if p + data_len > buf.len() {
        return None;
    }
    p += data_len;

    p = consume_byte(buf, p, CRC_MARKER)?;
    // Gap 4 may be truncated at end-of-track; don't require the full run.
    p = consume_min(buf, p, GAP_FILL, 1).unwrap_or(p);

    Some((id, p))
}

/// Decode a raw track buffer back into the sector IDs it encodes. Sector
/// payload bytes are never extracted (spec.md S:4.3); a caller that needs
/// sector data synthesises a fill using each ID's `data_len()`.
pub fn decode_track(buf: &[u8]) -> Vec<IdField> {
    let Some(mut pos) = consume_min(buf, 0, GAP_FILL, GAP1_LEN) else {
        return Vec::new();
    };

    let mut ids = Vec::new();
    while pos < buf.len() {
        let Some(gap_end) = consume_min(buf, pos, GAP_FILL, 0) else {
            break;
        };
        let next_mark = buf[gap_end..]
            .iter()
            .position(|&b| b != GAP_FILL)
            .map(|offset| gap_end + offset);
        let Some(candidate) = next_mark else { break };

        match parse_sector(buf, candidate) {
            Some((id, end)) => {
                ids.push(id);
                pos = end;
            }
            None => {
                // Resync on the next ID address mark rather than aborting
                // the whole track over one malformed sector: back up to
                // where that mark's preceding sync run should start.
                let search_from = candidate + 1;
                match buf.get(search_from..).and_then(|rest| rest.iter().position(|&b| b == ID_ADDRESS_MARK)) {
                    Some(offset) => {
                        let mark_pos = search_from + offset;
                        pos = mark_pos.saturating_sub(ID_SYNC_LEN + 3);
                        if pos <= candidate {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(sector: u8) -> IdField {
        IdField::new(5, 0, sector, 2, [0xAB, 0xCD]).unwrap()
    }

    #[test]
    fn encode_starts_with_gap1() {
        let data = vec![0u8; 512];
        let track = encode_track(&[EncodeSector { id: id(1), data: &data }]);
        assert!(track[..32].iter().all(|&b| b == GAP_FILL));
    }

    /// Build a WRITE_TRACK-style host buffer: the format `decode_track`
    /// parses, distinct from `encode_track`'s READ_TRACK output - the host
    /// writes `0xF5` sync bytes and an extra `0xF7` CRC-write marker after
    /// each ID field that a real READ_TRACK response never echoes back.
    fn write_track_buffer(ids: &[IdField], sector_size: usize) -> Vec<u8> {
        let mut out = vec![GAP_FILL; GAP1_LEN];
        for id in ids {
            out.extend(std::iter::repeat_n(GAP_FILL, ID_GAP_LEN));
            out.extend(std::iter::repeat_n(SYNC_FILL, ID_SYNC_LEN));
            out.extend(std::iter::repeat_n(MARK_F5, 3));
            out.push(ID_ADDRESS_MARK);
            out.push(id.cylinder);
            out.push(id.head);
            out.push(id.sector);
            out.push(id.size_code());
            out.extend_from_slice(&id.crc);
            out.push(CRC_MARKER);

            out.extend(std::iter::repeat_n(GAP_FILL, DATA_GAP_LEN));
            out.extend(std::iter::repeat_n(SYNC_FILL, DATA_SYNC_LEN));
            out.extend(std::iter::repeat_n(MARK_F5, 3));
            out.push(DATA_ADDRESS_MARK);
            out.extend(std::iter::repeat_n(0u8, sector_size));
            out.push(CRC_MARKER);
            out.extend(std::iter::repeat_n(GAP_FILL, GAP4_LEN));
        }
        out
    }

    #[test]
    fn write_track_buffer_decodes_every_sector() {
        let ids: Vec<IdField> = (1..=10u8).map(id).collect();
        let buf = write_track_buffer(&ids, 512);

        let decoded = decode_track(&buf);
        assert_eq!(decoded.len(), 10);
        for (i, d) in decoded.iter().enumerate() {
            assert_eq!(d.sector, i as u8 + 1);
            assert_eq!(d.crc, [0, 0]);
        }
    }

    #[test]
    fn decode_skips_malformed_sector() {
        let ids: Vec<IdField> = (1..=3u8).map(id).collect();
        let mut buf = write_track_buffer(&ids, 512);

        // Corrupt the second sector's ID address mark.
        let second_mark = buf
            .iter()
            .enumerate()
            .filter(|(_, &b)| b == ID_ADDRESS_MARK)
            .nth(1)
            .map(|(i, _)| i)
            .unwrap();
        buf[second_mark] = 0x00;

        let decoded = decode_track(&buf);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].sector, 1);
        assert_eq!(decoded[1].sector, 3);
    }
}
