use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use super::DecodeError;

/// Shared (de)serialization contract for header/question wire structs.
///
/// Endianness is pinned to `BigEndian` since that is the only byte order DNS
/// ever uses on the wire; the trait still takes readers/writers generically
/// so a single impl covers both directions.
pub trait WireFormat: Sized + Default {
    fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> Result<(), DecodeError>;
    fn read(&mut self, reader: &mut BitReader<&[u8], BigEndian>) -> Result<(), DecodeError>;
}

const MAX_LABEL_POINTER_JUMPS: usize = 128;

/// Reads a label sequence, following compression pointers against `packet`.
///
/// `packet` is the full message buffer; pointers are only meaningful relative
/// to it, which is why label reads take the buffer as well as the reader.
pub fn read_labels(
    reader: &mut BitReader<&[u8], BigEndian>,
    packet: &[u8],
) -> Result<Vec<String>, DecodeError> {
    let mut labels = Vec::new();
    let mut jumps = 0usize;

    loop {
        let len_byte: u8 = reader.read_var(8)?;
        if len_byte == 0 {
            break;
        }
        if len_byte & 0xC0 == 0xC0 {
            let low: u8 = reader.read_var(8)?;
            let pointer = (((len_byte & 0x3F) as usize) << 8) | low as usize;
            jumps += 1;
            if jumps > MAX_LABEL_POINTER_JUMPS {
                return Err(DecodeError::LabelLoop);
            }
            let mut pointer_reader = BitReader::endian(
                packet.get(pointer..).ok_or(DecodeError::InvalidLabel)?,
                BigEndian,
            );
            let tail = read_labels_inner(&mut pointer_reader, packet, &mut jumps)?;
            labels.extend(tail);
            break;
        }
        if len_byte > 63 {
            return Err(DecodeError::InvalidLabel);
        }
        let mut buf = vec![0u8; len_byte as usize];
        reader.read_bytes(&mut buf)?;
        labels.push(String::from_utf8(buf).map_err(|_| DecodeError::InvalidLabel)?);
    }

    Ok(labels)
}

fn read_labels_inner(
    reader: &mut BitReader<&[u8], BigEndian>,
    packet: &[u8],
    jumps: &mut usize,
) -> Result<Vec<String>, DecodeError> {
    let mut labels = Vec::new();

    loop {
        let len_byte: u8 = reader.read_var(8)?;
        if len_byte == 0 {
            break;
        }
        if len_byte & 0xC0 == 0xC0 {
            let low: u8 = reader.read_var(8)?;
            let pointer = (((len_byte & 0x3F) as usize) << 8) | low as usize;
            *jumps += 1;
            if *jumps > MAX_LABEL_POINTER_JUMPS {
                return Err(DecodeError::LabelLoop);
            }
            let mut pointer_reader = BitReader::endian(
                packet.get(pointer..).ok_or(DecodeError::InvalidLabel)?,
                BigEndian,
            );
            labels.extend(read_labels_inner(&mut pointer_reader, packet, jumps)?);
            break;
        }
        if len_byte > 63 {
            return Err(DecodeError::InvalidLabel);
        }
        let mut buf = vec![0u8; len_byte as usize];
        reader.read_bytes(&mut buf)?;
        labels.push(String::from_utf8(buf).map_err(|_| DecodeError::InvalidLabel)?);
    }

    Ok(labels)
}

/// Writes a label sequence with no compression; this crate only ever encodes
/// its own SERVFAIL replies, so pointer compression on write is not needed.
pub fn write_labels(
    writer: &mut BitWriter<&mut Vec<u8>, BigEndian>,
    labels: &[String],
) -> Result<(), DecodeError> {
    for label in labels {
        if label.len() > 63 {
            return Err(DecodeError::InvalidLabel);
        }
        writer.write_var(8, label.len() as u8)?;
        writer.write_bytes(label.as_bytes())?;
    }
    writer.write_var(8, 0u8)?;
    Ok(())
}
