use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use super::DecodeError;
use super::enums::{ResourceClass, ResourceType};
use super::wire::{read_labels, write_labels};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Question {
    pub labels: Vec<String>,
    pub qtype: ResourceType,
    pub qclass: ResourceClass,
}

impl Question {
    pub fn name(&self) -> String {
        self.labels.join(".")
    }

    pub fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> Result<(), DecodeError> {
        write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.qtype.into())?;
        writer.write_var::<u16>(16, self.qclass.into())?;
        Ok(())
    }

    pub fn read(
        reader: &mut BitReader<&[u8], BigEndian>,
        packet: &[u8],
    ) -> Result<Self, DecodeError> {
        let labels = read_labels(reader, packet)?;
        let qtype: u16 = reader.read_var(16)?;
        let qclass: u16 = reader.read_var(16)?;
        Ok(Question {
            labels,
            qtype: qtype.into(),
            qclass: qclass.into(),
        })
    }
}
