use bitstream_io::{BigEndian, BitReader, BitWriter};

use super::DecodeError;
use super::enums::Rcode;
use super::header::Header;
use super::question::Question;
use super::wire::WireFormat;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
}

impl Message {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = BitReader::endian(buf, BigEndian);
        let mut header = Header::default();
        header.read(&mut reader)?;

        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            questions.push(Question::read(&mut reader, buf)?);
        }

        Ok(Message { header, questions })
    }

    /// Re-encodes this message. Only used for locally-synthesized SERVFAIL
    /// replies; a winning upstream reply is forwarded byte-for-byte instead.
    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let mut buf = Vec::new();
        {
            let mut writer = BitWriter::endian(&mut buf, BigEndian);
            self.header.write(&mut writer)?;
            for question in &self.questions {
                question.write(&mut writer)?;
            }
        }
        Ok(buf)
    }

    /// Overwrites rcode with SERVFAIL, strips the answer/authority/additional
    /// counts to zero, and leaves id, flags, and the question section intact.
    pub fn to_servfail(&self) -> Message {
        let mut header = self.header.clone();
        header.qr = true;
        header.rcode = Rcode::SERVER_FAILURE;
        header.ancount = 0;
        header.nscount = 0;
        header.arcount = 0;
        Message {
            header,
            questions: self.questions.clone(),
        }
    }
}
