//! The EDNS(0) OPT pseudo-record. OPT repurposes the generic resource
//! record's class and TTL fields: class becomes the advertised UDP
//! payload size, and TTL is split into the extended-RCODE high byte,
//! the EDNS version, and 16 flag bits.

use bytes::Bytes;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::error::{Error, MalformedDetail, WireRcode};

/// One `{code, data}` entry in an OPT record's RDATA.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Bytes,
}

/// The decoded shape of an OPT record, standing in for the raw
/// class/TTL reinterpretation described in RFC 6891.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct OptRecord {
    /// Advertised UDP payload size; carried in the wire class field.
    pub udp_payload_size: u16,
    /// High 8 bits of the 12-bit extended response code; TTL bits 24-31.
    pub extended_rcode_high: u8,
    /// EDNS version; TTL bits 16-23.
    pub version: u8,
    /// EDNS flag bits (e.g. the DO bit); TTL bits 0-15.
    pub flags: u16,
    pub options: Vec<EdnsOption>,
}

impl OptRecord {
    pub fn empty(udp_payload_size: u16) -> Self {
        OptRecord {
            udp_payload_size,
            extended_rcode_high: 0,
            version: 0,
            flags: 0,
            options: Vec::new(),
        }
    }

    pub fn ttl(&self) -> u32 {
        (u32::from(self.extended_rcode_high) << 24)
            | (u32::from(self.version) << 16)
            | u32::from(self.flags)
    }

    pub fn from_ttl(udp_payload_size: u16, ttl: u32, options: Vec<EdnsOption>) -> Self {
        OptRecord {
            udp_payload_size,
            extended_rcode_high: (ttl >> 24) as u8,
            version: (ttl >> 16) as u8,
            flags: (ttl & 0xFFFF) as u16,
            options,
        }
    }

    pub fn write_rdata(&self, buf: &mut WriteBuffer) -> Result<(), Error> {
        for option in &self.options {
            buf.write_u16(option.code)?;
            let len = u16::try_from(option.data.len()).map_err(|_| Error::BufferOverflow)?;
            buf.write_u16(len)?;
            buf.write_octets(&option.data)?;
        }
        Ok(())
    }

    pub fn read_rdata(buf: &mut ReadBuffer, rdlength: u16) -> Result<Vec<EdnsOption>, Error> {
        let stop = buf.position() + usize::from(rdlength);
        let mut options = Vec::new();
        while buf.position() < stop {
            let code = buf
                .next_u16()
                .ok_or_else(|| malformed(MalformedDetail::RecordPayloadTooShort))?;
            let len = buf
                .next_u16()
                .ok_or_else(|| malformed(MalformedDetail::RecordPayloadTooShort))?;
            let data = buf
                .take(usize::from(len))
                .ok_or_else(|| malformed(MalformedDetail::RecordPayloadTooShort))?;
            options.push(EdnsOption {
                code,
                data: Bytes::copy_from_slice(data),
            });
        }
        if buf.position() != stop {
            return Err(malformed(MalformedDetail::RecordPayloadTooShort));
        }
        Ok(options)
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for EdnsOption {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let len = u.int_in_range(0..=16usize)?;
        Ok(EdnsOption {
            code: u.arbitrary()?,
            data: Bytes::from(u.bytes(len)?.to_vec()),
        })
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for OptRecord {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let n_options = u.int_in_range(0..=4usize)?;
        let mut options = Vec::with_capacity(n_options);
        for _ in 0..n_options {
            options.push(u.arbitrary::<EdnsOption>()?);
        }
        Ok(OptRecord {
            udp_payload_size: u.arbitrary()?,
            extended_rcode_high: u.arbitrary()?,
            version: u.arbitrary()?,
            flags: u.arbitrary()?,
            options,
        })
    }
}

fn malformed(detail: MalformedDetail) -> Error {
    Error::MalformedMessage {
        detail,
        rcode: WireRcode::FormErr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_roundtrips_through_from_ttl() {
        let opt = OptRecord {
            udp_payload_size: 4096,
            extended_rcode_high: 0x01,
            version: 0,
            flags: 0x8000,
            options: vec![],
        };
        let rebuilt = OptRecord::from_ttl(opt.udp_payload_size, opt.ttl(), opt.options.clone());
        assert_eq!(opt, rebuilt);
    }

    #[test]
    fn option_list_roundtrips() {
        let opt = OptRecord {
            udp_payload_size: 512,
            extended_rcode_high: 0,
            version: 0,
            flags: 0,
            options: vec![EdnsOption {
                code: 10,
                data: Bytes::from_static(b"cookie"),
            }],
        };
        let mut buf = WriteBuffer::with_capacity(64, 64);
        opt.write_rdata(&mut buf).unwrap();
        let octets = buf.into_inner();
        let mut rbuf = ReadBuffer::new(&octets);
        let options = OptRecord::read_rdata(&mut rbuf, octets.len() as u16).unwrap();
        assert_eq!(options, opt.options);
    }
}
