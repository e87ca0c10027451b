//! Questions and resource records: the per-entry codec that the message
//! codec loops over once per section.

use bytes::Bytes;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::error::{Error, MalformedDetail, WireRcode};
use crate::factory::{ReadHandle, WriteHandle};
use crate::name::Name;
use crate::opt::OptRecord;
use crate::types::{QueryClass, QueryType, RecordClass, RecordType};

/// What a decoder should do when a record's declared length runs past
/// the bytes actually available.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, serde::Deserialize)]
pub enum UnderflowPolicy {
    #[default]
    ThrowOnUnderflow,
    ResetAndReturnNull,
}

/// An entry in the QUESTION section: no TTL, no payload.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Question {
    pub name: Name,
    pub qtype: QueryType,
    pub qclass: QueryClass,
    /// mDNS "unicast response preferred" bit, overlaid on the class
    /// field's high bit; meaningless outside mDNS mode.
    pub unicast_response_requested: bool,
}

impl Question {
    pub fn write(&self, buf: &mut WriteBuffer, names: &mut WriteHandle, mdns: bool) -> Result<(), Error> {
        names.write_name(buf, &self.name)?;
        buf.write_u16(u16::from(self.qtype))?;
        let mut class = u16::from(self.qclass);
        if mdns && self.unicast_response_requested {
            class |= 0x8000;
        }
        buf.write_u16(class)?;
        Ok(())
    }

    pub fn read(buf: &mut ReadBuffer, names: &ReadHandle, mdns: bool) -> Result<Self, Error> {
        let name = names.read_name(buf)?;
        let qtype = QueryType::from(
            buf.next_u16()
                .ok_or_else(|| malformed(MalformedDetail::RecordHeaderTooShort))?,
        );
        let raw_class = buf
            .next_u16()
            .ok_or_else(|| malformed(MalformedDetail::RecordHeaderTooShort))?;
        let (qclass, unicast_response_requested) = if mdns {
            (QueryClass::from(raw_class & 0x7FFF), raw_class & 0x8000 != 0)
        } else {
            (QueryClass::from(raw_class), false)
        };
        Ok(Question {
            name,
            qtype,
            qclass,
            unicast_response_requested,
        })
    }
}

/// The payload of a resource record. All types except PTR and OPT are
/// preserved verbatim as opaque bytes: this crate never interprets an
/// A/AAAA/MX/SRV/… RDATA region.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RecordData {
    Opaque(Bytes),
    Pointer(Name),
    Opt(OptRecord),
}

/// An entry in ANSWER, AUTHORITY, or ADDITIONAL.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResourceRecord {
    pub name: Name,
    pub rtype: RecordType,
    pub rclass: RecordClass,
    pub ttl: u32,
    /// mDNS "unicast response preferred" / cache-flush bit, overlaid on
    /// the class field's high bit. Not meaningful for OPT, whose class
    /// field is entirely repurposed as the UDP payload size.
    pub unicast_response: bool,
    pub data: RecordData,
}

impl ResourceRecord {
    pub fn opaque(name: Name, rtype: RecordType, rclass: RecordClass, ttl: u32, payload: Bytes) -> Self {
        ResourceRecord {
            name,
            rtype,
            rclass,
            ttl,
            unicast_response: false,
            data: RecordData::Opaque(payload),
        }
    }

    pub fn opt(opt: OptRecord) -> Self {
        ResourceRecord {
            name: Name::root(),
            rtype: RecordType::OPT,
            rclass: RecordClass::from(opt.udp_payload_size),
            ttl: opt.ttl(),
            unicast_response: false,
            data: RecordData::Opt(opt),
        }
    }

    pub fn write(
        &self,
        buf: &mut WriteBuffer,
        owner_names: &mut WriteHandle,
        embedded_names: &mut WriteHandle,
        mdns: bool,
    ) -> Result<(), Error> {
        owner_names.write_name(buf, &self.name)?;
        buf.write_u16(u16::from(self.rtype))?;

        match &self.data {
            RecordData::Opt(opt) => {
                buf.write_u16(opt.udp_payload_size)?;
                buf.write_u32(opt.ttl())?;
            }
            _ => {
                let mut class = u16::from(self.rclass);
                if mdns && self.unicast_response {
                    class |= 0x8000;
                }
                buf.write_u16(class)?;
                buf.write_u32(self.ttl)?;
            }
        }

        let rdlength_at = buf.index();
        buf.write_u16(0)?;
        let rdata_start = buf.index();

        match &self.data {
            RecordData::Opaque(bytes) => buf.write_octets(bytes)?,
            RecordData::Pointer(name) => embedded_names.write_name(buf, name)?,
            RecordData::Opt(opt) => opt.write_rdata(buf)?,
        }

        let rdlength = u16::try_from(buf.index() - rdata_start).map_err(|_| Error::BufferOverflow)?;
        buf.patch_u16(rdlength_at, rdlength);
        Ok(())
    }

    /// # Errors
    ///
    /// `Ok(None)` under `ResetAndReturnNull` if fewer bytes remain than
    /// the record header or its declared payload require; `Err` under
    /// `ThrowOnUnderflow`, or if the record is malformed in a way
    /// underflow policy does not cover (e.g. a broken embedded PTR name).
    pub fn read(
        buf: &mut ReadBuffer,
        names: &ReadHandle,
        mdns: bool,
        policy: UnderflowPolicy,
    ) -> Result<Option<Self>, Error> {
        let record_start = buf.position();
        let name = names.read_name(buf)?;

        if buf.remaining() < 10 {
            return underflow(buf, record_start, policy);
        }
        let rtype = RecordType::from(buf.next_u16().unwrap());
        let raw_class = buf.next_u16().unwrap();
        let ttl = buf.next_u32().unwrap();
        let rdlength = buf.next_u16().unwrap();

        if buf.remaining() < usize::from(rdlength) {
            return underflow(buf, record_start, policy);
        }

        if rtype == RecordType::OPT {
            let options = OptRecord::read_rdata(buf, rdlength)?;
            let opt = OptRecord::from_ttl(raw_class, ttl, options);
            return Ok(Some(ResourceRecord {
                name,
                rtype,
                rclass: RecordClass::from(raw_class),
                ttl,
                unicast_response: false,
                data: RecordData::Opt(opt),
            }));
        }

        let (rclass, unicast_response) = if mdns {
            (RecordClass::from(raw_class & 0x7FFF), raw_class & 0x8000 != 0)
        } else {
            (RecordClass::from(raw_class), false)
        };

        let data = if rtype == RecordType::PTR {
            let rdata_start = buf.position();
            let name = names.read_name(buf)?;
            let consumed = buf.position() - rdata_start;
            if consumed != usize::from(rdlength) {
                return Err(malformed(MalformedDetail::RecordPayloadTooShort));
            }
            RecordData::Pointer(name)
        } else {
            let bytes = buf
                .take(usize::from(rdlength))
                .ok_or_else(|| malformed(MalformedDetail::RecordPayloadTooShort))?;
            RecordData::Opaque(Bytes::copy_from_slice(bytes))
        };

        Ok(Some(ResourceRecord {
            name,
            rtype,
            rclass,
            ttl,
            unicast_response,
            data,
        }))
    }
}

fn underflow(buf: &mut ReadBuffer, record_start: usize, policy: UnderflowPolicy) -> Result<Option<ResourceRecord>, Error> {
    match policy {
        UnderflowPolicy::ThrowOnUnderflow => Err(malformed(MalformedDetail::RecordHeaderTooShort)),
        UnderflowPolicy::ResetAndReturnNull => {
            buf.seek(record_start);
            Ok(None)
        }
    }
}

fn malformed(detail: MalformedDetail) -> Error {
    Error::MalformedMessage {
        detail,
        rcode: WireRcode::FormErr,
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Question {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Question {
            name: u.arbitrary::<Name>()?,
            qtype: u.arbitrary::<QueryType>()?,
            qclass: u.arbitrary::<QueryClass>()?,
            unicast_response_requested: u.arbitrary()?,
        })
    }
}

/// Picks a record type that is never `PTR` or `OPT`, so an arbitrary
/// opaque-RDATA record's type tag never contradicts its payload kind.
const NON_SPECIAL_RECORD_TYPES: &[RecordType] = &[
    RecordType::A,
    RecordType::NS,
    RecordType::CNAME,
    RecordType::SOA,
    RecordType::MX,
    RecordType::TXT,
    RecordType::AAAA,
    RecordType::SRV,
];

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for ResourceRecord {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        match u.int_in_range(0..=2u8)? {
            0 => {
                let len = u.int_in_range(0..=32usize)?;
                Ok(ResourceRecord {
                    name: u.arbitrary::<Name>()?,
                    rtype: *u.choose(NON_SPECIAL_RECORD_TYPES)?,
                    rclass: u.arbitrary::<RecordClass>()?,
                    ttl: u.arbitrary()?,
                    unicast_response: u.arbitrary()?,
                    data: RecordData::Opaque(Bytes::from(u.bytes(len)?.to_vec())),
                })
            }
            1 => Ok(ResourceRecord {
                name: u.arbitrary::<Name>()?,
                rtype: RecordType::PTR,
                rclass: u.arbitrary::<RecordClass>()?,
                ttl: u.arbitrary()?,
                unicast_response: u.arbitrary()?,
                data: RecordData::Pointer(u.arbitrary::<Name>()?),
            }),
            _ => Ok(ResourceRecord::opt(u.arbitrary::<crate::opt::OptRecord>()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::NameCodecFactory;
    use crate::name::NameCodecFeatures;

    fn factory() -> NameCodecFactory {
        NameCodecFactory::new(NameCodecFeatures::default())
    }

    #[test]
    fn question_roundtrips() {
        let factory = factory();
        let question = Question {
            name: Name::parse("example.com"),
            qtype: QueryType::Record(RecordType::A),
            qclass: QueryClass::Record(RecordClass::IN),
            unicast_response_requested: false,
        };
        let mut buf = WriteBuffer::with_capacity(64, 64);
        let mut write = factory.get_for_write();
        question.write(&mut buf, &mut write, false).unwrap();
        let octets = buf.into_inner();

        let read = factory.get_for_read();
        let mut rbuf = ReadBuffer::new(&octets);
        let decoded = Question::read(&mut rbuf, &read, false).unwrap();
        assert_eq!(decoded, question);
    }

    #[test]
    fn opaque_record_roundtrips() {
        let factory = factory();
        let record = ResourceRecord::opaque(
            Name::parse("example.com"),
            RecordType::TXT,
            RecordClass::IN,
            3600,
            Bytes::from_static(b"hello"),
        );
        let mut buf = WriteBuffer::with_capacity(64, 64);
        let mut owner = factory.get_for_write();
        let mut embedded = factory.get_for_write();
        record.write(&mut buf, &mut owner, &mut embedded, false).unwrap();
        let octets = buf.into_inner();

        let read = factory.get_for_read();
        let mut rbuf = ReadBuffer::new(&octets);
        let decoded = ResourceRecord::read(&mut rbuf, &read, false, UnderflowPolicy::ThrowOnUnderflow)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn ptr_record_embeds_compressible_name() {
        let factory = factory();
        let record = ResourceRecord {
            name: Name::parse("1.0.0.127.in-addr.arpa"),
            rtype: RecordType::PTR,
            rclass: RecordClass::IN,
            ttl: 3600,
            unicast_response: false,
            data: RecordData::Pointer(Name::parse("localhost")),
        };
        let mut buf = WriteBuffer::with_capacity(128, 128);
        let mut owner = factory.get_for_write();
        let mut embedded = factory.get_for_write();
        record.write(&mut buf, &mut owner, &mut embedded, false).unwrap();
        let octets = buf.into_inner();

        let read = factory.get_for_read();
        let mut rbuf = ReadBuffer::new(&octets);
        let decoded = ResourceRecord::read(&mut rbuf, &read, false, UnderflowPolicy::ThrowOnUnderflow)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn underflow_resets_and_returns_null_under_lenient_policy() {
        let data = [0u8; 5]; // root name (1) + 4 bytes, short of the 10-byte minimum
        let factory = factory();
        let read = factory.get_for_read();
        let mut buf = ReadBuffer::new(&data);
        let result = ResourceRecord::read(&mut buf, &read, false, UnderflowPolicy::ResetAndReturnNull).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.position(), 0);
    }

    #[test]
    fn underflow_throws_under_strict_policy() {
        let data = [0u8; 5];
        let factory = factory();
        let read = factory.get_for_read();
        let mut buf = ReadBuffer::new(&data);
        assert!(ResourceRecord::read(&mut buf, &read, false, UnderflowPolicy::ThrowOnUnderflow).is_err());
    }
}
