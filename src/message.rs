//! The full DNS message: 12-byte header, four ordered sections, EDNS
//! OPT embedding, illegal-record policy enforcement, and winnowing on
//! buffer overflow.

use std::net::SocketAddr;

use bytes::BytesMut;
use serde::Deserialize;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::error::{Error, InvalidRecordReason, MalformedDetail, WireRcode};
use crate::factory::NameCodecFactory;
use crate::limits::Limits;
use crate::name::NameCodecFeatures;
use crate::opt::OptRecord;
use crate::record::{Question, RecordData, ResourceRecord, UnderflowPolicy};
use crate::types::{Flags, Opcode, RecordClass, RecordType, Rcode, Section};

const FLAG_IS_REPLY: u16 = 0b1000_0000_0000_0000;
const MASK_OPCODE: u16 = 0b0111_1000_0000_0000;
const OFFSET_OPCODE: u16 = 11;
const FLAG_AA: u16 = 0b0000_0100_0000_0000;
const FLAG_TC: u16 = 0b0000_0010_0000_0000;
const FLAG_RD: u16 = 0b0000_0001_0000_0000;
const FLAG_RA: u16 = 0b0000_0000_1000_0000;
const MASK_Z: u16 = 0b0000_0000_0111_0000;
const OFFSET_Z: u16 = 4;
const MASK_RCODE_LOW: u16 = 0b0000_0000_0000_1111;

/// The logical message header: id, op code, flag set, reserved Z bits,
/// and the full 12-bit response code (low 4 bits travel in the flag
/// word; the high 8 live in an OPT record, see [`embed_extended_rcode`]).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Header {
    pub id: u16,
    pub opcode: Opcode,
    pub flags: Flags,
    pub z: u8,
    pub rcode: Rcode,
}

impl Header {
    fn flagword(&self) -> u16 {
        let mut w = 0u16;
        if self.flags.contains(Flags::IS_REPLY) {
            w |= FLAG_IS_REPLY;
        }
        w |= MASK_OPCODE & (u16::from(u8::from(self.opcode)) << OFFSET_OPCODE);
        if self.flags.contains(Flags::AUTHORITATIVE_ANSWER) {
            w |= FLAG_AA;
        }
        if self.flags.contains(Flags::TRUNCATED) {
            w |= FLAG_TC;
        }
        if self.flags.contains(Flags::RECURSION_DESIRED) {
            w |= FLAG_RD;
        }
        if self.flags.contains(Flags::RECURSION_AVAILABLE) {
            w |= FLAG_RA;
        }
        w |= MASK_Z & (u16::from(self.z) << OFFSET_Z);
        w |= MASK_RCODE_LOW & self.rcode.low_nibble() as u16;
        w
    }

    fn from_flagword(id: u16, w: u16, rcode_high_byte: u8) -> Self {
        let mut flags = Flags::empty();
        if w & FLAG_IS_REPLY != 0 {
            flags.insert(Flags::IS_REPLY);
        }
        if w & FLAG_AA != 0 {
            flags.insert(Flags::AUTHORITATIVE_ANSWER);
        }
        if w & FLAG_TC != 0 {
            flags.insert(Flags::TRUNCATED);
        }
        if w & FLAG_RD != 0 {
            flags.insert(Flags::RECURSION_DESIRED);
        }
        if w & FLAG_RA != 0 {
            flags.insert(Flags::RECURSION_AVAILABLE);
        }
        let opcode = Opcode::from(((w & MASK_OPCODE) >> OFFSET_OPCODE) as u8);
        let z = ((w & MASK_Z) >> OFFSET_Z) as u8;
        let rcode_low = (w & MASK_RCODE_LOW) as u8;
        Header {
            id,
            opcode,
            flags,
            z,
            rcode: Rcode::from_parts(rcode_low, rcode_high_byte),
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Header {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Header {
            id: u.arbitrary()?,
            opcode: u.arbitrary::<Opcode>()?,
            flags: u.arbitrary::<Flags>()?,
            z: u.int_in_range(0..=7u8)?,
            rcode: u.arbitrary::<Rcode>()?,
        })
    }
}

/// A full DNS message: header, four ordered sections, and the sender/
/// recipient metadata a datagram transport attaches but never
/// interprets within this crate.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
    pub sender: Option<SocketAddr>,
    pub recipient: Option<SocketAddr>,
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Message {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let n_questions = u.int_in_range(0..=2usize)?;
        let mut questions = Vec::with_capacity(n_questions);
        for _ in 0..n_questions {
            questions.push(u.arbitrary::<Question>()?);
        }
        let n_records = u.int_in_range(0..=4usize)?;
        let mut answers = Vec::with_capacity(n_records);
        for _ in 0..n_records {
            answers.push(u.arbitrary::<ResourceRecord>()?);
        }
        Ok(Message {
            header: u.arbitrary::<Header>()?,
            questions,
            answers,
            authority: Vec::new(),
            additional: Vec::new(),
            sender: None,
            recipient: None,
        })
    }
}

/// Whether a message is, for the purposes of illegal-record policy, a
/// query or an error response — the two record-restricted cases.
fn is_restricted(header: &Header) -> bool {
    !header.flags.contains(Flags::IS_REPLY) || header.rcode != Rcode::NoError
}

/// Three-way policy on records that violate section-placement rules.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Deserialize)]
pub enum IllegalRecordPolicy {
    Discard,
    Include,
    #[default]
    Throw,
}

fn apply_policy(policy: IllegalRecordPolicy, legal: bool, reason: InvalidRecordReason) -> Result<bool, Error> {
    if legal {
        return Ok(true);
    }
    match policy {
        IllegalRecordPolicy::Discard => Ok(false),
        IllegalRecordPolicy::Include => Ok(true),
        IllegalRecordPolicy::Throw => Err(Error::InvalidRecord(reason)),
    }
}

/// Constructs an empty message of the right kind (query vs. response)
/// while decoding, so the decoder stays agnostic of any datagram-
/// envelope wrapper a resolver or server might use.
pub trait MessageFactory {
    /// Whether this factory only builds response messages (`Some(true)`),
    /// only query messages (`Some(false)`), or either (`None`). Used to
    /// validate the incoming header's is-reply bit before `create` is
    /// called.
    fn expects_reply(&self) -> Option<bool>;

    fn create(
        &self,
        sender: Option<SocketAddr>,
        recipient: Option<SocketAddr>,
        header: Header,
    ) -> Message;

    fn update_response_code(&self, new_code: Rcode, message: &mut Message) {
        message.header.rcode = new_code;
    }
}

/// The default factory: builds a bare `Message` with empty sections,
/// accepting either queries or responses. Most embedders that don't
/// need to distinguish the two at construction time can use this.
pub struct DefaultMessageFactory;

impl MessageFactory for DefaultMessageFactory {
    fn expects_reply(&self) -> Option<bool> {
        None
    }

    fn create(&self, sender: Option<SocketAddr>, recipient: Option<SocketAddr>, header: Header) -> Message {
        Message {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            sender,
            recipient,
        }
    }
}

/// Receives a buffer-overflow during encode and returns a smaller
/// message to retry with, or `None` to give up.
pub trait Winnower {
    fn winnow(&self, message: &Message, max_size: usize, iteration: u32) -> Option<Message>;
}

/// Drops the last additional record, then the last authority record,
/// then the last answer record, setting the truncated flag once
/// anything has been dropped; gives up once only questions remain.
pub struct DropTrailingRecords;

impl Winnower for DropTrailingRecords {
    fn winnow(&self, message: &Message, _max_size: usize, _iteration: u32) -> Option<Message> {
        let mut m = message.clone();
        if m.additional.pop().is_some() || m.authority.pop().is_some() || m.answers.pop().is_some() {
            m.header.flags.insert(Flags::TRUNCATED);
            Some(m)
        } else {
            None
        }
    }
}

fn malformed(detail: MalformedDetail, rcode: WireRcode) -> Error {
    Error::MalformedMessage { detail, rcode }
}

fn effective_udp_payload_size(max_size: usize, channel_advised: Option<usize>) -> u16 {
    let size = channel_advised.unwrap_or(max_size).min(max_size).max(512);
    u16::try_from(size).unwrap_or(u16::MAX)
}

/// If `rcode` is extended (>= 16), finds or creates the single OPT
/// record in `additional` and sets its extended-rcode high byte.
fn embed_extended_rcode(additional: &mut Vec<ResourceRecord>, rcode: Rcode, max_size: usize, channel_advised: Option<usize>) {
    if !rcode.is_extended() {
        return;
    }
    let high = rcode.high_byte();
    if let Some(idx) = additional.iter().position(|rr| matches!(rr.data, RecordData::Opt(_))) {
        let rr = &mut additional[idx];
        let mut new_ttl = None;
        if let RecordData::Opt(opt) = &mut rr.data {
            opt.extended_rcode_high = high;
            let default_in_class = u16::from(RecordClass::IN);
            if opt.udp_payload_size == 0 || opt.udp_payload_size == default_in_class {
                opt.udp_payload_size = effective_udp_payload_size(max_size, channel_advised);
            }
            new_ttl = Some(opt.ttl());
        }
        if let Some(ttl) = new_ttl {
            rr.ttl = ttl;
        }
    } else {
        let mut opt = OptRecord::empty(effective_udp_payload_size(max_size, channel_advised));
        opt.extended_rcode_high = high;
        additional.push(ResourceRecord::opt(opt));
    }
}

/// # Errors
///
/// If a record violates the illegal-record policy under `THROW`, a
/// name cannot be encoded, or the message (even after any winnowing)
/// does not fit in `limits`.
#[allow(clippy::too_many_arguments)]
pub fn encode(
    message: &Message,
    limits: &Limits,
    channel_advised_udp_size: Option<usize>,
    name_features: NameCodecFeatures,
    policy: IllegalRecordPolicy,
    mdns: bool,
    mdns_unicast: bool,
    winnower: Option<&dyn Winnower>,
) -> Result<BytesMut, Error> {
    let max_size = limits.effective_max(channel_advised_udp_size);
    let factory = NameCodecFactory::new(name_features);
    let non_compressing_factory = NameCodecFactory::new(name_features.without_compression());

    let mut current = message.clone();
    let mut iteration = 0u32;
    loop {
        match encode_once(
            &current,
            limits.min_packet_size(),
            max_size,
            channel_advised_udp_size,
            &factory,
            &non_compressing_factory,
            policy,
            mdns,
            mdns_unicast,
        ) {
            Ok(bytes) => {
                tracing::debug!(id = current.header.id, bytes = bytes.len(), "encoded message");
                return Ok(bytes);
            }
            Err(Error::BufferOverflow) => {
                let Some(winnower) = winnower else {
                    return Err(Error::BufferOverflow);
                };
                iteration += 1;
                tracing::debug!(id = current.header.id, iteration, "winnowing oversized message");
                match winnower.winnow(&current, max_size, iteration) {
                    Some(smaller) => current = smaller,
                    None => return Err(Error::BufferOverflow),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn encode_once(
    message: &Message,
    min_size: usize,
    max_size: usize,
    channel_advised_udp_size: Option<usize>,
    factory: &NameCodecFactory,
    non_compressing_factory: &NameCodecFactory,
    policy: IllegalRecordPolicy,
    mdns: bool,
    mdns_unicast: bool,
) -> Result<BytesMut, Error> {
    let mut additional = message.additional.clone();
    embed_extended_rcode(&mut additional, message.header.rcode, max_size, channel_advised_udp_size);

    let mut buf = WriteBuffer::with_capacity(min_size, max_size);
    buf.write_u16(message.header.id)?;
    buf.write_u16(message.header.flagword())?;
    let counts_at = buf.index();
    buf.write_u16(0)?;
    buf.write_u16(0)?;
    buf.write_u16(0)?;
    buf.write_u16(0)?;

    let mut owner_names = factory.get_for_write();
    let mut embedded_names = factory.get_for_write();
    let mut non_compressing_names = non_compressing_factory.get_for_write();

    let restricted = is_restricted(&message.header);
    let mut seen_opt = false;
    let mut qdcount = 0u16;

    for (idx, question) in message.questions.iter().enumerate() {
        let legal = mdns || idx == 0;
        if !apply_policy(policy, legal, InvalidRecordReason::MultipleQuestionsWithoutMdns)? {
            continue;
        }
        question.write(&mut buf, &mut owner_names, mdns)?;
        qdcount += 1;
    }

    let ancount = write_section(
        &mut buf,
        &message.answers,
        Section::Answer,
        restricted,
        mdns,
        mdns_unicast,
        policy,
        &mut owner_names,
        &mut embedded_names,
        &mut non_compressing_names,
        &mut seen_opt,
    )?;
    let nscount = write_section(
        &mut buf,
        &message.authority,
        Section::Authority,
        restricted,
        mdns,
        mdns_unicast,
        policy,
        &mut owner_names,
        &mut embedded_names,
        &mut non_compressing_names,
        &mut seen_opt,
    )?;
    let arcount = write_section(
        &mut buf,
        &additional,
        Section::Additional,
        restricted,
        mdns,
        mdns_unicast,
        policy,
        &mut owner_names,
        &mut embedded_names,
        &mut non_compressing_names,
        &mut seen_opt,
    )?;

    buf.patch_u16(counts_at, qdcount);
    buf.patch_u16(counts_at + 2, ancount);
    buf.patch_u16(counts_at + 4, nscount);
    buf.patch_u16(counts_at + 6, arcount);

    Ok(buf.into_inner())
}

#[allow(clippy::too_many_arguments)]
fn write_section(
    buf: &mut WriteBuffer,
    records: &[ResourceRecord],
    section: Section,
    restricted: bool,
    mdns: bool,
    mdns_unicast: bool,
    policy: IllegalRecordPolicy,
    owner_names: &mut crate::factory::WriteHandle,
    embedded_names: &mut crate::factory::WriteHandle,
    non_compressing_names: &mut crate::factory::WriteHandle,
    seen_opt: &mut bool,
) -> Result<u16, Error> {
    let mut count = 0u16;
    for record in records {
        let is_opt = record.rtype == RecordType::OPT;

        if is_opt && section != Section::Additional {
            if !apply_policy(policy, false, InvalidRecordReason::OptOutsideAdditional)? {
                continue;
            }
        } else if is_opt {
            if *seen_opt {
                if !apply_policy(policy, false, InvalidRecordReason::MultipleOpt)? {
                    continue;
                }
            }
            *seen_opt = true;
        }

        if mdns && record.rtype == RecordType::SOA {
            if !apply_policy(policy, false, InvalidRecordReason::SoaUnderMdns)? {
                continue;
            }
        }

        let legal = match section {
            Section::Answer | Section::Authority => !restricted,
            Section::Additional => !restricted || is_opt,
            Section::Question => true,
        };
        let reason = match section {
            Section::Additional => InvalidRecordReason::NonOptInAdditionalOfQueryOrError,
            _ => InvalidRecordReason::AnswerOrAuthorityInQueryOrError,
        };
        if !apply_policy(policy, legal, reason)? {
            continue;
        }

        if record.rtype == RecordType::SRV && !(mdns && mdns_unicast) {
            record.write(buf, non_compressing_names, embedded_names, mdns)?;
        } else {
            record.write(buf, owner_names, embedded_names, mdns)?;
        }
        count += 1;
    }
    Ok(count)
}

/// # Errors
///
/// If the header is too short to read, a section's declared record
/// count cannot be satisfied, or `factory.expects_reply()` disagrees
/// with the header's is-reply bit.
pub fn decode(
    octets: &[u8],
    sender: Option<SocketAddr>,
    recipient: Option<SocketAddr>,
    name_features: NameCodecFeatures,
    mdns: bool,
    underflow_policy: UnderflowPolicy,
    factory: &dyn MessageFactory,
) -> Result<Message, Error> {
    let mut buf = ReadBuffer::new(octets);
    let id = buf
        .next_u16()
        .ok_or_else(|| malformed(MalformedDetail::HeaderTooShort, WireRcode::FormErr))?;
    let flagword = buf
        .next_u16()
        .ok_or_else(|| malformed(MalformedDetail::HeaderTooShort, WireRcode::FormErr))?;
    let qdcount = buf
        .next_u16()
        .ok_or_else(|| malformed(MalformedDetail::HeaderTooShort, WireRcode::FormErr))?;
    let ancount = buf
        .next_u16()
        .ok_or_else(|| malformed(MalformedDetail::HeaderTooShort, WireRcode::FormErr))?;
    let nscount = buf
        .next_u16()
        .ok_or_else(|| malformed(MalformedDetail::HeaderTooShort, WireRcode::FormErr))?;
    let arcount = buf
        .next_u16()
        .ok_or_else(|| malformed(MalformedDetail::HeaderTooShort, WireRcode::FormErr))?;

    let header = Header::from_flagword(id, flagword, 0);
    let is_reply = header.flags.contains(Flags::IS_REPLY);
    if let Some(expected) = factory.expects_reply() {
        if expected != is_reply {
            return Err(Error::IllegalUsage(
                crate::error::IllegalUsageReason::FactoryKindMismatch,
            ));
        }
    }

    let mut message = factory.create(sender, recipient, header);

    let name_factory = NameCodecFactory::new(name_features);
    let names = name_factory.get_for_read();

    for _ in 0..qdcount {
        message.questions.push(Question::read(&mut buf, &names, mdns)?);
    }
    for _ in 0..ancount {
        if let Some(rr) = ResourceRecord::read(&mut buf, &names, mdns, underflow_policy)? {
            message.answers.push(rr);
        } else {
            break;
        }
    }
    for _ in 0..nscount {
        if let Some(rr) = ResourceRecord::read(&mut buf, &names, mdns, underflow_policy)? {
            message.authority.push(rr);
        } else {
            break;
        }
    }
    let mut opt_seen = None;
    let mut opt_count: u32 = 0;
    for _ in 0..arcount {
        match ResourceRecord::read(&mut buf, &names, mdns, underflow_policy)? {
            Some(rr) => {
                if matches!(rr.data, RecordData::Opt(_)) {
                    opt_count += 1;
                    opt_seen = Some(message.additional.len());
                }
                message.additional.push(rr);
            }
            None => break,
        }
    }

    if is_reply && opt_count == 1 {
        if let Some(idx) = opt_seen {
            if let RecordData::Opt(opt) = &message.additional[idx].data {
                let rcode = Rcode::from_parts(header.rcode.low_nibble(), opt.extended_rcode_high);
                factory.update_response_code(rcode, &mut message);
            }
        }
    }

    tracing::debug!(
        id,
        questions = message.questions.len(),
        answers = message.answers.len(),
        "decoded message"
    );

    Ok(message)
}
