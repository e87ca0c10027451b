//! Property-style round-trip tests: hand-rolled generators built on
//! `fake`'s `Faker.fake()` feed random values through the public codec
//! API and check that decode reproduces what encode was given.

use bytes::Bytes;

use dns_wire::buffer::{ReadBuffer, WriteBuffer};
use dns_wire::limits::Limits;
use dns_wire::message::{decode, encode, DefaultMessageFactory, Header, IllegalRecordPolicy, Message};
use dns_wire::name::NameCodecFeatures;
use dns_wire::opt::{EdnsOption, OptRecord};
use dns_wire::record::{RecordData, UnderflowPolicy};
use dns_wire::types::{Flags, Opcode, QueryClass, QueryType, Rcode, RecordClass, RecordType};
use dns_wire::{Name, NameCodecFactory, Question, ResourceRecord};

use fake::{Fake, Faker};

const OPAQUE_RECORD_TYPES: &[RecordType] = &[
    RecordType::A,
    RecordType::NS,
    RecordType::CNAME,
    RecordType::SOA,
    RecordType::MX,
    RecordType::TXT,
    RecordType::AAAA,
    RecordType::SRV,
];

fn arbitrary_octets(len: usize) -> Vec<u8> {
    (0..len).map(|_| Faker.fake()).collect()
}

fn arbitrary_domainname() -> Name {
    let num_labels: usize = (1..5).fake();
    let mut text = String::new();
    for i in 0..num_labels {
        if i > 0 {
            text.push('.');
        }
        let label_len: usize = (1..20).fake();
        for _ in 0..label_len {
            let idx: usize = (0..36).fake();
            text.push(b"abcdefghijklmnopqrstuvwxyz0123456789"[idx] as char);
        }
    }
    Name::parse(&text)
}

fn arbitrary_opcode() -> Opcode {
    Opcode::from(Faker.fake::<u8>())
}

fn arbitrary_rcode() -> Rcode {
    // Stays below 16 so it never forces an extra EDNS OPT record into
    // `additional`, which would otherwise throw off the section-length
    // comparisons below.
    Rcode::from((0..16).fake::<u16>())
}

fn arbitrary_recordclass() -> RecordClass {
    RecordClass::from(Faker.fake::<u16>())
}

fn arbitrary_opaque_recordtype() -> RecordType {
    let idx: usize = (0..OPAQUE_RECORD_TYPES.len()).fake();
    OPAQUE_RECORD_TYPES[idx]
}

fn arbitrary_querytype() -> QueryType {
    QueryType::from(Faker.fake::<u16>())
}

fn arbitrary_queryclass() -> QueryClass {
    QueryClass::from(Faker.fake::<u16>())
}

fn arbitrary_optrecord() -> OptRecord {
    let n_options: usize = (0..3).fake();
    let options = (0..n_options)
        .map(|_| EdnsOption {
            code: Faker.fake(),
            data: Bytes::from(arbitrary_octets((0..16).fake())),
        })
        .collect();
    OptRecord {
        udp_payload_size: Faker.fake(),
        extended_rcode_high: Faker.fake(),
        version: Faker.fake(),
        flags: Faker.fake(),
        options,
    }
}

fn arbitrary_header() -> Header {
    let mut flags = Flags::empty();
    for flag in [
        Flags::IS_REPLY,
        Flags::AUTHORITATIVE_ANSWER,
        Flags::TRUNCATED,
        Flags::RECURSION_DESIRED,
        Flags::RECURSION_AVAILABLE,
    ] {
        if Faker.fake() {
            flags.insert(flag);
        }
    }
    Header {
        id: Faker.fake(),
        opcode: arbitrary_opcode(),
        flags,
        z: (0..8).fake(),
        rcode: arbitrary_rcode(),
    }
}

fn arbitrary_question() -> Question {
    Question {
        name: arbitrary_domainname(),
        qtype: arbitrary_querytype(),
        qclass: arbitrary_queryclass(),
        unicast_response_requested: false,
    }
}

fn arbitrary_resourcerecord() -> ResourceRecord {
    match (0..3).fake::<u8>() {
        0 => ResourceRecord::opaque(
            arbitrary_domainname(),
            arbitrary_opaque_recordtype(),
            arbitrary_recordclass(),
            Faker.fake(),
            Bytes::from(arbitrary_octets((0..32).fake())),
        ),
        1 => ResourceRecord {
            name: arbitrary_domainname(),
            rtype: RecordType::PTR,
            rclass: arbitrary_recordclass(),
            ttl: Faker.fake(),
            unicast_response: false,
            data: RecordData::Pointer(arbitrary_domainname()),
        },
        _ => ResourceRecord::opt(arbitrary_optrecord()),
    }
}

fn arbitrary_message() -> Message {
    let n_questions: usize = (0..3).fake();
    let n_answers: usize = (0..3).fake();
    let n_authority: usize = (0..2).fake();
    let n_additional: usize = (0..2).fake();
    Message {
        header: arbitrary_header(),
        questions: (0..n_questions).map(|_| arbitrary_question()).collect(),
        answers: (0..n_answers).map(|_| arbitrary_resourcerecord()).collect(),
        authority: (0..n_authority).map(|_| arbitrary_resourcerecord()).collect(),
        additional: (0..n_additional).map(|_| arbitrary_resourcerecord()).collect(),
        sender: None,
        recipient: None,
    }
}

#[test]
fn roundtrip_message() {
    let limits = Limits::new(64, 4096, 4096).unwrap();
    for _ in 0..100 {
        let original = arbitrary_message();
        let encoded = encode(
            &original,
            &limits,
            None,
            NameCodecFeatures::default(),
            IllegalRecordPolicy::Include,
            false,
            false,
            None,
        )
        .expect("a small generated message must fit within the limits used here");

        let decoded = decode(
            &encoded,
            None,
            None,
            NameCodecFeatures::default(),
            false,
            UnderflowPolicy::ThrowOnUnderflow,
            &DefaultMessageFactory,
        )
        .expect("a message this crate just encoded must decode");

        assert_eq!(decoded.header.id, original.header.id);
        assert_eq!(decoded.header.opcode, original.header.opcode);
        assert_eq!(decoded.header.flags, original.header.flags);
        assert_eq!(decoded.header.z, original.header.z);
        assert_eq!(decoded.header.rcode, original.header.rcode);

        assert_eq!(decoded.questions.len(), original.questions.len());
        for (a, b) in decoded.questions.iter().zip(&original.questions) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.qtype, b.qtype);
            assert_eq!(a.qclass, b.qclass);
        }

        for (got, want) in [
            (&decoded.answers, &original.answers),
            (&decoded.authority, &original.authority),
            (&decoded.additional, &original.additional),
        ] {
            assert_eq!(got.len(), want.len());
            for (a, b) in got.iter().zip(want.iter()) {
                assert_eq!(a.name, b.name);
                assert_eq!(a.rtype, b.rtype);
                assert_eq!(a.rclass, b.rclass);
                assert_eq!(a.ttl, b.ttl);
                assert_eq!(a.data, b.data);
            }
        }
    }
}

#[test]
fn roundtrip_question() {
    let factory = NameCodecFactory::new(NameCodecFeatures::default());
    for _ in 0..100 {
        let original = arbitrary_question();
        let mut buf = WriteBuffer::with_capacity(256, 256);
        let mut write = factory.get_for_write();
        original.write(&mut buf, &mut write, false).unwrap();
        let octets = buf.into_inner();

        let read = factory.get_for_read();
        let mut rbuf = ReadBuffer::new(&octets);
        let decoded = Question::read(&mut rbuf, &read, false).unwrap();
        assert_eq!(decoded.name, original.name);
        assert_eq!(decoded.qtype, original.qtype);
        assert_eq!(decoded.qclass, original.qclass);
    }
}

#[test]
fn roundtrip_resourcerecord() {
    let factory = NameCodecFactory::new(NameCodecFeatures::default());
    for _ in 0..100 {
        let original = arbitrary_resourcerecord();
        let mut buf = WriteBuffer::with_capacity(512, 512);
        let mut owner = factory.get_for_write();
        let mut embedded = factory.get_for_write();
        original.write(&mut buf, &mut owner, &mut embedded, false).unwrap();
        let octets = buf.into_inner();

        let read = factory.get_for_read();
        let mut rbuf = ReadBuffer::new(&octets);
        let decoded = ResourceRecord::read(&mut rbuf, &read, false, UnderflowPolicy::ThrowOnUnderflow)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.name, original.name);
        assert_eq!(decoded.rtype, original.rtype);
        assert_eq!(decoded.rclass, original.rclass);
        assert_eq!(decoded.ttl, original.ttl);
        assert_eq!(decoded.data, original.data);
    }
}

#[test]
fn roundtrip_domainname() {
    let factory = NameCodecFactory::new(NameCodecFeatures::default());
    for _ in 0..100 {
        let original = arbitrary_domainname();
        let mut buf = WriteBuffer::with_capacity(256, 256);
        let mut write = factory.get_for_write();
        write.write_name(&mut buf, &original).unwrap();
        let octets = buf.into_inner();

        let read = factory.get_for_read();
        let mut rbuf = ReadBuffer::new(&octets);
        let decoded = read.read_name(&mut rbuf).unwrap();
        assert_eq!(decoded, original);
    }
}
