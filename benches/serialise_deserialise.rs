use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use dns_wire::limits::Limits;
use dns_wire::message::{decode, encode, DefaultMessageFactory, Header, IllegalRecordPolicy, Message};
use dns_wire::name::NameCodecFeatures;
use dns_wire::record::UnderflowPolicy;
use dns_wire::types::{Flags, Opcode, QueryClass, QueryType, RecordClass, RecordType, Rcode};
use dns_wire::{Name, Question, ResourceRecord};

fn domain(name: &str) -> Name {
    Name::parse(name)
}

fn a_record(name: &str, address: [u8; 4]) -> ResourceRecord {
    ResourceRecord::opaque(domain(name), RecordType::A, RecordClass::IN, 300, Bytes::copy_from_slice(&address))
}

fn cname_record(name: &str, target: &str) -> ResourceRecord {
    ResourceRecord {
        name: domain(name),
        rtype: RecordType::CNAME,
        rclass: RecordClass::IN,
        ttl: 300,
        unicast_response: false,
        data: dns_wire::RecordData::Pointer(domain(target)),
    }
}

fn ns_record(superdomain: &str, nameserver: &str) -> ResourceRecord {
    ResourceRecord {
        name: domain(superdomain),
        rtype: RecordType::NS,
        rclass: RecordClass::IN,
        ttl: 300,
        unicast_response: false,
        data: dns_wire::RecordData::Pointer(domain(nameserver)),
    }
}

fn question_message() -> Message {
    let mut flags = Flags::empty();
    flags.insert(Flags::RECURSION_DESIRED);
    Message {
        header: Header {
            id: 1234,
            opcode: Opcode::Query,
            flags,
            z: 0,
            rcode: Rcode::NoError,
        },
        questions: vec![Question {
            name: domain("www.example.com"),
            qtype: QueryType::Record(RecordType::A),
            qclass: QueryClass::Record(RecordClass::IN),
            unicast_response_requested: false,
        }],
        answers: vec![],
        authority: vec![],
        additional: vec![],
        sender: None,
        recipient: None,
    }
}

fn do_encode(message: &Message) -> bytes::BytesMut {
    do_encode_with_channel_size(message, None)
}

fn do_encode_with_channel_size(message: &Message, channel_advised: Option<usize>) -> bytes::BytesMut {
    encode(
        message,
        &Limits::default(),
        channel_advised,
        NameCodecFeatures::default(),
        IllegalRecordPolicy::Include,
        false,
        false,
        None,
    )
    .unwrap()
}

fn do_decode(octets: &[u8]) {
    decode(
        octets,
        None,
        None,
        NameCodecFeatures::default(),
        false,
        UnderflowPolicy::ThrowOnUnderflow,
        &DefaultMessageFactory,
    )
    .unwrap();
}

#[allow(non_snake_case)]
fn bench__question(c: &mut Criterion) {
    let message = question_message();

    c.bench_function("serialise/question", |b| {
        b.iter_batched(|| message.clone(), |message| do_encode(&message), BatchSize::SmallInput)
    });

    let serialised = do_encode(&message);
    c.bench_function("deserialise/question", |b| {
        b.iter(|| do_decode(black_box(&serialised)))
    });
}

#[allow(non_snake_case)]
fn bench__answer__small(c: &mut Criterion) {
    let mut message = question_message();
    message.header.flags.insert(Flags::IS_REPLY);
    message.answers = vec![a_record("www.example.com", [1, 1, 1, 1])];

    c.bench_function("serialise/answer/small", |b| {
        b.iter_batched(|| message.clone(), |message| do_encode(&message), BatchSize::SmallInput)
    });

    let serialised = do_encode(&message);
    c.bench_function("deserialise/answer/small", |b| {
        b.iter(|| do_decode(black_box(&serialised)))
    });
}

#[allow(non_snake_case)]
fn bench__answer__big(c: &mut Criterion) {
    let mut message = question_message();
    message.header.flags.insert(Flags::IS_REPLY);

    let count = 32;
    for i in 0..count {
        message
            .answers
            .push(cname_record("www.example.com", &format!("www.cname-target-{i}.example.com")));
    }
    for i in 0..count {
        message.authority.push(ns_record(
            &format!("cname-target-{i}.example.com"),
            &format!("ns-{i}.example.com"),
        ));
    }
    for i in 0..count {
        message
            .additional
            .push(a_record(&format!("ns-{i}.example.com"), [1, 1, 1, 1]));
    }

    c.bench_function("serialise/answer/big", |b| {
        b.iter_batched(
            || message.clone(),
            |message| do_encode_with_channel_size(&message, Some(65535)),
            BatchSize::SmallInput,
        )
    });

    let serialised = do_encode_with_channel_size(&message, Some(65535));
    c.bench_function("deserialise/answer/big", |b| {
        b.iter(|| do_decode(black_box(&serialised)))
    });
}

criterion_group!(benches, bench__question, bench__answer__small, bench__answer__big);
criterion_main!(benches);
