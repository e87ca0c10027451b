#![no_main]
use libfuzzer_sys::fuzz_target;

use dns_wire::limits::Limits;
use dns_wire::message::{decode, encode, DefaultMessageFactory, IllegalRecordPolicy, Message};
use dns_wire::name::NameCodecFeatures;
use dns_wire::record::UnderflowPolicy;

// encode/decode take the feature/policy/limits knobs explicitly; this
// target pins them to their documented defaults so the only thing under
// test is the wire codec itself.
fuzz_target!(|message: Message| {
    let Ok(serialised) = encode(
        &message,
        &Limits::default(),
        None,
        NameCodecFeatures::default(),
        IllegalRecordPolicy::Include,
        false,
        false,
        None,
    ) else {
        return;
    };

    let deserialised = decode(
        &serialised,
        None,
        None,
        NameCodecFeatures::default(),
        false,
        UnderflowPolicy::ThrowOnUnderflow,
        &DefaultMessageFactory,
    )
    .expect("a message this crate just encoded must decode");

    assert_eq!(deserialised.header.id, message.header.id);
    assert_eq!(deserialised.header.opcode, message.header.opcode);
    assert_eq!(deserialised.questions.len(), message.questions.len());
    assert_eq!(deserialised.answers.len(), message.answers.len());
});
