#![no_main]
use libfuzzer_sys::fuzz_target;

use dns_wire::limits::Limits;
use dns_wire::message::{decode, encode, DefaultMessageFactory, IllegalRecordPolicy};
use dns_wire::name::NameCodecFeatures;
use dns_wire::record::UnderflowPolicy;

// Any byte string that decodes at all must re-encode and re-decode to
// the same logical message: this catches decode paths that silently
// accept input this crate could never have produced itself.
fuzz_target!(|data: &[u8]| {
    let Ok(message) = decode(
        data,
        None,
        None,
        NameCodecFeatures::default(),
        false,
        UnderflowPolicy::ThrowOnUnderflow,
        &DefaultMessageFactory,
    ) else {
        return;
    };

    let Ok(re_encoded) = encode(
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

    let re_decoded = decode(
        &re_encoded,
        None,
        None,
        NameCodecFeatures::default(),
        false,
        UnderflowPolicy::ThrowOnUnderflow,
        &DefaultMessageFactory,
    )
    .expect("a message this crate just encoded must decode");

    assert_eq!(re_decoded.header.id, message.header.id);
    assert_eq!(re_decoded.questions.len(), message.questions.len());
    assert_eq!(re_decoded.answers.len(), message.answers.len());
    assert_eq!(re_decoded.authority.len(), message.authority.len());
});
