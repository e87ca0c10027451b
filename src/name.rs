//! Domain name encoding and decoding: label-pointer compression,
//! punycode for internationalized names, and the mDNS UTF-8 profile.
//!
//! A [`Name`] is a feature-agnostic sequence of textual labels; whether
//! those labels are restricted to ASCII, transcoded through punycode,
//! or carried as raw UTF-8 is decided entirely by the [`NameCodecFeatures`]
//! active at encode/decode time, never by the `Name` value itself.

use std::fmt;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::error::{Error, InvalidDomainNameReason, MalformedDetail, WireRcode};

const LABEL_MAX_LEN: usize = 63;
const NAME_MAX_TEXT_LEN: usize = 253;
const NAME_MAX_WIRE_LEN: usize = 255;

/// A domain name, as a sequence of textual labels. The root name has no
/// labels. Equality and hashing ignore ASCII case and are insensitive to
/// whether a trailing dot is present in the textual form, matching
/// comparing the corresponding label bytes of both operands,
/// case-insensitively, after trailing-dot normalisation (see `DESIGN.md`
/// for the rationale).
#[derive(Debug, Clone)]
pub struct Name {
    labels: Vec<String>,
}

impl Name {
    pub fn root() -> Self {
        Name { labels: Vec::new() }
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Parse a dotted (or `@`-separated, for mailbox-style SOA rnames)
    /// textual name. A single trailing separator is treated as
    /// punctuation, not an empty final label: `"foo.com"` and
    /// `"foo.com."` parse identically.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.strip_suffix(['.', '@']).unwrap_or(text);
        if trimmed.is_empty() {
            return Name::root();
        }
        let labels = trimmed
            .split(['.', '@'])
            .map(str::to_string)
            .collect::<Vec<_>>();
        Name { labels }
    }

    /// Render the textual form, with or without a trailing dot.
    pub fn to_text(&self, trailing_dot: bool) -> String {
        let mut s = self.labels.join(".");
        if trailing_dot {
            s.push('.');
        }
        s
    }

    fn ascii_lower_labels(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.to_ascii_lowercase()).collect()
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.ascii_lower_labels() == other.ascii_lower_labels()
    }
}

impl Eq for Name {}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ascii_lower_labels().hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text(false))
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Name {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let n_labels = u.int_in_range(0..=4)?;
        let mut labels = Vec::with_capacity(n_labels);
        for _ in 0..n_labels {
            let len = u.int_in_range(1..=10usize)?;
            let mut label = String::with_capacity(len);
            for _ in 0..len {
                let c = *u.choose(b"abcdefghijklmnopqrstuvwxyz0123456789")?;
                label.push(c as char);
            }
            labels.push(label);
        }
        Ok(Name { labels })
    }
}

/// The configuration algebra selecting name-codec behaviour. Members
/// combine freely except for the documented `PUNYCODE`/`MDNS_UTF_8`
/// conflict, which is rejected at construction rather than at first use.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NameCodecFeatures {
    pub compression: bool,
    pub punycode: bool,
    pub mdns_utf8: bool,
    pub read_trailing_dot: bool,
    pub write_trailing_dot: bool,
    pub case_conversion: bool,
}

/// Two feature combinations are both configured true for the same
/// coordinate of non-ASCII handling, which is a contradiction rather
/// than a simple precedence question: punycode demands ASCII on the
/// wire, MDNS_UTF_8 demands raw Unicode bytes on the wire.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ConflictingFeatures;

impl fmt::Display for ConflictingFeatures {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PUNYCODE and MDNS_UTF_8 cannot both be enabled")
    }
}

impl std::error::Error for ConflictingFeatures {}

impl Default for NameCodecFeatures {
    /// `{COMPRESSION, WRITE_TRAILING_DOT}`, the configuration surface's
    /// documented default.
    fn default() -> Self {
        NameCodecFeatures {
            compression: true,
            punycode: false,
            mdns_utf8: false,
            read_trailing_dot: false,
            write_trailing_dot: true,
            case_conversion: false,
        }
    }
}

impl NameCodecFeatures {
    pub fn new(
        compression: bool,
        punycode: bool,
        mdns_utf8: bool,
        read_trailing_dot: bool,
        write_trailing_dot: bool,
        case_conversion: bool,
    ) -> Result<Self, ConflictingFeatures> {
        if punycode && mdns_utf8 {
            return Err(ConflictingFeatures);
        }
        Ok(NameCodecFeatures {
            compression,
            punycode,
            mdns_utf8,
            read_trailing_dot,
            write_trailing_dot,
            case_conversion,
        })
    }

    /// The profile used by mDNS: UTF-8 labels, case-insensitive
    /// comparison via case conversion, no punycode.
    pub fn mdns() -> Self {
        NameCodecFeatures {
            compression: true,
            punycode: false,
            mdns_utf8: true,
            read_trailing_dot: false,
            write_trailing_dot: true,
            case_conversion: true,
        }
    }

    /// A non-compressing variant of this feature set, used when writing
    /// names that must never be compressed (SRV owners outside mDNS
    /// unicast mode; see `message.rs`).
    pub fn without_compression(self) -> Self {
        NameCodecFeatures {
            compression: false,
            ..self
        }
    }
}

fn validate_label(label: &str, features: NameCodecFeatures) -> Result<(), Error> {
    if label == "*" {
        return Ok(());
    }
    if label.len() > LABEL_MAX_LEN {
        return Err(Error::InvalidDomainName(InvalidDomainNameReason::LabelTooLong));
    }
    if !features.mdns_utf8 {
        if label.starts_with('-') {
            return Err(Error::InvalidDomainName(InvalidDomainNameReason::LeadingHyphen));
        }
        if label.ends_with('-') {
            return Err(Error::InvalidDomainName(InvalidDomainNameReason::TrailingHyphen));
        }
        if label.chars().any(char::is_whitespace) {
            return Err(Error::InvalidDomainName(InvalidDomainNameReason::IllegalWhitespace));
        }
        if !features.punycode {
            if !label.is_ascii() {
                return Err(Error::UnencodableCharacters);
            }
            if label
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '-'))
            {
                return Err(Error::InvalidDomainName(InvalidDomainNameReason::IllegalCharacter));
            }
        }
    }
    Ok(())
}

fn textual_len(labels: &[String]) -> usize {
    if labels.is_empty() {
        return 0;
    }
    labels.iter().map(|l| l.chars().count()).sum::<usize>() + labels.len() - 1
}

/// Validate and, under `PUNYCODE`, transform a name's labels into the
/// ASCII form that will actually be written to the wire.
fn labels_for_write(name: &Name, features: NameCodecFeatures) -> Result<Vec<String>, Error> {
    for label in &name.labels {
        validate_label(label, features)?;
    }
    if textual_len(&name.labels) > NAME_MAX_TEXT_LEN {
        return Err(Error::InvalidDomainName(InvalidDomainNameReason::NameTooLong));
    }

    let labels = if features.punycode && !name.is_root() {
        let ascii_text = idna::domain_to_ascii(&name.to_text(false))
            .map_err(|_| Error::InvalidDomainName(InvalidDomainNameReason::IllegalCharacter))?;
        ascii_text.split('.').map(str::to_string).collect()
    } else {
        name.labels.clone()
    };

    if textual_len(&labels) > NAME_MAX_TEXT_LEN {
        return Err(Error::InvalidDomainName(InvalidDomainNameReason::NameTooLong));
    }
    for label in &labels {
        if label.len() > LABEL_MAX_LEN {
            return Err(Error::InvalidDomainName(InvalidDomainNameReason::LabelTooLong));
        }
    }

    Ok(if features.case_conversion {
        labels.iter().map(|l| l.to_ascii_lowercase()).collect()
    } else {
        labels
    })
}

/// A write-side name codec instance. Owns the per-message compression
/// table, so it must belong to exactly one in-flight encode (see
/// `factory.rs`).
pub struct WriteNameCodec {
    pub(crate) features: NameCodecFeatures,
    table: std::collections::HashMap<String, u16>,
}

impl WriteNameCodec {
    pub fn new(features: NameCodecFeatures) -> Self {
        WriteNameCodec {
            features,
            table: std::collections::HashMap::new(),
        }
    }

    pub fn features(&self) -> NameCodecFeatures {
        self.features
    }

    /// Clear the compression table. Must happen before this instance is
    /// reused for another outbound message.
    pub fn reset(&mut self) {
        self.table.clear();
    }

    /// # Errors
    ///
    /// If `name` cannot be encoded under the active feature set, or the
    /// buffer's maximum size is exceeded.
    pub fn write_name(&mut self, buf: &mut WriteBuffer, name: &Name) -> Result<(), Error> {
        let labels = labels_for_write(name, self.features)?;

        let mut pos = 0;
        while pos < labels.len() {
            let suffix = labels[pos..].join(".").to_ascii_lowercase();
            if self.features.compression {
                if let Some(&offset) = self.table.get(&suffix) {
                    buf.write_u16(0xC000 | offset)?;
                    return Ok(());
                }
                if let Ok(offset) = u16::try_from(buf.index()) {
                    if offset < 0x4000 {
                        self.table.insert(suffix, offset);
                    }
                }
            }
            let label = &labels[pos];
            buf.write_u8(label.len() as u8)?;
            buf.write_octets(label.as_bytes())?;
            pos += 1;
        }

        if self.features.write_trailing_dot {
            buf.write_u8(0)?;
        }
        Ok(())
    }
}

fn malformed(detail: MalformedDetail, rcode: WireRcode) -> Error {
    Error::MalformedMessage { detail, rcode }
}

/// Decode labels from raw wire bytes into their textual form, applying
/// `MDNS_UTF_8`/`PUNYCODE`/`CASE_CONVERSION` as configured.
fn labels_from_wire(raw: Vec<Vec<u8>>, features: NameCodecFeatures) -> Result<Vec<String>, Error> {
    let mut labels = Vec::with_capacity(raw.len());
    if features.mdns_utf8 {
        for bytes in raw {
            let s = String::from_utf8(bytes)
                .map_err(|_| malformed(MalformedDetail::LabelTooLong, WireRcode::BadName))?;
            labels.push(s);
        }
    } else {
        for bytes in &raw {
            if !bytes.is_ascii() {
                return Err(malformed(MalformedDetail::LabelTooLong, WireRcode::BadName));
            }
        }
        let ascii_joined = raw
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect::<Vec<_>>();
        if features.punycode && !ascii_joined.is_empty() {
            let (unicode_text, _) = idna::domain_to_unicode(&ascii_joined.join("."));
            labels = unicode_text.split('.').map(str::to_string).collect();
        } else {
            labels = ascii_joined;
        }
    }

    if features.case_conversion {
        labels = labels.into_iter().map(|l| l.to_ascii_lowercase()).collect();
    }
    Ok(labels)
}

/// Read one name at the buffer's current position. Pointers are
/// resolved against the whole message that `buf` was constructed from,
/// regardless of where within it the read started.
///
/// # Errors
///
/// If the label/pointer structure is malformed.
pub fn read_name(buf: &mut ReadBuffer, features: NameCodecFeatures) -> Result<Name, Error> {
    if buf.remaining() == 0 {
        return Ok(Name::root());
    }

    let message_len = buf.total_len();
    let mut raw_labels: Vec<Vec<u8>> = Vec::new();
    let mut resume_position: Option<usize> = None;
    let mut jumped = false;
    let mut pointer_bytes_consumed = 0usize;
    let mut wire_len = 0usize;

    loop {
        let len = buf
            .next_u8()
            .ok_or_else(|| malformed(MalformedDetail::TruncatedLabel, WireRcode::FormErr))?;

        if len & 0xC0 == 0xC0 {
            let lo = buf
                .next_u8()
                .ok_or_else(|| malformed(MalformedDetail::TruncatedLabel, WireRcode::FormErr))?;
            let offset = ((usize::from(len) & 0x3F) << 8) | usize::from(lo);
            if offset >= message_len {
                return Err(malformed(MalformedDetail::PointerOutOfRange, WireRcode::FormErr));
            }
            if !jumped {
                resume_position = Some(buf.position());
                jumped = true;
            }
            pointer_bytes_consumed += 2;
            if pointer_bytes_consumed >= message_len {
                return Err(malformed(MalformedDetail::PointerLoop, WireRcode::FormErr));
            }
            buf.seek(offset);
            continue;
        }

        if len > LABEL_MAX_LEN as u8 {
            return Err(malformed(MalformedDetail::LabelTooLong, WireRcode::BadName));
        }

        if len == 0 {
            if resume_position.is_none() {
                resume_position = Some(buf.position());
            }
            break;
        }

        let bytes = buf
            .take(usize::from(len))
            .ok_or_else(|| malformed(MalformedDetail::TruncatedLabel, WireRcode::FormErr))?;
        wire_len += 1 + usize::from(len);
        if wire_len > NAME_MAX_WIRE_LEN {
            return Err(malformed(MalformedDetail::NameTooLong, WireRcode::BadName));
        }
        raw_labels.push(bytes.to_vec());
    }

    if let Some(pos) = resume_position {
        buf.seek(pos);
    }

    let mut labels = labels_from_wire(raw_labels, features)?;
    if textual_len(&labels) > NAME_MAX_TEXT_LEN {
        return Err(malformed(MalformedDetail::NameTooLong, WireRcode::BadName));
    }
    if features.read_trailing_dot {
        if let Some(last) = labels.last_mut() {
            last.push('.');
        } else {
            labels.push(String::new());
        }
    }
    Ok(Name { labels })
}

/// A read-side name codec handle. Stateless: holds only the feature set
/// and may be shared across threads.
#[derive(Debug, Copy, Clone)]
pub struct ReadNameCodec {
    pub(crate) features: NameCodecFeatures,
}

impl ReadNameCodec {
    pub fn features(&self) -> NameCodecFeatures {
        self.features
    }

    /// # Errors
    ///
    /// If the label/pointer structure is malformed.
    pub fn read_name(&self, buf: &mut ReadBuffer) -> Result<Name, Error> {
        read_name(buf, self.features)
    }
}
