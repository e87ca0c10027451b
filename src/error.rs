//! Error taxonomy for the wire codec. Every fallible operation in this
//! crate returns one of the kinds below; none of them allocate or carry
//! borrowed data, so they are cheap to propagate and to match on.

use std::fmt;

/// The DNS response code a `MalformedMessage` error should be reported
/// under if the caller wants to synthesise a wire-level error response.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WireRcode {
    FormErr,
    BadName,
}

impl WireRcode {
    pub fn rcode_value(self) -> u16 {
        match self {
            WireRcode::FormErr => 1,
            WireRcode::BadName => 20,
        }
    }
}

/// Why a decoded byte stream violates the wire format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MalformedDetail {
    TruncatedLabel,
    LabelTooLong,
    PointerOutOfRange,
    PointerLoop,
    NameTooLong,
    RecordHeaderTooShort,
    RecordPayloadTooShort,
    HeaderTooShort,
}

/// Why a caller-supplied domain name cannot be written.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum InvalidDomainNameReason {
    LabelTooLong,
    NameTooLong,
    LeadingHyphen,
    TrailingHyphen,
    IllegalCharacter,
    IllegalWhitespace,
}

/// Why a record cannot be placed where the message asked for it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum InvalidRecordReason {
    AnswerOrAuthorityInQueryOrError,
    NonOptInAdditionalOfQueryOrError,
    MultipleOpt,
    OptOutsideAdditional,
    MultipleQuestionsWithoutMdns,
    SoaUnderMdns,
}

/// Why a name codec or factory handle was used outside its contract.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IllegalUsageReason {
    ReadInstanceUsedForWrite,
    WriteInstanceUsedForRead,
    FactoryKindMismatch,
}

/// The unified error type for the wire codec. Each component
/// (`name`, `record`, `message`) raises the variant that applies to it;
/// callers that only care about one kind can match on that variant and
/// ignore the rest.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// The input bytes violate the wire format.
    MalformedMessage {
        detail: MalformedDetail,
        rcode: WireRcode,
    },
    /// Semantically invalid domain name at encode time.
    InvalidDomainName(InvalidDomainNameReason),
    /// Name contains characters the active feature set cannot carry.
    UnencodableCharacters,
    /// A record violates the encoder's structural policy.
    InvalidRecord(InvalidRecordReason),
    /// A codec or factory handle was used the wrong way round.
    IllegalUsage(IllegalUsageReason),
    /// Output exceeds the maximum packet size and no winnower absorbed it.
    BufferOverflow,
}

impl Error {
    pub fn malformed(detail: MalformedDetail, rcode: WireRcode) -> Self {
        Error::MalformedMessage { detail, rcode }
    }
}

impl fmt::Display for MalformedDetail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            MalformedDetail::TruncatedLabel => "truncated label",
            MalformedDetail::LabelTooLong => "label exceeds 63 bytes",
            MalformedDetail::PointerOutOfRange => "pointer offset out of range",
            MalformedDetail::PointerLoop => "pointer loop detected",
            MalformedDetail::NameTooLong => "name exceeds 255 bytes on the wire",
            MalformedDetail::RecordHeaderTooShort => "not enough bytes for a record header",
            MalformedDetail::RecordPayloadTooShort => "not enough bytes for record payload",
            MalformedDetail::HeaderTooShort => "not enough bytes for the message header",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for InvalidDomainNameReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            InvalidDomainNameReason::LabelTooLong => "label exceeds 63 bytes",
            InvalidDomainNameReason::NameTooLong => "name exceeds 253 characters",
            InvalidDomainNameReason::LeadingHyphen => "label starts with a hyphen",
            InvalidDomainNameReason::TrailingHyphen => "label ends with a hyphen",
            InvalidDomainNameReason::IllegalCharacter => "label contains an illegal character",
            InvalidDomainNameReason::IllegalWhitespace => "label contains whitespace",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for InvalidRecordReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            InvalidRecordReason::AnswerOrAuthorityInQueryOrError => {
                "ANSWER or AUTHORITY record in a query or error response"
            }
            InvalidRecordReason::NonOptInAdditionalOfQueryOrError => {
                "non-OPT record in ADDITIONAL of a query or error response"
            }
            InvalidRecordReason::MultipleOpt => "more than one OPT record in the message",
            InvalidRecordReason::OptOutsideAdditional => "OPT record outside ADDITIONAL",
            InvalidRecordReason::MultipleQuestionsWithoutMdns => {
                "more than one QUESTION record without mDNS enabled"
            }
            InvalidRecordReason::SoaUnderMdns => "SOA record with mDNS enabled",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for IllegalUsageReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            IllegalUsageReason::ReadInstanceUsedForWrite => {
                "a read-side name codec instance was used to write a name"
            }
            IllegalUsageReason::WriteInstanceUsedForRead => {
                "a write-side name codec instance was used to read a name"
            }
            IllegalUsageReason::FactoryKindMismatch => {
                "a message factory was asked to build the wrong kind of message"
            }
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedMessage { detail, .. } => write!(f, "malformed message: {detail}"),
            Error::InvalidDomainName(reason) => write!(f, "invalid domain name: {reason}"),
            Error::UnencodableCharacters => {
                write!(f, "name contains characters the active codec cannot encode")
            }
            Error::InvalidRecord(reason) => write!(f, "invalid record: {reason}"),
            Error::IllegalUsage(reason) => write!(f, "illegal usage: {reason}"),
            Error::BufferOverflow => write!(f, "encoded message exceeds the maximum packet size"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
