//! The value types shared by every wire-format component: record and
//! query type/class codes, op codes, response codes, the flag set, and
//! the four message sections.

use std::fmt;

/// One of the four ordered sections of a message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}

/// The finite set of header flags, packed into one byte. Distinct from
/// `opcode`/`rcode`/`z`, which are multi-bit fields rather than booleans.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Flags(u8);

impl Flags {
    pub const IS_REPLY: Flags = Flags(0b1_0000);
    pub const AUTHORITATIVE_ANSWER: Flags = Flags(0b0_1000);
    pub const TRUNCATED: Flags = Flags(0b0_0100);
    pub const RECURSION_DESIRED: Flags = Flags(0b0_0010);
    pub const RECURSION_AVAILABLE: Flags = Flags(0b0_0001);

    pub fn empty() -> Self {
        Flags(0)
    }

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Flags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Flags {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Flags(u.arbitrary::<u8>()? & 0b1_1111))
    }
}

/// What sort of query this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Opcode {
    Query,
    IQuery,
    Status,
    Notify,
    Update,
    Reserved(OpcodeReserved),
}

/// A struct with a private constructor, so an invalid `Opcode` cannot be
/// built except by round-tripping through `From<u8>`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OpcodeReserved(u8);

impl Opcode {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Opcode::Reserved(_))
    }
}

impl From<u8> for Opcode {
    fn from(octet: u8) -> Self {
        match octet & 0b1111 {
            0 => Opcode::Query,
            1 => Opcode::IQuery,
            2 => Opcode::Status,
            4 => Opcode::Notify,
            5 => Opcode::Update,
            other => Opcode::Reserved(OpcodeReserved(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::Query => 0,
            Opcode::IQuery => 1,
            Opcode::Status => 2,
            Opcode::Notify => 4,
            Opcode::Update => 5,
            Opcode::Reserved(OpcodeReserved(octet)) => octet,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Opcode {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u8>()?))
    }
}

/// The 12-bit response code: 4 low bits live in the header flag word, 8
/// high bits are carried by an OPT record's TTL (EDNS extended RCODE).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    YxRrSet,
    NxRrSet,
    NotAuth,
    NotZone,
    BadVersOrBadSig,
    BadKey,
    BadTime,
    BadMode,
    BadName,
    BadAlg,
    BadTrunc,
    BadCookie,
    Reserved(RcodeReserved),
}

/// A struct with a private constructor, so an invalid `Rcode` cannot be
/// built except by round-tripping through `From<u16>`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RcodeReserved(u16);

impl Rcode {
    /// Whether this response code requires an EDNS OPT record to carry
    /// its high 8 bits (values 16 and up).
    pub fn is_extended(&self) -> bool {
        u16::from(*self) >= 16
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, Rcode::Reserved(_))
    }

    /// Reassemble a full 12-bit code from the header's low nibble and an
    /// OPT record's extended-rcode high byte.
    pub fn from_parts(low_nibble: u8, high_byte: u8) -> Self {
        Self::from((u16::from(high_byte) << 4) | u16::from(low_nibble & 0xF))
    }

    pub fn low_nibble(self) -> u8 {
        (u16::from(self) & 0xF) as u8
    }

    pub fn high_byte(self) -> u8 {
        (u16::from(self) >> 4) as u8
    }
}

impl From<u16> for Rcode {
    fn from(value: u16) -> Self {
        match value & 0x0FFF {
            0 => Rcode::NoError,
            1 => Rcode::FormErr,
            2 => Rcode::ServFail,
            3 => Rcode::NxDomain,
            4 => Rcode::NotImp,
            5 => Rcode::Refused,
            6 => Rcode::YxDomain,
            7 => Rcode::YxRrSet,
            8 => Rcode::NxRrSet,
            9 => Rcode::NotAuth,
            10 => Rcode::NotZone,
            16 => Rcode::BadVersOrBadSig,
            17 => Rcode::BadKey,
            18 => Rcode::BadTime,
            19 => Rcode::BadMode,
            20 => Rcode::BadName,
            21 => Rcode::BadAlg,
            22 => Rcode::BadTrunc,
            23 => Rcode::BadCookie,
            other => Rcode::Reserved(RcodeReserved(other)),
        }
    }
}

impl From<Rcode> for u16 {
    fn from(value: Rcode) -> Self {
        match value {
            Rcode::NoError => 0,
            Rcode::FormErr => 1,
            Rcode::ServFail => 2,
            Rcode::NxDomain => 3,
            Rcode::NotImp => 4,
            Rcode::Refused => 5,
            Rcode::YxDomain => 6,
            Rcode::YxRrSet => 7,
            Rcode::NxRrSet => 8,
            Rcode::NotAuth => 9,
            Rcode::NotZone => 10,
            Rcode::BadVersOrBadSig => 16,
            Rcode::BadKey => 17,
            Rcode::BadTime => 18,
            Rcode::BadMode => 19,
            Rcode::BadName => 20,
            Rcode::BadAlg => 21,
            Rcode::BadTrunc => 22,
            Rcode::BadCookie => 23,
            Rcode::Reserved(RcodeReserved(value)) => value,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Rcode {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()? & 0x0FFF))
    }
}

/// Record classes, used by resource records and (wrapped in
/// `QueryClass`) by questions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordClass {
    IN,
    CS,
    CH,
    HS,
    NONE,
    Unknown(RecordClassUnknown),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecordClassUnknown(u16);

impl RecordClass {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordClass::Unknown(_))
    }
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            2 => RecordClass::CS,
            3 => RecordClass::CH,
            4 => RecordClass::HS,
            254 => RecordClass::NONE,
            other => RecordClass::Unknown(RecordClassUnknown(other)),
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(value: RecordClass) -> Self {
        match value {
            RecordClass::IN => 1,
            RecordClass::CS => 2,
            RecordClass::CH => 3,
            RecordClass::HS => 4,
            RecordClass::NONE => 254,
            RecordClass::Unknown(RecordClassUnknown(value)) => value,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordClass {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()?))
    }
}

/// Query classes are a superset of record classes: `ANY` (255) only
/// makes sense in a question.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum QueryClass {
    Record(RecordClass),
    Any,
}

impl From<u16> for QueryClass {
    fn from(value: u16) -> Self {
        match value {
            255 => QueryClass::Any,
            _ => QueryClass::Record(RecordClass::from(value)),
        }
    }
}

impl From<QueryClass> for u16 {
    fn from(value: QueryClass) -> Self {
        match value {
            QueryClass::Any => 255,
            QueryClass::Record(rclass) => rclass.into(),
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for QueryClass {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()?))
    }
}

/// Record types, per the IANA DNS parameters registry. All payloads
/// other than PTR and OPT are carried as opaque bytes: the type tag is
/// tracked but never interpreted beyond that.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordType {
    A,
    NS,
    MD,
    MF,
    CNAME,
    SOA,
    MB,
    MG,
    MR,
    NULL,
    WKS,
    PTR,
    HINFO,
    MINFO,
    MX,
    TXT,
    RP,
    AFSDB,
    SIG,
    KEY,
    AAAA,
    LOC,
    SRV,
    NAPTR,
    KX,
    CERT,
    DNAME,
    OPT,
    APL,
    DS,
    SSHFP,
    IPSECKEY,
    RRSIG,
    NSEC,
    DNSKEY,
    DHCID,
    NSEC3,
    NSEC3PARAM,
    TLSA,
    SMIMEA,
    HIP,
    CDS,
    CDNSKEY,
    OPENPGPKEY,
    CSYNC,
    ZONEMD,
    SVCB,
    HTTPS,
    EUI48,
    EUI64,
    TKEY,
    TSIG,
    URI,
    CAA,
    Unknown(RecordTypeUnknown),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecordTypeUnknown(u16);

impl RecordType {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordType::Unknown(_))
    }

    /// Types that only appear in a question, never as a stored record.
    pub fn is_meta(&self) -> bool {
        matches!(self, RecordType::OPT | RecordType::TSIG | RecordType::TKEY)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordType::Unknown(RecordTypeUnknown(n)) => write!(f, "{n}"),
            other => write!(f, "{}", u16::from(*other)),
        }
    }
}

macro_rules! record_type_codes {
    ($($variant:ident = $code:literal),* $(,)?) => {
        impl From<u16> for RecordType {
            fn from(value: u16) -> Self {
                match value {
                    $($code => RecordType::$variant,)*
                    other => RecordType::Unknown(RecordTypeUnknown(other)),
                }
            }
        }

        impl From<RecordType> for u16 {
            fn from(value: RecordType) -> Self {
                match value {
                    $(RecordType::$variant => $code,)*
                    RecordType::Unknown(RecordTypeUnknown(value)) => value,
                }
            }
        }
    };
}

record_type_codes! {
    A = 1,
    NS = 2,
    MD = 3,
    MF = 4,
    CNAME = 5,
    SOA = 6,
    MB = 7,
    MG = 8,
    MR = 9,
    NULL = 10,
    WKS = 11,
    PTR = 12,
    HINFO = 13,
    MINFO = 14,
    MX = 15,
    TXT = 16,
    RP = 17,
    AFSDB = 18,
    SIG = 24,
    KEY = 25,
    AAAA = 28,
    LOC = 29,
    SRV = 33,
    NAPTR = 35,
    KX = 36,
    CERT = 37,
    DNAME = 39,
    OPT = 41,
    APL = 42,
    DS = 43,
    SSHFP = 44,
    IPSECKEY = 45,
    RRSIG = 46,
    NSEC = 47,
    DNSKEY = 48,
    DHCID = 49,
    NSEC3 = 50,
    NSEC3PARAM = 51,
    TLSA = 52,
    SMIMEA = 53,
    HIP = 55,
    CDS = 59,
    CDNSKEY = 60,
    OPENPGPKEY = 61,
    CSYNC = 62,
    ZONEMD = 63,
    SVCB = 64,
    HTTPS = 65,
    EUI48 = 108,
    EUI64 = 109,
    TKEY = 249,
    TSIG = 250,
    URI = 256,
    CAA = 257,
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordType {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()?))
    }
}

/// Query types are a superset of record types, plus the question-only
/// codes `AXFR`/`IXFR`/`MAILB`/`MAILA`/`ANY`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum QueryType {
    Record(RecordType),
    IXFR,
    AXFR,
    MAILB,
    MAILA,
    Any,
}

impl QueryType {
    pub fn is_unknown(&self) -> bool {
        match self {
            QueryType::Record(rtype) => rtype.is_unknown(),
            _ => false,
        }
    }
}

impl From<u16> for QueryType {
    fn from(value: u16) -> Self {
        match value {
            251 => QueryType::IXFR,
            252 => QueryType::AXFR,
            253 => QueryType::MAILB,
            254 => QueryType::MAILA,
            255 => QueryType::Any,
            _ => QueryType::Record(RecordType::from(value)),
        }
    }
}

impl From<QueryType> for u16 {
    fn from(value: QueryType) -> Self {
        match value {
            QueryType::IXFR => 251,
            QueryType::AXFR => 252,
            QueryType::MAILB => 253,
            QueryType::MAILA => 254,
            QueryType::Any => 255,
            QueryType::Record(rtype) => rtype.into(),
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for QueryType {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_roundtrips_through_low_nibble() {
        for i in 0..=255u8 {
            assert_eq!(u8::from(Opcode::from(i)), i & 0xF);
        }
    }

    #[test]
    fn rcode_roundtrips_within_12_bits() {
        for i in 0..4096u16 {
            assert_eq!(u16::from(Rcode::from(i)), i);
        }
    }

    #[test]
    fn rcode_from_parts_reassembles_extended_code() {
        let rcode = Rcode::BadCookie;
        assert_eq!(
            Rcode::from_parts(rcode.low_nibble(), rcode.high_byte()),
            rcode
        );
    }

    #[test]
    fn flags_bitor_and_contains() {
        let flags = Flags::IS_REPLY | Flags::RECURSION_DESIRED;
        assert!(flags.contains(Flags::IS_REPLY));
        assert!(flags.contains(Flags::RECURSION_DESIRED));
        assert!(!flags.contains(Flags::AUTHORITATIVE_ANSWER));
    }

    #[test]
    fn known_record_type_roundtrips() {
        assert_eq!(u16::from(RecordType::from(41)), 41);
        assert_eq!(RecordType::from(41), RecordType::OPT);
    }
}
