#![warn(clippy::pedantic)]
// False positives for `bytes::Bytes`
#![allow(clippy::mutable_key_type)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::wildcard_imports)]

//! A DNS message wire codec.
//!
//! This crate encodes and decodes the wire representation of a DNS
//! message: the 12-byte header, the four ordered sections, label-pointer
//! name compression, and the EDNS(0) OPT pseudo-record. It does not
//! resolve names, talk to a network, or interpret any resource record's
//! payload beyond PTR and OPT.
//!
//! The pieces:
//!
//! - [`name`] — domain names, label-pointer compression, punycode/mDNS
//!   UTF-8 profiles.
//! - [`record`] — questions and resource records.
//! - [`opt`] — the EDNS(0) OPT pseudo-record.
//! - [`message`] — the full message, illegal-record policy, winnowing.
//! - [`limits`] — buffer-size policy.
//! - [`factory`] — paired read/write name-codec handles.
//! - [`config`] — the aggregate, `serde`-deserializable configuration.

pub mod buffer;
pub mod config;
pub mod error;
pub mod factory;
pub mod limits;
pub mod message;
pub mod name;
pub mod opt;
pub mod record;
pub mod types;

pub use config::Config;
pub use error::Error;
pub use factory::NameCodecFactory;
pub use message::{decode, encode, DefaultMessageFactory, Header, IllegalRecordPolicy, Message, MessageFactory, Winnower};
pub use name::{Name, NameCodecFeatures};
pub use record::{Question, RecordData, ResourceRecord, UnderflowPolicy};
pub use types::{Flags, Opcode, QueryClass, QueryType, Rcode, RecordClass, RecordType, Section};
