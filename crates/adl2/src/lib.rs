//! # adl2
//!
//! A Rust library for parsing openEHR Archetype Definition Language 2 (ADL2)
//! artefacts.
//!
//! This crate provides:
//! - **Lexer**: Tokenize ADL2 text into a positioned token stream
//! - **Archetype parser**: Extract the header, metadata sections, constraint
//!   definition, and terminology of one artefact
//! - **ODIN parser**: Parse the generic keyed/primitive/interval notation
//!   used by metadata sections
//! - **cADL parser**: Parse the `definition` section into a constraint tree
//! - **Serializer**: Render a parsed archetype back to ADL2 text
//!
//! Validation of data instances against a parsed archetype lives in the
//! companion `adl2-validator` crate.
//!
//! ## Usage
//!
//! ```rust
//! use adl2::parse;
//!
//! let source = r#"
//! archetype (adl_version=2.0.5)
//!     openEHR-EHR-OBSERVATION.blood_pressure.v1
//!
//! definition
//!     OBSERVATION[id1] matches {
//!         data matches {
//!             HISTORY[id2]
//!         }
//!     }
//! "#;
//!
//! let outcome = parse(source).unwrap();
//! assert_eq!(
//!     outcome.archetype.archetype_id,
//!     "openEHR-EHR-OBSERVATION.blood_pressure.v1"
//! );
//! assert_eq!(outcome.archetype.root_rm_type(), Some("OBSERVATION"));
//! ```
//!
//! ## Recovery model
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | Unknown character, unterminated string | Fatal [`AdlError::Lex`] |
//! | Malformed header, identifier, ODIN section | Fatal [`AdlError::Syntax`] |
//! | Malformed `definition` section | Warning + placeholder root |
//! | `rules` / `annotations` / `rm_overlay` section | Warning, section skipped |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod archetype;
mod ast;
mod cadl;
mod cursor;
mod error;
mod lexer;
mod odin;
mod serializer;

pub use archetype::{parse, parse_archetype};
pub use ast::{
    Archetype, ArtefactKind, CArchetypeSlot, CAttribute, CBoolean, CComplexObject,
    CComplexObjectProxy, CInteger, CObject, CPrimitive, CPrimitiveObject, CReal, CString,
    CTemporal, CTerminologyCode, Interval, MultiplicityInterval, ParseOutcome, ParseWarning,
    TermDefinition, Terminology,
};
pub use cadl::parse_definition;
pub use error::{AdlError, AdlResult};
pub use lexer::{tokenize, Token, TokenKind};
pub use odin::{parse_odin, OdinInterval, OdinValue};
pub use serializer::{serialize, SerializeConfig};
