//! RDF serialization formats
//!
//! Loads and writes graphs for the demo binary and the test fixtures.
//! Supports:
//! - Turtle (TTL)
//! - N-Triples (NT)

mod turtle;

use super::{RdfStore, Triple};
use std::path::Path;
use thiserror::Error;

pub use turtle::{parse_ntriples, parse_turtle, write_ntriples, write_turtle};

/// RDF serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    /// Turtle format (.ttl)
    Turtle,
    /// N-Triples format (.nt)
    NTriples,
}

impl RdfFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ttl" => Some(RdfFormat::Turtle),
            "nt" => Some(RdfFormat::NTriples),
            _ => None,
        }
    }
}

/// Parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Syntax error reported by the underlying parser
    #[error("Syntax error: {0}")]
    Syntax(#[from] rio_turtle::TurtleError),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// RDF parser
pub struct RdfParser;

impl RdfParser {
    /// Parse RDF data from a string
    pub fn parse(input: &str, format: RdfFormat) -> ParseResult<Vec<Triple>> {
        match format {
            RdfFormat::Turtle => parse_turtle(input),
            RdfFormat::NTriples => parse_ntriples(input),
        }
    }

    /// Parse RDF data from a file
    pub fn parse_file(path: &Path, format: RdfFormat) -> ParseResult<Vec<Triple>> {
        let input = std::fs::read_to_string(path)?;
        Self::parse(&input, format)
    }

    /// Parse a file straight into a new store
    pub fn load_store(path: &Path, format: RdfFormat) -> ParseResult<RdfStore> {
        let mut store = RdfStore::new();
        store.load(Self::parse_file(path, format)?);
        Ok(store)
    }
}

/// RDF serializer
pub struct RdfSerializer;

impl RdfSerializer {
    /// Serialize triples to a string
    pub fn serialize(triples: &[Triple], format: RdfFormat) -> SerializeResult<String> {
        match format {
            RdfFormat::Turtle => write_turtle(triples),
            RdfFormat::NTriples => write_ntriples(triples),
        }
    }

    /// Serialize RDF store to a string
    pub fn serialize_store(store: &RdfStore, format: RdfFormat) -> SerializeResult<String> {
        let triples: Vec<Triple> = store.iter().cloned().collect();
        Self::serialize(&triples, format)
    }
}
