//! Converts LanguageTool morphological dictionaries to the OpenCorpora XML format.
//! # Overview
//!
//! The converter has the following core abstractions:
//! - A [TagSet][tagset::TagSet] loaded from a CSV grammeme table. It knows the
//!   grammeme groups, their order and the mapping from LanguageTool tag names
//!   to OpenCorpora tag names.
//! - A [WordForm][lemma::WordForm], one inflected spelling with its tags.
//! - A [Lemma][lemma::Lemma] grouping word forms by tag signature and tracking
//!   the tags common to all of them.
//! - A [Converter][convert::Converter] streaming the source dictionary line by
//!   line and writing the OpenCorpora XML document.
//!
//! # Examples
//!
//! Convert a dictionary using the bundled tagset mapping:
//!
//! ```no_run
//! use lt2opencorpora::{convert::Converter, tagset::TagSet};
//!
//! let tag_set = TagSet::bundled()?;
//! let stats = Converter::new(tag_set).run("dict_uk.txt.gz", "dict_uk.xml")?;
//!
//! println!("{} lemmata written", stats.lemmata_written);
//! # Ok::<(), lt2opencorpora::Error>(())
//! ```

use std::io;

use thiserror::Error;

pub mod convert;
pub mod lemma;
pub mod tagset;

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    XmlWriter(#[from] xml::writer::Error),
    #[error("tagset is missing required column '{column}'")]
    MissingColumn { column: &'static str },
    #[error("grammeme '{name}' is listed as its own parent")]
    SelfParented { name: String },
    #[error("malformed dictionary line {line}: expected '<word> <tags>'")]
    MalformedLine { line: usize },
    #[error("word form at line {line} appears before any lemma")]
    OrphanForm { line: usize },
}
