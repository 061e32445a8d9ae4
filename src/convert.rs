//! Streams a LanguageTool dictionary file and writes the OpenCorpora XML
//! document.
//!
//! The source format groups lines by indentation: a non-indented line starts
//! a new lemma, a two-space-indented line is a word form of the current
//! lemma. Completed lemmata are serialized one by one and the accumulated
//! fragments are flushed to a temp file every [FLUSH_EVERY] lemmata, so the
//! whole converted dictionary is never held in memory.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use log::info;
use tempfile::NamedTempFile;

use crate::lemma::{Lemma, WordForm};
use crate::tagset::TagSet;
use crate::Error;

/// How many exported lemmata may accumulate in memory between flushes.
pub const FLUSH_EVERY: u64 = 100_000;

/// Receives data-quality notifications while a dictionary is converted.
pub trait Observer {
    /// Two different spellings within one lemma share a tag signature.
    fn doubleform_found(&mut self, lemma: &str, tags_signature: &str);
}

/// Observer that discards every notification.
pub struct NullObserver;

impl Observer for NullObserver {
    fn doubleform_found(&mut self, _lemma: &str, _tags_signature: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConvertStats {
    pub lemmata_written: usize,
    /// Lemmata left out of the export because their forms share no tags.
    pub lemmata_dropped: usize,
    pub doubleforms: usize,
}

/// Opens a dictionary file, transparently decompressing `.gz` and `.bz2`.
pub fn open_any(path: &Path) -> Result<Box<dyn BufRead>, Error> {
    let file = File::open(path)?;

    let reader: Box<dyn BufRead> = match path.extension().and_then(|ext| ext.to_str()) {
        Some("gz") => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        Some("bz2") => Box::new(BufReader::new(BzDecoder::new(file))),
        _ => Box::new(BufReader::new(file)),
    };

    Ok(reader)
}

fn split_entry(line: &str, lineno: usize) -> Result<(&str, &str), Error> {
    let line = line.trim();
    let mut parts = line.splitn(2, ' ');

    match (parts.next(), parts.next()) {
        (Some(word), Some(tags)) if !word.is_empty() && !tags.trim().is_empty() => {
            Ok((word, tags))
        }
        _ => Err(Error::MalformedLine { line: lineno }),
    }
}

fn append_lemma(
    lemma: &Lemma,
    counter: &mut u64,
    fragments: &mut String,
    stats: &mut ConvertStats,
) -> Result<(), Error> {
    match lemma.to_xml(*counter, 1)? {
        Some(xml) => {
            fragments.push('\n');
            fragments.push_str(&xml);
            *counter += 1;
            stats.lemmata_written += 1;
        }
        None => stats.lemmata_dropped += 1,
    }

    Ok(())
}

fn flush_fragments(fragments: &mut String, temp: &mut File) -> io::Result<()> {
    if fragments.is_empty() {
        return Ok(());
    }

    temp.write_all(fragments.as_bytes())?;
    fragments.clear();

    Ok(())
}

/// Drives the conversion of one dictionary file.
pub struct Converter {
    tag_set: Arc<TagSet>,
    observer: Box<dyn Observer>,
}

impl Converter {
    pub fn new(tag_set: TagSet) -> Self {
        Converter::with_observer(tag_set, Box::new(NullObserver))
    }

    pub fn with_observer(tag_set: TagSet, observer: Box<dyn Observer>) -> Self {
        Converter {
            tag_set: Arc::new(tag_set),
            observer,
        }
    }

    pub fn run<P, Q>(&mut self, input: P, output: Q) -> Result<ConvertStats, Error>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let input = input.as_ref();
        let output = output.as_ref();

        info!("Reading dictionary from {}.", input.display());
        let reader = open_any(input)?;

        let mut temp = NamedTempFile::new()?;
        let mut fragments = String::new();
        let mut stats = ConvertStats::default();
        let mut counter: u64 = 1;
        let mut current: Option<Lemma> = None;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let lineno = i + 1;

            if let Some(rest) = line.strip_prefix("  ") {
                // a form of the current lemma
                let lemma = current
                    .as_mut()
                    .ok_or(Error::OrphanForm { line: lineno })?;
                let (form, tags) = split_entry(rest, lineno)?;
                let form = WordForm::new(form, tags, &self.tag_set, false);

                if let Some(signature) = lemma.add_form(form) {
                    stats.doubleforms += 1;
                    self.observer.doubleform_found(&lemma.word, &signature);
                }
            } else {
                if counter % FLUSH_EVERY == 0 {
                    flush_fragments(&mut fragments, temp.as_file_mut())?;
                }

                if let Some(lemma) = current.take() {
                    append_lemma(&lemma, &mut counter, &mut fragments, &mut stats)?;
                }

                let (word, tags) = split_entry(&line, lineno)?;
                current = Some(Lemma::new(word, tags, Arc::clone(&self.tag_set)));
            }
        }

        if let Some(lemma) = current.take() {
            append_lemma(&lemma, &mut counter, &mut fragments, &mut stats)?;
        }
        flush_fragments(&mut fragments, temp.as_file_mut())?;

        info!(
            "Writing {} lemmata to {} ({} dropped, {} double forms).",
            stats.lemmata_written,
            output.display(),
            stats.lemmata_dropped,
            stats.doubleforms
        );

        let mut out = BufWriter::new(File::create(output)?);
        out.write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        out.write_all(b"<dictionary version=\"0.2\" revision=\"1\">\n")?;
        out.write_all(self.tag_set.export_grammemes()?.as_bytes())?;
        out.write_all(b"\n<lemmata>")?;

        let mut flushed = temp.reopen()?;
        io::copy(&mut flushed, &mut out)?;

        out.write_all(b"\n</lemmata>\n</dictionary>\n")?;
        out.flush()?;

        // `temp` going out of scope removes the fragment file, on the error
        // paths above as well.
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn entries_split_on_the_first_space() {
        assert_eq!(
            split_entry("кіт noun:m:v_naz", 1).unwrap(),
            ("кіт", "noun:m:v_naz")
        );
        // anything after the first space belongs to the tag string
        assert_eq!(split_entry("кіт a b", 1).unwrap(), ("кіт", "a b"));
    }

    #[test]
    fn bare_words_are_a_parse_error() {
        for line in &["кіт", "", "   "] {
            match split_entry(line, 42) {
                Err(Error::MalformedLine { line }) => assert_eq!(line, 42),
                other => panic!("expected MalformedLine, got {:?}", other),
            }
        }
    }

    #[test]
    fn gzipped_input_is_transparently_decompressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.txt.gz");

        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        encoder.write_all("кіт noun:m:v_naz\n".as_bytes()).unwrap();
        encoder.finish().unwrap();

        let mut lines = open_any(&path).unwrap().lines();
        assert_eq!(lines.next().unwrap().unwrap(), "кіт noun:m:v_naz");
    }
}
