//! Word forms and lemmata reconstructed from the flat dictionary format.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

use crate::tagset::TagSet;
use crate::Error;

lazy_static! {
    // The source dictionary encodes pronouns irregularly: the pronoun class
    // tags follow an `&pron` marker somewhere in the tag string. The rewrite
    // drops the marker, promotes `pron` to the head of the tag string and
    // keeps the remaining tags after the pronoun class tags.
    static ref PRON_TAGS: Regex = Regex::new(
        "([a-z][^:]+)(.*):&pron((?::pers|:refl|:pos|:dem|:def|:int|:rel|:neg|:ind|:gen)+)(.*)"
    )
    .unwrap();
}

fn rewrite_pron_tags(tags: &str) -> Cow<str> {
    if tags.contains(":&pron") {
        PRON_TAGS.replace(tags, "pron${3}${2}${4}")
    } else {
        Cow::Borrowed(tags)
    }
}

/// A single word form: one inflected spelling plus its tags, built from the
/// form and tag strings of a dictionary line.
#[derive(Debug, Clone)]
pub struct WordForm {
    pub form: String,
    pub tags: Vec<String>,
    /// Colon-joined sorted tags. Two forms whose tags are permutations of
    /// each other get the same signature.
    pub tags_signature: String,
    pub is_lemma: bool,
    /// The resolved part-of-speech tag; empty when none or more than one of
    /// the tags belongs to the part-of-speech group.
    pub pos: String,
}

impl WordForm {
    pub fn new(form: &str, tags: &str, tag_set: &TagSet, is_lemma: bool) -> Self {
        let tags = rewrite_pron_tags(tags);

        let tags: Vec<String> = tags
            .split(':')
            .map(|tag| tag.trim().to_string())
            .collect();

        let tags_signature = tags.iter().sorted().join(":");

        let pos_tags: Vec<&str> = tags
            .iter()
            .filter(|tag| tag_set.pos_tags().contains(tag))
            .map(String::as_str)
            .collect();

        let mut pos = String::new();
        match pos_tags.as_slice() {
            [] => debug!("word form {} has no POS tag assigned", form),
            [only] => {
                pos = (*only).to_string();

                if *only != tags[0] {
                    debug!(
                        "word form {} has strange POS tag {} instead of {}",
                        form, only, tags[0]
                    );
                }
            }
            _ => debug!(
                "word form {} has more than one POS tag assigned: {:?}",
                form, pos_tags
            ),
        }

        WordForm {
            form: form.to_string(),
            tags,
            tags_signature,
            is_lemma,
            pos,
        }
    }
}

impl fmt::Display for WordForm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}: {}>", self.form, self.tags_signature)
    }
}

/// A dictionary headword with all of its word forms, grouped by tag
/// signature.
pub struct Lemma {
    pub word: String,
    pub lemma_form: WordForm,
    pub pos: String,
    tag_set: Arc<TagSet>,
    forms: IndexMap<String, Vec<WordForm>>,
    common_tags: Option<HashSet<String>>,
}

impl Lemma {
    pub fn new(word: &str, lemma_form_tags: &str, tag_set: Arc<TagSet>) -> Self {
        let lemma_form = WordForm::new(word, lemma_form_tags, &tag_set, true);

        let mut lemma = Lemma {
            word: word.to_string(),
            pos: lemma_form.pos.clone(),
            lemma_form: lemma_form.clone(),
            tag_set,
            forms: IndexMap::new(),
            common_tags: None,
        };
        lemma.add_form(lemma_form);
        lemma
    }

    /// Adds a word form, shrinking the common tag set.
    ///
    /// Returns the tag signature when the form collides with an already
    /// recorded form of the same signature but a different spelling (a
    /// "double form"). Re-reading an identical spelling resets that
    /// signature to the fresh form and is not reported.
    pub fn add_form(&mut self, form: WordForm) -> Option<String> {
        match self.common_tags.as_mut() {
            Some(common) => common.retain(|tag| form.tags.contains(tag)),
            None => self.common_tags = Some(form.tags.iter().cloned().collect()),
        }

        let signature = form.tags_signature.clone();
        let surface = form.form.clone();

        let doubled = match self.forms.get_mut(&signature) {
            None => {
                self.forms.insert(signature.clone(), vec![form]);
                false
            }
            Some(existing) => {
                if existing.iter().any(|recorded| recorded.form == surface) {
                    *existing = vec![form];
                    false
                } else {
                    existing.push(form);
                    true
                }
            }
        };

        if doubled {
            let existing = &self.forms[&signature];
            debug!(
                "lemma {} got {} forms with same tagset {}: {}",
                self,
                existing.len(),
                signature,
                existing
                    .iter()
                    .map(|recorded| recorded.form.as_str())
                    .join(", ")
            );
            Some(signature)
        } else {
            None
        }
    }

    /// Tags shared by every form added so far. `None` only before the first
    /// form is added; the constructor seeds it with the lemma form.
    pub fn common_tags(&self) -> Option<&HashSet<String>> {
        self.common_tags.as_ref()
    }

    pub fn forms(&self) -> &IndexMap<String, Vec<WordForm>> {
        &self.forms
    }

    /// The headword plus the sorted common tags.
    pub fn lemma_signature(&self) -> Vec<String> {
        let mut signature = vec![self.word.clone()];
        if let Some(common) = &self.common_tags {
            let sorted = self
                .tag_set
                .sort_tags(common.iter().map(String::as_str).collect());
            signature.extend(sorted.into_iter().map(str::to_string));
        }
        signature
    }

    /// Serializes the lemma to a `<lemma>` XML fragment.
    ///
    /// The common tags go on the canonical `<l>` element; every `<f>` element
    /// carries only the tags its form does not share with the rest of the
    /// lemma. Returns `Ok(None)` for a lemma whose forms have no tags in
    /// common at all; such lemmata are left out of the export.
    pub fn to_xml(&self, id: u64, rev: u32) -> Result<Option<String>, Error> {
        let common_tags = match &self.common_tags {
            Some(tags) if !tags.is_empty() => tags,
            _ => {
                debug!("Lemma {} has no tags at all", self);
                return Ok(None);
            }
        };

        let mut buf = Vec::new();
        let mut writer = EmitterConfig::new()
            .write_document_declaration(false)
            .create_writer(&mut buf);

        let id_attr = id.to_string();
        let rev_attr = rev.to_string();
        writer.write(
            XmlEvent::start_element("lemma")
                .attr("id", &id_attr)
                .attr("rev", &rev_attr),
        )?;

        let headword = self.lemma_form.form.to_lowercase();
        writer.write(XmlEvent::start_element("l").attr("t", &headword))?;
        self.write_tags(
            &mut writer,
            common_tags.iter().map(String::as_str).collect(),
        )?;
        writer.write(XmlEvent::end_element())?;

        // The lemma's own word form is listed first among the forms.
        let (lemma_forms, other_forms): (Vec<&WordForm>, Vec<&WordForm>) = self
            .forms
            .values()
            .flatten()
            .partition(|form| form.is_lemma);

        for form in lemma_forms.into_iter().chain(other_forms) {
            let surface = form.form.to_lowercase();
            writer.write(XmlEvent::start_element("f").attr("t", &surface))?;
            self.write_tags(
                &mut writer,
                form.tags
                    .iter()
                    .filter(|tag| !common_tags.contains(*tag))
                    .map(String::as_str)
                    .collect(),
            )?;
            writer.write(XmlEvent::end_element())?;
        }

        writer.write(XmlEvent::end_element())?;

        Ok(Some(
            String::from_utf8(buf).expect("lemma export produced invalid UTF-8"),
        ))
    }

    /// Writes `<g>` grammeme references: the lemma's part of speech first,
    /// the rest sorted by group tier. Tags missing from the tagset are
    /// skipped.
    fn write_tags<W: io::Write>(
        &self,
        writer: &mut EventWriter<W>,
        mut tags: Vec<&str>,
    ) -> Result<(), xml::writer::Error> {
        if !self.pos.is_empty() && tags.iter().any(|tag| *tag == self.pos) {
            if let Some(name) = self.tag_set.opencorpora_name(&self.pos) {
                write_grammeme_ref(writer, name)?;
            }
            tags.retain(|tag| *tag != self.pos);
        }

        let mut sorted = self.tag_set.sort_tags(tags);
        sorted.dedup();

        for tag in sorted {
            if let Some(name) = self.tag_set.opencorpora_name(tag) {
                write_grammeme_ref(writer, name)?;
            }
        }

        Ok(())
    }
}

fn write_grammeme_ref<W: io::Write>(
    writer: &mut EventWriter<W>,
    name: &str,
) -> Result<(), xml::writer::Error> {
    writer.write(XmlEvent::start_element("g").attr("v", name))?;
    writer.write(XmlEvent::end_element())
}

impl fmt::Display for Lemma {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.lemma_form)
    }
}
