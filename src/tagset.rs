//! The LanguageTool tagset: grammeme records loaded from a CSV table, group
//! ordering and the mapping to OpenCorpora tag names.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use xml::writer::{EmitterConfig, XmlEvent};

use crate::Error;

/// Parent value connecting the group tags themselves.
pub const AUX_GROUP: &str = "aux";
/// Name of the part-of-speech group.
pub const POS_GROUP: &str = "POST";

const REQUIRED_COLUMNS: [&str; 6] = [
    "name",
    "parent",
    "opencorpora tags",
    "description",
    "lemma form",
    "divide by",
];

const DEFAULT_MAPPING: &str = include_str!("../data/mapping.csv");

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect())
}

/// One row of the tagset table.
#[derive(Debug, Clone, Deserialize)]
pub struct Grammeme {
    pub name: String,
    /// Name of the group this grammeme belongs to. Group tags themselves are
    /// parented to [AUX_GROUP].
    pub parent: String,
    /// Exported OpenCorpora tag name. Defaults to `name` when the column is
    /// empty.
    #[serde(rename = "opencorpora tags")]
    pub opencorpora_tags: String,
    pub description: String,
    /// Tags a word form must carry to be treated as the lemma form.
    #[serde(rename = "lemma form", deserialize_with = "comma_list")]
    pub lemma_form: Vec<String>,
    #[serde(rename = "divide by", deserialize_with = "comma_list")]
    pub divide_by: Vec<String>,
}

/// The LanguageTool tagset.
///
/// Keeps the full grammeme records in file order, the first-seen order of
/// groups (which defines the tag sort order on export) and a few lookup
/// shorthands used by the conversion.
pub struct TagSet {
    full: IndexMap<String, Grammeme>,
    groups: Vec<String>,
    children: HashMap<String, Vec<String>>,
    lt2opencorpora: HashMap<String, String>,
    all: Vec<String>,
}

impl TagSet {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_reader(File::open(path)?)
    }

    /// Loads the mapping shipped with the crate.
    pub fn bundled() -> Result<Self, Error> {
        Self::from_reader(DEFAULT_MAPPING.as_bytes())
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        {
            let headers = rdr.headers()?;
            for &column in &REQUIRED_COLUMNS {
                if !headers.iter().any(|header| header == column) {
                    return Err(Error::MissingColumn { column });
                }
            }
        }

        let mut tag_set = TagSet {
            full: IndexMap::new(),
            groups: Vec::new(),
            children: HashMap::new(),
            lt2opencorpora: HashMap::new(),
            all: Vec::new(),
        };

        for record in rdr.deserialize() {
            let mut grammeme: Grammeme = record?;

            if grammeme.parent == grammeme.name {
                return Err(Error::SelfParented {
                    name: grammeme.name,
                });
            }

            if grammeme.opencorpora_tags.is_empty() {
                grammeme.opencorpora_tags = grammeme.name.clone();
            }

            tag_set
                .lt2opencorpora
                .insert(grammeme.name.clone(), grammeme.opencorpora_tags.clone());

            tag_set
                .children
                .entry(grammeme.parent.clone())
                .or_insert_with(Vec::new)
                .push(grammeme.name.clone());

            if grammeme.parent != AUX_GROUP {
                tag_set.all.push(grammeme.name.clone());
            }

            if !tag_set.groups.contains(&grammeme.parent) {
                tag_set.groups.push(grammeme.parent.clone());
            }

            tag_set.full.insert(grammeme.name.clone(), grammeme);
        }

        Ok(tag_set)
    }

    pub fn get(&self, name: &str) -> Option<&Grammeme> {
        self.full.get(name)
    }

    pub fn grammemes(&self) -> impl Iterator<Item = &Grammeme> {
        self.full.values()
    }

    /// Child tag names of a group, in file order.
    pub fn children_of(&self, parent: &str) -> &[String] {
        self.children
            .get(parent)
            .map(|children| children.as_slice())
            .unwrap_or(&[])
    }

    /// Tags of the part-of-speech group.
    pub fn pos_tags(&self) -> &[String] {
        self.children_of(POS_GROUP)
    }

    /// All grammeme names except the group tags themselves.
    pub fn all_tags(&self) -> &[String] {
        &self.all
    }

    /// Exported OpenCorpora name of a tag, if the tag is part of the tagset.
    pub fn opencorpora_name(&self, tag: &str) -> Option<&str> {
        self.lt2opencorpora.get(tag).map(String::as_str)
    }

    /// Position of the tag's group in first-seen order. Unknown tags rank
    /// after every known group.
    pub fn group_rank(&self, tag: &str) -> usize {
        self.full
            .get(tag)
            .and_then(|grammeme| self.groups.iter().position(|group| *group == grammeme.parent))
            .unwrap_or_else(|| self.groups.len())
    }

    /// Sorts tags by their group tier first, lexicographically within a tier.
    pub fn sort_tags<'a>(&self, mut tags: Vec<&'a str>) -> Vec<&'a str> {
        tags.sort_by_key(|tag| (self.group_rank(tag), *tag));
        tags
    }

    /// Renders the `<grammemes>` taxonomy. Group tags (parented to
    /// [AUX_GROUP]) are exported without a parent attribute.
    pub fn export_grammemes(&self) -> Result<String, Error> {
        let mut buf = Vec::new();
        let mut writer = EmitterConfig::new()
            .write_document_declaration(false)
            .perform_indent(true)
            .create_writer(&mut buf);

        writer.write(XmlEvent::start_element("grammemes"))?;

        for grammeme in self.grammemes() {
            let element = if grammeme.parent == AUX_GROUP {
                XmlEvent::start_element("grammeme")
            } else {
                XmlEvent::start_element("grammeme").attr("parent", &grammeme.parent)
            };
            writer.write(element)?;

            let children = [
                ("name", &grammeme.opencorpora_tags),
                ("alias", &grammeme.name),
                ("description", &grammeme.description),
            ];
            for (name, text) in &children {
                writer.write(XmlEvent::start_element(*name))?;
                writer.write(XmlEvent::characters(text.as_str()))?;
                writer.write(XmlEvent::end_element())?;
            }

            writer.write(XmlEvent::end_element())?;
        }

        writer.write(XmlEvent::end_element())?;

        Ok(String::from_utf8(buf).expect("grammeme export produced invalid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = "\
name,parent,opencorpora tags,description,lemma form,divide by
POST,aux,POST,part of speech,,
noun,POST,NOUN,noun,v_naz,number
verb,POST,VERB,verb,inf,
pron,POST,NPRO,pronoun,,
gndr,aux,GNdr,gender,,
m,gndr,masc,masculine,,
f,gndr,femn,feminine,,
case,aux,CAse,case,,
v_naz,case,nomn,nominative,,
v_rod,case,gent,genitive,,
compb,degree,,comparative base,,
";

    fn tag_set() -> TagSet {
        TagSet::from_reader(MAPPING.as_bytes()).unwrap()
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let tag_set = tag_set();

        assert_eq!(tag_set.groups, ["aux", "POST", "gndr", "case", "degree"]);
        assert_eq!(tag_set.pos_tags(), ["noun", "verb", "pron"]);
        assert_eq!(tag_set.children_of("gndr"), ["m", "f"]);
        assert_eq!(tag_set.children_of("missing"), &[] as &[String]);
    }

    #[test]
    fn group_tags_are_not_part_of_all() {
        let tag_set = tag_set();

        assert!(tag_set.all_tags().contains(&"noun".to_string()));
        assert!(!tag_set.all_tags().contains(&"POST".to_string()));
        assert!(!tag_set.all_tags().contains(&"gndr".to_string()));
    }

    #[test]
    fn empty_opencorpora_column_falls_back_to_name() {
        let tag_set = tag_set();

        assert_eq!(tag_set.opencorpora_name("noun"), Some("NOUN"));
        assert_eq!(tag_set.opencorpora_name("compb"), Some("compb"));
        assert_eq!(tag_set.opencorpora_name("unknown"), None);
    }

    #[test]
    fn lemma_form_column_is_parsed_as_list() {
        let mapping = "\
name,parent,opencorpora tags,description,lemma form,divide by
adj,POST,ADJF,adjective,\"v_naz, m\",
";
        let tag_set = TagSet::from_reader(mapping.as_bytes()).unwrap();

        assert_eq!(tag_set.get("adj").unwrap().lemma_form, ["v_naz", "m"]);
        assert!(tag_set.get("adj").unwrap().divide_by.is_empty());
    }

    #[test]
    fn tags_sort_by_group_tier_then_name() {
        let tag_set = tag_set();

        assert_eq!(
            tag_set.sort_tags(vec!["v_rod", "m", "noun"]),
            ["noun", "m", "v_rod"]
        );
        // lexicographic within one tier, unknown tags last
        assert_eq!(
            tag_set.sort_tags(vec!["xyz", "v_rod", "v_naz", "f", "verb"]),
            ["verb", "f", "v_naz", "v_rod", "xyz"]
        );
    }

    #[test]
    fn missing_column_is_rejected() {
        let mapping = "name,parent,description\nnoun,POST,noun\n";

        match TagSet::from_reader(mapping.as_bytes()) {
            Err(Error::MissingColumn { column }) => assert_eq!(column, "opencorpora tags"),
            other => panic!("expected MissingColumn, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn self_parented_grammeme_is_rejected() {
        let mapping = "\
name,parent,opencorpora tags,description,lemma form,divide by
noun,noun,NOUN,noun,,
";

        match TagSet::from_reader(mapping.as_bytes()) {
            Err(Error::SelfParented { name }) => assert_eq!(name, "noun"),
            other => panic!("expected SelfParented, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn grammeme_export_links_parents() {
        let xml = tag_set().export_grammemes().unwrap();

        assert!(xml.starts_with("<grammemes>"));
        assert!(xml.contains("<grammeme parent=\"POST\">"));
        assert!(xml.contains("<name>NOUN</name>"));
        assert!(xml.contains("<alias>noun</alias>"));
        assert!(xml.contains("<description>nominative</description>"));
        // top-level group tags carry no parent attribute
        assert!(xml.contains("<grammeme>"));
    }

    #[test]
    fn bundled_mapping_loads() {
        let tag_set = TagSet::bundled().unwrap();

        assert!(!tag_set.pos_tags().is_empty());
        assert_eq!(tag_set.opencorpora_name("v_naz"), Some("nomn"));
    }
}
