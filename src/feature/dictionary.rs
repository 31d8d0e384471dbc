use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

/// One coded node of the feature data dictionary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DictionaryEntry {
    pub code: String,
    pub label: String,
    pub children: Vec<DictionaryEntry>,
}

impl DictionaryEntry {
    /// Directory token `<code>_<Label>`.
    pub fn directory(&self) -> String { format!("{}_{}", self.code, self.label) }

    fn child(&self, code: &str) -> Option<&DictionaryEntry> {
        self.children.iter().find(|c| c.code == code)
    }
}

/// Category, subcategory and feature type labels of the CDB feature data
/// dictionary, used to place geotypical models.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureDictionary {
    pub categories: Vec<DictionaryEntry>,
}

pub fn dictionary_path(root: &Path) -> PathBuf {
    root.join("Metadata").join("Feature_Data_Dictionary.xml")
}

impl FeatureDictionary {
    /// Load `<root>/Metadata/Feature_Data_Dictionary.xml`. Absent, unreadable
    /// or empty dictionaries yield `None`.
    pub fn load(root: &Path) -> Option<Self> {
        let path = dictionary_path(root);
        let text = std::fs::read_to_string(&path).ok()?;
        let dict = Self::parse(&text);
        debug!(path = %path.display(), categories = dict.categories.len(), "feature data dictionary");
        (!dict.categories.is_empty()).then_some(dict)
    }

    /// Parse the nested `code`-attributed elements and their `Label` children.
    pub fn parse(text: &str) -> Self {
        let (Ok(tag), Ok(code)) = (
            Regex::new(r"<(/?)([A-Za-z_][\w.\-]*)([^>]*?)(/?)>"),
            Regex::new(r#"\bcode\s*=\s*"([^"]*)""#),
        ) else {
            return Self::default();
        };

        // Open elements; Some(entry) for coded ones.
        let mut open: Vec<Option<DictionaryEntry>> = Vec::new();
        let mut top: Vec<DictionaryEntry> = Vec::new();

        for cap in tag.captures_iter(text) {
            let closing = !cap[1].is_empty();
            let self_closing = !cap[4].is_empty();
            let name = &cap[2];
            let Some(whole) = cap.get(0) else { continue };

            if closing {
                if let Some(Some(entry)) = open.pop() {
                    match open.iter_mut().rev().find_map(Option::as_mut) {
                        Some(parent) => parent.children.push(entry),
                        None => top.push(entry),
                    }
                }
                continue;
            }
            if name == "Label" {
                let rest = &text[whole.end()..];
                let label = rest[..rest.find('<').unwrap_or(rest.len())].trim();
                if let Some(entry) = open.iter_mut().rev().find_map(Option::as_mut) {
                    if entry.label.is_empty() {
                        entry.label = label.to_string();
                    }
                }
            }
            let entry = code.captures(&cap[3]).map(|c| DictionaryEntry {
                code: c[1].to_string(),
                ..DictionaryEntry::default()
            });
            if self_closing {
                if let Some(entry) = entry {
                    match open.iter_mut().rev().find_map(Option::as_mut) {
                        Some(parent) => parent.children.push(entry),
                        None => top.push(entry),
                    }
                }
            } else {
                open.push(entry);
            }
        }
        Self { categories: top }
    }

    /// Directory tokens for a five character FACC code, e.g. `AL015`.
    pub fn select(&self, facc: &str) -> Option<[String; 3]> {
        let (category, sub, feature) = (facc.get(0..1)?, facc.get(1..2)?, facc.get(2..5)?);
        let c = self.categories.iter().find(|c| c.code == category)?;
        let s = c.child(sub)?;
        let f = s.child(feature)?;
        Some([c.directory(), s.directory(), f.directory()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0"?>
<Feature_Data_Dictionary>
  <Category code="A">
    <Label>Culture</Label>
    <Subcategory code="L">
      <Label>Misc_Feature</Label>
      <Feature_Type code="015"><Label>Building</Label></Feature_Type>
      <Feature_Type code="020"><Label>Built-Up_Area</Label></Feature_Type>
    </Subcategory>
  </Category>
  <Category code="E">
    <Label>Vegetation</Label>
    <Subcategory code="C">
      <Label>Woodland</Label>
      <Feature_Type code="030"><Label>Trees</Label></Feature_Type>
    </Subcategory>
  </Category>
</Feature_Data_Dictionary>"#;

    #[test]
    fn parses_nested_codes() {
        let dict = FeatureDictionary::parse(XML);
        assert_eq!(dict.categories.len(), 2);
        assert_eq!(dict.categories[0].label, "Culture");
        assert_eq!(dict.categories[0].children[0].children.len(), 2);
        assert_eq!(
            dict.select("AL015"),
            Some(["A_Culture".to_string(), "L_Misc_Feature".to_string(), "015_Building".to_string()])
        );
        assert_eq!(dict.select("EC030").map(|d| d[2].clone()).as_deref(), Some("030_Trees"));
        assert_eq!(dict.select("AL999"), None);
        assert_eq!(dict.select("A"), None);
    }

    #[test]
    fn load_missing_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FeatureDictionary::load(dir.path()).is_none());

        let path = dictionary_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, XML).unwrap();
        assert!(FeatureDictionary::load(dir.path()).is_some());
    }
}
