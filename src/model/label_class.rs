//! Label classes, class groups and colour schemes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An RGB colour triple.
pub type Rgb = [u8; 3];

/// Scheme name used for a class with a single colour.
pub const DEFAULT_SCHEME: &str = "default";

/// Display colours of a label class.
///
/// Serialized as a map from scheme name to colour; a single colour is stored
/// under [`DEFAULT_SCHEME`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Rgb>", into = "BTreeMap<String, Rgb>")]
pub enum Colours {
    Single(Rgb),
    Schemes(BTreeMap<String, Rgb>),
}

impl Colours {
    /// Colour for `scheme`, falling back to the default scheme.
    pub fn get(&self, scheme: &str) -> Option<Rgb> {
        match self {
            Colours::Single(rgb) => Some(*rgb),
            Colours::Schemes(map) => map
                .get(scheme)
                .or_else(|| map.get(DEFAULT_SCHEME))
                .copied(),
        }
    }
}

impl From<BTreeMap<String, Rgb>> for Colours {
    fn from(map: BTreeMap<String, Rgb>) -> Self {
        match map.get(DEFAULT_SCHEME) {
            Some(rgb) if map.len() == 1 => Colours::Single(*rgb),
            _ => Colours::Schemes(map),
        }
    }
}

impl From<Colours> for BTreeMap<String, Rgb> {
    fn from(colours: Colours) -> Self {
        match colours {
            Colours::Single(rgb) => BTreeMap::from([(DEFAULT_SCHEME.to_string(), rgb)]),
            Colours::Schemes(map) => map,
        }
    }
}

/// A named class that labels can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelClass {
    pub name: String,
    pub human_name: String,
    #[serde(default)]
    pub colours: Option<Colours>,
}

impl LabelClass {
    /// Create a class without colours.
    pub fn new(name: impl Into<String>, human_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            human_name: human_name.into(),
            colours: None,
        }
    }

    /// Builder: one colour for every scheme.
    pub fn with_colour(mut self, rgb: Rgb) -> Self {
        self.colours = Some(Colours::Single(rgb));
        self
    }

    /// Builder: one colour per named scheme.
    pub fn with_scheme_colours<K: Into<String>>(mut self, colours: impl IntoIterator<Item = (K, Rgb)>) -> Self {
        let map: BTreeMap<String, Rgb> = colours.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.colours = Some(Colours::Schemes(map));
        self
    }
}

/// A titled group of label classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelClassGroup {
    pub group_name: String,
    #[serde(default)]
    pub group_classes: Vec<LabelClass>,
}

impl LabelClassGroup {
    pub fn new(group_name: impl Into<String>, group_classes: Vec<LabelClass>) -> Self {
        Self {
            group_name: group_name.into(),
            group_classes,
        }
    }

    pub fn add_class(&mut self, class: LabelClass) {
        self.group_classes.push(class);
    }
}

/// A named colour scheme classes may provide colours for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourScheme {
    pub name: String,
    pub human_name: String,
}

impl ColourScheme {
    pub fn new(name: impl Into<String>, human_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            human_name: human_name.into(),
        }
    }
}

/// Colour schemes and grouped label classes for one labelling task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabellingSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub colour_schemes: Vec<ColourScheme>,
    #[serde(default)]
    pub label_class_groups: Vec<LabelClassGroup>,
}

impl LabellingSchema {
    /// All classes across groups, in group order.
    pub fn classes(&self) -> impl Iterator<Item = &LabelClass> {
        self.label_class_groups
            .iter()
            .flat_map(|g| g.group_classes.iter())
    }

    pub fn find_class(&self, name: &str) -> Option<&LabelClass> {
        self.classes().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_without_colours() {
        let metal = LabelClass::new("metal", "Metal");
        assert_eq!(metal.name, "metal");
        assert!(metal.colours.is_none());
        assert_eq!(
            serde_json::to_value(&metal).unwrap(),
            json!({"name": "metal", "human_name": "Metal", "colours": null})
        );
    }

    #[test]
    fn test_single_colour_json() {
        let metal = LabelClass::new("metal", "Metal").with_colour([1, 2, 3]);
        let js = serde_json::to_value(&metal).unwrap();
        assert_eq!(js["colours"], json!({"default": [1, 2, 3]}));
        let back: LabelClass = serde_json::from_value(js).unwrap();
        assert_eq!(back.colours, Some(Colours::Single([1, 2, 3])));
    }

    #[test]
    fn test_scheme_colours() {
        let metal = LabelClass::new("metal", "Metal")
            .with_scheme_colours([("basic", [1, 2, 3]), ("more", [2, 3, 4])]);
        let js = serde_json::to_value(&metal).unwrap();
        assert_eq!(js["colours"], json!({"basic": [1, 2, 3], "more": [2, 3, 4]}));
        let colours = metal.colours.unwrap();
        assert_eq!(colours.get("more"), Some([2, 3, 4]));
        assert_eq!(colours.get("missing"), None);
        assert_eq!(Colours::Single([9, 9, 9]).get("anything"), Some([9, 9, 9]));
    }

    #[test]
    fn test_bad_colour_rejected() {
        let js = json!({"name": "m", "human_name": "M", "colours": {"default": [1, 2]}});
        assert!(serde_json::from_value::<LabelClass>(js).is_err());
    }

    #[test]
    fn test_group_json() {
        let group = LabelClassGroup::new(
            "Materials",
            vec![LabelClass::new("metal", "Metal"), LabelClass::new("wood", "Wood")],
        );
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({
                "group_name": "Materials",
                "group_classes": [
                    {"name": "metal", "human_name": "Metal", "colours": null},
                    {"name": "wood", "human_name": "Wood", "colours": null}
                ]
            })
        );
    }

    #[test]
    fn test_schema_lookup() {
        let mut natural = LabelClassGroup::new("Natural", vec![LabelClass::new("tree", "Tree")]);
        natural.add_class(LabelClass::new("lake", "Lake"));
        let schema = LabellingSchema {
            name: "survey".into(),
            colour_schemes: vec![ColourScheme::new("default", "Default")],
            label_class_groups: vec![
                natural,
                LabelClassGroup::new("Built", vec![LabelClass::new("road", "Road")]),
            ],
            ..Default::default()
        };
        let names: Vec<_> = schema.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["tree", "lake", "road"]);
        assert_eq!(schema.find_class("road").unwrap().human_name, "Road");
        assert!(schema.find_class("car").is_none());
    }
}
