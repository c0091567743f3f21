//! Parameter metadata mined from handler documentation.
//!
//! Handlers describe their inputs with Swagger-style annotation stanzas:
//!
//! ```text
//! /**
//!  * List users.
//!  *
//!  * @SWG\Parameter(
//!  *     name="page",
//!  *     in="query",
//!  *     type="integer",
//!  *     required=false,
//!  * )
//!  */
//! ```
//!
//! [`extract_parameters`] turns each stanza into a [`ParameterDescriptor`].
//! Parsing is best effort: malformed stanzas are skipped, never reported.

use serde::ser::{Serialize, SerializeMap, Serializer};

const OPENERS: [&str; 2] = ["@SWG\\Parameter(", "@OA\\Parameter("];

/// One documented parameter: `name` plus the other attributes, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    name: String,
    attributes: Vec<(String, String)>,
}

impl ParameterDescriptor {
    /// Build from ordered attributes; `None` when there is no `name`.
    pub fn from_attributes(attributes: Vec<(String, String)>) -> Option<Self> {
        let name = attributes
            .iter()
            .find(|(key, _)| key == "name")
            .map(|(_, value)| value.clone())?;
        Some(Self { name, attributes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes including `name`, in source order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }
}

impl Serialize for ParameterDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for (key, value) in &self.attributes {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Parse every parameter stanza in `doc`. No documentation, no parameters.
pub fn extract_parameters(doc: Option<&str>) -> Vec<ParameterDescriptor> {
    let Some(doc) = doc else {
        return Vec::new();
    };

    stanzas(doc)
        .into_iter()
        .filter_map(|body| parse_stanza(&body))
        .collect()
}

/// First pass: collect the body lines of each closed stanza.
fn stanzas(doc: &str) -> Vec<Vec<&str>> {
    let mut closed = Vec::new();
    let mut open: Option<Vec<&str>> = None;

    for raw in doc.lines() {
        let line = strip_leader(raw);
        match open.as_mut() {
            None => {
                if OPENERS.iter().any(|opener| line.ends_with(opener)) {
                    open = Some(Vec::new());
                }
            }
            Some(body) => {
                if line.starts_with(')') {
                    closed.extend(open.take());
                } else {
                    body.push(line);
                }
            }
        }
    }

    // an unterminated stanza is dropped with `open`
    closed
}

fn strip_leader(raw: &str) -> &str {
    let line = raw.trim();
    let line = line.strip_suffix("*/").unwrap_or(line).trim_end();
    for leader in ["/**", "///", "//!", "*/", "*"] {
        if let Some(rest) = line.strip_prefix(leader) {
            return rest.trim();
        }
    }
    line
}

enum Pair<'a> {
    Attribute(&'a str, &'a str),
    MissingValue,
    NotAPair,
}

fn parse_pair(line: &str) -> Pair<'_> {
    let Some((key, value)) = line.split_once('=') else {
        return Pair::NotAPair;
    };
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Pair::NotAPair;
    }

    let value = value.trim();
    let value = value.strip_suffix(',').unwrap_or(value).trim_end();
    let value = value
        .strip_prefix(['"', '\''])
        .unwrap_or(value);
    let value = value
        .strip_suffix(['"', '\''])
        .unwrap_or(value)
        .trim_matches(',');

    if value.is_empty() {
        Pair::MissingValue
    } else {
        Pair::Attribute(key, value)
    }
}

/// Second pass: key/value pairs of one stanza.
fn parse_stanza(body: &[&str]) -> Option<ParameterDescriptor> {
    let mut attributes: Vec<(String, String)> = Vec::new();

    for line in body {
        match parse_pair(line) {
            Pair::Attribute(key, value) => {
                match attributes.iter_mut().find(|(k, _)| k == key) {
                    Some(existing) => existing.1 = value.to_string(),
                    None => attributes.push((key.to_string(), value.to_string())),
                }
            }
            Pair::MissingValue => return None,
            Pair::NotAPair => {}
        }
    }

    ParameterDescriptor::from_attributes(attributes)
}
