//! XML feed parsing.
//!
//! Two grammars are supported, selected by [`Grammar`]:
//!
//! ```text
//! council:     <Council name winningParty sittingParty gainOrHold/>
//!              <Changes>   <Party name change/>* </Changes>
//!              <NewCouncil><Party name seats/>*  </NewCouncil>
//!
//! referendum:  <VotingArea name/>
//!              <Proposition><Answer winning text shortText votes percentageShare/>*</Proposition>
//! ```
//!
//! Elements are located anywhere in the document (first match in document
//! order), mirroring the `//Element` lookups the feed was designed around.
//! Child lists only consider element children. The parser keeps no state
//! between calls.

use indexmap::IndexMap;
use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::error::ParseError;
use super::model::{Answer, CouncilResult, ReferendumAnswer, ResultRecord};

/// Which grammar result files are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    /// Local council elections.
    #[default]
    Local,
    /// Referendum results per voting area.
    Referendum,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grammar::Local => f.write_str("local"),
            Grammar::Referendum => f.write_str("referendum"),
        }
    }
}

impl std::str::FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Grammar::Local),
            "referendum" => Ok(Grammar::Referendum),
            other => Err(format!("unknown feed kind '{other}' (expected local or referendum)")),
        }
    }
}

// Case-insensitive, same as the command line
impl<'de> Deserialize<'de> for Grammar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a result document with the given grammar.
pub fn parse(grammar: Grammar, bytes: &[u8]) -> Result<ResultRecord, ParseError> {
    let text = decode(bytes)?;
    let doc = load(text)?;

    match grammar {
        Grammar::Local => parse_council(&doc).map(ResultRecord::Council),
        Grammar::Referendum => parse_referendum(&doc).map(ResultRecord::Referendum),
    }
}

/// Check that `bytes` is a well-formed XML document.
pub fn check_well_formed(bytes: &[u8]) -> Result<(), ParseError> {
    let text = decode(bytes)?;
    load(text).map(|_| ())
}

fn decode(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| ParseError::NotUtf8 {
        reason: e.to_string(),
    })
}

fn load(text: &str) -> Result<Document<'_>, ParseError> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    Document::parse_with_options(text, options).map_err(|e| ParseError::Malformed {
        reason: e.to_string(),
    })
}

fn parse_council(doc: &Document<'_>) -> Result<CouncilResult, ParseError> {
    let council = find(doc, "Council")?;
    let changes = find(doc, "Changes")?;
    let new_council = find(doc, "NewCouncil")?;

    Ok(CouncilResult {
        region: attr(council, "name")?.to_string(),
        winning_party: attr(council, "winningParty")?.to_string(),
        sitting_party: attr(council, "sittingParty")?.to_string(),
        gain_or_hold: attr(council, "gainOrHold")?.to_string(),
        changes: party_map(changes, "change")?,
        new_council: party_map(new_council, "seats")?,
    })
}

fn parse_referendum(doc: &Document<'_>) -> Result<ReferendumAnswer, ParseError> {
    let voting_area = attr(find(doc, "VotingArea")?, "name")?.to_string();
    let proposition = find(doc, "Proposition")?;

    let answers = proposition
        .children()
        .filter(Node::is_element)
        .map(|node| -> Result<Answer, ParseError> {
            Ok(Answer {
                winning: parse_flag(node, "winning")?,
                text: attr(node, "text")?.to_string(),
                short_text: attr(node, "shortText")?.to_string(),
                votes: attr(node, "votes")?.to_string(),
                percentage: attr(node, "percentageShare")?.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReferendumAnswer {
        voting_area,
        answers,
    })
}

fn find<'a, 'input>(
    doc: &'a Document<'input>,
    element: &'static str,
) -> Result<Node<'a, 'input>, ParseError> {
    doc.descendants()
        .find(|node| node.has_tag_name(element))
        .ok_or(ParseError::MissingElement { element })
}

fn attr<'a>(node: Node<'a, '_>, attribute: &'static str) -> Result<&'a str, ParseError> {
    node.attribute(attribute)
        .ok_or_else(|| ParseError::MissingAttribute {
            element: node.tag_name().name().to_string(),
            attribute,
        })
}

/// Collect `name -> value_attr` from a party list, keeping document order.
fn party_map(
    parent: Node<'_, '_>,
    value_attr: &'static str,
) -> Result<IndexMap<String, String>, ParseError> {
    parent
        .children()
        .filter(Node::is_element)
        .map(|party| -> Result<(String, String), ParseError> {
            Ok((
                attr(party, "name")?.to_string(),
                attr(party, value_attr)?.to_string(),
            ))
        })
        .collect()
}

fn parse_flag(node: Node<'_, '_>, attribute: &'static str) -> Result<bool, ParseError> {
    let raw = attr(node, attribute)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ParseError::InvalidAttribute {
            element: node.tag_name().name().to_string(),
            attribute,
            value: raw.to_string(),
        }),
    }
}
