//! Canonical result records produced by the feed parser.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Local-election result for one council.
///
/// Serialized without the region; the region is the key it is published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilResult {
    #[serde(skip_serializing)]
    pub region: String,
    pub winning_party: String,
    pub sitting_party: String,
    pub gain_or_hold: String,
    /// Party name -> seat change as written in the feed ("+5", "-2").
    pub changes: IndexMap<String, String>,
    /// Party name -> seat count as written in the feed.
    pub new_council: IndexMap<String, String>,
}

/// One option on the referendum ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub winning: bool,
    pub text: String,
    pub short_text: String,
    pub votes: String,
    pub percentage: String,
}

/// Referendum result for one voting area, in ballot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferendumAnswer {
    pub voting_area: String,
    pub answers: Vec<Answer>,
}

impl Serialize for ReferendumAnswer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.answers.serialize(serializer)
    }
}

/// A parsed result file, tagged by the grammar that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultRecord {
    Council(CouncilResult),
    Referendum(ReferendumAnswer),
}

impl ResultRecord {
    /// Snapshot key: council name or voting area name.
    pub fn key(&self) -> &str {
        match self {
            ResultRecord::Council(council) => &council.region,
            ResultRecord::Referendum(referendum) => &referendum.voting_area,
        }
    }
}

/// Latest accepted raw file for a replace-whole category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeed {
    pub version: u64,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Anything the aggregator can merge into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedRecord {
    Result(ResultRecord),
    Raw(RawFeed),
}
