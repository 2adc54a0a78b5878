// Connection-group trees and name lookup.
//
// `GET .../connectionGroups/{id}/tree` returns a group with nested
// `childConnections` and `childConnectionGroups`. The hierarchy is strict,
// so plain recursion over owned children is enough.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// One node of a connection-group tree.
///
/// Groups carry children; connections never do. Fields the client does
/// not model are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_identifier: Option<String>,
    /// Group type (`ORGANIZATIONAL` / `BALANCING`); absent on connections.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    /// Protocol name; absent on groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_connections: Vec<TreeNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_connection_groups: Vec<TreeNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How a name is compared during a tree search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    /// Unanchored regular-expression search.
    Regex,
}

/// A compiled name predicate.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    Exact(String),
    Pattern(Regex),
}

impl NameMatcher {
    pub fn new(name: &str, mode: MatchMode) -> Result<Self, Error> {
        Ok(match mode {
            MatchMode::Exact => Self::Exact(name.to_owned()),
            MatchMode::Regex => Self::Pattern(Regex::new(name)?),
        })
    }

    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(name) => name == candidate,
            Self::Pattern(re) => re.is_match(candidate),
        }
    }
}

impl TreeNode {
    /// Depth-first search for a connection.
    ///
    /// A node's direct connections are tested before descending into its
    /// child groups; the first match in iteration order wins.
    pub fn find_connection(&self, matcher: &NameMatcher) -> Option<&TreeNode> {
        self.child_connections
            .iter()
            .find(|c| matcher.matches(&c.name))
            .or_else(|| {
                self.child_connection_groups
                    .iter()
                    .find_map(|g| g.find_connection(matcher))
            })
    }

    /// Depth-first search for a connection group.
    ///
    /// Direct child groups are tested first, then each child subtree, then
    /// the node itself, so searching for the root's own name yields the
    /// root when nothing below it shares the name.
    pub fn find_connection_group(&self, matcher: &NameMatcher) -> Option<&TreeNode> {
        self.child_connection_groups
            .iter()
            .find(|g| matcher.matches(&g.name))
            .or_else(|| {
                self.child_connection_groups
                    .iter()
                    .find_map(|g| g.find_connection_group(matcher))
            })
            .or_else(|| matcher.matches(&self.name).then_some(self))
    }

    /// Whether this node is a leaf (a connection, or an empty group).
    pub fn is_leaf(&self) -> bool {
        self.child_connections.is_empty() && self.child_connection_groups.is_empty()
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .child_connections
            .iter()
            .chain(&self.child_connection_groups)
            .map(TreeNode::node_count)
            .sum::<usize>()
    }
}
