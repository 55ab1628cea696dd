// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Node, Tags, Way};

/// Type of an [OSM feature/element](https://wiki.openstreetmap.org/wiki/Elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    Node,
    Way,
    Relation,
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Way => write!(f, "way"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

/// Member of an [OSM relation](https://wiki.openstreetmap.org/wiki/Relation),
/// as present in the feed - referencing other features by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    pub type_: FeatureType,
    pub ref_: i64,
    pub role: String,
}

/// [OSM relation](https://wiki.openstreetmap.org/wiki/Relation) with unresolved members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<RelationMember>,
    pub tags: Tags,
}

/// Union over all [OSM features/elements](https://wiki.openstreetmap.org/wiki/Elements)
/// produced by a feed reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Node(Node),
    Way(Way),
    Relation(Relation),
}
