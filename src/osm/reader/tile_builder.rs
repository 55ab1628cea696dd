// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use log::{debug, warn};

use super::model::{self, Feature, FeatureType};
use crate::{Member, Relation, Role, Tile, Way};

/// TileBuilder collects streamed [Features](Feature) into a [Tile],
/// resolving turn restriction members into node ids.
///
/// Relation members may reference ways which appear later in the feed,
/// so relations are only resolved in [TileBuilder::finish].
#[derive(Debug, Default)]
pub(super) struct TileBuilder {
    tile: Tile,
    way_indices: HashMap<i64, usize>,
    relations: Vec<model::Relation>,
}

impl TileBuilder {
    pub(super) fn add_features<I, E>(&mut self, features: I) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<Feature, E>>,
    {
        for f in features {
            match f? {
                Feature::Node(n) => {
                    self.tile.nodes.insert(n.id, n);
                }

                Feature::Way(w) => self.add_way(w),

                Feature::Relation(r) => {
                    if is_turn_restriction(&r) {
                        self.relations.push(r);
                    }
                }
            }
        }
        Ok(())
    }

    fn add_way(&mut self, w: Way) {
        if w.nodes.len() < 2 {
            debug!("skipping way {} with fewer than 2 nodes", w.id);
            return;
        }

        // Later versions of the same way replace the earlier ones
        match self.way_indices.get(&w.id) {
            Some(&idx) => self.tile.ways[idx] = w,
            None => {
                self.way_indices.insert(w.id, self.tile.ways.len());
                self.tile.ways.push(w);
            }
        }
    }

    pub(super) fn finish(mut self) -> Tile {
        let relations: Vec<Relation> = std::mem::take(&mut self.relations)
            .into_iter()
            .filter_map(|r| self.resolve_relation(r))
            .collect();
        self.tile.relations = relations;
        self.tile
    }

    fn resolve_relation(&self, r: model::Relation) -> Option<Relation> {
        let mut members = Vec::with_capacity(r.members.len());

        for m in &r.members {
            let Some(role) = Role::from_tag(&m.role) else {
                debug!("relation {}: ignoring member with role {:?}", r.id, m.role);
                continue;
            };

            let nodes = match m.type_ {
                FeatureType::Node => vec![m.ref_],
                FeatureType::Way => match self.way_indices.get(&m.ref_) {
                    Some(&idx) => self.tile.ways[idx].nodes.clone(),
                    None => {
                        warn!(
                            "relation {} references unknown way {} - skipping",
                            r.id, m.ref_
                        );
                        return None;
                    }
                },
                FeatureType::Relation => {
                    warn!(
                        "relation {} has a relation {} member - skipping",
                        r.id, m.ref_
                    );
                    return None;
                }
            };

            members.push(Member { role, nodes });
        }

        Some(Relation {
            id: r.id,
            members,
            tags: r.tags,
        })
    }
}

/// Checks if the relation has `type=restriction` or a mode-specific `type=restriction:MODE`.
fn is_turn_restriction(r: &model::Relation) -> bool {
    r.tags
        .get("type")
        .is_some_and(|t| t == "restriction" || t.starts_with("restriction:"))
}
