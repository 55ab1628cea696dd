// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::str::{from_utf8, FromStr};

use log::warn;
use quick_xml::events::{BytesStart, Event};

use super::model::{Feature, FeatureType, Relation, RelationMember};
use crate::{Node, Tags, Way};

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event(&mut self) -> quick_xml::Result<Event<'_>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event(&mut self) -> quick_xml::Result<Event<'_>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl Parser for BufParser<'_> {
    #[inline]
    fn read_event(&mut self) -> quick_xml::Result<Event<'_>> {
        self.0.read_event()
    }
}

/// Reader streams OSM [Features](Feature) from an
/// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML) document.
///
/// Malformed elements are logged and skipped, only errors of the
/// underlying XML document are returned.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<'a> Reader<BufParser<'a>> {
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self {
            parser: BufParser(quick_xml::Reader::from_reader(data)),
            eof: false,
        }
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    pub(super) fn from_io(reader: R) -> Self {
        Self {
            parser: IoParser(quick_xml::Reader::from_reader(reader), Vec::default()),
            eof: false,
        }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<Feature> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e));
                }
            };

            match event {
                Event::Empty(start) => match start.local_name().as_ref() {
                    // "way" and "relation" without children carry nothing routable
                    b"node" => {
                        if let Some(n) = parse_node(&start) {
                            return Some(Ok(Feature::Node(n)));
                        }
                    }
                    b"tag" => {
                        if let (Some(tags), Some((k, v))) = (feature_tags(&mut f), parse_tag(&start)) {
                            tags.insert(k, v);
                        }
                    }
                    b"nd" => {
                        if let (Some(Feature::Way(w)), Some(r)) = (&mut f, parse_ref(&start)) {
                            w.nodes.push(r);
                        }
                    }
                    b"member" => {
                        if let (Some(Feature::Relation(r)), Some(m)) = (&mut f, parse_member(&start)) {
                            r.members.push(m);
                        }
                    }
                    _ => {}
                },

                Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => f = parse_node(&start).map(Feature::Node),
                    b"way" => {
                        f = parse_id(&start, "way").map(|id| {
                            Feature::Way(Way {
                                id,
                                nodes: Vec::default(),
                                tags: Tags::default(),
                            })
                        })
                    }
                    b"relation" => {
                        f = parse_id(&start, "relation").map(|id| {
                            Feature::Relation(Relation {
                                id,
                                members: Vec::default(),
                                tags: Tags::default(),
                            })
                        })
                    }
                    _ => {}
                },

                Event::End(end) => {
                    if matches!(end.local_name().as_ref(), b"node" | b"way" | b"relation") {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                    }
                }

                Event::Eof => self.eof = true,

                _ => {}
            }
        }

        f.map(Ok)
    }
}

/// Parses a numeric attribute value, returning None if it is not valid UTF-8 or not a number.
fn parse_number<T: FromStr>(value: &[u8]) -> Option<T> {
    from_utf8(value).ok()?.parse().ok()
}

fn parse_node(start: &BytesStart<'_>) -> Option<Node> {
    let mut id: i64 = 0;
    let mut lat = f32::NAN;
    let mut lon = f32::NAN;

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => id = parse_number(&attr.value).unwrap_or(0),
            b"lat" => lat = parse_number(&attr.value).unwrap_or(f32::NAN),
            b"lon" => lon = parse_number(&attr.value).unwrap_or(f32::NAN),
            _ => {}
        }
    }

    if id != 0 && lat.is_finite() && lon.is_finite() {
        Some(Node { id, lat, lon })
    } else {
        warn!("skipping node with invalid id or position (id={id}, lat={lat}, lon={lon})");
        None
    }
}

fn parse_id(start: &BytesStart<'_>, element: &str) -> Option<i64> {
    let id = start
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"id")
        .and_then(|attr| parse_number(&attr.value))
        .unwrap_or(0);

    if id != 0 {
        Some(id)
    } else {
        warn!("skipping {element} without a valid id");
        None
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"k" => k = attr.unescape_value().ok().map(|s| s.into_owned()),
            b"v" => v = attr.unescape_value().ok().map(|s| s.into_owned()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}

fn parse_ref(start: &BytesStart<'_>) -> Option<i64> {
    start
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"ref")
        .and_then(|attr| parse_number(&attr.value))
        .filter(|&r: &i64| r != 0)
}

fn parse_member(start: &BytesStart<'_>) -> Option<RelationMember> {
    let mut ref_: i64 = 0;
    let mut type_ = None;
    let mut role = None;

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"ref" => ref_ = parse_number(&attr.value).unwrap_or(0),
            b"type" => type_ = parse_feature_type(&attr.value),
            b"role" => role = attr.unescape_value().ok().map(|s| s.into_owned()),
            _ => {}
        }
    }

    match (ref_, type_, role) {
        (0, _, _) => None,
        (ref_, Some(type_), Some(role)) => Some(RelationMember { type_, ref_, role }),
        _ => None,
    }
}

fn parse_feature_type(s: &[u8]) -> Option<FeatureType> {
    match s {
        b"node" => Some(FeatureType::Node),
        b"way" => Some(FeatureType::Way),
        b"relation" => Some(FeatureType::Relation),
        _ => None,
    }
}

fn feature_tags(f: &mut Option<Feature>) -> Option<&mut Tags> {
    match f {
        Some(Feature::Way(w)) => Some(&mut w.tags),
        Some(Feature::Relation(r)) => Some(&mut r.tags),
        _ => None,
    }
}
