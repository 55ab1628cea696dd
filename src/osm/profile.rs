// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::str::FromStr;

use crate::Tags;

/// Access tag values which deny passage.
const NO_ACCESS: &[&str] = &["no", "private"];

/// Describes how to convert OSM data into a [WeightedGraph](crate::WeightedGraph)
/// and a [RestrictionSet](crate::RestrictionSet) for one mode of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile<'a> {
    /// Human readable name of the routing profile.
    pub name: &'a str,

    /// Mode of travel, used to pick mode-specific `oneway:MODE` and `restriction:MODE` tags.
    ///
    /// [TravelMode::Walk] additionally turns on the pedestrian logic:
    /// - one-way tags are ignored altogether;
    /// - only explicit `restriction:foot` turn restrictions are considered.
    pub mode: TravelMode,

    /// Preference of way types. Higher weights are preferred: an edge costs its
    /// length divided by the weight. Way types missing from this table are not
    /// usable by the profile.
    ///
    /// All weights must be finite and greater than zero.
    pub weights: &'a [Weight],

    /// OSM [access tags](https://wiki.openstreetmap.org/wiki/Key:access#Land-based_transportation),
    /// in order from least to most specific. A more specific key overrides a more general one.
    ///
    /// The keys are also matched against the `except` tag of turn restrictions
    /// (see [Profile::is_exempted]).
    pub access: &'a [AccessKey],
}

/// Preference for ways of a specific [WayType].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub way_type: WayType,

    /// Divisor of the length of a way - the higher, the more preferred the way is.
    pub weight: f32,
}

/// Modes of travel with a built-in [Profile].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelMode {
    Car,
    Bus,
    Bicycle,
    Horse,
    Tram,
    Train,
    Walk,
}

impl TravelMode {
    pub const ALL: [TravelMode; 7] = [
        Self::Car,
        Self::Bus,
        Self::Bicycle,
        Self::Horse,
        Self::Tram,
        Self::Train,
        Self::Walk,
    ];

    /// Value used in mode-specific tags, e.g. `oneway:bicycle`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Bus => "bus",
            Self::Bicycle => "bicycle",
            Self::Horse => "horse",
            Self::Tram => "tram",
            Self::Train => "train",
            Self::Walk => "foot",
        }
    }

    /// Returns the built-in [Profile] for this mode of travel.
    pub fn profile(self) -> &'static Profile<'static> {
        match self {
            Self::Car => &CAR_PROFILE,
            Self::Bus => &BUS_PROFILE,
            Self::Bicycle => &BICYCLE_PROFILE,
            Self::Horse => &HORSE_PROFILE,
            Self::Tram => &TRAM_PROFILE,
            Self::Train => &TRAIN_PROFILE,
            Self::Walk => &FOOT_PROFILE,
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown travel mode: {0:?}")]
pub struct UnknownTravelMode(pub String);

impl FromStr for TravelMode {
    type Err = UnknownTravelMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "car" | "motorcar" => Ok(Self::Car),
            "bus" => Ok(Self::Bus),
            "bicycle" | "bike" => Ok(Self::Bicycle),
            "horse" => Ok(Self::Horse),
            "tram" => Ok(Self::Tram),
            "train" => Ok(Self::Train),
            "foot" | "walk" => Ok(Self::Walk),
            _ => Err(UnknownTravelMode(s.to_string())),
        }
    }
}

/// Closed set of `highway=*` and `railway=*` values understood by the profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WayType {
    Bridleway,
    Cycleway,
    Footway,
    LightRail,
    Motorway,
    NarrowGauge,
    Path,
    Primary,
    Rail,
    Residential,
    Secondary,
    Service,
    Steps,
    Subway,
    Tertiary,
    Track,
    Tram,
    Trunk,
    Unclassified,
}

impl WayType {
    /// Parses a `highway` or `railway` tag value, folding link roads and
    /// other synonyms into their parent class.
    pub fn from_tag(value: &str) -> Option<Self> {
        match value {
            "bridleway" => Some(Self::Bridleway),
            "cycleway" => Some(Self::Cycleway),
            "footway" | "pedestrian" | "platform" => Some(Self::Footway),
            "light_rail" => Some(Self::LightRail),
            "motorway" | "motorway_link" => Some(Self::Motorway),
            "narrow_gauge" => Some(Self::NarrowGauge),
            "path" => Some(Self::Path),
            "primary" | "primary_link" => Some(Self::Primary),
            "rail" => Some(Self::Rail),
            "residential" => Some(Self::Residential),
            "secondary" | "secondary_link" => Some(Self::Secondary),
            "service" => Some(Self::Service),
            "steps" => Some(Self::Steps),
            "subway" => Some(Self::Subway),
            "tertiary" | "tertiary_link" => Some(Self::Tertiary),
            "track" => Some(Self::Track),
            "tram" => Some(Self::Tram),
            "trunk" | "trunk_link" => Some(Self::Trunk),
            "unclassified" | "minor" => Some(Self::Unclassified),
            _ => None,
        }
    }
}

/// Closed set of [access keys](https://wiki.openstreetmap.org/wiki/Key:access).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKey {
    Access,
    Vehicle,
    MotorVehicle,
    MotorCar,
    Motorcycle,
    ServiceVehicle,
    Bus,
    Bicycle,
    Horse,
    Foot,
    Tram,
    Train,
}

impl AccessKey {
    /// OSM tag key corresponding to this access key.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Vehicle => "vehicle",
            Self::MotorVehicle => "motor_vehicle",
            Self::MotorCar => "motorcar",
            Self::Motorcycle => "motorcycle",
            Self::ServiceVehicle => "psv",
            Self::Bus => "bus",
            Self::Bicycle => "bicycle",
            Self::Horse => "horse",
            Self::Foot => "foot",
            Self::Tram => "tram",
            Self::Train => "train",
        }
    }
}

/// Directions in which a way may be traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Both,
    /// Only from the first node towards the last node.
    Forward,
    /// Only from the last node towards the first node.
    Backward,
}

impl Direction {
    #[inline]
    pub fn allows_forward(self) -> bool {
        self != Self::Backward
    }

    #[inline]
    pub fn allows_backward(self) -> bool {
        self != Self::Forward
    }
}

/// Turn restriction kind indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRestriction {
    /// Not a turn restriction, or a turn restriction which does not apply for the current [Profile].
    Inapplicable,

    /// The sequence of nodes indicated by this restriction is prohibited (`no_*`).
    Prohibitory,

    /// After entering the restriction, its remaining nodes must be followed (`only_*`).
    Mandatory,
}

impl<'a> Profile<'a> {
    /// Resolves the weight of a way with given tags: the weight of its `highway` type,
    /// falling back to its `railway` type. Returns zero if the way is not usable,
    /// either because neither type has a positive weight, or because access is denied
    /// (as determined by [Profile::is_allowed]).
    pub fn way_weight(&self, tags: &Tags) -> f32 {
        let mut weight = self.type_weight(tags.get("highway"));
        if weight <= 0.0 {
            weight = self.type_weight(tags.get("railway"));
        }

        if !weight.is_finite() || weight <= 0.0 || !self.is_allowed(tags) {
            return 0.0;
        }
        weight
    }

    fn type_weight(&self, value: Option<&String>) -> f32 {
        value
            .and_then(|v| WayType::from_tag(v))
            .and_then(|t| self.weights.iter().find(|w| w.way_type == t))
            .map_or(0.0, |w| w.weight)
    }

    /// Checks the access tags, from the least to the most specific [AccessKey].
    /// The most specific present key decides: `no` and `private` deny passage.
    pub fn is_allowed(&self, tags: &Tags) -> bool {
        let mut allowed = true;
        for key in self.access {
            if let Some(value) = tags.get(key.tag()) {
                allowed = !NO_ACCESS.contains(&value.as_str());
            }
        }
        allowed
    }

    /// Determines the [Direction] in which a way with given tags can be traversed.
    ///
    /// Roundabouts, circular junctions and motorways default to one-way if
    /// no explicit `oneway` tag is present. A mode-specific `oneway:MODE=no`
    /// lifts any one-way restriction. Pedestrians are never bound by one-way tags.
    pub fn way_direction(&self, tags: &Tags) -> Direction {
        if self.is_pedestrian() {
            return Direction::Both;
        }

        let mut oneway = tags.get("oneway").map_or("", |v| v.as_str());

        if oneway.is_empty() {
            let roundabout = matches!(
                tags.get("junction").map(|v| v.as_str()),
                Some("roundabout") | Some("circular")
            );
            let motorway = tags.get("highway").and_then(|v| WayType::from_tag(v))
                == Some(WayType::Motorway);

            if roundabout || motorway {
                oneway = "yes";
            }
        }

        if matches!(oneway, "yes" | "true" | "1" | "-1" | "reverse")
            && tags
                .get(&format!("oneway:{}", self.mode.as_str()))
                .map(|v| v.as_str())
                == Some("no")
        {
            return Direction::Both;
        }

        match oneway {
            "yes" | "true" | "1" => Direction::Forward,
            "-1" | "reverse" => Direction::Backward,
            _ => Direction::Both,
        }
    }

    /// Figures out what kind of [TurnRestriction] a relation with given tags represents.
    pub fn restriction_kind(&self, tags: &Tags) -> TurnRestriction {
        if self.is_exempted(tags) {
            return TurnRestriction::Inapplicable;
        }

        let specific_key = format!("restriction:{}", self.mode.as_str());

        // Pedestrians are only bound by explicit restrictions
        if self.is_pedestrian()
            && tags.get("type") != Some(&specific_key)
            && !tags.contains_key(&specific_key)
        {
            return TurnRestriction::Inapplicable;
        }

        let value = tags
            .get(&specific_key)
            .or_else(|| tags.get("restriction"))
            .map_or("", |v| v.as_str());

        match value.split_once('_') {
            Some(("no", rest)) if !rest.is_empty() => TurnRestriction::Prohibitory,
            Some(("only", rest)) if !rest.is_empty() => TurnRestriction::Mandatory,
            _ => TurnRestriction::Inapplicable,
        }
    }

    /// Returns true if any mode listed in the `except` tag is one of [Profile::access].
    /// If the tag is missing, returns false.
    pub fn is_exempted(&self, tags: &Tags) -> bool {
        tags.get("except").is_some_and(|v| {
            v.split(';')
                .map(str::trim)
                .any(|exempted| self.access.iter().any(|k| k.tag() == exempted))
        })
    }

    #[inline]
    fn is_pedestrian(&self) -> bool {
        self.mode == TravelMode::Walk
    }
}

macro_rules! weights {
    [$( $t:ident : $w:expr ),+ $(,)?] => {
        &[ $( Weight { way_type: WayType::$t, weight: $w } ),+ ]
    };
}

/// Routing [Profile] for cars, with strong preference for faster roads.
pub const CAR_PROFILE: Profile = Profile {
    name: "car",
    mode: TravelMode::Car,
    weights: weights![
        Motorway: 10.0,
        Trunk: 10.0,
        Primary: 2.0,
        Secondary: 1.5,
        Tertiary: 1.0,
        Unclassified: 1.0,
        Residential: 0.7,
        Track: 0.5,
        Service: 0.5,
    ],
    access: &[
        AccessKey::Access,
        AccessKey::Vehicle,
        AccessKey::MotorVehicle,
        AccessKey::MotorCar,
    ],
};

/// Routing [Profile] for buses, preferring through roads but tolerating service roads.
pub const BUS_PROFILE: Profile = Profile {
    name: "bus",
    mode: TravelMode::Bus,
    weights: weights![
        Motorway: 10.0,
        Trunk: 10.0,
        Primary: 2.0,
        Secondary: 1.5,
        Tertiary: 1.0,
        Unclassified: 1.0,
        Residential: 0.8,
        Track: 0.3,
        Service: 0.9,
    ],
    access: &[
        AccessKey::Access,
        AccessKey::Vehicle,
        AccessKey::MotorVehicle,
        AccessKey::ServiceVehicle,
        AccessKey::Bus,
    ],
};

/// Routing [Profile] for bicycles, with preference for cycleways and quieter roads.
pub const BICYCLE_PROFILE: Profile = Profile {
    name: "bicycle",
    mode: TravelMode::Bicycle,
    weights: weights![
        Trunk: 0.05,
        Primary: 0.3,
        Secondary: 0.9,
        Tertiary: 1.0,
        Unclassified: 1.0,
        Cycleway: 2.0,
        Residential: 2.5,
        Track: 1.0,
        Service: 1.0,
        Bridleway: 0.8,
        Footway: 0.8,
        Steps: 0.5,
        Path: 1.0,
    ],
    access: &[AccessKey::Access, AccessKey::Vehicle, AccessKey::Bicycle],
};

/// Routing [Profile] for horse riders.
pub const HORSE_PROFILE: Profile = Profile {
    name: "horse",
    mode: TravelMode::Horse,
    weights: weights![
        Primary: 0.05,
        Secondary: 0.15,
        Tertiary: 0.3,
        Unclassified: 1.0,
        Residential: 1.0,
        Track: 1.0,
        Service: 1.0,
        Bridleway: 1.0,
        Footway: 1.2,
        Steps: 1.15,
        Path: 1.2,
    ],
    access: &[AccessKey::Access, AccessKey::Horse],
};

/// Routing [Profile] for trams and light rail.
pub const TRAM_PROFILE: Profile = Profile {
    name: "tram",
    mode: TravelMode::Tram,
    weights: weights![Tram: 1.0, LightRail: 1.0],
    access: &[AccessKey::Access, AccessKey::Tram],
};

/// Routing [Profile] for different kinds of trains.
pub const TRAIN_PROFILE: Profile = Profile {
    name: "train",
    mode: TravelMode::Train,
    weights: weights![Rail: 1.0, LightRail: 1.0, Subway: 1.0, NarrowGauge: 1.0],
    access: &[AccessKey::Access, AccessKey::Train],
};

/// Routing [Profile] for walking, with preference for footways and quieter roads.
pub const FOOT_PROFILE: Profile = Profile {
    name: "foot",
    mode: TravelMode::Walk,
    weights: weights![
        Trunk: 0.3,
        Primary: 0.6,
        Secondary: 0.8,
        Tertiary: 0.9,
        Unclassified: 0.9,
        Residential: 1.0,
        Track: 1.0,
        Service: 1.0,
        Bridleway: 1.0,
        Footway: 1.2,
        Path: 1.2,
        Steps: 1.0,
    ],
    access: &[AccessKey::Access, AccessKey::Foot],
};
