//! Attribute - The bounded psychological traits an Agent carries
//!
//! Every attribute belongs to exactly one domain, and the domain fixes
//! its legal range. Values are clamped on every write, so a stored
//! value is always inside its range.

use std::collections::BTreeMap;

/// The range an attribute lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeDomain {
    /// Bystander traits, 7-point scale [0, 7]
    Bystander,
    /// Bully traits, 5-point scale [1, 5]
    Bully,
    /// Victim-support measures, [0, 1]
    VictimSupport,
}

impl AttributeDomain {
    pub fn min(&self) -> f64 {
        match self {
            AttributeDomain::Bystander => 0.0,
            AttributeDomain::Bully => 1.0,
            AttributeDomain::VictimSupport => 0.0,
        }
    }

    pub fn max(&self) -> f64 {
        match self {
            AttributeDomain::Bystander => 7.0,
            AttributeDomain::Bully => 5.0,
            AttributeDomain::VictimSupport => 1.0,
        }
    }

    /// Clamp a raw value into this domain
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min();
        }
        value.clamp(self.min(), self.max())
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min() && value <= self.max()
    }
}

/// One named attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    // Bystander
    Prs,
    Cnt,
    Anx,
    VisitFreq,
    // Bully
    At,
    Pbc,
    Emp,
    Tin,
    // Victim support
    Ues,
    Ura,
    Uad,
    Ups,
}

impl Attribute {
    pub const ALL: [Attribute; 12] = [
        Attribute::Prs,
        Attribute::Cnt,
        Attribute::Anx,
        Attribute::VisitFreq,
        Attribute::At,
        Attribute::Pbc,
        Attribute::Emp,
        Attribute::Tin,
        Attribute::Ues,
        Attribute::Ura,
        Attribute::Uad,
        Attribute::Ups,
    ];

    /// Parse the field name used in rule files and the store
    pub fn parse(name: &str) -> Option<Self> {
        Attribute::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Field name as written in rule files and the store
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Prs => "PRS",
            Attribute::Cnt => "CNT",
            Attribute::Anx => "ANX",
            Attribute::VisitFreq => "VisitFreq",
            Attribute::At => "AT",
            Attribute::Pbc => "PBC",
            Attribute::Emp => "EMP",
            Attribute::Tin => "TIN",
            Attribute::Ues => "UES",
            Attribute::Ura => "URA",
            Attribute::Uad => "UAD",
            Attribute::Ups => "UPS",
        }
    }

    pub fn domain(&self) -> AttributeDomain {
        match self {
            Attribute::Prs | Attribute::Cnt | Attribute::Anx | Attribute::VisitFreq => {
                AttributeDomain::Bystander
            }
            Attribute::At | Attribute::Pbc | Attribute::Emp | Attribute::Tin => {
                AttributeDomain::Bully
            }
            Attribute::Ues | Attribute::Ura | Attribute::Uad | Attribute::Ups => {
                AttributeDomain::VictimSupport
            }
        }
    }
}

impl core::fmt::Display for Attribute {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A set of attribute values; unset attributes are simply absent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traits {
    values: BTreeMap<Attribute, f64>,
}

impl Traits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a value (clamped)
    pub fn with(mut self, attribute: Attribute, value: f64) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn get(&self, attribute: Attribute) -> Option<f64> {
        self.values.get(&attribute).copied()
    }

    /// Value, or `default` when unset
    pub fn get_or(&self, attribute: Attribute, default: f64) -> f64 {
        self.get(attribute).unwrap_or(default)
    }

    /// Store a value, clamped to the attribute's domain. Returns what was stored.
    pub fn set(&mut self, attribute: Attribute, value: f64) -> f64 {
        let clamped = attribute.domain().clamp(value);
        self.values.insert(attribute, clamped);
        clamped
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        self.values.iter().map(|(a, v)| (*a, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
