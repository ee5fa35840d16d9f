use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Gases that emissions are allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gas {
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "CH4")]
    Ch4,
    #[serde(rename = "N2O")]
    N2o,
    #[serde(rename = "HFC-23")]
    Hfc23,
    #[serde(rename = "HFC-32")]
    Hfc32,
    #[serde(rename = "HFC-125")]
    Hfc125,
    #[serde(rename = "HFC-134a")]
    Hfc134a,
    #[serde(rename = "HFC-143a")]
    Hfc143a,
    #[serde(rename = "HFC-236fa")]
    Hfc236fa,
    #[serde(rename = "CF4")]
    Cf4,
    #[serde(rename = "C2F6")]
    C2f6,
    #[serde(rename = "C3F8")]
    C3f8,
    #[serde(rename = "C4F8")]
    C4f8,
    #[serde(rename = "SF6")]
    Sf6,
    #[serde(rename = "NF3")]
    Nf3,
}

impl Gas {
    pub const ALL: &'static [Gas] = &[
        Gas::Co2,
        Gas::Ch4,
        Gas::N2o,
        Gas::Hfc23,
        Gas::Hfc32,
        Gas::Hfc125,
        Gas::Hfc134a,
        Gas::Hfc143a,
        Gas::Hfc236fa,
        Gas::Cf4,
        Gas::C2f6,
        Gas::C3f8,
        Gas::C4f8,
        Gas::Sf6,
        Gas::Nf3,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Gas::Co2 => "CO2",
            Gas::Ch4 => "CH4",
            Gas::N2o => "N2O",
            Gas::Hfc23 => "HFC-23",
            Gas::Hfc32 => "HFC-32",
            Gas::Hfc125 => "HFC-125",
            Gas::Hfc134a => "HFC-134a",
            Gas::Hfc143a => "HFC-143a",
            Gas::Hfc236fa => "HFC-236fa",
            Gas::Cf4 => "CF4",
            Gas::C2f6 => "C2F6",
            Gas::C3f8 => "C3F8",
            Gas::C4f8 => "C4F8",
            Gas::Sf6 => "SF6",
            Gas::Nf3 => "NF3",
        }
    }

    pub fn group(self) -> GhgGroup {
        match self {
            Gas::Co2 => GhgGroup::Co2,
            Gas::Ch4 => GhgGroup::Ch4,
            Gas::N2o => GhgGroup::N2o,
            Gas::Hfc23 | Gas::Hfc32 | Gas::Hfc125 | Gas::Hfc134a | Gas::Hfc143a | Gas::Hfc236fa => {
                GhgGroup::Hfcs
            }
            Gas::Cf4 | Gas::C2f6 | Gas::C3f8 | Gas::C4f8 => GhgGroup::Pfcs,
            Gas::Sf6 => GhgGroup::Sf6,
            Gas::Nf3 => GhgGroup::Nf3,
        }
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gas {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gas::ALL
            .iter()
            .copied()
            .find(|g| g.name() == s)
            .ok_or_else(|| format!("unknown gas '{s}'"))
    }
}

/// Reporting groups: single gases plus the HFC and PFC families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GhgGroup {
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "CH4")]
    Ch4,
    #[serde(rename = "N2O")]
    N2o,
    #[serde(rename = "HFCs")]
    Hfcs,
    #[serde(rename = "PFCs")]
    Pfcs,
    #[serde(rename = "SF6")]
    Sf6,
    #[serde(rename = "NF3")]
    Nf3,
}

impl GhgGroup {
    pub const ALL: &'static [GhgGroup] = &[
        GhgGroup::Co2,
        GhgGroup::Ch4,
        GhgGroup::N2o,
        GhgGroup::Hfcs,
        GhgGroup::Pfcs,
        GhgGroup::Sf6,
        GhgGroup::Nf3,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GhgGroup::Co2 => "CO2",
            GhgGroup::Ch4 => "CH4",
            GhgGroup::N2o => "N2O",
            GhgGroup::Hfcs => "HFCs",
            GhgGroup::Pfcs => "PFCs",
            GhgGroup::Sf6 => "SF6",
            GhgGroup::Nf3 => "NF3",
        }
    }

    pub fn members(self) -> impl Iterator<Item = Gas> {
        Gas::ALL.iter().copied().filter(move |g| g.group() == self)
    }
}

impl fmt::Display for GhgGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
