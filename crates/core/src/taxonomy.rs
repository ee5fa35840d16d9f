use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::StructureError;

// ---------------------------------------------------------------------------
// Known taxonomies
// ---------------------------------------------------------------------------

/// Which side of an IO table a taxonomy classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Industry,
    Commodity,
    FinalDemand,
    ValueAdded,
    /// Unified industry/commodity axis (CEDA sectors).
    Sector,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Industry => write!(f, "industry"),
            Self::Commodity => write!(f, "commodity"),
            Self::FinalDemand => write!(f, "final_demand"),
            Self::ValueAdded => write!(f, "value_added"),
            Self::Sector => write!(f, "sector"),
        }
    }
}

/// Every taxonomy the pipeline recognizes. Unrecognized names fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyId {
    Bea2012Industry,
    Bea2012Commodity,
    Bea2017Industry,
    Bea2017Commodity,
    Bea2017FinalDemand,
    Bea2017ValueAdded,
    Bea2017SummaryIndustry,
    Bea2017SummaryCommodity,
    Bea2017SummaryFinalDemand,
    CedaV7,
    CornerstoneIndustry,
    CornerstoneCommodity,
    CornerstoneFinalDemand,
    CornerstoneValueAdded,
}

impl TaxonomyId {
    pub const ALL: [TaxonomyId; 14] = [
        Self::Bea2012Industry,
        Self::Bea2012Commodity,
        Self::Bea2017Industry,
        Self::Bea2017Commodity,
        Self::Bea2017FinalDemand,
        Self::Bea2017ValueAdded,
        Self::Bea2017SummaryIndustry,
        Self::Bea2017SummaryCommodity,
        Self::Bea2017SummaryFinalDemand,
        Self::CedaV7,
        Self::CornerstoneIndustry,
        Self::CornerstoneCommodity,
        Self::CornerstoneFinalDemand,
        Self::CornerstoneValueAdded,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bea2012Industry => "bea_2012_industry",
            Self::Bea2012Commodity => "bea_2012_commodity",
            Self::Bea2017Industry => "bea_2017_industry",
            Self::Bea2017Commodity => "bea_2017_commodity",
            Self::Bea2017FinalDemand => "bea_2017_final_demand",
            Self::Bea2017ValueAdded => "bea_2017_value_added",
            Self::Bea2017SummaryIndustry => "bea_2017_summary_industry",
            Self::Bea2017SummaryCommodity => "bea_2017_summary_commodity",
            Self::Bea2017SummaryFinalDemand => "bea_2017_summary_final_demand",
            Self::CedaV7 => "ceda_v7",
            Self::CornerstoneIndustry => "cornerstone_industry",
            Self::CornerstoneCommodity => "cornerstone_commodity",
            Self::CornerstoneFinalDemand => "cornerstone_final_demand",
            Self::CornerstoneValueAdded => "cornerstone_value_added",
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Self::Bea2012Industry
            | Self::Bea2017Industry
            | Self::Bea2017SummaryIndustry
            | Self::CornerstoneIndustry => Axis::Industry,
            Self::Bea2012Commodity
            | Self::Bea2017Commodity
            | Self::Bea2017SummaryCommodity
            | Self::CornerstoneCommodity => Axis::Commodity,
            Self::Bea2017FinalDemand
            | Self::Bea2017SummaryFinalDemand
            | Self::CornerstoneFinalDemand => Axis::FinalDemand,
            Self::Bea2017ValueAdded | Self::CornerstoneValueAdded => Axis::ValueAdded,
            Self::CedaV7 => Axis::Sector,
        }
    }

    /// Built-in code list, for the taxonomies small enough to ship as constants.
    /// The large detail lists arrive as data through the IO layer.
    pub fn builtin(&self) -> Option<Taxonomy> {
        match self {
            Self::Bea2017ValueAdded | Self::CornerstoneValueAdded => {
                Taxonomy::with_labels(self.name(), VALUE_ADDED.iter().map(|(c, l)| (*c, *l))).ok()
            }
            _ => None,
        }
    }
}

impl fmt::Display for TaxonomyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaxonomyId {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| StructureError::UnknownTaxonomy { name: s.to_string() })
    }
}

/// Value-added rows shared by the BEA 2017 and cornerstone schemas.
pub const VALUE_ADDED: [(&str, &str); 3] = [
    ("V00100", "Compensation of employees"),
    ("V00200", "Taxes on production and imports, less subsidies"),
    ("V00300", "Gross operating surplus"),
];

/// BEA waste management code split into cornerstone subsectors with no
/// distinguishing data of their own.
pub const WASTE_PARENT: &str = "562000";
pub const WASTE_SUBSECTORS: [&str; 7] = [
    "562111", "562HAZ", "562212", "562213", "562910", "562920", "562OTH",
];

/// Codes in 2012 detail tables that 2017 tables aggregate into one sector.
pub const EXPANDED_SECTORS_2012_TO_2017: [&str; 4] = ["335221", "335222", "335224", "335228"];
pub const AGGREGATED_SECTOR_2012_TO_2017: &str = "335220";

/// Commodities intentionally left out of CEDA sectors (not purchasable goods or services).
pub const EXPECTED_COMMODITIES_DROPPED: [&str; 4] = ["S00401", "S00402", "S00300", "S00900"];

// ---------------------------------------------------------------------------
// Vintages and matrix kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKind {
    Make,
    Use,
    Import,
    FinalDemand,
    Scrap,
    Supply,
    UseSut,
}

impl MatrixKind {
    /// (row axis, column axis). Vectors report `None` for the column axis.
    pub fn axes(&self) -> (Axis, Option<Axis>) {
        match self {
            Self::Make => (Axis::Industry, Some(Axis::Commodity)),
            Self::Use | Self::Import | Self::UseSut => (Axis::Commodity, Some(Axis::Industry)),
            Self::Supply => (Axis::Commodity, Some(Axis::Industry)),
            Self::FinalDemand => (Axis::Commodity, Some(Axis::FinalDemand)),
            Self::Scrap => (Axis::Industry, None),
        }
    }
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Make => write!(f, "make"),
            Self::Use => write!(f, "use"),
            Self::Import => write!(f, "import"),
            Self::FinalDemand => write!(f, "final_demand"),
            Self::Scrap => write!(f, "scrap"),
            Self::Supply => write!(f, "supply"),
            Self::UseSut => write!(f, "use_sut"),
        }
    }
}

/// Granularity and benchmark year of a published table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "granularity", content = "year", rename_all = "snake_case")]
pub enum Vintage {
    Detail(u16),
    Summary(u16),
}

impl Vintage {
    pub const DETAIL_YEARS: [u16; 3] = [2007, 2012, 2017];
    pub const SUMMARY_YEARS: std::ops::RangeInclusive<u16> = 1997..=2024;

    pub fn detail(year: u16) -> Result<Self, StructureError> {
        if Self::DETAIL_YEARS.contains(&year) {
            Ok(Self::Detail(year))
        } else {
            Err(StructureError::UnknownVintage { granularity: "detail".into(), year })
        }
    }

    pub fn summary(year: u16) -> Result<Self, StructureError> {
        if Self::SUMMARY_YEARS.contains(&year) {
            Ok(Self::Summary(year))
        } else {
            Err(StructureError::UnknownVintage { granularity: "summary".into(), year })
        }
    }

    /// Re-check a vintage that did not come through `detail` or `summary`,
    /// e.g. one deserialized from a config file.
    pub fn checked(self) -> Result<Self, StructureError> {
        match self {
            Self::Detail(y) => Self::detail(y),
            Self::Summary(y) => Self::summary(y),
        }
    }

    pub fn year(&self) -> u16 {
        match self {
            Self::Detail(y) | Self::Summary(y) => *y,
        }
    }

    /// Taxonomy of a matrix axis at this vintage, when one is defined.
    pub fn taxonomy(&self, axis: Axis) -> Option<TaxonomyId> {
        match (self, axis) {
            (Self::Detail(2012), Axis::Industry) => Some(TaxonomyId::Bea2012Industry),
            (Self::Detail(2012), Axis::Commodity) => Some(TaxonomyId::Bea2012Commodity),
            (Self::Detail(2017), Axis::Industry) => Some(TaxonomyId::Bea2017Industry),
            (Self::Detail(2017), Axis::Commodity) => Some(TaxonomyId::Bea2017Commodity),
            (Self::Detail(2017), Axis::FinalDemand) => Some(TaxonomyId::Bea2017FinalDemand),
            (Self::Detail(2017), Axis::ValueAdded) => Some(TaxonomyId::Bea2017ValueAdded),
            (Self::Summary(_), Axis::Industry) => Some(TaxonomyId::Bea2017SummaryIndustry),
            (Self::Summary(_), Axis::Commodity) => Some(TaxonomyId::Bea2017SummaryCommodity),
            (Self::Summary(_), Axis::FinalDemand) => Some(TaxonomyId::Bea2017SummaryFinalDemand),
            _ => None,
        }
    }
}

impl fmt::Display for Vintage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detail(y) => write!(f, "{y} detail"),
            Self::Summary(y) => write!(f, "{y} summary"),
        }
    }
}

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// An ordered, duplicate-free list of sector codes with labels.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    name: String,
    codes: Vec<String>,
    labels: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl PartialEq for Taxonomy {
    fn eq(&self, other: &Self) -> bool {
        self.codes == other.codes
    }
}

impl Taxonomy {
    /// Build from codes alone; labels default to the code.
    pub fn new<I, S>(name: &str, codes: I) -> Result<Self, StructureError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_labels(
            name,
            codes.into_iter().map(|c| {
                let c: String = c.into();
                (c.clone(), c)
            }),
        )
    }

    pub fn with_labels<I, C, L>(name: &str, entries: I) -> Result<Self, StructureError>
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<String>,
        L: Into<String>,
    {
        let mut codes = Vec::new();
        let mut labels = Vec::new();
        let mut index = FxHashMap::default();
        for (code, label) in entries {
            let code: String = code.into();
            if code.trim().is_empty() {
                return Err(StructureError::EmptyCode { taxonomy: name.to_string() });
            }
            if index.insert(code.clone(), codes.len()).is_some() {
                return Err(StructureError::DuplicateCode {
                    taxonomy: name.to_string(),
                    code,
                });
            }
            codes.push(code);
            labels.push(label.into());
        }
        Ok(Self {
            name: name.to_string(),
            codes,
            labels,
            index,
        })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn position(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn code(&self, i: usize) -> &str {
        &self.codes[i]
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.position(code).map(|i| self.labels[i].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.codes
            .iter()
            .zip(self.labels.iter())
            .map(|(c, l)| (c.as_str(), l.as_str()))
    }

    /// Positions of `codes`, failing with every code that is not present.
    pub fn positions<S: AsRef<str>>(&self, codes: &[S]) -> Result<Vec<usize>, StructureError> {
        let mut out = Vec::with_capacity(codes.len());
        let mut unknown = Vec::new();
        for c in codes {
            match self.position(c.as_ref()) {
                Some(i) => out.push(i),
                None => unknown.push(c.as_ref().to_string()),
            }
        }
        if unknown.is_empty() {
            Ok(out)
        } else {
            Err(StructureError::UnknownCode {
                taxonomy: self.name.clone(),
                codes: unknown,
            })
        }
    }

    /// Order-sensitive identity check between two axes.
    pub fn ensure_same(&self, other: &Taxonomy, what: &str) -> Result<(), StructureError> {
        if self.codes == other.codes {
            Ok(())
        } else {
            Err(StructureError::IndexMismatch {
                what: what.to_string(),
                expected: self.name.clone(),
                actual: other.name.clone(),
            })
        }
    }

    /// Sub-taxonomy of the given codes, in the order given.
    pub fn subset<S: AsRef<str>>(&self, name: &str, codes: &[S]) -> Result<Self, StructureError> {
        let positions = self.positions(codes)?;
        Self::with_labels(
            name,
            positions
                .into_iter()
                .map(|i| (self.codes[i].clone(), self.labels[i].clone())),
        )
    }
}
