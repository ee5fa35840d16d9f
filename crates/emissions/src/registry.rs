//! The allocation registry: exactly one rule per catalogued source.
//!
//! [`Registry::standard`] is built from an exhaustive `match`, so adding a
//! source to the catalogue without a rule does not compile. Registries
//! assembled at runtime (explicit entries, config overrides) are checked
//! against the catalogue before use.

use std::collections::{BTreeMap, BTreeSet};

use eeio_core::SectorVector;

use crate::allocate::{spread_total, AllocationInputs, AllocationRule, WeightKey};
use crate::config::RegistryConfig;
use crate::error::EmissionsError;
use crate::source::EmissionsSource;

const CROPS: &[&str] = &["1111A0", "1111B0", "111200", "111300", "111400", "111900"];
const LIVESTOCK: &[&str] = &["1121A0", "112120", "112A00", "112300"];

#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    rules: BTreeMap<EmissionsSource, AllocationRule>,
}

impl Registry {
    /// The built-in rule for every source.
    pub fn standard() -> Self {
        Self {
            rules: EmissionsSource::ALL.iter().map(|&s| (s, default_rule(s))).collect(),
        }
    }

    /// Assemble from explicit entries. Missing or repeated sources fail.
    pub fn from_entries<I>(entries: I) -> Result<Self, EmissionsError>
    where
        I: IntoIterator<Item = (EmissionsSource, AllocationRule)>,
    {
        let mut rules = BTreeMap::new();
        let mut duplicated = Vec::new();
        for (source, rule) in entries {
            if rules.insert(source, rule).is_some() {
                duplicated.push(source.code().to_string());
            }
        }
        let registry = Self { rules };
        registry.check_with(Vec::new(), duplicated)?;
        Ok(registry)
    }

    /// Replace rules with the config's overrides.
    pub fn with_config(mut self, config: &RegistryConfig) -> Result<Self, EmissionsError> {
        let mut orphaned = Vec::new();
        for (code, rule) in &config.overrides {
            match code.parse::<EmissionsSource>() {
                Ok(source) => {
                    log::debug!("override for '{source}'");
                    self.rules.insert(source, rule.clone());
                }
                Err(_) => orphaned.push(code.clone()),
            }
        }
        self.check_with(orphaned, Vec::new())?;
        Ok(self)
    }

    /// Key set equals the catalogue and every borrowed shape can be evaluated.
    pub fn check(&self) -> Result<(), EmissionsError> {
        self.check_with(Vec::new(), Vec::new())
    }

    fn check_with(&self, orphaned: Vec<String>, duplicated: Vec<String>) -> Result<(), EmissionsError> {
        let missing: Vec<String> = EmissionsSource::ALL
            .iter()
            .filter(|s| !self.rules.contains_key(s))
            .map(|s| s.code().to_string())
            .collect();
        if !missing.is_empty() || !orphaned.is_empty() || !duplicated.is_empty() {
            return Err(EmissionsError::Registry {
                missing,
                orphaned,
                duplicated,
            });
        }
        for (&source, rule) in &self.rules {
            if let AllocationRule::ShapeOf { source: other } = rule {
                if let Some(AllocationRule::ShapeOf { .. }) = self.rules.get(other) {
                    return Err(EmissionsError::InvalidRule {
                        source,
                        reason: format!("borrows the shape of '{other}', which borrows a shape itself"),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn rule(&self, source: EmissionsSource) -> Option<&AllocationRule> {
        self.rules.get(&source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmissionsSource, &AllocationRule)> {
        self.rules.iter().map(|(s, r)| (*s, r))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Sector codes named by `Sectors` rules.
    pub fn referenced_sectors(&self) -> BTreeSet<String> {
        self.rules
            .values()
            .filter_map(|r| match r {
                AllocationRule::Sectors { sectors, .. } => Some(sectors.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Weight keys the rules read, i.e. the inputs a batch needs.
    pub fn required_keys(&self) -> BTreeSet<WeightKey> {
        self.rules.values().filter_map(|r| r.key().cloned()).collect()
    }

    /// Allocate one source's inventory total over the sector taxonomy.
    pub fn allocate(
        &self,
        source: EmissionsSource,
        inputs: &AllocationInputs,
    ) -> Result<SectorVector, EmissionsError> {
        let total = inputs.total(source)?;
        let out = self.spread(source, total, inputs)?;
        let missing = out.missing_codes();
        if !missing.is_empty() {
            return Err(EmissionsError::MissingValues {
                source,
                sectors: missing,
            });
        }
        log::debug!("allocated '{source}' ({total})");
        Ok(out)
    }

    fn spread(
        &self,
        source: EmissionsSource,
        total: f64,
        inputs: &AllocationInputs,
    ) -> Result<SectorVector, EmissionsError> {
        let rule = self.rule(source).ok_or_else(|| EmissionsError::Registry {
            missing: vec![source.code().to_string()],
            orphaned: Vec::new(),
            duplicated: Vec::new(),
        })?;
        match rule {
            AllocationRule::Sectors { sectors, key } => {
                let key = inputs.key_vector(source, key)?;
                spread_total(source, total, sectors, &key, inputs)
            }
            AllocationRule::Proportional { key } => {
                let key = inputs.key_vector(source, key)?;
                spread_total(source, total, inputs.sectors.codes(), &key, inputs)
            }
            AllocationRule::ShapeOf { source: other } => {
                if let Some(AllocationRule::ShapeOf { .. }) = self.rule(*other) {
                    return Err(EmissionsError::InvalidRule {
                        source,
                        reason: format!("borrows the shape of '{other}', which borrows a shape itself"),
                    });
                }
                let shape = self.spread(*other, 1.0, inputs)?;
                spread_total(source, total, inputs.sectors.codes(), &shape, inputs)
            }
        }
    }
}

fn sectors(codes: &[&str], key: WeightKey) -> AllocationRule {
    AllocationRule::sectors(codes.iter().copied(), key)
}

fn proportional(key: WeightKey) -> AllocationRule {
    AllocationRule::Proportional { key }
}

fn shape_of(source: EmissionsSource) -> AllocationRule {
    AllocationRule::ShapeOf { source }
}

fn use_of(commodity: &str) -> WeightKey {
    WeightKey::CommodityUse(commodity.to_string())
}

fn default_rule(source: EmissionsSource) -> AllocationRule {
    use EmissionsSource::*;

    match source {
        Co2ElectricityGeneration
        | Sf6ElectricalTransmissionAndDistribution => sectors(&["221100"], WeightKey::Equal),
        Co2TransportationNaturalGas => {
            sectors(&["486000", "484000", "485000"], WeightKey::GrossOutput)
        }
        Co2TransportationAviationGasoline
        | Co2TransportationJetFuel => sectors(&["481000"], WeightKey::Equal),
        Co2TransportationDistillateFuelOil
        | Co2TransportationMotorGasoline
        | Co2IndustrialPetrol
        | Co2CommercialPetrol
        | Co2NonEnergyFuelsPetrol => proportional(use_of("324110")),
        Co2TransportationLpg => sectors(&["484000", "485000"], WeightKey::GrossOutput),
        Co2TransportationResidualFuel => sectors(&["483000"], WeightKey::Equal),
        Co2IndustrialCoal
        | Co2CommercialCoal
        | Co2NonEnergyFuelsCoalCoke => proportional(use_of("212100")),
        Co2IndustrialNaturalGas
        | Co2CommercialNaturalGas
        | Co2NonEnergyFuelsNaturalGas => proportional(use_of("221200")),
        Co2Residential => sectors(&["531HSO"], WeightKey::Equal),
        Co2UsTerritories => proportional(WeightKey::GrossOutput),
        Co2NonEnergyFuelsTransport => {
            sectors(&["484000", "485000", "486000"], WeightKey::GrossOutput)
        }
        Co2IronAndSteelProductionAndMetallurgicalCokeProduction
        | Co2FerroalloyProduction
        | Ch4FerroalloyProduction
        | Ch4IronAndSteelProductionAndMetallurgicalCokeProduction
            => sectors(&["331110"], WeightKey::Equal),
        Co2NaturalGasSystems
        | Ch4NaturalGasSystems => sectors(&["211000", "221200", "486000"], WeightKey::GrossOutput),
        Co2CementProduction => sectors(&["327310"], WeightKey::Equal),
        Co2PetrochemicalProduction
        | Ch4PetrochemicalProduction => sectors(&["325110"], WeightKey::Equal),
        Co2LimeProduction => sectors(&["327400"], WeightKey::Equal),
        Co2AmmoniaProduction
        | Co2PhosphoricAcidProduction
        | N2oNitricAcidProduction => sectors(&["325310"], WeightKey::Equal),
        Co2IncinerationOfWaste
        | Ch4Landfills
        | Ch4Composting
        | Ch4IncinerationOfWaste
        | N2oComposting
        | N2oIncinerationOfWaste => sectors(&["562000"], WeightKey::Equal),
        Co2PetroleumSystems
        | Ch4PetroleumSystems => sectors(&["211000", "324110", "486000"], WeightKey::GrossOutput),
        Co2LimingOfAgriculturalSoils
        | Co2UreaFertilization
        | Ch4FieldBurningOfAgriculturalResidues
        | N2oAgriculturalSoilManagementCroplandFertilizer
        | N2oAgriculturalSoilManagementCroplandMineralizationAndOther
        | N2oFieldBurningOfAgriculturalResidues
            => sectors(CROPS, WeightKey::GrossOutput),
        Co2UreaConsumptionForNonagriculturalPurposes => proportional(use_of("325310")),
        Co2OtherProcessUsesOfCarbonates => proportional(use_of("212300")),
        Co2AluminumProduction
        | PfcCf4AluminumProduction
        | PfcC2f6AluminumProduction => sectors(&["331313"], WeightKey::Equal),
        Co2SodaAshProductionAndConsumption
        | Co2TitaniumDioxideProduction => sectors(&["325180"], WeightKey::Equal),
        Co2ZincProduction
        | Co2LeadProduction
        | Co2MagnesiumProductionAndProcessing
        | Hfc134aMagnesiumProductionAndProcessing
        | Sf6MagnesiumProductionAndProcessing => sectors(&["331410"], WeightKey::Equal),
        Co2GlassProduction => sectors(&["327200"], WeightKey::Equal),
        Co2CarbonDioxideConsumption
        | N2oFromProductUses
        | Hfc23Hcfc22Production => sectors(&["325120"], WeightKey::Equal),
        Co2PeatlandsRemainingPeatlands
        | Co2LandUseLandUseChangeAndForestrySinks => sectors(&["113000"], WeightKey::Equal),
        Co2SiliconCarbideProductionAndConsumption
        | Ch4SiliconCarbideProductionAndConsumption => sectors(&["327910"], WeightKey::Equal),
        Co2WoodBiomassAndEthanolConsumption => proportional(use_of("321100")),
        Co2InternationalBunkerFuels => sectors(&["483000", "481000"], WeightKey::GrossOutput),
        Ch4EntericFermentation => sectors(&["1121A0", "112120"], WeightKey::GrossOutput),
        Ch4ManureManagement
        | N2oAgriculturalSoilManagementGrassland
        | N2oManureManagement
            => sectors(LIVESTOCK, WeightKey::GrossOutput),
        Ch4CoalMining
        | Ch4AbandonedUndergroundCoalMines => sectors(&["212100"], WeightKey::Equal),
        Ch4WastewaterTreatment
        | N2oWastewaterTreatment => sectors(&["221300"], WeightKey::Equal),
        Ch4RiceCultivation => sectors(&["1111B0"], WeightKey::Equal),
        Ch4StationaryCombustionElectric
        | N2oStationaryCombustionElectric => shape_of(Co2ElectricityGeneration),
        Ch4StationaryCombustionIndustrialCoal
        | N2oStationaryCombustionIndustrialCoal => shape_of(Co2IndustrialCoal),
        Ch4StationaryCombustionIndustrialFuelOil
        | N2oStationaryCombustionIndustrialFuelOil => shape_of(Co2IndustrialPetrol),
        Ch4StationaryCombustionIndustrialNaturalGas
        | N2oStationaryCombustionIndustrialNaturalGas => shape_of(Co2IndustrialNaturalGas),
        Ch4StationaryCombustionCommercialFuelOil
        | N2oStationaryCombustionCommercialFuelOil => shape_of(Co2CommercialPetrol),
        Ch4StationaryCombustionCommercialNaturalGas
        | N2oStationaryCombustionCommercialNaturalGas => shape_of(Co2CommercialNaturalGas),
        Ch4StationaryCombustionResidential
        | N2oStationaryCombustionResidential => shape_of(Co2Residential),
        Ch4AbandonedOilAndGasWells => sectors(&["211000"], WeightKey::Equal),
        Ch4MobileCombustion
        | N2oMobileCombustion => shape_of(Co2TransportationMotorGasoline),
        Ch4InternationalBunkerFuels
        | N2oInternationalBunkerFuels => shape_of(Co2InternationalBunkerFuels),
        N2oAdipicAcidProduction
        | N2oCaprolactamGlyoxalAndGlyoxylicAcidProduction => sectors(&["325190"], WeightKey::Equal),
        N2oSemiconductorManufacture
        | Hfc23SemiconductorManufacture
        | PfcCf4SemiconductorManufacture
        | PfcC2f6SemiconductorManufacture
        | PfcC3f8SemiconductorManufacture
        | PfcC4f8SemiconductorManufacture
        | Sf6SemiconductorManufacture
        | Nf3SemiconductorManufacture => sectors(&["334413"], WeightKey::Equal),
        Hfc32SubstitutionOfOzoneDepletingSubstancesTransport
        | Hfc125SubstitutionOfOzoneDepletingSubstancesTransport
        | Hfc134aSubstitutionOfOzoneDepletingSubstancesTransport
        | Hfc143aSubstitutionOfOzoneDepletingSubstancesTransport
        | Hfc236faSubstitutionOfOzoneDepletingSubstancesTransport => proportional(use_of("336112")),
        Hfc32SubstitutionOfOzoneDepletingSubstancesOthers
        | Hfc125SubstitutionOfOzoneDepletingSubstancesOthers
        | Hfc134aSubstitutionOfOzoneDepletingSubstancesOthers
        | Hfc143aSubstitutionOfOzoneDepletingSubstancesOthers
        | Hfc236faSubstitutionOfOzoneDepletingSubstancesOthers => proportional(use_of("333415")),
        Hfc32Foams
        | Hfc125Foams
        | Hfc134aFoams
        | Hfc143aFoams
        | Hfc236faFoams => sectors(&["326140", "326150"], WeightKey::GrossOutput),
    }
}
