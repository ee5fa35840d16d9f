//! The catalogue of recognized emissions sources.
//!
//! Every source names one allocated gas and one reporting category. The
//! catalogue is closed: the registry must carry exactly one allocation rule
//! per variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::gas::Gas;

/// Reporting category a source rolls up into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionsSourceCategory {
    CoalMiningOilAndGasExtraction,
    WasteManagement,
    EntericFermentation,
    OtherIndustrialProcesses,
    LandManagement,
    OtherTransport,
    IronAndSteel,
    Landfills,
    NaturalGasSystem,
    PetroleumSystem,
    CommercialFuelCombustion,
    ElectricityGeneration,
    IndustrialFuelCombustion,
    ResidentialFuelCombustion,
    Aviation,
    DieselCombustionForTransportation,
    GasolineCombustionForTransportation,
    OtherFossilFuelCombustion,
    CementProduction,
    MarineBunkerFuelCombustion,
    BiomassAndBiomassDerivedFuelCombustion,
    Refrigerants,
}

impl EmissionsSourceCategory {
    pub const ALL: &'static [EmissionsSourceCategory] = &[
        EmissionsSourceCategory::CoalMiningOilAndGasExtraction,
        EmissionsSourceCategory::WasteManagement,
        EmissionsSourceCategory::EntericFermentation,
        EmissionsSourceCategory::OtherIndustrialProcesses,
        EmissionsSourceCategory::LandManagement,
        EmissionsSourceCategory::OtherTransport,
        EmissionsSourceCategory::IronAndSteel,
        EmissionsSourceCategory::Landfills,
        EmissionsSourceCategory::NaturalGasSystem,
        EmissionsSourceCategory::PetroleumSystem,
        EmissionsSourceCategory::CommercialFuelCombustion,
        EmissionsSourceCategory::ElectricityGeneration,
        EmissionsSourceCategory::IndustrialFuelCombustion,
        EmissionsSourceCategory::ResidentialFuelCombustion,
        EmissionsSourceCategory::Aviation,
        EmissionsSourceCategory::DieselCombustionForTransportation,
        EmissionsSourceCategory::GasolineCombustionForTransportation,
        EmissionsSourceCategory::OtherFossilFuelCombustion,
        EmissionsSourceCategory::CementProduction,
        EmissionsSourceCategory::MarineBunkerFuelCombustion,
        EmissionsSourceCategory::BiomassAndBiomassDerivedFuelCombustion,
        EmissionsSourceCategory::Refrigerants,
    ];

    pub fn code(self) -> &'static str {
        match self {
            EmissionsSourceCategory::CoalMiningOilAndGasExtraction => "coal_mining_oil_and_gas_extraction",
            EmissionsSourceCategory::WasteManagement => "waste_management",
            EmissionsSourceCategory::EntericFermentation => "enteric_fermentation",
            EmissionsSourceCategory::OtherIndustrialProcesses => "other_industrial_processes",
            EmissionsSourceCategory::LandManagement => "land_management",
            EmissionsSourceCategory::OtherTransport => "other_transport",
            EmissionsSourceCategory::IronAndSteel => "iron_and_steel",
            EmissionsSourceCategory::Landfills => "landfills",
            EmissionsSourceCategory::NaturalGasSystem => "natural_gas_system",
            EmissionsSourceCategory::PetroleumSystem => "petroleum_system",
            EmissionsSourceCategory::CommercialFuelCombustion => "commercial_fuel_combustion",
            EmissionsSourceCategory::ElectricityGeneration => "electricity_generation",
            EmissionsSourceCategory::IndustrialFuelCombustion => "industrial_fuel_combustion",
            EmissionsSourceCategory::ResidentialFuelCombustion => "residential_fuel_combustion",
            EmissionsSourceCategory::Aviation => "aviation",
            EmissionsSourceCategory::DieselCombustionForTransportation => "diesel_combustion_for_transportation",
            EmissionsSourceCategory::GasolineCombustionForTransportation => "gasoline_combustion_for_transportation",
            EmissionsSourceCategory::OtherFossilFuelCombustion => "other_fossil_fuel_combustion",
            EmissionsSourceCategory::CementProduction => "cement_production",
            EmissionsSourceCategory::MarineBunkerFuelCombustion => "marine_bunker_fuel_combustion",
            EmissionsSourceCategory::BiomassAndBiomassDerivedFuelCombustion => "biomass_and_biomass_derived_fuel_combustion",
            EmissionsSourceCategory::Refrigerants => "refrigerants",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EmissionsSourceCategory::CoalMiningOilAndGasExtraction => "Coal mining, Oil & Gas extraction",
            EmissionsSourceCategory::WasteManagement => "Waste management",
            EmissionsSourceCategory::EntericFermentation => "Enteric fermentation",
            EmissionsSourceCategory::OtherIndustrialProcesses => "Other Industrial processes",
            EmissionsSourceCategory::LandManagement => "Land management",
            EmissionsSourceCategory::OtherTransport => "Other transport",
            EmissionsSourceCategory::IronAndSteel => "Iron and steel",
            EmissionsSourceCategory::Landfills => "Landfills",
            EmissionsSourceCategory::NaturalGasSystem => "Natural gas system",
            EmissionsSourceCategory::PetroleumSystem => "Petroleum system",
            EmissionsSourceCategory::CommercialFuelCombustion => "Commercial fuel combustion",
            EmissionsSourceCategory::ElectricityGeneration => "Electricity generation",
            EmissionsSourceCategory::IndustrialFuelCombustion => "Industrial fuel combustion",
            EmissionsSourceCategory::ResidentialFuelCombustion => "Residential fuel combustion",
            EmissionsSourceCategory::Aviation => "Aviation",
            EmissionsSourceCategory::DieselCombustionForTransportation => "Diesel combustion for transportation",
            EmissionsSourceCategory::GasolineCombustionForTransportation => "Gasoline combustion for transportation",
            EmissionsSourceCategory::OtherFossilFuelCombustion => "Other fossil fuel combustion",
            EmissionsSourceCategory::CementProduction => "Cement production",
            EmissionsSourceCategory::MarineBunkerFuelCombustion => "Marine bunker fuel combustion",
            EmissionsSourceCategory::BiomassAndBiomassDerivedFuelCombustion => "Biomass and biomass-derived fuel combustion",
            EmissionsSourceCategory::Refrigerants => "Refrigerants",
        }
    }
}

macro_rules! emissions_sources {
    ($($variant:ident => $code:literal, $description:literal, $category:ident, $gas:ident;)*) => {
        /// A recognized emissions source.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum EmissionsSource {
            $($variant,)*
        }

        impl EmissionsSource {
            pub const ALL: &'static [EmissionsSource] = &[$(EmissionsSource::$variant,)*];

            /// Stable snake_case identifier used in configs and output files.
            pub fn code(self) -> &'static str {
                match self {
                    $(EmissionsSource::$variant => $code,)*
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $(EmissionsSource::$variant => $description,)*
                }
            }

            pub fn category(self) -> EmissionsSourceCategory {
                match self {
                    $(EmissionsSource::$variant => EmissionsSourceCategory::$category,)*
                }
            }

            pub fn gas(self) -> Gas {
                match self {
                    $(EmissionsSource::$variant => Gas::$gas,)*
                }
            }
        }
    };
}

emissions_sources! {
    Co2ElectricityGeneration => "co2_electricity_generation", "CO2 Electricity Generation", ElectricityGeneration, Co2;
    Co2TransportationNaturalGas => "co2_transportation_natural_gas", "CO2 Transportation Natural Gas", OtherTransport, Co2;
    Co2TransportationAviationGasoline => "co2_transportation_aviation_gasoline", "CO2 Transportation Aviation Gasoline", Aviation, Co2;
    Co2TransportationDistillateFuelOil => "co2_transportation_distillate_fuel_oil", "CO2 Transportation Distillate Fuel Oil", DieselCombustionForTransportation, Co2;
    Co2TransportationJetFuel => "co2_transportation_jet_fuel", "CO2 Transportation Jet Fuel", Aviation, Co2;
    Co2TransportationLpg => "co2_transportation_lpg", "CO2 Transportation LPG", OtherTransport, Co2;
    Co2TransportationMotorGasoline => "co2_transportation_motor_gasoline", "CO2 Transportation Motor Gasoline", GasolineCombustionForTransportation, Co2;
    Co2TransportationResidualFuel => "co2_transportation_residual_fuel", "CO2 Transportation Residual Fuel", OtherFossilFuelCombustion, Co2;
    Co2IndustrialCoal => "co2_industrial_coal", "CO2 Industrial Coal", IndustrialFuelCombustion, Co2;
    Co2IndustrialNaturalGas => "co2_industrial_natural_gas", "CO2 Industrial Natural Gas", IndustrialFuelCombustion, Co2;
    Co2IndustrialPetrol => "co2_industrial_petrol", "CO2 Industrial Petrol", IndustrialFuelCombustion, Co2;
    Co2Residential => "co2_residential", "CO2 Residential", ResidentialFuelCombustion, Co2;
    Co2CommercialCoal => "co2_commercial_coal", "CO2 Commercial Coal", CommercialFuelCombustion, Co2;
    Co2CommercialNaturalGas => "co2_commercial_natural_gas", "CO2 Commercial Natural Gas", CommercialFuelCombustion, Co2;
    Co2CommercialPetrol => "co2_commercial_petrol", "CO2 Commercial Petrol", CommercialFuelCombustion, Co2;
    Co2UsTerritories => "co2_us_territories", "CO2 U.S. Territories", OtherFossilFuelCombustion, Co2;
    Co2NonEnergyFuelsCoalCoke => "co2_non_energy_fuels_coal_coke", "CO2 Non-Energy Use of Fuels Coal&coke", OtherIndustrialProcesses, Co2;
    Co2NonEnergyFuelsNaturalGas => "co2_non_energy_fuels_natural_gas", "CO2 Non-Energy Use of Fuels Natural gas", OtherIndustrialProcesses, Co2;
    Co2NonEnergyFuelsPetrol => "co2_non_energy_fuels_petrol", "CO2 Non-Energy Use of Fuels Petrol", IndustrialFuelCombustion, Co2;
    Co2NonEnergyFuelsTransport => "co2_non_energy_fuels_transport", "CO2 Non-Energy Use of Fuels Transport", OtherTransport, Co2;
    Co2IronAndSteelProductionAndMetallurgicalCokeProduction => "co2_iron_and_steel_production_and_metallurgical_coke_production", "CO2 Iron and Steel Production & Metallurgical Coke Production", IronAndSteel, Co2;
    Co2NaturalGasSystems => "co2_natural_gas_systems", "CO2 Natural Gas Systems", NaturalGasSystem, Co2;
    Co2CementProduction => "co2_cement_production", "CO2 Cement Production", CementProduction, Co2;
    Co2PetrochemicalProduction => "co2_petrochemical_production", "CO2 Petrochemical Production", OtherFossilFuelCombustion, Co2;
    Co2LimeProduction => "co2_lime_production", "CO2 Lime Production", OtherIndustrialProcesses, Co2;
    Co2AmmoniaProduction => "co2_ammonia_production", "CO2 Ammonia Production", OtherIndustrialProcesses, Co2;
    Co2IncinerationOfWaste => "co2_incineration_of_waste", "CO2 Incineration of Waste", WasteManagement, Co2;
    Co2PetroleumSystems => "co2_petroleum_systems", "CO2 Petroleum Systems", PetroleumSystem, Co2;
    Co2LimingOfAgriculturalSoils => "co2_liming_of_agricultural_soils", "CO2 Liming of Agricultural Soils", OtherIndustrialProcesses, Co2;
    Co2UreaConsumptionForNonagriculturalPurposes => "co2_urea_consumption_for_nonagricultural_purposes", "CO2 Urea Consumption for Non-Agricultural Purposes", OtherIndustrialProcesses, Co2;
    Co2OtherProcessUsesOfCarbonates => "co2_other_process_uses_of_carbonates", "CO2 Other Process Uses of Carbonates", OtherIndustrialProcesses, Co2;
    Co2UreaFertilization => "co2_urea_fertilization", "CO2 Urea Fertilization", OtherIndustrialProcesses, Co2;
    Co2AluminumProduction => "co2_aluminum_production", "CO2 Aluminum Production", OtherIndustrialProcesses, Co2;
    Co2SodaAshProductionAndConsumption => "co2_soda_ash_production_and_consumption", "CO2 Soda Ash Production and Consumption", OtherIndustrialProcesses, Co2;
    Co2FerroalloyProduction => "co2_ferroalloy_production", "CO2 Ferroalloy Production", IronAndSteel, Co2;
    Co2TitaniumDioxideProduction => "co2_titanium_dioxide_production", "CO2 Titanium Dioxide Production", OtherIndustrialProcesses, Co2;
    Co2ZincProduction => "co2_zinc_production", "CO2 Zinc Production", OtherIndustrialProcesses, Co2;
    Co2PhosphoricAcidProduction => "co2_phosphoric_acid_production", "CO2 Phosphoric Acid Production", OtherIndustrialProcesses, Co2;
    Co2GlassProduction => "co2_glass_production", "CO2 Glass Production", OtherIndustrialProcesses, Co2;
    Co2CarbonDioxideConsumption => "co2_carbon_dioxide_consumption", "CO2 Carbon Dioxide Consumption", OtherIndustrialProcesses, Co2;
    Co2PeatlandsRemainingPeatlands => "co2_peatlands_remaining_peatlands", "CO2 Peatlands Remaining Peatlands", LandManagement, Co2;
    Co2LeadProduction => "co2_lead_production", "CO2 Lead Production", OtherIndustrialProcesses, Co2;
    Co2SiliconCarbideProductionAndConsumption => "co2_silicon_carbide_production_and_consumption", "CO2 Silicon Carbide Production and Consumption", OtherIndustrialProcesses, Co2;
    Co2MagnesiumProductionAndProcessing => "co2_magnesium_production_and_processing", "CO2 Magnesium Production and Processing", OtherIndustrialProcesses, Co2;
    Co2LandUseLandUseChangeAndForestrySinks => "co2_land_use_land_use_change_and_forestry_sinks", "CO2 Land Use, Land-Use Change, and Forestry (Sink)", LandManagement, Co2;
    Co2WoodBiomassAndEthanolConsumption => "co2_wood_biomass_and_ethanol_consumption", "CO2 Wood Biomass and Ethanol Consumption", BiomassAndBiomassDerivedFuelCombustion, Co2;
    Co2InternationalBunkerFuels => "co2_international_bunker_fuels", "CO2 International Bunker Fuels", MarineBunkerFuelCombustion, Co2;
    Ch4EntericFermentation => "ch4_enteric_fermentation", "CH4 Enteric Fermentation", EntericFermentation, Ch4;
    Ch4NaturalGasSystems => "ch4_natural_gas_systems", "CH4 Natural Gas Systems", NaturalGasSystem, Ch4;
    Ch4Landfills => "ch4_landfills", "CH4 Landfills", Landfills, Ch4;
    Ch4ManureManagement => "ch4_manure_management", "CH4 Manure Management", LandManagement, Ch4;
    Ch4CoalMining => "ch4_coal_mining", "CH4 Coal Mining", CoalMiningOilAndGasExtraction, Ch4;
    Ch4PetroleumSystems => "ch4_petroleum_systems", "CH4 Petroleum Systems", PetroleumSystem, Ch4;
    Ch4WastewaterTreatment => "ch4_wastewater_treatment", "CH4 Wastewater Treatment", WasteManagement, Ch4;
    Ch4RiceCultivation => "ch4_rice_cultivation", "CH4 Rice Cultivation", LandManagement, Ch4;
    Ch4StationaryCombustionElectric => "ch4_stationary_combustion_electric", "CH4 Stationary Combustion Electric", ElectricityGeneration, Ch4;
    Ch4StationaryCombustionIndustrialCoal => "ch4_stationary_combustion_industrial_coal", "CH4 Stationary Combustion Industrial Coal", IndustrialFuelCombustion, Ch4;
    Ch4StationaryCombustionIndustrialFuelOil => "ch4_stationary_combustion_industrial_fuel_oil", "CH4 Stationary Combustion Industrial Fuel oil", IndustrialFuelCombustion, Ch4;
    Ch4StationaryCombustionIndustrialNaturalGas => "ch4_stationary_combustion_industrial_natural_gas", "CH4 Stationary Combustion Industrial Natural gas", IndustrialFuelCombustion, Ch4;
    Ch4StationaryCombustionCommercialFuelOil => "ch4_stationary_combustion_commercial_fuel_oil", "CH4 Stationary Combustion Commercial Fuel oil", CommercialFuelCombustion, Ch4;
    Ch4StationaryCombustionCommercialNaturalGas => "ch4_stationary_combustion_commercial_natural_gas", "CH4 Stationary Combustion Commercial Natural gas", CommercialFuelCombustion, Ch4;
    Ch4StationaryCombustionResidential => "ch4_stationary_combustion_residential", "CH4 Stationary Combustion Residential", ResidentialFuelCombustion, Ch4;
    Ch4AbandonedOilAndGasWells => "ch4_abandoned_oil_and_gas_wells", "CH4 Abandoned Oil and Gas Wells", CoalMiningOilAndGasExtraction, Ch4;
    Ch4AbandonedUndergroundCoalMines => "ch4_abandoned_underground_coal_mines", "CH4 Abandoned Underground Coal Mines", CoalMiningOilAndGasExtraction, Ch4;
    Ch4MobileCombustion => "ch4_mobile_combustion", "CH4 Mobile Combustion", OtherTransport, Ch4;
    Ch4Composting => "ch4_composting", "CH4 Composting", WasteManagement, Ch4;
    Ch4FieldBurningOfAgriculturalResidues => "ch4_field_burning_of_agricultural_residues", "CH4 Field Burning of Agricultural Residues", LandManagement, Ch4;
    Ch4PetrochemicalProduction => "ch4_petrochemical_production", "CH4 Petrochemical Production", OtherIndustrialProcesses, Ch4;
    Ch4FerroalloyProduction => "ch4_ferroalloy_production", "CH4 Ferroalloy Production", OtherIndustrialProcesses, Ch4;
    Ch4SiliconCarbideProductionAndConsumption => "ch4_silicon_carbide_production_and_consumption", "CH4 Silicon Carbide Production and Consumption", OtherIndustrialProcesses, Ch4;
    Ch4IronAndSteelProductionAndMetallurgicalCokeProduction => "ch4_iron_and_steel_production_and_metallurgical_coke_production", "CH4 Iron and Steel Production & Metallurgical Coke Production", IronAndSteel, Ch4;
    Ch4IncinerationOfWaste => "ch4_incineration_of_waste", "CH4 Incineration of Waste", WasteManagement, Ch4;
    Ch4InternationalBunkerFuels => "ch4_international_bunker_fuels", "CH4 International Bunker Fuels", OtherTransport, Ch4;
    N2oAgriculturalSoilManagementCroplandFertilizer => "n2o_agricultural_soil_management_cropland_fertilizer", "N2O Agricultural Soil Management Cropland Fertilizer", LandManagement, N2o;
    N2oAgriculturalSoilManagementCroplandMineralizationAndOther => "n2o_agricultural_soil_management_cropland_mineralization_and_other", "N2O Agricultural Soil Management Mineralization and other", LandManagement, N2o;
    N2oAgriculturalSoilManagementGrassland => "n2o_agricultural_soil_management_grassland", "N2O Agricultural Soil Management Grassland", LandManagement, N2o;
    N2oStationaryCombustionElectric => "n2o_stationary_combustion_electric", "N2O Stationary Combustion Electric", ElectricityGeneration, N2o;
    N2oStationaryCombustionIndustrialCoal => "n2o_stationary_combustion_industrial_coal", "N2O Stationary Combustion Industrial Coal", IndustrialFuelCombustion, N2o;
    N2oStationaryCombustionIndustrialFuelOil => "n2o_stationary_combustion_industrial_fuel_oil", "N2O Stationary Combustion Industrial Fuel oil", IndustrialFuelCombustion, N2o;
    N2oStationaryCombustionIndustrialNaturalGas => "n2o_stationary_combustion_industrial_natural_gas", "N2O Stationary Combustion Industrial Natural gas", IndustrialFuelCombustion, N2o;
    N2oStationaryCombustionCommercialFuelOil => "n2o_stationary_combustion_commercial_fuel_oil", "N2O Stationary Combustion Commercial Fuel oil", CommercialFuelCombustion, N2o;
    N2oStationaryCombustionCommercialNaturalGas => "n2o_stationary_combustion_commercial_natural_gas", "N2O Stationary Combustion Commercial Natural gas", CommercialFuelCombustion, N2o;
    N2oStationaryCombustionResidential => "n2o_stationary_combustion_residential", "N2O Stationary Combustion Residential", ResidentialFuelCombustion, N2o;
    N2oMobileCombustion => "n2o_mobile_combustion", "N2O Mobile Combustion", OtherTransport, N2o;
    N2oManureManagement => "n2o_manure_management", "N2O Manure Management", LandManagement, N2o;
    N2oNitricAcidProduction => "n2o_nitric_acid_production", "N2O Nitric Acid Production", OtherIndustrialProcesses, N2o;
    N2oAdipicAcidProduction => "n2o_adipic_acid_production", "N2O Adipic Acid Production", OtherIndustrialProcesses, N2o;
    N2oWastewaterTreatment => "n2o_wastewater_treatment", "N2O Wastewater Treatment", WasteManagement, N2o;
    N2oFromProductUses => "n2o_from_product_uses", "N2O N2O from Product Uses", LandManagement, N2o;
    N2oCaprolactamGlyoxalAndGlyoxylicAcidProduction => "n2o_caprolactam_glyoxal_and_glyoxylic_acid_production", "N2O Caprolactam, Glyoxal, and Glyoxylic Acid Production", OtherIndustrialProcesses, N2o;
    N2oComposting => "n2o_composting", "N2O Composting", WasteManagement, N2o;
    N2oIncinerationOfWaste => "n2o_incineration_of_waste", "N2O Incineration of Waste", WasteManagement, N2o;
    N2oSemiconductorManufacture => "n2o_semiconductor_manufacture", "N2O Semiconductor Manufacture", OtherIndustrialProcesses, N2o;
    N2oFieldBurningOfAgriculturalResidues => "n2o_field_burning_of_agricultural_residues", "N2O Field Burning of Agricultural Residues", LandManagement, N2o;
    N2oInternationalBunkerFuels => "n2o_international_bunker_fuels", "N2O International Bunker Fuelsb", OtherTransport, N2o;
    Hfc32SubstitutionOfOzoneDepletingSubstancesTransport => "hfc_32_substitution_of_ozone_depleting_substances_transport", "HFCs Substitution of Ozone Depleting Substancesd Transport HFC-32", Refrigerants, Hfc32;
    Hfc125SubstitutionOfOzoneDepletingSubstancesTransport => "hfc_125_substitution_of_ozone_depleting_substances_transport", "HFCs Substitution of Ozone Depleting Substancesd Transport HFC-125", Refrigerants, Hfc125;
    Hfc134aSubstitutionOfOzoneDepletingSubstancesTransport => "hfc_134a_substitution_of_ozone_depleting_substances_transport", "HFCs Substitution of Ozone Depleting Substancesd Transport HFC-134a", Refrigerants, Hfc134a;
    Hfc143aSubstitutionOfOzoneDepletingSubstancesTransport => "hfc_143a_substitution_of_ozone_depleting_substances_transport", "HFCs Substitution of Ozone Depleting Substancesd Transport HFC-143a", Refrigerants, Hfc143a;
    Hfc236faSubstitutionOfOzoneDepletingSubstancesTransport => "hfc_236fa_substitution_of_ozone_depleting_substances_transport", "HFCs Substitution of Ozone Depleting Substancesd Transport HFC-236fa", Refrigerants, Hfc236fa;
    Hfc32SubstitutionOfOzoneDepletingSubstancesOthers => "hfc_32_substitution_of_ozone_depleting_substances_others", "HFCs Substitution of Ozone Depleting Substancesd Others HFC-32", Refrigerants, Hfc32;
    Hfc125SubstitutionOfOzoneDepletingSubstancesOthers => "hfc_125_substitution_of_ozone_depleting_substances_others", "HFCs Substitution of Ozone Depleting Substancesd Others HFC-125", Refrigerants, Hfc125;
    Hfc134aSubstitutionOfOzoneDepletingSubstancesOthers => "hfc_134a_substitution_of_ozone_depleting_substances_others", "HFCs Substitution of Ozone Depleting Substancesd Others HFC-134a", Refrigerants, Hfc134a;
    Hfc143aSubstitutionOfOzoneDepletingSubstancesOthers => "hfc_143a_substitution_of_ozone_depleting_substances_others", "HFCs Substitution of Ozone Depleting Substancesd Others HFC-143a", Refrigerants, Hfc143a;
    Hfc236faSubstitutionOfOzoneDepletingSubstancesOthers => "hfc_236fa_substitution_of_ozone_depleting_substances_others", "HFCs Substitution of Ozone Depleting Substancesd Others HFC-236fa", Refrigerants, Hfc236fa;
    Hfc32Foams => "hfc_32_foams", "HFCs Foams HFC-32", OtherIndustrialProcesses, Hfc32;
    Hfc125Foams => "hfc_125_foams", "HFCs Foams HFC-125", OtherIndustrialProcesses, Hfc125;
    Hfc134aFoams => "hfc_134a_foams", "HFCs Foams HFC-134a", OtherIndustrialProcesses, Hfc134a;
    Hfc143aFoams => "hfc_143a_foams", "HFCs Foams HFC-143a", OtherIndustrialProcesses, Hfc143a;
    Hfc236faFoams => "hfc_236fa_foams", "HFCs Foams HFC-236fa", OtherIndustrialProcesses, Hfc236fa;
    Hfc23Hcfc22Production => "hfc_23_hcfc_22_production", "HFCs HCFC-22 Production HFC-23", Refrigerants, Hfc23;
    Hfc23SemiconductorManufacture => "hfc_23_semiconductor_manufacture", "HFCs Semiconductor Manufacture HFC-23", OtherIndustrialProcesses, Hfc23;
    Hfc134aMagnesiumProductionAndProcessing => "hfc_134a_magnesium_production_and_processing", "HFCs Magnesium Production and Processing HFC-134a", OtherIndustrialProcesses, Hfc134a;
    PfcCf4AluminumProduction => "pfc_cf4_aluminum_production", "PFCs Aluminum Production CF4", OtherIndustrialProcesses, Cf4;
    PfcC2f6AluminumProduction => "pfc_c2f6_aluminum_production", "PFCs Aluminum Production C2F6", OtherIndustrialProcesses, C2f6;
    PfcCf4SemiconductorManufacture => "pfc_cf4_semiconductor_manufacture", "PFCs Semiconductor Manufacture CF4", OtherIndustrialProcesses, Cf4;
    PfcC2f6SemiconductorManufacture => "pfc_c2f6_semiconductor_manufacture", "PFCs Semiconductor Manufacture C2F6", OtherIndustrialProcesses, C2f6;
    PfcC3f8SemiconductorManufacture => "pfc_c3f8_semiconductor_manufacture", "PFCs Semiconductor Manufacture C3F8", OtherIndustrialProcesses, C3f8;
    PfcC4f8SemiconductorManufacture => "pfc_c4f8_semiconductor_manufacture", "PFCs Semiconductor Manufacture C4F8", OtherIndustrialProcesses, C4f8;
    Sf6ElectricalTransmissionAndDistribution => "sf6_electrical_transmission_and_distribution", "SF6 Electrical Transmission and Distribution", ElectricityGeneration, Sf6;
    Sf6MagnesiumProductionAndProcessing => "sf6_magnesium_production_and_processing", "SF6 Magnesium Production and Processing", OtherIndustrialProcesses, Sf6;
    Sf6SemiconductorManufacture => "sf6_semiconductor_manufacture", "SF6 Semiconductor Manufacture", OtherIndustrialProcesses, Sf6;
    Nf3SemiconductorManufacture => "nf3_semiconductor_manufacture", "NF3 Semiconductor Manufacture", OtherIndustrialProcesses, Nf3;
}

impl fmt::Display for EmissionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EmissionsSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmissionsSource::ALL
            .iter()
            .copied()
            .find(|src| src.code() == s)
            .ok_or_else(|| format!("unknown emissions source '{s}'"))
    }
}

impl TryFrom<String> for EmissionsSource {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EmissionsSource> for &'static str {
    fn from(src: EmissionsSource) -> Self {
        src.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn catalogue_codes_are_unique_and_parse_back() {
        let codes: BTreeSet<&str> = EmissionsSource::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes.len(), EmissionsSource::ALL.len());
        assert_eq!(EmissionsSource::ALL.len(), 123);
        for src in EmissionsSource::ALL {
            assert_eq!(src.code().parse::<EmissionsSource>(), Ok(*src));
        }
        assert!("co2_unobtainium".parse::<EmissionsSource>().is_err());
    }

    #[test]
    fn every_category_is_used() {
        let used: BTreeSet<EmissionsSourceCategory> =
            EmissionsSource::ALL.iter().map(|s| s.category()).collect();
        assert_eq!(used.len(), EmissionsSourceCategory::ALL.len());
    }

    #[test]
    fn attributes_follow_the_catalogue() {
        let s = EmissionsSource::Ch4Landfills;
        assert_eq!(s.gas(), Gas::Ch4);
        assert_eq!(s.category(), EmissionsSourceCategory::Landfills);
        assert_eq!(s.description(), "CH4 Landfills");
        assert_eq!(EmissionsSource::PfcC3f8SemiconductorManufacture.gas(), Gas::C3f8);
    }

    #[test]
    fn serde_uses_codes() {
        let json = serde_json::to_string(&EmissionsSource::Co2CementProduction).unwrap();
        assert_eq!(json, "\"co2_cement_production\"");
        let back: EmissionsSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EmissionsSource::Co2CementProduction);
        assert!(serde_json::from_str::<EmissionsSource>("\"nope\"").is_err());
    }
}
