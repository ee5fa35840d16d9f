use std::collections::BTreeMap;

use serde::Deserialize;

use crate::allocate::AllocationRule;
use crate::error::EmissionsError;

// ---------------------------------------------------------------------------
// Config types (deserialized from TOML)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub name: String,
    /// Relative drift allowed between an allocated total and the reference
    /// inventory.
    #[serde(default = "default_inventory_tolerance")]
    pub inventory_tolerance: f64,
    #[serde(default)]
    pub inputs: Option<RegistryInputs>,
    #[serde(default)]
    pub output: RegistryOutput,
    /// Source code → replacement rule. Codes outside the catalogue are
    /// orphaned allocators and rejected when the registry is assembled.
    #[serde(default)]
    pub overrides: BTreeMap<String, AllocationRule>,
}

fn default_inventory_tolerance() -> f64 {
    0.05
}

/// CSV paths, relative to the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryInputs {
    /// `code,label` rows of the sector taxonomy.
    pub sectors: String,
    /// `source,total` rows.
    pub inventory: String,
    #[serde(default)]
    pub gross_output: Option<String>,
    /// Commodity × sector use table.
    #[serde(default)]
    pub commodity_use: Option<String>,
    /// `source,total` rows from an independent inventory release.
    #[serde(default)]
    pub reference_by_source: Option<String>,
    /// `gas,total` national totals.
    #[serde(default)]
    pub reference_by_gas: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryOutput {
    /// Source × sector matrix.
    #[serde(default)]
    pub matrix: Option<String>,
    /// Gas × sector matrix.
    #[serde(default)]
    pub by_gas: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RegistryConfig {
    pub fn from_toml(input: &str) -> Result<Self, EmissionsError> {
        let config: RegistryConfig =
            toml::from_str(input).map_err(|e| EmissionsError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EmissionsError> {
        if self.name.trim().is_empty() {
            return Err(EmissionsError::ConfigValidation("name must not be empty".into()));
        }
        let t = self.inventory_tolerance;
        if !t.is_finite() || t <= 0.0 || t > 1.0 {
            return Err(EmissionsError::ConfigValidation(format!(
                "inventory_tolerance must be in (0, 1], got {t}"
            )));
        }
        for (code, rule) in &self.overrides {
            if let AllocationRule::Sectors { sectors, .. } = rule {
                if sectors.is_empty() {
                    return Err(EmissionsError::ConfigValidation(format!(
                        "overrides.{code}: sectors must not be empty"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocate::WeightKey;

    const VALID: &str = r#"
name = "ceda-2022"

[inputs]
sectors = "sectors.csv"
inventory = "inventory.csv"
gross_output = "gross_output.csv"

[output]
matrix = "out/emissions.csv"

[overrides.co2_cement_production]
rule = "sectors"
sectors = ["327310", "327320"]
key = "gross_output"
"#;

    #[test]
    fn parses_with_defaults() {
        let c = RegistryConfig::from_toml(VALID).unwrap();
        assert_eq!(c.inventory_tolerance, 0.05);
        assert_eq!(c.inputs.as_ref().unwrap().commodity_use, None);
        assert_eq!(c.inputs.as_ref().unwrap().reference_by_gas, None);
        assert_eq!(c.output.matrix.as_deref(), Some("out/emissions.csv"));
        assert_eq!(
            c.overrides["co2_cement_production"],
            AllocationRule::sectors(["327310", "327320"], WeightKey::GrossOutput)
        );
    }

    #[test]
    fn rejects_out_of_range_tolerance() {
        let input = format!("inventory_tolerance = 1.5\n{VALID}");
        let err = RegistryConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, EmissionsError::ConfigValidation(_)));
    }

    #[test]
    fn rejects_empty_sector_list() {
        let input = VALID.replace(r#"sectors = ["327310", "327320"]"#, "sectors = []");
        let err = RegistryConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("co2_cement_production"));
    }

    #[test]
    fn unknown_rule_is_a_parse_error() {
        let input = VALID.replace(r#"rule = "sectors""#, r#"rule = "guess""#);
        assert!(matches!(
            RegistryConfig::from_toml(&input).unwrap_err(),
            EmissionsError::ConfigParse(_)
        ));
    }
}
