use std::collections::BTreeMap;
use std::io::Read;

use portal_core::calculations::{BracketError, validate_brackets};
use portal_core::db::BracketRepository;
use portal_core::validation::{parse_amount, validate_guild_id};
use portal_core::{RepositoryError, TaxBracket};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading tax bracket data.
#[derive(Debug, Error)]
pub enum BracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid guild id: {0}")]
    InvalidGuild(String),

    #[error("Invalid bracket table: {0}")]
    InvalidBrackets(#[from] BracketError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for BracketLoaderError {
    fn from(err: csv::Error) -> Self {
        BracketLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the bracket CSV file.
///
/// Columns, in order: `guild_id`, `min_profit`, `max_profit`, `tax_rate`
/// (a fraction, e.g. `0.15`), `max_employee_salary`, `max_boss_salary`,
/// `max_employee_bonus`, `max_boss_bonus`. Amounts may carry thousands
/// separators.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub guild_id: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub min_profit: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub max_profit: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub tax_rate: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub max_employee_salary: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub max_boss_salary: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub max_employee_bonus: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub max_boss_bonus: Decimal,
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_amount("amount", &s).map_err(serde::de::Error::custom)
}

impl From<&BracketRecord> for TaxBracket {
    fn from(record: &BracketRecord) -> Self {
        TaxBracket {
            guild_id: record.guild_id.trim().to_string(),
            min_profit: record.min_profit,
            max_profit: record.max_profit,
            tax_rate: record.tax_rate,
            max_employee_salary: record.max_employee_salary,
            max_boss_salary: record.max_boss_salary,
            max_employee_bonus: record.max_employee_bonus,
            max_boss_bonus: record.max_boss_bonus,
        }
    }
}

/// Loader for bracket tables from CSV files.
///
/// Works through [`BracketRepository`], so any backend can be loaded.
pub struct BracketLoader;

impl BracketLoader {
    /// Parse bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<BracketRecord>, BracketLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: BracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Replace each guild's bracket table with the given records.
    ///
    /// Every guild id and the whole table are validated before anything is
    /// written. Then, per guild, existing brackets are deleted and the new
    /// ones inserted, so loading the same file twice gives the same result.
    /// Returns the number of brackets inserted.
    pub async fn load<R>(repo: &R, records: &[BracketRecord]) -> Result<usize, BracketLoaderError>
    where
        R: BracketRepository + ?Sized,
    {
        let mut by_guild: BTreeMap<String, Vec<TaxBracket>> = BTreeMap::new();
        for record in records {
            let bracket = TaxBracket::from(record);
            validate_guild_id(&bracket.guild_id)
                .map_err(|_| BracketLoaderError::InvalidGuild(bracket.guild_id.clone()))?;
            by_guild
                .entry(bracket.guild_id.clone())
                .or_default()
                .push(bracket);
        }

        for brackets in by_guild.values() {
            validate_brackets(brackets)?;
        }

        let mut inserted = 0;
        for (guild_id, brackets) in &by_guild {
            repo.delete_tax_brackets(guild_id).await?;
            for bracket in brackets {
                repo.insert_tax_bracket(bracket).await?;
                inserted += 1;
            }
            info!(guild_id = %guild_id, brackets = brackets.len(), "replaced bracket table");
        }

        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const HEADER: &str = "guild_id,min_profit,max_profit,tax_rate,max_employee_salary,max_boss_salary,max_employee_bonus,max_boss_bonus";

    #[test]
    fn test_parse_csv_single_bracket() {
        let csv = format!("{HEADER}\n112233445566778899,0,49999,0.05,3000,5000,500,1000");

        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(
            records,
            vec![BracketRecord {
                guild_id: "112233445566778899".to_string(),
                min_profit: dec!(0),
                max_profit: dec!(49999),
                tax_rate: dec!(0.05),
                max_employee_salary: dec!(3000),
                max_boss_salary: dec!(5000),
                max_employee_bonus: dec!(500),
                max_boss_bonus: dec!(1000),
            }]
        );
    }

    #[test]
    fn test_parse_csv_thousands_separators() {
        let csv = format!(
            "{HEADER}\n112233445566778899,\"250,000\",\"1,000,000\",0.20,\"6 500\",10000,1500,3000"
        );

        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records[0].min_profit, dec!(250000));
        assert_eq!(records[0].max_profit, dec!(1000000));
        assert_eq!(records[0].max_employee_salary, dec!(6500));
    }

    #[test]
    fn test_parse_csv_invalid_amount() {
        let csv = format!("{HEADER}\n112233445566778899,zero,49999,0.05,3000,5000,500,1000");

        let result = BracketLoader::parse(csv.as_bytes());

        assert!(matches!(result, Err(BracketLoaderError::CsvParse(msg)) if msg.contains("amount must be a number")));
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let csv = "guild_id,min_profit\n112233445566778899,0";

        let result = BracketLoader::parse(csv.as_bytes());

        assert!(matches!(result, Err(BracketLoaderError::CsvParse(_))));
    }

    #[test]
    fn test_parse_csv_header_only() {
        let records = BracketLoader::parse(HEADER.as_bytes()).expect("Failed to parse CSV");

        assert!(records.is_empty());
    }

    #[test]
    fn test_record_to_bracket_trims_guild() {
        let csv = format!("{HEADER}\n 112233445566778899 ,0,49999,0.05,3000,5000,500,1000");
        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        let bracket = TaxBracket::from(&records[0]);

        assert_eq!(bracket.guild_id, "112233445566778899");
        assert_eq!(bracket.max_boss_bonus, dec!(1000));
    }
}
