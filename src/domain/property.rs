// src/domain/property.rs

use std::borrow::Cow;

use super::value::Value;
use rusqlite::Row;

/// One row of the property table.
///
/// Fields hold whatever the source cell holds. SQLite only records a type
/// per value, so a half bath in `bathrooms` or a text `last_sale_year` is
/// carried across untouched; nothing is cleaned up on the way through.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct PropertyRecord {
    pub address: Value,
    pub parcel_id: Value,
    pub county: Value,
    pub total_appraised_value: Value,
    pub land_appraised_value: Value,
    pub building_appraised_value: Value,
    pub bedrooms: Value,
    pub bathrooms: Value,
    pub sqft: Value,
    pub acres: Value,
    pub last_sale_year: Value,
    pub last_sale_price: Value,
    pub coordinates: Value,
}

impl PropertyRecord {
    /// Column names in positional order. `from_row` and `to_args` follow this order.
    pub const COLUMNS: [&'static str; 13] = [
        "address",
        "parcel_id",
        "county",
        "total_appraised_value",
        "land_appraised_value",
        "building_appraised_value",
        "bedrooms",
        "bathrooms",
        "sqft",
        "acres",
        "last_sale_year",
        "last_sale_price",
        "coordinates",
    ];

    /// Maps a row selected with `COLUMNS` in order. Never fails on a
    /// storage class that differs from the declared column type.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let cell = |i: usize| row.get_ref(i).map(Value::from);

        Ok(PropertyRecord {
            address: cell(0)?,
            parcel_id: cell(1)?,
            county: cell(2)?,
            total_appraised_value: cell(3)?,
            land_appraised_value: cell(4)?,
            building_appraised_value: cell(5)?,
            bedrooms: cell(6)?,
            bathrooms: cell(7)?,
            sqft: cell(8)?,
            acres: cell(9)?,
            last_sale_year: cell(10)?,
            last_sale_price: cell(11)?,
            coordinates: cell(12)?,
        })
    }

    /// Statement arguments, one per column, in `COLUMNS` order.
    pub fn to_args(&self) -> Vec<Value> {
        vec![
            self.address.clone(),
            self.parcel_id.clone(),
            self.county.clone(),
            self.total_appraised_value.clone(),
            self.land_appraised_value.clone(),
            self.building_appraised_value.clone(),
            self.bedrooms.clone(),
            self.bathrooms.clone(),
            self.sqft.clone(),
            self.acres.clone(),
            self.last_sale_year.clone(),
            self.last_sale_price.clone(),
            self.coordinates.clone(),
        ]
    }

    /// The address as printed in progress lines.
    pub fn display_address(&self) -> Cow<'_, str> {
        match &self.address {
            Value::Null => Cow::Borrowed("<no address>"),
            Value::Text(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// The address for error reports, `None` when the cell is NULL.
    pub fn address_text(&self) -> Option<String> {
        match &self.address {
            Value::Null => None,
            _ => Some(self.display_address().into_owned()),
        }
    }
}
