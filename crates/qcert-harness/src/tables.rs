//! Reference tables the battery runs against
//!
//! Table names are configurable; the column layout is not. Each builder
//! returns the schema an adapter must report for that table.

use qcert_core::{DataType, DefaultValue, FieldDescriptor, Schema};
use serde::{Deserialize, Serialize};

/// Names of the five reference tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub car: String,
    pub owner: String,
    pub dealer: String,
    pub car_owner: String,
    pub car_dealer: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            car: "Car".to_string(),
            owner: "Owner".to_string(),
            dealer: "Dealer".to_string(),
            car_owner: "CarOwner".to_string(),
            car_dealer: "CarDealer".to_string(),
        }
    }
}

impl TableNames {
    /// Every table with its expected schema, in creation order
    pub fn schemas(&self) -> Vec<(String, Schema)> {
        vec![
            (self.car.clone(), car_schema(&self.car)),
            (self.owner.clone(), owner_schema(&self.owner)),
            (self.dealer.clone(), dealer_schema(&self.dealer)),
            (self.car_owner.clone(), car_owner_schema(&self.car_owner)),
            (self.car_dealer.clone(), car_dealer_schema(&self.car_dealer)),
        ]
    }

    pub fn names(&self) -> [&str; 5] {
        [
            &self.car,
            &self.owner,
            &self.dealer,
            &self.car_owner,
            &self.car_dealer,
        ]
    }
}

pub fn car_schema(table: &str) -> Schema {
    Schema::new()
        .with(FieldDescriptor::new(table, "Id", DataType::Int).primary().identity())
        .with(FieldDescriptor::new(table, "Make", DataType::varchar(20)))
        .with(FieldDescriptor::new(table, "Model", DataType::varchar(20)))
        .with(FieldDescriptor::new(table, "Year", DataType::Int))
        .with(FieldDescriptor::new(table, "Mileage", DataType::Int))
        .with(FieldDescriptor::new(table, "MPGCity", DataType::Float).nullable())
        .with(FieldDescriptor::new(table, "MPGHwy", DataType::Float).nullable())
        .with(
            FieldDescriptor::new(table, "DateCreated", DataType::DateTime)
                .nullable()
                .default_value(DefaultValue::CurrentTimestamp),
        )
        .with(FieldDescriptor::new(table, "DateModified", DataType::DateTime).nullable())
}

pub fn owner_schema(table: &str) -> Schema {
    Schema::new()
        .with(FieldDescriptor::new(table, "Id", DataType::Int).primary())
        .with(FieldDescriptor::new(table, "FirstName", DataType::varchar(20)))
        .with(FieldDescriptor::new(table, "LastName", DataType::varchar(20)))
        .with(FieldDescriptor::new(table, "DateOfBirth", DataType::DateTime).nullable())
}

pub fn dealer_schema(table: &str) -> Schema {
    Schema::new()
        .with(FieldDescriptor::new(table, "Id", DataType::varchar(32)).primary())
        .with(FieldDescriptor::new(table, "Name", DataType::varchar(20)))
}

pub fn car_owner_schema(table: &str) -> Schema {
    Schema::new()
        .with(FieldDescriptor::new(table, "CarId", DataType::Int).primary())
        .with(FieldDescriptor::new(table, "OwnerId", DataType::Int).primary())
}

pub fn car_dealer_schema(table: &str) -> Schema {
    Schema::new()
        .with(FieldDescriptor::new(table, "CarId", DataType::Int).primary())
        .with(FieldDescriptor::new(table, "DealerId", DataType::varchar(36)).primary())
}
