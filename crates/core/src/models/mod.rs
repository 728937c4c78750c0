//! Shared domain models.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Prefix of every generated vehicle identifier.
pub const ID_PREFIX: &str = "car_";

/// Latest manufacture year accepted on `today`.
pub fn max_year_for(today: NaiveDate) -> i32 {
    today.year() + 1
}

/// Latest manufacture year accepted right now, by the local clock.
pub fn current_max_year() -> i32 {
    max_year_for(Local::now().date_naive())
}

/// A single imported vehicle as stored in the registry and the backing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Unique identifier (`car_<unix nanos>`), assigned on creation.
    pub id: String,
    /// Manufacturer, e.g. `Toyota`.
    #[serde(alias = "marca")]
    pub make: String,
    /// Model name, e.g. `Corolla`.
    #[serde(alias = "modelo")]
    pub model: String,
    /// Year of manufacture.
    #[serde(alias = "ano")]
    pub year: i32,
    /// Paint color; may be empty.
    #[serde(alias = "cor", default)]
    pub color: String,
    /// Price in local currency.
    #[serde(alias = "preco")]
    pub price: f64,
    /// Country the vehicle was imported from.
    #[serde(alias = "pais_origem")]
    pub origin_country: String,
    /// Date the record was created.
    #[serde(alias = "data_cadastro")]
    pub registered_on: NaiveDate,
}

impl VehicleRecord {
    pub(crate) fn from_new(id: String, fields: NewVehicle, registered_on: NaiveDate) -> Self {
        Self {
            id,
            make: fields.make,
            model: fields.model,
            year: fields.year,
            color: fields.color,
            price: fields.price,
            origin_country: fields.origin_country,
            registered_on,
        }
    }

    /// Short `make model` label for user-facing messages.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.make, self.model)
    }

    /// Check a record read back from storage against the field invariants.
    pub(crate) fn check(&self, max_year: i32) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::validation(
                VehicleField::Id,
                "must not be empty",
            ));
        }
        required_text(VehicleField::Make, &self.make)?;
        required_text(VehicleField::Model, &self.model)?;
        required_text(VehicleField::OriginCountry, &self.origin_country)?;
        check_year(self.year, max_year)?;
        check_price(self.price)?;
        Ok(())
    }

    /// Apply the non-blank fields of `update`, keeping the current value for any
    /// field that is absent, blank, or invalid.
    pub(crate) fn apply(&mut self, update: VehicleUpdate, max_year: i32) -> FieldChanges {
        let mut changes = FieldChanges::default();

        apply_text(&mut self.make, update.make, VehicleField::Make, &mut changes, |value| {
            required_text(VehicleField::Make, value)
        });
        apply_text(&mut self.model, update.model, VehicleField::Model, &mut changes, |value| {
            required_text(VehicleField::Model, value)
        });

        if let Some(year) = update.year {
            match check_year(year, max_year) {
                Ok(()) => changes.set(VehicleField::Year, &mut self.year, year),
                Err(err) => changes.reject(err),
            }
        }

        apply_text(&mut self.color, update.color, VehicleField::Color, &mut changes, |value| {
            Ok(value.trim().to_string())
        });

        if let Some(price) = update.price {
            match check_price(price) {
                Ok(()) => changes.set(VehicleField::Price, &mut self.price, price),
                Err(err) => changes.reject(err),
            }
        }

        apply_text(
            &mut self.origin_country,
            update.origin_country,
            VehicleField::OriginCountry,
            &mut changes,
            |value| required_text(VehicleField::OriginCountry, value),
        );

        changes
    }
}

impl fmt::Display for VehicleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | Make: {} | Model: {} | Year: {} | Color: {} | Price: {:.2} | Origin: {} | Registered: {}",
            self.id,
            self.make,
            self.model,
            self.year,
            self.color,
            self.price,
            self.origin_country,
            self.registered_on.format("%Y-%m-%d"),
        )
    }
}

/// Field values supplied when creating a vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    /// Manufacturer; required.
    pub make: String,
    /// Model name; required.
    pub model: String,
    /// Year of manufacture, at most next year.
    pub year: i32,
    /// Paint color; may be empty.
    pub color: String,
    /// Price, strictly positive.
    pub price: f64,
    /// Country of origin; required.
    pub origin_country: String,
}

impl NewVehicle {
    /// Validate every field and return the trimmed values.
    pub fn validated(self, max_year: i32) -> Result<Self> {
        let make = required_text(VehicleField::Make, &self.make)?;
        let model = required_text(VehicleField::Model, &self.model)?;
        check_year(self.year, max_year)?;
        check_price(self.price)?;
        let origin_country = required_text(VehicleField::OriginCountry, &self.origin_country)?;

        Ok(Self {
            make,
            model,
            year: self.year,
            color: self.color.trim().to_string(),
            price: self.price,
            origin_country,
        })
    }
}

/// Partial field set for an update. `None` or a blank string keeps the current value.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleUpdate {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub price: Option<f64>,
    pub origin_country: Option<String>,
}

impl VehicleUpdate {
    /// True when no field would be considered for change.
    pub fn is_empty(&self) -> bool {
        let blank = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());
        blank(&self.make)
            && blank(&self.model)
            && self.year.is_none()
            && blank(&self.color)
            && self.price.is_none()
            && blank(&self.origin_country)
    }
}

/// Names of the fields of a [`VehicleRecord`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleField {
    Id,
    Make,
    Model,
    Year,
    Color,
    Price,
    OriginCountry,
}

impl VehicleField {
    /// Label used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Make => "make",
            Self::Model => "model",
            Self::Year => "year",
            Self::Color => "color",
            Self::Price => "price",
            Self::OriginCountry => "origin country",
        }
    }
}

impl fmt::Display for VehicleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying a [`VehicleUpdate`] to a record.
#[derive(Debug, Default)]
pub(crate) struct FieldChanges {
    /// Fields whose value was overwritten.
    pub changed: Vec<VehicleField>,
    /// Supplied values that were refused; the field kept its old value.
    pub rejected: Vec<RegistryError>,
}

impl FieldChanges {
    fn set<T: PartialEq>(&mut self, field: VehicleField, slot: &mut T, value: T) {
        if *slot != value {
            *slot = value;
            self.changed.push(field);
        }
    }

    fn reject(&mut self, err: RegistryError) {
        self.rejected.push(err);
    }
}

fn apply_text(
    slot: &mut String,
    supplied: Option<String>,
    field: VehicleField,
    changes: &mut FieldChanges,
    validate: impl FnOnce(&str) -> Result<String>,
) {
    let Some(value) = supplied.filter(|value| !value.trim().is_empty()) else {
        return;
    };
    match validate(&value) {
        Ok(value) => changes.set(field, slot, value),
        Err(err) => changes.reject(err),
    }
}

fn required_text(field: VehicleField, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn check_year(year: i32, max_year: i32) -> Result<()> {
    if year <= 0 || year > max_year {
        return Err(RegistryError::validation(
            VehicleField::Year,
            format!("must be between 1 and {max_year}, got {year}"),
        ));
    }
    Ok(())
}

fn check_price(price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(RegistryError::validation(
            VehicleField::Price,
            format!("must be a positive number, got {price}"),
        ));
    }
    Ok(())
}
