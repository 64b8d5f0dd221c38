use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::WxError;

/// One location as returned by the lookup endpoint.
///
/// The per-day sequences are parallel and indexed by day offset. Their lengths
/// are expected to match but nothing here enforces it. Elements stay raw JSON
/// so a `null` day survives parsing and numbers are forwarded as received.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub address: String,

    /// Required, but the backend answers `null` when it cannot place the
    /// coordinates in a country.
    #[serde(deserialize_with = "null_as_empty")]
    pub country: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_day: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_night: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<Vec<Value>>,

    /// Anything else the backend sent (`resolvedAddress`, ...), kept so the
    /// store action forwards the response as received.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A successful lookup: never empty.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct Forecast {
    records: Vec<ForecastRecord>,
}

impl Forecast {
    pub fn new(records: Vec<ForecastRecord>) -> Result<Self, WxError> {
        if records.is_empty() {
            return Err(WxError::EmptyResult);
        }
        Ok(Self { records })
    }

    /// Element 0, the location the view is labelled with.
    pub fn primary(&self) -> &ForecastRecord {
        // non-empty by construction
        &self.records[0]
    }

    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    pub fn location(&self) -> ResolvedLocation {
        let primary = self.primary();
        ResolvedLocation {
            city: primary.address.clone(),
            country: primary.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ForecastResult {
    /// No search has completed yet.
    #[default]
    Empty,
    /// The last search failed.
    Error,
    Data(Forecast),
}

impl ForecastResult {
    /// The (city, country) pair belonging to this result.
    ///
    /// `None` until a search has completed; cleared labels after a failure.
    pub fn location(&self) -> Option<ResolvedLocation> {
        match self {
            ForecastResult::Empty => None,
            ForecastResult::Error => Some(ResolvedLocation::default()),
            ForecastResult::Data(forecast) => Some(forecast.location()),
        }
    }

    pub fn as_data(&self) -> Option<&Forecast> {
        match self {
            ForecastResult::Data(forecast) => Some(forecast),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub city: String,
    pub country: String,
}

/// Body posted to the store endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorePayload {
    pub city: String,
    pub country: String,
    pub daily_weather: Forecast,
    pub timestamp: String,
}

impl StorePayload {
    pub fn new(forecast: &Forecast, at: DateTime<Utc>) -> Self {
        let location = forecast.location();
        Self {
            city: location.city,
            country: location.country,
            daily_weather: forecast.clone(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StoreReceipt {
    #[serde(default)]
    pub message: Option<String>,
}
