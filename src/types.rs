use crate::error::{Result, SyncError};
use chrono::{DateTime, Datelike, TimeZone as _, Timelike, Utc};
use serde::Serialize;
use strum_macros::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString, Serialize)]
pub enum DateTimeType {
    Manual,
    NTP,
}

/// Calendar fields as carried by the device-management protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DateTimeFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DateTimeFields {
    pub fn from_utc(time: &DateTime<Utc>) -> Self {
        Self {
            year: time.year(),
            month: time.month(),
            day: time.day(),
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
        }
    }

    /// Interpret the fields as a UTC instant.
    pub fn to_utc(&self) -> Result<DateTime<Utc>> {
        Utc.with_ymd_and_hms(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
        .single()
        .ok_or_else(|| {
            SyncError::DeviceProtocolError(format!("Invalid date/time reported: {:?}", self))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeZone {
    #[serde(rename = "TZ")]
    pub tz: String,
}

/// Reply of `GetSystemDateAndTime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDateAndTime {
    pub date_time_type: Option<DateTimeType>,
    pub daylight_savings: bool,
    pub time_zone: Option<TimeZone>,
    pub utc_date_time: Option<DateTimeFields>,
    pub local_date_time: Option<DateTimeFields>,
}

impl SystemDateAndTime {
    pub fn utc(&self) -> Result<DateTime<Utc>> {
        self.utc_date_time
            .as_ref()
            .ok_or_else(|| {
                SyncError::DeviceProtocolError("Device did not report UTCDateTime".to_string())
            })?
            .to_utc()
    }
}

/// Payload of `SetSystemDateAndTime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetDateTimeRequest {
    pub date_time_type: DateTimeType,
    pub daylight_savings: bool,
    pub time_zone: TimeZone,
    #[serde(rename = "UTCDateTime")]
    pub utc_date_time: DateTimeFields,
}

impl SetDateTimeRequest {
    /// Manual mode, no daylight savings, the given zone label and UTC instant.
    pub fn manual(tz: impl Into<String>, now: &DateTime<Utc>) -> Self {
        Self {
            date_time_type: DateTimeType::Manual,
            daylight_savings: false,
            time_zone: TimeZone { tz: tz.into() },
            utc_date_time: DateTimeFields::from_utc(now),
        }
    }
}
