use crate::constants::{NS_DEVICE, NS_SCHEMA};
use crate::error::{Result, SyncError};
use crate::onvif::OnvifCam;
use crate::protocol::XmlElement;
use crate::types::{DateTimeFields, DateTimeType, SetDateTimeRequest, SystemDateAndTime, TimeZone};
use async_trait::async_trait;
use chrono::Utc;
use std::str::FromStr;

#[async_trait]
pub trait DeviceManagement: Send + Sync {
    /// Get the device's configured hostname
    async fn get_hostname(&mut self) -> Result<String>;

    /// Get the device's system date and time
    async fn get_system_date_and_time(&mut self) -> Result<SystemDateAndTime>;

    /// Set the device's system date, time and timezone
    async fn set_system_date_and_time(&mut self, request: &SetDateTimeRequest) -> Result<()>;
}

fn missing(what: &str) -> SyncError {
    SyncError::DeviceProtocolError(format!("Reply is missing {}", what))
}

fn number<T: FromStr>(element: &XmlElement, name: &str) -> Result<T> {
    let text = element.child_text(name).ok_or_else(|| missing(name))?;
    text.parse()
        .map_err(|_| SyncError::DeviceProtocolError(format!("Invalid {} '{}'", name, text)))
}

fn parse_date_time(element: &XmlElement) -> Result<DateTimeFields> {
    let date = element.child("Date").ok_or_else(|| missing("Date"))?;
    let time = element.child("Time").ok_or_else(|| missing("Time"))?;
    Ok(DateTimeFields {
        year: number(date, "Year")?,
        month: number(date, "Month")?,
        day: number(date, "Day")?,
        hour: number(time, "Hour")?,
        minute: number(time, "Minute")?,
        second: number(time, "Second")?,
    })
}

pub(crate) fn parse_system_date_and_time(body: &XmlElement) -> Result<SystemDateAndTime> {
    let sdt = body
        .find("GetSystemDateAndTimeResponse")
        .and_then(|r| r.child("SystemDateAndTime"))
        .ok_or_else(|| missing("SystemDateAndTime"))?;

    Ok(SystemDateAndTime {
        date_time_type: sdt
            .child_text("DateTimeType")
            .and_then(|t| DateTimeType::from_str(t).ok()),
        daylight_savings: sdt
            .child_text("DaylightSavings")
            .is_some_and(|v| v == "true" || v == "1"),
        time_zone: sdt
            .child("TimeZone")
            .and_then(|tz| tz.child_text("TZ"))
            .map(|tz| TimeZone { tz: tz.to_string() }),
        utc_date_time: sdt.child("UTCDateTime").map(parse_date_time).transpose()?,
        local_date_time: sdt.child("LocalDateTime").map(parse_date_time).transpose()?,
    })
}

pub(crate) fn set_system_date_and_time_body(request: &SetDateTimeRequest) -> String {
    let utc = &request.utc_date_time;
    format!(
        concat!(
            "<tds:SetSystemDateAndTime xmlns:tds=\"{tds}\" xmlns:tt=\"{tt}\">",
            "<tds:DateTimeType>{kind}</tds:DateTimeType>",
            "<tds:DaylightSavings>{dst}</tds:DaylightSavings>",
            "<tds:TimeZone><tt:TZ>{tz}</tt:TZ></tds:TimeZone>",
            "<tds:UTCDateTime>",
            "<tt:Time><tt:Hour>{hour}</tt:Hour><tt:Minute>{minute}</tt:Minute><tt:Second>{second}</tt:Second></tt:Time>",
            "<tt:Date><tt:Year>{year}</tt:Year><tt:Month>{month}</tt:Month><tt:Day>{day}</tt:Day></tt:Date>",
            "</tds:UTCDateTime>",
            "</tds:SetSystemDateAndTime>"
        ),
        tds = NS_DEVICE,
        tt = NS_SCHEMA,
        kind = request.date_time_type.as_ref(),
        dst = request.daylight_savings,
        tz = quick_xml::escape::escape(request.time_zone.tz.as_str()),
        hour = utc.hour,
        minute = utc.minute,
        second = utc.second,
        year = utc.year,
        month = utc.month,
        day = utc.day,
    )
}

#[async_trait]
impl DeviceManagement for OnvifCam {
    async fn get_hostname(&mut self) -> Result<String> {
        let body = self
            .send_request(
                "GetHostname",
                &format!("<tds:GetHostname xmlns:tds=\"{}\"/>", NS_DEVICE),
            )
            .await?;
        let info = body
            .find("HostnameInformation")
            .ok_or_else(|| missing("HostnameInformation"))?;
        Ok(info.child_text("Name").unwrap_or_default().to_string())
    }

    async fn get_system_date_and_time(&mut self) -> Result<SystemDateAndTime> {
        let body = self
            .send_request(
                "GetSystemDateAndTime",
                &format!("<tds:GetSystemDateAndTime xmlns:tds=\"{}\"/>", NS_DEVICE),
            )
            .await?;
        let reply = parse_system_date_and_time(&body)?;
        if let Some(fields) = reply.utc_date_time
            && let Ok(device_now) = fields.to_utc()
        {
            self.record_device_time(device_now - Utc::now());
        }
        Ok(reply)
    }

    async fn set_system_date_and_time(&mut self, request: &SetDateTimeRequest) -> Result<()> {
        let body = self
            .send_request(
                "SetSystemDateAndTime",
                &set_system_date_and_time_body(request),
            )
            .await?;
        body.find("SetSystemDateAndTimeResponse")
            .ok_or_else(|| missing("SetSystemDateAndTimeResponse"))?;
        Ok(())
    }
}
