use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zm_onvif_time::types::{DateTimeFields, SetDateTimeRequest};
use zm_onvif_time::{Credentials, DeviceManagement, OnvifCam, SyncError};

const DATE_REPLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope" xmlns:tds="http://www.onvif.org/ver10/device/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema">
<SOAP-ENV:Body><tds:GetSystemDateAndTimeResponse><tds:SystemDateAndTime>
<tt:DateTimeType>Manual</tt:DateTimeType><tt:DaylightSavings>false</tt:DaylightSavings>
<tt:TimeZone><tt:TZ>GMT+00:00</tt:TZ></tt:TimeZone>
<tt:UTCDateTime><tt:Time><tt:Hour>8</tt:Hour><tt:Minute>15</tt:Minute><tt:Second>0</tt:Second></tt:Time>
<tt:Date><tt:Year>2024</tt:Year><tt:Month>7</tt:Month><tt:Day>14</tt:Day></tt:Date></tt:UTCDateTime>
</tds:SystemDateAndTime></tds:GetSystemDateAndTimeResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;

const HOSTNAME_REPLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope" xmlns:tds="http://www.onvif.org/ver10/device/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema">
<env:Body><tds:GetHostnameResponse><tds:HostnameInformation>
<tt:FromDHCP>false</tt:FromDHCP><tt:Name>IPC-porch</tt:Name>
</tds:HostnameInformation></tds:GetHostnameResponse></env:Body></env:Envelope>"#;

const SET_REPLY: &str = r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope" xmlns:tds="http://www.onvif.org/ver10/device/wsdl">
<env:Body><tds:SetSystemDateAndTimeResponse/></env:Body></env:Envelope>"#;

const AUTH_FAULT: &str = r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope" xmlns:ter="http://www.onvif.org/ver10/error">
<env:Body><env:Fault><env:Code><env:Value>env:Sender</env:Value>
<env:Subcode><env:Value>ter:NotAuthorized</env:Value></env:Subcode></env:Code>
<env:Reason><env:Text xml:lang="en">Sender not Authorized</env:Text></env:Reason>
</env:Fault></env:Body></env:Envelope>"#;

fn date_reply(time: DateTime<Utc>) -> String {
    let f = DateTimeFields::from_utc(&time);
    format!(
        concat!(
            r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope" xmlns:tds="http://www.onvif.org/ver10/device/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema">"#,
            "<env:Body><tds:GetSystemDateAndTimeResponse><tds:SystemDateAndTime>",
            "<tt:DateTimeType>Manual</tt:DateTimeType><tt:DaylightSavings>false</tt:DaylightSavings>",
            "<tt:UTCDateTime><tt:Time><tt:Hour>{}</tt:Hour><tt:Minute>{}</tt:Minute><tt:Second>{}</tt:Second></tt:Time>",
            "<tt:Date><tt:Year>{}</tt:Year><tt:Month>{}</tt:Month><tt:Day>{}</tt:Day></tt:Date></tt:UTCDateTime>",
            "</tds:SystemDateAndTime></tds:GetSystemDateAndTimeResponse></env:Body></env:Envelope>"
        ),
        f.hour, f.minute, f.second, f.year, f.month, f.day
    )
}

/// `wsu:Created` of the recorded request whose body contains `marker`.
async fn created_in(server: &MockServer, marker: &str) -> DateTime<Utc> {
    let requests = server.received_requests().await.unwrap();
    let body = requests
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .find(|b| b.contains(marker))
        .unwrap();
    let start = body.find("<wsu:Created>").unwrap() + "<wsu:Created>".len();
    let end = body.find("</wsu:Created>").unwrap();
    DateTime::parse_from_rfc3339(&body[start..end])
        .unwrap()
        .with_timezone(&Utc)
}

async fn mount_clock_camera(server: &MockServer, device_now: DateTime<Utc>) {
    Mock::given(method("POST"))
        .and(body_string_contains("<tds:GetSystemDateAndTime"))
        .respond_with(ResponseTemplate::new(200).set_body_string(date_reply(device_now)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("<tds:SetSystemDateAndTime"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SET_REPLY))
        .expect(1)
        .mount(server)
        .await;
}

fn cam_for(server: &MockServer) -> OnvifCam {
    OnvifCam::new("127.0.0.1", Credentials::new("admin", "secret"))
        .with_port(server.address().port())
}

#[tokio::test]
async fn reads_hostname_and_date_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onvif/device_service"))
        .and(body_string_contains("<tds:GetHostname"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOSTNAME_REPLY))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/onvif/device_service"))
        .and(body_string_contains("<tds:GetSystemDateAndTime"))
        .and(body_string_contains("<wsse:Username>admin</wsse:Username>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DATE_REPLY))
        .expect(1)
        .mount(&server)
        .await;

    let mut cam = cam_for(&server);
    assert_eq!(cam.get_hostname().await.unwrap(), "IPC-porch");

    let reported = cam.get_system_date_and_time().await.unwrap();
    assert_eq!(
        reported.utc().unwrap(),
        Utc.with_ymd_and_hms(2024, 7, 14, 8, 15, 0).unwrap()
    );
}

#[tokio::test]
async fn writes_manual_date_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onvif/device_service"))
        .and(body_string_contains("<tds:SetSystemDateAndTime"))
        .and(body_string_contains("<tds:DateTimeType>Manual</tds:DateTimeType>"))
        .and(body_string_contains("<tt:TZ>GMT+02:00</tt:TZ>"))
        .and(body_string_contains("<tt:Year>2025</tt:Year>"))
        .and(body_string_contains("<tt:Hour>23</tt:Hour>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SET_REPLY))
        .expect(1)
        .mount(&server)
        .await;

    let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 30).unwrap();
    let mut cam = cam_for(&server);
    cam.set_system_date_and_time(&SetDateTimeRequest::manual("GMT+02:00", &now))
        .await
        .unwrap();
}

#[tokio::test]
async fn soap_fault_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onvif/device_service"))
        .respond_with(ResponseTemplate::new(400).set_body_string(AUTH_FAULT))
        .mount(&server)
        .await;

    let err = cam_for(&server)
        .get_system_date_and_time()
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::DeviceProtocolError(_)), "{err}");
    assert!(err.to_string().contains("NotAuthorized"), "{err}");
}

#[tokio::test]
async fn http_error_without_fault_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = cam_for(&server).get_hostname().await.unwrap_err();
    assert!(matches!(err, SyncError::DeviceProtocolError(_)), "{err}");
    assert!(err.to_string().contains("401"), "{err}");
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let server = MockServer::start().await;
    let mut cam = cam_for(&server);
    drop(server);

    let err = cam.get_system_date_and_time().await.unwrap_err();
    assert!(matches!(err, SyncError::DeviceUnreachable(_)), "{err}");
}

#[tokio::test]
async fn time_adjust_signs_with_the_device_clock() {
    let server = MockServer::start().await;
    mount_clock_camera(&server, Utc::now() + TimeDelta::hours(1)).await;

    let mut cam = cam_for(&server).with_time_adjust(true);
    cam.get_system_date_and_time().await.unwrap();
    cam.set_system_date_and_time(&SetDateTimeRequest::manual("GMT+00:00", &Utc::now()))
        .await
        .unwrap();

    let skew = created_in(&server, "<tds:SetSystemDateAndTime").await - Utc::now();
    assert!(
        (skew - TimeDelta::hours(1)).num_seconds().abs() < 60,
        "Created skew was {}s",
        skew.num_seconds()
    );
}

#[tokio::test]
async fn without_time_adjust_tokens_use_the_local_clock() {
    let server = MockServer::start().await;
    mount_clock_camera(&server, Utc::now() + TimeDelta::hours(1)).await;

    let mut cam = cam_for(&server);
    cam.get_system_date_and_time().await.unwrap();
    cam.set_system_date_and_time(&SetDateTimeRequest::manual("GMT+00:00", &Utc::now()))
        .await
        .unwrap();

    let skew = created_in(&server, "<tds:SetSystemDateAndTime").await - Utc::now();
    assert!(skew.num_seconds().abs() < 60, "Created skew was {}s", skew.num_seconds());
}
