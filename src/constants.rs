use phf::phf_map;

/// ONVIF fault subcodes (local part, prefix stripped) and their meaning.
pub static FAULT_CODES: phf::Map<&'static str, &'static str> = phf_map! {
    "NotAuthorized" => "Sender not authorized",
    "FailedAuthentication" => "Username token rejected",
    "ActionNotSupported" => "Action not supported by the device",
    "InvalidArgVal" => "Invalid argument value",
    "InvalidArgs" => "Invalid arguments",
    "InvalidTimeZone" => "The suggested timezone is unknown",
    "InvalidDateTime" => "An invalid date or time was specified",
    "NtpServerUndefined" => "Cannot switch to NTP, no NTP server is defined",
    "InvalidDateTimeType" => "Unsupported date/time type",
};

pub const DEVICE_PORT: u16 = 80;
pub const DEVICE_SERVICE_PATH: &str = "/onvif/device_service";
pub const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 10;

/// Clock discrepancies strictly below this many seconds are left alone.
pub const TOLERANCE_SECS: i64 = 60;

/// Exit status for aborted runs; failure counts are clamped below it.
pub const FATAL_EXIT_CODE: i32 = 255;
pub const MAX_FAILURE_EXIT_CODE: i32 = 254;

pub const INVENTORY_PATH: &str = "monitors.json";

pub const ENV_ZM_API_URL: &str = "ZM_API_URL";
pub const ENV_ONVIF_USERNAME: &str = "ONVIF_USERNAME";
pub const ENV_ONVIF_PASSWORD: &str = "ONVIF_PASSWORD";

pub const NS_SOAP_ENV: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const NS_DEVICE: &str = "http://www.onvif.org/ver10/device/wsdl";
pub const NS_SCHEMA: &str = "http://www.onvif.org/ver10/schema";
pub const NS_WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const NS_WSU: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
pub const PASSWORD_DIGEST_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
pub const NONCE_ENCODING_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-soap-message-security-1.0#Base64Binary";
