use crate::constants::{
    FAULT_CODES, NONCE_ENCODING_TYPE, NS_SOAP_ENV, NS_WSSE, NS_WSU, PASSWORD_DIGEST_TYPE,
};
use crate::error::{Result, SyncError};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use sha1::{Digest, Sha1};

/// A parsed XML element, namespace prefixes dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Depth-first search for the first element with this local name.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

pub fn parse_xml(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    let xml_error =
        |e: quick_xml::Error| SyncError::DeviceProtocolError(format!("Invalid XML: {}", e));

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => stack.push(XmlElement::new(local_name(e.local_name().as_ref()))),
            Event::Empty(e) => {
                let element = XmlElement::new(local_name(e.local_name().as_ref()));
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(SyncError::DeviceProtocolError(
                        "Unbalanced XML end tag".to_string(),
                    ));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SyncError::DeviceProtocolError(
            "Unexpected end of XML document".to_string(),
        ));
    }
    root.ok_or_else(|| SyncError::DeviceProtocolError("Empty XML document".to_string()))
}

/// Human readable description of a SOAP fault, if the envelope carries one.
pub fn fault_message(envelope: &XmlElement) -> Option<String> {
    let fault = envelope.find("Fault")?;

    // SOAP 1.1
    if let Some(text) = fault.child_text("faultstring") {
        let code = fault.child_text("faultcode").unwrap_or("Fault");
        return Some(format!("{}: {}", code, text));
    }

    let reason = fault
        .child("Reason")
        .and_then(|r| r.child_text("Text"))
        .filter(|t| !t.is_empty());

    // Deepest Subcode/Value is the most specific one.
    let mut code = fault.child("Code");
    let mut value = None;
    while let Some(c) = code {
        if let Some(v) = c.child_text("Value") {
            value = Some(v);
        }
        code = c.child("Subcode");
    }
    let value = value.map(|v| v.rsplit(':').next().unwrap_or(v));

    let description = value.and_then(|v| FAULT_CODES.get(v).copied());
    Some(match (value, reason.or(description)) {
        (Some(v), Some(r)) => format!("{}: {}", v, r),
        (Some(v), None) => v.to_string(),
        (None, Some(r)) => r.to_string(),
        (None, None) => "SOAP fault".to_string(),
    })
}

/// Body element of a reply, failing on SOAP faults.
pub fn response_body(xml: &str) -> Result<XmlElement> {
    let envelope = parse_xml(xml)?;
    if let Some(message) = fault_message(&envelope) {
        return Err(SyncError::DeviceProtocolError(message));
    }
    envelope
        .child("Body")
        .cloned()
        .ok_or_else(|| SyncError::DeviceProtocolError("Reply has no SOAP Body".to_string()))
}

/// Base64(SHA1(nonce + created + password))
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// WS-Security UsernameToken with a password digest.
#[derive(Debug, Clone)]
pub struct UsernameToken {
    pub username: String,
    pub digest: String,
    pub nonce: String,
    pub created: String,
}

impl UsernameToken {
    pub fn new(username: &str, password: &str, created: DateTime<Utc>) -> Self {
        let nonce: [u8; 16] = rand::random();
        Self::with_nonce(username, password, created, &nonce)
    }

    pub fn with_nonce(
        username: &str,
        password: &str,
        created: DateTime<Utc>,
        nonce: &[u8],
    ) -> Self {
        let created = created.to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            username: username.to_string(),
            digest: password_digest(nonce, &created, password),
            nonce: STANDARD.encode(nonce),
            created,
        }
    }

    fn header(&self) -> String {
        format!(
            concat!(
                "<wsse:Security s:mustUnderstand=\"1\" xmlns:wsse=\"{wsse}\" xmlns:wsu=\"{wsu}\">",
                "<wsse:UsernameToken>",
                "<wsse:Username>{user}</wsse:Username>",
                "<wsse:Password Type=\"{ptype}\">{digest}</wsse:Password>",
                "<wsse:Nonce EncodingType=\"{ntype}\">{nonce}</wsse:Nonce>",
                "<wsu:Created>{created}</wsu:Created>",
                "</wsse:UsernameToken>",
                "</wsse:Security>"
            ),
            wsse = NS_WSSE,
            wsu = NS_WSU,
            user = escape(self.username.as_str()),
            ptype = PASSWORD_DIGEST_TYPE,
            digest = self.digest,
            ntype = NONCE_ENCODING_TYPE,
            nonce = self.nonce,
            created = self.created,
        )
    }
}

/// Wrap a body fragment in a SOAP 1.2 envelope.
pub fn envelope(token: Option<&UsernameToken>, body: &str) -> String {
    let header = token
        .map(|t| format!("<s:Header>{}</s:Header>", t.header()))
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <s:Envelope xmlns:s=\"{}\">{}<s:Body>{}</s:Body></s:Envelope>",
        NS_SOAP_ENV, header, body
    )
}
