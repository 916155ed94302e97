use crate::error::FormatError;
use crate::query_type::QueryType;
use crate::response_code::ResponseCode;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

impl Serialize for QueryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_num())
    }
}

impl<'de> Deserialize<'de> for QueryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        QueryType::from_num(raw)
            .ok_or_else(|| D::Error::custom(invalid_value_text("dns.qry.type", raw)))
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_num())
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        ResponseCode::from_num(raw)
            .ok_or_else(|| D::Error::custom(invalid_value_text("dns.flags.rcode", raw)))
    }
}

/// Error text for a field value outside its closed set. [`Message::parse`]
/// recognizes this exact shape to recover a [`FormatError::InvalidValue`]
/// from the opaque string `serde_json` reports.
fn invalid_value_text(field: &'static str, raw: u8) -> String {
    format!("invalid value {raw} for field \"{field}\"")
}

/// Recovers a [`FormatError::InvalidValue`] from `serde_json`'s error text
/// when it was raised by [`invalid_value_text`], or `None` otherwise.
fn parse_invalid_value(text: &str) -> Option<FormatError> {
    const FIELDS: [&str; 2] = ["dns.qry.type", "dns.flags.rcode"];
    let rest = text.strip_prefix("invalid value ")?;
    let (value, rest) = rest.split_once(" for field \"")?;
    let value: i64 = value.parse().ok()?;
    let field = FIELDS.into_iter().find(|field| rest.starts_with(field))?;
    Some(FormatError::InvalidValue { field, value })
}

/// The attribute bag wire format from §3/§4.1. Every field is optional and,
/// when present in JSON, is either its value or explicit `null` — there is
/// no "missing key" state once a `Message` has gone through [`Message::build`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    #[serde(rename = "dns.qry.name", default)]
    pub qry_name: Option<String>,
    #[serde(rename = "dns.qry.type", default)]
    pub qry_type: Option<QueryType>,
    #[serde(rename = "dns.flags.recdesired", default)]
    pub recdesired: Option<bool>,
    #[serde(rename = "dns.flags.response", default)]
    pub response: Option<bool>,
    #[serde(rename = "dns.flags.authoritative", default)]
    pub authoritative: Option<bool>,
    #[serde(rename = "dns.flags.rcode", default)]
    pub rcode: Option<ResponseCode>,
    #[serde(rename = "dns.a", default)]
    pub a: Option<String>,
    #[serde(rename = "dns.ns", default)]
    pub ns: Option<String>,
    #[serde(rename = "dns.count.answers", default)]
    pub count_answers: Option<u32>,
    #[serde(rename = "dns.resp.ttl", default)]
    pub resp_ttl: Option<u32>,
}

/// Optional parameters for [`Message::set_resp`], defaults per §4.1.
#[derive(Debug, Clone)]
pub struct ResponseParams {
    pub answers: u32,
    pub authoritative: bool,
    pub positive_rcode: bool,
    pub ttl: u32,
    pub ns: Option<String>,
}

impl Default for ResponseParams {
    fn default() -> Self {
        Self {
            answers: 1,
            authoritative: true,
            positive_rcode: true,
            ttl: 0,
            ns: None,
        }
    }
}

impl Message {
    /// Overwrites only the fields of `self` that are `Some(..)` in `other`.
    fn overlay(&mut self, other: Message) {
        macro_rules! overlay_field {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        overlay_field!(qry_name);
        overlay_field!(qry_type);
        overlay_field!(recdesired);
        overlay_field!(response);
        overlay_field!(authoritative);
        overlay_field!(rcode);
        overlay_field!(a);
        overlay_field!(ns);
        overlay_field!(count_answers);
        overlay_field!(resp_ttl);
    }

    /// Constructs with request defaults (§4.1): `recdesired=false`,
    /// `qry.name="root"`, `qry.type=NS`. Fields present in `overrides` take
    /// precedence.
    pub fn new_request(overrides: Option<Message>) -> Self {
        let mut msg = Self {
            qry_name: Some("root".to_string()),
            qry_type: Some(QueryType::NS),
            recdesired: Some(false),
            ..Default::default()
        };
        if let Some(overrides) = overrides {
            msg.overlay(overrides);
        }
        msg
    }

    /// Constructs with response defaults (§4.1).
    pub fn new_response(overrides: Option<Message>) -> Self {
        let mut msg = Self {
            a: Some(String::new()),
            count_answers: Some(0),
            authoritative: Some(true),
            rcode: Some(ResponseCode::NxDomain),
            response: Some(false),
            ns: None,
            resp_ttl: Some(0),
            ..Default::default()
        };
        if let Some(overrides) = overrides {
            msg.overlay(overrides);
        }
        msg
    }

    /// `qry.type = 1 + (as_ns_record ? 1 : 0)`: `false` → A(1), `true` → NS(2).
    /// `recursion_desired` is applied only when `Some`.
    pub fn set_req(&mut self, name: &str, as_ns_record: bool, recursion_desired: Option<bool>) {
        self.qry_name = Some(name.to_string());
        self.qry_type = Some(if as_ns_record { QueryType::NS } else { QueryType::A });
        if let Some(rd) = recursion_desired {
            self.recdesired = Some(rd);
        }
    }

    pub fn set_resp(&mut self, address: &str, params: ResponseParams) {
        self.a = Some(address.to_string());
        self.count_answers = Some(params.answers);
        self.authoritative = Some(params.authoritative);
        if params.positive_rcode {
            self.rcode = Some(ResponseCode::NoError);
        }
        self.resp_ttl = Some(params.ttl);
        self.ns = params.ns;
    }

    /// Equivalent to `set_resp("", answers=0, positive_rcode=false,
    /// authoritative=authoritative)`; leaves `rcode` at whatever it already
    /// was (the `NXDOMAIN` default from [`Message::new_response`]).
    pub fn set_empty_resp(&mut self, authoritative: bool) {
        self.set_resp(
            "",
            ResponseParams {
                answers: 0,
                authoritative,
                positive_rcode: false,
                ttl: 0,
                ns: None,
            },
        );
    }

    /// Deterministic encoding: field order is irrelevant, but every field
    /// is always emitted (null when unset).
    pub fn build(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Message always serializes")
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        serde_json::from_slice(bytes).map_err(|err| {
            let text = err.to_string();
            if let Some(invalid) = parse_invalid_value(&text) {
                invalid
            } else if text.contains("unknown field") {
                FormatError::UnknownField(text)
            } else {
                FormatError::Malformed(text)
            }
        })
    }

    pub fn requested_name(&self) -> Option<&str> {
        self.qry_name.as_deref()
    }

    pub fn requested_type(&self) -> Option<QueryType> {
        self.qry_type
    }

    pub fn is_a_request(&self) -> bool {
        self.qry_type == Some(QueryType::A)
    }

    pub fn is_recursion_desired(&self) -> bool {
        self.recdesired.unwrap_or(false)
    }

    pub fn address(&self) -> Option<&str> {
        self.a.as_deref()
    }

    pub fn ns_name(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    pub fn ttl(&self) -> Option<u32> {
        self.resp_ttl
    }

    pub fn set_authoritative(&mut self, value: bool) {
        self.authoritative = Some(value);
    }

    pub fn set_updated_ttl(&mut self, seconds: u32) {
        self.resp_ttl = Some(seconds);
    }

    /// `match_type("A")` is true iff `qry.type == A`.
    pub fn match_type(&self, type_name: &str) -> bool {
        self.qry_type
            .map(|t| t.matches_name(type_name))
            .unwrap_or(false)
    }
}
