use crate::error::Error;
use crate::zone::{UpdateRequest, DEFAULT_RRTYPE};
use serde::Deserialize;
use std::str::FromStr;
use trust_dns_proto::rr::{Name, RecordType};

#[derive(Deserialize, Debug, Clone, Default, Ord, PartialOrd, Eq, PartialEq)]
pub(super) struct UpdateRecordRequest {
    #[serde(default)]
    pub fqdn: String,
    #[serde(default)]
    pub rrtype: Option<String>,
    #[serde(default)]
    pub value: String,
}

impl UpdateRecordRequest {
    /// Validate the payload into an [`UpdateRequest`] for the zone updater.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for an empty `fqdn` or `value`, [`Error::InvalidName`]
    /// if `fqdn` isn't a DNS name, [`Error::NotFQDN`] if `fqdn` lacks the trailing dot, and
    /// [`Error::UnknownRecordType`] if `rrtype` isn't a known record type.
    pub fn into_update(self, disable: bool) -> Result<UpdateRequest, Error> {
        if self.fqdn.is_empty() {
            return Err(Error::MissingField("fqdn"));
        }
        if self.value.is_empty() {
            return Err(Error::MissingField("value"));
        }
        if !Name::from_str(&self.fqdn)?.is_fqdn() {
            return Err(Error::NotFQDN(self.fqdn));
        }
        let rrtype = match self.rrtype.filter(|t| !t.is_empty()) {
            None => DEFAULT_RRTYPE.to_string(),
            Some(rrtype) if is_record_type(&rrtype) => rrtype,
            Some(rrtype) => return Err(Error::UnknownRecordType(rrtype)),
        };
        Ok(UpdateRequest {
            fqdn: self.fqdn,
            rrtype,
            value: self.value,
            disable,
        })
    }
}

fn is_record_type(rrtype: &str) -> bool {
    // `RecordType::from_str` expects upper-case alphanumerics only.
    let rrtype = rrtype.to_ascii_uppercase();
    rrtype.chars().all(|c| c.is_ascii_alphanumeric()) && RecordType::from_str(&rrtype).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> UpdateRecordRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn rrtype_defaults_to_txt() {
        let update = payload(r#"{"fqdn": "_acme-challenge.example.com.", "value": "abc"}"#)
            .into_update(false)
            .unwrap();
        assert_eq!(update, UpdateRequest::new("_acme-challenge.example.com.", "abc"));

        let update = payload(r#"{"fqdn": "a.example.", "rrtype": "", "value": "abc"}"#)
            .into_update(true)
            .unwrap();
        assert_eq!(update.rrtype, "TXT");
        assert!(update.disable);
    }

    #[test]
    fn keeps_requested_rrtype() {
        let update = payload(r#"{"fqdn": "a.example.", "rrtype": "aaaa", "value": "::1"}"#)
            .into_update(false)
            .unwrap();
        assert_eq!(update.rrtype, "aaaa");
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(matches!(
            payload(r#"{"value": "abc"}"#).into_update(false),
            Err(Error::MissingField("fqdn"))
        ));
        assert!(matches!(
            payload(r#"{"fqdn": "a.example.", "value": ""}"#).into_update(false),
            Err(Error::MissingField("value"))
        ));
    }

    #[test]
    fn rejects_relative_names() {
        assert!(matches!(
            payload(r#"{"fqdn": "_acme-challenge.example.com", "value": "abc"}"#)
                .into_update(false),
            Err(Error::NotFQDN(_))
        ));
    }

    #[test]
    fn rejects_unknown_rrtype() {
        assert!(matches!(
            payload(r#"{"fqdn": "a.example.", "rrtype": "TXT|.*", "value": "abc"}"#)
                .into_update(false),
            Err(Error::UnknownRecordType(_))
        ));
        assert!(matches!(
            payload(r#"{"fqdn": "a.example.", "rrtype": "NOTATYPE", "value": "abc"}"#)
                .into_update(false),
            Err(Error::UnknownRecordType(_))
        ));
    }
}
