// src/cert/parser.rs
use chrono::{DateTime, TimeZone, Utc};
use x509_parser::pem::parse_x509_pem;

use crate::error::ParseError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateExpiry {
    pub not_after: DateTime<Utc>,
    pub days: i64,
}

/// Decodes the first PEM block and reports when the certificate expires.
pub fn parse_certificate(pem: &[u8]) -> Result<CertificateExpiry, ParseError> {
    parse_certificate_at(pem, Utc::now())
}

pub fn parse_certificate_at(
    pem: &[u8],
    now: DateTime<Utc>,
) -> Result<CertificateExpiry, ParseError> {
    let (_, block) = parse_x509_pem(pem).map_err(|e| ParseError::pem(e.to_string()))?;
    let cert = block
        .parse_x509()
        .map_err(|e| ParseError::x509(e.to_string()))?;

    let not_after = Utc
        .timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single()
        .ok_or_else(|| ParseError::x509("invalid notAfter timestamp"))?;

    Ok(CertificateExpiry {
        not_after,
        days: days_remaining(not_after, now),
    })
}

/// Whole days left, rounded down; negative once expired.
pub fn days_remaining(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseStage;
    use chrono::Duration;
    use rcgen::{date_time_ymd, CertificateParams, KeyPair};

    fn pem_expiring(year: i32, month: u8, day: u8) -> String {
        let mut params = CertificateParams::new(vec!["kubelet".to_string()]).unwrap();
        params.not_before = date_time_ymd(2015, 1, 1);
        params.not_after = date_time_ymd(year, month, day);
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().pem()
    }

    #[test]
    fn reports_days_until_not_after() {
        let pem = pem_expiring(2030, 1, 1);
        let now = Utc.with_ymd_and_hms(2029, 12, 22, 12, 0, 0).unwrap();

        let expiry = parse_certificate_at(pem.as_bytes(), now).unwrap();

        assert_eq!(
            expiry.not_after,
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(expiry.days, 9);
    }

    #[test]
    fn expired_certificate_has_negative_days() {
        let pem = pem_expiring(2020, 1, 1);
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 1, 0, 0).unwrap();

        let expiry = parse_certificate_at(pem.as_bytes(), now).unwrap();

        assert_eq!(expiry.days, -1);
    }

    #[test]
    fn days_round_down() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(days_remaining(now + Duration::hours(47), now), 1);
        assert_eq!(days_remaining(now + Duration::hours(48), now), 2);
        assert_eq!(days_remaining(now - Duration::hours(25), now), -2);
    }

    #[test]
    fn reparsing_yields_same_not_after() {
        let pem = pem_expiring(2031, 6, 15);
        let first = parse_certificate(pem.as_bytes()).unwrap();
        let second = parse_certificate(pem.as_bytes()).unwrap();
        assert_eq!(first.not_after, second.not_after);
    }

    #[test]
    fn text_without_pem_block_fails_at_pem_stage() {
        let err = parse_certificate(b"cat: /etc/kubernetes/pki/apiserver.crt: No such file").unwrap_err();
        assert_eq!(err.stage, ParseStage::Pem);

        let err = parse_certificate(b"").unwrap_err();
        assert_eq!(err.stage, ParseStage::Pem);
    }

    #[test]
    fn pem_with_bad_der_fails_at_x509_stage() {
        let pem = "-----BEGIN CERTIFICATE-----\naGVsbG8gd29ybGQ=\n-----END CERTIFICATE-----\n";
        let err = parse_certificate(pem.as_bytes()).unwrap_err();
        assert_eq!(err.stage, ParseStage::X509);
    }
}
