//! X.509 helpers shared by merchant key loading and platform certificate decoding.

use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use x509_parser::certificate::X509Certificate;
use x509_parser::parse_x509_certificate;
use x509_parser::pem::parse_x509_pem;

/// The parts of a certificate this crate cares about, detached from the input buffer.
#[derive(Clone, Debug)]
pub(crate) struct ParsedCertificate {
    /// Upper-case hex serial without leading zero bytes.
    pub serial: String,
    pub public_key: RsaPublicKey,
    /// Unix seconds.
    pub not_before: i64,
    /// Unix seconds.
    pub not_after: i64,
}

/// Parse a PEM or DER encoded certificate carrying an RSA public key.
pub(crate) fn parse_certificate(bytes: &[u8]) -> Result<ParsedCertificate, String> {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let trimmed = &bytes[start..];

    if trimmed.starts_with(b"-----BEGIN") {
        let (_, pem) = parse_x509_pem(trimmed).map_err(|e| format!("invalid PEM: {e}"))?;
        let cert = pem
            .parse_x509()
            .map_err(|e| format!("invalid certificate: {e}"))?;
        extract(&cert)
    } else {
        let (_, cert) =
            parse_x509_certificate(trimmed).map_err(|e| format!("invalid certificate: {e}"))?;
        extract(&cert)
    }
}

fn extract(cert: &X509Certificate<'_>) -> Result<ParsedCertificate, String> {
    let public_key = RsaPublicKey::from_public_key_der(cert.public_key().raw)
        .map_err(|e| format!("certificate does not carry an RSA public key: {e}"))?;
    let validity = cert.validity();

    Ok(ParsedCertificate {
        serial: serial_hex(cert.raw_serial()),
        public_key,
        not_before: validity.not_before.timestamp(),
        not_after: validity.not_after.timestamp(),
    })
}

/// Render a DER integer body the way the platform prints serial numbers.
pub(crate) fn serial_hex(raw: &[u8]) -> String {
    let first = raw
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(raw.len().saturating_sub(1));
    hex::encode_upper(&raw[first..])
}
