//! OCI HTTP request signing (draft-cavage HTTP signatures, `rsa-sha256`).
//!
//! GET requests sign `date (request-target) host`. Requests with a body also
//! sign `content-length content-type x-content-sha256`.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, DATE};
use reqwest::{Method, Url};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use std::path::Path;

pub const X_CONTENT_SHA256: &str = "x-content-sha256";
const JSON: &str = "application/json";

pub struct RequestSigner {
    key_id: String,
    key_pair: RsaKeyPair,
    rng: SystemRandom,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// `key_id` is `tenancy/user/fingerprint`; `pem` is the API private key.
    pub fn new(key_id: impl Into<String>, pem: &str) -> Result<Self> {
        let key_pair = parse_private_key(pem)?;
        Ok(Self {
            key_id: key_id.into(),
            key_pair,
            rng: SystemRandom::new(),
        })
    }

    pub fn from_key_file(key_id: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read API private key {}", path.display()))?;
        Self::new(key_id, &pem)
            .with_context(|| format!("invalid API private key {}", path.display()))
    }

    /// Headers to attach to a request: `date`, `authorization` and, for
    /// requests with a body, `content-type` and `x-content-sha256`.
    /// `content-length` is signed but left for the HTTP client to set.
    pub fn sign(&self, method: &Method, url: &Url, body: Option<&[u8]>) -> Result<HeaderMap> {
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        self.sign_at(method, url, body, &date)
    }

    pub fn sign_at(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        date: &str,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut signed: Vec<(&str, String)> = vec![
            ("date", date.to_string()),
            ("(request-target)", request_target(method, url)),
            ("host", host_header(url)?),
        ];

        if let Some(body) = body {
            let digest = STANDARD.encode(ring::digest::digest(&ring::digest::SHA256, body));
            signed.push(("content-length", body.len().to_string()));
            signed.push(("content-type", JSON.to_string()));
            signed.push((X_CONTENT_SHA256, digest.clone()));

            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
            headers.insert(
                HeaderName::from_static(X_CONTENT_SHA256),
                HeaderValue::from_str(&digest)?,
            );
        }

        let signing_string = signed
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("\n");
        let header_names = signed
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(" ");

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &self.rng,
                signing_string.as_bytes(),
                &mut signature,
            )
            .map_err(|_| anyhow!("failed to sign request"))?;

        let authorization = format!(
            r#"Signature version="1",keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
            self.key_id,
            header_names,
            STANDARD.encode(&signature)
        );

        headers.insert(DATE, HeaderValue::from_str(date)?);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);
        Ok(headers)
    }
}

fn request_target(method: &Method, url: &Url) -> String {
    let mut target = format!("{} {}", method.as_str().to_ascii_lowercase(), url.path());
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("url {} has no host", url))?;
    // Url::port() is None for the scheme's default port, matching what the
    // HTTP client sends as Host.
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Decode a PEM private key. Accepts PKCS#8 (`PRIVATE KEY`) and PKCS#1
/// (`RSA PRIVATE KEY`). Anything after the END line other than whitespace is
/// rejected.
fn parse_private_key(pem: &str) -> Result<RsaKeyPair> {
    let mut label: Option<&str> = None;
    let mut body = String::new();
    let mut finished = false;

    for line in pem.lines() {
        let line = line.trim();
        if finished {
            if !line.is_empty() {
                return Err(anyhow!("invalid PEM key file: trailing data after END line"));
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("-----BEGIN ") {
            label = Some(
                rest.strip_suffix("-----")
                    .ok_or_else(|| anyhow!("malformed PEM BEGIN line"))?,
            );
            continue;
        }
        if let Some(rest) = line.strip_prefix("-----END ") {
            if label.is_none() || rest.strip_suffix("-----") != label {
                return Err(anyhow!("PEM END line does not match BEGIN line"));
            }
            finished = true;
            continue;
        }
        if label.is_some() {
            if line.contains(':') {
                // Proc-Type / DEK-Info headers only appear on encrypted keys.
                return Err(anyhow!("encrypted private keys are not supported"));
            }
            body.push_str(line);
        }
    }

    let label = label.ok_or_else(|| anyhow!("no PEM block found"))?;
    if !finished {
        return Err(anyhow!("PEM block is not terminated"));
    }
    let der = STANDARD
        .decode(body.as_bytes())
        .context("PEM body is not valid base64")?;

    let key_pair = match label {
        "PRIVATE KEY" => RsaKeyPair::from_pkcs8(&der),
        "RSA PRIVATE KEY" => RsaKeyPair::from_der(&der),
        other => return Err(anyhow!("unsupported PEM block {:?}", other)),
    };
    key_pair.map_err(|e| anyhow!("rejected RSA key: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::signature::{KeyPair, UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA256};

    const PKCS8: &str = include_str!("../tests/fixtures/test_key.pem");
    const PKCS1: &str = include_str!("../tests/fixtures/test_key_pkcs1.pem");
    const DATE_FIXED: &str = "Thu, 05 Jan 2014 21:31:40 GMT";

    fn signature_parts(auth: &str) -> (String, String) {
        let field = |name: &str| {
            let start = auth.find(&format!("{}=\"", name)).unwrap() + name.len() + 2;
            let end = auth[start..].find('"').unwrap() + start;
            auth[start..end].to_string()
        };
        (field("headers"), field("signature"))
    }

    fn verify(signer: &RequestSigner, message: &str, signature_b64: &str) {
        let public = signer.key_pair.public_key().as_ref().to_vec();
        let sig = STANDARD.decode(signature_b64).unwrap();
        UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, public)
            .verify(message.as_bytes(), &sig)
            .expect("signature should verify");
    }

    #[test]
    fn accepts_pkcs8_and_pkcs1_keys() {
        assert!(RequestSigner::new("t/u/f", PKCS8).is_ok());
        assert!(RequestSigner::new("t/u/f", PKCS1).is_ok());
    }

    #[test]
    fn rejects_trailing_garbage_and_junk() {
        let with_tail = format!("{}\nleftover", PKCS8);
        assert!(RequestSigner::new("t/u/f", &with_tail).is_err());
        assert!(RequestSigner::new("t/u/f", "not a key").is_err());
        let unterminated = PKCS8.replace("-----END PRIVATE KEY-----", "");
        assert!(RequestSigner::new("t/u/f", &unterminated).is_err());
    }

    #[test]
    fn missing_key_file_is_an_error() {
        let err = RequestSigner::from_key_file("t/u/f", "/nonexistent/oci.key").unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read API private key"));
    }

    #[test]
    fn get_signature_covers_date_target_and_host() {
        let signer = RequestSigner::new("ocid1.tenancy/ocid1.user/aa:bb", PKCS8).unwrap();
        let url = Url::parse(
            "https://identity.eu-frankfurt-1.oraclecloud.com/20160918/availabilityDomains?compartmentId=ocid1.tenancy.oc1..x",
        )
        .unwrap();
        let headers = signer.sign_at(&Method::GET, &url, None, DATE_FIXED).unwrap();

        assert_eq!(headers[DATE], DATE_FIXED);
        assert!(headers.get(X_CONTENT_SHA256).is_none());
        let auth = headers[AUTHORIZATION].to_str().unwrap();
        assert!(auth.starts_with(r#"Signature version="1",keyId="ocid1.tenancy/ocid1.user/aa:bb""#));
        assert!(auth.contains(r#"algorithm="rsa-sha256""#));

        let (names, signature) = signature_parts(auth);
        assert_eq!(names, "date (request-target) host");
        let expected = format!(
            "date: {}\n(request-target): get /20160918/availabilityDomains?compartmentId=ocid1.tenancy.oc1..x\nhost: identity.eu-frankfurt-1.oraclecloud.com",
            DATE_FIXED
        );
        verify(&signer, &expected, &signature);
    }

    #[test]
    fn post_signature_covers_body_headers() {
        let signer = RequestSigner::new("t/u/f", PKCS1).unwrap();
        let url = Url::parse("http://127.0.0.1:8080/20160918/instances/").unwrap();
        let body = br#"{"shape":"VM.Standard.A1.Flex"}"#;
        let headers = signer
            .sign_at(&Method::POST, &url, Some(body), DATE_FIXED)
            .unwrap();

        let digest = STANDARD.encode(ring::digest::digest(&ring::digest::SHA256, body));
        assert_eq!(headers[X_CONTENT_SHA256], digest.as_str());
        assert_eq!(headers[CONTENT_TYPE], JSON);

        let (names, signature) = signature_parts(headers[AUTHORIZATION].to_str().unwrap());
        assert_eq!(
            names,
            "date (request-target) host content-length content-type x-content-sha256"
        );
        let expected = format!(
            "date: {}\n(request-target): post /20160918/instances/\nhost: 127.0.0.1:8080\ncontent-length: {}\ncontent-type: application/json\nx-content-sha256: {}",
            DATE_FIXED,
            body.len(),
            digest
        );
        verify(&signer, &expected, &signature);
    }
}
