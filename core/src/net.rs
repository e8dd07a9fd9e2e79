/*
 * net.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Lifeline, a lifecycle-instrumented HTTPS client library.
 *
 * Lifeline is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Lifeline is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Lifeline.  If not, see <http://www.gnu.org/licenses/>.
 */

//! TLS seam: certificate trust and hostname verification strategies, and the rustls client
//! connection built from them.
//!
//! The two strategies are independent. The trust strategy validates the certificate chain; when
//! it rejects the certificate only because the name does not match, the hostname strategy makes
//! the final call. Any other trust failure aborts the handshake.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
pub fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = root_store.add_parsable_certificates(certs);
            log::debug!("[tls] loaded {} native roots ({} ignored)", added, ignored);
        }
        Err(e) => log::debug!("[tls] native roots unavailable: {}", e),
    }
    if root_store.is_empty() {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    root_store
}

/// Certificate trust policy.
#[derive(Debug, Clone)]
pub enum CertificateTrust {
    /// Native platform roots, falling back to the bundled Mozilla roots.
    Platform,
    /// Only these roots.
    Roots(RootCertStore),
    /// Caller-supplied verifier.
    Custom(Arc<dyn ServerCertVerifier>),
    /// No chain validation at all. For test fixtures and pinned development hosts.
    AcceptAny,
}

/// Decides whether a certificate is acceptable for the host that was requested.
pub trait HostnameVerifier: fmt::Debug + Send + Sync {
    /// `name_matches` is the trust strategy's own name check for `host`.
    fn verify(&self, host: &str, end_entity: &CertificateDer<'_>, name_matches: bool) -> bool;
}

/// Hostname match policy.
#[derive(Debug, Clone, Default)]
pub enum HostnameVerification {
    /// The certificate must be valid for the requested host.
    #[default]
    Strict,
    /// Accept a certificate issued for any name.
    AllowAny,
    Custom(Arc<dyn HostnameVerifier>),
}

/// Supplies the TLS policy for each execution. Consulted once per request.
pub trait TlsConfig: Send + Sync {
    fn certificate_trust(&self) -> CertificateTrust;

    fn hostname_verification(&self) -> HostnameVerification {
        HostnameVerification::Strict
    }
}

/// Platform roots with strict hostname checking.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTlsConfig;

impl TlsConfig for DefaultTlsConfig {
    fn certificate_trust(&self) -> CertificateTrust {
        CertificateTrust::Platform
    }
}

/// Fixed pair of strategies.
#[derive(Debug, Clone)]
pub struct StaticTlsConfig {
    pub trust: CertificateTrust,
    pub hostname: HostnameVerification,
}

impl TlsConfig for StaticTlsConfig {
    fn certificate_trust(&self) -> CertificateTrust {
        self.trust.clone()
    }

    fn hostname_verification(&self) -> HostnameVerification {
        self.hostname.clone()
    }
}

#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

/// Combines a trust strategy with a hostname strategy.
#[derive(Debug)]
struct PolicyVerifier {
    trust: Arc<dyn ServerCertVerifier>,
    hostname: HostnameVerification,
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let name_matches = match self.trust.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Ok(_) => true,
            Err(rustls::Error::InvalidCertificate(CertificateError::NotValidForName))
            | Err(rustls::Error::InvalidCertificate(CertificateError::NotValidForNameContext {
                ..
            })) => false,
            Err(e) => return Err(e),
        };
        let host = server_name.to_str();
        let accepted = match &self.hostname {
            HostnameVerification::Strict => name_matches,
            HostnameVerification::AllowAny => true,
            HostnameVerification::Custom(v) => v.verify(&host, end_entity, name_matches),
        };
        if accepted {
            Ok(ServerCertVerified::assertion())
        } else {
            log::warn!("[tls] certificate rejected for host {}", host);
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.trust.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.trust.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.trust.supported_verify_schemes()
    }
}

fn webpki_verifier(roots: RootCertStore) -> io::Result<Arc<dyn ServerCertVerifier>> {
    let verifier = WebPkiServerVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    Ok(verifier)
}

/// Client config for one request: the strategies from `tls`, ALPN http/1.1 only.
pub fn client_config(tls: &dyn TlsConfig) -> io::Result<Arc<ClientConfig>> {
    let trust: Arc<dyn ServerCertVerifier> = match tls.certificate_trust() {
        CertificateTrust::Platform => webpki_verifier(build_root_store())?,
        CertificateTrust::Roots(roots) => webpki_verifier(roots)?,
        CertificateTrust::Custom(v) => v,
        CertificateTrust::AcceptAny => Arc::new(AcceptAnyCertificate),
    };
    let verifier = PolicyVerifier {
        trust,
        hostname: tls.hostname_verification(),
    };
    let mut config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

/// TCP connect then TLS handshake, optionally bounded by `connect_timeout`.
pub async fn connect_tls(
    host: &str,
    port: u16,
    config: Arc<ClientConfig>,
    connect_timeout: Option<Duration>,
) -> io::Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
    let handshake = async {
        let tcp = TcpStream::connect((host, port)).await?;
        TlsConnector::from(config).connect(server_name, tcp).await
    };
    match connect_timeout {
        Some(limit) => timeout(limit, handshake)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TLS connect timed out"))?,
        None => handshake.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct OnlyHost(&'static str);

    impl HostnameVerifier for OnlyHost {
        fn verify(&self, host: &str, _end_entity: &CertificateDer<'_>, _name_matches: bool) -> bool {
            host == self.0
        }
    }

    fn verify(hostname: HostnameVerification, host: &'static str) -> bool {
        let verifier = PolicyVerifier {
            trust: Arc::new(AcceptAnyCertificate),
            hostname,
        };
        let cert = CertificateDer::from(vec![0u8; 4]);
        let name = ServerName::try_from(host).unwrap();
        verifier
            .verify_server_cert(&cert, &[], &name, &[], UnixTime::now())
            .is_ok()
    }

    #[test]
    fn hostname_strategy_has_final_say() {
        assert!(verify(HostnameVerification::Strict, "example.com"));
        assert!(verify(HostnameVerification::AllowAny, "example.com"));
        let pinned = HostnameVerification::Custom(Arc::new(OnlyHost("api.example.com")));
        assert!(verify(pinned.clone(), "api.example.com"));
        assert!(!verify(pinned, "evil.example.com"));
    }

    #[test]
    fn default_config_is_strict_platform() {
        assert!(matches!(
            DefaultTlsConfig.certificate_trust(),
            CertificateTrust::Platform
        ));
        assert!(matches!(
            DefaultTlsConfig.hostname_verification(),
            HostnameVerification::Strict
        ));
    }
}
