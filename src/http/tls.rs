//! TLS policy for the HTTPS listener.
//!
//! - TLS 1.2 minimum, TLS 1.3 preferred
//! - AEAD, forward-secret suites only (ECDHE+AESGCM, ECDHE+CHACHA20, no RSA key exchange)
//! - ALPN limited to `http/1.1` and the ACME `acme-tls/1` challenge protocol
//! - Certificates come from the ACME resolver, gated by the host policy
//!
//! The acceptor records the negotiated protocol version and cipher suite of each
//! connection so the access log can report them.

use std::io;
use std::sync::Arc;

use axum_server::accept::Accept;
use futures::future::BoxFuture;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{aws_lc_rs, CryptoProvider};
use rustls::server::{ClientHello, ResolvesServerCert, ServerConnection};
use rustls::sign::CertifiedKey;
use rustls::{ClientConfig, DigitallySignedStruct, ProtocolVersion, ServerConfig, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tower_http::add_extension::AddExtension;

use crate::policy::HostPolicy;

/// ALPN identifier of the tls-alpn-01 challenge (RFC 8737)
pub const ACME_TLS_ALPN_NAME: &[u8] = b"acme-tls/1";

/// Application protocols offered to clients. HTTP/2 is deliberately absent.
pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"http/1.1", ACME_TLS_ALPN_NAME];

/// Cipher suites in server preference order.
pub fn cipher_suites() -> Vec<rustls::SupportedCipherSuite> {
    use rustls::crypto::aws_lc_rs::cipher_suite::*;

    vec![
        TLS13_AES_256_GCM_SHA384,
        TLS13_CHACHA20_POLY1305_SHA256,
        TLS13_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    ]
}

/// Crypto provider restricted to `cipher_suites()`.
pub fn crypto_provider() -> CryptoProvider {
    CryptoProvider {
        cipher_suites: cipher_suites(),
        ..aws_lc_rs::default_provider()
    }
}

/// Build the rustls server configuration around a certificate resolver.
pub fn server_config(
    resolver: Arc<dyn ResolvesServerCert>,
) -> Result<ServerConfig, rustls::Error> {
    let mut config = ServerConfig::builder_with_provider(Arc::new(crypto_provider()))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_no_client_auth()
        .with_cert_resolver(resolver);

    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();
    config.ignore_client_order = true;

    Ok(config)
}

/// Certificate resolver that refuses every name the host policy does not allow.
///
/// Names outside the allowlist never reach the ACME resolver, so they can neither
/// get a certificate nor have a tls-alpn-01 challenge answered.
#[derive(Debug)]
pub struct PolicyResolver {
    policy: HostPolicy,
    inner: Arc<dyn ResolvesServerCert>,
}

impl PolicyResolver {
    pub fn new(policy: HostPolicy, inner: Arc<dyn ResolvesServerCert>) -> Self {
        Self { policy, inner }
    }
}

impl ResolvesServerCert for PolicyResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let Some(server_name) = client_hello.server_name() else {
            tracing::debug!("Rejecting TLS handshake without SNI");
            return None;
        };

        if let Err(denied) = self.policy.authorize(server_name) {
            tracing::warn!(host = %denied.host, reason = denied.reason, "Refusing certificate");
            return None;
        }

        self.inner.resolve(client_hello)
    }
}

/// Negotiated TLS parameters of a connection, attached to each of its requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsInfo {
    pub version: String,
    pub cipher_suite: String,
}

impl TlsInfo {
    fn from_connection(connection: &ServerConnection) -> Self {
        let version = match connection.protocol_version() {
            Some(version) => protocol_name(version),
            None => "-".to_string(),
        };
        let cipher_suite = connection
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()))
            .unwrap_or_else(|| "-".to_string());

        Self {
            version,
            cipher_suite,
        }
    }
}

fn protocol_name(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_2 => "TLS1.2".to_string(),
        ProtocolVersion::TLSv1_3 => "TLS1.3".to_string(),
        other => format!("{:?}", other),
    }
}

/// `axum_server` acceptor performing the TLS handshake and recording `TlsInfo`.
#[derive(Clone)]
pub struct GatewayAcceptor {
    inner: TlsAcceptor,
}

impl GatewayAcceptor {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            inner: TlsAcceptor::from(Arc::new(config)),
        }
    }
}

impl<I, S> Accept<I, S> for GatewayAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = TlsStream<I>;
    type Service = AddExtension<S, TlsInfo>;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let acceptor = self.inner.clone();

        Box::pin(async move {
            let stream = acceptor.accept(stream).await?;
            let (_, connection) = stream.get_ref();

            // The validator only needs the handshake; no HTTP follows.
            if connection.alpn_protocol() == Some(ACME_TLS_ALPN_NAME) {
                tracing::info!(
                    host = connection.server_name().unwrap_or("-"),
                    "Answered tls-alpn-01 challenge"
                );
                return Err(io::Error::other("tls-alpn-01 validation connection"));
            }

            let info = TlsInfo::from_connection(connection);
            Ok((stream, AddExtension::new(service, info)))
        })
    }
}

/// Client configuration for the ACME client in staging mode.
///
/// The staging CA is not publicly trusted, so peer certificates are not verified.
/// This configuration is only ever handed to the ACME client, never to a listener.
pub fn staging_client_config() -> Result<ClientConfig, rustls::Error> {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
        .with_no_client_auth();
    Ok(config)
}

/// Accepts any server certificate but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
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
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
