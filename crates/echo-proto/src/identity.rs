//! On-disk identity loading: trust anchor, local certificate, private key.
//!
//! [`TrustConfig`] names the PEM files supplied on the command line;
//! [`TrustConfig::load`] runs the ordered validation sequence and produces an
//! immutable [`Identity`] ready for the config builders in
//! [`crate::tls::config`]. Each validation step fails with its own
//! [`SetupError`] variant so startup diagnostics identify the exact step.
//!
//! No network activity happens here; file reads only.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rustls::RootCertStore;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;
use x509_parser::prelude::*;

use crate::error::{Result, SetupError};

/// Which side of the handshake this identity is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Paths to the PEM material for one role, built once per process
/// invocation and immutable afterward.
#[derive(Debug, Clone)]
pub struct TrustConfig {
    pub trust_anchor: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
    pub role: Role,
}

impl TrustConfig {
    /// Client-role config: the trust anchor validates the server.
    pub fn client(trust_anchor: PathBuf, cert: PathBuf, key: PathBuf) -> Self {
        Self {
            trust_anchor,
            cert,
            key,
            role: Role::Client,
        }
    }

    /// Server-role config: the trust anchor validates clients and is
    /// advertised as the acceptable-issuer hint.
    pub fn server(trust_anchor: PathBuf, cert: PathBuf, key: PathBuf) -> Self {
        Self {
            trust_anchor,
            cert,
            key,
            role: Role::Server,
        }
    }

    /// Load and validate the identity material.
    ///
    /// Validation order matters and each failure is distinct:
    ///
    /// 1. trust anchor readable and a valid certificate → [`SetupError::TrustLoad`]
    /// 2. local certificate readable and well-formed → [`SetupError::CertLoad`]
    /// 3. local private key readable and well-formed → [`SetupError::KeyLoad`]
    /// 4. certificate and key describe the same key pair → [`SetupError::KeyMismatch`]
    pub fn load(&self) -> Result<Identity> {
        let roots = load_trust_anchor(&self.trust_anchor)?;
        let cert_chain = load_cert_chain(&self.cert)?;
        let key = load_private_key(&self.key)?;
        check_keys_match(&cert_chain[0], &key)?;

        debug!(role = ?self.role, cert = %self.cert.display(), "identity material loaded");

        Ok(Identity {
            roots,
            cert_chain,
            key,
            role: self.role,
        })
    }
}

/// Validated identity material, read-only after construction.
pub struct Identity {
    pub roots: RootCertStore,
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
    pub role: Role,
}

fn pem_reader(path: &Path) -> std::io::Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Step 1: load the single-CA trust anchor into a root store.
fn load_trust_anchor(path: &Path) -> Result<RootCertStore> {
    let err = |detail: String| SetupError::TrustLoad(format!("{}: {detail}", path.display()));

    let mut reader = pem_reader(path).map_err(|e| err(e.to_string()))?;
    let anchors: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| err(e.to_string()))?;

    if anchors.is_empty() {
        return Err(err("no certificate found".into()));
    }

    let mut roots = RootCertStore::empty();
    for anchor in anchors {
        // Confirm it is a well-formed X.509 certificate before trusting it.
        X509Certificate::from_der(anchor.as_ref())
            .map_err(|e| err(format!("not a valid certificate: {e}")))?;
        roots.add(anchor).map_err(|e| err(e.to_string()))?;
    }

    Ok(roots)
}

/// Step 2: load the local certificate chain (leaf first).
fn load_cert_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let err = |detail: String| SetupError::CertLoad(format!("{}: {detail}", path.display()));

    let mut reader = pem_reader(path).map_err(|e| err(e.to_string()))?;
    let chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| err(e.to_string()))?;

    if chain.is_empty() {
        return Err(err("no certificate found".into()));
    }

    X509Certificate::from_der(chain[0].as_ref())
        .map_err(|e| err(format!("malformed certificate: {e}")))?;

    Ok(chain)
}

/// Step 3: load the local private key (PKCS#8, PKCS#1, or SEC1 PEM).
fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let err = |detail: String| SetupError::KeyLoad(format!("{}: {detail}", path.display()));

    let mut reader = pem_reader(path).map_err(|e| err(e.to_string()))?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| err(e.to_string()))?
        .ok_or_else(|| err("no private key found".into()))
}

/// Step 4: verify the leaf certificate and the private key form a pair.
///
/// Compares the certificate's SubjectPublicKeyInfo DER against the public
/// key derived from the private key by the ring provider.
fn check_keys_match(leaf: &CertificateDer<'static>, key: &PrivateKeyDer<'static>) -> Result<()> {
    let provider = rustls::crypto::ring::default_provider();
    let signer = provider
        .key_provider
        .load_private_key(key.clone_key())
        .map_err(|e| SetupError::KeyLoad(format!("unusable private key: {e}")))?;

    let key_spki = signer.public_key().ok_or_else(|| {
        SetupError::KeyMismatch("cannot derive public key from private key".into())
    })?;

    let (_, parsed) = X509Certificate::from_der(leaf.as_ref())
        .map_err(|e| SetupError::CertLoad(format!("malformed certificate: {e}")))?;

    if parsed.public_key().raw != key_spki.as_ref() {
        return Err(SetupError::KeyMismatch(
            "certificate public key differs from the private key's".into(),
        ));
    }

    Ok(())
}
