//! Resource catalog lookups in the platform database.
//!
//! The `explorer.resources` table is the source of truth for which search
//! document belongs to a resource: its `id` is the document id the engine
//! should hold for `(application, ent_id)`.

use std::collections::HashMap;
use std::sync::Arc;

use explorer_index_common::PostgresConnection;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_postgres::config::SslMode;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::{NoTls, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, warn};

use crate::error::CatalogError;

const CANONICAL_IDS_QUERY: &str =
    "SELECT id::text AS id, ent_id, application FROM explorer.resources WHERE ent_id = ANY($1)";

/// Key shared by the catalog and the scanned documents.
pub fn resource_key(application: &str, ent_id: &str) -> String {
    format!("{application}_{ent_id}")
}

#[allow(async_fn_in_trait)]
pub trait ResourceCatalog {
    /// Catalog id of every known resource among `ent_ids`, keyed by
    /// [`resource_key`].
    async fn canonical_ids(
        &self,
        ent_ids: &[String],
    ) -> Result<HashMap<String, String>, CatalogError>;
}

/// Catalog backed by PostgreSQL, one connection per lookup.
#[derive(Debug, Clone)]
pub struct PgResourceCatalog {
    connection: PostgresConnection,
}

impl PgResourceCatalog {
    pub fn new(connection: PostgresConnection) -> Self {
        Self { connection }
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let connection = &self.connection;
        let mut config = tokio_postgres::Config::new();
        config
            .host(&connection.host)
            .port(connection.port)
            .dbname(&connection.database)
            .user(&connection.user)
            .ssl_mode(if connection.uses_tls() {
                SslMode::Require
            } else {
                SslMode::Disable
            });
        if let Some(password) = &connection.password {
            config.password(password);
        }
        config
    }

    async fn query<T>(
        &self,
        tls: T,
        ent_ids: &[String],
    ) -> Result<HashMap<String, String>, CatalogError>
    where
        T: MakeTlsConnect<Socket>,
        T::Stream: Send + 'static,
    {
        let (client, connection) = self
            .pg_config()
            .connect(tls)
            .await
            .map_err(CatalogError::Connect)?;
        let handle = tokio::spawn(async move {
            if let Err(err) = connection.await {
                warn!(error = %err, "Resource catalog connection error.");
            }
        });

        let rows = client
            .query(CANONICAL_IDS_QUERY, &[&ent_ids])
            .await
            .map_err(CatalogError::Query);

        // Closing the client ends the connection task.
        drop(client);
        if let Err(err) = handle.await {
            warn!(error = %err, "Resource catalog connection task panicked.");
        }

        let mut ids = HashMap::new();
        for row in rows? {
            let id: String = row.try_get("id").map_err(CatalogError::Query)?;
            let ent_id: String = row.try_get("ent_id").map_err(CatalogError::Query)?;
            let application: String = row.try_get("application").map_err(CatalogError::Query)?;
            ids.insert(resource_key(&application, &ent_id), id);
        }
        Ok(ids)
    }
}

impl ResourceCatalog for PgResourceCatalog {
    async fn canonical_ids(
        &self,
        ent_ids: &[String],
    ) -> Result<HashMap<String, String>, CatalogError> {
        if ent_ids.is_empty() {
            return Ok(HashMap::new());
        }
        debug!(
            host = %self.connection.host,
            database = %self.connection.database,
            ent_ids = ent_ids.len(),
            "Looking up resource catalog."
        );
        if self.connection.uses_tls() {
            self.query(tls_connector()?, ent_ids).await
        } else {
            self.query(NoTls, ent_ids).await
        }
    }
}

/// Encrypts the session without validating the server certificate.
fn tls_connector() -> Result<MakeRustlsConnect, CatalogError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(CatalogError::Tls)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
        .with_no_client_auth();
    Ok(MakeRustlsConnect::new(config))
}

#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

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
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
