use rustls::RootCertStore;
use rustls_pki_types::{pem::PemObject, CertificateDer};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};

/// Upper bound on waiting for a pooled connection. Kept in line with the
/// readiness deadline so a saturated pool reports instead of queueing.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

const MAX_CONNECTIONS: u32 = 4;

/// Reads a PEM bundle and checks that it holds at least one certificate
/// usable as a trust anchor. Returns the raw PEM bytes for the driver.
pub fn load_root_ca(path: &Path) -> Result<Vec<u8>> {
    let pem = std::fs::read(path).map_err(|source| AppError::CaCertificateRead {
        path: path.to_path_buf(),
        source,
    })?;

    let certs = CertificateDer::pem_slice_iter(&pem).filter_map(|cert| match cert {
        Ok(cert) => Some(cert),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "skipping malformed PEM section in root CA bundle"
            );
            None
        }
    });

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);

    if added == 0 {
        return Err(AppError::InvalidCaCertificate {
            path: path.to_path_buf(),
        });
    }

    if ignored > 0 {
        warn!(
            path = %path.display(),
            ignored,
            "root CA bundle contains certificates that could not be parsed"
        );
    }

    info!(path = %path.display(), certificates = added, "loaded root CA certificates");
    Ok(pem)
}

pub fn connect_options(config: &DatabaseConfig, ca_pem: Vec<u8>) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .ssl_mode(MySqlSslMode::VerifyIdentity)
        .ssl_ca_from_pem(ca_pem)
}

/// Builds the process-wide pool. Connections are opened on first use, so
/// startup does not depend on the database being reachable.
pub fn pool_with_options(options: MySqlConnectOptions) -> MySqlPool {
    MySqlPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(0)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .connect_lazy_with(options)
}

pub async fn get_database_pool(config: &DatabaseConfig) -> Result<MySqlPool> {
    info!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        user = %config.user,
        "configuring database connection pool"
    );

    let ca_pem = load_root_ca(&config.root_ca_cert)?;
    let pool = pool_with_options(connect_options(config, ca_pem));

    info!("Database connection pool created successfully");
    Ok(pool)
}
