//! Connection probing for `check-conn`: reports the server's identity
//! without touching any user schema.

use crate::connection::SqlClient;
use crate::error::{map_tiberius, OptionalColumn};

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub server: String,
    pub database: String,
    pub login: String,
    pub version: String,
    pub edition: String,
}

const PROBE_QUERY: &str = "\
SELECT \
    CAST(SERVERPROPERTY('ServerName') AS nvarchar(128)) AS server_name, \
    DB_NAME() AS database_name, \
    SUSER_SNAME() AS login_name, \
    CAST(SERVERPROPERTY('ProductVersion') AS nvarchar(128)) AS product_version, \
    CAST(SERVERPROPERTY('Edition') AS nvarchar(128)) AS edition";

pub async fn probe(client: &mut SqlClient) -> sqldiff_core::Result<ConnectionInfo> {
    let stream = client
        .query(PROBE_QUERY, &[])
        .await
        .map_err(|e| map_tiberius("probe query failed", e))?;
    let row = stream
        .into_row()
        .await
        .map_err(|e| map_tiberius("probe query failed", e))?
        .ok_or_else(|| sqldiff_core::SqlDiffError::Catalog("probe query returned no row".into()))?;

    Ok(ConnectionInfo {
        server: row.get::<&str, _>("server_name").map(str::to_string).required("server_name")?,
        database: row.get::<&str, _>("database_name").map(str::to_string).required("database_name")?,
        login: row.get::<&str, _>("login_name").map(str::to_string).required("login_name")?,
        version: row.get::<&str, _>("product_version").map(str::to_string).required("product_version")?,
        edition: row.get::<&str, _>("edition").map(str::to_string).required("edition")?,
    })
}
