use std::time::Duration;

use sqldiff_core::SqlDiffError;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

pub type SqlClient = Client<Compat<TcpStream>>;

/// Where to connect and as whom. Parsed from a `--conn` / `--source-conn`
/// / `--target-conn` value of the form
/// `server=<host>[,<port>];database=<db>;user=<user>;password=<pw>`.
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    pub server: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub trust_server_certificate: bool,
}

impl ConnectionSpec {
    pub fn parse(raw: &str) -> sqldiff_core::Result<Self> {
        let mut server = None;
        let mut port = 1433u16;
        let mut database = None;
        let mut user = None;
        let mut password = None;
        let mut trust_server_certificate = true;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                SqlDiffError::Invocation(format!("malformed connection segment: {part:?}"))
            })?;
            match key.to_ascii_lowercase().as_str() {
                "server" | "host" => {
                    if let Some((host, p)) = value.split_once(',') {
                        server = Some(host.to_string());
                        port = p.parse().map_err(|_| {
                            SqlDiffError::Invocation(format!("invalid port in connection string: {p:?}"))
                        })?;
                    } else {
                        server = Some(value.to_string());
                    }
                }
                "database" | "db" => database = Some(value.to_string()),
                "user" | "user id" | "uid" => user = Some(value.to_string()),
                "password" | "pwd" => password = Some(value.to_string()),
                "trustservercertificate" => trust_server_certificate = value.eq_ignore_ascii_case("true"),
                other => {
                    return Err(SqlDiffError::Invocation(format!("unknown connection key: {other:?}")))
                }
            }
        }

        Ok(ConnectionSpec {
            server: server.ok_or_else(|| SqlDiffError::Invocation("connection string missing 'server'".into()))?,
            port,
            database: database
                .ok_or_else(|| SqlDiffError::Invocation("connection string missing 'database'".into()))?,
            user: user.ok_or_else(|| SqlDiffError::Invocation("connection string missing 'user'".into()))?,
            password: password
                .ok_or_else(|| SqlDiffError::Invocation("connection string missing 'password'".into()))?,
            trust_server_certificate,
        })
    }
}

/// Opens one TDS connection, bounded by `timeout_seconds`. The caller owns
/// the returned client for the lifetime of one extraction; per §5 of the
/// catalog reader's concurrency model there is exactly one reader active on
/// it at a time.
pub async fn connect(spec: &ConnectionSpec, timeout_seconds: u64) -> sqldiff_core::Result<SqlClient> {
    let mut config = Config::new();
    config.host(&spec.server);
    config.port(spec.port);
    config.database(&spec.database);
    config.authentication(AuthMethod::sql_server(&spec.user, &spec.password));
    config.encryption(EncryptionLevel::Required);
    if spec.trust_server_certificate {
        config.trust_cert();
    }

    let connect_fut = async {
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(SqlDiffError::Io)?;
        tcp.set_nodelay(true).map_err(SqlDiffError::Io)?;
        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| SqlDiffError::Catalog(format!("connection failed: {e}")))
    };

    timeout(Duration::from_secs(timeout_seconds), connect_fut)
        .await
        .map_err(|_| SqlDiffError::Catalog(format!("connection timed out after {timeout_seconds}s")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_connection_string() {
        let spec = ConnectionSpec::parse("server=db01,1533;database=App;user=sa;password=hunter2").unwrap();
        assert_eq!(spec.server, "db01");
        assert_eq!(spec.port, 1533);
        assert_eq!(spec.database, "App");
        assert_eq!(spec.user, "sa");
        assert_eq!(spec.password, "hunter2");
    }

    #[test]
    fn defaults_port_when_absent() {
        let spec = ConnectionSpec::parse("server=db01;database=App;user=sa;password=hunter2").unwrap();
        assert_eq!(spec.port, 1433);
    }

    #[test]
    fn missing_required_key_is_invocation_error() {
        let err = ConnectionSpec::parse("server=db01;user=sa;password=hunter2").unwrap_err();
        assert!(matches!(err, SqlDiffError::Invocation(_)));
    }
}
