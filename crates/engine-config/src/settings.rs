use crate::{
    error::ConfigError,
    profile::ProfileFile,
    properties::{Properties, redact},
};
use connectors::profile::ConnectionProfile;
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::info;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_NUM_ORDERS: usize = 100;
const DEFAULT_DATABASE: &str = "AUTOMATED_INTELLIGENCE";
const DEFAULT_SCHEMA: &str = "RAW";
const DEFAULT_ID_COLUMN: &str = "CUSTOMER_ID";

/// Every key read from `config.properties`; each can be overridden from
/// the environment.
pub const KNOWN_KEYS: &[&str] = &[
    "snowflake.database",
    "snowflake.schema",
    "snowflake.warehouse",
    "snowflake.role",
    "pipe.orders.name",
    "pipe.order_items.name",
    "channel.orders.name",
    "channel.order_items.name",
    "orders.batch.size",
    "num.orders.per.batch",
    "ingest.transport",
    "ingest.url",
    "customers.lookup",
    "customers.table",
    "customers.id_column",
    "customers.max_id",
    "postgres.url",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Rest,
    Memory,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rest" => Ok(Self::Rest),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected rest or memory, got {other}")),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest => f.write_str("rest"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Where the max customer id comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerLookup {
    SqlApi,
    Postgres { url: String },
    Static { max_id: Option<i64> },
}

impl CustomerLookup {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SqlApi => "sql-api",
            Self::Postgres { .. } => "postgres",
            Self::Static { .. } => "static",
        }
    }
}

/// One pipe and the channel opened on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub pipe: String,
    pub channel: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database: String,
    pub schema: String,
    pub warehouse: String,
    pub role: String,
    pub orders: StreamTarget,
    pub order_items: StreamTarget,
    pub batch_size: usize,
    pub num_orders: usize,
    pub transport: TransportKind,
    pub ingest_url: Option<String>,
    pub lookup: CustomerLookup,
    pub customers_table: String,
    pub customers_id_column: String,
    profile: Option<ConnectionProfile>,
    profile_path: PathBuf,
}

impl Settings {
    /// Reads both files and applies `TRIBUTARY_*` environment overrides. A
    /// missing profile is tolerated until something needs credentials.
    pub fn load(config_path: &Path, profile_path: &Path) -> Result<Self, ConfigError> {
        let mut props = Properties::load(config_path)?;
        props.apply_overrides(KNOWN_KEYS, |name| std::env::var(name).ok());

        let profile = if profile_path.exists() {
            Some(ProfileFile::load(profile_path)?)
        } else {
            None
        };

        let settings = Self::from_sources(props, profile, profile_path)?;
        info!(
            config = %config_path.display(),
            transport = %settings.transport,
            lookup = settings.lookup.name(),
            "Configuration loaded"
        );
        Ok(settings)
    }

    pub fn from_sources(
        props: Properties,
        profile_file: Option<ProfileFile>,
        profile_path: &Path,
    ) -> Result<Self, ConfigError> {
        // Precedence: environment override, then profile.json, then the file.
        let pick = |from_profile: Option<&String>, key: &str| -> Option<String> {
            let from_props = || props.get(key).map(str::to_string);
            let value = if props.is_env_override(key) {
                from_props().or_else(|| from_profile.cloned())
            } else {
                from_profile.cloned().or_else(from_props)
            };
            value.filter(|v| !v.trim().is_empty())
        };

        let pf = profile_file.as_ref();
        let database = pick(pf.and_then(|p| p.database.as_ref()), "snowflake.database")
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let schema = pick(pf.and_then(|p| p.schema.as_ref()), "snowflake.schema")
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        let warehouse =
            pick(pf.and_then(|p| p.warehouse.as_ref()), "snowflake.warehouse").unwrap_or_default();
        let role = pick(pf.and_then(|p| p.role.as_ref()), "snowflake.role").unwrap_or_default();

        let orders = StreamTarget {
            pipe: props.require("pipe.orders.name")?.to_string(),
            channel: props.require("channel.orders.name")?.to_string(),
        };
        let order_items = StreamTarget {
            pipe: props.require("pipe.order_items.name")?.to_string(),
            channel: props.require("channel.order_items.name")?.to_string(),
        };

        let batch_size = props.get_parsed("orders.batch.size", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "orders.batch.size".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let num_orders = props.get_parsed("num.orders.per.batch", DEFAULT_NUM_ORDERS)?;

        let transport = parse_choice(&props, "ingest.transport", TransportKind::Rest)?;
        let lookup = parse_lookup(&props)?;

        let customers_table = props
            .get("customers.table")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{database}.{schema}.CUSTOMERS"));
        let customers_id_column = props
            .get("customers.id_column")
            .unwrap_or(DEFAULT_ID_COLUMN)
            .to_string();

        let needs_profile = transport == TransportKind::Rest || lookup == CustomerLookup::SqlApi;
        let profile = match profile_file {
            Some(file) => {
                let dir = profile_path.parent().unwrap_or_else(|| Path::new("."));
                Some(ConnectionProfile {
                    private_key: file.resolve_private_key(dir)?,
                    account: file.account,
                    user: file.user,
                    url: file.url,
                    role: role.clone(),
                    warehouse: warehouse.clone(),
                    database: database.clone(),
                    schema: schema.clone(),
                })
            }
            None if needs_profile => {
                return Err(ConfigError::MissingProfile(profile_path.to_path_buf()));
            }
            None => None,
        };

        if lookup == CustomerLookup::SqlApi && warehouse.is_empty() {
            return Err(ConfigError::MissingKey("snowflake.warehouse".to_string()));
        }

        Ok(Self {
            database,
            schema,
            warehouse,
            role,
            orders,
            order_items,
            batch_size,
            num_orders,
            transport,
            ingest_url: props.get("ingest.url").map(str::to_string),
            lookup,
            customers_table,
            customers_id_column,
            profile,
            profile_path: profile_path.to_path_buf(),
        })
    }

    pub fn profile(&self) -> Option<&ConnectionProfile> {
        self.profile.as_ref()
    }

    pub fn require_profile(&self) -> Result<&ConnectionProfile, ConfigError> {
        self.profile
            .as_ref()
            .ok_or_else(|| ConfigError::MissingProfile(self.profile_path.clone()))
    }

    /// Effective settings for display, secrets masked.
    pub fn summary(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let mut put = |k: &str, v: String| {
            out.insert(k.to_string(), redact(k, &v));
        };

        put("snowflake.database", self.database.clone());
        put("snowflake.schema", self.schema.clone());
        put("snowflake.warehouse", self.warehouse.clone());
        put("snowflake.role", self.role.clone());
        put("pipe.orders.name", self.orders.pipe.clone());
        put("channel.orders.name", self.orders.channel.clone());
        put("pipe.order_items.name", self.order_items.pipe.clone());
        put("channel.order_items.name", self.order_items.channel.clone());
        put("orders.batch.size", self.batch_size.to_string());
        put("num.orders.per.batch", self.num_orders.to_string());
        put("ingest.transport", self.transport.to_string());
        if let Some(url) = &self.ingest_url {
            put("ingest.url", url.clone());
        }
        put("customers.lookup", self.lookup.name().to_string());
        put("customers.table", self.customers_table.clone());
        put("customers.id_column", self.customers_id_column.clone());
        match &self.lookup {
            CustomerLookup::Postgres { url } => put("postgres.url", url.clone()),
            CustomerLookup::Static { max_id } => put(
                "customers.max_id",
                max_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            CustomerLookup::SqlApi => {}
        }
        if let Some(profile) = &self.profile {
            put("profile.account", profile.account.clone());
            put("profile.user", profile.user.clone());
            put("profile.url", profile.url.clone());
            put("profile.private_key", profile.private_key.expose().to_string());
        }
        out
    }
}

fn parse_choice<T>(props: &Properties, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr<Err = String>,
{
    match props.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason,
        }),
    }
}

fn parse_lookup(props: &Properties) -> Result<CustomerLookup, ConfigError> {
    let kind = props.get("customers.lookup").unwrap_or("sql-api");
    match kind.trim().to_lowercase().as_str() {
        "sql-api" | "sql_api" => Ok(CustomerLookup::SqlApi),
        "postgres" => Ok(CustomerLookup::Postgres {
            url: props.require("postgres.url")?.to_string(),
        }),
        "static" => {
            let max_id = match props.get("customers.max_id") {
                None => None,
                Some(raw) => Some(raw.trim().parse::<i64>().map_err(|e| {
                    ConfigError::InvalidValue {
                        key: "customers.max_id".to_string(),
                        value: raw.to_string(),
                        reason: e.to_string(),
                    }
                })?),
            };
            Ok(CustomerLookup::Static { max_id })
        }
        other => Err(ConfigError::InvalidValue {
            key: "customers.lookup".to_string(),
            value: other.to_string(),
            reason: "expected sql-api, postgres or static".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "\
pipe.orders.name=ORDERS-STREAMING
pipe.order_items.name=ORDER_ITEMS-STREAMING
channel.orders.name=ORDERS_CHANNEL
channel.order_items.name=ORDER_ITEMS_CHANNEL
";

    fn props(extra: &str) -> Properties {
        format!("{BASE}{extra}").parse().unwrap()
    }

    fn profile() -> ProfileFile {
        serde_json::from_str(
            r#"{"account":"xy12345","user":"ingest","url":"https://xy12345.snowflakecomputing.com",
                "private_key":"MIIE","warehouse":"PROFILE_WH","role":"INGEST_ROLE"}"#,
        )
        .unwrap()
    }

    #[test]
    fn memory_dry_run_needs_no_profile() {
        let settings = Settings::from_sources(
            props("ingest.transport=memory\ncustomers.lookup=static\ncustomers.max_id=50\n"),
            None,
            Path::new("profile.json"),
        )
        .unwrap();

        assert_eq!(settings.transport, TransportKind::Memory);
        assert_eq!(settings.lookup, CustomerLookup::Static { max_id: Some(50) });
        assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(settings.num_orders, DEFAULT_NUM_ORDERS);
        assert_eq!(settings.customers_table, "AUTOMATED_INTELLIGENCE.RAW.CUSTOMERS");
        assert!(settings.profile().is_none());
    }

    #[test]
    fn rest_transport_requires_profile() {
        let err = Settings::from_sources(props(""), None, Path::new("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProfile(_)));
    }

    #[test]
    fn profile_overrides_properties() {
        let settings = Settings::from_sources(
            props("snowflake.warehouse=PROPS_WH\nsnowflake.role=PROPS_ROLE\n"),
            Some(profile()),
            Path::new("profile.json"),
        )
        .unwrap();

        assert_eq!(settings.warehouse, "PROFILE_WH");
        assert_eq!(settings.role, "INGEST_ROLE");
        let conn = settings.require_profile().unwrap();
        assert_eq!(conn.warehouse, "PROFILE_WH");
        assert_eq!(conn.database, "AUTOMATED_INTELLIGENCE");
    }

    #[test]
    fn environment_overrides_beat_profile() {
        let mut props = props("snowflake.database=PROPS_DB\n");
        props.apply_overrides(KNOWN_KEYS, |name| match name {
            "TRIBUTARY_SNOWFLAKE_DATABASE" => Some("ENV_DB".to_string()),
            "TRIBUTARY_SNOWFLAKE_WAREHOUSE" => Some("ENV_WH".to_string()),
            _ => None,
        });
        let mut file = profile();
        file.database = Some("PROFILE_DB".to_string());

        let settings =
            Settings::from_sources(props, Some(file), Path::new("profile.json")).unwrap();

        assert_eq!(settings.database, "ENV_DB");
        assert_eq!(settings.warehouse, "ENV_WH");
        assert_eq!(settings.role, "INGEST_ROLE");
        assert_eq!(settings.require_profile().unwrap().database, "ENV_DB");
    }

    #[test]
    fn missing_pipe_name_is_reported() {
        let props: Properties = "channel.orders.name=C".parse().unwrap();
        let err = Settings::from_sources(props, Some(profile()), Path::new("p.json")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(key) if key == "pipe.orders.name"));
    }

    #[test]
    fn rejects_unknown_choices_and_zero_batch() {
        assert!(matches!(
            Settings::from_sources(props("ingest.transport=kafka\n"), None, Path::new("p")),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Settings::from_sources(
                props("ingest.transport=memory\ncustomers.lookup=static\norders.batch.size=0\n"),
                None,
                Path::new("p"),
            ),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn postgres_lookup_requires_url() {
        let err = Settings::from_sources(
            props("ingest.transport=memory\ncustomers.lookup=postgres\n"),
            None,
            Path::new("p"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(key) if key == "postgres.url"));
    }

    #[test]
    fn summary_masks_secrets() {
        let settings = Settings::from_sources(
            props("customers.lookup=postgres\npostgres.url=postgres://app:s3cret@db/app\n"),
            Some(profile()),
            Path::new("profile.json"),
        )
        .unwrap();

        let summary = settings.summary();
        assert_eq!(summary["profile.private_key"], "****");
        assert_eq!(summary["postgres.url"], "postgres://app:****@db/app");
        assert_eq!(summary["pipe.orders.name"], "ORDERS-STREAMING");
    }
}
