use std::path::PathBuf;
use std::sync::Arc;

use claimstore::config::{self, ClaimstoreConfig};
use claimstore::storage::{ClaimStore, DialectStore, ManagedConnection, SqliteProvider};
use claimstore::ui;
use claimstore::{ClaimDialect, ClaimProperties, TenantId};

use crate::{ClaimCommand, DialectCommand, PropertyCommand};

/// Effective settings after merging flags over the config file
pub struct Settings {
    pub config_path: PathBuf,
    pub config: ClaimstoreConfig,
    pub database: PathBuf,
    pub tenant: Option<TenantId>,
    pub json: bool,
}

impl Settings {
    pub fn resolve(
        config_path: Option<PathBuf>,
        database: Option<PathBuf>,
        tenant: Option<TenantId>,
        json: bool,
    ) -> anyhow::Result<Self> {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE_NAME));
        let config = config::load_config(&config_path)?.unwrap_or_default();

        let database = database.unwrap_or_else(|| config.database_path(config::config_dir(&config_path)));
        let tenant = tenant.or(config.tenant);

        Ok(Self {
            config_path,
            config,
            database,
            tenant,
            json,
        })
    }

    fn tenant(&self) -> anyhow::Result<TenantId> {
        self.tenant
            .ok_or_else(|| anyhow::anyhow!("no tenant given (use --tenant or set `tenant` in {})", self.config_path.display()))
    }

    fn provider(&self) -> anyhow::Result<Arc<SqliteProvider>> {
        config::ensure_db_dir(&self.database)?;
        tracing::debug!("Opening claim store at {:?}", self.database);
        Ok(Arc::new(SqliteProvider::open_with(&self.database, self.config.store_options())?))
    }
}

pub fn parse_property(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{}`", raw))?;
    if name.trim().is_empty() {
        return Err(format!("property name is empty in `{}`", raw));
    }
    Ok((name.trim().to_string(), value.to_string()))
}

fn emit(settings: &Settings, command: &str, data: serde_json::Value, message: &str) -> anyhow::Result<()> {
    if settings.json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        ui::success(message);
    }
    Ok(())
}

fn emit_table(settings: &Settings, command: &str, data: serde_json::Value, table: String, empty: &str) -> anyhow::Result<()> {
    if settings.json {
        return emit(settings, command, data, "");
    }
    if table.is_empty() {
        ui::warn(empty);
    } else {
        println!("{}", table);
    }
    Ok(())
}

pub fn run_init(settings: &Settings, force: bool) -> anyhow::Result<()> {
    let config = ClaimstoreConfig {
        database: Some(settings.database.to_string_lossy().into_owned()),
        busy_timeout_ms: settings.config.busy_timeout_ms,
        tenant: settings.tenant,
    };
    config::write_config(&settings.config_path, &config, force)?;
    emit(
        settings,
        "init",
        serde_json::to_value(&config)?,
        &format!("Wrote {}", settings.config_path.display()),
    )
}

pub fn run_dialect(settings: &Settings, cmd: DialectCommand) -> anyhow::Result<()> {
    let tenant = settings.tenant()?;
    let store = DialectStore::new(settings.provider()?);

    match cmd {
        DialectCommand::List => {
            let dialects = store.list_dialects(tenant)?;
            emit_table(
                settings,
                "dialect.list",
                serde_json::to_value(&dialects)?,
                ui::dialects_table(&dialects),
                &format!("No claim dialects for tenant {}", tenant),
            )
        }
        DialectCommand::Add { uri } => {
            store.add_dialect(&ClaimDialect::new(&uri), tenant)?;
            emit(settings, "dialect.add", serde_json::json!({ "dialect_uri": uri }), &format!("Added dialect {}", uri))
        }
        DialectCommand::Rename { old, new } => {
            store.rename_dialect(&ClaimDialect::new(&old), &ClaimDialect::new(&new), tenant)?;
            emit(
                settings,
                "dialect.rename",
                serde_json::json!({ "from": old, "to": new }),
                &format!("Renamed dialect {} to {}", old, new),
            )
        }
        DialectCommand::Remove { uri } => {
            store.remove_dialect(&ClaimDialect::new(&uri), tenant)?;
            emit(settings, "dialect.remove", serde_json::json!({ "dialect_uri": uri }), &format!("Removed dialect {}", uri))
        }
    }
}

pub fn run_claim(settings: &Settings, cmd: ClaimCommand) -> anyhow::Result<()> {
    let tenant = settings.tenant()?;
    let provider = settings.provider()?;
    let store = ClaimStore::new(provider.clone());

    match cmd {
        ClaimCommand::List { dialect } => {
            let conn = ManagedConnection::acquire(&*provider, true)?;
            let claims = store.get_claims(&conn, &dialect, tenant)?;
            let data: Vec<_> = claims
                .iter()
                .map(|(id, claim)| serde_json::json!({ "id": id, "claim_uri": claim.claim_uri }))
                .collect();
            emit_table(
                settings,
                "claim.list",
                serde_json::json!({ "dialect_uri": dialect, "claims": data }),
                ui::claims_table(&claims),
                &format!("No claims in dialect {}", dialect),
            )
        }
        ClaimCommand::Add { dialect, claim, properties } => {
            let properties: ClaimProperties = properties.into_iter().collect();
            let conn = ManagedConnection::acquire(&*provider, false)?;
            let id = store.add_claim(&conn, &dialect, &claim, tenant)?;
            store.add_claim_properties(&conn, id, &properties, tenant)?;
            conn.commit()?;
            emit(
                settings,
                "claim.add",
                serde_json::json!({ "id": id, "dialect_uri": dialect, "claim_uri": claim, "properties": properties }),
                &format!("Added claim {} with id {}", claim, id),
            )
        }
        ClaimCommand::Id { dialect, claim } => {
            let conn = ManagedConnection::acquire(&*provider, true)?;
            let id = store.get_claim_id(&conn, &dialect, &claim, tenant)?;
            if settings.json {
                emit(settings, "claim.id", serde_json::json!({ "id": id }), "")
            } else {
                ui::info(&claim, &id.to_string());
                Ok(())
            }
        }
        ClaimCommand::Remove { dialect, claim } => {
            store.remove_claim(&dialect, &claim, tenant)?;
            emit(
                settings,
                "claim.remove",
                serde_json::json!({ "dialect_uri": dialect, "claim_uri": claim }),
                &format!("Removed claim {}", claim),
            )
        }
    }
}

pub fn run_property(settings: &Settings, cmd: PropertyCommand) -> anyhow::Result<()> {
    let tenant = settings.tenant()?;
    let provider = settings.provider()?;
    let store = ClaimStore::new(provider.clone());

    match cmd {
        PropertyCommand::Get { dialect, claim } => {
            let conn = ManagedConnection::acquire(&*provider, true)?;
            let id = store.get_claim_id(&conn, &dialect, &claim, tenant)?;
            let properties = store.get_claim_properties(&conn, id, tenant)?;
            emit_table(
                settings,
                "property.get",
                serde_json::json!({ "id": id, "properties": properties }),
                ui::properties_table(&properties),
                &format!("Claim {} has no properties", claim),
            )
        }
        PropertyCommand::Set { dialect, claim, properties } => {
            let properties: ClaimProperties = properties.into_iter().collect();
            let conn = ManagedConnection::acquire(&*provider, false)?;
            let id = store.get_claim_id(&conn, &dialect, &claim, tenant)?;
            store.update_claim_properties(&conn, id, &properties, tenant)?;
            conn.commit()?;
            emit(
                settings,
                "property.set",
                serde_json::json!({ "id": id, "properties": properties }),
                &format!("Stored {} properties for claim {}", properties.len(), claim),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_property() {
        assert_eq!(parse_property("Description=A = B").unwrap(), ("Description".into(), "A = B".into()));
        assert_eq!(parse_property("Required=").unwrap(), ("Required".into(), String::new()));
        assert!(parse_property("Description").is_err());
        assert!(parse_property(" =x").is_err());
    }
}
