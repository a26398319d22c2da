//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState};
use crate::config::{Config, Secrets};
use crate::integrations::Integrations;
use chrono::Utc;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tvmount_core::{
    BookingStatus, InstallerId, InstallerRequest, MarketError, Marketplace, MemoryStore,
    RedbStore, StorageBackend, TrackingKeys, TvConfig,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a quote input file (1 MB).
const MAX_QUOTE_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), MarketError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| MarketError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(MarketError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path, following symlinks and "..".
///
/// The path must exist and be a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, MarketError> {
    let canonical = path.canonicalize().map_err(|e| {
        MarketError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MarketError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path; its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, MarketError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        MarketError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(MarketError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| MarketError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Global options resolved once per invocation.
#[derive(Debug)]
pub struct Context {
    pub database: PathBuf,
    pub backend: String,
    pub json_mode: bool,
    pub config: Config,
    pub secrets: Secrets,
}

impl Context {
    /// Open the marketplace on the selected backend.
    pub fn open(&self) -> Result<Marketplace, MarketError> {
        self.open_with_url(&self.config.server.public_base_url)
    }

    fn open_with_url(&self, public_base_url: &str) -> Result<Marketplace, MarketError> {
        let catalog = self.config.catalog()?;
        let keys = TrackingKeys::from_secret(self.secrets.token_secret());
        match self.backend.as_str() {
            "redb" => Marketplace::with_redb(&self.database, catalog, keys, public_base_url),
            "memory" => Ok(Marketplace::new(
                StorageBackend::InMemory(MemoryStore::new()),
                catalog,
                keys,
                public_base_url,
            )),
            other => Err(MarketError::invalid(format!(
                "Unknown backend '{}' (expected redb or memory)",
                other
            ))),
        }
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    mut ctx: Context,
    host: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
) -> Result<(), MarketError> {
    if let Some(host) = host {
        ctx.config.server.host = host;
    }
    if let Some(port) = port {
        ctx.config.server.port = port;
    }
    if let Some(url) = public_url {
        ctx.config.server.public_base_url = url;
    }
    let server = &ctx.config.server;

    let market = ctx.open_with_url(&server.public_base_url)?;
    let integrations = Integrations::from_config(&ctx.config.integrations, &ctx.secrets)
        .map_err(|e| MarketError::IoError(format!("Integrations: {}", e)))?;

    println!("tvmount Booking Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", server.host);
    println!("  Port:       {}", server.port);
    println!("  Backend:    {}", ctx.backend);
    println!("  Database:   {:?}", ctx.database);
    println!("  Public URL: {}", server.public_base_url);
    println!();
    println!("Integrations:");
    println!(
        "  Placement preview: {}",
        enabled(integrations.previewer.is_some())
    );
    println!("  Maps:              {}", enabled(integrations.geocoder.is_some()));
    println!(
        "  Email delivery:    {}",
        if ctx.secrets.mail_api_key.is_some() {
            "enabled"
        } else {
            "log only"
        }
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /api/catalog        - Service catalog");
    println!("  POST /api/wizard         - Start a booking");
    println!("  POST /api/bookings       - Book in one call");
    println!("  GET  /api/track/{{code}}   - Tracking page");
    println!("  GET  /api/admin/stats    - Admin dashboard");
    println!("  GET  /health             - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = ctx.config.bind_addr();
    api::run_server(&addr, AppState::with_integrations(market, integrations)).await
}

fn enabled(on: bool) -> &'static str {
    if on { "enabled" } else { "disabled" }
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show booking statistics.
pub fn cmd_status(ctx: &Context) -> Result<(), MarketError> {
    let market = ctx.open()?;
    let stats = market.stats(Utc::now())?;

    if ctx.json_mode {
        let output = serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "backend": ctx.backend,
            "stats": stats,
        });
        print_json(&output);
        return Ok(());
    }

    println!("tvmount Booking Status");
    println!("======================");
    println!("Database: {:?}", ctx.database);
    println!("Backend:  {}", ctx.backend);
    println!();
    println!("Bookings:          {}", stats.total_bookings);
    for (status, count) in &stats.by_status {
        println!("  {:<16} {}", status.as_str(), count);
    }
    println!("Upcoming visits:   {}", stats.upcoming);
    println!("TVs booked:        {}", stats.tvs_booked);
    println!("Booked revenue:    {}", stats.booked_revenue);
    println!("Completed revenue: {}", stats.completed_revenue);
    println!(
        "Installers:        {} active / {} total",
        stats.active_installers, stats.total_installers
    );

    Ok(())
}

// =============================================================================
// CATALOG COMMAND
// =============================================================================

/// Print the active price table.
pub fn cmd_catalog(ctx: &Context) -> Result<(), MarketError> {
    let catalog = ctx.config.catalog()?;

    if ctx.json_mode {
        print_json(&catalog.to_file());
        return Ok(());
    }

    println!("Service Tiers");
    for tier in catalog.tiers() {
        println!(
            "  {:<20} {:>10}  up to {}\"  {}",
            tier.id, tier.base_price, tier.max_tv_inches, tier.name
        );
    }
    println!();
    println!("Wall Types");
    for wall in catalog.wall_types() {
        println!("  {:<20} {:>10}  {}", wall.id, wall.surcharge, wall.name);
    }
    println!();
    println!("Mount Types");
    for mount in catalog.mount_types() {
        println!("  {:<20} {:>10}  {}", mount.id, mount.price, mount.name);
    }
    println!();
    println!("Add-ons");
    for addon in catalog.addons() {
        println!("  {:<20} {:>10}  {}", addon.id, addon.price, addon.name);
    }

    Ok(())
}

// =============================================================================
// QUOTE COMMAND
// =============================================================================

/// Accepted shapes of a quote input file.
#[derive(Deserialize)]
#[serde(untagged)]
enum QuoteFile {
    List(Vec<TvConfig>),
    Request { tvs: Vec<TvConfig> },
}

/// Price TV configurations read from a JSON file.
pub fn cmd_quote(ctx: &Context, file: &Path) -> Result<(), MarketError> {
    let path = validate_file_path(file)?;
    validate_file_size(&path, MAX_QUOTE_FILE_SIZE)?;

    let contents = std::fs::read(&path)
        .map_err(|e| MarketError::IoError(format!("Read file: {}", e)))?;
    let tvs = match serde_json::from_slice::<QuoteFile>(&contents)
        .map_err(|e| MarketError::SerializationError(format!("Quote file: {}", e)))?
    {
        QuoteFile::List(tvs) | QuoteFile::Request { tvs } => tvs,
    };

    let catalog = ctx.config.catalog()?;
    for tv in &tvs {
        tv.validate(&catalog)?;
    }
    let quote = tvmount_core::quote(&catalog, &tvs)?;

    if ctx.json_mode {
        print_json(&quote);
        return Ok(());
    }

    for (i, tv) in quote.tvs.iter().enumerate() {
        println!("TV {} ({}\")", i + 1, tv.size_inches);
        for line in &tv.lines {
            println!("  {:<36} {:>10}", line.label, line.amount);
        }
        println!("  {:<36} {:>10}", "Subtotal", tv.subtotal);
        println!();
    }
    println!("Total: {}", quote.total);

    Ok(())
}

// =============================================================================
// BOOKINGS COMMAND
// =============================================================================

/// List bookings, newest first.
pub fn cmd_bookings(ctx: &Context, status: Option<&str>, limit: usize) -> Result<(), MarketError> {
    let status = match status {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| MarketError::invalid(format!("Unknown status: {}", s)))?,
        ),
        None => None,
    };

    let market = ctx.open()?;
    let mut bookings = market.bookings(status)?;
    bookings.truncate(limit);

    if ctx.json_mode {
        print_json(&bookings);
        return Ok(());
    }

    if bookings.is_empty() {
        println!("No bookings");
        return Ok(());
    }

    println!(
        "{:>6}  {:<10}  {:<12}  {:<28}  {:>3}  {:>10}  Customer",
        "ID", "Code", "Status", "When", "TVs", "Total"
    );
    for b in &bookings {
        println!(
            "{:>6}  {:<10}  {:<12}  {:<28}  {:>3}  {:>10}  {}",
            b.id,
            b.tracking_code,
            b.status.as_str(),
            b.request.schedule.to_string(),
            b.tv_count(),
            b.quote.total,
            b.request.contact.name
        );
    }

    Ok(())
}

// =============================================================================
// INSTALLER COMMANDS
// =============================================================================

/// Register an installer and print their access token.
pub fn cmd_installer_add(
    ctx: &Context,
    name: String,
    email: String,
    phone: String,
    service_area: String,
) -> Result<(), MarketError> {
    let mut market = ctx.open()?;
    let installer = market.register_installer(
        InstallerRequest {
            name,
            email,
            phone,
            service_area,
        },
        Utc::now(),
    )?;
    let token = market.installer_token(installer.id)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "installer": installer, "token": token }));
        return Ok(());
    }

    println!("Registered installer {} ({})", installer.id, installer.name);
    println!("Access token: {}", token);
    println!();
    println!("The installer signs in with: Authorization: Bearer <token>");

    Ok(())
}

/// Print an existing installer's token.
pub fn cmd_installer_token(ctx: &Context, id: u64) -> Result<(), MarketError> {
    let market = ctx.open()?;
    let token = market.installer_token(InstallerId(id))?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "installer_id": id, "token": token }));
    } else {
        println!("{}", token);
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write all bookings and installers to a JSON file.
pub fn cmd_export(ctx: &Context, output: &Path) -> Result<(), MarketError> {
    let output = validate_output_path(output)?;
    let market = ctx.open()?;
    let snapshot = market.export_snapshot(Utc::now())?;

    let data = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| MarketError::SerializationError(e.to_string()))?;
    std::fs::write(&output, &data)
        .map_err(|e| MarketError::IoError(format!("Write export: {}", e)))?;

    println!(
        "Exported {} bookings and {} installers to {:?}",
        snapshot.bookings.len(),
        snapshot.installers.len(),
        output
    );
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty database.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), MarketError> {
    if ctx.backend != "redb" {
        return Err(MarketError::invalid(
            "init only applies to the redb backend",
        ));
    }

    if ctx.database.exists() {
        if !force {
            return Err(MarketError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| MarketError::IoError(format!("Remove database: {}", e)))?;
    }

    let _market = ctx.open()?;
    println!("Initialized new redb database at {:?}", ctx.database);
    Ok(())
}

// =============================================================================
// COMPACT COMMAND
// =============================================================================

/// Reclaim free space in the redb file.
pub fn cmd_compact(ctx: &Context) -> Result<(), MarketError> {
    if ctx.backend != "redb" {
        return Err(MarketError::invalid(
            "compact only applies to the redb backend",
        ));
    }
    if !ctx.database.exists() {
        return Err(MarketError::IoError(format!(
            "Database {:?} does not exist. Run init first.",
            ctx.database
        )));
    }

    let before = file_len(&ctx.database);
    RedbStore::open(&ctx.database)?.compact()?;
    let after = file_len(&ctx.database);

    tracing::info!(event = "database_compacted", before, after, "Database compacted");
    if ctx.json_mode {
        print_json(&serde_json::json!({ "before_bytes": before, "after_bytes": after }));
    } else {
        println!("Compacted {:?}: {} -> {} bytes", ctx.database, before, after);
    }
    Ok(())
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn context(dir: &tempfile::TempDir, backend: &str) -> Context {
        Context {
            database: dir.path().join("test.redb"),
            backend: backend.to_string(),
            json_mode: true,
            config: Config::default(),
            secrets: Secrets {
                token_secret: Some("cli-test".to_string()),
                ..Secrets::default()
            },
        }
    }

    #[test]
    fn init_refuses_existing_database_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, "redb");
        cmd_init(&ctx, false).expect("first init");
        assert!(ctx.database.exists());
        assert!(cmd_init(&ctx, false).is_err());
        cmd_init(&ctx, true).expect("forced init");
    }

    #[test]
    fn compact_keeps_bookings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, "redb");
        assert!(cmd_compact(&ctx).is_err());

        cmd_init(&ctx, false).expect("init");
        cmd_installer_add(
            &ctx,
            "Sam Rivera".to_string(),
            "sam@mounts.example".to_string(),
            "555 987 6543".to_string(),
            String::new(),
        )
        .expect("installer");
        cmd_compact(&ctx).expect("compact");

        let market = ctx.open().expect("reopen");
        assert_eq!(market.installers().expect("list").len(), 1);

        let memory = context(&dir, "memory");
        assert!(cmd_compact(&memory).is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, "sqlite");
        assert!(matches!(ctx.open(), Err(MarketError::Validation(_))));
    }

    #[test]
    fn installer_token_is_stable_across_opens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, "redb");
        cmd_installer_add(
            &ctx,
            "Sam Reyes".to_string(),
            "sam@example.com".to_string(),
            "555 123 4567".to_string(),
            String::new(),
        )
        .expect("add");

        let first = ctx.open().expect("open").installer_token(InstallerId(1));
        let second = ctx.open().expect("open").installer_token(InstallerId(1));
        assert_eq!(first.expect("token"), second.expect("token"));
    }

    #[test]
    fn export_writes_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, "redb");
        let out = dir.path().join("export.json");
        cmd_export(&ctx, &out).expect("export");

        let text = std::fs::read_to_string(&out).expect("read");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert!(value["bookings"].as_array().expect("array").is_empty());
    }

    #[test]
    fn quote_accepts_both_file_shapes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, "memory");
        let tv = serde_json::json!({
            "size_inches": 50,
            "tier": "basic",
            "wall_type": "drywall",
            "mount_type": "fixed",
        });

        let list = dir.path().join("list.json");
        std::fs::write(&list, serde_json::json!([tv]).to_string()).expect("write");
        cmd_quote(&ctx, &list).expect("list shape");

        let object = dir.path().join("object.json");
        std::fs::write(&object, serde_json::json!({ "tvs": [tv] }).to_string()).expect("write");
        cmd_quote(&ctx, &object).expect("object shape");
    }

    #[test]
    fn quote_rejects_invalid_tvs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, "memory");

        let too_big = dir.path().join("too_big.json");
        let tv = serde_json::json!({
            "size_inches": 500,
            "tier": "basic",
            "wall_type": "drywall",
            "mount_type": "fixed",
        });
        std::fs::write(&too_big, serde_json::json!([tv]).to_string()).expect("write");
        assert!(matches!(
            cmd_quote(&ctx, &too_big),
            Err(MarketError::Validation(_))
        ));

        let doubled = dir.path().join("doubled.json");
        let tv = serde_json::json!({
            "size_inches": 50,
            "tier": "basic",
            "wall_type": "drywall",
            "mount_type": "fixed",
            "addons": ["soundbar", "soundbar"],
        });
        std::fs::write(&doubled, serde_json::json!([tv]).to_string()).expect("write");
        assert!(cmd_quote(&ctx, &doubled).is_err());
    }

    #[test]
    fn bookings_rejects_unknown_status() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, "memory");
        assert!(cmd_bookings(&ctx, Some("lost"), 10).is_err());
        cmd_bookings(&ctx, Some("pending"), 10).expect("empty list");
    }
}
