//! Startup data: the default admin account and inventory records for
//! products that predate the ledger.

use crate::services::Services;
use crate::Result;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub inventory_created: usize,
}

pub async fn run(services: &Services, admin_password: Option<&str>) -> Result<SeedReport> {
    let admin_created = match admin_password {
        Some(password) => services.accounts.ensure_admin(password).await?,
        None => false,
    };
    let inventory_created = services.ledger.backfill().await?;
    let report = SeedReport { admin_created, inventory_created };
    tracing::info!(?report, "seeding finished");
    Ok(report)
}
