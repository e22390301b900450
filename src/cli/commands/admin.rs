use clap::Subcommand;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;

use crate::auth::Identity;
use crate::cli::utils::print_json;
use crate::cli::OutputFormat;
use crate::config;
use crate::database;
use crate::database::identities::{IdentityDirectory, PgIdentityDirectory};
use crate::database::models::Role;
use crate::database::profiles::{PgProfileStore, ProfileStore};
use crate::services::ReconcileAction;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Report drift between the identity provider and the profiles table")]
    Diagnose,

    #[command(about = "Create or upgrade profiles for configured admin identities")]
    Repair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum AdminHealth {
    Ok,
    MissingIdentity,
    MissingProfile,
    RoleDrift,
}

impl AdminHealth {
    fn as_str(&self) -> &'static str {
        match self {
            AdminHealth::Ok => "ok",
            AdminHealth::MissingIdentity => "missing identity",
            AdminHealth::MissingProfile => "missing profile",
            AdminHealth::RoleDrift => "role drift",
        }
    }

    fn needs_repair(&self) -> bool {
        matches!(self, AdminHealth::MissingProfile | AdminHealth::RoleDrift)
    }
}

#[derive(Debug, Serialize)]
struct AdminReport {
    email: String,
    identity: Option<Identity>,
    health: AdminHealth,
}

pub async fn handle(cmd: AdminCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Diagnose => {
            let reports = scan().await?;

            match output_format {
                OutputFormat::Json => print_json(&json!({ "reports": reports }))?,
                OutputFormat::Text => {
                    println!("{:<45} {:<38} {}", "EMAIL", "IDENTITY", "STATUS");
                    println!("{}", "-".repeat(100));
                    for report in &reports {
                        let identity = report
                            .identity
                            .as_ref()
                            .map(|id| id.id.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<45} {:<38} {}",
                            report.email,
                            identity,
                            report.health.as_str()
                        );
                    }
                }
            }

            Ok(())
        }
        AdminCommands::Repair => {
            let state = AppState::init()?;
            let reports = scan().await?;
            let mut results = Vec::new();

            for report in reports {
                let action = match (&report.identity, report.health.needs_repair()) {
                    (Some(identity), true) => state
                        .admin
                        .ensure_admin_profile(identity)
                        .await?
                        .map(|outcome| outcome.action),
                    _ => None,
                };
                results.push((report, action));
            }

            match output_format {
                OutputFormat::Json => {
                    let entries: Vec<_> = results
                        .iter()
                        .map(|(report, action)| {
                            json!({
                                "email": report.email,
                                "health": report.health,
                                "action": action.map(|a| a.as_str()),
                            })
                        })
                        .collect();
                    print_json(&json!({ "repairs": entries }))?;
                }
                OutputFormat::Text => {
                    for (report, action) in &results {
                        let action = match action {
                            Some(ReconcileAction::Created) => "created profile",
                            Some(ReconcileAction::Upgraded) => "upgraded role",
                            Some(ReconcileAction::Unchanged) => "already consistent",
                            None => "nothing to do",
                        };
                        println!("{}: {} ({})", report.email, action, report.health.as_str());
                    }
                }
            }

            Ok(())
        }
    }
}

/// Resolve every configured admin email against auth.users and profiles.
async fn scan() -> anyhow::Result<Vec<AdminReport>> {
    let pool = database::connect_pool()?;
    let store = PgProfileStore::new(pool.clone());
    let directory = PgIdentityDirectory::new(pool);

    let emails = config::config().admin.allowlist_emails.clone();
    let scans = emails.iter().map(|email| scan_one(&store, &directory, email));

    join_all(scans).await.into_iter().collect()
}

async fn scan_one(
    store: &PgProfileStore,
    directory: &PgIdentityDirectory,
    email: &str,
) -> anyhow::Result<AdminReport> {
    let identity = directory.find_by_email(email).await?;

    let health = match &identity {
        None => AdminHealth::MissingIdentity,
        Some(identity) => match store.find_by_id(identity.id).await? {
            None => AdminHealth::MissingProfile,
            Some(profile) if profile.role != Role::Admin => AdminHealth::RoleDrift,
            Some(_) => AdminHealth::Ok,
        },
    };

    Ok(AdminReport {
        email: email.to_string(),
        identity,
        health,
    })
}
