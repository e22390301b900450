use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth;
use crate::cli::utils::print_json;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a session token for a known identity")]
    Issue {
        #[arg(long, help = "Identity provider user id (UUID)")]
        user_id: Uuid,

        #[arg(long, help = "Identity email")]
        email: String,

        #[arg(long, help = "Validity in hours (defaults to the configured session expiry)")]
        hours: Option<u64>,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { user_id, email, hours } => {
            let token = auth::issue_session_token(user_id, &email, hours)?;

            match output_format {
                OutputFormat::Json => print_json(&json!({ "token": token }))?,
                OutputFormat::Text => println!("{}", token),
            }

            Ok(())
        }
    }
}
