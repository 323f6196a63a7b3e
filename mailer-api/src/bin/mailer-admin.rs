//! CLI tool for managing API accounts
//!
//! # Usage
//!
//! ```bash
//! # Create an account (prints its API key)
//! mailer-admin create-user "Acme" ops@acme.test s3cret --quota 500 --db sqlite://mailer.db
//!
//! # Change a daily limit
//! mailer-admin set-quota ops@acme.test 1000
//!
//! # Disable API access
//! mailer-admin deactivate ops@acme.test
//!
//! # List accounts
//! mailer-admin list
//! ```

use clap::{Parser, Subcommand};
use mailer_api::db;
use mailer_api::users::{RegisterRequest, User, UserManager};

#[derive(Parser)]
#[command(name = "mailer-admin")]
#[command(about = "Manage mailer-api accounts", long_about = None)]
struct Cli {
    /// Database URL (e.g., sqlite://mailer.db)
    #[arg(short, long, default_value = "sqlite://mailer.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    CreateUser {
        name: String,
        email: String,
        password: String,
        /// Daily send limit (defaults to 100)
        #[arg(long, default_value_t = 100)]
        quota: u32,
    },
    /// Change an account's daily send limit
    SetQuota { email: String, quota: u32 },
    /// Re-enable API access
    Activate { email: String },
    /// Disable API access without deleting anything
    Deactivate { email: String },
    /// Issue a new API key
    RegenerateKey { email: String },
    /// List all accounts
    List,
}

fn print_user(user: &User) {
    println!("  id:        {}", user.id);
    println!("  email:     {}", user.email);
    println!("  api key:   {}", user.api_key);
    println!(
        "  quota:     {}/{} (resets {})",
        user.emails_sent_today, user.daily_email_quota, user.reset_quota_date
    );
    println!("  active:    {}", user.is_active);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let pool = db::connect(&cli.db, 1).await?;
    let users = UserManager::new(pool, 100);
    users.init_db().await?;

    match cli.command {
        Commands::CreateUser {
            name,
            email,
            password,
            quota,
        } => {
            println!("Creating user: {}", email);
            let user = users
                .register(RegisterRequest::new(name, email, password))
                .await?;
            let user = users.set_daily_quota(&user.email, quota).await?;
            println!("✓ User created");
            print_user(&user);
        }
        Commands::SetQuota { email, quota } => {
            let user = users.set_daily_quota(&email, quota).await?;
            println!("✓ Daily quota for {} set to {}", user.email, quota);
        }
        Commands::Activate { email } => {
            users.set_active(&email, true).await?;
            println!("✓ User {} activated", email);
        }
        Commands::Deactivate { email } => {
            users.set_active(&email, false).await?;
            println!("✓ User {} deactivated", email);
        }
        Commands::RegenerateKey { email } => {
            let user = users
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("User {} does not exist", email))?;
            let user = users.regenerate_api_key(&user.id).await?;
            println!("✓ New API key for {}: {}", user.email, user.api_key);
        }
        Commands::List => {
            let all = users.list().await?;

            if all.is_empty() {
                println!("No users found.");
            } else {
                println!(
                    "{:<30} {:<20} {:<10} {:<8}",
                    "Email", "Name", "Quota", "Active"
                );
                println!("{:-<70}", "");

                for user in &all {
                    println!(
                        "{:<30} {:<20} {:<10} {:<8}",
                        user.email,
                        user.name,
                        format!("{}/{}", user.emails_sent_today, user.daily_email_quota),
                        user.is_active
                    );
                }

                println!("\nTotal: {} user(s)", all.len());
            }
        }
    }

    Ok(())
}
