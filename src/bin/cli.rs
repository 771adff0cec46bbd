use anyhow::Context;
use clap::{Parser, Subcommand};
use medicare::{
    config::{BackendConfig, StorageConfig},
    error::AppError,
    models::{DoctorSummary, RegisterData, UserRole},
    navigation::{self, StartRoute},
    storage::{FileStorage, KeyValueStorage, MemoryStorage},
    store::DEFAULT_RECENT_LIMIT,
    AppContext,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "medicare-cli")]
#[command(about = "Command-line client for the MediCare backend", long_about = None)]
struct Cli {
    /// Keep state in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        /// Full name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,

        /// patient or doctor
        #[arg(short, long, default_value = "patient")]
        role: UserRole,

        #[arg(long)]
        phone: Option<String>,

        /// Doctors only
        #[arg(long)]
        specialization: Option<String>,

        /// Doctors only
        #[arg(long)]
        license_number: Option<String>,

        #[arg(long)]
        date_of_birth: Option<String>,

        #[arg(long)]
        address: Option<String>,
    },

    /// End the current session
    Logout,

    /// End every session of the signed-in account
    ClearSessions,

    /// Show the signed-in user, revalidated against the server
    Whoami,

    /// List medical specialties with live specialist counts
    Categories {
        /// Only show specialties whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Search doctors by name and specialty
    Doctors {
        /// Name to search for
        #[arg(short, long, default_value = "")]
        query: String,

        /// Restrict to one specialty
        #[arg(short, long)]
        specialty: Option<String>,
    },

    /// Show one doctor and record the view
    Doctor {
        /// Doctor document id
        id: String,
    },

    /// Show recently viewed doctors
    Recent {
        /// Maximum number of doctors to display
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,

        /// Forget every recently viewed doctor
        #[arg(long)]
        clear: bool,
    },
}

fn get_password(prompt: &str) -> io::Result<String> {
    print!("{}: ", prompt);
    io::stdout().flush()?;

    rpassword::read_password()
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn fail(action: &str, err: &AppError) -> ! {
    eprintln!("❌ {}: {}", action, err.user_message());
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medicare=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    let storage: Arc<dyn KeyValueStorage> = if cli.ephemeral {
        Arc::new(MemoryStorage::new())
    } else {
        let config = StorageConfig::from_env();
        Arc::new(FileStorage::new(&config.data_dir).with_context(|| {
            format!("Failed to open data directory {}", config.data_dir.display())
        })?)
    };

    let config = BackendConfig::from_env().context("Invalid backend configuration")?;
    let ctx = AppContext::from_config(&config, storage);
    ctx.hydrate();

    match cli.command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(pw) => pw,
                None => get_password("Password")?,
            };

            match ctx.auth_store.login(&email, &password).await {
                Ok(()) => {}
                Err(err) if err.is_session_conflict() => {
                    eprintln!("⚠️  {}", err.user_message());
                    if !confirm("Clear existing sessions and try again?")? {
                        std::process::exit(1);
                    }
                    if let Err(err) = ctx.auth_store.clear_sessions().await {
                        fail("Failed to clear sessions", &err);
                    }
                    if let Err(err) = ctx.auth_store.login(&email, &password).await {
                        fail("Login failed", &err);
                    }
                }
                Err(err) => fail("Login failed", &err),
            }

            if let Some(user) = ctx.auth_store.user() {
                println!("✅ Logged in as {} <{}>", user.name, user.email);
            }
        }

        Commands::Register {
            name,
            email,
            password,
            role,
            phone,
            specialization,
            license_number,
            date_of_birth,
            address,
        } => {
            let password = match password {
                Some(pw) => pw,
                None => {
                    let password = get_password("Password")?;
                    if password != get_password("Confirm password")? {
                        eprintln!("❌ Passwords do not match");
                        std::process::exit(1);
                    }
                    password
                }
            };

            let data = RegisterData {
                name,
                email,
                password,
                role,
                phone,
                specialization,
                license_number,
                date_of_birth,
                address,
            };

            match ctx.auth_store.register(data).await {
                Ok(()) => {
                    if let Some(user) = ctx.auth_store.user() {
                        println!("✅ Account created successfully!");
                        println!("  ID: {}", user.id);
                        println!("  Email: {}", user.email);
                        println!("  Role: {}", user.role.map(|r| r.to_string()).unwrap_or_default());
                    }
                }
                Err(err) => fail("Registration failed", &err),
            }
        }

        Commands::Logout => match ctx.auth_store.logout().await {
            Ok(()) => println!("✅ Logged out"),
            Err(err) => fail("Logout failed on the server (local session cleared)", &err),
        },

        Commands::ClearSessions => match ctx.auth_store.clear_sessions().await {
            Ok(()) => println!("✅ All sessions cleared"),
            Err(err) => fail("Failed to clear sessions", &err),
        },

        Commands::Whoami => match navigation::start_route(&ctx.auth_store).await {
            Some(StartRoute::Home) => {
                if let Some(user) = ctx.auth_store.user() {
                    println!("{} <{}>", user.name, user.email);
                    println!("  ID: {}", user.id);
                    if let Some(role) = user.role {
                        println!("  Role: {}", role);
                    }
                    if let Some(specialization) = &user.specialization {
                        println!("  Specialization: {}", specialization);
                    }
                }
            }
            _ => {
                println!("Not logged in.");
            }
        },

        Commands::Categories { search } => {
            let store = &ctx.categories_store;
            if let Some(refresh) = store.fetch_categories().await {
                if let Err(e) = refresh.await {
                    warn!("Specialty count refresh did not finish: {}", e);
                }
            }

            if let Some(error) = store.state().error {
                eprintln!("❌ Failed to load categories: {}", error);
                std::process::exit(1);
            }

            let categories = match search {
                Some(query) => store.search(&query),
                None => store.categories(),
            };

            if categories.is_empty() {
                println!("No categories found.");
            } else {
                println!("{:<20} {:<30} {:<12}", "ID", "Name", "Specialists");
                println!("{}", "-".repeat(62));
                for category in categories {
                    println!(
                        "{:<20} {:<30} {:<12}",
                        category.id, category.name, category.specialist_count
                    );
                }
            }
        }

        Commands::Doctors { query, specialty } => {
            match ctx
                .directory_service
                .search_doctors(&query, specialty.as_deref())
                .await
            {
                Ok(doctors) => {
                    if doctors.is_empty() {
                        println!("No doctors found.");
                    } else {
                        println!("{:<24} {:<30} {:<20} {:<6}", "ID", "Name", "Speciality", "Rating");
                        println!("{}", "-".repeat(82));
                        for doctor in doctors {
                            println!(
                                "{:<24} {:<30} {:<20} {:<6}",
                                doctor.id,
                                doctor.name,
                                doctor.speciality.as_deref().unwrap_or("N/A"),
                                doctor
                                    .rating
                                    .map(|r| format!("{:.1}", r))
                                    .unwrap_or_else(|| "N/A".to_string())
                            );
                        }
                    }
                }
                Err(err) => fail("Failed to search doctors", &err),
            }
        }

        Commands::Doctor { id } => match ctx.directory_service.get_doctor_by_id(&id).await {
            Ok(Some(doctor)) => {
                println!("{}", doctor.name);
                println!("  ID: {}", doctor.id);
                println!(
                    "  Speciality: {}",
                    doctor.speciality.as_deref().unwrap_or("N/A")
                );
                if let Some(hospital) = &doctor.hospital {
                    println!("  Hospital: {}", hospital);
                }
                if let Some(experience) = &doctor.experience {
                    println!("  Experience: {}", experience);
                }
                if let Some(fee) = doctor.consultation_fee {
                    println!("  Consultation fee: {:.2}", fee);
                }
                if let Some(qualifications) = &doctor.qualifications {
                    println!("  Qualifications: {}", qualifications.items().join(", "));
                }
                if !doctor.availability.is_empty() {
                    println!("  Availability: {}", doctor.availability.join(", "));
                }

                ctx.recently_viewed_store
                    .add_recent_doctor(DoctorSummary::from(&doctor));
            }
            Ok(None) => {
                eprintln!("❌ Doctor '{}' not found", id);
                std::process::exit(1);
            }
            Err(err) => fail("Failed to load doctor", &err),
        },

        Commands::Recent { limit, clear } => {
            let store = &ctx.recently_viewed_store;
            if clear {
                store.clear_recent_doctors();
                println!("✅ Recently viewed doctors cleared");
            } else {
                let recent = store.get_recent_doctors(limit);
                if recent.is_empty() {
                    println!("No recently viewed doctors.");
                } else {
                    println!("{:<24} {:<30} {:<25}", "ID", "Name", "Viewed");
                    println!("{}", "-".repeat(79));
                    for entry in recent {
                        println!(
                            "{:<24} {:<30} {:<25}",
                            entry.id(),
                            entry.doctor.name,
                            entry.viewed_at.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
