use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use crate::auth::password;

#[derive(Parser, Debug)]
#[command(name = "flavors", about = "A local recipe catalog")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Path to the catalog database
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Collection counts and featured recipes
    Stats,
    /// Search recipes by title, description, ingredient or category
    Search { term: String },
    /// Recipes of one category
    Category { id: i64 },
    /// Most viewed recipes
    Popular {
        #[arg(short, long, default_value_t = 6)]
        limit: usize,
    },
    /// Most recently added recipes
    Newest {
        #[arg(short, long, default_value_t = 6)]
        limit: usize,
    },
    /// Show a recipe with its comments and count a view
    Show { id: i64 },
    /// Create an account and sign in
    Register {
        login: String,
        email: String,
        password: String,
    },
    /// Sign in by login or email
    Login { identifier: String, password: String },
    /// Sign out
    Logout,
    /// Print the signed-in user
    Whoami,
    /// Add a recipe to the signed-in user's favorites
    Favorite { recipe_id: i64 },
    /// Remove a recipe from the signed-in user's favorites
    Unfavorite { recipe_id: i64 },
    /// Comment on a recipe as the signed-in user
    Comment {
        recipe_id: i64,
        rating: u8,
        text: String,
    },
    /// Write a full backup as JSON
    Export { path: PathBuf },
    /// Replace the catalog with a JSON backup
    Import { path: PathBuf },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub pool_size: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// bcrypt cost factor for new password hashes
    pub password_cost: u32,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding the current-user slot
    pub dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: 4,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref db) = cli.db {
            config.database.path = Some(db.clone());
        }

        config.data_dir = data_dir;

        if !(password::MIN_COST..=password::MAX_COST).contains(&config.auth.password_cost) {
            anyhow::bail!(
                "auth.password_cost must be between {} and {}",
                password::MIN_COST,
                password::MAX_COST
            );
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".flavors")
        })
    }

    /// Database file, defaulting to `flavors.db` in the data dir.
    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("flavors.db"))
    }

    pub fn session_dir(&self) -> PathBuf {
        self.session
            .dir
            .clone()
            .unwrap_or_else(|| self.data_dir.clone())
    }
}
