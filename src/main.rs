use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use flavors::auth::SessionUser;
use flavors::config::{Cli, Command, Config};
use flavors::db::models::{NewComment, NewUser};
use flavors::Catalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays parseable JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    let catalog = Catalog::from_config(&config);
    catalog.init().await?;

    run(&catalog, cli.command).await
}

async fn run(catalog: &Catalog, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Stats => print(&catalog.statistics().await?),
        Command::Search { term } => print(&catalog.search_recipes(&term).await?),
        Command::Category { id } => {
            let Some(category) = catalog.category(id).await? else {
                anyhow::bail!("category {} not found", id);
            };
            print(&serde_json::json!({
                "category": category,
                "recipes": catalog.recipes_by_category(id).await?,
            }))
        }
        Command::Popular { limit } => print(&catalog.popular_recipes(limit).await?),
        Command::Newest { limit } => print(&catalog.new_recipes(limit).await?),
        Command::Show { id } => {
            let Some(recipe) = catalog.recipe(id).await? else {
                anyhow::bail!("recipe {} not found", id);
            };
            catalog.increment_recipe_views(id).await?;
            print(&serde_json::json!({
                "recipe": recipe,
                "comments": catalog.comments_for_recipe(id).await?,
            }))
        }
        Command::Register {
            login,
            email,
            password,
        } => {
            let user = catalog
                .register(NewUser {
                    login,
                    email,
                    password,
                    avatar: None,
                })
                .await?;
            print(&SessionUser::from(&user))
        }
        Command::Login {
            identifier,
            password,
        } => match catalog.login(&identifier, &password).await? {
            Some(_) => print(&catalog.current_user().await?),
            None => anyhow::bail!("invalid login or password"),
        },
        Command::Logout => {
            catalog.logout().await?;
            Ok(())
        }
        Command::Whoami => print(&catalog.current_user().await?),
        Command::Favorite { recipe_id } => {
            let user_id = signed_in(catalog).await?;
            print(&catalog.add_to_favorites(user_id, recipe_id).await?)
        }
        Command::Unfavorite { recipe_id } => {
            let user_id = signed_in(catalog).await?;
            print(&catalog.remove_from_favorites(user_id, recipe_id).await?)
        }
        Command::Comment {
            recipe_id,
            rating,
            text,
        } => {
            let user_id = signed_in(catalog).await?;
            let comment = catalog
                .add_comment(NewComment {
                    recipe_id,
                    user_id,
                    user_name: None,
                    text,
                    rating,
                    date: None,
                    likes: None,
                })
                .await?;
            print(&comment)
        }
        Command::Export { path } => {
            let snapshot = catalog.export_data().await?;
            tokio::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?).await?;
            tracing::info!("Wrote backup to {}", path.display());
            Ok(())
        }
        Command::Import { path } => {
            let content = tokio::fs::read(&path).await?;
            catalog.import_data(serde_json::from_slice(&content)?).await?;
            print(&catalog.statistics().await?)
        }
    }
}

async fn signed_in(catalog: &Catalog) -> anyhow::Result<i64> {
    match catalog.current_user().await? {
        Some(user) => Ok(user.id),
        None => anyhow::bail!("not signed in; run `flavors login` first"),
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
