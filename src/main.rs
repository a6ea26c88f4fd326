//! Movie Catalog: Main entry point

use anyhow::Context;
use clap::Parser;
use movie_catalog::catalog::Catalog;
use movie_catalog::cli::{Cli, Commands};
use movie_catalog::config::CatalogConfig;
use movie_catalog::core::{MovieId, MovieRecord};
use movie_catalog::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        CatalogConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_to(&mut config);
    config.validate()?;

    // Dropping the guard flushes file logs
    let _guard = telemetry::init(&config.log)?;

    let catalog = Catalog::from_config(&config)?;

    match cli.command {
        Commands::List { genre, sort } => {
            let movies = match genre {
                Some(genre) => catalog.movies_by_genre(&genre, sort).await,
                None => catalog.movies().await.to_vec(),
            };
            movies.iter().for_each(print_line);
        }
        Commands::Show { slug } => {
            let movie = catalog.movie_by_slug(&slug).await?;
            print_line(&movie);
            if !movie.director.is_empty() {
                println!("  directed by {}", movie.director);
            }
            if !movie.genres.is_empty() {
                println!("  {}", movie.genres.join(", "));
            }
            if !movie.description.is_empty() {
                println!("  {}", movie.description);
            }
        }
        Commands::Search { query } => {
            catalog.search(&query).await.iter().for_each(print_line);
        }
        Commands::Genres => {
            for genre in catalog.genres().await {
                println!("{}", genre);
            }
        }
        Commands::Featured { date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            match catalog.featured(date).await {
                Some(movie) => print_line(&movie),
                None => println!("catalog is empty"),
            }
        }
        Commands::Random => {
            if let Some(movie) = catalog.random().await {
                print_line(&movie);
            }
        }
        Commands::Reviews { id } => {
            let id = MovieId(id);
            let movie = catalog.movie_by_id(id).await?;
            let reviews = catalog.reviews().load(id).await?;
            for review in &reviews {
                let author = review.user.as_deref().unwrap_or("anonymous");
                println!("{}/5 {}: {}", review.rating, author, review.text);
            }
            let rating = catalog
                .cache()
                .find(id)
                .map(|m| m.rating)
                .unwrap_or(movie.rating);
            println!("{}: {}", movie.title, rating);
        }
        Commands::Inspect => {
            catalog.movies().await;
            println!("{}", serde_json::to_string_pretty(&catalog.stats())?);
        }
    }

    Ok(())
}

fn print_line(movie: &MovieRecord) {
    match movie.year {
        Some(year) => println!("{} ({}) {}", movie.title, year, movie.rating),
        None => println!("{} {}", movie.title, movie.rating),
    }
}
