//! Maintenance CLI over the watchlist store.
//!
//! Works offline: nothing here scrapes. The long running service is started
//! by embedding [`price_watch::app::App`] with a product source.

use anyhow::Result;
use anyhow::bail;
use dotenv::dotenv;
use log::debug;
use price_watch::config::Config;
use price_watch::link::canonicalize;
use price_watch::logging::setup_logging;
use price_watch::model::UserId;
use price_watch::repository::Repository;

const USAGE: &str = "usage: price-watch <command>

commands:
  canon <link>           print the canonical form of a product link
  list <user>            list the products tracked by a user
  remove <link> <user>   stop tracking a product for a user
  count                  print the number of tracked products";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    // Needs neither the database nor logging.
    if let ["canon", link] = args.as_slice() {
        println!("{}", canonicalize(link)?);
        return Ok(());
    }

    let mut config = Config::new();
    config.load()?;
    let _log_guard = setup_logging(&config)?;

    debug!("Opening repository at {}...", config.db_path);
    let repo = Repository::new(&config.db_url, &config.db_path).await?;
    repo.run_migrations().await?;

    match args.as_slice() {
        ["list", user] => {
            let user = parse_user(user)?;
            let records = repo.record.select_by_subscriber(user).await?;
            if records.is_empty() {
                println!("User {user} is not tracking anything.");
            }
            for record in records {
                let product = &record.product;
                println!(
                    "{:>10.2}  {}  (checked {})\n            {}",
                    product.rounded_price(),
                    product.title,
                    product.formatted_time(),
                    product.link
                );
            }
        }
        ["remove", link, user] => {
            let user = parse_user(user)?;
            let link = canonicalize(link).unwrap_or_else(|_| link.to_string());
            repo.record.remove_subscriber(&link, user).await?;
            println!("User {user} no longer tracks {link}.");
        }
        ["count"] => println!("{}", repo.record.count().await?),
        _ => bail!("{USAGE}"),
    }

    repo.close().await;
    Ok(())
}

fn parse_user(raw: &str) -> Result<UserId> {
    match raw.parse::<i64>() {
        Ok(id) => Ok(UserId(id)),
        Err(e) => bail!("invalid user id `{raw}`: {e}"),
    }
}
