//! `profile` and `top`

use anyhow::Context as _;
use tunestats_domain::{ItemKind, TimeRange, TopItem};

use crate::context::AppContext;

pub async fn profile(ctx: &AppContext) -> anyhow::Result<()> {
    let profile = ctx.service.profile().await.context("could not load profile")?;

    println!("{}", profile.name());
    println!("  id:        {}", profile.id);
    if let Some(email) = &profile.email {
        println!("  email:     {email}");
    }
    if let Some(country) = &profile.country {
        println!("  country:   {country}");
    }
    if let Some(product) = &profile.product {
        println!("  plan:      {product}");
    }
    println!("  followers: {}", profile.followers.total);
    Ok(())
}

pub async fn top(
    ctx: &AppContext,
    kind: ItemKind,
    period: TimeRange,
    limit: u32,
) -> anyhow::Result<()> {
    let page = ctx
        .service
        .top_items(kind, period, limit)
        .await
        .with_context(|| format!("could not load top {kind}"))?;

    println!("Top {kind} ({})", period.label());
    if page.items.is_empty() {
        println!("  nothing yet");
    }
    for (rank, item) in page.items.iter().enumerate() {
        println!("{:>3}. {}", rank + 1, describe(kind, item));
    }
    Ok(())
}

fn describe(kind: ItemKind, item: &TopItem) -> String {
    match kind {
        ItemKind::Artists if !item.genres.is_empty() => {
            format!("{} [{}]", item.name, item.genres.join(", "))
        }
        ItemKind::Tracks if !item.artists.is_empty() => {
            let artists: Vec<&str> = item.artists.iter().map(|a| a.name.as_str()).collect();
            format!("{} - {}", item.name, artists.join(", "))
        }
        _ => item.name.clone(),
    }
}
