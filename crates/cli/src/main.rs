use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use racketfit_core::catalog::Backends;
use racketfit_core::domain::preference::{
    BalancePreference, BudgetChoice, LevelChoice, PlayStyle, PreferenceSelection,
};
use racketfit_core::domain::racket::RecommendedRacket;
use racketfit_core::domain::review::NewReview;
use racketfit_core::engine::{score, EngineOptions, RecommendationEngine};

#[derive(Debug, Parser)]
#[command(name = "racketfit", about = "Badminton racket recommendations from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rank catalog rackets against a preference selection.
    Recommend(RecommendArgs),
    /// List reviews for a racket, newest first.
    Reviews { racket_id: i64 },
    /// Post a review for a racket.
    Review {
        racket_id: i64,
        /// 1 to 5 stars.
        #[arg(long)]
        rating: u8,
        #[arg(long, default_value = "")]
        comment: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
struct RecommendArgs {
    #[arg(long)]
    playstyle: Option<String>,
    #[arg(long)]
    balance: Option<String>,
    /// Free-text level label, e.g. "Beginner (เพิ่งเริ่มเล่น)".
    #[arg(long)]
    level: Option<String>,
    /// Free-text budget label, e.g. "1,500 – 3,000".
    #[arg(long)]
    budget: Option<String>,
    /// Print the ranked list as JSON.
    #[arg(long)]
    json: bool,
    /// Show the per-criterion score for each racket.
    #[arg(long)]
    explain: bool,
}

impl RecommendArgs {
    /// Flags override the starting selection; unknown playstyle/balance labels are errors.
    fn apply(&self, mut selection: PreferenceSelection) -> anyhow::Result<PreferenceSelection> {
        if let Some(s) = self.playstyle.as_deref() {
            selection.set_playstyle(Some(PlayStyle::from_label(s)?));
        }
        if let Some(s) = self.balance.as_deref() {
            selection.set_balance(Some(BalancePreference::from_label(s)?));
        }
        if let Some(s) = self.level.as_deref() {
            selection.set_level(Some(LevelChoice::from_label(s)));
        }
        if let Some(s) = self.budget.as_deref() {
            selection.set_budget(Some(BudgetChoice::from_label(s)));
        }
        Ok(selection)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = racketfit_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let cli = Cli::parse();

    let backends = racketfit_core::catalog::connect(&settings)
        .await
        .context("catalog backend unavailable")?;

    let result = match cli.command {
        Command::Recommend(args) => recommend(backends, &args).await,
        Command::Reviews { racket_id } => list_reviews(&backends, racket_id).await,
        Command::Review {
            racket_id,
            rating,
            comment,
            name,
        } => post_review(&backends, racket_id, rating, comment, name.as_deref()).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
    }
    result
}

async fn recommend(backends: Backends, args: &RecommendArgs) -> anyhow::Result<()> {
    let engine = RecommendationEngine::new(backends.catalog, backends.images, EngineOptions::from_env());
    let selection = args.apply(engine.initial_selection())?;

    if !selection.is_complete() {
        tracing::warn!("not every preference is set; results may be empty");
    }

    let ranked = engine.fetch_recommendations(&selection).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    if ranked.is_empty() {
        println!("no rackets matched");
        return Ok(());
    }
    for item in &ranked {
        println!("{}", format_line(item));
        if args.explain {
            let b = score::score_breakdown(&item.racket, &selection);
            println!(
                "      style {:>2}  balance {:>2}  level {:>2}  budget {:>2}",
                b.style, b.balance, b.level, b.budget
            );
        }
    }
    Ok(())
}

fn format_line(item: &RecommendedRacket) -> String {
    let r = &item.racket;
    format!(
        "{:>3}%  #{:<4} {} {}  [{} / {} / {}]  ฿{:.0}",
        item.match_percentage,
        r.id,
        r.brand,
        r.model_name,
        r.style_tag,
        r.balance_tag,
        r.player_level.as_deref().unwrap_or("-"),
        r.price
    )
}

async fn list_reviews(backends: &Backends, racket_id: i64) -> anyhow::Result<()> {
    let reviews = backends.reviews.list_reviews(racket_id).await?;
    if reviews.is_empty() {
        println!("no reviews yet for racket #{racket_id}");
    }
    for r in reviews {
        println!(
            "{}  {}  {}",
            r.created_at.format("%Y-%m-%d %H:%M"),
            "★".repeat(usize::from(r.rating)),
            r.reviewer_name
        );
        if let Some(comment) = r.comment.as_deref() {
            println!("    {comment}");
        }
    }
    Ok(())
}

async fn post_review(
    backends: &Backends,
    racket_id: i64,
    rating: u8,
    comment: String,
    name: Option<&str>,
) -> anyhow::Result<()> {
    let review = NewReview::new(racket_id, rating, comment)?.with_reviewer_name(name);
    let created = backends.reviews.create_review(&review).await?;
    tracing::info!(racket_id, review_id = created.id, "review posted");
    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

fn init_sentry(settings: &racketfit_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use racketfit_core::domain::preference::{Level, SelectionPolicy};
    use racketfit_core::domain::racket::Racket;

    fn recommend_args(argv: &[&str]) -> RecommendArgs {
        let mut full = vec!["racketfit", "recommend"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Recommend(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_fill_an_empty_selection() {
        let args = recommend_args(&[
            "--playstyle",
            "control-defense",
            "--balance",
            "Head-light",
            "--level",
            "Advanced (แข่งบ้างเป็นบางครั้ง)",
            "--budget",
            "3,000 ขึ้นไป",
        ]);
        let sel = args
            .apply(PreferenceSelection::initial(SelectionPolicy::RequireAll))
            .unwrap();
        assert!(sel.is_complete());
        assert_eq!(sel.playstyle, Some(PlayStyle::ControlDefense));
        assert_eq!(sel.level_value(), Some(Level::Advanced));
    }

    #[test]
    fn flags_override_prefilled_defaults() {
        let args = recommend_args(&["--balance", "Head-heavy"]);
        let sel = args.apply(PreferenceSelection::prefilled()).unwrap();
        assert_eq!(sel.balance, Some(BalancePreference::HeadHeavy));
        assert_eq!(sel.playstyle, Some(PlayStyle::AllRound));
    }

    #[test]
    fn unknown_playstyle_is_an_error() {
        let args = recommend_args(&["--playstyle", "Trick shot"]);
        assert!(args.apply(PreferenceSelection::empty()).is_err());
    }

    #[test]
    fn review_requires_rating() {
        assert!(Cli::try_parse_from(["racketfit", "review", "3"]).is_err());
        let cli = Cli::try_parse_from(["racketfit", "review", "3", "--rating", "5"]).unwrap();
        assert!(matches!(cli.command, Command::Review { racket_id: 3, rating: 5, .. }));
    }

    #[test]
    fn line_shows_percentage_and_tags() {
        let item = RecommendedRacket::new(
            Racket {
                id: 12,
                brand: "Yonex".to_string(),
                model_name: "Arcsaber 11".to_string(),
                style_tag: "Control / Defense".to_string(),
                balance_tag: "Even balance".to_string(),
                player_level: None,
                flex: None,
                price: 5900.0,
                description: None,
                image_path: None,
            },
            None,
            65,
        );
        assert_eq!(
            format_line(&item),
            " 65%  #12   Yonex Arcsaber 11  [Control / Defense / Even balance / -]  ฿5900"
        );
    }
}
