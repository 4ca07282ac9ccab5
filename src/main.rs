use clap::{Args, Parser, Subcommand};
use dialoguer::Select;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use stream_scout::availability::{AvailabilityGateway, WatchModeGateway};
use stream_scout::cache::CacheStorage;
use stream_scout::metadata_retrieval::{
    CachedMetadataGateway, DEFAULT_SORT, DiscoverFilters, MediaDetails, MediaPage,
    MetadataGateway, MetadataRetrievalError, TmdbGateway,
};
use stream_scout::share::{DEFAULT_BASE_URL, parse_share_link, share_link};
use stream_scout::{
    AvailabilityError, HttpProbe, MediaKind, MediaRef, ProgressEvent, ResolutionReport,
    Settings, ShareLinkError, StreamResolver, StreamScoutError, find_playable_source,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

/// Metadata is considered fresh for one day
const METADATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Parser)]
#[command(
    name = "stream-scout",
    version,
    about = "Find a playable embed source for a movie or TV episode"
)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Try providers until a source loads
    Play {
        #[command(flatten)]
        media: MediaArgs,
        /// Provider id to try first
        #[arg(long)]
        source: Option<String>,
    },
    /// Resolve the target of a share link
    Open { link: String },
    /// List every embed URL that would be tried, without loading any
    Candidates {
        #[command(flatten)]
        media: MediaArgs,
    },
    /// List the configured providers
    Providers,
    /// Show title details
    Details {
        #[command(flatten)]
        media: MediaArgs,
    },
    /// Show the trailer link
    Trailer {
        #[command(flatten)]
        media: MediaArgs,
    },
    /// List licensed streaming offers
    Offers {
        #[command(flatten)]
        media: MediaArgs,
    },
    /// Search movies and series by title
    Search {
        query: String,
        #[arg(long)]
        kind: Option<MediaKind>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List titles trending this week
    Trending {
        kind: MediaKind,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List the highest rated titles
    TopRated {
        kind: MediaKind,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List genre ids usable with `discover --genre`
    Genres { kind: MediaKind },
    /// Browse titles by genre, rating and language
    Discover {
        kind: MediaKind,
        /// Genre id; repeat to require several
        #[arg(long = "genre")]
        genres: Vec<u32>,
        /// Minimum average vote (0-10)
        #[arg(long)]
        min_rating: Option<f64>,
        /// Original language, e.g. `ko`
        #[arg(long)]
        language: Option<String>,
        #[arg(long, default_value = DEFAULT_SORT)]
        sort: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Print a share link
    Share {
        #[command(flatten)]
        media: MediaArgs,
        #[arg(long)]
        source: Option<String>,
    },
}

#[derive(Debug, Args)]
struct MediaArgs {
    /// `movie` or `tv`
    kind: MediaKind,
    /// TMDB id
    id: String,
    #[arg(short, long)]
    season: Option<u32>,
    #[arg(short, long)]
    episode: Option<u32>,
}

impl MediaArgs {
    fn media_ref(&self) -> Result<MediaRef, StreamScoutError> {
        Ok(MediaRef::new(
            self.kind,
            self.id.clone(),
            self.season,
            self.episode,
        )?)
    }
}

/// Errors of the interactive front end
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Library(#[from] StreamScoutError),

    /// The terminal prompt failed
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// The user dismissed a selection
    #[error("Selection cancelled")]
    Cancelled,
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::SessionStarted { media, candidates } => {
            println!(
                "StreamScout: Looking for a source for {} across {} provider(s)...",
                media, candidates
            );
        }
        ProgressEvent::ProviderDeclined { provider_id } => {
            println!("  Skipping {} (needs a season and episode)", provider_id);
        }
        ProgressEvent::TryingSource {
            provider_id,
            mirror,
            url,
        } => {
            println!("[{} #{}] Trying: {}", provider_id, mirror + 1, url);
        }
        ProgressEvent::SourceFailed { reason, .. } => {
            println!("  Failed: {}", reason);
        }
        ProgressEvent::RetryingSource { provider_id } => {
            println!("  Retrying {}...", provider_id);
        }
        ProgressEvent::SwitchingMirror {
            provider_id,
            mirror,
        } => {
            println!("  Switching to mirror #{} of {}", mirror + 1, provider_id);
        }
        ProgressEvent::SwitchingProvider { provider_id } => {
            println!("  Switching to provider {}", provider_id);
        }
        ProgressEvent::SourceLoaded { provider_id, .. } => {
            println!("  Loaded from {}", provider_id);
        }
        ProgressEvent::Exhausted { attempts } => {
            println!("\nNo provider delivered a source after {} attempt(s).", attempts);
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn metadata_gateway(
    settings: &Settings,
) -> Result<CachedMetadataGateway<TmdbGateway>, StreamScoutError> {
    let api_key = settings
        .tmdb_api_key
        .clone()
        .ok_or(MetadataRetrievalError::MissingApiKey)?;
    let tmdb = TmdbGateway::new(api_key, settings.language.as_deref());
    let cache = CacheStorage::<MediaDetails>::open("metadata", Some(METADATA_TTL))?;
    Ok(CachedMetadataGateway::new(tmdb, cache))
}

/// Asks for one of `options`, falling back to `default` when there is no terminal
fn choose(prompt: &str, options: &[String], default: usize) -> Result<usize, CliError> {
    if !std::io::stdin().is_terminal() {
        return Ok(default);
    }
    let choice = Select::new()
        .with_prompt(prompt)
        .items(options)
        .default(default)
        .interact_opt()?;
    selected(choice)
}

/// Turns a dismissed prompt into an error
fn selected(choice: Option<usize>) -> Result<usize, CliError> {
    choice.ok_or(CliError::Cancelled)
}

/// Fills in season and episode for a series reference
///
/// Uses the series' season list when metadata is available. Without an API
/// key the reference stays series-level and episode-only providers decline.
fn pick_episode(settings: &Settings, media: MediaRef) -> Result<MediaRef, CliError> {
    if !media.needs_episode_pick() || settings.tmdb_api_key.is_none() {
        return Ok(media);
    }

    let details = metadata_gateway(settings)?
        .fetch_details(&media)
        .map_err(StreamScoutError::from)?;
    let Some((default_season, default_episode)) = details.pick_episode(None, None) else {
        return Ok(media);
    };
    if details.seasons.is_empty() {
        return Ok(media
            .with_episode(default_season, default_episode)
            .map_err(StreamScoutError::from)?);
    }

    let labels: Vec<String> = details
        .seasons
        .iter()
        .map(|s| format!("{} ({} episodes)", s.name, s.episode_count))
        .collect();
    let season = &details.seasons[choose(&details.title, &labels, 0)?];

    let episodes: Vec<String> = (1..=season.episode_count.max(1))
        .map(|e| format!("Episode {}", e))
        .collect();
    let episode = choose(&season.name, &episodes, 0)? as u32 + 1;

    let (season, episode) = details
        .pick_episode(Some(season.season_number), Some(episode))
        .unwrap_or((default_season, default_episode));
    Ok(media
        .with_episode(season, episode)
        .map_err(StreamScoutError::from)?)
}

fn print_page(page: &MediaPage) {
    if page.results.is_empty() {
        println!("No results.");
        return;
    }
    for hit in &page.results {
        let year = hit
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        println!("{:<6} {:<10} {}{}", hit.kind.as_str(), hit.id, hit.title, year);
    }
    if page.has_next() {
        println!(
            "\nPage {} of {}, use --page {} for more.",
            page.page,
            page.total_pages,
            page.page + 1
        );
    }
}

fn play(
    settings: &Settings,
    media: MediaRef,
    source: Option<&str>,
) -> Result<(), StreamScoutError> {
    let options = settings.resolver_options()?;
    let probe = HttpProbe::new(options.load_timeout)?;
    let resolver = StreamResolver::new(Arc::new(settings.catalog()?), options);

    match find_playable_source(&resolver, media, source, &probe, handle_progress_event)? {
        ResolutionReport::Playable {
            provider_id, url, ..
        } => {
            println!("\n=== Playable Source ===\n");
            println!("  Provider: {}", provider_id);
            println!("  URL: {}", url);
        }
        ResolutionReport::Exhausted { .. } => {
            println!("Try again later, or pick another title.");
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = Settings::load(cli.config.as_deref()).map_err(StreamScoutError::from)?;

    match cli.command {
        Command::Play { media, source } => {
            let media = pick_episode(&settings, media.media_ref()?)?;
            Ok(play(&settings, media, source.as_deref())?)
        }
        Command::Open { link } => {
            let target = parse_share_link(&link).map_err(StreamScoutError::from)?;
            let media = pick_episode(&settings, target.media)?;
            Ok(play(&settings, media, target.source.as_deref())?)
        }
        command => Ok(run_lookup(&settings, command)?),
    }
}

/// Runs the commands that never prompt
fn run_lookup(settings: &Settings, command: Command) -> Result<(), StreamScoutError> {
    match command {
        Command::Play { .. } | Command::Open { .. } => Ok(()),
        Command::Candidates { media } => {
            let media = media.media_ref()?;
            let resolver =
                StreamResolver::new(Arc::new(settings.catalog()?), settings.resolver_options()?);
            for candidate in resolver.candidate_urls(&media) {
                match candidate.url {
                    Some(url) => println!(
                        "{:<12} #{} {}",
                        candidate.provider_id,
                        candidate.mirror + 1,
                        url
                    ),
                    None => println!(
                        "{:<12} #{} (declined)",
                        candidate.provider_id,
                        candidate.mirror + 1
                    ),
                }
            }
            Ok(())
        }
        Command::Providers => {
            for provider in settings.catalog()?.providers() {
                let mut kinds = Vec::new();
                if provider.supports(MediaKind::Movie) {
                    kinds.push("movie");
                }
                if provider.supports(MediaKind::Tv) {
                    kinds.push("tv");
                }
                println!(
                    "{:<12} {:<20} {} mirror(s), {}",
                    provider.id(),
                    provider.name(),
                    provider.mirror_count(),
                    kinds.join("+")
                );
            }
            Ok(())
        }
        Command::Details { media } => {
            let details = metadata_gateway(settings)?.fetch_details(&media.media_ref()?)?;
            println!("{}", details.title);
            if let Some(date) = &details.release_date {
                println!("  Released: {}", date);
            }
            if !details.genres.is_empty() {
                println!("  Genres: {}", details.genres.join(", "));
            }
            if let Some(poster) = details.poster_url() {
                println!("  Poster: {}", poster);
            }
            for season in &details.seasons {
                println!("  {}: {} episode(s)", season.name, season.episode_count);
            }
            if !details.overview.is_empty() {
                println!("\n{}", details.overview);
            }
            Ok(())
        }
        Command::Trailer { media } => {
            match metadata_gateway(settings)?.fetch_trailer(&media.media_ref()?)? {
                Some(trailer) => println!("{}: {}", trailer.name, trailer.watch_url()),
                None => println!("No trailer found."),
            }
            Ok(())
        }
        Command::Offers { media } => {
            let media = media.media_ref()?;
            let details = metadata_gateway(settings)?.fetch_details(&media)?;
            let api_key = settings
                .watchmode_api_key
                .clone()
                .ok_or(AvailabilityError::MissingApiKey)?;
            let offers = WatchModeGateway::new(api_key).find_offers(&details.title, media.kind())?;

            if offers.is_empty() {
                println!("No streaming offers found for '{}'.", details.title);
                return Ok(());
            }
            println!("Where to watch '{}':", details.title);
            for offer in offers {
                let price = offer.price.map(|p| format!(" ${:.2}", p)).unwrap_or_default();
                let format = offer.format.map(|f| format!(" [{}]", f)).unwrap_or_default();
                println!(
                    "  {} ({}{}{}): {}",
                    offer.service_name, offer.offer_type, price, format, offer.url
                );
            }
            Ok(())
        }
        Command::Search { query, kind, page } => {
            print_page(&metadata_gateway(settings)?.search(&query, kind, page)?);
            Ok(())
        }
        Command::Trending { kind, page } => {
            print_page(&metadata_gateway(settings)?.trending(kind, page)?);
            Ok(())
        }
        Command::TopRated { kind, page } => {
            print_page(&metadata_gateway(settings)?.top_rated(kind, page)?);
            Ok(())
        }
        Command::Genres { kind } => {
            for genre in metadata_gateway(settings)?.genres(kind)? {
                println!("{:<6} {}", genre.id, genre.name);
            }
            Ok(())
        }
        Command::Discover {
            kind,
            genres,
            min_rating,
            language,
            sort,
            page,
        } => {
            let filters = DiscoverFilters {
                genres,
                min_rating,
                original_language: language,
                sort_by: sort,
            };
            print_page(&metadata_gateway(settings)?.discover(kind, &filters, page)?);
            Ok(())
        }
        Command::Share { media, source } => {
            let base = match &settings.share_base_url {
                Some(base) => base.clone(),
                None => Url::parse(DEFAULT_BASE_URL)
                    .map_err(|_| ShareLinkError::InvalidUrl(DEFAULT_BASE_URL.to_string()))?,
            };
            println!("{}", share_link(&base, &media.media_ref()?, source.as_deref()));
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dismissed_selection_aborts() {
        assert_eq!(selected(Some(2)).unwrap(), 2);
        assert!(matches!(selected(None), Err(CliError::Cancelled)));
    }

    #[test]
    fn test_search_defaults_to_first_page() {
        let cli = Cli::try_parse_from(["stream-scout", "search", "heat"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Search { kind: None, page: 1, .. }
        ));
    }

    #[test]
    fn test_discover_arguments() {
        let cli = Cli::try_parse_from([
            "stream-scout",
            "discover",
            "tv",
            "--genre",
            "18",
            "--genre",
            "80",
            "--min-rating",
            "7.5",
            "--page",
            "3",
        ])
        .unwrap();
        let Command::Discover {
            kind,
            genres,
            min_rating,
            language,
            sort,
            page,
        } = cli.command
        else {
            panic!("expected discover");
        };
        assert_eq!(kind, MediaKind::Tv);
        assert_eq!(genres, vec![18, 80]);
        assert_eq!(min_rating, Some(7.5));
        assert_eq!(language, None);
        assert_eq!(sort, DEFAULT_SORT);
        assert_eq!(page, 3);
    }

    #[test]
    fn test_listing_subcommands_parse() {
        let cli = Cli::try_parse_from(["stream-scout", "top-rated", "movie", "--page", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::TopRated {
                kind: MediaKind::Movie,
                page: 2
            }
        ));
        let cli = Cli::try_parse_from(["stream-scout", "trending", "tv"]).unwrap();
        assert!(matches!(cli.command, Command::Trending { page: 1, .. }));
        let cli = Cli::try_parse_from(["stream-scout", "genres", "movie"]).unwrap();
        assert!(matches!(cli.command, Command::Genres { kind: MediaKind::Movie }));
    }
}
