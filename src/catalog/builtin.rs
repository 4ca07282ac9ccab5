//! Built-in embed providers, in preference order.

use super::{Endpoints, ProviderSpec};

/// Mirror domains serving the VidSrc embed paths
const VIDSRC_MIRRORS: &[&str] = &["vidsrc.xyz", "vidsrc.in", "vidsrc.pm", "vidsrc.net"];

pub(super) fn providers() -> Vec<ProviderSpec> {
    vec![
        ProviderSpec::new(
            "nontongo",
            "NontonGo",
            Endpoints::Single("www.nontongo.win".to_string()),
        )
        .with_movie("https://{domain}/embed/movie/{id}")
        .with_tv("https://{domain}/embed/tv/{id}/{season}/{episode}"),
        ProviderSpec::new(
            "vidsrc",
            "VidSrc",
            Endpoints::MultiMirror(VIDSRC_MIRRORS.iter().map(|d| d.to_string()).collect()),
        )
        .with_movie("https://{domain}/embed/movie?tmdb={id}")
        .with_tv("https://{domain}/embed/tv?tmdb={id}&season={season}&episode={episode}")
        .with_subtitle_param("ds_lang"),
        ProviderSpec::new(
            "moviesapi",
            "MoviesAPI",
            Endpoints::Single("moviesapi.club".to_string()),
        )
        .with_movie("https://{domain}/movie/{id}")
        .with_tv("https://{domain}/tv/{id}-{season}-{episode}"),
        ProviderSpec::new(
            "vidsrcme",
            "VidSrc.me",
            Endpoints::Single("vidsrc.me".to_string()),
        )
        .with_movie("https://{domain}/embed/movie?tmdb={id}")
        .with_tv("https://{domain}/embed/tv?tmdb={id}&s={season}&e={episode}"),
        ProviderSpec::new(
            "multiembed",
            "Multiembed",
            Endpoints::Single("multiembed.mov".to_string()),
        )
        .with_movie("https://{domain}/?video_id={id}&tmdb=1")
        .with_tv("https://{domain}/?video_id={id}&tmdb=1&s={season}&e={episode}"),
        ProviderSpec::new(
            "2embed",
            "2Embed",
            Endpoints::Single("www.2embed.cc".to_string()),
        )
        .with_movie("https://{domain}/embed/{id}")
        .with_tv("https://{domain}/embedtv/{id}&s={season}&e={episode}"),
        ProviderSpec::new(
            "smashy",
            "Smashy Stream",
            Endpoints::Single("player.smashy.stream".to_string()),
        )
        .with_movie("https://{domain}/movie/{id}")
        .with_tv("https://{domain}/tv/{id}?s={season}&e={episode}"),
    ]
}
