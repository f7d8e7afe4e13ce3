use clap::{Args, Parser, Subcommand};

use crate::app::SortOrder;

#[derive(Debug, Parser)]
#[command(
    name = "podgrid",
    version,
    about = "Browse a podcast catalog, keep favorites and resume episodes"
)]
pub struct Cli {
    /// Catalog API base URL (defaults to $PODGRID_API_BASE or the public API).
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive directory (default).
    Tui,
    /// Print the catalog, optionally filtered and sorted.
    List(ListArgs),
    /// Print one show with its seasons and episodes.
    Show { show_id: String },
    /// Toggle a show favorite.
    Favorite { show_id: String },
    /// Toggle an episode favorite.
    FavoriteEpisode { episode_id: String },
    /// Print favorite shows and episodes.
    Favorites {
        #[arg(long, value_enum, default_value_t = SortOrder::None)]
        sort: SortOrder,
    },
    /// Play an episode and remember where playback stopped.
    Play {
        show_id: String,
        episode_id: String,
        /// Start offset in seconds.
        #[arg(long, default_value_t = 0.0)]
        start: f64,
    },
    /// Continue the last listened episode.
    Resume,
    /// Store a resume position without playing.
    Progress {
        show_id: String,
        episode_id: String,
        seconds: f64,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Fuzzy title search.
    #[arg(long, conflicts_with = "genre")]
    pub search: Option<String>,
    /// Keep shows tagged with this genre.
    #[arg(long)]
    pub genre: Option<String>,
    #[arg(long, value_enum, default_value_t = SortOrder::None)]
    pub sort: SortOrder,
}
