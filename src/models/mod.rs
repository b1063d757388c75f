mod movie;
mod tmdb;

pub use movie::{Movie, NewMovie, SearchResult, User, WatchlistEntry};
pub use tmdb::{Category, TmdbMovie, TmdbResult, TmdbSearchResponse, TmdbSeries, UNKNOWN_YEAR};
