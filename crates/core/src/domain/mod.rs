pub mod preference;
pub mod racket;
pub mod review;
