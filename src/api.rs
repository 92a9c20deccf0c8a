pub mod apsystems;
mod source;

pub use self::source::Source;
