pub mod redfin;

pub use redfin::RedfinApi;
