pub mod buda;
pub mod util;
