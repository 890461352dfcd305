pub mod bundle;
pub mod fetcher;
pub mod gate;
pub mod reference;
