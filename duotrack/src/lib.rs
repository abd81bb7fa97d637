pub mod config;
pub mod panel;
pub mod store;
pub mod suggest;

pub mod modules {
    pub mod ipapi;
    pub mod nominatim;
    pub mod overpass;
    pub mod photon;
}

pub mod schemas {
    pub mod common;
    pub mod media;
    pub mod place;
    pub mod video;
}

pub use chrono;
pub use config::Config;
pub use panel::ItemPanel;
pub use store::{DocumentStore, FileStore, MemoryStore};
