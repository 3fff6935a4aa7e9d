pub mod core {
    pub mod config;
    pub mod error;
    pub mod state;
    pub mod startup;
    pub mod tracing_init;
}

pub mod models {
    pub mod attendance;
    pub mod session;
    pub mod user;
}

pub mod api {
    pub mod client;
    pub mod gateway;
    pub mod memory;
}

pub mod stores {
    pub mod invalidation;
    pub mod queries;
    pub mod query_cache;
    pub mod session_storage;
}

pub mod validation {
    pub mod payload;
    pub mod session_form;
}

pub mod scanner {
    pub mod camera;
    pub mod decoder;
    pub mod image_camera;
    pub mod qr_decoder;
    pub mod scan_loop;

    pub use camera::FacingMode;
    pub use image_camera::ImageFileCamera;
    pub use qr_decoder::QrDecoder;
    pub use scan_loop::{QrScanner, ScannerOptions, ScannerState};
}

pub mod handlers {
    pub mod account;
    pub mod attendance;
    pub mod check_in;
    pub mod sessions;
}

pub mod navigation {
    pub mod gate;
    pub mod routes;
}

pub mod console {
    pub mod app;
    pub mod commands;
}

pub mod utils {
    pub mod time;
}
