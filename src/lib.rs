pub mod conversion;
pub mod engine;
pub mod export;
pub mod io;
pub mod rendering;
pub mod settings;
pub mod util;
