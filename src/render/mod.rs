pub mod bitmap;
pub mod canvas;
pub mod text;
