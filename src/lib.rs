//! Picframe - borders, rounded corners and palette quantization for images
//!
//! This library provides functionality to:
//! - Decode animated GIFs (and still images) into frame sequences
//! - Surround each frame with a colored border and cut rounded corners
//! - Re-encode the sequence with its timing and loop count intact
//! - Map images onto small fixed palettes and print them as C arrays

pub mod cli;
pub mod color;
pub mod compositor;
pub mod config;
pub mod gif_codec;
pub mod mask;
pub mod output;
pub mod pipeline;
pub mod quantize;
pub mod threshold;
