pub mod daylight;
