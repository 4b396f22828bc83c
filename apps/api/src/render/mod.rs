pub mod font_metrics;
pub mod pdf;
