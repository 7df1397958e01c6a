pub mod dom;
pub mod driver;
pub mod logger;
pub mod matcher;
pub mod ocr_extract;
pub mod scan;
pub mod similarity;
pub mod stats;
pub mod text;
pub mod workflow;
