pub mod fetch_img;
pub mod llm;
pub mod ocr;
