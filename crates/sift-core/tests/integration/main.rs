mod common;
mod extraction_tests;
mod model_file_tests;
