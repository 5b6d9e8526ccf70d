pub mod result;
pub mod test_definition;
