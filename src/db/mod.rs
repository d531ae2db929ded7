mod database;
mod test_case;

pub use database::Database;
pub use test_case::{TestCase, load_test_cases};
