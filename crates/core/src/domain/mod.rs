pub mod outcome;
pub mod record;
