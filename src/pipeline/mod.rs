pub mod generation;
pub mod lexical;
pub mod safety;
pub mod routing;
pub mod triage;
pub mod booking;
