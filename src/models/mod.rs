pub mod callback;
pub mod payment;
